//! # Deep Copy
//!
//! Schema-driven cloning of a value tree. The clone shares no allocation
//! with its source and is validated against the schema as it is built,
//! so a tree that disagrees with its schema is caught here rather than
//! at the next save.
//!
//! The same engine materialises default values for optional mapping
//! fields that are absent from a document; there is no separate
//! default-splat path.
//!
//! Recursion here is bounded by schema depth, which is static data.

use halyard_core::{Config, Error, LogLevel, Node};
use halyard_schema::schema::{Kind, Value, ValueFlags};

use crate::log;

fn mismatch(config: &Config, schema: &Value, node: &Node) -> Error {
    log::emit(
        config,
        LogLevel::Error,
        &format!(
            "schema kind '{}' cannot describe a {} node",
            schema.kind.name(),
            node.kind_name()
        ),
    );
    Error::BadTypeInSchema
}

/// Produce an independent clone of `node` under `schema`.
pub(crate) fn clone_value(config: &Config, schema: &Value, node: &Node) -> Result<Node, Error> {
    if node.is_null() {
        if schema.is_pointer() {
            return Ok(Node::Null);
        }
        return Err(mismatch(config, schema, node));
    }
    match (&schema.kind, node) {
        (Kind::Int(_) | Kind::Enum(_), Node::Int(v)) => Ok(Node::Int(*v)),
        (Kind::Uint(_) | Kind::Flags(_) | Kind::Bitfield(_), Node::Uint(v)) => {
            Ok(Node::Uint(*v))
        }
        (Kind::Bool(_), Node::Bool(v)) => Ok(Node::Bool(*v)),
        (Kind::Float(_), Node::Float(v)) => Ok(Node::Float(*v)),
        (Kind::String(_), Node::String(s)) => Ok(Node::String(s.clone())),
        (Kind::Binary(_), Node::Binary(b)) => Ok(Node::Binary(b.clone())),
        (Kind::Sequence(seq), Node::Sequence(items)) => {
            if items.len() < seq.min {
                return Err(Error::SequenceEntriesTooFew);
            }
            if items.len() > seq.max {
                return Err(Error::SequenceEntriesTooMany);
            }
            clone_entries(config, &seq.entry, items)
        }
        (Kind::SequenceFixed(seq), Node::Sequence(items)) => {
            if items.len() != seq.max {
                return Err(Error::SequenceFixedCount);
            }
            clone_entries(config, &seq.entry, items)
        }
        (Kind::Mapping(mapping), Node::Mapping(entries)) => {
            // Every entry must be a schema field; every non-optional
            // field must be present.
            for (key, _) in entries {
                if !mapping.fields.iter().any(|f| &f.key == key) {
                    log::emit(
                        config,
                        LogLevel::Error,
                        &format!("mapping entry '{key}' is not in the schema"),
                    );
                    return Err(Error::InvalidKey);
                }
            }
            let mut cloned = Vec::with_capacity(mapping.fields.len());
            for field in &mapping.fields {
                if matches!(field.value.kind, Kind::Ignore) {
                    continue;
                }
                let found = entries.iter().find(|(k, _)| k == &field.key);
                match found {
                    Some((_, value)) => cloned.push((
                        field.key.clone(),
                        clone_value(config, &field.value, value)?,
                    )),
                    None if field.value.flags.contains(ValueFlags::OPTIONAL) => cloned
                        .push((field.key.clone(), default_value(config, &field.value)?)),
                    None => {
                        log::emit(
                            config,
                            LogLevel::Error,
                            &format!("mapping field missing: {}", field.key),
                        );
                        return Err(Error::MappingFieldMissing);
                    }
                }
            }
            Ok(Node::Mapping(cloned))
        }
        _ => Err(mismatch(config, schema, node)),
    }
}

fn clone_entries(config: &Config, entry: &Value, items: &[Node]) -> Result<Node, Error> {
    let mut cloned = Vec::with_capacity(items.len());
    for item in items {
        cloned.push(clone_value(config, entry, item)?);
    }
    Ok(Node::Sequence(cloned))
}

/// The all-zeros value of a schema, used when an optional in-place
/// record is absent and carries no default.
pub(crate) fn zero_value(config: &Config, schema: &Value) -> Result<Node, Error> {
    if schema.is_pointer() {
        // Zeroing an owning indirection leaves a null pointer.
        return Ok(Node::Null);
    }
    match &schema.kind {
        Kind::Int(_) | Kind::Enum(_) => Ok(Node::Int(0)),
        Kind::Uint(_) | Kind::Flags(_) | Kind::Bitfield(_) => Ok(Node::Uint(0)),
        Kind::Bool(_) => Ok(Node::Bool(false)),
        Kind::Float(_) => Ok(Node::Float(0.0)),
        Kind::String(_) => Ok(Node::String(String::new())),
        Kind::Binary(_) => Ok(Node::Binary(Vec::new())),
        Kind::Sequence(_) => Ok(Node::Sequence(Vec::new())),
        Kind::SequenceFixed(seq) => {
            let mut items = Vec::with_capacity(seq.max);
            for _ in 0..seq.max {
                items.push(zero_value(config, &seq.entry)?);
            }
            Ok(Node::Sequence(items))
        }
        Kind::Mapping(mapping) => {
            let mut entries = Vec::with_capacity(mapping.fields.len());
            for field in &mapping.fields {
                if matches!(field.value.kind, Kind::Ignore) {
                    continue;
                }
                entries.push((field.key.clone(), zero_value(config, &field.value)?));
            }
            Ok(Node::Mapping(entries))
        }
        Kind::Ignore => Err(Error::Internal),
    }
}

/// Materialise the default of an optional value that is absent from the
/// document.
///
/// A zero scalar default behind an owning indirection materialises as a
/// null pointer rather than an allocation; composite defaults are deep
/// copies of the schema's default subtree.
pub(crate) fn default_value(config: &Config, schema: &Value) -> Result<Node, Error> {
    let pointer = schema.is_pointer();
    match &schema.kind {
        Kind::Int(int) => Ok(if pointer && int.default == 0 {
            Node::Null
        } else {
            Node::Int(int.default)
        }),
        Kind::Enum(en) => Ok(if pointer && en.default == 0 {
            Node::Null
        } else {
            Node::Int(en.default)
        }),
        Kind::Uint(uint) => Ok(if pointer && uint.default == 0 {
            Node::Null
        } else {
            Node::Uint(uint.default)
        }),
        Kind::Flags(flags) => Ok(if pointer && flags.default == 0 {
            Node::Null
        } else {
            Node::Uint(flags.default)
        }),
        Kind::Bitfield(bitfield) => Ok(if pointer && bitfield.default == 0 {
            Node::Null
        } else {
            Node::Uint(bitfield.default)
        }),
        Kind::Bool(b) => Ok(if pointer && !b.default {
            Node::Null
        } else {
            Node::Bool(b.default)
        }),
        Kind::Float(float) => Ok(if pointer && float.default == 0.0 {
            Node::Null
        } else {
            Node::Float(float.default)
        }),
        Kind::String(string) => match &string.default {
            Some(default) => Ok(Node::String(default.clone())),
            None if pointer => Ok(Node::Null),
            None => Ok(Node::String(String::new())),
        },
        Kind::Mapping(mapping) => match &mapping.default {
            Some(default) => clone_value(config, schema, default),
            None if pointer => Ok(Node::Null),
            None => zero_value(config, schema),
        },
        Kind::Sequence(seq) | Kind::SequenceFixed(seq) => match &seq.default {
            Some(default) => {
                let mut items = Vec::with_capacity(default.len());
                for item in default {
                    items.push(clone_value(config, &seq.entry, item)?);
                }
                Ok(Node::Sequence(items))
            }
            None if pointer => Ok(Node::Null),
            None => zero_value(config, schema),
        },
        Kind::Binary(_) => zero_value(config, schema),
        Kind::Ignore => Err(Error::Internal),
    }
}
