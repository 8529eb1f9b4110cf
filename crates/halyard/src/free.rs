//! # Deep Free
//!
//! Explicit, schema-driven release of a loader-returned tree. Ownership
//! in the tree is transitive, so dropping the root releases every
//! reachable allocation exactly once; this walk exists to validate the
//! tree against its schema on the way out and to account for what is
//! released on the debug log, mirroring the allocation the loader did.
//!
//! Abandoning a tree without calling this is sound; the drop glue does
//! the same release without the accounting.

use halyard_core::{Config, Error, LogLevel, Node};
use halyard_schema::schema::{Kind, Value};
use halyard_schema::node_matches;

use crate::log;

/// Count the owned allocations a node contributes.
fn count(schema: &Value, node: &Node, released: &mut usize) -> Result<(), Error> {
    if !node_matches(schema, node) {
        return Err(Error::BadTypeInSchema);
    }
    if schema.is_pointer() && !node.is_null() {
        *released += 1;
    }
    match node {
        Node::String(s) if !s.is_empty() => *released += 1,
        Node::Binary(b) if !b.is_empty() => *released += 1,
        Node::Sequence(items) => {
            if !items.is_empty() {
                *released += 1;
            }
            let entry = match &schema.kind {
                Kind::Sequence(seq) | Kind::SequenceFixed(seq) => &seq.entry,
                _ => return Err(Error::BadTypeInSchema),
            };
            for item in items {
                count(entry, item, released)?;
            }
        }
        Node::Mapping(entries) => {
            let Kind::Mapping(mapping) = &schema.kind else {
                return Err(Error::BadTypeInSchema);
            };
            for (key, value) in entries {
                let field = mapping
                    .fields
                    .iter()
                    .find(|f| &f.key == key)
                    .ok_or(Error::InvalidKey)?;
                count(&field.value, value, released)?;
            }
        }
        _ => {}
    }
    Ok(())
}

/// Release `node` and everything it owns.
pub(crate) fn free_value(config: &Config, schema: &Value, node: Node) -> Result<(), Error> {
    let mut released = 0usize;
    count(schema, &node, &mut released)?;
    drop(node);
    log::emit(
        config,
        LogLevel::Debug,
        &format!("released tree with {released} owned allocation(s)"),
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use halyard_schema::schema::Field;

    use super::*;

    #[test]
    fn test_free_accepts_matching_tree() {
        let cfg = Config::new();
        let schema = Value::mapping(vec![
            Field::new("name", Value::string().pointer()),
            Field::new("count", Value::uint(4)),
        ])
        .pointer();
        let node = Node::Mapping(vec![
            ("name".into(), Node::String("rope".into())),
            ("count".into(), Node::Uint(3)),
        ]);
        assert_eq!(free_value(&cfg, &schema, node), Ok(()));
    }

    #[test]
    fn test_free_rejects_mismatched_tree() {
        let cfg = Config::new();
        let schema = Value::uint(4).pointer();
        assert_eq!(
            free_value(&cfg, &schema, Node::String("oops".into())),
            Err(Error::BadTypeInSchema)
        );
    }
}
