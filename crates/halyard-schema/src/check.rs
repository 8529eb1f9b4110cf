//! # Schema Invariant Checker
//!
//! Walks a schema before any load, save or copy touches it and rejects
//! shapes the interpreters cannot honour. Checking is recursive on schema
//! depth only; schemas are static data, so the depth is a compile-time
//! property of the host program.

use halyard_core::codec::MAX_DATA_SIZE;
use halyard_core::{Config, ConfigFlags, Error, Node};

use crate::schema::{Kind, SequenceSchema, Value};

fn check_width(data_size: usize) -> Result<(), Error> {
    if data_size == 0 || data_size > MAX_DATA_SIZE {
        return Err(Error::InvalidDataSize);
    }
    Ok(())
}

/// Whether `node` is a value the schema could have produced.
///
/// Null is acceptable wherever the schema carries an owning indirection,
/// since a null pointer is a representable host state there.
pub fn node_matches(schema: &Value, node: &Node) -> bool {
    if node.is_null() {
        return schema.is_pointer();
    }
    match (&schema.kind, node) {
        (Kind::Int(_) | Kind::Enum(_), Node::Int(_)) => true,
        (Kind::Uint(_) | Kind::Flags(_) | Kind::Bitfield(_), Node::Uint(_)) => true,
        (Kind::Bool(_), Node::Bool(_)) => true,
        (Kind::Float(_), Node::Float(_)) => true,
        (Kind::String(_), Node::String(_)) => true,
        (Kind::Binary(_), Node::Binary(_)) => true,
        (Kind::Sequence(_) | Kind::SequenceFixed(_), Node::Sequence(_)) => true,
        (Kind::Mapping(_), Node::Mapping(_)) => true,
        _ => false,
    }
}

fn check_sequence(config: &Config, seq: &SequenceSchema, fixed: bool) -> Result<(), Error> {
    if fixed {
        if seq.min != seq.max {
            return Err(Error::SequenceFixedCount);
        }
    } else {
        if seq.min > seq.max {
            return Err(Error::BadMinMaxInSchema);
        }
        // A variable-length entry has no carrier for its own count when
        // nested directly in a variable-length sequence.
        if matches!(seq.entry.kind, Kind::Sequence(_)) {
            return Err(Error::SequenceInSequence);
        }
    }
    if let Some(default) = &seq.default {
        if default.len() < seq.min || default.len() > seq.max {
            return Err(Error::BadMinMaxInSchema);
        }
        for entry in default {
            if !node_matches(&seq.entry, entry) {
                return Err(Error::BadTypeInSchema);
            }
        }
    }
    check(config, &seq.entry)
}

/// Check one schema value and everything below it.
pub fn check(config: &Config, value: &Value) -> Result<(), Error> {
    match &value.kind {
        Kind::Int(int) => {
            check_width(value.data_size)?;
            if int.min > int.max {
                return Err(Error::BadMinMaxInSchema);
            }
        }
        Kind::Uint(uint) => {
            check_width(value.data_size)?;
            if uint.min > uint.max {
                return Err(Error::BadMinMaxInSchema);
            }
        }
        Kind::Bool(_) | Kind::Enum(_) | Kind::Flags(_) => {
            check_width(value.data_size)?;
        }
        Kind::Bitfield(bitfield) => {
            check_width(value.data_size)?;
            let capacity = (value.data_size * 8) as u32;
            for def in &bitfield.bits {
                if def.bits == 0
                    || def.offset.checked_add(def.bits).is_none()
                    || def.offset + def.bits > capacity
                {
                    return Err(Error::BadBitValueInSchema);
                }
            }
        }
        Kind::Float(float) => {
            if value.data_size != 4 && value.data_size != 8 {
                return Err(Error::InvalidDataSize);
            }
            if float.min > float.max {
                return Err(Error::BadMinMaxInSchema);
            }
        }
        Kind::String(string) => {
            if string.min > string.max {
                return Err(Error::BadMinMaxInSchema);
            }
            // A string stored in place must fit the storage with its
            // terminator.
            if !value.is_pointer()
                && value.data_size != 0
                && string.max != crate::schema::UNLIMITED
                && string.max > value.data_size - 1
            {
                return Err(Error::BadMinMaxInSchema);
            }
        }
        Kind::Binary(binary) => {
            if binary.min > binary.max {
                return Err(Error::BadMinMaxInSchema);
            }
        }
        Kind::Mapping(mapping) => {
            if let Some(discriminant) = &mapping.discriminant {
                if !config.flags.contains(ConfigFlags::EXTENDED) {
                    return Err(Error::BadConfig);
                }
                if !mapping.fields.iter().any(|f| &f.key == discriminant) {
                    return Err(Error::UnionDiscriminantNotFound);
                }
            }
            if let Some(default) = &mapping.default {
                if !matches!(default, Node::Mapping(_)) {
                    return Err(Error::BadTypeInSchema);
                }
            }
            for field in &mapping.fields {
                check(config, &field.value)?;
            }
        }
        Kind::Sequence(seq) => check_sequence(config, seq, false)?,
        Kind::SequenceFixed(seq) => check_sequence(config, seq, true)?,
        Kind::Ignore => {}
    }
    Ok(())
}

/// Check a top-level schema.
///
/// In addition to [`check`], the root value must carry the pointer flag:
/// the caller owns the root allocation, and a variable-length root
/// sequence needs somewhere to surface its entry count.
pub fn check_root(config: &Config, value: &Value) -> Result<(), Error> {
    if !value.is_pointer() {
        return Err(Error::TopLevelNonPointer);
    }
    check(config, value)
}
