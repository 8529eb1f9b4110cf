//! # Fixed-Layout Record Boundary
//!
//! Materialises a value tree into a foreign fixed-layout byte record, and
//! reads one back, using the schema's offsets and widths. This is the only
//! place `Field::offset`, `Field::count_offset`, `Field::count_size` and
//! in-place string limits are interpreted; tree-shaped operations carry
//! counts inside their collections.
//!
//! The boundary covers in-place data only. A value behind an owning
//! indirection has no representation inside a flat record, so any pointer
//! flag is rejected here; the tree API handles those shapes.
//!
//! Integers pass through the byte codec, so a record written on a
//! little-endian host and one written on a big-endian host each read back
//! to the same tree on their own host.

use halyard_core::codec;
use halyard_core::{Error, Node};
use tracing::debug;

use crate::schema::{Field, Kind, Value, UNLIMITED};

/// Size in bytes of the region a value occupies inside a record.
pub fn region_size(schema: &Value) -> Result<usize, Error> {
    if schema.is_pointer() {
        return Err(Error::BadTypeInSchema);
    }
    match &schema.kind {
        Kind::Int(_)
        | Kind::Uint(_)
        | Kind::Bool(_)
        | Kind::Enum(_)
        | Kind::Flags(_)
        | Kind::Bitfield(_)
        | Kind::Float(_)
        | Kind::String(_)
        | Kind::Mapping(_) => {
            if schema.data_size == 0 {
                return Err(Error::InvalidDataSize);
            }
            Ok(schema.data_size)
        }
        Kind::Sequence(seq) | Kind::SequenceFixed(seq) => {
            if seq.max == UNLIMITED {
                return Err(Error::BadParamSeqCount);
            }
            if schema.data_size == 0 {
                return Err(Error::InvalidDataSize);
            }
            schema
                .data_size
                .checked_mul(seq.max)
                .ok_or(Error::BadParamSeqCount)
        }
        Kind::Binary(_) | Kind::Ignore => Err(Error::BadTypeInSchema),
    }
}

fn region(buf: &[u8], offset: usize, size: usize) -> Result<&[u8], Error> {
    let end = offset.checked_add(size).ok_or(Error::BadParamNullData)?;
    buf.get(offset..end).ok_or(Error::BadParamNullData)
}

fn region_mut(buf: &mut [u8], offset: usize, size: usize) -> Result<&mut [u8], Error> {
    let end = offset.checked_add(size).ok_or(Error::BadParamNullData)?;
    buf.get_mut(offset..end).ok_or(Error::BadParamNullData)
}

// ---------------------------------------------------------------------------
// Writing
// ---------------------------------------------------------------------------

fn write_value(schema: &Value, node: &Node, out: &mut [u8]) -> Result<(), Error> {
    if schema.is_pointer() {
        return Err(Error::BadTypeInSchema);
    }
    if node.is_null() {
        return Err(Error::BadParamNullData);
    }
    match (&schema.kind, node) {
        (Kind::Int(_) | Kind::Enum(_), Node::Int(v)) => codec::write_int(*v, out),
        (Kind::Uint(_) | Kind::Flags(_) | Kind::Bitfield(_), Node::Uint(v)) => {
            codec::write_uint(*v, out)
        }
        (Kind::Bool(_), Node::Bool(v)) => codec::write_uint(u64::from(*v), out),
        (Kind::Float(_), Node::Float(v)) => match out.len() {
            4 => {
                out.copy_from_slice(&(*v as f32).to_ne_bytes());
                Ok(())
            }
            8 => {
                out.copy_from_slice(&v.to_ne_bytes());
                Ok(())
            }
            _ => Err(Error::InvalidDataSize),
        },
        (Kind::String(_), Node::String(s)) => {
            // Content plus terminator must fit the region.
            if s.len() + 1 > out.len() {
                return Err(Error::StringTooLong);
            }
            out[..s.len()].copy_from_slice(s.as_bytes());
            out[s.len()] = 0;
            Ok(())
        }
        (Kind::SequenceFixed(seq), Node::Sequence(items)) => {
            if items.len() != seq.max {
                return Err(Error::SequenceFixedCount);
            }
            write_entries(schema, items, out)
        }
        (Kind::Sequence(seq), Node::Sequence(items)) => {
            if items.len() > seq.max {
                return Err(Error::SequenceEntriesTooMany);
            }
            if items.len() < seq.min {
                return Err(Error::SequenceEntriesTooFew);
            }
            write_entries(schema, items, out)
        }
        (Kind::Mapping(_), Node::Mapping(_)) => write_mapping(schema, node, out),
        _ => Err(Error::BadTypeInSchema),
    }
}

fn write_entries(schema: &Value, items: &[Node], out: &mut [u8]) -> Result<(), Error> {
    let (Kind::Sequence(seq) | Kind::SequenceFixed(seq)) = &schema.kind else {
        return Err(Error::Internal);
    };
    let stride = schema.data_size;
    if stride == 0 {
        return Err(Error::InvalidDataSize);
    }
    for (i, item) in items.iter().enumerate() {
        let out = region_mut(out, i * stride, stride)?;
        write_value(&seq.entry, item, out)?;
    }
    Ok(())
}

fn write_mapping(schema: &Value, node: &Node, out: &mut [u8]) -> Result<(), Error> {
    let Kind::Mapping(mapping) = &schema.kind else {
        return Err(Error::Internal);
    };
    let entries = node.as_mapping().ok_or(Error::BadTypeInSchema)?;
    for field in &mapping.fields {
        if matches!(field.value.kind, Kind::Ignore) {
            continue;
        }
        let value = entries
            .iter()
            .find(|(k, _)| k == &field.key)
            .map(|(_, v)| v)
            .ok_or(Error::MappingFieldMissing)?;
        write_field(field, value, out)?;
    }
    Ok(())
}

fn write_field(field: &Field, value: &Node, out: &mut [u8]) -> Result<(), Error> {
    let size = region_size(&field.value)?;
    if let Kind::Sequence(_) = field.value.kind {
        // The entry count lives elsewhere in the record, located by the
        // field's count carrier.
        if field.count_size == 0 {
            return Err(Error::BadParamSeqCount);
        }
        let items = value.as_sequence().ok_or(Error::BadTypeInSchema)?;
        let carrier = region_mut(out, field.count_offset, field.count_size)?;
        codec::write_uint(items.len() as u64, carrier)?;
    }
    write_value(&field.value, value, region_mut(out, field.offset, size)?)
}

/// Materialise `node` into the byte record `out`.
///
/// The record is zero-filled first so padding bytes are deterministic.
/// The schema must describe in-place storage throughout; a top-level
/// variable-length sequence has no count carrier here and is rejected.
pub fn write_record(schema: &Value, node: &Node, out: &mut [u8]) -> Result<(), Error> {
    if matches!(schema.kind, Kind::Sequence(_)) {
        return Err(Error::TopLevelNonPointer);
    }
    let size = region_size(schema)?;
    if out.len() < size {
        return Err(Error::BadParamNullData);
    }
    out.fill(0);
    write_value(schema, node, &mut out[..size])?;
    debug!(bytes = size, "record written");
    Ok(())
}

// ---------------------------------------------------------------------------
// Reading
// ---------------------------------------------------------------------------

fn read_value(schema: &Value, buf: &[u8]) -> Result<Node, Error> {
    if schema.is_pointer() {
        return Err(Error::BadTypeInSchema);
    }
    match &schema.kind {
        Kind::Int(_) | Kind::Enum(_) => Ok(Node::Int(codec::read_int(buf)?)),
        Kind::Uint(_) | Kind::Flags(_) | Kind::Bitfield(_) => {
            Ok(Node::Uint(codec::read_uint(buf)?))
        }
        Kind::Bool(_) => Ok(Node::Bool(codec::read_uint(buf)? != 0)),
        Kind::Float(_) => match buf.len() {
            4 => {
                let mut bytes = [0u8; 4];
                bytes.copy_from_slice(buf);
                Ok(Node::Float(f64::from(f32::from_ne_bytes(bytes))))
            }
            8 => {
                let mut bytes = [0u8; 8];
                bytes.copy_from_slice(buf);
                Ok(Node::Float(f64::from_ne_bytes(bytes)))
            }
            _ => Err(Error::InvalidDataSize),
        },
        Kind::String(string) => {
            let end = buf
                .iter()
                .position(|&b| b == 0)
                .ok_or(Error::StringTooLong)?;
            let text =
                std::str::from_utf8(&buf[..end]).map_err(|_| Error::InvalidValue)?;
            if text.len() < string.min {
                return Err(Error::StringTooShort);
            }
            Ok(Node::String(text.to_string()))
        }
        Kind::SequenceFixed(seq) => read_entries(schema, seq.max, buf),
        Kind::Sequence(_) => Err(Error::BadParamSeqCount),
        Kind::Mapping(mapping) => {
            let mut entries = Vec::with_capacity(mapping.fields.len());
            for field in &mapping.fields {
                if matches!(field.value.kind, Kind::Ignore) {
                    continue;
                }
                entries.push((field.key.clone(), read_field(field, buf)?));
            }
            Ok(Node::Mapping(entries))
        }
        Kind::Binary(_) | Kind::Ignore => Err(Error::BadTypeInSchema),
    }
}

fn read_entries(schema: &Value, count: usize, buf: &[u8]) -> Result<Node, Error> {
    let (Kind::Sequence(seq) | Kind::SequenceFixed(seq)) = &schema.kind else {
        return Err(Error::Internal);
    };
    let stride = schema.data_size;
    if stride == 0 {
        return Err(Error::InvalidDataSize);
    }
    let mut items = Vec::with_capacity(count);
    for i in 0..count {
        items.push(read_value(&seq.entry, region(buf, i * stride, stride)?)?);
    }
    Ok(Node::Sequence(items))
}

fn read_field(field: &Field, buf: &[u8]) -> Result<Node, Error> {
    let size = region_size(&field.value)?;
    if let Kind::Sequence(seq) = &field.value.kind {
        if field.count_size == 0 {
            return Err(Error::BadParamSeqCount);
        }
        let carrier = region(buf, field.count_offset, field.count_size)?;
        let count = codec::read_uint(carrier)? as usize;
        if count > seq.max {
            return Err(Error::SequenceEntriesTooMany);
        }
        if count < seq.min {
            return Err(Error::SequenceEntriesTooFew);
        }
        return read_entries(&field.value, count, region(buf, field.offset, size)?);
    }
    read_value(&field.value, region(buf, field.offset, size)?)
}

/// Read a tree back from the byte record `buf`.
pub fn read_record(schema: &Value, buf: &[u8]) -> Result<Node, Error> {
    if matches!(schema.kind, Kind::Sequence(_)) {
        return Err(Error::TopLevelNonPointer);
    }
    let size = region_size(schema)?;
    if buf.len() < size {
        return Err(Error::BadParamNullData);
    }
    read_value(schema, &buf[..size])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Field;

    fn pair_schema() -> Value {
        Value::mapping(vec![
            Field::new("a", Value::uint(4)).at(0),
            Field::new("b", Value::uint(4)).at(4),
        ])
        .sized(8)
    }

    fn pair_node(a: u64, b: u64) -> Node {
        Node::Mapping(vec![
            ("a".to_string(), Node::Uint(a)),
            ("b".to_string(), Node::Uint(b)),
        ])
    }

    #[test]
    fn test_two_field_roundtrip() {
        let schema = pair_schema();
        let node = pair_node(7, 8);
        let mut buf = [0u8; 8];
        write_record(&schema, &node, &mut buf).unwrap();
        assert_eq!(read_record(&schema, &buf).unwrap(), node);
    }

    #[test]
    fn test_bitfield_packing() {
        let schema = Value::bitfield(1, &[("x", 0, 3), ("y", 3, 5)]);
        let mut buf = [0u8; 1];
        write_record(&schema, &Node::Uint((17 << 3) | 5), &mut buf).unwrap();
        assert_eq!(buf[0], 141);
    }

    #[test]
    fn test_signed_narrow_field() {
        let schema = Value::int(2);
        let mut buf = [0u8; 2];
        write_record(&schema, &Node::Int(-2), &mut buf).unwrap();
        assert_eq!(read_record(&schema, &buf).unwrap(), Node::Int(-2));
    }

    #[test]
    fn test_inplace_string() {
        let schema = Value::string_bounded(0, 7).sized(8);
        let mut buf = [0xFFu8; 8];
        write_record(&schema, &Node::String("hi".into()), &mut buf).unwrap();
        assert_eq!(&buf[..3], b"hi\0");
        assert_eq!(
            read_record(&schema, &buf).unwrap(),
            Node::String("hi".into())
        );
    }

    #[test]
    fn test_inplace_string_overflow() {
        let schema = Value::string().sized(4);
        let mut buf = [0u8; 4];
        assert_eq!(
            write_record(&schema, &Node::String("toolong".into()), &mut buf),
            Err(Error::StringTooLong)
        );
    }

    #[test]
    fn test_fixed_sequence_region() {
        let schema = Value::sequence_fixed(Value::int(4), 3);
        let node = Node::Sequence(vec![Node::Int(1), Node::Int(2), Node::Int(3)]);
        let mut buf = [0u8; 12];
        write_record(&schema, &node, &mut buf).unwrap();
        assert_eq!(read_record(&schema, &buf).unwrap(), node);
    }

    #[test]
    fn test_variable_sequence_with_carrier() {
        // Record: u8 count at offset 0, up to four u16 entries at offset 2.
        let schema = Value::mapping(vec![Field::new(
            "vals",
            Value::sequence(Value::uint(2), 0, 4),
        )
        .at(2)
        .counted(0, 1)])
        .sized(10);
        let node = Node::Mapping(vec![(
            "vals".to_string(),
            Node::Sequence(vec![Node::Uint(10), Node::Uint(20)]),
        )]);
        let mut buf = [0u8; 10];
        write_record(&schema, &node, &mut buf).unwrap();
        assert_eq!(buf[0], 2);
        assert_eq!(read_record(&schema, &buf).unwrap(), node);
    }

    #[test]
    fn test_variable_sequence_without_carrier() {
        let schema = Value::mapping(vec![Field::new(
            "vals",
            Value::sequence(Value::uint(2), 0, 4),
        )
        .at(2)])
        .sized(10);
        let node = Node::Mapping(vec![(
            "vals".to_string(),
            Node::Sequence(vec![Node::Uint(10)]),
        )]);
        let mut buf = [0u8; 10];
        assert_eq!(
            write_record(&schema, &node, &mut buf),
            Err(Error::BadParamSeqCount)
        );
    }

    #[test]
    fn test_pointer_rejected() {
        let schema = pair_schema().pointer();
        let mut buf = [0u8; 8];
        assert_eq!(
            write_record(&schema, &pair_node(1, 2), &mut buf),
            Err(Error::BadTypeInSchema)
        );
    }

    #[test]
    fn test_top_level_variable_sequence_rejected() {
        let schema = Value::sequence(Value::uint(2), 0, 4);
        let mut buf = [0u8; 8];
        assert_eq!(
            write_record(&schema, &Node::Sequence(vec![]), &mut buf),
            Err(Error::TopLevelNonPointer)
        );
    }

    #[test]
    fn test_undersized_buffer() {
        let schema = pair_schema();
        let mut buf = [0u8; 4];
        assert_eq!(
            write_record(&schema, &pair_node(1, 2), &mut buf),
            Err(Error::BadParamNullData)
        );
    }

    mod properties {
        use proptest::prelude::*;

        use super::*;

        proptest! {
            #[test]
            fn prop_record_roundtrip(a: u32, b: u32) {
                let schema = pair_schema();
                let node = pair_node(u64::from(a), u64::from(b));
                let mut buf = [0u8; 8];
                write_record(&schema, &node, &mut buf).unwrap();
                prop_assert_eq!(read_record(&schema, &buf).unwrap(), node);
            }

            #[test]
            fn prop_narrow_int_roundtrip(v in -32768i64..=32767) {
                let schema = Value::int(2);
                let mut buf = [0u8; 2];
                write_record(&schema, &Node::Int(v), &mut buf).unwrap();
                prop_assert_eq!(read_record(&schema, &buf).unwrap(), Node::Int(v));
            }
        }
    }
}
