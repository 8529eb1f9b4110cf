//! # The Saver
//!
//! Walks a value tree under the schema's direction and emits the YAML
//! event sequence, mirror to the loader: an explicit frame stack over
//! mappings and sequences, scalars rendered inline. The input tree is
//! read-only throughout; nothing is freed or mutated.
//!
//! Mapping fields are emitted in schema declaration order. Scalars carry
//! an explicit tag only where the plain rendering would be ambiguous:
//! strings that would re-read as numbers, booleans or null take a
//! `!!str` tag, and binary values take `!!binary`.

use std::io::Write;

use halyard_core::{base64, Config, Error, LogLevel, Node};
use halyard_schema::schema::{
    Kind, MappingSchema, SequenceSchema, Value, ValueFlags,
};

use crate::emit::Emitter;
use crate::load::{parse_f64, parse_i64, parse_u64};
use crate::log;

/// Save `node` under `schema` into `out`.
pub(crate) fn save_to<W: Write>(
    config: &Config,
    schema: &Value,
    node: &Node,
    out: W,
) -> Result<(), Error> {
    let mut saver = Saver {
        config,
        emitter: Emitter::new(config, out),
        stack: Vec::new(),
    };
    saver.run(schema, node)
}

struct MappingFrame<'s, 'd> {
    mapping: &'s MappingSchema,
    entries: &'d [(String, Node)],
    idx: usize,
}

struct SequenceFrame<'s, 'd> {
    seq: &'s SequenceSchema,
    items: &'d [Node],
    idx: usize,
}

enum Frame<'s, 'd> {
    Mapping(MappingFrame<'s, 'd>),
    Sequence(SequenceFrame<'s, 'd>),
}

struct Saver<'s, W: Write> {
    config: &'s Config,
    emitter: Emitter<'s, W>,
    stack: Vec<Frame<'s, 's>>,
}

impl<'s, W: Write> Saver<'s, W> {
    fn run(&mut self, schema: &'s Value, node: &'s Node) -> Result<(), Error> {
        self.emitter.stream_start()?;
        self.emitter.document_start()?;
        self.begin(schema, node)?;
        while let Some(frame) = self.stack.pop() {
            match frame {
                Frame::Mapping(m) => self.step_mapping(m)?,
                Frame::Sequence(s) => self.step_sequence(s)?,
            }
        }
        self.emitter.document_end()?;
        self.emitter.stream_end()
    }

    fn mismatch(&self, schema: &Value, node: &Node) -> Error {
        log::emit(
            self.config,
            LogLevel::Error,
            &format!(
                "schema kind '{}' cannot save a {} node",
                schema.kind.name(),
                node.kind_name()
            ),
        );
        Error::BadTypeInSchema
    }

    /// Emit one value; containers push a frame.
    fn begin(&mut self, schema: &'s Value, node: &'s Node) -> Result<(), Error> {
        if node.is_null() {
            return self.emit_null(schema);
        }
        match (&schema.kind, node) {
            (Kind::Int(_), Node::Int(v)) => self.emitter.scalar(&v.to_string(), None),
            (Kind::Uint(_), Node::Uint(v)) => self.emitter.scalar(&v.to_string(), None),
            (Kind::Bool(_), Node::Bool(v)) => {
                self.emitter.scalar(if *v { "true" } else { "false" }, None)
            }
            (Kind::Float(_), Node::Float(v)) => {
                self.emitter.scalar(&render_float(*v), None)
            }
            (Kind::String(_), Node::String(s)) => {
                let tag = if needs_string_tag(s) { Some("str") } else { None };
                self.emitter.scalar(s, tag)
            }
            (Kind::Binary(_), Node::Binary(bytes)) => {
                self.emitter.scalar(&base64::encode(bytes), Some("binary"))
            }
            (Kind::Enum(en), Node::Int(v)) => {
                if let Some(item) = en.items.iter().find(|item| item.value == *v) {
                    return self.emitter.scalar(&item.name, None);
                }
                if schema.flags.contains(ValueFlags::STRICT) {
                    log::emit(
                        self.config,
                        LogLevel::Error,
                        &format!("value {v} has no enum name"),
                    );
                    return Err(Error::InvalidValue);
                }
                self.emitter.scalar(&v.to_string(), None)
            }
            (Kind::Flags(flags), Node::Uint(v)) => {
                self.emitter.sequence_start()?;
                let mut rest = *v;
                for item in &flags.items {
                    if item.value != 0 && rest & item.value == item.value {
                        self.emitter.scalar(&item.name, None)?;
                        rest &= !item.value;
                    }
                }
                if rest != 0 {
                    if schema.flags.contains(ValueFlags::STRICT) {
                        log::emit(
                            self.config,
                            LogLevel::Error,
                            &format!("flag bits {rest:#x} have no name"),
                        );
                        return Err(Error::InvalidValue);
                    }
                    self.emitter.scalar(&rest.to_string(), None)?;
                }
                self.emitter.sequence_end()
            }
            (Kind::Bitfield(bitfield), Node::Uint(v)) => {
                self.emitter.mapping_start()?;
                for def in &bitfield.bits {
                    let mask = if def.bits >= 64 {
                        u64::MAX
                    } else {
                        (1u64 << def.bits) - 1
                    };
                    let component = (v >> def.offset) & mask;
                    self.emitter.scalar(&def.name, None)?;
                    self.emitter.scalar(&component.to_string(), None)?;
                }
                self.emitter.mapping_end()
            }
            (Kind::Mapping(mapping), Node::Mapping(entries)) => {
                self.emitter.mapping_start()?;
                self.stack.push(Frame::Mapping(MappingFrame {
                    mapping,
                    entries,
                    idx: 0,
                }));
                Ok(())
            }
            (Kind::Sequence(seq), Node::Sequence(items)) => {
                if items.len() < seq.min {
                    return Err(Error::SequenceEntriesTooFew);
                }
                if items.len() > seq.max {
                    return Err(Error::SequenceEntriesTooMany);
                }
                self.emitter.sequence_start()?;
                self.stack
                    .push(Frame::Sequence(SequenceFrame { seq, items, idx: 0 }));
                Ok(())
            }
            (Kind::SequenceFixed(seq), Node::Sequence(items)) => {
                if items.len() != seq.max {
                    return Err(Error::SequenceFixedCount);
                }
                self.emitter.sequence_start()?;
                self.stack
                    .push(Frame::Sequence(SequenceFrame { seq, items, idx: 0 }));
                Ok(())
            }
            (Kind::Ignore, _) => Ok(()),
            (_, node) => Err(self.mismatch(schema, node)),
        }
    }

    fn emit_null(&mut self, schema: &Value) -> Result<(), Error> {
        if schema.flags.contains(ValueFlags::POINTER_NULL_STR) {
            self.emitter.scalar("null", None)
        } else if schema.flags.contains(ValueFlags::POINTER_NULL) {
            self.emitter.scalar("", None)
        } else {
            log::emit(
                self.config,
                LogLevel::Error,
                &format!("null data for a schema kind '{}' that forbids null", schema.kind.name()),
            );
            Err(Error::BadParamNullData)
        }
    }

    fn step_mapping(&mut self, mut m: MappingFrame<'s, 's>) -> Result<(), Error> {
        while m.idx < m.mapping.fields.len() {
            let field = &m.mapping.fields[m.idx];
            m.idx += 1;
            if matches!(field.value.kind, Kind::Ignore) {
                continue;
            }
            let entry = m.entries.iter().find(|(k, _)| k == &field.key);
            let optional = field.value.flags.contains(ValueFlags::OPTIONAL);
            match entry {
                None => {
                    if optional {
                        continue;
                    }
                    log::emit(
                        self.config,
                        LogLevel::Error,
                        &format!("mapping field missing: '{}'", field.key),
                    );
                    return Err(Error::MappingFieldMissing);
                }
                Some((_, value)) => {
                    if value.is_null() && optional && !field.value.allows_null() {
                        // Absent optional data is simply not emitted.
                        continue;
                    }
                    self.emitter.scalar(&field.key, None)?;
                    let schema = &m.mapping.fields[m.idx - 1].value;
                    self.stack.push(Frame::Mapping(m));
                    return self.begin(schema, value);
                }
            }
        }
        self.emitter.mapping_end()
    }

    fn step_sequence(&mut self, mut s: SequenceFrame<'s, 's>) -> Result<(), Error> {
        if s.idx < s.items.len() {
            let item = &s.items[s.idx];
            let entry = &*s.seq.entry;
            s.idx += 1;
            self.stack.push(Frame::Sequence(s));
            return self.begin(entry, item);
        }
        self.emitter.sequence_end()
    }
}

// ---------------------------------------------------------------------------
// Scalar presentation decisions
// ---------------------------------------------------------------------------

/// Round-trippable float rendering with the YAML special spellings.
fn render_float(v: f64) -> String {
    if v.is_nan() {
        return ".nan".to_string();
    }
    if v.is_infinite() {
        return if v > 0.0 { ".inf" } else { "-.inf" }.to_string();
    }
    if v == v.trunc() && v.abs() < 1e17 {
        return format!("{v:.1}");
    }
    format!("{v}")
}

/// Whether a plain rendering of `text` would re-read as something other
/// than a string.
fn needs_string_tag(text: &str) -> bool {
    if text.is_empty() {
        return true;
    }
    if parse_i64(text).is_ok() || parse_u64(text).is_ok() || parse_f64(text).is_ok() {
        return true;
    }
    if matches!(text, "~" | "null" | "Null" | "NULL") {
        return true;
    }
    let lowered = text.to_ascii_lowercase();
    matches!(
        lowered.as_str(),
        "true" | "false" | "yes" | "no" | "on" | "off"
    )
}
