//! # The Loader
//!
//! Drives an explicit frame stack over the incoming YAML event stream
//! and materialises the value tree the schema describes. Dispatch is a
//! match on `(top of stack, event)`; undefined combinations are hard
//! errors. The stack is heap-grown, so document depth never touches the
//! call stack.
//!
//! ## Frame bookkeeping
//!
//! - Mapping frames track the current field, a seen flag per field for
//!   duplicate and absence detection, and one entry slot per field so
//!   output lands in schema declaration order whatever the document
//!   order was.
//! - Sequence frames accumulate entries and enforce the count bounds.
//! - Flag and bitfield frames accumulate into an unsigned value.
//! - Ignore frames consume a subtree by depth counting without
//!   producing data.
//!
//! On failure the open frames are rendered as a backtrace on the log
//! surface, then the partially built tree is dropped.

mod scalar;

pub(crate) use scalar::{parse_f64, parse_i64, parse_u64};

use halyard_core::{codec, fold};
use halyard_core::{Config, ConfigFlags, Error, LogLevel, Node};
use halyard_schema::schema::{
    BitfieldSchema, FlagsSchema, Kind, MappingSchema, SequenceSchema, Value, ValueFlags,
};

use crate::copy;
use crate::event::{Event, Mark};
use crate::log;
use crate::replay::EventStream;

/// Load a tree from UTF-8 YAML text.
pub(crate) fn load_str(config: &Config, schema: &Value, text: &str) -> Result<Node, Error> {
    let mut loader = Loader {
        config,
        schema,
        events: EventStream::new(text),
        stack: Vec::new(),
        root: None,
        mark: Mark::default(),
    };
    match loader.run() {
        Ok(node) => Ok(node),
        Err(err) => {
            loader.log_backtrace();
            Err(err)
        }
    }
}

struct MappingFrame<'s> {
    schema: &'s Value,
    mapping: &'s MappingSchema,
    seen: Vec<bool>,
    entries: Vec<Option<Node>>,
    cur: Option<usize>,
    mark: Mark,
}

struct SequenceFrame<'s> {
    schema: &'s Value,
    seq: &'s SequenceSchema,
    fixed: bool,
    items: Vec<Node>,
    mark: Mark,
}

struct FlagsFrame<'s> {
    schema: &'s Value,
    flags: &'s FlagsSchema,
    accum: u64,
    mark: Mark,
}

struct BitfieldFrame<'s> {
    schema: &'s Value,
    bitfield: &'s BitfieldSchema,
    pending: Option<usize>,
    accum: u64,
    mark: Mark,
}

struct IgnoreFrame {
    depth: usize,
    mark: Mark,
}

enum Frame<'s> {
    Mapping(MappingFrame<'s>),
    Sequence(SequenceFrame<'s>),
    Flags(FlagsFrame<'s>),
    Bitfield(BitfieldFrame<'s>),
    Ignore(IgnoreFrame),
}

struct Loader<'s, 'input> {
    config: &'s Config,
    schema: &'s Value,
    events: EventStream<'input>,
    stack: Vec<Frame<'s>>,
    root: Option<Node>,
    mark: Mark,
}

impl<'s> Loader<'s, '_> {
    fn next(&mut self) -> Result<(Event, Mark), Error> {
        let (event, mark) = self.events.next_event(self.config)?;
        self.mark = mark;
        log::emit(
            self.config,
            LogLevel::Debug,
            &format!(
                "event: {} (line {} column {})",
                event.name(),
                mark.line,
                mark.col
            ),
        );
        Ok((event, mark))
    }

    fn unexpected(&self, message: &str, mark: Mark) -> Error {
        log::emit(
            self.config,
            LogLevel::Error,
            &format!("{message} (line {} column {})", mark.line, mark.col),
        );
        Error::UnexpectedEvent
    }

    fn run(&mut self) -> Result<Node, Error> {
        let (event, mark) = self.next()?;
        if event != Event::StreamStart {
            return Err(self.unexpected("expected stream start", mark));
        }
        let (event, mark) = self.next()?;
        if event != Event::DocumentStart {
            return Err(self.unexpected("expected document start", mark));
        }
        let (event, mark) = self.next()?;
        let schema = self.schema;
        self.begin_value(schema, event, mark)?;
        while !self.stack.is_empty() {
            let (event, mark) = self.next()?;
            self.step(event, mark)?;
        }
        let (event, mark) = self.next()?;
        if event != Event::DocumentEnd {
            return Err(self.unexpected("expected document end", mark));
        }
        self.drain_stream()?;
        self.root.take().ok_or(Error::Internal)
    }

    /// Consume anything after the first document, warning once.
    fn drain_stream(&mut self) -> Result<(), Error> {
        let mut warned = false;
        loop {
            let (event, _) = self.next()?;
            match event {
                Event::StreamEnd => return Ok(()),
                Event::DocumentStart if !warned => {
                    warned = true;
                    log::emit(
                        self.config,
                        LogLevel::Warning,
                        "ignoring additional document(s) after the first",
                    );
                }
                _ => {}
            }
        }
    }

    /// Start reading one value under `schema` from `event`.
    ///
    /// Scalars complete immediately; containers push a frame.
    fn begin_value(&mut self, schema: &'s Value, event: Event, mark: Mark) -> Result<(), Error> {
        match event {
            Event::Scalar { value: text, .. } => {
                if schema.allows_null() && schema.null_matches(&text) {
                    return self.commit(Node::Null);
                }
                match &schema.kind {
                    Kind::Ignore => self.commit_ignored(),
                    Kind::Mapping(_)
                    | Kind::Sequence(_)
                    | Kind::SequenceFixed(_)
                    | Kind::Flags(_)
                    | Kind::Bitfield(_) => Err(self.unexpected(
                        &format!("expected {} but found scalar", schema.kind.name()),
                        mark,
                    )),
                    _ => {
                        let node = scalar::decode(self.config, schema, &text)?;
                        self.commit(node)
                    }
                }
            }
            Event::SequenceStart { .. } => match &schema.kind {
                Kind::Sequence(seq) => {
                    self.stack.push(Frame::Sequence(SequenceFrame {
                        schema,
                        seq,
                        fixed: false,
                        items: Vec::new(),
                        mark,
                    }));
                    Ok(())
                }
                Kind::SequenceFixed(seq) => {
                    self.stack.push(Frame::Sequence(SequenceFrame {
                        schema,
                        seq,
                        fixed: true,
                        items: Vec::new(),
                        mark,
                    }));
                    Ok(())
                }
                Kind::Flags(flags) => {
                    self.stack.push(Frame::Flags(FlagsFrame {
                        schema,
                        flags,
                        accum: 0,
                        mark,
                    }));
                    Ok(())
                }
                Kind::Ignore => {
                    self.stack.push(Frame::Ignore(IgnoreFrame { depth: 1, mark }));
                    Ok(())
                }
                _ => Err(self.unexpected(
                    &format!("expected {} but found sequence", schema.kind.name()),
                    mark,
                )),
            },
            Event::MappingStart { .. } => match &schema.kind {
                Kind::Mapping(mapping) => {
                    let count = mapping.fields.len();
                    self.stack.push(Frame::Mapping(MappingFrame {
                        schema,
                        mapping,
                        seen: vec![false; count],
                        entries: vec![None; count],
                        cur: None,
                        mark,
                    }));
                    Ok(())
                }
                Kind::Bitfield(bitfield) => {
                    self.stack.push(Frame::Bitfield(BitfieldFrame {
                        schema,
                        bitfield,
                        pending: None,
                        accum: 0,
                        mark,
                    }));
                    Ok(())
                }
                Kind::Ignore => {
                    self.stack.push(Frame::Ignore(IgnoreFrame { depth: 1, mark }));
                    Ok(())
                }
                _ => Err(self.unexpected(
                    &format!("expected {} but found mapping", schema.kind.name()),
                    mark,
                )),
            },
            other => Err(self.unexpected(
                &format!("event '{}' cannot begin a value", other.name()),
                mark,
            )),
        }
    }

    /// Dispatch one event against the top of the stack.
    fn step(&mut self, event: Event, mark: Mark) -> Result<(), Error> {
        let frame = self.stack.pop().ok_or(Error::Internal)?;
        match frame {
            Frame::Mapping(m) => self.step_mapping(m, event, mark),
            Frame::Sequence(s) => self.step_sequence(s, event, mark),
            Frame::Flags(f) => self.step_flags(f, event, mark),
            Frame::Bitfield(b) => self.step_bitfield(b, event, mark),
            Frame::Ignore(i) => self.step_ignore(i, event, mark),
        }
    }

    fn step_mapping(
        &mut self,
        m: MappingFrame<'s>,
        event: Event,
        mark: Mark,
    ) -> Result<(), Error> {
        if let Some(idx) = m.cur {
            let schema = &m.mapping.fields[idx].value;
            self.stack.push(Frame::Mapping(m));
            return self.begin_value(schema, event, mark);
        }
        match event {
            Event::Scalar { value: key, .. } => self.mapping_key(m, &key, mark),
            Event::MappingEnd => self.finish_mapping(m),
            other => {
                let err = self.unexpected(
                    &format!("expected mapping key but found {}", other.name()),
                    mark,
                );
                self.stack.push(Frame::Mapping(m));
                Err(err)
            }
        }
    }

    fn mapping_key(&mut self, mut m: MappingFrame<'s>, key: &str, mark: Mark) -> Result<(), Error> {
        let config = self.config;
        let found = m.mapping.fields.iter().position(|field| {
            fold::str_eq(key, &field.key, field.value.name_case_sensitive(config))
        });
        match found {
            Some(idx) if matches!(m.mapping.fields[idx].value.kind, Kind::Ignore) => {
                m.seen[idx] = true;
                self.stack.push(Frame::Mapping(m));
                self.stack.push(Frame::Ignore(IgnoreFrame { depth: 0, mark }));
                Ok(())
            }
            Some(idx) => {
                if m.seen[idx] {
                    let err = self.unexpected(&format!("duplicate mapping key '{key}'"), mark);
                    self.stack.push(Frame::Mapping(m));
                    return Err(err);
                }
                m.seen[idx] = true;
                m.cur = Some(idx);
                self.stack.push(Frame::Mapping(m));
                Ok(())
            }
            None => {
                if config.flags.contains(ConfigFlags::IGNORE_UNKNOWN_KEYS) {
                    if config.flags.contains(ConfigFlags::IGNORED_KEY_WARNING) {
                        log::emit(
                            config,
                            LogLevel::Warning,
                            &format!(
                                "ignoring unknown key '{key}' (line {} column {})",
                                mark.line, mark.col
                            ),
                        );
                    }
                    self.stack.push(Frame::Mapping(m));
                    self.stack.push(Frame::Ignore(IgnoreFrame { depth: 0, mark }));
                    Ok(())
                } else {
                    log::emit(
                        config,
                        LogLevel::Error,
                        &format!(
                            "unknown mapping key '{key}' (line {} column {})",
                            mark.line, mark.col
                        ),
                    );
                    self.stack.push(Frame::Mapping(m));
                    Err(Error::InvalidKey)
                }
            }
        }
    }

    fn finish_mapping(&mut self, mut m: MappingFrame<'s>) -> Result<(), Error> {
        let config = self.config;
        // Required fields must have been seen; optional ones take their
        // defaults.
        for idx in 0..m.mapping.fields.len() {
            let field = &m.mapping.fields[idx];
            if m.seen[idx] || matches!(field.value.kind, Kind::Ignore) {
                continue;
            }
            if !field.value.flags.contains(ValueFlags::OPTIONAL) {
                log::emit(
                    config,
                    LogLevel::Error,
                    &format!("mapping field missing: '{}'", field.key),
                );
                self.stack.push(Frame::Mapping(m));
                return Err(Error::MappingFieldMissing);
            }
        }
        for idx in 0..m.mapping.fields.len() {
            let field = &m.mapping.fields[idx];
            if m.seen[idx] || matches!(field.value.kind, Kind::Ignore) {
                continue;
            }
            m.entries[idx] = Some(copy::default_value(config, &field.value)?);
        }
        let mut entries = Vec::with_capacity(m.mapping.fields.len());
        for (idx, field) in m.mapping.fields.iter().enumerate() {
            if matches!(field.value.kind, Kind::Ignore) {
                continue;
            }
            let node = m.entries[idx].take().ok_or(Error::Internal)?;
            entries.push((field.key.clone(), node));
        }
        let node = Node::Mapping(entries);
        if let Some(validator) = &m.mapping.validator {
            if !validator.check(m.schema, &node) {
                log::emit(config, LogLevel::Error, "mapping rejected by validator");
                return Err(Error::InvalidValue);
            }
        }
        self.commit(node)
    }

    fn step_sequence(
        &mut self,
        s: SequenceFrame<'s>,
        event: Event,
        mark: Mark,
    ) -> Result<(), Error> {
        match event {
            Event::SequenceEnd => self.finish_sequence(s),
            _ => {
                if s.items.len() >= s.seq.max {
                    let err = if s.fixed {
                        Error::SequenceFixedCount
                    } else {
                        Error::SequenceEntriesTooMany
                    };
                    log::emit(
                        self.config,
                        LogLevel::Error,
                        &format!(
                            "sequence entry {} exceeds maximum {} (line {} column {})",
                            s.items.len() + 1,
                            s.seq.max,
                            mark.line,
                            mark.col
                        ),
                    );
                    self.stack.push(Frame::Sequence(s));
                    return Err(err);
                }
                let entry = &*s.seq.entry;
                self.stack.push(Frame::Sequence(s));
                self.begin_value(entry, event, mark)
            }
        }
    }

    fn finish_sequence(&mut self, s: SequenceFrame<'s>) -> Result<(), Error> {
        let config = self.config;
        if s.fixed {
            if s.items.len() != s.seq.max {
                log::emit(
                    config,
                    LogLevel::Error,
                    &format!(
                        "fixed sequence has {} entries, wants {}",
                        s.items.len(),
                        s.seq.max
                    ),
                );
                self.stack.push(Frame::Sequence(s));
                return Err(Error::SequenceFixedCount);
            }
        } else if s.items.len() < s.seq.min {
            log::emit(
                config,
                LogLevel::Error,
                &format!(
                    "sequence has {} entries, wants at least {}",
                    s.items.len(),
                    s.seq.min
                ),
            );
            self.stack.push(Frame::Sequence(s));
            return Err(Error::SequenceEntriesTooFew);
        }
        if let Some(validator) = &s.seq.validator {
            if !validator.check(s.schema, &s.items) {
                log::emit(config, LogLevel::Error, "sequence rejected by validator");
                return Err(Error::InvalidValue);
            }
        }
        self.commit(Node::Sequence(s.items))
    }

    fn step_flags(&mut self, mut f: FlagsFrame<'s>, event: Event, mark: Mark) -> Result<(), Error> {
        match event {
            Event::Scalar { value: text, .. } => {
                let result = self.flags_entry(&mut f, &text, mark);
                self.stack.push(Frame::Flags(f));
                result
            }
            Event::SequenceEnd => self.finish_flags(f),
            other => {
                let err = self.unexpected(
                    &format!("expected flag name but found {}", other.name()),
                    mark,
                );
                self.stack.push(Frame::Flags(f));
                Err(err)
            }
        }
    }

    fn flags_entry(&self, f: &mut FlagsFrame<'s>, text: &str, mark: Mark) -> Result<(), Error> {
        let config = self.config;
        let sensitive = f.schema.name_case_sensitive(config);
        for item in &f.flags.items {
            if fold::str_eq(text, &item.name, sensitive) {
                f.accum |= item.value;
                return Ok(());
            }
        }
        if !f.schema.flags.contains(ValueFlags::STRICT) {
            if let Ok(value) = scalar::parse_u64(text) {
                f.accum |= value;
                return Ok(());
            }
        }
        let names: Vec<&str> = f.flags.items.iter().map(|i| i.name.as_str()).collect();
        log::emit(
            config,
            LogLevel::Error,
            &format!(
                "invalid flag '{text}' (line {} column {}); expected one of: {}",
                mark.line,
                mark.col,
                names.join(", ")
            ),
        );
        Err(Error::InvalidValue)
    }

    fn finish_flags(&mut self, f: FlagsFrame<'s>) -> Result<(), Error> {
        let config = self.config;
        if f.accum > codec::uint_max(f.schema.data_size)? {
            log::emit(
                config,
                LogLevel::Error,
                &format!(
                    "flag value {} does not fit {} byte(s)",
                    f.accum, f.schema.data_size
                ),
            );
            return Err(Error::InvalidValue);
        }
        if let Some(validator) = &f.flags.validator {
            if !validator.check(f.schema, f.accum) {
                log::emit(config, LogLevel::Error, "flag value rejected by validator");
                return Err(Error::InvalidValue);
            }
        }
        self.commit(Node::Uint(f.accum))
    }

    fn step_bitfield(
        &mut self,
        mut b: BitfieldFrame<'s>,
        event: Event,
        mark: Mark,
    ) -> Result<(), Error> {
        match event {
            Event::Scalar { value: text, .. } => {
                let result = self.bitfield_scalar(&mut b, &text, mark);
                self.stack.push(Frame::Bitfield(b));
                result
            }
            Event::MappingEnd if b.pending.is_none() => self.finish_bitfield(b),
            other => {
                let err = self.unexpected(
                    &format!("expected bitfield component but found {}", other.name()),
                    mark,
                );
                self.stack.push(Frame::Bitfield(b));
                Err(err)
            }
        }
    }

    fn bitfield_scalar(
        &self,
        b: &mut BitfieldFrame<'s>,
        text: &str,
        mark: Mark,
    ) -> Result<(), Error> {
        let config = self.config;
        match b.pending.take() {
            None => {
                let sensitive = b.schema.name_case_sensitive(config);
                let found = b
                    .bitfield
                    .bits
                    .iter()
                    .position(|def| fold::str_eq(text, &def.name, sensitive));
                match found {
                    Some(idx) => {
                        b.pending = Some(idx);
                        Ok(())
                    }
                    None => {
                        log::emit(
                            config,
                            LogLevel::Error,
                            &format!(
                                "unknown bitfield component '{text}' (line {} column {})",
                                mark.line, mark.col
                            ),
                        );
                        Err(Error::InvalidKey)
                    }
                }
            }
            Some(idx) => {
                let def = &b.bitfield.bits[idx];
                let value = scalar::parse_u64(text).map_err(|err| {
                    log::emit(
                        config,
                        LogLevel::Error,
                        &format!("invalid bitfield component value '{text}'"),
                    );
                    err
                })?;
                let mask = if def.bits >= 64 {
                    u64::MAX
                } else {
                    (1u64 << def.bits) - 1
                };
                if value > mask {
                    log::emit(
                        config,
                        LogLevel::Error,
                        &format!(
                            "bitfield component '{}' value {value} exceeds {mask}",
                            def.name
                        ),
                    );
                    return Err(Error::InvalidValue);
                }
                b.accum |= value << def.offset;
                Ok(())
            }
        }
    }

    fn finish_bitfield(&mut self, b: BitfieldFrame<'s>) -> Result<(), Error> {
        if let Some(validator) = &b.bitfield.validator {
            if !validator.check(b.schema, b.accum) {
                log::emit(
                    self.config,
                    LogLevel::Error,
                    "bitfield value rejected by validator",
                );
                return Err(Error::InvalidValue);
            }
        }
        self.commit(Node::Uint(b.accum))
    }

    fn step_ignore(&mut self, mut i: IgnoreFrame, event: Event, mark: Mark) -> Result<(), Error> {
        match event {
            Event::SequenceStart { .. } | Event::MappingStart { .. } => {
                i.depth += 1;
                self.stack.push(Frame::Ignore(i));
                Ok(())
            }
            Event::SequenceEnd | Event::MappingEnd => {
                if i.depth == 0 {
                    let err = self.unexpected("container end in ignored value", mark);
                    self.stack.push(Frame::Ignore(i));
                    return Err(err);
                }
                i.depth -= 1;
                if i.depth == 0 {
                    self.commit_ignored()
                } else {
                    self.stack.push(Frame::Ignore(i));
                    Ok(())
                }
            }
            Event::Scalar { .. } => {
                if i.depth == 0 {
                    self.commit_ignored()
                } else {
                    self.stack.push(Frame::Ignore(i));
                    Ok(())
                }
            }
            other => {
                let err = self.unexpected(
                    &format!("event '{}' in ignored content", other.name()),
                    mark,
                );
                self.stack.push(Frame::Ignore(i));
                Err(err)
            }
        }
    }

    /// Attach a finished value to whatever owns it.
    fn commit(&mut self, node: Node) -> Result<(), Error> {
        match self.stack.last_mut() {
            None => {
                self.root = Some(node);
                Ok(())
            }
            Some(Frame::Mapping(m)) => match m.cur.take() {
                Some(idx) => {
                    m.entries[idx] = Some(node);
                    Ok(())
                }
                None => Err(Error::Internal),
            },
            Some(Frame::Sequence(s)) => {
                s.items.push(node);
                Ok(())
            }
            _ => Err(Error::Internal),
        }
    }

    /// Note the completion of an ignored subtree, which produces no
    /// data.
    fn commit_ignored(&mut self) -> Result<(), Error> {
        match self.stack.last_mut() {
            None => {
                self.root = Some(Node::Null);
                Ok(())
            }
            Some(Frame::Mapping(m)) => {
                m.cur = None;
                Ok(())
            }
            Some(Frame::Sequence(_)) => Ok(()),
            _ => Err(Error::Internal),
        }
    }

    /// Render the open frames on the error log, outermost first.
    fn log_backtrace(&self) {
        if self.stack.is_empty() || !self.config.logs(LogLevel::Error) {
            return;
        }
        log::emit(
            self.config,
            LogLevel::Error,
            &format!(
                "load failed near line {} column {}; backtrace:",
                self.mark.line, self.mark.col
            ),
        );
        for frame in &self.stack {
            let line = match frame {
                Frame::Mapping(m) => match m.cur {
                    Some(idx) => format!(
                        "  in mapping field '{}' (mapping at line {} column {})",
                        m.mapping.fields[idx].key, m.mark.line, m.mark.col
                    ),
                    None => format!(
                        "  in mapping (line {} column {})",
                        m.mark.line, m.mark.col
                    ),
                },
                Frame::Sequence(s) => format!(
                    "  in sequence entry {} (sequence at line {} column {})",
                    s.items.len(),
                    s.mark.line,
                    s.mark.col
                ),
                Frame::Flags(f) => {
                    format!("  in flag sequence (line {} column {})", f.mark.line, f.mark.col)
                }
                Frame::Bitfield(b) => {
                    format!("  in bitfield (line {} column {})", b.mark.line, b.mark.col)
                }
                Frame::Ignore(i) => {
                    format!("  in ignored content (line {} column {})", i.mark.line, i.mark.col)
                }
            };
            log::emit(self.config, LogLevel::Error, &line);
        }
    }
}
