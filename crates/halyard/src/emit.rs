//! # Block-Style YAML Emitter
//!
//! Renders the saver's event calls as UTF-8 block-style YAML into any
//! [`std::io::Write`], a file or a grown byte buffer. Documents open
//! with `---` and close with `...`; nesting indents by two spaces; empty
//! containers render as `[]` and `{}` on the owning line.
//!
//! Container openings are deferred until their first child arrives, so
//! the emitter knows whether to break the line or close the container
//! inline. Scalars are written plain where the YAML grammar allows and
//! fall back to single then double quoting.

use std::io::Write;

use halyard_core::{Config, Error, LogLevel};

use crate::log;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CtxKind {
    Sequence,
    Mapping,
}

struct Ctx {
    kind: CtxKind,
    indent: usize,
    /// Whether any child has been emitted yet.
    opened: bool,
    /// Whether the first child continues the current line.
    inline_first: bool,
    /// For mappings: whether the next scalar is a key.
    expect_key: bool,
}

/// Event-driven block emitter over a write handler.
pub(crate) struct Emitter<'a, W: Write> {
    config: &'a Config,
    out: W,
    stack: Vec<Ctx>,
    line_start: bool,
}

impl<'a, W: Write> Emitter<'a, W> {
    pub(crate) fn new(config: &'a Config, out: W) -> Self {
        Self {
            config,
            out,
            stack: Vec::new(),
            line_start: true,
        }
    }

    fn write(&mut self, text: &str) -> Result<(), Error> {
        if let Err(err) = self.out.write_all(text.as_bytes()) {
            log::emit(
                self.config,
                LogLevel::Error,
                &format!("event sink write failed: {err}"),
            );
            return Err(Error::EventSink);
        }
        if !text.is_empty() {
            self.line_start = text.ends_with('\n');
        }
        Ok(())
    }

    fn indent(&mut self, width: usize) -> Result<(), Error> {
        self.write(&" ".repeat(width))
    }

    pub(crate) fn stream_start(&mut self) -> Result<(), Error> {
        Ok(())
    }

    pub(crate) fn stream_end(&mut self) -> Result<(), Error> {
        if let Err(err) = self.out.flush() {
            log::emit(
                self.config,
                LogLevel::Error,
                &format!("event sink flush failed: {err}"),
            );
            return Err(Error::EventSink);
        }
        Ok(())
    }

    pub(crate) fn document_start(&mut self) -> Result<(), Error> {
        self.write("---")
    }

    pub(crate) fn document_end(&mut self) -> Result<(), Error> {
        if !self.line_start {
            self.write("\n")?;
        }
        self.write("...\n")
    }

    /// Resolve the top container's deferred opening.
    fn open_top(&mut self) -> Result<(), Error> {
        let Some(top) = self.stack.last_mut() else {
            return Ok(());
        };
        if top.opened {
            return Ok(());
        }
        top.opened = true;
        let inline = top.inline_first;
        if inline {
            self.write(" ")
        } else {
            self.write("\n")
        }
    }

    /// Emit one scalar: a mapping key, a mapping value, a sequence
    /// entry, or the document root.
    pub(crate) fn scalar(&mut self, text: &str, tag: Option<&str>) -> Result<(), Error> {
        let rendered = render_scalar(text, tag);
        let top = self.stack.last().map(|ctx| (ctx.kind, ctx.expect_key));
        match top {
            None => {
                // Root scalar on the document start line.
                if rendered.is_empty() {
                    self.write("\n")
                } else {
                    self.write(" ")?;
                    self.write(&rendered)?;
                    self.write("\n")
                }
            }
            Some((CtxKind::Mapping, true)) => {
                self.open_top()?;
                let indent = self.top_indent();
                if self.line_start {
                    self.indent(indent)?;
                }
                self.write(&rendered)?;
                self.write(":")?;
                self.set_expect_key(false);
                Ok(())
            }
            Some((CtxKind::Mapping, false)) => {
                if rendered.is_empty() {
                    self.write("\n")?;
                } else {
                    self.write(" ")?;
                    self.write(&rendered)?;
                    self.write("\n")?;
                }
                self.set_expect_key(true);
                Ok(())
            }
            Some((CtxKind::Sequence, _)) => {
                self.open_top()?;
                let indent = self.top_indent();
                if self.line_start {
                    self.indent(indent)?;
                }
                if rendered.is_empty() {
                    self.write("-\n")
                } else {
                    self.write("- ")?;
                    self.write(&rendered)?;
                    self.write("\n")
                }
            }
        }
    }

    fn top_indent(&self) -> usize {
        self.stack.last().map_or(0, |ctx| ctx.indent)
    }

    fn set_expect_key(&mut self, value: bool) {
        if let Some(ctx) = self.stack.last_mut() {
            ctx.expect_key = value;
        }
    }

    pub(crate) fn sequence_start(&mut self) -> Result<(), Error> {
        self.container_start(CtxKind::Sequence)
    }

    pub(crate) fn mapping_start(&mut self) -> Result<(), Error> {
        self.container_start(CtxKind::Mapping)
    }

    fn container_start(&mut self, kind: CtxKind) -> Result<(), Error> {
        enum Parent {
            Root,
            MapValue { indent: usize },
            SeqItem { indent: usize },
        }
        let parent = match self.stack.last() {
            None => Parent::Root,
            Some(ctx) => match ctx.kind {
                CtxKind::Mapping if !ctx.expect_key => Parent::MapValue { indent: ctx.indent },
                CtxKind::Mapping => {
                    // Containers as mapping keys are not produced by the
                    // saver.
                    return Err(Error::Internal);
                }
                CtxKind::Sequence => Parent::SeqItem { indent: ctx.indent },
            },
        };
        match parent {
            Parent::Root => {
                self.push_ctx(kind, 0, false);
            }
            Parent::MapValue { indent } => {
                self.set_expect_key(true);
                self.push_ctx(kind, indent + 2, false);
            }
            Parent::SeqItem { indent } => {
                self.open_top()?;
                if self.line_start {
                    self.indent(indent)?;
                }
                self.write("-")?;
                self.push_ctx(kind, indent + 2, true);
            }
        }
        Ok(())
    }

    fn push_ctx(&mut self, kind: CtxKind, indent: usize, inline_first: bool) {
        self.stack.push(Ctx {
            kind,
            indent,
            opened: false,
            inline_first,
            expect_key: true,
        });
    }

    pub(crate) fn sequence_end(&mut self) -> Result<(), Error> {
        self.container_end(CtxKind::Sequence)
    }

    pub(crate) fn mapping_end(&mut self) -> Result<(), Error> {
        self.container_end(CtxKind::Mapping)
    }

    fn container_end(&mut self, kind: CtxKind) -> Result<(), Error> {
        let Some(ctx) = self.stack.pop() else {
            return Err(Error::Internal);
        };
        if ctx.kind != kind {
            return Err(Error::Internal);
        }
        if !ctx.opened {
            // Nothing was emitted; close inline on the owning line.
            let empty = match kind {
                CtxKind::Sequence => " []\n",
                CtxKind::Mapping => " {}\n",
            };
            self.write(empty)?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Scalar presentation
// ---------------------------------------------------------------------------

fn plain_safe(text: &str) -> bool {
    if text.is_empty() {
        return false;
    }
    if text.starts_with(' ') || text.ends_with(' ') {
        return false;
    }
    let mut chars = text.chars();
    let first = chars.next().unwrap_or(' ');
    if "[]{}#&*!|>'\"%@`,".contains(first) {
        return false;
    }
    if matches!(first, '-' | '?' | ':') {
        let second = text.chars().nth(1);
        if second.is_none() || second == Some(' ') {
            return false;
        }
    }
    if text.contains(": ") || text.ends_with(':') {
        return false;
    }
    if text.contains(" #") {
        return false;
    }
    !text.chars().any(|c| c.is_control() || c == '\t')
}

fn single_quotable(text: &str) -> bool {
    !text.chars().any(|c| c.is_control())
}

fn double_quote(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('"');
    for c in text.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            c if c.is_control() => {
                out.push_str(&format!("\\x{:02x}", c as u32));
            }
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

fn render_scalar(text: &str, tag: Option<&str>) -> String {
    let body = if text.is_empty() {
        if tag.is_some() {
            "''".to_string()
        } else {
            String::new()
        }
    } else if plain_safe(text) {
        text.to_string()
    } else if single_quotable(text) {
        format!("'{}'", text.replace('\'', "''"))
    } else {
        double_quote(text)
    };
    match tag {
        Some(tag) => format!("!!{tag} {body}"),
        None => body,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_emitter(f: impl FnOnce(&mut Emitter<'_, &mut Vec<u8>>)) -> String {
        let cfg = Config::new();
        let mut buf = Vec::new();
        let mut emitter = Emitter::new(&cfg, &mut buf);
        f(&mut emitter);
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn test_root_scalar() {
        let text = with_emitter(|e| {
            e.stream_start().unwrap();
            e.document_start().unwrap();
            e.scalar("7", None).unwrap();
            e.document_end().unwrap();
            e.stream_end().unwrap();
        });
        assert_eq!(text, "--- 7\n...\n");
    }

    #[test]
    fn test_flat_mapping() {
        let text = with_emitter(|e| {
            e.document_start().unwrap();
            e.mapping_start().unwrap();
            e.scalar("a", None).unwrap();
            e.scalar("7", None).unwrap();
            e.scalar("b", None).unwrap();
            e.scalar("8", None).unwrap();
            e.mapping_end().unwrap();
            e.document_end().unwrap();
        });
        assert_eq!(text, "---\na: 7\nb: 8\n...\n");
    }

    #[test]
    fn test_nested_sequence_under_key() {
        let text = with_emitter(|e| {
            e.document_start().unwrap();
            e.mapping_start().unwrap();
            e.scalar("xs", None).unwrap();
            e.sequence_start().unwrap();
            e.scalar("1", None).unwrap();
            e.scalar("2", None).unwrap();
            e.sequence_end().unwrap();
            e.mapping_end().unwrap();
            e.document_end().unwrap();
        });
        assert_eq!(text, "---\nxs:\n  - 1\n  - 2\n...\n");
    }

    #[test]
    fn test_sequence_of_mappings_is_compact() {
        let text = with_emitter(|e| {
            e.document_start().unwrap();
            e.sequence_start().unwrap();
            e.mapping_start().unwrap();
            e.scalar("name", None).unwrap();
            e.scalar("rope", None).unwrap();
            e.mapping_end().unwrap();
            e.sequence_end().unwrap();
            e.document_end().unwrap();
        });
        assert_eq!(text, "---\n- name: rope\n...\n");
    }

    #[test]
    fn test_empty_containers() {
        let text = with_emitter(|e| {
            e.document_start().unwrap();
            e.mapping_start().unwrap();
            e.scalar("xs", None).unwrap();
            e.sequence_start().unwrap();
            e.sequence_end().unwrap();
            e.scalar("m", None).unwrap();
            e.mapping_start().unwrap();
            e.mapping_end().unwrap();
            e.mapping_end().unwrap();
            e.document_end().unwrap();
        });
        assert_eq!(text, "---\nxs: []\nm: {}\n...\n");
    }

    #[test]
    fn test_tagged_scalar() {
        assert_eq!(render_scalar("123", Some("str")), "!!str 123");
        assert_eq!(render_scalar("", Some("str")), "!!str ''");
    }

    #[test]
    fn test_quoting() {
        assert_eq!(render_scalar("plain", None), "plain");
        assert_eq!(render_scalar("-1", None), "-1");
        assert_eq!(render_scalar("a: b", None), "'a: b'");
        assert_eq!(render_scalar("it's", None), "'it''s'");
        assert_eq!(render_scalar("line\nbreak", None), "\"line\\nbreak\"");
        assert_eq!(render_scalar("#hash", None), "'#hash'");
    }
}
