//! # Event Stream Types
//!
//! The internal YAML event model and the source adapter over the
//! upstream parser. The drivers never see parser types directly: events
//! arrive as [`Event`] with a [`Mark`] source position, and parser
//! failures surface as [`Error::EventSource`].
//!
//! Anchors arrive as dense numeric identifiers. The upstream parser
//! resolves anchor names when it meets an alias, and later definitions
//! shadow earlier ones there, so an identifier uniquely names one
//! recording.
//!
//! [`Error::EventSource`]: halyard_core::Error::EventSource

use halyard_core::{Config, Error, LogLevel};
use saphyr_parser::{Event as YamlEvent, Parser, ScanError, Span, StrInput, TScalarStyle};

use crate::log;

/// A position in the YAML source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Mark {
    /// One-based source line.
    pub line: usize,
    /// One-based source column.
    pub col: usize,
    /// Byte index into the source.
    pub index: usize,
}

/// How a scalar was presented in the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarStyle {
    /// Unquoted.
    Plain,
    /// Single-quoted.
    SingleQuoted,
    /// Double-quoted.
    DoubleQuoted,
    /// Literal block (`|`).
    Literal,
    /// Folded block (`>`).
    Folded,
}

/// One YAML event, with anchors resolved to numeric identifiers.
///
/// An `anchor` of zero means the node carries no anchor.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// Start of the event stream.
    StreamStart,
    /// End of the event stream.
    StreamEnd,
    /// Start of one document.
    DocumentStart,
    /// End of one document.
    DocumentEnd,
    /// Back-reference to an anchored node.
    Alias {
        /// Identifier of the referenced anchor.
        id: usize,
    },
    /// A scalar value.
    Scalar {
        /// The scalar text.
        value: String,
        /// Presentation style in the source.
        style: ScalarStyle,
        /// Anchor identifier, zero if unanchored.
        anchor: usize,
        /// Resolved tag, if the scalar carried one.
        tag: Option<String>,
    },
    /// Start of a sequence.
    SequenceStart {
        /// Anchor identifier, zero if unanchored.
        anchor: usize,
    },
    /// End of a sequence.
    SequenceEnd,
    /// Start of a mapping.
    MappingStart {
        /// Anchor identifier, zero if unanchored.
        anchor: usize,
    },
    /// End of a mapping.
    MappingEnd,
}

impl Event {
    /// Short event name for diagnostics.
    pub fn name(&self) -> &'static str {
        match self {
            Event::StreamStart => "stream start",
            Event::StreamEnd => "stream end",
            Event::DocumentStart => "document start",
            Event::DocumentEnd => "document end",
            Event::Alias { .. } => "alias",
            Event::Scalar { .. } => "scalar",
            Event::SequenceStart { .. } => "sequence start",
            Event::SequenceEnd => "sequence end",
            Event::MappingStart { .. } => "mapping start",
            Event::MappingEnd => "mapping end",
        }
    }
}

fn mark_of(span: &Span) -> Mark {
    Mark {
        line: span.start.line(),
        col: span.start.col(),
        index: span.start.index(),
    }
}

fn style_of(style: TScalarStyle) -> ScalarStyle {
    match style {
        TScalarStyle::SingleQuoted => ScalarStyle::SingleQuoted,
        TScalarStyle::DoubleQuoted => ScalarStyle::DoubleQuoted,
        TScalarStyle::Literal => ScalarStyle::Literal,
        TScalarStyle::Folded => ScalarStyle::Folded,
        _ => ScalarStyle::Plain,
    }
}

/// Pull-based adapter over the upstream parser.
pub struct Source<'input> {
    parser: Parser<StrInput<'input>>,
}

impl<'input> Source<'input> {
    /// Wrap a UTF-8 document.
    pub fn new(text: &'input str) -> Self {
        Self {
            parser: Parser::new_from_str(text),
        }
    }

    /// Pull the next event.
    ///
    /// Returns [`Error::EventSource`] when the parser reports a scan
    /// error or the stream ends short of a stream-end event.
    pub fn next_event(&mut self, config: &Config) -> Result<(Event, Mark), Error> {
        loop {
            match Iterator::next(&mut self.parser) {
                None => {
                    log::emit(
                        config,
                        LogLevel::Error,
                        "event source exhausted before stream end",
                    );
                    return Err(Error::EventSource);
                }
                Some(Err(err)) => {
                    log::emit(config, LogLevel::Error, &scan_error_text(&err));
                    return Err(Error::EventSource);
                }
                Some(Ok((event, span))) => {
                    let mark = mark_of(&span);
                    if let Some(event) = convert(event, &span) {
                        return Ok((event, mark));
                    }
                }
            }
        }
    }
}

fn scan_error_text(err: &ScanError) -> String {
    format!("event source error: {err}")
}

fn convert(event: YamlEvent, span: &Span) -> Option<Event> {
    Some(match event {
        YamlEvent::StreamStart => Event::StreamStart,
        YamlEvent::StreamEnd => Event::StreamEnd,
        YamlEvent::DocumentStart(_) => Event::DocumentStart,
        YamlEvent::DocumentEnd => Event::DocumentEnd,
        YamlEvent::Alias(id) => Event::Alias { id },
        YamlEvent::Scalar(value, style, anchor, tag) => {
            // The parser spells a missing value as a zero-width plain
            // `~`; surface it as the empty scalar it is in the source.
            let zero_width = span.start.index() == span.end.index();
            let value = if value == "~"
                && matches!(style, TScalarStyle::Plain)
                && zero_width
            {
                String::new()
            } else {
                value
            };
            Event::Scalar {
                value,
                style: style_of(style),
                anchor,
                tag: tag.map(|t| format!("{}{}", t.handle, t.suffix)),
            }
        }
        YamlEvent::SequenceStart(anchor, _) => Event::SequenceStart { anchor },
        YamlEvent::SequenceEnd => Event::SequenceEnd,
        YamlEvent::MappingStart(anchor, _) => Event::MappingStart { anchor },
        YamlEvent::MappingEnd => Event::MappingEnd,
        YamlEvent::Nothing => return None,
    })
}
