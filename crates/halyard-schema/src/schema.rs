//! # Schema Model
//!
//! The static description of a host data shape that load and save
//! interpret. A [`Value`] describes one YAML value position; a [`Field`]
//! binds a mapping key to a value and to a location inside a foreign
//! fixed-layout record; [`Kind`] is the closed sum of value kinds with
//! their kind-specific payloads.
//!
//! ## Conventions
//!
//! - Validators are closures stored in the schema; host state travels
//!   inside the closure capture, so no opaque context pointer exists.
//! - Default subtrees for mappings and sequences are ordinary [`Node`]
//!   values; the deep-copy engine clones them into place when an optional
//!   field is absent.
//! - `data_size` is the width in bytes of the host representation: the
//!   integer or float width for scalars, the record size for mappings,
//!   and the entry stride for sequences. Tree-shaped operations only
//!   consult scalar widths; the record layout boundary consults all of
//!   them.

use std::fmt;
use std::sync::Arc;

use bitflags::bitflags;
use halyard_core::{Config, ConfigFlags, Node};

/// Sentinel for an unbounded sequence or string maximum.
pub const UNLIMITED: usize = usize::MAX;

bitflags! {
    /// Flags modifying how a [`Value`] is stored and compared.
    ///
    /// A value with none of the pointer flags is held in place inside its
    /// parent record.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct ValueFlags: u32 {
        /// Value held behind an owning indirection.
        const POINTER = 1 << 0;
        /// Like `POINTER`, and an empty scalar loads as null.
        const POINTER_NULL = (1 << 1) | (1 << 0);
        /// Like `POINTER_NULL`, and the scalars `~`, `null`, `Null` and
        /// `NULL` also load as null.
        const POINTER_NULL_STR = (1 << 2) | (1 << 1) | (1 << 0);
        /// The mapping field may be absent from the document.
        const OPTIONAL = 1 << 3;
        /// No numeric fallback and no range widening for enums, flag
        /// sets and floats.
        const STRICT = 1 << 4;
        /// Compare names for this value case-sensitively, overriding the
        /// configuration.
        const CASE_SENSITIVE = 1 << 5;
        /// Compare names for this value case-insensitively, overriding
        /// the configuration.
        const CASE_INSENSITIVE = 1 << 6;
    }
}

// ---------------------------------------------------------------------------
// Validator closures
// ---------------------------------------------------------------------------

/// Predicate over a decoded signed integer or enum value.
#[derive(Clone)]
pub struct IntValidator(Arc<dyn Fn(&Value, i64) -> bool + Send + Sync>);

/// Predicate over a decoded unsigned integer, flag set or bitfield value.
#[derive(Clone)]
pub struct UintValidator(Arc<dyn Fn(&Value, u64) -> bool + Send + Sync>);

/// Predicate over a decoded float value.
#[derive(Clone)]
pub struct FloatValidator(Arc<dyn Fn(&Value, f64) -> bool + Send + Sync>);

/// Predicate over a decoded string value.
#[derive(Clone)]
pub struct StringValidator(Arc<dyn Fn(&Value, &str) -> bool + Send + Sync>);

/// Predicate over a completed mapping node.
#[derive(Clone)]
pub struct MappingValidator(Arc<dyn Fn(&Value, &Node) -> bool + Send + Sync>);

/// Predicate over completed sequence entries.
#[derive(Clone)]
pub struct SequenceValidator(Arc<dyn Fn(&Value, &[Node]) -> bool + Send + Sync>);

macro_rules! validator_impl {
    ($name:ident, owned $arg:ty) => {
        impl $name {
            /// Wrap a predicate.
            pub fn new<F>(f: F) -> Self
            where
                F: Fn(&Value, $arg) -> bool + Send + Sync + 'static,
            {
                Self(Arc::new(f))
            }

            /// Run the predicate.
            pub fn check(&self, schema: &Value, value: $arg) -> bool {
                (self.0)(schema, value)
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(concat!(stringify!($name), "(..)"))
            }
        }
    };
    ($name:ident, borrowed $arg:ty) => {
        impl $name {
            /// Wrap a predicate.
            pub fn new<F>(f: F) -> Self
            where
                F: for<'a> Fn(&Value, &'a $arg) -> bool + Send + Sync + 'static,
            {
                Self(Arc::new(f))
            }

            /// Run the predicate.
            pub fn check(&self, schema: &Value, value: &$arg) -> bool {
                (self.0)(schema, value)
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(concat!(stringify!($name), "(..)"))
            }
        }
    };
}

validator_impl!(IntValidator, owned i64);
validator_impl!(UintValidator, owned u64);
validator_impl!(FloatValidator, owned f64);
validator_impl!(StringValidator, borrowed str);
validator_impl!(MappingValidator, borrowed Node);
validator_impl!(SequenceValidator, borrowed [Node]);

// ---------------------------------------------------------------------------
// Kind payloads
// ---------------------------------------------------------------------------

/// A named constant, used by enum and flag-set schemas.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Named<T> {
    /// The YAML spelling.
    pub name: String,
    /// The host value.
    pub value: T,
}

impl<T> Named<T> {
    /// Build a named constant.
    pub fn new(name: impl Into<String>, value: T) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

/// One component of a bitfield: `bits` bits starting at `offset`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BitDef {
    /// The YAML spelling of the component.
    pub name: String,
    /// Bit offset of the component within the storage.
    pub offset: u32,
    /// Width of the component in bits.
    pub bits: u32,
}

impl BitDef {
    /// Build a bitfield component definition.
    pub fn new(name: impl Into<String>, offset: u32, bits: u32) -> Self {
        Self {
            name: name.into(),
            offset,
            bits,
        }
    }
}

/// Payload of a signed integer value.
#[derive(Debug, Clone, Default)]
pub struct IntSchema {
    /// Inclusive range, applied when at least one bound is non-zero.
    pub min: i64,
    /// See `min`.
    pub max: i64,
    /// Value materialised when the field is optional and absent.
    pub default: i64,
    /// Optional host predicate.
    pub validator: Option<IntValidator>,
}

/// Payload of an unsigned integer value.
#[derive(Debug, Clone, Default)]
pub struct UintSchema {
    /// Inclusive range, applied when at least one bound is non-zero.
    pub min: u64,
    /// See `min`.
    pub max: u64,
    /// Value materialised when the field is optional and absent.
    pub default: u64,
    /// Optional host predicate.
    pub validator: Option<UintValidator>,
}

/// Payload of a boolean value.
#[derive(Debug, Clone, Default)]
pub struct BoolSchema {
    /// Value materialised when the field is optional and absent.
    pub default: bool,
}

/// Payload of an enum value.
#[derive(Debug, Clone, Default)]
pub struct EnumSchema {
    /// The `(name, value)` list searched on load and save.
    pub items: Vec<Named<i64>>,
    /// Value materialised when the field is optional and absent.
    pub default: i64,
    /// Optional host predicate.
    pub validator: Option<IntValidator>,
}

/// Payload of a flag-set value.
#[derive(Debug, Clone, Default)]
pub struct FlagsSchema {
    /// The `(name, bits)` list ORed together on load.
    pub items: Vec<Named<u64>>,
    /// Value materialised when the field is optional and absent.
    pub default: u64,
    /// Optional host predicate.
    pub validator: Option<UintValidator>,
}

/// Payload of a bitfield value.
#[derive(Debug, Clone, Default)]
pub struct BitfieldSchema {
    /// The component definitions.
    pub bits: Vec<BitDef>,
    /// Value materialised when the field is optional and absent.
    pub default: u64,
    /// Optional host predicate.
    pub validator: Option<UintValidator>,
}

/// Payload of a float value.
#[derive(Debug, Clone, Default)]
pub struct FloatSchema {
    /// Inclusive range, applied when at least one bound is non-zero.
    pub min: f64,
    /// See `min`.
    pub max: f64,
    /// Value materialised when the field is optional and absent.
    pub default: f64,
    /// Optional host predicate.
    pub validator: Option<FloatValidator>,
}

/// Payload of a string value.
#[derive(Debug, Clone)]
pub struct StringSchema {
    /// Minimum length in bytes.
    pub min: usize,
    /// Maximum length in bytes.
    pub max: usize,
    /// String materialised when the field is optional and absent.
    pub default: Option<String>,
    /// Optional host predicate.
    pub validator: Option<StringValidator>,
}

impl Default for StringSchema {
    fn default() -> Self {
        Self {
            min: 0,
            max: UNLIMITED,
            default: None,
            validator: None,
        }
    }
}

/// Payload of a binary value.
#[derive(Debug, Clone)]
pub struct BinarySchema {
    /// Minimum decoded length in bytes.
    pub min: usize,
    /// Maximum decoded length in bytes.
    pub max: usize,
}

impl Default for BinarySchema {
    fn default() -> Self {
        Self {
            min: 0,
            max: UNLIMITED,
        }
    }
}

/// Payload of a mapping value.
#[derive(Debug, Clone, Default)]
pub struct MappingSchema {
    /// The field list, in declaration order.
    pub fields: Vec<Field>,
    /// Name of the field acting as a union discriminant, if any.
    /// Requires the `EXTENDED` configuration flag.
    pub discriminant: Option<String>,
    /// Record materialised when the field is optional and absent.
    pub default: Option<Node>,
    /// Optional host predicate over the completed mapping.
    pub validator: Option<MappingValidator>,
}

/// Payload of a sequence value, fixed or variable length.
#[derive(Debug, Clone)]
pub struct SequenceSchema {
    /// Schema of every entry.
    pub entry: Box<Value>,
    /// Minimum entry count (equal to `max` for fixed sequences).
    pub min: usize,
    /// Maximum entry count.
    pub max: usize,
    /// Entries materialised when the field is optional and absent.
    pub default: Option<Vec<Node>>,
    /// Optional host predicate over the completed entries.
    pub validator: Option<SequenceValidator>,
}

/// The closed set of value kinds.
#[derive(Debug, Clone)]
pub enum Kind {
    /// Signed integer of `data_size` bytes.
    Int(IntSchema),
    /// Unsigned integer of `data_size` bytes.
    Uint(UintSchema),
    /// Boolean stored in `data_size` bytes.
    Bool(BoolSchema),
    /// Named signed constant.
    Enum(EnumSchema),
    /// Set of named bits, written in YAML as a sequence of names.
    Flags(FlagsSchema),
    /// Named bit ranges, written in YAML as a name-to-integer mapping.
    Bitfield(BitfieldSchema),
    /// IEEE float of four or eight bytes.
    Float(FloatSchema),
    /// Text scalar.
    String(StringSchema),
    /// Opaque bytes carried as Base64.
    Binary(BinarySchema),
    /// Record with a named field list.
    Mapping(MappingSchema),
    /// Variable-length sequence.
    Sequence(SequenceSchema),
    /// Sequence whose length is a schema constant.
    SequenceFixed(SequenceSchema),
    /// Consume the YAML subtree without producing data.
    Ignore,
}

impl Kind {
    /// Short kind name for diagnostics.
    pub fn name(&self) -> &'static str {
        match self {
            Kind::Int(_) => "int",
            Kind::Uint(_) => "uint",
            Kind::Bool(_) => "bool",
            Kind::Enum(_) => "enum",
            Kind::Flags(_) => "flags",
            Kind::Bitfield(_) => "bitfield",
            Kind::Float(_) => "float",
            Kind::String(_) => "string",
            Kind::Binary(_) => "binary",
            Kind::Mapping(_) => "mapping",
            Kind::Sequence(_) => "sequence",
            Kind::SequenceFixed(_) => "sequence_fixed",
            Kind::Ignore => "ignore",
        }
    }
}

// ---------------------------------------------------------------------------
// Value and Field
// ---------------------------------------------------------------------------

/// The schema of one YAML value position.
#[derive(Debug, Clone)]
pub struct Value {
    /// What the value is.
    pub kind: Kind,
    /// Storage and comparison modifiers.
    pub flags: ValueFlags,
    /// Width in bytes of the host representation.
    pub data_size: usize,
}

impl Value {
    /// Build a value schema from parts.
    pub fn new(kind: Kind, flags: ValueFlags, data_size: usize) -> Self {
        Self {
            kind,
            flags,
            data_size,
        }
    }

    /// Signed integer of `width` bytes.
    pub fn int(width: usize) -> Self {
        Self::new(Kind::Int(IntSchema::default()), ValueFlags::empty(), width)
    }

    /// Unsigned integer of `width` bytes.
    pub fn uint(width: usize) -> Self {
        Self::new(Kind::Uint(UintSchema::default()), ValueFlags::empty(), width)
    }

    /// Boolean stored in one byte.
    pub fn boolean() -> Self {
        Self::new(Kind::Bool(BoolSchema::default()), ValueFlags::empty(), 1)
    }

    /// Double-precision float.
    pub fn float() -> Self {
        Self::new(Kind::Float(FloatSchema::default()), ValueFlags::empty(), 8)
    }

    /// Single-precision float.
    pub fn float32() -> Self {
        Self::new(Kind::Float(FloatSchema::default()), ValueFlags::empty(), 4)
    }

    /// Unbounded string.
    pub fn string() -> Self {
        Self::new(
            Kind::String(StringSchema::default()),
            ValueFlags::empty(),
            0,
        )
    }

    /// String with inclusive length bounds.
    pub fn string_bounded(min: usize, max: usize) -> Self {
        Self::new(
            Kind::String(StringSchema {
                min,
                max,
                ..StringSchema::default()
            }),
            ValueFlags::empty(),
            0,
        )
    }

    /// Opaque Base64-carried bytes.
    pub fn binary() -> Self {
        Self::new(
            Kind::Binary(BinarySchema::default()),
            ValueFlags::empty(),
            0,
        )
    }

    /// Named signed constant over `width` bytes.
    pub fn enumeration(width: usize, items: &[(&str, i64)]) -> Self {
        Self::new(
            Kind::Enum(EnumSchema {
                items: items
                    .iter()
                    .map(|(name, value)| Named::new(*name, *value))
                    .collect(),
                ..EnumSchema::default()
            }),
            ValueFlags::empty(),
            width,
        )
    }

    /// Set of named bits over `width` bytes.
    pub fn flag_set(width: usize, items: &[(&str, u64)]) -> Self {
        Self::new(
            Kind::Flags(FlagsSchema {
                items: items
                    .iter()
                    .map(|(name, value)| Named::new(*name, *value))
                    .collect(),
                ..FlagsSchema::default()
            }),
            ValueFlags::empty(),
            width,
        )
    }

    /// Named bit ranges over `width` bytes.
    pub fn bitfield(width: usize, bits: &[(&str, u32, u32)]) -> Self {
        Self::new(
            Kind::Bitfield(BitfieldSchema {
                bits: bits
                    .iter()
                    .map(|(name, offset, width)| BitDef::new(*name, *offset, *width))
                    .collect(),
                ..BitfieldSchema::default()
            }),
            ValueFlags::empty(),
            width,
        )
    }

    /// Record with a field list.
    pub fn mapping(fields: Vec<Field>) -> Self {
        Self::new(
            Kind::Mapping(MappingSchema {
                fields,
                ..MappingSchema::default()
            }),
            ValueFlags::empty(),
            0,
        )
    }

    /// Variable-length sequence with inclusive entry bounds.
    pub fn sequence(entry: Value, min: usize, max: usize) -> Self {
        let stride = entry.data_size;
        Self::new(
            Kind::Sequence(SequenceSchema {
                entry: Box::new(entry),
                min,
                max,
                default: None,
                validator: None,
            }),
            ValueFlags::empty(),
            stride,
        )
    }

    /// Sequence of exactly `count` entries.
    pub fn sequence_fixed(entry: Value, count: usize) -> Self {
        let stride = entry.data_size;
        Self::new(
            Kind::SequenceFixed(SequenceSchema {
                entry: Box::new(entry),
                min: count,
                max: count,
                default: None,
                validator: None,
            }),
            ValueFlags::empty(),
            stride,
        )
    }

    /// Consume the YAML subtree without producing data.
    pub fn ignore() -> Self {
        Self::new(Kind::Ignore, ValueFlags::empty(), 0)
    }

    // -- flag sugar ---------------------------------------------------------

    /// Add the pointer flag.
    #[must_use]
    pub fn pointer(mut self) -> Self {
        self.flags |= ValueFlags::POINTER;
        self
    }

    /// Add the pointer-null flags.
    #[must_use]
    pub fn pointer_null(mut self) -> Self {
        self.flags |= ValueFlags::POINTER_NULL;
        self
    }

    /// Add the pointer-null-str flags.
    #[must_use]
    pub fn pointer_null_str(mut self) -> Self {
        self.flags |= ValueFlags::POINTER_NULL_STR;
        self
    }

    /// Mark the field as allowed to be absent.
    #[must_use]
    pub fn optional(mut self) -> Self {
        self.flags |= ValueFlags::OPTIONAL;
        self
    }

    /// Disable numeric fallback and range widening.
    #[must_use]
    pub fn strict(mut self) -> Self {
        self.flags |= ValueFlags::STRICT;
        self
    }

    /// Override the case policy to sensitive for this value.
    #[must_use]
    pub fn case_sensitive(mut self) -> Self {
        self.flags |= ValueFlags::CASE_SENSITIVE;
        self
    }

    /// Override the case policy to insensitive for this value.
    #[must_use]
    pub fn case_insensitive(mut self) -> Self {
        self.flags |= ValueFlags::CASE_INSENSITIVE;
        self
    }

    /// Replace the host storage width.
    #[must_use]
    pub fn sized(mut self, data_size: usize) -> Self {
        self.data_size = data_size;
        self
    }

    // -- interpretation helpers --------------------------------------------

    /// Whether the value is held behind an owning indirection.
    pub fn is_pointer(&self) -> bool {
        self.flags.intersects(ValueFlags::POINTER)
    }

    /// Whether a null spelling is acceptable for this value.
    pub fn allows_null(&self) -> bool {
        self.flags.contains(ValueFlags::POINTER_NULL)
            || self.flags.contains(ValueFlags::POINTER_NULL_STR)
    }

    /// Whether the scalar `text` spells null under this value's flags.
    pub fn null_matches(&self, text: &str) -> bool {
        if self.flags.contains(ValueFlags::POINTER_NULL_STR) {
            matches!(text, "" | "~" | "null" | "Null" | "NULL")
        } else if self.flags.contains(ValueFlags::POINTER_NULL) {
            text.is_empty()
        } else {
            false
        }
    }

    /// Resolve the three-level case policy for name comparison.
    ///
    /// Schema-level sensitive wins over schema-level insensitive, which
    /// wins over configuration-level insensitive; the default is
    /// sensitive.
    pub fn name_case_sensitive(&self, config: &Config) -> bool {
        if self.flags.contains(ValueFlags::CASE_SENSITIVE) {
            true
        } else if self.flags.contains(ValueFlags::CASE_INSENSITIVE) {
            false
        } else {
            !config.flags.contains(ConfigFlags::CASE_INSENSITIVE)
        }
    }
}

/// One entry in a mapping's field list.
#[derive(Debug, Clone)]
pub struct Field {
    /// The YAML key.
    pub key: String,
    /// Schema of the field's value.
    pub value: Value,
    /// Byte offset of the value within a foreign host record.
    pub offset: usize,
    /// Byte offset of the entry counter for sequence-valued fields.
    pub count_offset: usize,
    /// Byte width of the entry counter for sequence-valued fields.
    pub count_size: usize,
}

impl Field {
    /// Bind `key` to `value` with no record location.
    pub fn new(key: impl Into<String>, value: Value) -> Self {
        Self {
            key: key.into(),
            value,
            offset: 0,
            count_offset: 0,
            count_size: 0,
        }
    }

    /// Place the field at `offset` within a foreign host record.
    #[must_use]
    pub fn at(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    /// Place the entry counter of a sequence-valued field.
    #[must_use]
    pub fn counted(mut self, count_offset: usize, count_size: usize) -> Self {
        self.count_offset = count_offset;
        self.count_size = count_size;
        self
    }
}
