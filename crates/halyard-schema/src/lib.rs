//! # halyard-schema — The Halyard Schema Model
//!
//! Value and field descriptors binding host data shapes to YAML
//! structure, the invariant checker that rejects uninterpretable schemas
//! up front, and the fixed-layout record boundary used to materialise a
//! value tree into a foreign byte record.
//!
//! Schemas are static data: the host program declares them once, and the
//! load, save, copy and free drivers in the `halyard` crate interpret
//! them. Nothing here touches the YAML event stream.

pub mod check;
pub mod layout;
pub mod schema;

// Re-export primary types for ergonomic imports.
pub use check::{check, check_root, node_matches};
pub use schema::{
    BitDef, BitfieldSchema, BinarySchema, BoolSchema, EnumSchema, Field, FlagsSchema,
    FloatSchema, FloatValidator, IntSchema, IntValidator, Kind, MappingSchema,
    MappingValidator, Named, SequenceSchema, SequenceValidator, StringSchema,
    StringValidator, UintSchema, UintValidator, Value, ValueFlags, UNLIMITED,
};
