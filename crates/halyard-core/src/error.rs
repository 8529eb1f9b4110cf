//! # Error Taxonomy
//!
//! The closed set of failure codes surfaced by every halyard operation.
//! All errors use `thiserror` for derive-based `Display` and `Error`
//! implementations.
//!
//! ## Design
//!
//! - Every internal function returns `Result<_, Error>`; there is no
//!   exception-like mechanism and callers are explicit about checking.
//! - Variants are fieldless and carry a stable numeric code so the set
//!   can cross a foreign-function boundary as a single integer. Context
//!   (offending key, source position, valid name lists) is emitted on the
//!   log surface at the failure site, not packed into the value.
//! - [`strerror`] translates any numeric code to a static human-readable
//!   string, including `0` (success) and the foreign-boundary codes that
//!   safe Rust cannot produce.

use thiserror::Error;

/// A halyard failure code.
///
/// The numeric value of each variant (see [`Error::code`]) is stable and
/// dense; gaps in the sequence are codes reserved for the foreign-function
/// boundary, where null parameters exist (see [`strerror`]).
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
#[non_exhaustive]
pub enum Error {
    /// Memory allocation failed.
    #[error("memory allocation failure")]
    OutOfMemory = 1,

    /// An alias was encountered while aliases are disabled.
    #[error("aliases are not supported by the configuration")]
    AliasUnsupported = 2,

    /// An alias referenced an anchor with no completed recording.
    #[error("alias does not reference a recorded anchor")]
    InvalidAlias = 3,

    /// A file could not be opened.
    #[error("could not open file")]
    FileOpen = 4,

    /// A mapping key was not found in the schema.
    #[error("invalid key")]
    InvalidKey = 5,

    /// A value did not conform to its schema.
    #[error("invalid value")]
    InvalidValue = 6,

    /// Base64 input violated the padding or length rules.
    #[error("invalid base64 data")]
    InvalidBase64 = 7,

    /// An internal invariant was violated.
    #[error("internal error")]
    Internal = 8,

    /// An event arrived that the current state cannot accept.
    #[error("unexpected event")]
    UnexpectedEvent = 9,

    /// A string was shorter than the schema minimum.
    #[error("string length too short")]
    StringTooShort = 10,

    /// A string was longer than the schema maximum.
    #[error("string length too long")]
    StringTooLong = 11,

    /// A data size was zero or wider than eight bytes.
    #[error("invalid data size in schema")]
    InvalidDataSize = 12,

    /// The top-level schema value does not carry the pointer flag.
    #[error("top-level schema value must have the pointer flag")]
    TopLevelNonPointer = 13,

    /// The schema kind disagrees with the data it describes.
    #[error("bad type in schema")]
    BadTypeInSchema = 14,

    /// A schema minimum exceeds its maximum.
    #[error("bad minimum or maximum in schema")]
    BadMinMaxInSchema = 15,

    /// A sequence count parameter was missing or inconsistent.
    #[error("bad sequence count parameter")]
    BadParamSeqCount = 16,

    /// Data was absent where the schema requires it.
    #[error("bad parameter: no data")]
    BadParamNullData = 17,

    /// A sequence held fewer entries than the schema minimum.
    #[error("sequence has too few entries")]
    SequenceEntriesTooFew = 18,

    /// A sequence held more entries than the schema maximum.
    #[error("sequence has too many entries")]
    SequenceEntriesTooMany = 19,

    /// A fixed sequence did not hold exactly the schema count.
    #[error("fixed sequence count mismatch")]
    SequenceFixedCount = 20,

    /// A variable-length sequence was nested directly in another.
    #[error("variable-length sequence nested in variable-length sequence")]
    SequenceInSequence = 21,

    /// A required mapping field was absent from the document.
    #[error("mapping field missing")]
    MappingFieldMissing = 22,

    /// The configuration is not usable for the requested operation.
    #[error("bad configuration")]
    BadConfig = 23,

    /// The event source could not be initialised.
    #[error("event source initialisation failed")]
    EventSourceInit = 26,

    /// The event source failed while producing events.
    #[error("event source error")]
    EventSource = 27,

    /// The event sink could not be initialised.
    #[error("event sink initialisation failed")]
    EventSinkInit = 28,

    /// The event sink failed while consuming events.
    #[error("event sink error")]
    EventSink = 29,

    /// A mapping names a union discriminant that is not among its fields.
    #[error("union discriminant not found in mapping")]
    UnionDiscriminantNotFound = 30,

    /// The load target already held data.
    #[error("data target must start empty")]
    DataTargetNonNull = 31,

    /// A bitfield component does not fit its storage width.
    #[error("bad bit definition in schema")]
    BadBitValueInSchema = 32,
}

impl Error {
    /// The stable numeric code of this error.
    pub fn code(self) -> u32 {
        self as u32
    }
}

/// Translate a numeric halyard code to a static human-readable string.
///
/// Accepts the full code space: `0` is success, codes `24` and `25` are
/// produced only across a foreign-function boundary (where a null
/// configuration or schema pointer can exist), and codes outside the
/// known range translate to `"Unknown error"`.
pub fn strerror(code: u32) -> &'static str {
    match code {
        0 => "Success",
        1 => "Memory allocation failure",
        2 => "Aliases are not supported by the configuration",
        3 => "Alias does not reference a recorded anchor",
        4 => "Could not open file",
        5 => "Invalid key",
        6 => "Invalid value",
        7 => "Invalid base64 data",
        8 => "Internal error",
        9 => "Unexpected event",
        10 => "String length too short",
        11 => "String length too long",
        12 => "Invalid data size in schema",
        13 => "Top-level schema value must have the pointer flag",
        14 => "Bad type in schema",
        15 => "Bad minimum or maximum in schema",
        16 => "Bad sequence count parameter",
        17 => "Bad parameter: no data",
        18 => "Sequence has too few entries",
        19 => "Sequence has too many entries",
        20 => "Fixed sequence count mismatch",
        21 => "Variable-length sequence nested in variable-length sequence",
        22 => "Mapping field missing",
        23 => "Bad configuration",
        24 => "Bad parameter: no configuration",
        25 => "Bad parameter: no schema",
        26 => "Event source initialisation failed",
        27 => "Event source error",
        28 => "Event sink initialisation failed",
        29 => "Event sink error",
        30 => "Union discriminant not found in mapping",
        31 => "Data target must start empty",
        32 => "Bad bit definition in schema",
        _ => "Unknown error",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_stable() {
        assert_eq!(Error::OutOfMemory.code(), 1);
        assert_eq!(Error::UnexpectedEvent.code(), 9);
        assert_eq!(Error::MappingFieldMissing.code(), 22);
        assert_eq!(Error::BadBitValueInSchema.code(), 32);
    }

    #[test]
    fn test_strerror_covers_reserved_codes() {
        // 24 and 25 have no enum variant but must still translate.
        assert_eq!(strerror(24), "Bad parameter: no configuration");
        assert_eq!(strerror(25), "Bad parameter: no schema");
    }

    #[test]
    fn test_strerror_matches_display() {
        // Display and the translator agree up to capitalisation.
        let s = strerror(Error::InvalidBase64.code());
        assert!(s.eq_ignore_ascii_case(&Error::InvalidBase64.to_string()));
    }

    #[test]
    fn test_strerror_unknown() {
        assert_eq!(strerror(999), "Unknown error");
    }
}
