//! The numeric code space: every code translates, codes are stable,
//! and the translator tolerates the codes safe Rust cannot produce.

use halyard_core::{strerror, Error};

#[test]
fn test_every_variant_translates() {
    let variants = [
        Error::OutOfMemory,
        Error::AliasUnsupported,
        Error::InvalidAlias,
        Error::FileOpen,
        Error::InvalidKey,
        Error::InvalidValue,
        Error::InvalidBase64,
        Error::Internal,
        Error::UnexpectedEvent,
        Error::StringTooShort,
        Error::StringTooLong,
        Error::InvalidDataSize,
        Error::TopLevelNonPointer,
        Error::BadTypeInSchema,
        Error::BadMinMaxInSchema,
        Error::BadParamSeqCount,
        Error::BadParamNullData,
        Error::SequenceEntriesTooFew,
        Error::SequenceEntriesTooMany,
        Error::SequenceFixedCount,
        Error::SequenceInSequence,
        Error::MappingFieldMissing,
        Error::BadConfig,
        Error::EventSourceInit,
        Error::EventSource,
        Error::EventSinkInit,
        Error::EventSink,
        Error::UnionDiscriminantNotFound,
        Error::DataTargetNonNull,
        Error::BadBitValueInSchema,
    ];
    for err in variants {
        let text = strerror(err.code());
        assert_ne!(text, "Unknown error", "code {}", err.code());
        assert_ne!(text, "Success", "code {}", err.code());
    }
}

#[test]
fn test_codes_are_unique() {
    let codes = [
        Error::OutOfMemory.code(),
        Error::AliasUnsupported.code(),
        Error::InvalidAlias.code(),
        Error::FileOpen.code(),
        Error::InvalidKey.code(),
        Error::InvalidValue.code(),
        Error::InvalidBase64.code(),
        Error::Internal.code(),
        Error::UnexpectedEvent.code(),
        Error::StringTooShort.code(),
        Error::StringTooLong.code(),
        Error::InvalidDataSize.code(),
        Error::TopLevelNonPointer.code(),
        Error::BadTypeInSchema.code(),
        Error::BadMinMaxInSchema.code(),
        Error::BadParamSeqCount.code(),
        Error::BadParamNullData.code(),
        Error::SequenceEntriesTooFew.code(),
        Error::SequenceEntriesTooMany.code(),
        Error::SequenceFixedCount.code(),
        Error::SequenceInSequence.code(),
        Error::MappingFieldMissing.code(),
        Error::BadConfig.code(),
        Error::EventSourceInit.code(),
        Error::EventSource.code(),
        Error::EventSinkInit.code(),
        Error::EventSink.code(),
        Error::UnionDiscriminantNotFound.code(),
        Error::DataTargetNonNull.code(),
        Error::BadBitValueInSchema.code(),
    ];
    let mut sorted = codes.to_vec();
    sorted.sort_unstable();
    sorted.dedup();
    assert_eq!(sorted.len(), codes.len());
}

#[test]
fn test_foreign_boundary_codes_have_strings_only() {
    // 24 and 25 exist for a boundary where null parameters are
    // representable; there is no variant behind them.
    assert_eq!(strerror(24), "Bad parameter: no configuration");
    assert_eq!(strerror(25), "Bad parameter: no schema");
}

#[test]
fn test_zero_is_success() {
    assert_eq!(strerror(0), "Success");
}

#[test]
fn test_out_of_range_codes() {
    assert_eq!(strerror(33), "Unknown error");
    assert_eq!(strerror(u32::MAX), "Unknown error");
}
