//! The error surface: numeric codes, the translator, and schema
//! shapes the checker must reject before any event moves.

use halyard::{
    load_bytes, strerror, Config, ConfigFlags, Error, Field, Kind, Value,
};

fn quiet() -> Config {
    Config::new().with_log_level(halyard::LogLevel::Silent)
}

#[test]
fn test_code_translator_round_trip() {
    for err in [
        Error::AliasUnsupported,
        Error::InvalidAlias,
        Error::FileOpen,
        Error::InvalidKey,
        Error::InvalidValue,
        Error::InvalidBase64,
        Error::UnexpectedEvent,
        Error::StringTooShort,
        Error::StringTooLong,
        Error::InvalidDataSize,
        Error::TopLevelNonPointer,
        Error::BadTypeInSchema,
        Error::BadMinMaxInSchema,
        Error::SequenceEntriesTooFew,
        Error::SequenceEntriesTooMany,
        Error::SequenceFixedCount,
        Error::SequenceInSequence,
        Error::MappingFieldMissing,
        Error::EventSource,
        Error::EventSink,
        Error::UnionDiscriminantNotFound,
        Error::BadBitValueInSchema,
    ] {
        let text = strerror(err.code());
        assert_ne!(text, "Unknown error", "code {} untranslated", err.code());
        assert_ne!(text, "Success");
    }
    assert_eq!(strerror(0), "Success");
}

#[test]
fn test_schema_width_errors_surface_before_parsing() {
    let schema = Value::mapping(vec![Field::new("n", Value::uint(16))]).pointer();
    // The document is irrelevant; the schema is rejected first.
    assert_eq!(
        load_bytes(&quiet(), &schema, b"not even yaml: ["),
        Err(Error::InvalidDataSize)
    );
}

#[test]
fn test_sequence_in_sequence_rejected() {
    let inner = Value::sequence(Value::int(4), 0, 4);
    let outer = Value::sequence(inner, 0, 4).pointer();
    assert_eq!(
        load_bytes(&quiet(), &outer, b"- [1]\n"),
        Err(Error::SequenceInSequence)
    );
}

#[test]
fn test_fixed_sequence_nests_in_variable() {
    let inner = Value::sequence_fixed(Value::int(4), 2);
    let outer = Value::sequence(inner, 0, 4).pointer();
    let tree = load_bytes(&quiet(), &outer, b"- [1, 2]\n- [3, 4]\n").unwrap();
    assert_eq!(tree.as_sequence().unwrap().len(), 2);
}

#[test]
fn test_malformed_yaml_is_event_source_error() {
    let schema = Value::mapping(vec![Field::new("a", Value::uint(4))]).pointer();
    assert_eq!(
        load_bytes(&quiet(), &schema, b"a: [1, 2\n"),
        Err(Error::EventSource)
    );
}

#[test]
fn test_unknown_alias_name_is_source_error() {
    // The upstream parser resolves anchor names; an undefined name dies
    // there rather than in replay.
    let schema = Value::mapping(vec![Field::new("a", Value::uint(4))]).pointer();
    assert!(load_bytes(&quiet(), &schema, b"a: *nope\n").is_err());
}

#[test]
fn test_discriminant_gating() {
    let mut schema = Value::mapping(vec![Field::new("tag", Value::uint(1))]).pointer();
    if let Kind::Mapping(m) = &mut schema.kind {
        m.discriminant = Some("tag".to_string());
    }
    assert_eq!(
        load_bytes(&quiet(), &schema, b"tag: 1\n"),
        Err(Error::BadConfig)
    );
    let extended = quiet().with_flags(ConfigFlags::EXTENDED);
    assert!(load_bytes(&extended, &schema, b"tag: 1\n").is_ok());

    if let Kind::Mapping(m) = &mut schema.kind {
        m.discriminant = Some("ghost".to_string());
    }
    assert_eq!(
        load_bytes(&extended, &schema, b"tag: 1\n"),
        Err(Error::UnionDiscriminantNotFound)
    );
}

#[test]
fn test_string_length_codes() {
    let schema = Value::mapping(vec![Field::new(
        "s",
        Value::string_bounded(2, 3).pointer(),
    )])
    .pointer();
    assert_eq!(
        load_bytes(&quiet(), &schema, b"s: a\n"),
        Err(Error::StringTooShort)
    );
    assert_eq!(
        load_bytes(&quiet(), &schema, b"s: abcd\n"),
        Err(Error::StringTooLong)
    );
}

#[test]
fn test_invalid_base64_code() {
    let schema = Value::mapping(vec![Field::new("b", Value::binary().pointer())]).pointer();
    assert_eq!(
        load_bytes(&quiet(), &schema, b"b: a=b\n"),
        Err(Error::InvalidBase64)
    );
}

#[test]
fn test_display_matches_translator_register() {
    // Display is lowercase prose; the translator capitalises. They
    // describe the same failure.
    let err = Error::MappingFieldMissing;
    assert!(err.to_string().contains("missing"));
    assert!(strerror(err.code()).contains("missing"));
}
