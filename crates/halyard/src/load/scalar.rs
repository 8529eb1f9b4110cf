//! # Scalar Decoding
//!
//! Turns YAML scalar text into typed nodes under a value schema: signed
//! and unsigned integers with automatic base detection, the permissive
//! boolean reading, floats with strict and narrowing semantics, bounded
//! strings, Base64 binary, and enums with their non-strict numeric
//! fallback.

use halyard_core::{base64, codec, Config, Error, LogLevel, Node};
use halyard_schema::schema::{Kind, Value, ValueFlags, UNLIMITED};
use halyard_core::fold;

use crate::log;

// ---------------------------------------------------------------------------
// Text parsers
// ---------------------------------------------------------------------------

fn split_sign(text: &str) -> (bool, &str) {
    if let Some(rest) = text.strip_prefix('-') {
        (true, rest)
    } else if let Some(rest) = text.strip_prefix('+') {
        (false, rest)
    } else {
        (false, text)
    }
}

/// Parse an unsigned magnitude with automatic base detection: `0x` hex,
/// a leading `0` octal, decimal otherwise. Trailing garbage and overflow
/// are rejected.
fn parse_magnitude(text: &str) -> Result<u64, Error> {
    let (digits, radix) = if let Some(hex) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        (hex, 16)
    } else if let Some(octal) = text.strip_prefix("0o").or_else(|| text.strip_prefix("0O")) {
        (octal, 8)
    } else if text.len() > 1 && text.starts_with('0') {
        (&text[1..], 8)
    } else {
        (text, 10)
    };
    if digits.is_empty() {
        return Err(Error::InvalidValue);
    }
    let mut value: u64 = 0;
    for ch in digits.chars() {
        let digit = ch.to_digit(radix).ok_or(Error::InvalidValue)?;
        value = value
            .checked_mul(u64::from(radix))
            .and_then(|v| v.checked_add(u64::from(digit)))
            .ok_or(Error::InvalidValue)?;
    }
    Ok(value)
}

/// Parse a signed 64-bit integer.
pub(crate) fn parse_i64(text: &str) -> Result<i64, Error> {
    let (negative, body) = split_sign(text);
    let magnitude = parse_magnitude(body)?;
    if negative {
        if magnitude > i64::MAX as u64 + 1 {
            return Err(Error::InvalidValue);
        }
        Ok((magnitude as i64).wrapping_neg())
    } else {
        if magnitude > i64::MAX as u64 {
            return Err(Error::InvalidValue);
        }
        Ok(magnitude as i64)
    }
}

/// Parse an unsigned 64-bit integer; a sign is rejected.
pub(crate) fn parse_u64(text: &str) -> Result<u64, Error> {
    if text.starts_with('-') {
        return Err(Error::InvalidValue);
    }
    let (_, body) = split_sign(text);
    parse_magnitude(body)
}

/// Whether `text` deliberately spells an infinity.
fn spells_infinity(text: &str) -> bool {
    let body = text
        .strip_prefix('-')
        .or_else(|| text.strip_prefix('+'))
        .unwrap_or(text);
    matches!(body, ".inf" | ".Inf" | ".INF")
        || body.eq_ignore_ascii_case("inf")
        || body.eq_ignore_ascii_case("infinity")
}

/// Parse a double, accepting the YAML spellings of the specials.
pub(crate) fn parse_f64(text: &str) -> Result<f64, Error> {
    let (negative, body) = split_sign(text);
    let special = match body {
        ".inf" | ".Inf" | ".INF" => Some(f64::INFINITY),
        ".nan" | ".NaN" | ".NAN" => Some(f64::NAN),
        _ => None,
    };
    if let Some(value) = special {
        return Ok(if negative { -value } else { value });
    }
    text.parse::<f64>().map_err(|_| Error::InvalidValue)
}

const FALSE_SPELLINGS: [&str; 5] = ["false", "no", "off", "disable", "0"];

/// The permissive boolean reading: a handful of spellings mean false,
/// everything else means true.
pub(crate) fn parse_bool(text: &str) -> bool {
    !FALSE_SPELLINGS
        .iter()
        .any(|spelling| fold::casecmp(text, spelling))
}

// ---------------------------------------------------------------------------
// Schema-directed decoding
// ---------------------------------------------------------------------------

fn fail(config: &Config, message: String, err: Error) -> Error {
    log::emit(config, LogLevel::Error, &message);
    err
}

fn decode_int(
    config: &Config,
    schema: &Value,
    text: &str,
) -> Result<Node, Error> {
    let Kind::Int(int) = &schema.kind else {
        return Err(Error::Internal);
    };
    let value = parse_i64(text)
        .map_err(|e| fail(config, format!("invalid integer value '{text}'"), e))?;
    if value < codec::int_min(schema.data_size)? || value > codec::int_max(schema.data_size)? {
        return Err(fail(
            config,
            format!("integer {value} does not fit {} byte(s)", schema.data_size),
            Error::InvalidValue,
        ));
    }
    if (int.min != 0 || int.max != 0) && (value < int.min || value > int.max) {
        return Err(fail(
            config,
            format!("integer {value} outside range {}..={}", int.min, int.max),
            Error::InvalidValue,
        ));
    }
    if let Some(validator) = &int.validator {
        if !validator.check(schema, value) {
            return Err(fail(
                config,
                format!("integer {value} rejected by validator"),
                Error::InvalidValue,
            ));
        }
    }
    Ok(Node::Int(value))
}

fn decode_uint(
    config: &Config,
    schema: &Value,
    text: &str,
) -> Result<Node, Error> {
    let Kind::Uint(uint) = &schema.kind else {
        return Err(Error::Internal);
    };
    let value = parse_u64(text)
        .map_err(|e| fail(config, format!("invalid unsigned value '{text}'"), e))?;
    if value > codec::uint_max(schema.data_size)? {
        return Err(fail(
            config,
            format!("value {value} does not fit {} byte(s)", schema.data_size),
            Error::InvalidValue,
        ));
    }
    if (uint.min != 0 || uint.max != 0) && (value < uint.min || value > uint.max) {
        return Err(fail(
            config,
            format!("value {value} outside range {}..={}", uint.min, uint.max),
            Error::InvalidValue,
        ));
    }
    if let Some(validator) = &uint.validator {
        if !validator.check(schema, value) {
            return Err(fail(
                config,
                format!("value {value} rejected by validator"),
                Error::InvalidValue,
            ));
        }
    }
    Ok(Node::Uint(value))
}

fn decode_float(
    config: &Config,
    schema: &Value,
    text: &str,
) -> Result<Node, Error> {
    let Kind::Float(float) = &schema.kind else {
        return Err(Error::Internal);
    };
    let strict = schema.flags.contains(ValueFlags::STRICT);
    let mut value = parse_f64(text)
        .map_err(|e| fail(config, format!("invalid float value '{text}'"), e))?;
    if value.is_infinite() && !spells_infinity(text) {
        // The parse overflowed rather than the document asking for
        // infinity.
        if strict {
            return Err(fail(
                config,
                format!("float value '{text}' overflows"),
                Error::InvalidValue,
            ));
        }
        log::emit(
            config,
            LogLevel::Warning,
            &format!("float value '{text}' overflows; accepting infinity"),
        );
    }
    if schema.data_size == 4 {
        if value.is_finite() && value.abs() > f64::from(f32::MAX) {
            if strict {
                return Err(fail(
                    config,
                    format!("float value '{text}' outside single precision"),
                    Error::InvalidValue,
                ));
            }
            value = f64::from(f32::MAX).copysign(value);
        }
        value = f64::from(value as f32);
    }
    if (float.min != 0.0 || float.max != 0.0) && (value < float.min || value > float.max) {
        return Err(fail(
            config,
            format!("float {value} outside range {}..={}", float.min, float.max),
            Error::InvalidValue,
        ));
    }
    if let Some(validator) = &float.validator {
        if !validator.check(schema, value) {
            return Err(fail(
                config,
                format!("float {value} rejected by validator"),
                Error::InvalidValue,
            ));
        }
    }
    Ok(Node::Float(value))
}

fn decode_string(
    config: &Config,
    schema: &Value,
    text: &str,
) -> Result<Node, Error> {
    let Kind::String(string) = &schema.kind else {
        return Err(Error::Internal);
    };
    if text.len() < string.min {
        return Err(fail(
            config,
            format!(
                "string of {} byte(s) shorter than minimum {}",
                text.len(),
                string.min
            ),
            Error::StringTooShort,
        ));
    }
    if string.max != UNLIMITED && text.len() > string.max {
        return Err(fail(
            config,
            format!(
                "string of {} byte(s) longer than maximum {}",
                text.len(),
                string.max
            ),
            Error::StringTooLong,
        ));
    }
    if let Some(validator) = &string.validator {
        if !validator.check(schema, text) {
            return Err(fail(
                config,
                format!("string '{text}' rejected by validator"),
                Error::InvalidValue,
            ));
        }
    }
    Ok(Node::String(text.to_string()))
}

fn decode_binary(
    config: &Config,
    schema: &Value,
    text: &str,
) -> Result<Node, Error> {
    let Kind::Binary(binary) = &schema.kind else {
        return Err(Error::Internal);
    };
    let bytes = base64::decode(text.as_bytes())
        .map_err(|e| fail(config, "invalid base64 in binary value".to_string(), e))?;
    if bytes.len() < binary.min {
        return Err(fail(
            config,
            format!(
                "binary of {} byte(s) shorter than minimum {}",
                bytes.len(),
                binary.min
            ),
            Error::StringTooShort,
        ));
    }
    if binary.max != UNLIMITED && bytes.len() > binary.max {
        return Err(fail(
            config,
            format!(
                "binary of {} byte(s) longer than maximum {}",
                bytes.len(),
                binary.max
            ),
            Error::StringTooLong,
        ));
    }
    Ok(Node::Binary(bytes))
}

fn decode_enum(
    config: &Config,
    schema: &Value,
    text: &str,
) -> Result<Node, Error> {
    let Kind::Enum(en) = &schema.kind else {
        return Err(Error::Internal);
    };
    let sensitive = schema.name_case_sensitive(config);
    for item in &en.items {
        if fold::str_eq(text, &item.name, sensitive) {
            if let Some(validator) = &en.validator {
                if !validator.check(schema, item.value) {
                    return Err(fail(
                        config,
                        format!("enum '{text}' rejected by validator"),
                        Error::InvalidValue,
                    ));
                }
            }
            return Ok(Node::Int(item.value));
        }
    }

    let strict = schema.flags.contains(ValueFlags::STRICT);
    let fallback = if strict { Err(Error::InvalidValue) } else { parse_i64(text) };
    match fallback {
        Ok(value)
            if value >= codec::int_min(schema.data_size)?
                && value <= codec::int_max(schema.data_size)? =>
        {
            if let Some(validator) = &en.validator {
                if !validator.check(schema, value) {
                    return Err(fail(
                        config,
                        format!("enum value {value} rejected by validator"),
                        Error::InvalidValue,
                    ));
                }
            }
            Ok(Node::Int(value))
        }
        _ => {
            let names: Vec<&str> = en.items.iter().map(|i| i.name.as_str()).collect();
            Err(fail(
                config,
                format!(
                    "invalid enum value '{text}'; expected one of: {}",
                    names.join(", ")
                ),
                Error::InvalidValue,
            ))
        }
    }
}

/// Decode one scalar under `schema`. The caller has already handled the
/// null spellings of pointer-null values.
pub(crate) fn decode(config: &Config, schema: &Value, text: &str) -> Result<Node, Error> {
    match &schema.kind {
        Kind::Int(_) => decode_int(config, schema, text),
        Kind::Uint(_) => decode_uint(config, schema, text),
        Kind::Bool(_) => Ok(Node::Bool(parse_bool(text))),
        Kind::Float(_) => decode_float(config, schema, text),
        Kind::String(_) => decode_string(config, schema, text),
        Kind::Binary(_) => decode_binary(config, schema, text),
        Kind::Enum(_) => decode_enum(config, schema, text),
        _ => Err(Error::Internal),
    }
}

#[cfg(test)]
mod tests {
    use halyard_schema::schema::{IntSchema, StringValidator, StringSchema};
    use halyard_schema::ValueFlags;

    use super::*;

    #[test]
    fn test_parse_i64_bases() {
        assert_eq!(parse_i64("42").unwrap(), 42);
        assert_eq!(parse_i64("-42").unwrap(), -42);
        assert_eq!(parse_i64("0x1F").unwrap(), 31);
        assert_eq!(parse_i64("017").unwrap(), 15);
        assert_eq!(parse_i64("0o17").unwrap(), 15);
        assert_eq!(parse_i64("0").unwrap(), 0);
        assert_eq!(parse_i64("-9223372036854775808").unwrap(), i64::MIN);
    }

    #[test]
    fn test_parse_i64_rejects_garbage() {
        assert!(parse_i64("").is_err());
        assert!(parse_i64("12x").is_err());
        assert!(parse_i64("1 2").is_err());
        assert!(parse_i64("0x").is_err());
        assert!(parse_i64("9223372036854775808").is_err());
    }

    #[test]
    fn test_parse_u64_rejects_sign() {
        assert!(parse_u64("-1").is_err());
        assert_eq!(parse_u64("+7").unwrap(), 7);
        assert_eq!(parse_u64("18446744073709551615").unwrap(), u64::MAX);
        assert!(parse_u64("18446744073709551616").is_err());
    }

    #[test]
    fn test_parse_bool_spellings() {
        for spelling in ["false", "No", "OFF", "Disable", "0"] {
            assert!(!parse_bool(spelling), "spelling {spelling:?}");
        }
        for spelling in ["true", "yes", "on", "1", "banana"] {
            assert!(parse_bool(spelling), "spelling {spelling:?}");
        }
    }

    #[test]
    fn test_parse_f64_specials() {
        assert_eq!(parse_f64(".inf").unwrap(), f64::INFINITY);
        assert_eq!(parse_f64("-.INF").unwrap(), f64::NEG_INFINITY);
        assert!(parse_f64(".nan").unwrap().is_nan());
        assert_eq!(parse_f64("2.5").unwrap(), 2.5);
    }

    #[test]
    fn test_int_width_bounds() {
        let cfg = Config::new();
        let schema = Value::int(1);
        assert_eq!(decode(&cfg, &schema, "127").unwrap(), Node::Int(127));
        assert_eq!(decode(&cfg, &schema, "-128").unwrap(), Node::Int(-128));
        assert_eq!(decode(&cfg, &schema, "128"), Err(Error::InvalidValue));
    }

    #[test]
    fn test_int_schema_range() {
        let cfg = Config::new();
        let schema = Value::new(
            Kind::Int(IntSchema {
                min: 2,
                max: 5,
                ..IntSchema::default()
            }),
            ValueFlags::empty(),
            4,
        );
        assert_eq!(decode(&cfg, &schema, "3").unwrap(), Node::Int(3));
        assert_eq!(decode(&cfg, &schema, "6"), Err(Error::InvalidValue));
    }

    #[test]
    fn test_float_narrowing() {
        let cfg = Config::new();
        let schema = Value::float32();
        let wide = format!("{:e}", 1e100);
        assert!(matches!(
            decode(&cfg, &schema, &wide).unwrap(),
            Node::Float(v) if (v - f64::from(f32::MAX)).abs() < 1e30
        ));
        let strict = Value::float32().strict();
        assert_eq!(decode(&cfg, &strict, &wide), Err(Error::InvalidValue));
    }

    #[test]
    fn test_string_bounds() {
        let cfg = Config::new();
        let schema = Value::string_bounded(2, 4);
        assert_eq!(
            decode(&cfg, &schema, "abc").unwrap(),
            Node::String("abc".into())
        );
        assert_eq!(decode(&cfg, &schema, "a"), Err(Error::StringTooShort));
        assert_eq!(decode(&cfg, &schema, "abcde"), Err(Error::StringTooLong));
    }

    #[test]
    fn test_string_validator() {
        let cfg = Config::new();
        let mut schema = Value::string();
        if let Kind::String(s) = &mut schema.kind {
            *s = StringSchema {
                validator: Some(StringValidator::new(|_, text| !text.contains(' '))),
                ..StringSchema::default()
            };
        }
        assert!(decode(&cfg, &schema, "word").is_ok());
        assert_eq!(decode(&cfg, &schema, "two words"), Err(Error::InvalidValue));
    }

    #[test]
    fn test_enum_names_and_fallback() {
        let cfg = Config::new();
        let schema = Value::enumeration(4, &[("first", 1), ("second", 2)]);
        assert_eq!(decode(&cfg, &schema, "second").unwrap(), Node::Int(2));
        assert_eq!(decode(&cfg, &schema, "9").unwrap(), Node::Int(9));
        assert_eq!(decode(&cfg, &schema, "third"), Err(Error::InvalidValue));

        let strict = Value::enumeration(4, &[("first", 1)]).strict();
        assert_eq!(decode(&cfg, &strict, "9"), Err(Error::InvalidValue));
    }

    #[test]
    fn test_binary_decodes() {
        let cfg = Config::new();
        let schema = Value::binary();
        assert_eq!(
            decode(&cfg, &schema, "S2l0dGVucw==").unwrap(),
            Node::Binary(b"Kittens".to_vec())
        );
        assert_eq!(
            decode(&cfg, &schema, "a=b"),
            Err(Error::InvalidBase64)
        );
    }
}
