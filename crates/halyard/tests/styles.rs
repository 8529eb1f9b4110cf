//! Input presentation forms the loader must accept: quoted and block
//! scalars, flow collections, UTF-8 keys and names, and case policy
//! over all of them.

use halyard::{load_bytes, Config, ConfigFlags, Error, Field, Node, Value};

fn quiet() -> Config {
    Config::new().with_log_level(halyard::LogLevel::Silent)
}

#[test]
fn test_quoted_scalars() {
    let schema = Value::mapping(vec![
        Field::new("a", Value::string().pointer()),
        Field::new("b", Value::uint(4)),
    ])
    .pointer();
    let tree = load_bytes(&quiet(), &schema, b"a: \"two words\"\nb: '7'\n").unwrap();
    assert_eq!(tree.get("a").and_then(Node::as_str), Some("two words"));
    assert_eq!(tree.get("b").and_then(Node::as_uint), Some(7));
}

#[test]
fn test_literal_block_scalar() {
    let schema = Value::mapping(vec![Field::new("text", Value::string().pointer())]).pointer();
    let tree = load_bytes(&quiet(), &schema, b"text: |\n  line one\n  line two\n").unwrap();
    assert_eq!(
        tree.get("text").and_then(Node::as_str),
        Some("line one\nline two\n")
    );
}

#[test]
fn test_folded_block_scalar() {
    let schema = Value::mapping(vec![Field::new("text", Value::string().pointer())]).pointer();
    let tree = load_bytes(&quiet(), &schema, b"text: >\n  folded\n  words\n").unwrap();
    assert_eq!(tree.get("text").and_then(Node::as_str), Some("folded words\n"));
}

#[test]
fn test_flow_collections() {
    let schema = Value::mapping(vec![
        Field::new("xs", Value::sequence(Value::int(4), 0, 8).pointer()),
        Field::new(
            "size",
            Value::mapping(vec![
                Field::new("w", Value::uint(4)),
                Field::new("h", Value::uint(4)),
            ]),
        ),
    ])
    .pointer();
    let tree = load_bytes(&quiet(), &schema, b"xs: [1, 2, 3]\nsize: {w: 4, h: 5}\n").unwrap();
    assert_eq!(
        tree.get("xs"),
        Some(&Node::Sequence(vec![
            Node::Int(1),
            Node::Int(2),
            Node::Int(3)
        ]))
    );
    assert_eq!(
        tree.get("size").and_then(|s| s.get("h")).and_then(Node::as_uint),
        Some(5)
    );
}

#[test]
fn test_utf8_keys_and_fold() {
    let schema = Value::mapping(vec![Field::new("größe", Value::uint(4))]).pointer();
    let tree = load_bytes(&quiet(), &schema, "größe: 3\n".as_bytes()).unwrap();
    assert_eq!(tree.get("größe").and_then(Node::as_uint), Some(3));

    let cfg = quiet().with_flags(ConfigFlags::CASE_INSENSITIVE);
    let tree = load_bytes(&cfg, &schema, "GRÖSSE: 3\n".as_bytes());
    // Simple folding maps Ö to ö but not ß to ss.
    assert_eq!(tree, Err(Error::InvalidKey));
    let tree = load_bytes(&cfg, &schema, "GRÖßE: 3\n".as_bytes()).unwrap();
    assert_eq!(tree.get("größe").and_then(Node::as_uint), Some(3));
}

#[test]
fn test_enum_names_case_policy() {
    let schema = Value::mapping(vec![Field::new(
        "mode",
        Value::enumeration(4, &[("Fast", 2)]).case_insensitive(),
    )])
    .pointer();
    let tree = load_bytes(&quiet(), &schema, b"mode: fast\n").unwrap();
    assert_eq!(tree.get("mode").and_then(Node::as_int), Some(2));
}

#[test]
fn test_flag_names_case_policy() {
    let schema = Value::flag_set(4, &[("Read", 1), ("Write", 2)])
        .case_insensitive()
        .pointer();
    let tree = load_bytes(&quiet(), &schema, b"- read\n- WRITE\n").unwrap();
    assert_eq!(tree.as_uint(), Some(3));
}

#[test]
fn test_comments_and_blank_lines() {
    let schema = Value::mapping(vec![
        Field::new("a", Value::uint(4)),
        Field::new("b", Value::uint(4)),
    ])
    .pointer();
    let doc = b"# leading comment\na: 1\n\n# interlude\nb: 2  # trailing\n";
    let tree = load_bytes(&quiet(), &schema, doc).unwrap();
    assert_eq!(tree.get("a").and_then(Node::as_uint), Some(1));
    assert_eq!(tree.get("b").and_then(Node::as_uint), Some(2));
}

#[test]
fn test_explicit_document_markers() {
    let schema = Value::mapping(vec![Field::new("a", Value::uint(4))]).pointer();
    let tree = load_bytes(&quiet(), &schema, b"---\na: 1\n...\n").unwrap();
    assert_eq!(tree.get("a").and_then(Node::as_uint), Some(1));
}

#[test]
fn test_binary_with_line_breaks() {
    // Base64 presentation noise (line breaks, indentation) is skipped.
    let schema = Value::mapping(vec![Field::new("blob", Value::binary().pointer())]).pointer();
    let doc = b"blob: |\n  S2l0\n  dGVucw==\n";
    let tree = load_bytes(&quiet(), &schema, doc).unwrap();
    assert_eq!(tree.get("blob").and_then(Node::as_bytes), Some(&b"Kittens"[..]));
}
