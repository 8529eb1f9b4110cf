//! # halyard — Schema-Driven YAML Binding
//!
//! Declare the shape of your data once as a schema, then load YAML
//! documents into an owned, validated value tree, or hand a tree back
//! and receive YAML bytes. The host program never walks the event
//! stream itself.
//!
//! ## Key Design Principles
//!
//! 1. **The schema is the contract.** Every load, save and copy is
//!    checked against the schema's invariants before any event moves,
//!    and every value is validated as it materialises.
//! 2. **Explicit state stacks.** The loader and saver drive heap-grown
//!    frame stacks, so document depth never touches the call stack.
//! 3. **Per-call everything.** Configuration, log threshold and event
//!    state live in the invocation; two concurrent calls with distinct
//!    configurations share nothing.
//! 4. **Owned trees.** The loader's result owns every allocation it
//!    reaches; dropping it (or passing it to [`free`]) releases the lot
//!    exactly once. [`copy`] produces an equally self-contained clone.
//!
//! ## Example
//!
//! ```
//! use halyard::{load_bytes, Config, Field, Node, Value};
//!
//! let schema = Value::mapping(vec![
//!     Field::new("a", Value::uint(4)),
//!     Field::new("b", Value::uint(4)),
//! ])
//! .pointer();
//!
//! let tree = load_bytes(&Config::new(), &schema, b"a: 7\nb: 8\n").unwrap();
//! assert_eq!(tree.get("a").and_then(Node::as_uint), Some(7));
//! assert_eq!(tree.get("b").and_then(Node::as_uint), Some(8));
//! ```

use std::fs;
use std::path::Path;

mod copy;
mod emit;
mod event;
mod free;
mod load;
mod log;
mod replay;
mod save;

use halyard_schema::check_root;

// Re-export the public surface of the lower crates.
pub use halyard_core::{
    base64, codec, fold, strerror, Config, ConfigFlags, Error, LogLevel, Node,
};
pub use halyard_schema::{
    check, layout, schema, BitDef, Field, Kind, Named, Value, ValueFlags, UNLIMITED,
};

/// Load a tree from YAML bytes.
///
/// The input must be UTF-8; anything else fails event source
/// initialisation. The returned tree owns all of its allocations.
pub fn load_bytes(config: &Config, schema: &Value, bytes: &[u8]) -> Result<Node, Error> {
    check_root(config, schema)?;
    let text = std::str::from_utf8(bytes).map_err(|err| {
        log::emit(
            config,
            LogLevel::Error,
            &format!("input is not UTF-8: {err}"),
        );
        Error::EventSourceInit
    })?;
    load::load_str(config, schema, text)
}

/// Load a tree from a YAML file.
pub fn load_file(config: &Config, schema: &Value, path: impl AsRef<Path>) -> Result<Node, Error> {
    check_root(config, schema)?;
    let text = fs::read_to_string(path.as_ref()).map_err(|err| {
        log::emit(
            config,
            LogLevel::Error,
            &format!("could not open '{}': {err}", path.as_ref().display()),
        );
        Error::FileOpen
    })?;
    load::load_str(config, schema, &text)
}

/// Save a tree to YAML bytes.
pub fn save_bytes(config: &Config, schema: &Value, data: &Node) -> Result<Vec<u8>, Error> {
    check_root(config, schema)?;
    let mut buf = Vec::new();
    save::save_to(config, schema, data, &mut buf)?;
    Ok(buf)
}

/// Save a tree to a YAML file.
pub fn save_file(
    config: &Config,
    schema: &Value,
    data: &Node,
    path: impl AsRef<Path>,
) -> Result<(), Error> {
    check_root(config, schema)?;
    let file = fs::File::create(path.as_ref()).map_err(|err| {
        log::emit(
            config,
            LogLevel::Error,
            &format!("could not create '{}': {err}", path.as_ref().display()),
        );
        Error::FileOpen
    })?;
    save::save_to(config, schema, data, std::io::BufWriter::new(file))
}

/// Deep-clone a tree under its schema.
///
/// The clone shares no allocation with the source; freeing either
/// leaves the other intact.
pub fn copy(config: &Config, schema: &Value, data: &Node) -> Result<Node, Error> {
    check_root(config, schema)?;
    copy::clone_value(config, schema, data)
}

/// Release a loader-returned tree.
///
/// Equivalent to dropping it, plus schema validation and release
/// accounting on the debug log.
pub fn free(config: &Config, schema: &Value, data: Node) -> Result<(), Error> {
    check_root(config, schema)?;
    free::free_value(config, schema, data)
}
