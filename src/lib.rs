//! # refgraph
//!
//! An object-graph serializer for Rust: it flattens a graph of shared, possibly cyclic
//! objects into a self-describing text document and rebuilds an equivalent graph from it.
//!
//! ## Key Features
//!
//! - **Identity preserving**: an object reachable along several paths is written once and
//!   comes back as one shared instance
//! - **Cycle safe**: self references and mutual references never cause recursion; objects
//!   are written as separate entries and linked by id
//! - **Forward references**: an entry may point at objects that appear later in the document
//! - **Pluggable types**: a [`TypeRegistry`] maps logical type ids to constructors, so
//!   restored objects get their real Rust type
//! - **Custom hooks**: types implementing [`Persist`] decide exactly which named fields are
//!   stored, independent of their in-memory layout
//! - **Serde bridge**: [`to_value`] and [`from_value`] convert plain `Serialize` types
//!
//! ## Quick Start
//!
//! ```rust
//! use refgraph::{from_str, to_string, value};
//!
//! let user = value!({
//!     "id": 923,
//!     "name": "Ori",
//!     "isAdmin": true,
//!     "parent": null,
//!     "sibling": undefined
//! });
//!
//! let text = to_string(&user).unwrap();
//! assert_eq!(
//!     text,
//!     r#"[{"$$id":1,"$$type":"Object","id":923,"name":"Ori","isAdmin":true,"parent":null,"sibling":{"$$undefined": 1}}]"#
//! );
//!
//! let back = from_str(&text).unwrap();
//! assert!(back.deep_eq(&user));
//! ```
//!
//! ### Cycles
//!
//! ```rust
//! use refgraph::{from_str, to_string, ObjectRef, Value};
//!
//! let node = ObjectRef::record();
//! node.set("name", "loop").unwrap();
//! node.set("next", node.clone()).unwrap();
//!
//! let text = to_string(&Value::from(node)).unwrap();
//! assert_eq!(text, r#"[{"$$id":1,"$$type":"Object","name":"loop","next":"$$1"}]"#);
//!
//! let copy = from_str(&text).unwrap();
//! let copy = copy.as_object().unwrap();
//! assert!(copy.get("next").unwrap().as_object().unwrap().ptr_eq(copy));
//! ```
//!
//! ### Custom Types
//!
//! ```rust
//! use refgraph::{Engine, FieldBag, ObjectRef, Persist, Result, TypeRegistry, Value};
//! use std::sync::Arc;
//!
//! #[derive(Default)]
//! struct Point { coords: (f64, f64) }
//!
//! impl Persist for Point {
//!     fn serialize(&self, bag: &mut FieldBag) -> Result<()> {
//!         bag.add("x", self.coords.0)?;
//!         bag.add("y", self.coords.1)
//!     }
//!
//!     fn deserialize(&mut self, mut bag: FieldBag) -> Result<()> {
//!         self.coords = (f64::try_from(bag.take("x")?)?, f64::try_from(bag.take("y")?)?);
//!         Ok(())
//!     }
//! }
//!
//! let mut registry = TypeRegistry::new();
//! registry.register::<Point>("Point").unwrap();
//! let engine = Engine::with_registry(Arc::new(registry));
//!
//! let text = engine.to_string(&Value::from(ObjectRef::custom(Point { coords: (5.0, 10.0) }))).unwrap();
//! assert_eq!(text, r#"[{"$$id":1,"$$type":"Point","x":5,"y":10}]"#);
//!
//! let back = engine.from_str(&text).unwrap();
//! assert_eq!(back.as_object().unwrap().downcast_ref::<Point>().unwrap().coords, (5.0, 10.0));
//! ```
//!
//! ## Logging
//!
//! The crate emits [`tracing`] events: `debug` once per call with entry and object counts,
//! `trace` per entry and per deferred reference. Wrap a writer in [`TracingWriter`] to log
//! every token. No subscriber is installed by the library.
//!
//! ## Format Specification
//!
//! See the [`format`] module for the grammar and its limitations.

#[macro_use]
pub mod macros;

mod context;
mod de;
mod ser;

pub mod bag;
pub mod engine;
pub mod error;
pub mod format;
pub mod object;
pub mod options;
pub mod registry;
pub mod stream;
pub mod text;
pub mod value;

pub use bag::FieldBag;
pub use engine::Engine;
pub use error::{Error, Result};
pub use object::{AsAny, Object, ObjectRef, Persist, Record};
pub use options::Options;
pub use registry::{init_default_registry, TypeDescriptor, TypeKey, TypeRegistry, GENERIC_TYPE_ID};
pub use stream::{StreamReader, StreamWriter, TokenKind, TracingWriter};
pub use text::{TextReader, TextWriter};
pub use value::{from_value, to_value, Value, ValueSerializer};

use std::io;

/// Serializes a graph to text using the default registry.
///
/// # Examples
///
/// ```rust
/// use refgraph::{to_string, Value};
///
/// let text = to_string(&Value::from(vec![Value::from(1), Value::from("a")])).unwrap();
/// assert_eq!(text, r#"[[1,"a"]]"#);
/// ```
///
/// # Errors
///
/// Returns an error if the graph holds a type the default registry does not know or a value
/// the text format cannot carry.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn to_string(root: &Value) -> Result<String> {
    Engine::new().to_string(root)
}

/// Serializes a graph to text with custom options.
///
/// # Errors
///
/// Returns an error if the value cannot be serialized.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn to_string_with(root: &Value, options: &Options) -> Result<String> {
    Engine::new().with_options(options.clone()).to_string(root)
}

/// Serializes a graph to an I/O stream.
///
/// # Examples
///
/// ```rust
/// use refgraph::{to_writer, Value};
///
/// let mut buffer = Vec::new();
/// to_writer(&mut buffer, &Value::Null).unwrap();
/// assert_eq!(buffer, b"[null]");
/// ```
///
/// # Errors
///
/// Returns an error if serialization fails or writing to the writer fails.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn to_writer<W: io::Write>(mut writer: W, root: &Value) -> Result<()> {
    let text = to_string(root)?;
    writer
        .write_all(text.as_bytes())
        .map_err(|e| Error::io(&e.to_string()))
}

/// Deserializes a graph from text using the default registry.
///
/// # Examples
///
/// ```rust
/// use refgraph::{from_str, Value};
///
/// let value = from_str(r#"["text"]"#).unwrap();
/// assert_eq!(value, Value::from("text"));
/// ```
///
/// # Errors
///
/// Returns an error for malformed input (with the offending character and byte offset),
/// unknown type ids and references to ids that never appear.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn from_str(input: &str) -> Result<Value> {
    Engine::new().from_str(input)
}

/// Deserializes a graph from text with custom options.
///
/// # Errors
///
/// Returns an error if the input cannot be deserialized.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn from_str_with(input: &str, options: &Options) -> Result<Value> {
    Engine::new().with_options(options.clone()).from_str(input)
}

/// Deserializes a graph from UTF-8 bytes.
///
/// # Errors
///
/// Returns an error if the bytes are not valid UTF-8 or not a valid document.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn from_slice(bytes: &[u8]) -> Result<Value> {
    let input = std::str::from_utf8(bytes).map_err(|e| Error::custom(e.to_string()))?;
    from_str(input)
}

/// Deserializes a graph from an I/O stream.
///
/// # Examples
///
/// ```rust
/// use refgraph::{from_reader, Value};
/// use std::io::Cursor;
///
/// let value = from_reader(Cursor::new(b"[true]")).unwrap();
/// assert_eq!(value, Value::Bool(true));
/// ```
///
/// # Errors
///
/// Returns an error if reading fails or the input is not a valid document.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn from_reader<R: io::Read>(mut reader: R) -> Result<Value> {
    let mut input = String::new();
    reader
        .read_to_string(&mut input)
        .map_err(|e| Error::io(&e.to_string()))?;
    from_str(&input)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_fields_round_trip() {
        let user = value!({
            "id": 923,
            "name": "Ori",
            "isAdmin": true,
            "parent": null,
            "sibling": undefined
        });
        let text = to_string(&user).unwrap();
        let back = from_str(&text).unwrap();
        let back = back.as_object().unwrap();
        assert_eq!(back.get("id"), Some(Value::from(923)));
        assert_eq!(back.get("name"), Some(Value::from("Ori")));
        assert_eq!(back.get("isAdmin"), Some(Value::Bool(true)));
        assert_eq!(back.get("parent"), Some(Value::Null));
        assert_eq!(back.get("sibling"), Some(Value::Undefined));
    }

    #[test]
    fn test_from_slice_rejects_invalid_utf8() {
        assert!(from_slice(&[b'[', 0xff, b']']).is_err());
        assert_eq!(from_slice(b"[-1.5]").unwrap(), Value::from(-1.5));
    }

    #[test]
    fn test_to_writer_matches_to_string() {
        let root = value!([1, "two", [null]]);
        let mut buffer = Vec::new();
        to_writer(&mut buffer, &root).unwrap();
        assert_eq!(String::from_utf8(buffer).unwrap(), to_string(&root).unwrap());
    }

    #[test]
    fn test_options_are_applied() {
        let options = Options::new().with_strict_strings(false);
        assert_eq!(
            to_string_with(&Value::from("$$1"), &options).unwrap(),
            r#"["$$1"]"#
        );
        assert!(to_string(&Value::from("$$1")).is_err());

        let options = Options::new().with_allow_trailing_input(true);
        assert_eq!(from_str_with("[1]]", &options).unwrap(), Value::from(1));
    }
}
