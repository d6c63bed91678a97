//! Error types for graph serialization and deserialization.
//!
//! Every failure is fatal to the current `serialize`/`deserialize` call: there is no
//! partial-result contract and nothing is retried internally.
//!
//! ## Error Categories
//!
//! - **Unsupported values**: a value the text grammar cannot represent
//! - **Syntax errors**: lookahead mismatch, with the offending character and byte offset
//! - **Registry errors**: unknown type ids, unregistered types, duplicate registrations
//! - **Graph errors**: references to ids that never appeared in the document
//! - **Field bag errors**: duplicate or missing field names
//!
//! ## Examples
//!
//! ```rust
//! use refgraph::{from_str, Error};
//!
//! let result = from_str("[{\"$$id\":1");
//! assert!(matches!(result, Err(Error::Syntax { .. })));
//! ```

use std::fmt;
use thiserror::Error;

/// Represents all possible errors that can occur while writing or reading an object graph.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// IO error during reading or writing
    #[error("IO error: {0}")]
    Io(String),

    /// A value that falls outside what the text grammar can carry
    #[error("Unsupported value at {path}: {reason}")]
    UnsupportedValue { path: String, reason: String },

    /// Lookahead did not match any token expected at this grammar position
    #[error("Unexpected {} at position {offset}. Expecting {expected}", display_found(.found))]
    Syntax {
        found: Option<char>,
        offset: usize,
        expected: String,
    },

    /// A `$$type` id with no registry entry
    #[error("Type id \"{0}\" was not found")]
    UnregisteredTypeId(String),

    /// An instance whose type has no registry entry
    #[error("Unregistered type encountered: {0}")]
    UnregisteredType(String),

    /// A type routed to custom handling that lacks the needed hook
    #[error("Type \"{type_id}\" has no {capability} capability")]
    MissingCapability {
        type_id: String,
        capability: &'static str,
    },

    /// A reference id with no corresponding instance
    #[error("Invalid reference $${0}")]
    InvalidReference(u64),

    /// Two entries in one document claiming the same `$$id`
    #[error("Object id {0} appears more than once")]
    DuplicateObjectId(u64),

    /// An entry object missing its leading `$$id` or `$$type` field
    #[error("Entry is missing its {0} header")]
    MissingHeader(&'static str),

    /// A field name that is already present
    #[error("Field: {0} already exists")]
    DuplicateField(String),

    /// A type id registered twice in the same registry
    #[error("id: {0} is already registered")]
    DuplicateTypeId(String),

    /// A field lookup on a bag or record that has no such field
    #[error("Field {0} does not exist")]
    FieldNotFound(String),

    /// Inline arrays nested deeper than the configured limit
    #[error("Nesting depth limit of {0} exceeded")]
    DepthLimitExceeded(usize),

    /// Custom error
    #[error("Error: {0}")]
    Custom(String),
}

fn display_found(found: &Option<char>) -> String {
    match found {
        Some(ch) => format!("character '{}'", ch),
        None => "end of input".to_string(),
    }
}

impl Error {
    /// Creates a syntax error for an unexpected character (or end of input) at `offset`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use refgraph::Error;
    ///
    /// let err = Error::syntax(Some('x'), 3, "'{'");
    /// assert!(err.to_string().contains("position 3"));
    /// ```
    pub fn syntax(found: Option<char>, offset: usize, expected: &str) -> Self {
        Error::Syntax {
            found,
            offset,
            expected: expected.to_string(),
        }
    }

    /// Creates an unsupported value error; `path` locates the value inside its entry.
    pub fn unsupported_value(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::UnsupportedValue {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn missing_capability(type_id: &str, capability: &'static str) -> Self {
        Error::MissingCapability {
            type_id: type_id.to_string(),
            capability,
        }
    }

    /// Creates a custom error with a display message.
    ///
    /// Custom [`Persist`](crate::Persist) hooks use this to report values of the wrong shape.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use refgraph::Error;
    ///
    /// let err = Error::custom("x must be a number");
    /// assert!(err.to_string().contains("x must be a number"));
    /// ```
    pub fn custom<T: fmt::Display>(msg: T) -> Self {
        Error::Custom(msg.to_string())
    }

    /// Creates an I/O error for reader/writer failures.
    pub fn io(msg: &str) -> Self {
        Error::Io(msg.to_string())
    }

    /// Returns `true` for errors raised by the text reader.
    #[must_use]
    pub fn is_syntax(&self) -> bool {
        matches!(self, Error::Syntax { .. })
    }
}

impl serde::ser::Error for Error {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        Error::Custom(msg.to_string())
    }
}

impl serde::de::Error for Error {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        Error::Custom(msg.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
