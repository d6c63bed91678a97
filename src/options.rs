//! Configuration options for graph serialization.
//!
//! [`Options`] is a plain builder. It also derives `Serialize`/`Deserialize` with
//! field defaults, so it can be embedded in an application's configuration file.
//!
//! ## Examples
//!
//! ```rust
//! use refgraph::{from_str_with, Options};
//!
//! let options = Options::new().with_allow_trailing_input(true);
//! let value = from_str_with("[7]\n", &options).unwrap();
//! assert_eq!(value.as_f64(), Some(7.0));
//! ```

use serde::{Deserialize, Serialize};

/// Limit on nesting depth used by [`Options::default`].
pub const DEFAULT_MAX_DEPTH: usize = 128;

/// Configuration for an [`Engine`](crate::Engine).
///
/// # Examples
///
/// ```rust
/// use refgraph::Options;
///
/// let options = Options::new().with_max_depth(16).with_strict_strings(false);
/// assert_eq!(options.max_depth, 16);
/// assert!(!options.allow_trailing_input);
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Options {
    /// How deeply arrays (and inline objects) may nest inside one entry.
    pub max_depth: usize,
    /// Accept input after the closing `]` of the document.
    pub allow_trailing_input: bool,
    /// Refuse strings and field names that would not read back unchanged.
    pub strict_strings: bool,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            max_depth: DEFAULT_MAX_DEPTH,
            allow_trailing_input: false,
            strict_strings: true,
        }
    }
}

impl Options {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    #[must_use]
    pub fn with_allow_trailing_input(mut self, allow: bool) -> Self {
        self.allow_trailing_input = allow;
        self
    }

    /// Strictness is enforced by the engine for reserved field names and by
    /// [`TextWriter`](crate::TextWriter) for quote characters.
    #[must_use]
    pub fn with_strict_strings(mut self, strict: bool) -> Self {
        self.strict_strings = strict;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = Options::default();
        assert_eq!(options.max_depth, DEFAULT_MAX_DEPTH);
        assert!(!options.allow_trailing_input);
        assert!(options.strict_strings);
    }

    #[test]
    fn test_loads_from_partial_config() {
        let options: Options = serde_json::from_str(r#"{"max_depth": 4}"#).unwrap();
        assert_eq!(options, Options::new().with_max_depth(4));
    }
}
