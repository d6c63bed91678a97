//! Token-level contract between the graph engine and a concrete encoding.
//!
//! The engine never touches characters. It drives a [`StreamWriter`] with begin/next/end
//! calls for arrays, objects and fields plus typed scalar writes, and drives a
//! [`StreamReader`] the same way after asking it which [`TokenKind`] comes next. Any
//! encoding honouring this contract can replace [`TextWriter`](crate::TextWriter) and
//! [`TextReader`](crate::TextReader).
//!
//! ## Index discipline
//!
//! `*_next` and field calls take the zero-based position of the element inside its
//! container. Position 0 is the first element; separators are an encoding detail derived
//! from it. Readers return `false` from `*_next` when the container is exhausted.

use crate::Result;
use std::fmt;
use tracing::trace;

/// The kind of the next value in a stream, decided by lookahead alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Object,
    String,
    Number,
    Reference,
    Array,
    Boolean,
    Null,
    Undefined,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TokenKind::Object => "object",
            TokenKind::String => "string",
            TokenKind::Number => "number",
            TokenKind::Reference => "reference",
            TokenKind::Array => "array",
            TokenKind::Boolean => "boolean",
            TokenKind::Null => "null",
            TokenKind::Undefined => "undefined",
        };
        f.write_str(name)
    }
}

/// Write half of the token protocol.
///
/// Writers may refuse a value they cannot represent with
/// [`Error::UnsupportedValue`](crate::Error::UnsupportedValue); the path they report can be
/// left empty and is filled in by the engine.
pub trait StreamWriter {
    fn write_array_begin(&mut self) -> Result<()>;
    fn write_array_next(&mut self, index: usize) -> Result<()>;
    fn write_array_end(&mut self) -> Result<()>;

    fn write_object_begin(&mut self) -> Result<()>;
    fn write_object_end(&mut self) -> Result<()>;

    fn write_field_begin(&mut self, name: &str, index: usize) -> Result<()>;
    fn write_field_end(&mut self, name: &str, index: usize) -> Result<()>;

    fn write_string(&mut self, value: &str) -> Result<()>;
    fn write_number(&mut self, value: f64) -> Result<()>;
    fn write_boolean(&mut self, value: bool) -> Result<()>;
    fn write_null(&mut self) -> Result<()>;
    fn write_undefined(&mut self) -> Result<()>;
    fn write_reference(&mut self, id: u64) -> Result<()>;
}

/// Read half of the token protocol.
pub trait StreamReader {
    /// Sniffs the kind of the next value without consuming it.
    fn peek_kind(&mut self) -> Result<TokenKind>;

    fn read_array_begin(&mut self) -> Result<()>;
    /// Consumes the separator before element `index`, or returns `false` at the end.
    fn read_array_next(&mut self, index: usize) -> Result<bool>;
    fn read_array_end(&mut self) -> Result<()>;

    fn read_object_begin(&mut self) -> Result<()>;
    fn read_object_end(&mut self) -> Result<()>;

    /// Consumes the separator before field `index`, or returns `false` at the end.
    fn read_field_next(&mut self, index: usize) -> Result<bool>;
    /// Reads a field name and its name/value delimiter.
    fn read_field_begin(&mut self, index: usize) -> Result<String>;
    fn read_field_end(&mut self, index: usize) -> Result<()>;

    fn read_string(&mut self) -> Result<String>;
    fn read_number(&mut self) -> Result<f64>;
    fn read_boolean(&mut self) -> Result<bool>;
    fn read_null(&mut self) -> Result<()>;
    fn read_undefined(&mut self) -> Result<()>;
    fn read_reference(&mut self) -> Result<u64>;

    /// Called once the document has been read; rejects leftover input if the encoding cares.
    fn finish(&mut self) -> Result<()> {
        Ok(())
    }
}

impl<W: StreamWriter + ?Sized> StreamWriter for &mut W {
    fn write_array_begin(&mut self) -> Result<()> {
        (**self).write_array_begin()
    }

    fn write_array_next(&mut self, index: usize) -> Result<()> {
        (**self).write_array_next(index)
    }

    fn write_array_end(&mut self) -> Result<()> {
        (**self).write_array_end()
    }

    fn write_object_begin(&mut self) -> Result<()> {
        (**self).write_object_begin()
    }

    fn write_object_end(&mut self) -> Result<()> {
        (**self).write_object_end()
    }

    fn write_field_begin(&mut self, name: &str, index: usize) -> Result<()> {
        (**self).write_field_begin(name, index)
    }

    fn write_field_end(&mut self, name: &str, index: usize) -> Result<()> {
        (**self).write_field_end(name, index)
    }

    fn write_string(&mut self, value: &str) -> Result<()> {
        (**self).write_string(value)
    }

    fn write_number(&mut self, value: f64) -> Result<()> {
        (**self).write_number(value)
    }

    fn write_boolean(&mut self, value: bool) -> Result<()> {
        (**self).write_boolean(value)
    }

    fn write_null(&mut self) -> Result<()> {
        (**self).write_null()
    }

    fn write_undefined(&mut self) -> Result<()> {
        (**self).write_undefined()
    }

    fn write_reference(&mut self, id: u64) -> Result<()> {
        (**self).write_reference(id)
    }
}

/// A [`StreamWriter`] adapter that logs every token at `TRACE` level before forwarding it.
///
/// ```rust
/// use refgraph::{Engine, TextWriter, TracingWriter, Value};
///
/// let mut writer = TracingWriter::new(TextWriter::new());
/// Engine::new().serialize(&Value::from(1), &mut writer).unwrap();
/// assert_eq!(writer.into_inner().into_inner(), "[1]");
/// ```
#[derive(Debug)]
pub struct TracingWriter<W> {
    inner: W,
}

impl<W: StreamWriter> TracingWriter<W> {
    pub fn new(inner: W) -> Self {
        TracingWriter { inner }
    }

    pub fn get_ref(&self) -> &W {
        &self.inner
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: StreamWriter> StreamWriter for TracingWriter<W> {
    fn write_array_begin(&mut self) -> Result<()> {
        trace!("array begin");
        self.inner.write_array_begin()
    }

    fn write_array_next(&mut self, index: usize) -> Result<()> {
        trace!(index, "array next");
        self.inner.write_array_next(index)
    }

    fn write_array_end(&mut self) -> Result<()> {
        trace!("array end");
        self.inner.write_array_end()
    }

    fn write_object_begin(&mut self) -> Result<()> {
        trace!("object begin");
        self.inner.write_object_begin()
    }

    fn write_object_end(&mut self) -> Result<()> {
        trace!("object end");
        self.inner.write_object_end()
    }

    fn write_field_begin(&mut self, name: &str, index: usize) -> Result<()> {
        trace!(name, index, "field begin");
        self.inner.write_field_begin(name, index)
    }

    fn write_field_end(&mut self, name: &str, index: usize) -> Result<()> {
        self.inner.write_field_end(name, index)
    }

    fn write_string(&mut self, value: &str) -> Result<()> {
        trace!(value, "string");
        self.inner.write_string(value)
    }

    fn write_number(&mut self, value: f64) -> Result<()> {
        trace!(value, "number");
        self.inner.write_number(value)
    }

    fn write_boolean(&mut self, value: bool) -> Result<()> {
        trace!(value, "boolean");
        self.inner.write_boolean(value)
    }

    fn write_null(&mut self) -> Result<()> {
        trace!("null");
        self.inner.write_null()
    }

    fn write_undefined(&mut self) -> Result<()> {
        trace!("undefined");
        self.inner.write_undefined()
    }

    fn write_reference(&mut self, id: u64) -> Result<()> {
        trace!(id, "reference");
        self.inner.write_reference(id)
    }
}
