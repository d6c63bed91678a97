//! The self-describing text encoding.
//!
//! [`TextWriter`] appends tokens to a `String`; [`TextReader`] is a recursive-descent reader
//! over a borrowed `&str` that decides every token boundary from lookahead characters. There
//! is no whitespace, no escaping and no length prefix anywhere in the format (see
//! [`crate::format`] for the grammar).
//!
//! ```rust
//! use refgraph::{StreamReader, StreamWriter, TextReader, TextWriter, TokenKind};
//!
//! let mut writer = TextWriter::new();
//! writer.write_array_begin().unwrap();
//! writer.write_array_next(0).unwrap();
//! writer.write_reference(3).unwrap();
//! writer.write_array_end().unwrap();
//! assert_eq!(writer.as_str(), "[\"$$3\"]");
//!
//! let mut reader = TextReader::new(writer.as_str());
//! reader.read_array_begin().unwrap();
//! assert!(reader.read_array_next(0).unwrap());
//! assert_eq!(reader.peek_kind().unwrap(), TokenKind::Reference);
//! assert_eq!(reader.read_reference().unwrap(), 3);
//! ```

use crate::stream::{StreamReader, StreamWriter, TokenKind};
use crate::{Error, Result};
use std::fmt::Write as _;

/// Literal used for the undefined value.
pub const UNDEFINED_LITERAL: &str = "{\"$$undefined\": 1}";

/// Prefix shared by reference tokens and reserved field names.
pub const RESERVED_PREFIX: &str = "$$";

const FORBIDDEN_IN_NAMES: [char; 5] = ['"', '{', '}', '[', ']'];

/// Append-only writer producing the text encoding.
#[derive(Debug, Clone)]
pub struct TextWriter {
    output: String,
    strict: bool,
}

impl TextWriter {
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(256)
    }

    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        TextWriter {
            output: String::with_capacity(capacity),
            strict: true,
        }
    }

    /// When enabled (the default), strings and field names the reader could not recover
    /// are refused with [`Error::UnsupportedValue`] instead of being written verbatim.
    #[must_use]
    pub fn strict_strings(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.output
    }

    #[must_use]
    pub fn into_inner(self) -> String {
        self.output
    }

    fn separator(&mut self, index: usize) {
        if index > 0 {
            self.output.push(',');
        }
    }
}

impl Default for TextWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl StreamWriter for TextWriter {
    fn write_array_begin(&mut self) -> Result<()> {
        self.output.push('[');
        Ok(())
    }

    fn write_array_next(&mut self, index: usize) -> Result<()> {
        self.separator(index);
        Ok(())
    }

    fn write_array_end(&mut self) -> Result<()> {
        self.output.push(']');
        Ok(())
    }

    fn write_object_begin(&mut self) -> Result<()> {
        self.output.push('{');
        Ok(())
    }

    fn write_object_end(&mut self) -> Result<()> {
        self.output.push('}');
        Ok(())
    }

    fn write_field_begin(&mut self, name: &str, index: usize) -> Result<()> {
        if self.strict && name.contains(FORBIDDEN_IN_NAMES) {
            return Err(Error::unsupported_value(
                "",
                format!("field name {:?} contains a structural character", name),
            ));
        }
        self.separator(index);
        self.output.push('"');
        self.output.push_str(name);
        self.output.push_str("\":");
        Ok(())
    }

    fn write_field_end(&mut self, _name: &str, _index: usize) -> Result<()> {
        Ok(())
    }

    fn write_string(&mut self, value: &str) -> Result<()> {
        if self.strict {
            if value.contains('"') {
                return Err(Error::unsupported_value(
                    "",
                    "strings cannot contain '\"'",
                ));
            }
            if value.starts_with(RESERVED_PREFIX) {
                return Err(Error::unsupported_value(
                    "",
                    format!("strings cannot start with {:?}", RESERVED_PREFIX),
                ));
            }
        }
        self.output.push('"');
        self.output.push_str(value);
        self.output.push('"');
        Ok(())
    }

    fn write_number(&mut self, value: f64) -> Result<()> {
        if !value.is_finite() {
            return Err(Error::unsupported_value(
                "",
                format!("number {} is not finite", value),
            ));
        }
        write!(self.output, "{}", value).map_err(|e| Error::io(&e.to_string()))
    }

    fn write_boolean(&mut self, value: bool) -> Result<()> {
        self.output.push_str(if value { "true" } else { "false" });
        Ok(())
    }

    fn write_null(&mut self) -> Result<()> {
        self.output.push_str("null");
        Ok(())
    }

    fn write_undefined(&mut self) -> Result<()> {
        self.output.push_str(UNDEFINED_LITERAL);
        Ok(())
    }

    fn write_reference(&mut self, id: u64) -> Result<()> {
        write!(self.output, "\"{}{}\"", RESERVED_PREFIX, id).map_err(|e| Error::io(&e.to_string()))
    }
}

/// Lookahead reader over the text encoding.
///
/// Every error carries the offending character (or end of input) and its byte offset.
#[derive(Debug, Clone)]
pub struct TextReader<'a> {
    input: &'a str,
    position: usize,
    allow_trailing: bool,
}

impl<'a> TextReader<'a> {
    #[must_use]
    pub fn new(input: &'a str) -> Self {
        TextReader {
            input,
            position: 0,
            allow_trailing: false,
        }
    }

    /// Accept input after the end of the document instead of failing in [`finish`](StreamReader::finish).
    #[must_use]
    pub fn allow_trailing(mut self, allow: bool) -> Self {
        self.allow_trailing = allow;
        self
    }

    /// Current byte offset into the input.
    #[must_use]
    pub fn position(&self) -> usize {
        self.position
    }

    fn rest(&self) -> &'a str {
        &self.input[self.position..]
    }

    fn peek_char(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn next_char(&mut self) -> Option<char> {
        let ch = self.peek_char()?;
        self.position += ch.len_utf8();
        Some(ch)
    }

    fn unexpected(&self, expected: &str) -> Error {
        Error::syntax(self.peek_char(), self.position, expected)
    }

    fn expect_char(&mut self, expected: char) -> Result<()> {
        if self.peek_char() == Some(expected) {
            self.position += expected.len_utf8();
            Ok(())
        } else {
            Err(self.unexpected(&format!("'{}'", expected)))
        }
    }

    fn expect_token(&mut self, token: &str) -> Result<()> {
        for expected in token.chars() {
            self.expect_char(expected)?;
        }
        Ok(())
    }

    // Reads up to the closing quote, which is consumed.
    fn read_until_quote(&mut self, forbidden: &[char]) -> Result<&'a str> {
        let start = self.position;
        loop {
            match self.peek_char() {
                Some('"') => {
                    let text = &self.input[start..self.position];
                    self.position += 1;
                    return Ok(text);
                }
                Some(ch) if !forbidden.contains(&ch) => {
                    self.position += ch.len_utf8();
                }
                _ => return Err(self.unexpected("'\"'")),
            }
        }
    }

    fn read_digits(&mut self, allow_dot: bool) -> Result<&'a str> {
        let start = self.position;
        let mut dot_seen = false;
        while let Some(ch) = self.peek_char() {
            match ch {
                '0'..='9' => self.position += 1,
                '.' if allow_dot && !dot_seen => {
                    dot_seen = true;
                    self.position += 1;
                }
                '.' => return Err(self.unexpected("a digit")),
                _ => break,
            }
        }
        if self.input[start..self.position].bytes().any(|b| b.is_ascii_digit()) {
            Ok(&self.input[start..self.position])
        } else {
            Err(self.unexpected("a digit"))
        }
    }
}

impl<'a> StreamReader for TextReader<'a> {
    fn peek_kind(&mut self) -> Result<TokenKind> {
        let rest = self.rest();
        let kind = if rest.starts_with("\"$$") {
            TokenKind::Reference
        } else if rest.starts_with('"') {
            TokenKind::String
        } else if rest.starts_with("{\"$$u") {
            TokenKind::Undefined
        } else if rest.starts_with('{') {
            TokenKind::Object
        } else if rest.starts_with('[') {
            TokenKind::Array
        } else if rest.starts_with("nu") {
            TokenKind::Null
        } else if rest.starts_with(['t', 'f']) {
            TokenKind::Boolean
        } else if rest.starts_with(|ch: char| ch.is_ascii_digit() || ch == '-') {
            TokenKind::Number
        } else {
            return Err(self.unexpected("a value"));
        };
        Ok(kind)
    }

    fn read_array_begin(&mut self) -> Result<()> {
        self.expect_char('[')
    }

    fn read_array_next(&mut self, index: usize) -> Result<bool> {
        match self.peek_char() {
            Some(']') => Ok(false),
            None => Err(self.unexpected("']'")),
            Some(_) if index == 0 => Ok(true),
            Some(_) => self.expect_char(',').map(|()| true),
        }
    }

    fn read_array_end(&mut self) -> Result<()> {
        self.expect_char(']')
    }

    fn read_object_begin(&mut self) -> Result<()> {
        self.expect_char('{')
    }

    fn read_object_end(&mut self) -> Result<()> {
        self.expect_char('}')
    }

    fn read_field_next(&mut self, index: usize) -> Result<bool> {
        match self.peek_char() {
            Some('}') => Ok(false),
            Some(',') if index > 0 => {
                self.position += 1;
                Ok(true)
            }
            _ if index == 0 => Ok(true),
            _ => Err(self.unexpected("',' or '}'")),
        }
    }

    fn read_field_begin(&mut self, _index: usize) -> Result<String> {
        self.expect_char('"')?;
        let name = self.read_until_quote(&['{', '}', '[', ']'])?;
        self.expect_char(':')?;
        Ok(name.to_string())
    }

    fn read_field_end(&mut self, _index: usize) -> Result<()> {
        Ok(())
    }

    fn read_string(&mut self) -> Result<String> {
        self.expect_char('"')?;
        self.read_until_quote(&[]).map(str::to_string)
    }

    fn read_number(&mut self) -> Result<f64> {
        let start = self.position;
        if self.peek_char() == Some('-') {
            self.position += 1;
        }
        self.read_digits(true)?;
        let text = &self.input[start..self.position];
        text.parse::<f64>()
            .map_err(|_| Error::syntax(text.chars().next(), start, "a number"))
    }

    fn read_boolean(&mut self) -> Result<bool> {
        match self.peek_char() {
            Some('t') => self.expect_token("true").map(|()| true),
            Some('f') => self.expect_token("false").map(|()| false),
            _ => Err(self.unexpected("'true' or 'false'")),
        }
    }

    fn read_null(&mut self) -> Result<()> {
        self.expect_token("null")
    }

    fn read_undefined(&mut self) -> Result<()> {
        self.expect_token(UNDEFINED_LITERAL)
    }

    fn read_reference(&mut self) -> Result<u64> {
        self.expect_token("\"$$")?;
        let start = self.position;
        let digits = self.read_digits(false)?;
        let id = digits
            .parse::<u64>()
            .map_err(|_| Error::syntax(digits.chars().next(), start, "an object id"))?;
        self.expect_char('"')?;
        Ok(id)
    }

    fn finish(&mut self) -> Result<()> {
        if self.allow_trailing || self.position == self.input.len() {
            Ok(())
        } else {
            Err(self.unexpected("end of input"))
        }
    }
}
