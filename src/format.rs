//! The refgraph text format
//!
//! This module documents the text encoding produced by [`TextWriter`](crate::TextWriter)
//! and read by [`TextReader`](crate::TextReader).
//!
//! # Overview
//!
//! A document is a flat array of *entries*. The first entry is the root value. Every object
//! in the graph appears exactly once, as its own entry; everywhere else it is mentioned by
//! reference. Cycles therefore never nest, and the writer never recurses into an object
//! from inside another one.
//!
//! The format borrows JSON's punctuation but is deliberately smaller: there is no
//! whitespace, no escaping and no length prefix. Every token boundary is found by looking
//! at the next few characters.
//!
//! # Grammar
//!
//! ```text
//! document  = "[" entry *( "," entry ) "]"
//! entry     = value
//! value     = reference / string / undefined / object / array / null / boolean / number
//! reference = %x22 "$$" 1*DIGIT %x22
//! string    = %x22 *( any character except %x22 ) %x22
//! undefined = "{" %x22 "$$undefined" %x22 ": 1}"
//! object    = "{" %x22 "$$id" %x22 ":" id "," %x22 "$$type" %x22 ":" string
//!             *( "," field ) "}"
//! field     = %x22 name %x22 ":" value
//! name      = *( any character except %x22 "{" "}" "[" "]" )
//! array     = "[" [ value *( "," value ) ] "]"
//! number    = [ "-" ] digits-with-at-most-one-dot
//! ```
//!
//! Note the single space inside the undefined literal: `{"$$undefined": 1}`.
//!
//! # Objects
//!
//! The first two fields of every object are mandatory and fixed:
//!
//! | Position | Name | Value |
//! |----------|------|-------|
//! | 0 | `$$id` | positive integer identity, unique within the document |
//! | 1 | `$$type` | logical type id, resolved through the [`TypeRegistry`](crate::TypeRegistry) |
//!
//! Data fields follow in the order the record holds them, or in the order a custom type's
//! hook added them to its [`FieldBag`](crate::FieldBag). Identities are assigned in the
//! order objects are discovered, starting at 1, so entries appear in id order.
//!
//! # Value Sniffing
//!
//! The reader decides what comes next from lookahead alone, in this order:
//!
//! | Lookahead | Kind |
//! |-----------|------|
//! | `"$$` | reference |
//! | `"` | string |
//! | `{"$$u` | undefined |
//! | `{` | object |
//! | `[` | array |
//! | `nu` | null |
//! | `t` or `f` | boolean |
//! | digit or `-` | number |
//!
//! The order matters: a string starting with `$$` would be read as a reference, which is
//! why the writer refuses such strings.
//!
//! # Example
//!
//! Two users pointing at each other:
//!
//! ```text
//! [{"$$id":1,"$$type":"Object","name":"Ori","sibling":"$$2"},{"$$id":2,"$$type":"Object","name":"Roni","sibling":"$$1"}]
//! ```
//!
//! # Limitations
//!
//! - **Strings**: cannot contain `"` and cannot start with `$$`
//! - **Field names**: cannot contain `"`, `{`, `}`, `[`, `]`; names starting with `$$` are reserved
//! - **Numbers**: must be finite; integers above 2^53 lose precision
//! - **Arrays**: are values, not objects, so two references to one `Vec` are written twice
//!
//! With [`Options::strict_strings`](crate::Options::strict_strings) enabled (the default)
//! the writer refuses all of the above with
//! [`Error::UnsupportedValue`](crate::Error::UnsupportedValue), so every document it
//! produces reads back unchanged.

// This module contains only documentation; no implementation code
