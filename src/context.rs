//! Per-call bookkeeping shared by the write and read paths.
//!
//! Both directions keep a stack of [`Frame`]s describing where in the document they are.
//! The write path renders it into error locations; the read path walks it to find out
//! which holder a reference placeholder belongs to.

use crate::ObjectRef;
use std::fmt::{self, Write as _};

/// One level of the context stack.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Frame {
    /// Position in the top-level sequence.
    Entry(usize),
    /// An object carrying this `$$id`.
    Object(u64),
    Field(String),
    Index(usize),
}

/// One step below a holder on the way to a placeholder.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Step {
    Field(String),
    Index(usize),
}

/// The container a reference placeholder was written into.
#[derive(Debug, Clone)]
pub(crate) enum Holder {
    /// The value of the first entry.
    Root,
    /// A record under construction.
    Object(ObjectRef),
    /// The field bag of a custom object, by slot in the pending-hook list.
    Bag(usize),
    /// A later entry that is not an object; its references are only validated.
    Detached,
}

/// A placeholder to be replaced once every entry has been read.
#[derive(Debug)]
pub(crate) struct Patch {
    pub(crate) holder: Holder,
    pub(crate) path: Vec<Step>,
    pub(crate) id: u64,
}

/// Renders a frame stack as a location such as `entry 1 ($$2).tags[0]`.
pub(crate) struct Location<'a>(pub(crate) &'a [Frame]);

impl fmt::Display for Location<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("document");
        }
        for frame in self.0 {
            match frame {
                Frame::Entry(index) => write!(f, "entry {}", index)?,
                Frame::Object(id) => write!(f, " ($${})", id)?,
                Frame::Field(name) => {
                    f.write_char('.')?;
                    f.write_str(name)?;
                }
                Frame::Index(index) => write!(f, "[{}]", index)?,
            }
        }
        Ok(())
    }
}
