//! Ordered field collection exchanged with custom hooks.
//!
//! [`FieldBag`] is a thin wrapper around [`IndexMap`] that keeps insertion order. The
//! engine writes a bag's fields in exactly that order, and hands a decoded bag to
//! [`Persist::deserialize`](crate::Persist::deserialize) in document order, so custom types
//! may depend on field order.
//!
//! ## Examples
//!
//! ```rust
//! use refgraph::{FieldBag, Value};
//!
//! let mut bag = FieldBag::new();
//! bag.add("x", 5).unwrap();
//! bag.add("y", 10).unwrap();
//! assert!(bag.add("x", 6).is_err());
//!
//! assert_eq!(bag.get("y").unwrap(), &Value::from(10));
//! let names: Vec<_> = bag.iter().map(|(name, _)| name).collect();
//! assert_eq!(names, vec!["x", "y"]);
//! ```

use crate::{Error, Result, Value};
use indexmap::IndexMap;

/// An insertion-ordered, name-keyed collection of field values.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldBag(IndexMap<String, Value>);

impl FieldBag {
    #[must_use]
    pub fn new() -> Self {
        FieldBag(IndexMap::new())
    }

    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        FieldBag(IndexMap::with_capacity(capacity))
    }

    /// Adds a new field.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DuplicateField`] if `name` is already present, so a hook cannot
    /// emit the same field twice by accident.
    pub fn add(&mut self, name: impl Into<String>, value: impl Into<Value>) -> Result<()> {
        let name = name.into();
        if self.0.contains_key(&name) {
            return Err(Error::DuplicateField(name));
        }
        self.0.insert(name, value.into());
        Ok(())
    }

    /// Sets a field, overwriting any previous value in place.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(name.into(), value.into());
    }

    #[must_use]
    pub fn has(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    /// Returns the value of a field.
    ///
    /// # Errors
    ///
    /// Returns [`Error::FieldNotFound`] if the field is absent.
    pub fn get(&self, name: &str) -> Result<&Value> {
        self.0
            .get(name)
            .ok_or_else(|| Error::FieldNotFound(name.to_string()))
    }

    pub(crate) fn get_mut(&mut self, name: &str) -> Option<&mut Value> {
        self.0.get_mut(name)
    }

    /// Moves a field's value out of the bag.
    ///
    /// # Errors
    ///
    /// Returns [`Error::FieldNotFound`] if the field is absent.
    pub fn take(&mut self, name: &str) -> Result<Value> {
        self.0
            .shift_remove(name)
            .ok_or_else(|| Error::FieldNotFound(name.to_string()))
    }

    /// All entries in insertion order.
    #[must_use]
    pub fn get_all(&self) -> Vec<(&str, &Value)> {
        self.iter().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter().map(|(name, value)| (name.as_str(), value))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl IntoIterator for FieldBag {
    type Item = (String, Value);
    type IntoIter = indexmap::map::IntoIter<String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}
