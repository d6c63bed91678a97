//! Dynamic value representation for object graphs.
//!
//! [`Value`] is the serializable universe: null, undefined, booleans, numbers, strings,
//! sequences, and reference-typed objects. Sequences are plain values and are written
//! inline; objects ([`ObjectRef`]) carry identity and may form cycles.
//!
//! ## Usage Patterns
//!
//! ### Creating Values
//!
//! ```rust
//! use refgraph::{value, ObjectRef, Value};
//!
//! let number = Value::from(42);
//! let text = Value::from("hello");
//! let list = Value::from(vec![Value::from(1), Value::Undefined]);
//!
//! let user = value!({
//!     "name": "Ori",
//!     "isAdmin": true
//! });
//! assert!(user.is_object());
//! ```
//!
//! ### Comparing Graphs
//!
//! `==` compares objects by identity. [`Value::deep_eq`] compares structure and terminates
//! on cyclic graphs:
//!
//! ```rust
//! use refgraph::{ObjectRef, Value};
//!
//! let a = ObjectRef::record();
//! a.set("me", a.clone()).unwrap();
//! let b = ObjectRef::record();
//! b.set("me", b.clone()).unwrap();
//!
//! assert_ne!(Value::from(a.clone()), Value::from(b.clone()));
//! assert!(Value::from(a).deep_eq(&Value::from(b)));
//! ```

mod de;
mod ser;

pub use de::from_value;
pub use ser::{to_value, ValueSerializer};

use crate::object::{Object, ObjectRef, Record};
use crate::{Error, FieldBag, Result};
use std::collections::HashSet;
use std::fmt;

/// A dynamically-typed graph value.
#[derive(Clone, Debug, PartialEq, Default)]
pub enum Value {
    #[default]
    Null,
    Undefined,
    Bool(bool),
    Number(f64),
    String(String),
    Array(Vec<Value>),
    Object(ObjectRef),
}

impl Value {
    /// Returns `true` if the value is null.
    #[inline]
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    #[inline]
    #[must_use]
    pub const fn is_undefined(&self) -> bool {
        matches!(self, Value::Undefined)
    }

    #[inline]
    #[must_use]
    pub const fn is_bool(&self) -> bool {
        matches!(self, Value::Bool(_))
    }

    #[inline]
    #[must_use]
    pub const fn is_number(&self) -> bool {
        matches!(self, Value::Number(_))
    }

    #[inline]
    #[must_use]
    pub const fn is_string(&self) -> bool {
        matches!(self, Value::String(_))
    }

    #[inline]
    #[must_use]
    pub const fn is_array(&self) -> bool {
        matches!(self, Value::Array(_))
    }

    #[inline]
    #[must_use]
    pub const fn is_object(&self) -> bool {
        matches!(self, Value::Object(_))
    }

    #[inline]
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    #[inline]
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Returns the number as an `i64` if it has no fractional part and fits.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use refgraph::Value;
    ///
    /// assert_eq!(Value::from(42).as_i64(), Some(42));
    /// assert_eq!(Value::from(42.5).as_i64(), None);
    /// ```
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Number(n) => f64_to_i64(*n),
            _ => None,
        }
    }

    #[inline]
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    #[inline]
    #[must_use]
    pub fn as_array(&self) -> Option<&Vec<Value>> {
        match self {
            Value::Array(arr) => Some(arr),
            _ => None,
        }
    }

    #[inline]
    pub fn as_array_mut(&mut self) -> Option<&mut Vec<Value>> {
        match self {
            Value::Array(arr) => Some(arr),
            _ => None,
        }
    }

    #[inline]
    #[must_use]
    pub fn as_object(&self) -> Option<&ObjectRef> {
        match self {
            Value::Object(obj) => Some(obj),
            _ => None,
        }
    }

    /// Short name of the value's kind, for error messages.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Undefined => "undefined",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
        }
    }

    /// Structural equality that follows object references and terminates on cycles.
    ///
    /// Records match when they have the same type name and the same set of fields with
    /// deeply equal values; field order is ignored. Custom objects match when they are of
    /// the same type and their `serialize` hooks produce deeply equal bags. A pair of
    /// objects already under comparison is assumed equal, which makes isomorphic cyclic
    /// graphs compare equal.
    #[must_use]
    pub fn deep_eq(&self, other: &Value) -> bool {
        DeepEq::default().values(self, other)
    }
}

fn f64_to_i64(n: f64) -> Option<i64> {
    if n.fract() == 0.0 && n >= i64::MIN as f64 && n <= i64::MAX as f64 {
        Some(n as i64)
    } else {
        None
    }
}

#[derive(Default)]
struct DeepEq {
    assumed: HashSet<(usize, usize)>,
}

impl DeepEq {
    fn values(&mut self, a: &Value, b: &Value) -> bool {
        match (a, b) {
            (Value::Array(xs), Value::Array(ys)) => {
                xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| self.values(x, y))
            }
            (Value::Object(x), Value::Object(y)) => self.objects(x, y),
            _ => a == b,
        }
    }

    fn objects(&mut self, a: &ObjectRef, b: &ObjectRef) -> bool {
        if a.ptr_eq(b) || !self.assumed.insert((a.addr(), b.addr())) {
            return true;
        }
        let (left, right) = (a.borrow(), b.borrow());
        match (&*left, &*right) {
            (Object::Record(x), Object::Record(y)) => self.records(x, y),
            (Object::Custom(x), Object::Custom(y)) => {
                if left.type_key() != right.type_key() {
                    return false;
                }
                let (mut bx, mut by) = (FieldBag::new(), FieldBag::new());
                if x.serialize(&mut bx).is_err() || y.serialize(&mut by).is_err() {
                    return false;
                }
                self.bags(&bx, &by)
            }
            _ => false,
        }
    }

    fn records(&mut self, x: &Record, y: &Record) -> bool {
        x.type_name() == y.type_name()
            && x.len() == y.len()
            && x
                .iter()
                .all(|(name, value)| y.get(name).map_or(false, |other| self.values(value, other)))
    }

    fn bags(&mut self, x: &FieldBag, y: &FieldBag) -> bool {
        x.len() == y.len()
            && x
                .iter()
                .all(|(name, value)| y.get(name).map_or(false, |other| self.values(value, other)))
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Undefined => write!(f, "undefined"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Number(n) => write!(f, "{}", n),
            Value::String(s) => write!(f, "\"{}\"", s),
            Value::Array(arr) => {
                write!(
                    f,
                    "[{}]",
                    arr.iter()
                        .map(|v| v.to_string())
                        .collect::<Vec<_>>()
                        .join(",")
                )
            }
            Value::Object(obj) => write!(f, "{{{}}}", obj.borrow().type_name()),
        }
    }
}

// TryFrom implementations for extracting values inside Persist hooks
impl TryFrom<Value> for f64 {
    type Error = Error;

    fn try_from(value: Value) -> Result<Self> {
        match value {
            Value::Number(n) => Ok(n),
            other => Err(Error::custom(format!("expected number, found {}", other.kind()))),
        }
    }
}

impl TryFrom<Value> for i64 {
    type Error = Error;

    fn try_from(value: Value) -> Result<Self> {
        match value {
            Value::Number(n) => f64_to_i64(n)
                .ok_or_else(|| Error::custom(format!("cannot convert {} to i64", n))),
            other => Err(Error::custom(format!("expected integer, found {}", other.kind()))),
        }
    }
}

impl TryFrom<Value> for bool {
    type Error = Error;

    fn try_from(value: Value) -> Result<Self> {
        match value {
            Value::Bool(b) => Ok(b),
            other => Err(Error::custom(format!("expected boolean, found {}", other.kind()))),
        }
    }
}

impl TryFrom<Value> for String {
    type Error = Error;

    fn try_from(value: Value) -> Result<Self> {
        match value {
            Value::String(s) => Ok(s),
            other => Err(Error::custom(format!("expected string, found {}", other.kind()))),
        }
    }
}

impl TryFrom<Value> for Vec<Value> {
    type Error = Error;

    fn try_from(value: Value) -> Result<Self> {
        match value {
            Value::Array(arr) => Ok(arr),
            other => Err(Error::custom(format!("expected array, found {}", other.kind()))),
        }
    }
}

impl TryFrom<Value> for ObjectRef {
    type Error = Error;

    fn try_from(value: Value) -> Result<Self> {
        match value {
            Value::Object(obj) => Ok(obj),
            other => Err(Error::custom(format!("expected object, found {}", other.kind()))),
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

macro_rules! from_number {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Value {
                fn from(value: $ty) -> Self {
                    Value::Number(f64::from(value))
                }
            }
        )*
    };
}

from_number!(i8, i16, i32, u8, u16, u32, f32, f64);

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Number(value as f64)
    }
}

impl From<u64> for Value {
    fn from(value: u64) -> Self {
        Value::Number(value as f64)
    }
}

impl From<usize> for Value {
    fn from(value: usize) -> Self {
        Value::Number(value as f64)
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<Vec<Value>> for Value {
    fn from(value: Vec<Value>) -> Self {
        Value::Array(value)
    }
}

impl From<ObjectRef> for Value {
    fn from(value: ObjectRef) -> Self {
        Value::Object(value)
    }
}

impl From<&ObjectRef> for Value {
    fn from(value: &ObjectRef) -> Self {
        Value::Object(value.clone())
    }
}

impl From<Record> for Value {
    fn from(value: Record) -> Self {
        Value::Object(ObjectRef::from_record(value))
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Null, Into::into)
    }
}
