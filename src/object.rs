//! Reference-typed objects: records and hooked custom types.
//!
//! Everything the engine gives an identity to lives behind an [`ObjectRef`], a shared,
//! interior-mutable handle. Two clones of one handle are the *same* object: they serialize
//! to one `$$id` and come back as one shared instance.
//!
//! An object is either
//!
//! - a [`Record`]: named fields kept in insertion order, tagged with a record type name
//!   (the built-in generic record is named `"Object"`), or
//! - a custom type implementing [`Persist`], which decides itself which named fields are
//!   written through a [`FieldBag`].
//!
//! ## Examples
//!
//! ```rust
//! use refgraph::{ObjectRef, Value};
//!
//! let a = ObjectRef::record();
//! a.set("name", "a").unwrap();
//! a.set("self", a.clone()).unwrap();
//!
//! let this = a.get("self").unwrap();
//! assert!(this.as_object().unwrap().ptr_eq(&a));
//! ```

use crate::registry::{TypeKey, GENERIC_RECORD};
use crate::{Error, FieldBag, Result, Value};
use indexmap::IndexMap;
use std::any::Any;
use std::borrow::Cow;
use std::cell::{Ref, RefCell, RefMut};
use std::fmt;
use std::rc::Rc;

/// Access to `dyn Any` for any `'static` type, so hooked objects can be downcast.
pub trait AsAny {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Custom serialize/deserialize hooks.
///
/// A type implementing `Persist` controls exactly which named fields are persisted,
/// independent of its in-memory layout. `serialize` fills a fresh bag from `self`;
/// `deserialize` is called on an empty instance (built by the type's registry descriptor)
/// with the fields read from the document, in the order they were written.
///
/// References inside the bag are already resolved when `deserialize` runs. A hook must not
/// borrow its own `ObjectRef` (it is mutably borrowed for the duration of the call).
///
/// # Examples
///
/// ```rust
/// use refgraph::{FieldBag, Persist, Result};
///
/// #[derive(Default)]
/// struct Point {
///     coords: [f64; 2],
/// }
///
/// impl Persist for Point {
///     fn serialize(&self, bag: &mut FieldBag) -> Result<()> {
///         bag.add("x", self.coords[0])?;
///         bag.add("y", self.coords[1])
///     }
///
///     fn deserialize(&mut self, mut bag: FieldBag) -> Result<()> {
///         self.coords = [f64::try_from(bag.take("x")?)?, f64::try_from(bag.take("y")?)?];
///         Ok(())
///     }
/// }
/// ```
pub trait Persist: AsAny + 'static {
    fn serialize(&self, bag: &mut FieldBag) -> Result<()>;

    fn deserialize(&mut self, bag: FieldBag) -> Result<()>;

    /// Human-readable name used in diagnostics.
    fn type_name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

fn persist_any(persist: &dyn Persist) -> &dyn Any {
    AsAny::as_any(persist)
}

fn persist_any_mut(persist: &mut dyn Persist) -> &mut dyn Any {
    AsAny::as_any_mut(persist)
}

/// A field-enumerated object.
///
/// Fields keep insertion order; that order is the order they are written in.
#[derive(Clone, Debug, PartialEq)]
pub struct Record {
    type_name: Cow<'static, str>,
    fields: IndexMap<String, Value>,
}

impl Record {
    /// Creates an empty generic record (type `"Object"`).
    #[must_use]
    pub fn new() -> Self {
        Self::with_type(GENERIC_RECORD)
    }

    /// Creates an empty record of a named record type.
    ///
    /// The name must be registered (see [`TypeRegistry::register_record`](crate::TypeRegistry::register_record))
    /// for the record to be serializable.
    #[must_use]
    pub fn with_type(type_name: impl Into<Cow<'static, str>>) -> Self {
        Record {
            type_name: type_name.into(),
            fields: IndexMap::new(),
        }
    }

    #[must_use]
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Returns `true` for records of the built-in generic type.
    #[must_use]
    pub fn is_generic(&self) -> bool {
        self.type_name == GENERIC_RECORD
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Value> {
        self.fields.get_mut(name)
    }

    /// Inserts or overwrites a field, returning the previous value.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.fields.insert(name.into(), value.into())
    }

    /// Removes a field, keeping the order of the remaining ones.
    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.fields.shift_remove(name)
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Iterates over fields in insertion order.
    pub fn iter(&self) -> indexmap::map::Iter<'_, String, Value> {
        self.fields.iter()
    }

    pub fn keys(&self) -> indexmap::map::Keys<'_, String, Value> {
        self.fields.keys()
    }

    // Decoding rejects a repeated field name instead of overwriting.
    pub(crate) fn insert_new(&mut self, name: String, value: Value) -> Result<()> {
        if self.fields.contains_key(&name) {
            return Err(Error::DuplicateField(name));
        }
        self.fields.insert(name, value);
        Ok(())
    }
}

impl Default for Record {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Record {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut record = Record::new();
        for (name, value) in iter {
            record.insert(name, value);
        }
        record
    }
}

/// The body of a reference-typed instance.
pub enum Object {
    Record(Record),
    Custom(Box<dyn Persist>),
}

impl Object {
    /// The key the registry uses to find this object's logical type id.
    #[must_use]
    pub fn type_key(&self) -> TypeKey {
        match self {
            Object::Record(record) => TypeKey::Record(record.type_name.clone()),
            Object::Custom(custom) => TypeKey::Native(Any::type_id(persist_any(&**custom))),
        }
    }

    #[must_use]
    pub fn type_name(&self) -> &str {
        match self {
            Object::Record(record) => record.type_name(),
            Object::Custom(custom) => custom.type_name(),
        }
    }

    #[must_use]
    pub fn as_record(&self) -> Option<&Record> {
        match self {
            Object::Record(record) => Some(record),
            Object::Custom(_) => None,
        }
    }

    pub fn as_record_mut(&mut self) -> Option<&mut Record> {
        match self {
            Object::Record(record) => Some(record),
            Object::Custom(_) => None,
        }
    }

    #[must_use]
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        match self {
            Object::Custom(custom) => persist_any(&**custom).downcast_ref::<T>(),
            Object::Record(_) => None,
        }
    }

    pub fn downcast_mut<T: Any>(&mut self) -> Option<&mut T> {
        match self {
            Object::Custom(custom) => persist_any_mut(&mut **custom).downcast_mut::<T>(),
            Object::Record(_) => None,
        }
    }
}

impl fmt::Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Object::Record(record) => f.debug_tuple("Record").field(record).finish(),
            Object::Custom(custom) => write!(f, "Custom({})", custom.type_name()),
        }
    }
}

/// A shared handle to an [`Object`].
///
/// Equality is identity: two handles are equal when they point at the same instance.
/// `Debug` output is shallow so cyclic graphs can be printed.
#[derive(Clone)]
pub struct ObjectRef(Rc<RefCell<Object>>);

impl ObjectRef {
    pub fn new(object: Object) -> Self {
        ObjectRef(Rc::new(RefCell::new(object)))
    }

    /// Creates an empty generic record.
    #[must_use]
    pub fn record() -> Self {
        Self::from_record(Record::new())
    }

    pub fn from_record(record: Record) -> Self {
        Self::new(Object::Record(record))
    }

    pub fn custom<T: Persist>(value: T) -> Self {
        Self::new(Object::Custom(Box::new(value)))
    }

    /// Returns `true` if both handles point at the same instance.
    #[must_use]
    pub fn ptr_eq(&self, other: &ObjectRef) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Address of the shared instance; stable for as long as any handle is alive.
    #[must_use]
    pub fn addr(&self) -> usize {
        Rc::as_ptr(&self.0) as *const () as usize
    }

    pub fn borrow(&self) -> Ref<'_, Object> {
        self.0.borrow()
    }

    pub fn borrow_mut(&self) -> RefMut<'_, Object> {
        self.0.borrow_mut()
    }

    #[must_use]
    pub fn type_key(&self) -> TypeKey {
        self.0.borrow().type_key()
    }

    #[must_use]
    pub fn is_record(&self) -> bool {
        matches!(&*self.0.borrow(), Object::Record(_))
    }

    /// Returns a clone of a record field. Always `None` for custom objects.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Value> {
        self.0.borrow().as_record().and_then(|r| r.get(name).cloned())
    }

    /// Sets a record field, returning the previous value.
    ///
    /// # Errors
    ///
    /// Fails for custom objects, whose fields are owned by their [`Persist`] hooks.
    pub fn set(&self, name: impl Into<String>, value: impl Into<Value>) -> Result<Option<Value>> {
        let mut object = self.0.borrow_mut();
        match &mut *object {
            Object::Record(record) => Ok(record.insert(name, value)),
            Object::Custom(custom) => Err(Error::custom(format!(
                "cannot set field on custom object {}",
                custom.type_name()
            ))),
        }
    }

    /// Borrows the custom value inside, if it is a `T`.
    #[must_use]
    pub fn downcast_ref<T: Any>(&self) -> Option<Ref<'_, T>> {
        Ref::filter_map(self.0.borrow(), |object| object.downcast_ref::<T>()).ok()
    }

    #[must_use]
    pub fn downcast_mut<T: Any>(&self) -> Option<RefMut<'_, T>> {
        RefMut::filter_map(self.0.borrow_mut(), |object| object.downcast_mut::<T>()).ok()
    }
}

impl PartialEq for ObjectRef {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl fmt::Debug for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.try_borrow() {
            Ok(object) => write!(f, "ObjectRef({} @ {:#x})", object.type_name(), self.addr()),
            Err(_) => write!(f, "ObjectRef(<borrowed> @ {:#x})", self.addr()),
        }
    }
}

impl From<Record> for ObjectRef {
    fn from(record: Record) -> Self {
        ObjectRef::from_record(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Counter {
        hits: u32,
    }

    impl Persist for Counter {
        fn serialize(&self, bag: &mut FieldBag) -> Result<()> {
            bag.add("hits", f64::from(self.hits))
        }

        fn deserialize(&mut self, mut bag: FieldBag) -> Result<()> {
            self.hits = f64::try_from(bag.take("hits")?)? as u32;
            Ok(())
        }
    }

    #[test]
    fn test_record_keeps_insertion_order() {
        let mut record = Record::new();
        record.insert("b", 1);
        record.insert("a", 2);
        record.insert("c", 3);
        let keys: Vec<_> = record.keys().cloned().collect();
        assert_eq!(keys, vec!["b", "a", "c"]);
        assert!(record.is_generic());
    }

    #[test]
    fn test_insert_new_rejects_duplicates() {
        let mut record = Record::new();
        record.insert_new("x".to_string(), Value::from(1)).unwrap();
        let err = record.insert_new("x".to_string(), Value::from(2)).unwrap_err();
        assert_eq!(err, Error::DuplicateField("x".to_string()));
    }

    #[test]
    fn test_handles_compare_by_identity() {
        let a = ObjectRef::record();
        let b = ObjectRef::record();
        assert_eq!(a, a.clone());
        assert_ne!(a, b);
    }

    #[test]
    fn test_type_keys() {
        let record = ObjectRef::record();
        assert_eq!(record.type_key(), TypeKey::generic());

        let counter = ObjectRef::custom(Counter::default());
        assert_eq!(counter.type_key(), TypeKey::of::<Counter>());
    }

    #[test]
    fn test_downcast_custom() {
        let counter = ObjectRef::custom(Counter { hits: 3 });
        assert_eq!(counter.downcast_ref::<Counter>().unwrap().hits, 3);
        counter.downcast_mut::<Counter>().unwrap().hits = 4;
        assert_eq!(counter.downcast_ref::<Counter>().unwrap().hits, 4);
        assert!(counter.downcast_ref::<String>().is_none());
        assert!(counter.set("hits", 1).is_err());
    }

    #[test]
    fn test_debug_is_shallow_for_cycles() {
        let a = ObjectRef::record();
        a.set("me", a.clone()).unwrap();
        let rendered = format!("{:?}", Value::Object(a));
        assert!(rendered.contains("ObjectRef(Object"));
    }
}
