//! Logical type ids and the descriptors that build instances for them.
//!
//! A [`TypeRegistry`] is a bidirectional map between logical type ids (the strings written
//! as `$$type`) and [`TypeDescriptor`]s. Registries form a parent chain: a lookup that misses
//! locally is retried against the parent before failing.
//!
//! The process-wide default registry holds only the built-in generic record type, id
//! `"Object"`. [`TypeRegistry::new`] chains to it, so application types can be registered in
//! a scoped registry without touching the shared default.
//!
//! ## Examples
//!
//! ```rust
//! use refgraph::{FieldBag, Persist, Result, TypeRegistry};
//!
//! #[derive(Default)]
//! struct Point { x: f64, y: f64 }
//!
//! impl Persist for Point {
//!     fn serialize(&self, bag: &mut FieldBag) -> Result<()> {
//!         bag.add("x", self.x)?;
//!         bag.add("y", self.y)
//!     }
//!     fn deserialize(&mut self, mut bag: FieldBag) -> Result<()> {
//!         self.x = f64::try_from(bag.take("x")?)?;
//!         self.y = f64::try_from(bag.take("y")?)?;
//!         Ok(())
//!     }
//! }
//!
//! let mut registry = TypeRegistry::new();
//! registry.register::<Point>("geo.Point").unwrap();
//! assert!(registry.register::<Point>("geo.Point").is_err());
//!
//! // The generic record id is reached through the default parent.
//! assert!(registry.descriptor_by_type_id("Object").is_ok());
//! ```

use crate::object::{Object, Persist, Record};
use crate::{Error, Result};
use std::any::TypeId;
use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, OnceLock};
use tracing::debug;

/// Logical type id of the built-in generic record.
pub const GENERIC_TYPE_ID: &str = "Object";

/// Record type name of the built-in generic record.
pub const GENERIC_RECORD: &str = "Object";

/// Structural identity of a runtime type.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum TypeKey {
    /// A field-enumerated record type, by record type name.
    Record(Cow<'static, str>),
    /// A Rust type with [`Persist`] hooks.
    Native(TypeId),
}

impl TypeKey {
    #[must_use]
    pub fn generic() -> Self {
        TypeKey::Record(Cow::Borrowed(GENERIC_RECORD))
    }

    #[must_use]
    pub fn of<T: Persist>() -> Self {
        TypeKey::Native(TypeId::of::<T>())
    }
}

#[derive(Clone, Copy)]
enum Builder {
    Record,
    Native(fn() -> Box<dyn Persist>),
    EncodeOnly,
}

fn build_native<T: Persist + Default>() -> Box<dyn Persist> {
    Box::<T>::default()
}

/// Describes how to recognise and construct one runtime type.
///
/// Construction is two-phase: the descriptor builds an *empty* instance (no field values),
/// the engine records its identity, then fills it in. Descriptors compare by [`TypeKey`].
#[derive(Clone)]
pub struct TypeDescriptor {
    key: TypeKey,
    type_name: Cow<'static, str>,
    builder: Builder,
}

impl TypeDescriptor {
    /// The built-in generic record.
    #[must_use]
    pub fn generic() -> Self {
        Self::record(GENERIC_RECORD)
    }

    /// A field-enumerated record type. Instances are [`Record`]s with this type name.
    #[must_use]
    pub fn record(type_name: impl Into<Cow<'static, str>>) -> Self {
        let type_name = type_name.into();
        TypeDescriptor {
            key: TypeKey::Record(type_name.clone()),
            type_name,
            builder: Builder::Record,
        }
    }

    /// A hooked Rust type, built empty through `Default` before its
    /// [`Persist::deserialize`] hook runs.
    #[must_use]
    pub fn native<T: Persist + Default>() -> Self {
        TypeDescriptor {
            key: TypeKey::of::<T>(),
            type_name: Cow::Borrowed(std::any::type_name::<T>()),
            builder: Builder::Native(build_native::<T>),
        }
    }

    /// A hooked Rust type that can be written but has no empty builder, so it cannot be
    /// restored. Decoding it fails with [`Error::MissingCapability`].
    #[must_use]
    pub fn encode_only<T: Persist>() -> Self {
        TypeDescriptor {
            key: TypeKey::of::<T>(),
            type_name: Cow::Borrowed(std::any::type_name::<T>()),
            builder: Builder::EncodeOnly,
        }
    }

    #[must_use]
    pub fn key(&self) -> &TypeKey {
        &self.key
    }

    #[must_use]
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Returns `true` if instances are restored through a custom hook.
    #[must_use]
    pub fn is_custom(&self) -> bool {
        matches!(self.key, TypeKey::Native(_))
    }

    /// Builds an empty instance; `type_id` is only used for the error.
    pub fn instantiate(&self, type_id: &str) -> Result<Object> {
        match self.builder {
            Builder::Record => Ok(Object::Record(Record::with_type(self.type_name.clone()))),
            Builder::Native(build) => Ok(Object::Custom(build())),
            Builder::EncodeOnly => Err(Error::missing_capability(type_id, "deserialize")),
        }
    }
}

impl PartialEq for TypeDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for TypeDescriptor {}

impl fmt::Debug for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeDescriptor")
            .field("key", &self.key)
            .field("type_name", &self.type_name)
            .finish()
    }
}

/// Bidirectional, chainable map between logical type ids and descriptors.
///
/// Registration needs `&mut self`; share the finished registry behind an `Arc`. The engine
/// only reads from it.
#[derive(Debug)]
pub struct TypeRegistry {
    by_id: HashMap<String, TypeDescriptor>,
    by_key: HashMap<TypeKey, String>,
    parent: Option<Arc<TypeRegistry>>,
}

static DEFAULT_REGISTRY: OnceLock<Arc<TypeRegistry>> = OnceLock::new();

/// Builds the process-wide default registry on first call and returns it.
///
/// Call it once at program start; later calls (and [`TypeRegistry::new`]) return the same
/// instance. The default registry is read-only.
pub fn init_default_registry() -> Arc<TypeRegistry> {
    DEFAULT_REGISTRY
        .get_or_init(|| {
            let mut registry = TypeRegistry::detached();
            registry.insert(GENERIC_TYPE_ID.to_string(), TypeDescriptor::generic());
            debug!(type_id = GENERIC_TYPE_ID, "initialized default type registry");
            Arc::new(registry)
        })
        .clone()
}

impl TypeRegistry {
    /// Creates an empty registry chained to the process-wide default.
    #[must_use]
    pub fn new() -> Self {
        Self::with_parent(init_default_registry())
    }

    /// Creates an empty registry that falls back to `parent`.
    #[must_use]
    pub fn with_parent(parent: Arc<TypeRegistry>) -> Self {
        TypeRegistry {
            by_id: HashMap::new(),
            by_key: HashMap::new(),
            parent: Some(parent),
        }
    }

    /// Creates an empty registry with no parent, not even the default one.
    #[must_use]
    pub fn detached() -> Self {
        TypeRegistry {
            by_id: HashMap::new(),
            by_key: HashMap::new(),
            parent: None,
        }
    }

    #[must_use]
    pub fn parent(&self) -> Option<&Arc<TypeRegistry>> {
        self.parent.as_ref()
    }

    /// Registers `descriptor` under `id`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DuplicateTypeId`] if `id` is already registered in *this* registry.
    /// Shadowing an id of a parent registry is allowed.
    pub fn register_type_id(&mut self, id: impl Into<String>, descriptor: TypeDescriptor) -> Result<()> {
        let id = id.into();
        if self.by_id.contains_key(&id) {
            return Err(Error::DuplicateTypeId(id));
        }
        debug!(type_id = %id, type_name = %descriptor.type_name(), "registered type");
        self.insert(id, descriptor);
        Ok(())
    }

    /// Registers a hooked Rust type.
    pub fn register<T: Persist + Default>(&mut self, id: impl Into<String>) -> Result<()> {
        self.register_type_id(id, TypeDescriptor::native::<T>())
    }

    /// Registers a field-enumerated record type.
    pub fn register_record(
        &mut self,
        id: impl Into<String>,
        type_name: impl Into<Cow<'static, str>>,
    ) -> Result<()> {
        self.register_type_id(id, TypeDescriptor::record(type_name))
    }

    fn insert(&mut self, id: String, descriptor: TypeDescriptor) {
        self.by_key.insert(descriptor.key.clone(), id.clone());
        self.by_id.insert(id, descriptor);
    }

    /// Looks up the descriptor for a logical type id, walking the parent chain.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnregisteredTypeId`] if no registry in the chain knows `id`.
    pub fn descriptor_by_type_id(&self, id: &str) -> Result<&TypeDescriptor> {
        let mut registry = self;
        loop {
            if let Some(descriptor) = registry.by_id.get(id) {
                return Ok(descriptor);
            }
            match registry.parent.as_deref() {
                Some(parent) => registry = parent,
                None => return Err(Error::UnregisteredTypeId(id.to_string())),
            }
        }
    }

    /// Looks up the logical type id registered for `descriptor`, walking the parent chain.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnregisteredType`] if no registry in the chain knows the descriptor.
    pub fn type_id_by_descriptor(&self, descriptor: &TypeDescriptor) -> Result<&str> {
        self.type_id_by_key(&descriptor.key)
            .ok_or_else(|| Error::UnregisteredType(descriptor.type_name().to_string()))
    }

    /// Looks up the logical type id of an instance's runtime type.
    pub fn type_id_of(&self, object: &Object) -> Result<&str> {
        self.type_id_by_key(&object.type_key())
            .ok_or_else(|| Error::UnregisteredType(object.type_name().to_string()))
    }

    #[must_use]
    pub fn type_id_by_key(&self, key: &TypeKey) -> Option<&str> {
        let mut registry = self;
        loop {
            if let Some(id) = registry.by_key.get(key) {
                return Some(id.as_str());
            }
            registry = registry.parent.as_deref()?;
        }
    }

    /// Number of ids registered locally (parents not included).
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}
