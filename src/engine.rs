//! The graph serialization engine.

use crate::de::ReadContext;
use crate::registry::init_default_registry;
use crate::ser::WriteContext;
use crate::stream::{StreamReader, StreamWriter};
use crate::text::{TextReader, TextWriter};
use crate::{Options, Result, TypeRegistry, Value};
use std::sync::Arc;

/// Serializes and deserializes object graphs against one [`TypeRegistry`].
///
/// An engine holds no per-call state, so one instance can serve any number of calls.
///
/// # Examples
///
/// ```rust
/// use refgraph::{Engine, ObjectRef, Value};
///
/// let ori = ObjectRef::record();
/// let roni = ObjectRef::record();
/// ori.set("sibling", roni.clone()).unwrap();
/// roni.set("sibling", ori.clone()).unwrap();
///
/// let engine = Engine::new();
/// let text = engine.to_string(&Value::from(ori)).unwrap();
/// let copy = engine.from_str(&text).unwrap();
///
/// let ori2 = copy.as_object().unwrap().clone();
/// let roni2 = ori2.get("sibling").unwrap();
/// let back = roni2.as_object().unwrap().get("sibling").unwrap();
/// assert!(back.as_object().unwrap().ptr_eq(&ori2));
/// ```
#[derive(Debug, Clone)]
pub struct Engine {
    registry: Arc<TypeRegistry>,
    options: Options,
}

impl Engine {
    /// Creates an engine over the process-wide default registry.
    #[must_use]
    pub fn new() -> Self {
        Self::with_registry(init_default_registry())
    }

    #[must_use]
    pub fn with_registry(registry: Arc<TypeRegistry>) -> Self {
        Engine {
            registry,
            options: Options::default(),
        }
    }

    #[must_use]
    pub fn with_options(mut self, options: Options) -> Self {
        self.options = options;
        self
    }

    #[must_use]
    pub fn registry(&self) -> &Arc<TypeRegistry> {
        &self.registry
    }

    #[must_use]
    pub fn options(&self) -> &Options {
        &self.options
    }

    /// Writes the graph reachable from `root` to `writer`.
    ///
    /// # Errors
    ///
    /// Fails on unregistered types, values the writer cannot represent, custom hook errors,
    /// and arrays nested deeper than [`Options::max_depth`].
    pub fn serialize<W: StreamWriter + ?Sized>(&self, root: &Value, writer: &mut W) -> Result<()> {
        WriteContext::new(&self.registry, &self.options, writer).serialize(root)
    }

    /// Reads a graph from `reader` and returns the root value.
    ///
    /// # Errors
    ///
    /// Fails on malformed input, unknown type ids, dangling references, and errors raised
    /// by custom hooks. Nothing is returned on failure.
    pub fn deserialize<R: StreamReader + ?Sized>(&self, reader: &mut R) -> Result<Value> {
        ReadContext::new(&self.registry, &self.options, reader).deserialize()
    }

    /// Serializes to the text encoding.
    pub fn to_string(&self, root: &Value) -> Result<String> {
        let mut writer = TextWriter::new().strict_strings(self.options.strict_strings);
        self.serialize(root, &mut writer)?;
        Ok(writer.into_inner())
    }

    /// Deserializes from the text encoding.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(&self, input: &str) -> Result<Value> {
        let mut reader = TextReader::new(input).allow_trailing(self.options.allow_trailing_input);
        self.deserialize(&mut reader)
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Error, FieldBag, ObjectRef, Persist};

    #[derive(Default)]
    struct Pair {
        left: Value,
        right: Value,
    }

    impl Persist for Pair {
        fn serialize(&self, bag: &mut FieldBag) -> Result<()> {
            bag.add("l", self.left.clone())?;
            bag.add("r", self.right.clone())
        }

        fn deserialize(&mut self, mut bag: FieldBag) -> Result<()> {
            self.left = bag.take("l")?;
            self.right = bag.take("r")?;
            Ok(())
        }
    }

    fn pair_engine() -> Engine {
        let mut registry = TypeRegistry::new();
        registry.register::<Pair>("Pair").unwrap();
        Engine::with_registry(Arc::new(registry))
    }

    #[test]
    fn test_custom_hooks_see_resolved_references() {
        let engine = pair_engine();
        let pair = ObjectRef::custom(Pair::default());
        {
            let mut inner = pair.downcast_mut::<Pair>().unwrap();
            inner.left = Value::from(&pair);
            inner.right = Value::from(vec![Value::from(&pair), Value::from(2)]);
        }
        let text = engine.to_string(&Value::from(&pair)).unwrap();
        assert_eq!(
            text,
            "[{\"$$id\":1,\"$$type\":\"Pair\",\"l\":\"$$1\",\"r\":[\"$$1\",2]}]"
        );

        let copy = engine.from_str(&text).unwrap();
        let copy = copy.as_object().unwrap();
        let restored = copy.downcast_ref::<Pair>().unwrap();
        assert!(restored.left.as_object().unwrap().ptr_eq(copy));
        let right = restored.right.as_array().unwrap();
        assert!(right[0].as_object().unwrap().ptr_eq(copy));
        assert_eq!(right[1], Value::from(2));
    }

    #[test]
    fn test_default_registry_does_not_know_custom_types() {
        let text = pair_engine()
            .to_string(&Value::from(ObjectRef::custom(Pair::default())))
            .unwrap();
        assert_eq!(
            Engine::new().from_str(&text),
            Err(Error::UnregisteredTypeId("Pair".to_string()))
        );
        assert!(matches!(
            Engine::new().to_string(&Value::from(ObjectRef::custom(Pair::default()))),
            Err(Error::UnregisteredType(_))
        ));
    }

    #[test]
    fn test_trailing_input_option() {
        assert!(Engine::new().from_str("[1]x").unwrap_err().is_syntax());
        let lenient = Engine::new().with_options(Options::new().with_allow_trailing_input(true));
        assert_eq!(lenient.from_str("[1]x").unwrap(), Value::from(1));
    }
}
