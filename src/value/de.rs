//! Reading `Deserialize` types out of [`Value`] trees.

use crate::object::Object;
use crate::{Error, ObjectRef, Result, Value};
use serde::de::{self, DeserializeOwned, IntoDeserializer};
use serde::forward_to_deserialize_any;

/// Converts a [`Value`] tree into any `DeserializeOwned` type.
///
/// Records are presented as maps, arrays as sequences, and both `null` and `undefined` as
/// unit/`None`. A record that is shared between several places is read once per place.
///
/// # Examples
///
/// ```rust
/// use refgraph::{from_str, from_value};
/// use serde::Deserialize;
///
/// #[derive(Deserialize)]
/// struct Point { x: i32, y: i32 }
///
/// let graph = from_str(r#"[{"$$id":1,"$$type":"Object","x":5,"y":10}]"#).unwrap();
/// let point: Point = from_value(graph).unwrap();
/// assert_eq!((point.x, point.y), (5, 10));
/// ```
///
/// # Errors
///
/// Fails on cyclic graphs, on custom objects (their fields are private to their hooks),
/// and whenever the value's shape does not match `T`.
pub fn from_value<T: DeserializeOwned>(value: Value) -> Result<T> {
    T::deserialize(ValueDeserializer::new(value, Vec::new()))
}

struct ValueDeserializer {
    value: Value,
    // Addresses of the records currently being read, outermost first.
    ancestors: Vec<usize>,
}

impl ValueDeserializer {
    fn new(value: Value, ancestors: Vec<usize>) -> Self {
        ValueDeserializer { value, ancestors }
    }

    fn record_fields(obj: &ObjectRef, ancestors: &[usize]) -> Result<Vec<(String, Value)>> {
        if ancestors.contains(&obj.addr()) {
            return Err(Error::custom("cannot deserialize a cyclic graph"));
        }
        match &*obj.borrow() {
            Object::Record(record) => Ok(record
                .iter()
                .map(|(name, value)| (name.clone(), value.clone()))
                .collect()),
            Object::Custom(custom) => Err(Error::custom(format!(
                "cannot deserialize custom object {}",
                custom.type_name()
            ))),
        }
    }

    fn into_map(obj: ObjectRef, mut ancestors: Vec<usize>) -> Result<MapDeserializer> {
        let fields = Self::record_fields(&obj, &ancestors)?;
        ancestors.push(obj.addr());
        Ok(MapDeserializer::new(fields, ancestors))
    }
}

impl<'de> de::Deserializer<'de> for ValueDeserializer {
    type Error = Error;

    fn deserialize_any<V>(self, visitor: V) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        match self.value {
            Value::Null | Value::Undefined => visitor.visit_unit(),
            Value::Bool(b) => visitor.visit_bool(b),
            Value::Number(n) if n.fract() == 0.0 && n < 0.0 && n >= i64::MIN as f64 => {
                visitor.visit_i64(n as i64)
            }
            Value::Number(n) if n.fract() == 0.0 && n >= 0.0 && n <= u64::MAX as f64 => {
                visitor.visit_u64(n as u64)
            }
            Value::Number(n) => visitor.visit_f64(n),
            Value::String(s) => visitor.visit_string(s),
            Value::Array(arr) => visitor.visit_seq(SeqDeserializer::new(arr, self.ancestors)),
            Value::Object(obj) => visitor.visit_map(Self::into_map(obj, self.ancestors)?),
        }
    }

    fn deserialize_option<V>(self, visitor: V) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        match self.value {
            Value::Null | Value::Undefined => visitor.visit_none(),
            _ => visitor.visit_some(self),
        }
    }

    fn deserialize_newtype_struct<V>(self, _name: &'static str, visitor: V) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_enum<V>(
        self,
        _name: &'static str,
        _variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        match self.value {
            Value::String(s) => visitor.visit_enum(s.into_deserializer()),
            Value::Object(obj) => {
                let mut fields = Self::record_fields(&obj, &self.ancestors)?;
                match fields.pop() {
                    Some((variant, value)) if fields.is_empty() => {
                        let mut ancestors = self.ancestors;
                        ancestors.push(obj.addr());
                        visitor.visit_enum(EnumDeserializer {
                            variant,
                            value,
                            ancestors,
                        })
                    }
                    _ => Err(Error::custom("expected a record with exactly one variant field")),
                }
            }
            other => Err(Error::custom(format!("expected enum, found {}", other.kind()))),
        }
    }

    forward_to_deserialize_any! {
        bool i8 i16 i32 i64 i128 u8 u16 u32 u64 u128 f32 f64 char str string
        bytes byte_buf unit unit_struct seq tuple
        tuple_struct map struct identifier ignored_any
    }
}

struct SeqDeserializer {
    iter: std::vec::IntoIter<Value>,
    ancestors: Vec<usize>,
}

impl SeqDeserializer {
    fn new(vec: Vec<Value>, ancestors: Vec<usize>) -> Self {
        SeqDeserializer {
            iter: vec.into_iter(),
            ancestors,
        }
    }
}

impl<'de> de::SeqAccess<'de> for SeqDeserializer {
    type Error = Error;

    fn next_element_seed<T>(&mut self, seed: T) -> Result<Option<T::Value>>
    where
        T: de::DeserializeSeed<'de>,
    {
        match self.iter.next() {
            Some(value) => seed
                .deserialize(ValueDeserializer::new(value, self.ancestors.clone()))
                .map(Some),
            None => Ok(None),
        }
    }

    fn size_hint(&self) -> Option<usize> {
        match self.iter.size_hint() {
            (lower, Some(upper)) if lower == upper => Some(upper),
            _ => None,
        }
    }
}

struct MapDeserializer {
    iter: std::vec::IntoIter<(String, Value)>,
    value: Option<Value>,
    ancestors: Vec<usize>,
}

impl MapDeserializer {
    fn new(fields: Vec<(String, Value)>, ancestors: Vec<usize>) -> Self {
        MapDeserializer {
            iter: fields.into_iter(),
            value: None,
            ancestors,
        }
    }
}

impl<'de> de::MapAccess<'de> for MapDeserializer {
    type Error = Error;

    fn next_key_seed<K>(&mut self, seed: K) -> Result<Option<K::Value>>
    where
        K: de::DeserializeSeed<'de>,
    {
        match self.iter.next() {
            Some((key, value)) => {
                self.value = Some(value);
                seed.deserialize(key.into_deserializer()).map(Some)
            }
            None => Ok(None),
        }
    }

    fn next_value_seed<V>(&mut self, seed: V) -> Result<V::Value>
    where
        V: de::DeserializeSeed<'de>,
    {
        match self.value.take() {
            Some(value) => seed.deserialize(ValueDeserializer::new(value, self.ancestors.clone())),
            None => Err(Error::custom("next_value_seed called before next_key_seed")),
        }
    }

    fn size_hint(&self) -> Option<usize> {
        match self.iter.size_hint() {
            (lower, Some(upper)) if lower == upper => Some(upper),
            _ => None,
        }
    }
}

struct EnumDeserializer {
    variant: String,
    value: Value,
    ancestors: Vec<usize>,
}

impl<'de> de::EnumAccess<'de> for EnumDeserializer {
    type Error = Error;
    type Variant = VariantDeserializer;

    fn variant_seed<V>(self, seed: V) -> Result<(V::Value, Self::Variant)>
    where
        V: de::DeserializeSeed<'de>,
    {
        let variant = seed.deserialize(self.variant.into_deserializer())?;
        Ok((
            variant,
            VariantDeserializer {
                value: self.value,
                ancestors: self.ancestors,
            },
        ))
    }
}

struct VariantDeserializer {
    value: Value,
    ancestors: Vec<usize>,
}

impl<'de> de::VariantAccess<'de> for VariantDeserializer {
    type Error = Error;

    fn unit_variant(self) -> Result<()> {
        match self.value {
            Value::Null | Value::Undefined => Ok(()),
            _ => Err(Error::custom("expected unit variant")),
        }
    }

    fn newtype_variant_seed<T>(self, seed: T) -> Result<T::Value>
    where
        T: de::DeserializeSeed<'de>,
    {
        seed.deserialize(ValueDeserializer::new(self.value, self.ancestors))
    }

    fn tuple_variant<V>(self, _len: usize, visitor: V) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        match self.value {
            Value::Array(arr) => visitor.visit_seq(SeqDeserializer::new(arr, self.ancestors)),
            _ => Err(Error::custom("expected tuple variant")),
        }
    }

    fn struct_variant<V>(self, _fields: &'static [&'static str], visitor: V) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        match self.value {
            Value::Object(obj) => {
                visitor.visit_map(ValueDeserializer::into_map(obj, self.ancestors)?)
            }
            _ => Err(Error::custom("expected struct variant")),
        }
    }
}
