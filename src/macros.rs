/// Builds a [`Value`](crate::Value) from a JSON-like literal.
///
/// `{ ... }` creates a fresh generic record, `[ ... ]` an array, `null` and `undefined`
/// the two empty values. Any other token tree is converted with `Value::from`, so
/// existing [`ObjectRef`](crate::ObjectRef)s can be spliced in to share them.
///
/// ```rust
/// use refgraph::{value, ObjectRef, Value};
///
/// let parent = ObjectRef::record();
/// let user = value!({
///     "id": 923,
///     "tags": ["a", "b"],
///     "parent": (parent.clone()),
///     "sibling": undefined
/// });
/// let user = user.as_object().unwrap();
/// assert_eq!(user.get("sibling"), Some(Value::Undefined));
/// assert!(user.get("parent").unwrap().as_object().unwrap().ptr_eq(&parent));
/// ```
#[macro_export]
macro_rules! value {
    (null) => {
        $crate::Value::Null
    };

    (undefined) => {
        $crate::Value::Undefined
    };

    (true) => {
        $crate::Value::Bool(true)
    };

    (false) => {
        $crate::Value::Bool(false)
    };

    ([]) => {
        $crate::Value::Array(::std::vec::Vec::new())
    };

    ([ $($elem:tt),* $(,)? ]) => {
        $crate::Value::Array(vec![$($crate::value!($elem)),*])
    };

    ({}) => {
        $crate::Value::Object($crate::ObjectRef::record())
    };

    ({ $($key:literal : $value:tt),* $(,)? }) => {{
        let mut record = $crate::Record::new();
        $(
            record.insert($key, $crate::value!($value));
        )*
        $crate::Value::from(record)
    }};

    ($other:expr) => {
        $crate::Value::from($other)
    };
}
