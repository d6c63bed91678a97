use refgraph::{
    from_str, from_value, to_string, to_value, value, Engine, Error, FieldBag, ObjectRef,
    Options, Persist, Record, Result, StreamReader, TextReader, TextWriter, TokenKind,
    TracingWriter, TypeDescriptor, TypeRegistry, Value,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

fn assert_json(text: &str) {
    if let Err(e) = serde_json::from_str::<serde_json::Value>(text) {
        panic!("not valid JSON ({}): {}", e, text);
    }
}

#[derive(Default, Debug, PartialEq)]
struct Point {
    x: f64,
    y: f64,
}

impl Persist for Point {
    fn serialize(&self, bag: &mut FieldBag) -> Result<()> {
        bag.add("x", self.x)?;
        bag.add("y", self.y)
    }

    fn deserialize(&mut self, mut bag: FieldBag) -> Result<()> {
        self.x = f64::try_from(bag.take("x")?)?;
        self.y = f64::try_from(bag.take("y")?)?;
        Ok(())
    }
}

// Stores only a name and a link; `visits` is runtime-only state.
#[derive(Default)]
struct Node {
    name: String,
    link: Option<ObjectRef>,
    visits: u32,
}

impl Persist for Node {
    fn serialize(&self, bag: &mut FieldBag) -> Result<()> {
        bag.add("name", self.name.as_str())?;
        bag.add("link", self.link.clone())
    }

    fn deserialize(&mut self, mut bag: FieldBag) -> Result<()> {
        self.name = String::try_from(bag.take("name")?)?;
        self.link = match bag.take("link")? {
            Value::Object(obj) => Some(obj),
            _ => None,
        };
        Ok(())
    }
}

fn engine() -> Engine {
    let mut registry = TypeRegistry::new();
    registry.register::<Point>("geo.Point").unwrap();
    registry.register::<Node>("Node").unwrap();
    registry.register_record("Person", "Person").unwrap();
    Engine::with_registry(Arc::new(registry))
}

#[test]
fn test_scalar_fields() {
    let user = value!({
        "id": 923,
        "name": "Ori",
        "isAdmin": true,
        "parent": null,
        "sibling": undefined
    });

    let text = to_string(&user).unwrap();
    println!("scalars: {}", text);
    assert_json(&text);

    let clone = from_str(&text).unwrap();
    assert!(clone.deep_eq(&user));
    assert_eq!(
        clone.as_object().unwrap().get("sibling"),
        Some(Value::Undefined)
    );
}

#[test]
fn test_self_reference() {
    let node = ObjectRef::record();
    node.set("self", node.clone()).unwrap();

    let text = to_string(&Value::from(&node)).unwrap();
    assert_json(&text);

    let clone = from_str(&text).unwrap();
    let clone = clone.as_object().unwrap();
    assert!(!clone.ptr_eq(&node));
    assert!(clone.get("self").unwrap().as_object().unwrap().ptr_eq(clone));
}

#[test]
fn test_mutual_siblings() {
    let ori = ObjectRef::record();
    let roni = ObjectRef::record();
    ori.set("name", "ori").unwrap();
    ori.set("sibling", roni.clone()).unwrap();
    roni.set("name", "roni").unwrap();
    roni.set("sibling", ori.clone()).unwrap();

    let text = to_string(&Value::from(&ori)).unwrap();
    assert_eq!(
        text,
        concat!(
            r#"[{"$$id":1,"$$type":"Object","name":"ori","sibling":"$$2"},"#,
            r#"{"$$id":2,"$$type":"Object","name":"roni","sibling":"$$1"}]"#
        )
    );
    assert_json(&text);

    let clone = from_str(&text).unwrap();
    assert!(clone.deep_eq(&Value::from(&ori)));

    let ori2 = clone.as_object().unwrap();
    let roni2 = ori2.get("sibling").unwrap();
    let roni2 = roni2.as_object().unwrap();
    assert_eq!(roni2.get("name"), Some(Value::from("roni")));
    assert!(roni2.get("sibling").unwrap().as_object().unwrap().ptr_eq(ori2));
}

#[test]
fn test_shared_object_is_written_once() {
    let shared = ObjectRef::record();
    shared.set("n", 1).unwrap();
    let root = value!({
        "a": (shared.clone()),
        "b": (shared.clone()),
        "list": [(shared.clone()), (shared.clone())]
    });

    let text = to_string(&root).unwrap();
    assert_eq!(text.matches("\"$$id\"").count(), 2);
    assert_eq!(text.matches("\"$$2\"").count(), 4);

    let clone = from_str(&text).unwrap();
    let clone = clone.as_object().unwrap();
    let a = clone.get("a").unwrap();
    let b = clone.get("b").unwrap();
    assert_eq!(a, b);
    let list = clone.get("list").unwrap();
    assert!(list.as_array().unwrap().iter().all(|item| item == &a));
}

#[test]
fn test_acyclic_round_trip() {
    let tree = value!({
        "title": "root",
        "children": [
            {"title": "left", "weight": 0.5},
            {"title": "right", "weight": (-2), "tags": ["x", "y", []]}
        ],
        "empty": {}
    });
    let text = to_string(&tree).unwrap();
    assert_json(&text);
    assert!(from_str(&text).unwrap().deep_eq(&tree));
}

#[test]
fn test_custom_hook_writes_only_bag_fields() {
    let engine = engine();
    let point = Value::from(ObjectRef::custom(Point { x: 5.0, y: 10.0 }));

    let text = engine.to_string(&point).unwrap();
    assert_eq!(text, r#"[{"$$id":1,"$$type":"geo.Point","x":5,"y":10}]"#);

    let clone = engine.from_str(&text).unwrap();
    let restored = clone.as_object().unwrap().downcast_ref::<Point>().unwrap();
    assert_eq!(*restored, Point { x: 5.0, y: 10.0 });
}

#[test]
fn test_custom_cycle_restored_through_hooks() {
    let engine = engine();
    let a = ObjectRef::custom(Node {
        name: "a".into(),
        link: None,
        visits: 3,
    });
    let b = ObjectRef::custom(Node {
        name: "b".into(),
        link: Some(a.clone()),
        visits: 7,
    });
    a.downcast_mut::<Node>().unwrap().link = Some(b.clone());

    let text = engine.to_string(&Value::from(&a)).unwrap();
    assert!(!text.contains("visits"));
    assert_json(&text);

    let clone = engine.from_str(&text).unwrap();
    let a2 = clone.as_object().unwrap().clone();
    let b2 = a2.downcast_ref::<Node>().unwrap().link.clone().unwrap();
    let node_b = b2.downcast_ref::<Node>().unwrap();
    assert_eq!(node_b.name, "b");
    assert_eq!(node_b.visits, 0);
    assert!(node_b.link.as_ref().unwrap().ptr_eq(&a2));
}

#[test]
fn test_named_record_type() {
    let engine = engine();
    let mut person = Record::with_type("Person");
    person.insert("name", "Ori");
    let text = engine.to_string(&Value::from(person)).unwrap();
    assert_eq!(text, r#"[{"$$id":1,"$$type":"Person","name":"Ori"}]"#);

    let clone = engine.from_str(&text).unwrap();
    assert_eq!(clone.as_object().unwrap().borrow().type_name(), "Person");
}

#[test]
fn test_unregistered_type_id_on_read() {
    let result = from_str(r#"[{"$$id":1,"$$type":"geo.Point","x":5,"y":10}]"#);
    assert_eq!(result, Err(Error::UnregisteredTypeId("geo.Point".to_string())));
}

#[test]
fn test_unregistered_type_on_write() {
    let point = Value::from(ObjectRef::custom(Point::default()));
    assert!(matches!(to_string(&point), Err(Error::UnregisteredType(_))));
}

#[test]
fn test_encode_only_descriptor() {
    let mut registry = TypeRegistry::new();
    registry
        .register_type_id("geo.Point", TypeDescriptor::encode_only::<Point>())
        .unwrap();
    let engine = Engine::with_registry(Arc::new(registry));

    let text = engine
        .to_string(&Value::from(ObjectRef::custom(Point::default())))
        .unwrap();
    assert!(matches!(
        engine.from_str(&text),
        Err(Error::MissingCapability { capability: "deserialize", .. })
    ));
}

#[test]
fn test_registry_scoping() {
    let mut base = TypeRegistry::new();
    base.register::<Point>("geo.Point").unwrap();
    let base = Arc::new(base);

    let mut scoped = TypeRegistry::with_parent(base.clone());
    scoped.register::<Node>("Node").unwrap();
    let scoped = Engine::with_registry(Arc::new(scoped));

    let text = scoped
        .to_string(&Value::from(ObjectRef::custom(Point { x: 1.0, y: 2.0 })))
        .unwrap();
    assert!(Engine::with_registry(base.clone()).from_str(&text).is_ok());
    assert!(Engine::with_registry(base)
        .to_string(&Value::from(ObjectRef::custom(Node::default())))
        .is_err());
}

#[test]
fn test_truncated_input_is_rejected() {
    let text = to_string(&value!({"name": "Ori", "tags": [1, 2]})).unwrap();
    for end in 0..text.len() {
        let result = from_str(&text[..end]);
        assert!(result.is_err(), "prefix {:?} was accepted", &text[..end]);
    }
}

#[test]
fn test_syntax_error_reports_offset() {
    match from_str(r#"[{"$$id":1,"$$type":"Object","a":1;"b":2}]"#) {
        Err(Error::Syntax { found, offset, .. }) => {
            assert_eq!(found, Some(';'));
            assert_eq!(offset, 34);
        }
        other => panic!("expected syntax error, got {:?}", other),
    }
}

#[test]
fn test_unsupported_strings() {
    let with_quote = value!({"quote": "say \"hi\""});
    match to_string(&with_quote) {
        Err(Error::UnsupportedValue { path, .. }) => assert_eq!(path, "entry 0 ($$1).quote"),
        other => panic!("expected unsupported value, got {:?}", other),
    }
    assert!(to_string(&Value::from("$$1")).is_err());
    assert!(to_string(&value!({"bad[name]": 1})).is_err());
}

#[test]
fn test_tracing_writer_output_matches() {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new("refgraph=trace"))
        .with_test_writer()
        .finish();

    let root = value!({"a": [1, true, null]});
    let mut writer = TracingWriter::new(TextWriter::new());
    tracing::subscriber::with_default(subscriber, || {
        Engine::new().serialize(&root, &mut writer).unwrap();
    });
    assert_eq!(writer.into_inner().into_inner(), to_string(&root).unwrap());
}

#[test]
fn test_custom_reader_loop() {
    let mut reader = TextReader::new(r#"["s",1.5,true,null,{"$$undefined": 1},[],"$$4"]"#);
    reader.read_array_begin().unwrap();
    let mut kinds = Vec::new();
    let mut index = 0;
    while reader.read_array_next(index).unwrap() {
        let kind = reader.peek_kind().unwrap();
        match kind {
            TokenKind::String => {
                reader.read_string().unwrap();
            }
            TokenKind::Number => {
                reader.read_number().unwrap();
            }
            TokenKind::Boolean => {
                reader.read_boolean().unwrap();
            }
            TokenKind::Null => reader.read_null().unwrap(),
            TokenKind::Undefined => reader.read_undefined().unwrap(),
            TokenKind::Array => {
                reader.read_array_begin().unwrap();
                reader.read_array_end().unwrap();
            }
            TokenKind::Reference => {
                reader.read_reference().unwrap();
            }
            TokenKind::Object => unreachable!(),
        }
        kinds.push(kind);
        index += 1;
    }
    reader.read_array_end().unwrap();
    reader.finish().unwrap();
    assert_eq!(
        kinds,
        vec![
            TokenKind::String,
            TokenKind::Number,
            TokenKind::Boolean,
            TokenKind::Null,
            TokenKind::Undefined,
            TokenKind::Array,
            TokenKind::Reference,
        ]
    );
}

#[test]
fn test_serde_bridge_through_text() {
    #[derive(Serialize, Deserialize, Debug, PartialEq)]
    struct Order {
        id: u32,
        items: Vec<String>,
        note: Option<String>,
    }

    let order = Order {
        id: 7,
        items: vec!["widget".into(), "gadget".into()],
        note: None,
    };
    let text = to_string(&to_value(&order).unwrap()).unwrap();
    assert_json(&text);
    let back: Order = from_value(from_str(&text).unwrap()).unwrap();
    assert_eq!(back, order);
}

#[test]
fn test_depth_option() {
    let deep = value!([[[[1]]]]);
    let engine = Engine::new().with_options(Options::new().with_max_depth(2));
    assert_eq!(engine.to_string(&deep), Err(Error::DepthLimitExceeded(2)));
    assert_eq!(
        engine.from_str("[[[[[1]]]]]"),
        Err(Error::DepthLimitExceeded(2))
    );
}
