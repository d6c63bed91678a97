//! Conformance tests for the text document format: exact writer output and reader edge cases.

use refgraph::{
    from_str, from_str_with, to_string, value, Error, ObjectRef, Options, StreamReader,
    TextReader, TokenKind, Value,
};

fn syntax_offset(result: refgraph::Result<Value>) -> usize {
    match result {
        Err(Error::Syntax { offset, .. }) => offset,
        other => panic!("expected a syntax error, got {:?}", other),
    }
}

#[test]
fn test_scalar_documents() {
    assert_eq!(to_string(&Value::Null).unwrap(), "[null]");
    assert_eq!(to_string(&Value::Undefined).unwrap(), r#"[{"$$undefined": 1}]"#);
    assert_eq!(to_string(&Value::Bool(false)).unwrap(), "[false]");
    assert_eq!(to_string(&Value::from(-3)).unwrap(), "[-3]");
    assert_eq!(to_string(&Value::from(0.5)).unwrap(), "[0.5]");
    assert_eq!(to_string(&Value::from("")).unwrap(), r#"[""]"#);
}

#[test]
fn test_nested_arrays_are_inline() {
    let root = value!([[], [1, [2]], "x"]);
    assert_eq!(to_string(&root).unwrap(), r#"[[[],[1,[2]],"x"]]"#);
}

#[test]
fn test_objects_inside_arrays_become_entries() {
    let root = value!([{"a": 1}, {"b": 2}]);
    assert_eq!(
        to_string(&root).unwrap(),
        r#"[["$$1","$$2"],{"$$id":1,"$$type":"Object","a":1},{"$$id":2,"$$type":"Object","b":2}]"#
    );
}

#[test]
fn test_ids_follow_discovery_order() {
    let leaf = ObjectRef::record();
    let middle = ObjectRef::record();
    middle.set("leaf", &leaf).unwrap();
    let root = value!({"first": (&middle), "second": (&leaf)});

    assert_eq!(
        to_string(&root).unwrap(),
        concat!(
            r#"[{"$$id":1,"$$type":"Object","first":"$$2","second":"$$3"},"#,
            r#"{"$$id":2,"$$type":"Object","leaf":"$$3"},"#,
            r#"{"$$id":3,"$$type":"Object"}]"#
        )
    );
}

#[test]
fn test_undefined_literal_requires_its_space() {
    assert_eq!(from_str(r#"[{"$$undefined": 1}]"#).unwrap(), Value::Undefined);
    assert!(from_str(r#"[{"$$undefined":1}]"#).is_err());
}

#[test]
fn test_reader_sniffs_each_kind() {
    let cases = [
        (r#""$$4""#, TokenKind::Reference),
        (r#""$x""#, TokenKind::String),
        (r#"{"$$undefined": 1}"#, TokenKind::Undefined),
        (r#"{"$$id":1}"#, TokenKind::Object),
        ("[]", TokenKind::Array),
        ("null", TokenKind::Null),
        ("true", TokenKind::Boolean),
        ("false", TokenKind::Boolean),
        ("-0.5", TokenKind::Number),
        ("7", TokenKind::Number),
    ];
    for (input, kind) in cases {
        assert_eq!(TextReader::new(input).peek_kind().unwrap(), kind, "{}", input);
    }
}

#[test]
fn test_numbers() {
    assert_eq!(from_str("[-12.25]").unwrap(), Value::from(-12.25));
    assert_eq!(from_str("[0]").unwrap(), Value::from(0));
    assert!(from_str("[1.2.3]").is_err());
    assert!(from_str("[-]").is_err());
    assert!(from_str("[1e5]").is_err());
}

#[test]
fn test_whitespace_is_not_allowed() {
    assert_eq!(syntax_offset(from_str("[ 1]")), 1);
    assert_eq!(syntax_offset(from_str("[1, 2]")), 3);
}

#[test]
fn test_strings_are_read_verbatim() {
    let value = from_str(r#"["a\b{c}[d],e:f"]"#).unwrap();
    assert_eq!(value, Value::from(r"a\b{c}[d],e:f"));
}

#[test]
fn test_field_names_reject_brackets() {
    let input = r#"[{"$$id":1,"$$type":"Object","a[0]":1}]"#;
    assert_eq!(syntax_offset(from_str(input)), 31);
}

#[test]
fn test_root_may_reference_a_later_entry() {
    let root = from_str(r#"["$$1",{"$$id":1,"$$type":"Object","self":"$$1"}]"#).unwrap();
    let obj = root.as_object().unwrap();
    assert!(obj.get("self").unwrap().as_object().unwrap().ptr_eq(obj));
}

#[test]
fn test_references_inside_nested_arrays() {
    let input = r#"[{"$$id":1,"$$type":"Object","grid":[["$$2"],["$$1"]]},{"$$id":2,"$$type":"Object"}]"#;
    let root = from_str(input).unwrap();
    let obj = root.as_object().unwrap();
    let grid = obj.get("grid").unwrap();
    let rows = grid.as_array().unwrap();
    assert!(rows[1].as_array().unwrap()[0].as_object().unwrap().ptr_eq(obj));
    assert!(!rows[0].as_array().unwrap()[0].as_object().unwrap().ptr_eq(obj));
}

#[test]
fn test_detached_entries_are_validated() {
    // Later non-object entries carry no data but must still parse and resolve.
    assert_eq!(from_str(r#"[1,"x",[null]]"#).unwrap(), Value::from(1));
    assert!(matches!(
        from_str(r#"[1,["$$9"]]"#),
        Err(Error::InvalidReference(9))
    ));
}

#[test]
fn test_headers_must_lead() {
    assert!(matches!(
        from_str(r#"[{"$$type":"Object","$$id":1}]"#),
        Err(Error::MissingHeader("$$id"))
    ));
    assert!(matches!(
        from_str(r#"[{"$$id":1,"name":"x"}]"#),
        Err(Error::MissingHeader("$$type"))
    ));
    assert!(matches!(from_str("[{}]"), Err(Error::MissingHeader("$$id"))));
}

#[test]
fn test_object_ids_must_be_positive_integers() {
    assert!(from_str(r#"[{"$$id":0,"$$type":"Object"}]"#).is_err());
    assert!(from_str(r#"[{"$$id":1.5,"$$type":"Object"}]"#).is_err());
    assert!(from_str(r#"[{"$$id":-1,"$$type":"Object"}]"#).is_err());
}

#[test]
fn test_trailing_input() {
    assert_eq!(syntax_offset(from_str("[1] ")), 3);
    let options = Options::new().with_allow_trailing_input(true);
    assert_eq!(from_str_with("[1]garbage", &options).unwrap(), Value::from(1));
}

#[test]
fn test_not_a_document() {
    assert_eq!(syntax_offset(from_str("")), 0);
    assert_eq!(syntax_offset(from_str("1")), 0);
    assert!(from_str("[]").is_err());
}
