//! Read path: rebuilding an object graph from a sequence of entries.
//!
//! Objects are registered under their `$$id` as soon as the header is read, before any
//! other field, so later entries can point back at them. A reference token leaves an
//! `Undefined` placeholder and a [`Patch`] naming its holder and the path below it. Once
//! the whole document is read, patches are applied and then custom objects receive their
//! (now resolved) field bags, in the order the objects appeared.

use crate::context::{Frame, Holder, Patch, Step};
use crate::object::Object;
use crate::stream::{StreamReader, TokenKind};
use crate::{Error, FieldBag, ObjectRef, Options, Result, TypeRegistry, Value};
use std::collections::HashMap;
use tracing::{debug, trace};

/// State for one `deserialize` call.
pub(crate) struct ReadContext<'a, R: StreamReader + ?Sized> {
    registry: &'a TypeRegistry,
    options: &'a Options,
    reader: &'a mut R,
    instances: HashMap<u64, ObjectRef>,
    // Custom objects awaiting their hook, in order of appearance.
    hooks: Vec<(ObjectRef, FieldBag)>,
    hook_slots: HashMap<u64, usize>,
    patches: Vec<Patch>,
    frames: Vec<Frame>,
    depth: usize,
}

impl<'a, R: StreamReader + ?Sized> ReadContext<'a, R> {
    pub(crate) fn new(registry: &'a TypeRegistry, options: &'a Options, reader: &'a mut R) -> Self {
        ReadContext {
            registry,
            options,
            reader,
            instances: HashMap::new(),
            hooks: Vec::new(),
            hook_slots: HashMap::new(),
            patches: Vec::new(),
            frames: Vec::new(),
            depth: 0,
        }
    }

    pub(crate) fn deserialize(mut self) -> Result<Value> {
        self.reader.read_array_begin()?;
        let mut root = None;
        let mut index = 0;
        while self.reader.read_array_next(index)? {
            let value = self.in_frame(Frame::Entry(index), |cx| cx.read_value())?;
            if index == 0 {
                root = Some(value);
            }
            index += 1;
        }
        self.reader.read_array_end()?;
        self.reader.finish()?;

        let mut root = root.ok_or_else(|| Error::custom("document contains no entries"))?;
        let patched = self.patches.len();
        self.apply_patches(&mut root)?;
        let hooked = self.hooks.len();
        self.run_hooks()?;
        debug!(
            entries = index,
            objects = self.instances.len(),
            patched,
            hooked,
            "deserialized object graph"
        );
        Ok(root)
    }

    fn in_frame<T>(&mut self, frame: Frame, f: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        self.frames.push(frame);
        let result = f(self);
        self.frames.pop();
        result
    }

    fn nested<T>(&mut self, f: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        if self.depth >= self.options.max_depth {
            return Err(Error::DepthLimitExceeded(self.options.max_depth));
        }
        self.depth += 1;
        let result = f(self);
        self.depth -= 1;
        result
    }

    fn read_value(&mut self) -> Result<Value> {
        match self.reader.peek_kind()? {
            TokenKind::Reference => {
                let id = self.reader.read_reference()?;
                self.defer_reference(id);
                Ok(Value::Undefined)
            }
            TokenKind::Object => self.read_object().map(Value::Object),
            TokenKind::Array => self.read_array(),
            TokenKind::String => self.reader.read_string().map(Value::String),
            TokenKind::Number => self.reader.read_number().map(Value::Number),
            TokenKind::Boolean => self.reader.read_boolean().map(Value::Bool),
            TokenKind::Null => self.reader.read_null().map(|()| Value::Null),
            TokenKind::Undefined => self.reader.read_undefined().map(|()| Value::Undefined),
        }
    }

    fn read_array(&mut self) -> Result<Value> {
        self.nested(|cx| {
            cx.reader.read_array_begin()?;
            let mut items = Vec::new();
            while cx.reader.read_array_next(items.len())? {
                let index = items.len();
                items.push(cx.in_frame(Frame::Index(index), |cx| cx.read_value())?);
            }
            cx.reader.read_array_end()?;
            Ok(Value::Array(items))
        })
    }

    fn read_header(&mut self, index: usize, name: &'static str) -> Result<()> {
        if !self.reader.read_field_next(index)? || self.reader.read_field_begin(index)? != name {
            return Err(Error::MissingHeader(name));
        }
        Ok(())
    }

    fn read_object(&mut self) -> Result<ObjectRef> {
        // Entries sit at depth zero; objects nested inline count like arrays.
        if self.frames.last().map_or(false, |frame| matches!(frame, Frame::Entry(_))) {
            self.read_object_body()
        } else {
            self.nested(Self::read_object_body)
        }
    }

    fn read_object_body(&mut self) -> Result<ObjectRef> {
        self.reader.read_object_begin()?;

        self.read_header(0, "$$id")?;
        let raw_id = self.reader.read_number()?;
        self.reader.read_field_end(0)?;
        if raw_id < 1.0 || raw_id.fract() != 0.0 || raw_id > u64::MAX as f64 {
            return Err(Error::custom(format!("invalid object id {}", raw_id)));
        }
        let id = raw_id as u64;

        self.read_header(1, "$$type")?;
        let type_id = self.reader.read_string()?;
        self.reader.read_field_end(1)?;

        let object = self
            .registry
            .descriptor_by_type_id(&type_id)?
            .instantiate(&type_id)?;
        let obj = ObjectRef::new(object);
        if self.instances.insert(id, obj.clone()).is_some() {
            return Err(Error::DuplicateObjectId(id));
        }
        let slot = if obj.is_record() {
            None
        } else {
            self.hooks.push((obj.clone(), FieldBag::new()));
            self.hook_slots.insert(id, self.hooks.len() - 1);
            Some(self.hooks.len() - 1)
        };
        trace!(id, type_id = %type_id, "reading entry");

        self.in_frame(Frame::Object(id), |cx| {
            let mut index = 2;
            while cx.reader.read_field_next(index)? {
                let name = cx.reader.read_field_begin(index)?;
                let value = cx.in_frame(Frame::Field(name.clone()), |cx| cx.read_value())?;
                cx.reader.read_field_end(index)?;
                match slot {
                    Some(slot) => cx.hooks[slot].1.add(name, value)?,
                    None => {
                        if let Some(record) = obj.borrow_mut().as_record_mut() {
                            record.insert_new(name, value)?;
                        }
                    }
                }
                index += 1;
            }
            Ok(())
        })?;

        self.reader.read_object_end()?;
        Ok(obj)
    }

    // The nearest object frame owns the placeholder; fields and indices below it form the path.
    fn defer_reference(&mut self, id: u64) {
        let mut path = Vec::new();
        let mut holder = Holder::Detached;
        for frame in self.frames.iter().rev() {
            match frame {
                Frame::Field(name) => path.push(Step::Field(name.clone())),
                Frame::Index(index) => path.push(Step::Index(*index)),
                Frame::Object(owner) => {
                    holder = match (self.hook_slots.get(owner), self.instances.get(owner)) {
                        (Some(slot), _) => Holder::Bag(*slot),
                        (None, Some(obj)) => Holder::Object(obj.clone()),
                        (None, None) => Holder::Detached,
                    };
                    break;
                }
                Frame::Entry(0) => {
                    holder = Holder::Root;
                    break;
                }
                Frame::Entry(_) => break,
            }
        }
        path.reverse();
        trace!(id, ?path, "deferred reference");
        self.patches.push(Patch { holder, path, id });
    }

    fn apply_patches(&mut self, root: &mut Value) -> Result<()> {
        for Patch { holder, path, id } in std::mem::take(&mut self.patches) {
            let target = self
                .instances
                .get(&id)
                .cloned()
                .ok_or(Error::InvalidReference(id))?;
            let placed = match &holder {
                Holder::Root => place(root, &path, target),
                Holder::Object(obj) => match (obj.borrow_mut().as_record_mut(), path.split_first()) {
                    (Some(record), Some((Step::Field(name), rest))) => record
                        .get_mut(name)
                        .map_or(false, |slot| place(slot, rest, target)),
                    _ => false,
                },
                Holder::Bag(slot) => match path.split_first() {
                    Some((Step::Field(name), rest)) => self.hooks[*slot]
                        .1
                        .get_mut(name)
                        .map_or(false, |value| place(value, rest, target)),
                    _ => false,
                },
                Holder::Detached => true,
            };
            if !placed {
                return Err(Error::custom(format!(
                    "reference $${} has no placeholder to fill",
                    id
                )));
            }
        }
        Ok(())
    }

    fn run_hooks(&mut self) -> Result<()> {
        for (obj, bag) in std::mem::take(&mut self.hooks) {
            let mut object = obj.borrow_mut();
            if let Object::Custom(custom) = &mut *object {
                custom.deserialize(bag)?;
            }
        }
        Ok(())
    }
}

fn place(value: &mut Value, path: &[Step], target: ObjectRef) -> bool {
    let mut slot = value;
    for step in path {
        slot = match (step, slot) {
            (Step::Index(index), Value::Array(items)) => match items.get_mut(*index) {
                Some(item) => item,
                None => return false,
            },
            _ => return false,
        };
    }
    *slot = Value::Object(target);
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TextReader;

    fn read(input: &str) -> Result<Value> {
        let registry = TypeRegistry::new();
        let options = Options::default();
        let mut reader = TextReader::new(input);
        ReadContext::new(&registry, &options, &mut reader).deserialize()
    }

    #[test]
    fn test_forward_and_backward_references() {
        let root = read(concat!(
            "[{\"$$id\":1,\"$$type\":\"Object\",\"next\":\"$$2\"},",
            "{\"$$id\":2,\"$$type\":\"Object\",\"back\":\"$$1\"}]"
        ))
        .unwrap();
        let first = root.as_object().unwrap();
        let second = first.get("next").unwrap();
        let back = second.as_object().unwrap().get("back").unwrap();
        assert!(back.as_object().unwrap().ptr_eq(first));
    }

    #[test]
    fn test_references_inside_arrays_of_the_root() {
        let root = read("[[1,[\"$$1\"]],{\"$$id\":1,\"$$type\":\"Object\"}]").unwrap();
        let items = root.as_array().unwrap();
        assert_eq!(items[0], Value::from(1));
        assert!(items[1].as_array().unwrap()[0].is_object());
    }

    #[test]
    fn test_invalid_reference() {
        assert_eq!(
            read("[{\"$$id\":1,\"$$type\":\"Object\",\"x\":\"$$9\"}]"),
            Err(Error::InvalidReference(9))
        );
    }

    #[test]
    fn test_headers_are_mandatory() {
        assert_eq!(
            read("[{\"$$type\":\"Object\",\"$$id\":1}]"),
            Err(Error::MissingHeader("$$id"))
        );
        assert_eq!(
            read("[{\"$$id\":1,\"x\":1}]"),
            Err(Error::MissingHeader("$$type"))
        );
        assert_eq!(read("[{}]"), Err(Error::MissingHeader("$$id")));
    }

    #[test]
    fn test_duplicate_ids_and_fields() {
        assert_eq!(
            read("[{\"$$id\":1,\"$$type\":\"Object\"},{\"$$id\":1,\"$$type\":\"Object\"}]"),
            Err(Error::DuplicateObjectId(1))
        );
        assert_eq!(
            read("[{\"$$id\":1,\"$$type\":\"Object\",\"a\":1,\"a\":2}]"),
            Err(Error::DuplicateField("a".to_string()))
        );
    }

    #[test]
    fn test_unknown_type_id() {
        assert_eq!(
            read("[{\"$$id\":1,\"$$type\":\"Missing\"}]"),
            Err(Error::UnregisteredTypeId("Missing".to_string()))
        );
    }

    #[test]
    fn test_empty_document() {
        assert!(read("[]").is_err());
    }

    #[test]
    fn test_depth_limit() {
        let input = format!("[{}1{}]", "[".repeat(200), "]".repeat(200));
        assert_eq!(read(&input), Err(Error::DepthLimitExceeded(128)));
    }

    #[test]
    fn test_truncated_input() {
        let err = read("[{\"$$id\":1,\"$$type\":\"Object\",\"a\":").unwrap_err();
        assert!(err.is_syntax());
    }
}
