//! Write path: flattening an object graph into a sequence of entries.
//!
//! The root value is the first entry. Every object reached from an entry is written as a
//! reference token and queued; when its turn comes it is written as an entry of its own,
//! headed by its `$$id` and `$$type`. Identities are assigned in discovery order starting
//! at 1, so entries appear in id order and each object is written exactly once no matter
//! how many paths reach it, cycles included.

use crate::context::{Frame, Location};
use crate::object::Object;
use crate::stream::StreamWriter;
use crate::text::RESERVED_PREFIX;
use crate::{Error, FieldBag, ObjectRef, Options, Result, TypeRegistry, Value};
use std::collections::{HashMap, VecDeque};
use tracing::{debug, trace};

/// State for one `serialize` call.
pub(crate) struct WriteContext<'a, W: StreamWriter + ?Sized> {
    registry: &'a TypeRegistry,
    options: &'a Options,
    writer: &'a mut W,
    // Keyed by address; the handle keeps the address from being reused mid-call.
    ids: HashMap<usize, (u64, ObjectRef)>,
    pending: VecDeque<Value>,
    frames: Vec<Frame>,
    depth: usize,
}

impl<'a, W: StreamWriter + ?Sized> WriteContext<'a, W> {
    pub(crate) fn new(registry: &'a TypeRegistry, options: &'a Options, writer: &'a mut W) -> Self {
        WriteContext {
            registry,
            options,
            writer,
            ids: HashMap::new(),
            pending: VecDeque::new(),
            frames: Vec::new(),
            depth: 0,
        }
    }

    pub(crate) fn serialize(mut self, root: &Value) -> Result<()> {
        self.writer.write_array_begin()?;
        self.pending.push_back(root.clone());
        let mut index = 0;
        while let Some(entry) = self.pending.pop_front() {
            self.writer.write_array_next(index)?;
            self.in_frame(Frame::Entry(index), |cx| cx.write_entry(&entry))?;
            index += 1;
        }
        self.writer.write_array_end()?;
        debug!(entries = index, objects = self.ids.len(), "serialized object graph");
        Ok(())
    }

    // Pops the frame on every exit path and stamps the location on unlocated errors.
    fn in_frame<T>(&mut self, frame: Frame, f: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        self.frames.push(frame);
        let result = f(self).map_err(|err| self.locate(err));
        self.frames.pop();
        result
    }

    fn locate(&self, err: Error) -> Error {
        match err {
            Error::UnsupportedValue { path, reason } if path.is_empty() => {
                Error::unsupported_value(Location(&self.frames).to_string(), reason)
            }
            other => other,
        }
    }

    /// Returns the object's identity and whether it was seen for the first time.
    fn identify(&mut self, obj: &ObjectRef) -> (u64, bool) {
        if let Some((id, _)) = self.ids.get(&obj.addr()) {
            return (*id, false);
        }
        let id = self.ids.len() as u64 + 1;
        self.ids.insert(obj.addr(), (id, obj.clone()));
        (id, true)
    }

    fn write_entry(&mut self, entry: &Value) -> Result<()> {
        match entry {
            Value::Object(obj) => self.write_object(obj),
            other => self.write_value(other),
        }
    }

    fn write_value(&mut self, value: &Value) -> Result<()> {
        match value {
            Value::Null => self.writer.write_null(),
            Value::Undefined => self.writer.write_undefined(),
            Value::Bool(b) => self.writer.write_boolean(*b),
            Value::Number(n) => self.writer.write_number(*n),
            Value::String(s) => self.writer.write_string(s),
            Value::Array(items) => self.write_array(items),
            Value::Object(obj) => {
                let (id, first_seen) = self.identify(obj);
                if first_seen {
                    trace!(id, type_name = %obj.borrow().type_name(), "queued object");
                    self.pending.push_back(value.clone());
                }
                self.writer.write_reference(id)
            }
        }
    }

    fn write_array(&mut self, items: &[Value]) -> Result<()> {
        if self.depth >= self.options.max_depth {
            return Err(Error::DepthLimitExceeded(self.options.max_depth));
        }
        self.depth += 1;
        let result = self.write_array_items(items);
        self.depth -= 1;
        result
    }

    fn write_array_items(&mut self, items: &[Value]) -> Result<()> {
        self.writer.write_array_begin()?;
        for (index, item) in items.iter().enumerate() {
            self.writer.write_array_next(index)?;
            self.in_frame(Frame::Index(index), |cx| cx.write_value(item))?;
        }
        self.writer.write_array_end()
    }

    fn write_object(&mut self, obj: &ObjectRef) -> Result<()> {
        let (id, _) = self.identify(obj);
        let registry = self.registry;
        let object = obj.borrow();
        let type_id = registry.type_id_of(&object)?;
        trace!(id, type_id, "writing entry");

        self.in_frame(Frame::Object(id), |cx| {
            cx.writer.write_object_begin()?;
            cx.writer.write_field_begin("$$id", 0)?;
            cx.writer.write_number(id as f64)?;
            cx.writer.write_field_end("$$id", 0)?;
            cx.writer.write_field_begin("$$type", 1)?;
            cx.writer.write_string(type_id)?;
            cx.writer.write_field_end("$$type", 1)?;

            match &*object {
                Object::Record(record) => {
                    cx.write_fields(record.iter().map(|(name, value)| (name.as_str(), value)))?;
                }
                Object::Custom(custom) => {
                    let mut bag = FieldBag::new();
                    custom.serialize(&mut bag)?;
                    cx.write_fields(bag.iter())?;
                }
            }
            cx.writer.write_object_end()
        })
    }

    fn write_fields<'v>(&mut self, fields: impl Iterator<Item = (&'v str, &'v Value)>) -> Result<()> {
        for (offset, (name, value)) in fields.enumerate() {
            let index = offset + 2;
            self.in_frame(Frame::Field(name.to_string()), |cx| {
                if cx.options.strict_strings && name.starts_with(RESERVED_PREFIX) {
                    return Err(Error::unsupported_value(
                        "",
                        format!("field names starting with {:?} are reserved", RESERVED_PREFIX),
                    ));
                }
                cx.writer.write_field_begin(name, index)?;
                cx.write_value(value)?;
                cx.writer.write_field_end(name, index)
            })?;
        }
        Ok(())
    }
}
