use serde_json::{Map, Number, Value};

use super::{
    error::SerdeErr,
    stream::{StreamRead, StreamWrite},
};

enum WriteFrame {
    Array(Vec<Value>),
    Object(Map<String, Value>, Option<String>),
}

/// Self-describing encoder producing a [`serde_json::Value`] tree.
///
/// Used for world snapshots. Non-finite floats become `null`.
#[derive(Default)]
pub struct JsonWriter {
    frames: Vec<WriteFrame>,
    root: Option<Value>,
}

impl JsonWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the finished document, `null` if nothing was written.
    pub fn into_value(self) -> Value {
        if !self.frames.is_empty() {
            panic!("JsonWriter finished with {} open frames", self.frames.len());
        }
        self.root.unwrap_or(Value::Null)
    }

    fn emit(&mut self, value: Value) {
        match self.frames.last_mut() {
            Some(WriteFrame::Array(items)) => items.push(value),
            Some(WriteFrame::Object(map, key)) => {
                let Some(key) = key.take() else {
                    panic!("JsonWriter: value written inside an object without a key");
                };
                map.insert(key, value);
            }
            None => self.root = Some(value),
        }
    }

    fn emit_float(&mut self, value: f64) {
        let value = Number::from_f64(value).map_or(Value::Null, Value::Number);
        self.emit(value);
    }
}

impl StreamWrite for JsonWriter {
    fn write_bool(&mut self, value: bool) {
        self.emit(Value::Bool(value));
    }

    fn write_u8(&mut self, value: u8) {
        self.emit(Value::from(value));
    }

    fn write_u32(&mut self, value: u32) {
        self.emit(Value::from(value));
    }

    fn write_i32(&mut self, value: i32) {
        self.emit(Value::from(value));
    }

    fn write_u64(&mut self, value: u64) {
        self.emit(Value::from(value));
    }

    fn write_i64(&mut self, value: i64) {
        self.emit(Value::from(value));
    }

    fn write_f32(&mut self, value: f32) {
        self.emit_float(f64::from(value));
    }

    fn write_f64(&mut self, value: f64) {
        self.emit_float(value);
    }

    fn write_str(&mut self, value: &str) {
        self.emit(Value::String(value.to_string()));
    }

    fn array_begin(&mut self, len: usize) {
        self.frames.push(WriteFrame::Array(Vec::with_capacity(len)));
    }

    fn array_next(&mut self) {}

    fn array_end(&mut self) {
        match self.frames.pop() {
            Some(WriteFrame::Array(items)) => self.emit(Value::Array(items)),
            _ => panic!("JsonWriter: array_end without a matching array_begin"),
        }
    }

    fn object_begin(&mut self) {
        self.frames.push(WriteFrame::Object(Map::new(), None));
    }

    fn object_next(&mut self, key: &str) {
        match self.frames.last_mut() {
            Some(WriteFrame::Object(_, pending)) => *pending = Some(key.to_string()),
            _ => panic!("JsonWriter: object_next outside of an object"),
        }
    }

    fn object_end(&mut self) {
        match self.frames.pop() {
            Some(WriteFrame::Object(map, _)) => self.emit(Value::Object(map)),
            _ => panic!("JsonWriter: object_end without a matching object_begin"),
        }
    }
}

enum ReadFrame<'a> {
    Array { items: &'a [Value], next: usize },
    Object(&'a Map<String, Value>),
}

/// Decoder walking a borrowed [`serde_json::Value`] tree.
pub struct JsonReader<'a> {
    pending: Option<&'a Value>,
    frames: Vec<ReadFrame<'a>>,
}

impl<'a> JsonReader<'a> {
    pub fn new(root: &'a Value) -> Self {
        Self {
            pending: Some(root),
            frames: Vec::new(),
        }
    }

    fn next_value(&mut self) -> Result<&'a Value, SerdeErr> {
        self.pending.take().ok_or(SerdeErr::Structure {
            context: "value read with no pending JSON value",
        })
    }

    fn read_unsigned(&mut self, target: &'static str) -> Result<u64, SerdeErr> {
        let value = self.next_value()?;
        match value {
            Value::Number(number) => number.as_u64().ok_or_else(|| SerdeErr::OutOfRange {
                value: number.to_string(),
                target,
            }),
            other => Err(mismatch("number", other)),
        }
    }

    fn read_signed(&mut self, target: &'static str) -> Result<i64, SerdeErr> {
        let value = self.next_value()?;
        match value {
            Value::Number(number) => number.as_i64().ok_or_else(|| SerdeErr::OutOfRange {
                value: number.to_string(),
                target,
            }),
            other => Err(mismatch("number", other)),
        }
    }

    fn read_float(&mut self) -> Result<f64, SerdeErr> {
        match self.next_value()? {
            Value::Number(number) => number.as_f64().ok_or(SerdeErr::TypeMismatch {
                expected: "float",
                found: "number",
            }),
            // non-finite floats are written as null
            Value::Null => Ok(f64::NAN),
            other => Err(mismatch("number", other)),
        }
    }

    fn current_object(&self) -> Result<&'a Map<String, Value>, SerdeErr> {
        match self.frames.last() {
            Some(ReadFrame::Object(map)) => Ok(*map),
            _ => Err(SerdeErr::Structure {
                context: "object key read outside of an object",
            }),
        }
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn mismatch(expected: &'static str, found: &Value) -> SerdeErr {
    SerdeErr::TypeMismatch {
        expected,
        found: kind(found),
    }
}

fn narrow<T: TryFrom<u64>>(value: u64, target: &'static str) -> Result<T, SerdeErr> {
    T::try_from(value).map_err(|_| SerdeErr::OutOfRange {
        value: value.to_string(),
        target,
    })
}

impl<'a> StreamRead for JsonReader<'a> {
    fn read_bool(&mut self) -> Result<bool, SerdeErr> {
        match self.next_value()? {
            Value::Bool(value) => Ok(*value),
            other => Err(mismatch("bool", other)),
        }
    }

    fn read_u8(&mut self) -> Result<u8, SerdeErr> {
        let value = self.read_unsigned("u8")?;
        narrow(value, "u8")
    }

    fn read_u32(&mut self) -> Result<u32, SerdeErr> {
        let value = self.read_unsigned("u32")?;
        narrow(value, "u32")
    }

    fn read_i32(&mut self) -> Result<i32, SerdeErr> {
        let value = self.read_signed("i32")?;
        i32::try_from(value).map_err(|_| SerdeErr::OutOfRange {
            value: value.to_string(),
            target: "i32",
        })
    }

    fn read_u64(&mut self) -> Result<u64, SerdeErr> {
        self.read_unsigned("u64")
    }

    fn read_i64(&mut self) -> Result<i64, SerdeErr> {
        self.read_signed("i64")
    }

    fn read_f32(&mut self) -> Result<f32, SerdeErr> {
        Ok(self.read_float()? as f32)
    }

    fn read_f64(&mut self) -> Result<f64, SerdeErr> {
        self.read_float()
    }

    fn read_string(&mut self) -> Result<String, SerdeErr> {
        match self.next_value()? {
            Value::String(value) => Ok(value.clone()),
            other => Err(mismatch("string", other)),
        }
    }

    fn array_begin(&mut self) -> Result<(), SerdeErr> {
        match self.next_value()? {
            Value::Array(items) => {
                self.frames.push(ReadFrame::Array { items, next: 0 });
                Ok(())
            }
            other => Err(mismatch("array", other)),
        }
    }

    fn array_next(&mut self) -> Result<bool, SerdeErr> {
        let Some(ReadFrame::Array { items, next }) = self.frames.last_mut() else {
            return Err(SerdeErr::Structure {
                context: "array_next called outside of an array",
            });
        };
        let items: &'a [Value] = *items;
        match items.get(*next) {
            Some(value) => {
                *next += 1;
                self.pending = Some(value);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn array_end(&mut self) -> Result<(), SerdeErr> {
        match self.frames.pop() {
            Some(ReadFrame::Array { items, next }) if next == items.len() => Ok(()),
            Some(ReadFrame::Array { .. }) => Err(SerdeErr::Structure {
                context: "array ended before all elements were read",
            }),
            _ => Err(SerdeErr::Structure {
                context: "array_end called outside of an array",
            }),
        }
    }

    fn object_begin(&mut self) -> Result<(), SerdeErr> {
        match self.next_value()? {
            Value::Object(map) => {
                self.frames.push(ReadFrame::Object(map));
                Ok(())
            }
            other => Err(mismatch("object", other)),
        }
    }

    fn object_next(&mut self, key: &str) -> Result<(), SerdeErr> {
        if self.try_object_next(key)? {
            Ok(())
        } else {
            Err(SerdeErr::MissingKey {
                key: key.to_string(),
            })
        }
    }

    fn try_object_next(&mut self, key: &str) -> Result<bool, SerdeErr> {
        let map = self.current_object()?;
        match map.get(key) {
            Some(value) => {
                self.pending = Some(value);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn object_end(&mut self) -> Result<(), SerdeErr> {
        match self.frames.pop() {
            Some(ReadFrame::Object(_)) => {
                self.pending = None;
                Ok(())
            }
            _ => Err(SerdeErr::Structure {
                context: "object_end called outside of an object",
            }),
        }
    }
}
