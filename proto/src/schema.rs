//! Schema description of messages.
//!
//! A message type is fully described by a static [`MessageDesc`] and an
//! implementation of [`Schema`]: `fields` walks the fields that are present,
//! `slot` hands out a mutable target for a field being decoded. Everything
//! else (encoding, decoding, size, text format) is generic over these two.
use std::collections::HashMap;
use std::fmt;

use crate::wire::{self, WireType};

/// Symbolic names of an enum type, used by the text format.
#[derive(Debug)]
pub struct EnumDesc {
    pub name: &'static str,
    pub values: &'static [(i32, &'static str)],
}

impl EnumDesc {
    pub fn name_of(&self, value: i32) -> Option<&'static str> {
        self.values.iter().find(|(v, _)| *v == value).map(|(_, n)| *n)
    }

    pub fn value_of(&self, name: &str) -> Option<i32> {
        self.values.iter().find(|(_, n)| *n == name).map(|(v, _)| *v)
    }
}

#[derive(Clone, Copy, Debug)]
pub enum Kind {
    Double,
    Float,
    Int64,
    Uint64,
    Int32,
    Bool,
    Enum(&'static EnumDesc),
    String,
    Bytes,
    Message,
}

impl Kind {
    pub fn wire_type(self) -> WireType {
        match self {
            Kind::Double => WireType::SixtyFourBit,
            Kind::Float => WireType::ThirtyTwoBit,
            Kind::Int64 | Kind::Uint64 | Kind::Int32 | Kind::Bool | Kind::Enum(_) => {
                WireType::Varint
            }
            Kind::String | Kind::Bytes | Kind::Message => WireType::LengthDelimited,
        }
    }

    /// Numeric kinds can be packed when repeated.
    pub fn is_packable(self) -> bool {
        self.wire_type() != WireType::LengthDelimited
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Label {
    Optional,
    Repeated,
    /// `map<string, Message>`, carried on the wire as repeated (key, value) entries.
    Map,
    /// Member of the named oneof group.
    Oneof(&'static str),
}

#[derive(Debug)]
pub struct FieldDesc {
    pub number: u32,
    pub name: &'static str,
    pub kind: Kind,
    pub label: Label,
}

impl FieldDesc {
    pub const fn optional(number: u32, name: &'static str, kind: Kind) -> FieldDesc {
        FieldDesc { number, name, kind, label: Label::Optional }
    }

    pub const fn repeated(number: u32, name: &'static str, kind: Kind) -> FieldDesc {
        FieldDesc { number, name, kind, label: Label::Repeated }
    }

    pub const fn map(number: u32, name: &'static str) -> FieldDesc {
        FieldDesc { number, name, kind: Kind::Message, label: Label::Map }
    }

    pub const fn oneof(
        number: u32,
        name: &'static str,
        kind: Kind,
        group: &'static str,
    ) -> FieldDesc {
        FieldDesc { number, name, kind, label: Label::Oneof(group) }
    }

    /// Whether a value of this field may come with the given wire type.
    /// Repeated numeric fields are accepted both packed and unpacked.
    pub fn accepts(&self, wire: WireType) -> bool {
        wire == self.kind.wire_type()
            || (self.label == Label::Repeated
                && self.kind.is_packable()
                && wire == WireType::LengthDelimited)
    }
}

#[derive(Debug)]
pub struct MessageDesc {
    pub name: &'static str,
    pub fields: &'static [FieldDesc],
}

impl MessageDesc {
    pub fn field(&self, number: u32) -> Option<&'static FieldDesc> {
        self.fields.iter().find(|f| f.number == number)
    }

    pub fn field_by_name(&self, name: &str) -> Option<&'static FieldDesc> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// A message type, as seen by the generic codec.
pub trait Schema: fmt::Debug + Send + Sync {
    fn schema(&self) -> &'static MessageDesc;

    /// Emits every present field.
    fn fields(&self, out: &mut Emit<'_>);

    /// Decoding target for field `number`. For a oneof member this assigns a
    /// fresh variant to the group, discarding whichever variant was set.
    fn slot(&mut self, number: u32) -> Option<Slot<'_>>;
}

/// One occurrence of a field, borrowed from its message.
#[derive(Clone, Copy, Debug)]
pub enum Value<'a> {
    Double(f64),
    Float(f32),
    Int64(i64),
    Uint64(u64),
    Int32(i32),
    Bool(bool),
    Enum(i32),
    String(&'a str),
    Bytes(&'a [u8]),
    Message(&'a dyn Schema),
}

impl Value<'_> {
    pub fn wire_type(&self) -> WireType {
        match self {
            Value::Double(_) => WireType::SixtyFourBit,
            Value::Float(_) => WireType::ThirtyTwoBit,
            Value::Int64(_) | Value::Uint64(_) | Value::Int32(_) | Value::Bool(_) => {
                WireType::Varint
            }
            Value::Enum(_) => WireType::Varint,
            Value::String(_) | Value::Bytes(_) | Value::Message(_) => WireType::LengthDelimited,
        }
    }

    pub fn is_default(&self) -> bool {
        match self {
            Value::Double(v) => *v == 0.0,
            Value::Float(v) => *v == 0.0,
            Value::Int64(v) => *v == 0,
            Value::Uint64(v) => *v == 0,
            Value::Int32(v) | Value::Enum(v) => *v == 0,
            Value::Bool(v) => !*v,
            Value::String(v) => v.is_empty(),
            Value::Bytes(v) => v.is_empty(),
            Value::Message(_) => false,
        }
    }
}

/// A repeated numeric field, emitted as a single packed record.
#[derive(Clone, Copy, Debug)]
pub enum Packed<'a> {
    Double(&'a [f64]),
    Float(&'a [f32]),
    Int64(&'a [i64]),
    Int32(&'a [i32]),
    Bool(&'a [bool]),
    Enum(&'a [i32]),
}

impl<'a> Packed<'a> {
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn len(&self) -> usize {
        match self {
            Packed::Double(v) => v.len(),
            Packed::Float(v) => v.len(),
            Packed::Int64(v) => v.len(),
            Packed::Int32(v) | Packed::Enum(v) => v.len(),
            Packed::Bool(v) => v.len(),
        }
    }

    /// Byte length of the record, without key and length prefix.
    pub fn payload_len(&self) -> usize {
        match self {
            Packed::Double(v) => 8 * v.len(),
            Packed::Float(v) => 4 * v.len(),
            Packed::Int64(v) => v.iter().map(|x| wire::varint_len(*x as u64)).sum(),
            Packed::Int32(v) | Packed::Enum(v) => {
                v.iter().map(|x| wire::varint_len(*x as i64 as u64)).sum()
            }
            Packed::Bool(v) => v.len(),
        }
    }

    pub fn get(&self, ix: usize) -> Option<Value<'a>> {
        match *self {
            Packed::Double(v) => v.get(ix).map(|x| Value::Double(*x)),
            Packed::Float(v) => v.get(ix).map(|x| Value::Float(*x)),
            Packed::Int64(v) => v.get(ix).map(|x| Value::Int64(*x)),
            Packed::Int32(v) => v.get(ix).map(|x| Value::Int32(*x)),
            Packed::Bool(v) => v.get(ix).map(|x| Value::Bool(*x)),
            Packed::Enum(v) => v.get(ix).map(|x| Value::Enum(*x)),
        }
    }
}

/// Receives the fields a message emits.
pub trait Sink {
    fn field(&mut self, number: u32, value: Value<'_>);
    fn packed(&mut self, number: u32, values: Packed<'_>);
    fn entry(&mut self, number: u32, key: &str, value: &dyn Schema);
}

/// Presence rules in front of a [`Sink`]: default singular scalars, empty
/// repeated fields and empty maps are not emitted; oneof members always are.
pub struct Emit<'s> {
    sink: &'s mut dyn Sink,
}

impl<'s> Emit<'s> {
    pub fn new(sink: &'s mut dyn Sink) -> Emit<'s> {
        Emit { sink }
    }

    pub fn scalar(&mut self, number: u32, value: Value<'_>) {
        if !value.is_default() {
            self.sink.field(number, value)
        }
    }

    pub fn oneof(&mut self, number: u32, value: Value<'_>) {
        self.sink.field(number, value)
    }

    pub fn message<M: Schema>(&mut self, number: u32, message: Option<&M>) {
        if let Some(m) = message {
            self.sink.field(number, Value::Message(m))
        }
    }

    pub fn messages<M: Schema>(&mut self, number: u32, messages: &[M]) {
        for m in messages {
            self.sink.field(number, Value::Message(m))
        }
    }

    pub fn strings(&mut self, number: u32, values: &[String]) {
        for s in values {
            self.sink.field(number, Value::String(s))
        }
    }

    pub fn bytes_list(&mut self, number: u32, values: &[Vec<u8>]) {
        for b in values {
            self.sink.field(number, Value::Bytes(b))
        }
    }

    pub fn packed(&mut self, number: u32, values: Packed<'_>) {
        if !values.is_empty() {
            self.sink.packed(number, values)
        }
    }

    /// Entries go out sorted by key so that encoding is deterministic.
    pub fn map<M: Schema>(&mut self, number: u32, map: &HashMap<String, M>) {
        let mut keys: Vec<&String> = map.keys().collect();
        keys.sort();
        for k in keys {
            self.sink.entry(number, k, &map[k])
        }
    }
}

/// Mutable decoding target for one field.
pub enum Slot<'a> {
    Double(&'a mut f64),
    Float(&'a mut f32),
    Int64(&'a mut i64),
    Uint64(&'a mut u64),
    Int32(&'a mut i32),
    Bool(&'a mut bool),
    Enum(&'a mut i32),
    String(&'a mut String),
    Bytes(&'a mut Vec<u8>),
    Message(&'a mut dyn Schema),
    Doubles(&'a mut Vec<f64>),
    Floats(&'a mut Vec<f32>),
    Int64s(&'a mut Vec<i64>),
    Int32s(&'a mut Vec<i32>),
    Bools(&'a mut Vec<bool>),
    Enums(&'a mut Vec<i32>),
    Strings(&'a mut Vec<String>),
    BytesList(&'a mut Vec<Vec<u8>>),
    Messages(&'a mut dyn MessageList),
    Map(&'a mut dyn MessageMap),
}

pub trait MessageList {
    /// Appends a default message and returns it for decoding.
    fn push_default(&mut self) -> &mut dyn Schema;
}

impl<M: Schema + Default> MessageList for Vec<M> {
    fn push_default(&mut self) -> &mut dyn Schema {
        let ix = self.len();
        self.push(M::default());
        &mut self[ix]
    }
}

pub trait MessageMap {
    /// Resets the value under `key` and returns it for decoding. Last entry wins.
    fn replace_entry(&mut self, key: String) -> &mut dyn Schema;
}

impl<M: Schema + Default> MessageMap for HashMap<String, M> {
    fn replace_entry(&mut self, key: String) -> &mut dyn Schema {
        use std::collections::hash_map::Entry;
        match self.entry(key) {
            Entry::Occupied(mut o) => {
                *o.get_mut() = M::default();
                o.into_mut()
            }
            Entry::Vacant(v) => v.insert(M::default()),
        }
    }
}
