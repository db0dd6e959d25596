//! The generic encode / decode / size traversal shared by all messages.
use bytes::BufMut;

use crate::MalformedInput;
use crate::schema::{
    Emit, FieldDesc, MessageDesc, MessageMap, Packed, Schema, Sink, Slot, Value,
};
use crate::wire::{self, Reader, WireType};

/// Exact length of the encoding of `message`, computed without encoding it.
pub fn encoded_len(message: &dyn Schema) -> usize {
    let mut sizer = Sizer(0);
    message.fields(&mut Emit::new(&mut sizer));
    sizer.0
}

pub fn encode<B: BufMut>(message: &dyn Schema, buf: &mut B) {
    message.fields(&mut Emit::new(&mut Encoder { buf }))
}

pub fn encode_to_vec(message: &dyn Schema) -> Vec<u8> {
    let mut buf = Vec::with_capacity(encoded_len(message));
    encode(message, &mut buf);
    buf
}

/// Deepest nesting of messages accepted by the decoders.
pub const RECURSION_LIMIT: u32 = 100;

/// Decodes `bytes` into `message`, on top of what it already holds.
pub fn merge(message: &mut dyn Schema, bytes: &[u8]) -> Result<(), MalformedInput> {
    merge_nested(message, bytes, RECURSION_LIMIT)
}

fn merge_nested(
    message: &mut dyn Schema,
    bytes: &[u8],
    depth: u32,
) -> Result<(), MalformedInput> {
    let desc = message.schema();
    let mut reader = Reader::new(bytes);
    while !reader.is_empty() {
        let (number, wire) = reader.key()?;
        let Some(field) = desc.field(number) else {
            trace!("{}: skipping unknown field {} ({:?})", desc.name, number, wire);
            reader.skip(wire)?;
            continue;
        };
        if !field.accepts(wire) {
            return Err(MalformedInput::WireTypeMismatch {
                message: desc.name,
                field: field.name,
                expected: field.kind.wire_type(),
                found: wire,
            });
        }
        match message.slot(number) {
            Some(slot) => merge_slot(desc, field, slot, wire, &mut reader, depth)?,
            None => reader.skip(wire)?,
        }
    }
    Ok(())
}

pub fn decode<M: Schema + Default>(bytes: &[u8]) -> Result<M, MalformedInput> {
    let mut message = M::default();
    merge(&mut message, bytes)?;
    Ok(message)
}

/// Codec entry points, available on every concrete message type.
pub trait Message: Schema + Default + Clone + PartialEq + Sized {
    fn encoded_len(&self) -> usize {
        encoded_len(self)
    }

    fn encode<B: BufMut>(&self, buf: &mut B) {
        encode(self, buf)
    }

    fn encode_to_vec(&self) -> Vec<u8> {
        encode_to_vec(self)
    }

    fn decode(bytes: &[u8]) -> Result<Self, MalformedInput> {
        decode(bytes)
    }

    fn merge(&mut self, bytes: &[u8]) -> Result<(), MalformedInput> {
        merge(self, bytes)
    }
}

impl<M: Schema + Default + Clone + PartialEq> Message for M {}

struct Sizer(usize);

impl Sink for Sizer {
    fn field(&mut self, number: u32, value: Value<'_>) {
        self.0 += wire::key_len(number) + value_len(value);
    }

    fn packed(&mut self, number: u32, values: Packed<'_>) {
        self.0 += wire::key_len(number) + wire::delimited_len(values.payload_len());
    }

    fn entry(&mut self, number: u32, key: &str, value: &dyn Schema) {
        self.0 += wire::key_len(number) + wire::delimited_len(entry_len(key, value));
    }
}

fn value_len(value: Value<'_>) -> usize {
    match value {
        Value::Double(_) => 8,
        Value::Float(_) => 4,
        Value::Int64(v) => wire::varint_len(v as u64),
        Value::Uint64(v) => wire::varint_len(v),
        Value::Int32(v) | Value::Enum(v) => wire::varint_len(v as i64 as u64),
        Value::Bool(_) => 1,
        Value::String(s) => wire::delimited_len(s.len()),
        Value::Bytes(b) => wire::delimited_len(b.len()),
        Value::Message(m) => wire::delimited_len(encoded_len(m)),
    }
}

/// Map entries always carry both their key (1) and value (2).
fn entry_len(key: &str, value: &dyn Schema) -> usize {
    wire::key_len(1)
        + value_len(Value::String(key))
        + wire::key_len(2)
        + value_len(Value::Message(value))
}

struct Encoder<'b, B: BufMut> {
    buf: &'b mut B,
}

impl<B: BufMut> Sink for Encoder<'_, B> {
    fn field(&mut self, number: u32, value: Value<'_>) {
        wire::put_key(number, value.wire_type(), self.buf);
        put_value(value, self.buf);
    }

    fn packed(&mut self, number: u32, values: Packed<'_>) {
        wire::put_key(number, WireType::LengthDelimited, self.buf);
        wire::put_varint(values.payload_len() as u64, self.buf);
        match values {
            Packed::Double(v) => v.iter().for_each(|x| self.buf.put_f64_le(*x)),
            Packed::Float(v) => v.iter().for_each(|x| self.buf.put_f32_le(*x)),
            Packed::Int64(v) => v.iter().for_each(|x| wire::put_varint(*x as u64, self.buf)),
            Packed::Int32(v) | Packed::Enum(v) => {
                v.iter().for_each(|x| wire::put_varint(*x as i64 as u64, self.buf))
            }
            Packed::Bool(v) => v.iter().for_each(|x| wire::put_varint(*x as u64, self.buf)),
        }
    }

    fn entry(&mut self, number: u32, key: &str, value: &dyn Schema) {
        wire::put_key(number, WireType::LengthDelimited, self.buf);
        wire::put_varint(entry_len(key, value) as u64, self.buf);
        self.field(1, Value::String(key));
        self.field(2, Value::Message(value));
    }
}

fn put_value<B: BufMut>(value: Value<'_>, buf: &mut B) {
    match value {
        Value::Double(v) => buf.put_f64_le(v),
        Value::Float(v) => buf.put_f32_le(v),
        Value::Int64(v) => wire::put_varint(v as u64, buf),
        Value::Uint64(v) => wire::put_varint(v, buf),
        Value::Int32(v) | Value::Enum(v) => wire::put_varint(v as i64 as u64, buf),
        Value::Bool(v) => wire::put_varint(v as u64, buf),
        Value::String(s) => wire::put_delimited(s.as_bytes(), buf),
        Value::Bytes(b) => wire::put_delimited(b, buf),
        Value::Message(m) => {
            wire::put_varint(encoded_len(m) as u64, buf);
            encode(m, buf);
        }
    }
}

fn utf8(
    desc: &'static MessageDesc,
    field: &'static FieldDesc,
    bytes: &[u8],
) -> Result<String, MalformedInput> {
    String::from_utf8(bytes.to_vec())
        .map_err(|_| MalformedInput::InvalidUtf8 { message: desc.name, field: field.name })
}

/// Reads one occurrence of a repeated numeric field, or a whole packed run of them.
fn repeated<'a>(
    reader: &mut Reader<'a>,
    wire: WireType,
    mut one: impl FnMut(&mut Reader<'a>) -> Result<(), MalformedInput>,
) -> Result<(), MalformedInput> {
    if wire == WireType::LengthDelimited {
        let mut packed = Reader::new(reader.length_delimited()?);
        while !packed.is_empty() {
            one(&mut packed)?;
        }
        Ok(())
    } else {
        one(reader)
    }
}

fn merge_slot(
    desc: &'static MessageDesc,
    field: &'static FieldDesc,
    slot: Slot<'_>,
    wire: WireType,
    r: &mut Reader<'_>,
    depth: u32,
) -> Result<(), MalformedInput> {
    let nested = || depth.checked_sub(1).ok_or(MalformedInput::RecursionLimit(RECURSION_LIMIT));
    match slot {
        Slot::Double(v) => *v = f64::from_bits(r.fixed64()?),
        Slot::Float(v) => *v = f32::from_bits(r.fixed32()?),
        Slot::Int64(v) => *v = r.varint()? as i64,
        Slot::Uint64(v) => *v = r.varint()?,
        Slot::Int32(v) | Slot::Enum(v) => *v = r.varint()? as i32,
        Slot::Bool(v) => *v = r.varint()? != 0,
        Slot::String(v) => *v = utf8(desc, field, r.length_delimited()?)?,
        Slot::Bytes(v) => *v = r.length_delimited()?.to_vec(),
        Slot::Message(m) => merge_nested(m, r.length_delimited()?, nested()?)?,
        Slot::Doubles(v) => repeated(r, wire, |r| {
            v.push(f64::from_bits(r.fixed64()?));
            Ok(())
        })?,
        Slot::Floats(v) => repeated(r, wire, |r| {
            v.push(f32::from_bits(r.fixed32()?));
            Ok(())
        })?,
        Slot::Int64s(v) => repeated(r, wire, |r| {
            v.push(r.varint()? as i64);
            Ok(())
        })?,
        Slot::Int32s(v) | Slot::Enums(v) => repeated(r, wire, |r| {
            v.push(r.varint()? as i32);
            Ok(())
        })?,
        Slot::Bools(v) => repeated(r, wire, |r| {
            v.push(r.varint()? != 0);
            Ok(())
        })?,
        Slot::Strings(v) => v.push(utf8(desc, field, r.length_delimited()?)?),
        Slot::BytesList(v) => v.push(r.length_delimited()?.to_vec()),
        Slot::Messages(list) => {
            let payload = r.length_delimited()?;
            merge_nested(list.push_default(), payload, nested()?)?
        }
        Slot::Map(map) => {
            merge_entry(desc, field, map, r.length_delimited()?, nested()?)?
        }
    }
    Ok(())
}

fn merge_entry(
    desc: &'static MessageDesc,
    field: &'static FieldDesc,
    map: &mut dyn MessageMap,
    bytes: &[u8],
    depth: u32,
) -> Result<(), MalformedInput> {
    let mut r = Reader::new(bytes);
    let mut key = String::new();
    let mut value = None;
    while !r.is_empty() {
        match r.key()? {
            (1, WireType::LengthDelimited) => key = utf8(desc, field, r.length_delimited()?)?,
            (2, WireType::LengthDelimited) => value = Some(r.length_delimited()?),
            (1 | 2, found) => {
                return Err(MalformedInput::WireTypeMismatch {
                    message: desc.name,
                    field: field.name,
                    expected: WireType::LengthDelimited,
                    found,
                });
            }
            (_, wire) => r.skip(wire)?,
        }
    }
    let target = map.replace_entry(key);
    if let Some(value) = value {
        merge_nested(target, value, depth)?;
    }
    Ok(())
}
