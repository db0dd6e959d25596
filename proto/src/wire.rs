//! Tag and scalar level of the wire format.
//!
//! A field key is `(field_number << 3) | wire_type`, emitted as a varint.
//! Length-delimited payloads are prefixed by their byte length as a varint.
use bytes::{Buf, BufMut};
use prost::encoding::{decode_key, decode_varint, encode_key, encode_varint, encoded_len_varint};

pub use prost::encoding::WireType;

use crate::MalformedInput;

/// Encoded size of the key of field `number`.
pub fn key_len(number: u32) -> usize {
    prost::encoding::key_len(number)
}

pub fn varint_len(value: u64) -> usize {
    encoded_len_varint(value)
}

/// Size of a length-delimited value whose payload is `len` bytes long.
pub fn delimited_len(len: usize) -> usize {
    varint_len(len as u64) + len
}

pub fn put_key<B: BufMut>(number: u32, wire: WireType, buf: &mut B) {
    encode_key(number, wire, buf)
}

pub fn put_varint<B: BufMut>(value: u64, buf: &mut B) {
    encode_varint(value, buf)
}

pub fn put_delimited<B: BufMut>(payload: &[u8], buf: &mut B) {
    encode_varint(payload.len() as u64, buf);
    buf.put_slice(payload);
}

/// A varint that stops at the end of the input with its continuation bit
/// still set is a truncation, anything else is garbage.
fn varint_failure(before: &[u8]) -> MalformedInput {
    if before.len() < 10 && before.iter().all(|b| b & 0x80 != 0) {
        MalformedInput::Truncated
    } else {
        MalformedInput::InvalidVarint
    }
}

/// Cursor over an encoded message.
#[derive(Clone, Debug)]
pub struct Reader<'a> {
    buf: &'a [u8],
}

impl<'a> Reader<'a> {
    pub fn new(buf: &'a [u8]) -> Reader<'a> {
        Reader { buf }
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn remaining(&self) -> usize {
        self.buf.len()
    }

    pub fn key(&mut self) -> Result<(u32, WireType), MalformedInput> {
        let before = self.buf;
        decode_key(&mut self.buf).map_err(|e| match varint_failure(before) {
            MalformedInput::Truncated => MalformedInput::Truncated,
            _ => MalformedInput::InvalidKey(e.to_string()),
        })
    }

    pub fn varint(&mut self) -> Result<u64, MalformedInput> {
        let before = self.buf;
        decode_varint(&mut self.buf).map_err(|_| varint_failure(before))
    }

    pub fn fixed64(&mut self) -> Result<u64, MalformedInput> {
        if self.buf.len() < 8 {
            return Err(MalformedInput::Truncated);
        }
        Ok(self.buf.get_u64_le())
    }

    pub fn fixed32(&mut self) -> Result<u32, MalformedInput> {
        if self.buf.len() < 4 {
            return Err(MalformedInput::Truncated);
        }
        Ok(self.buf.get_u32_le())
    }

    pub fn length_delimited(&mut self) -> Result<&'a [u8], MalformedInput> {
        let len = self.varint()?;
        if len > self.buf.len() as u64 {
            return Err(MalformedInput::LengthOverrun { len, remaining: self.buf.len() });
        }
        let (payload, rest) = self.buf.split_at(len as usize);
        self.buf = rest;
        Ok(payload)
    }

    /// Consumes the value of a field nobody asked for.
    pub fn skip(&mut self, wire: WireType) -> Result<(), MalformedInput> {
        match wire {
            WireType::Varint => self.varint().map(drop),
            WireType::SixtyFourBit => self.fixed64().map(drop),
            WireType::ThirtyTwoBit => self.fixed32().map(drop),
            WireType::LengthDelimited => self.length_delimited().map(drop),
            WireType::StartGroup | WireType::EndGroup => {
                Err(MalformedInput::UnsupportedWireType(wire))
            }
        }
    }
}
