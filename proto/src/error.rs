use std::fmt;

use crate::wire::WireType;

/// Structural violation found while decoding a message, from bytes or from
/// its text form. No partial message is ever returned alongside it.
#[derive(Clone, Debug, PartialEq)]
pub enum MalformedInput {
    /// The input ends in the middle of a key or a value.
    Truncated,
    InvalidVarint,
    InvalidKey(String),
    /// A length prefix claims more bytes than what is left.
    LengthOverrun { len: u64, remaining: usize },
    WireTypeMismatch {
        message: &'static str,
        field: &'static str,
        expected: WireType,
        found: WireType,
    },
    InvalidUtf8 { message: &'static str, field: &'static str },
    UnsupportedWireType(WireType),
    /// Messages nested deeper than the given limit.
    RecursionLimit(u32),
    Text { line: usize, reason: String },
}

impl fmt::Display for MalformedInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use MalformedInput::*;
        match self {
            Truncated => write!(f, "Input truncated in the middle of a field"),
            InvalidVarint => write!(f, "Invalid varint"),
            InvalidKey(reason) => write!(f, "Invalid field key: {reason}"),
            LengthOverrun { len, remaining } => {
                write!(f, "Length prefix {len} exceeds the {remaining} remaining bytes")
            }
            WireTypeMismatch { message, field, expected, found } => write!(
                f,
                "Field {message}.{field} expects wire type {expected:?}, found {found:?}"
            ),
            InvalidUtf8 { message, field } => {
                write!(f, "Field {message}.{field} is not valid UTF-8")
            }
            UnsupportedWireType(wire) => write!(f, "Unsupported wire type {wire:?}"),
            RecursionLimit(limit) => {
                write!(f, "Messages nested deeper than the limit of {limit}")
            }
            Text { line, reason } => write!(f, "Text format error at line {line}: {reason}"),
        }
    }
}

impl std::error::Error for MalformedInput {}
