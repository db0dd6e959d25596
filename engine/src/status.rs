use std::ffi::CString;
use std::fmt;

/// Canonical error codes, numbered as TensorFlow's `error::Code`.
#[repr(i32)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Code {
    Ok = 0,
    Cancelled = 1,
    Unknown = 2,
    InvalidArgument = 3,
    DeadlineExceeded = 4,
    NotFound = 5,
    AlreadyExists = 6,
    PermissionDenied = 7,
    ResourceExhausted = 8,
    FailedPrecondition = 9,
    Aborted = 10,
    OutOfRange = 11,
    Unimplemented = 12,
    Internal = 13,
    Unavailable = 14,
    DataLoss = 15,
    Unauthenticated = 16,
}

impl Code {
    pub fn from_i32(code: i32) -> Code {
        use Code::*;
        match code {
            0 => Ok,
            1 => Cancelled,
            3 => InvalidArgument,
            4 => DeadlineExceeded,
            5 => NotFound,
            6 => AlreadyExists,
            7 => PermissionDenied,
            8 => ResourceExhausted,
            9 => FailedPrecondition,
            10 => Aborted,
            11 => OutOfRange,
            12 => Unimplemented,
            13 => Internal,
            14 => Unavailable,
            15 => DataLoss,
            16 => Unauthenticated,
            _ => Unknown,
        }
    }

    /// Code carried by an engine error. Errors that were not raised with a
    /// code are `Unknown`.
    pub fn of(e: &anyhow::Error) -> Code {
        e.downcast_ref::<Failure>().map(|f| f.code).unwrap_or(Code::Unknown)
    }
}

impl fmt::Display for Code {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Code::Ok => "OK",
            Code::Cancelled => "CANCELLED",
            Code::Unknown => "UNKNOWN",
            Code::InvalidArgument => "INVALID_ARGUMENT",
            Code::DeadlineExceeded => "DEADLINE_EXCEEDED",
            Code::NotFound => "NOT_FOUND",
            Code::AlreadyExists => "ALREADY_EXISTS",
            Code::PermissionDenied => "PERMISSION_DENIED",
            Code::ResourceExhausted => "RESOURCE_EXHAUSTED",
            Code::FailedPrecondition => "FAILED_PRECONDITION",
            Code::Aborted => "ABORTED",
            Code::OutOfRange => "OUT_OF_RANGE",
            Code::Unimplemented => "UNIMPLEMENTED",
            Code::Internal => "INTERNAL",
            Code::Unavailable => "UNAVAILABLE",
            Code::DataLoss => "DATA_LOSS",
            Code::Unauthenticated => "UNAUTHENTICATED",
        };
        write!(f, "{name}")
    }
}

/// An engine error tagged with its code.
#[derive(Clone, Debug, PartialEq)]
pub struct Failure {
    pub code: Code,
    pub message: String,
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for Failure {}

/// Returns early with an error carrying `code`.
macro_rules! fail {
    ($code: ident, $($arg: tt)*) => {
        return Err(anyhow::Error::from($crate::status::Failure {
            code: $crate::status::Code::$code,
            message: format!($($arg)*),
        }))
    };
}

/// Builds an error carrying `code`, for `ok_or_else` and friends.
macro_rules! failure {
    ($code: ident, $($arg: tt)*) => {
        anyhow::Error::from($crate::status::Failure {
            code: $crate::status::Code::$code,
            message: format!($($arg)*),
        })
    };
}

/// Outcome of a C ABI call, owned by the caller.
#[derive(Debug)]
pub struct TfbStatus {
    pub(crate) code: Code,
    pub(crate) message: CString,
}

impl Default for TfbStatus {
    fn default() -> TfbStatus {
        TfbStatus { code: Code::Ok, message: CString::default() }
    }
}

impl TfbStatus {
    pub(crate) fn set(&mut self, code: Code, message: String) {
        self.code = code;
        self.message = CString::new(message.replace('\0', "\\0")).unwrap_or_default();
    }

    pub(crate) fn set_error(&mut self, e: &anyhow::Error) {
        self.set(Code::of(e), format!("{e:#}"))
    }

    pub(crate) fn reset(&mut self) {
        self.set(Code::Ok, String::new())
    }
}
