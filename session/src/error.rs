use std::fmt;

use tfbind_engine::Code;
use tfbind_proto::MalformedInput;

#[derive(Clone, Debug, PartialEq)]
pub enum Error {
    /// A graph could not be decoded from its binary or text form.
    MalformedInput(MalformedInput),
    /// The engine refused to create a session.
    EngineInit { code: i32, message: String },
    /// The engine rejected a graph extension.
    Graph { code: i32, message: String },
    /// The engine failed to run the graph.
    Run { code: i32, message: String },
    UseAfterClose,
    NoGraphLoaded,
    InvalidArgument(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// The engine status code, for errors reported by the engine.
    pub fn code(&self) -> Option<Code> {
        match self {
            Error::EngineInit { code, .. }
            | Error::Graph { code, .. }
            | Error::Run { code, .. } => Some(Code::from_i32(*code)),
            _ => None,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::MalformedInput(e) => write!(f, "Malformed graph: {e}"),
            Error::EngineInit { code, message } => {
                write!(f, "Session creation failed ({}): {message}", Code::from_i32(*code))
            }
            Error::Graph { code, message } => {
                write!(f, "Graph extension failed ({}): {message}", Code::from_i32(*code))
            }
            Error::Run { code, message } => {
                write!(f, "Run failed ({}): {message}", Code::from_i32(*code))
            }
            Error::UseAfterClose => write!(f, "Session is closed"),
            Error::NoGraphLoaded => write!(f, "No graph loaded in session"),
            Error::InvalidArgument(message) => write!(f, "Invalid argument: {message}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::MalformedInput(e) => Some(e),
            _ => None,
        }
    }
}

impl From<MalformedInput> for Error {
    fn from(e: MalformedInput) -> Error {
        Error::MalformedInput(e)
    }
}

impl From<std::ffi::NulError> for Error {
    fn from(e: std::ffi::NulError) -> Error {
        Error::InvalidArgument(format!("Name contains a nul byte at {}", e.nul_position()))
    }
}
