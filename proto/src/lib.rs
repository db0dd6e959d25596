//! # tfbind protobuf module
//!
//! TensorFlow graph, function and event messages, with the wire codec they are
//! (de)serialized with.
//!
//! Messages do not carry generated marshaling code: each one describes its
//! fields (number, name, kind) and a single generic traversal does encoding,
//! decoding and size accounting for all of them.
//!
//! ## Example
//!
//! ```
//! use tfbind_proto::prelude::*;
//!
//! let mut event = Event { wall_time: 1000.5, step: 7, ..Event::default() };
//! event.set_file_version("1.0");
//!
//! let bytes = event.encode_to_vec();
//! assert_eq!(bytes.len(), event.encoded_len());
//!
//! let decoded = Event::decode(&bytes).unwrap();
//! assert_eq!(decoded.file_version(), "1.0");
//! assert!(decoded.graph_def().is_none());
//! ```

#[macro_use]
extern crate log;

pub mod codec;
mod error;
pub mod schema;
pub mod text;
pub mod tfpb;
pub mod wire;

pub use codec::Message;
pub use error::MalformedInput;

pub mod prelude {
    pub use crate::codec::Message;
    pub use crate::error::MalformedInput;
    pub use crate::schema::Schema;
    pub use crate::tfpb::tensorflow::{
        AttrValue, DataType, Event, FunctionDef, FunctionDefLibrary, GradientDef, GraphDef,
        NodeDef, Summary, TensorProto, TensorShapeProto,
    };
    pub use crate::tfpb::{graph, node};
}

#[cfg(test)]
#[allow(dead_code)]
pub fn setup_test_logger() {
    let _ = env_logger::Builder::from_env("TFBIND_LOG").try_init();
}
