//! # tfbind
//!
//! Loads TensorFlow graphs into the tfbind engine and runs them.
//!
//! The engine is only reached through its C ABI: every engine object
//! (status, session, tensor) is owned by one Rust value, and released when
//! that value is dropped.
//!
//! ```
//! use std::collections::HashMap;
//! use tfbind::prelude::*;
//!
//! let graph = graph()
//!     .node(
//!         node()
//!             .name("a")
//!             .op("Const")
//!             .attr("dtype", DataType::DtFloat)
//!             .attr("value", TensorProto::scalar(3.0f32)),
//!     )
//!     .node(node().name("b").op("Identity").input("a"));
//!
//! let mut session = Session::create().unwrap();
//! session.extend_graph(&graph).unwrap();
//! let outputs = session.run(&HashMap::new(), &["b"], &[]).unwrap();
//! assert_eq!(outputs[0].as_slice::<f32>().unwrap(), &[3.0]);
//! session.close();
//! ```

#[macro_use]
extern crate lazy_static;
#[macro_use]
extern crate log;

use std::ffi::CStr;

use tfbind_engine as sys;

/// Calls into the engine with `$status`, turning a failed status into the
/// `$kind` error.
macro_rules! check {
    ($status:expr, $kind:ident, $call:expr) => {{
        unsafe { $call };
        $status.check().map_err(|(code, message)| $crate::Error::$kind { code, message })
    }};
}

/// Owner of one engine object, released with `$dest` on drop.
macro_rules! wrapper {
    ($vis:vis $new_type:ident, $c_type:ident, $dest:ident) => {
        $vis struct $new_type(pub(crate) *mut sys::$c_type);

        impl Drop for $new_type {
            fn drop(&mut self) {
                unsafe {
                    sys::$dest(&mut self.0);
                }
            }
        }
    };
    ($vis:vis $new_type:ident, $c_type:ident, $dest:ident, with_status) => {
        $vis struct $new_type(pub(crate) *mut sys::$c_type);

        impl Drop for $new_type {
            fn drop(&mut self) {
                let status = $crate::Status::new();
                unsafe {
                    sys::$dest(&mut self.0, status.0);
                }
                if let Err((code, message)) = status.check() {
                    warn!("Releasing {} failed ({}): {}", stringify!($c_type), code, message);
                }
            }
        }
    };
}

mod environment;
mod error;
mod session;
mod tensor;

pub use self::environment::{Environment, SessionOptions};
pub use self::error::{Error, Result};
pub use self::session::{Session, SessionState};
pub use self::tensor::{Tensor, TensorType};
pub use tfbind_engine::Code;
pub use tfbind_proto::tfpb::tensorflow::DataType;

pub mod prelude {
    pub use crate::{Environment, Error, Session, SessionOptions, SessionState, Tensor};
    pub use tfbind_proto::tfpb::tensorflow::{DataType, GraphDef, NodeDef, TensorProto};
    pub use tfbind_proto::tfpb::{graph, node};
}

pub fn version() -> &'static str {
    unsafe { CStr::from_ptr(sys::tfb_version()) }.to_str().unwrap_or("unknown")
}

wrapper!(pub(crate) Status, TfbStatus, tfb_status_delete);

impl Status {
    pub(crate) fn new() -> Status {
        Status(sys::tfb_status_new())
    }

    /// Code and message of the last call this status was passed to.
    pub(crate) fn check(&self) -> std::result::Result<(), (i32, String)> {
        unsafe {
            let code = sys::tfb_status_code(self.0);
            if code == 0 {
                Ok(())
            } else {
                let message = CStr::from_ptr(sys::tfb_status_message(self.0));
                Err((code, message.to_string_lossy().into_owned()))
            }
        }
    }
}

#[cfg(test)]
pub(crate) fn setup_test_logger() {
    let _ = env_logger::Builder::from_env("TFBIND_LOG").try_init();
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn version_is_the_engine_one() {
        assert_eq!(version(), "0.1.0-pre");
    }

    #[test]
    fn fresh_status_is_ok() {
        assert_eq!(Status::new().check(), Ok(()));
    }
}
