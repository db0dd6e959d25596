#![allow(clippy::missing_safety_doc)]
//! # tfbind engine
//!
//! An in-process dataflow graph engine, driven through a C ABI modelled
//! after TensorFlow's `TF_*` session functions.
//!
//! Every fallible call takes a `TfbStatus` out-parameter, created with
//! `tfb_status_new`. After the call, `tfb_status_code` is `0` on success and
//! a TensorFlow error code otherwise, with `tfb_status_message` describing
//! the failure.
//!
//! Objects handed out by the engine (statuses, options, sessions, tensors)
//! are owned by the caller, who releases them with the matching
//! `tfb_*_delete` function. Delete functions take a pointer to the handle
//! and null it.
//!
//! Set `TFBIND_ERROR_STDERR` to have every error echoed on stderr.

#[macro_use]
extern crate derive_new;
#[macro_use]
extern crate lazy_static;
#[macro_use]
extern crate log;

#[macro_use]
mod status;
pub mod graph;
pub mod ops;
pub mod session;
pub mod tensor;

use std::ffi::{CStr, c_char, c_void};

pub use self::session::Session;
pub use self::status::{Code, Failure, TfbStatus};
pub use self::tensor::{Datum, Tensor};
pub use tfbind_proto::tfpb::tensorflow::DataType;

fn wrap<F: FnOnce() -> anyhow::Result<()>>(status: *mut TfbStatus, func: F) {
    let result = func();
    if let Err(e) = &result {
        if std::env::var("TFBIND_ERROR_STDERR").is_ok() {
            eprintln!("{e:?}");
        }
    }
    // status is either null or was handed out by tfb_status_new
    match (unsafe { status.as_mut() }, result) {
        (Some(status), Ok(())) => status.reset(),
        (Some(status), Err(e)) => status.set_error(&e),
        (None, Err(e)) => warn!("No status to report error to: {e:#}"),
        (None, Ok(())) => (),
    }
}

macro_rules! check_not_null {
    ($($ptr:expr),*) => {
        $(
            if $ptr.is_null() {
                fail!(InvalidArgument, concat!("Unexpected null pointer ", stringify!($ptr)));
            }
         )*
    }
}

macro_rules! release {
    ($ptr:expr, $status: expr) => {
        wrap($status, || unsafe {
            check_not_null!($ptr, *$ptr);
            let _ = Box::from_raw(*$ptr);
            *$ptr = std::ptr::null_mut();
            Ok(())
        })
    };
}

unsafe fn slice<'a, T>(ptr: *const T, len: usize) -> &'a [T] {
    if len == 0 { &[] } else { unsafe { std::slice::from_raw_parts(ptr, len) } }
}

unsafe fn names(ptr: *const *const c_char, len: usize) -> anyhow::Result<Vec<String>> {
    unsafe { slice(ptr, len) }
        .iter()
        .enumerate()
        .map(|(ix, name)| {
            if name.is_null() {
                fail!(InvalidArgument, "Unexpected null pointer for name #{}", ix)
            }
            let name = unsafe { CStr::from_ptr(*name) };
            match name.to_str() {
                Ok(s) => Ok(s.to_string()),
                Err(_) => fail!(InvalidArgument, "Name #{} is not valid UTF-8: {:?}", ix, name),
            }
        })
        .collect()
}

/// Returns a pointer to a static buffer containing a null-terminated version string.
///
/// The returned pointer must not be freed.
#[unsafe(no_mangle)]
pub extern "C" fn tfb_version() -> *const c_char {
    concat!(env!("CARGO_PKG_VERSION"), "\0").as_ptr() as *const c_char
}

// Status

/// Creates a status, initially OK.
#[unsafe(no_mangle)]
pub extern "C" fn tfb_status_new() -> *mut TfbStatus {
    Box::into_raw(Box::default())
}

/// Code of the last call the status was passed to. A null status reads as
/// INVALID_ARGUMENT.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn tfb_status_code(status: *const TfbStatus) -> i32 {
    match unsafe { status.as_ref() } {
        Some(status) => status.code as i32,
        None => Code::InvalidArgument as i32,
    }
}

/// The error message, as a null-terminated UTF-8 string. It is empty when the
/// code is OK, and owned by the status: it stays valid until the status is
/// reused or deleted.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn tfb_status_message(status: *const TfbStatus) -> *const c_char {
    match unsafe { status.as_ref() } {
        Some(status) => status.message.as_ptr(),
        None => std::ptr::null(),
    }
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn tfb_status_delete(status: *mut *mut TfbStatus) {
    unsafe {
        if !status.is_null() && !(*status).is_null() {
            let _ = Box::from_raw(*status);
            *status = std::ptr::null_mut();
        }
    }
}

// Lifecycle

/// Initializes the engine. Must precede session creation. Calls nest.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn tfb_init(status: *mut TfbStatus) {
    wrap(status, session::init)
}

/// Balances one `tfb_init`. Live sessions keep working.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn tfb_shutdown(status: *mut TfbStatus) {
    wrap(status, session::shutdown)
}

// Session options

#[derive(Debug, Default, Clone)]
pub struct TfbSessionOptions {
    target: String,
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn tfb_session_options_new(
    options: *mut *mut TfbSessionOptions,
    status: *mut TfbStatus,
) {
    wrap(status, || unsafe {
        check_not_null!(options);
        *options = Box::into_raw(Box::default());
        Ok(())
    })
}

/// Sets the execution target: "" or "local" for an in-process session.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn tfb_session_options_set_target(
    options: *mut TfbSessionOptions,
    target: *const c_char,
    status: *mut TfbStatus,
) {
    wrap(status, || unsafe {
        check_not_null!(options, target);
        let Ok(target) = CStr::from_ptr(target).to_str() else {
            fail!(InvalidArgument, "Target is not valid UTF-8")
        };
        (*options).target = target.to_string();
        Ok(())
    })
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn tfb_session_options_delete(
    options: *mut *mut TfbSessionOptions,
    status: *mut TfbStatus,
) {
    release!(options, status)
}

// Session

pub struct TfbSession(Session);

/// Creates a session with an empty graph. `options` may be null for the
/// default, in-process, target.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn tfb_session_new(
    options: *const TfbSessionOptions,
    session: *mut *mut TfbSession,
    status: *mut TfbStatus,
) {
    wrap(status, || unsafe {
        check_not_null!(session);
        *session = std::ptr::null_mut();
        let target = options.as_ref().map(|o| o.target.as_str()).unwrap_or("");
        *session = Box::into_raw(Box::new(TfbSession(Session::new(target)?)));
        Ok(())
    })
}

/// Appends the nodes of a serialized `GraphDef` to the session graph. On
/// failure, the graph is unchanged.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn tfb_session_extend_graph(
    session: *mut TfbSession,
    graph_def: *const u8,
    len: usize,
    status: *mut TfbStatus,
) {
    wrap(status, || unsafe {
        check_not_null!(session);
        if len > 0 {
            check_not_null!(graph_def);
        }
        (*session).0.extend_graph(slice(graph_def, len))
    })
}

/// Runs the session graph.
///
/// * `input_names` and `inputs` are `ninputs` long: each tensor replaces the
///   output it is named after (`node` or `node:port`). The tensors are
///   borrowed.
/// * `output_names` is `noutputs` long. On success, `outputs` is filled with
///   as many new tensors, owned by the caller. On failure, it is filled with
///   nulls.
/// * the `ntargets` nodes named in `target_names` are run, their outputs
///   discarded.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn tfb_session_run(
    session: *mut TfbSession,
    input_names: *const *const c_char,
    inputs: *const *const TfbTensor,
    ninputs: usize,
    output_names: *const *const c_char,
    outputs: *mut *mut TfbTensor,
    noutputs: usize,
    target_names: *const *const c_char,
    ntargets: usize,
    status: *mut TfbStatus,
) {
    wrap(status, || unsafe {
        check_not_null!(session);
        if ninputs > 0 {
            check_not_null!(input_names, inputs);
        }
        if noutputs > 0 {
            check_not_null!(output_names, outputs);
            for ix in 0..noutputs {
                *outputs.add(ix) = std::ptr::null_mut();
            }
        }
        if ntargets > 0 {
            check_not_null!(target_names);
        }
        let feeds = names(input_names, ninputs)?
            .into_iter()
            .zip(slice(inputs, ninputs))
            .enumerate()
            .map(|(ix, (name, tensor))| match (*tensor).as_ref() {
                Some(tensor) => Ok((name, tensor.0.clone())),
                None => fail!(InvalidArgument, "Unexpected null pointer for input #{}", ix),
            })
            .collect::<anyhow::Result<Vec<_>>>()?;
        let fetches = names(output_names, noutputs)?;
        let targets = names(target_names, ntargets)?;
        let values = (*session).0.run(feeds, &fetches, &targets)?;
        for (ix, value) in values.into_iter().enumerate() {
            *outputs.add(ix) = Box::into_raw(Box::new(TfbTensor(value)));
        }
        Ok(())
    })
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn tfb_session_delete(session: *mut *mut TfbSession, status: *mut TfbStatus) {
    release!(session, status)
}

// Tensor

#[derive(Debug, Clone)]
pub struct TfbTensor(Tensor);

/// Creates a tensor, copying `len` bytes of elements in host byte order.
/// `dtype` is a TensorFlow `DataType` number.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn tfb_tensor_new(
    dtype: i32,
    dims: *const i64,
    ndims: usize,
    data: *const c_void,
    len: usize,
    tensor: *mut *mut TfbTensor,
    status: *mut TfbStatus,
) {
    wrap(status, || unsafe {
        check_not_null!(tensor);
        *tensor = std::ptr::null_mut();
        if ndims > 0 {
            check_not_null!(dims);
        }
        if len > 0 {
            check_not_null!(data);
        }
        let Some(dt) = DataType::from_i32(dtype) else {
            fail!(InvalidArgument, "Unknown DataType {}", dtype)
        };
        let shape = slice(dims, ndims)
            .iter()
            .map(|&d| {
                usize::try_from(d).map_err(|_| {
                    failure!(InvalidArgument, "Negative dimension {} in tensor shape", d)
                })
            })
            .collect::<anyhow::Result<Vec<usize>>>()?;
        let value = Tensor::from_bytes(dt, &shape, slice(data as *const u8, len))?;
        *tensor = Box::into_raw(Box::new(TfbTensor(value)));
        Ok(())
    })
}

/// The tensor `DataType` number, or 0 (`DT_INVALID`) for a null tensor.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn tfb_tensor_type(tensor: *const TfbTensor) -> i32 {
    unsafe { tensor.as_ref() }.map(|t| t.0.datum_type().into()).unwrap_or(0)
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn tfb_tensor_num_dims(tensor: *const TfbTensor) -> usize {
    unsafe { tensor.as_ref() }.map(|t| t.0.shape().len()).unwrap_or(0)
}

/// Size of dimension `ix`, or -1 when there is no such dimension.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn tfb_tensor_dim(tensor: *const TfbTensor, ix: usize) -> i64 {
    unsafe { tensor.as_ref() }
        .and_then(|t| t.0.shape().get(ix).copied())
        .map(|d| d as i64)
        .unwrap_or(-1)
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn tfb_tensor_byte_size(tensor: *const TfbTensor) -> usize {
    unsafe { tensor.as_ref() }.map(|t| t.0.as_bytes().len()).unwrap_or(0)
}

/// Elements in host byte order, `tfb_tensor_byte_size` bytes long. The buffer
/// is owned by the tensor.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn tfb_tensor_data(tensor: *const TfbTensor) -> *const c_void {
    unsafe { tensor.as_ref() }
        .map(|t| t.0.as_bytes().as_ptr() as *const c_void)
        .unwrap_or(std::ptr::null())
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn tfb_tensor_delete(tensor: *mut *mut TfbTensor) {
    unsafe {
        if !tensor.is_null() && !(*tensor).is_null() {
            let _ = Box::from_raw(*tensor);
            *tensor = std::ptr::null_mut();
        }
    }
}

#[cfg(test)]
pub(crate) fn setup_test_logger() {
    let _ = env_logger::Builder::from_env("TFBIND_LOG").try_init();
}
