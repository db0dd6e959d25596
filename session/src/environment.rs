use std::ffi::CString;
use std::ptr::null_mut;
use std::sync::{Arc, Mutex, Weak};

use tfbind_engine as sys;

use crate::{Error, Result, Status};

struct Initialized;

impl Drop for Initialized {
    fn drop(&mut self) {
        let status = Status::new();
        unsafe { sys::tfb_shutdown(status.0) };
        if let Err((code, message)) = status.check() {
            warn!("Engine shutdown failed ({}): {}", code, message);
        }
    }
}

lazy_static! {
    static ref SHARED: Mutex<Weak<Initialized>> = Mutex::new(Weak::new());
}

/// Keeps the engine initialized. The engine is shut down when the last
/// clone is dropped. Sessions hold one.
#[derive(Clone)]
pub struct Environment(Arc<Initialized>);

impl Environment {
    /// Initializes the engine, independently of any other environment.
    pub fn new() -> Result<Environment> {
        let status = Status::new();
        check!(status, EngineInit, sys::tfb_init(status.0))?;
        debug!("Engine initialized");
        Ok(Environment(Arc::new(Initialized)))
    }

    /// The process wide environment, initialized on first use and kept alive
    /// as long as a session or a handle refers to it.
    pub fn shared() -> Result<Environment> {
        let mut shared = SHARED.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(env) = shared.upgrade() {
            return Ok(Environment(env));
        }
        let env = Environment::new()?;
        *shared = Arc::downgrade(&env.0);
        Ok(env)
    }
}

impl std::fmt::Debug for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Environment({} handle(s))", Arc::strong_count(&self.0))
    }
}

/// How sessions are created.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SessionOptions {
    /// Where the graph runs. "" and "local" run it in process.
    pub target: String,
}

impl SessionOptions {
    pub fn with_target(mut self, target: impl Into<String>) -> SessionOptions {
        self.target = target.into();
        self
    }
}

wrapper!(pub(crate) OptionsHandle, TfbSessionOptions, tfb_session_options_delete, with_status);

impl OptionsHandle {
    pub(crate) fn new(options: &SessionOptions) -> Result<OptionsHandle> {
        let status = Status::new();
        let mut handle = null_mut();
        check!(status, EngineInit, sys::tfb_session_options_new(&mut handle, status.0))?;
        let handle = OptionsHandle(handle);
        let target = CString::new(options.target.as_str())
            .map_err(|_| Error::InvalidArgument(format!("Invalid target {:?}", options.target)))?;
        check!(
            status,
            EngineInit,
            sys::tfb_session_options_set_target(handle.0, target.as_ptr(), status.0)
        )?;
        Ok(handle)
    }
}
