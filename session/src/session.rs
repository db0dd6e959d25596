use std::collections::HashMap;
use std::ffi::{CString, c_char};
use std::ptr::null_mut;

use tfbind_engine as sys;
use tfbind_proto::Message;
use tfbind_proto::tfpb::tensorflow::GraphDef;

use crate::environment::OptionsHandle;
use crate::{Code, Environment, Error, Result, SessionOptions, Status, Tensor};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    Created,
    GraphLoaded,
    Closed,
}

wrapper!(SessionHandle, TfbSession, tfb_session_delete, with_status);

/// A graph loaded in the engine, ready to run.
///
/// Extending and running take `&mut self`: a session is used by one thread
/// at a time. Independent sessions can run concurrently.
pub struct Session {
    handle: Option<SessionHandle>,
    graph_loaded: bool,
    _env: Environment,
}

// The engine session is only reached through &mut self.
unsafe impl Send for Session {}

impl Session {
    /// Creates an in-process session in the shared environment.
    pub fn create() -> Result<Session> {
        Session::with_options(&Environment::shared()?, &SessionOptions::default())
    }

    pub fn with_options(env: &Environment, options: &SessionOptions) -> Result<Session> {
        let options_handle = OptionsHandle::new(options)?;
        let status = Status::new();
        let mut session = null_mut();
        check!(
            status,
            EngineInit,
            sys::tfb_session_new(options_handle.0, &mut session, status.0)
        )?;
        debug!("Created session (target: {:?})", options.target);
        Ok(Session { handle: Some(SessionHandle(session)), graph_loaded: false, _env: env.clone() })
    }

    pub fn state(&self) -> SessionState {
        match (&self.handle, self.graph_loaded) {
            (None, _) => SessionState::Closed,
            (Some(_), false) => SessionState::Created,
            (Some(_), true) => SessionState::GraphLoaded,
        }
    }

    fn handle(&self) -> Result<*mut sys::TfbSession> {
        self.handle.as_ref().map(|h| h.0).ok_or(Error::UseAfterClose)
    }

    pub fn extend_graph(&mut self, graph: &GraphDef) -> Result<()> {
        self.extend_graph_bytes(&graph.encode_to_vec())
    }

    /// Extends the session graph with a serialized `GraphDef`. Nodes add up
    /// to the ones already loaded.
    pub fn extend_graph_bytes(&mut self, graph: &[u8]) -> Result<()> {
        let session = self.handle()?;
        let status = Status::new();
        check!(
            status,
            Graph,
            sys::tfb_session_extend_graph(session, graph.as_ptr(), graph.len(), status.0)
        )?;
        trace!("Extended graph with {} bytes", graph.len());
        self.graph_loaded = true;
        Ok(())
    }

    /// Extends the session graph with a `GraphDef` in text format.
    pub fn extend_graph_text(&mut self, graph: &str) -> Result<()> {
        self.handle()?;
        let graph: GraphDef = tfbind_proto::text::parse(graph)?;
        self.extend_graph(&graph)
    }

    /// Runs the graph.
    ///
    /// `inputs` replace the tensors they are named after. The returned
    /// tensors match `outputs`, in order. `targets` are nodes run for their
    /// side effects. Running twice is not idempotent when the graph updates
    /// variables.
    pub fn run(
        &mut self,
        inputs: &HashMap<String, Tensor>,
        outputs: &[&str],
        targets: &[&str],
    ) -> Result<Vec<Tensor>> {
        let session = self.handle()?;
        if !self.graph_loaded {
            return Err(Error::NoGraphLoaded);
        }
        let mut input_names = Vec::with_capacity(inputs.len());
        let mut input_values: Vec<*const sys::TfbTensor> = Vec::with_capacity(inputs.len());
        for (name, tensor) in inputs {
            input_names.push(CString::new(name.as_str())?);
            input_values.push(tensor.0);
        }
        let c_names = |names: &[&str]| {
            names.iter().map(|name| CString::new(*name)).collect::<std::result::Result<Vec<_>, _>>()
        };
        let output_names = c_names(outputs)?;
        let target_names = c_names(targets)?;
        let ptrs =
            |names: &[CString]| names.iter().map(|n| n.as_ptr()).collect::<Vec<*const c_char>>();
        let (input_ptrs, output_ptrs, target_ptrs) =
            (ptrs(&input_names), ptrs(&output_names), ptrs(&target_names));

        let mut results: Vec<*mut sys::TfbTensor> = vec![null_mut(); outputs.len()];
        let status = Status::new();
        unsafe {
            sys::tfb_session_run(
                session,
                input_ptrs.as_ptr(),
                input_values.as_ptr(),
                input_values.len(),
                output_ptrs.as_ptr(),
                results.as_mut_ptr(),
                results.len(),
                target_ptrs.as_ptr(),
                target_ptrs.len(),
                status.0,
            )
        };
        let results: Vec<Option<Tensor>> =
            results.into_iter().map(|t| (!t.is_null()).then(|| Tensor(t))).collect();
        status.check().map_err(|(code, message)| Error::Run { code, message })?;
        results.into_iter().collect::<Option<Vec<Tensor>>>().ok_or_else(|| Error::Run {
            code: Code::Internal as i32,
            message: "Engine reported success without producing every output".to_string(),
        })
    }

    /// Releases the engine session. Closing a closed session does nothing.
    pub fn close(&mut self) {
        if self.handle.take().is_some() {
            debug!("Closed session");
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.close()
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Session({:?})", self.state())
    }
}
