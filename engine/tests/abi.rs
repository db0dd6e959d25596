use std::ffi::{CStr, CString, c_char};
use std::ptr::{null, null_mut};

use tfbind_engine::*;
use tfbind_proto::tfpb::tensorflow::TensorProto;
use tfbind_proto::tfpb::{graph, node};

struct Fixture {
    status: *mut TfbStatus,
    session: *mut TfbSession,
}

impl Fixture {
    fn new() -> Fixture {
        unsafe {
            let status = tfb_status_new();
            tfb_init(status);
            assert_eq!(tfb_status_code(status), 0);
            let mut options = null_mut();
            tfb_session_options_new(&mut options, status);
            let local = CString::new("local").unwrap();
            tfb_session_options_set_target(options, local.as_ptr(), status);
            let mut session = null_mut();
            tfb_session_new(options, &mut session, status);
            assert_eq!(tfb_status_code(status), 0);
            tfb_session_options_delete(&mut options, status);
            assert!(options.is_null());
            Fixture { status, session }
        }
    }

    fn code(&self) -> Code {
        Code::from_i32(unsafe { tfb_status_code(self.status) })
    }

    fn message(&self) -> String {
        unsafe { CStr::from_ptr(tfb_status_message(self.status)) }.to_string_lossy().into_owned()
    }

    fn extend(&self, bytes: &[u8]) -> Code {
        unsafe { tfb_session_extend_graph(self.session, bytes.as_ptr(), bytes.len(), self.status) };
        self.code()
    }

    fn run(&self, feeds: &[(&str, *mut TfbTensor)], fetches: &[&str], targets: &[&str]) -> Vec<*mut TfbTensor> {
        let cstrings = |names: &[&str]| names.iter().map(|n| CString::new(*n).unwrap()).collect::<Vec<_>>();
        let feed_names = cstrings(&feeds.iter().map(|f| f.0).collect::<Vec<_>>());
        let fetch_names = cstrings(fetches);
        let target_names = cstrings(targets);
        let ptrs = |names: &[CString]| names.iter().map(|n| n.as_ptr()).collect::<Vec<*const c_char>>();
        let values: Vec<*const TfbTensor> = feeds.iter().map(|f| f.1 as *const TfbTensor).collect();
        let mut outputs = vec![null_mut(); fetches.len()];
        unsafe {
            tfb_session_run(
                self.session,
                ptrs(&feed_names).as_ptr(),
                values.as_ptr(),
                values.len(),
                ptrs(&fetch_names).as_ptr(),
                outputs.as_mut_ptr(),
                outputs.len(),
                ptrs(&target_names).as_ptr(),
                target_names.len(),
                self.status,
            )
        };
        outputs
    }
}

impl Drop for Fixture {
    fn drop(&mut self) {
        unsafe {
            tfb_session_delete(&mut self.session, self.status);
            assert!(self.session.is_null());
            tfb_shutdown(self.status);
            tfb_status_delete(&mut self.status);
        }
    }
}

fn scalar_f32(value: f32) -> *mut TfbTensor {
    let mut tensor = null_mut();
    unsafe {
        let status = tfb_status_new();
        tfb_tensor_new(
            DataType::DtFloat as i32,
            null(),
            0,
            &value as *const f32 as _,
            4,
            &mut tensor,
            status,
        );
        assert_eq!(tfb_status_code(status), 0);
        let mut status = status;
        tfb_status_delete(&mut status);
    }
    tensor
}

fn read_f32(tensor: *mut TfbTensor) -> Vec<f32> {
    unsafe {
        assert_eq!(tfb_tensor_type(tensor), DataType::DtFloat as i32);
        let len = tfb_tensor_byte_size(tensor) / 4;
        std::slice::from_raw_parts(tfb_tensor_data(tensor) as *const f32, len).to_vec()
    }
}

fn release(tensors: Vec<*mut TfbTensor>) {
    for mut t in tensors {
        unsafe { tfb_tensor_delete(&mut t) };
    }
}

#[test]
fn placeholder_times_constant() {
    let f = Fixture::new();
    let g = graph()
        .node(node().name("x").op("Placeholder").attr("dtype", DataType::DtFloat))
        .node(
            node()
                .name("k")
                .op("Const")
                .attr("dtype", DataType::DtFloat)
                .attr("value", TensorProto::from_slice(&[3], &[1f32, 2., 3.])),
        )
        .node(node().name("y").op("Mul").input("x").input("k"));
    assert_eq!(f.extend(&g.write_to_bytes()), Code::Ok);
    let x = scalar_f32(2.0);
    let out = f.run(&[("x", x)], &["y", "k"], &[]);
    assert_eq!(f.code(), Code::Ok, "{}", f.message());
    assert_eq!(read_f32(out[0]), [2., 4., 6.]);
    assert_eq!(read_f32(out[1]), [1., 2., 3.]);
    unsafe {
        assert_eq!(tfb_tensor_num_dims(out[0]), 1);
        assert_eq!(tfb_tensor_dim(out[0], 0), 3);
    }
    release(out);

    let out = f.run(&[], &["y"], &[]);
    assert_eq!(f.code(), Code::InvalidArgument);
    assert!(f.message().contains("must feed a value for placeholder tensor 'x'"), "{}", f.message());
    assert!(out[0].is_null());
    release(vec![x]);
}

#[test]
fn errors_are_reported_through_status() {
    let f = Fixture::new();
    assert_eq!(f.extend(&[0x0a, 0x7f]), Code::InvalidArgument);
    let unknown = graph().node(node().name("z").op("Conv9D"));
    assert_eq!(f.extend(&unknown.write_to_bytes()), Code::NotFound);
    assert!(f.message().contains("Conv9D"));
    let out = f.run(&[], &["nope"], &[]);
    assert_eq!(f.code(), Code::NotFound);
    assert!(out[0].is_null());

    let dangling = graph().node(node().name("i").op("Identity").input("ghost"));
    assert_eq!(f.extend(&dangling.write_to_bytes()), Code::InvalidArgument);
    f.run(&[], &[], &[]);
    assert_eq!(f.code(), Code::Ok);
}

#[test]
fn variables_make_runs_stateful() {
    let f = Fixture::new();
    let g = graph()
        .node(node().name("v").op("VariableV2").attr("dtype", DataType::DtFloat))
        .node(
            node()
                .name("one")
                .op("Const")
                .attr("dtype", DataType::DtFloat)
                .attr("value", TensorProto::scalar(1f32)),
        )
        .node(node().name("init").op("Assign").input("v").input("one"))
        .node(node().name("step").op("AssignAdd").input("v").input("one"));
    assert_eq!(f.extend(&g.write_to_bytes()), Code::Ok);
    f.run(&[], &["v"], &[]);
    assert_eq!(f.code(), Code::FailedPrecondition);
    f.run(&[], &[], &["init"]);
    assert_eq!(f.code(), Code::Ok);
    for expected in [2f32, 3., 4.] {
        let out = f.run(&[], &["step"], &[]);
        assert_eq!(read_f32(out[0]), [expected]);
        release(out);
    }
}

#[test]
fn unsupported_target() {
    unsafe {
        let mut status = tfb_status_new();
        tfb_init(status);
        let mut options = null_mut();
        tfb_session_options_new(&mut options, status);
        let remote = CString::new("grpc://localhost:2222").unwrap();
        tfb_session_options_set_target(options, remote.as_ptr(), status);
        let mut session = null_mut();
        tfb_session_new(options, &mut session, status);
        assert_eq!(tfb_status_code(status), Code::Unimplemented as i32);
        assert!(session.is_null());
        tfb_session_options_delete(&mut options, status);
        tfb_shutdown(status);
        tfb_status_delete(&mut status);
    }
}

#[test]
fn oversized_shapes_are_rejected() {
    let f = Fixture::new();
    let huge = graph().node(
        node()
            .name("k")
            .op("Const")
            .attr("dtype", DataType::DtFloat)
            .attr("value", TensorProto::from_slice(&[1 << 40, 1 << 40], &[0f32])),
    );
    assert_eq!(f.extend(&huge.write_to_bytes()), Code::InvalidArgument);
    unsafe {
        let dims = [i64::MAX, 4];
        let mut tensor = null_mut();
        tfb_tensor_new(
            DataType::DtFloat as i32,
            dims.as_ptr(),
            dims.len(),
            null(),
            0,
            &mut tensor,
            f.status,
        );
        assert_eq!(f.code(), Code::InvalidArgument);
        assert!(tensor.is_null());
    }
}
