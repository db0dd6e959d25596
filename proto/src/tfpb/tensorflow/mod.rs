//! Messages of the TensorFlow framework, with their wire schemas.
mod attrs;
mod events;
mod function;
mod graph;
mod node_def;
mod ops;
mod summaries;
mod tensor;
mod tensor_shape;
mod types;

pub use self::attrs::{AttrValue, NameAttrList, attr_value};
pub use self::events::{Event, event};
pub use self::function::{FunctionDef, FunctionDefLibrary, GradientDef, function_def};
pub use self::graph::{GraphDef, VersionDef};
pub use self::node_def::NodeDef;
pub use self::ops::{OpDef, op_def};
pub use self::summaries::{HistogramProto, Summary, summary};
pub use self::tensor::TensorProto;
pub use self::tensor_shape::{TensorShapeProto, tensor_shape_proto};
pub use self::types::{DATA_TYPE, DataType};
