use super::TensorShapeProto;
use super::types::DATA_TYPE;
use crate::schema::{Emit, FieldDesc, Kind, MessageDesc, Packed, Schema, Slot, Value};

/// A tensor value. Elements live either in `tensor_content`, packed in host
/// byte order, or in the typed `*_val` field matching `dtype`.
#[derive(Clone, PartialEq, Debug, Default)]
pub struct TensorProto {
    pub dtype: i32,
    pub tensor_shape: Option<TensorShapeProto>,
    pub version_number: i32,
    pub tensor_content: Vec<u8>,
    pub float_val: Vec<f32>,
    pub double_val: Vec<f64>,
    /// int32, int16, int8 and uint8 values.
    pub int_val: Vec<i32>,
    pub string_val: Vec<Vec<u8>>,
    pub int64_val: Vec<i64>,
    pub bool_val: Vec<bool>,
}

static TENSOR_PROTO: MessageDesc = MessageDesc {
    name: "tensorflow.TensorProto",
    fields: &[
        FieldDesc::optional(1, "dtype", Kind::Enum(&DATA_TYPE)),
        FieldDesc::optional(2, "tensor_shape", Kind::Message),
        FieldDesc::optional(3, "version_number", Kind::Int32),
        FieldDesc::optional(4, "tensor_content", Kind::Bytes),
        FieldDesc::repeated(5, "float_val", Kind::Float),
        FieldDesc::repeated(6, "double_val", Kind::Double),
        FieldDesc::repeated(7, "int_val", Kind::Int32),
        FieldDesc::repeated(8, "string_val", Kind::Bytes),
        FieldDesc::repeated(10, "int64_val", Kind::Int64),
        FieldDesc::repeated(11, "bool_val", Kind::Bool),
    ],
};

impl Schema for TensorProto {
    fn schema(&self) -> &'static MessageDesc {
        &TENSOR_PROTO
    }

    fn fields(&self, out: &mut Emit<'_>) {
        out.scalar(1, Value::Enum(self.dtype));
        out.message(2, self.tensor_shape.as_ref());
        out.scalar(3, Value::Int32(self.version_number));
        out.scalar(4, Value::Bytes(&self.tensor_content));
        out.packed(5, Packed::Float(&self.float_val));
        out.packed(6, Packed::Double(&self.double_val));
        out.packed(7, Packed::Int32(&self.int_val));
        out.bytes_list(8, &self.string_val);
        out.packed(10, Packed::Int64(&self.int64_val));
        out.packed(11, Packed::Bool(&self.bool_val));
    }

    fn slot(&mut self, number: u32) -> Option<Slot<'_>> {
        Some(match number {
            1 => Slot::Enum(&mut self.dtype),
            2 => Slot::Message(self.tensor_shape.get_or_insert_with(Default::default)),
            3 => Slot::Int32(&mut self.version_number),
            4 => Slot::Bytes(&mut self.tensor_content),
            5 => Slot::Floats(&mut self.float_val),
            6 => Slot::Doubles(&mut self.double_val),
            7 => Slot::Int32s(&mut self.int_val),
            8 => Slot::BytesList(&mut self.string_val),
            10 => Slot::Int64s(&mut self.int64_val),
            11 => Slot::Bools(&mut self.bool_val),
            _ => return None,
        })
    }
}
