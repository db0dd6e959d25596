use crate::schema::{Emit, FieldDesc, Kind, MessageDesc, Schema, Slot, Value};

/// Dimensions of a tensor.
#[derive(Clone, PartialEq, Debug, Default)]
pub struct TensorShapeProto {
    pub dim: Vec<tensor_shape_proto::Dim>,
    /// When set, `dim` is meaningless.
    pub unknown_rank: bool,
}

pub mod tensor_shape_proto {
    use super::*;

    /// One dimension. `size == -1` stands for an unknown size.
    #[derive(Clone, PartialEq, Debug, Default)]
    pub struct Dim {
        pub size: i64,
        pub name: String,
    }

    static DIM: MessageDesc = MessageDesc {
        name: "tensorflow.TensorShapeProto.Dim",
        fields: &[
            FieldDesc::optional(1, "size", Kind::Int64),
            FieldDesc::optional(2, "name", Kind::String),
        ],
    };

    impl Schema for Dim {
        fn schema(&self) -> &'static MessageDesc {
            &DIM
        }

        fn fields(&self, out: &mut Emit<'_>) {
            out.scalar(1, Value::Int64(self.size));
            out.scalar(2, Value::String(&self.name));
        }

        fn slot(&mut self, number: u32) -> Option<Slot<'_>> {
            Some(match number {
                1 => Slot::Int64(&mut self.size),
                2 => Slot::String(&mut self.name),
                _ => return None,
            })
        }
    }
}

static TENSOR_SHAPE_PROTO: MessageDesc = MessageDesc {
    name: "tensorflow.TensorShapeProto",
    fields: &[
        FieldDesc::repeated(2, "dim", Kind::Message),
        FieldDesc::optional(3, "unknown_rank", Kind::Bool),
    ],
};

impl Schema for TensorShapeProto {
    fn schema(&self) -> &'static MessageDesc {
        &TENSOR_SHAPE_PROTO
    }

    fn fields(&self, out: &mut Emit<'_>) {
        out.messages(2, &self.dim);
        out.scalar(3, Value::Bool(self.unknown_rank));
    }

    fn slot(&mut self, number: u32) -> Option<Slot<'_>> {
        Some(match number {
            2 => Slot::Messages(&mut self.dim),
            3 => Slot::Bool(&mut self.unknown_rank),
            _ => return None,
        })
    }
}

impl TensorShapeProto {
    pub fn from_dims(dims: &[usize]) -> TensorShapeProto {
        TensorShapeProto {
            dim: dims
                .iter()
                .map(|d| tensor_shape_proto::Dim { size: *d as i64, name: String::new() })
                .collect(),
            unknown_rank: false,
        }
    }

    /// Known dimensions, or `None` if the rank or any size is unknown.
    pub fn dims(&self) -> Option<Vec<usize>> {
        if self.unknown_rank {
            return None;
        }
        self.dim.iter().map(|d| usize::try_from(d.size).ok()).collect()
    }
}
