use super::{FunctionDefLibrary, NodeDef};
use crate::schema::{Emit, FieldDesc, Kind, MessageDesc, Packed, Schema, Slot, Value};

#[derive(Clone, PartialEq, Debug, Default)]
pub struct VersionDef {
    pub producer: i32,
    pub min_consumer: i32,
    pub bad_consumers: Vec<i32>,
}

static VERSION_DEF: MessageDesc = MessageDesc {
    name: "tensorflow.VersionDef",
    fields: &[
        FieldDesc::optional(1, "producer", Kind::Int32),
        FieldDesc::optional(2, "min_consumer", Kind::Int32),
        FieldDesc::repeated(3, "bad_consumers", Kind::Int32),
    ],
};

impl Schema for VersionDef {
    fn schema(&self) -> &'static MessageDesc {
        &VERSION_DEF
    }

    fn fields(&self, out: &mut Emit<'_>) {
        out.scalar(1, Value::Int32(self.producer));
        out.scalar(2, Value::Int32(self.min_consumer));
        out.packed(3, Packed::Int32(&self.bad_consumers));
    }

    fn slot(&mut self, number: u32) -> Option<Slot<'_>> {
        Some(match number {
            1 => Slot::Int32(&mut self.producer),
            2 => Slot::Int32(&mut self.min_consumer),
            3 => Slot::Int32s(&mut self.bad_consumers),
            _ => return None,
        })
    }
}

/// A dataflow graph: its nodes, and the functions they may call.
#[derive(Clone, PartialEq, Debug, Default)]
pub struct GraphDef {
    pub node: Vec<NodeDef>,
    pub library: Option<FunctionDefLibrary>,
    /// Deprecated in favor of `versions`.
    pub version: i32,
    pub versions: Option<VersionDef>,
}

static GRAPH_DEF: MessageDesc = MessageDesc {
    name: "tensorflow.GraphDef",
    fields: &[
        FieldDesc::repeated(1, "node", Kind::Message),
        FieldDesc::optional(2, "library", Kind::Message),
        FieldDesc::optional(3, "version", Kind::Int32),
        FieldDesc::optional(4, "versions", Kind::Message),
    ],
};

impl Schema for GraphDef {
    fn schema(&self) -> &'static MessageDesc {
        &GRAPH_DEF
    }

    fn fields(&self, out: &mut Emit<'_>) {
        out.messages(1, &self.node);
        out.message(2, self.library.as_ref());
        out.scalar(3, Value::Int32(self.version));
        out.message(4, self.versions.as_ref());
    }

    fn slot(&mut self, number: u32) -> Option<Slot<'_>> {
        Some(match number {
            1 => Slot::Messages(&mut self.node),
            2 => Slot::Message(self.library.get_or_insert_with(Default::default)),
            3 => Slot::Int32(&mut self.version),
            4 => Slot::Message(self.versions.get_or_insert_with(Default::default)),
            _ => return None,
        })
    }
}
