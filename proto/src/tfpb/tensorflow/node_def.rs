use std::collections::HashMap;

use super::AttrValue;
use crate::schema::{Emit, FieldDesc, Kind, MessageDesc, Schema, Slot, Value};

#[derive(Clone, PartialEq, Debug, Default)]
pub struct NodeDef {
    pub name: String,
    pub op: String,
    /// `node`, `node:port` or `^node` for a control dependency.
    pub input: Vec<String>,
    pub device: String,
    pub attr: HashMap<String, AttrValue>,
}

static NODE_DEF: MessageDesc = MessageDesc {
    name: "tensorflow.NodeDef",
    fields: &[
        FieldDesc::optional(1, "name", Kind::String),
        FieldDesc::optional(2, "op", Kind::String),
        FieldDesc::repeated(3, "input", Kind::String),
        FieldDesc::optional(4, "device", Kind::String),
        FieldDesc::map(5, "attr"),
    ],
};

impl Schema for NodeDef {
    fn schema(&self) -> &'static MessageDesc {
        &NODE_DEF
    }

    fn fields(&self, out: &mut Emit<'_>) {
        out.scalar(1, Value::String(&self.name));
        out.scalar(2, Value::String(&self.op));
        out.strings(3, &self.input);
        out.scalar(4, Value::String(&self.device));
        out.map(5, &self.attr);
    }

    fn slot(&mut self, number: u32) -> Option<Slot<'_>> {
        Some(match number {
            1 => Slot::String(&mut self.name),
            2 => Slot::String(&mut self.op),
            3 => Slot::Strings(&mut self.input),
            4 => Slot::String(&mut self.device),
            5 => Slot::Map(&mut self.attr),
            _ => return None,
        })
    }
}
