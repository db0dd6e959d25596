use std::collections::HashMap;

use super::{AttrValue, OpDef};
use crate::schema::{Emit, FieldDesc, Kind, MessageDesc, Schema, Slot, Value};

/// Functions and gradients a graph can refer to.
#[derive(Clone, PartialEq, Debug, Default)]
pub struct FunctionDefLibrary {
    pub function: Vec<FunctionDef>,
    pub gradient: Vec<GradientDef>,
}

static FUNCTION_DEF_LIBRARY: MessageDesc = MessageDesc {
    name: "tensorflow.FunctionDefLibrary",
    fields: &[
        FieldDesc::repeated(1, "function", Kind::Message),
        FieldDesc::repeated(2, "gradient", Kind::Message),
    ],
};

impl Schema for FunctionDefLibrary {
    fn schema(&self) -> &'static MessageDesc {
        &FUNCTION_DEF_LIBRARY
    }

    fn fields(&self, out: &mut Emit<'_>) {
        out.messages(1, &self.function);
        out.messages(2, &self.gradient);
    }

    fn slot(&mut self, number: u32) -> Option<Slot<'_>> {
        Some(match number {
            1 => Slot::Messages(&mut self.function),
            2 => Slot::Messages(&mut self.gradient),
            _ => return None,
        })
    }
}

/// A function: its signature and the nodes of its body.
#[derive(Clone, PartialEq, Debug, Default)]
pub struct FunctionDef {
    pub signature: Option<OpDef>,
    pub node: Vec<function_def::Node>,
}

pub mod function_def {
    use super::*;

    /// One node of a function body. `ret` names its outputs, `arg` its inputs.
    #[derive(Clone, PartialEq, Debug, Default)]
    pub struct Node {
        pub ret: Vec<String>,
        pub op: String,
        pub arg: Vec<String>,
        pub dep: Vec<String>,
        pub attr: HashMap<String, AttrValue>,
    }

    static NODE: MessageDesc = MessageDesc {
        name: "tensorflow.FunctionDef.Node",
        fields: &[
            FieldDesc::repeated(1, "ret", Kind::String),
            FieldDesc::optional(2, "op", Kind::String),
            FieldDesc::repeated(3, "arg", Kind::String),
            FieldDesc::repeated(4, "dep", Kind::String),
            FieldDesc::map(5, "attr"),
        ],
    };

    impl Schema for Node {
        fn schema(&self) -> &'static MessageDesc {
            &NODE
        }

        fn fields(&self, out: &mut Emit<'_>) {
            out.strings(1, &self.ret);
            out.scalar(2, Value::String(&self.op));
            out.strings(3, &self.arg);
            out.strings(4, &self.dep);
            out.map(5, &self.attr);
        }

        fn slot(&mut self, number: u32) -> Option<Slot<'_>> {
            Some(match number {
                1 => Slot::Strings(&mut self.ret),
                2 => Slot::String(&mut self.op),
                3 => Slot::Strings(&mut self.arg),
                4 => Slot::Strings(&mut self.dep),
                5 => Slot::Map(&mut self.attr),
                _ => return None,
            })
        }
    }
}

static FUNCTION_DEF: MessageDesc = MessageDesc {
    name: "tensorflow.FunctionDef",
    fields: &[
        FieldDesc::optional(1, "signature", Kind::Message),
        FieldDesc::repeated(2, "node", Kind::Message),
    ],
};

impl Schema for FunctionDef {
    fn schema(&self) -> &'static MessageDesc {
        &FUNCTION_DEF
    }

    fn fields(&self, out: &mut Emit<'_>) {
        out.message(1, self.signature.as_ref());
        out.messages(2, &self.node);
    }

    fn slot(&mut self, number: u32) -> Option<Slot<'_>> {
        Some(match number {
            1 => Slot::Message(self.signature.get_or_insert_with(Default::default)),
            2 => Slot::Messages(&mut self.node),
            _ => return None,
        })
    }
}

#[derive(Clone, PartialEq, Debug, Default)]
pub struct GradientDef {
    pub function_name: String,
    pub gradient_func: String,
}

static GRADIENT_DEF: MessageDesc = MessageDesc {
    name: "tensorflow.GradientDef",
    fields: &[
        FieldDesc::optional(1, "function_name", Kind::String),
        FieldDesc::optional(2, "gradient_func", Kind::String),
    ],
};

impl Schema for GradientDef {
    fn schema(&self) -> &'static MessageDesc {
        &GRADIENT_DEF
    }

    fn fields(&self, out: &mut Emit<'_>) {
        out.scalar(1, Value::String(&self.function_name));
        out.scalar(2, Value::String(&self.gradient_func));
    }

    fn slot(&mut self, number: u32) -> Option<Slot<'_>> {
        Some(match number {
            1 => Slot::String(&mut self.function_name),
            2 => Slot::String(&mut self.gradient_func),
            _ => return None,
        })
    }
}
