use super::AttrValue;
use super::types::DATA_TYPE;
use crate::schema::{Emit, FieldDesc, Kind, MessageDesc, Schema, Slot, Value};

/// Interface of an operation: its inputs, outputs and attributes.
#[derive(Clone, PartialEq, Debug, Default)]
pub struct OpDef {
    pub name: String,
    pub input_arg: Vec<op_def::ArgDef>,
    pub output_arg: Vec<op_def::ArgDef>,
    pub attr: Vec<op_def::AttrDef>,
    pub summary: String,
    pub description: String,
}

pub mod op_def {
    use super::*;

    #[derive(Clone, PartialEq, Debug, Default)]
    pub struct ArgDef {
        pub name: String,
        pub description: String,
        pub r#type: i32,
        pub type_attr: String,
        pub number_attr: String,
        pub type_list_attr: String,
        pub is_ref: bool,
    }

    static ARG_DEF: MessageDesc = MessageDesc {
        name: "tensorflow.OpDef.ArgDef",
        fields: &[
            FieldDesc::optional(1, "name", Kind::String),
            FieldDesc::optional(2, "description", Kind::String),
            FieldDesc::optional(3, "type", Kind::Enum(&DATA_TYPE)),
            FieldDesc::optional(4, "type_attr", Kind::String),
            FieldDesc::optional(5, "number_attr", Kind::String),
            FieldDesc::optional(6, "type_list_attr", Kind::String),
            FieldDesc::optional(16, "is_ref", Kind::Bool),
        ],
    };

    impl Schema for ArgDef {
        fn schema(&self) -> &'static MessageDesc {
            &ARG_DEF
        }

        fn fields(&self, out: &mut Emit<'_>) {
            out.scalar(1, Value::String(&self.name));
            out.scalar(2, Value::String(&self.description));
            out.scalar(3, Value::Enum(self.r#type));
            out.scalar(4, Value::String(&self.type_attr));
            out.scalar(5, Value::String(&self.number_attr));
            out.scalar(6, Value::String(&self.type_list_attr));
            out.scalar(16, Value::Bool(self.is_ref));
        }

        fn slot(&mut self, number: u32) -> Option<Slot<'_>> {
            Some(match number {
                1 => Slot::String(&mut self.name),
                2 => Slot::String(&mut self.description),
                3 => Slot::Enum(&mut self.r#type),
                4 => Slot::String(&mut self.type_attr),
                5 => Slot::String(&mut self.number_attr),
                6 => Slot::String(&mut self.type_list_attr),
                16 => Slot::Bool(&mut self.is_ref),
                _ => return None,
            })
        }
    }

    #[derive(Clone, PartialEq, Debug, Default)]
    pub struct AttrDef {
        pub name: String,
        /// "string", "int", "list(type)", ...
        pub r#type: String,
        pub default_value: Option<AttrValue>,
        pub description: String,
        pub has_minimum: bool,
        pub minimum: i64,
        pub allowed_values: Option<AttrValue>,
    }

    static ATTR_DEF: MessageDesc = MessageDesc {
        name: "tensorflow.OpDef.AttrDef",
        fields: &[
            FieldDesc::optional(1, "name", Kind::String),
            FieldDesc::optional(2, "type", Kind::String),
            FieldDesc::optional(3, "default_value", Kind::Message),
            FieldDesc::optional(4, "description", Kind::String),
            FieldDesc::optional(5, "has_minimum", Kind::Bool),
            FieldDesc::optional(6, "minimum", Kind::Int64),
            FieldDesc::optional(7, "allowed_values", Kind::Message),
        ],
    };

    impl Schema for AttrDef {
        fn schema(&self) -> &'static MessageDesc {
            &ATTR_DEF
        }

        fn fields(&self, out: &mut Emit<'_>) {
            out.scalar(1, Value::String(&self.name));
            out.scalar(2, Value::String(&self.r#type));
            out.message(3, self.default_value.as_ref());
            out.scalar(4, Value::String(&self.description));
            out.scalar(5, Value::Bool(self.has_minimum));
            out.scalar(6, Value::Int64(self.minimum));
            out.message(7, self.allowed_values.as_ref());
        }

        fn slot(&mut self, number: u32) -> Option<Slot<'_>> {
            Some(match number {
                1 => Slot::String(&mut self.name),
                2 => Slot::String(&mut self.r#type),
                3 => Slot::Message(self.default_value.get_or_insert_with(Default::default)),
                4 => Slot::String(&mut self.description),
                5 => Slot::Bool(&mut self.has_minimum),
                6 => Slot::Int64(&mut self.minimum),
                7 => Slot::Message(self.allowed_values.get_or_insert_with(Default::default)),
                _ => return None,
            })
        }
    }
}

static OP_DEF: MessageDesc = MessageDesc {
    name: "tensorflow.OpDef",
    fields: &[
        FieldDesc::optional(1, "name", Kind::String),
        FieldDesc::repeated(2, "input_arg", Kind::Message),
        FieldDesc::repeated(3, "output_arg", Kind::Message),
        FieldDesc::repeated(4, "attr", Kind::Message),
        FieldDesc::optional(5, "summary", Kind::String),
        FieldDesc::optional(6, "description", Kind::String),
    ],
};

impl Schema for OpDef {
    fn schema(&self) -> &'static MessageDesc {
        &OP_DEF
    }

    fn fields(&self, out: &mut Emit<'_>) {
        out.scalar(1, Value::String(&self.name));
        out.messages(2, &self.input_arg);
        out.messages(3, &self.output_arg);
        out.messages(4, &self.attr);
        out.scalar(5, Value::String(&self.summary));
        out.scalar(6, Value::String(&self.description));
    }

    fn slot(&mut self, number: u32) -> Option<Slot<'_>> {
        Some(match number {
            1 => Slot::String(&mut self.name),
            2 => Slot::Messages(&mut self.input_arg),
            3 => Slot::Messages(&mut self.output_arg),
            4 => Slot::Messages(&mut self.attr),
            5 => Slot::String(&mut self.summary),
            6 => Slot::String(&mut self.description),
            _ => return None,
        })
    }
}
