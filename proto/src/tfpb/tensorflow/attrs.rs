use std::collections::HashMap;

use super::types::DATA_TYPE;
use super::{TensorProto, TensorShapeProto};
use crate::schema::{Emit, FieldDesc, Kind, MessageDesc, Packed, Schema, Slot, Value};

/// Value of a node attribute. Holds at most one of its alternatives.
#[derive(Clone, PartialEq, Debug, Default)]
pub struct AttrValue {
    pub value: Option<attr_value::Value>,
}

pub mod attr_value {
    use super::*;

    #[derive(Clone, PartialEq, Debug, Default)]
    pub struct ListValue {
        pub s: Vec<Vec<u8>>,
        pub i: Vec<i64>,
        pub f: Vec<f32>,
        pub b: Vec<bool>,
        pub r#type: Vec<i32>,
        pub shape: Vec<TensorShapeProto>,
        pub tensor: Vec<TensorProto>,
        pub func: Vec<NameAttrList>,
    }

    #[derive(Clone, PartialEq, Debug)]
    pub enum Value {
        List(ListValue),
        S(Vec<u8>),
        I(i64),
        F(f32),
        B(bool),
        Type(i32),
        Shape(TensorShapeProto),
        Tensor(TensorProto),
        /// Name of the function attribute this one is bound to, inside a function body.
        Placeholder(String),
        Func(NameAttrList),
    }

    static LIST_VALUE: MessageDesc = MessageDesc {
        name: "tensorflow.AttrValue.ListValue",
        fields: &[
            FieldDesc::repeated(2, "s", Kind::Bytes),
            FieldDesc::repeated(3, "i", Kind::Int64),
            FieldDesc::repeated(4, "f", Kind::Float),
            FieldDesc::repeated(5, "b", Kind::Bool),
            FieldDesc::repeated(6, "type", Kind::Enum(&DATA_TYPE)),
            FieldDesc::repeated(7, "shape", Kind::Message),
            FieldDesc::repeated(8, "tensor", Kind::Message),
            FieldDesc::repeated(9, "func", Kind::Message),
        ],
    };

    impl Schema for ListValue {
        fn schema(&self) -> &'static MessageDesc {
            &LIST_VALUE
        }

        fn fields(&self, out: &mut Emit<'_>) {
            out.bytes_list(2, &self.s);
            out.packed(3, Packed::Int64(&self.i));
            out.packed(4, Packed::Float(&self.f));
            out.packed(5, Packed::Bool(&self.b));
            out.packed(6, Packed::Enum(&self.r#type));
            out.messages(7, &self.shape);
            out.messages(8, &self.tensor);
            out.messages(9, &self.func);
        }

        fn slot(&mut self, number: u32) -> Option<Slot<'_>> {
            Some(match number {
                2 => Slot::BytesList(&mut self.s),
                3 => Slot::Int64s(&mut self.i),
                4 => Slot::Floats(&mut self.f),
                5 => Slot::Bools(&mut self.b),
                6 => Slot::Enums(&mut self.r#type),
                7 => Slot::Messages(&mut self.shape),
                8 => Slot::Messages(&mut self.tensor),
                9 => Slot::Messages(&mut self.func),
                _ => return None,
            })
        }
    }
}

static ATTR_VALUE: MessageDesc = MessageDesc {
    name: "tensorflow.AttrValue",
    fields: &[
        FieldDesc::oneof(1, "list", Kind::Message, "value"),
        FieldDesc::oneof(2, "s", Kind::Bytes, "value"),
        FieldDesc::oneof(3, "i", Kind::Int64, "value"),
        FieldDesc::oneof(4, "f", Kind::Float, "value"),
        FieldDesc::oneof(5, "b", Kind::Bool, "value"),
        FieldDesc::oneof(6, "type", Kind::Enum(&DATA_TYPE), "value"),
        FieldDesc::oneof(7, "shape", Kind::Message, "value"),
        FieldDesc::oneof(8, "tensor", Kind::Message, "value"),
        FieldDesc::oneof(9, "placeholder", Kind::String, "value"),
        FieldDesc::oneof(10, "func", Kind::Message, "value"),
    ],
};

impl Schema for AttrValue {
    fn schema(&self) -> &'static MessageDesc {
        &ATTR_VALUE
    }

    fn fields(&self, out: &mut Emit<'_>) {
        use attr_value::Value as V;
        match &self.value {
            Some(V::List(l)) => out.oneof(1, Value::Message(l)),
            Some(V::S(s)) => out.oneof(2, Value::Bytes(s)),
            Some(V::I(i)) => out.oneof(3, Value::Int64(*i)),
            Some(V::F(f)) => out.oneof(4, Value::Float(*f)),
            Some(V::B(b)) => out.oneof(5, Value::Bool(*b)),
            Some(V::Type(t)) => out.oneof(6, Value::Enum(*t)),
            Some(V::Shape(s)) => out.oneof(7, Value::Message(s)),
            Some(V::Tensor(t)) => out.oneof(8, Value::Message(t)),
            Some(V::Placeholder(p)) => out.oneof(9, Value::String(p)),
            Some(V::Func(f)) => out.oneof(10, Value::Message(f)),
            None => (),
        }
    }

    fn slot(&mut self, number: u32) -> Option<Slot<'_>> {
        use attr_value::Value as V;
        let fresh = match number {
            1 => V::List(Default::default()),
            2 => V::S(vec![]),
            3 => V::I(0),
            4 => V::F(0.0),
            5 => V::B(false),
            6 => V::Type(0),
            7 => V::Shape(Default::default()),
            8 => V::Tensor(Default::default()),
            9 => V::Placeholder(String::new()),
            10 => V::Func(Default::default()),
            _ => return None,
        };
        Some(match self.value.insert(fresh) {
            V::List(l) => Slot::Message(l),
            V::S(s) => Slot::Bytes(s),
            V::I(i) => Slot::Int64(i),
            V::F(f) => Slot::Float(f),
            V::B(b) => Slot::Bool(b),
            V::Type(t) => Slot::Enum(t),
            V::Shape(s) => Slot::Message(s),
            V::Tensor(t) => Slot::Message(t),
            V::Placeholder(p) => Slot::String(p),
            V::Func(f) => Slot::Message(f),
        })
    }
}

/// A function name with its attribute bindings.
#[derive(Clone, PartialEq, Debug, Default)]
pub struct NameAttrList {
    pub name: String,
    pub attr: HashMap<String, AttrValue>,
}

static NAME_ATTR_LIST: MessageDesc = MessageDesc {
    name: "tensorflow.NameAttrList",
    fields: &[FieldDesc::optional(1, "name", Kind::String), FieldDesc::map(2, "attr")],
};

impl Schema for NameAttrList {
    fn schema(&self) -> &'static MessageDesc {
        &NAME_ATTR_LIST
    }

    fn fields(&self, out: &mut Emit<'_>) {
        out.scalar(1, Value::String(&self.name));
        out.map(2, &self.attr);
    }

    fn slot(&mut self, number: u32) -> Option<Slot<'_>> {
        Some(match number {
            1 => Slot::String(&mut self.name),
            2 => Slot::Map(&mut self.attr),
            _ => return None,
        })
    }
}
