use super::TensorProto;
use crate::schema::{self, Emit, FieldDesc, Kind, MessageDesc, Packed, Schema, Slot};

/// Serialized histogram of a set of values.
#[derive(Clone, PartialEq, Debug, Default)]
pub struct HistogramProto {
    pub min: f64,
    pub max: f64,
    pub num: f64,
    pub sum: f64,
    pub sum_squares: f64,
    pub bucket_limit: Vec<f64>,
    pub bucket: Vec<f64>,
}

static HISTOGRAM_PROTO: MessageDesc = MessageDesc {
    name: "tensorflow.HistogramProto",
    fields: &[
        FieldDesc::optional(1, "min", Kind::Double),
        FieldDesc::optional(2, "max", Kind::Double),
        FieldDesc::optional(3, "num", Kind::Double),
        FieldDesc::optional(4, "sum", Kind::Double),
        FieldDesc::optional(5, "sum_squares", Kind::Double),
        FieldDesc::repeated(6, "bucket_limit", Kind::Double),
        FieldDesc::repeated(7, "bucket", Kind::Double),
    ],
};

impl Schema for HistogramProto {
    fn schema(&self) -> &'static MessageDesc {
        &HISTOGRAM_PROTO
    }

    fn fields(&self, out: &mut Emit<'_>) {
        out.scalar(1, schema::Value::Double(self.min));
        out.scalar(2, schema::Value::Double(self.max));
        out.scalar(3, schema::Value::Double(self.num));
        out.scalar(4, schema::Value::Double(self.sum));
        out.scalar(5, schema::Value::Double(self.sum_squares));
        out.packed(6, Packed::Double(&self.bucket_limit));
        out.packed(7, Packed::Double(&self.bucket));
    }

    fn slot(&mut self, number: u32) -> Option<Slot<'_>> {
        Some(match number {
            1 => Slot::Double(&mut self.min),
            2 => Slot::Double(&mut self.max),
            3 => Slot::Double(&mut self.num),
            4 => Slot::Double(&mut self.sum),
            5 => Slot::Double(&mut self.sum_squares),
            6 => Slot::Doubles(&mut self.bucket_limit),
            7 => Slot::Doubles(&mut self.bucket),
            _ => return None,
        })
    }
}

/// A set of tagged values recorded at one step.
#[derive(Clone, PartialEq, Debug, Default)]
pub struct Summary {
    pub value: Vec<summary::Value>,
}

static SUMMARY: MessageDesc = MessageDesc {
    name: "tensorflow.Summary",
    fields: &[FieldDesc::repeated(1, "value", Kind::Message)],
};

impl Schema for Summary {
    fn schema(&self) -> &'static MessageDesc {
        &SUMMARY
    }

    fn fields(&self, out: &mut Emit<'_>) {
        out.messages(1, &self.value);
    }

    fn slot(&mut self, number: u32) -> Option<Slot<'_>> {
        match number {
            1 => Some(Slot::Messages(&mut self.value)),
            _ => None,
        }
    }
}

pub mod summary {
    use super::*;

    /// An encoded image.
    #[derive(Clone, PartialEq, Debug, Default)]
    pub struct Image {
        pub height: i32,
        pub width: i32,
        /// 1 grayscale, 2 grayscale + alpha, 3 RGB, 4 RGBA.
        pub colorspace: i32,
        pub encoded_image_string: Vec<u8>,
    }

    static IMAGE: MessageDesc = MessageDesc {
        name: "tensorflow.Summary.Image",
        fields: &[
            FieldDesc::optional(1, "height", Kind::Int32),
            FieldDesc::optional(2, "width", Kind::Int32),
            FieldDesc::optional(3, "colorspace", Kind::Int32),
            FieldDesc::optional(4, "encoded_image_string", Kind::Bytes),
        ],
    };

    impl Schema for Image {
        fn schema(&self) -> &'static MessageDesc {
            &IMAGE
        }

        fn fields(&self, out: &mut Emit<'_>) {
            out.scalar(1, schema::Value::Int32(self.height));
            out.scalar(2, schema::Value::Int32(self.width));
            out.scalar(3, schema::Value::Int32(self.colorspace));
            out.scalar(4, schema::Value::Bytes(&self.encoded_image_string));
        }

        fn slot(&mut self, number: u32) -> Option<Slot<'_>> {
            Some(match number {
                1 => Slot::Int32(&mut self.height),
                2 => Slot::Int32(&mut self.width),
                3 => Slot::Int32(&mut self.colorspace),
                4 => Slot::Bytes(&mut self.encoded_image_string),
                _ => return None,
            })
        }
    }

    #[derive(Clone, PartialEq, Debug, Default)]
    pub struct Value {
        pub node_name: String,
        pub tag: String,
        pub value: Option<value::Value>,
    }

    pub mod value {
        use super::{HistogramProto, Image, TensorProto};

        #[derive(Clone, PartialEq, Debug)]
        pub enum Value {
            SimpleValue(f32),
            ObsoleteOldStyleHistogram(Vec<u8>),
            Image(Image),
            Histo(HistogramProto),
            Tensor(TensorProto),
        }
    }

    static VALUE: MessageDesc = MessageDesc {
        name: "tensorflow.Summary.Value",
        fields: &[
            FieldDesc::optional(1, "tag", Kind::String),
            FieldDesc::oneof(2, "simple_value", Kind::Float, "value"),
            FieldDesc::oneof(3, "obsolete_old_style_histogram", Kind::Bytes, "value"),
            FieldDesc::oneof(4, "image", Kind::Message, "value"),
            FieldDesc::oneof(5, "histo", Kind::Message, "value"),
            FieldDesc::optional(7, "node_name", Kind::String),
            FieldDesc::oneof(8, "tensor", Kind::Message, "value"),
        ],
    };

    impl Schema for Value {
        fn schema(&self) -> &'static MessageDesc {
            &VALUE
        }

        fn fields(&self, out: &mut Emit<'_>) {
            use value::Value as V;
            out.scalar(1, schema::Value::String(&self.tag));
            match &self.value {
                Some(V::SimpleValue(v)) => out.oneof(2, schema::Value::Float(*v)),
                Some(V::ObsoleteOldStyleHistogram(b)) => out.oneof(3, schema::Value::Bytes(b)),
                Some(V::Image(i)) => out.oneof(4, schema::Value::Message(i)),
                Some(V::Histo(h)) => out.oneof(5, schema::Value::Message(h)),
                _ => (),
            }
            out.scalar(7, schema::Value::String(&self.node_name));
            if let Some(V::Tensor(t)) = &self.value {
                out.oneof(8, schema::Value::Message(t));
            }
        }

        fn slot(&mut self, number: u32) -> Option<Slot<'_>> {
            use value::Value as V;
            let fresh = match number {
                1 => return Some(Slot::String(&mut self.tag)),
                7 => return Some(Slot::String(&mut self.node_name)),
                2 => V::SimpleValue(0.0),
                3 => V::ObsoleteOldStyleHistogram(vec![]),
                4 => V::Image(Default::default()),
                5 => V::Histo(Default::default()),
                8 => V::Tensor(Default::default()),
                _ => return None,
            };
            Some(match self.value.insert(fresh) {
                V::SimpleValue(v) => Slot::Float(v),
                V::ObsoleteOldStyleHistogram(b) => Slot::Bytes(b),
                V::Image(i) => Slot::Message(i),
                V::Histo(h) => Slot::Message(h),
                V::Tensor(t) => Slot::Message(t),
            })
        }
    }
}
