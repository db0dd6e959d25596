#![allow(dead_code)]
use proptest::collection::{hash_map, vec};
use proptest::option;
use proptest::prelude::*;

use tfbind_proto::tfpb::tensorflow::attr_value::{ListValue, Value as V};
use tfbind_proto::tfpb::tensorflow::event::What;
use tfbind_proto::tfpb::tensorflow::op_def::{ArgDef, AttrDef};
use tfbind_proto::tfpb::tensorflow::summary::{Image, value};
use tfbind_proto::tfpb::tensorflow::tensor_shape_proto::Dim;
use tfbind_proto::tfpb::tensorflow::*;

pub fn setup_test_logger() {
    let _ = env_logger::Builder::from_env("TFBIND_LOG").try_init();
}

fn name() -> impl Strategy<Value = String> {
    "[a-z_/]{0,6}"
}

fn text() -> impl Strategy<Value = String> {
    "\\PC{0,8}"
}

fn blob() -> impl Strategy<Value = Vec<u8>> {
    vec(any::<u8>(), 0..8)
}

fn dtype() -> impl Strategy<Value = i32> {
    0i32..24
}

pub fn shape() -> impl Strategy<Value = TensorShapeProto> {
    (vec((-1i64..1024, name()), 0..4), any::<bool>()).prop_map(|(dims, unknown_rank)| {
        TensorShapeProto {
            dim: dims.into_iter().map(|(size, name)| Dim { size, name }).collect(),
            unknown_rank,
        }
    })
}

pub fn tensor() -> impl Strategy<Value = TensorProto> {
    (
        dtype(),
        option::of(shape()),
        any::<i32>(),
        blob(),
        vec(-1e6f32..1e6, 0..4),
        vec(-1e12f64..1e12, 0..4),
        vec(any::<i32>(), 0..4),
        vec(blob(), 0..3),
        vec(any::<i64>(), 0..4),
        vec(any::<bool>(), 0..4),
    )
        .prop_map(
            |(
                dtype,
                tensor_shape,
                version_number,
                tensor_content,
                float_val,
                double_val,
                int_val,
                string_val,
                int64_val,
                bool_val,
            )| TensorProto {
                dtype,
                tensor_shape,
                version_number,
                tensor_content,
                float_val,
                double_val,
                int_val,
                string_val,
                int64_val,
                bool_val,
            },
        )
}

/// Every alternative of `AttrValue` except the nested ones, plus the unset case.
pub fn leaf_attr() -> impl Strategy<Value = AttrValue> {
    prop_oneof![
        Just(None),
        blob().prop_map(|s| Some(V::S(s))),
        any::<i64>().prop_map(|i| Some(V::I(i))),
        (-1e6f32..1e6).prop_map(|f| Some(V::F(f))),
        any::<bool>().prop_map(|b| Some(V::B(b))),
        dtype().prop_map(|t| Some(V::Type(t))),
        shape().prop_map(|s| Some(V::Shape(s))),
        tensor().prop_map(|t| Some(V::Tensor(t))),
        name().prop_map(|p| Some(V::Placeholder(p))),
    ]
    .prop_map(|value| AttrValue { value })
}

pub fn name_attr_list() -> impl Strategy<Value = NameAttrList> {
    (name(), hash_map("[a-z]{1,4}", leaf_attr(), 0..3))
        .prop_map(|(name, attr)| NameAttrList { name, attr })
}

pub fn list_value() -> impl Strategy<Value = ListValue> {
    (
        vec(blob(), 0..3),
        vec(any::<i64>(), 0..3),
        vec(-1e6f32..1e6, 0..3),
        vec(any::<bool>(), 0..3),
        vec(dtype(), 0..3),
        vec(shape(), 0..2),
        vec(tensor(), 0..2),
        vec(name_attr_list(), 0..2),
    )
        .prop_map(|(s, i, f, b, types, shape, tensor, func)| ListValue {
            s,
            i,
            f,
            b,
            r#type: types,
            shape,
            tensor,
            func,
        })
}

pub fn attr() -> impl Strategy<Value = AttrValue> {
    prop_oneof![
        leaf_attr(),
        list_value().prop_map(|l| AttrValue { value: Some(V::List(l)) }),
        name_attr_list().prop_map(|f| AttrValue { value: Some(V::Func(f)) }),
    ]
}

pub fn node_def() -> impl Strategy<Value = NodeDef> {
    (name(), name(), vec(name(), 0..3), name(), hash_map("[a-z]{1,4}", attr(), 0..3)).prop_map(
        |(name, op, input, device, attr)| NodeDef { name, op, input, device, attr },
    )
}

fn arg_def() -> impl Strategy<Value = ArgDef> {
    (name(), text(), dtype(), name(), name(), name(), any::<bool>()).prop_map(
        |(name, description, ty, type_attr, number_attr, type_list_attr, is_ref)| ArgDef {
            name,
            description,
            r#type: ty,
            type_attr,
            number_attr,
            type_list_attr,
            is_ref,
        },
    )
}

fn attr_def() -> impl Strategy<Value = AttrDef> {
    (
        name(),
        name(),
        option::of(leaf_attr()),
        text(),
        any::<bool>(),
        any::<i64>(),
        option::of(leaf_attr()),
    )
        .prop_map(
            |(name, ty, default_value, description, has_minimum, minimum, allowed_values)| {
                AttrDef {
                    name,
                    r#type: ty,
                    default_value,
                    description,
                    has_minimum,
                    minimum,
                    allowed_values,
                }
            },
        )
}

fn op_def() -> impl Strategy<Value = OpDef> {
    (name(), vec(arg_def(), 0..2), vec(arg_def(), 0..2), vec(attr_def(), 0..2), text(), text())
        .prop_map(|(name, input_arg, output_arg, attr, summary, description)| OpDef {
            name,
            input_arg,
            output_arg,
            attr,
            summary,
            description,
        })
}

fn function_node() -> impl Strategy<Value = function_def::Node> {
    (
        vec(name(), 0..2),
        name(),
        vec(name(), 0..3),
        vec(name(), 0..2),
        hash_map("[a-z]{1,4}", leaf_attr(), 0..2),
    )
        .prop_map(|(ret, op, arg, dep, attr)| function_def::Node { ret, op, arg, dep, attr })
}

fn library() -> impl Strategy<Value = FunctionDefLibrary> {
    (
        vec(
            (option::of(op_def()), vec(function_node(), 0..3))
                .prop_map(|(signature, node)| FunctionDef { signature, node }),
            0..2,
        ),
        vec(
            (name(), name()).prop_map(|(function_name, gradient_func)| GradientDef {
                function_name,
                gradient_func,
            }),
            0..2,
        ),
    )
        .prop_map(|(function, gradient)| FunctionDefLibrary { function, gradient })
}

pub fn graph_def() -> impl Strategy<Value = GraphDef> {
    (
        vec(node_def(), 0..4),
        option::of(library()),
        any::<i32>(),
        option::of((any::<i32>(), any::<i32>(), vec(any::<i32>(), 0..3)).prop_map(
            |(producer, min_consumer, bad_consumers)| VersionDef {
                producer,
                min_consumer,
                bad_consumers,
            },
        )),
    )
        .prop_map(|(node, library, version, versions)| GraphDef { node, library, version, versions })
}

fn histogram() -> impl Strategy<Value = HistogramProto> {
    (
        -1e9f64..1e9,
        -1e9f64..1e9,
        0f64..1e6,
        -1e9f64..1e9,
        0f64..1e12,
        vec(-1e9f64..1e9, 0..4),
        vec(0f64..1e6, 0..4),
    )
        .prop_map(|(min, max, num, sum, sum_squares, bucket_limit, bucket)| HistogramProto {
            min,
            max,
            num,
            sum,
            sum_squares,
            bucket_limit,
            bucket,
        })
}

fn summary_value() -> impl Strategy<Value = summary::Value> {
    let image = (any::<i32>(), any::<i32>(), 0i32..5, blob()).prop_map(
        |(height, width, colorspace, encoded_image_string)| Image {
            height,
            width,
            colorspace,
            encoded_image_string,
        },
    );
    (
        name(),
        name(),
        prop_oneof![
            Just(None),
            (-1e6f32..1e6).prop_map(|v| Some(value::Value::SimpleValue(v))),
            blob().prop_map(|b| Some(value::Value::ObsoleteOldStyleHistogram(b))),
            image.prop_map(|i| Some(value::Value::Image(i))),
            histogram().prop_map(|h| Some(value::Value::Histo(h))),
            tensor().prop_map(|t| Some(value::Value::Tensor(t))),
        ],
    )
        .prop_map(|(tag, node_name, value)| summary::Value { node_name, tag, value })
}

pub fn summary() -> impl Strategy<Value = Summary> {
    vec(summary_value(), 0..3).prop_map(|value| Summary { value })
}

/// Every alternative of `Event::what`, plus the unset case.
pub fn what() -> impl Strategy<Value = Option<What>> {
    prop_oneof![
        Just(None),
        text().prop_map(|v| Some(What::FileVersion(v))),
        graph_def().prop_map(|g| Some(What::GraphDef(g))),
        summary().prop_map(|s| Some(What::Summary(s))),
    ]
}

pub fn event() -> impl Strategy<Value = Event> {
    (-1e10f64..1e10, any::<i64>(), what())
        .prop_map(|(wall_time, step, what)| Event { wall_time, step, what })
}
