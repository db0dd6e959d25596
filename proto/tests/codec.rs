use proptest::prelude::*;
use tfbind_proto::prelude::*;
use tfbind_proto::tfpb::tensorflow::attr_value::Value as V;
use tfbind_proto::tfpb::tensorflow::event::What;
use tfbind_proto::wire::{self, WireType};

mod strategies;
use strategies::*;

proptest! {
    #[test]
    fn event_roundtrip(event in event()) {
        setup_test_logger();
        let bytes = event.encode_to_vec();
        prop_assert_eq!(bytes.len(), event.encoded_len());
        prop_assert_eq!(Event::decode(&bytes)?, event);
    }

    #[test]
    fn graph_roundtrip(graph in graph_def()) {
        let bytes = graph.encode_to_vec();
        prop_assert_eq!(bytes.len(), graph.encoded_len());
        prop_assert_eq!(GraphDef::decode(&bytes)?, graph);
    }

    #[test]
    fn attr_roundtrip(attr in attr()) {
        let bytes = attr.encode_to_vec();
        prop_assert_eq!(bytes.len(), attr.encoded_len());
        prop_assert_eq!(AttrValue::decode(&bytes)?, attr);
    }

    #[test]
    fn last_oneof_variant_wins(a in event(), b in event()) {
        let mut bytes = a.encode_to_vec();
        bytes.extend(b.encode_to_vec());
        let merged = Event::decode(&bytes)?;
        prop_assert_eq!(merged.what, b.what.clone().or(a.what.clone()));
    }

    #[test]
    fn unknown_fields_are_skipped(event in event(), junk in any::<u64>(), blob in proptest::collection::vec(any::<u8>(), 0..16)) {
        let mut bytes = event.encode_to_vec();
        wire::put_key(100, WireType::Varint, &mut bytes);
        wire::put_varint(junk, &mut bytes);
        wire::put_key(101, WireType::LengthDelimited, &mut bytes);
        wire::put_delimited(&blob, &mut bytes);
        wire::put_key(102, WireType::SixtyFourBit, &mut bytes);
        bytes.extend_from_slice(&junk.to_le_bytes());
        wire::put_key(103, WireType::ThirtyTwoBit, &mut bytes);
        bytes.extend_from_slice(&(junk as u32).to_le_bytes());
        prop_assert_eq!(Event::decode(&bytes)?, event);
    }

    #[test]
    fn truncated_single_field_fails(what in strategies::what(), cut in any::<prop::sample::Index>()) {
        let event = Event { what, ..Event::default() };
        let bytes = event.encode_to_vec();
        prop_assume!(bytes.len() > 1);
        let cut = 1 + cut.index(bytes.len() - 1);
        prop_assert!(Event::decode(&bytes[..cut]).is_err());
    }
}

#[test]
fn end_to_end_event() {
    let mut event = Event { wall_time: 1000.5, step: 7, ..Event::default() };
    event.set_file_version("1.0");
    let bytes = event.encode_to_vec();
    assert_eq!(bytes.len(), event.encoded_len());
    let decoded = Event::decode(&bytes).unwrap();
    assert_eq!(decoded.wall_time, 1000.5);
    assert_eq!(decoded.step, 7);
    assert_eq!(decoded.file_version(), "1.0");
    assert!(decoded.graph_def().is_none());
    assert!(decoded.summary().is_none());
}

#[test]
fn only_the_populated_variant_is_emitted() {
    let mut event = Event::default();
    event.set_graph_def(graph().node(node().name("a").op("NoOp")));
    event.set_file_version("2");
    let bytes = event.encode_to_vec();
    // key(3, LengthDelimited), len, "2"
    assert_eq!(bytes, [0x1a, 0x01, b'2']);
}

#[test]
fn unset_oneof_contributes_nothing() {
    assert_eq!(Event::default().encoded_len(), 0);
    assert_eq!(AttrValue::default().encoded_len(), 0);
    assert_eq!(Event::decode(&[]).unwrap(), Event::default());
}

#[test]
fn default_payload_in_a_oneof_is_kept() {
    let attr = AttrValue { value: Some(V::I(0)) };
    let bytes = attr.encode_to_vec();
    assert_eq!(bytes, [0x18, 0x00]);
    assert_eq!(AttrValue::decode(&bytes).unwrap(), attr);
}

#[test]
fn wire_type_mismatch() {
    // file_version sent as a varint
    let err = Event::decode(&[0x18, 0x01]).unwrap_err();
    assert!(matches!(
        err,
        MalformedInput::WireTypeMismatch { field: "file_version", found: WireType::Varint, .. }
    ));
}

#[test]
fn invalid_utf8() {
    let err = Event::decode(&[0x1a, 0x02, 0xc3, 0x28]).unwrap_err();
    assert_eq!(err, MalformedInput::InvalidUtf8 { message: "tensorflow.Event", field: "file_version" });
}

#[test]
fn groups_are_rejected() {
    let mut bytes = vec![];
    wire::put_key(50, WireType::StartGroup, &mut bytes);
    assert_eq!(
        Event::decode(&bytes).unwrap_err(),
        MalformedInput::UnsupportedWireType(WireType::StartGroup)
    );
}

#[test]
fn nested_length_overrun() {
    // graph_def claims 10 bytes, 2 are there
    let err = Event::decode(&[0x22, 0x0a, 0x0a, 0x00]).unwrap_err();
    assert_eq!(err, MalformedInput::LengthOverrun { len: 10, remaining: 2 });
}

#[test]
fn unpacked_repeated_numbers_are_accepted() {
    let mut bytes = vec![];
    for f in [1.5f32, 2.5] {
        wire::put_key(5, WireType::ThirtyTwoBit, &mut bytes);
        bytes.extend_from_slice(&f.to_le_bytes());
    }
    let t = TensorProto::decode(&bytes).unwrap();
    assert_eq!(t.float_val, [1.5, 2.5]);
    // and they are written back packed
    let packed = t.encode_to_vec();
    assert_eq!(packed[0], (5 << 3) | 2);
    assert_eq!(packed.len(), t.encoded_len());
}

#[test]
fn negative_int32_takes_ten_bytes() {
    let t = TensorProto { version_number: -1, ..TensorProto::default() };
    assert_eq!(t.encoded_len(), 11);
    assert_eq!(TensorProto::decode(&t.encode_to_vec()).unwrap(), t);
}

#[test]
fn last_map_entry_wins() {
    let a = node().attr("k", 1i64);
    let b = node().attr("k", DataType::DtFloat);
    let mut bytes = a.encode_to_vec();
    bytes.extend(b.encode_to_vec());
    let merged = NodeDef::decode(&bytes).unwrap();
    assert_eq!(merged.attr.len(), 1);
    assert_eq!(merged.get_attr_datum_type("k").unwrap(), DataType::DtFloat);
}

#[test]
fn map_encoding_is_deterministic() {
    let n = node().attr("b", 2i64).attr("a", 1i64).attr("c", 3i64);
    let m = node().attr("c", 3i64).attr("a", 1i64).attr("b", 2i64);
    assert_eq!(n.encode_to_vec(), m.encode_to_vec());
}

#[test]
fn merge_appends_repeated_fields() {
    let mut g = graph().node(node().name("a"));
    g.merge(&graph().node(node().name("b")).encode_to_vec()).unwrap();
    assert_eq!(g.node.len(), 2);
    assert_eq!(g.node[1].name, "b");
}

#[test]
fn failed_decode_leaves_no_partial_message() {
    let mut bytes = graph().node(node().name("a")).encode_to_vec();
    bytes.push(0x0a);
    assert_eq!(GraphDef::decode(&bytes).unwrap_err(), MalformedInput::Truncated);
}

/// An AttrValue holding `levels` functions, each binding the next one as an attribute.
fn nested_functions(levels: usize) -> Vec<u8> {
    let mut attr = vec![];
    for _ in 0..levels {
        let mut entry = vec![];
        wire::put_key(1, WireType::LengthDelimited, &mut entry);
        wire::put_delimited(b"f", &mut entry);
        wire::put_key(2, WireType::LengthDelimited, &mut entry);
        wire::put_delimited(&attr, &mut entry);
        let mut func = vec![];
        wire::put_key(2, WireType::LengthDelimited, &mut func);
        wire::put_delimited(&entry, &mut func);
        attr.clear();
        wire::put_key(10, WireType::LengthDelimited, &mut attr);
        wire::put_delimited(&func, &mut attr);
    }
    attr
}

#[test]
fn moderate_nesting_is_accepted() {
    let attr = AttrValue::decode(&nested_functions(40)).unwrap();
    let Some(V::Func(f)) = &attr.value else { panic!("{attr:?}") };
    assert!(matches!(f.attr["f"].value, Some(V::Func(_))));
}

#[test]
fn deep_nesting_is_rejected() {
    let bytes = nested_functions(2000);
    assert_eq!(AttrValue::decode(&bytes).unwrap_err(), MalformedInput::RecursionLimit(100));
    // same bytes smuggled in a node attribute
    let mut node = vec![];
    wire::put_key(1, WireType::LengthDelimited, &mut node);
    wire::put_delimited(b"n", &mut node);
    let mut entry = vec![];
    wire::put_key(1, WireType::LengthDelimited, &mut entry);
    wire::put_delimited(b"a", &mut entry);
    wire::put_key(2, WireType::LengthDelimited, &mut entry);
    wire::put_delimited(&bytes, &mut entry);
    wire::put_key(5, WireType::LengthDelimited, &mut node);
    wire::put_delimited(&entry, &mut node);
    let mut graph = vec![];
    wire::put_key(1, WireType::LengthDelimited, &mut graph);
    wire::put_delimited(&node, &mut graph);
    assert_eq!(GraphDef::decode(&graph).unwrap_err(), MalformedInput::RecursionLimit(100));
}

#[test]
fn summary_value_fields_are_written_in_number_order() {
    use tfbind_proto::tfpb::tensorflow::summary::{self, value};
    let v = summary::Value {
        tag: "t".into(),
        node_name: "n".into(),
        value: Some(value::Value::Tensor(TensorProto::default())),
    };
    let bytes = v.encode_to_vec();
    // tag (1), node_name (7), then the tensor variant (8)
    assert_eq!(bytes, [0x0a, 0x01, b't', 0x3a, 0x01, b'n', 0x42, 0x00]);
    assert_eq!(summary::Value::decode(&bytes).unwrap(), v);
}
