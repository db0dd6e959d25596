use proptest::prelude::*;
use tfbind_proto::prelude::*;
use tfbind_proto::text;
use tfbind_proto::tfpb::graphdef_for_text;

mod strategies;
use strategies::*;

proptest! {
    #[test]
    fn graph_text_roundtrip(graph in graph_def()) {
        let doc = text::to_text(&graph);
        prop_assert_eq!(text::parse::<GraphDef>(&doc)?, graph);
    }

    #[test]
    fn event_text_roundtrip(event in event()) {
        let doc = text::to_text(&event);
        prop_assert_eq!(text::parse::<Event>(&doc)?, event);
    }
}

const GRAPH: &str = r#"
# two nodes
node {
  name: "a"
  op: "Const"
  attr {
    key: "dtype"
    value { type: DT_FLOAT }
  }
  attr {
    key: "value"
    value {
      tensor {
        dtype: DT_FLOAT
        tensor_shape { dim { size: 2 } }
        float_val: [1.0, -2.5]
      }
    }
  }
}
node { name: 'b' op: "Identity" input: "a" input: "^a" }
versions: { producer: 21 }
"#;

#[test]
fn parse_handwritten_graph() {
    setup_test_logger();
    let g = graphdef_for_text(GRAPH).unwrap();
    assert_eq!(g.node.len(), 2);
    let a = &g.node[0];
    assert_eq!(a.get_attr_datum_type("dtype").unwrap(), DataType::DtFloat);
    assert_eq!(a.get_attr_tensor("value").unwrap().to_vec::<f32>().unwrap(), [1.0, -2.5]);
    assert_eq!(g.node[1].input, ["a", "^a"]);
    assert_eq!(g.versions.as_ref().map(|v| v.producer), Some(21));
}

#[test]
fn unknown_field_names_the_line() {
    let err = text::parse::<GraphDef>("node {\n  name: \"a\"\n  colour: 3\n}\n").unwrap_err();
    match err {
        MalformedInput::Text { line, reason } => {
            assert_eq!(line, 3);
            assert!(reason.contains("colour"), "{}", reason);
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn bad_enum_value() {
    let err = text::parse::<AttrValue>("type: DT_NOPE").unwrap_err();
    assert!(matches!(err, MalformedInput::Text { line: 1, .. }));
}

#[test]
fn syntax_error() {
    assert!(text::parse::<GraphDef>("node { name: \"a\" ").is_err());
    assert!(text::parse::<GraphDef>("node { name: \"a }").is_err());
}

#[test]
fn oneof_in_text_keeps_the_last_variant() {
    let attr: AttrValue = text::parse("i: 3\nf: 1.5").unwrap();
    assert_eq!(attr, AttrValue::from(1.5f32));
}

#[test]
fn deep_nesting_is_rejected() {
    let levels = 5000;
    let doc = "func { attr { key: \"f\" value { ".repeat(levels) + &"} } } ".repeat(levels);
    assert_eq!(text::parse::<AttrValue>(&doc).unwrap_err(), MalformedInput::RecursionLimit(100));
    let lists = format!("i: {}1{}", "[".repeat(100_000), "]".repeat(100_000));
    assert_eq!(text::parse::<AttrValue>(&lists).unwrap_err(), MalformedInput::RecursionLimit(100));
    let shallow = "func { attr { key: \"f\" value { ".repeat(20) + &"} } } ".repeat(20);
    assert!(text::parse::<AttrValue>(&shallow).is_ok());
}
