use std::collections::HashMap;
use std::{fs, io, path};

use anyhow::{Context, bail, format_err};

pub mod tensor;
pub mod tensorflow;

use self::tensorflow::attr_value::{ListValue, Value};
use self::tensorflow::{AttrValue, DataType, GraphDef, NodeDef, TensorProto, TensorShapeProto};
use crate::codec::Message;

pub use self::tensor::{Element, element_count};

pub fn graph() -> GraphDef {
    GraphDef { library: None, node: vec![], version: 0, versions: None }
}

pub fn node() -> NodeDef {
    NodeDef {
        name: String::new(),
        op: String::new(),
        input: vec![],
        device: String::new(),
        attr: HashMap::new(),
    }
}

/// Loads a binary graph definition from a reader.
pub fn graphdef_for_reader<R: io::Read>(mut r: R) -> anyhow::Result<GraphDef> {
    let mut buf = vec![];
    r.read_to_end(&mut buf)?;
    Ok(GraphDef::decode(&buf)?)
}

/// Loads a binary graph definition from a path.
pub fn graphdef_for_path<P: AsRef<path::Path>>(p: P) -> anyhow::Result<GraphDef> {
    let p = p.as_ref();
    let file = fs::File::open(p).with_context(|| format!("Opening {p:?}"))?;
    graphdef_for_reader(file).with_context(|| format!("Reading graph from {p:?}"))
}

/// Loads a graph definition from its text form.
pub fn graphdef_for_text(doc: &str) -> anyhow::Result<GraphDef> {
    Ok(crate::text::parse(doc)?)
}

pub fn graphdef_for_text_path<P: AsRef<path::Path>>(p: P) -> anyhow::Result<GraphDef> {
    let p = p.as_ref();
    let doc = fs::read_to_string(p).with_context(|| format!("Opening {p:?}"))?;
    graphdef_for_text(&doc).with_context(|| format!("Reading graph from {p:?}"))
}

impl GraphDef {
    pub fn node(mut self, n: NodeDef) -> Self {
        self.node.push(n);
        self
    }

    pub fn write_to_bytes(&self) -> Vec<u8> {
        self.encode_to_vec()
    }

    pub fn save_to<P: AsRef<path::Path>>(&self, p: P) -> anyhow::Result<()> {
        let p = p.as_ref();
        fs::write(p, self.write_to_bytes()).with_context(|| format!("Writing {p:?}"))?;
        Ok(())
    }

    pub fn to_text(&self) -> String {
        crate::text::to_text(self)
    }

    pub fn get_node(&self, name: &str) -> Option<&NodeDef> {
        self.node.iter().find(|n| n.name == name)
    }
}

impl NodeDef {
    pub fn name<S: ToString>(mut self, n: S) -> NodeDef {
        self.name = n.to_string();
        self
    }
    pub fn op<S: ToString>(mut self, n: S) -> NodeDef {
        self.op = n.to_string();
        self
    }
    pub fn input<S: ToString>(mut self, n: S) -> NodeDef {
        self.input.push(n.to_string());
        self
    }
    pub fn device<S: ToString>(mut self, n: S) -> NodeDef {
        self.device = n.to_string();
        self
    }
    pub fn attr<S: ToString, V: Into<AttrValue>>(mut self, n: S, v: V) -> NodeDef {
        self.attr.insert(n.to_string(), v.into());
        self
    }
}

impl NodeDef {
    fn attr_value(&self, name: &str) -> Option<&Value> {
        self.attr.get(name).and_then(|a| a.value.as_ref())
    }

    fn missing(&self, kind: &str, name: &str) -> anyhow::Error {
        format_err!("Node {} ({}) expected {} attribute '{}'", self.name, self.op, kind, name)
    }

    fn mismatch<T>(&self, kind: &str, name: &str, found: &Value) -> anyhow::Result<T> {
        bail!(
            "Node {} ({}) expected {} attribute '{}', found {:?}",
            self.name,
            self.op,
            kind,
            name,
            found
        )
    }

    pub fn get_attr_raw_str(&self, name: &str) -> anyhow::Result<&[u8]> {
        self.get_attr_opt_raw_str(name)?.ok_or_else(|| self.missing("string", name))
    }

    pub fn get_attr_opt_raw_str(&self, name: &str) -> anyhow::Result<Option<&[u8]>> {
        match self.attr_value(name) {
            None => Ok(None),
            Some(Value::S(bytes)) => Ok(Some(bytes)),
            Some(other) => self.mismatch("string", name, other),
        }
    }

    pub fn get_attr_str(&self, name: &str) -> anyhow::Result<String> {
        self.get_attr_opt_str(name)?.ok_or_else(|| self.missing("UTF-8 string", name))
    }

    pub fn get_attr_opt_str(&self, name: &str) -> anyhow::Result<Option<String>> {
        if let Some(s) = self.get_attr_opt_raw_str(name)? {
            Ok(Some(String::from_utf8(s.to_vec()).with_context(|| {
                format!(
                    "Node {} ({}) expected an UTF-8 string for attribute '{}'",
                    self.name, self.op, name
                )
            })?))
        } else {
            Ok(None)
        }
    }

    pub fn get_attr_bool(&self, name: &str) -> anyhow::Result<bool> {
        self.get_attr_opt_bool(name)?.ok_or_else(|| self.missing("bool", name))
    }

    pub fn get_attr_opt_bool(&self, name: &str) -> anyhow::Result<Option<bool>> {
        match self.attr_value(name) {
            None => Ok(None),
            Some(Value::B(v)) => Ok(Some(*v)),
            Some(other) => self.mismatch("bool", name, other),
        }
    }

    pub fn get_attr_datum_type(&self, name: &str) -> anyhow::Result<DataType> {
        self.get_attr_opt_datum_type(name)?.ok_or_else(|| self.missing("datum_type", name))
    }

    pub fn get_attr_opt_datum_type(&self, name: &str) -> anyhow::Result<Option<DataType>> {
        match self.attr_value(name) {
            None => Ok(None),
            Some(Value::Type(v)) => Ok(Some(
                DataType::from_i32(*v).ok_or_else(|| format_err!("Unknown DataType {}", v))?,
            )),
            Some(other) => self.mismatch("datum_type", name, other),
        }
    }

    pub fn get_attr_shape(&self, name: &str) -> anyhow::Result<&TensorShapeProto> {
        self.get_attr_opt_shape(name)?.ok_or_else(|| self.missing("shape", name))
    }

    pub fn get_attr_opt_shape(&self, name: &str) -> anyhow::Result<Option<&TensorShapeProto>> {
        match self.attr_value(name) {
            None => Ok(None),
            Some(Value::Shape(shape)) => Ok(Some(shape)),
            Some(other) => self.mismatch("shape", name, other),
        }
    }

    pub fn get_attr_tensor(&self, name: &str) -> anyhow::Result<&TensorProto> {
        self.get_attr_opt_tensor(name)?.ok_or_else(|| self.missing("tensor", name))
    }

    pub fn get_attr_opt_tensor(&self, name: &str) -> anyhow::Result<Option<&TensorProto>> {
        match self.attr_value(name) {
            None => Ok(None),
            Some(Value::Tensor(t)) => Ok(Some(t)),
            Some(other) => self.mismatch("tensor", name, other),
        }
    }

    pub fn get_attr_int(&self, name: &str) -> anyhow::Result<i64> {
        self.get_attr_opt_int(name)?.ok_or_else(|| self.missing("int", name))
    }

    pub fn get_attr_opt_int(&self, name: &str) -> anyhow::Result<Option<i64>> {
        match self.attr_value(name) {
            None => Ok(None),
            Some(Value::I(i)) => Ok(Some(*i)),
            Some(other) => self.mismatch("int", name, other),
        }
    }

    pub fn get_attr_float(&self, name: &str) -> anyhow::Result<f32> {
        self.get_attr_opt_float(name)?.ok_or_else(|| self.missing("float", name))
    }

    pub fn get_attr_opt_float(&self, name: &str) -> anyhow::Result<Option<f32>> {
        match self.attr_value(name) {
            None => Ok(None),
            Some(Value::F(f)) => Ok(Some(*f)),
            Some(other) => self.mismatch("float", name, other),
        }
    }

    pub fn get_attr_list_int(&self, name: &str) -> anyhow::Result<Vec<i64>> {
        self.get_attr_opt_list_int(name)?.ok_or_else(|| self.missing("list<int>", name))
    }

    pub fn get_attr_opt_list_int(&self, name: &str) -> anyhow::Result<Option<Vec<i64>>> {
        match self.attr_value(name) {
            None => Ok(None),
            Some(Value::List(list)) => Ok(Some(list.i.clone())),
            Some(other) => self.mismatch("list<int>", name, other),
        }
    }
}

impl From<DataType> for AttrValue {
    fn from(t: DataType) -> AttrValue {
        AttrValue { value: Some(Value::Type(t.into())) }
    }
}

impl<'a> From<&'a str> for AttrValue {
    fn from(t: &'a str) -> AttrValue {
        AttrValue { value: Some(Value::S(t.as_bytes().to_vec())) }
    }
}

impl From<i32> for AttrValue {
    fn from(t: i32) -> AttrValue {
        AttrValue::from(t as i64)
    }
}

impl From<i64> for AttrValue {
    fn from(t: i64) -> AttrValue {
        AttrValue { value: Some(Value::I(t)) }
    }
}

impl From<f32> for AttrValue {
    fn from(t: f32) -> AttrValue {
        AttrValue { value: Some(Value::F(t)) }
    }
}

impl From<bool> for AttrValue {
    fn from(t: bool) -> AttrValue {
        AttrValue { value: Some(Value::B(t)) }
    }
}

impl From<Vec<i64>> for AttrValue {
    fn from(t: Vec<i64>) -> AttrValue {
        AttrValue { value: Some(Value::List(ListValue { i: t, ..ListValue::default() })) }
    }
}

impl From<TensorProto> for AttrValue {
    fn from(t: TensorProto) -> AttrValue {
        AttrValue { value: Some(Value::Tensor(t)) }
    }
}

impl From<TensorShapeProto> for AttrValue {
    fn from(t: TensorShapeProto) -> AttrValue {
        AttrValue { value: Some(Value::Shape(t)) }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn konst() -> NodeDef {
        node()
            .name("k")
            .op("Const")
            .attr("dtype", DataType::DtFloat)
            .attr("value", TensorProto::from_slice(&[2], &[1.0f32, 2.0]))
            .attr("transpose", true)
            .attr("strides", vec![1i64, 2, 2, 1])
            .attr("label", "hello")
    }

    #[test]
    fn attribute_accessors() {
        let n = konst();
        assert_eq!(n.get_attr_datum_type("dtype").unwrap(), DataType::DtFloat);
        assert_eq!(n.get_attr_tensor("value").unwrap().to_vec::<f32>().unwrap(), [1.0, 2.0]);
        assert!(n.get_attr_bool("transpose").unwrap());
        assert_eq!(n.get_attr_list_int("strides").unwrap(), [1, 2, 2, 1]);
        assert_eq!(n.get_attr_str("label").unwrap(), "hello");
        assert_eq!(n.get_attr_opt_int("missing").unwrap(), None);
    }

    #[test]
    fn attribute_errors_name_the_node() {
        let n = konst();
        let missing = n.get_attr_int("axis").unwrap_err().to_string();
        assert!(missing.contains("Node k (Const)"), "{}", missing);
        assert!(n.get_attr_int("dtype").is_err());
    }

    #[test]
    fn save_and_reload() {
        let g = graph().node(konst()).node(node().name("id").op("Identity").input("k"));
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("graph.pb");
        g.save_to(&path).unwrap();
        assert_eq!(graphdef_for_path(&path).unwrap(), g);
        let text = dir.path().join("graph.pbtxt");
        fs::write(&text, g.to_text()).unwrap();
        assert_eq!(graphdef_for_text_path(&text).unwrap(), g);
    }

    #[test]
    fn missing_file() {
        let err = graphdef_for_path("/does/not/exist.pb").unwrap_err();
        assert!(format!("{err:?}").contains("Opening"));
    }
}
