use std::collections::HashMap;
use std::fmt;

use smallvec::SmallVec;
use tfbind_proto::tfpb::tensorflow::GraphDef;

use crate::ops::{Op, OpRegister};

pub type TVec<T> = SmallVec<[T; 4]>;

/// One output of one node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, new)]
pub struct OutletId {
    pub node: usize,
    pub slot: usize,
}

pub struct Node {
    pub id: usize,
    pub name: String,
    pub op_type: String,
    pub inputs: TVec<OutletId>,
    /// Nodes that must run before this one, without feeding it.
    pub controls: TVec<usize>,
    pub op: Box<dyn Op>,
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{} \"{}\" {:?}", self.id, self.name, self.op)
    }
}

/// Splits `name:port` into its node name and output slot. A missing or
/// non numeric port designates the first output.
pub fn split_tensor_name(name: &str) -> (&str, usize) {
    if let Some((node, port)) = name.rsplit_once(':') {
        if let Ok(port) = port.parse() {
            return (node, port);
        }
    }
    (name, 0)
}

/// The graph a session executes. It only grows: extensions append nodes,
/// never replace them.
#[derive(Debug, Default)]
pub struct Graph {
    pub nodes: Vec<Node>,
    by_name: HashMap<String, usize>,
}

impl Graph {
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node_by_name(&self, name: &str) -> Option<&Node> {
        self.by_name.get(name).map(|&id| &self.nodes[id])
    }

    /// Resolves a `name:port` tensor name.
    pub fn outlet_by_name(&self, name: &str) -> anyhow::Result<OutletId> {
        let (node, slot) = split_tensor_name(name);
        let Some(&id) = self.by_name.get(node) else {
            fail!(NotFound, "Tensor {} not found: no node named {} in the graph", name, node)
        };
        Ok(OutletId::new(id, slot))
    }

    /// Appends the nodes of `def`. Either every node is added or, on error,
    /// the graph is left untouched.
    pub fn extend(&mut self, registry: &OpRegister, def: &GraphDef) -> anyhow::Result<()> {
        let base = self.nodes.len();
        let mut names: HashMap<&str, usize> = HashMap::new();
        for (ix, node) in def.node.iter().enumerate() {
            if node.name.is_empty() {
                fail!(InvalidArgument, "Node #{} ({}) has no name", ix, node.op);
            }
            if self.by_name.contains_key(&node.name) || names.contains_key(node.name.as_str()) {
                fail!(InvalidArgument, "Duplicate node name in graph: '{}'", node.name);
            }
            names.insert(&node.name, base + ix);
        }
        let resolve = |name: &str| self.by_name.get(name).or_else(|| names.get(name)).copied();

        let mut nodes = Vec::with_capacity(def.node.len());
        for (ix, pbnode) in def.node.iter().enumerate() {
            let op = registry.build(pbnode)?;
            let mut inputs = TVec::new();
            let mut controls = TVec::new();
            for input in &pbnode.input {
                if let Some(control) = input.strip_prefix('^') {
                    let Some(id) = resolve(control) else {
                        fail!(
                            InvalidArgument,
                            "Node '{}': Unknown input node '{}'",
                            pbnode.name,
                            input
                        )
                    };
                    controls.push(id);
                } else {
                    let (name, slot) = split_tensor_name(input);
                    let Some(id) = resolve(name) else {
                        fail!(
                            InvalidArgument,
                            "Node '{}': Unknown input node '{}'",
                            pbnode.name,
                            input
                        )
                    };
                    inputs.push(OutletId::new(id, slot));
                }
            }
            if inputs.len() < op.ref_inputs() {
                fail!(
                    InvalidArgument,
                    "Node '{}' ({}) needs {} reference input(s)",
                    pbnode.name,
                    pbnode.op,
                    op.ref_inputs()
                );
            }
            trace!("Adding node {} ({}) inputs: {:?}", pbnode.name, pbnode.op, inputs);
            nodes.push(Node {
                id: base + ix,
                name: pbnode.name.clone(),
                op_type: pbnode.op.clone(),
                inputs,
                controls,
                op,
            });
        }
        if let Some(library) = def.library.as_ref().filter(|l| !l.function.is_empty()) {
            debug!("Ignoring {} library function(s)", library.function.len());
        }
        for node in nodes {
            self.by_name.insert(node.name.clone(), node.id);
            self.nodes.push(node);
        }
        debug!("Graph extended to {} nodes", self.nodes.len());
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::Code;
    use tfbind_proto::tfpb::tensorflow::{DataType, TensorProto};
    use tfbind_proto::tfpb::{graph, node};

    fn konst(name: &str) -> tfbind_proto::tfpb::tensorflow::NodeDef {
        node()
            .name(name)
            .op("Const")
            .attr("dtype", DataType::DtFloat)
            .attr("value", TensorProto::scalar(1f32))
    }

    #[test]
    fn tensor_names() {
        assert_eq!(split_tensor_name("a"), ("a", 0));
        assert_eq!(split_tensor_name("a:2"), ("a", 2));
        assert_eq!(split_tensor_name("scope/a:b"), ("scope/a:b", 0));
    }

    #[test]
    fn inputs_are_resolved_across_extensions() {
        let reg = OpRegister::all();
        let mut g = Graph::default();
        g.extend(&reg, &graph().node(konst("a"))).unwrap();
        let def = graph()
            .node(node().name("b").op("Add").input("a:0").input("c").input("^a"))
            .node(konst("c"));
        g.extend(&reg, &def).unwrap();
        let b = g.node_by_name("b").unwrap();
        assert_eq!(&*b.inputs, &[OutletId::new(0, 0), OutletId::new(2, 0)]);
        assert_eq!(&*b.controls, &[0]);
    }

    #[test]
    fn failed_extension_is_atomic() {
        let reg = OpRegister::all();
        let mut g = Graph::default();
        let def = graph().node(konst("a")).node(node().name("b").op("Identity").input("nope"));
        let e = g.extend(&reg, &def).unwrap_err();
        assert_eq!(Code::of(&e), Code::InvalidArgument);
        assert!(g.is_empty());
        assert!(g.node_by_name("a").is_none());
    }

    #[test]
    fn duplicates_and_unknown_ops() {
        let reg = OpRegister::all();
        let mut g = Graph::default();
        g.extend(&reg, &graph().node(konst("a"))).unwrap();
        let e = g.extend(&reg, &graph().node(konst("a"))).unwrap_err();
        assert_eq!(Code::of(&e), Code::InvalidArgument);
        let e = g.extend(&reg, &graph().node(node().name("z").op("Frobnicate"))).unwrap_err();
        assert_eq!(Code::of(&e), Code::NotFound);
        assert_eq!(g.nodes.len(), 1);
    }

    #[test]
    fn unknown_tensor() {
        let g = Graph::default();
        assert_eq!(Code::of(&g.outlet_by_name("x:0").unwrap_err()), Code::NotFound);
    }
}
