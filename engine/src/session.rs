use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use anyhow::Context;
use tfbind_proto::Message;
use tfbind_proto::tfpb::tensorflow::GraphDef;

use crate::graph::{Graph, OutletId};
use crate::ops::{EvalContext, OpRegister};
use crate::tensor::Tensor;

lazy_static! {
    static ref REGISTRY: OpRegister = OpRegister::all();
    static ref INIT_COUNT: Mutex<usize> = Mutex::new(0);
}

/// Targets a session can be created for. Both mean "run in process".
pub const LOCAL_TARGETS: &[&str] = &["", "local"];

fn init_count() -> anyhow::Result<std::sync::MutexGuard<'static, usize>> {
    INIT_COUNT.lock().map_err(|_| failure!(Internal, "Engine lifecycle lock is poisoned"))
}

/// Initializes the engine. Calls nest: each one must be balanced by a
/// `shutdown`.
pub fn init() -> anyhow::Result<()> {
    let mut count = init_count()?;
    if *count == 0 {
        info!("Initializing engine, {:?}", *REGISTRY);
    }
    *count += 1;
    Ok(())
}

pub fn shutdown() -> anyhow::Result<()> {
    let mut count = init_count()?;
    if *count == 0 {
        fail!(FailedPrecondition, "Engine shut down more times than it was initialized");
    }
    *count -= 1;
    if *count == 0 {
        info!("Engine shut down");
    }
    Ok(())
}

pub fn is_initialized() -> bool {
    init_count().map(|c| *c > 0).unwrap_or(false)
}

#[derive(Debug, Default)]
pub struct Session {
    graph: Graph,
    variables: HashMap<String, Tensor>,
    runs: usize,
}

impl Session {
    pub fn new(target: &str) -> anyhow::Result<Session> {
        if !is_initialized() {
            fail!(FailedPrecondition, "Engine is not initialized");
        }
        if !LOCAL_TARGETS.contains(&target) {
            fail!(
                Unimplemented,
                "Unsupported target '{}', only in-process sessions are available",
                target
            );
        }
        debug!("New session (target: {:?})", target);
        Ok(Session::default())
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    pub fn extend_graph_def(&mut self, def: &GraphDef) -> anyhow::Result<()> {
        self.graph.extend(&REGISTRY, def)
    }

    /// Extends the session graph with a serialized `GraphDef`.
    pub fn extend_graph(&mut self, bytes: &[u8]) -> anyhow::Result<()> {
        let def = GraphDef::decode(bytes)
            .map_err(|e| failure!(InvalidArgument, "Invalid GraphDef: {}", e))?;
        self.extend_graph_def(&def)
    }

    /// Runs the graph, returning one tensor per fetch, in order. Feeds
    /// override the outputs they name. Targets are evaluated for their side
    /// effects only.
    pub fn run(
        &mut self,
        feeds: Vec<(String, Tensor)>,
        fetches: &[String],
        targets: &[String],
    ) -> anyhow::Result<Vec<Tensor>> {
        self.runs += 1;
        debug!(
            "Run #{}: {} feed(s), fetches: {:?}, targets: {:?}",
            self.runs,
            feeds.len(),
            fetches,
            targets
        );
        let graph = &self.graph;
        let mut fed = HashMap::new();
        for (name, tensor) in feeds {
            let outlet = graph.outlet_by_name(&name)?;
            graph.nodes[outlet.node].op.validate_feed(&graph.nodes[outlet.node].name, &tensor)?;
            fed.insert(outlet, tensor);
        }
        let fetches = fetches
            .iter()
            .map(|name| graph.outlet_by_name(name))
            .collect::<anyhow::Result<Vec<_>>>()?;
        let targets = targets
            .iter()
            .map(|name| match graph.node_by_name(name) {
                Some(node) => Ok(node.id),
                None => fail!(NotFound, "Target node {} not found in the graph", name),
            })
            .collect::<anyhow::Result<Vec<_>>>()?;

        let mut exec =
            Execution { graph, fed, values: HashMap::new(), variables: &mut self.variables };
        let roots: Vec<usize> = targets
            .iter()
            .copied()
            .chain(fetches.iter().filter(|o| !exec.fed.contains_key(o)).map(|o| o.node))
            .collect();
        let order = exec.eval_order(&roots)?;
        trace!("Run #{} evaluates {} node(s)", self.runs, order.len());
        for id in order {
            exec.eval_node(id)?;
        }
        fetches.into_iter().map(|outlet| exec.outlet(outlet)).collect()
    }
}

/// State of a single run. Each node is evaluated at most once.
struct Execution<'a> {
    graph: &'a Graph,
    fed: HashMap<OutletId, Tensor>,
    values: HashMap<usize, Vec<Tensor>>,
    variables: &'a mut HashMap<String, Tensor>,
}

impl Execution<'_> {
    /// Nodes that must run before `id`: its control inputs, then the
    /// producers of its inputs that are neither fed nor passed by reference.
    fn dependencies(&self, id: usize) -> anyhow::Result<Vec<usize>> {
        let graph = self.graph;
        let node = &graph.nodes[id];
        let mut deps = node.controls.to_vec();
        for (ix, input) in node.inputs.iter().enumerate() {
            if ix < node.op.ref_inputs() {
                let var = &graph.nodes[input.node];
                if !var.op.is_variable() {
                    fail!(
                        InvalidArgument,
                        "Input {} of node {} must be a variable, {} ({}) is not",
                        ix,
                        node.name,
                        var.name,
                        var.op_type
                    );
                }
            } else if !self.fed.contains_key(input) {
                deps.push(input.node);
            }
        }
        Ok(deps)
    }

    /// Evaluation order for `roots` and everything they depend on.
    fn eval_order(&self, roots: &[usize]) -> anyhow::Result<Vec<usize>> {
        let mut done = HashSet::new();
        let mut visiting = HashSet::new();
        let mut needed: Vec<usize> = roots.iter().rev().copied().collect();
        let mut order = vec![];
        while let Some(&id) = needed.last() {
            if done.contains(&id) {
                needed.pop();
            } else if visiting.remove(&id) {
                // back on top: every dependency is done
                needed.pop();
                done.insert(id);
                order.push(id);
            } else {
                visiting.insert(id);
                for dep in self.dependencies(id)?.into_iter().rev() {
                    if visiting.contains(&dep) {
                        fail!(
                            InvalidArgument,
                            "Graph contains a cycle through node {}",
                            self.graph.nodes[dep].name
                        );
                    }
                    if !done.contains(&dep) {
                        needed.push(dep);
                    }
                }
            }
        }
        Ok(order)
    }

    fn outlet(&self, outlet: OutletId) -> anyhow::Result<Tensor> {
        if let Some(t) = self.fed.get(&outlet) {
            return Ok(t.clone());
        }
        let node = &self.graph.nodes[outlet.node];
        let Some(values) = self.values.get(&outlet.node) else {
            fail!(Internal, "Node {} used before it was evaluated", node.name);
        };
        values.get(outlet.slot).cloned().ok_or_else(|| {
            failure!(
                InvalidArgument,
                "Node {} ({}) has no output {}",
                node.name,
                node.op_type,
                outlet.slot
            )
        })
    }

    fn eval_node(&mut self, id: usize) -> anyhow::Result<()> {
        let node = &self.graph.nodes[id];
        let mut refs = vec![];
        let mut inputs = vec![];
        for (ix, &input) in node.inputs.iter().enumerate() {
            if ix < node.op.ref_inputs() {
                refs.push(self.graph.nodes[input.node].name.as_str());
            } else {
                inputs.push(self.outlet(input)?);
            }
        }
        trace!("Evaluating {:?}", node);
        let mut ctx = EvalContext { node: &node.name, refs, variables: &mut *self.variables };
        let outputs = node
            .op
            .eval(&mut ctx, inputs)
            .with_context(|| format!("Evaluating node {} ({})", node.name, node.op_type))?;
        self.values.insert(id, outputs);
        Ok(())
    }
}
