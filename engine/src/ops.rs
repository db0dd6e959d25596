use std::collections::HashMap;
use std::fmt;

use ndarray::{ArrayD, IxDyn, Zip};
use tfbind_proto::tfpb::tensorflow::{DataType, NodeDef, TensorShapeProto};

use crate::tensor::{Datum, Tensor};

pub type OpBuilder = fn(&NodeDef) -> anyhow::Result<Box<dyn Op>>;

/// Maps op type names, as found in `NodeDef::op`, to their builders.
#[derive(Default)]
pub struct OpRegister(HashMap<String, OpBuilder>);

impl OpRegister {
    pub fn all() -> OpRegister {
        let mut reg = OpRegister::default();
        register_all_ops(&mut reg);
        reg
    }

    pub fn insert(&mut self, name: &str, builder: OpBuilder) {
        self.0.insert(name.to_string(), builder);
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(|s| s.as_str())
    }

    pub fn build(&self, node: &NodeDef) -> anyhow::Result<Box<dyn Op>> {
        let Some(builder) = self.0.get(&node.op) else {
            fail!(NotFound, "Op type not registered '{}' in node {}", node.op, node.name)
        };
        builder(node).map_err(|e| {
            if crate::Code::of(&e) == crate::Code::Unknown {
                failure!(InvalidArgument, "Node {} ({}): {:#}", node.name, node.op, e)
            } else {
                e
            }
        })
    }
}

impl fmt::Debug for OpRegister {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&str> = self.names().collect();
        names.sort();
        write!(f, "OpRegister({})", names.join(", "))
    }
}

pub fn register_all_ops(reg: &mut OpRegister) {
    reg.insert("Const", konst);
    reg.insert("Placeholder", placeholder);
    reg.insert("Identity", |_| Ok(Box::new(Identity)));
    reg.insert("NoOp", |_| Ok(Box::new(NoOp)));
    reg.insert("Add", |_| Ok(Box::new(Binary::new(BinOp::Add))));
    reg.insert("AddV2", |_| Ok(Box::new(Binary::new(BinOp::Add))));
    reg.insert("Sub", |_| Ok(Box::new(Binary::new(BinOp::Sub))));
    reg.insert("Mul", |_| Ok(Box::new(Binary::new(BinOp::Mul))));
    reg.insert("Neg", |_| Ok(Box::new(Neg)));
    reg.insert("Variable", variable);
    reg.insert("VariableV2", variable);
    reg.insert("Assign", |_| Ok(Box::new(Assign)));
    reg.insert("AssignAdd", |_| Ok(Box::new(AssignAdd)));
}

/// What an op sees of the session while it runs.
pub struct EvalContext<'a> {
    pub node: &'a str,
    /// Names of the variables bound to the op's reference inputs.
    pub refs: Vec<&'a str>,
    pub variables: &'a mut HashMap<String, Tensor>,
}

pub trait Op: fmt::Debug + Send + Sync {
    fn name(&self) -> &'static str;

    /// Number of leading inputs that designate a variable instead of
    /// carrying a value.
    fn ref_inputs(&self) -> usize {
        0
    }

    fn is_variable(&self) -> bool {
        false
    }

    /// Checks a tensor fed in place of this node's output.
    fn validate_feed(&self, _ctx: &str, _tensor: &Tensor) -> anyhow::Result<()> {
        Ok(())
    }

    fn eval(&self, ctx: &mut EvalContext, inputs: Vec<Tensor>) -> anyhow::Result<Vec<Tensor>>;
}

fn single(op: &dyn Op, ctx: &EvalContext, inputs: Vec<Tensor>) -> anyhow::Result<Tensor> {
    let count = inputs.len();
    match <[Tensor; 1]>::try_from(inputs) {
        Ok([t]) => Ok(t),
        Err(_) => {
            fail!(InvalidArgument, "{} ({}) expects 1 input, got {}", ctx.node, op.name(), count)
        }
    }
}

fn pair(op: &dyn Op, ctx: &EvalContext, inputs: Vec<Tensor>) -> anyhow::Result<(Tensor, Tensor)> {
    let count = inputs.len();
    match <[Tensor; 2]>::try_from(inputs) {
        Ok([a, b]) => Ok((a, b)),
        Err(_) => {
            fail!(InvalidArgument, "{} ({}) expects 2 inputs, got {}", ctx.node, op.name(), count)
        }
    }
}

fn konst(node: &NodeDef) -> anyhow::Result<Box<dyn Op>> {
    let dtype = node.get_attr_datum_type("dtype")?;
    let value = Tensor::from_proto(node.get_attr_tensor("value")?)?;
    if value.datum_type() != dtype {
        fail!(
            InvalidArgument,
            "Const node {} holds a {:?} tensor, expected {:?}",
            node.name,
            value.datum_type(),
            dtype
        );
    }
    Ok(Box::new(Const::new(value)))
}

#[derive(Debug, Clone, new)]
pub struct Const {
    value: Tensor,
}

impl Op for Const {
    fn name(&self) -> &'static str {
        "Const"
    }

    fn eval(&self, _ctx: &mut EvalContext, _inputs: Vec<Tensor>) -> anyhow::Result<Vec<Tensor>> {
        Ok(vec![self.value.clone()])
    }
}

fn placeholder(node: &NodeDef) -> anyhow::Result<Box<dyn Op>> {
    let dtype = node.get_attr_opt_datum_type("dtype")?;
    let shape = node.get_attr_opt_shape("shape")?.cloned();
    Ok(Box::new(Placeholder::new(dtype, shape)))
}

#[derive(Debug, Clone, new)]
pub struct Placeholder {
    dtype: Option<DataType>,
    shape: Option<TensorShapeProto>,
}

impl Op for Placeholder {
    fn name(&self) -> &'static str {
        "Placeholder"
    }

    fn validate_feed(&self, node: &str, tensor: &Tensor) -> anyhow::Result<()> {
        if let Some(dtype) = self.dtype {
            if dtype != tensor.datum_type() {
                fail!(
                    InvalidArgument,
                    "Placeholder {} expects {:?}, was fed {:?}",
                    node,
                    dtype,
                    tensor.datum_type()
                );
            }
        }
        if let Some(shape) = &self.shape {
            let compatible = shape.unknown_rank
                || (shape.dim.len() == tensor.shape().len()
                    && shape
                        .dim
                        .iter()
                        .zip(tensor.shape())
                        .all(|(d, s)| d.size < 0 || d.size as usize == *s));
            if !compatible {
                fail!(
                    InvalidArgument,
                    "Placeholder {} was fed a tensor of shape {:?}, incompatible with {:?}",
                    node,
                    tensor.shape(),
                    shape.dim.iter().map(|d| d.size).collect::<Vec<_>>()
                );
            }
        }
        Ok(())
    }

    fn eval(&self, ctx: &mut EvalContext, _inputs: Vec<Tensor>) -> anyhow::Result<Vec<Tensor>> {
        fail!(
            InvalidArgument,
            "You must feed a value for placeholder tensor '{}' with dtype {:?}",
            ctx.node,
            self.dtype.unwrap_or_default()
        )
    }
}

#[derive(Debug, Clone)]
pub struct Identity;

impl Op for Identity {
    fn name(&self) -> &'static str {
        "Identity"
    }

    fn eval(&self, ctx: &mut EvalContext, inputs: Vec<Tensor>) -> anyhow::Result<Vec<Tensor>> {
        Ok(vec![single(self, ctx, inputs)?])
    }
}

#[derive(Debug, Clone)]
pub struct NoOp;

impl Op for NoOp {
    fn name(&self) -> &'static str {
        "NoOp"
    }

    fn eval(&self, _ctx: &mut EvalContext, _inputs: Vec<Tensor>) -> anyhow::Result<Vec<Tensor>> {
        Ok(vec![])
    }
}

/// Element arithmetic. Integers wrap on overflow.
pub trait Arith: Datum {
    fn add(a: Self, b: Self) -> Self;
    fn sub(a: Self, b: Self) -> Self;
    fn mul(a: Self, b: Self) -> Self;
    fn neg(a: Self) -> Self;
}

macro_rules! arith_float {
    ($t: ty) => {
        impl Arith for $t {
            fn add(a: $t, b: $t) -> $t {
                a + b
            }
            fn sub(a: $t, b: $t) -> $t {
                a - b
            }
            fn mul(a: $t, b: $t) -> $t {
                a * b
            }
            fn neg(a: $t) -> $t {
                -a
            }
        }
    };
}

macro_rules! arith_int {
    ($t: ty) => {
        impl Arith for $t {
            fn add(a: $t, b: $t) -> $t {
                a.wrapping_add(b)
            }
            fn sub(a: $t, b: $t) -> $t {
                a.wrapping_sub(b)
            }
            fn mul(a: $t, b: $t) -> $t {
                a.wrapping_mul(b)
            }
            fn neg(a: $t) -> $t {
                a.wrapping_neg()
            }
        }
    };
}

arith_float!(f32);
arith_float!(f64);
arith_int!(i32);
arith_int!(i64);
arith_int!(u8);

macro_rules! dispatch_arith {
    ($f: ident ($dt: expr, $what: expr) ($($args: expr),*)) => {
        match $dt {
            DataType::DtFloat => $f::<f32>($($args),*),
            DataType::DtDouble => $f::<f64>($($args),*),
            DataType::DtInt32 => $f::<i32>($($args),*),
            DataType::DtInt64 => $f::<i64>($($args),*),
            DataType::DtUint8 => $f::<u8>($($args),*),
            dt => fail!(InvalidArgument, "{} does not support {:?}", $what, dt),
        }
    };
}

/// Shape two operands broadcast to, numpy style.
pub fn broadcast_shape(a: &[usize], b: &[usize]) -> anyhow::Result<Vec<usize>> {
    let rank = a.len().max(b.len());
    let dim = |shape: &[usize], ix: usize| {
        (ix + shape.len()).checked_sub(rank).map(|ix| shape[ix]).unwrap_or(1)
    };
    (0..rank)
        .map(|ix| match (dim(a, ix), dim(b, ix)) {
            (x, y) if x == y => Ok(x),
            (1, y) => Ok(y),
            (x, 1) => Ok(x),
            _ => fail!(InvalidArgument, "Incompatible shapes: {:?} vs. {:?}", a, b),
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
}

impl BinOp {
    fn fun<T: Arith>(self) -> fn(T, T) -> T {
        match self {
            BinOp::Add => T::add,
            BinOp::Sub => T::sub,
            BinOp::Mul => T::mul,
        }
    }

    pub fn eval(self, a: &Tensor, b: &Tensor) -> anyhow::Result<Tensor> {
        fn eval_t<T: Arith>(op: BinOp, a: &Tensor, b: &Tensor) -> anyhow::Result<Tensor> {
            let a = a.to_array_view::<T>()?;
            let b = b.to_array_view::<T>()?;
            let shape = broadcast_shape(a.shape(), b.shape())?;
            let (Some(av), Some(bv)) = (a.broadcast(IxDyn(&shape)), b.broadcast(IxDyn(&shape)))
            else {
                fail!(InvalidArgument, "Incompatible shapes: {:?} vs. {:?}", a.shape(), b.shape())
            };
            let f = op.fun::<T>();
            let mut out = ArrayD::<T>::default(IxDyn(&shape));
            Zip::from(&mut out).and(&av).and(&bv).for_each(|o, a, b| *o = f(*a, *b));
            Ok(Tensor::from_array(out))
        }
        if a.datum_type() != b.datum_type() {
            fail!(
                InvalidArgument,
                "{:?} operands must have the same type, got {:?} and {:?}",
                self,
                a.datum_type(),
                b.datum_type()
            );
        }
        dispatch_arith!(eval_t(a.datum_type(), format!("{self:?}"))(self, a, b))
    }
}

#[derive(Debug, Clone, new)]
pub struct Binary {
    op: BinOp,
}

impl Op for Binary {
    fn name(&self) -> &'static str {
        match self.op {
            BinOp::Add => "Add",
            BinOp::Sub => "Sub",
            BinOp::Mul => "Mul",
        }
    }

    fn eval(&self, ctx: &mut EvalContext, inputs: Vec<Tensor>) -> anyhow::Result<Vec<Tensor>> {
        let (a, b) = pair(self, ctx, inputs)?;
        Ok(vec![self.op.eval(&a, &b)?])
    }
}

#[derive(Debug, Clone)]
pub struct Neg;

impl Op for Neg {
    fn name(&self) -> &'static str {
        "Neg"
    }

    fn eval(&self, ctx: &mut EvalContext, inputs: Vec<Tensor>) -> anyhow::Result<Vec<Tensor>> {
        fn neg<T: Arith>(t: &Tensor) -> anyhow::Result<Tensor> {
            Ok(Tensor::from_array(t.to_array_view::<T>()?.mapv(T::neg)))
        }
        let t = single(self, ctx, inputs)?;
        Ok(vec![dispatch_arith!(neg(t.datum_type(), "Neg")(&t))?])
    }
}

fn variable(node: &NodeDef) -> anyhow::Result<Box<dyn Op>> {
    let dtype = node.get_attr_datum_type("dtype")?;
    let shape = node.get_attr_opt_shape("shape")?.and_then(|s| s.dims());
    Ok(Box::new(Variable::new(dtype, shape)))
}

/// A mutable tensor, living in the session across runs. It must be
/// assigned before it is read.
#[derive(Debug, Clone, new)]
pub struct Variable {
    dtype: DataType,
    shape: Option<Vec<usize>>,
}

impl Op for Variable {
    fn name(&self) -> &'static str {
        "VariableV2"
    }

    fn is_variable(&self) -> bool {
        true
    }

    fn eval(&self, ctx: &mut EvalContext, _inputs: Vec<Tensor>) -> anyhow::Result<Vec<Tensor>> {
        let Some(value) = ctx.variables.get(ctx.node) else {
            fail!(FailedPrecondition, "Attempting to use uninitialized value {}", ctx.node)
        };
        if value.datum_type() != self.dtype {
            fail!(
                InvalidArgument,
                "Variable {} is {:?}, holds a {:?} value",
                ctx.node,
                self.dtype,
                value.datum_type()
            );
        }
        if let Some(shape) = &self.shape {
            if value.shape() != &**shape {
                fail!(
                    InvalidArgument,
                    "Variable {} has shape {:?}, holds a value of shape {:?}",
                    ctx.node,
                    shape,
                    value.shape()
                );
            }
        }
        Ok(vec![value.clone()])
    }
}

#[derive(Debug, Clone)]
pub struct Assign;

impl Op for Assign {
    fn name(&self) -> &'static str {
        "Assign"
    }

    fn ref_inputs(&self) -> usize {
        1
    }

    fn eval(&self, ctx: &mut EvalContext, inputs: Vec<Tensor>) -> anyhow::Result<Vec<Tensor>> {
        let value = single(self, ctx, inputs)?;
        let var = ctx.refs[0];
        trace!("{}: {} <- {:?}", ctx.node, var, value);
        ctx.variables.insert(var.to_string(), value.clone());
        Ok(vec![value])
    }
}

#[derive(Debug, Clone)]
pub struct AssignAdd;

impl Op for AssignAdd {
    fn name(&self) -> &'static str {
        "AssignAdd"
    }

    fn ref_inputs(&self) -> usize {
        1
    }

    fn eval(&self, ctx: &mut EvalContext, inputs: Vec<Tensor>) -> anyhow::Result<Vec<Tensor>> {
        let delta = single(self, ctx, inputs)?;
        let var = ctx.refs[0];
        let Some(current) = ctx.variables.get(var) else {
            fail!(FailedPrecondition, "Attempting to use uninitialized value {}", var)
        };
        let value = BinOp::Add.eval(current, &delta)?;
        if value.shape() != current.shape() {
            fail!(
                InvalidArgument,
                "AssignAdd would change the shape of {} from {:?} to {:?}",
                var,
                current.shape(),
                value.shape()
            );
        }
        trace!("{}: {} <- {:?}", ctx.node, var, value);
        ctx.variables.insert(var.to_string(), value.clone());
        Ok(vec![value])
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::Code;
    use tfbind_proto::tfpb::node;
    use tfbind_proto::tfpb::tensorflow::TensorProto;

    fn run(
        op: &dyn Op,
        variables: &mut HashMap<String, Tensor>,
        refs: Vec<&str>,
        inputs: Vec<Tensor>,
    ) -> anyhow::Result<Vec<Tensor>> {
        op.eval(&mut EvalContext { node: "n", refs, variables }, inputs)
    }

    fn t(shape: &[usize], data: &[f32]) -> Tensor {
        Tensor::from_shape(shape, data.to_vec()).unwrap()
    }

    #[test]
    fn broadcasting() {
        assert_eq!(broadcast_shape(&[2, 3], &[3]).unwrap(), [2, 3]);
        assert_eq!(broadcast_shape(&[2, 1], &[1, 4]).unwrap(), [2, 4]);
        assert_eq!(broadcast_shape(&[], &[5]).unwrap(), [5]);
        assert!(broadcast_shape(&[2, 3], &[2]).is_err());
    }

    #[test]
    fn add_broadcasts() {
        let out = BinOp::Add.eval(&t(&[2, 2], &[1., 2., 3., 4.]), &t(&[2], &[10., 20.])).unwrap();
        assert_eq!(out, t(&[2, 2], &[11., 22., 13., 24.]));
    }

    #[test]
    fn integer_overflow_wraps() {
        let out = BinOp::Mul.eval(&Tensor::scalar(200u8), &Tensor::scalar(2u8)).unwrap();
        assert_eq!(out, Tensor::scalar(144u8));
    }

    #[test]
    fn mixed_types_are_rejected() {
        let e = BinOp::Sub.eval(&Tensor::scalar(1f32), &Tensor::scalar(1i32)).unwrap_err();
        assert_eq!(Code::of(&e), Code::InvalidArgument);
        let e = BinOp::Add.eval(&Tensor::scalar(true), &Tensor::scalar(true)).unwrap_err();
        assert_eq!(Code::of(&e), Code::InvalidArgument);
    }

    #[test]
    fn unknown_op() {
        let e = OpRegister::all().build(&node().name("x").op("Conv9D")).unwrap_err();
        assert_eq!(Code::of(&e), Code::NotFound);
    }

    #[test]
    fn const_without_value() {
        let e = OpRegister::all()
            .build(&node().name("x").op("Const").attr("dtype", DataType::DtFloat))
            .unwrap_err();
        assert_eq!(Code::of(&e), Code::InvalidArgument);
        assert!(e.to_string().contains("Node x (Const)"), "{}", e);
    }

    #[test]
    fn const_type_mismatch() {
        let def = node()
            .name("x")
            .op("Const")
            .attr("dtype", DataType::DtInt32)
            .attr("value", TensorProto::scalar(1.0f32));
        assert!(OpRegister::all().build(&def).is_err());
    }

    #[test]
    fn placeholder_checks_feeds() {
        let def = node().name("p").op("Placeholder").attr("dtype", DataType::DtFloat);
        let op = OpRegister::all().build(&def).unwrap();
        assert!(op.validate_feed("p", &Tensor::scalar(1f32)).is_ok());
        assert!(op.validate_feed("p", &Tensor::scalar(1i64)).is_err());
        let e = run(&*op, &mut HashMap::new(), vec![], vec![]).unwrap_err();
        assert!(e.to_string().contains("must feed"));
    }

    #[test]
    fn variables() {
        let mut vars = HashMap::new();
        let var = Variable::new(DataType::DtFloat, Some(vec![]));
        let e = run(&var, &mut vars, vec![], vec![]).unwrap_err();
        assert_eq!(Code::of(&e), Code::FailedPrecondition);

        run(&Assign, &mut vars, vec!["n"], vec![Tensor::scalar(1f32)]).unwrap();
        run(&AssignAdd, &mut vars, vec!["n"], vec![Tensor::scalar(2f32)]).unwrap();
        assert_eq!(run(&var, &mut vars, vec![], vec![]).unwrap(), [Tensor::scalar(3f32)]);

        let e = run(&AssignAdd, &mut vars, vec!["n"], vec![t(&[2], &[1., 1.])]).unwrap_err();
        assert_eq!(Code::of(&e), Code::InvalidArgument);
    }

    #[test]
    fn arity() {
        let e = run(&Identity, &mut HashMap::new(), vec![], vec![]).unwrap_err();
        assert_eq!(Code::of(&e), Code::InvalidArgument);
    }
}
