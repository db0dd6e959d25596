use std::collections::HashMap;

use proptest::prelude::*;
use tfbind::prelude::*;

fn binary_graph(op: &str, dtype: DataType) -> GraphDef {
    graph()
        .node(node().name("a").op("Placeholder").attr("dtype", dtype))
        .node(node().name("b").op("Placeholder").attr("dtype", dtype))
        .node(node().name("out").op(op).input("a").input("b"))
}

fn pairs() -> impl Strategy<Value = Vec<(i32, i32)>> {
    proptest::collection::vec((any::<i32>(), any::<i32>()), 0..32)
}

proptest! {
    #[test]
    fn integer_ops_wrap(pairs in pairs(), op in prop::sample::select(vec!["Add", "Sub", "Mul"])) {
        let mut session = Session::create().unwrap();
        session.extend_graph(&binary_graph(op, DataType::DtInt32)).unwrap();
        let (a, b): (Vec<i32>, Vec<i32>) = pairs.iter().copied().unzip();
        let mut inputs = HashMap::new();
        inputs.insert("a".to_string(), Tensor::new(&[a.len()], &a).unwrap());
        inputs.insert("b".to_string(), Tensor::new(&[b.len()], &b).unwrap());
        let out = session.run(&inputs, &["out"], &[]).unwrap();
        let expected: Vec<i32> = pairs
            .iter()
            .map(|&(x, y)| match op {
                "Add" => x.wrapping_add(y),
                "Sub" => x.wrapping_sub(y),
                _ => x.wrapping_mul(y),
            })
            .collect();
        prop_assert_eq!(out[0].as_slice::<i32>().unwrap(), &*expected);
    }

    #[test]
    fn row_broadcasts_over_matrix(rows in 1usize..5, row in proptest::collection::vec(-1e3f64..1e3, 1..6)) {
        let mut session = Session::create().unwrap();
        session.extend_graph(&binary_graph("Add", DataType::DtDouble)).unwrap();
        let matrix: Vec<f64> = (0..rows * row.len()).map(|i| i as f64).collect();
        let mut inputs = HashMap::new();
        inputs.insert("a".to_string(), Tensor::new(&[rows, row.len()], &matrix).unwrap());
        inputs.insert("b".to_string(), Tensor::new(&[row.len()], &row).unwrap());
        let out = session.run(&inputs, &["out"], &[]).unwrap();
        prop_assert_eq!(out[0].shape(), vec![rows, row.len()]);
        let sum = out[0].as_slice::<f64>().unwrap();
        for (ix, value) in sum.iter().enumerate() {
            prop_assert_eq!(*value, matrix[ix] + row[ix % row.len()]);
        }
    }
}
