//! Property-based tests for matching and graph mutation
//!
//! Random DAGs are built from a small op vocabulary, optionally with a
//! `Mul -> Square` pair planted at a random position.

use graph_fusion::prelude::*;
use graph_fusion::proto::extensions::{make_node, make_tensor_value_info};
use proptest::prelude::*;

/// Ops used for filler nodes; never Mul or Square
const FILLER_OPS: &[&str] = &["Relu", "Sigmoid", "Tanh", "Neg", "Add"];

type NodeSeed = (usize, usize, usize);

// ── Strategies ──────────────────────────────────────────────────────────────

/// Filler node seeds plus the index the planted pair goes before
fn arb_dag() -> impl Strategy<Value = (Vec<NodeSeed>, usize)> {
    (1usize..24).prop_flat_map(|n| {
        (
            prop::collection::vec((0..FILLER_OPS.len(), any::<usize>(), any::<usize>()), n),
            0..=n,
        )
    })
}

/// A permutation of the four axes of a rank-4 tensor
fn arb_perm() -> impl Strategy<Value = Vec<i64>> {
    Just(vec![0i64, 1, 2, 3]).prop_shuffle()
}

// ── Fixtures ────────────────────────────────────────────────────────────────

fn plant_pair(node: &mut Vec<NodeProto>, tensors: &mut Vec<String>) {
    let source = tensors[tensors.len() - 1].clone();
    node.push(make_node("Mul", &[source.as_str(), source.as_str()], &["pm"], "planted_mul"));
    node.push(make_node("Square", &["pm"], &["ps"], "planted_square"));
    tensors.push("ps".to_string());
}

fn build_graph(seeds: &[NodeSeed], plant: Option<usize>) -> GraphProto {
    let mut tensors = vec!["X".to_string()];
    let mut node = Vec::new();

    for (i, &(op, a, b)) in seeds.iter().enumerate() {
        if plant == Some(i) {
            plant_pair(&mut node, &mut tensors);
        }
        let op_type = FILLER_OPS[op];
        let lhs = tensors[a % tensors.len()].clone();
        let rhs = tensors[b % tensors.len()].clone();
        let out = format!("t{}", i);
        let inputs: Vec<&str> = if op_type == "Add" {
            vec![lhs.as_str(), rhs.as_str()]
        } else {
            vec![lhs.as_str()]
        };
        node.push(make_node(op_type, &inputs, &[out.as_str()], &format!("n{}", i)));
        tensors.push(out);
    }
    if plant == Some(seeds.len()) {
        plant_pair(&mut node, &mut tensors);
    }

    let last = tensors[tensors.len() - 1].clone();
    GraphProto {
        node,
        input: vec![make_tensor_value_info("X", 1, &[8])],
        output: vec![make_tensor_value_info(&last, 1, &[8])],
        ..Default::default()
    }
}

fn mul_square() -> Pattern {
    Pattern::builder()
        .node(PatternNode::anchor("Mul"))
        .node(PatternNode::consumer("Square", [(0, 0, 0)]))
        .build()
        .unwrap()
}

fn fuse_to_pow(_ctx: &GraphContext<'_>, m: &Match<'_>, index: usize) -> Rewrite {
    Rewrite::replace(
        vec![m[0].name.clone(), m[1].name.clone()],
        vec![make_node(
            "Pow4",
            &[m[0].input[0].as_str()],
            &[m[1].output[0].as_str()],
            &format!("pow4_{}", index),
        )],
    )
}

// ── Property tests ──────────────────────────────────────────────────────────

proptest! {
    /// Every reported match satisfies the pattern's op types and edges.
    #[test]
    fn matches_are_sound((seeds, plant) in arb_dag()) {
        let graph = build_graph(&seeds, Some(plant));
        let ctx = GraphContext::new(&graph);
        let pattern = Pattern::builder()
            .node(PatternNode::anchor("Add"))
            .node(PatternNode::producer("Relu", [(0, 0, 0)]).commutative())
            .build()
            .unwrap();

        for m in GraphMatcher::new(&ctx).match_pattern(&pattern) {
            prop_assert_eq!(m.len(), 2);
            prop_assert_eq!(m[0].op_type.as_str(), "Add");
            prop_assert_eq!(m[1].op_type.as_str(), "Relu");
            prop_assert!(m[0].input.contains(&m[1].output[0]));
        }
    }

    /// Matches of a three-node pattern satisfy every edge, on the exact slot
    /// for a plain consumer and on distinct slots for a commutative one.
    #[test]
    fn multi_edge_matches_are_sound((seeds, plant) in arb_dag()) {
        let graph = build_graph(&seeds, Some(plant));
        let ctx = GraphContext::new(&graph);
        let matcher = GraphMatcher::new(&ctx);

        for commutative in [false, true] {
            let mut add = PatternNode::consumer("Add", [(0, 0, 0), (1, 0, 1)]);
            if commutative {
                add = add.commutative();
            }
            let pattern = Pattern::builder()
                .node(PatternNode::anchor("Relu"))
                .node(PatternNode::consumer("Tanh", [(0, 0, 0)]))
                .node(add)
                .build()
                .unwrap();

            for m in matcher.match_pattern(&pattern) {
                let relu_out = &m[0].output[0];
                let tanh_out = &m[1].output[0];
                prop_assert_eq!(&m[1].input[0], relu_out);
                if commutative {
                    let inputs = &m[2].input;
                    prop_assert!(
                        (&inputs[0] == relu_out && &inputs[1] == tanh_out)
                            || (&inputs[0] == tanh_out && &inputs[1] == relu_out)
                    );
                } else {
                    prop_assert_eq!(&m[2].input[0], relu_out);
                    prop_assert_eq!(&m[2].input[1], tanh_out);
                }
            }
        }
    }

    /// A planted pair is always found, and nothing else is.
    #[test]
    fn planted_pair_is_found((seeds, plant) in arb_dag()) {
        let graph = build_graph(&seeds, Some(plant));
        let ctx = GraphContext::new(&graph);
        let matches = GraphMatcher::new(&ctx).match_pattern(&mul_square());

        prop_assert_eq!(matches.len(), 1);
        prop_assert_eq!(matches[0].node_names(), vec!["planted_mul", "planted_square"]);
    }

    /// Without a planted pair there is nothing to match.
    #[test]
    fn filler_graph_has_no_match((seeds, _plant) in arb_dag()) {
        let graph = build_graph(&seeds, None);
        let ctx = GraphContext::new(&graph);
        prop_assert_eq!(GraphMatcher::new(&ctx).count_matches(&mul_square()), 0);
    }

    /// Fusing the planted pair leaves a valid, topologically ordered graph.
    #[test]
    fn fusion_keeps_graph_valid((seeds, plant) in arb_dag()) {
        let mut graph = build_graph(&seeds, Some(plant));
        prop_assert!(check_graph(&graph).is_ok());

        let rule = FusionRule::from_fn("mul_square", mul_square(), fuse_to_pow);
        let stats = apply_rules(&mut graph, &[rule]).unwrap();

        prop_assert_eq!(stats.transforms_applied, 1);
        prop_assert_eq!(graph.node.len(), seeds.len() + 1);
        let result = check_graph(&graph);
        prop_assert!(result.is_ok(), "{:?}", result);
    }

    /// An empty edit never changes the graph.
    #[test]
    fn empty_edit_is_identity((seeds, plant) in arb_dag()) {
        let mut graph = build_graph(&seeds, Some(plant));
        let original = graph.clone();

        update_graph(&mut graph, &[], Vec::new(), Vec::new()).unwrap();
        prop_assert_eq!(graph, original);
    }

    /// The attribute guard only lets a last-two-axes transpose fold.
    #[test]
    fn transpose_guard_rejects_other_perms(perm in arb_perm()) {
        let mut graph = GraphProto {
            node: vec![
                make_node("Transpose", &["K"], &["kt"], "transpose")
                    .with_attribute(AttributeProto::new_ints("perm", perm.clone())),
                make_node("MatMul", &["Q", "kt"], &["Y"], "matmul"),
            ],
            input: vec![
                make_tensor_value_info("Q", 1, &[2, 4, 8, 8]),
                make_tensor_value_info("K", 1, &[2, 4, 8, 8]),
            ],
            output: vec![make_tensor_value_info("Y", 1, &[2, 4, 8, 8])],
            ..Default::default()
        };

        let stats = FuseTransposeMatMul::optimizer()
            .unwrap()
            .optimize(&mut graph)
            .unwrap();
        let expected = usize::from(perm == vec![0, 1, 3, 2]);
        prop_assert_eq!(stats.transforms_applied, expected);
    }
}
