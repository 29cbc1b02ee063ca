//! Transpose folding into MatMul
//!
//! Transforms:
//!   Transpose(perm = [.., n-1, n-2]) -> MatMul (either operand)
//! Into:
//!   com.microsoft::FusedMatMul(transA | transB = 1)
//!
//! Only a transpose of the last two axes folds, and only when the MatMul is
//! its sole consumer.

use tracing::debug;

use crate::error::PatternError;
use crate::graph::GraphContext;
use crate::pattern::{check_attribute_value, AttributeValue, Match, Pattern, PatternNode};
use crate::proto::extensions::make_node_with_domain;
use crate::proto::{AttributeProto, NodeProto};
use crate::traits::FusionOptimizer;
use crate::transform::{FusionRule, Rewrite, RewriteCallback};

use super::MS_DOMAIN;

/// Ranks whose last-two-axes permutation is recognized
const SUPPORTED_RANKS: std::ops::RangeInclusive<usize> = 2..=4;

/// Rewrite callback folding a Transpose into one MatMul operand
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FuseTransposeMatMul {
    operand: usize,
}

impl FuseTransposeMatMul {
    /// Optimizer name
    pub const NAME: &'static str = "fuse_transpose_matmul";

    /// Callback for MatMul operand `operand` (0 = A, 1 = B)
    pub fn new(operand: usize) -> Self {
        Self { operand }
    }

    /// `[0] MatMul`, `[1] Transpose` producing `MatMul.input[operand]`
    pub fn pattern(operand: usize) -> Result<Pattern, PatternError> {
        Pattern::builder()
            .node(PatternNode::anchor("MatMul"))
            .node(PatternNode::producer("Transpose", [(0, 0, operand)]))
            .build()
    }

    /// Rules for both operands; A is tried first
    pub fn rules() -> Result<Vec<FusionRule>, PatternError> {
        [0, 1]
            .into_iter()
            .map(|operand| -> Result<FusionRule, PatternError> {
                let name = if operand == 0 { "transpose_a" } else { "transpose_b" };
                Ok(FusionRule::new(name, Self::pattern(operand)?, Self::new(operand)))
            })
            .collect()
    }

    /// Optimizer running both rules in one batch
    pub fn optimizer() -> Result<FusionOptimizer, PatternError> {
        let mut optimizer = FusionOptimizer::new(Self::NAME);
        for rule in Self::rules()? {
            optimizer = optimizer.with_rule(rule);
        }
        Ok(optimizer)
    }
}

/// True if `perm` swaps the last two axes and keeps the rest
fn swaps_last_two_axes(transpose: &NodeProto) -> bool {
    SUPPORTED_RANKS.into_iter().any(|rank| {
        let mut perm: Vec<i64> = (0..rank as i64).collect();
        perm.swap(rank - 1, rank - 2);
        check_attribute_value(transpose, "perm", &AttributeValue::Ints(perm))
    })
}

impl RewriteCallback for FuseTransposeMatMul {
    fn rewrite(&self, ctx: &GraphContext<'_>, matched: &Match<'_>, index: usize) -> Rewrite {
        let matmul = matched.anchor();
        let transpose = &matched[1];

        if !swaps_last_two_axes(transpose) {
            debug!(transpose = %transpose.name, "perm does not swap the last two axes");
            return Rewrite::reject();
        }
        let (Some(transposed), Some(source)) = (transpose.output_at(0), transpose.input_at(0))
        else {
            return Rewrite::reject();
        };
        if !ctx.is_single_use(transposed) {
            debug!(transpose = %transpose.name, "Transpose output has other consumers");
            return Rewrite::reject();
        }
        let (Some(a), Some(b), Some(out)) =
            (matmul.input_at(0), matmul.input_at(1), matmul.output_at(0))
        else {
            return Rewrite::reject();
        };

        let inputs = if self.operand == 0 { [source, b] } else { [a, source] };
        let fused = make_node_with_domain(
            "FusedMatMul",
            MS_DOMAIN,
            &inputs,
            &[out],
            &format!("{}/FusedMatMul_{}", matmul.name, index),
        )
        .with_attribute(AttributeProto::new_float("alpha", 1.0))
        .with_attribute(AttributeProto::new_int("transA", i64::from(self.operand == 0)))
        .with_attribute(AttributeProto::new_int("transB", i64::from(self.operand == 1)));

        Rewrite::replace(vec![matmul.name.clone(), transpose.name.clone()], vec![fused])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proto::extensions::{make_node, make_tensor_value_info};
    use crate::proto::GraphProto;
    use crate::traits::GraphOptimizer;

    fn make_test_graph(perm: Vec<i64>, transposed_operand: usize) -> GraphProto {
        let transpose = make_node("Transpose", &["K"], &["kt"], "transpose_0")
            .with_attribute(AttributeProto::new_ints("perm", perm));
        let matmul_inputs = if transposed_operand == 0 { ["kt", "Q"] } else { ["Q", "kt"] };

        GraphProto {
            node: vec![
                transpose,
                make_node("MatMul", &matmul_inputs, &["scores"], "matmul_0"),
                make_node("Softmax", &["scores"], &["Y"], "softmax_0"),
            ],
            input: vec![
                make_tensor_value_info("Q", 1, &[2, 8, 16, 64]),
                make_tensor_value_info("K", 1, &[2, 8, 16, 64]),
            ],
            output: vec![make_tensor_value_info("Y", 1, &[2, 8, 16, 16])],
            ..Default::default()
        }
    }

    fn optimize(graph: &mut GraphProto) -> usize {
        FuseTransposeMatMul::optimizer()
            .unwrap()
            .optimize(graph)
            .unwrap()
            .transforms_applied
    }

    #[test]
    fn test_fold_into_operand_b() {
        let mut graph = make_test_graph(vec![0, 1, 3, 2], 1);
        assert_eq!(optimize(&mut graph), 1);

        let ops: Vec<_> = graph.node.iter().map(|n| n.op_type.as_str()).collect();
        assert_eq!(ops, vec!["FusedMatMul", "Softmax"]);

        let fused = &graph.node[0];
        assert_eq!(fused.input, vec!["Q".to_string(), "K".to_string()]);
        assert_eq!(fused.get_attribute_int("transA", -1), 0);
        assert_eq!(fused.get_attribute_int("transB", -1), 1);
    }

    #[test]
    fn test_fold_into_operand_a() {
        let mut graph = make_test_graph(vec![1, 0], 0);
        assert_eq!(optimize(&mut graph), 1);

        let fused = &graph.node[0];
        assert_eq!(fused.input, vec!["K".to_string(), "Q".to_string()]);
        assert_eq!(fused.get_attribute_int("transA", -1), 1);
    }

    #[test]
    fn test_other_perm_rejected() {
        let mut graph = make_test_graph(vec![0, 2, 1, 3], 1);
        assert_eq!(optimize(&mut graph), 0);
        assert_eq!(graph.node.len(), 3);
    }

    #[test]
    fn test_shared_transpose_rejected() {
        let mut graph = make_test_graph(vec![0, 1, 3, 2], 1);
        graph
            .node
            .push(make_node("Relu", &["kt"], &["Z"], "relu_0"));
        assert_eq!(optimize(&mut graph), 0);
    }

    #[test]
    fn test_swaps_last_two_axes() {
        let node = |perm: Vec<i64>| {
            make_node("Transpose", &["x"], &["y"], "t")
                .with_attribute(AttributeProto::new_ints("perm", perm))
        };
        assert!(swaps_last_two_axes(&node(vec![0, 2, 1])));
        assert!(!swaps_last_two_axes(&node(vec![2, 1, 0])));
        assert!(!swaps_last_two_axes(&node(vec![0, 1, 2, 4, 3])));
        assert!(!swaps_last_two_axes(&make_node("Transpose", &["x"], &["y"], "t")));
    }
}
