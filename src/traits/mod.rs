//! Core traits for graph-fusion
//!
//! Defines the interface the registry drives: a [`GraphOptimizer`] rewrites a
//! graph in place and reports what it did.

use crate::error::OnnxResult;
use crate::proto::GraphProto;
use crate::transform::{apply_rules, FusionRule, TransformStats};

/// A named pass that rewrites a graph in place
///
/// On error the graph must be left as it was.
///
/// # Example
///
/// ```ignore
/// struct NoOp;
///
/// impl GraphOptimizer for NoOp {
///     fn name(&self) -> &str {
///         "no_op"
///     }
///
///     fn optimize(&self, _graph: &mut GraphProto) -> OnnxResult<TransformStats> {
///         Ok(TransformStats::default())
///     }
/// }
/// ```
pub trait GraphOptimizer {
    /// Name used in logs and reports
    fn name(&self) -> &str;

    /// Rewrite the graph
    fn optimize(&self, graph: &mut GraphProto) -> OnnxResult<TransformStats>;
}

/// Optimizer that runs a list of fusion rules as one batch
#[derive(Debug)]
pub struct FusionOptimizer {
    name: String,
    rules: Vec<FusionRule>,
}

impl FusionOptimizer {
    /// Create an optimizer with no rules
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            rules: Vec::new(),
        }
    }

    /// Add a rule; rules earlier in the list win overlaps
    pub fn with_rule(mut self, rule: FusionRule) -> Self {
        self.rules.push(rule);
        self
    }

    /// Rules in evaluation order
    pub fn rules(&self) -> &[FusionRule] {
        &self.rules
    }
}

impl GraphOptimizer for FusionOptimizer {
    fn name(&self) -> &str {
        &self.name
    }

    fn optimize(&self, graph: &mut GraphProto) -> OnnxResult<TransformStats> {
        apply_rules(graph, &self.rules)
    }
}

/// Optimizer backed by a function
pub struct FnOptimizer<F> {
    name: String,
    f: F,
}

impl<F> FnOptimizer<F>
where
    F: Fn(&mut GraphProto) -> OnnxResult<TransformStats>,
{
    /// Wrap a function
    pub fn new(name: impl Into<String>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
        }
    }
}

impl<F> GraphOptimizer for FnOptimizer<F>
where
    F: Fn(&mut GraphProto) -> OnnxResult<TransformStats>,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn optimize(&self, graph: &mut GraphProto) -> OnnxResult<TransformStats> {
        (self.f)(graph)
    }
}

/// Optimizers applied in sequence, each on the previous one's output
pub struct OptimizerChain {
    name: String,
    optimizers: Vec<Box<dyn GraphOptimizer>>,
}

impl OptimizerChain {
    /// Create a new empty chain
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            optimizers: Vec::new(),
        }
    }

    /// Add an optimizer to the chain
    #[allow(clippy::should_implement_trait)]
    pub fn add<O: GraphOptimizer + 'static>(mut self, optimizer: O) -> Self {
        self.optimizers.push(Box::new(optimizer));
        self
    }
}

impl GraphOptimizer for OptimizerChain {
    fn name(&self) -> &str {
        &self.name
    }

    /// Stops at the first failure; the graph keeps the output of the
    /// optimizers that succeeded before it
    fn optimize(&self, graph: &mut GraphProto) -> OnnxResult<TransformStats> {
        let mut total = TransformStats::default();
        for optimizer in &self.optimizers {
            total.merge(&optimizer.optimize(graph)?);
        }
        Ok(total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransformError;
    use crate::pattern::{Pattern, PatternNode};
    use crate::proto::extensions::make_node;
    use crate::transform::Rewrite;

    struct NoOp;

    impl GraphOptimizer for NoOp {
        fn name(&self) -> &str {
            "no_op"
        }

        fn optimize(&self, _graph: &mut GraphProto) -> OnnxResult<TransformStats> {
            Ok(TransformStats::default())
        }
    }

    fn relu_graph() -> GraphProto {
        GraphProto {
            node: vec![make_node("Relu", &["X"], &["Y"], "relu_0")],
            ..Default::default()
        }
    }

    fn relu_to_sigmoid() -> FusionRule {
        let pattern = Pattern::new(vec![PatternNode::anchor("Relu")]).unwrap();
        FusionRule::from_fn("relu_to_sigmoid", pattern, |_ctx, m, index| {
            Rewrite::replace(
                vec![m[0].name.clone()],
                vec![make_node(
                    "Sigmoid",
                    &[m[0].input[0].as_str()],
                    &[m[0].output[0].as_str()],
                    &format!("sigmoid_{}", index),
                )],
            )
        })
    }

    #[test]
    fn test_fusion_optimizer() {
        let optimizer = FusionOptimizer::new("swap").with_rule(relu_to_sigmoid());
        assert_eq!(optimizer.name(), "swap");
        assert_eq!(optimizer.rules().len(), 1);

        let mut graph = relu_graph();
        let stats = optimizer.optimize(&mut graph).unwrap();
        assert_eq!(stats.transforms_applied, 1);
        assert_eq!(graph.node[0].op_type, "Sigmoid");
    }

    #[test]
    fn test_fn_optimizer() {
        let optimizer = FnOptimizer::new("fail", |_graph: &mut GraphProto| {
            Err(TransformError::Internal("boom".to_string()))
        });
        assert!(optimizer.optimize(&mut relu_graph()).is_err());
    }

    #[test]
    fn test_optimizer_chain() {
        let chain = OptimizerChain::new("chain")
            .add(NoOp)
            .add(FusionOptimizer::new("swap").with_rule(relu_to_sigmoid()));

        let mut graph = relu_graph();
        let stats = chain.optimize(&mut graph).unwrap();
        assert!(stats.changed());
        assert_eq!(graph.node[0].name, "sigmoid_0");
    }
}
