//! Bias + GELU fusion
//!
//! Transforms:
//!   Add(x, bias) -> Gelu
//! Into:
//!   com.microsoft::BiasGelu(x, bias)
//!
//! The bias may sit in either Add slot but must be a 1-D compile-time
//! constant, and the Add output must feed only the Gelu.

use tracing::debug;

use crate::error::PatternError;
use crate::graph::GraphContext;
use crate::pattern::{Match, Pattern, PatternNode};
use crate::proto::extensions::make_node_with_domain;
use crate::proto::NodeProto;
use crate::traits::FusionOptimizer;
use crate::transform::{FusionRule, Rewrite, RewriteCallback};

use super::MS_DOMAIN;

/// Rewrite callback for Add -> Gelu
#[derive(Debug, Default, Clone, Copy)]
pub struct FuseBiasGelu;

impl FuseBiasGelu {
    /// Optimizer name
    pub const NAME: &'static str = "fuse_bias_gelu";

    /// `[0] Add`, `[1] Gelu` reading `Add.output[0]`
    ///
    /// The bias slot is found by the callback.
    pub fn pattern() -> Result<Pattern, PatternError> {
        Pattern::builder()
            .node(PatternNode::anchor("Add"))
            .node(PatternNode::consumer("Gelu", [(0, 0, 0)]))
            .build()
    }

    /// Rule pairing the pattern with this callback
    pub fn rule() -> Result<FusionRule, PatternError> {
        Ok(FusionRule::new(Self::NAME, Self::pattern()?, FuseBiasGelu))
    }

    /// Single-rule optimizer
    pub fn optimizer() -> Result<FusionOptimizer, PatternError> {
        Ok(FusionOptimizer::new(Self::NAME).with_rule(Self::rule()?))
    }

    /// Split the Add inputs into (x, bias)
    fn split_bias<'n>(ctx: &GraphContext<'_>, add: &'n NodeProto) -> Option<(&'n str, &'n str)> {
        let lhs = add.input_at(0)?;
        let rhs = add.input_at(1)?;
        let is_bias = |name: &str| {
            ctx.get_constant_value(name)
                .is_some_and(|value| value.ndim() == 1)
        };

        if is_bias(rhs) {
            Some((lhs, rhs))
        } else if is_bias(lhs) {
            Some((rhs, lhs))
        } else {
            None
        }
    }
}

impl RewriteCallback for FuseBiasGelu {
    fn rewrite(&self, ctx: &GraphContext<'_>, matched: &Match<'_>, index: usize) -> Rewrite {
        let add = matched.anchor();
        let gelu = &matched[1];

        let Some(add_out) = add.output_at(0) else {
            return Rewrite::reject();
        };
        if !ctx.is_single_use(add_out) {
            debug!(add = %add.name, "Add output has other consumers");
            return Rewrite::reject();
        }
        let Some((x, bias)) = Self::split_bias(ctx, add) else {
            debug!(add = %add.name, "no 1-D constant bias");
            return Rewrite::reject();
        };
        let Some(out) = gelu.output_at(0) else {
            return Rewrite::reject();
        };

        let fused = make_node_with_domain(
            "BiasGelu",
            MS_DOMAIN,
            &[x, bias],
            &[out],
            &format!("{}/BiasGelu_{}", gelu.name, index),
        );

        Rewrite::replace(vec![add.name.clone(), gelu.name.clone()], vec![fused])
    }
}
