//! # graph-fusion
//!
//! Pattern-based subgraph matching and fusion rewrites for ONNX-style
//! tensor graphs.
//!
//! A [`Pattern`](pattern::Pattern) is a small DAG of operator types anchored
//! at its first node. The [`GraphMatcher`](pattern::GraphMatcher) finds every
//! occurrence in a graph, a [`FusionRule`](transform::FusionRule) turns each
//! occurrence into edits, and [`update_graph`](transform::update_graph)
//! applies the edits atomically, repairing topological order as needed.
//!
//! ## Features
//!
//! - **Matching**: producer and consumer edges, commutative inputs
//! - **Guards**: constant resolution through Identity chains, attribute checks
//! - **Mutation**: all-or-nothing batch edits with dangling-reference checks
//! - **Registry**: per-device optimizer selection with snapshot rollback
//!
//! ## Example
//!
//! ```ignore
//! use graph_fusion::prelude::*;
//!
//! let config = OptimizerConfig::default().with_registry(default_registry()?);
//! let report = optimize_graph(&mut graph, "cpu", &config)?;
//! println!("{} rewrites", report.total().transforms_applied);
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

// ============================================================================
// Module declarations
// ============================================================================

pub mod error;
pub mod graph;
pub mod passes;
pub mod pattern;
pub mod proto;
pub mod registry;
pub mod tensor;
pub mod traits;
pub mod transform;

// ============================================================================
// Prelude module for convenient imports
// ============================================================================

/// Prelude module - import commonly used types with `use graph_fusion::prelude::*`
pub mod prelude {
    pub use crate::error::{OnnxResult, PatternError, TransformError};
    pub use crate::graph::{check_graph, validate_graph, GraphContext};
    pub use crate::passes::{default_registry, FuseBiasGelu, FuseTransposeMatMul};
    pub use crate::pattern::{
        check_attribute_value, AttributeValue, ConstantValue, GraphMatcher, Match, Pattern,
        PatternNode,
    };
    pub use crate::proto::onnx::*;
    pub use crate::registry::{
        optimize_graph, DevicePredicate, OptimizeReport, OptimizerConfig, OptimizerRegistry,
    };
    pub use crate::traits::{FusionOptimizer, GraphOptimizer};
    pub use crate::transform::{
        apply_rules, update_graph, FusionRule, GraphEdit, Rewrite, RewriteCallback,
        TransformStats,
    };
}

// ============================================================================
// Crate-level re-exports
// ============================================================================

pub use error::{OnnxResult, PatternError, TransformError};
pub use traits::GraphOptimizer;

// ============================================================================
// Version information
// ============================================================================

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
