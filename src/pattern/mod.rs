//! Pattern matching
//!
//! - [`node`]: the pattern language ([`Pattern`], [`PatternNode`], [`PatternEdge`])
//! - [`matcher`]: the subgraph matcher ([`GraphMatcher`], [`Match`])
//! - [`guards`]: constant resolution and attribute checks used by rewrite callbacks
//!
//! # Example
//!
//! ```ignore
//! use graph_fusion::pattern::{GraphMatcher, Pattern, PatternNode};
//!
//! // Add(x, bias) -> Gelu; the rewrite callback works out which slot holds the bias
//! let pattern = Pattern::builder()
//!     .node(PatternNode::anchor("Add"))
//!     .node(PatternNode::consumer("Gelu", [(0, 0, 0)]))
//!     .build()?;
//!
//! let ctx = GraphContext::new(&graph);
//! for m in GraphMatcher::new(&ctx).match_pattern(&pattern) {
//!     println!("{} -> {}", m[0].name, m[1].name);
//! }
//! ```

pub mod guards;
pub mod matcher;
pub mod node;

pub use guards::{check_attribute_value, AttributeValue, ConstantResolver, ConstantValue};
pub use matcher::{GraphMatcher, Match, MatchOutcome};
pub use node::{NodeRole, Pattern, PatternBuilder, PatternEdge, PatternNode};
