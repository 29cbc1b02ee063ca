//! Graph rewriting
//!
//! - [`update`]: [`update_graph`], the all-or-nothing mutator
//! - [`edit`]: [`GraphEdit`] and [`EditBatch`], edits collected across matches
//! - [`core`]: the [`RewriteCallback`] protocol and the [`apply_rules`] driver
//!
//! # Example
//!
//! ```ignore
//! use graph_fusion::transform::{apply_rules, FusionRule, Rewrite};
//!
//! let rule = FusionRule::from_fn("mul_square", pattern, |ctx, m, index| {
//!     Rewrite::replace(
//!         vec![m[0].name.clone(), m[1].name.clone()],
//!         vec![make_node("Pow", &[...], &[&m[1].output[0]], &format!("pow_{index}"))],
//!     )
//! });
//!
//! let stats = apply_rules(&mut graph, &[rule])?;
//! ```

pub mod core;
pub mod edit;
pub mod update;

pub use self::core::{apply_rules, FusionRule, Rewrite, RewriteCallback, TransformStats};
pub use edit::{EditBatch, GraphEdit};
pub use update::{update_graph, UpdateStats, GRAPH_OUTPUT_CONSUMER};
