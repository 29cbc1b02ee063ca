//! Rewrite driver
//!
//! Runs a list of [`FusionRule`]s against one graph snapshot. For each rule,
//! in order, every match is offered to the rule's [`RewriteCallback`]; the
//! accepted rewrites are collected and applied once at the end.

use std::fmt;

use rustc_hash::FxHashSet;
use tracing::debug;

use crate::error::OnnxResult;
use crate::graph::GraphContext;
use crate::pattern::{GraphMatcher, Match, Pattern};
use crate::proto::{GraphProto, NodeProto, ValueInfoProto};

use super::edit::{EditBatch, GraphEdit};

/// Edits requested for one match
///
/// An empty `add` list rejects the match: nothing is removed and the
/// rewrite index is not consumed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Rewrite {
    /// Names of nodes to remove
    pub remove: Vec<String>,
    /// Replacement nodes
    pub add: Vec<NodeProto>,
    /// Metadata for newly introduced tensors
    pub value_infos: Vec<ValueInfoProto>,
}

impl Rewrite {
    /// Reject the match
    pub fn reject() -> Self {
        Self::default()
    }

    /// Replace `remove` with `add`
    pub fn replace(remove: Vec<String>, add: Vec<NodeProto>) -> Self {
        Self {
            remove,
            add,
            value_infos: Vec::new(),
        }
    }

    /// Attach value-info for new tensors
    pub fn with_value_infos(mut self, value_infos: Vec<ValueInfoProto>) -> Self {
        self.value_infos = value_infos;
        self
    }

    /// Check if this rewrite rejects the match
    pub fn is_rejected(&self) -> bool {
        self.add.is_empty()
    }
}

impl From<Rewrite> for GraphEdit {
    fn from(rewrite: Rewrite) -> Self {
        GraphEdit {
            remove: rewrite.remove,
            add: rewrite.add,
            value_infos: rewrite.value_infos,
        }
    }
}

/// Turns a match into edits
///
/// `index` counts the rewrites accepted so far in this pass, so callbacks
/// can mint collision-free names for new nodes and tensors.
pub trait RewriteCallback {
    /// Produce the edits for `matched`, or [`Rewrite::reject`]
    fn rewrite(&self, ctx: &GraphContext<'_>, matched: &Match<'_>, index: usize) -> Rewrite;
}

impl<F> RewriteCallback for F
where
    F: Fn(&GraphContext<'_>, &Match<'_>, usize) -> Rewrite,
{
    fn rewrite(&self, ctx: &GraphContext<'_>, matched: &Match<'_>, index: usize) -> Rewrite {
        self(ctx, matched, index)
    }
}

/// A pattern paired with its rewrite
pub struct FusionRule {
    /// Rule name, used in logs
    pub name: String,
    /// Pattern to match
    pub pattern: Pattern,
    callback: Box<dyn RewriteCallback>,
}

impl FusionRule {
    /// Create a rule from a callback object
    pub fn new(
        name: impl Into<String>,
        pattern: Pattern,
        callback: impl RewriteCallback + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            pattern,
            callback: Box::new(callback),
        }
    }

    /// Create a rule from a closure
    pub fn from_fn<F>(name: impl Into<String>, pattern: Pattern, f: F) -> Self
    where
        F: Fn(&GraphContext<'_>, &Match<'_>, usize) -> Rewrite + 'static,
    {
        Self::new(name, pattern, f)
    }

    /// Run the callback on one match
    pub fn rewrite(&self, ctx: &GraphContext<'_>, matched: &Match<'_>, index: usize) -> Rewrite {
        self.callback.rewrite(ctx, matched, index)
    }
}

impl fmt::Debug for FusionRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FusionRule")
            .field("name", &self.name)
            .field("pattern", &self.pattern)
            .finish_non_exhaustive()
    }
}

/// Statistics from one driver run
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TransformStats {
    /// Topological matches found across all rules
    pub patterns_matched: usize,
    /// Matches the callback rejected
    pub rewrites_rejected: usize,
    /// Matches skipped because an earlier accepted rewrite claimed a node
    pub overlaps_skipped: usize,
    /// Rewrites applied
    pub transforms_applied: usize,
    /// Nodes removed from the graph
    pub nodes_removed: usize,
    /// Nodes added to the graph
    pub nodes_added: usize,
}

impl TransformStats {
    /// Check if the graph changed
    pub fn changed(&self) -> bool {
        self.transforms_applied > 0
    }

    /// Add another run's counts
    pub fn merge(&mut self, other: &TransformStats) {
        self.patterns_matched += other.patterns_matched;
        self.rewrites_rejected += other.rewrites_rejected;
        self.overlaps_skipped += other.overlaps_skipped;
        self.transforms_applied += other.transforms_applied;
        self.nodes_removed += other.nodes_removed;
        self.nodes_added += other.nodes_added;
    }
}

/// Match every rule against one snapshot of `graph` and apply the accepted
/// rewrites in a single batch
///
/// A match sharing a node with an already accepted rewrite is skipped, so
/// the first rule (and within a rule the first match in graph order) wins.
/// A match containing an unnamed node is rejected, since it cannot be
/// removed by name. On error the graph is unchanged.
pub fn apply_rules(graph: &mut GraphProto, rules: &[FusionRule]) -> OnnxResult<TransformStats> {
    let mut stats = TransformStats::default();

    let batch = {
        let ctx = GraphContext::new(graph);
        let matcher = GraphMatcher::new(&ctx);
        let mut claimed: FxHashSet<String> = FxHashSet::default();
        let mut batch = EditBatch::new();

        for rule in rules {
            let matches = matcher.match_pattern(&rule.pattern);
            debug!(rule = %rule.name, matches = matches.len(), "pattern matched");
            stats.patterns_matched += matches.len();

            for matched in &matches {
                let anchor = matched.anchor().name.as_str();
                if matched.nodes().iter().any(|n| claimed.contains(&n.name)) {
                    debug!(rule = %rule.name, anchor, "overlapping match skipped");
                    stats.overlaps_skipped += 1;
                    continue;
                }
                // removal is by name
                if matched.nodes().iter().any(|n| n.name.is_empty()) {
                    debug!(rule = %rule.name, "match has an unnamed node");
                    stats.rewrites_rejected += 1;
                    continue;
                }

                let rewrite = rule.rewrite(&ctx, matched, batch.len());
                if rewrite.is_rejected() || rewrite.remove.iter().any(String::is_empty) {
                    debug!(rule = %rule.name, anchor, "match rejected");
                    stats.rewrites_rejected += 1;
                    continue;
                }
                if rewrite.remove.iter().any(|n| claimed.contains(n)) {
                    debug!(rule = %rule.name, anchor, "rewrite removes a claimed node");
                    stats.overlaps_skipped += 1;
                    continue;
                }

                claimed.extend(rewrite.remove.iter().cloned());
                stats.transforms_applied += 1;
                batch.push(rewrite.into());
            }
        }

        batch
    };

    if batch.is_empty() {
        return Ok(stats);
    }

    let edits = batch.len();
    let update = batch.apply(graph)?;
    stats.nodes_removed = update.nodes_removed;
    stats.nodes_added = update.nodes_added;
    debug!(
        edits,
        removed = update.nodes_removed,
        added = update.nodes_added,
        "applied rewrite batch"
    );

    Ok(stats)
}
