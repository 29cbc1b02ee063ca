//! Edit accumulation
//!
//! Rewrites found in one pass are collected into an [`EditBatch`] and
//! applied with a single [`update_graph`] call.

use crate::error::OnnxResult;
use crate::proto::{GraphProto, NodeProto, ValueInfoProto};

use super::update::{update_graph, UpdateStats};

/// One rewrite's worth of graph changes
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GraphEdit {
    /// Names of nodes to remove
    pub remove: Vec<String>,
    /// Replacement nodes
    pub add: Vec<NodeProto>,
    /// Metadata for newly introduced tensors
    pub value_infos: Vec<ValueInfoProto>,
}

impl GraphEdit {
    /// Check if the edit changes nothing
    pub fn is_empty(&self) -> bool {
        self.remove.is_empty() && self.add.is_empty() && self.value_infos.is_empty()
    }

    /// Apply this edit on its own
    pub fn apply(self, graph: &mut GraphProto) -> OnnxResult<UpdateStats> {
        update_graph(graph, &self.remove, self.add, self.value_infos)
    }
}

/// Accumulated edits, applied together
#[derive(Debug, Clone, Default)]
pub struct EditBatch {
    merged: GraphEdit,
    edits: usize,
}

impl EditBatch {
    /// Create an empty batch
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue an edit
    pub fn push(&mut self, edit: GraphEdit) {
        self.merged.remove.extend(edit.remove);
        self.merged.add.extend(edit.add);
        self.merged.value_infos.extend(edit.value_infos);
        self.edits += 1;
    }

    /// Number of queued edits
    pub fn len(&self) -> usize {
        self.edits
    }

    /// Check if nothing is queued
    pub fn is_empty(&self) -> bool {
        self.edits == 0
    }

    /// Names queued for removal, in queue order
    pub fn removals(&self) -> &[String] {
        &self.merged.remove
    }

    /// Apply every queued edit in one update
    ///
    /// Fails without touching the graph if any two edits conflict.
    pub fn apply(self, graph: &mut GraphProto) -> OnnxResult<UpdateStats> {
        self.merged.apply(graph)
    }
}
