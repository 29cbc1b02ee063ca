//! Structural graph validation
//!
//! Walks the node list once and checks the invariants every rewrite must
//! preserve: each consumed tensor is an initializer, a graph input, or
//! produced by an earlier node; outputs have a single producer; node names
//! are unique; graph outputs are produced.

use rustc_hash::FxHashSet;

use crate::error::{OnnxResult, TransformError};
use crate::proto::GraphProto;

/// Validation result with detailed issues
#[derive(Debug, Clone)]
pub struct ValidationResult {
    /// Whether the graph is valid
    pub is_valid: bool,
    /// List of errors (critical issues)
    pub errors: Vec<String>,
    /// List of warnings (non-critical issues)
    pub warnings: Vec<String>,
}

impl ValidationResult {
    /// Create a valid result
    pub fn valid() -> Self {
        Self {
            is_valid: true,
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    /// Add an error
    pub fn add_error(&mut self, msg: impl Into<String>) {
        self.errors.push(msg.into());
        self.is_valid = false;
    }

    /// Add a warning
    pub fn add_warning(&mut self, msg: impl Into<String>) {
        self.warnings.push(msg.into());
    }
}

/// Validate a graph
pub fn validate_graph(graph: &GraphProto) -> ValidationResult {
    let mut result = ValidationResult::valid();

    let mut known_tensors: FxHashSet<&str> = FxHashSet::default();
    for input in &graph.input {
        if input.name.is_empty() {
            result.add_error("Graph input has empty name");
        } else {
            known_tensors.insert(&input.name);
        }
    }
    for init in &graph.initializer {
        if init.name.is_empty() {
            result.add_warning("Initializer has empty name");
        } else {
            known_tensors.insert(&init.name);
        }
    }

    let all_outputs: FxHashSet<&str> = graph
        .node
        .iter()
        .flat_map(|n| &n.output)
        .map(String::as_str)
        .collect();

    let mut node_names: FxHashSet<&str> = FxHashSet::default();
    let mut node_outputs: FxHashSet<&str> = FxHashSet::default();

    for (idx, node) in graph.node.iter().enumerate() {
        if node.op_type.is_empty() {
            result.add_error(format!("Node {} has empty op_type", idx));
        }

        if !node.name.is_empty() && !node_names.insert(&node.name) {
            result.add_error(format!("Duplicate node name '{}'", node.name));
        }

        for input in node.input.iter().filter(|i| !i.is_empty()) {
            if known_tensors.contains(input.as_str()) {
                continue;
            }
            if all_outputs.contains(input.as_str()) {
                result.add_error(format!(
                    "Node '{}' ({}): input '{}' is produced later in the node order",
                    node.name, node.op_type, input
                ));
            } else {
                result.add_error(format!(
                    "Node '{}' ({}): input '{}' not found",
                    node.name, node.op_type, input
                ));
            }
        }

        for output in node.output.iter().filter(|o| !o.is_empty()) {
            if !node_outputs.insert(output) {
                result.add_error(format!(
                    "Duplicate output '{}' in node '{}'",
                    output, node.name
                ));
            }
            known_tensors.insert(output);
        }
    }

    for output in &graph.output {
        if !known_tensors.contains(output.name.as_str()) {
            result.add_error(format!(
                "Graph output '{}' not produced by any node",
                output.name
            ));
        }
    }

    result
}

/// Quick validation that returns an error if invalid
pub fn check_graph(graph: &GraphProto) -> OnnxResult<()> {
    let result = validate_graph(graph);
    if result.is_valid {
        Ok(())
    } else {
        Err(TransformError::ValidationFailed(result.errors.join("; ")))
    }
}
