//! Error types for graph-fusion
//!
//! This module defines all error types used throughout the crate.

use thiserror::Error;

/// Pattern authoring mistakes, caught when a [`crate::pattern::Pattern`] is built
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PatternError {
    /// Pattern has no nodes
    #[error("pattern has no nodes")]
    Empty,

    /// A pattern node has an empty op type
    #[error("pattern node {0} has an empty op_type")]
    EmptyOpType(usize),

    /// The anchor (index 0) declares edges
    #[error("anchor pattern node must not declare edges")]
    AnchorHasEdges,

    /// A non-anchor node declares no edges and cannot be reached
    #[error("pattern node {0} has no edges to earlier nodes")]
    Unconnected(usize),

    /// An edge references the node itself or a later node
    #[error("pattern node {node} references node {target}, which is not earlier")]
    ForwardReference {
        /// Index of the offending pattern node
        node: usize,
        /// Referenced index
        target: usize,
    },
}

/// Main error type for matching and rewriting operations
#[derive(Error, Debug)]
pub enum TransformError {
    /// Pattern failed validation
    #[error("Invalid pattern: {0}")]
    Pattern(#[from] PatternError),

    /// Two accepted rewrites remove the same node
    #[error("Mutation conflict: node '{0}' is removed more than once")]
    MutationConflict(String),

    /// Node to remove does not exist
    #[error("Node not found: {0}")]
    NodeNotFound(String),

    /// Added node name collides with an existing one
    #[error("Duplicate node name: {0}")]
    DuplicateNodeName(String),

    /// Added node output is already produced elsewhere
    #[error("Output '{output}' of node '{node}' is already produced by another node")]
    DuplicateOutput {
        /// Tensor name
        output: String,
        /// Node declaring it
        node: String,
    },

    /// A consumer references a tensor whose producer was removed
    #[error("Dangling reference: '{consumer}' consumes '{tensor}', which is no longer produced")]
    DanglingReference {
        /// Tensor name
        tensor: String,
        /// Consumer node name (or `<graph output>`)
        consumer: String,
    },

    /// Node order cannot be made topological
    #[error("Cycle detected: {0} nodes could not be ordered")]
    CycleDetected(usize),

    /// Graph validation failed
    #[error("Graph validation failed: {0}")]
    ValidationFailed(String),

    /// Invalid tensor data type
    #[error("Invalid data type: {0}")]
    InvalidDataType(i32),

    /// Tensor payload does not match its declared shape
    #[error("Shape mismatch: {0}")]
    ShapeMismatch(String),

    /// Generic internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for graph operations
pub type OnnxResult<T> = Result<T, TransformError>;
