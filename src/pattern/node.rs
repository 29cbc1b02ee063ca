//! Pattern description language
//!
//! A [`Pattern`] is an ordered list of [`PatternNode`]s. Index 0 is the
//! anchor; every later node is tied to strictly earlier nodes by
//! [`PatternEdge`]s, so the matcher can bind nodes front to back.
//!
//! ```ignore
//! // Mul -> Square
//! let pattern = Pattern::builder()
//!     .node(PatternNode::anchor("Mul"))
//!     .node(PatternNode::consumer("Square", [(0, 0, 0)]))
//!     .build()?;
//! ```

use crate::error::PatternError;

/// Direction of a pattern node's edges
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum NodeRole {
    /// The node consumes outputs of earlier pattern nodes
    #[default]
    Consumer,
    /// The node produces inputs of earlier pattern nodes
    Producer,
}

/// Edge to an earlier pattern node
///
/// For a [`NodeRole::Consumer`] node `p`:
/// `bound[p].input[input_port] == bound[node].output[output_port]`.
///
/// For a [`NodeRole::Producer`] node `p`:
/// `bound[p].output[output_port] == bound[node].input[input_port]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PatternEdge {
    /// Index of the earlier pattern node
    pub node: usize,
    /// Output slot on the producing side
    pub output_port: usize,
    /// Input slot on the consuming side
    pub input_port: usize,
}

impl From<(usize, usize, usize)> for PatternEdge {
    fn from((node, output_port, input_port): (usize, usize, usize)) -> Self {
        Self {
            node,
            output_port,
            input_port,
        }
    }
}

/// One position in a pattern
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternNode {
    /// Operator type the bound node must have
    pub op_type: String,
    /// Input order on the consuming side of the edges is irrelevant;
    /// `input_port` becomes a preference. No effect on the anchor.
    pub commutative: bool,
    /// Edge direction
    pub role: NodeRole,
    /// Edges to earlier pattern nodes
    pub edges: Vec<PatternEdge>,
}

impl PatternNode {
    /// Node with no edges
    pub fn new(op_type: impl Into<String>) -> Self {
        Self {
            op_type: op_type.into(),
            commutative: false,
            role: NodeRole::Consumer,
            edges: Vec::new(),
        }
    }

    /// Anchor node (pattern index 0)
    pub fn anchor(op_type: impl Into<String>) -> Self {
        Self::new(op_type)
    }

    /// Node consuming outputs of earlier nodes
    pub fn consumer<E, I>(op_type: impl Into<String>, edges: I) -> Self
    where
        E: Into<PatternEdge>,
        I: IntoIterator<Item = E>,
    {
        Self {
            edges: edges.into_iter().map(Into::into).collect(),
            ..Self::new(op_type)
        }
    }

    /// Node producing inputs of earlier nodes
    pub fn producer<E, I>(op_type: impl Into<String>, edges: I) -> Self
    where
        E: Into<PatternEdge>,
        I: IntoIterator<Item = E>,
    {
        Self {
            role: NodeRole::Producer,
            ..Self::consumer(op_type, edges)
        }
    }

    /// Mark the node commutative
    pub fn commutative(mut self) -> Self {
        self.commutative = true;
        self
    }

    /// Add an edge, builder style
    pub fn with_edge(mut self, edge: impl Into<PatternEdge>) -> Self {
        self.edges.push(edge.into());
        self
    }
}

/// Validated, ordered pattern
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pattern {
    nodes: Vec<PatternNode>,
}

impl Pattern {
    /// Build a pattern from its nodes, validating edge structure
    pub fn new(nodes: Vec<PatternNode>) -> Result<Self, PatternError> {
        if nodes.is_empty() {
            return Err(PatternError::Empty);
        }

        for (idx, node) in nodes.iter().enumerate() {
            if node.op_type.is_empty() {
                return Err(PatternError::EmptyOpType(idx));
            }
            if idx == 0 {
                if !node.edges.is_empty() {
                    return Err(PatternError::AnchorHasEdges);
                }
                continue;
            }
            if node.edges.is_empty() {
                return Err(PatternError::Unconnected(idx));
            }
            if let Some(edge) = node.edges.iter().find(|e| e.node >= idx) {
                return Err(PatternError::ForwardReference {
                    node: idx,
                    target: edge.node,
                });
            }
        }

        Ok(Self { nodes })
    }

    /// Start a builder
    pub fn builder() -> PatternBuilder {
        PatternBuilder::default()
    }

    /// All nodes in pattern order
    pub fn nodes(&self) -> &[PatternNode] {
        &self.nodes
    }

    /// Node at a pattern index
    pub fn get(&self, index: usize) -> Option<&PatternNode> {
        self.nodes.get(index)
    }

    /// The anchor node
    pub fn anchor(&self) -> &PatternNode {
        &self.nodes[0]
    }

    /// Number of pattern nodes
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Always false for a validated pattern
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// Incremental [`Pattern`] construction
#[derive(Debug, Clone, Default)]
pub struct PatternBuilder {
    nodes: Vec<PatternNode>,
}

impl PatternBuilder {
    /// Append a node
    pub fn node(mut self, node: PatternNode) -> Self {
        self.nodes.push(node);
        self
    }

    /// Validate and build
    pub fn build(self) -> Result<Pattern, PatternError> {
        Pattern::new(self.nodes)
    }
}
