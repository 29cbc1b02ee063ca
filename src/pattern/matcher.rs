//! Subgraph matcher
//!
//! Binds pattern nodes to graph nodes front to back. Anchor candidates are
//! the graph nodes with the anchor's op type, in graph order. Each later
//! pattern node draws its candidates from its first edge and commits to the
//! first candidate that satisfies every edge. Only commutative slot
//! assignment backtracks; a committed pattern node is never revisited.

use std::ops::Index;

use smallvec::SmallVec;
use tracing::trace;

use crate::graph::{GraphContext, NodeIndices};
use crate::proto::NodeProto;

use super::node::{NodeRole, Pattern, PatternEdge, PatternNode};

/// Concrete nodes bound to a pattern, in pattern order
///
/// `m[k]` is the node bound to pattern index `k`.
#[derive(Debug, Clone)]
pub struct Match<'g> {
    nodes: Vec<&'g NodeProto>,
    positions: Vec<usize>,
}

impl<'g> Match<'g> {
    /// Node bound to a pattern index
    pub fn get(&self, index: usize) -> Option<&'g NodeProto> {
        self.nodes.get(index).copied()
    }

    /// The anchor node
    pub fn anchor(&self) -> &'g NodeProto {
        self.nodes[0]
    }

    /// All bound nodes
    pub fn nodes(&self) -> &[&'g NodeProto] {
        &self.nodes
    }

    /// Graph positions of the bound nodes
    pub fn positions(&self) -> &[usize] {
        &self.positions
    }

    /// Names of the bound nodes
    pub fn node_names(&self) -> Vec<&'g str> {
        self.nodes.iter().map(|n| n.name.as_str()).collect()
    }

    /// Number of bound nodes
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

impl<'g> Index<usize> for Match<'g> {
    type Output = NodeProto;

    fn index(&self, index: usize) -> &NodeProto {
        self.nodes[index]
    }
}

/// Result of matching one anchor
#[derive(Debug, Clone)]
pub enum MatchOutcome<'g> {
    /// Every pattern node was bound
    Matched(Match<'g>),
    /// Some pattern node had no satisfying candidate
    NoMatch,
}

impl<'g> MatchOutcome<'g> {
    /// Check for a match
    pub fn is_match(&self) -> bool {
        matches!(self, MatchOutcome::Matched(_))
    }

    /// Convert into an option
    pub fn into_match(self) -> Option<Match<'g>> {
        match self {
            MatchOutcome::Matched(m) => Some(m),
            MatchOutcome::NoMatch => None,
        }
    }
}

/// Pattern matcher over a graph snapshot
pub struct GraphMatcher<'c, 'g> {
    ctx: &'c GraphContext<'g>,
}

impl<'c, 'g> GraphMatcher<'c, 'g> {
    /// Create a new matcher
    pub fn new(ctx: &'c GraphContext<'g>) -> Self {
        Self { ctx }
    }

    /// All matches, one per matching anchor, in graph order
    ///
    /// Matches may share nodes; overlap is resolved by the caller.
    pub fn match_pattern(&self, pattern: &Pattern) -> Vec<Match<'g>> {
        self.ctx
            .op_type_positions(&pattern.anchor().op_type)
            .iter()
            .filter_map(|&anchor| self.match_at(anchor, pattern).into_match())
            .collect()
    }

    /// First match in graph order
    pub fn find_first(&self, pattern: &Pattern) -> Option<Match<'g>> {
        self.ctx
            .op_type_positions(&pattern.anchor().op_type)
            .iter()
            .find_map(|&anchor| self.match_at(anchor, pattern).into_match())
    }

    /// Number of matching anchors
    pub fn count_matches(&self, pattern: &Pattern) -> usize {
        self.match_pattern(pattern).len()
    }

    /// Match with the anchor bound to the node at graph position `anchor`
    pub fn match_at(&self, anchor: usize, pattern: &Pattern) -> MatchOutcome<'g> {
        let node = match self.ctx.node(anchor) {
            Some(n) if n.op_type == pattern.anchor().op_type => n,
            _ => return MatchOutcome::NoMatch,
        };

        let mut bound = Vec::with_capacity(pattern.len());
        bound.push(anchor);
        let mut nodes = Vec::with_capacity(pattern.len());
        nodes.push(node);

        match self.extend(pattern, 1, &mut bound, &mut nodes) {
            Ok(()) => MatchOutcome::Matched(Match {
                nodes,
                positions: bound,
            }),
            Err(failed_at) => {
                trace!(
                    anchor = %node.name,
                    pattern_index = failed_at,
                    op_type = %pattern.nodes()[failed_at].op_type,
                    "no match"
                );
                MatchOutcome::NoMatch
            }
        }
    }

    /// Bind pattern nodes `p..` in order; `Err` carries the index that failed
    fn extend(
        &self,
        pattern: &Pattern,
        p: usize,
        bound: &mut Vec<usize>,
        nodes: &mut Vec<&'g NodeProto>,
    ) -> Result<(), usize> {
        let Some(pnode) = pattern.get(p) else {
            return Ok(());
        };

        let chosen = self
            .candidates(pnode, nodes)
            .into_iter()
            .filter(|pos| !bound.contains(pos))
            .filter_map(|pos| self.ctx.node(pos).map(|n| (pos, n)))
            .find(|(_, n)| n.op_type == pnode.op_type && satisfies_edges(pnode, n, nodes));

        match chosen {
            Some((pos, node)) => {
                bound.push(pos);
                nodes.push(node);
                self.extend(pattern, p + 1, bound, nodes)
            }
            None => Err(p),
        }
    }

    /// Candidate positions drawn from the first edge of `pnode`
    fn candidates(&self, pnode: &PatternNode, nodes: &[&'g NodeProto]) -> NodeIndices {
        let Some(edge) = pnode.edges.first() else {
            return NodeIndices::new();
        };
        let other = nodes[edge.node];

        match pnode.role {
            NodeRole::Consumer => other
                .output_at(edge.output_port)
                .map(|t| NodeIndices::from_slice(self.ctx.consumer_positions(t)))
                .unwrap_or_default(),
            NodeRole::Producer if pnode.commutative => {
                let mut out = NodeIndices::new();
                for slot in slot_order(edge.input_port, other.input.len()) {
                    if let Some(pos) = other
                        .input_at(slot)
                        .and_then(|t| self.ctx.producer_position(t))
                    {
                        if !out.contains(&pos) {
                            out.push(pos);
                        }
                    }
                }
                out
            }
            NodeRole::Producer => other
                .input_at(edge.input_port)
                .and_then(|t| self.ctx.producer_position(t))
                .into_iter()
                .collect(),
        }
    }
}

/// Check every edge of `pnode` against `candidate`
fn satisfies_edges(pnode: &PatternNode, candidate: &NodeProto, nodes: &[&NodeProto]) -> bool {
    match (pnode.role, pnode.commutative) {
        (NodeRole::Consumer, false) => pnode.edges.iter().all(|e| {
            let produced = nodes[e.node].output_at(e.output_port);
            produced.is_some() && candidate.input_at(e.input_port) == produced
        }),
        (NodeRole::Consumer, true) => {
            let mut used: SmallVec<[bool; 4]> = SmallVec::from_elem(false, candidate.input.len());
            assign_slots(&pnode.edges, candidate, nodes, &mut used)
        }
        (NodeRole::Producer, commutative) => pnode.edges.iter().all(|e| {
            let Some(produced) = candidate.output_at(e.output_port) else {
                return false;
            };
            let consumer = nodes[e.node];
            if commutative {
                consumer.input.iter().any(|i| i == produced)
            } else {
                consumer.input_at(e.input_port) == Some(produced)
            }
        }),
    }
}

/// Give each edge a distinct input slot of `candidate`, preferred slot first
fn assign_slots(
    edges: &[PatternEdge],
    candidate: &NodeProto,
    nodes: &[&NodeProto],
    used: &mut [bool],
) -> bool {
    let Some((edge, rest)) = edges.split_first() else {
        return true;
    };
    let Some(tensor) = nodes[edge.node].output_at(edge.output_port) else {
        return false;
    };

    for slot in slot_order(edge.input_port, candidate.input.len()) {
        if used[slot] || candidate.input_at(slot) != Some(tensor) {
            continue;
        }
        used[slot] = true;
        if assign_slots(rest, candidate, nodes, used) {
            return true;
        }
        used[slot] = false;
    }

    false
}

/// `preferred` first (when in range), then the remaining slots in order
fn slot_order(preferred: usize, len: usize) -> impl Iterator<Item = usize> {
    (preferred < len)
        .then_some(preferred)
        .into_iter()
        .chain((0..len).filter(move |&s| s != preferred))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proto::extensions::make_node;
    use crate::proto::{GraphProto, ValueInfoProto};

    fn graph_of(nodes: Vec<NodeProto>) -> GraphProto {
        GraphProto {
            node: nodes,
            input: ["x", "y"]
                .iter()
                .map(|n| ValueInfoProto {
                    name: n.to_string(),
                    ..Default::default()
                })
                .collect(),
            ..Default::default()
        }
    }

    fn mul_square() -> Pattern {
        Pattern::builder()
            .node(PatternNode::anchor("Mul"))
            .node(PatternNode::consumer("Square", [(0, 0, 0)]))
            .build()
            .unwrap()
    }

    #[test]
    fn test_match_chain() {
        let graph = graph_of(vec![
            make_node("Mul", &["x", "y"], &["t0"], "n0"),
            make_node("Square", &["t0"], &["t1"], "n1"),
            make_node("Relu", &["t1"], &["t2"], "n2"),
        ]);
        let ctx = GraphContext::new(&graph);
        let matcher = GraphMatcher::new(&ctx);

        let matches = matcher.match_pattern(&mul_square());
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].node_names(), vec!["n0", "n1"]);
        assert_eq!(matches[0].positions(), &[0, 1]);
        assert_eq!(matches[0][1].op_type, "Square");
    }

    #[test]
    fn test_match_at_wrong_anchor() {
        let graph = graph_of(vec![make_node("Relu", &["x"], &["t0"], "n0")]);
        let ctx = GraphContext::new(&graph);
        let matcher = GraphMatcher::new(&ctx);

        assert!(!matcher.match_at(0, &mul_square()).is_match());
        assert!(!matcher.match_at(7, &mul_square()).is_match());
    }

    #[test]
    fn test_first_satisfying_consumer_is_committed() {
        // t0 feeds two Squares; the earlier one in graph order wins
        let graph = graph_of(vec![
            make_node("Mul", &["x", "y"], &["t0"], "n0"),
            make_node("Square", &["t0"], &["a"], "sq_a"),
            make_node("Square", &["t0"], &["b"], "sq_b"),
        ]);
        let ctx = GraphContext::new(&graph);
        let m = GraphMatcher::new(&ctx).find_first(&mul_square()).unwrap();
        assert_eq!(m[1].name, "sq_a");
    }

    #[test]
    fn test_wrong_port() {
        let pattern = Pattern::builder()
            .node(PatternNode::anchor("Mul"))
            .node(PatternNode::consumer("Sub", [(0, 0, 1)]))
            .build()
            .unwrap();
        let graph = graph_of(vec![
            make_node("Mul", &["x", "y"], &["t0"], "n0"),
            make_node("Sub", &["t0", "x"], &["t1"], "n1"),
        ]);
        let ctx = GraphContext::new(&graph);
        assert_eq!(GraphMatcher::new(&ctx).count_matches(&pattern), 0);
    }

    #[test]
    fn test_edges_on_different_output_ports() {
        let pattern = Pattern::builder()
            .node(PatternNode::anchor("Split"))
            .node(PatternNode::consumer("Mul", [(0, 0, 0), (0, 1, 1)]))
            .build()
            .unwrap();

        let wired = graph_of(vec![
            make_node("Split", &["x"], &["s0", "s1"], "split"),
            make_node("Mul", &["s0", "s1"], &["out"], "mul"),
        ]);
        let ctx = GraphContext::new(&wired);
        let m = GraphMatcher::new(&ctx).find_first(&pattern).unwrap();
        assert_eq!(m.node_names(), vec!["split", "mul"]);

        let crossed = graph_of(vec![
            make_node("Split", &["x"], &["s0", "s1"], "split"),
            make_node("Mul", &["s1", "s0"], &["out"], "mul"),
        ]);
        let ctx = GraphContext::new(&crossed);
        assert_eq!(GraphMatcher::new(&ctx).count_matches(&pattern), 0);
    }

    #[test]
    fn test_commutative_consumer_distinct_slots() {
        // Add consumes both Relu and Sigmoid, in either order
        let pattern = Pattern::builder()
            .node(PatternNode::anchor("Relu"))
            .node(PatternNode::consumer("Sigmoid", [(0, 0, 0)]))
            .node(PatternNode::consumer("Add", [(0, 0, 0), (1, 0, 1)]).commutative())
            .build()
            .unwrap();

        for add_inputs in [["r", "s"], ["s", "r"]] {
            let graph = graph_of(vec![
                make_node("Relu", &["x"], &["r"], "relu"),
                make_node("Sigmoid", &["r"], &["s"], "sig"),
                make_node("Add", &add_inputs, &["out"], "add"),
            ]);
            let ctx = GraphContext::new(&graph);
            let matches = GraphMatcher::new(&ctx).match_pattern(&pattern);
            assert_eq!(matches.len(), 1, "inputs {:?}", add_inputs);
            assert_eq!(matches[0][2].name, "add");
        }
    }

    #[test]
    fn test_commutative_consumer_needs_two_slots() {
        // both edges point at Relu's output; Add(r, x) has only one such slot
        let pattern = Pattern::builder()
            .node(PatternNode::anchor("Relu"))
            .node(PatternNode::consumer("Add", [(0, 0, 0), (0, 0, 1)]).commutative())
            .build()
            .unwrap();

        let single = graph_of(vec![
            make_node("Relu", &["x"], &["r"], "relu"),
            make_node("Add", &["r", "x"], &["out"], "add"),
        ]);
        let ctx = GraphContext::new(&single);
        assert_eq!(GraphMatcher::new(&ctx).count_matches(&pattern), 0);

        let double = graph_of(vec![
            make_node("Relu", &["x"], &["r"], "relu"),
            make_node("Add", &["r", "r"], &["out"], "add"),
        ]);
        let ctx = GraphContext::new(&double);
        assert_eq!(GraphMatcher::new(&ctx).count_matches(&pattern), 1);
    }

    #[test]
    fn test_producer_role() {
        let pattern = Pattern::builder()
            .node(PatternNode::anchor("MatMul"))
            .node(PatternNode::producer("Transpose", [(0, 0, 1)]))
            .build()
            .unwrap();
        let graph = graph_of(vec![
            make_node("Transpose", &["y"], &["yt"], "tr"),
            make_node("MatMul", &["x", "yt"], &["out"], "mm"),
        ]);
        let ctx = GraphContext::new(&graph);
        let m = GraphMatcher::new(&ctx).find_first(&pattern).unwrap();
        assert_eq!(m.node_names(), vec!["mm", "tr"]);

        // same Transpose on the other operand does not satisfy port 1
        let swapped = graph_of(vec![
            make_node("Transpose", &["y"], &["yt"], "tr"),
            make_node("MatMul", &["yt", "x"], &["out"], "mm"),
        ]);
        let ctx = GraphContext::new(&swapped);
        assert!(GraphMatcher::new(&ctx).find_first(&pattern).is_none());
    }

    #[test]
    fn test_already_bound_node_is_skipped() {
        let pattern = Pattern::builder()
            .node(PatternNode::anchor("Add"))
            .node(PatternNode::producer("Relu", [(0, 0, 0)]).commutative())
            .node(PatternNode::producer("Relu", [(0, 0, 1)]).commutative())
            .build()
            .unwrap();

        // one Relu feeding both slots cannot fill two pattern positions
        let shared = graph_of(vec![
            make_node("Relu", &["x"], &["r"], "relu"),
            make_node("Add", &["r", "r"], &["out"], "add"),
        ]);
        let ctx = GraphContext::new(&shared);
        assert_eq!(GraphMatcher::new(&ctx).count_matches(&pattern), 0);

        let distinct = graph_of(vec![
            make_node("Relu", &["x"], &["r0"], "relu_0"),
            make_node("Relu", &["y"], &["r1"], "relu_1"),
            make_node("Add", &["r0", "r1"], &["out"], "add"),
        ]);
        let ctx = GraphContext::new(&distinct);
        let m = GraphMatcher::new(&ctx).find_first(&pattern).unwrap();
        assert_eq!(m.node_names(), vec!["add", "relu_0", "relu_1"]);
    }

    #[test]
    fn test_slot_order() {
        assert_eq!(slot_order(1, 3).collect::<Vec<_>>(), vec![1, 0, 2]);
        assert_eq!(slot_order(5, 2).collect::<Vec<_>>(), vec![0, 1]);
    }
}
