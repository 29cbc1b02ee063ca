//! Graph map types and builders
//!
//! Index structures over a borrowed [`GraphProto`]. Nodes are referred to by
//! their position in `graph.node`, so every map stays valid for as long as
//! the graph snapshot is borrowed.

use rustc_hash::{FxHashMap, FxHashSet};
use smallvec::SmallVec;

use crate::proto::{GraphProto, TensorProto, ValueInfoProto};

/// Node positions; most tensors have 1-4 consumers
pub type NodeIndices = SmallVec<[usize; 4]>;

/// output tensor name → producer node position
pub type ProducerMap<'g> = FxHashMap<&'g str, usize>;

/// tensor name → consumer node positions (graph order, deduplicated)
pub type ConsumerMap<'g> = FxHashMap<&'g str, NodeIndices>;

/// op_type → node positions (graph order)
pub type OpTypeMap<'g> = FxHashMap<&'g str, Vec<usize>>;

/// node name → node position
pub type NodeNameMap<'g> = FxHashMap<&'g str, usize>;

/// initializer name → tensor
pub type InitializerMap<'g> = FxHashMap<&'g str, &'g TensorProto>;

/// tensor name → value info (graph inputs, outputs and value_info)
pub type ValueInfoMap<'g> = FxHashMap<&'g str, &'g ValueInfoProto>;

/// tensor name → number of input references
pub type InputCountMap<'g> = FxHashMap<&'g str, usize>;

/// Build producer map from graph nodes
///
/// When a graph violates the single-producer rule the first producer wins.
pub fn build_producer_map(graph: &GraphProto) -> ProducerMap<'_> {
    let mut map = FxHashMap::default();

    for (idx, node) in graph.node.iter().enumerate() {
        for output in node.output.iter().filter(|o| !o.is_empty()) {
            map.entry(output.as_str()).or_insert(idx);
        }
    }

    map
}

/// Build consumer map from graph nodes
pub fn build_consumer_map(graph: &GraphProto) -> ConsumerMap<'_> {
    let mut map: ConsumerMap<'_> = FxHashMap::default();

    for (idx, node) in graph.node.iter().enumerate() {
        for input in node.input.iter().filter(|i| !i.is_empty()) {
            let consumers = map.entry(input.as_str()).or_default();
            if consumers.last() != Some(&idx) {
                consumers.push(idx);
            }
        }
    }

    map
}

/// Build op_type index, the anchor candidate source for matching
pub fn build_op_type_map(graph: &GraphProto) -> OpTypeMap<'_> {
    let mut map: OpTypeMap<'_> = FxHashMap::default();

    for (idx, node) in graph.node.iter().enumerate() {
        map.entry(node.op_type.as_str()).or_default().push(idx);
    }

    map
}

/// Build node name index (unnamed nodes are skipped)
pub fn build_node_name_map(graph: &GraphProto) -> NodeNameMap<'_> {
    graph
        .node
        .iter()
        .enumerate()
        .filter(|(_, n)| !n.name.is_empty())
        .map(|(idx, n)| (n.name.as_str(), idx))
        .collect()
}

/// Build initializer map from graph
pub fn build_initializer_map(graph: &GraphProto) -> InitializerMap<'_> {
    graph
        .initializer
        .iter()
        .map(|t| (t.name.as_str(), t))
        .collect()
}

/// Build value info map from graph
///
/// Combines graph inputs, outputs, and intermediate value_info.
pub fn build_value_info_map(graph: &GraphProto) -> ValueInfoMap<'_> {
    graph
        .input
        .iter()
        .chain(&graph.output)
        .chain(&graph.value_info)
        .map(|vi| (vi.name.as_str(), vi))
        .collect()
}

/// Build input count map (reference counting for tensors)
pub fn build_input_count_map(graph: &GraphProto) -> InputCountMap<'_> {
    let mut map: InputCountMap<'_> = FxHashMap::default();

    for input in graph.node.iter().flat_map(|n| &n.input) {
        if !input.is_empty() {
            *map.entry(input.as_str()).or_insert(0) += 1;
        }
    }

    map
}

/// Collect the names of a value-info list
pub fn build_name_set(infos: &[ValueInfoProto]) -> FxHashSet<&str> {
    infos.iter().map(|vi| vi.name.as_str()).collect()
}
