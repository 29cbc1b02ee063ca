//! Graph context
//!
//! `GraphContext` is an immutable snapshot of a [`GraphProto`] with the maps
//! needed for matching: producers, consumers, op types, initializers and
//! value-info. It borrows the graph, so the graph cannot change while a
//! context (and any match taken from it) is alive.

use rustc_hash::FxHashSet;

use crate::proto::{GraphProto, NodeProto, TensorProto, ValueInfoProto};

use super::maps::{
    build_consumer_map, build_initializer_map, build_input_count_map, build_name_set,
    build_node_name_map, build_op_type_map, build_producer_map, build_value_info_map,
    ConsumerMap, InitializerMap, InputCountMap, NodeNameMap, OpTypeMap, ProducerMap,
    ValueInfoMap,
};

/// Read-only graph snapshot with O(1) lookups
#[derive(Debug)]
pub struct GraphContext<'g> {
    graph: &'g GraphProto,

    /// Maps output tensor name → producer node position
    pub producer_map: ProducerMap<'g>,

    /// Maps tensor name → consumer node positions
    pub consumer_map: ConsumerMap<'g>,

    /// Maps op_type → node positions
    pub op_type_map: OpTypeMap<'g>,

    /// Maps node name → node position
    pub node_name_map: NodeNameMap<'g>,

    /// Maps initializer name → TensorProto
    pub initializer_map: InitializerMap<'g>,

    /// Maps tensor name → ValueInfoProto (inputs + outputs + value_info)
    pub value_info_map: ValueInfoMap<'g>,

    /// Maps tensor name → reference count
    pub input_count_map: InputCountMap<'g>,

    graph_inputs: FxHashSet<&'g str>,
    graph_outputs: FxHashSet<&'g str>,
}

impl<'g> GraphContext<'g> {
    /// Create a new GraphContext from a GraphProto
    pub fn new(graph: &'g GraphProto) -> Self {
        Self {
            graph,
            producer_map: build_producer_map(graph),
            consumer_map: build_consumer_map(graph),
            op_type_map: build_op_type_map(graph),
            node_name_map: build_node_name_map(graph),
            initializer_map: build_initializer_map(graph),
            value_info_map: build_value_info_map(graph),
            input_count_map: build_input_count_map(graph),
            graph_inputs: build_name_set(&graph.input),
            graph_outputs: build_name_set(&graph.output),
        }
    }

    /// The underlying graph
    pub fn graph(&self) -> &'g GraphProto {
        self.graph
    }

    // ========================================================================
    // Node accessors
    // ========================================================================

    /// Get a node by position
    pub fn node(&self, index: usize) -> Option<&'g NodeProto> {
        self.graph.node.get(index)
    }

    /// Get a node by name
    pub fn get_node(&self, name: &str) -> Option<&'g NodeProto> {
        self.node_name_map
            .get(name)
            .and_then(|&idx| self.node(idx))
    }

    /// Position of a named node
    pub fn position(&self, name: &str) -> Option<usize> {
        self.node_name_map.get(name).copied()
    }

    /// Check if a node exists
    pub fn has_node(&self, name: &str) -> bool {
        self.node_name_map.contains_key(name)
    }

    /// Get the number of nodes
    pub fn node_count(&self) -> usize {
        self.graph.node.len()
    }

    /// Iterate over all nodes in graph order
    pub fn nodes(&self) -> impl Iterator<Item = &'g NodeProto> {
        self.graph.node.iter()
    }

    /// Positions of nodes with the given op type, in graph order
    pub fn op_type_positions(&self, op_type: &str) -> &[usize] {
        self.op_type_map
            .get(op_type)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    // ========================================================================
    // Graph traversal
    // ========================================================================

    /// Position of the node producing a tensor
    pub fn producer_position(&self, tensor_name: &str) -> Option<usize> {
        self.producer_map.get(tensor_name).copied()
    }

    /// Get the producer node for a tensor
    pub fn get_producer(&self, tensor_name: &str) -> Option<&'g NodeProto> {
        self.producer_position(tensor_name)
            .and_then(|idx| self.node(idx))
    }

    /// Positions of nodes consuming a tensor, in graph order
    pub fn consumer_positions(&self, tensor_name: &str) -> &[usize] {
        self.consumer_map
            .get(tensor_name)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    /// Get consumer nodes for a tensor
    pub fn get_consumers(&self, tensor_name: &str) -> Vec<&'g NodeProto> {
        self.consumer_positions(tensor_name)
            .iter()
            .filter_map(|&idx| self.node(idx))
            .collect()
    }

    /// Number of input references to a tensor across all nodes
    pub fn consumer_count(&self, tensor_name: &str) -> usize {
        self.input_count_map.get(tensor_name).copied().unwrap_or(0)
    }

    /// Check if a tensor is a graph input
    pub fn is_graph_input(&self, name: &str) -> bool {
        self.graph_inputs.contains(name)
    }

    /// Check if a tensor is a graph output
    pub fn is_graph_output(&self, name: &str) -> bool {
        self.graph_outputs.contains(name)
    }

    /// Check if a tensor is an initializer
    pub fn is_initializer(&self, name: &str) -> bool {
        self.initializer_map.contains_key(name)
    }

    // ========================================================================
    // Value info and initializer accessors
    // ========================================================================

    /// Get value info for a tensor
    pub fn get_value_info(&self, name: &str) -> Option<&'g ValueInfoProto> {
        self.value_info_map.get(name).copied()
    }

    /// Get initializer by name
    pub fn get_initializer(&self, name: &str) -> Option<&'g TensorProto> {
        self.initializer_map.get(name).copied()
    }
}
