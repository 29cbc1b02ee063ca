//! ONNX graph message types
//!
//! The host graph is modeled with ONNX's message layout. The types live in
//! [`onnx`]; construction helpers and accessors are in [`extensions`].

pub mod onnx;

// Re-export commonly used types at module level
pub use onnx::{
    AttributeProto, GraphProto, NodeProto, TensorProto, TensorShapeProto, TypeProto,
    ValueInfoProto,
};

// Re-export submodules for nested types
pub use onnx::attribute_proto;
pub use onnx::tensor_proto;
pub use onnx::tensor_shape_proto;
pub use onnx::type_proto;

/// Extension methods for ONNX message types
pub mod extensions;

#[cfg(test)]
mod tests {
    use super::*;
    use prost::Message;

    #[test]
    fn test_node_proto_default() {
        let node = NodeProto::default();
        assert!(node.input.is_empty());
        assert!(node.output.is_empty());
    }

    #[test]
    fn test_graph_wire_compatible() {
        let graph = GraphProto {
            node: vec![extensions::make_node("Relu", &["X"], &["Y"], "relu_0")],
            name: "g".to_string(),
            ..Default::default()
        };

        let bytes = graph.encode_to_vec();
        let decoded = GraphProto::decode(bytes.as_slice()).unwrap();
        assert_eq!(decoded, graph);
    }
}
