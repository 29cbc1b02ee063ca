//! Higher-level graph queries used by match guards and rewrite callbacks

use crate::proto::{tensor_shape_proto::dimension, NodeProto};

use super::context::GraphContext;

/// One dimension of a declared shape
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Dim {
    /// Fixed size
    Fixed(i64),
    /// Named symbolic size
    Symbolic(String),
    /// Declared but unset
    Unknown,
}

/// Element type and shape of a tensor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeAndShape {
    /// ONNX element type (`tensor_proto::DataType` as i32)
    pub elem_type: i32,
    /// Dimensions
    pub shape: Vec<Dim>,
}

impl TypeAndShape {
    /// Rank of the shape
    pub fn rank(&self) -> usize {
        self.shape.len()
    }
}

impl<'g> GraphContext<'g> {
    /// Find nodes by op type, in graph order
    pub fn find_nodes_by_op(&self, op_type: &str) -> Vec<&'g NodeProto> {
        self.op_type_positions(op_type)
            .iter()
            .filter_map(|&idx| self.node(idx))
            .collect()
    }

    /// Check if a tensor is consumed exactly once and is not a graph output
    pub fn is_single_use(&self, tensor_name: &str) -> bool {
        self.consumer_count(tensor_name) == 1 && !self.is_graph_output(tensor_name)
    }

    /// Declared type and shape of a tensor
    ///
    /// Value-info (graph inputs, outputs, intermediate) is consulted first,
    /// then initializers. A value-info without a shape yields `None`.
    pub fn get_type_and_shape(&self, name: &str) -> Option<TypeAndShape> {
        if let Some(vi) = self.get_value_info(name) {
            let tensor = match vi.r#type.as_ref().and_then(|t| t.value.as_ref()) {
                Some(crate::proto::type_proto::Value::TensorType(tensor)) => tensor,
                None => return None,
            };
            let shape = tensor.shape.as_ref()?;
            return Some(TypeAndShape {
                elem_type: tensor.elem_type,
                shape: shape
                    .dim
                    .iter()
                    .map(|d| match &d.value {
                        Some(dimension::Value::DimValue(v)) => Dim::Fixed(*v),
                        Some(dimension::Value::DimParam(p)) => Dim::Symbolic(p.clone()),
                        None => Dim::Unknown,
                    })
                    .collect(),
            });
        }

        self.get_initializer(name).map(|init| TypeAndShape {
            elem_type: init.data_type,
            shape: init.dims.iter().map(|&d| Dim::Fixed(d)).collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proto::extensions::{make_node, make_tensor_value_info};
    use crate::proto::{
        tensor_shape_proto, type_proto, GraphProto, TensorProto, TensorShapeProto, TypeProto,
        ValueInfoProto,
    };

    fn make_test_graph() -> GraphProto {
        let symbolic = ValueInfoProto {
            name: "X".to_string(),
            r#type: Some(TypeProto {
                value: Some(type_proto::Value::TensorType(type_proto::Tensor {
                    elem_type: 1,
                    shape: Some(TensorShapeProto {
                        dim: vec![
                            tensor_shape_proto::Dimension {
                                value: Some(dimension::Value::DimParam("batch".to_string())),
                                denotation: String::new(),
                            },
                            tensor_shape_proto::Dimension {
                                value: Some(dimension::Value::DimValue(768)),
                                denotation: String::new(),
                            },
                        ],
                    }),
                })),
                denotation: String::new(),
            }),
            doc_string: String::new(),
        };

        GraphProto {
            node: vec![
                make_node("Add", &["X", "B"], &["add_out"], "add_0"),
                make_node("Gelu", &["add_out"], &["Y"], "gelu_0"),
            ],
            input: vec![symbolic],
            output: vec![make_tensor_value_info("Y", 1, &[4, 768])],
            initializer: vec![TensorProto {
                name: "B".to_string(),
                dims: vec![768],
                data_type: 1,
                ..Default::default()
            }],
            ..Default::default()
        }
    }

    #[test]
    fn test_type_and_shape_from_value_info() {
        let graph = make_test_graph();
        let ctx = GraphContext::new(&graph);

        let ts = ctx.get_type_and_shape("X").unwrap();
        assert_eq!(ts.elem_type, 1);
        assert_eq!(
            ts.shape,
            vec![Dim::Symbolic("batch".to_string()), Dim::Fixed(768)]
        );
    }

    #[test]
    fn test_type_and_shape_from_initializer() {
        let graph = make_test_graph();
        let ctx = GraphContext::new(&graph);

        let ts = ctx.get_type_and_shape("B").unwrap();
        assert_eq!(ts.rank(), 1);
        assert!(ctx.get_type_and_shape("add_out").is_none());
    }

    #[test]
    fn test_is_single_use() {
        let graph = make_test_graph();
        let ctx = GraphContext::new(&graph);

        assert!(ctx.is_single_use("add_out"));
        assert!(!ctx.is_single_use("Y")); // graph output, no consumers
    }

    #[test]
    fn test_find_nodes_by_op() {
        let graph = make_test_graph();
        let ctx = GraphContext::new(&graph);

        assert_eq!(ctx.find_nodes_by_op("Gelu")[0].name, "gelu_0");
        assert!(ctx.find_nodes_by_op("Softmax").is_empty());
    }
}
