//! Extension methods for ONNX message types
//!
//! Provides convenient helper methods for working with nodes, attributes and
//! value-infos.

use super::onnx::*;

// ============================================================================
// NodeProto extensions
// ============================================================================

impl NodeProto {
    /// Get attribute by name
    pub fn get_attribute(&self, name: &str) -> Option<&AttributeProto> {
        self.attribute.iter().find(|attr| attr.name == name)
    }

    /// Get integer attribute value with default
    pub fn get_attribute_int(&self, name: &str, default: i64) -> i64 {
        self.get_attribute(name).map(|a| a.i).unwrap_or(default)
    }

    /// Input name at `index`, `None` when out of range or an absent optional slot
    pub fn input_at(&self, index: usize) -> Option<&str> {
        self.input
            .get(index)
            .map(String::as_str)
            .filter(|s| !s.is_empty())
    }

    /// Output name at `index`, `None` when out of range or unused
    pub fn output_at(&self, index: usize) -> Option<&str> {
        self.output
            .get(index)
            .map(String::as_str)
            .filter(|s| !s.is_empty())
    }

    /// Add an attribute, builder style
    pub fn with_attribute(mut self, attr: AttributeProto) -> Self {
        self.attribute.push(attr);
        self
    }
}

// ============================================================================
// ValueInfoProto extensions
// ============================================================================

impl ValueInfoProto {
    /// Get the shape dimensions if available (symbolic dims become -1)
    pub fn get_shape(&self) -> Option<Vec<i64>> {
        self.tensor_type().and_then(|tensor| {
            tensor.shape.as_ref().map(|s| {
                s.dim
                    .iter()
                    .map(|d| match &d.value {
                        Some(tensor_shape_proto::dimension::Value::DimValue(v)) => *v,
                        Some(tensor_shape_proto::dimension::Value::DimParam(_)) => -1,
                        None => -1,
                    })
                    .collect()
            })
        })
    }

    /// Get the element type if this is a tensor type
    pub fn get_elem_type(&self) -> Option<i32> {
        self.tensor_type().map(|tensor| tensor.elem_type)
    }

    fn tensor_type(&self) -> Option<&type_proto::Tensor> {
        self.r#type.as_ref().and_then(|t| match &t.value {
            Some(type_proto::Value::TensorType(tensor)) => Some(tensor),
            None => None,
        })
    }
}

// ============================================================================
// TensorProto extensions
// ============================================================================

impl TensorProto {
    /// Total number of elements, `None` if the dims overflow `usize`
    pub fn num_elements(&self) -> Option<usize> {
        self.dims
            .iter()
            .try_fold(1usize, |acc, &d| acc.checked_mul(d.max(0) as usize))
    }

    /// Check if this tensor has raw_data
    pub fn has_raw_data(&self) -> bool {
        !self.raw_data.is_empty()
    }
}

// ============================================================================
// AttributeProto extensions
// ============================================================================

impl AttributeProto {
    /// Create a new integer attribute
    pub fn new_int(name: &str, value: i64) -> Self {
        Self {
            name: name.to_string(),
            i: value,
            r#type: attribute_proto::AttributeType::Int as i32,
            ..Default::default()
        }
    }

    /// Create a new float attribute
    pub fn new_float(name: &str, value: f32) -> Self {
        Self {
            name: name.to_string(),
            f: value,
            r#type: attribute_proto::AttributeType::Float as i32,
            ..Default::default()
        }
    }

    /// Create a new string attribute
    pub fn new_string(name: &str, value: &str) -> Self {
        Self {
            name: name.to_string(),
            s: value.as_bytes().to_vec(),
            r#type: attribute_proto::AttributeType::String as i32,
            ..Default::default()
        }
    }

    /// Create a new ints attribute
    pub fn new_ints(name: &str, values: Vec<i64>) -> Self {
        Self {
            name: name.to_string(),
            ints: values,
            r#type: attribute_proto::AttributeType::Ints as i32,
            ..Default::default()
        }
    }

    /// Create a new floats attribute
    pub fn new_floats(name: &str, values: Vec<f32>) -> Self {
        Self {
            name: name.to_string(),
            floats: values,
            r#type: attribute_proto::AttributeType::Floats as i32,
            ..Default::default()
        }
    }

    /// Create a new tensor attribute
    pub fn new_tensor(name: &str, tensor: TensorProto) -> Self {
        Self {
            name: name.to_string(),
            t: Some(tensor),
            r#type: attribute_proto::AttributeType::Tensor as i32,
            ..Default::default()
        }
    }
}

// ============================================================================
// Helper functions
// ============================================================================

/// Create a new ValueInfoProto for a tensor
pub fn make_tensor_value_info(name: &str, elem_type: i32, shape: &[i64]) -> ValueInfoProto {
    ValueInfoProto {
        name: name.to_string(),
        r#type: Some(TypeProto {
            value: Some(type_proto::Value::TensorType(type_proto::Tensor {
                elem_type,
                shape: Some(TensorShapeProto {
                    dim: shape
                        .iter()
                        .map(|&d| tensor_shape_proto::Dimension {
                            value: Some(tensor_shape_proto::dimension::Value::DimValue(d)),
                            denotation: String::new(),
                        })
                        .collect(),
                }),
            })),
            denotation: String::new(),
        }),
        doc_string: String::new(),
    }
}

/// Create a new NodeProto
pub fn make_node(op_type: &str, inputs: &[&str], outputs: &[&str], name: &str) -> NodeProto {
    NodeProto {
        op_type: op_type.to_string(),
        input: inputs.iter().map(|s| s.to_string()).collect(),
        output: outputs.iter().map(|s| s.to_string()).collect(),
        name: name.to_string(),
        ..Default::default()
    }
}

/// Create a new NodeProto in a custom operator domain
pub fn make_node_with_domain(
    op_type: &str,
    domain: &str,
    inputs: &[&str],
    outputs: &[&str],
    name: &str,
) -> NodeProto {
    NodeProto {
        domain: domain.to_string(),
        ..make_node(op_type, inputs, outputs, name)
    }
}
