//! Match guards
//!
//! Constant resolution and attribute checks that rewrite callbacks run on a
//! topological match before accepting it. Neither ever fails loudly: an
//! unresolvable constant is `None`, a missing attribute is `false`.

use ndarray::{ArrayD, IxDyn};
use tracing::trace;

use crate::graph::GraphContext;
use crate::proto::attribute_proto::AttributeType;
use crate::proto::{AttributeProto, NodeProto, TensorProto};
use crate::tensor::{
    i32_to_dtype, is_float_type, is_int_type, tensor_to_array_f32, tensor_to_array_i64,
};

/// Identity chains longer than this are treated as unknown
pub const MAX_IDENTITY_HOPS: usize = 8;

// ============================================================================
// Constant values
// ============================================================================

/// Compile-time value of a tensor
#[derive(Debug, Clone, PartialEq)]
pub enum ConstantValue {
    /// Float family (float, double), widened or narrowed to f32
    Float(ArrayD<f32>),
    /// Integer family and bool, widened to i64
    Int(ArrayD<i64>),
}

impl ConstantValue {
    /// Shape of the value
    pub fn shape(&self) -> &[usize] {
        match self {
            ConstantValue::Float(a) => a.shape(),
            ConstantValue::Int(a) => a.shape(),
        }
    }

    /// Number of dimensions
    pub fn ndim(&self) -> usize {
        self.shape().len()
    }

    /// Collapse a single-element float value
    pub fn as_f32_scalar(&self) -> Option<f32> {
        match self {
            ConstantValue::Float(a) if a.len() == 1 => a.iter().next().copied(),
            _ => None,
        }
    }

    /// Collapse a single-element integer value
    pub fn as_i64_scalar(&self) -> Option<i64> {
        match self {
            ConstantValue::Int(a) if a.len() == 1 => a.iter().next().copied(),
            _ => None,
        }
    }

    /// Flattened float values
    pub fn to_f32_vec(&self) -> Option<Vec<f32>> {
        match self {
            ConstantValue::Float(a) => Some(a.iter().copied().collect()),
            ConstantValue::Int(_) => None,
        }
    }

    /// Flattened integer values
    pub fn to_i64_vec(&self) -> Option<Vec<i64>> {
        match self {
            ConstantValue::Int(a) => Some(a.iter().copied().collect()),
            ConstantValue::Float(_) => None,
        }
    }

    fn from_tensor(tensor: &TensorProto) -> Option<Self> {
        let dtype = i32_to_dtype(tensor.data_type).ok()?;
        let decoded = if is_float_type(dtype) {
            tensor_to_array_f32(tensor).map(ConstantValue::Float)
        } else if is_int_type(dtype) {
            tensor_to_array_i64(tensor).map(ConstantValue::Int)
        } else {
            return None;
        };

        match decoded {
            Ok(value) => Some(value),
            Err(e) => {
                trace!(tensor = %tensor.name, error = %e, "constant not decodable");
                None
            }
        }
    }

    fn from_vec_f32(values: Vec<f32>, shape: &[usize]) -> Option<Self> {
        ArrayD::from_shape_vec(IxDyn(shape), values)
            .ok()
            .map(ConstantValue::Float)
    }

    fn from_vec_i64(values: Vec<i64>, shape: &[usize]) -> Option<Self> {
        ArrayD::from_shape_vec(IxDyn(shape), values)
            .ok()
            .map(ConstantValue::Int)
    }
}

// ============================================================================
// Constant resolver
// ============================================================================

/// Resolves tensor names to compile-time values
///
/// Recognizes initializers, outputs of input-less `Constant` nodes and
/// `Identity` chains over either.
pub struct ConstantResolver<'c, 'g> {
    ctx: &'c GraphContext<'g>,
}

impl<'c, 'g> ConstantResolver<'c, 'g> {
    /// Create a resolver over a graph snapshot
    pub fn new(ctx: &'c GraphContext<'g>) -> Self {
        Self { ctx }
    }

    /// Value of `tensor_name`, `None` when unknown at compile time
    pub fn resolve(&self, tensor_name: &str) -> Option<ConstantValue> {
        let mut name = tensor_name;

        for _ in 0..=MAX_IDENTITY_HOPS {
            if let Some(init) = self.ctx.get_initializer(name) {
                return ConstantValue::from_tensor(init);
            }

            let producer = self.ctx.get_producer(name)?;
            match producer.op_type.as_str() {
                "Constant" if producer.input.iter().all(String::is_empty) => {
                    return constant_node_value(producer);
                }
                "Identity" if producer.domain.is_empty() => {
                    name = producer.input_at(0)?;
                }
                _ => return None,
            }
        }

        trace!(tensor = tensor_name, "identity chain too long");
        None
    }
}

impl<'g> GraphContext<'g> {
    /// Compile-time value of a tensor, see [`ConstantResolver`]
    pub fn get_constant_value(&self, tensor_name: &str) -> Option<ConstantValue> {
        ConstantResolver::new(self).resolve(tensor_name)
    }
}

/// Decode the value attribute of a `Constant` node
fn constant_node_value(node: &NodeProto) -> Option<ConstantValue> {
    node.attribute.iter().find_map(|attr| match attr.name.as_str() {
        "value" => attr.t.as_ref().and_then(ConstantValue::from_tensor),
        "value_float" => ConstantValue::from_vec_f32(vec![attr.f], &[]),
        "value_floats" => {
            ConstantValue::from_vec_f32(attr.floats.clone(), &[attr.floats.len()])
        }
        "value_int" => ConstantValue::from_vec_i64(vec![attr.i], &[]),
        "value_ints" => ConstantValue::from_vec_i64(attr.ints.clone(), &[attr.ints.len()]),
        _ => None,
    })
}

// ============================================================================
// Attribute checker
// ============================================================================

/// Expected attribute value
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValue {
    /// Single float
    Float(f32),
    /// Single int
    Int(i64),
    /// UTF-8 string
    String(String),
    /// Float list
    Floats(Vec<f32>),
    /// Int list
    Ints(Vec<i64>),
    /// String list
    Strings(Vec<String>),
}

impl AttributeValue {
    /// Read an attribute by its declared type
    ///
    /// Tensor and graph attributes have no comparable value here.
    pub fn from_proto(attr: &AttributeProto) -> Option<Self> {
        let kind = AttributeType::try_from(attr.r#type).ok()?;
        let value = match kind {
            AttributeType::Float => AttributeValue::Float(attr.f),
            AttributeType::Int => AttributeValue::Int(attr.i),
            AttributeType::String => {
                AttributeValue::String(String::from_utf8_lossy(&attr.s).into_owned())
            }
            AttributeType::Floats => AttributeValue::Floats(attr.floats.clone()),
            AttributeType::Ints => AttributeValue::Ints(attr.ints.clone()),
            AttributeType::Strings => AttributeValue::Strings(
                attr.strings
                    .iter()
                    .map(|s| String::from_utf8_lossy(s).into_owned())
                    .collect(),
            ),
            _ => return None,
        };
        Some(value)
    }
}

impl From<i64> for AttributeValue {
    fn from(v: i64) -> Self {
        AttributeValue::Int(v)
    }
}

impl From<f32> for AttributeValue {
    fn from(v: f32) -> Self {
        AttributeValue::Float(v)
    }
}

impl From<&str> for AttributeValue {
    fn from(v: &str) -> Self {
        AttributeValue::String(v.to_string())
    }
}

impl From<Vec<i64>> for AttributeValue {
    fn from(v: Vec<i64>) -> Self {
        AttributeValue::Ints(v)
    }
}

impl From<&[i64]> for AttributeValue {
    fn from(v: &[i64]) -> Self {
        AttributeValue::Ints(v.to_vec())
    }
}

impl From<Vec<f32>> for AttributeValue {
    fn from(v: Vec<f32>) -> Self {
        AttributeValue::Floats(v)
    }
}

/// True iff `node` declares `name` with exactly `expected`
pub fn check_attribute_value(node: &NodeProto, name: &str, expected: &AttributeValue) -> bool {
    node.get_attribute(name)
        .and_then(AttributeValue::from_proto)
        .is_some_and(|actual| &actual == expected)
}
