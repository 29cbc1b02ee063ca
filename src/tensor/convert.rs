//! Tensor conversion utilities
//!
//! Decode `TensorProto` payloads (typed fields or little-endian `raw_data`)
//! into ndarray arrays, and build small constant tensors.

use half::{bf16, f16};
use ndarray::{ArrayD, IxDyn};

use crate::error::{OnnxResult, TransformError};
use crate::proto::tensor_proto::DataType;
use crate::proto::TensorProto;

use super::dtype::{dtype_size, i32_to_dtype};

/// Decode a floating-point tensor into an f32 array
pub fn tensor_to_array_f32(tensor: &TensorProto) -> OnnxResult<ArrayD<f32>> {
    let dtype = i32_to_dtype(tensor.data_type)?;

    let data: Vec<f32> = if tensor.has_raw_data() {
        let chunks = raw_chunks(tensor, dtype)?;
        match dtype {
            DataType::Float => chunks
                .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
                .collect(),
            DataType::Double => chunks
                .map(|b| {
                    f64::from_le_bytes([b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7]]) as f32
                })
                .collect(),
            DataType::Float16 => chunks
                .map(|b| f16::from_le_bytes([b[0], b[1]]).to_f32())
                .collect(),
            DataType::Bfloat16 => chunks
                .map(|b| bf16::from_le_bytes([b[0], b[1]]).to_f32())
                .collect(),
            _ => return Err(TransformError::InvalidDataType(tensor.data_type)),
        }
    } else {
        match dtype {
            DataType::Float => tensor.float_data.clone(),
            DataType::Double => tensor.double_data.iter().map(|&v| v as f32).collect(),
            // half types keep their bit patterns in the low 16 bits of int32_data
            DataType::Float16 => tensor
                .int32_data
                .iter()
                .map(|&v| f16::from_bits(v as u16).to_f32())
                .collect(),
            DataType::Bfloat16 => tensor
                .int32_data
                .iter()
                .map(|&v| bf16::from_bits(v as u16).to_f32())
                .collect(),
            _ => return Err(TransformError::InvalidDataType(tensor.data_type)),
        }
    };

    into_array(tensor, data)
}

/// Decode an integer (or bool) tensor into an i64 array
pub fn tensor_to_array_i64(tensor: &TensorProto) -> OnnxResult<ArrayD<i64>> {
    let dtype = i32_to_dtype(tensor.data_type)?;

    let data: Vec<i64> = if tensor.has_raw_data() {
        let chunks = raw_chunks(tensor, dtype)?;
        match dtype {
            DataType::Int64 => chunks
                .map(|b| i64::from_le_bytes([b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7]]))
                .collect(),
            DataType::Uint64 => chunks
                .map(|b| {
                    u64::from_le_bytes([b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7]]) as i64
                })
                .collect(),
            DataType::Int32 => chunks
                .map(|b| i32::from_le_bytes([b[0], b[1], b[2], b[3]]) as i64)
                .collect(),
            DataType::Uint32 => chunks
                .map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]) as i64)
                .collect(),
            DataType::Int16 => chunks
                .map(|b| i16::from_le_bytes([b[0], b[1]]) as i64)
                .collect(),
            DataType::Uint16 => chunks
                .map(|b| u16::from_le_bytes([b[0], b[1]]) as i64)
                .collect(),
            DataType::Int8 => chunks.map(|b| b[0] as i8 as i64).collect(),
            DataType::Uint8 | DataType::Bool => chunks.map(|b| b[0] as i64).collect(),
            _ => return Err(TransformError::InvalidDataType(tensor.data_type)),
        }
    } else {
        match dtype {
            DataType::Int64 => tensor.int64_data.clone(),
            DataType::Uint32 | DataType::Uint64 => {
                tensor.uint64_data.iter().map(|&v| v as i64).collect()
            }
            DataType::Int32
            | DataType::Int16
            | DataType::Int8
            | DataType::Uint16
            | DataType::Uint8
            | DataType::Bool => tensor.int32_data.iter().map(|&v| v as i64).collect(),
            _ => return Err(TransformError::InvalidDataType(tensor.data_type)),
        }
    };

    into_array(tensor, data)
}

/// Create scalar TensorProto from f32
pub fn scalar_to_tensor_f32(value: f32, name: &str) -> TensorProto {
    TensorProto {
        dims: vec![],
        data_type: DataType::Float as i32,
        float_data: vec![value],
        name: name.to_string(),
        ..Default::default()
    }
}

/// Create scalar TensorProto from i64
pub fn scalar_to_tensor_i64(value: i64, name: &str) -> TensorProto {
    TensorProto {
        dims: vec![],
        data_type: DataType::Int64 as i32,
        int64_data: vec![value],
        name: name.to_string(),
        ..Default::default()
    }
}

/// Create 1D TensorProto from f32 slice
pub fn vec_to_tensor_f32(data: &[f32], name: &str) -> TensorProto {
    TensorProto {
        dims: vec![data.len() as i64],
        data_type: DataType::Float as i32,
        float_data: data.to_vec(),
        name: name.to_string(),
        ..Default::default()
    }
}

/// Create 1D TensorProto from i64 slice
pub fn vec_to_tensor_i64(data: &[i64], name: &str) -> TensorProto {
    TensorProto {
        dims: vec![data.len() as i64],
        data_type: DataType::Int64 as i32,
        int64_data: data.to_vec(),
        name: name.to_string(),
        ..Default::default()
    }
}

// ============================================================================
// Internal helpers
// ============================================================================

fn raw_chunks(
    tensor: &TensorProto,
    dtype: DataType,
) -> OnnxResult<std::slice::ChunksExact<'_, u8>> {
    let elem_size = dtype_size(dtype)?;
    let expected = tensor
        .num_elements()
        .and_then(|n| n.checked_mul(elem_size))
        .ok_or_else(|| too_large(tensor))?;
    if tensor.raw_data.len() != expected {
        return Err(TransformError::ShapeMismatch(format!(
            "raw data of '{}' has {} bytes, expected {}",
            tensor.name,
            tensor.raw_data.len(),
            expected
        )));
    }
    Ok(tensor.raw_data.chunks_exact(elem_size))
}

fn into_array<T>(tensor: &TensorProto, data: Vec<T>) -> OnnxResult<ArrayD<T>> {
    let expected = tensor.num_elements().ok_or_else(|| too_large(tensor))?;
    if data.len() != expected {
        return Err(TransformError::ShapeMismatch(format!(
            "'{}' holds {} elements, dims {:?} need {}",
            tensor.name,
            data.len(),
            tensor.dims,
            expected
        )));
    }

    let shape: Vec<usize> = tensor.dims.iter().map(|&d| d.max(0) as usize).collect();
    ArrayD::from_shape_vec(IxDyn(&shape), data)
        .map_err(|e| TransformError::Internal(e.to_string()))
}

fn too_large(tensor: &TensorProto) -> TransformError {
    TransformError::ShapeMismatch(format!(
        "dims {:?} of '{}' overflow the element count",
        tensor.dims, tensor.name
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tensor_to_array_f32_float_data() {
        let tensor = TensorProto {
            dims: vec![2, 3],
            data_type: DataType::Float as i32,
            float_data: vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0],
            ..Default::default()
        };

        let array = tensor_to_array_f32(&tensor).unwrap();
        assert_eq!(array.shape(), &[2, 3]);
        assert_eq!(array[[1, 2]], 6.0);
    }

    #[test]
    fn test_tensor_to_array_f32_raw_data() {
        let raw: Vec<u8> = [1.5f32, -2.0f32].iter().flat_map(|f| f.to_le_bytes()).collect();
        let tensor = TensorProto {
            dims: vec![2],
            data_type: DataType::Float as i32,
            raw_data: raw,
            ..Default::default()
        };

        let array = tensor_to_array_f32(&tensor).unwrap();
        assert_eq!(array.as_slice().unwrap(), &[1.5, -2.0]);
    }

    #[test]
    fn test_tensor_to_array_i64_raw_int32() {
        let raw: Vec<u8> = [7i32, -1i32].iter().flat_map(|v| v.to_le_bytes()).collect();
        let tensor = TensorProto {
            dims: vec![2],
            data_type: DataType::Int32 as i32,
            raw_data: raw,
            ..Default::default()
        };

        let array = tensor_to_array_i64(&tensor).unwrap();
        assert_eq!(array.as_slice().unwrap(), &[7, -1]);
    }

    #[test]
    fn test_scalar_tensor() {
        let array = tensor_to_array_f32(&scalar_to_tensor_f32(8.0, "scale")).unwrap();
        assert_eq!(array.ndim(), 0);
        assert_eq!(array.iter().copied().collect::<Vec<_>>(), vec![8.0]);
    }

    #[test]
    fn test_length_mismatch() {
        let tensor = TensorProto {
            dims: vec![3],
            data_type: DataType::Int64 as i32,
            int64_data: vec![1, 2],
            ..Default::default()
        };
        assert!(matches!(
            tensor_to_array_i64(&tensor),
            Err(TransformError::ShapeMismatch(_))
        ));
    }

    #[test]
    fn test_wrong_family() {
        let tensor = vec_to_tensor_i64(&[1, 2, 3], "axes");
        assert!(tensor_to_array_f32(&tensor).is_err());
        assert_eq!(tensor_to_array_i64(&tensor).unwrap().len(), 3);
    }

    #[test]
    fn test_overflowing_dims() {
        let tensor = TensorProto {
            dims: vec![1 << 40, 1 << 40],
            data_type: DataType::Float as i32,
            raw_data: vec![0; 4],
            ..Default::default()
        };
        assert!(matches!(
            tensor_to_array_f32(&tensor),
            Err(TransformError::ShapeMismatch(_))
        ));
    }

    #[test]
    fn test_half_precision() {
        let fp16 = TensorProto {
            dims: vec![2],
            data_type: DataType::Float16 as i32,
            raw_data: vec![0x00, 0x3C, 0x00, 0xB8],
            ..Default::default()
        };
        assert_eq!(tensor_to_array_f32(&fp16).unwrap().as_slice().unwrap(), &[1.0, -0.5]);

        let bf16_typed = TensorProto {
            dims: vec![],
            data_type: DataType::Bfloat16 as i32,
            int32_data: vec![i32::from(bf16::from_f32(0.125).to_bits())],
            ..Default::default()
        };
        assert_eq!(tensor_to_array_f32(&bf16_typed).unwrap().iter().next(), Some(&0.125));
    }
}
