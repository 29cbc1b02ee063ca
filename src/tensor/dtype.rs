//! ONNX data type mappings

use crate::error::{OnnxResult, TransformError};
use crate::proto::tensor_proto::DataType;

/// Size in bytes of one element, for types that can be stored in `raw_data`
pub fn dtype_size(dtype: DataType) -> OnnxResult<usize> {
    match dtype {
        DataType::Uint8 | DataType::Int8 | DataType::Bool => Ok(1),
        DataType::Uint16 | DataType::Int16 | DataType::Float16 | DataType::Bfloat16 => Ok(2),
        DataType::Float | DataType::Int32 | DataType::Uint32 => Ok(4),
        DataType::Double | DataType::Int64 | DataType::Uint64 | DataType::Complex64 => Ok(8),
        DataType::Complex128 => Ok(16),
        DataType::Undefined | DataType::String => {
            Err(TransformError::InvalidDataType(dtype as i32))
        }
    }
}

/// Convert i32 to DataType enum
pub fn i32_to_dtype(value: i32) -> OnnxResult<DataType> {
    DataType::try_from(value).map_err(|_| TransformError::InvalidDataType(value))
}

/// Check if data type is floating point
pub fn is_float_type(dtype: DataType) -> bool {
    matches!(
        dtype,
        DataType::Float | DataType::Double | DataType::Float16 | DataType::Bfloat16
    )
}

/// Check if data type is integer (bool counts as integer)
pub fn is_int_type(dtype: DataType) -> bool {
    matches!(
        dtype,
        DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::Uint8
            | DataType::Uint16
            | DataType::Uint32
            | DataType::Uint64
            | DataType::Bool
    )
}
