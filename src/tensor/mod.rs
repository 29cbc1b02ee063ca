//! Tensor utilities
//!
//! - Data type table (`dtype`)
//! - Decoding `TensorProto` payloads into ndarray arrays (`convert`)
//!
//! The constant resolver in [`crate::pattern::guards`] is the main consumer.

pub mod convert;
pub mod dtype;

// Re-export commonly used items
pub use convert::{
    scalar_to_tensor_f32, scalar_to_tensor_i64, tensor_to_array_f32, tensor_to_array_i64,
    vec_to_tensor_f32, vec_to_tensor_i64,
};
pub use dtype::{dtype_size, i32_to_dtype, is_float_type, is_int_type};
