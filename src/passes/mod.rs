//! Fusion passes built on the rewrite engine
//!
//! | Pass | Pattern | Replacement |
//! |------|---------|-------------|
//! | [`FuseBiasGelu`] | `Add(x, bias) -> Gelu` | `com.microsoft::BiasGelu` |
//! | [`FuseTransposeMatMul`] | `Transpose -> MatMul` | `com.microsoft::FusedMatMul` |

pub mod fuse_bias_gelu;
pub mod fuse_transpose_matmul;

pub use fuse_bias_gelu::FuseBiasGelu;
pub use fuse_transpose_matmul::FuseTransposeMatMul;

use crate::error::PatternError;
use crate::registry::{DevicePredicate, OptimizerRegistry};

/// Operator domain of the fused contrib ops
pub const MS_DOMAIN: &str = "com.microsoft";

/// Registry with every pass enabled for every device
pub fn default_registry() -> Result<OptimizerRegistry, PatternError> {
    Ok(OptimizerRegistry::new()
        .with(DevicePredicate::Any, FuseBiasGelu::optimizer()?)
        .with(DevicePredicate::Any, FuseTransposeMatMul::optimizer()?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_registry() {
        let registry = default_registry().unwrap();
        assert_eq!(
            registry.names(),
            vec![FuseBiasGelu::NAME, FuseTransposeMatMul::NAME]
        );
        assert_eq!(registry.optimizers_for("cpu").count(), 2);
    }
}
