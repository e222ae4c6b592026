use thiserror::Error;
use types::ConfigError;

use crate::backend::AllocationError;

#[derive(Debug, Error)]
pub enum SimError {
    #[error("GPU buffer allocation failed: {0}")]
    Allocation(#[from] AllocationError),
    #[error("compute backend has no kernel named '{0}'")]
    MissingKernel(&'static str),
    #[error("invalid simulation config: {0}")]
    InvalidConfig(#[from] ConfigError),
    #[error("shader setup failed: {0}")]
    Shader(String),
}
