use crate::manifest::PresetValidationError;
use shader_contract::ValidationError;
use thiserror::Error;

/// Failure to load or reflect a preset
#[derive(Debug, Error)]
pub enum PresetError {
    #[error("failed to read manifest: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse manifest: {0}")]
    Yaml(#[from] serde_norway::Error),

    #[error("invalid manifest: {0}")]
    Manifest(#[from] PresetValidationError),

    #[error("pass '{pass}': failed to load '{file}': {source}")]
    Load {
        pass: String,
        file: String,
        #[source]
        source: std::io::Error,
    },

    #[error("pass '{pass}': {source}")]
    Pass {
        pass: String,
        #[source]
        source: ValidationError,
    },
}
