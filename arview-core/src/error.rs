//! Error types for the viewer core

use thiserror::Error;

/// Failure to turn an asset's bytes into a mesh
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("glTF error: {0}")]
    Gltf(#[from] gltf::Error),

    #[error("unsupported buffer source: {0}")]
    UnsupportedBuffer(String),

    #[error("invalid geometry: {0}")]
    InvalidGeometry(String),

    #[error("asset contains no triangles")]
    Empty,
}

/// Main error type for viewer operations
#[derive(Error, Debug)]
pub enum ViewerError {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("failed to parse configuration: {0}")]
    ConfigParse(#[from] serde_json::Error),

    #[error("failed to decode {model}: {source}")]
    Decode {
        model: String,
        #[source]
        source: DecodeError,
    },

    #[error("unknown model: {0}")]
    UnknownModel(String),

    #[error("model slot {0} has already settled")]
    SlotSettled(String),
}

/// Result type alias for viewer operations
pub type Result<T> = std::result::Result<T, ViewerError>;
