use std::path::PathBuf;
use thiserror::Error;

/// The main error type for collectra operations.
#[derive(Debug, Error)]
pub enum CollectraError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Node '{0}' not found")]
    NotFound(String),

    #[error("Invalid node '{id}': {message}")]
    Validation { id: String, message: String },

    #[error("Node '{0}' is not a crop node")]
    NotACropNode(String),

    #[error("Node id '{0}' already exists")]
    DuplicateId(String),

    #[error("Label not found for node '{0}'")]
    MissingLabel(String),

    #[error("Type not found for node '{0}'")]
    MissingType(String),

    #[error("Internal invariant violated: {0}")]
    InvariantViolation(String),

    #[error("Failed to parse annotation YAML from {path}: {source}")]
    YamlParse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Failed to write annotation YAML to {path}: {source}")]
    YamlWrite {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Invalid annotation document {path}: {message}")]
    DocumentInvalid { path: PathBuf, message: String },

    #[error("Invalid document folder {path}: {message}")]
    FolderInvalid { path: PathBuf, message: String },

    #[error("Unsupported image format: {0}")]
    UnsupportedImageFormat(String),

    #[error("Failed to read image dimensions from {path}: {source}")]
    ImageDimensionRead {
        path: PathBuf,
        #[source]
        source: imagesize::ImageError,
    },

    #[error("Failed to write JSON output: {0}")]
    JsonWrite(#[from] serde_json::Error),
}

impl CollectraError {
    pub(crate) fn validation(id: impl Into<String>, message: impl Into<String>) -> Self {
        CollectraError::Validation {
            id: id.into(),
            message: message.into(),
        }
    }
}
