//! Error types for state loading, registry access and apply

use std::path::PathBuf;

use thiserror::Error;

/// Result type for schema-gitops operations
pub type Result<T> = std::result::Result<T, GitopsError>;

/// Errors raised outside the diff core
///
/// The diff core itself is generic over the registry client's error and
/// never constructs one of these.
#[derive(Error, Debug)]
pub enum GitopsError {
    #[error("cannot read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] ureq::Error),

    #[error("registry returned {status}: {message}")]
    Registry { status: u16, message: String },

    #[error("invalid schema for subject '{subject}': {reason}")]
    InvalidSchema { subject: String, reason: String },

    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("subject '{0}' is declared more than once")]
    DuplicateSubject(String),

    #[error("unknown compatibility level: {0}")]
    UnknownCompatibility(String),

    #[error("unknown schema type: {0}")]
    UnknownSchemaType(String),

    #[error("refusing to apply, incompatible subjects: {}", .0.join(", "))]
    IncompatibleSubjects(Vec<String>),

    #[error("configuration error: {0}")]
    Config(#[from] config_crate::ConfigError),
}

impl GitopsError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        GitopsError::Io {
            path: path.into(),
            source,
        }
    }
}
