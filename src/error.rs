//! Error types for the schema lifecycle core

use thiserror::Error;

use crate::access::AccessDenied;
use crate::compatibility::CompatibilityViolation;
use crate::dependency::CompileError;
use crate::storage::StorageError;

/// Result type for schema operations
pub type Result<T> = std::result::Result<T, SchemaError>;

/// Schema lifecycle errors
#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("Schema not found: {name}")]
    NotFound { name: String },

    #[error("Schema already exists: {name}")]
    AlreadyExists { name: String },

    #[error("Permission denied: {actor} may not {operation} in scope '{scope}'")]
    PermissionDenied {
        actor: String,
        scope: String,
        operation: String,
    },

    #[error("Compatibility check failed: {0}")]
    IncompatibleChange(String),

    #[error("Dependency compilation failed: {0}")]
    Compilation(String),

    /// Dependency upload was requested but is switched off or has no compiler.
    #[error("Dependency upload unavailable: {0}")]
    UploadDisabled(String),

    /// The stored aggregate moved past the version the caller read.
    #[error("Concurrent modification of {name}: expected version {expected}")]
    Conflict { name: String, expected: u64 },

    #[error("Invalid schema name: {0}")]
    InvalidName(String),

    #[error("Invalid schema format: {0}")]
    InvalidFormat(String),

    #[error("Storage error: {0}")]
    Storage(StorageError),

    #[error("Configuration error: {0}")]
    Config(#[from] config_crate::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SchemaError {
    /// Whether re-running the whole read-validate-write sequence may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, SchemaError::Conflict { .. })
    }
}

impl From<AccessDenied> for SchemaError {
    fn from(denied: AccessDenied) -> Self {
        SchemaError::PermissionDenied {
            actor: denied.actor,
            scope: denied.scope,
            operation: denied.operation.to_string(),
        }
    }
}

impl From<CompatibilityViolation> for SchemaError {
    fn from(violation: CompatibilityViolation) -> Self {
        SchemaError::IncompatibleChange(violation.to_string())
    }
}

impl From<CompileError> for SchemaError {
    fn from(err: CompileError) -> Self {
        SchemaError::Compilation(err.to_string())
    }
}

impl From<StorageError> for SchemaError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound { key } => SchemaError::NotFound { name: key },
            StorageError::Exists { key } => SchemaError::AlreadyExists { name: key },
            StorageError::SubjectBound { subject, .. } => SchemaError::AlreadyExists { name: subject },
            StorageError::Conflict { key, expected, .. } => SchemaError::Conflict {
                name: key,
                expected: expected.version,
            },
            other => SchemaError::Storage(other),
        }
    }
}
