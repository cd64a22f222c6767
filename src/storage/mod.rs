//! Storage contract for schema aggregates
//!
//! Storage owns atomicity of a single write. Writes that replace or remove an
//! aggregate carry the [`Revision`] the caller read: the schema id together
//! with the ledger version. A backend must reject them with
//! [`StorageError::Conflict`] when the stored revision differs. The version
//! keeps concurrent updates from both claiming the same number; the id keeps a
//! stale write from landing on a schema that was deleted and registered again
//! under the same name.

mod file;
mod memory;

pub use file::FileStorage;
pub use memory::{MemoryStorage, StorageOp};

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::qualified_name::QualifiedName;
use crate::schema::{SchemaInfo, SchemaRecord};

pub type StorageResult<T> = std::result::Result<T, StorageError>;

/// Identity and ledger position of a stored aggregate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Revision {
    pub schema_id: u64,
    pub version: u64,
}

impl Revision {
    pub fn new(schema_id: u64, version: u64) -> Self {
        Self { schema_id, version }
    }

    pub fn of(info: &SchemaInfo) -> Self {
        Self::new(info.unique_id(), info.last_record_version())
    }
}

impl fmt::Display for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "id {} v{}", self.schema_id, self.version)
    }
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("no schema stored under {key}")]
    NotFound { key: String },

    #[error("schema {key} is already stored")]
    Exists { key: String },

    #[error("subject {subject} is already bound to {schema}")]
    SubjectBound { subject: String, schema: String },

    #[error("revision precondition failed for {key}: expected {expected}, found {found}")]
    Conflict {
        key: String,
        expected: Revision,
        found: Revision,
    },

    #[error("corrupted aggregate {key}: {reason}")]
    Corrupted { key: String, reason: String },

    #[error("invalid storage key '{0}'")]
    InvalidKey(String),

    #[error("{0}")]
    Backend(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Persistence for schema aggregates, keyed by qualified name.
///
/// `use_cache` is passed through from configuration untouched; whether it
/// means anything is up to the backend.
pub trait Storage: Send + Sync {
    fn get(&self, name: &QualifiedName, use_cache: bool) -> StorageResult<Option<SchemaInfo>>;

    /// Create-if-absent
    fn register(&self, name: &QualifiedName, info: &SchemaInfo) -> StorageResult<()>;

    /// Replace the aggregate if its stored revision is `expected`
    fn update(&self, name: &QualifiedName, info: &SchemaInfo, expected: Revision) -> StorageResult<()>;

    /// Remove the aggregate if its stored revision is `expected`
    fn delete(&self, name: &QualifiedName, expected: Revision) -> StorageResult<()>;

    /// Latest record bound to the name's subject, or the one its version selects
    fn get_by_subject(&self, name: &QualifiedName, use_cache: bool) -> StorageResult<Option<SchemaRecord>>;

    /// Every record bound to the name's subject, in version order
    fn list_by_subject(&self, name: &QualifiedName, use_cache: bool) -> StorageResult<Option<Vec<SchemaRecord>>>;
}

/// Record selected by `name.version`, defaulting to the latest
pub(crate) fn select_record(info: &SchemaInfo, name: &QualifiedName) -> Option<SchemaRecord> {
    match name.version {
        Some(version) => info.details.record(version).cloned(),
        None => Some(info.last_record().clone()),
    }
}

/// Checks a precondition against the stored aggregate
pub(crate) fn check_revision(key: &str, stored: Option<&SchemaInfo>, expected: Revision) -> StorageResult<()> {
    let found = match stored {
        None => return Err(StorageError::NotFound { key: key.to_string() }),
        Some(info) => Revision::of(info),
    };
    if found != expected {
        return Err(StorageError::Conflict {
            key: key.to_string(),
            expected,
            found,
        });
    }
    Ok(())
}
