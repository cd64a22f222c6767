//! Dependency compilation contract
//!
//! The compiler resolves the schemas a version references and produces an
//! artifact. The lifecycle core only decides when to call it and stores the
//! result on the aggregate.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::checksum::Checksum;
use crate::schema::SchemaInfo;

/// Compiled artifact bound to one record version
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dependency {
    /// Version of the record this artifact was compiled from
    pub record_version: u64,
    /// Artifact coordinate, e.g. `group:artifact:version`
    pub artifact: String,
    /// Full names of referenced schemas
    #[serde(default)]
    pub references: Vec<String>,
    pub checksum: Checksum,
    pub compiled_at: DateTime<Utc>,
}

impl Dependency {
    /// Build an artifact descriptor for the latest record of `info`
    pub fn for_latest(info: &SchemaInfo, artifact: impl Into<String>, payload: &[u8], references: Vec<String>) -> Self {
        Self {
            record_version: info.last_record_version(),
            artifact: artifact.into(),
            references,
            checksum: Checksum::from_bytes(payload),
            compiled_at: Utc::now(),
        }
    }
}

#[derive(Error, Debug)]
pub enum CompileError {
    #[error("unresolved reference '{reference}' in {schema}")]
    UnresolvedReference { schema: String, reference: String },

    #[error("{0}")]
    Failed(String),
}

/// Produces the dependency graph artifact for the latest record of an aggregate
pub trait DependencyCompiler: Send + Sync {
    fn compile(&self, info: &SchemaInfo) -> Result<Dependency, CompileError>;
}

/// How the orchestrator schedules dependency compilation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DependencyMode {
    /// Compile inside register/update, before the write
    #[default]
    Sync,
    /// Persist first; `SchemaService::compile_dependency` completes later
    Deferred,
}
