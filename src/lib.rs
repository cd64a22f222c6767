//! Schema Lifecycle Core
//!
//! Governs how a schema, identified by tenant, subject and name, is
//! registered, evolved through versions, read and retired.
//!
//! ## Features
//!
//! - **Identity**: every schema gets a globally unique id at registration
//! - **Append-only history**: versions 1..N, contiguous, never rewritten
//! - **Compatibility gate**: each new version is validated against the current one
//! - **Optimistic concurrency**: writes carry the version they read; stale writes conflict
//! - **Dependency artifacts**: compiled synchronously or completed later
//!
//! ## Architecture
//!
//! ```text
//! caller ─▶ SchemaService ─▶ AccessControl
//!                         ├▶ Storage (get)
//!                         ├▶ CompatibilityValidator   (update only)
//!                         ├▶ DependencyCompiler       (upload enabled)
//!                         └▶ Storage (register / update / delete, with precondition)
//! ```
//!
//! Storage, validation, compilation, access control and id allocation are
//! traits; the crate ships simple implementations of each.

pub mod access;
pub mod audit;
pub mod checksum;
pub mod compatibility;
pub mod config;
pub mod dependency;
pub mod dto;
pub mod error;
pub mod id;
pub mod qualified_name;
pub mod schema;
pub mod service;
pub mod storage;

pub use access::{AccessControl, AccessDenied, AllowAll, SchemaOperation};
pub use audit::AuditInfo;
pub use checksum::Checksum;
pub use compatibility::{AcceptAll, CompatibilityValidator, CompatibilityViolation};
pub use config::{RegistryConfig, SchemaConfig};
pub use dependency::{CompileError, Dependency, DependencyCompiler, DependencyMode};
pub use dto::{
    RegisterSchemaRequest, RegisterSchemaResponse, SchemaDto, SchemaRecordDto, UpdateSchemaRequest,
    UpdateSchemaResponse,
};
pub use error::{Result, SchemaError};
pub use id::{IdGenerator, SequentialIdGenerator, SnowflakeIdGenerator};
pub use qualified_name::{QualifiedName, SubjectInfo};
pub use schema::{Compatibility, SchemaDetails, SchemaInfo, SchemaMeta, SchemaRecord, SchemaType};
pub use service::{SchemaService, SchemaServiceBuilder};
pub use storage::{FileStorage, MemoryStorage, Revision, Storage, StorageError, StorageOp};
