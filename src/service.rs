//! Schema lifecycle orchestration
//!
//! `SchemaService` decides whether a registration or change is admissible,
//! assigns ids and version numbers, and drives the collaborators in a fixed
//! order: access check, storage read, candidate construction, compatibility
//! gate, dependency compilation, conditional write. Every check runs before
//! the write, so a failed operation leaves storage untouched.
//!
//! The service holds no mutable state. Concurrent updates to one schema are
//! serialized by the storage precondition: each write carries the revision
//! (schema id and ledger version) that was read, and a stale write comes back as
//! [`SchemaError::Conflict`]. Callers retry the whole operation; nothing is
//! retried here.
//!
//! With synchronous dependency uploads a compile that succeeds followed by a
//! write that fails leaves the compiled artifact orphaned. There is no
//! compensation for that; it is logged.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::access::{AccessControl, AllowAll, SchemaOperation};
use crate::audit::AuditInfo;
use crate::compatibility::{AcceptAll, CompatibilityValidator};
use crate::config::RegistryConfig;
use crate::dependency::{Dependency, DependencyCompiler, DependencyMode};
use crate::dto::{
    RegisterSchemaRequest, RegisterSchemaResponse, SchemaDto, SchemaRecordDto, UpdateSchemaRequest,
    UpdateSchemaResponse,
};
use crate::error::{Result, SchemaError};
use crate::id::{IdGenerator, SnowflakeIdGenerator};
use crate::qualified_name::QualifiedName;
use crate::schema::{SchemaDetails, SchemaInfo, SchemaMeta};
use crate::storage::{Revision, Storage, StorageError};

/// The lifecycle orchestrator
pub struct SchemaService {
    config: RegistryConfig,
    access: Arc<dyn AccessControl>,
    storage: Arc<dyn Storage>,
    compiler: Option<Arc<dyn DependencyCompiler>>,
    ids: Arc<dyn IdGenerator>,
    validator: Arc<dyn CompatibilityValidator>,
}

impl SchemaService {
    pub fn builder(storage: Arc<dyn Storage>) -> SchemaServiceBuilder {
        SchemaServiceBuilder {
            storage,
            config: RegistryConfig::default(),
            access: None,
            compiler: None,
            ids: None,
            validator: None,
        }
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Create a schema under a name that has none yet. Returns version 1.
    pub fn register(
        &self,
        actor: &str,
        name: &QualifiedName,
        request: RegisterSchemaRequest,
    ) -> Result<RegisterSchemaResponse> {
        info!(actor, schema = %name, "register request");
        name.validate()?;
        self.access.check_permission(actor, &name.tenant, SchemaOperation::Register)?;

        if self.storage.get(name, self.config.cache_enabled)?.is_some() {
            return Err(SchemaError::AlreadyExists { name: name.full_name() });
        }

        let schema_id = self.ids.next_id();
        let audit = AuditInfo::created(&request.owner, request.description);
        let meta = SchemaMeta {
            tenant: name.tenant.clone(),
            schema_name: name.schema.clone(),
            owner: request.owner,
            schema_type: request.schema_type,
            compatibility: request.compatibility,
            unique_id: schema_id,
        };
        let details = SchemaDetails::start(name, schema_id, request.schema_type, request.idl);
        let info = self.attach_dependency(SchemaInfo::new(name, audit, meta, details))?;

        info!(schema = %name, schema_id, "creating schema");
        self.storage
            .register(name, &info)
            .map_err(|err| self.write_failed(name, &info, err))?;

        Ok(RegisterSchemaResponse {
            schema_id,
            version: info.last_record_version(),
        })
    }

    /// Append a version to an existing schema.
    ///
    /// The candidate is checked against the current version only, under the
    /// policy fixed at registration.
    pub fn update(
        &self,
        actor: &str,
        name: &QualifiedName,
        request: UpdateSchemaRequest,
    ) -> Result<UpdateSchemaResponse> {
        info!(actor, schema = %name, "update request");
        name.validate()?;
        self.access.check_permission(actor, &name.tenant, SchemaOperation::Update)?;

        let current = self.load(name)?;
        let expected = Revision::of(&current);
        let candidate = current.next_version(name, &request.owner, request.idl);

        self.validator
            .validate(&candidate, &current, current.meta.compatibility)?;
        let candidate = self.attach_dependency(candidate)?;

        info!(
            schema = %name,
            version = candidate.last_record_version(),
            "updating schema"
        );
        self.storage
            .update(name, &candidate, expected)
            .map_err(|err| self.write_failed(name, &candidate, err))?;

        Ok(UpdateSchemaResponse {
            schema_id: candidate.unique_id(),
            version: candidate.last_record_version(),
        })
    }

    /// Remove a schema with its whole history and return what was removed
    pub fn delete(&self, actor: &str, name: &QualifiedName) -> Result<SchemaDto> {
        info!(actor, schema = %name, "delete request");
        name.validate()?;
        self.access.check_permission(actor, &name.tenant, SchemaOperation::Delete)?;

        let current = self.load(name)?;
        self.storage
            .delete(name, Revision::of(&current))
            .map_err(|err| self.write_failed(name, &current, err))?;

        info!(schema = %name, versions = current.last_record_version(), "deleted schema");
        Ok(SchemaDto::from(&current))
    }

    pub fn get(&self, actor: &str, name: &QualifiedName) -> Result<SchemaDto> {
        name.validate()?;
        self.access.check_permission(actor, &name.tenant, SchemaOperation::Get)?;

        let info = self.load(name)?;
        debug!(schema = %name, "get schema");
        Ok(SchemaDto::from(&info))
    }

    /// Latest record bound to the subject, or the version the name selects
    pub fn get_by_subject(&self, actor: &str, name: &QualifiedName) -> Result<SchemaRecordDto> {
        name.validate_subject()?;
        self.access.check_permission(actor, &name.subject, SchemaOperation::Get)?;

        let record = self
            .storage
            .get_by_subject(name, self.config.cache_enabled)?
            .ok_or_else(|| subject_not_found(name))?;
        debug!(subject = %name.subject_key(), version = record.version, "get schema by subject");
        Ok(SchemaRecordDto::from(record))
    }

    /// Every record bound to the subject, oldest first
    pub fn list_by_subject(&self, actor: &str, name: &QualifiedName) -> Result<Vec<SchemaRecordDto>> {
        name.validate_subject()?;
        self.access.check_permission(actor, &name.subject, SchemaOperation::Get)?;

        let records = self
            .storage
            .list_by_subject(name, self.config.cache_enabled)?
            .filter(|records| !records.is_empty())
            .ok_or_else(|| subject_not_found(name))?;
        debug!(subject = %name.subject_key(), records = records.len(), "list schema by subject");
        Ok(records.into_iter().map(SchemaRecordDto::from).collect())
    }

    /// Compile and attach the dependency of the latest version.
    ///
    /// Completes the deferred upload stage. Idempotent: an artifact already
    /// bound to the latest version is returned without recompiling. If another
    /// version lands while compiling, the artifact is dropped and the call
    /// fails with `Conflict`.
    pub fn compile_dependency(&self, actor: &str, name: &QualifiedName) -> Result<Dependency> {
        info!(actor, schema = %name, "dependency compile request");
        name.validate()?;
        self.access.check_permission(actor, &name.tenant, SchemaOperation::Update)?;
        if !self.config.upload_enabled {
            return Err(upload_disabled());
        }

        let current = self.load(name)?;
        if let Some(dependency) = current.current_dependency() {
            debug!(schema = %name, version = dependency.record_version, "dependency already attached");
            return Ok(dependency.clone());
        }

        let expected = Revision::of(&current);
        let version = expected.version;
        let dependency = self.compile(&current)?;
        let updated = current.with_dependency(dependency.clone());
        self.storage
            .update(name, &updated, expected)
            .map_err(|err| self.write_failed(name, &updated, err))?;

        info!(schema = %name, version, artifact = %dependency.artifact, "attached dependency");
        Ok(dependency)
    }

    fn load(&self, name: &QualifiedName) -> Result<SchemaInfo> {
        self.storage
            .get(name, self.config.cache_enabled)?
            .ok_or_else(|| SchemaError::NotFound { name: name.full_name() })
    }

    /// Compile inside the write path when uploads are synchronous
    fn attach_dependency(&self, info: SchemaInfo) -> Result<SchemaInfo> {
        if !self.config.upload_enabled || self.config.dependency_mode == DependencyMode::Deferred {
            return Ok(info);
        }
        let dependency = self.compile(&info)?;
        Ok(info.with_dependency(dependency))
    }

    fn compile(&self, info: &SchemaInfo) -> Result<Dependency> {
        let compiler = self.compiler.as_ref().ok_or_else(upload_disabled)?;
        let dependency = compiler.compile(info)?;

        let expected = info.last_record_version();
        if dependency.record_version != expected {
            return Err(SchemaError::Compilation(format!(
                "artifact bound to version {}, expected {}",
                dependency.record_version, expected
            )));
        }
        debug!(
            schema = %info.qualified_name,
            version = expected,
            references = dependency.references.len(),
            "compiled dependency"
        );
        Ok(dependency)
    }

    fn write_failed(&self, name: &QualifiedName, info: &SchemaInfo, err: StorageError) -> SchemaError {
        match &err {
            StorageError::Conflict { expected, found, .. } => {
                warn!(schema = %name, %expected, %found, "concurrent modification, write rejected");
            }
            _ => {
                if let Some(dependency) = &info.last_record_dependency {
                    warn!(
                        schema = %name,
                        artifact = %dependency.artifact,
                        error = %err,
                        "write failed after dependency compile; artifact left orphaned"
                    );
                }
            }
        }
        SchemaError::from(err)
    }
}

fn subject_not_found(name: &QualifiedName) -> SchemaError {
    let mut subject = name.subject_key();
    if let Some(version) = name.version {
        subject.push_str(&format!("@v{}", version));
    }
    SchemaError::NotFound { name: subject }
}

fn upload_disabled() -> SchemaError {
    SchemaError::UploadDisabled("needs upload_enabled and a dependency compiler".to_string())
}

/// Wires collaborators into a [`SchemaService`]
pub struct SchemaServiceBuilder {
    storage: Arc<dyn Storage>,
    config: RegistryConfig,
    access: Option<Arc<dyn AccessControl>>,
    compiler: Option<Arc<dyn DependencyCompiler>>,
    ids: Option<Arc<dyn IdGenerator>>,
    validator: Option<Arc<dyn CompatibilityValidator>>,
}

impl SchemaServiceBuilder {
    pub fn config(mut self, config: RegistryConfig) -> Self {
        self.config = config;
        self
    }

    /// Defaults to [`AllowAll`]
    pub fn access_control(mut self, access: Arc<dyn AccessControl>) -> Self {
        self.access = Some(access);
        self
    }

    pub fn compiler(mut self, compiler: Arc<dyn DependencyCompiler>) -> Self {
        self.compiler = Some(compiler);
        self
    }

    /// Defaults to a snowflake generator on the configured node id
    pub fn id_generator(mut self, ids: Arc<dyn IdGenerator>) -> Self {
        self.ids = Some(ids);
        self
    }

    /// Defaults to [`AcceptAll`]
    pub fn validator(mut self, validator: Arc<dyn CompatibilityValidator>) -> Self {
        self.validator = Some(validator);
        self
    }

    pub fn build(self) -> Result<SchemaService> {
        if self.config.upload_enabled && self.compiler.is_none() {
            return Err(upload_disabled());
        }

        let ids = match self.ids {
            Some(ids) => ids,
            None => Arc::new(SnowflakeIdGenerator::new(self.config.node_id)?),
        };

        Ok(SchemaService {
            config: self.config,
            access: self.access.unwrap_or_else(|| Arc::new(AllowAll)),
            storage: self.storage,
            compiler: self.compiler,
            ids,
            validator: self.validator.unwrap_or_else(|| Arc::new(AcceptAll)),
        })
    }
}
