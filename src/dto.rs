//! Requests, responses and read projections

use serde::{Deserialize, Serialize};

use crate::audit::AuditInfo;
use crate::dependency::Dependency;
use crate::qualified_name::{QualifiedName, SubjectInfo};
use crate::schema::{Compatibility, SchemaInfo, SchemaMeta, SchemaRecord, SchemaType};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterSchemaRequest {
    pub owner: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub compatibility: Compatibility,
    #[serde(default)]
    pub schema_type: SchemaType,
    pub idl: String,
}

impl RegisterSchemaRequest {
    pub fn new(owner: impl Into<String>, schema_type: SchemaType, idl: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            description: None,
            compatibility: Compatibility::default(),
            schema_type,
            idl: idl.into(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_compatibility(mut self, compatibility: Compatibility) -> Self {
        self.compatibility = compatibility;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateSchemaRequest {
    pub owner: String,
    pub idl: String,
}

impl UpdateSchemaRequest {
    pub fn new(owner: impl Into<String>, idl: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            idl: idl.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterSchemaResponse {
    pub schema_id: u64,
    pub version: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateSchemaResponse {
    pub schema_id: u64,
    pub version: u64,
}

/// Read view of a whole aggregate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaDto {
    pub qualified_name: QualifiedName,
    pub audit: AuditInfo,
    pub meta: SchemaMeta,
    pub records: Vec<SchemaRecordDto>,
    pub last_version: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dependency: Option<Dependency>,
}

impl SchemaDto {
    pub fn last_record(&self) -> Option<&SchemaRecordDto> {
        self.records.last()
    }
}

impl From<&SchemaInfo> for SchemaDto {
    fn from(info: &SchemaInfo) -> Self {
        Self {
            qualified_name: info.qualified_name.clone(),
            audit: info.audit.clone(),
            meta: info.meta.clone(),
            records: info.details.records().iter().cloned().map(SchemaRecordDto::from).collect(),
            last_version: info.last_record_version(),
            dependency: info.current_dependency().cloned(),
        }
    }
}

/// Read view of one version
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaRecordDto {
    pub schema: String,
    pub schema_id: u64,
    pub schema_type: SchemaType,
    pub version: u64,
    pub idl: String,
    pub subjects: Vec<SubjectInfo>,
    pub checksum: String,
}

impl From<SchemaRecord> for SchemaRecordDto {
    fn from(record: SchemaRecord) -> Self {
        Self {
            checksum: record.checksum.to_string(),
            schema: record.schema,
            schema_id: record.schema_id,
            schema_type: record.schema_type,
            version: record.version,
            idl: record.idl,
            subjects: record.subjects,
        }
    }
}
