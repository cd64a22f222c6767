//! Schema identity

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Result, SchemaError};

/// Identifies one schema's lifecycle: tenant, subject and schema name.
///
/// The optional `version` is a selector for subject reads and takes no part in
/// the storage key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QualifiedName {
    pub tenant: String,
    pub subject: String,
    pub schema: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<u64>,
}

impl QualifiedName {
    pub fn new(tenant: impl Into<String>, subject: impl Into<String>, schema: impl Into<String>) -> Self {
        Self {
            tenant: tenant.into(),
            subject: subject.into(),
            schema: schema.into(),
            version: None,
        }
    }

    /// Select a specific record version for subject reads
    pub fn with_version(mut self, version: u64) -> Self {
        self.version = Some(version);
        self
    }

    /// Storage key: `tenant/subject/schema`
    pub fn full_name(&self) -> String {
        format!("{}/{}/{}", self.tenant, self.subject, self.schema)
    }

    /// Name stamped on every record: `tenant/schema`
    pub fn schema_full_name(&self) -> String {
        format!("{}/{}", self.tenant, self.schema)
    }

    /// Subject index key: `tenant/subject`
    pub fn subject_key(&self) -> String {
        format!("{}/{}", self.tenant, self.subject)
    }

    pub fn subject_info(&self) -> SubjectInfo {
        SubjectInfo {
            tenant: self.tenant.clone(),
            subject: self.subject.clone(),
        }
    }

    /// All three parts must be non-blank
    pub fn validate(&self) -> Result<()> {
        self.require("tenant", &self.tenant)?;
        self.require("subject", &self.subject)?;
        self.require("schema", &self.schema)
    }

    /// Subject reads only need the tenant and subject
    pub fn validate_subject(&self) -> Result<()> {
        self.require("tenant", &self.tenant)?;
        self.require("subject", &self.subject)
    }

    fn require(&self, part: &str, value: &str) -> Result<()> {
        if value.trim().is_empty() {
            return Err(SchemaError::InvalidName(format!(
                "{} is empty in '{}'",
                part,
                self.full_name()
            )));
        }
        Ok(())
    }
}

impl fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.full_name())?;
        if let Some(version) = self.version {
            write!(f, "@v{}", version)?;
        }
        Ok(())
    }
}

/// Subject binding carried by each record
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubjectInfo {
    pub tenant: String,
    pub subject: String,
}

impl SubjectInfo {
    pub fn key(&self) -> String {
        format!("{}/{}", self.tenant, self.subject)
    }
}
