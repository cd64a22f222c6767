//! Creation and modification provenance

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Who created a schema and who touched it last.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditInfo {
    pub created_by: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub last_modified_by: String,
    pub last_modified_at: DateTime<Utc>,
}

impl AuditInfo {
    /// Stamp a freshly registered schema
    pub fn created(owner: impl Into<String>, description: Option<String>) -> Self {
        let owner = owner.into();
        let now = Utc::now();
        Self {
            created_by: owner.clone(),
            description,
            created_at: now,
            last_modified_by: owner,
            last_modified_at: now,
        }
    }

    /// A copy stamped as modified by `owner`; creation fields are kept.
    pub fn updated(&self, owner: impl Into<String>) -> Self {
        Self {
            last_modified_by: owner.into(),
            last_modified_at: Utc::now(),
            ..self.clone()
        }
    }
}
