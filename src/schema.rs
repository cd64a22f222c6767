//! Schema aggregate, metadata and the version ledger

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::audit::AuditInfo;
use crate::checksum::Checksum;
use crate::dependency::Dependency;
use crate::error::SchemaError;
use crate::qualified_name::{QualifiedName, SubjectInfo};

/// IDL family of a schema
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SchemaType {
    #[default]
    Avro,
    Json,
    Protobuf,
    Text,
}

impl SchemaType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SchemaType::Avro => "avro",
            SchemaType::Json => "json",
            SchemaType::Protobuf => "protobuf",
            SchemaType::Text => "text",
        }
    }
}

impl fmt::Display for SchemaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SchemaType {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "avro" => Ok(SchemaType::Avro),
            "json" => Ok(SchemaType::Json),
            "protobuf" | "proto" => Ok(SchemaType::Protobuf),
            "text" => Ok(SchemaType::Text),
            other => Err(SchemaError::InvalidFormat(format!("unknown schema type '{}'", other))),
        }
    }
}

/// Rule set governing admissible changes between adjacent versions.
///
/// Fixed at registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Compatibility {
    #[default]
    Backward,
    BackwardTransitive,
    Forward,
    ForwardTransitive,
    Full,
    FullTransitive,
    None,
}

impl Compatibility {
    pub fn as_str(&self) -> &'static str {
        match self {
            Compatibility::Backward => "BACKWARD",
            Compatibility::BackwardTransitive => "BACKWARD_TRANSITIVE",
            Compatibility::Forward => "FORWARD",
            Compatibility::ForwardTransitive => "FORWARD_TRANSITIVE",
            Compatibility::Full => "FULL",
            Compatibility::FullTransitive => "FULL_TRANSITIVE",
            Compatibility::None => "NONE",
        }
    }
}

impl fmt::Display for Compatibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Compatibility {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().replace('-', "_").as_str() {
            "BACKWARD" => Ok(Compatibility::Backward),
            "BACKWARD_TRANSITIVE" => Ok(Compatibility::BackwardTransitive),
            "FORWARD" => Ok(Compatibility::Forward),
            "FORWARD_TRANSITIVE" => Ok(Compatibility::ForwardTransitive),
            "FULL" => Ok(Compatibility::Full),
            "FULL_TRANSITIVE" => Ok(Compatibility::FullTransitive),
            "NONE" => Ok(Compatibility::None),
            other => Err(SchemaError::InvalidFormat(format!("unknown compatibility '{}'", other))),
        }
    }
}

/// Schema-wide metadata, set at registration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaMeta {
    pub tenant: String,
    pub schema_name: String,
    pub owner: String,
    pub schema_type: SchemaType,
    pub compatibility: Compatibility,
    /// Globally unique, never reassigned
    pub unique_id: u64,
}

/// One immutable version snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaRecord {
    /// `tenant/schema`
    pub schema: String,
    pub schema_id: u64,
    pub schema_type: SchemaType,
    pub idl: String,
    pub version: u64,
    pub subjects: Vec<SubjectInfo>,
    pub checksum: Checksum,
    pub created_at: DateTime<Utc>,
}

impl SchemaRecord {
    fn new(
        name: &QualifiedName,
        schema_id: u64,
        schema_type: SchemaType,
        idl: impl Into<String>,
        version: u64,
    ) -> Self {
        let idl = idl.into();
        Self {
            schema: name.schema_full_name(),
            schema_id,
            schema_type,
            checksum: Checksum::of(&idl),
            idl,
            version,
            subjects: vec![name.subject_info()],
            created_at: Utc::now(),
        }
    }

    pub fn is_bound_to(&self, subject_key: &str) -> bool {
        self.subjects.iter().any(|s| s.key() == subject_key)
    }

    pub fn verify_checksum(&self) -> bool {
        self.checksum.verify(&self.idl)
    }
}

/// The version ledger: records 1..N in order, append-only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaDetails {
    records: Vec<SchemaRecord>,
}

impl SchemaDetails {
    /// Ledger holding only version 1
    pub fn start(
        name: &QualifiedName,
        schema_id: u64,
        schema_type: SchemaType,
        idl: impl Into<String>,
    ) -> Self {
        Self {
            records: vec![SchemaRecord::new(name, schema_id, schema_type, idl, 1)],
        }
    }

    /// A new ledger with one more record at `last_version + 1`.
    ///
    /// Id and type are inherited from the latest record.
    pub fn appended(&self, name: &QualifiedName, idl: impl Into<String>) -> Self {
        let last = self.last();
        let record = SchemaRecord::new(name, last.schema_id, last.schema_type, idl, last.version + 1);
        let mut records = self.records.clone();
        records.push(record);
        Self { records }
    }

    pub fn records(&self) -> &[SchemaRecord] {
        &self.records
    }

    pub fn last(&self) -> &SchemaRecord {
        // A ledger is never empty: `start` seeds it and nothing removes records.
        &self.records[self.records.len() - 1]
    }

    pub fn last_version(&self) -> u64 {
        self.records.len() as u64
    }

    pub fn record(&self, version: u64) -> Option<&SchemaRecord> {
        version
            .checked_sub(1)
            .and_then(|idx| self.records.get(idx as usize))
    }

    /// Versions are exactly 1..=N in order
    pub fn is_contiguous(&self) -> bool {
        !self.records.is_empty()
            && self
                .records
                .iter()
                .enumerate()
                .all(|(idx, r)| r.version == idx as u64 + 1)
    }

    pub fn verify_checksums(&self) -> bool {
        self.records.iter().all(SchemaRecord::verify_checksum)
    }
}

/// The aggregate root: a schema's identity, provenance and full history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaInfo {
    pub qualified_name: QualifiedName,
    pub audit: AuditInfo,
    pub meta: SchemaMeta,
    pub details: SchemaDetails,
    /// Compiled artifact for the latest record
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_record_dependency: Option<Dependency>,
    /// Opaque fields owned by the storage backend
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub storage: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extras: BTreeMap<String, String>,
}

impl SchemaInfo {
    pub fn new(name: &QualifiedName, audit: AuditInfo, meta: SchemaMeta, details: SchemaDetails) -> Self {
        Self {
            qualified_name: QualifiedName {
                version: None,
                ..name.clone()
            },
            audit,
            meta,
            details,
            last_record_dependency: None,
            storage: BTreeMap::new(),
            extras: BTreeMap::new(),
        }
    }

    /// Candidate aggregate with one more version.
    ///
    /// Identity, meta, storage and extras carry over; the dependency of the
    /// previous record does not.
    pub fn next_version(&self, name: &QualifiedName, owner: &str, idl: impl Into<String>) -> Self {
        Self {
            qualified_name: self.qualified_name.clone(),
            audit: self.audit.updated(owner),
            meta: self.meta.clone(),
            details: self.details.appended(name, idl),
            last_record_dependency: None,
            storage: self.storage.clone(),
            extras: self.extras.clone(),
        }
    }

    pub fn with_dependency(self, dependency: Dependency) -> Self {
        Self {
            last_record_dependency: Some(dependency),
            ..self
        }
    }

    pub fn unique_id(&self) -> u64 {
        self.meta.unique_id
    }

    pub fn schema_type(&self) -> SchemaType {
        self.meta.schema_type
    }

    pub fn last_record_version(&self) -> u64 {
        self.details.last_version()
    }

    pub fn last_record(&self) -> &SchemaRecord {
        self.details.last()
    }

    /// Dependency attached for the latest record, if any
    pub fn current_dependency(&self) -> Option<&Dependency> {
        self.last_record_dependency
            .as_ref()
            .filter(|dep| dep.record_version == self.last_record_version())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name() -> QualifiedName {
        QualifiedName::new("t1", "orders", "Order")
    }

    fn aggregate() -> SchemaInfo {
        let name = name();
        let meta = SchemaMeta {
            tenant: "t1".to_string(),
            schema_name: "Order".to_string(),
            owner: "alice".to_string(),
            schema_type: SchemaType::Avro,
            compatibility: Compatibility::Backward,
            unique_id: 42,
        };
        let details = SchemaDetails::start(&name, 42, SchemaType::Avro, "{v1}");
        SchemaInfo::new(&name, AuditInfo::created("alice", None), meta, details)
    }

    #[test]
    fn test_start_ledger_is_version_one() {
        let info = aggregate();
        assert_eq!(info.last_record_version(), 1);
        assert_eq!(info.last_record().schema, "t1/Order");
        assert_eq!(info.last_record().schema_id, 42);
        assert!(info.last_record().is_bound_to("t1/orders"));
        assert!(info.details.is_contiguous());
    }

    #[test]
    fn test_next_version_leaves_current_untouched() {
        let current = aggregate();
        let mut extras_current = current.clone();
        extras_current.extras.insert("team".to_string(), "payments".to_string());

        let next = extras_current.next_version(&name(), "bob", "{v2}");

        assert_eq!(extras_current.last_record_version(), 1);
        assert_eq!(next.last_record_version(), 2);
        assert_eq!(next.last_record().idl, "{v2}");
        assert_eq!(next.last_record().schema_id, 42);
        assert_eq!(next.meta, extras_current.meta);
        assert_eq!(next.extras.get("team").map(String::as_str), Some("payments"));
        assert_eq!(next.audit.created_by, "alice");
        assert_eq!(next.audit.last_modified_by, "bob");
        assert!(next.details.is_contiguous());
    }

    #[test]
    fn test_record_lookup_by_version() {
        let info = aggregate().next_version(&name(), "bob", "{v2}");
        assert_eq!(info.details.record(1).map(|r| r.idl.as_str()), Some("{v1}"));
        assert_eq!(info.details.record(2).map(|r| r.idl.as_str()), Some("{v2}"));
        assert!(info.details.record(0).is_none());
        assert!(info.details.record(3).is_none());
    }

    #[test]
    fn test_gapped_ledger_is_not_contiguous() {
        let info = aggregate().next_version(&name(), "bob", "{v2}");
        let mut json = serde_json::to_value(&info.details).unwrap();
        json["records"][1]["version"] = serde_json::json!(5);
        let gapped: SchemaDetails = serde_json::from_value(json).unwrap();
        assert!(!gapped.is_contiguous());
    }

    #[test]
    fn test_enum_parsing() {
        assert_eq!("PROTO".parse::<SchemaType>().unwrap(), SchemaType::Protobuf);
        assert_eq!(
            "backward-transitive".parse::<Compatibility>().unwrap(),
            Compatibility::BackwardTransitive
        );
        assert!("xml".parse::<SchemaType>().is_err());
        assert_eq!(
            serde_json::to_string(&Compatibility::FullTransitive).unwrap(),
            "\"FULL_TRANSITIVE\""
        );
    }
}
