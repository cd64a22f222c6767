//! Access control contract

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Operation kinds checked against access control
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemaOperation {
    Register,
    Update,
    Delete,
    Get,
}

impl fmt::Display for SchemaOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SchemaOperation::Register => "register",
            SchemaOperation::Update => "update",
            SchemaOperation::Delete => "delete",
            SchemaOperation::Get => "get",
        };
        f.write_str(s)
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{actor} is not allowed to {operation} in '{scope}'")]
pub struct AccessDenied {
    pub actor: String,
    pub scope: String,
    pub operation: SchemaOperation,
}

/// Decides whether an actor may perform an operation within a scope
/// (a tenant or a subject).
pub trait AccessControl: Send + Sync {
    fn check_permission(&self, actor: &str, scope: &str, operation: SchemaOperation) -> Result<(), AccessDenied>;
}

/// Grants everything
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

impl AccessControl for AllowAll {
    fn check_permission(&self, _actor: &str, _scope: &str, _operation: SchemaOperation) -> Result<(), AccessDenied> {
        Ok(())
    }
}
