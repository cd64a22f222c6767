//! Compatibility validation contract
//!
//! The comparison algorithm lives outside this crate. The orchestrator calls
//! the validator on the update path, before persistence, with the candidate
//! aggregate, the current one and the policy fixed at registration.

use thiserror::Error;

use crate::schema::{Compatibility, SchemaInfo};

/// Rejection raised by a validator
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{schema} v{version} violates {policy}: {reason}")]
pub struct CompatibilityViolation {
    pub schema: String,
    pub version: u64,
    pub policy: Compatibility,
    pub reason: String,
}

impl CompatibilityViolation {
    /// Violation raised against the latest record of `candidate`
    pub fn new(candidate: &SchemaInfo, policy: Compatibility, reason: impl Into<String>) -> Self {
        Self {
            schema: candidate.qualified_name.full_name(),
            version: candidate.last_record_version(),
            policy,
            reason: reason.into(),
        }
    }
}

pub trait CompatibilityValidator: Send + Sync {
    fn validate(
        &self,
        candidate: &SchemaInfo,
        current: &SchemaInfo,
        policy: Compatibility,
    ) -> Result<(), CompatibilityViolation>;
}

/// Accepts every change
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptAll;

impl CompatibilityValidator for AcceptAll {
    fn validate(
        &self,
        _candidate: &SchemaInfo,
        _current: &SchemaInfo,
        _policy: Compatibility,
    ) -> Result<(), CompatibilityViolation> {
        Ok(())
    }
}
