//! In-memory storage with operation tracing

use std::collections::HashMap;
use std::sync::{Mutex, RwLock};

use tracing::debug;

use super::{check_revision, select_record, Revision, Storage, StorageError, StorageResult};
use crate::qualified_name::QualifiedName;
use crate::schema::{SchemaInfo, SchemaRecord};

/// Record of a storage call, for test assertions
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageOp {
    Get { key: String },
    Register { key: String },
    Update { key: String, expected: Revision },
    Delete { key: String, expected: Revision },
    GetBySubject { subject: String },
    ListBySubject { subject: String },
}

impl StorageOp {
    pub fn is_write(&self) -> bool {
        matches!(
            self,
            StorageOp::Register { .. } | StorageOp::Update { .. } | StorageOp::Delete { .. }
        )
    }
}

#[derive(Debug, Default)]
struct MemoryState {
    /// full name -> aggregate
    schemas: HashMap<String, SchemaInfo>,
    /// subject key -> full name
    subjects: HashMap<String, String>,
}

/// Map-backed storage. Every write runs under one lock, so preconditions and
/// the subject index are checked and updated atomically.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    state: RwLock<MemoryState>,
    operations: Mutex<Vec<StorageOp>>,
    fail_writes: Mutex<Option<String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// All calls seen so far
    pub fn operations(&self) -> Vec<StorageOp> {
        self.operations.lock().map(|ops| ops.clone()).unwrap_or_default()
    }

    /// Number of register/update/delete calls seen so far, failed ones included
    pub fn write_count(&self) -> usize {
        self.operations().iter().filter(|op| op.is_write()).count()
    }

    /// Make every following write fail with a backend error
    pub fn inject_write_failure(&self, message: impl Into<String>) {
        if let Ok(mut fail) = self.fail_writes.lock() {
            *fail = Some(message.into());
        }
    }

    pub fn clear_failures(&self) {
        if let Ok(mut fail) = self.fail_writes.lock() {
            *fail = None;
        }
    }

    pub fn len(&self) -> usize {
        self.state.read().map(|s| s.schemas.len()).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn record(&self, op: StorageOp) {
        if let Ok(mut ops) = self.operations.lock() {
            ops.push(op);
        }
    }

    fn check_failure(&self) -> StorageResult<()> {
        match self.fail_writes.lock() {
            Ok(fail) => match fail.as_ref() {
                Some(message) => Err(StorageError::Backend(message.clone())),
                None => Ok(()),
            },
            Err(_) => Err(poisoned()),
        }
    }

    fn read_subject<T>(&self, name: &QualifiedName, f: impl FnOnce(&SchemaInfo) -> Option<T>) -> StorageResult<Option<T>> {
        let state = self.state.read().map_err(|_| poisoned())?;
        Ok(state
            .subjects
            .get(&name.subject_key())
            .and_then(|full_name| state.schemas.get(full_name))
            .and_then(f))
    }
}

fn poisoned() -> StorageError {
    StorageError::Backend("memory storage lock poisoned".to_string())
}

impl Storage for MemoryStorage {
    fn get(&self, name: &QualifiedName, _use_cache: bool) -> StorageResult<Option<SchemaInfo>> {
        let key = name.full_name();
        self.record(StorageOp::Get { key: key.clone() });

        let state = self.state.read().map_err(|_| poisoned())?;
        Ok(state.schemas.get(&key).cloned())
    }

    fn register(&self, name: &QualifiedName, info: &SchemaInfo) -> StorageResult<()> {
        let key = name.full_name();
        self.record(StorageOp::Register { key: key.clone() });
        self.check_failure()?;

        let mut state = self.state.write().map_err(|_| poisoned())?;
        if state.schemas.contains_key(&key) {
            return Err(StorageError::Exists { key });
        }
        let subject = name.subject_key();
        if let Some(bound) = state.subjects.get(&subject) {
            return Err(StorageError::SubjectBound {
                subject,
                schema: bound.clone(),
            });
        }

        debug!(schema = %key, "storing new aggregate");
        state.subjects.insert(subject, key.clone());
        state.schemas.insert(key, info.clone());
        Ok(())
    }

    fn update(&self, name: &QualifiedName, info: &SchemaInfo, expected: Revision) -> StorageResult<()> {
        let key = name.full_name();
        self.record(StorageOp::Update {
            key: key.clone(),
            expected,
        });
        self.check_failure()?;

        let mut state = self.state.write().map_err(|_| poisoned())?;
        check_revision(&key, state.schemas.get(&key), expected)?;

        debug!(schema = %key, version = info.last_record_version(), "replacing aggregate");
        state.schemas.insert(key, info.clone());
        Ok(())
    }

    fn delete(&self, name: &QualifiedName, expected: Revision) -> StorageResult<()> {
        let key = name.full_name();
        self.record(StorageOp::Delete {
            key: key.clone(),
            expected,
        });
        self.check_failure()?;

        let mut state = self.state.write().map_err(|_| poisoned())?;
        check_revision(&key, state.schemas.get(&key), expected)?;

        state.schemas.remove(&key);
        state.subjects.retain(|_, full_name| *full_name != key);
        Ok(())
    }

    fn get_by_subject(&self, name: &QualifiedName, _use_cache: bool) -> StorageResult<Option<SchemaRecord>> {
        self.record(StorageOp::GetBySubject {
            subject: name.subject_key(),
        });
        self.read_subject(name, |info| select_record(info, name))
    }

    fn list_by_subject(&self, name: &QualifiedName, _use_cache: bool) -> StorageResult<Option<Vec<SchemaRecord>>> {
        self.record(StorageOp::ListBySubject {
            subject: name.subject_key(),
        });
        self.read_subject(name, |info| Some(info.details.records().to_vec()))
    }
}
