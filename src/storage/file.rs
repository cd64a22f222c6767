//! JSON file storage
//!
//! Layout: `{root}/schemas/{tenant}/{subject}/{schema}.json`, one aggregate per
//! file. A subject directory holds at most one schema. Aggregates are verified
//! on load: a ledger with gaps or a record whose IDL no longer matches its
//! checksum is rejected as corrupted.
//!
//! Preconditions are enforced within one process; two processes sharing a
//! directory can still race each other.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, RwLock};

use tracing::{debug, info};
use walkdir::WalkDir;

use super::{check_revision, select_record, Revision, Storage, StorageError, StorageResult};
use crate::qualified_name::QualifiedName;
use crate::schema::{SchemaInfo, SchemaRecord};

const SCHEMAS_DIR: &str = "schemas";
const EXTENSION: &str = "json";

pub struct FileStorage {
    root: PathBuf,
    /// full name -> aggregate, mirrors what is on disk
    cache: RwLock<HashMap<String, SchemaInfo>>,
    write_lock: Mutex<()>,
}

impl FileStorage {
    /// Open an existing store or create an empty one
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let root = path.as_ref().to_path_buf();
        fs::create_dir_all(root.join(SCHEMAS_DIR))?;

        let storage = Self {
            root,
            cache: RwLock::new(HashMap::new()),
            write_lock: Mutex::new(()),
        };
        let loaded = storage.load_all()?;
        info!(root = %storage.root.display(), schemas = loaded, "opened file storage");
        Ok(storage)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn load_all(&self) -> StorageResult<usize> {
        let mut loaded = HashMap::new();
        for entry in WalkDir::new(self.root.join(SCHEMAS_DIR)).min_depth(3).max_depth(3) {
            let entry = entry.map_err(|e| StorageError::Backend(e.to_string()))?;
            let path = entry.path();
            if !entry.file_type().is_file() || path.extension().and_then(|e| e.to_str()) != Some(EXTENSION) {
                continue;
            }
            let info = Self::load(path)?;
            loaded.insert(info.qualified_name.full_name(), info);
        }

        let count = loaded.len();
        *self.cache.write().map_err(|_| poisoned())? = loaded;
        Ok(count)
    }

    fn load(path: &Path) -> StorageResult<SchemaInfo> {
        let content = fs::read_to_string(path)?;
        let info: SchemaInfo = serde_json::from_str(&content)?;
        let key = info.qualified_name.full_name();

        if !info.details.is_contiguous() {
            return Err(StorageError::Corrupted {
                key,
                reason: "version ledger is not contiguous".to_string(),
            });
        }
        if !info.details.verify_checksums() {
            return Err(StorageError::Corrupted {
                key,
                reason: "record checksum mismatch".to_string(),
            });
        }
        Ok(info)
    }

    fn subject_dir(&self, name: &QualifiedName) -> StorageResult<PathBuf> {
        Ok(self
            .root
            .join(SCHEMAS_DIR)
            .join(path_component(&name.tenant)?)
            .join(path_component(&name.subject)?))
    }

    fn schema_path(&self, name: &QualifiedName) -> StorageResult<PathBuf> {
        let file = format!("{}.{}", path_component(&name.schema)?, EXTENSION);
        Ok(self.subject_dir(name)?.join(file))
    }

    fn read_disk(&self, name: &QualifiedName) -> StorageResult<Option<SchemaInfo>> {
        let path = self.schema_path(name)?;
        if !path.exists() {
            return Ok(None);
        }
        Self::load(&path).map(Some)
    }

    fn write_file(path: &Path, info: &SchemaInfo) -> StorageResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_string_pretty(info)?)?;
        fs::rename(&tmp, path)?;
        Ok(())
    }

    fn cache_put(&self, info: &SchemaInfo) -> StorageResult<()> {
        self.cache
            .write()
            .map_err(|_| poisoned())?
            .insert(info.qualified_name.full_name(), info.clone());
        Ok(())
    }

    fn cache_remove(&self, key: &str) -> StorageResult<()> {
        self.cache.write().map_err(|_| poisoned())?.remove(key);
        Ok(())
    }

    /// The aggregate bound to a subject, from cache or from disk
    fn subject_aggregate(&self, name: &QualifiedName, use_cache: bool) -> StorageResult<Option<SchemaInfo>> {
        if use_cache {
            let subject = name.subject_key();
            let cache = self.cache.read().map_err(|_| poisoned())?;
            return Ok(cache
                .values()
                .find(|info| info.qualified_name.subject_key() == subject)
                .cloned());
        }

        let dir = self.subject_dir(name)?;
        if !dir.is_dir() {
            return Ok(None);
        }
        for entry in fs::read_dir(&dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) == Some(EXTENSION) {
                return Self::load(&path).map(Some);
            }
        }
        Ok(None)
    }

    /// Schema file already occupying the subject directory, other than `own`
    fn bound_schema(&self, name: &QualifiedName, own: &Path) -> StorageResult<Option<String>> {
        let dir = self.subject_dir(name)?;
        if !dir.is_dir() {
            return Ok(None);
        }
        for entry in fs::read_dir(&dir)? {
            let path = entry?.path();
            if path != own && path.extension().and_then(|e| e.to_str()) == Some(EXTENSION) {
                let schema = path.file_stem().and_then(|s| s.to_str()).unwrap_or_default();
                return Ok(Some(format!("{}/{}", name.subject_key(), schema)));
            }
        }
        Ok(None)
    }
}

/// Reject names that would escape their directory
fn path_component(part: &str) -> StorageResult<&str> {
    let invalid = part.is_empty()
        || part == "."
        || part == ".."
        || part.contains(['/', '\\', '\0']);
    if invalid {
        return Err(StorageError::InvalidKey(part.to_string()));
    }
    Ok(part)
}

fn poisoned() -> StorageError {
    StorageError::Backend("file storage lock poisoned".to_string())
}

impl Storage for FileStorage {
    fn get(&self, name: &QualifiedName, use_cache: bool) -> StorageResult<Option<SchemaInfo>> {
        if use_cache {
            let cache = self.cache.read().map_err(|_| poisoned())?;
            return Ok(cache.get(&name.full_name()).cloned());
        }
        // Refresh under the write lock so a concurrent delete cannot be undone
        let _guard = self.write_lock.lock().map_err(|_| poisoned())?;
        let found = self.read_disk(name)?;
        if let Some(info) = &found {
            self.cache_put(info)?;
        }
        Ok(found)
    }

    fn register(&self, name: &QualifiedName, info: &SchemaInfo) -> StorageResult<()> {
        let _guard = self.write_lock.lock().map_err(|_| poisoned())?;
        let path = self.schema_path(name)?;
        if path.exists() {
            return Err(StorageError::Exists { key: name.full_name() });
        }
        if let Some(schema) = self.bound_schema(name, &path)? {
            return Err(StorageError::SubjectBound {
                subject: name.subject_key(),
                schema,
            });
        }

        Self::write_file(&path, info)?;
        self.cache_put(info)?;
        debug!(schema = %name.full_name(), path = %path.display(), "wrote new aggregate");
        Ok(())
    }

    fn update(&self, name: &QualifiedName, info: &SchemaInfo, expected: Revision) -> StorageResult<()> {
        let _guard = self.write_lock.lock().map_err(|_| poisoned())?;
        let key = name.full_name();
        check_revision(&key, self.read_disk(name)?.as_ref(), expected)?;

        let path = self.schema_path(name)?;
        Self::write_file(&path, info)?;
        self.cache_put(info)?;
        debug!(schema = %key, version = info.last_record_version(), "replaced aggregate");
        Ok(())
    }

    fn delete(&self, name: &QualifiedName, expected: Revision) -> StorageResult<()> {
        let _guard = self.write_lock.lock().map_err(|_| poisoned())?;
        let key = name.full_name();
        check_revision(&key, self.read_disk(name)?.as_ref(), expected)?;

        fs::remove_file(self.schema_path(name)?)?;
        let dir = self.subject_dir(name)?;
        if fs::read_dir(&dir)?.next().is_none() {
            fs::remove_dir(&dir)?;
        }
        self.cache_remove(&key)?;
        debug!(schema = %key, "removed aggregate");
        Ok(())
    }

    fn get_by_subject(&self, name: &QualifiedName, use_cache: bool) -> StorageResult<Option<SchemaRecord>> {
        Ok(self
            .subject_aggregate(name, use_cache)?
            .and_then(|info| select_record(&info, name)))
    }

    fn list_by_subject(&self, name: &QualifiedName, use_cache: bool) -> StorageResult<Option<Vec<SchemaRecord>>> {
        Ok(self
            .subject_aggregate(name, use_cache)?
            .map(|info| info.details.records().to_vec()))
    }
}
