//! Persisted per-session document

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::Path;

use crate::error::{Error, Result};
use crate::types::{Bucket, BucketListing, FileMetadata, FileRecord};

/// One session's file registry as stored in `users/<session>.json`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionState {
    #[serde(default)]
    pub session_id: String,
    #[serde(default, alias = "knowledge")]
    pub material: Vec<FileRecord>,
    #[serde(default, alias = "questions")]
    pub question_bank: Vec<FileRecord>,
    #[serde(default)]
    pub file_id_counter: u64,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

impl SessionState {
    /// Fresh, empty session
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            material: Vec::new(),
            question_bank: Vec::new(),
            file_id_counter: 0,
            created_at: Utc::now(),
        }
    }

    fn bucket_mut(&mut self, bucket: Bucket) -> &mut Vec<FileRecord> {
        match bucket {
            Bucket::Material => &mut self.material,
            Bucket::QuestionBank => &mut self.question_bank,
        }
    }

    /// Snapshot of both buckets
    pub fn listing(&self) -> BucketListing {
        BucketListing {
            material: self.material.clone(),
            question_bank: self.question_bank.clone(),
        }
    }

    /// Total number of records
    pub fn file_count(&self) -> usize {
        self.material.len() + self.question_bank.len()
    }

    /// Find a record in either bucket
    pub fn find(&self, id: &str) -> Option<&FileRecord> {
        self.material
            .iter()
            .chain(self.question_bank.iter())
            .find(|r| r.id_matches(id))
    }

    /// Whether any record already points at `path`
    pub fn references_path(&self, path: &Path) -> bool {
        let canonical = std::fs::canonicalize(path).ok();
        self.material
            .iter()
            .chain(self.question_bank.iter())
            .any(|r| {
                r.storage_path == path
                    || (canonical.is_some()
                        && std::fs::canonicalize(&r.storage_path).ok() == canonical)
            })
    }

    /// Register a file at the end of a bucket, bumping the id counter
    pub fn append(&mut self, bucket: Bucket, metadata: FileMetadata) -> FileRecord {
        let upload_time = metadata.upload_time.unwrap_or_else(Utc::now);

        let id = loop {
            self.file_id_counter += 1;
            let candidate = FileRecord::make_id(self.file_id_counter, upload_time);
            if self.find(&candidate).is_none() {
                break candidate;
            }
        };

        let record = FileRecord {
            id,
            name: metadata.name,
            size: metadata.size,
            mime_type: metadata.mime_type,
            storage_path: metadata.storage_path,
            upload_time,
            bucket,
        };
        self.bucket_mut(bucket).push(record.clone());
        record
    }

    /// Splice a record out of a bucket
    pub fn remove(&mut self, bucket: Bucket, id: &str) -> Option<FileRecord> {
        let records = self.bucket_mut(bucket);
        let index = records.iter().position(|r| r.id_matches(id))?;
        Some(records.remove(index))
    }

    /// Drop records whose backing file no longer exists
    pub fn retain_existing(&mut self) -> Vec<FileRecord> {
        let mut removed = Vec::new();
        for bucket in Bucket::ALL {
            let (kept, gone): (Vec<_>, Vec<_>) = std::mem::take(self.bucket_mut(bucket))
                .into_iter()
                .partition(FileRecord::exists_on_disk);
            *self.bucket_mut(bucket) = kept;
            removed.extend(gone);
        }
        removed
    }

    /// Align each record's bucket field with the list holding it
    fn normalize_buckets(&mut self) {
        for bucket in Bucket::ALL {
            for record in self.bucket_mut(bucket) {
                record.bucket = bucket;
            }
        }
    }

    /// Load a session document. `session_id` fills in records written without one.
    pub fn load(path: &Path, session_id: &str) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| Error::storage(path, e))?;
        let mut state: SessionState = serde_json::from_str(&raw)?;
        if state.session_id.is_empty() {
            state.session_id = session_id.to_string();
        }
        state.normalize_buckets();
        Ok(state)
    }

    /// Write the document next to `path` and atomically rename it into place
    pub fn save_atomic(&self, path: &Path) -> Result<()> {
        let dir = path
            .parent()
            .ok_or_else(|| Error::internal(format!("No parent directory for {}", path.display())))?;

        let data = serde_json::to_vec_pretty(self)?;
        let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(|e| Error::storage(dir, e))?;
        tmp.write_all(&data).map_err(|e| Error::storage(tmp.path(), e))?;
        tmp.as_file()
            .sync_all()
            .map_err(|e| Error::storage(tmp.path(), e))?;
        tmp.persist(path).map_err(|e| Error::storage(path, e.error))?;
        Ok(())
    }
}
