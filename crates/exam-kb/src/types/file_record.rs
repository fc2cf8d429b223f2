//! File record types for the per-session registry

use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::Error;

/// Knowledge-base bucket a file belongs to
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Bucket {
    /// Study and reference material
    #[default]
    #[serde(alias = "knowledge")]
    Material,
    /// Exam-style questions with answers
    #[serde(alias = "questions")]
    QuestionBank,
}

impl Bucket {
    /// Both buckets in retrieval order
    pub const ALL: [Bucket; 2] = [Bucket::Material, Bucket::QuestionBank];

    /// Stable name used on the wire and in the CLI
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Material => "material",
            Self::QuestionBank => "question_bank",
        }
    }
}

impl fmt::Display for Bucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Bucket {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "material" | "knowledge" => Ok(Self::Material),
            "question_bank" | "question-bank" | "questions" => Ok(Self::QuestionBank),
            other => Err(Error::invalid_input(format!("Unknown bucket: {}", other))),
        }
    }
}

/// Metadata supplied when registering a stored file
#[derive(Debug, Clone)]
pub struct FileMetadata {
    /// Original filename
    pub name: String,
    /// Size in bytes
    pub size: u64,
    /// Declared MIME type
    pub mime_type: String,
    /// Where the bytes live
    pub storage_path: PathBuf,
    /// Upload time, `None` for now
    pub upload_time: Option<DateTime<Utc>>,
}

/// Record of an uploaded file. Content is never stored here; it is parsed from
/// `storage_path` on every read.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FileRecord {
    /// Unique within the session: `file_<counter>_<unix seconds>`
    #[serde(deserialize_with = "id_as_string")]
    pub id: String,
    /// Original filename as uploaded
    pub name: String,
    /// File size in bytes
    #[serde(default)]
    pub size: u64,
    /// Declared MIME type
    #[serde(alias = "type")]
    pub mime_type: String,
    /// Path of the stored bytes
    #[serde(alias = "path")]
    pub storage_path: PathBuf,
    /// When the file was uploaded
    #[serde(deserialize_with = "flexible_timestamp")]
    pub upload_time: DateTime<Utc>,
    /// Bucket, kept in step with the list the record lives in
    #[serde(default)]
    pub bucket: Bucket,
}

impl FileRecord {
    /// Build the identifier for a counter value and upload time
    pub fn make_id(counter: u64, at: DateTime<Utc>) -> String {
        format!("file_{}_{}", counter, at.timestamp())
    }

    /// String-normalized identifier comparison
    pub fn id_matches(&self, id: &str) -> bool {
        self.id.trim() == id.trim()
    }

    /// Whether the backing file is present
    pub fn exists_on_disk(&self) -> bool {
        self.storage_path.is_file()
    }
}

/// Records may carry numeric ids when written by other tools
fn id_as_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Text(String),
        Int(i64),
        Float(f64),
    }

    Ok(match RawId::deserialize(deserializer)? {
        RawId::Text(s) => s,
        RawId::Int(n) => n.to_string(),
        RawId::Float(f) => f.to_string(),
    })
}

/// Accept RFC 3339 timestamps and naive local ones (`2024-03-01T10:00:00.123456`)
fn flexible_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    if let Ok(dt) = DateTime::parse_from_rfc3339(&raw) {
        return Ok(dt.with_timezone(&Utc));
    }
    let naive = NaiveDateTime::parse_from_str(&raw, "%Y-%m-%dT%H:%M:%S%.f")
        .map_err(serde::de::Error::custom)?;
    Local
        .from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
        .ok_or_else(|| serde::de::Error::custom(format!("invalid local time: {}", raw)))
}

/// Both buckets of a session, in insertion order
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct BucketListing {
    pub material: Vec<FileRecord>,
    pub question_bank: Vec<FileRecord>,
}

impl BucketListing {
    /// Total number of records
    pub fn len(&self) -> usize {
        self.material.len() + self.question_bank.len()
    }

    /// Whether both buckets are empty
    pub fn is_empty(&self) -> bool {
        self.material.is_empty() && self.question_bank.is_empty()
    }

    /// All records, material first
    pub fn iter(&self) -> impl Iterator<Item = &FileRecord> {
        self.material.iter().chain(self.question_bank.iter())
    }
}

/// A record with content parsed for one response
#[derive(Debug, Clone, Serialize)]
pub struct FileWithContent {
    #[serde(flatten)]
    pub record: FileRecord,
    /// Rendered annotated text, or a parser diagnostic
    pub content: String,
}
