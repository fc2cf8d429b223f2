//! exam-kb: session-scoped knowledge base for exam revision
//!
//! Uploaded study material and question banks are parsed on demand into page- and
//! section-annotated text. Queries are answered by exact question-number lookup in the
//! question bank when possible, otherwise by assembling a bounded context for a chat model.

pub mod config;
pub mod error;
pub mod generation;
pub mod ingestion;
pub mod kb;
pub mod providers;
pub mod retrieval;
pub mod storage;
pub mod types;

pub use config::KbConfig;
pub use error::{Error, Result};
pub use ingestion::ParseError;
pub use kb::KnowledgeBase;
pub use providers::{ChatModel, OpenAiCompatibleModel};
pub use types::{
    Answer, Bucket, BucketListing, FileMetadata, FileRecord, FileWithContent, GeneratedQuestion,
    GeneratedQuestions, QuestionOrigin, QuestionRequest, RescanReport, Retrieval,
    RetrievalStrategy, SessionInfo, SourceRef, SyncReport,
};
