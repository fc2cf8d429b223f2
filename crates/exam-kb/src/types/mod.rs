//! Core types for the knowledge base

pub mod document;
pub mod file_record;
pub mod question;
pub mod response;

pub use document::{mime_for_filename, AnnotatedContent, FileType, Locator, Segment, DOCX_MIME};
pub use file_record::{Bucket, BucketListing, FileMetadata, FileRecord, FileWithContent};
pub use question::{
    GeneratedQuestion, GeneratedQuestions, QuestionOrigin, QuestionRequest, MAX_QUESTION_COUNT,
};
pub use response::{
    Answer, RescanReport, Retrieval, RetrievalStrategy, SessionInfo, SessionRescan, SourceRef,
    SyncReport,
};
