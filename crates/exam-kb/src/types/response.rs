//! Response types for retrieval, answers and maintenance operations

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::file_record::FileRecord;

/// Which retrieval path produced a context
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RetrievalStrategy {
    /// Both buckets empty, fixed reply
    EmptyKnowledgeBase,
    /// Exact question-number match in the question bank
    QuestionLookup,
    /// Question keywords in the query, question bank listed first
    QuestionBankPriority,
    /// Every file, material then question bank
    General,
}

impl RetrievalStrategy {
    /// Whether the context is already the final answer
    pub fn answers_directly(&self) -> bool {
        matches!(self, Self::EmptyKnowledgeBase | Self::QuestionLookup)
    }
}

/// A file quoted as a source
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SourceRef {
    /// Source filename
    pub file_name: String,
    /// Leading excerpt of the quoted text
    pub excerpt: String,
}

impl SourceRef {
    /// Format for display under an answer
    pub fn format_inline(&self) -> String {
        format!("- {}: {}", self.file_name, self.excerpt)
    }
}

/// Result of a retrieval pass
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Retrieval {
    /// Path taken
    pub strategy: RetrievalStrategy,
    /// Context handed to the model, or the final text for direct strategies
    pub context_text: String,
    /// Sources identified during retrieval
    pub source_refs: Vec<SourceRef>,
}

/// Final answer for a query
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Answer {
    /// Answer text, with the reference block appended when any were found
    pub answer: String,
    /// Sources backing the answer
    pub references: Vec<SourceRef>,
    /// Retrieval path that produced it
    pub strategy: RetrievalStrategy,
}

/// Summary of a session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionInfo {
    pub session_id: String,
    pub created_at: DateTime<Utc>,
    pub material_count: usize,
    pub question_bank_count: usize,
}

/// Outcome of syncing one session against disk
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SyncReport {
    pub session_id: String,
    /// Records dropped because their file vanished
    pub removed: Vec<FileRecord>,
    /// Records still present
    pub remaining: usize,
    /// Whether the session document was rewritten
    pub persisted: bool,
}

/// Per-session rescan outcome
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRescan {
    pub session_id: String,
    /// Sync report on success
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<SyncReport>,
    /// Failure message otherwise
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Outcome of syncing every persisted session
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RescanReport {
    pub sessions: Vec<SessionRescan>,
    pub succeeded: usize,
    pub failed: usize,
    /// Cached sessions whose record file no longer exists
    #[serde(default)]
    pub evicted: Vec<String>,
}

impl RescanReport {
    /// Record one session result and update the counts
    pub fn record(&mut self, session_id: String, outcome: crate::Result<SyncReport>) {
        match outcome {
            Ok(report) => {
                self.succeeded += 1;
                self.sessions.push(SessionRescan {
                    session_id,
                    report: Some(report),
                    error: None,
                });
            }
            Err(e) => {
                self.failed += 1;
                self.sessions.push(SessionRescan {
                    session_id,
                    report: None,
                    error: Some(e.to_string()),
                });
            }
        }
    }

    /// Total records removed across all sessions
    pub fn total_removed(&self) -> usize {
        self.sessions
            .iter()
            .filter_map(|s| s.report.as_ref())
            .map(|r| r.removed.len())
            .sum()
    }
}
