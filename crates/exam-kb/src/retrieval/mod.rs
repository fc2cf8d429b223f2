//! Retrieval over a session snapshot: question lookup, bucket prioritization
//! and generic context

mod engine;
pub mod question_lookup;

pub use engine::{Retriever, EMPTY_KNOWLEDGE_BASE_REPLY};
pub use question_lookup::{extract_question_number, find_question, QuestionLimits, QuestionMatch};

use crate::ingestion::ParseError;
use crate::types::AnnotatedContent;

/// A file's parsed content as seen by one retrieval pass
#[derive(Debug, Clone)]
pub struct LoadedFile {
    /// Original filename
    pub name: String,
    /// Locator-annotated text, or the parse diagnostic
    pub rendered: String,
    /// Text without locator prefixes, used for question lookup
    pub plain: String,
}

impl LoadedFile {
    /// Build from a parse result; failures degrade to the diagnostic text
    pub fn from_parse(name: impl Into<String>, parsed: Result<AnnotatedContent, ParseError>) -> Self {
        match parsed {
            Ok(content) => Self {
                name: name.into(),
                rendered: content.render(),
                plain: content.plain_text(),
            },
            Err(e) => {
                let diagnostic = e.diagnostic();
                Self {
                    name: name.into(),
                    rendered: diagnostic.clone(),
                    plain: diagnostic,
                }
            }
        }
    }

    /// File whose rendered and plain text are identical
    pub fn from_text(name: impl Into<String>, text: impl Into<String>) -> Self {
        let text = text.into();
        Self {
            name: name.into(),
            rendered: text.clone(),
            plain: text,
        }
    }
}
