//! Document ingestion: format detection, decoding and structural annotation

mod classifier;
mod decode;
mod parser;
pub mod sections;

use std::path::{Path, PathBuf};
use thiserror::Error;

pub use classifier::classify_bucket;
pub use decode::{decode_text, decode_utf8_lines, DecodedLines};
pub use parser::DocumentParser;
pub use sections::{detector_for, SectionDetector, HEADING_PATTERNS};

use crate::types::AnnotatedContent;

/// Document parse failure. The display text is a diagnostic fit to show in
/// place of the file's content.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("文件不存在: {}", path.display())]
    Missing { path: PathBuf },

    #[error("文件读取失败: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("PDF解析失败: {message}")]
    Pdf { message: String },

    #[error("DOCX解析失败: {message}")]
    Docx { message: String },

    #[error("无法解析文件内容: {name}")]
    Undecodable { name: String },
}

impl ParseError {
    /// Human-readable diagnostic
    pub fn diagnostic(&self) -> String {
        self.to_string()
    }
}

/// Parse a stored file into annotated content
pub fn parse(path: &Path, mime_type: &str) -> Result<AnnotatedContent, ParseError> {
    DocumentParser::parse(path, mime_type)
}

/// Rendered content of a stored file, or the parse diagnostic when it cannot be read
pub fn read_content(path: &Path, mime_type: &str) -> String {
    match parse(path, mime_type) {
        Ok(content) => content.render(),
        Err(e) => {
            tracing::warn!("Degrading {} to diagnostic: {}", path.display(), e);
            e.diagnostic()
        }
    }
}
