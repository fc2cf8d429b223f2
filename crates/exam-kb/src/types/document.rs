//! Document types with page and section locators

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// MIME type for Word documents
pub const DOCX_MIME: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

/// Format families the parser distinguishes
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    /// PDF document, parsed page by page
    Pdf,
    /// Microsoft Word document (.docx), parsed paragraph by paragraph
    Docx,
    /// Plain text file
    Txt,
    /// Markdown file
    Markdown,
    /// Anything else, decoded best-effort
    Unknown,
}

fn is_generic_mime(mime_type: &str) -> bool {
    let essence = mime_type.split(';').next().unwrap_or("").trim();
    essence.is_empty() || essence.eq_ignore_ascii_case("application/octet-stream")
}

impl FileType {
    /// Detect file type from a declared MIME type
    pub fn from_mime(mime_type: &str) -> Self {
        let essence = mime_type
            .split(';')
            .next()
            .unwrap_or("")
            .trim()
            .to_lowercase();

        match essence.as_str() {
            "application/pdf" => Self::Pdf,
            DOCX_MIME => Self::Docx,
            "text/plain" => Self::Txt,
            "text/markdown" | "text/x-markdown" => Self::Markdown,
            _ => Self::Unknown,
        }
    }

    /// Detect file type from extension
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_lowercase().as_str() {
            "pdf" => Self::Pdf,
            "docx" => Self::Docx,
            "txt" | "text" => Self::Txt,
            "md" | "markdown" => Self::Markdown,
            _ => Self::Unknown,
        }
    }

    /// Resolve the format for a stored file: declared MIME first, extension only when
    /// the declared type is generic (empty or `application/octet-stream`)
    pub fn detect(mime_type: &str, path: &Path) -> Self {
        match Self::from_mime(mime_type) {
            Self::Unknown if is_generic_mime(mime_type) => path
                .extension()
                .and_then(|e| e.to_str())
                .map(Self::from_extension)
                .unwrap_or(Self::Unknown),
            detected => detected,
        }
    }

    /// Get display name
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Pdf => "PDF",
            Self::Docx => "Word Document (.docx)",
            Self::Txt => "Text File",
            Self::Markdown => "Markdown",
            Self::Unknown => "Unknown",
        }
    }
}

/// MIME type for a filename, as used when adopting files found on disk
pub fn mime_for_filename(filename: &str) -> String {
    let lower = filename.to_lowercase();
    if lower.ends_with(".md") || lower.ends_with(".markdown") {
        // canonical type regardless of the mime_guess table version
        return "text/markdown".to_string();
    }
    mime_guess::from_path(filename)
        .first()
        .map(|m| m.essence_str().to_string())
        .unwrap_or_else(|| "application/octet-stream".to_string())
}

/// Where a span of text came from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Locator {
    /// 1-indexed page of a paged document
    Page(u32),
    /// Most recent section heading
    Section(String),
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Page(n) => write!(f, "[page {}]", n),
            Self::Section(title) => write!(f, "[{}]", title),
        }
    }
}

/// One unit of annotated text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    /// Locator inherited by this unit, if any
    pub locator: Option<Locator>,
    /// Extracted text
    pub text: String,
    /// True for a standalone section marker
    pub is_heading: bool,
}

impl Segment {
    /// Text of a page
    pub fn page(number: u32, text: impl Into<String>) -> Self {
        Self {
            locator: Some(Locator::Page(number)),
            text: text.into(),
            is_heading: false,
        }
    }

    /// Standalone section marker
    pub fn heading(title: impl Into<String>) -> Self {
        let title = title.into();
        Self {
            locator: Some(Locator::Section(title.clone())),
            text: title,
            is_heading: true,
        }
    }

    /// Paragraph under an optional active section
    pub fn paragraph(section: Option<&str>, text: impl Into<String>) -> Self {
        Self {
            locator: section.map(|s| Locator::Section(s.to_string())),
            text: text.into(),
            is_heading: false,
        }
    }

    fn render(&self) -> String {
        match (&self.locator, self.is_heading) {
            (Some(locator @ Locator::Page(_)), _) => format!("{}\n{}", locator, self.text),
            (Some(locator), true) => locator.to_string(),
            (Some(locator), false) => format!("{} {}", locator, self.text),
            (None, _) => self.text.clone(),
        }
    }
}

/// Parser output: ordered segments plus the number of units that had to be skipped
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnotatedContent {
    /// Segments in document order
    pub segments: Vec<Segment>,
    /// Pages, paragraphs or lines dropped because they could not be extracted or decoded
    pub skipped_units: usize,
}

impl AnnotatedContent {
    /// Whether no text survived parsing
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Flatten into the text handed to retrieval
    pub fn render(&self) -> String {
        self.segments
            .iter()
            .map(Segment::render)
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Segment text without locator prefixes, used for structural lookups
    pub fn plain_text(&self) -> String {
        self.segments
            .iter()
            .map(|s| s.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Section titles in order of appearance
    pub fn section_titles(&self) -> Vec<&str> {
        self.segments
            .iter()
            .filter(|s| s.is_heading)
            .map(|s| s.text.as_str())
            .collect()
    }
}
