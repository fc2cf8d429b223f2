//! Multi-format document parser producing page- and section-annotated text

use std::fmt::Display;
use std::path::Path;

use super::decode::{decode_text, decode_utf8_lines, DecodedLines};
use super::sections::{detector_for, SectionDetector};
use super::ParseError;
use crate::types::{AnnotatedContent, FileType, Segment};

/// Normalize ligatures, odd hyphens and spaces that PDF fonts leave behind
fn cleanup_pdf_text(text: &str) -> String {
    text.replace('\0', "")
        .replace('\u{00A0}', " ") // Non-breaking space -> space
        .replace('\u{2010}', "-") // Hyphen -> regular hyphen
        .replace('\u{2011}', "-") // Non-breaking hyphen -> hyphen
        .replace('\u{2212}', "-") // Minus sign -> hyphen
        .replace('\u{FB01}', "fi")
        .replace('\u{FB02}', "fl")
        .replace('\u{FB00}', "ff")
        .replace('\u{FB03}', "ffi")
        .replace('\u{FB04}', "ffl")
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Stateless document parser
pub struct DocumentParser;

impl DocumentParser {
    /// Parse a stored file according to its declared MIME type
    pub fn parse(path: &Path, mime_type: &str) -> Result<AnnotatedContent, ParseError> {
        if !path.is_file() {
            return Err(ParseError::Missing {
                path: path.to_path_buf(),
            });
        }

        let data = std::fs::read(path).map_err(|source| ParseError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        Self::parse_bytes(&name, FileType::detect(mime_type, path), &data)
    }

    /// Parse in-memory bytes of a known format
    pub fn parse_bytes(
        name: &str,
        file_type: FileType,
        data: &[u8],
    ) -> Result<AnnotatedContent, ParseError> {
        tracing::debug!("Parsing {} as {}", name, file_type.display_name());

        match file_type {
            FileType::Pdf => Self::parse_pdf(data),
            FileType::Docx => Self::parse_docx(data),
            FileType::Txt | FileType::Markdown => Self::parse_text(name, data, file_type),
            FileType::Unknown => Self::parse_unknown(name, data),
        }
    }

    /// Parse PDF document page by page
    fn parse_pdf(data: &[u8]) -> Result<AnnotatedContent, ParseError> {
        let doc = lopdf::Document::load_mem(data).map_err(|e| ParseError::Pdf {
            message: e.to_string(),
        })?;

        let pages = doc.get_pages();
        tracing::debug!("PDF has {} pages", pages.len());

        Self::collect_pages(
            pages
                .keys()
                .map(|&number| (number, doc.extract_text(&[number]))),
        )
    }

    /// Assemble per-page extraction results, skipping pages that failed or came back empty
    pub(crate) fn collect_pages<I, E>(pages: I) -> Result<AnnotatedContent, ParseError>
    where
        I: IntoIterator<Item = (u32, Result<String, E>)>,
        E: Display,
    {
        let mut content = AnnotatedContent::default();

        for (number, extracted) in pages {
            match extracted {
                Ok(text) => {
                    let text = cleanup_pdf_text(&text);
                    if text.is_empty() {
                        tracing::warn!("PDF page {} has no extractable text, skipping", number);
                        content.skipped_units += 1;
                    } else {
                        content.segments.push(Segment::page(number, text));
                    }
                }
                Err(e) => {
                    tracing::warn!("PDF page {} extraction failed: {}", number, e);
                    content.skipped_units += 1;
                }
            }
        }

        if content.is_empty() {
            return Err(ParseError::Pdf {
                message: format!(
                    "no extractable text on any of {} pages",
                    content.skipped_units
                ),
            });
        }

        Ok(content)
    }

    /// Parse DOCX document paragraph by paragraph
    fn parse_docx(data: &[u8]) -> Result<AnnotatedContent, ParseError> {
        let doc = docx_rs::read_docx(data).map_err(|e| ParseError::Docx {
            message: e.to_string(),
        })?;

        let mut paragraphs = Vec::new();
        for child in doc.document.children {
            if let docx_rs::DocumentChild::Paragraph(p) = child {
                let mut text = String::new();
                for child in p.children {
                    if let docx_rs::ParagraphChild::Run(run) = child {
                        for child in run.children {
                            if let docx_rs::RunChild::Text(t) = child {
                                text.push_str(&t.text);
                            }
                        }
                    }
                }
                paragraphs.push(text);
            }
        }

        let detector = detector_for(FileType::Docx);
        Ok(annotate_units(
            paragraphs.iter().map(String::as_str),
            detector.as_deref(),
        ))
    }

    /// Parse plain text or markdown
    fn parse_text(
        name: &str,
        data: &[u8],
        file_type: FileType,
    ) -> Result<AnnotatedContent, ParseError> {
        let DecodedLines { lines, skipped } = decode_text(data);
        if skipped > 0 {
            tracing::warn!("Skipped {} undecodable lines in {}", skipped, name);
        }

        let detector = detector_for(file_type);
        let mut content = annotate_units(lines.iter().map(String::as_str), detector.as_deref());
        content.skipped_units += skipped;

        if content.is_empty() && skipped > 0 {
            return Err(ParseError::Undecodable {
                name: name.to_string(),
            });
        }
        Ok(content)
    }

    /// Best-effort parse of an unrecognised format
    fn parse_unknown(name: &str, data: &[u8]) -> Result<AnnotatedContent, ParseError> {
        let DecodedLines { lines, skipped } = decode_utf8_lines(data);
        let mut content = annotate_units(lines.iter().map(String::as_str), None);
        content.skipped_units += skipped;

        if content.is_empty() {
            return Err(ParseError::Undecodable {
                name: name.to_string(),
            });
        }
        Ok(content)
    }
}

/// Turn text units into segments, tracking the active section
fn annotate_units<'a>(
    units: impl Iterator<Item = &'a str>,
    detector: Option<&dyn SectionDetector>,
) -> AnnotatedContent {
    let mut content = AnnotatedContent::default();
    let mut section: Option<String> = None;

    for unit in units {
        let text = unit.trim();
        if text.is_empty() {
            continue;
        }

        match detector.and_then(|d| d.detect(text)) {
            Some(title) => {
                content.segments.push(Segment::heading(title.clone()));
                section = Some(title);
            }
            None => content
                .segments
                .push(Segment::paragraph(section.as_deref(), text)),
        }
    }

    content
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Locator;

    #[test]
    fn test_text_sections() {
        let text = "前言部分\n\n第一章 函数\n函数的定义\n1.1 映射\n映射的概念\n";
        let content = DocumentParser::parse_bytes("notes.txt", FileType::Txt, text.as_bytes())
            .unwrap();

        assert_eq!(content.section_titles(), vec!["第一章 函数", "1.1 映射"]);
        assert_eq!(content.segments[0].locator, None);
        assert_eq!(
            content.segments[2].locator,
            Some(Locator::Section("第一章 函数".to_string()))
        );
        assert_eq!(
            content.render(),
            "前言部分\n[第一章 函数]\n[第一章 函数] 函数的定义\n[1.1 映射]\n[1.1 映射] 映射的概念"
        );
    }

    #[test]
    fn test_markdown_atx_sections() {
        let text = "# 导数\n求导法则\n## 链式法则\n复合函数";
        let content =
            DocumentParser::parse_bytes("notes.md", FileType::Markdown, text.as_bytes()).unwrap();
        assert_eq!(content.section_titles(), vec!["导数", "链式法则"]);

        // ATX headings are plain paragraphs in text files
        let content = DocumentParser::parse_bytes("notes.txt", FileType::Txt, text.as_bytes())
            .unwrap();
        assert!(content.section_titles().is_empty());
    }

    #[test]
    fn test_pdf_page_failure_does_not_abort_later_pages() {
        let pages: Vec<(u32, Result<String, String>)> = vec![
            (1, Ok("第一页\u{FB01}".to_string())),
            (2, Err("bad font encoding".to_string())),
            (3, Ok("   \n ".to_string())),
            (4, Ok("第四页".to_string())),
        ];

        let content = DocumentParser::collect_pages(pages).unwrap();
        assert_eq!(content.segments.len(), 2);
        assert_eq!(content.skipped_units, 2);
        assert_eq!(content.segments[1].locator, Some(Locator::Page(4)));
        assert_eq!(content.render(), "[page 1]\n第一页fi\n[page 4]\n第四页");
    }

    #[test]
    fn test_pdf_all_pages_failed() {
        let pages: Vec<(u32, Result<String, String>)> =
            vec![(1, Err("boom".to_string())), (2, Ok(String::new()))];

        let err = DocumentParser::collect_pages(pages).unwrap_err();
        assert!(err.diagnostic().starts_with("PDF解析失败"));
    }

    #[test]
    fn test_invalid_pdf_and_docx_bytes() {
        let err = DocumentParser::parse_bytes("a.pdf", FileType::Pdf, b"not a pdf").unwrap_err();
        assert!(matches!(err, ParseError::Pdf { .. }));

        let err = DocumentParser::parse_bytes("a.docx", FileType::Docx, b"not a zip").unwrap_err();
        assert!(matches!(err, ParseError::Docx { .. }));
    }

    #[test]
    fn test_unknown_format_diagnostic() {
        let err = DocumentParser::parse_bytes("blob.bin", FileType::Unknown, b"\xff\xfe\xfd")
            .unwrap_err();
        assert_eq!(err.diagnostic(), "无法解析文件内容: blob.bin");

        let content =
            DocumentParser::parse_bytes("data.csv", FileType::Unknown, b"a,b\n\xff\n1,2").unwrap();
        assert_eq!(content.render(), "a,b\n1,2");
        assert_eq!(content.skipped_units, 1);
    }

    #[test]
    fn test_missing_file() {
        let err = DocumentParser::parse(Path::new("/nonexistent/x.txt"), "text/plain").unwrap_err();
        assert!(matches!(err, ParseError::Missing { .. }));
    }
}
