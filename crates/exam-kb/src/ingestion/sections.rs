//! Section heading detection for flat-text formats

use once_cell::sync::Lazy;
use regex::Regex;

use crate::types::FileType;

/// A named heading pattern
#[derive(Debug, Clone, Copy)]
pub struct HeadingPattern {
    pub name: &'static str,
    pub pattern: &'static str,
    /// Only applies to Markdown sources
    pub markdown_only: bool,
}

/// Every heading pattern the detectors use
pub const HEADING_PATTERNS: &[HeadingPattern] = &[
    HeadingPattern {
        name: "chapter",
        pattern: r"^第[0-9一二三四五六七八九十]+章",
        markdown_only: false,
    },
    HeadingPattern {
        name: "dotted_numeric",
        pattern: r"^\d+(\.\d+)+",
        markdown_only: false,
    },
    HeadingPattern {
        name: "markdown_atx",
        pattern: r"^#{1,6}\s+\S",
        markdown_only: true,
    },
];

static COMPILED: Lazy<Vec<(HeadingPattern, Regex)>> = Lazy::new(|| {
    HEADING_PATTERNS
        .iter()
        .map(|p| {
            let re = Regex::new(p.pattern).expect("heading patterns are valid regexes");
            (*p, re)
        })
        .collect()
});

/// Name of the first pattern matching a trimmed line
pub fn matching_pattern(line: &str, markdown: bool) -> Option<&'static str> {
    let line = line.trim();
    COMPILED
        .iter()
        .filter(|(p, _)| markdown || !p.markdown_only)
        .find(|(_, re)| re.is_match(line))
        .map(|(p, _)| p.name)
}

/// Decides whether a unit of text opens a new section
pub trait SectionDetector: Send + Sync {
    /// Returns the section title when `line` is a heading
    fn detect(&self, line: &str) -> Option<String>;
}

/// Chapter and dotted-numeric headings, for plain text and Word paragraphs
#[derive(Debug, Clone, Copy, Default)]
pub struct NumberedHeadingDetector;

impl SectionDetector for NumberedHeadingDetector {
    fn detect(&self, line: &str) -> Option<String> {
        matching_pattern(line, false).map(|_| line.trim().to_string())
    }
}

/// Numbered headings plus ATX headings
#[derive(Debug, Clone, Copy, Default)]
pub struct MarkdownHeadingDetector;

impl SectionDetector for MarkdownHeadingDetector {
    fn detect(&self, line: &str) -> Option<String> {
        let line = line.trim();
        match matching_pattern(line, true)? {
            "markdown_atx" => Some(line.trim_start_matches('#').trim().to_string()),
            _ => Some(line.to_string()),
        }
    }
}

/// Detector for a format family; paged and unknown formats carry no sections
pub fn detector_for(file_type: FileType) -> Option<Box<dyn SectionDetector>> {
    match file_type {
        FileType::Docx | FileType::Txt => Some(Box::new(NumberedHeadingDetector)),
        FileType::Markdown => Some(Box::new(MarkdownHeadingDetector)),
        FileType::Pdf | FileType::Unknown => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pattern_table_compiles() {
        assert_eq!(COMPILED.len(), HEADING_PATTERNS.len());
        let names: Vec<_> = HEADING_PATTERNS.iter().map(|p| p.name).collect();
        assert_eq!(names, vec!["chapter", "dotted_numeric", "markdown_atx"]);
    }

    #[test]
    fn test_numbered_headings() {
        let detector = NumberedHeadingDetector;
        assert_eq!(detector.detect("第三章 导数").as_deref(), Some("第三章 导数"));
        assert_eq!(detector.detect("  第12章 积分 ").as_deref(), Some("第12章 积分"));
        assert_eq!(detector.detect("2.1 极限的定义").as_deref(), Some("2.1 极限的定义"));
        assert_eq!(detector.detect("1.2.3 小节"), Some("1.2.3 小节".to_string()));
        assert!(detector.detect("2023年考试").is_none());
        assert!(detector.detect("本章第三节").is_none());
        assert!(detector.detect("# 标题").is_none());
    }

    #[test]
    fn test_markdown_headings() {
        let detector = MarkdownHeadingDetector;
        assert_eq!(detector.detect("## 复习要点").as_deref(), Some("复习要点"));
        assert_eq!(detector.detect("第一章 绪论").as_deref(), Some("第一章 绪论"));
        assert!(detector.detect("#no-space").is_none());
        assert!(detector.detect("####### too deep").is_none());
    }

    #[test]
    fn test_detector_for_family() {
        assert!(detector_for(FileType::Pdf).is_none());
        assert!(detector_for(FileType::Unknown).is_none());
        assert!(detector_for(FileType::Txt).is_some());
        assert_eq!(matching_pattern("3.4 节", false), Some("dotted_numeric"));
        assert_eq!(matching_pattern("# h", false), None);
        assert_eq!(matching_pattern("# h", true), Some("markdown_atx"));
    }
}
