//! Bounded context assembly from bucket contents

use super::citation::{take_chars, truncate_snippet};
use crate::config::RetrievalConfig;
use crate::retrieval::LoadedFile;

/// Placeholder for an empty material bucket
pub const NO_MATERIAL: &str = "暂无复习资料";
/// Placeholder for an empty question bank
pub const NO_QUESTIONS: &str = "暂无考试题目";

/// One headed block of the context
#[derive(Debug, Clone, Copy)]
pub struct ContextSection<'a> {
    pub heading: &'a str,
    pub files: &'a [LoadedFile],
    pub placeholder: &'a str,
}

/// Formats bucket contents into a bounded context string
#[derive(Debug, Clone)]
pub struct ContextAssembler {
    excerpt_chars: usize,
    max_context_chars: usize,
}

impl ContextAssembler {
    pub fn new(excerpt_chars: usize, max_context_chars: usize) -> Self {
        Self {
            excerpt_chars,
            max_context_chars,
        }
    }

    /// Collapse whitespace and cut to the per-file excerpt length
    pub fn excerpt(&self, text: &str) -> String {
        let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
        truncate_snippet(&collapsed, self.excerpt_chars)
    }

    /// `- <name>: <excerpt>` line for a file
    pub fn file_line(&self, file: &LoadedFile) -> String {
        format!("- {}: {}", file.name, self.excerpt(&file.rendered))
    }

    /// Render sections in order, dropping entries past the overall ceiling
    pub fn assemble(&self, sections: &[ContextSection<'_>]) -> String {
        let mut out = String::new();
        let mut used = 0usize;

        'sections: for (i, section) in sections.iter().enumerate() {
            if i > 0 {
                out.push_str("\n\n");
            }
            out.push_str(section.heading);
            out.push('\n');

            if section.files.is_empty() {
                out.push_str(section.placeholder);
                continue;
            }

            for (j, file) in section.files.iter().enumerate() {
                let line = self.file_line(file);
                used += line.chars().count() + 1;
                if j > 0 {
                    out.push('\n');
                }
                out.push_str(&line);
                if used > self.max_context_chars {
                    break 'sections;
                }
            }
        }

        self.bound(out)
    }

    fn bound(&self, text: String) -> String {
        if text.chars().count() <= self.max_context_chars {
            return text;
        }
        let keep = self.max_context_chars.saturating_sub(3);
        format!("{}...", take_chars(&text, keep))
    }
}

impl From<&RetrievalConfig> for ContextAssembler {
    fn from(config: &RetrievalConfig) -> Self {
        Self::new(config.excerpt_chars, config.max_context_chars)
    }
}

impl Default for ContextAssembler {
    fn default() -> Self {
        Self::from(&RetrievalConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn files(names: &[(&str, &str)]) -> Vec<LoadedFile> {
        names
            .iter()
            .map(|(n, c)| LoadedFile::from_text(*n, *c))
            .collect()
    }

    #[test]
    fn test_excerpt_collapses_and_marks_truncation() {
        let assembler = ContextAssembler::new(5, 1000);
        assert_eq!(assembler.excerpt("a  b\n\nc"), "a b c");
        assert_eq!(assembler.excerpt("一二三四五六七"), "一二三四五...");
    }

    #[test]
    fn test_placeholders_and_order() {
        let assembler = ContextAssembler::default();
        let material = files(&[("笔记.txt", "极限\n定义")]);
        let none: Vec<LoadedFile> = Vec::new();

        let text = assembler.assemble(&[
            ContextSection {
                heading: "**复习资料：**",
                files: &material,
                placeholder: NO_MATERIAL,
            },
            ContextSection {
                heading: "**考试题目：**",
                files: &none,
                placeholder: NO_QUESTIONS,
            },
        ]);

        assert_eq!(
            text,
            "**复习资料：**\n- 笔记.txt: 极限 定义\n\n**考试题目：**\n暂无考试题目"
        );
    }

    #[test]
    fn test_entries_past_ceiling_dropped() {
        let assembler = ContextAssembler::new(50, 60);
        let many = files(&[
            ("a.txt", &"甲".repeat(50)),
            ("b.txt", &"乙".repeat(50)),
            ("c.txt", &"丙".repeat(50)),
        ]);

        let text = assembler.assemble(&[ContextSection {
            heading: "H",
            files: &many,
            placeholder: NO_MATERIAL,
        }]);

        assert!(text.chars().count() <= 60);
        assert!(text.ends_with("..."));
        assert!(!text.contains("丙"));
    }

    proptest! {
        #[test]
        fn prop_context_is_bounded(
            contents in prop::collection::vec(".{0,300}", 0..12),
            excerpt in 1usize..200,
            max in 3usize..2000,
        ) {
            let loaded: Vec<LoadedFile> = contents
                .iter()
                .enumerate()
                .map(|(i, c)| LoadedFile::from_text(format!("f{}.txt", i), c.clone()))
                .collect();
            let assembler = ContextAssembler::new(excerpt, max);
            let text = assembler.assemble(&[ContextSection {
                heading: "**复习资料：**",
                files: &loaded,
                placeholder: NO_MATERIAL,
            }]);
            prop_assert!(text.chars().count() <= max);
        }
    }
}
