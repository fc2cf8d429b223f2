//! Strategy selection over a parsed session snapshot

use super::question_lookup::{extract_question_number, find_question, QuestionLimits};
use super::LoadedFile;
use crate::config::RetrievalConfig;
use crate::generation::citation::reference_excerpt;
use crate::generation::context::{ContextAssembler, ContextSection, NO_MATERIAL, NO_QUESTIONS};
use crate::types::{Retrieval, RetrievalStrategy, SourceRef};

/// Reply for a session with no files at all
pub const EMPTY_KNOWLEDGE_BASE_REPLY: &str = "知识库为空，请先上传复习资料或考试题目。";

const MATERIAL_HEADING: &str = "**复习资料：**";
const QUESTION_BANK_HEADING: &str = "**考试题目：**";

/// Deterministic retrieval engine
#[derive(Debug, Clone)]
pub struct Retriever {
    assembler: ContextAssembler,
    limits: QuestionLimits,
    question_keywords: Vec<String>,
    reference_chars: usize,
}

impl Retriever {
    pub fn new(config: &RetrievalConfig) -> Self {
        Self {
            assembler: ContextAssembler::from(config),
            limits: QuestionLimits::from(config),
            question_keywords: config.question_keywords.clone(),
            reference_chars: config.reference_excerpt_chars,
        }
    }

    /// Whether the query asks about exam questions
    pub fn is_question_query(&self, query: &str) -> bool {
        let lower = query.to_lowercase();
        self.question_keywords
            .iter()
            .any(|k| !k.is_empty() && lower.contains(k.as_str()))
    }

    /// Pick a strategy and build its context
    pub fn retrieve(
        &self,
        query: &str,
        material: &[LoadedFile],
        question_bank: &[LoadedFile],
    ) -> Retrieval {
        if material.is_empty() && question_bank.is_empty() {
            return Retrieval {
                strategy: RetrievalStrategy::EmptyKnowledgeBase,
                context_text: EMPTY_KNOWLEDGE_BASE_REPLY.to_string(),
                source_refs: Vec::new(),
            };
        }

        if let Some(found) = self.lookup_question(query, question_bank) {
            return found;
        }

        let material_section = ContextSection {
            heading: MATERIAL_HEADING,
            files: material,
            placeholder: NO_MATERIAL,
        };
        let question_section = ContextSection {
            heading: QUESTION_BANK_HEADING,
            files: question_bank,
            placeholder: NO_QUESTIONS,
        };

        if !question_bank.is_empty() && self.is_question_query(query) {
            tracing::debug!("Question keywords in query, question bank first");
            return Retrieval {
                strategy: RetrievalStrategy::QuestionBankPriority,
                context_text: self
                    .assembler
                    .assemble(&[question_section, material_section]),
                source_refs: Vec::new(),
            };
        }

        Retrieval {
            strategy: RetrievalStrategy::General,
            context_text: self
                .assembler
                .assemble(&[material_section, question_section]),
            source_refs: Vec::new(),
        }
    }

    fn lookup_question(&self, query: &str, question_bank: &[LoadedFile]) -> Option<Retrieval> {
        if question_bank.is_empty() {
            return None;
        }
        let number = extract_question_number(query)?;

        for file in question_bank {
            if let Some(found) = find_question(&file.plain, number, &self.limits) {
                tracing::info!("Question {} found in {}", number, file.name);
                return Some(Retrieval {
                    strategy: RetrievalStrategy::QuestionLookup,
                    context_text: found.format(),
                    source_refs: vec![SourceRef {
                        file_name: file.name.clone(),
                        excerpt: reference_excerpt(&found.question, self.reference_chars),
                    }],
                });
            }
        }

        tracing::debug!("Question number {} not found in question bank", number);
        None
    }
}

impl Default for Retriever {
    fn default() -> Self {
        Self::new(&RetrievalConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bank() -> Vec<LoadedFile> {
        vec![
            LoadedFile::from_text("第一套.txt", "题目 1-1：第一题\n答案：甲\n---\n"),
            LoadedFile::from_text(
                "第二套.txt",
                "题目 2-2：求导\n答案：2x\n解析：幂函数\n---\n题目 2-3：积分\n答案：C",
            ),
        ]
    }

    fn material() -> Vec<LoadedFile> {
        vec![LoadedFile::from_text("笔记.md", "[导数] 求导法则")]
    }

    #[test]
    fn test_empty_knowledge_base() {
        let r = Retriever::default().retrieve("2-2", &[], &[]);
        assert_eq!(r.strategy, RetrievalStrategy::EmptyKnowledgeBase);
        assert_eq!(r.context_text, EMPTY_KNOWLEDGE_BASE_REPLY);
        assert!(r.source_refs.is_empty());
    }

    #[test]
    fn test_question_lookup_first_file_wins() {
        let r = Retriever::default().retrieve("2-2这道题怎么做", &material(), &bank());
        assert_eq!(r.strategy, RetrievalStrategy::QuestionLookup);
        assert_eq!(
            r.context_text,
            "【题目内容】\n题目 2-2：求导\n\n【答案】\n答案：2x\n\n【解析】\n解析：幂函数"
        );
        assert_eq!(r.source_refs.len(), 1);
        assert_eq!(r.source_refs[0].file_name, "第二套.txt");
        assert_eq!(r.source_refs[0].excerpt, "题目 2-2：求导...");
    }

    #[test]
    fn test_unrelated_number_falls_through_to_keywords() {
        let r = Retriever::default().retrieve("2023年考过这道题吗", &material(), &bank());
        assert_eq!(r.strategy, RetrievalStrategy::QuestionBankPriority);
        assert!(r.context_text.starts_with(QUESTION_BANK_HEADING));
    }

    #[test]
    fn test_unrelated_number_falls_through_to_general() {
        let r = Retriever::default().retrieve("2023年的导数定义", &material(), &bank());
        assert_eq!(r.strategy, RetrievalStrategy::General);
        let material_at = r.context_text.find(MATERIAL_HEADING).unwrap();
        let bank_at = r.context_text.find(QUESTION_BANK_HEADING).unwrap();
        assert!(material_at < bank_at);
        assert!(r.context_text.contains("- 笔记.md: [导数] 求导法则"));
    }

    #[test]
    fn test_keywords_ignored_without_question_bank() {
        let r = Retriever::default().retrieve("这道题的答案", &material(), &[]);
        assert_eq!(r.strategy, RetrievalStrategy::General);
        assert!(r.context_text.ends_with(NO_QUESTIONS));
    }

    #[test]
    fn test_general_with_only_question_bank() {
        let r = Retriever::default().retrieve("导数", &[], &bank());
        assert_eq!(r.strategy, RetrievalStrategy::General);
        assert!(r.context_text.starts_with("**复习资料：**\n暂无复习资料"));
    }
}
