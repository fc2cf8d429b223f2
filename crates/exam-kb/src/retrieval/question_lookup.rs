//! Question-number lookup in question-bank text

use once_cell::sync::Lazy;
use regex::Regex;

use crate::config::RetrievalConfig;
use crate::generation::citation::take_chars;

static QUESTION_NUMBER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\d+[-_.．、]?\d+").expect("question number pattern is valid")
});

static SEPARATOR_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^[ \t]*-{3,}[ \t]*$").expect("separator pattern is valid"));

const QUESTION_LABEL: &str = "题目";
const ANSWER_LABEL: &str = "答案";
const EXPLANATION_LABEL: &str = "解析";

/// Character caps for each part of a looked-up question
#[derive(Debug, Clone, Copy)]
pub struct QuestionLimits {
    /// Characters of question text kept after the header
    pub question_chars: usize,
    pub answer_chars: usize,
    pub explanation_chars: usize,
}

impl Default for QuestionLimits {
    fn default() -> Self {
        Self::from(&RetrievalConfig::default())
    }
}

impl From<&RetrievalConfig> for QuestionLimits {
    fn from(config: &RetrievalConfig) -> Self {
        Self {
            question_chars: config.question_chars,
            answer_chars: config.answer_chars,
            explanation_chars: config.explanation_chars,
        }
    }
}

/// A question found in the question bank
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionMatch {
    /// Question text including its `题目` header
    pub question: String,
    /// Answer text including its label, empty when the block has none
    pub answer: String,
    /// Explanation text including its label, empty when the block has none
    pub explanation: String,
}

impl QuestionMatch {
    /// Fixed three-part layout returned to the user
    pub fn format(&self) -> String {
        format!(
            "【题目内容】\n{}\n\n【答案】\n{}\n\n【解析】\n{}",
            self.question, self.answer, self.explanation
        )
    }
}

/// First question-number-like token in a query (`2-2`, `3.1`, `12`, `4、5`)
pub fn extract_question_number(query: &str) -> Option<&str> {
    QUESTION_NUMBER.find(query).map(|m| m.as_str())
}

/// Find the first `题目 … <number>` block in `text` and split it into question,
/// answer and explanation
pub fn find_question(text: &str, number: &str, limits: &QuestionLimits) -> Option<QuestionMatch> {
    let header = match Regex::new(&format!(
        r"{}[\s\S]{{0,20}}?{}",
        QUESTION_LABEL,
        regex::escape(number)
    )) {
        Ok(re) => re,
        Err(e) => {
            tracing::warn!("Cannot build question header pattern for {}: {}", number, e);
            return None;
        }
    };

    let found = header.find(text)?;
    let rest = &text[found.end()..];
    let block_end = SEPARATOR_LINE
        .find(rest)
        .map(|m| found.end() + m.start())
        .unwrap_or(text.len());
    let block = &text[found.start()..block_end];
    let body_offset = found.end() - found.start();

    let answer_at = block[body_offset..].find(ANSWER_LABEL).map(|i| body_offset + i);
    let explanation_at = answer_at.and_then(|a| {
        block[a + ANSWER_LABEL.len()..]
            .find(EXPLANATION_LABEL)
            .map(|i| a + ANSWER_LABEL.len() + i)
    });

    let question_end = answer_at.unwrap_or(block.len());
    let question = format!(
        "{}{}",
        found.as_str(),
        take_chars(&block[body_offset..question_end], limits.question_chars)
    );

    let answer = answer_at
        .map(|a| {
            let end = explanation_at.unwrap_or(block.len());
            take_chars(&block[a..end], limits.answer_chars).trim().to_string()
        })
        .unwrap_or_default();

    let explanation = explanation_at
        .map(|e| take_chars(&block[e..], limits.explanation_chars).trim().to_string())
        .unwrap_or_default();

    Some(QuestionMatch {
        question: question.trim().to_string(),
        answer,
        explanation,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const BANK: &str = "期末模拟卷\n\
        题目 1-1：求 lim(x→0) sin x / x\n\
        答案：1\n\
        解析：重要极限\n\
        ---\n\
        题目 2-2：求 f(x)=x^2 的导数\n\
        答案：2x\n\
        解析：幂函数求导法则\n\
        ---\n\
        题目 3-1：只有题干\n";

    #[test]
    fn test_extract_question_number() {
        assert_eq!(extract_question_number("第2-2题怎么做"), Some("2-2"));
        assert_eq!(extract_question_number("讲讲3.1"), Some("3.1"));
        assert_eq!(extract_question_number("4、5 的答案"), Some("4、5"));
        assert_eq!(extract_question_number("2023年的真题"), Some("2023"));
        assert_eq!(extract_question_number("第5题"), None);
        assert_eq!(extract_question_number("没有数字"), None);
    }

    #[test]
    fn test_find_question_triple() {
        let found = find_question(BANK, "2-2", &QuestionLimits::default()).unwrap();
        assert_eq!(found.question, "题目 2-2：求 f(x)=x^2 的导数");
        assert_eq!(found.answer, "答案：2x");
        assert_eq!(found.explanation, "解析：幂函数求导法则");
        assert_eq!(
            found.format(),
            "【题目内容】\n题目 2-2：求 f(x)=x^2 的导数\n\n【答案】\n答案：2x\n\n【解析】\n解析：幂函数求导法则"
        );
    }

    #[test]
    fn test_block_stops_at_separator() {
        let found = find_question(BANK, "1-1", &QuestionLimits::default()).unwrap();
        assert_eq!(found.explanation, "解析：重要极限");
        assert!(!found.explanation.contains("2-2"));
    }

    #[test]
    fn test_answer_and_explanation_optional() {
        let found = find_question(BANK, "3-1", &QuestionLimits::default()).unwrap();
        assert_eq!(found.question, "题目 3-1：只有题干");
        assert!(found.answer.is_empty());
        assert!(found.explanation.is_empty());
    }

    #[test]
    fn test_number_is_matched_literally() {
        let text = "题目 2x2：这是一道用来干扰匹配的干扰项\n答案：错\n---\n题目 2.2：正确项\n答案：对";
        let found = find_question(text, "2.2", &QuestionLimits::default()).unwrap();
        assert_eq!(found.answer, "答案：对");
    }

    #[test]
    fn test_no_match() {
        assert!(find_question(BANK, "9-9", &QuestionLimits::default()).is_none());
        assert!(find_question(BANK, "2023", &QuestionLimits::default()).is_none());
    }

    #[test]
    fn test_parts_are_capped() {
        let text = format!("题目 5-5 {}\n答案：{}\n解析：{}", "问".repeat(50), "答".repeat(50), "析".repeat(50));
        let limits = QuestionLimits {
            question_chars: 10,
            answer_chars: 8,
            explanation_chars: 6,
        };
        let found = find_question(&text, "5-5", &limits).unwrap();
        assert_eq!(found.question.chars().count(), "题目 5-5".chars().count() + 10);
        assert_eq!(found.answer, format!("答案：{}", "答".repeat(5)));
        assert_eq!(found.explanation, format!("解析：{}", "析".repeat(3)));
    }
}
