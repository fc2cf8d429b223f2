//! Practice-question generation request and result types

use serde::{Deserialize, Serialize};

/// Largest number of questions one request may ask for
pub const MAX_QUESTION_COUNT: usize = 50;

/// Request for practice questions on a topic
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct QuestionRequest {
    /// Topic the questions should cover
    pub topic: String,

    /// Difficulty label passed to the model (default: "medium")
    #[serde(default = "default_difficulty")]
    pub difficulty: String,

    /// Number of questions (default: 5)
    #[serde(default = "default_count")]
    pub count: usize,

    /// Question type label (default: "multiple_choice")
    #[serde(default = "default_question_type")]
    pub question_type: String,
}

fn default_difficulty() -> String {
    "medium".to_string()
}

fn default_count() -> usize {
    5
}

fn default_question_type() -> String {
    "multiple_choice".to_string()
}

impl QuestionRequest {
    /// Request with default difficulty, count and type
    pub fn new(topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            difficulty: default_difficulty(),
            count: default_count(),
            question_type: default_question_type(),
        }
    }

    /// Set the number of questions
    pub fn with_count(mut self, count: usize) -> Self {
        self.count = count;
        self
    }

    /// Set the difficulty label
    pub fn with_difficulty(mut self, difficulty: impl Into<String>) -> Self {
        self.difficulty = difficulty.into();
        self
    }

    /// Set the question type label
    pub fn with_question_type(mut self, question_type: impl Into<String>) -> Self {
        self.question_type = question_type.into();
        self
    }
}

/// Where a generated question came from
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum QuestionOrigin {
    /// Taken from the question bank
    Extracted,
    /// Written from the study material
    #[default]
    Generated,
}

/// One practice question
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default)]
pub struct GeneratedQuestion {
    pub question: String,
    pub answer: String,
    pub explanation: String,
    pub difficulty: String,
    #[serde(rename = "type")]
    pub question_type: String,
    /// File names the question draws on
    pub references: Vec<String>,
    #[serde(rename = "source")]
    pub origin: QuestionOrigin,
}

/// A batch of practice questions
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct GeneratedQuestions {
    #[serde(default)]
    pub questions: Vec<GeneratedQuestion>,
    /// Number of questions returned
    #[serde(default)]
    pub total: usize,
    /// Human-readable origin label (`从题目库提取` / `基于知识点生成`)
    #[serde(default)]
    pub source_type: String,
    /// Whether the batch is the built-in template set rather than a model reply
    #[serde(default)]
    pub fallback: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_defaults() {
        let request: QuestionRequest = serde_json::from_str(r#"{"topic": "极限"}"#).unwrap();
        assert_eq!(request, QuestionRequest::new("极限"));
        assert_eq!(request.count, 5);
        assert_eq!(request.difficulty, "medium");
        assert_eq!(request.question_type, "multiple_choice");
    }

    #[test]
    fn test_question_wire_names() {
        let question: GeneratedQuestion = serde_json::from_str(
            r#"{"question": "q", "answer": "a", "type": "short_answer", "source": "extracted"}"#,
        )
        .unwrap();
        assert_eq!(question.question_type, "short_answer");
        assert_eq!(question.origin, QuestionOrigin::Extracted);
        assert!(question.references.is_empty());

        let value = serde_json::to_value(&question).unwrap();
        assert_eq!(value["type"], "short_answer");
        assert_eq!(value["source"], "extracted");
    }
}
