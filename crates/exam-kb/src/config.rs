//! Configuration for the knowledge base

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Main knowledge base configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KbConfig {
    /// Storage configuration
    #[serde(default)]
    pub storage: StorageConfig,
    /// Retrieval and context assembly configuration
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    /// Bucket classification for untracked uploads
    #[serde(default)]
    pub classification: ClassificationConfig,
    /// Chat model configuration
    #[serde(default)]
    pub model: ModelConfig,
}

impl KbConfig {
    /// Load configuration from an optional TOML file, then apply `EXAM_KB_*` overrides
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => {
                let raw = std::fs::read_to_string(path).map_err(|e| {
                    Error::Config(format!("Failed to read {}: {}", path.display(), e))
                })?;
                toml::from_str(&raw).map_err(|e| {
                    Error::Config(format!("Failed to parse {}: {}", path.display(), e))
                })?
            }
            None => Self::default(),
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Configuration rooted at a specific data directory
    pub fn with_data_dir(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            storage: StorageConfig {
                data_dir: data_dir.into(),
                ..StorageConfig::default()
            },
            ..Self::default()
        }
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(dir) = std::env::var("EXAM_KB_DATA_DIR") {
            self.storage.data_dir = PathBuf::from(dir);
        }
        if let Ok(url) = std::env::var("EXAM_KB_MODEL_BASE_URL") {
            self.model.base_url = url;
        }
        if let Ok(key) = std::env::var("EXAM_KB_MODEL_API_KEY") {
            self.model.api_key = Some(key);
        }
        if let Ok(model) = std::env::var("EXAM_KB_MODEL") {
            self.model.model = model;
        }
    }
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Root directory holding `users/` (session records) and `uploads/` (file bytes)
    pub data_dir: PathBuf,
    /// Maximum accepted upload size in bytes (default: 10MB)
    pub max_file_size: u64,
}

fn default_max_file_size() -> u64 {
    10 * 1024 * 1024
}

impl Default for StorageConfig {
    fn default() -> Self {
        let data_dir = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("exam-kb");

        Self {
            data_dir,
            max_file_size: default_max_file_size(),
        }
    }
}

impl StorageConfig {
    /// Directory holding one JSON record per session
    pub fn users_dir(&self) -> PathBuf {
        self.data_dir.join("users")
    }

    /// Directory holding one upload subtree per session
    pub fn uploads_dir(&self) -> PathBuf {
        self.data_dir.join("uploads")
    }
}

/// Retrieval and context assembly configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Characters of each file echoed into the model context
    pub excerpt_chars: usize,
    /// Ceiling for the whole assembled context
    pub max_context_chars: usize,
    /// Characters of a file or question quoted in a source reference
    pub reference_excerpt_chars: usize,
    /// Upper bound on a looked-up question body
    pub question_chars: usize,
    /// Upper bound on a looked-up answer
    pub answer_chars: usize,
    /// Upper bound on a looked-up explanation
    pub explanation_chars: usize,
    /// Query keywords that mark a question about the question bank
    pub question_keywords: Vec<String>,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            excerpt_chars: 500,
            max_context_chars: 12_000,
            reference_excerpt_chars: 200,
            question_chars: 2000,
            answer_chars: 1000,
            explanation_chars: 1000,
            question_keywords: ["题目", "题", "答案", "解答", "解析", "这道题", "这个题", "第几题"]
                .iter()
                .map(|k| k.to_string())
                .collect(),
        }
    }
}

/// Filename keywords used when adopting files found on disk
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassificationConfig {
    /// Lowercased filename fragments that place a file in the question bank
    pub question_bank_keywords: Vec<String>,
}

impl Default for ClassificationConfig {
    fn default() -> Self {
        Self {
            question_bank_keywords: ["题目", "题", "question", "test", "exam"]
                .iter()
                .map(|k| k.to_string())
                .collect(),
        }
    }
}

/// OpenAI-compatible chat model configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Base URL, `/chat/completions` is appended
    pub base_url: String,
    /// Bearer token
    pub api_key: Option<String>,
    /// Model name
    pub model: String,
    /// Sampling temperature
    pub temperature: f32,
    /// Completion token cap
    pub max_tokens: u32,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.stepfun.com/v1".to_string(),
            api_key: None,
            model: "step-1-8k".to_string(),
            temperature: 0.7,
            max_tokens: 2000,
            timeout_secs: 30,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: KbConfig = toml::from_str(
            r#"
            [storage]
            data_dir = "/tmp/kb"

            [model]
            base_url = "http://localhost:8000/v1"
            model = "local"
            temperature = 0.2
            max_tokens = 512
            timeout_secs = 5
            "#,
        )
        .unwrap();

        assert_eq!(config.storage.data_dir, PathBuf::from("/tmp/kb"));
        assert_eq!(config.storage.max_file_size, 10 * 1024 * 1024);
        assert_eq!(config.storage.users_dir(), PathBuf::from("/tmp/kb/users"));
        assert_eq!(config.retrieval.excerpt_chars, 500);
        assert!(config.model.api_key.is_none());
        assert!(config
            .classification
            .question_bank_keywords
            .contains(&"exam".to_string()));
    }

    #[test]
    fn test_single_key_sections() {
        let config: KbConfig = toml::from_str("[retrieval]\nexcerpt_chars = 300\n").unwrap();
        assert_eq!(config.retrieval.excerpt_chars, 300);
        assert_eq!(config.retrieval.max_context_chars, 12_000);
        assert_eq!(config.retrieval.question_keywords.len(), 8);

        let config: KbConfig = toml::from_str("[model]\nmodel = \"local\"\n").unwrap();
        assert_eq!(config.model.model, "local");
        assert_eq!(config.model.base_url, ModelConfig::default().base_url);
        assert_eq!(config.model.timeout_secs, 30);

        let config: KbConfig = toml::from_str("[storage]\nmax_file_size = 5\n").unwrap();
        assert_eq!(config.storage.max_file_size, 5);
        assert_eq!(config.storage.data_dir, StorageConfig::default().data_dir);

        let config: KbConfig =
            toml::from_str("[classification]\nquestion_bank_keywords = [\"quiz\"]\n").unwrap();
        assert_eq!(config.classification.question_bank_keywords, vec!["quiz"]);
    }
}
