//! Chat model trait for answer generation

use async_trait::async_trait;

use crate::error::Result;

/// A chat model that turns a system prompt and a user message into a reply
///
/// Implementations:
/// - `OpenAiCompatibleModel`: any `/chat/completions` endpoint
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Complete one exchange
    async fn complete(&self, system: &str, user: &str) -> Result<String>;

    /// Get provider name for logging
    fn name(&self) -> &str;

    /// Get the model being used
    fn model(&self) -> &str;
}
