//! Provider abstractions for the language model

pub mod llm;
pub mod openai;

pub use llm::ChatModel;
pub use openai::OpenAiCompatibleModel;
