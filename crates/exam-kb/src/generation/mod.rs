//! Context assembly, prompts, answer post-processing and practice questions

pub mod citation;
pub mod context;
pub mod formula;
pub mod prompt;
pub mod questions;

pub use citation::{format_references, references_in_answer, truncate_snippet};
pub use context::{ContextAssembler, ContextSection};
pub use formula::latex_to_natural;
pub use prompt::PromptBuilder;
pub use questions::{fallback_questions, parse_generated, question_context};
