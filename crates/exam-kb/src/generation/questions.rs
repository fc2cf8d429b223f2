//! Practice-question generation: context, reply parsing and template fallback

use super::context::{ContextAssembler, ContextSection, NO_MATERIAL, NO_QUESTIONS};
use super::formula::latex_to_natural;
use crate::retrieval::LoadedFile;
use crate::types::{GeneratedQuestion, GeneratedQuestions, QuestionOrigin, QuestionRequest};

const MATERIAL_HEADING: &str = "**复习资料：**";
const QUESTION_LIBRARY_HEADING: &str = "**考试题目库：**";

/// Label for questions taken from the question bank
pub const SOURCE_EXTRACTED: &str = "从题目库提取";
/// Label for questions written from the study material
pub const SOURCE_GENERATED: &str = "基于知识点生成";
/// Label when the model did not say
pub const SOURCE_UNKNOWN: &str = "未知";

/// References listed on each template question
const TEMPLATE_REFERENCES: usize = 2;

/// Material then question bank, both bounded by the assembler
pub fn question_context(
    assembler: &ContextAssembler,
    material: &[LoadedFile],
    question_bank: &[LoadedFile],
) -> String {
    assembler.assemble(&[
        ContextSection {
            heading: MATERIAL_HEADING,
            files: material,
            placeholder: NO_MATERIAL,
        },
        ContextSection {
            heading: QUESTION_LIBRARY_HEADING,
            files: question_bank,
            placeholder: NO_QUESTIONS,
        },
    ])
}

/// Pull the outermost `{ … }` object out of a model reply and decode it.
///
/// Returns `None` when there is no object, it does not decode, or it holds no questions.
pub fn parse_generated(reply: &str) -> Option<GeneratedQuestions> {
    let start = reply.find('{')?;
    let end = reply.rfind('}')?;
    if end <= start {
        return None;
    }

    let mut parsed: GeneratedQuestions = match serde_json::from_str(&reply[start..=end]) {
        Ok(parsed) => parsed,
        Err(e) => {
            tracing::warn!("Generated questions are not valid JSON: {}", e);
            return None;
        }
    };
    if parsed.questions.is_empty() {
        return None;
    }

    for question in &mut parsed.questions {
        question.question = latex_to_natural(&question.question);
        question.answer = latex_to_natural(&question.answer);
        question.explanation = latex_to_natural(&question.explanation);
    }
    parsed.total = parsed.questions.len();
    if parsed.source_type.trim().is_empty() {
        parsed.source_type = SOURCE_UNKNOWN.to_string();
    }
    parsed.fallback = false;
    Some(parsed)
}

/// Template questions used when the model is unavailable or its reply is unusable.
///
/// Draws from the question bank when it has files, otherwise from the material.
pub fn fallback_questions(
    request: &QuestionRequest,
    material_names: &[String],
    question_bank_names: &[String],
) -> GeneratedQuestions {
    let topic = request.topic.as_str();
    let from_bank = !question_bank_names.is_empty();
    let (origin, names, source_type) = if from_bank {
        (QuestionOrigin::Extracted, question_bank_names, SOURCE_EXTRACTED)
    } else {
        (QuestionOrigin::Generated, material_names, SOURCE_GENERATED)
    };
    let references: Vec<String> = names.iter().take(TEMPLATE_REFERENCES).cloned().collect();

    let question = |question: String, answer: String, explanation: String| GeneratedQuestion {
        question,
        answer,
        explanation,
        difficulty: request.difficulty.clone(),
        question_type: request.question_type.clone(),
        references: references.clone(),
        origin,
    };

    let mut questions = if from_bank {
        vec![
            question(
                format!("从您的考试题目库中提取的关于{topic}的题目：请解释{topic}的核心概念。"),
                format!("{topic}的核心概念包括..."),
                format!("这道题来自您的考试题目库，{topic}是一个重要的概念，涉及多个方面..."),
            ),
            question(
                format!("题目库中的{topic}相关题目：{topic}在实际应用中的主要优势是什么？"),
                "主要优势包括...".to_string(),
                format!("根据您的考试题目库，{topic}在实际应用中具有以下优势..."),
            ),
        ]
    } else {
        vec![
            question(
                format!("基于您的复习资料，请解释{topic}的核心概念是什么？"),
                format!("{topic}的核心概念包括..."),
                format!("根据您上传的复习资料，{topic}是一个重要的概念，涉及多个方面..."),
            ),
            question(
                format!("在{topic}领域，最重要的技术或方法是什么？"),
                "最重要的技术包括...".to_string(),
                format!("根据您的复习资料，{topic}领域有多种重要技术..."),
            ),
        ]
    };

    while questions.len() < request.count {
        let n = questions.len() + 1;
        questions.push(if from_bank {
            question(
                format!("题目库中的{topic}题目{n}：请分析{topic}的某个特定方面。"),
                "分析结果：...".to_string(),
                format!("这道题来自您的考试题目库，分析了{topic}的特定方面..."),
            )
        } else {
            question(
                format!("基于复习资料生成的{topic}题目{n}：如何评估{topic}的性能？"),
                "评估方法包括...".to_string(),
                format!("根据您的复习资料，评估{topic}性能的方法有..."),
            )
        });
    }
    questions.truncate(request.count);

    GeneratedQuestions {
        total: questions.len(),
        questions,
        source_type: source_type.to_string(),
        fallback: true,
    }
}
