//! Prompt templates for answer generation

use crate::types::{QuestionRequest, RetrievalStrategy};

/// Prompt builder for knowledge-base questions
pub struct PromptBuilder;

impl PromptBuilder {
    /// Build the `(system, user)` pair for a strategy that needs the model
    pub fn build(strategy: RetrievalStrategy, query: &str, context: &str) -> Option<(String, String)> {
        if strategy.answers_directly() {
            return None;
        }

        Some(match strategy {
            RetrievalStrategy::QuestionBankPriority => (
                Self::question_system_prompt(context),
                Self::question_user_message(query),
            ),
            _ => (
                Self::general_system_prompt(context),
                Self::general_user_message(query),
            ),
        })
    }

    /// System prompt when the user asks about question-bank questions
    pub fn question_system_prompt(context: &str) -> String {
        format!(
            r#"你是一个专业的考试复习助手，专门回答题库中的题目。

用户的知识库包含以下内容：

{context}

用户正在询问题库中的题目，请：

1. **优先从考试题目中查找相关题目**
2. **如果找到相关题目，提供完整的题目内容、答案和详细解析**
3. **如果题目中没有相关内容，基于复习资料提供相关知识点的解答**
4. **在回答中明确标注题目来源（来自题库 或 基于知识点）**
5. **提供详细的解题思路和步骤**

回答格式：
- 题目内容（如果来自题库）
- 答案
- 详细解析
- 解题思路
- 知识库引用

请确保回答准确、详细，并标注知识库引用。"#,
            context = context
        )
    }

    fn question_user_message(query: &str) -> String {
        format!(
            "用户问题：{}\n\n请从我的题库中查找相关题目并提供详细解答。如果题库中没有相关内容，请基于复习资料提供相关知识点的解答。",
            query
        )
    }

    /// System prompt for general knowledge questions
    pub fn general_system_prompt(context: &str) -> String {
        format!(
            r#"你是一个专业的考试复习助手，擅长基于用户提供的知识库内容回答问题。

用户的知识库包含以下内容：

{context}

请基于以上知识库内容回答用户的问题，并在回答中标注知识库引用。如果知识库中没有相关信息，请明确说明。

回答要求：
1. 准确回答用户问题
2. 基于知识库内容
3. 标注知识库引用
4. 如果可能，生成相关的练习题
5. 拒绝黄赌毒、暴力恐怖主义等内容"#,
            context = context
        )
    }

    fn general_user_message(query: &str) -> String {
        format!(
            "用户问题：{}\n\n请基于我的知识库内容回答这个问题，并在回答中标注知识库引用。",
            query
        )
    }

    /// `(system, user)` pair asking for practice questions as JSON
    pub fn question_generation(request: &QuestionRequest, context: &str) -> (String, String) {
        let system = format!(
            r#"你是一个专业的考试题目助手，擅长从考试题目库中提取题目或基于知识点生成同类型题目。

用户的知识库包含以下内容：

{context}

请按照以下优先级处理：

1. **优先从考试题目库提取**：如果考试题目库中有关于"{topic}"的题目，请直接提取并返回这些题目
2. **基于知识点生成同类型题目**：如果没有直接相关的题目，请基于复习资料中的知识点，参考考试题目库中的题目类型和风格，生成同类型的题目

题目要求：
1. 题目类型：{question_type}
2. 难度级别：{difficulty}
3. 数量：{count}道题目
4. 基于知识库内容
5. 包含详细答案和解释
6. 标注知识库引用
7. 拒绝黄赌毒、暴力恐怖主义等内容

请以JSON格式返回，格式如下：
{{
    "questions": [
        {{
            "question": "题目内容",
            "answer": "答案",
            "explanation": "详细解释",
            "difficulty": "{difficulty}",
            "type": "{question_type}",
            "references": ["引用文件1", "引用文件2"],
            "source": "extracted" 或 "generated"
        }}
    ],
    "total": {count},
    "source_type": "从题目库提取" 或 "基于知识点生成"
}}"#,
            context = context,
            topic = request.topic,
            question_type = request.question_type,
            difficulty = request.difficulty,
            count = request.count,
        );

        let user = format!(
            "请为\"{}\"生成{}道{}难度的{}题目。\n\n要求：\n1. 优先从考试题目库中提取相关题目\n2. 如果没有直接相关题目，请基于复习资料中的知识点，参考题目库的题型风格生成同类型题目\n3. 每道题都要标注来源（提取自题目库 或 基于知识点生成）\n4. 包含详细答案和解释",
            request.topic, request.count, request.difficulty, request.question_type
        );

        (system, user)
    }

    /// Answer shown when the model call fails
    pub fn model_failure_answer(error: &str) -> String {
        format!("抱歉，AI服务调用失败: {}。请检查网络连接或稍后重试。", error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direct_strategies_need_no_prompt() {
        assert!(PromptBuilder::build(RetrievalStrategy::EmptyKnowledgeBase, "q", "c").is_none());
        assert!(PromptBuilder::build(RetrievalStrategy::QuestionLookup, "q", "c").is_none());
    }

    #[test]
    fn test_question_generation_prompt() {
        let request = QuestionRequest::new("极限").with_count(3).with_question_type("short_answer");
        let (system, user) = PromptBuilder::question_generation(&request, "CTX");
        assert!(system.contains("\n\nCTX\n\n"));
        assert!(system.contains("关于\"极限\"的题目"));
        assert!(system.contains("3. 数量：3道题目"));
        assert!(system.contains("\"type\": \"short_answer\""));
        assert!(system.contains("\"total\": 3,"));
        assert!(user.starts_with("请为\"极限\"生成3道medium难度的short_answer题目。"));
    }

    #[test]
    fn test_templates_embed_context_and_query() {
        let (system, user) =
            PromptBuilder::build(RetrievalStrategy::QuestionBankPriority, "这道题怎么做", "CTX")
                .unwrap();
        assert!(system.contains("专门回答题库中的题目"));
        assert!(system.contains("\n\nCTX\n\n"));
        assert!(user.starts_with("用户问题：这道题怎么做"));

        let (system, user) =
            PromptBuilder::build(RetrievalStrategy::General, "什么是导数", "CTX").unwrap();
        assert!(system.contains("擅长基于用户提供的知识库内容回答问题"));
        assert!(user.contains("什么是导数"));
    }
}
