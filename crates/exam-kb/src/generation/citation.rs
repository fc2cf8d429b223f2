//! Post-hoc citation extraction and snippet truncation

use crate::retrieval::LoadedFile;
use crate::types::SourceRef;

/// First `max_chars` characters of a snippet
pub fn take_chars(snippet: &str, max_chars: usize) -> &str {
    match snippet.char_indices().nth(max_chars) {
        Some((idx, _)) => &snippet[..idx],
        None => snippet,
    }
}

/// Truncate a snippet to `max_chars` characters, marking the cut with `...`
pub fn truncate_snippet(snippet: &str, max_chars: usize) -> String {
    let head = take_chars(snippet, max_chars);
    if head.len() == snippet.len() {
        snippet.to_string()
    } else {
        format!("{}...", head)
    }
}

/// Reference excerpt: leading characters always followed by `...`
pub fn reference_excerpt(text: &str, max_chars: usize) -> String {
    format!("{}...", take_chars(text, max_chars))
}

/// Files whose name appears verbatim in a model answer
pub fn references_in_answer(answer: &str, files: &[LoadedFile], excerpt_chars: usize) -> Vec<SourceRef> {
    files
        .iter()
        .filter(|f| !f.name.is_empty() && answer.contains(&f.name))
        .map(|f| SourceRef {
            file_name: f.name.clone(),
            excerpt: reference_excerpt(&f.rendered, excerpt_chars),
        })
        .collect()
}

/// Reference block appended under an answer
pub fn format_references(references: &[SourceRef]) -> String {
    if references.is_empty() {
        return String::new();
    }

    let mut block = String::from("\n\n**知识库引用：**\n");
    for reference in references {
        block.push_str(&reference.format_inline());
        block.push('\n');
    }
    block
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_snippet() {
        assert_eq!(truncate_snippet("短文本", 10), "短文本");
        assert_eq!(truncate_snippet("一二三四五", 3), "一二三...");
        assert_eq!(truncate_snippet("abc", 3), "abc");
        assert_eq!(reference_excerpt("abc", 10), "abc...");
    }

    #[test]
    fn test_references_in_answer() {
        let files = vec![
            LoadedFile::from_text("高数笔记.pdf", "[page 1]\n极限与连续"),
            LoadedFile::from_text("线代.docx", "矩阵"),
        ];

        let refs = references_in_answer("根据高数笔记.pdf第1页，极限……", &files, 4);
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].file_name, "高数笔记.pdf");
        assert_eq!(refs[0].excerpt, "[pag...");

        let block = format_references(&refs);
        assert_eq!(block, "\n\n**知识库引用：**\n- 高数笔记.pdf: [pag...\n");
        assert!(format_references(&[]).is_empty());
    }
}
