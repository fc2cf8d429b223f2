//! Filename-based bucket classification

use crate::types::Bucket;

/// Pick a bucket for a file found on disk: question bank when the lowercased
/// filename contains any keyword, material otherwise
pub fn classify_bucket<S: AsRef<str>>(filename: &str, keywords: &[S]) -> Bucket {
    let lower = filename.to_lowercase();
    if keywords
        .iter()
        .any(|k| !k.as_ref().is_empty() && lower.contains(&k.as_ref().to_lowercase()))
    {
        Bucket::QuestionBank
    } else {
        Bucket::Material
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClassificationConfig;

    #[test]
    fn test_classify_bucket() {
        let keywords = ClassificationConfig::default().question_bank_keywords;

        assert_eq!(classify_bucket("2023期末考试题.pdf", &keywords), Bucket::QuestionBank);
        assert_eq!(classify_bucket("Final_EXAM.docx", &keywords), Bucket::QuestionBank);
        assert_eq!(classify_bucket("unit-test-3.txt", &keywords), Bucket::QuestionBank);
        assert_eq!(classify_bucket("高数笔记.md", &keywords), Bucket::Material);
        assert_eq!(classify_bucket("lecture.pdf", &keywords), Bucket::Material);
    }

    #[test]
    fn test_empty_keywords() {
        let none: [&str; 0] = [];
        assert_eq!(classify_bucket("exam.pdf", &none), Bucket::Material);
        assert_eq!(classify_bucket("exam.pdf", &[""]), Bucket::Material);
    }
}
