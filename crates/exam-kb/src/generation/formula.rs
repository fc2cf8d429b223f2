//! Rewriting of LaTeX formulas in model answers

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

static FORMULA_PATTERNS: Lazy<[Regex; 3]> = Lazy::new(|| {
    [
        Regex::new(r"(?s)\$\$(.*?)\$\$").expect("display dollar pattern is valid"),
        Regex::new(r"(?s)\\\[(.*?)\\\]").expect("display bracket pattern is valid"),
        Regex::new(r"(?s)\\\((.*?)\\\)").expect("inline paren pattern is valid"),
    ]
});

/// Replace `$$…$$`, `\[…\]` and `\(…\)` with a plain-language marker
pub fn latex_to_natural(text: &str) -> String {
    FORMULA_PATTERNS.iter().fold(text.to_string(), |acc, re| {
        re.replace_all(&acc, |caps: &Captures| {
            format!("【公式内容：{}，请结合上下文理解】", caps[1].trim())
        })
        .into_owned()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_latex_to_natural() {
        assert_eq!(
            latex_to_natural("导数为 $$ 2x $$。"),
            "导数为 【公式内容：2x，请结合上下文理解】。"
        );
        assert_eq!(
            latex_to_natural(r"\[a^2+b^2\] 与 \(c\)"),
            "【公式内容：a^2+b^2，请结合上下文理解】 与 【公式内容：c，请结合上下文理解】"
        );
        assert_eq!(latex_to_natural("$$\nx\n$$"), "【公式内容：x，请结合上下文理解】");
        assert_eq!(latex_to_natural("价格 $5"), "价格 $5");
    }
}
