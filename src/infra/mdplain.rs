//! Markdown to plain text
//!
//! Strips the markup editors would otherwise show literally in completion
//! documentation. Intentionally lossy: structure is flattened, text is kept.

use std::sync::LazyLock;

use regex::Regex;

struct Rule {
    pattern: Regex,
    replacement: &'static str,
}

impl Rule {
    fn new(pattern: &str, replacement: &'static str) -> Self {
        Self {
            pattern: Regex::new(pattern).expect("markdown rule must compile"),
            replacement,
        }
    }
}

static RULES: LazyLock<Vec<Rule>> = LazyLock::new(|| {
    vec![
        // code fences
        Rule::new(r"(?m)^[ \t]*(```|~~~).*$\n?", ""),
        // html tags
        Rule::new(r"</?[A-Za-z][^>]*>", ""),
        // images, then links
        Rule::new(r"!\[([^\]]*)\]\([^)]*\)", "$1"),
        Rule::new(r"\[([^\]]+)\]\([^)]*\)", "$1"),
        // reference definitions
        Rule::new(r"(?m)^[ \t]{0,3}\[[^\]]+\]:[ \t]+\S+.*$\n?", ""),
        // headings
        Rule::new(r"(?m)^[ \t]{0,3}#{1,6}[ \t]+", ""),
        Rule::new(r"(?m)^[=\-]{2,}[ \t]*$\n?", ""),
        // blockquotes
        Rule::new(r"(?m)^[ \t]{0,3}>[ \t]?", ""),
        // horizontal rules
        Rule::new(r"(?m)^[ \t]*([*_][ \t]*){3,}$\n?", ""),
        // emphasis; single underscores are left alone to keep snake_case intact
        Rule::new(r"\*\*([^*]+)\*\*", "$1"),
        Rule::new(r"__([^_]+)__", "$1"),
        Rule::new(r"\*([^*\s][^*]*)\*", "$1"),
        Rule::new(r"~~([^~]+)~~", "$1"),
        // inline code
        Rule::new(r"`([^`]+)`", "$1"),
        // blank line runs
        Rule::new(r"\n{3,}", "\n\n"),
    ]
});

/// Remove markdown syntax from `input`, keeping the readable text
pub fn clean(input: &str) -> String {
    let mut text = input.to_string();
    for rule in RULES.iter() {
        text = rule
            .pattern
            .replace_all(&text, rule.replacement)
            .into_owned();
    }
    text.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_unchanged() {
        assert_eq!(clean("The number of instances"), "The number of instances");
    }

    #[test]
    fn test_inline_markup_removed() {
        assert_eq!(
            clean("Use **count** or `for_each`, see [docs](https://example.com)."),
            "Use count or for_each, see docs."
        );
    }

    #[test]
    fn test_snake_case_survives() {
        assert_eq!(clean("sets max_retry_count"), "sets max_retry_count");
    }

    #[test]
    fn test_block_markup_removed() {
        let input = "# Provider\n\n> Configures the provider.\n\n```hcl\nprovider \"aws\" {}\n```\n";
        assert_eq!(
            clean(input),
            "Provider\n\nConfigures the provider.\n\nprovider \"aws\" {}"
        );
    }

    #[test]
    fn test_html_and_emphasis() {
        assert_eq!(
            clean("<b>Required</b> *exactly* one ~~two~~"),
            "Required exactly one two"
        );
    }
}
