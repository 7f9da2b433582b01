//! Identifier tokenizer
//!
//! String literals are blanked out before scanning so their contents never
//! reach the token stream.

use regex::Regex;
use std::sync::OnceLock;

/// Ordered identifier tokens; duplicates are kept
pub type TokenStream = Vec<String>;

static LITERAL: OnceLock<Regex> = OnceLock::new();
static IDENTIFIER: OnceLock<Regex> = OnceLock::new();

// Triple-quoted forms come first so `'''` is not read as an empty `''` plus a quote.
fn literal_pattern() -> &'static Regex {
    LITERAL.get_or_init(|| {
        Regex::new(r#"'''[\s\S]*?'''|"""[\s\S]*?"""|'[^']*'|"[^"]*""#)
            .expect("literal pattern is valid")
    })
}

fn identifier_pattern() -> &'static Regex {
    IDENTIFIER.get_or_init(|| {
        Regex::new(r"[A-Za-z_][A-Za-z0-9_.]*").expect("identifier pattern is valid")
    })
}

/// Replace every quoted literal region with a single space
pub fn strip_literals(text: &str) -> String {
    literal_pattern().replace_all(text, " ").into_owned()
}

/// Extract identifier-like tokens (including dotted attribute chains)
pub fn tokenize(text: &str) -> TokenStream {
    let stripped = strip_literals(text);
    identifier_pattern()
        .find_iter(&stripped)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Join tokens into a whitespace-delimited pseudo-document
pub fn pseudo_document(tokens: &[String]) -> String {
    tokens.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literal_contents_are_dropped() {
        let tokens = tokenize("x = 'SECRET_TOKEN'");
        assert!(tokens.contains(&"x".to_string()));
        assert!(!tokens.iter().any(|t| t.contains("SECRET_TOKEN")));
    }

    #[test]
    fn test_triple_quoted_spans_lines() {
        let code = "def f():\n    \"\"\"docstring with\n    hidden_name inside\"\"\"\n    return y\n";
        let tokens = tokenize(code);
        assert_eq!(tokens, vec!["def", "f", "return", "y"]);
    }

    #[test]
    fn test_dotted_chains_and_duplicates() {
        let tokens = tokenize("np.array(x) + np.array(x)");
        assert_eq!(tokens, vec!["np.array", "x", "np.array", "x"]);
    }

    #[test]
    fn test_digits_cannot_start_token() {
        let tokens = tokenize("a1 = 42 + _b2");
        assert_eq!(tokens, vec!["a1", "_b2"]);
    }

    #[test]
    fn test_empty_input() {
        assert!(tokenize("").is_empty());
        assert!(tokenize("'only a string'").is_empty());
    }

    #[test]
    fn test_pseudo_document() {
        let tokens = tokenize("foo(bar)");
        assert_eq!(pseudo_document(&tokens), "foo bar");
    }
}
