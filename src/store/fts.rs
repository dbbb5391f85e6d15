//! Free text → FTS5 MATCH expression
//!
//! Raw user text can contain FTS5 syntax (quotes, `NEAR`, column filters,
//! `*`). Only alphanumeric tokens survive, each one quoted, OR-ed together
//! so that an item matching any token participates in the ranking.

/// Split free text into lowercase alphanumeric tokens.
pub fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_lowercase())
        .collect()
}

/// Build a MATCH expression, or `None` when the text has no searchable token.
pub fn match_expression(text: &str) -> Option<String> {
    let mut tokens = tokenize(text);
    tokens.dedup();
    if tokens.is_empty() {
        return None;
    }

    Some(
        tokens
            .iter()
            .map(|t| format!("\"{t}\""))
            .collect::<Vec<_>>()
            .join(" OR "),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize_strips_syntax() {
        assert_eq!(
            tokenize("auth* NEAR(\"token\" refresh) col:value"),
            vec!["auth", "near", "token", "refresh", "col", "value"]
        );
    }

    #[test]
    fn test_match_expression() {
        assert_eq!(
            match_expression("JWT auth").as_deref(),
            Some("\"jwt\" OR \"auth\"")
        );
        assert_eq!(match_expression("  ?? -- "), None);
        assert_eq!(match_expression(""), None);
    }

    #[test]
    fn test_unicode_tokens_survive() {
        assert_eq!(match_expression("메모리 공유").as_deref(), Some("\"메모리\" OR \"공유\""));
    }
}
