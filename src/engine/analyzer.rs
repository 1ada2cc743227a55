//! Text to term analysis for the in-memory engine: split on non-alphanumerics, lowercase.

/// Split text into lowercase terms, treating every non-alphanumeric char as a separator.
pub fn analyze(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_lowercase())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::analyze;

    #[test]
    fn splits_on_punctuation_and_lowercases() {
        assert_eq!(
            analyze("Delhi, the CAPITAL of India (Bhārat)."),
            vec!["delhi", "the", "capital", "of", "india", "bhārat"]
        );
    }

    #[test]
    fn hyphenated_words_become_separate_terms() {
        assert_eq!(analyze("full-text"), vec!["full", "text"]);
    }

    #[test]
    fn blank_input_has_no_terms() {
        assert!(analyze("  \t\n ").is_empty());
    }
}
