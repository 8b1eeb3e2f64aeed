//! Query normalization: case-fold, trailing punctuation, country synonyms, whitespace.

use once_cell::sync::Lazy;
use regex::Regex;

const TRAILING_PUNCTUATION: &[char] = &['?', '.', '!', ','];

static COUNTRY_SYNONYMS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:united states of america|usa|america)\b").expect("valid synonym regex")
});

static WHITESPACE_RUN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+").expect("valid whitespace regex"));

/// Canonicalize raw user text.
///
/// The trailing strip removes the whole run of punctuation/whitespace at the end so that
/// `normalize(normalize(x)) == normalize(x)`.
pub fn normalize(raw: &str) -> String {
    let lowered = raw.to_lowercase();
    let stripped =
        lowered.trim_end_matches(|c: char| TRAILING_PUNCTUATION.contains(&c) || c.is_whitespace());
    let merged = COUNTRY_SYNONYMS.replace_all(stripped.trim_start(), "united states");
    WHITESPACE_RUN.replace_all(&merged, " ").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lowercases_and_strips_trailing_question_mark() {
        assert_eq!(normalize("  Who is Ada Lovelace?  "), "who is ada lovelace");
    }

    #[test]
    fn folds_country_synonyms() {
        let n = normalize("What is the capital of the USA?");
        assert!(n.contains("united states"));
        assert!(!n.contains("usa"));
        assert_eq!(normalize("United States of America"), "united states");
        assert_eq!(normalize("tell me about America"), "tell me about united states");
    }

    #[test]
    fn synonym_match_is_whole_word() {
        assert_eq!(normalize("jerusalem"), "jerusalem");
        assert_eq!(normalize("usage"), "usage");
    }

    #[test]
    fn collapses_whitespace() {
        assert_eq!(normalize("what   is\t\tthe\nsun"), "what is the sun");
    }

    #[test]
    fn empty_and_punctuation_only_inputs_are_empty() {
        assert_eq!(normalize(""), "");
        assert_eq!(normalize("   "), "");
        assert_eq!(normalize("?!"), "");
    }

    #[test]
    fn keeps_leading_command_bang() {
        assert_eq!(normalize("!wiki Photosynthesis!"), "!wiki photosynthesis");
    }

    #[test]
    fn idempotent_on_awkward_inputs() {
        let samples = [
            "why??",
            "hi ? .",
            "  What's   IT doing now?! ",
            "usa, america, and the United States of America.",
            "!wiki   Rust (programming language)",
            "",
            "ÉCOLE normale?",
            "a , , ,",
        ];
        for s in samples {
            let once = normalize(s);
            assert_eq!(normalize(&once), once, "not idempotent for {:?}", s);
        }
    }
}
