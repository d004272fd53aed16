//! Trigger-word spotting in transcript text

use regex::Regex;

use crate::{Error, Result};

/// Counts trigger-word occurrences in transcribed text
///
/// Matching is case-insensitive on Unicode word boundaries, covering the
/// canonical word plus its configured homophone variants. Stateless: every
/// call scans one message in isolation.
pub struct KeywordSpotter {
    pattern: Regex,
    spellings: Vec<String>,
}

impl KeywordSpotter {
    /// Compile a spotter for the given spellings
    ///
    /// # Errors
    ///
    /// Returns error if no non-empty spelling is provided
    pub fn new(spellings: &[String]) -> Result<Self> {
        let spellings: Vec<String> = spellings
            .iter()
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty())
            .collect();

        if spellings.is_empty() {
            return Err(Error::Config(
                "at least one trigger spelling required".to_string(),
            ));
        }

        let alternation = spellings
            .iter()
            .map(|s| regex::escape(s))
            .collect::<Vec<_>>()
            .join("|");
        let pattern = Regex::new(&format!(r"(?i)\b(?:{alternation})\b"))
            .map_err(|e| Error::Config(format!("invalid trigger spelling: {e}")))?;

        tracing::debug!(spellings = ?spellings, "keyword spotter compiled");

        Ok(Self { pattern, spellings })
    }

    /// Count trigger occurrences in one message
    ///
    /// Returns 0 for empty input or no match; never fails.
    #[must_use]
    pub fn spot(&self, text: &str) -> usize {
        if text.is_empty() {
            return 0;
        }
        self.pattern.find_iter(text).count()
    }

    /// The spellings this spotter matches
    #[must_use]
    pub fn spellings(&self) -> &[String] {
        &self.spellings
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spotter() -> KeywordSpotter {
        let spellings: Vec<String> = ["bo", "bó", "bow", "boh", "beau"]
            .map(String::from)
            .to_vec();
        KeywordSpotter::new(&spellings).unwrap()
    }

    #[test]
    fn counts_repeated_variant_occurrences() {
        assert_eq!(spotter().spot("bó bó bó"), 3);
    }

    #[test]
    fn counts_mixed_spellings() {
        assert_eq!(spotter().spot("I said bo and bow"), 2);
    }

    #[test]
    fn no_trigger_yields_zero() {
        assert_eq!(spotter().spot("nothing to see here"), 0);
    }

    #[test]
    fn empty_input_yields_zero() {
        assert_eq!(spotter().spot(""), 0);
    }

    #[test]
    fn matching_is_case_insensitive() {
        assert_eq!(spotter().spot("BO! Bow? bOh"), 3);
    }

    #[test]
    fn substrings_of_longer_words_do_not_count() {
        assert_eq!(spotter().spot("bonus bowl bohemian"), 0);
    }

    #[test]
    fn punctuation_separates_occurrences() {
        assert_eq!(spotter().spot("bo,bo.bo-bo"), 4);
    }

    #[test]
    fn spellings_are_normalized() {
        let spellings: Vec<String> = ["  BO  ", "", "Bow"].map(String::from).to_vec();
        let spotter = KeywordSpotter::new(&spellings).unwrap();
        assert_eq!(spotter.spellings(), &["bo", "bow"]);
    }

    #[test]
    fn empty_spelling_set_is_rejected() {
        let result = KeywordSpotter::new(&[String::new(), "  ".to_string()]);
        assert!(matches!(result, Err(Error::Config(_))));
    }
}
