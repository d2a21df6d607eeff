use regex::Regex;

use crate::errors::{GrepError, GrepResult};

/// Whole-word, case-insensitive matcher for a single target word.
#[derive(Debug, Clone)]
pub struct WordMatcher {
    regex: Regex,
}

impl WordMatcher {
    /// Builds a matcher for `word`. The word is matched literally with
    /// word-boundary semantics: a match may not be adjacent to another
    /// word character on either side.
    pub fn new(word: &str) -> GrepResult<Self> {
        if word.trim().is_empty() {
            return Err(GrepError::invalid_pattern("target word is empty"));
        }
        let pattern = format!(r"(?i)\b{}\b", regex::escape(word));
        let regex = Regex::new(&pattern)
            .map_err(|e| GrepError::invalid_pattern(e.to_string()))?;
        Ok(Self { regex })
    }

    /// Whether `line` contains the target word.
    pub fn is_match(&self, line: &str) -> bool {
        self.regex.is_match(line)
    }
}
