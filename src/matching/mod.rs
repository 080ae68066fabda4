//! Fuzzy matching of extracted text against the recipient registry.

pub mod registry;
pub mod scorer;

pub use registry::Registry;
pub use scorer::token_set_ratio;

use tracing::debug;

/// Minimum token-set score (0–100) for a match to be accepted.
pub const MATCH_THRESHOLD: u8 = 75;

/// Result of matching one piece of text.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MatchResult {
    pub matched: bool,
    pub name: Option<String>,
    pub contact: Option<String>,
    /// Best score seen, if the scorer ran at all.
    pub score: Option<u8>,
}

impl MatchResult {
    pub fn no_match() -> Self {
        Self::default()
    }
}

/// Picks the single best registry name for a piece of text.
#[derive(Debug, Clone, Copy)]
pub struct FuzzyMatcher {
    threshold: u8,
}

impl Default for FuzzyMatcher {
    fn default() -> Self {
        Self {
            threshold: MATCH_THRESHOLD,
        }
    }
}

impl FuzzyMatcher {
    pub fn new(threshold: u8) -> Self {
        Self { threshold }
    }

    /// Scores at or above the threshold are accepted.
    pub fn accepts(&self, score: u8) -> bool {
        score >= self.threshold
    }

    /// Highest-scoring registry entry for `text`.
    ///
    /// Ties go to the entry inserted first: a later entry must score strictly
    /// higher to replace the current best.
    pub fn best_candidate<'r>(&self, text: &str, registry: &'r Registry) -> Option<(&'r str, &'r str, u8)> {
        let mut best: Option<(&str, &str, u8)> = None;
        for (name, contact) in registry.iter() {
            let score = token_set_ratio(text, name);
            if best.is_none_or(|(_, _, top)| score > top) {
                best = Some((name, contact, score));
            }
        }
        best
    }

    /// Match `text` against `registry`.
    ///
    /// Blank text never reaches the scorer. Below the threshold no candidate
    /// name is reported.
    pub fn match_text(&self, text: &str, registry: &Registry) -> MatchResult {
        if text.trim().is_empty() || registry.is_empty() {
            return MatchResult::no_match();
        }

        match self.best_candidate(text, registry) {
            Some((name, contact, score)) if self.accepts(score) => {
                debug!(text, name, score, "Registry match accepted");
                MatchResult {
                    matched: true,
                    name: Some(name.to_string()),
                    contact: Some(contact.to_string()),
                    score: Some(score),
                }
            }
            Some((name, _, score)) => {
                debug!(text, closest = name, score, "Best candidate below threshold");
                MatchResult {
                    score: Some(score),
                    ..MatchResult::no_match()
                }
            }
            None => MatchResult::no_match(),
        }
    }
}
