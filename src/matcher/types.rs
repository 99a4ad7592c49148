use serde::{Deserialize, Serialize};
use std::fmt;

/// Tier of evidence that produced a score. Ordered weakest-first so the
/// derived `Ord` makes `max` pick the strongest tier seen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum MatchKind {
    WordOverlap,
    PartialPhrase,
    Phrase,
    Exact,
}

impl MatchKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchKind::WordOverlap => "word_overlap",
            MatchKind::PartialPhrase => "partial_phrase",
            MatchKind::Phrase => "phrase",
            MatchKind::Exact => "exact",
        }
    }
}

impl fmt::Display for MatchKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One ranked candidate out of [`Matcher::rank`].
#[derive(Debug, Clone)]
pub struct ScoredAction {
    pub name: String,
    pub score: f64,
    pub kind: MatchKind,
    pub matched_phrases: Vec<String>,
    pub registration_index: usize,
}

/// The winning candidate. Holds the action *name* (a key back into the
/// registry), never a reference into it.
#[derive(Debug, Clone)]
pub struct MatchResult {
    pub action: String,
    pub score: f64,
    pub matched_phrases: Vec<String>,
    pub kind: MatchKind,
    /// True when the runner-up scored within the ambiguity ratio. The
    /// match still stands; this is a diagnostic, not an error.
    pub ambiguous: bool,
}

/// Scoring constants. The defaults are the empirically tuned values from
/// the source system; they are knobs, not derived quantities.
#[derive(Debug, Clone)]
pub struct MatchConfig {
    pub exact_score: f64,
    pub phrase_start_score: f64,
    pub phrase_score: f64,
    pub partial_phrase_score: f64,
    pub overlap_scale: f64,
    pub overlap_length_bonus: f64,
    /// Fraction of phrase words that must match for a word-overlap hit to
    /// qualify as a match.
    pub overlap_qualify_ratio: f64,
    pub exact_multiplier: f64,
    pub phrase_multiplier: f64,
    /// Top score must exceed runner-up * this ratio to count as decisive.
    pub ambiguity_ratio: f64,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            exact_score: 1000.0,
            phrase_start_score: 200.0,
            phrase_score: 100.0,
            partial_phrase_score: 60.0,
            overlap_scale: 20.0,
            overlap_length_bonus: 2.0,
            overlap_qualify_ratio: 0.5,
            exact_multiplier: 1.5,
            phrase_multiplier: 1.2,
            ambiguity_ratio: 1.2,
        }
    }
}

/// Words ignored by the word-overlap tier; they match everything and mean
/// nothing.
pub const STOP_WORDS: &[&str] = &["a", "the", "is", "my", "to", "for", "in", "on"];
