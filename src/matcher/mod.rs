pub mod types;

pub use types::{MatchConfig, MatchKind, MatchResult, ScoredAction, STOP_WORDS};

use crate::action::{Action, ActionRegistry};
use std::collections::HashSet;
use tracing::{debug, warn};

/// Scores every registered action against an utterance and picks the best
/// one. Pure: identical registry contents + utterance always produce the
/// same ranking.
pub struct Matcher {
    config: MatchConfig,
}

impl Matcher {
    pub fn new() -> Self {
        Self { config: MatchConfig::default() }
    }

    pub fn with_config(config: MatchConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &MatchConfig {
        &self.config
    }

    /// Full ranking, strongest first. Actions that never produced a
    /// qualifying match are left out entirely.
    pub fn rank(&self, utterance: &str, registry: &ActionRegistry) -> Vec<ScoredAction> {
        let utterance_lower = utterance.trim().to_lowercase();
        let utterance_words: HashSet<&str> = utterance_lower.split_whitespace().collect();

        let mut ranked: Vec<ScoredAction> = Vec::new();

        for action in registry.iter() {
            if let Some(scored) = self.score_action(&utterance_lower, &utterance_words, action, registry) {
                ranked.push(scored);
            }
        }

        // Highest score first; earliest registration wins exact ties.
        ranked.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.registration_index.cmp(&b.registration_index))
        });

        ranked
    }

    /// Best candidate, or `None` when nothing scored. Emits a `warn!`
    /// diagnostic when the runner-up is too close for comfort.
    pub fn best(&self, utterance: &str, registry: &ActionRegistry) -> Option<MatchResult> {
        let ranked = self.rank(utterance, registry);

        for candidate in ranked.iter().take(3) {
            debug!(
                action = %candidate.name,
                score = candidate.score,
                kind = %candidate.kind,
                "match candidate"
            );
        }

        let top = ranked.first()?;
        let ambiguous = match ranked.get(1) {
            Some(second) => top.score < second.score * self.config.ambiguity_ratio,
            None => false,
        };

        if ambiguous {
            let second = &ranked[1];
            warn!(
                top = %top.name,
                top_score = top.score,
                runner_up = %second.name,
                runner_up_score = second.score,
                "ambiguous match, proceeding with top candidate"
            );
        }

        Some(MatchResult {
            action: top.name.clone(),
            score: top.score,
            matched_phrases: top.matched_phrases.clone(),
            kind: top.kind,
            ambiguous,
        })
    }

    fn score_action(
        &self,
        utterance_lower: &str,
        utterance_words: &HashSet<&str>,
        action: &Action,
        registry: &ActionRegistry,
    ) -> Option<ScoredAction> {
        let cfg = &self.config;
        let mut score = 0.0_f64;
        let mut best_kind: Option<MatchKind> = None;
        let mut matched_phrases: Vec<String> = Vec::new();

        fn record(kind: MatchKind, phrase: &str, best: &mut Option<MatchKind>, matched: &mut Vec<String>) {
            matched.push(phrase.to_string());
            *best = Some(best.map_or(kind, |b| b.max(kind)));
        }

        for phrase in &action.trigger_phrases {
            let phrase_lower = phrase.to_lowercase();
            if phrase_lower.is_empty() {
                continue;
            }

            if phrase_lower == utterance_lower {
                score += cfg.exact_score;
                record(MatchKind::Exact, phrase, &mut best_kind, &mut matched_phrases);
            } else if contains_word_bounded(utterance_lower, &phrase_lower) {
                if utterance_lower.starts_with(&phrase_lower) {
                    score += cfg.phrase_start_score;
                } else {
                    score += cfg.phrase_score;
                }
                record(MatchKind::Phrase, phrase, &mut best_kind, &mut matched_phrases);
            } else {
                let phrase_words: HashSet<&str> = phrase_lower.split_whitespace().collect();
                if phrase_words.len() > 1 && utterance_lower.contains(&phrase_lower) {
                    score += cfg.partial_phrase_score;
                    record(MatchKind::PartialPhrase, phrase, &mut best_kind, &mut matched_phrases);
                } else {
                    // Word-overlap tier: shared words, stop words excluded.
                    let common: HashSet<&str> = utterance_words
                        .intersection(&phrase_words)
                        .copied()
                        .filter(|w| !STOP_WORDS.contains(w))
                        .collect();
                    if !common.is_empty() {
                        let ratio = common.len() as f64 / phrase_words.len() as f64;
                        // Length bonus rewards longer, more specific phrases.
                        score += (cfg.overlap_scale * ratio).floor()
                            + cfg.overlap_length_bonus * phrase_words.len() as f64;
                        if ratio > cfg.overlap_qualify_ratio {
                            record(MatchKind::WordOverlap, phrase, &mut best_kind, &mut matched_phrases);
                        }
                    }
                }
            }
        }

        // Only actions with at least one qualifying phrase are eligible.
        let kind = best_kind?;
        if score <= 0.0 {
            return None;
        }

        let mut final_score = score * (1.0 + action.priority as f64 / 10.0);
        final_score *= match kind {
            MatchKind::Exact => cfg.exact_multiplier,
            MatchKind::Phrase => cfg.phrase_multiplier,
            _ => 1.0,
        };

        Some(ScoredAction {
            name: action.name.clone(),
            score: final_score,
            kind,
            matched_phrases,
            registration_index: registry.registration_index(&action.name).unwrap_or(usize::MAX),
        })
    }
}

impl Default for Matcher {
    fn default() -> Self {
        Self::new()
    }
}

/// Whole-word-bounded substring check: the needle occurs and its
/// neighbours (if any) are not alphanumeric.
fn contains_word_bounded(haystack: &str, needle: &str) -> bool {
    for (idx, _) in haystack.match_indices(needle) {
        let before_ok = idx == 0
            || !haystack[..idx]
                .chars()
                .next_back()
                .is_some_and(|c| c.is_alphanumeric());
        let after = idx + needle.len();
        let after_ok = after == haystack.len()
            || !haystack[after..]
                .chars()
                .next()
                .is_some_and(|c| c.is_alphanumeric());
        if before_ok && after_ok {
            return true;
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::contains_word_bounded;

    #[test]
    fn word_boundaries() {
        assert!(contains_word_bounded("search memory please", "search memory"));
        assert!(contains_word_bounded("please search memory", "search memory"));
        assert!(!contains_word_bounded("research memory", "search memory"));
        assert!(!contains_word_bounded("search memories", "search memory"));
    }
}
