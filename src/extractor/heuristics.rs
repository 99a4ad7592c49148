use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;

use crate::action::{ParamKind, ParameterSpec, Value};

// Patterns are keyed by parameter *name*, not type: a parameter literally
// called `name` is filled from "my name is X" style phrasing, and so on.
// Case-insensitive so the original casing of captures survives.

static NAME_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        Regex::new(r"(?i)(?:my name is|i'm|i am|call me)\s+(\w+)").unwrap(),
        Regex::new(r"(?i)(?:name|called)\s+(\w+)").unwrap(),
    ]
});

static DESCRIPTION_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        Regex::new(r"(?i)(?:create|make|add|new)\s+(?:a\s+)?(?:goal|task)?\s*(?:to|for)?\s*(.+)")
            .unwrap(),
        Regex::new(r"(?i)(?:goal|task):\s*(.+)").unwrap(),
        Regex::new(r"(?i)(?:optimize|improve|fix|enhance)\s+(.+)").unwrap(),
    ]
});

static TOPIC_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        Regex::new(r"(?i)(?:research|study|learn about|investigate)\s+(.+)").unwrap(),
        Regex::new(r"(?i)(?:search|find|look for)\s+(?:about|for)?\s*(.+)").unwrap(),
    ]
});

static METRIC_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        Regex::new(r"(?i)(?:optimize|improve|speed up|make faster)\s+(.+)").unwrap(),
        Regex::new(r"(?i)(?:performance|speed|efficiency)\s+(?:of|for)?\s*(.+)").unwrap(),
    ]
});

static INTEGER_LITERAL: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d+)").unwrap());

static TRAILING_PUNCT: Lazy<Regex> = Lazy::new(|| Regex::new(r"[.!?]+$").unwrap());

/// Deterministic fallback tier: fill what the patterns can reach, leave
/// the rest absent. Pure, no I/O.
pub fn extract(utterance: &str, specs: &HashMap<String, ParameterSpec>) -> HashMap<String, Value> {
    let mut extracted = HashMap::new();

    for (param_name, spec) in specs {
        let value = match param_name.as_str() {
            "name" => first_capture(&NAME_PATTERNS, utterance).map(|s| capitalize(&s)),
            "description" | "goal" | "goal_description" => {
                first_capture(&DESCRIPTION_PATTERNS, utterance).map(strip_trailing_punct)
            }
            "topic" | "query" => {
                first_capture(&TOPIC_PATTERNS, utterance).map(strip_trailing_punct)
            }
            "target_metric" => first_capture(&METRIC_PATTERNS, utterance)
                .map(strip_trailing_punct)
                .or_else(|| {
                    let lower = utterance.to_lowercase();
                    ["performance", "speed", "efficiency"]
                        .iter()
                        .any(|w| lower.contains(w))
                        .then(|| "overall_performance".to_string())
                }),
            _ => None,
        };

        if let Some(text) = value {
            extracted.insert(param_name.clone(), Value::String(text));
            continue;
        }

        // Numeric parameters fall back to the first integer literal.
        if spec.kind == ParamKind::Integer {
            if let Some(m) = INTEGER_LITERAL.captures(utterance) {
                if let Ok(n) = m[1].parse::<i64>() {
                    extracted.insert(param_name.clone(), Value::from(n));
                }
            }
        }
    }

    extracted
}

fn first_capture(patterns: &[Regex], utterance: &str) -> Option<String> {
    for pattern in patterns {
        if let Some(caps) = pattern.captures(utterance) {
            if let Some(m) = caps.get(1) {
                let text = m.as_str().trim();
                if !text.is_empty() {
                    return Some(text.to_string());
                }
            }
        }
    }
    None
}

fn strip_trailing_punct(s: String) -> String {
    TRAILING_PUNCT.replace(&s, "").trim().to_string()
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capitalize_keeps_tail() {
        assert_eq!(capitalize("marc"), "Marc");
        assert_eq!(capitalize("MARC"), "MARC");
        assert_eq!(capitalize(""), "");
    }
}
