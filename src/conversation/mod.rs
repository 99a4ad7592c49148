use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use tracing::{debug, info};
use uuid::Uuid;

use crate::action::Value;

pub const DEFAULT_MAX_TURNS: usize = 10;

/// One user/assistant exchange. Immutable once appended.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub user_text: String,
    pub assistant_text: String,
    pub timestamp: DateTime<Utc>,
    pub metadata: HashMap<String, Value>,
}

impl ConversationTurn {
    pub fn new(
        user_text: impl Into<String>,
        assistant_text: impl Into<String>,
        metadata: HashMap<String, Value>,
    ) -> Self {
        Self {
            user_text: user_text.into(),
            assistant_text: assistant_text.into(),
            timestamp: Utc::now(),
            metadata,
        }
    }
}

/// Chat-shaped context entry for a completion model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConversationStats {
    pub total_turns: usize,
    pub total_user_words: usize,
    pub total_assistant_words: usize,
    pub session_duration_secs: f64,
    pub profile_keys: Vec<String>,
}

/// Shape handed to an external memory store. The core only produces it;
/// storage and retrieval live elsewhere.
#[derive(Debug, Clone, Serialize)]
pub struct ConversationSnapshot {
    pub session_id: String,
    pub last_turn: Option<ConversationTurn>,
    pub user_profile: HashMap<String, Value>,
}

/// Bounded FIFO of recent turns plus durable user facts.
///
/// The turn window evicts oldest-first at capacity; `user_profile`
/// survives both eviction and `clear()`.
pub struct ConversationState {
    turns: VecDeque<ConversationTurn>,
    capacity: usize,
    user_profile: HashMap<String, Value>,
    session_id: String,
    session_start: DateTime<Utc>,
}

impl ConversationState {
    pub fn new(capacity: usize) -> Self {
        let session_id = format!("session-{}", Uuid::new_v4());
        info!(session = %session_id, capacity, "conversation state created");
        Self {
            turns: VecDeque::new(),
            capacity: capacity.max(1),
            user_profile: HashMap::new(),
            session_id,
            session_start: Utc::now(),
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn add_turn(&mut self, turn: ConversationTurn) {
        if self.turns.len() == self.capacity {
            self.turns.pop_front();
        }
        self.turns.push_back(turn);
        debug!(turns = self.turns.len(), "turn appended");
    }

    pub fn turns(&self) -> impl Iterator<Item = &ConversationTurn> {
        self.turns.iter()
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn has_context(&self) -> bool {
        !self.turns.is_empty()
    }

    pub fn last_user_text(&self) -> Option<&str> {
        self.turns.back().map(|t| t.user_text.as_str())
    }

    pub fn last_assistant_text(&self) -> Option<&str> {
        self.turns.back().map(|t| t.assistant_text.as_str())
    }

    /// Human-readable transcript, blank-line separated per turn.
    pub fn render_context(&self, include_metadata: bool) -> String {
        if self.turns.is_empty() {
            return String::new();
        }

        let mut lines = Vec::new();
        for turn in &self.turns {
            lines.push(format!("User: {}", turn.user_text));
            lines.push(format!("Assistant: {}", turn.assistant_text));
            if include_metadata && !turn.metadata.is_empty() {
                let meta = serde_json::to_string(&turn.metadata).unwrap_or_default();
                lines.push(format!("[Metadata: {}]", meta));
            }
            lines.push(String::new());
        }
        lines.join("\n")
    }

    /// Role/content sequence for a completion model. Leads with a system
    /// entry summarizing the profile when there is one.
    pub fn render_context_for_model(&self) -> Vec<ChatMessage> {
        let mut messages = Vec::new();

        if !self.user_profile.is_empty() {
            let mut pairs: Vec<String> = self
                .user_profile
                .iter()
                .map(|(k, v)| format!("{}: {}", k, render_value(v)))
                .collect();
            pairs.sort();
            messages.push(ChatMessage {
                role: "system".to_string(),
                content: format!("User context: {}", pairs.join(", ")),
            });
        }

        for turn in &self.turns {
            messages.push(ChatMessage {
                role: "user".to_string(),
                content: turn.user_text.clone(),
            });
            messages.push(ChatMessage {
                role: "assistant".to_string(),
                content: turn.assistant_text.clone(),
            });
        }

        messages
    }

    pub fn set_profile(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        let key = key.into();
        let value = value.into();
        info!(%key, "user profile updated");
        self.user_profile.insert(key, value);
    }

    pub fn get_profile(&self, key: &str) -> Option<&Value> {
        self.user_profile.get(key)
    }

    pub fn user_profile(&self) -> &HashMap<String, Value> {
        &self.user_profile
    }

    /// Drops the turn window. The profile stays.
    pub fn clear(&mut self) {
        self.turns.clear();
        info!(session = %self.session_id, "conversation history cleared");
    }

    pub fn stats(&self) -> ConversationStats {
        let total_user_words = self
            .turns
            .iter()
            .map(|t| t.user_text.split_whitespace().count())
            .sum();
        let total_assistant_words = self
            .turns
            .iter()
            .map(|t| t.assistant_text.split_whitespace().count())
            .sum();
        let mut profile_keys: Vec<String> = self.user_profile.keys().cloned().collect();
        profile_keys.sort();

        ConversationStats {
            total_turns: self.turns.len(),
            total_user_words,
            total_assistant_words,
            session_duration_secs: (Utc::now() - self.session_start).num_milliseconds() as f64
                / 1000.0,
            profile_keys,
        }
    }

    pub fn snapshot(&self) -> ConversationSnapshot {
        ConversationSnapshot {
            session_id: self.session_id.clone(),
            last_turn: self.turns.back().cloned(),
            user_profile: self.user_profile.clone(),
        }
    }
}

impl Default for ConversationState {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_TURNS)
    }
}

fn render_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
