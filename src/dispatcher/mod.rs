use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{info, warn};

use crate::action::{Action, ActionRegistry, ActionSummary, RegistryError, Value};
use crate::conversation::{ConversationSnapshot, ConversationState, ConversationTurn};
use crate::extractor::ParameterExtractor;
use crate::matcher::{MatchResult, Matcher};

/// Outcome of one dispatch call. Internal faults are folded into these
/// variants; the call itself never fails.
#[derive(Debug, Clone)]
pub enum DispatchResult {
    Matched {
        action: String,
        output: Value,
        missing_required: Vec<String>,
    },
    MatchedWithError {
        action: String,
        error: String,
    },
    NoMatch,
}

impl DispatchResult {
    pub fn action(&self) -> Option<&str> {
        match self {
            DispatchResult::Matched { action, .. } => Some(action),
            DispatchResult::MatchedWithError { action, .. } => Some(action),
            DispatchResult::NoMatch => None,
        }
    }

    pub fn is_no_match(&self) -> bool {
        matches!(self, DispatchResult::NoMatch)
    }
}

/// Orchestrates match -> extract -> invoke -> record. Owns the registry
/// and extractor explicitly; there is no process-wide hidden state.
pub struct Dispatcher {
    registry: Arc<RwLock<ActionRegistry>>,
    matcher: Matcher,
    extractor: ParameterExtractor,
}

impl Dispatcher {
    pub fn new(extractor: ParameterExtractor) -> Self {
        Self {
            registry: Arc::new(RwLock::new(ActionRegistry::new())),
            matcher: Matcher::new(),
            extractor,
        }
    }

    pub fn with_matcher(mut self, matcher: Matcher) -> Self {
        self.matcher = matcher;
        self
    }

    pub fn registry(&self) -> Arc<RwLock<ActionRegistry>> {
        Arc::clone(&self.registry)
    }

    pub async fn register(&self, action: Action) -> Result<(), RegistryError> {
        self.registry.write().await.register(action)
    }

    pub async fn clear_actions(&self) {
        self.registry.write().await.clear();
    }

    pub async fn action_summaries(&self) -> Vec<ActionSummary> {
        self.registry.read().await.list()
    }

    /// Would this utterance trigger anything at all?
    pub async fn should_invoke(&self, utterance: &str) -> bool {
        let registry = self.registry.read().await;
        self.matcher.best(utterance, &registry).is_some()
    }

    /// Session snapshot for an external memory store.
    pub async fn snapshot(&self, state: &Mutex<ConversationState>) -> ConversationSnapshot {
        state.lock().await.snapshot()
    }

    pub async fn dispatch(
        &self,
        utterance: &str,
        state: &Mutex<ConversationState>,
    ) -> DispatchResult {
        // 1. Match. The action is cloned out so the read lock drops
        //    before any await point.
        let (matched, action): (MatchResult, Action) = {
            let registry = self.registry.read().await;
            match self.matcher.best(utterance, &registry) {
                Some(m) => {
                    let action = match registry.get(&m.action) {
                        Some(a) => a.clone(),
                        None => return DispatchResult::NoMatch,
                    };
                    (m, action)
                }
                // No match is a normal outcome: no turn is recorded.
                None => return DispatchResult::NoMatch,
            }
        };

        info!(
            utterance,
            action = %action.name,
            kind = %matched.kind,
            score = matched.score,
            "dispatching"
        );

        // 2. Extract parameters with current conversation context.
        let context = {
            let session = state.lock().await;
            session.has_context().then(|| session.render_context(false))
        };
        let params = self
            .extractor
            .extract(
                utterance,
                &action.name,
                &action.description,
                &action.parameters,
                context.as_deref(),
            )
            .await;

        if !params.missing_required.is_empty() {
            warn!(
                action = %action.name,
                missing = ?params.missing_required,
                "required parameters unfilled, invoking with partial arguments"
            );
        }

        // 3. Invoke. Handler failure becomes a result variant, never a
        //    propagated error.
        let outcome = (action.handler)(params.values.clone()).await;

        // 4. Record the turn.
        let assistant_text = match &outcome {
            Ok(output) => format!("{} completed: {}", action.name, summarize(output)),
            Err(e) => format!("{} failed: {}", action.name, e),
        };

        let mut metadata: HashMap<String, Value> = HashMap::new();
        metadata.insert("action".to_string(), Value::String(action.name.clone()));
        metadata.insert(
            "match_kind".to_string(),
            Value::String(matched.kind.as_str().to_string()),
        );
        if matched.ambiguous {
            metadata.insert("ambiguous".to_string(), Value::Bool(true));
        }
        if !params.missing_required.is_empty() {
            metadata.insert(
                "missing_required".to_string(),
                Value::from(params.missing_required.clone()),
            );
        }

        state
            .lock()
            .await
            .add_turn(ConversationTurn::new(utterance, assistant_text, metadata));

        match outcome {
            Ok(output) => DispatchResult::Matched {
                action: action.name,
                output,
                missing_required: params.missing_required,
            },
            Err(e) => DispatchResult::MatchedWithError {
                action: action.name,
                error: e.to_string(),
            },
        }
    }
}

// Keeps transcripts readable when handlers return big payloads.
fn summarize(output: &Value) -> String {
    let rendered = match output {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    if rendered.len() > 200 {
        let cut = rendered
            .char_indices()
            .take_while(|(i, _)| *i < 200)
            .last()
            .map(|(i, c)| i + c.len_utf8())
            .unwrap_or(200);
        format!("{}...", &rendered[..cut])
    } else {
        rendered
    }
}
