use super::types::{Action, ActionSummary, ParamKind, Value};
use std::collections::HashMap;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error, PartialEq)]
pub enum RegistryError {
    #[error("action name must not be empty")]
    EmptyName,
    #[error("parameter '{0}' is required and must not declare a default")]
    DefaultOnRequired(String),
    #[error("default for parameter '{0}' does not match its declared type")]
    DefaultKindMismatch(String),
}

/// Holds the registered actions. Read-mostly after startup; the Dispatcher
/// serializes mutation behind a write lock, the registry itself stays
/// lock-free.
pub struct ActionRegistry {
    actions: HashMap<String, Action>,
    // Registration order, used by list() and for deterministic tie-breaks.
    order: Vec<String>,
}

impl ActionRegistry {
    pub fn new() -> Self {
        Self {
            actions: HashMap::new(),
            order: Vec::new(),
        }
    }

    /// Insert or replace by name. Re-registering a name swaps the action
    /// in place and keeps its original registration slot.
    pub fn register(&mut self, action: Action) -> Result<(), RegistryError> {
        if action.name.trim().is_empty() {
            return Err(RegistryError::EmptyName);
        }
        for (param_name, spec) in &action.parameters {
            if let Some(default) = &spec.default {
                if spec.required {
                    return Err(RegistryError::DefaultOnRequired(param_name.clone()));
                }
                if !default_matches_kind(default, spec.kind) {
                    return Err(RegistryError::DefaultKindMismatch(param_name.clone()));
                }
            }
        }

        if !self.actions.contains_key(&action.name) {
            self.order.push(action.name.clone());
        }
        info!(action = %action.name, triggers = action.trigger_phrases.len(), "registered action");
        self.actions.insert(action.name.clone(), action);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Action> {
        self.actions.get(name)
    }

    /// Position in registration order; earlier wins score ties.
    pub fn registration_index(&self, name: &str) -> Option<usize> {
        self.order.iter().position(|n| n == name)
    }

    /// Actions in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &Action> {
        self.order.iter().filter_map(|name| self.actions.get(name))
    }

    pub fn list(&self) -> Vec<ActionSummary> {
        self.iter().map(|a| a.summary()).collect()
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn clear(&mut self) {
        self.actions.clear();
        self.order.clear();
        info!("action registry cleared");
    }
}

impl Default for ActionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn default_matches_kind(value: &Value, kind: ParamKind) -> bool {
    match kind {
        ParamKind::String => value.is_string(),
        ParamKind::Integer => value.is_i64() || value.is_u64(),
        ParamKind::Float => value.is_number(),
        ParamKind::Boolean => value.is_boolean(),
    }
}
