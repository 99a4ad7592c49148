use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// Argument values are plain JSON values. Handlers get a map of them and
/// return one back (or fail).
pub type Value = serde_json::Value;
pub type Args = HashMap<String, Value>;

pub type HandlerFuture = Pin<Box<dyn Future<Output = anyhow::Result<Value>> + Send>>;
pub type Handler = Arc<dyn Fn(Args) -> HandlerFuture + Send + Sync>;

/// Wrap an async closure into a [`Handler`].
pub fn handler<F, Fut>(f: F) -> Handler
where
    F: Fn(Args) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<Value>> + Send + 'static,
{
    Arc::new(move |args| Box::pin(f(args)))
}

/// Declared type of a single action parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamKind {
    String,
    Integer,
    Float,
    Boolean,
}

impl fmt::Display for ParamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ParamKind::String => "string",
            ParamKind::Integer => "integer",
            ParamKind::Float => "float",
            ParamKind::Boolean => "boolean",
        };
        f.write_str(s)
    }
}

/// Schema entry for one parameter of an action.
///
/// Invariant (checked at registration): a required parameter never carries
/// a default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterSpec {
    pub kind: ParamKind,
    pub required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
}

impl ParameterSpec {
    pub fn required(kind: ParamKind) -> Self {
        Self { kind, required: true, default: None }
    }

    pub fn optional(kind: ParamKind) -> Self {
        Self { kind, required: false, default: None }
    }

    pub fn with_default(mut self, default: impl Into<Value>) -> Self {
        self.default = Some(default.into());
        self
    }
}

/// A named, invokable capability: trigger phrases drive matching, the
/// parameter schema drives extraction, the handler does the work.
///
/// Handlers are opaque to the core; downstream services they call are
/// their own business.
#[derive(Clone)]
pub struct Action {
    pub name: String,
    pub description: String,
    pub trigger_phrases: Vec<String>,
    pub parameters: HashMap<String, ParameterSpec>,
    pub priority: i32,
    pub handler: Handler,
}

impl Action {
    pub fn new(name: impl Into<String>, description: impl Into<String>, handler: Handler) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            trigger_phrases: Vec::new(),
            parameters: HashMap::new(),
            priority: 5,
            handler,
        }
    }

    pub fn with_triggers<I, S>(mut self, triggers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.trigger_phrases = triggers.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_param(mut self, name: impl Into<String>, spec: ParameterSpec) -> Self {
        self.parameters.insert(name.into(), spec);
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn summary(&self) -> ActionSummary {
        ActionSummary {
            name: self.name.clone(),
            description: self.description.clone(),
            trigger_phrases: self.trigger_phrases.clone(),
            parameters: self.parameters.clone(),
            priority: self.priority,
        }
    }
}

impl fmt::Debug for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Action")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("trigger_phrases", &self.trigger_phrases)
            .field("parameters", &self.parameters)
            .field("priority", &self.priority)
            .finish_non_exhaustive()
    }
}

/// Handler-free view of an action, safe to ship across an API boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionSummary {
    pub name: String,
    pub description: String,
    pub trigger_phrases: Vec<String>,
    pub parameters: HashMap<String, ParameterSpec>,
    pub priority: i32,
}
