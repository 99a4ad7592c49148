pub mod action;
pub mod conversation;
pub mod dispatcher;
pub mod extractor;
pub mod matcher;

// Re-export the surface callers actually touch.
pub use action::{handler, Action, ActionRegistry, ParamKind, ParameterSpec, RegistryError};
pub use conversation::{ConversationState, ConversationTurn};
pub use dispatcher::{DispatchResult, Dispatcher};
pub use extractor::{LlmClient, ParameterExtractor};
pub use matcher::{MatchConfig, MatchKind, Matcher};
