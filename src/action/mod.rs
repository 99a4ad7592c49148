pub mod types;
pub mod registry;

pub use types::{handler, Action, ActionSummary, Args, Handler, ParamKind, ParameterSpec, Value};
pub use registry::{ActionRegistry, RegistryError};
