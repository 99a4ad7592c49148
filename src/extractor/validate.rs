use std::collections::HashMap;
use tracing::warn;

use crate::action::{ParamKind, ParameterSpec, Value};

/// Closed, validated argument map plus the required names neither tier
/// could fill. Missing required parameters are recorded, not fatal; the
/// handler still runs and fails fast on its own if it must.
#[derive(Debug, Clone, Default)]
pub struct ExtractedParams {
    pub values: HashMap<String, Value>,
    pub missing_required: Vec<String>,
}

impl ExtractedParams {
    pub fn is_complete(&self) -> bool {
        self.missing_required.is_empty()
    }
}

/// Coerce raw values to their declared kinds and apply defaults. The
/// result only ever contains declared parameter names.
pub fn validate(
    raw: HashMap<String, Value>,
    specs: &HashMap<String, ParameterSpec>,
) -> ExtractedParams {
    let mut out = ExtractedParams::default();

    for (param_name, spec) in specs {
        match raw.get(param_name) {
            Some(value) => match coerce(value, spec.kind) {
                Some(coerced) => {
                    out.values.insert(param_name.clone(), coerced);
                }
                None => {
                    warn!(param = %param_name, kind = %spec.kind, "coercion failed");
                    if let Some(default) = &spec.default {
                        out.values.insert(param_name.clone(), default.clone());
                    } else if spec.required {
                        out.missing_required.push(param_name.clone());
                    }
                }
            },
            None => {
                if let Some(default) = &spec.default {
                    out.values.insert(param_name.clone(), default.clone());
                } else if spec.required {
                    out.missing_required.push(param_name.clone());
                }
            }
        }
    }

    out.missing_required.sort();
    out
}

/// Best-effort conversion to the declared kind. `None` means the value is
/// unusable as that kind.
pub fn coerce(value: &Value, kind: ParamKind) -> Option<Value> {
    match kind {
        ParamKind::String => match value {
            Value::String(s) => Some(Value::String(s.clone())),
            Value::Number(n) => Some(Value::String(n.to_string())),
            Value::Bool(b) => Some(Value::String(b.to_string())),
            _ => None,
        },
        ParamKind::Integer => match value {
            Value::Number(n) => n
                .as_i64()
                .or_else(|| n.as_f64().map(|f| f as i64))
                .map(Value::from),
            Value::String(s) => s.trim().parse::<i64>().ok().map(Value::from),
            _ => None,
        },
        ParamKind::Float => match value {
            Value::Number(n) => n.as_f64().map(Value::from),
            Value::String(s) => s.trim().parse::<f64>().ok().map(Value::from),
            _ => None,
        },
        ParamKind::Boolean => match value {
            Value::Bool(b) => Some(Value::Bool(*b)),
            Value::String(s) => {
                let truthy = matches!(s.trim().to_lowercase().as_str(), "true" | "1" | "yes");
                Some(Value::Bool(truthy))
            }
            Value::Number(n) => Some(Value::Bool(n.as_f64() != Some(0.0))),
            _ => None,
        },
    }
}
