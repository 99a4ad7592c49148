pub mod heuristics;
pub mod llm;
pub mod validate;

pub use llm::{first_json_object, LlmClient};
pub use validate::ExtractedParams;

use std::collections::HashMap;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::action::{ParameterSpec, Value};

pub const DEFAULT_LLM_TIMEOUT: Duration = Duration::from_secs(5);

/// Two-tier parameter extraction: ask the completion service first, fall
/// back to deterministic pattern rules when it is slow, down, or talking
/// nonsense. Neither failure mode ever reaches the caller.
pub struct ParameterExtractor {
    llm: Option<LlmClient>,
    llm_timeout: Duration,
}

impl ParameterExtractor {
    /// Heuristics-only extractor. Pure, no I/O.
    pub fn heuristic_only() -> Self {
        Self { llm: None, llm_timeout: DEFAULT_LLM_TIMEOUT }
    }

    pub fn with_llm(llm: LlmClient) -> Self {
        Self { llm: Some(llm), llm_timeout: DEFAULT_LLM_TIMEOUT }
    }

    pub fn with_timeout(mut self, llm_timeout: Duration) -> Self {
        self.llm_timeout = llm_timeout;
        self
    }

    /// Fill `specs` from the utterance. `context` is the rendered recent
    /// transcript, used to resolve cross-turn references.
    pub async fn extract(
        &self,
        utterance: &str,
        action_name: &str,
        action_description: &str,
        specs: &HashMap<String, ParameterSpec>,
        context: Option<&str>,
    ) -> ExtractedParams {
        if specs.is_empty() {
            return ExtractedParams::default();
        }

        if let Some(client) = &self.llm {
            let prompt = build_prompt(utterance, action_name, action_description, specs, context);
            match timeout(self.llm_timeout, client.complete(&prompt)).await {
                Ok(Ok(response)) => {
                    if let Some(raw) = parse_response(&response) {
                        debug!(action = %action_name, "parameters extracted via completion service");
                        return validate::validate(raw, specs);
                    }
                    warn!(action = %action_name, "no parsable JSON in completion response, falling back");
                }
                Ok(Err(e)) => {
                    warn!(action = %action_name, error = %e, "completion service failed, falling back");
                }
                Err(_) => {
                    warn!(action = %action_name, "completion service timed out, falling back");
                }
            }
        }

        let raw = heuristics::extract(utterance, specs);
        validate::validate(raw, specs)
    }
}

fn build_prompt(
    utterance: &str,
    action_name: &str,
    action_description: &str,
    specs: &HashMap<String, ParameterSpec>,
    context: Option<&str>,
) -> String {
    let mut param_lines: Vec<String> = specs
        .iter()
        .map(|(name, spec)| {
            let mut line = format!("- {} ({})", name, spec.kind);
            if spec.required {
                line.push_str(" [REQUIRED]");
            }
            if let Some(default) = &spec.default {
                line.push_str(&format!(" [default: {}]", default));
            }
            line
        })
        .collect();
    param_lines.sort();

    let mut prompt = format!(
        "Extract parameters from the user's input for this tool.\n\n\
         Tool: {}\nDescription: {}\n\nParameters needed:\n{}\n",
        action_name,
        action_description,
        param_lines.join("\n"),
    );

    if let Some(ctx) = context {
        if !ctx.is_empty() {
            prompt.push_str(&format!("\nConversation context:\n{}\n", ctx));
        }
    }

    prompt.push_str(&format!(
        "\nUser input: \"{}\"\n\n\
         Extract ONLY the parameter values mentioned in the user's input. Return JSON with parameter names as keys.\n\
         For example, if user says \"Create a goal to optimize memory\", extract: {{\"description\": \"optimize memory\"}}\n\
         If user says \"Research transformer architectures\", extract: {{\"topic\": \"transformer architectures\"}}\n\
         If user says \"My name is Marc\", extract: {{\"name\": \"Marc\"}}\n\n\
         Return ONLY valid JSON, nothing else. If no parameters found, return {{}}.\n",
        utterance
    ));

    prompt
}

/// Defensive parse: take the first balanced object in the text, require it
/// to be a JSON object.
fn parse_response(response: &str) -> Option<HashMap<String, Value>> {
    let block = first_json_object(response)?;
    match serde_json::from_str::<HashMap<String, Value>>(block) {
        Ok(map) => Some(map),
        Err(e) => {
            debug!(error = %e, "completion response block was not a JSON object");
            None
        }
    }
}
