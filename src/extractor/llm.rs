use anyhow::{anyhow, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Completion client for the extraction tier. Talks to an Ollama-style
/// `/api/generate` endpoint; treated as unreliable, every failure falls
/// back to heuristics upstream.
#[derive(Clone)]
pub struct LlmClient {
    client: Client,
    base_url: String,
    model: String,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    temperature: f32,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

impl LlmClient {
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(5)) // Hard timeout enforcement (network level)
                .build()
                .unwrap_or_default(),
            base_url: base_url.into(),
            model: model.into(),
        }
    }

    /// One-shot completion. Low temperature for consistent extraction.
    pub async fn complete(&self, prompt: &str) -> Result<String> {
        let request_body = GenerateRequest {
            model: &self.model,
            prompt,
            stream: false,
            temperature: 0.1,
        };

        let response = self
            .client
            .post(format!("{}/api/generate", self.base_url))
            .json(&request_body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(anyhow!("completion server error: {}", response.status()));
        }

        let resp_json: GenerateResponse = response.json().await?;
        Ok(resp_json.response.trim().to_string())
    }
}

/// First balanced `{...}` block in a response, string-literal aware.
/// Completion output routinely wraps the JSON in prose.
pub fn first_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, c) in text[start..].char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + c.len_utf8()]);
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::first_json_object;

    #[test]
    fn finds_block_inside_prose() {
        let text = "Sure! Here you go: {\"name\": \"Marc\"} hope that helps";
        assert_eq!(first_json_object(text), Some("{\"name\": \"Marc\"}"));
    }

    #[test]
    fn handles_nesting_and_strings() {
        let text = "{\"a\": {\"b\": \"}\"}} trailing";
        assert_eq!(first_json_object(text), Some("{\"a\": {\"b\": \"}\"}}"));
    }

    #[test]
    fn none_when_unbalanced() {
        assert_eq!(first_json_object("no json here"), None);
        assert_eq!(first_json_object("{\"open\": true"), None);
    }
}
