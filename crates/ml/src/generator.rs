use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::Client;
use serde_json::{json, Value};

pub const DEFAULT_MAX_OUTPUT_TOKENS: u32 = 300;

/// Free-text model used when the structured knowledge has no answer.
/// Implementations may be slow and may fail; callers own the timeout.
pub trait TextGenerator: Send + Sync {
    fn name(&self) -> &'static str;
    async fn generate(&self, prompt: &str) -> Result<String>;
}

#[derive(Debug, Clone)]
pub struct HttpGeneratorConfig {
    pub endpoint: String,
    pub model: String,
    pub api_key: Option<String>,
    pub max_output_tokens: u32,
}

/// Client for a Responses-style inference endpoint.
#[derive(Debug, Clone)]
pub struct HttpTextGenerator {
    client: Client,
    config: HttpGeneratorConfig,
}

impl HttpTextGenerator {
    pub fn new(config: HttpGeneratorConfig) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(6))
            .build()
            .context("failed to build generator HTTP client")?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &HttpGeneratorConfig {
        &self.config
    }
}

impl TextGenerator for HttpTextGenerator {
    fn name(&self) -> &'static str {
        "http"
    }

    async fn generate(&self, prompt: &str) -> Result<String> {
        let payload = json!({
            "model": self.config.model,
            "input": prompt,
            "max_output_tokens": self.config.max_output_tokens,
        });

        let mut request = self.client.post(&self.config.endpoint).json(&payload);
        if let Some(api_key) = self.config.api_key.as_deref() {
            request = request.bearer_auth(api_key);
        }

        let response = request.send().await.context("generator request failed")?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("generator non-success status {}: {}", status.as_u16(), body);
        }

        let body: Value = response.json().await.context("generator parse failed")?;
        extract_output_text(&body)
            .filter(|value| !value.trim().is_empty())
            .context("generator output text missing")
    }
}

#[derive(Debug, Clone)]
pub enum Generator {
    Http(HttpTextGenerator),
    /// No endpoint configured; every call fails so the caller apologizes.
    Unavailable,
}

impl Generator {
    pub fn from_config(config: Option<HttpGeneratorConfig>) -> Result<Self> {
        match config {
            Some(config) => Ok(Self::Http(HttpTextGenerator::new(config)?)),
            None => Ok(Self::Unavailable),
        }
    }

    pub fn is_configured(&self) -> bool {
        matches!(self, Self::Http(_))
    }
}

impl TextGenerator for Generator {
    fn name(&self) -> &'static str {
        match self {
            Generator::Http(generator) => generator.name(),
            Generator::Unavailable => "unavailable",
        }
    }

    async fn generate(&self, prompt: &str) -> Result<String> {
        match self {
            Generator::Http(generator) => generator.generate(prompt).await,
            Generator::Unavailable => anyhow::bail!("no text generator endpoint configured"),
        }
    }
}

/// Reads `output_text`, or joins every `output[].content[]` item of type
/// `output_text`.
pub fn extract_output_text(payload: &Value) -> Option<String> {
    if let Some(value) = payload.get("output_text").and_then(Value::as_str) {
        return Some(value.to_string());
    }

    let output = payload.get("output")?.as_array()?;
    let chunks = output
        .iter()
        .filter_map(|item| item.get("content").and_then(Value::as_array))
        .flatten()
        .filter(|content| content.get("type").and_then(Value::as_str) == Some("output_text"))
        .filter_map(|content| content.get("text").and_then(Value::as_str))
        .map(ToString::to_string)
        .collect::<Vec<_>>();

    if chunks.is_empty() {
        None
    } else {
        Some(chunks.join("\n\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_flat_output_text() {
        let body = json!({ "output_text": "Mulch keeps soil moist." });
        assert_eq!(
            extract_output_text(&body).as_deref(),
            Some("Mulch keeps soil moist.")
        );
    }

    #[test]
    fn joins_nested_output_items() {
        let body = json!({
            "output": [
                { "type": "reasoning", "summary": [] },
                { "content": [
                    { "type": "output_text", "text": "First." },
                    { "type": "refusal", "text": "ignored" },
                    { "type": "output_text", "text": "Second." }
                ] }
            ]
        });
        assert_eq!(
            extract_output_text(&body).as_deref(),
            Some("First.\n\nSecond.")
        );
    }

    #[test]
    fn missing_text_is_none() {
        assert!(extract_output_text(&json!({ "output": [] })).is_none());
        assert!(extract_output_text(&json!({ "id": "resp_1" })).is_none());
    }

    #[tokio::test]
    async fn unavailable_generator_always_fails() {
        let generator = Generator::from_config(None).unwrap();
        assert!(!generator.is_configured());
        assert!(generator.generate("Answer in detail: hi").await.is_err());
    }
}
