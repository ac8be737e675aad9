//! Answer generation backends.
//!
//! - **[`DisabledGenerator`]**: returns errors; used when generation is not
//!   configured.
//! - **[`OllamaGenerator`]**: calls Ollama's `/api/generate` endpoint with a
//!   non-streaming request and returns the `response` field.
//!
//! Use [`create_generator`] to pick the backend from configuration. There
//! are no retries; a failed request is reported to the user.
//!
//! ```rust
//! # use paper_context::config::GenerationConfig;
//! # use paper_context::generation::create_generator;
//! let generator = create_generator(&GenerationConfig::default()).unwrap();
//! assert_eq!(generator.name(), "disabled");
//! ```

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use paper_context_core::collab::Generator;
use paper_context_core::prompt::PromptPayload;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::config::GenerationConfig;

/// A [`Generator`] that can report which backend it is.
pub trait NamedGenerator: Generator {
    fn name(&self) -> &str;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledGenerator;

#[async_trait]
impl Generator for DisabledGenerator {
    async fn generate(&self, _prompt: &PromptPayload) -> Result<String> {
        bail!("Generation is disabled. Set [generation].provider = \"ollama\" in the config.")
    }
}

impl NamedGenerator for DisabledGenerator {
    fn name(&self) -> &str {
        "disabled"
    }
}

#[derive(Debug, Serialize)]
struct OllamaRequest<'a> {
    model: &'a str,
    prompt: String,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct OllamaResponse {
    response: String,
}

#[derive(Debug, Clone)]
pub struct OllamaGenerator {
    client: reqwest::Client,
    endpoint: String,
    model: String,
}

impl OllamaGenerator {
    pub fn new(config: &GenerationConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            endpoint: format!("{}/api/generate", config.base_url.trim_end_matches('/')),
            model: config.model.clone(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl Generator for OllamaGenerator {
    async fn generate(&self, prompt: &PromptPayload) -> Result<String> {
        let body = OllamaRequest {
            model: &self.model,
            prompt: prompt.render(),
            stream: false,
        };
        debug!(endpoint = %self.endpoint, model = %self.model, "requesting generation");

        let response = self
            .client
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|e| anyhow!("Ollama request to {} failed: {}", self.endpoint, e))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            bail!("Ollama API error {}: {}", status, text);
        }

        let parsed: OllamaResponse = response
            .json()
            .await
            .map_err(|e| anyhow!("Invalid Ollama response: {}", e))?;
        Ok(parsed.response)
    }
}

impl NamedGenerator for OllamaGenerator {
    fn name(&self) -> &str {
        "ollama"
    }
}

/// Create the generator named by `config.provider`.
pub fn create_generator(config: &GenerationConfig) -> Result<Box<dyn NamedGenerator>> {
    match config.provider.as_str() {
        "disabled" => Ok(Box::new(DisabledGenerator)),
        "ollama" => Ok(Box::new(OllamaGenerator::new(config)?)),
        other => bail!("Unknown generation provider: {}", other),
    }
}
