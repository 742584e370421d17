//! External text generation backends
//!
//! The pipeline treats generation as an opaque remote call: a prompt goes
//! in, text comes out, and it may fail or take arbitrarily long.

use anyhow::{anyhow, Context, Result};
use research_pipeline_sdk::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default research instructions; the topic is appended after them
pub const DEFAULT_RESEARCH_PROMPT: &str = "
You are given a topic keyword and you are able to summarize the topic in a few sentences.
You should include a general summary of the topic.
You should include a list of the most important points of the topic.
You should include a list of the most important questions about the topic.
You should include a list of the most important answers to the questions.
You should include a list of the most important sources of information about the topic.
You should include a list of the most important links to the sources of information.

";

/// Build the full prompt sent for `topic`
pub fn research_prompt(prefix: &str, topic: &str) -> String {
    format!("{}{}", prefix, topic)
}

/// Text generation service
#[async_trait]
pub trait Generator: Send + Sync {
    /// Generate text for `prompt`
    async fn generate(&self, prompt: &str) -> Result<String>;
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// OpenAI-compatible chat-completions client
#[derive(Debug, Clone)]
pub struct OpenAiGenerator {
    client: reqwest::Client,
    api_base: String,
    api_key: String,
    model: String,
}

impl OpenAiGenerator {
    pub const API_KEY_VAR: &'static str = "OPENAI_API_KEY";

    pub fn new(
        api_base: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
        timeout: Option<Duration>,
    ) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            model: model.into(),
        })
    }

    /// Build a client reading the API key from `OPENAI_API_KEY`
    pub fn from_env(
        api_base: impl Into<String>,
        model: impl Into<String>,
        timeout: Option<Duration>,
    ) -> Result<Self> {
        let api_key = std::env::var(Self::API_KEY_VAR)
            .map_err(|_| anyhow!("{} not found in environment", Self::API_KEY_VAR))?;
        Self::new(api_base, api_key, model, timeout)
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.api_base)
    }
}

#[async_trait]
impl Generator for OpenAiGenerator {
    async fn generate(&self, prompt: &str) -> Result<String> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
        };

        let response = self
            .client
            .post(self.completions_url())
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .context("Chat completion request failed")?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(anyhow!("Chat completion API error {}: {}", status, error_text));
        }

        let body: ChatResponse = response
            .json()
            .await
            .context("Failed to decode chat completion response")?;

        body.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| anyhow!("Chat completion returned no content"))
    }
}
