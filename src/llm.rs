use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use crate::config::LlmConfig;
use crate::constants;

/// Completion backend. The real implementation talks to any OpenAI-compatible
/// chat completions endpoint; the stub returns scripted replies and records
/// every prompt it receives.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    async fn complete(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        temperature: f32,
        max_tokens: u32,
    ) -> Result<String>;
}

/// Create the configured completion provider
pub fn create_completion_provider(config: &LlmConfig) -> Result<Arc<dyn CompletionProvider>> {
    match config.provider.as_str() {
        "openai" => Ok(Arc::new(OpenAiCompletions::new(
            &config.base_url,
            &config.model,
        )?)),
        "stub" => Ok(Arc::new(StubCompletions::new())),
        other => anyhow::bail!("Unknown completion provider: {}", other),
    }
}

/// OpenAI-compatible chat completions over HTTP
pub struct OpenAiCompletions {
    client: reqwest::Client,
    base_url: String,
    model: String,
    api_key: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    content: String,
}

impl OpenAiCompletions {
    pub fn new(base_url: &str, model: &str) -> Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .context("OPENAI_API_KEY not set; required by the openai completion provider")?;
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(constants::HTTP_TIMEOUT_SECS))
            .user_agent(constants::USER_AGENT)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            api_key,
        })
    }
}

#[async_trait]
impl CompletionProvider for OpenAiCompletions {
    async fn complete(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        temperature: f32,
        max_tokens: u32,
    ) -> Result<String> {
        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&serde_json::json!({
                "model": self.model,
                "messages": [
                    {"role": "system", "content": system_prompt},
                    {"role": "user", "content": user_prompt},
                ],
                "temperature": temperature,
                "max_tokens": max_tokens,
            }))
            .send()
            .await
            .context("Completion request failed")?;

        if !response.status().is_success() {
            anyhow::bail!("Completion API error: {}", response.status());
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .context("Failed to parse completion response")?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| anyhow::anyhow!("Completion API returned no choices"))?;

        Ok(content.trim().to_string())
    }
}

/// One recorded call against the stub backend
#[derive(Debug, Clone)]
pub struct CompletionCall {
    pub system_prompt: String,
    pub user_prompt: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

/// Scripted completion backend. Replies are served from a queue; when the
/// queue is empty a fixed placeholder is returned. Every call is recorded,
/// which is what the prompt-content tests assert against.
#[derive(Default)]
pub struct StubCompletions {
    replies: Mutex<VecDeque<Result<String, String>>>,
    calls: Mutex<Vec<CompletionCall>>,
}

impl StubCompletions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a successful reply
    pub fn push_reply(&self, reply: &str) {
        self.replies
            .lock()
            .expect("stub reply queue lock poisoned")
            .push_back(Ok(reply.to_string()));
    }

    /// Queue a failure, simulating an unreachable backend
    pub fn push_failure(&self, message: &str) {
        self.replies
            .lock()
            .expect("stub reply queue lock poisoned")
            .push_back(Err(message.to_string()));
    }

    /// All calls made so far, in order
    pub fn calls(&self) -> Vec<CompletionCall> {
        self.calls
            .lock()
            .expect("stub call log lock poisoned")
            .clone()
    }
}

#[async_trait]
impl CompletionProvider for StubCompletions {
    async fn complete(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        temperature: f32,
        max_tokens: u32,
    ) -> Result<String> {
        self.calls
            .lock()
            .expect("stub call log lock poisoned")
            .push(CompletionCall {
                system_prompt: system_prompt.to_string(),
                user_prompt: user_prompt.to_string(),
                temperature,
                max_tokens,
            });

        let queued = self
            .replies
            .lock()
            .expect("stub reply queue lock poisoned")
            .pop_front();

        match queued {
            Some(Ok(reply)) => Ok(reply),
            Some(Err(message)) => Err(anyhow::anyhow!(message)),
            None => Ok("Stub completion backend: no reply scripted.".to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_stub_serves_queued_replies_in_order() {
        let stub = StubCompletions::new();
        stub.push_reply("first");
        stub.push_reply("second");

        assert_eq!(stub.complete("s", "u", 0.3, 500).await.unwrap(), "first");
        assert_eq!(stub.complete("s", "u", 0.3, 500).await.unwrap(), "second");
        assert_eq!(stub.calls().len(), 2);
    }

    #[tokio::test]
    async fn test_stub_failure_propagates_as_error() {
        let stub = StubCompletions::new();
        stub.push_failure("backend unreachable");

        let err = stub.complete("s", "u", 0.3, 500).await.unwrap_err();
        assert!(err.to_string().contains("unreachable"));
    }

    #[tokio::test]
    async fn test_stub_records_prompts() {
        let stub = StubCompletions::new();
        stub.complete("system text", "user text", 0.1, 64)
            .await
            .unwrap();

        let calls = stub.calls();
        assert_eq!(calls[0].system_prompt, "system text");
        assert_eq!(calls[0].user_prompt, "user text");
    }
}
