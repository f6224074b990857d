//! LLM integration via the OpenAI-compatible chat completions API

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::model::{ModelBackend, ModelHandle};

/// Speaker of a prompt message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PromptRole {
    System,
    User,
    Assistant,
}

impl From<crate::db::Role> for PromptRole {
    fn from(role: crate::db::Role) -> Self {
        match role {
            crate::db::Role::User => PromptRole::User,
            crate::db::Role::Assistant => PromptRole::Assistant,
        }
    }
}

/// One entry of the context sent to the model
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PromptMessage {
    pub role: PromptRole,
    pub content: String,
}

impl PromptMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: PromptRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: PromptRole::User,
            content: content.into(),
        }
    }
}

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [PromptMessage],
}

#[derive(Deserialize)]
struct CompletionResponse {
    choices: Vec<CompletionChoice>,
}

#[derive(Deserialize)]
struct CompletionChoice {
    message: CompletionMessage,
}

#[derive(Deserialize)]
struct CompletionMessage {
    content: Option<String>,
}

/// Client for talking to the model
pub struct LlmClient {
    http: reqwest::Client,
    model: ModelHandle,
}

impl LlmClient {
    pub fn new(model: ModelHandle) -> Result<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()
            .context("failed to build LLM http client")?;
        Ok(Self { http, model })
    }

    pub fn model(&self) -> &ModelHandle {
        &self.model
    }

    /// Send a full context and get the assistant's text back
    pub async fn complete(&self, messages: &[PromptMessage]) -> Result<String> {
        match &self.model.backend {
            ModelBackend::OpenAi { endpoint, api_key } => {
                let api_key = api_key.as_deref().context("no LLM API key configured")?;
                self.complete_remote(endpoint, api_key, messages).await
            }
            ModelBackend::Mock { prefix } => {
                let last = messages.last().map(|m| m.content.as_str()).unwrap_or("");
                Ok(format!("{}: {}", prefix, last))
            }
            ModelBackend::Canned { reply } => Ok(reply.clone()),
        }
    }

    async fn complete_remote(
        &self,
        endpoint: &str,
        api_key: &str,
        messages: &[PromptMessage],
    ) -> Result<String> {
        let url = format!("{}/chat/completions", endpoint.trim_end_matches('/'));
        let started = std::time::Instant::now();

        let response = self
            .http
            .post(&url)
            .bearer_auth(api_key)
            .json(&CompletionRequest {
                model: &self.model.name,
                messages,
            })
            .send()
            .await
            .with_context(|| format!("failed to reach {}", url))?
            .error_for_status()
            .context("completion request rejected")?
            .json::<CompletionResponse>()
            .await
            .context("failed to decode completion response")?;

        tracing::debug!(
            model = %self.model.name,
            messages = messages.len(),
            latency_ms = started.elapsed().as_millis() as u64,
            "completion finished"
        );

        response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .context("completion returned no content")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_echoes_last_message() -> Result<()> {
        let llm = LlmClient::new(ModelHandle::mock("[mock]"))?;
        let reply = llm
            .complete(&[PromptMessage::system("be nice"), PromptMessage::user("hello")])
            .await?;
        assert_eq!(reply, "[mock]: hello");
        Ok(())
    }

    #[tokio::test]
    async fn test_canned_ignores_input() -> Result<()> {
        let llm = LlmClient::new(ModelHandle::canned("one, two, three"))?;
        let reply = llm.complete(&[PromptMessage::user("anything")]).await?;
        assert_eq!(reply, "one, two, three");
        Ok(())
    }

    #[tokio::test]
    async fn test_remote_without_key_fails() -> Result<()> {
        let model = ModelHandle::from_config(&crate::config::LlmConfig {
            api_key: None,
            endpoint: "http://127.0.0.1:9".into(),
            ..Default::default()
        });
        let llm = LlmClient::new(model)?;
        let err = llm
            .complete(&[PromptMessage::user("秘密のメッセージ")])
            .await
            .unwrap_err();
        assert!(err.to_string().contains("API key"));
        Ok(())
    }

    #[test]
    fn test_request_wire_format() {
        let messages = [PromptMessage::system("s"), PromptMessage::user("u")];
        let body = serde_json::to_value(CompletionRequest {
            model: "gpt-test",
            messages: &messages,
        })
        .unwrap();
        assert_eq!(body["model"], "gpt-test");
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["content"], "u");
    }
}
