//! Model handles and backends

use crate::config::LlmConfig;

/// The model that answers every tutor, title, translation and suggestion call
#[derive(Debug, Clone)]
pub struct ModelHandle {
    /// Model identifier sent to the backend (e.g., "gpt-5-chat-latest")
    pub name: String,
    /// Backend configuration
    pub backend: ModelBackend,
}

/// How to reach this model
#[derive(Debug, Clone)]
pub enum ModelBackend {
    /// OpenAI or any server speaking the `/chat/completions` protocol.
    /// Calls fail while `api_key` is unset.
    OpenAi {
        endpoint: String,
        api_key: Option<String>,
    },
    /// Echoes the last message back with a prefix (tests)
    Mock { prefix: String },
    /// Always answers with the same text (tests)
    Canned { reply: String },
}

impl ModelHandle {
    /// Build the remote handle described by config
    pub fn from_config(config: &LlmConfig) -> Self {
        let api_key = config.api_key.clone().filter(|k| !k.is_empty());
        if api_key.is_none() {
            tracing::warn!("no LLM API key configured, model calls will fail");
        }

        Self {
            name: config.model.clone(),
            backend: ModelBackend::OpenAi {
                endpoint: config.endpoint.clone(),
                api_key,
            },
        }
    }

    pub fn mock(prefix: impl Into<String>) -> Self {
        Self {
            name: "mock".to_string(),
            backend: ModelBackend::Mock {
                prefix: prefix.into(),
            },
        }
    }

    pub fn canned(reply: impl Into<String>) -> Self {
        Self {
            name: "canned".to_string(),
            backend: ModelBackend::Canned {
                reply: reply.into(),
            },
        }
    }

    pub fn is_remote(&self) -> bool {
        matches!(self.backend, ModelBackend::OpenAi { .. })
    }
}
