use crate::config::Config;
use crate::CaiaError;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};

use super::providers::anthropic::AnthropicClient;

/// Text chunks of a streamed reply, in delivery order
pub type ChunkStream = BoxStream<'static, Result<String, CaiaError>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Trait for LLM clients
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait LlmClient: Send + Sync {
    /// Send the conversation and stream back the reply text
    async fn stream_chat(
        &self,
        system: &str,
        messages: &[ChatMessage],
    ) -> Result<ChunkStream, CaiaError>;
}

/// Create an LLM client based on configuration
pub fn create_client(config: &Config) -> Result<Box<dyn LlmClient>, CaiaError> {
    match config.llm.provider.as_str() {
        "anthropic" => {
            let api_key = std::env::var(&config.llm.api_key_env).map_err(|_| {
                CaiaError::Config(format!(
                    "{var} not found in the environment or .env files.\n\
                     Either create a .env file in the working directory containing {var}=<your key>,\n\
                     or export it in your shell: export {var}=<your key>",
                    var = config.llm.api_key_env
                ))
            })?;

            Ok(Box::new(AnthropicClient::new(
                api_key,
                config.llm.model.clone(),
                config.llm.max_tokens,
                config.llm.api_url.clone(),
            )))
        }
        provider => Err(CaiaError::Config(format!(
            "Unsupported LLM provider: {}",
            provider
        ))),
    }
}
