mod client;
mod prompt;
mod providers;

pub use client::{create_client, ChatMessage, ChunkStream, LlmClient, Role};
pub use prompt::{system_prompt, workspace_summary};

#[cfg(test)]
pub use client::MockLlmClient;
