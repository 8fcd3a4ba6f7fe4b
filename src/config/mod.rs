mod loader;

pub use loader::{load_config, load_env_files};

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub workspace: WorkspaceConfig,
    #[serde(default)]
    pub ui: UiConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_api_url")]
    pub api_url: String,
}

fn default_provider() -> String {
    "anthropic".to_string()
}

fn default_api_key_env() -> String {
    "ANTHROPIC_API_KEY".to_string()
}

fn default_model() -> String {
    "claude-sonnet-4-5-20250929".to_string()
}

fn default_max_tokens() -> u32 {
    4096
}

fn default_api_url() -> String {
    "https://api.anthropic.com/v1/messages".to_string()
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            api_key_env: default_api_key_env(),
            model: default_model(),
            max_tokens: default_max_tokens(),
            api_url: default_api_url(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkspaceConfig {
    /// Directory that instruction targets and the index are relative to
    #[serde(default = "default_root")]
    pub root: String,
    /// Directory names never descended into while indexing
    #[serde(default = "default_skip_dirs")]
    pub skip_dirs: Vec<String>,
}

fn default_root() -> String {
    ".".to_string()
}

fn default_skip_dirs() -> Vec<String> {
    vec![".git".to_string()]
}

impl WorkspaceConfig {
    /// Root directory with `~` expanded
    pub fn root_path(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.root).to_string())
    }
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            root: default_root(),
            skip_dirs: default_skip_dirs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UiConfig {
    #[serde(default = "default_preview_chars")]
    pub preview_chars: usize,
    #[serde(default = "default_show_banner")]
    pub show_banner: bool,
}

fn default_preview_chars() -> usize {
    200
}

fn default_show_banner() -> bool {
    true
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            preview_chars: default_preview_chars(),
            show_banner: default_show_banner(),
        }
    }
}
