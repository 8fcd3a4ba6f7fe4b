pub mod actions;
pub mod config;
pub mod llm;
pub mod session;
pub mod workspace;

pub use actions::{Instruction, SheetOperation, Verb};
pub use config::Config;
pub use session::Session;
pub use workspace::FileDescriptor;

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CaiaError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Error accessing {}: {source}", path.display())]
    File {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Spreadsheet error: {0}")]
    Spreadsheet(String),

    #[error("Sheet not found: {0}")]
    SheetNotFound(String),

    #[error("Invalid cell reference: {0}")]
    InvalidCell(String),

    #[error("Workspace error: {0}")]
    Workspace(#[from] walkdir::Error),
}

pub type Result<T> = std::result::Result<T, CaiaError>;
