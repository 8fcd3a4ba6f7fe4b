mod index;

pub use index::{detect_language, index_workspace};

use chrono::{DateTime, Local};
use std::collections::HashMap;
use std::path::PathBuf;

/// Metadata for one entry under the workspace root
#[derive(Debug, Clone)]
pub struct FileDescriptor {
    /// Path relative to the workspace root
    pub path: PathBuf,
    pub name: String,
    pub size: u64,
    pub modified: DateTime<Local>,
    pub is_dir: bool,
    pub language: Option<&'static str>,
    pub sheet_names: Vec<String>,
    pub row_counts: HashMap<String, usize>,
}

impl FileDescriptor {
    pub fn is_spreadsheet(&self) -> bool {
        self.language == Some(index::SPREADSHEET_LANGUAGE)
    }
}
