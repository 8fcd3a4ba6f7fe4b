use super::FileDescriptor;
use crate::actions::{is_spreadsheet, summarize_spreadsheet};
use crate::config::WorkspaceConfig;
use crate::Result;
use chrono::{DateTime, Local};
use std::collections::HashMap;
use std::path::Path;
use walkdir::WalkDir;

pub(super) const SPREADSHEET_LANGUAGE: &str = "Excel";

/// Language label for a file name, by extension
pub fn detect_language(name: &str) -> Option<&'static str> {
    if is_spreadsheet(name) {
        return Some(SPREADSHEET_LANGUAGE);
    }

    let ext = Path::new(name).extension()?.to_str()?.to_ascii_lowercase();
    let language = match ext.as_str() {
        "go" => "Go",
        "js" | "jsx" => "JavaScript",
        "ts" | "tsx" => "TypeScript",
        "py" => "Python",
        "java" => "Java",
        "cpp" | "cc" | "cxx" => "C++",
        "c" => "C",
        "rs" => "Rust",
        "rb" => "Ruby",
        "php" => "PHP",
        "swift" => "Swift",
        "kt" => "Kotlin",
        "cs" => "C#",
        "html" => "HTML",
        "css" => "CSS",
        "md" => "Markdown",
        "json" => "JSON",
        "yaml" | "yml" => "YAML",
        _ => return None,
    };
    Some(language)
}

/// Walk `root` and describe every file and directory beneath it
pub fn index_workspace(root: &Path, config: &WorkspaceConfig) -> Result<Vec<FileDescriptor>> {
    let mut descriptors = Vec::new();

    let walker = WalkDir::new(root)
        .min_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| {
            !(entry.file_type().is_dir()
                && config
                    .skip_dirs
                    .iter()
                    .any(|skip| entry.file_name().to_str() == Some(skip.as_str())))
        });

    for entry in walker {
        let entry = entry?;
        let metadata = entry.metadata()?;
        let name = entry.file_name().to_string_lossy().to_string();
        let is_dir = metadata.is_dir();

        let modified: DateTime<Local> = metadata
            .modified()
            .map(DateTime::from)
            .unwrap_or_else(|_| Local::now());

        let mut descriptor = FileDescriptor {
            path: entry
                .path()
                .strip_prefix(root)
                .unwrap_or(entry.path())
                .to_path_buf(),
            name,
            size: metadata.len(),
            modified,
            is_dir,
            language: None,
            sheet_names: Vec::new(),
            row_counts: HashMap::new(),
        };

        if !is_dir {
            descriptor.language = detect_language(&descriptor.name);
            if descriptor.is_spreadsheet() {
                match summarize_spreadsheet(entry.path()) {
                    Ok(sheets) => {
                        for (sheet, rows) in sheets {
                            descriptor.row_counts.insert(sheet.clone(), rows);
                            descriptor.sheet_names.push(sheet);
                        }
                    }
                    Err(e) => tracing::debug!("Skipping sheet data for {}: {}", entry.path().display(), e),
                }
            }
        }

        descriptors.push(descriptor);
    }

    tracing::info!("Indexed {} workspace entries", descriptors.len());
    Ok(descriptors)
}
