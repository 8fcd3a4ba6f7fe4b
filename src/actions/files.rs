use crate::{CaiaError, Result};
use std::fs;
use std::path::Path;

/// Turn each literal `\n` pair into a newline. Single pass, so `\\n`
/// becomes a backslash followed by a newline.
pub fn decode_newlines(content: &str) -> String {
    content.replace("\\n", "\n")
}

fn file_error(path: &Path) -> impl FnOnce(std::io::Error) -> CaiaError + '_ {
    move |source| CaiaError::File {
        path: path.to_path_buf(),
        source,
    }
}

/// Write `content` to `path`, creating missing parent directories
pub fn create(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(file_error(parent))?;
        }
    }
    fs::write(path, decode_newlines(content)).map_err(file_error(path))
}

/// Overwrite `path` with `content`; the parent directory must exist
pub fn edit(path: &Path, content: &str) -> Result<()> {
    fs::write(path, decode_newlines(content)).map_err(file_error(path))
}

pub fn read(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(file_error(path))
}
