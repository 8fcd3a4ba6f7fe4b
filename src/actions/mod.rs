//! Turning model replies into file and spreadsheet changes.
//!
//! The pipeline runs extract -> decode -> confirm -> execute, one
//! instruction at a time.

mod confirm;
mod extract;
mod files;
mod instruction;
mod sheets;

pub use confirm::{build_prompt, confirm, is_affirmative, preview};
pub use extract::{extract_candidates, Candidates};
pub use files::decode_newlines;
pub use instruction::{
    decode, is_spreadsheet, Instruction, Payload, SheetOpKind, SheetOperation, Verb,
    SPREADSHEET_EXTENSIONS,
};
pub use sheets::{parse_cell_ref, summarize as summarize_spreadsheet, CellValue, SheetDump};

use crate::{CaiaError, Result};
use std::path::{Path, PathBuf};

/// What a successfully executed instruction produced
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Written { path: PathBuf, verb: Verb },
    FileContents { path: PathBuf, contents: String },
    /// `missing` names the sheet that cut the read short, if any
    SheetContents {
        path: PathBuf,
        sheets: Vec<SheetDump>,
        missing: Option<String>,
    },
}

impl Outcome {
    /// Error to report after showing whatever this outcome did produce
    pub fn failure(&self) -> Option<CaiaError> {
        match self {
            Outcome::SheetContents {
                missing: Some(sheet),
                ..
            } => Some(CaiaError::SheetNotFound(sheet.clone())),
            _ => None,
        }
    }
}

/// Run one confirmed instruction. Targets resolve against `root`.
pub fn execute(instruction: &Instruction, root: &Path) -> Result<Outcome> {
    let path = root.join(&instruction.target);
    tracing::info!("Executing {} on {}", instruction.verb, path.display());

    match (&instruction.payload, instruction.verb) {
        (Payload::Content(content), Verb::Create) => {
            files::create(&path, content)?;
            Ok(Outcome::Written { path, verb: Verb::Create })
        }
        (Payload::Content(content), Verb::Edit) => {
            files::edit(&path, content)?;
            Ok(Outcome::Written { path, verb: Verb::Edit })
        }
        (Payload::Content(_), Verb::Read) => {
            let contents = files::read(&path)?;
            Ok(Outcome::FileContents { path, contents })
        }
        (Payload::Sheet(ops), Verb::Create) => {
            sheets::create(&path, ops)?;
            Ok(Outcome::Written { path, verb: Verb::Create })
        }
        (Payload::Sheet(ops), Verb::Edit) => {
            sheets::edit(&path, ops)?;
            Ok(Outcome::Written { path, verb: Verb::Edit })
        }
        (Payload::Sheet(ops), Verb::Read) => {
            let readback = sheets::read(&path, ops)?;
            Ok(Outcome::SheetContents {
                path,
                sheets: readback.sheets,
                missing: readback.missing,
            })
        }
    }
}
