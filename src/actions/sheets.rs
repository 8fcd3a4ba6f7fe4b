//! Spreadsheet instructions, applied through `umya-spreadsheet`.
//!
//! Each instruction opens its document, applies its operations in order and
//! writes the result back. Nothing is saved if any operation fails.

use super::instruction::{SheetOpKind, SheetOperation};
use crate::{CaiaError, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::Path;
use umya_spreadsheet::{Spreadsheet, Worksheet};

/// Sheet every new workbook starts with
pub const DEFAULT_SHEET: &str = "Sheet1";

const MAX_COLUMN: u32 = 16_384;
const MAX_ROW: u32 = 1_048_576;

static CELL_REF: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\$?([A-Za-z]{1,3})\$?([0-9]+)$").unwrap());

/// Typed value for one `add_row` token.
///
/// Classification tries a number first, then a boolean, then falls back to
/// text; the first match wins.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Number(f64),
    Boolean(bool),
    Text(String),
}

impl CellValue {
    pub fn classify(token: &str) -> Self {
        if let Some(number) = parse_number(token) {
            CellValue::Number(number)
        } else if let Some(flag) = parse_bool(token) {
            CellValue::Boolean(flag)
        } else {
            CellValue::Text(token.to_string())
        }
    }
}

/// Finite numbers only; a cell cannot hold NaN or infinity
fn parse_number(token: &str) -> Option<f64> {
    token.parse::<f64>().ok().filter(|n| n.is_finite())
}

fn parse_bool(token: &str) -> Option<bool> {
    match token {
        "1" | "t" | "T" | "true" | "TRUE" | "True" => Some(true),
        "0" | "f" | "F" | "false" | "FALSE" | "False" => Some(false),
        _ => None,
    }
}

/// Parse an `A1`-style reference into 1-based `(column, row)`
pub fn parse_cell_ref(reference: &str) -> Result<(u32, u32)> {
    let invalid = || CaiaError::InvalidCell(reference.to_string());
    let caps = CELL_REF.captures(reference).ok_or_else(invalid)?;

    let column = caps[1]
        .bytes()
        .fold(0u32, |acc, b| acc * 26 + u32::from(b.to_ascii_uppercase() - b'A' + 1));
    let row: u32 = caps[2].parse().map_err(|_| invalid())?;

    if column > MAX_COLUMN || row == 0 || row > MAX_ROW {
        return Err(invalid());
    }
    Ok((column, row))
}

/// Rows of one sheet as display strings, trailing empty cells trimmed
#[derive(Debug, Clone, PartialEq)]
pub struct SheetDump {
    pub name: String,
    pub rows: Vec<Vec<String>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    /// Workbook created by this instruction
    Fresh,
    /// Workbook loaded from disk
    Existing,
}

/// Build a new workbook from `ops` and save it to `path`
pub fn create(path: &Path, ops: &[SheetOperation]) -> Result<()> {
    let mut book = umya_spreadsheet::new_file();
    apply_all(&mut book, ops, Mode::Fresh)?;
    save(&book, path)
}

/// Apply `ops` to the workbook at `path` and save it in place
pub fn edit(path: &Path, ops: &[SheetOperation]) -> Result<()> {
    let mut book = open(path)?;
    apply_all(&mut book, ops, Mode::Existing)?;
    save(&book, path)
}

/// Sheets dumped by a read, up to the first one that does not exist
#[derive(Debug, Clone, PartialEq)]
pub struct Readback {
    pub sheets: Vec<SheetDump>,
    /// Name of the missing sheet that stopped the read
    pub missing: Option<String>,
}

/// Dump every sheet named by a `read_sheet` operation, in order.
///
/// A missing sheet stops the read; sheets dumped before it are kept.
pub fn read(path: &Path, ops: &[SheetOperation]) -> Result<Readback> {
    let book = open(path)?;
    let mut sheets = Vec::new();

    for op in ops.iter().filter(|op| op.kind == SheetOpKind::ReadSheet) {
        let Some(sheet) = book.get_sheet_by_name(&op.sheet) else {
            return Ok(Readback {
                sheets,
                missing: Some(op.sheet.clone()),
            });
        };
        sheets.push(SheetDump {
            name: op.sheet.clone(),
            rows: sheet_rows(sheet),
        });
    }

    Ok(Readback {
        sheets,
        missing: None,
    })
}

/// Sheet names with their row counts, in workbook order
pub fn summarize(path: &Path) -> Result<Vec<(String, usize)>> {
    let book = open(path)?;
    Ok(book
        .get_sheet_collection()
        .iter()
        .map(|sheet| (sheet.get_name().to_string(), sheet.get_highest_row() as usize))
        .collect())
}

fn open(path: &Path) -> Result<Spreadsheet> {
    umya_spreadsheet::reader::xlsx::read(path).map_err(|e| {
        CaiaError::Spreadsheet(format!("error opening {}: {}", path.display(), e))
    })
}

fn save(book: &Spreadsheet, path: &Path) -> Result<()> {
    umya_spreadsheet::writer::xlsx::write(book, path).map_err(|e| {
        CaiaError::Spreadsheet(format!("error saving {}: {}", path.display(), e))
    })
}

fn apply_all(book: &mut Spreadsheet, ops: &[SheetOperation], mode: Mode) -> Result<()> {
    for op in ops {
        apply(book, op, mode)?;
    }
    Ok(())
}

fn apply(book: &mut Spreadsheet, op: &SheetOperation, mode: Mode) -> Result<()> {
    match op.kind {
        SheetOpKind::CreateSheet => {
            if mode == Mode::Fresh && op.sheet == DEFAULT_SHEET {
                return Ok(());
            }
            if book.get_sheet_by_name(&op.sheet).is_some() {
                tracing::debug!("Sheet {} already exists", op.sheet);
                return Ok(());
            }
            book.new_sheet(op.sheet.as_str()).map_err(|e| {
                CaiaError::Spreadsheet(format!("error creating sheet {}: {}", op.sheet, e))
            })?;
        }
        SheetOpKind::SetCell => {
            let coordinate = parse_cell_ref(&op.cell)?;
            sheet_mut(book, &op.sheet)?
                .get_cell_mut(coordinate)
                .set_value_string(op.value.as_str());
        }
        SheetOpKind::AddRow => {
            if !op.row.is_empty() {
                append_row(sheet_mut(book, &op.sheet)?, &op.row);
            }
        }
        SheetOpKind::ReadSheet | SheetOpKind::Unknown => {
            tracing::debug!("Ignoring {:?} on sheet {} while writing", op.kind, op.sheet);
        }
    }
    Ok(())
}

fn sheet_mut<'a>(book: &'a mut Spreadsheet, name: &str) -> Result<&'a mut Worksheet> {
    book.get_sheet_by_name_mut(name)
        .ok_or_else(|| CaiaError::SheetNotFound(name.to_string()))
}

/// Write `tokens` into the row after the current last row
fn append_row(sheet: &mut Worksheet, tokens: &[String]) {
    let row = sheet.get_highest_row() + 1;

    for (column, token) in (1u32..).zip(tokens) {
        let cell = sheet.get_cell_mut((column, row));
        match CellValue::classify(token) {
            CellValue::Number(number) => {
                cell.set_value_number(number);
            }
            CellValue::Boolean(flag) => {
                cell.set_value_bool(flag);
            }
            CellValue::Text(text) => {
                cell.set_value_string(text);
            }
        }
    }
}

fn sheet_rows(sheet: &Worksheet) -> Vec<Vec<String>> {
    let columns = sheet.get_highest_column();

    (1..=sheet.get_highest_row())
        .map(|row| {
            let mut values: Vec<String> = (1..=columns)
                .map(|column| sheet.get_value((column, row)))
                .collect();
            while values.last().is_some_and(|v| v.is_empty()) {
                values.pop();
            }
            values
        })
        .collect()
}
