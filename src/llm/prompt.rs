use crate::workspace::FileDescriptor;
use std::fmt::Write;

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Generate the system prompt, embedding the current workspace listing
pub fn system_prompt(files: &[FileDescriptor]) -> String {
    let workspace = workspace_summary(files);

    format!(r#"You are an assistant that works on the user's codebase and Excel files. You can see every file in the current workspace.

Current workspace files:
{workspace}

Rules for every response:
1. Keep answers focused and well structured.
2. When several changes are requested, emit one JSON object per file operation.
3. Each operation must be a complete, valid JSON object. Do not wrap it in triple quotes.
4. Escape newlines inside JSON strings as \\n.
5. Only change what the user asked for. Do not remove existing code, features or files unless asked.
6. Follow the existing code style and use proper file extensions.
7. If the request, the codebase or the intended change is unclear, ask the user instead of guessing.

Code and text files:
{{
    "operation": "create",
    "filename": "example.py",
    "content": "def hello():\\n    print('Hello')\\n"
}}

Use "edit" with the complete new content to change an existing file, and "read" with just the filename to look at one.

Excel files (.xlsx):
{{
    "operation": "create",
    "filename": "data.xlsx",
    "actions": [
        {{"type": "create_sheet", "sheet": "Sheet1"}},
        {{"type": "add_row", "sheet": "Sheet1", "row": ["Header1", "Header2"]}},
        {{"type": "set_cell", "sheet": "Sheet1", "cell": "C1", "value": "Total"}}
    ]
}}

Rows are appended after the last used row. To look inside a workbook use "read" with {{"type": "read_sheet", "sheet": "<name>"}} actions.

Example reply creating two files:
I'll create two small files.

{{
    "operation": "create",
    "filename": "hello.py",
    "content": "def hello():\\n    print('Hello Python!')\\n"
}}
{{
    "operation": "create",
    "filename": "greet.js",
    "content": "function greet() {{\\n    console.log('Hello JavaScript!');\\n}}\\n"
}}"#)
}

/// One block per workspace entry, as listed in the system prompt
pub fn workspace_summary(files: &[FileDescriptor]) -> String {
    let mut summary = String::new();

    for file in files {
        let modified = file.modified.format(TIME_FORMAT);
        if file.is_dir {
            let _ = writeln!(summary, "\n- Directory: {}", file.path.display());
        } else if file.is_spreadsheet() {
            let _ = writeln!(
                summary,
                "\n- Excel file: {} (Modified: {})",
                file.path.display(),
                modified
            );
            if !file.sheet_names.is_empty() {
                summary.push_str("  Sheets:\n");
                for sheet in &file.sheet_names {
                    let rows = file.row_counts.get(sheet).copied().unwrap_or(0);
                    let _ = writeln!(summary, "    - {} ({} rows)", sheet, rows);
                }
            }
        } else {
            let _ = writeln!(
                summary,
                "\n- File: {} (Type: {}, Modified: {})",
                file.path.display(),
                file.language.unwrap_or(""),
                modified
            );
        }
    }

    summary
}
