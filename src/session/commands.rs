pub const HELP_TEXT: &str = r#"
Caia - chat with Claude about your workspace
============================================
Commands:
  /exit   - Exit the program
  /clear  - Clear conversation history
  /help   - Show this help message
  /index  - Reindex workspace files

Claude can create, edit and read code files, and create, update and read
Excel workbooks (.xlsx). For example:
  - "Create a Python module that parses CSV files"
  - "Add error handling to main.go"
  - "Create an Excel file with sample sales data"
  - "Show me what's in the budget spreadsheet"

Every change asks for your confirmation before it is written.
"#;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlashCommand {
    Exit,
    Clear,
    Help,
    Index,
    Unknown(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input<'a> {
    Blank,
    Command(SlashCommand),
    Message(&'a str),
}

/// Classify one line of operator input
pub fn parse_input(line: &str) -> Input<'_> {
    if line.trim().is_empty() {
        return Input::Blank;
    }

    if !line.starts_with('/') {
        return Input::Message(line);
    }

    let command = match line {
        "/exit" => SlashCommand::Exit,
        "/clear" => SlashCommand::Clear,
        "/help" => SlashCommand::Help,
        "/index" => SlashCommand::Index,
        other => SlashCommand::Unknown(other.to_string()),
    };
    Input::Command(command)
}
