mod commands;
mod repl;

pub use commands::{parse_input, Input, SlashCommand, HELP_TEXT};
pub use repl::{Flow, Session};
