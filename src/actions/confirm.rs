use super::instruction::{Instruction, Payload, Verb};
use crossterm::style::Stylize;
use std::io::{BufRead, Write};

/// Build the question shown before a mutating instruction runs
pub fn build_prompt(instruction: &Instruction, preview_chars: usize) -> String {
    let target = &instruction.target;
    let verb = instruction.verb;

    match &instruction.payload {
        Payload::Sheet(ops) => format!(
            "Do you want to {} Excel file '{}' with {} sheet operations? (y/n): ",
            verb,
            target,
            ops.len()
        ),
        Payload::Content(content) => format!(
            "Do you want to {} '{}' with the following content?\n\nPreview:\n{}\n\n(y/n): ",
            verb,
            target,
            preview(content, preview_chars)
        ),
    }
}

/// First `limit` characters of `content`, with `...` appended when cut
pub fn preview(content: &str, limit: usize) -> String {
    match content.char_indices().nth(limit) {
        Some((cut, _)) => format!("{}...", &content[..cut]),
        None => content.to_string(),
    }
}

/// Whether an operator reply counts as approval
pub fn is_affirmative(reply: &str) -> bool {
    let reply = reply.trim();
    reply.eq_ignore_ascii_case("y") || reply.eq_ignore_ascii_case("yes")
}

/// Ask the operator to approve `instruction`.
///
/// Reads proceed without asking. Anything other than `y`/`yes`, including
/// end of input or a read failure, declines.
pub fn confirm<R: BufRead, W: Write>(
    instruction: &Instruction,
    preview_chars: usize,
    input: &mut R,
    out: &mut W,
) -> bool {
    if instruction.verb == Verb::Read {
        return true;
    }

    let prompt = build_prompt(instruction, preview_chars);
    if write!(out, "\n{}", prompt).and_then(|_| out.flush()).is_err() {
        return false;
    }

    let mut reply = String::new();
    let approved = match input.read_line(&mut reply) {
        Ok(0) => false,
        Ok(_) => is_affirmative(&reply),
        Err(e) => {
            let _ = writeln!(out, "Error reading response: {}", e);
            false
        }
    };

    if !approved {
        let _ = writeln!(out, "{}", "Operation cancelled by user.".yellow());
        tracing::info!("Declined {} of {}", instruction.verb, instruction.target);
    }

    approved
}
