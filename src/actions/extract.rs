//! Locates balanced JSON objects embedded in free-form response text.
//!
//! Replies mix prose with any number of instruction objects and nothing marks
//! where one begins, so the scan tracks brace depth while skipping over
//! braces that appear inside string literals.

/// Scanner state while walking a candidate span.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanState {
    Normal,
    InString,
}

/// Iterator over top-level `{ ... }` spans in a response.
///
/// Single pass: once exhausted it stays exhausted.
pub struct Candidates<'a> {
    text: &'a str,
    pos: usize,
}

/// Scan `text` for candidate instruction objects.
pub fn extract_candidates(text: &str) -> Candidates<'_> {
    Candidates { text, pos: 0 }
}

impl<'a> Iterator for Candidates<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<&'a str> {
        let bytes = self.text.as_bytes();

        while self.pos < bytes.len() {
            let start = self.pos + self.text[self.pos..].find('{')?;

            match matching_close(bytes, start) {
                Some(end) => {
                    self.pos = end + 1;
                    return Some(&self.text[start..=end]);
                }
                None => {
                    // Unbalanced: retry from just past this brace
                    tracing::debug!("Discarding unterminated object at byte {}", start);
                    self.pos = start + 1;
                }
            }
        }

        None
    }
}

/// Index of the `}` closing the object opened at `start`, if any.
///
/// All markers are ASCII, so byte indices always land on char boundaries.
fn matching_close(bytes: &[u8], start: usize) -> Option<usize> {
    let mut depth = 1usize;
    let mut state = ScanState::Normal;
    let mut escaped = false;

    for (offset, &byte) in bytes[start + 1..].iter().enumerate() {
        if escaped {
            escaped = false;
            continue;
        }

        match (byte, state) {
            (b'\\', _) => escaped = true,
            (b'"', ScanState::Normal) => state = ScanState::InString,
            (b'"', ScanState::InString) => state = ScanState::Normal,
            (b'{', ScanState::Normal) => depth += 1,
            (b'}', ScanState::Normal) => {
                depth -= 1;
                if depth == 0 {
                    return Some(start + 1 + offset);
                }
            }
            _ => {}
        }
    }

    None
}
