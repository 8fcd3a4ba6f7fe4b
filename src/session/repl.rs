use super::commands::{parse_input, Input, SlashCommand, HELP_TEXT};
use crate::actions::{self, Instruction, Outcome, Verb};
use crate::config::Config;
use crate::llm::{self, ChatMessage, LlmClient};
use crate::workspace::{self, FileDescriptor};
use crate::{CaiaError, Result};
use crossterm::style::Stylize;
use futures::StreamExt;
use std::io::{BufRead, Write};
use std::path::PathBuf;

/// Whether the loop should keep reading input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit,
}

/// One operator session: conversation history plus the workspace index
/// used to build each turn's system prompt.
pub struct Session<R, W> {
    client: Box<dyn LlmClient>,
    config: Config,
    root: PathBuf,
    history: Vec<ChatMessage>,
    files: Vec<FileDescriptor>,
    input: R,
    out: W,
}

impl<R: BufRead, W: Write> Session<R, W> {
    pub fn new(client: Box<dyn LlmClient>, config: Config, input: R, out: W) -> Self {
        let root = config.workspace.root_path();
        Self {
            client,
            config,
            root,
            history: Vec::new(),
            files: Vec::new(),
            input,
            out,
        }
    }

    pub fn history(&self) -> &[ChatMessage] {
        &self.history
    }

    pub fn files(&self) -> &[FileDescriptor] {
        &self.files
    }

    pub fn output(&self) -> &W {
        &self.out
    }

    /// Read and handle lines until `/exit` or end of input
    pub async fn run(&mut self) -> Result<()> {
        if let Err(e) = self.reindex() {
            writeln!(self.out, "Warning: Error indexing workspace files: {}", e)?;
        }

        if self.config.ui.show_banner {
            writeln!(self.out, "{}", HELP_TEXT)?;
        }

        loop {
            write!(self.out, "\n> ")?;
            self.out.flush()?;

            let mut line = String::new();
            if self.input.read_line(&mut line)? == 0 {
                break;
            }
            let line = line.trim_end_matches(['\r', '\n']);

            if self.handle_line(line).await? == Flow::Exit {
                break;
            }
        }

        Ok(())
    }

    pub async fn handle_line(&mut self, line: &str) -> Result<Flow> {
        match parse_input(line) {
            Input::Blank => {}
            Input::Command(SlashCommand::Exit) => {
                writeln!(self.out, "Goodbye!")?;
                return Ok(Flow::Exit);
            }
            Input::Command(SlashCommand::Clear) => {
                self.history.clear();
                writeln!(self.out, "Conversation history cleared.")?;
            }
            Input::Command(SlashCommand::Help) => {
                writeln!(self.out, "{}", HELP_TEXT)?;
            }
            Input::Command(SlashCommand::Index) => match self.reindex() {
                Ok(_) => writeln!(self.out, "Workspace files indexed successfully.")?,
                Err(e) => writeln!(self.out, "Error indexing workspace files: {}", e)?,
            },
            Input::Command(SlashCommand::Unknown(command)) => {
                writeln!(self.out, "Unknown command: {}", command)?;
            }
            Input::Message(text) => self.converse(text).await?,
        }
        Ok(Flow::Continue)
    }

    /// Rebuild the workspace index, replacing the previous one on success
    pub fn reindex(&mut self) -> Result<usize> {
        let files = workspace::index_workspace(&self.root, &self.config.workspace)?;
        self.files = files;
        Ok(self.files.len())
    }

    async fn converse(&mut self, text: &str) -> Result<()> {
        let user = ChatMessage::user(text);
        let system = llm::system_prompt(&self.files);
        let mut messages = self.history.clone();
        messages.push(user.clone());

        write!(self.out, "\n{} ", "Claude:".cyan().bold())?;
        self.out.flush()?;

        let reply = match self.stream_reply(&system, &messages).await {
            Ok(reply) => reply,
            Err(e @ CaiaError::Io(_)) => return Err(e),
            Err(e) => {
                tracing::warn!("Turn abandoned: {}", e);
                writeln!(self.out, "\n{} {}", "Error:".red(), e)?;
                return Ok(());
            }
        };
        writeln!(self.out)?;

        self.history.push(user);
        self.history.push(ChatMessage::assistant(reply.clone()));

        self.apply_reply(&reply)
    }

    /// Echo the streamed reply as it arrives and return the full text
    async fn stream_reply(&mut self, system: &str, messages: &[ChatMessage]) -> Result<String> {
        let mut chunks = self.client.stream_chat(system, messages).await?;
        let mut reply = String::new();

        while let Some(chunk) = chunks.next().await {
            let chunk = chunk?;
            write!(self.out, "{}", chunk)?;
            self.out.flush()?;
            reply.push_str(&chunk);
        }

        if reply.is_empty() {
            return Err(CaiaError::Llm("Empty response from API".to_string()));
        }
        Ok(reply)
    }

    /// Extract, confirm and run every instruction in a reply
    fn apply_reply(&mut self, reply: &str) -> Result<()> {
        if !reply.contains(r#""operation""#) {
            return Ok(());
        }

        let mut instructions = Vec::new();
        for candidate in actions::extract_candidates(reply) {
            match actions::decode(candidate) {
                Ok(Some(instruction)) => {
                    let kind = if instruction.verb == Verb::Read { "read action" } else { "action" };
                    writeln!(self.out, "\nFound valid {} for file: {}", kind, instruction.target)?;
                    instructions.push(instruction);
                }
                Ok(None) => tracing::debug!("Dropping object that is not a runnable instruction"),
                Err(CaiaError::Json(e)) => writeln!(self.out, "\nError parsing JSON: {}", e)?,
                Err(e) => writeln!(self.out, "\nError decoding instruction: {}", e)?,
            }
        }

        if instructions.is_empty() {
            writeln!(self.out, "\nNo valid file operations found in the response.")?;
            return Ok(());
        }

        writeln!(self.out, "\nFound {} file operations to execute.", instructions.len())?;
        for instruction in &instructions {
            self.run_instruction(instruction)?;
        }

        if let Err(e) = self.reindex() {
            writeln!(self.out, "Warning: Error reindexing workspace files: {}", e)?;
        }
        Ok(())
    }

    fn run_instruction(&mut self, instruction: &Instruction) -> Result<()> {
        let target = &instruction.target;
        match instruction.verb {
            Verb::Create if instruction.is_spreadsheet() => writeln!(
                self.out,
                "\nPreparing to create Excel file: {} with {} sheet operations",
                target,
                instruction.sheet_op_count()
            )?,
            Verb::Create => writeln!(self.out, "\nPreparing to create file: {}", target)?,
            Verb::Edit => writeln!(self.out, "\nPreparing to edit file: {}", target)?,
            Verb::Read => writeln!(self.out, "\nPreparing to read file: {}", target)?,
        }

        let preview_chars = self.config.ui.preview_chars;
        if !actions::confirm(instruction, preview_chars, &mut self.input, &mut self.out) {
            return Ok(());
        }

        let failure = match actions::execute(instruction, &self.root) {
            Ok(outcome) => {
                self.render(&outcome)?;
                outcome.failure()
            }
            Err(e) => Some(e),
        };

        match failure {
            None => writeln!(
                self.out,
                "{}",
                format!("Successfully handled operation for {}", target).green()
            )?,
            Some(e) => {
                tracing::warn!("{} of {} failed: {}", instruction.verb, target, e);
                writeln!(
                    self.out,
                    "{}",
                    format!("Error performing operation: {}", e).red()
                )?;
            }
        }
        Ok(())
    }

    fn render(&mut self, outcome: &Outcome) -> Result<()> {
        match outcome {
            Outcome::Written { path, verb: Verb::Edit } => {
                writeln!(self.out, "\nChanges saved to: {}", path.display())?;
            }
            Outcome::Written { path, .. } => {
                writeln!(self.out, "\nCreated: {}", path.display())?;
            }
            Outcome::FileContents { path, contents } => {
                writeln!(self.out, "\nContents of {}:\n\n{}", path.display(), contents)?;
            }
            Outcome::SheetContents { path, sheets, .. } => {
                for sheet in sheets {
                    writeln!(
                        self.out,
                        "\nReading sheet '{}' from {}:\n",
                        sheet.name,
                        path.display()
                    )?;
                    for (i, row) in sheet.rows.iter().enumerate() {
                        writeln!(self.out, "Row {}: {:?}", i + 1, row)?;
                    }
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::MockLlmClient;
    use futures::stream;
    use std::io::Cursor;
    use tempfile::TempDir;

    type TestSession = Session<Cursor<Vec<u8>>, Vec<u8>>;

    fn reply(parts: &[&str]) -> llm::ChunkStream {
        let parts: Vec<Result<String>> = parts.iter().map(|p| Ok(p.to_string())).collect();
        stream::iter(parts).boxed()
    }

    fn replying(parts: &'static [&'static str]) -> MockLlmClient {
        let mut client = MockLlmClient::new();
        client
            .expect_stream_chat()
            .times(1)
            .returning(move |_, _| Ok(reply(parts)));
        client
    }

    fn session(client: MockLlmClient, root: &TempDir, input: &str) -> TestSession {
        let mut config = Config::default();
        config.workspace.root = root.path().to_string_lossy().to_string();
        config.ui.show_banner = false;
        Session::new(
            Box::new(client),
            config,
            Cursor::new(input.as_bytes().to_vec()),
            Vec::new(),
        )
    }

    fn output(session: &TestSession) -> String {
        String::from_utf8_lossy(session.output()).to_string()
    }

    #[tokio::test]
    async fn test_scenario_create_file_from_prose() {
        let root = TempDir::new().unwrap();
        let client = replying(&[
            "Here you go ",
            r#"{"operation":"create","filename":"hi.py","content":"print('hi')\n"}"#,
            " thanks",
        ]);
        let mut session = session(client, &root, "make hi.py\ny\n");

        session.run().await.unwrap();

        assert_eq!(
            std::fs::read_to_string(root.path().join("hi.py")).unwrap(),
            "print('hi')\n"
        );
        let out = output(&session);
        assert!(out.contains("Found valid action for file: hi.py"));
        assert!(out.contains("Found 1 file operations to execute."));
        assert!(out.contains("Successfully handled operation for hi.py"));
        assert_eq!(session.history().len(), 2);
        assert_eq!(session.history()[1].content, r#"Here you go {"operation":"create","filename":"hi.py","content":"print('hi')\n"} thanks"#);
        assert!(session.files().iter().any(|f| f.name == "hi.py"));
    }

    #[tokio::test]
    async fn test_scenario_two_files_in_order() {
        let root = TempDir::new().unwrap();
        let client = replying(&[
            "Two files:\n",
            r#"{"operation":"create","filename":"a.py","content":"a = 1\\n"}"#,
            "\n",
            r#"{"operation":"create","filename":"b.js","content":"const b = 2;\\n"}"#,
        ]);
        let mut session = session(client, &root, "two files\ny\nyes\n");

        session.run().await.unwrap();

        assert_eq!(std::fs::read_to_string(root.path().join("a.py")).unwrap(), "a = 1\n");
        assert_eq!(
            std::fs::read_to_string(root.path().join("b.js")).unwrap(),
            "const b = 2;\n"
        );
        let out = output(&session);
        let first = out.find("Preparing to create file: a.py").unwrap();
        let second = out.find("Preparing to create file: b.js").unwrap();
        assert!(first < second);
    }

    #[tokio::test]
    async fn test_scenario_spreadsheet_create() {
        let root = TempDir::new().unwrap();
        let client = replying(&[
            "Creating it now.\n",
            r#"{"operation":"create","filename":"people.xlsx","actions":[{"type":"create_sheet","sheet":"Sheet1"},{"type":"add_row","sheet":"Sheet1","row":["Name","Age"]},{"type":"add_row","sheet":"Sheet1","row":["Ann","30"]}]}"#,
        ]);
        let mut session = session(client, &root, "people sheet\ny\n");

        session.run().await.unwrap();

        let out = output(&session);
        assert!(out.contains("Preparing to create Excel file: people.xlsx with 3 sheet operations"));
        assert!(out.contains("with 3 sheet operations? (y/n)"));

        let book = umya_spreadsheet::reader::xlsx::read(root.path().join("people.xlsx")).unwrap();
        assert_eq!(book.get_sheet_collection().len(), 1);
        let sheet = book.get_sheet_by_name("Sheet1").unwrap();
        assert_eq!(sheet.get_value((1, 1)), "Name");
        assert_eq!(sheet.get_value((2, 1)), "Age");
        assert_eq!(sheet.get_value((1, 2)), "Ann");
        assert_eq!(sheet.get_cell((2, 2)).unwrap().get_value_number(), Some(30.0));

        let indexed = session.files().iter().find(|f| f.name == "people.xlsx").unwrap();
        assert_eq!(indexed.row_counts.get("Sheet1"), Some(&2));
    }

    #[tokio::test]
    async fn test_decline_writes_nothing() {
        let root = TempDir::new().unwrap();
        let client = replying(&[
            r#"{"operation":"create","filename":"nope.txt","content":"x"}"#,
            r#"{"operation":"create","filename":"nope.xlsx","actions":[{"type":"add_row","sheet":"Sheet1","row":["a"]}]}"#,
        ]);
        let mut session = session(client, &root, "go\nn\nno thanks\n");

        session.run().await.unwrap();

        assert!(!root.path().join("nope.txt").exists());
        assert!(!root.path().join("nope.xlsx").exists());
        let out = output(&session);
        assert_eq!(out.matches("Operation cancelled by user.").count(), 2);
        assert!(!out.contains("Successfully handled"));
    }

    #[tokio::test]
    async fn test_empty_create_never_reaches_confirmation() {
        let root = TempDir::new().unwrap();
        let client = replying(&[
            r#"{"operation":"create","filename":"empty.py","content":"","actions":[]}"#,
        ]);
        let mut session = session(client, &root, "go\n");

        session.run().await.unwrap();

        let out = output(&session);
        assert!(!out.contains("(y/n)"));
        assert!(out.contains("No valid file operations found in the response."));
        assert!(!root.path().join("empty.py").exists());
    }

    #[tokio::test]
    async fn test_read_skips_confirmation() {
        let root = TempDir::new().unwrap();
        std::fs::write(root.path().join("notes.md"), "# Notes\nline two").unwrap();
        let client = replying(&[r#"Let me look. {"operation":"read","filename":"notes.md"}"#]);
        let mut session = session(client, &root, "show notes\n");

        session.run().await.unwrap();

        let out = output(&session);
        assert!(out.contains("Found valid read action for file: notes.md"));
        assert!(out.contains("# Notes\nline two"));
        assert!(!out.contains("(y/n)"));
    }

    #[tokio::test]
    async fn test_partial_sheet_read_shows_rows_then_error() {
        let root = TempDir::new().unwrap();
        let mut book = umya_spreadsheet::new_file();
        book.get_sheet_by_name_mut("Sheet1")
            .unwrap()
            .get_cell_mut((1, 1))
            .set_value_string("alpha");
        umya_spreadsheet::writer::xlsx::write(&book, root.path().join("book.xlsx")).unwrap();
        let client = replying(&[r#"{"operation":"read","filename":"book.xlsx","actions":[
            {"type":"read_sheet","sheet":"Sheet1"},
            {"type":"read_sheet","sheet":"Missing"}]}"#]);
        let mut session = session(client, &root, "show book\n");

        session.run().await.unwrap();

        let out = output(&session);
        assert!(out.contains("Reading sheet 'Sheet1'"));
        assert!(out.contains(r#"Row 1: ["alpha"]"#));
        assert!(out.contains("Error performing operation: Sheet not found: Missing"));
        assert!(!out.contains("Successfully handled operation"));
    }

    #[tokio::test]
    async fn test_failed_instruction_does_not_stop_batch() {
        let root = TempDir::new().unwrap();
        let client = replying(&[
            r#"{"operation":"edit","filename":"missing/dir.txt","content":"x"}"#,
            r#"{"operation":"create","filename":"ok.txt","content":"fine"}"#,
        ]);
        let mut session = session(client, &root, "go\ny\ny\n");

        session.run().await.unwrap();

        let out = output(&session);
        assert!(out.contains("Error performing operation:"));
        assert_eq!(std::fs::read_to_string(root.path().join("ok.txt")).unwrap(), "fine");
    }

    #[tokio::test]
    async fn test_malformed_candidate_reported() {
        let root = TempDir::new().unwrap();
        let client = replying(&[
            r#"{"operation":"create","filename":"a.txt","content":"x",} "#,
            r#"{"operation":"create","filename":"b.txt","content":"y"}"#,
        ]);
        let mut session = session(client, &root, "go\ny\n");

        session.run().await.unwrap();

        let out = output(&session);
        assert!(out.contains("Error parsing JSON:"));
        assert!(!root.path().join("a.txt").exists());
        assert!(root.path().join("b.txt").exists());
    }

    #[tokio::test]
    async fn test_prose_without_operations_is_not_scanned() {
        let root = TempDir::new().unwrap();
        let client = replying(&["Use a block like { braces } in Rust."]);
        let mut session = session(client, &root, "explain\n");

        session.run().await.unwrap();

        let out = output(&session);
        assert!(!out.contains("No valid file operations"));
        assert!(!out.contains("Error parsing JSON"));
        assert_eq!(session.history().len(), 2);
    }

    #[tokio::test]
    async fn test_transport_error_abandons_turn() {
        let root = TempDir::new().unwrap();
        let mut client = MockLlmClient::new();
        client
            .expect_stream_chat()
            .times(2)
            .returning(|_, _| Err(CaiaError::Llm("connection reset".to_string())));
        let mut session = session(client, &root, "hello\nagain\n");

        session.run().await.unwrap();

        let out = output(&session);
        assert_eq!(out.matches("connection reset").count(), 2);
        assert!(session.history().is_empty());
    }

    #[tokio::test]
    async fn test_stream_failure_mid_reply_discards_turn() {
        let root = TempDir::new().unwrap();
        let mut client = MockLlmClient::new();
        client.expect_stream_chat().times(1).returning(|_, _| {
            let parts: Vec<Result<String>> = vec![
                Ok(r#"{"operation":"create","filename":"x.txt","content":"x"}"#.to_string()),
                Err(CaiaError::Llm("stream cut".to_string())),
            ];
            Ok(stream::iter(parts).boxed())
        });
        let mut session = session(client, &root, "go\n");

        session.run().await.unwrap();

        assert!(output(&session).contains("stream cut"));
        assert!(session.history().is_empty());
        assert!(!root.path().join("x.txt").exists());
    }

    #[tokio::test]
    async fn test_empty_reply_is_an_error() {
        let root = TempDir::new().unwrap();
        let client = replying(&[]);
        let mut session = session(client, &root, "hello\n");

        session.run().await.unwrap();

        assert!(output(&session).contains("Empty response from API"));
        assert!(session.history().is_empty());
    }

    #[tokio::test]
    async fn test_history_and_workspace_sent_to_client() {
        let root = TempDir::new().unwrap();
        std::fs::write(root.path().join("main.go"), "package main").unwrap();

        let mut client = MockLlmClient::new();
        let mut seq = mockall::Sequence::new();
        client
            .expect_stream_chat()
            .withf(|system: &str, messages: &[ChatMessage]| {
                system.contains("- File: main.go (Type: Go") && messages.len() == 1
            })
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(reply(&["first answer"])));
        client
            .expect_stream_chat()
            .withf(|_: &str, messages: &[ChatMessage]| {
                messages.len() == 3
                    && messages[1] == ChatMessage::assistant("first answer")
                    && messages[2] == ChatMessage::user("second")
            })
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(reply(&["second answer"])));

        let mut session = session(client, &root, "first\nsecond\n");
        session.run().await.unwrap();

        assert_eq!(session.history().len(), 4);
    }

    #[tokio::test]
    async fn test_slash_commands() {
        let root = TempDir::new().unwrap();
        let mut client = MockLlmClient::new();
        client.expect_stream_chat().never();
        let mut session = session(client, &root, "");

        assert_eq!(session.handle_line("/help").await.unwrap(), Flow::Continue);
        assert_eq!(session.handle_line("/clear").await.unwrap(), Flow::Continue);
        assert_eq!(session.handle_line("/bogus").await.unwrap(), Flow::Continue);
        assert_eq!(session.handle_line("   ").await.unwrap(), Flow::Continue);

        std::fs::write(root.path().join("late.rs"), "fn main() {}").unwrap();
        assert_eq!(session.handle_line("/index").await.unwrap(), Flow::Continue);
        assert!(session.files().iter().any(|f| f.name == "late.rs"));

        assert_eq!(session.handle_line("/exit").await.unwrap(), Flow::Exit);

        let out = output(&session);
        assert!(out.contains("/index  - Reindex workspace files"));
        assert!(out.contains("Conversation history cleared."));
        assert!(out.contains("Unknown command: /bogus"));
        assert!(out.contains("Workspace files indexed successfully."));
        assert!(out.contains("Goodbye!"));
    }

    #[tokio::test]
    async fn test_exit_stops_reading_input() {
        let root = TempDir::new().unwrap();
        let mut client = MockLlmClient::new();
        client.expect_stream_chat().never();
        let mut session = session(client, &root, "/exit\nthis is never sent\n");

        session.run().await.unwrap();

        assert!(session.history().is_empty());
    }

    #[tokio::test]
    async fn test_clear_resets_history() {
        let root = TempDir::new().unwrap();
        let client = replying(&["hello there"]);
        let mut session = session(client, &root, "hi\n/clear\n");

        session.run().await.unwrap();

        assert!(session.history().is_empty());
    }
}
