use serde::{Deserialize, Deserializer};
use std::fmt;
use std::path::Path;

/// Extensions (lowercase) handled by the spreadsheet mutator
pub const SPREADSHEET_EXTENSIONS: &[&str] = &["xlsx", "xls"];

/// Whether a target path names a spreadsheet document
pub fn is_spreadsheet(target: &str) -> bool {
    Path::new(target)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            SPREADSHEET_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
        .unwrap_or(false)
}

/// Deserialize a string, accepting the numbers and booleans a model
/// sometimes emits in place of quoted text. `null` becomes an empty string.
fn deserialize_flexible_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::{self, Visitor};

    struct FlexibleStringVisitor;

    impl<'de> Visitor<'de> for FlexibleStringVisitor {
        type Value = String;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("string, boolean, number, or null")
        }

        fn visit_unit<E>(self) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(String::new())
        }

        fn visit_none<E>(self) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(String::new())
        }

        fn visit_bool<E>(self, v: bool) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(v.to_string())
        }

        fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(v.to_string())
        }

        fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(v.to_string())
        }

        fn visit_f64<E>(self, v: f64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(v.to_string())
        }

        fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(v.to_string())
        }

        fn visit_string<E>(self, v: String) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(v)
        }
    }

    deserializer.deserialize_any(FlexibleStringVisitor)
}

/// Row token with the same leniency as [`deserialize_flexible_string`]
struct Token(String);

impl<'de> Deserialize<'de> for Token {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserialize_flexible_string(deserializer).map(Token)
    }
}

fn deserialize_row<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let tokens = Option::<Vec<Token>>::deserialize(deserializer)?;
    Ok(tokens
        .unwrap_or_default()
        .into_iter()
        .map(|Token(text)| text)
        .collect())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verb {
    Create,
    Edit,
    Read,
}

impl Verb {
    fn parse(s: &str) -> Option<Self> {
        match s {
            "create" => Some(Verb::Create),
            "edit" => Some(Verb::Edit),
            "read" => Some(Verb::Read),
            _ => None,
        }
    }

    pub fn mutates(self) -> bool {
        !matches!(self, Verb::Read)
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verb::Create => write!(f, "create"),
            Verb::Edit => write!(f, "edit"),
            Verb::Read => write!(f, "read"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SheetOpKind {
    CreateSheet,
    SetCell,
    AddRow,
    ReadSheet,
    /// Anything else; skipped during execution
    #[serde(other)]
    Unknown,
}

/// One step of a spreadsheet instruction
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SheetOperation {
    #[serde(rename = "type")]
    pub kind: SheetOpKind,
    #[serde(default, deserialize_with = "deserialize_flexible_string")]
    pub sheet: String,
    #[serde(default, deserialize_with = "deserialize_flexible_string")]
    pub cell: String,
    #[serde(default, deserialize_with = "deserialize_flexible_string")]
    pub value: String,
    #[serde(default, deserialize_with = "deserialize_row")]
    pub row: Vec<String>,
}

/// What an instruction carries, chosen by the target's extension
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// Plain-file content with newlines still encoded as `\n`
    Content(String),
    Sheet(Vec<SheetOperation>),
}

/// A validated unit of requested work
#[derive(Debug, Clone, PartialEq)]
pub struct Instruction {
    pub verb: Verb,
    pub target: String,
    pub payload: Payload,
}

impl Instruction {
    pub fn is_spreadsheet(&self) -> bool {
        matches!(self.payload, Payload::Sheet(_))
    }

    /// Number of sheet operations, zero for plain files
    pub fn sheet_op_count(&self) -> usize {
        match &self.payload {
            Payload::Sheet(ops) => ops.len(),
            Payload::Content(_) => 0,
        }
    }
}

/// Wire shape of an instruction object, before validation
#[derive(Debug, Deserialize)]
struct RawInstruction {
    #[serde(default)]
    operation: String,
    #[serde(default)]
    filename: String,
    #[serde(default, deserialize_with = "deserialize_flexible_string")]
    content: String,
    #[serde(default)]
    actions: Option<Vec<SheetOperation>>,
}

/// Decode a candidate object into an instruction.
///
/// Returns `Err` when the candidate is not valid JSON of the expected shape,
/// and `Ok(None)` when it decodes but does not describe runnable work.
pub fn decode(candidate: &str) -> crate::Result<Option<Instruction>> {
    let raw: RawInstruction = serde_json::from_str(candidate)?;
    Ok(validate(raw))
}

fn validate(raw: RawInstruction) -> Option<Instruction> {
    if raw.operation.is_empty() || raw.filename.is_empty() {
        return None;
    }

    let verb = Verb::parse(&raw.operation)?;
    let actions = raw.actions.unwrap_or_default();

    if verb.mutates() && raw.content.is_empty() && actions.is_empty() {
        return None;
    }

    let payload = if is_spreadsheet(&raw.filename) {
        Payload::Sheet(actions)
    } else {
        Payload::Content(raw.content)
    };

    Some(Instruction {
        verb,
        target: raw.filename,
        payload,
    })
}
