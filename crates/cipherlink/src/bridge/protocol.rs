//! Wire protocol types for coordinator-worker communication.
//!
//! Two channels, both newline-delimited UTF-8 text:
//! - **Engine channel** (stdin/stdout, half-duplex): [`Request`] in, [`Response`] out
//! - **Sink channel** (stdin only, one-way): [`SinkMessage`]

use std::fmt;

use super::codec::WireLine;

/// Reply text for a PASS whose argument is not purely alphabetic.
pub const INVALID_PASSKEY: &str = "Invalid passkey. Must contain only letters.";
/// Reply text for ENCRYPT/DECRYPT before any key was set.
pub const PASSWORD_NOT_SET: &str = "Password not set";
/// Reply text for ENCRYPT/DECRYPT with a non-alphabetic argument.
pub const INPUT_NOT_LETTERS: &str = "Input must contain only letters";
/// Reply text for an unrecognized verb.
pub const UNKNOWN_COMMAND: &str = "Unknown command";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolError {
    #[error("empty line")]
    Empty,

    #[error("unrecognized response status '{0}'")]
    UnknownStatus(String),
}

/// Splits a line into its first whitespace-delimited token and the remainder.
fn split_verb(line: &str) -> (&str, &str) {
    let line = line.trim();
    match line.split_once(char::is_whitespace) {
        Some((head, rest)) => (head, rest.trim_start()),
        None => (line, ""),
    }
}

/// Requests from coordinator to engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    /// `PASS <key>` or its alias `PASSKEY <key>`.
    Pass(String),
    Encrypt(String),
    Decrypt(String),
    /// Ends the engine's read loop. Never answered.
    Quit,
    /// Any other verb, kept so the engine can answer it.
    Unknown { verb: String, argument: String },
}

impl Request {
    pub fn verb(&self) -> &str {
        match self {
            Self::Pass(_) => "PASS",
            Self::Encrypt(_) => "ENCRYPT",
            Self::Decrypt(_) => "DECRYPT",
            Self::Quit => "QUIT",
            Self::Unknown { verb, .. } => verb,
        }
    }
}

impl WireLine for Request {
    fn to_line(&self) -> String {
        match self {
            Self::Pass(arg) | Self::Encrypt(arg) | Self::Decrypt(arg) => {
                format!("{} {}", self.verb(), arg)
            }
            Self::Quit => "QUIT".to_string(),
            Self::Unknown { verb, argument } if argument.is_empty() => verb.clone(),
            Self::Unknown { verb, argument } => format!("{verb} {argument}"),
        }
    }

    fn from_line(line: &str) -> Result<Self, ProtocolError> {
        let (verb, argument) = split_verb(line);
        if verb.is_empty() {
            return Err(ProtocolError::Empty);
        }
        let verb = verb.to_ascii_uppercase();
        let argument = argument.to_string();
        Ok(match verb.as_str() {
            "PASS" | "PASSKEY" => Self::Pass(argument),
            "ENCRYPT" => Self::Encrypt(argument),
            "DECRYPT" => Self::Decrypt(argument),
            "QUIT" => Self::Quit,
            _ => Self::Unknown { verb, argument },
        })
    }
}

/// Replies from engine to coordinator, exactly one per non-QUIT request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// `RESULT[ <payload>]`; payload is empty for PASS.
    Result(String),
    /// `ERROR <reason>`.
    Error(String),
}

impl Response {
    pub fn ok(payload: impl Into<String>) -> Self {
        Self::Result(payload.into())
    }

    pub fn error(reason: impl Into<String>) -> Self {
        Self::Error(reason.into())
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Result(_))
    }
}

/// Renders the reply exactly as it travels on the wire.
impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Result(payload) if payload.is_empty() => f.write_str("RESULT"),
            Self::Result(payload) => write!(f, "RESULT {payload}"),
            Self::Error(reason) => write!(f, "ERROR {reason}"),
        }
    }
}

impl WireLine for Response {
    fn to_line(&self) -> String {
        self.to_string()
    }

    fn from_line(line: &str) -> Result<Self, ProtocolError> {
        let (status, rest) = split_verb(line);
        match status {
            "RESULT" => Ok(Self::Result(rest.to_string())),
            "ERROR" => Ok(Self::Error(rest.to_string())),
            "" => Err(ProtocolError::Empty),
            other => Err(ProtocolError::UnknownStatus(other.to_string())),
        }
    }
}

/// Action tags the coordinator writes to the sink.
///
/// The sink itself accepts any token; these are the ones the session emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Start,
    Cmd,
    Pass,
    Result,
    Error,
    Exit,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Start => "START",
            Self::Cmd => "CMD",
            Self::Pass => "PASS",
            Self::Result => "RESULT",
            Self::Error => "ERROR",
            Self::Exit => "EXIT",
        }
    }
}

impl AsRef<str> for Action {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

/// One event destined for the log file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    action: String,
    message: String,
}

impl LogEntry {
    /// Uppercases the action and flattens line breaks so the entry stays one line.
    pub fn new(action: impl AsRef<str>, message: impl Into<String>) -> Self {
        let action = action
            .as_ref()
            .split_whitespace()
            .collect::<String>()
            .to_ascii_uppercase();
        let message = message.into().replace(['\r', '\n'], " ");
        Self { action, message }
    }

    pub fn action(&self) -> &str {
        &self.action
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Messages from coordinator to sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkMessage {
    Record(LogEntry),
    Quit,
}

impl WireLine for SinkMessage {
    fn to_line(&self) -> String {
        match self {
            Self::Record(entry) if entry.message.is_empty() => entry.action.clone(),
            Self::Record(entry) => format!("{} {}", entry.action, entry.message),
            Self::Quit => "QUIT".to_string(),
        }
    }

    fn from_line(line: &str) -> Result<Self, ProtocolError> {
        // Only an exact QUIT line stops the sink; "QUIT something" is a record.
        if line.trim() == "QUIT" {
            return Ok(Self::Quit);
        }
        let (action, message) = split_verb(line);
        if action.is_empty() {
            return Err(ProtocolError::Empty);
        }
        Ok(Self::Record(LogEntry {
            action: action.to_string(),
            message: message.trim_end().to_string(),
        }))
    }
}
