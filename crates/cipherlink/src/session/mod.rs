//! Session coordinator - turns user commands into engine and sink traffic.
//!
//! Per command the sequence is fixed:
//! log CMD → validate → (engine request, await one reply) → log RESULT/ERROR →
//! update history → hand the outcome back to the caller for display.
//!
//! Every failure is returned to the caller as a [`SessionError`]; none of them
//! end the session. Sink failures are only reported through `tracing`.

mod history;

use std::fmt;
use std::str::FromStr;

pub use history::{History, InvalidSelection, parse_selection};

use crate::bridge::protocol::{Action, LogEntry, Request, Response};
use crate::cipher::is_alphabetic;
use crate::orchestrator::{CipherService, LogSink, TransportError};

/// Identifies one coordinator run in diagnostic logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(uuid::Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Password must contain only letters.")]
    InvalidPassword,

    #[error("Input must contain only letters.")]
    InvalidInput,

    /// One-based entry number that does not exist.
    #[error("No history entry number {0}.")]
    NoSuchEntry(usize),

    #[error("Invalid command '{0}'.")]
    UnknownCommand(String),

    #[error("Error communicating with encryption program: {0}")]
    Transport(#[from] TransportError),
}

/// Top-level commands the user can issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Password,
    Encrypt,
    Decrypt,
    History,
    Quit,
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Password => "password",
            Self::Encrypt => "encrypt",
            Self::Decrypt => "decrypt",
            Self::History => "history",
            Self::Quit => "quit",
        }
    }
}

impl FromStr for Command {
    type Err = SessionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "password" => Ok(Self::Password),
            "encrypt" => Ok(Self::Encrypt),
            "decrypt" => Ok(Self::Decrypt),
            "history" => Ok(Self::History),
            "quit" => Ok(Self::Quit),
            _ => Err(SessionError::UnknownCommand(normalized)),
        }
    }
}

/// Where a command's string argument comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    /// Typed by the user; validated before use.
    Fresh(String),
    /// Zero-based index into the session history.
    History(usize),
}

impl Input {
    pub fn fresh(value: impl Into<String>) -> Self {
        Self::Fresh(value.into())
    }
}

#[derive(Debug, Clone, Copy)]
enum Transform {
    Encrypt,
    Decrypt,
}

impl Transform {
    fn name(self) -> &'static str {
        match self {
            Self::Encrypt => "encrypt",
            Self::Decrypt => "decrypt",
        }
    }

    fn label(self) -> &'static str {
        match self {
            Self::Encrypt => "Encrypt",
            Self::Decrypt => "Decrypt",
        }
    }

    fn invalid_note(self) -> &'static str {
        match self {
            Self::Encrypt => "Invalid input for encryption",
            Self::Decrypt => "Invalid input for decryption",
        }
    }

    fn request(self, text: String) -> Request {
        match self {
            Self::Encrypt => Request::Encrypt(text),
            Self::Decrypt => Request::Decrypt(text),
        }
    }
}

/// One interactive session over a cipher service and a log sink.
pub struct Session<C, L> {
    id: SessionId,
    cipher: C,
    sink: L,
    history: History,
}

impl<C: CipherService, L: LogSink> Session<C, L> {
    /// Take ownership of both workers and log the START record.
    pub async fn start(cipher: C, sink: L) -> Self {
        let mut session = Self {
            id: SessionId::new(),
            cipher,
            sink,
            history: History::new(),
        };
        tracing::info!(session = %session.id, "Session started");
        session.log(Action::Start, "Driver program started").await;
        session
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn cipher(&self) -> &C {
        &self.cipher
    }

    pub fn log_sink(&self) -> &L {
        &self.sink
    }

    /// Set the engine key. The key itself never reaches the log or the history.
    pub async fn password(&mut self, input: Input) -> Result<Response, SessionError> {
        self.log(Action::Cmd, "password command invoked").await;

        let key = match self.resolve(input, SessionError::InvalidPassword) {
            Ok(key) => key,
            Err(e) => return Err(self.reject_input(e, "Invalid password entered").await),
        };

        let response = self.exchange(Request::Pass(key)).await?;
        self.log(Action::Pass, "Password set (value hidden)").await;
        self.log(
            Action::Result,
            format!("Password command response: {response}"),
        )
        .await;
        Ok(response)
    }

    pub async fn encrypt(&mut self, input: Input) -> Result<Response, SessionError> {
        self.transform(Transform::Encrypt, input).await
    }

    pub async fn decrypt(&mut self, input: Input) -> Result<Response, SessionError> {
        self.transform(Transform::Decrypt, input).await
    }

    /// The `history` command: logs the request and returns the entries.
    pub async fn list_history(&mut self) -> &History {
        self.log(Action::Cmd, "history command invoked").await;
        self.log(Action::Result, "Displayed history").await;
        &self.history
    }

    /// Record an unrecognized top-level command. No worker is contacted.
    pub async fn reject_command(&mut self, raw: &str) -> SessionError {
        let command = raw.trim().to_ascii_lowercase();
        self.log(Action::Error, format!("Invalid command entered: {command}"))
            .await;
        SessionError::UnknownCommand(command)
    }

    /// Shut both workers down and wait for them to exit.
    ///
    /// Every step runs even if an earlier one fails; the first engine-side
    /// failure is returned.
    pub async fn quit(&mut self) -> Result<(), SessionError> {
        self.log(Action::Cmd, "quit command invoked").await;

        let mut outcome = Ok(());
        if let Err(e) = self.cipher.quit().await {
            self.log(
                Action::Error,
                format!("Error sending QUIT to encryption program: {e}"),
            )
            .await;
            outcome = Err(SessionError::Transport(e));
        }

        // EXIT goes out before the sink's QUIT so it is still written.
        self.log(Action::Exit, "Driver program exiting").await;
        if let Err(e) = self.sink.quit().await {
            tracing::warn!(session = %self.id, error = %e, "Error sending QUIT to logger");
        }

        if let Err(e) = self.cipher.wait().await {
            tracing::error!(session = %self.id, error = %e, "Failed waiting for engine");
            if outcome.is_ok() {
                outcome = Err(SessionError::Transport(e));
            }
        }
        if let Err(e) = self.sink.wait().await {
            tracing::warn!(session = %self.id, error = %e, "Failed waiting for logger");
        }

        tracing::info!(session = %self.id, history_len = self.history.len(), "Session closed");
        outcome
    }

    async fn transform(&mut self, op: Transform, input: Input) -> Result<Response, SessionError> {
        self.log(Action::Cmd, format!("{} command invoked", op.name()))
            .await;

        let text = match self.resolve(input, SessionError::InvalidInput) {
            Ok(text) => text,
            Err(e) => return Err(self.reject_input(e, op.invalid_note()).await),
        };

        let response = self.exchange(op.request(text.clone())).await?;
        self.log(
            Action::Result,
            format!("{} command response: {response}", op.label()),
        )
        .await;

        if let Response::Result(payload) = &response {
            self.history.push(text);
            if !payload.is_empty() {
                self.history.push(payload.clone());
            }
        }
        Ok(response)
    }

    /// Turn an [`Input`] into the uppercase string to send.
    fn resolve(&self, input: Input, invalid: SessionError) -> Result<String, SessionError> {
        match input {
            Input::Fresh(raw) => {
                let raw = raw.trim();
                if !is_alphabetic(raw) {
                    return Err(invalid);
                }
                Ok(raw.to_ascii_uppercase())
            }
            Input::History(index) => self
                .history
                .get(index)
                .map(str::to_ascii_uppercase)
                .ok_or(SessionError::NoSuchEntry(index + 1)),
        }
    }

    async fn reject_input(&mut self, err: SessionError, note: &str) -> SessionError {
        let message = match &err {
            SessionError::NoSuchEntry(_) => err.to_string(),
            _ => note.to_string(),
        };
        self.log(Action::Error, message).await;
        err
    }

    async fn exchange(&mut self, request: Request) -> Result<Response, SessionError> {
        let verb = request.verb().to_string();
        match self.cipher.request(request).await {
            Ok(response) => {
                tracing::debug!(session = %self.id, %verb, ok = response.is_ok(), "Engine replied");
                Ok(response)
            }
            Err(e) => {
                tracing::error!(session = %self.id, %verb, error = %e, "Engine request failed");
                self.log(
                    Action::Error,
                    format!("Encryption program communication error: {e}"),
                )
                .await;
                Err(e.into())
            }
        }
    }

    /// Best-effort write to the sink; failures never reach the caller.
    async fn log(&mut self, action: Action, message: impl Into<String>) {
        if let Err(e) = self.sink.record(LogEntry::new(action, message)).await {
            tracing::warn!(
                session = %self.id,
                action = action.as_str(),
                error = %e,
                "Logging error"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::protocol::{INVALID_PASSKEY, PASSWORD_NOT_SET};
    use crate::local::{LocalCipherService, MemoryLogSink};

    async fn session() -> Session<LocalCipherService, MemoryLogSink> {
        Session::start(LocalCipherService::new(), MemoryLogSink::new()).await
    }

    fn actions(session: &Session<LocalCipherService, MemoryLogSink>) -> Vec<&str> {
        session
            .log_sink()
            .entries()
            .iter()
            .map(|e| e.action())
            .collect()
    }

    #[tokio::test]
    async fn start_logs_start_record() {
        let s = session().await;
        assert_eq!(
            s.log_sink().pairs(),
            vec![("START", "Driver program started")]
        );
    }

    #[tokio::test]
    async fn encrypt_grows_history_with_input_then_result() {
        let mut s = session().await;
        s.password(Input::fresh("KEY")).await.unwrap();
        let reply = s.encrypt(Input::fresh("HELLO")).await.unwrap();

        let Response::Result(ciphertext) = reply else {
            panic!("expected RESULT");
        };
        assert_eq!(ciphertext, "RIJVS");
        assert_eq!(s.history().entries(), ["HELLO", "RIJVS"]);
    }

    #[tokio::test]
    async fn lemon_round_trip() {
        let mut s = session().await;
        assert_eq!(
            s.password(Input::fresh("LEMON")).await.unwrap(),
            Response::ok("")
        );
        assert_eq!(
            s.encrypt(Input::fresh("ATTACKATDAWN")).await.unwrap(),
            Response::ok("LXFOPVEFRNHR")
        );
        assert_eq!(
            s.decrypt(Input::History(1)).await.unwrap(),
            Response::ok("ATTACKATDAWN")
        );
        assert_eq!(
            s.history().entries(),
            ["ATTACKATDAWN", "LXFOPVEFRNHR", "LXFOPVEFRNHR", "ATTACKATDAWN"]
        );
    }

    #[tokio::test]
    async fn fresh_input_is_trimmed_and_uppercased() {
        let mut s = session().await;
        s.password(Input::fresh(" lemon ")).await.unwrap();
        s.encrypt(Input::fresh("attackatdawn")).await.unwrap();
        assert_eq!(
            s.cipher().requests(),
            [
                Request::Pass("LEMON".to_string()),
                Request::Encrypt("ATTACKATDAWN".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn password_is_never_logged_or_kept() {
        let mut s = session().await;
        s.password(Input::fresh("TOPSECRET")).await.unwrap();

        assert!(s.history().is_empty());
        for entry in s.log_sink().entries() {
            assert!(!entry.message().contains("TOPSECRET"));
        }
        assert_eq!(
            s.log_sink().pairs()[1..],
            [
                ("CMD", "password command invoked"),
                ("PASS", "Password set (value hidden)"),
                ("RESULT", "Password command response: RESULT"),
            ]
        );
    }

    #[tokio::test]
    async fn invalid_password_is_rejected_locally() {
        let mut s = session().await;
        let err = s.password(Input::fresh("ab1")).await.unwrap_err();

        assert!(matches!(err, SessionError::InvalidPassword));
        assert!(s.cipher().requests().is_empty());
        assert_eq!(
            s.log_sink().pairs().last(),
            Some(&("ERROR", "Invalid password entered"))
        );
    }

    #[tokio::test]
    async fn invalid_encrypt_input_is_rejected_locally() {
        let mut s = session().await;
        let err = s.encrypt(Input::fresh("hello world")).await.unwrap_err();

        assert!(matches!(err, SessionError::InvalidInput));
        assert!(s.cipher().requests().is_empty());
        assert!(s.history().is_empty());
        assert_eq!(
            s.log_sink().pairs().last(),
            Some(&("ERROR", "Invalid input for encryption"))
        );

        s.decrypt(Input::fresh("")).await.unwrap_err();
        assert_eq!(
            s.log_sink().pairs().last(),
            Some(&("ERROR", "Invalid input for decryption"))
        );
    }

    #[tokio::test]
    async fn engine_error_is_a_reply_not_a_failure() {
        let mut s = session().await;
        let reply = s.encrypt(Input::fresh("HELLO")).await.unwrap();

        assert_eq!(reply, Response::error(PASSWORD_NOT_SET));
        assert!(s.history().is_empty());
        assert_eq!(
            s.log_sink().pairs().last(),
            Some(&("RESULT", "Encrypt command response: ERROR Password not set"))
        );
    }

    #[tokio::test]
    async fn engine_rejected_key_keeps_previous_key() {
        let mut s = session().await;
        s.password(Input::fresh("LEMON")).await.unwrap();

        // The session never sends a non-alphabetic key, so go around it.
        let reply = s
            .cipher
            .request(Request::Pass("ab1".to_string()))
            .await
            .unwrap();
        assert_eq!(reply, Response::error(INVALID_PASSKEY));
        assert_eq!(
            s.encrypt(Input::fresh("ATTACKATDAWN")).await.unwrap(),
            Response::ok("LXFOPVEFRNHR")
        );
    }

    #[tokio::test]
    async fn reused_history_value_is_appended_again() {
        let mut s = session().await;
        s.password(Input::fresh("KEY")).await.unwrap();
        s.encrypt(Input::fresh("HELLO")).await.unwrap();
        s.encrypt(Input::History(0)).await.unwrap();

        assert_eq!(s.history().entries(), ["HELLO", "RIJVS", "HELLO", "RIJVS"]);
    }

    #[tokio::test]
    async fn history_entry_can_be_used_as_password() {
        let mut s = session().await;
        s.password(Input::fresh("KEY")).await.unwrap();
        s.encrypt(Input::fresh("LEMON")).await.unwrap();
        s.password(Input::History(0)).await.unwrap();

        assert_eq!(
            s.cipher().requests().last(),
            Some(&Request::Pass("LEMON".to_string()))
        );
        assert_eq!(s.history().len(), 2);
    }

    #[tokio::test]
    async fn missing_history_entry_is_rejected() {
        let mut s = session().await;
        let err = s.encrypt(Input::History(4)).await.unwrap_err();

        assert!(matches!(err, SessionError::NoSuchEntry(5)));
        assert!(s.cipher().requests().is_empty());
        assert_eq!(
            s.log_sink().pairs().last(),
            Some(&("ERROR", "No history entry number 5."))
        );
    }

    #[tokio::test]
    async fn unknown_command_touches_nothing_but_the_log() {
        let mut s = session().await;
        let raw = "frobnicate";
        let err = match raw.parse::<Command>() {
            Ok(c) => panic!("parsed {c:?}"),
            Err(_) => s.reject_command(raw).await,
        };

        assert_eq!(err.to_string(), "Invalid command 'frobnicate'.");
        assert!(s.cipher().requests().is_empty());
        assert!(s.history().is_empty());
        assert_eq!(
            s.log_sink().pairs().last(),
            Some(&("ERROR", "Invalid command entered: frobnicate"))
        );
    }

    #[tokio::test]
    async fn history_command_logs_and_returns_entries() {
        let mut s = session().await;
        s.password(Input::fresh("KEY")).await.unwrap();
        s.encrypt(Input::fresh("HELLO")).await.unwrap();

        let entries = s.list_history().await.entries().to_vec();
        assert_eq!(entries, ["HELLO", "RIJVS"]);
        assert_eq!(
            s.log_sink().pairs()[s.log_sink().entries().len() - 2..],
            [
                ("CMD", "history command invoked"),
                ("RESULT", "Displayed history"),
            ]
        );
    }

    #[tokio::test]
    async fn quit_shuts_down_both_workers() {
        let mut s = session().await;
        s.quit().await.unwrap();

        assert_eq!(s.cipher().requests(), [Request::Quit]);
        assert!(s.cipher().quit_received());
        assert!(s.cipher().is_terminated());
        assert!(s.log_sink().quit_received());
        assert!(s.log_sink().is_terminated());
        assert_eq!(actions(&s), ["START", "CMD", "EXIT"]);
    }

    #[tokio::test]
    async fn dead_engine_fails_each_command_without_ending_session() {
        let mut s = Session::start(LocalCipherService::disconnected(), MemoryLogSink::new()).await;

        for _ in 0..2 {
            let err = s.encrypt(Input::fresh("HELLO")).await.unwrap_err();
            assert!(matches!(err, SessionError::Transport(_)));
            assert_eq!(
                err.to_string(),
                "Error communicating with encryption program: worker is gone"
            );
        }
        assert_eq!(
            s.log_sink().pairs().last(),
            Some(&(
                "ERROR",
                "Encryption program communication error: worker is gone"
            ))
        );
        assert!(s.history().is_empty());

        // Shutdown still completes and still waits for both workers.
        assert!(s.quit().await.is_err());
        assert!(s.cipher().is_terminated());
        assert!(s.log_sink().is_terminated());
        assert!(actions(&s).contains(&"EXIT"));
    }

    #[tokio::test]
    async fn engine_dying_mid_session() {
        let mut s = session().await;
        s.password(Input::fresh("KEY")).await.unwrap();
        s.cipher.disconnect();

        assert!(s.decrypt(Input::fresh("RIJVS")).await.is_err());
        assert!(s.history().is_empty());
    }

    #[tokio::test]
    async fn dead_sink_never_surfaces() {
        let mut s = Session::start(LocalCipherService::new(), MemoryLogSink::disconnected()).await;

        s.password(Input::fresh("KEY")).await.unwrap();
        assert_eq!(
            s.encrypt(Input::fresh("HELLO")).await.unwrap(),
            Response::ok("RIJVS")
        );
        s.quit().await.unwrap();
        assert!(s.log_sink().entries().is_empty());
        assert!(s.cipher().is_terminated());
    }

    #[test]
    fn commands_parse_case_insensitively() {
        assert_eq!("  ENCRYPT ".parse::<Command>().unwrap(), Command::Encrypt);
        assert_eq!("Quit".parse::<Command>().unwrap(), Command::Quit);
        assert_eq!(Command::History.name(), "history");
        assert!(matches!(
            "Frob".parse::<Command>(),
            Err(SessionError::UnknownCommand(c)) if c == "frob"
        ));
    }
}
