//! Interactive menu for the coordinator.
//!
//! Reads user lines from any stream (stdin in production), drives the
//! [`Session`], and prints results. End of input is treated as `quit`.

use std::io::Write;

use futures::{Stream, StreamExt};
use tokio_util::codec::LinesCodecError;

use cipherlink_core::session::{History, parse_selection};
use cipherlink_core::{CipherService, Command, Input, LogSink, Session};

pub const MENU: &str = "
Commands:
  password - Set encryption password
  encrypt  - Encrypt a string
  decrypt  - Decrypt a string
  history  - Show history
  quit     - Exit the program
";

const HISTORY_PROMPT: &str = "Use a string from history? (y/n): ";
const SELECT_PROMPT: &str = "Select a number from history (or 0 to enter new): ";

fn fresh_prompt(command: Command) -> &'static str {
    match command {
        Command::Password => "Enter new password (letters only): ",
        Command::Encrypt => "Enter string to encrypt (letters only): ",
        _ => "Enter string to decrypt (letters only): ",
    }
}

pub struct Console<I, O> {
    input: I,
    out: O,
}

impl<I, O> Console<I, O>
where
    I: Stream<Item = Result<String, LinesCodecError>> + Unpin,
    O: Write,
{
    pub fn new(input: I, out: O) -> Self {
        Self { input, out }
    }

    #[cfg(test)]
    pub fn into_output(self) -> O {
        self.out
    }

    /// Run the menu loop, then shut the session down.
    ///
    /// Shutdown runs however the loop ends, including when writing to the
    /// terminal fails. The first error is returned after the workers exit.
    pub async fn run<C, L>(&mut self, session: &mut Session<C, L>) -> anyhow::Result<()>
    where
        C: CipherService,
        L: LogSink,
    {
        let outcome = self.interact(session).await;
        if let Err(e) = &outcome {
            tracing::error!(
                session = %session.id(),
                error = %e,
                "Console failed, shutting down"
            );
        }
        let shutdown = self.quit(session).await;
        outcome.and(shutdown)
    }

    /// Menu loop. Returns on `quit` or end of input.
    async fn interact<C, L>(&mut self, session: &mut Session<C, L>) -> anyhow::Result<()>
    where
        C: CipherService,
        L: LogSink,
    {
        loop {
            write!(self.out, "{MENU}")?;
            let Some(line) = self.prompt("Enter command: ").await? else {
                tracing::info!("Input closed, shutting down");
                return Ok(());
            };

            let command = match line.parse::<Command>() {
                Ok(command) => command,
                Err(_) => {
                    let err = session.reject_command(&line).await;
                    writeln!(self.out, "{err} Please try again.")?;
                    continue;
                }
            };
            tracing::debug!(command = command.name(), "Dispatching command");

            match command {
                Command::Quit => return Ok(()),
                Command::History => {
                    let history = session.list_history().await;
                    if history.is_empty() {
                        writeln!(self.out, "History is empty.")?;
                    } else {
                        writeln!(self.out, "History:")?;
                        for (n, entry) in history.numbered() {
                            writeln!(self.out, "{n}. {entry}")?;
                        }
                    }
                }
                Command::Password | Command::Encrypt | Command::Decrypt => {
                    let Some(input) = self.read_input(command, session.history()).await? else {
                        return Ok(());
                    };
                    let outcome = match command {
                        Command::Password => session.password(input).await,
                        Command::Encrypt => session.encrypt(input).await,
                        _ => session.decrypt(input).await,
                    };
                    match outcome {
                        Ok(response) => writeln!(self.out, "{response}")?,
                        Err(e) => writeln!(self.out, "Error: {e}")?,
                    }
                }
            }
        }
    }

    async fn quit<C, L>(&mut self, session: &mut Session<C, L>) -> anyhow::Result<()>
    where
        C: CipherService,
        L: LogSink,
    {
        if let Err(e) = session.quit().await {
            writeln!(self.out, "Error: {e}")?;
        }
        writeln!(self.out, "Driver program terminated.")?;
        self.out.flush()?;
        Ok(())
    }

    /// Ask for a command's string. Returns `None` if input ends first.
    async fn read_input(
        &mut self,
        command: Command,
        history: &History,
    ) -> anyhow::Result<Option<Input>> {
        let Some(answer) = self.prompt(HISTORY_PROMPT).await? else {
            return Ok(None);
        };

        if answer.trim().eq_ignore_ascii_case("y") && !history.is_empty() {
            writeln!(self.out, "History:")?;
            for (n, entry) in history.numbered() {
                writeln!(self.out, "{n}. {entry}")?;
            }
            writeln!(self.out, "0. Enter a new string")?;

            loop {
                let Some(choice) = self.prompt(SELECT_PROMPT).await? else {
                    return Ok(None);
                };
                match parse_selection(&choice, history.len()) {
                    Ok(Some(index)) => return Ok(Some(Input::History(index))),
                    Ok(None) => break,
                    Err(_) => writeln!(self.out, "Invalid selection. Please try again.")?,
                }
            }
        }

        Ok(self.prompt(fresh_prompt(command)).await?.map(Input::Fresh))
    }

    async fn prompt(&mut self, text: &str) -> anyhow::Result<Option<String>> {
        write!(self.out, "{text}")?;
        self.out.flush()?;
        match self.input.next().await {
            Some(Ok(line)) => Ok(Some(line)),
            // FramedRead yields nothing after a decode error, so this ends input.
            Some(Err(e)) => {
                tracing::warn!(error = %e, "Unreadable input line");
                writeln!(self.out, "Error reading input: {e}")?;
                Ok(None)
            }
            None => Ok(None),
        }
    }
}
