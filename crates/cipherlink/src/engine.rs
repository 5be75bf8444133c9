//! Cipher engine - runs inside the `cipherlink-engine` subprocess.
//!
//! This module provides the worker side of the engine protocol: a key state
//! machine plus the stdin/stdout read loop. The coordinator side lives in
//! orchestrator.rs.

use futures::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::codec::{FramedRead, FramedWrite};

use crate::bridge::codec::LineCodec;
use crate::bridge::protocol::{
    INPUT_NOT_LETTERS, INVALID_PASSKEY, PASSWORD_NOT_SET, Request, Response, UNKNOWN_COMMAND,
};
use crate::cipher::{self, Key};

/// Key lifecycle: unset until the first valid PASS, then replaced by each later one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum KeyState {
    #[default]
    NoKey,
    Keyed(Key),
}

/// The engine's protocol state machine.
#[derive(Debug, Default)]
pub struct Engine {
    state: KeyState,
}

impl Engine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &KeyState {
        &self.state
    }

    pub fn is_keyed(&self) -> bool {
        matches!(self.state, KeyState::Keyed(_))
    }

    /// Apply one request. Returns `None` for QUIT, which is never answered.
    pub fn handle(&mut self, request: Request) -> Option<Response> {
        let response = match request {
            Request::Quit => return None,
            Request::Pass(raw) => match Key::new(&raw) {
                Ok(key) => {
                    self.state = KeyState::Keyed(key);
                    Response::ok("")
                }
                Err(_) => Response::error(INVALID_PASSKEY),
            },
            Request::Encrypt(text) => self.transform(&text, cipher::encrypt),
            Request::Decrypt(text) => self.transform(&text, cipher::decrypt),
            Request::Unknown { .. } => Response::error(UNKNOWN_COMMAND),
        };
        Some(response)
    }

    fn transform(&self, text: &str, op: fn(&str, &Key) -> String) -> Response {
        let KeyState::Keyed(key) = &self.state else {
            return Response::error(PASSWORD_NOT_SET);
        };
        if !cipher::is_alphabetic(text) {
            return Response::error(INPUT_NOT_LETTERS);
        }
        Response::ok(op(&text.to_ascii_uppercase(), key))
    }
}

/// Run the engine read loop until QUIT or end of input.
///
/// Every reply is flushed before the next request is read.
pub async fn run_engine<R, W>(reader: R, writer: W) -> std::io::Result<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut requests = FramedRead::new(reader, LineCodec::<Request>::new());
    let mut replies = FramedWrite::new(writer, LineCodec::<Response>::new());
    let mut engine = Engine::new();

    tracing::info!("Engine ready");

    while let Some(request) = requests.next().await {
        let request = match request {
            Ok(request) => request,
            Err(e) => {
                tracing::error!(error = %e, "Request channel error");
                return Err(e);
            }
        };
        tracing::debug!(verb = request.verb(), "Request received");

        match engine.handle(request) {
            Some(response) => replies.send(response).await?,
            None => {
                tracing::info!("Quit requested");
                return Ok(());
            }
        }
    }

    tracing::info!("Request channel closed, exiting");
    Ok(())
}
