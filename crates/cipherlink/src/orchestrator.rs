//! Orchestrator - spawns the engine and logger subprocesses and speaks to them.
//!
//! Flow:
//! 1. Spawn the logger (stdin piped) and the engine (stdin/stdout piped)
//! 2. Hand both to the session as [`LogSink`] / [`CipherService`]
//! 3. Each engine request is written, flushed, and answered before the next
//! 4. On quit: send QUIT, close stdin, wait for the child to exit

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio_util::codec::{FramedRead, FramedWrite};

use crate::bridge::codec::LineCodec;
use crate::bridge::protocol::{LogEntry, Request, Response, SinkMessage};

/// Failure talking to a worker over its pipes.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("worker closed its output stream")]
    Closed,

    #[error("channel already shut down")]
    Shutdown,
}

/// Request/reply access to a cipher engine.
///
/// `&mut self` keeps the channel half-duplex: one request in flight at most.
#[async_trait]
pub trait CipherService: Send {
    /// Send one request and wait for its reply.
    async fn request(&mut self, request: Request) -> Result<Response, TransportError>;

    /// Send QUIT. No reply is expected.
    async fn quit(&mut self) -> Result<(), TransportError>;

    /// Wait for the engine to terminate.
    async fn wait(&mut self) -> Result<(), TransportError>;
}

/// One-way access to a log sink.
#[async_trait]
pub trait LogSink: Send {
    /// Write one record and flush it.
    async fn record(&mut self, entry: LogEntry) -> Result<(), TransportError>;

    /// Send QUIT.
    async fn quit(&mut self) -> Result<(), TransportError>;

    /// Wait for the sink to terminate.
    async fn wait(&mut self) -> Result<(), TransportError>;
}

#[derive(Debug, thiserror::Error)]
pub enum SpawnError {
    #[error("failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{0} not captured")]
    MissingPipe(&'static str),
}

fn spawn(mut command: Command, program: &Path) -> Result<Child, SpawnError> {
    tracing::info!(program = %program.display(), "Spawning worker subprocess");
    command.spawn().map_err(|source| SpawnError::Spawn {
        program: program.display().to_string(),
        source,
    })
}

async fn wait_child(child: &mut Child, role: &'static str) -> Result<(), TransportError> {
    let status = child.wait().await?;
    if status.success() {
        tracing::debug!(role, "Worker exited");
    } else {
        tracing::warn!(role, %status, "Worker exited with failure status");
    }
    Ok(())
}

/// Engine subprocess addressed over its stdin/stdout.
pub struct ProcessCipherService {
    child: Child,
    writer: Option<FramedWrite<ChildStdin, LineCodec<Request>>>,
    reader: FramedRead<ChildStdout, LineCodec<Response>>,
}

impl ProcessCipherService {
    pub fn spawn(program: &Path) -> Result<Self, SpawnError> {
        let mut command = Command::new(program);
        command
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit());

        let mut child = spawn(command, program)?;
        let stdin = child
            .stdin
            .take()
            .ok_or(SpawnError::MissingPipe("engine stdin"))?;
        let stdout = child
            .stdout
            .take()
            .ok_or(SpawnError::MissingPipe("engine stdout"))?;

        Ok(Self {
            child,
            writer: Some(FramedWrite::new(stdin, LineCodec::new())),
            reader: FramedRead::new(stdout, LineCodec::new()),
        })
    }

    /// OS process id, or `None` once the worker has been waited on.
    pub fn id(&self) -> Option<u32> {
        self.child.id()
    }

    fn writer(
        &mut self,
    ) -> Result<&mut FramedWrite<ChildStdin, LineCodec<Request>>, TransportError> {
        self.writer.as_mut().ok_or(TransportError::Shutdown)
    }
}

#[async_trait]
impl CipherService for ProcessCipherService {
    async fn request(&mut self, request: Request) -> Result<Response, TransportError> {
        let verb = request.verb().to_string();
        self.writer()?.send(request).await?;
        tracing::trace!(%verb, "Request sent, awaiting reply");

        match self.reader.next().await {
            Some(Ok(response)) => Ok(response),
            Some(Err(e)) => Err(e.into()),
            None => Err(TransportError::Closed),
        }
    }

    async fn quit(&mut self) -> Result<(), TransportError> {
        self.writer()?.send(Request::Quit).await?;
        Ok(())
    }

    async fn wait(&mut self) -> Result<(), TransportError> {
        // Closing stdin lets the engine exit even if QUIT never arrived.
        drop(self.writer.take());
        wait_child(&mut self.child, "engine").await
    }
}

/// Logger subprocess addressed over its stdin.
pub struct ProcessLogSink {
    child: Child,
    writer: Option<FramedWrite<ChildStdin, LineCodec<SinkMessage>>>,
}

impl ProcessLogSink {
    pub fn spawn(program: &Path, log_file: &Path) -> Result<Self, SpawnError> {
        let mut command = Command::new(program);
        command
            .arg(log_file)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::inherit());

        let mut child = spawn(command, program)?;
        let stdin = child
            .stdin
            .take()
            .ok_or(SpawnError::MissingPipe("logger stdin"))?;

        Ok(Self {
            child,
            writer: Some(FramedWrite::new(stdin, LineCodec::new())),
        })
    }

    /// OS process id, or `None` once the worker has been waited on.
    pub fn id(&self) -> Option<u32> {
        self.child.id()
    }

    async fn send(&mut self, message: SinkMessage) -> Result<(), TransportError> {
        let writer = self.writer.as_mut().ok_or(TransportError::Shutdown)?;
        writer.send(message).await?;
        Ok(())
    }
}

#[async_trait]
impl LogSink for ProcessLogSink {
    async fn record(&mut self, entry: LogEntry) -> Result<(), TransportError> {
        self.send(SinkMessage::Record(entry)).await
    }

    async fn quit(&mut self) -> Result<(), TransportError> {
        self.send(SinkMessage::Quit).await
    }

    async fn wait(&mut self) -> Result<(), TransportError> {
        drop(self.writer.take());
        wait_child(&mut self.child, "logger").await
    }
}

/// Programs and log file needed to start a session's workers.
#[derive(Debug, Clone)]
pub struct WorkerPrograms {
    pub engine: PathBuf,
    pub logger: PathBuf,
    pub log_file: PathBuf,
}

/// Start both workers, logger first. Either failure is fatal to startup.
pub fn spawn_workers(
    programs: &WorkerPrograms,
) -> Result<(ProcessCipherService, ProcessLogSink), SpawnError> {
    let sink = ProcessLogSink::spawn(&programs.logger, &programs.log_file)?;
    let engine = ProcessCipherService::spawn(&programs.engine)?;
    tracing::info!(
        engine_pid = ?engine.id(),
        logger_pid = ?sink.id(),
        "Workers started"
    );
    Ok((engine, sink))
}
