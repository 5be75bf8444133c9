//! Log sink - runs inside the `cipherlink-logger` subprocess.
//!
//! Reads [`SinkMessage`] lines from stdin and appends one timestamped record
//! per entry to the log file, flushing after each record.

use std::path::Path;

use chrono::{Local, NaiveDateTime};
use futures::StreamExt;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio_util::codec::FramedRead;

use crate::bridge::codec::LineCodec;
use crate::bridge::protocol::{LogEntry, SinkMessage};

/// Minute-resolution timestamp used in the log file.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M";

#[derive(Debug, thiserror::Error)]
pub enum LogSinkError {
    #[error("failed to open log file {path}: {source}")]
    Open {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write log record: {0}")]
    Write(#[source] std::io::Error),

    #[error("input channel error: {0}")]
    Input(#[source] std::io::Error),
}

/// Render one record as `YYYY-MM-DD HH:MM [ACTION] message\n`.
pub fn format_record(at: NaiveDateTime, entry: &LogEntry) -> String {
    format!(
        "{} [{}] {}\n",
        at.format(TIMESTAMP_FORMAT),
        entry.action(),
        entry.message()
    )
}

/// Open `path` for appending, creating it if needed.
pub async fn open_log_file(path: &Path) -> Result<tokio::fs::File, LogSinkError> {
    tokio::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await
        .map_err(|source| LogSinkError::Open {
            path: path.display().to_string(),
            source,
        })
}

/// Run the sink loop until QUIT or end of input. Returns the number of records written.
pub async fn run_log_sink<R, W>(reader: R, mut out: W) -> Result<usize, LogSinkError>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut messages = FramedRead::new(reader, LineCodec::<SinkMessage>::new());
    let mut written = 0;

    while let Some(message) = messages.next().await {
        match message.map_err(LogSinkError::Input)? {
            SinkMessage::Record(entry) => {
                let line = format_record(Local::now().naive_local(), &entry);
                out.write_all(line.as_bytes())
                    .await
                    .map_err(LogSinkError::Write)?;
                out.flush().await.map_err(LogSinkError::Write)?;
                written += 1;
            }
            SinkMessage::Quit => {
                tracing::info!(records = written, "Quit requested");
                return Ok(written);
            }
        }
    }

    tracing::info!(records = written, "Input closed, exiting");
    Ok(written)
}
