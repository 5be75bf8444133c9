//! `cipherlink-logger` - append-only log sink worker.
//!
//! Reads `ACTION message` lines on stdin and appends timestamped records to
//! the log file until QUIT or end of input.

use std::path::PathBuf;
use std::process;

use clap::Parser;

use cipherlink_core::log_sink::open_log_file;
use cipherlink_core::logging::init_tracing;
use cipherlink_core::run_log_sink;

#[derive(Debug, Parser)]
#[command(
    name = "cipherlink-logger",
    version,
    about = "Append session records to a log file"
)]
struct Cli {
    /// File to append records to. Created if missing.
    log_file: PathBuf,
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    init_tracing();
    let cli = Cli::parse();

    let file = match open_log_file(&cli.log_file).await {
        Ok(file) => file,
        Err(e) => {
            eprintln!("error: {e}");
            process::exit(1);
        }
    };

    match run_log_sink(tokio::io::stdin(), file).await {
        Ok(records) => tracing::debug!(records, "Logger exiting"),
        Err(e) => {
            eprintln!("error: {e}");
            process::exit(1);
        }
    }
}
