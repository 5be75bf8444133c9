//! `cipherlink` - interactive coordinator.
//!
//! Starts the logger and engine workers, then runs the command menu on
//! stdin/stdout until the user quits.

mod console;

use std::path::PathBuf;
use std::process;

use anyhow::Context;
use clap::Parser;
use tokio_util::codec::{FramedRead, LinesCodec};

use cipherlink_core::config::{ENGINE_ENV, LOGGER_ENV};
use cipherlink_core::logging::init_tracing;
use cipherlink_core::{Session, SessionConfig, spawn_workers};

use console::Console;

#[derive(Debug, Parser)]
#[command(
    name = "cipherlink",
    version,
    about = "Encrypt and decrypt strings through a logged engine"
)]
struct Cli {
    /// File the logger appends session records to.
    log_file: PathBuf,

    /// Engine program to run [default: cipherlink-engine next to this binary]
    #[arg(long, env = ENGINE_ENV)]
    engine: Option<PathBuf>,

    /// Logger program to run [default: cipherlink-logger next to this binary]
    #[arg(long, env = LOGGER_ENV)]
    logger: Option<PathBuf>,
}

impl Cli {
    fn into_config(self) -> SessionConfig {
        let mut config = SessionConfig::new(self.log_file);
        if let Some(engine) = self.engine {
            config = config.with_engine_program(engine);
        }
        if let Some(logger) = self.logger {
            config = config.with_logger_program(logger);
        }
        config
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    init_tracing();
    let config = Cli::parse().into_config();
    tracing::info!("cipherlink {}", env!("CARGO_PKG_VERSION"));

    if let Err(e) = run(config).await {
        eprintln!("error: {e:#}");
        process::exit(1);
    }
}

async fn run(config: SessionConfig) -> anyhow::Result<()> {
    tracing::debug!(?config, "Starting workers");
    let (engine, sink) =
        spawn_workers(&config.programs()).context("failed to start worker programs")?;

    let mut session = Session::start(engine, sink).await;
    let input = FramedRead::new(tokio::io::stdin(), LinesCodec::new());
    let mut console = Console::new(input, std::io::stdout());
    console.run(&mut session).await
}
