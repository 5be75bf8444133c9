//! `cipherlink-engine` - Vigenère engine worker.
//!
//! Reads one request per line on stdin and answers on stdout until QUIT or
//! end of input. Diagnostics go to stderr.

use std::process;

use cipherlink_core::logging::init_tracing;
use cipherlink_core::run_engine;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    init_tracing();

    if let Err(e) = run_engine(tokio::io::stdin(), tokio::io::stdout()).await {
        tracing::error!(error = %e, "Engine stopped on I/O failure");
        process::exit(1);
    }
}
