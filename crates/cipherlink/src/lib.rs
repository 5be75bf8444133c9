//! cipherlink: a session coordinator for a Vigenère engine and a log sink,
//! both running as subprocesses behind line-oriented pipe protocols.

pub mod bridge;
pub mod cipher;
pub mod config;
pub mod engine;
pub mod local;
pub mod log_sink;
pub mod logging;
pub mod orchestrator;
pub mod session;

pub use config::SessionConfig;
pub use engine::{Engine, KeyState, run_engine};
pub use local::{LocalCipherService, MemoryLogSink};
pub use log_sink::{LogSinkError, run_log_sink};
pub use orchestrator::{
    CipherService, LogSink, ProcessCipherService, ProcessLogSink, SpawnError, TransportError,
    spawn_workers,
};
pub use session::{Command, History, Input, Session, SessionError, SessionId};
