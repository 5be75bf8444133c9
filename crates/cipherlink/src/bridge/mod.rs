//! Line-protocol bridge between the coordinator and its worker processes.
//!
//! # Architecture
//!
//! - **protocol**: Message types (Request/Response for the engine, SinkMessage for the logger)
//! - **codec**: Newline framing codec for AsyncRead/AsyncWrite

pub mod codec;
pub mod protocol;
