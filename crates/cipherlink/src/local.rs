//! In-process implementations of [`CipherService`] and [`LogSink`].
//!
//! These run the engine state machine directly and keep log entries in memory,
//! so the session can be driven without spawning processes.

use std::io;

use async_trait::async_trait;

use crate::bridge::protocol::{LogEntry, Request, Response};
use crate::engine::Engine;
use crate::orchestrator::{CipherService, LogSink, TransportError};

fn broken_pipe() -> TransportError {
    TransportError::Io(io::Error::new(io::ErrorKind::BrokenPipe, "worker is gone"))
}

/// Cipher service backed by an in-process [`Engine`].
#[derive(Debug, Default)]
pub struct LocalCipherService {
    engine: Engine,
    requests: Vec<Request>,
    quit_received: bool,
    terminated: bool,
    disconnected: bool,
}

impl LocalCipherService {
    pub fn new() -> Self {
        Self::default()
    }

    /// A service whose worker has already died: every call fails.
    pub fn disconnected() -> Self {
        Self {
            disconnected: true,
            ..Self::default()
        }
    }

    /// Simulate the worker dying mid-session.
    pub fn disconnect(&mut self) {
        self.disconnected = true;
    }

    /// Every request that reached the engine, QUIT included.
    pub fn requests(&self) -> &[Request] {
        &self.requests
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    pub fn quit_received(&self) -> bool {
        self.quit_received
    }

    pub fn is_terminated(&self) -> bool {
        self.terminated
    }

    fn deliver(&mut self, request: Request) -> Result<Option<Response>, TransportError> {
        if self.disconnected || self.quit_received {
            return Err(broken_pipe());
        }
        self.requests.push(request.clone());
        let response = self.engine.handle(request);
        if response.is_none() {
            self.quit_received = true;
        }
        Ok(response)
    }
}

#[async_trait]
impl CipherService for LocalCipherService {
    async fn request(&mut self, request: Request) -> Result<Response, TransportError> {
        match self.deliver(request)? {
            Some(response) => Ok(response),
            // The engine stopped reading; its output is closed.
            None => Err(TransportError::Closed),
        }
    }

    async fn quit(&mut self) -> Result<(), TransportError> {
        self.deliver(Request::Quit).map(|_| ())
    }

    async fn wait(&mut self) -> Result<(), TransportError> {
        self.terminated = true;
        Ok(())
    }
}

/// Log sink that keeps entries in memory.
#[derive(Debug, Default)]
pub struct MemoryLogSink {
    entries: Vec<LogEntry>,
    quit_received: bool,
    terminated: bool,
    disconnected: bool,
}

impl MemoryLogSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// A sink whose process has already exited: every write fails.
    pub fn disconnected() -> Self {
        Self {
            disconnected: true,
            ..Self::default()
        }
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    /// Entries as `(action, message)` pairs.
    pub fn pairs(&self) -> Vec<(&str, &str)> {
        self.entries
            .iter()
            .map(|e| (e.action(), e.message()))
            .collect()
    }

    pub fn quit_received(&self) -> bool {
        self.quit_received
    }

    pub fn is_terminated(&self) -> bool {
        self.terminated
    }
}

#[async_trait]
impl LogSink for MemoryLogSink {
    async fn record(&mut self, entry: LogEntry) -> Result<(), TransportError> {
        // A real sink stops reading at QUIT; later writes go nowhere.
        if self.disconnected || self.quit_received {
            return Err(broken_pipe());
        }
        self.entries.push(entry);
        Ok(())
    }

    async fn quit(&mut self) -> Result<(), TransportError> {
        if self.disconnected {
            return Err(broken_pipe());
        }
        self.quit_received = true;
        Ok(())
    }

    async fn wait(&mut self) -> Result<(), TransportError> {
        self.terminated = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn local_service_runs_the_engine() {
        let mut service = LocalCipherService::new();
        let reply = service
            .request(Request::Pass("KEY".to_string()))
            .await
            .unwrap();
        assert_eq!(reply, Response::ok(""));
        assert!(service.engine().is_keyed());
        assert_eq!(service.requests().len(), 1);
    }

    #[tokio::test]
    async fn local_service_stops_after_quit() {
        let mut service = LocalCipherService::new();
        service.quit().await.unwrap();
        assert!(service.quit_received());
        assert!(matches!(
            service.request(Request::Encrypt("A".to_string())).await,
            Err(TransportError::Io(_))
        ));
        service.wait().await.unwrap();
        assert!(service.is_terminated());
    }

    #[tokio::test]
    async fn disconnected_service_fails_identically() {
        let mut service = LocalCipherService::disconnected();
        for _ in 0..3 {
            let err = service
                .request(Request::Encrypt("A".to_string()))
                .await
                .unwrap_err();
            assert_eq!(err.to_string(), "worker is gone");
        }
        assert!(service.requests().is_empty());
    }

    #[tokio::test]
    async fn memory_sink_records_until_quit() {
        let mut sink = MemoryLogSink::new();
        sink.record(LogEntry::new("start", "hello")).await.unwrap();
        sink.quit().await.unwrap();
        assert!(sink.record(LogEntry::new("exit", "late")).await.is_err());
        assert_eq!(sink.pairs(), vec![("START", "hello")]);
    }
}
