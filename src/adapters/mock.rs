//! Scripted adapter for tests.

use super::Adapter;
use crate::error::{AppResult, DaqError};
use async_trait::async_trait;
use std::sync::{Arc, Mutex};

type Responder = Box<dyn FnMut(&str) -> String + Send>;

/// Adapter that answers every query with a closure and records the traffic.
///
/// The command log is shared, so a test can keep a handle to it after the
/// adapter has been moved into a driver.
pub struct MockAdapter {
    responder: Responder,
    log: Arc<Mutex<Vec<String>>>,
    closed: bool,
}

impl MockAdapter {
    /// Create a mock that replies with `responder(command)`.
    pub fn new<F>(responder: F) -> Self
    where
        F: FnMut(&str) -> String + Send + 'static,
    {
        Self {
            responder: Box::new(responder),
            log: Arc::new(Mutex::new(Vec::new())),
            closed: false,
        }
    }

    /// Handle to the list of every command received so far.
    pub fn command_log(&self) -> Arc<Mutex<Vec<String>>> {
        Arc::clone(&self.log)
    }
}

#[async_trait]
impl Adapter for MockAdapter {
    fn name(&self) -> &str {
        "mock"
    }

    async fn query(&mut self, command: &str) -> AppResult<String> {
        if self.closed {
            return Err(DaqError::SerialPortNotConnected);
        }
        if let Ok(mut log) = self.log.lock() {
            log.push(command.to_string());
        }
        Ok((self.responder)(command))
    }

    async fn close(&mut self) -> AppResult<()> {
        self.closed = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_records_commands_in_order() {
        let mut adapter = MockAdapter::new(|cmd| format!("echo {cmd}"));
        let log = adapter.command_log();

        assert_eq!(adapter.query("A").await.unwrap(), "echo A");
        adapter.query("B").await.unwrap();

        assert_eq!(*log.lock().unwrap(), vec!["A".to_string(), "B".to_string()]);
    }

    #[tokio::test]
    async fn test_closed_mock_refuses_queries() {
        let mut adapter = MockAdapter::new(|_| String::new());
        adapter.close().await.unwrap();
        assert!(adapter.query("*IDN?").await.is_err());
    }
}
