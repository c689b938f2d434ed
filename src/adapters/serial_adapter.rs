use super::{strip_reply, Adapter, WRITE_TERMINATION};
use crate::config::InstrumentSettings;
use crate::error::{AppResult, DaqError};
use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

#[cfg(feature = "instrument_serial")]
use serialport::SerialPort;
#[cfg(feature = "instrument_serial")]
use std::sync::Arc;
#[cfg(feature = "instrument_serial")]
use tokio::sync::Mutex;

/// Serial adapter for the Arduino's virtual COM port
///
/// This adapter wraps the serialport crate and provides async I/O
/// using Tokio's blocking task executor for synchronous serial operations.
pub struct SerialAdapter {
    /// Port name (e.g., "/dev/ttyACM0", "COM3")
    port_name: String,

    /// Baud rate (e.g., 9600, 115200)
    baud_rate: u32,

    /// Overall time allowed for one reply line
    timeout: Duration,

    /// The actual serial port (behind Arc<Mutex> for async access)
    #[cfg(feature = "instrument_serial")]
    port: Option<Arc<Mutex<Box<dyn SerialPort>>>>,
}

impl SerialAdapter {
    /// Create an unconnected serial adapter.
    ///
    /// # Arguments
    /// * `port_name` - Serial port path (e.g., "/dev/ttyACM0", "COM3")
    /// * `baud_rate` - Communication speed (e.g., 9600, 115200)
    pub fn new(port_name: impl Into<String>, baud_rate: u32) -> Self {
        Self {
            port_name: port_name.into(),
            baud_rate,
            timeout: Duration::from_millis(InstrumentSettings::default().timeout_ms),
            #[cfg(feature = "instrument_serial")]
            port: None,
        }
    }

    /// Set the overall reply timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Create and connect an adapter from instrument settings.
    pub fn open(settings: &InstrumentSettings) -> AppResult<Self> {
        let mut adapter =
            Self::new(settings.port.clone(), settings.baud_rate).with_timeout(settings.timeout());
        adapter.connect()?;
        Ok(adapter)
    }

    /// Port name this adapter was created for.
    pub fn port_name(&self) -> &str {
        &self.port_name
    }

    /// Whether the port is currently open.
    pub fn is_connected(&self) -> bool {
        #[cfg(feature = "instrument_serial")]
        {
            self.port.is_some()
        }

        #[cfg(not(feature = "instrument_serial"))]
        {
            false
        }
    }

    /// Open the serial port.
    pub fn connect(&mut self) -> AppResult<()> {
        #[cfg(feature = "instrument_serial")]
        {
            let port = serialport::new(&self.port_name, self.baud_rate)
                .timeout(Duration::from_millis(100)) // Internal read timeout
                .open()
                .map_err(|e| {
                    DaqError::Connection(format!(
                        "Failed to open serial port '{}' at {} baud: {}",
                        self.port_name, self.baud_rate, e
                    ))
                })?;

            self.port = Some(Arc::new(Mutex::new(port)));

            debug!(
                "Serial port '{}' opened at {} baud",
                self.port_name, self.baud_rate
            );
            Ok(())
        }

        #[cfg(not(feature = "instrument_serial"))]
        {
            Err(DaqError::FeatureNotEnabled("instrument_serial".to_string()))
        }
    }
}

#[async_trait]
impl Adapter for SerialAdapter {
    fn name(&self) -> &str {
        &self.port_name
    }

    async fn query(&mut self, command: &str) -> AppResult<String> {
        #[cfg(feature = "instrument_serial")]
        {
            let port = self
                .port
                .as_ref()
                .ok_or(DaqError::SerialPortNotConnected)?
                .clone();

            let command_str = format!("{}{}", command, WRITE_TERMINATION);
            let command_for_log = command.to_string();
            let port_name = self.port_name.clone();
            let timeout = self.timeout;

            // Execute blocking serial I/O on dedicated thread
            tokio::task::spawn_blocking(move || -> AppResult<String> {
                use std::io::{Read, Write};

                let mut port_guard = port.blocking_lock();

                port_guard.write_all(command_str.as_bytes()).map_err(|e| {
                    DaqError::Connection(format!("Failed to write to '{}': {}", port_name, e))
                })?;
                port_guard.flush().map_err(|e| {
                    DaqError::Connection(format!("Failed to flush '{}': {}", port_name, e))
                })?;

                debug!("Sent serial command: {}", command_for_log);

                // Read byte-by-byte until the line delimiter
                let mut response: Vec<u8> = Vec::new();
                let mut buffer = [0u8; 1];
                let start = std::time::Instant::now();

                loop {
                    if start.elapsed() > timeout {
                        return Err(DaqError::Connection(format!(
                            "No reply to '{}' from '{}' within {:?}",
                            command_for_log, port_name, timeout
                        )));
                    }

                    match port_guard.read(&mut buffer) {
                        Ok(0) => {
                            return Err(DaqError::Connection(format!(
                                "Unexpected EOF from '{}'",
                                port_name
                            )));
                        }
                        Ok(_) => {
                            response.push(buffer[0]);
                            if buffer[0] == b'\n' {
                                break;
                            }
                        }
                        Err(e) if e.kind() == std::io::ErrorKind::TimedOut => {
                            // Port timeout is shorter than our overall timeout
                            continue;
                        }
                        Err(e) => {
                            return Err(DaqError::Connection(format!(
                                "Serial read error on '{}': {}",
                                port_name, e
                            )));
                        }
                    }
                }

                let response = strip_reply(&String::from_utf8_lossy(&response));
                debug!("Received serial response: {}", response);
                Ok(response)
            })
            .await
            .map_err(|e| DaqError::TaskFailed(format!("Serial I/O task panicked: {}", e)))?
        }

        #[cfg(not(feature = "instrument_serial"))]
        {
            let _ = command;
            Err(DaqError::FeatureNotEnabled("instrument_serial".to_string()))
        }
    }

    async fn close(&mut self) -> AppResult<()> {
        #[cfg(feature = "instrument_serial")]
        {
            if self.port.take().is_some() {
                debug!("Serial port '{}' closed", self.port_name);
            } else {
                debug!("Serial port '{}' already closed", self.port_name);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serial_adapter_creation() {
        let adapter = SerialAdapter::new("/dev/ttyACM0", 9600);
        assert_eq!(adapter.port_name(), "/dev/ttyACM0");
        assert_eq!(adapter.baud_rate, 9600);
        assert_eq!(adapter.timeout, Duration::from_millis(2000));
        assert!(!adapter.is_connected());
    }

    #[tokio::test]
    async fn test_query_without_connection_fails() {
        let mut adapter = SerialAdapter::new("COM3", 115200);
        let err = adapter.query("*IDN?").await.unwrap_err();
        assert!(matches!(
            err,
            DaqError::SerialPortNotConnected | DaqError::FeatureNotEnabled(_)
        ));
    }

    #[tokio::test]
    async fn test_close_twice_is_harmless() {
        let mut adapter = SerialAdapter::new("COM3", 9600);
        assert!(adapter.close().await.is_ok());
        assert!(adapter.close().await.is_ok());
    }

    #[test]
    fn test_open_missing_port_is_connection_error() {
        let settings = InstrumentSettings {
            port: "/dev/pv_daq_no_such_port".to_string(),
            ..InstrumentSettings::default()
        };
        match SerialAdapter::open(&settings) {
            Err(err) => assert!(
                err.is_connection() || matches!(err, DaqError::FeatureNotEnabled(_))
            ),
            Ok(_) => panic!("opening a non-existent port succeeded"),
        }
    }
}
