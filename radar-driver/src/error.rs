use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RadarError {
    /// The serial port could not be opened or prepared.
    #[error("Failed to open the serial port: {0}")]
    ConnectionError(#[from] serialport::Error),
    /// A line that is neither a sample nor the sweep sentinel.
    #[error("Malformed line {0:?}")]
    MalformedLine(String),
    /// The sweep configuration could not be written to the device.
    #[error("Failed to write the sweep configuration: {0}")]
    ConfigWriteError(io::Error),
    #[error("Failed to encode the sweep configuration: {0}")]
    ConfigEncodeError(#[from] serde_json::Error),
    /// A read failed for a reason other than a timeout.
    #[error("Lost the connection to the device: {0}")]
    TransportLost(io::Error),
}

impl RadarError {
    pub fn is_transport_lost(&self) -> bool {
        matches!(self, RadarError::TransportLost(_))
    }
}
