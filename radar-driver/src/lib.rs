//! Driver for a sweeping rangefinder that reports one reading per text line
//! over a serial link.
//!
//! A [`RadarClient`] owns one acquisition thread per connection. The thread
//! decodes lines into [`Sample`]s, closes a sweep on every `END` line, and at
//! that boundary writes the sweep configuration back to the device. Decoded
//! items queue up in an unbounded channel that a consumer (a renderer, a
//! recorder) drains with [`RadarClient::poll_all`] on its own schedule.
//!
//! ```no_run
//! use radar_driver::{RadarClient, ClientOptions, DEFAULT_BAUD_RATE, DEFAULT_READ_TIMEOUT};
//!
//! let mut client = RadarClient::new(ClientOptions::default());
//! client.connect("/dev/ttyACM0", DEFAULT_BAUD_RATE, DEFAULT_READ_TIMEOUT)?;
//! for item in client.poll_all() {
//!     println!("{item:?}");
//! }
//! client.disconnect();
//! # Ok::<(), radar_driver::RadarError>(())
//! ```

mod acquisition;
mod assembler;
mod channel;
mod constants;
mod decoder;
mod error;
mod handoff;
mod line;
mod options;
mod time;
mod transport;

use crate::acquisition::{spawn, AcquisitionThread, Session};
use crate::constants::DEFAULT_READ_TIMEOUT_MS;
use crate::transport::{flush_input, open_port};
use serialport::SerialPort;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tracing::{debug, error, info, warn};

pub use crate::assembler::{AssemblerState, SweepAssembler};
pub use crate::channel::{scan_channel, ScanReceiver, ScanSender};
pub use crate::constants::DEFAULT_BAUD_RATE;
pub use crate::decoder::{decode, Decoded, FieldCase, WireFormat};
pub use crate::error::RadarError;
pub use crate::handoff::{encode_config, ConfigHandoff};
pub use crate::options::ClientOptions;
pub use crate::transport::Transport;
pub use radar_data::{ConnectionState, Sample, ScanConfig, ScanItem, Sweep, SweepCollector};

pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_millis(DEFAULT_READ_TIMEOUT_MS);

/// Connection to one device.
///
/// Every method is meant to be called from the consumer's thread. Only the
/// acquisition thread touches the transport. Dropping the client disconnects.
pub struct RadarClient {
    options: ClientOptions,
    handoff: ConfigHandoff,
    scan_tx: ScanSender,
    scan_rx: ScanReceiver,
    acquisition: Option<AcquisitionThread>,
    last_error: Mutex<Option<RadarError>>,
}

impl Default for RadarClient {
    fn default() -> Self {
        RadarClient::new(ClientOptions::default())
    }
}

impl RadarClient {
    pub fn new(options: ClientOptions) -> RadarClient {
        let (scan_tx, scan_rx) = scan_channel();
        RadarClient {
            handoff: ConfigHandoff::new(options.initial_config),
            options,
            scan_tx,
            scan_rx,
            acquisition: None,
            last_error: Mutex::new(None),
        }
    }

    /// Opens `port_name` and starts acquisition.
    ///
    /// Waits [`ClientOptions::settle_delay`] after opening so the reset banner
    /// of the device is not decoded, then drops whatever arrived meanwhile.
    /// Does nothing when a session is already running. A failure is returned
    /// and also kept for [`RadarClient::take_last_error`].
    ///
    /// # Arguments
    ///
    /// * `port_name` - Serial port name such as `/dev/ttyACM0`.
    /// * `baud_rate` - Line speed, usually [`DEFAULT_BAUD_RATE`].
    /// * `timeout` - Read timeout; also bounds how quickly `disconnect` is
    ///   noticed.
    pub fn connect(
        &mut self,
        port_name: &str,
        baud_rate: u32,
        timeout: Duration,
    ) -> Result<(), RadarError> {
        if self.is_active() {
            debug!(port = port_name, "already connected");
            return Ok(());
        }
        self.reap();
        info!(port = port_name, baud_rate, "connecting");

        match self.open_settled(port_name, baud_rate, timeout) {
            Ok(port) => {
                self.start(Box::new(port), port_name);
                Ok(())
            }
            Err(e) => {
                error!(port = port_name, "{e}");
                *self.lock_error() = Some(RadarError::ConnectionError(e.clone()));
                Err(RadarError::ConnectionError(e))
            }
        }
    }

    fn open_settled(
        &self,
        port_name: &str,
        baud_rate: u32,
        timeout: Duration,
    ) -> serialport::Result<Box<dyn SerialPort>> {
        let mut port = open_port(port_name, baud_rate, timeout)?;
        info!(
            port = port_name,
            settle_ms = self.options.settle_delay.as_millis() as u64,
            "opened port, waiting for the device to settle"
        );
        std::thread::sleep(self.options.settle_delay);
        flush_input(&mut port)?;
        Ok(port)
    }

    /// Starts acquisition over an already open transport, without settle
    /// delay. Does nothing when a session is already running.
    pub fn attach<T: Transport + 'static>(&mut self, transport: T, label: &str) {
        if self.is_active() {
            debug!(label, "already connected");
            return;
        }
        self.reap();
        self.start(Box::new(transport), label);
    }

    fn start(&mut self, transport: Box<dyn Transport>, label: &str) {
        self.acquisition = Some(spawn(Session {
            transport,
            label: label.to_string(),
            handoff: self.handoff.clone(),
            scan_tx: self.scan_tx.clone(),
            max_line_bytes: self.options.max_line_bytes,
        }));
        info!(port = label, "acquisition started");
    }

    /// Stops acquisition and releases the transport. Items already queued
    /// stay available to [`RadarClient::poll_all`]. Does nothing when not
    /// connected.
    pub fn disconnect(&mut self) {
        let Some(mut acquisition) = self.acquisition.take() else {
            return;
        };
        if acquisition.stop(self.options.disconnect_grace) {
            info!("disconnected");
        } else {
            warn!(
                grace_ms = self.options.disconnect_grace.as_millis() as u64,
                "acquisition thread did not stop in time, detaching it"
            );
        }
        self.keep_error(&acquisition);
    }

    /// Joins a session that ended by itself, e.g. after a transport loss.
    fn reap(&mut self) {
        if let Some(mut acquisition) = self.acquisition.take() {
            acquisition.stop(self.options.disconnect_grace);
            self.keep_error(&acquisition);
        }
    }

    fn keep_error(&self, acquisition: &AcquisitionThread) {
        if let Some(e) = acquisition.take_error() {
            *self.lock_error() = Some(e);
        }
    }

    fn lock_error(&self) -> MutexGuard<'_, Option<RadarError>> {
        self.last_error.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_active(&self) -> bool {
        self.acquisition
            .as_ref()
            .is_some_and(|acquisition| acquisition.is_running())
    }

    pub fn is_connected(&self) -> bool {
        self.state().is_connected()
    }

    pub fn state(&self) -> ConnectionState {
        self.acquisition
            .as_ref()
            .map_or(ConnectionState::Disconnected, |acquisition| acquisition.state())
    }

    /// Drains every item queued so far, oldest first. Never blocks.
    pub fn poll_all(&self) -> Vec<ScanItem> {
        self.scan_rx.poll_all()
    }

    /// Another handle on the consumption queue, for a consumer living on a
    /// different thread.
    pub fn receiver(&self) -> ScanReceiver {
        self.scan_rx.clone()
    }

    /// Number of items waiting to be drained.
    pub fn queue_depth(&self) -> usize {
        self.scan_rx.depth()
    }

    /// Queues `config` for the next sweep boundary. A later request made
    /// before that boundary replaces this one.
    pub fn request_config(&self, config: ScanConfig) {
        self.handoff.request(config);
    }

    /// Handle for requesting configs from other threads.
    pub fn config_handoff(&self) -> ConfigHandoff {
        self.handoff.clone()
    }

    pub fn pending_config(&self) -> Option<ScanConfig> {
        self.handoff.pending()
    }

    pub fn applied_config(&self) -> ScanConfig {
        self.handoff.applied()
    }

    /// Error of the last failed connect attempt, or the one that ended the
    /// last session when it did not end on request.
    pub fn take_last_error(&self) -> Option<RadarError> {
        if let Some(e) = self.acquisition.as_ref().and_then(|a| a.take_error()) {
            return Some(e);
        }
        self.lock_error().take()
    }
}

impl Drop for RadarClient {
    fn drop(&mut self) {
        self.disconnect();
    }
}
