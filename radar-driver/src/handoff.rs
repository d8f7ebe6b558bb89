//! Hand-off of sweep configuration from any thread to the acquisition loop.
//!
//! Requests land in a single slot. A newer request overwrites an older one
//! that has not been sent yet. At every sweep boundary the acquisition loop
//! takes the slot (or, when empty, the last applied config) and writes it to
//! the device, so the device hears a config at every boundary and never in
//! the middle of a sweep.

use crate::error::RadarError;
use crate::transport::send_line;
use radar_data::ScanConfig;
use serde::Serialize;
use std::io::Write;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::debug;

#[derive(Debug)]
struct Slots {
    pending: Option<ScanConfig>,
    applied: ScanConfig,
}

/// Shared handle to the pending/applied configuration pair. Cloning yields
/// another handle to the same slots.
#[derive(Clone, Debug)]
pub struct ConfigHandoff {
    slots: Arc<Mutex<Slots>>,
}

/// Host-to-device command line.
#[derive(Serialize)]
struct ConfigCommand {
    #[serde(rename = "Angle")]
    angle: u32,
    #[serde(rename = "Resolution")]
    resolution: u32,
}

impl ConfigHandoff {
    pub fn new(initial: ScanConfig) -> ConfigHandoff {
        ConfigHandoff {
            slots: Arc::new(Mutex::new(Slots {
                pending: None,
                applied: initial,
            })),
        }
    }

    /// Queues `config` for the next sweep boundary, replacing any request
    /// that has not been sent yet.
    pub fn request(&self, config: ScanConfig) {
        let replaced = self.lock().pending.replace(config);
        if let Some(previous) = replaced {
            debug!(?previous, ?config, "replaced pending sweep config");
        }
    }

    pub fn pending(&self) -> Option<ScanConfig> {
        self.lock().pending
    }

    /// Config most recently written to the device, or the initial one.
    pub fn applied(&self) -> ScanConfig {
        self.lock().applied
    }

    /// Writes the effective config to `writer`.
    ///
    /// The pending slot is cleared before the write, whatever its outcome. The
    /// applied config is only updated when the write succeeds.
    pub(crate) fn flush<W: Write + ?Sized>(
        &self,
        writer: &mut W,
    ) -> Result<ScanConfig, RadarError> {
        let config = self.take_effective();
        let line = encode_config(&config)?;
        send_line(writer, &line).map_err(RadarError::ConfigWriteError)?;
        self.lock().applied = config;
        Ok(config)
    }

    fn take_effective(&self) -> ScanConfig {
        let mut slots = self.lock();
        let applied = slots.applied;
        slots.pending.take().unwrap_or(applied)
    }

    fn lock(&self) -> MutexGuard<'_, Slots> {
        // Slots holds plain values; a panic elsewhere cannot leave them torn.
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Encodes `config` as the device expects it, without line terminator.
pub fn encode_config(config: &ScanConfig) -> Result<String, RadarError> {
    let command = ConfigCommand {
        angle: config.angle(),
        resolution: config.resolution(),
    };
    Ok(serde_json::to_string(&command)?)
}
