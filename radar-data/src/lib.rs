pub mod config;
pub mod sample;
pub mod state;
pub mod sweep;

pub use config::{ScanConfig, ScanConfigError, MAX_SWEEP_ANGLE};
pub use sample::{Sample, ScanItem};
pub use state::ConnectionState;
pub use sweep::{Sweep, SweepCollector};
