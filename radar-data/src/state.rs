#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Lifecycle of the link to the device.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ConnectionState {
    /// No acquisition thread is running.
    #[default]
    Disconnected,
    /// The transport is being opened or is settling after a device reset.
    Connecting,
    /// The acquisition thread is reading lines.
    Connected,
    /// A stop was requested and the acquisition thread is winding down.
    Disconnecting,
}

impl ConnectionState {
    pub fn is_connected(&self) -> bool {
        *self == ConnectionState::Connected
    }
}
