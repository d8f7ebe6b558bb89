/// Line the device prints after the last sample of a sweep.
pub(crate) const SWEEP_END_SENTINEL: &str = "END";
pub const DEFAULT_BAUD_RATE: u32 = 115_200;
pub(crate) const DEFAULT_READ_TIMEOUT_MS: u64 = 1000;
// The board resets when the port is opened and prints a boot banner.
pub(crate) const SETTLE_DELAY_MS: u64 = 2000;
pub(crate) const DISCONNECT_GRACE_MS: u64 = 1000;
pub(crate) const MAX_LINE_BYTES: usize = 4096;
pub(crate) const READ_CHUNK_SIZE: usize = 256;
