#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Widest sweep the device can be asked for, in degrees.
pub const MAX_SWEEP_ANGLE: u32 = 270;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ScanConfigError {
    #[error("Resolution must be at least 1 sample per sweep.")]
    ResolutionTooSmall,
    #[error("Sweep angle must be between 0 and 270 degrees. Actually {0}.")]
    AngleOutOfRange(u32),
}

/// Sweep parameters sent to the device at sweep boundaries.
///
/// A `ScanConfig` is immutable. Changing the configuration means building a
/// new value and requesting it; the active one is replaced, never mutated.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ScanConfig {
    resolution: u32,
    angle: u32,
}

impl ScanConfig {
    pub fn new(resolution: u32, angle: u32) -> Result<ScanConfig, ScanConfigError> {
        if resolution < 1 {
            return Err(ScanConfigError::ResolutionTooSmall);
        }
        if angle > MAX_SWEEP_ANGLE {
            return Err(ScanConfigError::AngleOutOfRange(angle));
        }
        Ok(ScanConfig { resolution, angle })
    }

    /// Number of samples per sweep.
    pub fn resolution(&self) -> u32 {
        self.resolution
    }

    /// Sweep span in degrees.
    pub fn angle(&self) -> u32 {
        self.angle
    }
}

impl Default for ScanConfig {
    fn default() -> Self {
        ScanConfig {
            resolution: 180,
            angle: 180,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_validates_bounds() {
        assert!(ScanConfig::new(1, 0).is_ok());
        assert!(ScanConfig::new(400, 270).is_ok());
        assert_eq!(
            ScanConfig::new(0, 90),
            Err(ScanConfigError::ResolutionTooSmall)
        );
        assert_eq!(
            ScanConfig::new(100, 271),
            Err(ScanConfigError::AngleOutOfRange(271))
        );
    }

    #[test]
    fn test_default() {
        let config = ScanConfig::default();
        assert_eq!(config.resolution(), 180);
        assert_eq!(config.angle(), 180);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_serde_shape() {
        let config = ScanConfig::new(200, 90).unwrap();
        let json = serde_json::to_string(&config).unwrap();
        assert_eq!(json, r#"{"resolution":200,"angle":90}"#);
    }
}
