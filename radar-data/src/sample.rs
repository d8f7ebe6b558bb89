#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// One range reading reported by the device.
#[derive(Clone, Copy, Debug, PartialEq, PartialOrd)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Sample {
    /// Beam angle in degrees, as reported.
    pub angle: f64,
    /// Distance to an object, in whatever unit the device reports.
    pub distance: f64,
}

impl Sample {
    pub fn new(angle: f64, distance: f64) -> Sample {
        Sample { angle, distance }
    }
}

/// Item carried from the acquisition thread to consumers.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ScanItem {
    /// A decoded reading belonging to the current sweep.
    Sample(Sample),
    /// The device signalled the end of the current sweep.
    SweepMarker,
}

impl ScanItem {
    pub fn sample(&self) -> Option<&Sample> {
        match self {
            ScanItem::Sample(s) => Some(s),
            ScanItem::SweepMarker => None,
        }
    }

    pub fn is_marker(&self) -> bool {
        matches!(self, ScanItem::SweepMarker)
    }
}

impl From<Sample> for ScanItem {
    fn from(sample: Sample) -> Self {
        ScanItem::Sample(sample)
    }
}
