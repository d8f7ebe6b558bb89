use crate::decoder::{Decoded, FieldCase, WireFormat};
use radar_data::ScanItem;
use std::collections::HashSet;
use tracing::{debug, warn};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AssemblerState {
    /// Inside a sweep, samples are being forwarded.
    Accumulating,
    /// A sweep just ended and no sample of the next one has arrived yet.
    Boundary,
}

/// Decides sweep boundaries for the acquisition loop.
///
/// Samples are passed through; only `END` closes a sweep. An angle that goes
/// backwards without `END` is reported at debug level and otherwise treated
/// as part of the running sweep. Splitting on regression is left to
/// consumers (see `radar_data::SweepCollector`).
#[derive(Debug)]
pub struct SweepAssembler {
    state: AssemblerState,
    samples_in_sweep: usize,
    last_angle: Option<f64>,
    seen_cases: HashSet<FieldCase>,
    mixed_case_reported: bool,
}

impl Default for SweepAssembler {
    fn default() -> Self {
        SweepAssembler::new()
    }
}

impl SweepAssembler {
    pub fn new() -> SweepAssembler {
        SweepAssembler {
            state: AssemblerState::Accumulating,
            samples_in_sweep: 0,
            last_angle: None,
            seen_cases: HashSet::new(),
            mixed_case_reported: false,
        }
    }

    pub fn state(&self) -> AssemblerState {
        self.state
    }

    pub fn samples_in_sweep(&self) -> usize {
        self.samples_in_sweep
    }

    /// Returns the item to forward to consumers, if any. A
    /// [`ScanItem::SweepMarker`] means the caller is at a sweep boundary.
    pub fn push(&mut self, decoded: Decoded) -> Option<ScanItem> {
        match decoded {
            Decoded::Sample(sample, format) => {
                self.note_format(format);
                if let Some(last) = self.last_angle {
                    if sample.angle < last {
                        debug!(last, angle = sample.angle, "angle went backwards without END");
                    }
                }
                self.state = AssemblerState::Accumulating;
                self.samples_in_sweep += 1;
                self.last_angle = Some(sample.angle);
                Some(ScanItem::Sample(sample))
            }
            Decoded::SweepEnd => {
                debug!(samples = self.samples_in_sweep, "sweep complete");
                self.state = AssemblerState::Boundary;
                self.samples_in_sweep = 0;
                self.last_angle = None;
                Some(ScanItem::SweepMarker)
            }
            Decoded::Malformed => None,
        }
    }

    fn note_format(&mut self, format: WireFormat) {
        let WireFormat::Structured(case) = format else {
            return;
        };
        self.seen_cases.insert(case);
        if self.mixed_case_reported {
            return;
        }
        if case == FieldCase::Mixed || self.seen_cases.len() > 1 {
            self.mixed_case_reported = true;
            warn!(cases = ?self.seen_cases, "device mixes field name casing in structured samples");
        }
    }

    pub fn mixed_case_reported(&self) -> bool {
        self.mixed_case_reported
    }
}
