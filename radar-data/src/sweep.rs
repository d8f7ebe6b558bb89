use crate::sample::{Sample, ScanItem};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Struct to hold one sweep of samples, in the order they were decoded.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Sweep {
    pub samples: Vec<Sample>,
}

impl Sweep {
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Angles in degrees.
    pub fn angles(&self) -> impl Iterator<Item = f64> + '_ {
        self.samples.iter().map(|s| s.angle)
    }

    pub fn distances(&self) -> impl Iterator<Item = f64> + '_ {
        self.samples.iter().map(|s| s.distance)
    }

    fn last_angle(&self) -> Option<f64> {
        self.samples.last().map(|s| s.angle)
    }
}

/// Folds drained [`ScanItem`]s back into whole sweeps on the consumer side.
///
/// By default a sweep closes only on a [`ScanItem::SweepMarker`]. With
/// [`SweepCollector::split_on_regression`] a sample whose angle is smaller
/// than the previous one also closes the running sweep, which suits devices
/// that restart a sweep without reporting `END`.
///
/// Empty sweeps (two markers in a row) are never reported.
#[derive(Clone, Debug, Default)]
pub struct SweepCollector {
    current: Sweep,
    split_on_regression: bool,
}

impl SweepCollector {
    pub fn new() -> SweepCollector {
        SweepCollector::default()
    }

    pub fn split_on_regression(mut self, enabled: bool) -> SweepCollector {
        self.split_on_regression = enabled;
        self
    }

    /// Samples of the sweep that is still open.
    pub fn pending(&self) -> &Sweep {
        &self.current
    }

    pub fn push(&mut self, item: ScanItem) -> Option<Sweep> {
        match item {
            ScanItem::Sample(sample) => {
                let regressed = self
                    .current
                    .last_angle()
                    .is_some_and(|last| sample.angle < last);
                if self.split_on_regression && regressed {
                    let finished = std::mem::take(&mut self.current);
                    self.current.samples.push(sample);
                    return Some(finished);
                }
                self.current.samples.push(sample);
                None
            }
            ScanItem::SweepMarker => {
                if self.current.is_empty() {
                    return None;
                }
                Some(std::mem::take(&mut self.current))
            }
        }
    }

    pub fn extend<I>(&mut self, items: I) -> Vec<Sweep>
    where
        I: IntoIterator<Item = ScanItem>,
    {
        items.into_iter().filter_map(|item| self.push(item)).collect()
    }

    /// Drops the open sweep, e.g. after the link was lost mid-sweep.
    pub fn reset(&mut self) {
        self.current = Sweep::default();
    }
}
