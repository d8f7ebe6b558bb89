//! Conduit from the acquisition thread to consumers.
//!
//! The queue is unbounded on purpose: acquisition must never stall behind a
//! slow renderer, so a consumer that stops draining makes the queue grow
//! instead. [`ScanReceiver::depth`] exposes the backlog so consumers can
//! notice.

use crossbeam_channel::{unbounded, Receiver, Sender};
use radar_data::ScanItem;

pub fn scan_channel() -> (ScanSender, ScanReceiver) {
    let (tx, rx) = unbounded();
    (ScanSender { tx }, ScanReceiver { rx })
}

#[derive(Clone, Debug)]
pub struct ScanSender {
    tx: Sender<ScanItem>,
}

impl ScanSender {
    /// Returns `false` when every receiver is gone.
    pub fn send(&self, item: ScanItem) -> bool {
        self.tx.send(item).is_ok()
    }
}

/// Consumer end. Clones share one queue, so each item goes to exactly one
/// of them.
#[derive(Clone, Debug)]
pub struct ScanReceiver {
    rx: Receiver<ScanItem>,
}

impl ScanReceiver {
    /// Drains the items queued at the time of the call, in emission order.
    /// Never blocks; returns an empty vector when nothing is pending.
    pub fn poll_all(&self) -> Vec<ScanItem> {
        let n = self.rx.len();
        self.rx.try_iter().take(n).collect()
    }

    pub fn try_next(&self) -> Option<ScanItem> {
        self.rx.try_recv().ok()
    }

    /// Items waiting to be drained.
    pub fn depth(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }
}
