//! Notifications published to the presentation layer.

use serde::Serialize;
use tokio::sync::mpsc;

use swatchscan_core::{ColorEntry, ScanContext};

/// One-way message to the presentation layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Notification {
    ScanProgress {
        scanned: u64,
        total: u64,
    },
    ScanComplete {
        colors: Vec<ColorEntry>,
        context: ScanContext,
    },
    ScanError {
        message: String,
    },
    /// The tracked scope moved, including back to no scope.
    ScopeChanged {
        context: ScanContext,
    },
    /// Advisory text for the user.
    Notice {
        message: String,
    },
}

impl Notification {
    pub fn is_scan_complete(&self) -> bool {
        matches!(self, Notification::ScanComplete { .. })
    }
}

/// Sink for notifications. Publishing never blocks.
pub trait Publisher {
    fn publish(&mut self, notification: Notification);
}

impl Publisher for Vec<Notification> {
    fn publish(&mut self, notification: Notification) {
        self.push(notification);
    }
}

impl Publisher for mpsc::UnboundedSender<Notification> {
    fn publish(&mut self, notification: Notification) {
        // A closed receiver means nobody is listening any more.
        let _ = self.send(notification);
    }
}
