//! Progress reporting for long-running pipeline runs.
//!
//! The pipeline emits one [`ProgressEvent`] per processed item to an observer
//! the caller supplies. This channel is the only coupling to any interactive
//! front-end: a CLI hangs a progress bar off it, a GUI would update a widget,
//! tests collect the events and assert on them.

use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use crate::models::DownloadStatus;

/// What the pipeline just finished processing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressItem {
    /// A page fetched by URL (listing or detail)
    Page(String),
    /// A numeric identifier from a requested range
    Identifier(u32),
}

/// One per processed item, delivered in processing order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressEvent {
    /// The item that finished
    pub item: ProgressItem,
    /// Terminal status of the item
    pub status: DownloadStatus,
}

impl ProgressEvent {
    /// Event for a fetched page
    pub fn page(url: impl Into<String>, ok: bool) -> Self {
        Self {
            item: ProgressItem::Page(url.into()),
            status: if ok {
                DownloadStatus::Downloaded
            } else {
                DownloadStatus::Failed
            },
        }
    }

    /// Event for a range identifier
    pub fn identifier(identifier: u32, status: DownloadStatus) -> Self {
        Self {
            item: ProgressItem::Identifier(identifier),
            status,
        }
    }
}

/// Receives progress events as the pipeline processes items
pub trait ProgressObserver: Send + Sync {
    /// Called once per processed item
    fn on_progress(&self, event: ProgressEvent);
}

/// Observer that discards all events
#[derive(Debug, Default, Clone, Copy)]
pub struct NullObserver;

impl ProgressObserver for NullObserver {
    fn on_progress(&self, _event: ProgressEvent) {}
}

/// Observer that records events for later inspection (used by tests)
#[derive(Debug, Default)]
pub struct CollectingObserver {
    events: Mutex<Vec<ProgressEvent>>,
}

impl CollectingObserver {
    /// Create an empty collector
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of events received so far
    pub fn events(&self) -> Vec<ProgressEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl ProgressObserver for CollectingObserver {
    fn on_progress(&self, event: ProgressEvent) {
        self.events.lock().unwrap().push(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collecting_observer_keeps_order() {
        let observer = CollectingObserver::new();
        observer.on_progress(ProgressEvent::identifier(1, DownloadStatus::Downloaded));
        observer.on_progress(ProgressEvent::identifier(2, DownloadStatus::Failed));

        let events = observer.events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].item, ProgressItem::Identifier(1));
        assert_eq!(events[1].status, DownloadStatus::Failed);
    }
}
