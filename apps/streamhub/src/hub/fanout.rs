//! Viewer fanout: best-effort delivery of streamer frames to every
//! connected viewer.
//!
//! Each viewer owns the receiving half of an unbounded channel; its task
//! forwards queued frames to the socket. Sends never block, so a slow or
//! dying viewer cannot stall a streamer's relay loop.

use axum::extract::ws::Message;
use dashmap::DashMap;
use tokio::sync::mpsc;

/// The set of connected viewers, keyed by connection ID.
pub struct ViewerFanout {
    viewers: DashMap<String, mpsc::UnboundedSender<Message>>,
}

impl ViewerFanout {
    pub fn new() -> Self {
        Self {
            viewers: DashMap::new(),
        }
    }

    /// Add a viewer. Returns the receiving half for the viewer's task.
    pub fn add(&self, conn_id: String) -> mpsc::UnboundedReceiver<Message> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.viewers.insert(conn_id, tx);
        rx
    }

    /// Remove a viewer. Called from the viewer task's single exit path.
    /// Returns true if the viewer was still present.
    pub fn remove(&self, conn_id: &str) -> bool {
        self.viewers.remove(conn_id).is_some()
    }

    /// Deliver one frame to every currently-connected viewer.
    ///
    /// Iterates a snapshot of the membership, so a viewer joining or
    /// leaving mid-broadcast never invalidates the iteration. A closed
    /// channel (viewer already tearing down) is skipped without affecting
    /// the remaining sends; that viewer's entry is removed by its own
    /// task. An empty set is a no-op — frames are never buffered.
    ///
    /// Returns the number of viewers the frame was handed to.
    pub fn broadcast(&self, frame: &Message) -> usize {
        if self.viewers.is_empty() {
            return 0;
        }

        let snapshot: Vec<mpsc::UnboundedSender<Message>> = self
            .viewers
            .iter()
            .map(|entry| entry.value().clone())
            .collect();

        let mut delivered = 0;
        for tx in snapshot {
            if tx.send(frame.clone()).is_ok() {
                delivered += 1;
            }
        }
        delivered
    }

    pub fn len(&self) -> usize {
        self.viewers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.viewers.is_empty()
    }
}

impl Default for ViewerFanout {
    fn default() -> Self {
        Self::new()
    }
}
