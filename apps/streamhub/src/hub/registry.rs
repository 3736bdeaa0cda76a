//! Streamer registry: at most one live connection per account number.
//!
//! Uses `DashMap` so every mutation (register, preempt, teardown) happens
//! under the key's shard lock, and broadcast-side reads never observe a
//! half-updated slot.

use dashmap::{DashMap, Entry};
use tokio::sync::mpsc;

/// Handle to a registered streamer connection.
///
/// The registry never touches the socket itself; `kick` asks the owning
/// task to close it.
#[derive(Debug)]
pub struct StreamerSlot {
    pub conn_id: String,
    kick: mpsc::UnboundedSender<()>,
}

impl StreamerSlot {
    /// Create a slot and the kick receiver for the owning task.
    pub fn new(conn_id: String) -> (Self, mpsc::UnboundedReceiver<()>) {
        let (kick, kick_rx) = mpsc::unbounded_channel();
        (Self { conn_id, kick }, kick_rx)
    }

    /// Ask the owning task to close its connection. Returns false if the
    /// task has already exited.
    fn kick(&self) -> bool {
        self.kick.send(()).is_ok()
    }
}

/// `account_number → live streamer connection`.
pub struct StreamerRegistry {
    slots: DashMap<i64, StreamerSlot>,
}

impl StreamerRegistry {
    pub fn new() -> Self {
        Self {
            slots: DashMap::new(),
        }
    }

    /// Register a streamer for an account.
    ///
    /// If the account already has a live connection, its close is
    /// initiated before the new slot takes the key; both steps happen
    /// under the same entry lock, so the key never addresses two
    /// connections at once. Returns the preempted connection's ID, if any.
    pub fn register(&self, account_number: i64, slot: StreamerSlot) -> Option<String> {
        match self.slots.entry(account_number) {
            Entry::Occupied(mut occupied) => {
                occupied.get().kick();
                let old = occupied.insert(slot);
                Some(old.conn_id)
            }
            Entry::Vacant(vacant) => {
                vacant.insert(slot);
                None
            }
        }
    }

    /// Remove the account's slot only if it still belongs to `conn_id`.
    ///
    /// A preempted connection tears down after the newer one has taken
    /// the key; its stale cleanup must not clobber the newer
    /// registration. Returns true if an entry was removed.
    pub fn remove_if_current(&self, account_number: i64, conn_id: &str) -> bool {
        self.slots
            .remove_if(&account_number, |_, slot| slot.conn_id == conn_id)
            .is_some()
    }

    /// Connection ID currently holding the account's slot, if any.
    pub fn current_conn(&self, account_number: i64) -> Option<String> {
        self.slots
            .get(&account_number)
            .map(|slot| slot.conn_id.clone())
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

impl Default for StreamerRegistry {
    fn default() -> Self {
        Self::new()
    }
}
