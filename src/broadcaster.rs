//! Coalesced presence fan-out (spec.md §4.7). Grounded on
//! `MantasImb-jet_raiders/game_server`'s `watch::channel` "latest value
//! wins" pattern for world state, generalized with an explicit debounce
//! sleep instead of a tick loop, since the presence list changes on
//! membership events rather than on a fixed clock.

use std::time::Duration;

use tokio::sync::{Mutex, Notify};

const BROADCAST_DEBOUNCE: Duration = Duration::from_millis(100);

/// Coalesces bursts of membership churn into at most one send per
/// `BROADCAST_DEBOUNCE` window, and suppresses the send entirely when the
/// name list is unchanged from the last one broadcast. Holds no
/// reference to the registry itself — the caller's debounce loop pulls
/// the current list and does the actual sending.
pub struct Broadcaster {
    dirty: Notify,
    last_sent: Mutex<Vec<String>>,
}

impl Broadcaster {
    pub fn new() -> Self {
        Self {
            dirty: Notify::new(),
            last_sent: Mutex::new(Vec::new()),
        }
    }

    /// Marks the presence list dirty. Cheap and non-blocking; safe to
    /// call repeatedly in quick succession.
    pub fn mark_dirty(&self) {
        self.dirty.notify_one();
    }

    /// Waits for a dirty signal, then sleeps one debounce window to
    /// absorb further churn. Returns once it's time to take a fresh
    /// snapshot and decide whether to send.
    pub async fn wait_for_batch(&self) {
        self.dirty.notified().await;
        tokio::time::sleep(BROADCAST_DEBOUNCE).await;
    }

    /// Given the current sorted name list, returns it only if it differs
    /// from the last list this was called with, updating the record so
    /// the next unchanged call is suppressed.
    pub async fn should_send(&self, mut users: Vec<String>) -> Option<Vec<String>> {
        users.sort();
        let mut last = self.last_sent.lock().await;
        if *last == users {
            None
        } else {
            *last = users.clone();
            Some(users)
        }
    }
}

impl Default for Broadcaster {
    fn default() -> Self {
        Self::new()
    }
}
