//! The connected-client record the `Lobby` keeps per logged-in name, and
//! the per-connection rate limiter spec.md §4.5 requires. Grounded on
//! `other_examples/1f18090f_seanchen1991-sidestacker`'s `Tx` sender handle
//! stored per player, generalized with the bounded-FIFO rate limiter.

use std::collections::VecDeque;
use std::time::Instant;

use tokio::sync::mpsc;

use crate::protocol::{ServerFrame, RATE_LIMIT_REQUESTS, RATE_LIMIT_WINDOW_SECS};

/// A logged-in client's registry entry: its outbound sender and which
/// match, if any, it currently belongs to. Owned by `Lobby`'s internal
/// map, not shared outside it.
pub struct ClientEntry {
    pub tx: mpsc::UnboundedSender<ServerFrame>,
    pub in_match: Option<String>,
}

/// Tracks the last `RATE_LIMIT_REQUESTS` inbound frame arrival times for
/// one connection. Lives inside the connection handler's task — each
/// connection owns exactly one, so no synchronization is needed.
pub struct RateLimiter {
    arrivals: VecDeque<Instant>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self {
            arrivals: VecDeque::with_capacity(RATE_LIMIT_REQUESTS),
        }
    }

    /// Records one more arrival and reports whether this request should
    /// be rate-limited: the FIFO is full and its oldest entry is still
    /// within the window.
    pub fn record(&mut self) -> bool {
        let now = Instant::now();
        let limited = self.arrivals.len() >= RATE_LIMIT_REQUESTS
            && now
                .saturating_duration_since(*self.arrivals.front().unwrap())
                .as_secs_f64()
                < RATE_LIMIT_WINDOW_SECS;

        if self.arrivals.len() >= RATE_LIMIT_REQUESTS {
            self.arrivals.pop_front();
        }
        self.arrivals.push_back(now);
        limited
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}
