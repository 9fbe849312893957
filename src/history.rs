//! Durable finished-match persistence (spec.md §4.8). Grounded on
//! `other_examples/1f18090f_seanchen1991-sidestacker`'s rusqlite-backed
//! store, generalized with a `spawn_blocking` boundary around the
//! (synchronous) `rusqlite::Connection`, and the exact schema and
//! `INSERT OR REPLACE` upsert the original `server.py::save_history` uses.

use std::sync::{Arc, Mutex};

use rusqlite::Connection;
use tracing::{error, info};

use crate::error::HistoryError;
use crate::match_actor::FinishedMatch;

/// Opens (or creates) the matches table once at startup and runs every
/// write on a blocking-pool thread, since `rusqlite` is synchronous and
/// must never stall the async reactor.
pub struct HistoryStore {
    conn: Arc<Mutex<Connection>>,
}

impl HistoryStore {
    pub fn open(db_path: &str) -> Result<Self, HistoryError> {
        let conn = Connection::open(db_path)?;
        conn.execute(
            "CREATE TABLE IF NOT EXISTS matches (
                id TEXT PRIMARY KEY,
                player_x TEXT,
                player_o TEXT,
                winner TEXT,
                started_at TEXT,
                finished_at TEXT,
                moves TEXT
            )",
            [],
        )?;
        Ok(Self { conn: Arc::new(Mutex::new(conn)) })
    }

    /// Persists one finished match, upserting by `match_id`. Failures are
    /// logged and swallowed — per spec.md §7 a history-store failure must
    /// never affect match termination, which has already completed by
    /// the time this is called.
    pub async fn save(&self, record: FinishedMatch) {
        let conn = Arc::clone(&self.conn);
        let match_id = record.match_id.clone();
        let outcome: Result<(), HistoryError> = match tokio::task::spawn_blocking(move || {
            let conn = conn.lock().expect("history connection mutex poisoned");
            conn.execute(
                "INSERT OR REPLACE INTO matches
                 (id, player_x, player_o, winner, started_at, finished_at, moves)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                rusqlite::params![
                    record.match_id,
                    record.player_x,
                    record.player_o,
                    record.winner,
                    record.started_at,
                    record.finished_at,
                    record.moves_json,
                ],
            )
        })
        .await
        {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(e)) => Err(HistoryError::from(e)),
            Err(e) => Err(HistoryError::from(e)),
        };

        match outcome {
            Ok(()) => info!(match_id = %match_id, "match history saved"),
            Err(e) => error!(match_id = %match_id, error = %e, "failed to save match history"),
        }
    }
}
