//! Wire protocol: newline-delimited UTF-8 JSON frames, one object per line.
//! Grounded on `other_examples/1f18090f_seanchen1991-sidestacker`'s
//! `Request`/`Response` enums (tagged JSON over a line-oriented codec),
//! generalized to this game's frame vocabulary.

use serde::{Deserialize, Serialize};

pub const MAX_NAME_LEN: usize = 50;
pub const MAX_CHAT_LEN: usize = 500;
pub const RATE_LIMIT_REQUESTS: usize = 20;
pub const RATE_LIMIT_WINDOW_SECS: f64 = 2.0;
pub const RATE_LIMIT_PENALTY_SECS: f64 = 1.0;
pub const THINK_TIME_SECS: u64 = 30;
pub const HIGHLIGHT_DELAY_SECS: u64 = 3;

/// Frames sent from a client to the server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientFrame {
    Login { name: String },
    Challenge { opponent: String },
    Accept { opponent: String },
    Move { x: i64, y: i64 },
    Timeout,
    Chat { text: String },
}

impl ClientFrame {
    /// Serializes this frame as a single line ready to be written through
    /// `LinesCodec` (no trailing newline — the codec appends it).
    pub fn to_line(&self) -> String {
        serde_json::to_string(self).expect("ClientFrame serialization is infallible")
    }
}

/// Frames sent from the server to a client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerFrame {
    LoginOk { users: Vec<String> },
    UserList { users: Vec<String> },
    ChallengeSent { to: String },
    Invite { from: String },
    MatchStart { you: char, opponent: String, size: usize },
    YourTurn { deadline: i64 },
    MoveOk { x: i64, y: i64, symbol: char },
    OpponentMove { x: i64, y: i64, symbol: char },
    Highlight { cells: Vec<(i64, i64)>, winner: String },
    MatchEnd { result: &'static str, reason: &'static str, winner: &'static str },
    Chat { from: String, text: String },
    Error { msg: String },
}

impl ServerFrame {
    pub fn error(msg: impl Into<String>) -> Self {
        ServerFrame::Error { msg: msg.into() }
    }

    /// Serializes this frame as a single line ready to be written through
    /// `LinesCodec` (no trailing newline — the codec appends it).
    pub fn to_line(&self) -> String {
        serde_json::to_string(self).expect("ServerFrame serialization is infallible")
    }
}
