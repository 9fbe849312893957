//! Typed error kinds for each component boundary, grounded on
//! `rune-relic-server/src/network/session.rs`'s `SessionError` pattern
//! (a `thiserror` enum whose `Display` text is the wire-facing message).

use thiserror::Error;

/// Errors from `Lobby` operations. Each variant's `Display` is the exact
/// wording that gets relayed to the offending client as an `error` frame.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LobbyError {
    #[error("Name must be 1-50 characters")]
    InvalidName,
    #[error("Name already in use")]
    NameInUse,
    #[error("opponent not found")]
    OpponentNotFound,
    #[error("cannot challenge yourself")]
    SelfChallenge,
    #[error("you are already in a match")]
    AlreadyInMatch,
    #[error("opponent is already in a match")]
    OpponentInMatch,
    #[error("opponent is no longer online")]
    OpponentOffline,
    #[error("a challenge to that player is already pending")]
    ChallengeAlreadySent,
    #[error("no invite found")]
    NoInvite,
}

/// Errors from `Match` operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MatchError {
    #[error("not in a match")]
    NotInMatch,
    #[error("not your turn")]
    NotYourTurn,
    #[error("bad coords")]
    BadCoords,
    #[error("occupied")]
    Occupied,
    #[error("match already finished")]
    AlreadyTerminal,
}

/// Errors from the durable history store. Always logged and swallowed by
/// callers — never surfaced to a client, per spec.
#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("background task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}
