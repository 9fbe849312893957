//! Authoritative TCP server for 15x15 gomoku/caro: lobby, matches,
//! persistence, and a read-only observer interface. See `DESIGN.md` for
//! the per-module grounding.

pub mod board;
pub mod broadcaster;
pub mod client;
pub mod config;
pub mod connection;
pub mod error;
pub mod history;
pub mod ids;
pub mod lobby;
pub mod logger;
pub mod match_actor;
pub mod observer;
pub mod protocol;
