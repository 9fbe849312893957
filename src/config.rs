//! CLI configuration (spec.md §4.10, ambient). Generalizes the teacher's
//! `src/bin/server.rs` `Args` (`bind`, `verbose`, `max_games`) with the
//! knobs this crate's lobby/history/match-cap need, and adds optional
//! `.env` loading the way `MantasImb-jet_raiders/game_server`'s `main.rs`
//! does for operators who'd rather set environment variables than flags.

use clap::Parser;

#[derive(Parser, Debug)]
#[command(
    name = "caro-server",
    version,
    about = "Authoritative TCP server for 15x15 gomoku/caro",
    long_about = "Accepts long-lived TCP connections, runs the lobby and any number \
                  of concurrent matches, and persists finished games to SQLite."
)]
pub struct Args {
    /// Address to listen on.
    #[arg(short, long, default_value = "0.0.0.0:7777")]
    pub bind: String,

    /// Path to the SQLite database used for match history.
    #[arg(long, default_value = "caro_history.db")]
    pub db_path: String,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Maximum number of concurrently live matches.
    #[arg(short = 'g', long, default_value_t = 1024)]
    pub max_matches: usize,
}

impl Args {
    /// Parses CLI flags, having first loaded a `.env` file if present
    /// (silently ignored if absent — this is a convenience, not a
    /// requirement).
    pub fn load() -> Self {
        let _ = dotenvy::dotenv();
        Self::parse()
    }

    /// Maps `-v` counts to a `tracing` filter directive the same way the
    /// teacher's `-v` counts mapped to its own `Level` enum: 0 is
    /// warnings only, 1 is info, 2 is debug, 3+ is trace.
    pub fn log_directive(&self) -> &'static str {
        match self.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbosity_maps_to_expected_directives() {
        let mut args = Args {
            bind: "0.0.0.0:7777".to_string(),
            db_path: "x.db".to_string(),
            verbose: 0,
            max_matches: 1,
        };
        assert_eq!(args.log_directive(), "warn");
        args.verbose = 1;
        assert_eq!(args.log_directive(), "info");
        args.verbose = 3;
        assert_eq!(args.log_directive(), "trace");
    }
}
