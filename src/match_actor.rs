//! The authoritative per-game state machine: board, turn, deadline, moves
//! log, terminal flag. Each `Match` runs as its own tokio task (an actor)
//! serialized by construction — one task means one state mutator, so
//! operations on the same match never interleave while different matches
//! run fully in parallel (spec.md §5). This generalizes
//! `MantasImb-jet_raiders/game_server`'s per-lobby `world_task` actor
//! (one continuous-tick loop per lobby, driven by an `mpsc` of
//! `GameEvent`s) from a real-time tick simulation to a turn-based,
//! deadline-driven match.

use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, watch, OwnedSemaphorePermit};
use tokio::task::AbortHandle;
use tracing::{info, warn};

use crate::board::{Board, Symbol, BOARD_SIZE};
use crate::error::MatchError;
use crate::history::HistoryStore;
use crate::ids::next_match_id;
use crate::lobby::Lobby;
use crate::protocol::{ServerFrame, HIGHLIGHT_DELAY_SECS, MAX_CHAT_LEN, THINK_TIME_SECS};

/// One accepted move, as persisted in the finished match record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MoveRecord {
    pub x: i64,
    pub y: i64,
    pub symbol: char,
    pub wall_time: i64,
}

/// The immutable record persisted at termination (spec.md §3).
#[derive(Debug, Clone)]
pub struct FinishedMatch {
    pub match_id: String,
    pub player_x: String,
    pub player_o: String,
    /// A player's display name, or `"draw"`.
    pub winner: String,
    pub started_at: String,
    pub finished_at: String,
    pub moves_json: String,
}

/// A read-only view of a live match's state, for the observer interface.
/// Published via a `watch` channel after every state-changing operation —
/// the "atomically-swapped snapshot pointer" DESIGN.md's design notes
/// call for, so observers never see a torn board.
#[derive(Debug, Clone)]
pub struct MatchSnapshot {
    pub match_id: String,
    pub player_x: String,
    pub player_o: String,
    pub turn: char,
    pub board_text: String,
    pub last_move: Option<(i64, i64)>,
    pub terminal: bool,
}

/// Commands accepted by a running match actor.
enum MatchCommand {
    ApplyMove { actor: String, x: i64, y: i64 },
    OnClientTimeout { actor: String },
    OnTimeout { turn: Symbol, deadline: i64 },
    OnDisconnect { actor: String },
    RelayChat { actor: String, text: String },
    /// Delivered by the post-win highlight-delay timer once it elapses.
    /// Kept as a scheduled command rather than an inline sleep so the
    /// actor loop keeps servicing `ApplyMove` (and rejecting it with
    /// `AlreadyTerminal`) for the whole highlight window instead of
    /// blocking (spec.md §9 Open Question).
    Finish { winner: Option<String>, reason: &'static str },
}

/// A handle to a running match actor, held by the `Lobby`'s match
/// registry and by each participant's connection handler.
#[derive(Clone)]
pub struct MatchHandle {
    pub match_id: String,
    pub player_x: String,
    pub player_o: String,
    cmd_tx: mpsc::UnboundedSender<MatchCommand>,
    snapshot_rx: watch::Receiver<MatchSnapshot>,
}

impl MatchHandle {
    pub fn apply_move(&self, actor: String, x: i64, y: i64) -> Result<(), MatchError> {
        self.cmd_tx
            .send(MatchCommand::ApplyMove { actor, x, y })
            .map_err(|_| MatchError::AlreadyTerminal)
    }

    pub fn on_client_timeout(&self, actor: String) -> Result<(), MatchError> {
        self.cmd_tx
            .send(MatchCommand::OnClientTimeout { actor })
            .map_err(|_| MatchError::AlreadyTerminal)
    }

    pub fn on_disconnect(&self, actor: String) {
        let _ = self.cmd_tx.send(MatchCommand::OnDisconnect { actor });
    }

    pub fn relay_chat(&self, actor: String, text: String) {
        let _ = self.cmd_tx.send(MatchCommand::RelayChat { actor, text });
    }

    /// Current snapshot, for the observer interface. Never blocks and
    /// never torn: `watch::Receiver::borrow` hands back the latest
    /// published value as a whole.
    pub fn snapshot(&self) -> MatchSnapshot {
        self.snapshot_rx.borrow().clone()
    }
}

fn unix_secs_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}

fn iso_seconds_now() -> String {
    chrono::Utc::now().format("%Y-%m-%dT%H:%M:%S").to_string()
}

/// Outcome of a successfully-applied move, for the actor loop to drive
/// the post-move sequencing (highlight delay, next turn) specified in
/// spec.md §4.3.
enum MoveOutcome {
    Continue,
    Draw,
    Win(Symbol),
}

struct MatchInner {
    match_id: String,
    player_x: String,
    player_o: String,
    tx_x: mpsc::UnboundedSender<ServerFrame>,
    tx_o: mpsc::UnboundedSender<ServerFrame>,
    board: Board,
    turn: Symbol,
    started_at: String,
    moves: Vec<MoveRecord>,
    deadline: Option<i64>,
    /// Set the instant any terminal-causing event is accepted (a winning
    /// move, a draw, a timeout, or a disconnect) — before the highlight
    /// delay, if any, elapses. No further externally-visible state
    /// transitions happen once this is true (spec.md §9 Open Question).
    terminal: bool,
    /// Set once `finish` has actually run (sent `match_end`, persisted
    /// the record). Distinct from `terminal` so the highlight delay can
    /// hold `terminal = true` without finishing early.
    finished: bool,
    timer: Option<AbortHandle>,
    snapshot_tx: watch::Sender<MatchSnapshot>,
}

impl MatchInner {
    fn send_to(&self, who: Symbol, frame: ServerFrame) {
        let tx = match who {
            Symbol::X => &self.tx_x,
            Symbol::O => &self.tx_o,
        };
        let _ = tx.send(frame);
    }

    fn send_to_name(&self, name: &str, frame: ServerFrame) {
        if name == self.player_x {
            self.send_to(Symbol::X, frame);
        } else if name == self.player_o {
            self.send_to(Symbol::O, frame);
        }
    }

    fn name_of(&self, who: Symbol) -> &str {
        match who {
            Symbol::X => &self.player_x,
            Symbol::O => &self.player_o,
        }
    }

    fn symbol_of(&self, name: &str) -> Option<Symbol> {
        if name == self.player_x {
            Some(Symbol::X)
        } else if name == self.player_o {
            Some(Symbol::O)
        } else {
            None
        }
    }

    fn publish_snapshot(&self) {
        let last_move = self.moves.last().map(|m| (m.x, m.y));
        let _ = self.snapshot_tx.send(MatchSnapshot {
            match_id: self.match_id.clone(),
            player_x: self.player_x.clone(),
            player_o: self.player_o.clone(),
            turn: self.turn.as_char(),
            board_text: self.board.to_text(),
            last_move,
            terminal: self.terminal,
        });
    }

    /// Arms a THINK_TIME deadline for the current turn player and
    /// schedules a Timer delivering a single `OnTimeout` back to this
    /// actor. The timer sleeps in its own detached task, so it never
    /// holds this actor's (implicit, single-task) lock while waiting.
    fn begin_turn(&mut self, cmd_tx: &mpsc::UnboundedSender<MatchCommand>) {
        let deadline = unix_secs_now() + THINK_TIME_SECS as i64;
        self.deadline = Some(deadline);
        self.send_to(self.turn, ServerFrame::YourTurn { deadline });

        let turn = self.turn;
        let tx = cmd_tx.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(THINK_TIME_SECS)).await;
            let _ = tx.send(MatchCommand::OnTimeout { turn, deadline });
        });
        self.timer = Some(handle.abort_handle());
        self.publish_snapshot();
    }

    /// Best-effort cancellation; a stale fire is still caught by the
    /// (turn, deadline) check in `OnTimeout` handling, so a missed abort
    /// is harmless.
    fn cancel_timer(&mut self) {
        if let Some(handle) = self.timer.take() {
            handle.abort();
        }
    }

    fn apply_move(
        &mut self,
        cmd_tx: &mpsc::UnboundedSender<MatchCommand>,
        actor: &str,
        x: i64,
        y: i64,
    ) -> Result<MoveOutcome, MatchError> {
        if self.terminal {
            return Err(MatchError::AlreadyTerminal);
        }
        let symbol = self.symbol_of(actor).ok_or(MatchError::NotInMatch)?;
        if symbol != self.turn {
            return Err(MatchError::NotYourTurn);
        }
        if !(0..BOARD_SIZE as i64).contains(&x) || !(0..BOARD_SIZE as i64).contains(&y) {
            return Err(MatchError::BadCoords);
        }
        if !self.board.is_empty(x as i32, y as i32) {
            return Err(MatchError::Occupied);
        }

        self.cancel_timer();
        self.board.place(x as usize, y as usize, symbol);
        self.moves.push(MoveRecord {
            x,
            y,
            symbol: symbol.as_char(),
            wall_time: unix_secs_now(),
        });
        self.deadline = None;

        self.send_to(symbol, ServerFrame::MoveOk { x, y, symbol: symbol.as_char() });
        self.send_to(
            symbol.opposite(),
            ServerFrame::OpponentMove { x, y, symbol: symbol.as_char() },
        );

        let win_cells = self.board.find_win_line(x as i32, y as i32, symbol);
        if !win_cells.is_empty() {
            let winner_name = self.name_of(symbol).to_string();
            let cells: Vec<(i64, i64)> =
                win_cells.into_iter().map(|(cx, cy)| (cx as i64, cy as i64)).collect();
            self.send_to(
                Symbol::X,
                ServerFrame::Highlight { cells: cells.clone(), winner: winner_name.clone() },
            );
            self.send_to(Symbol::O, ServerFrame::Highlight { cells, winner: winner_name });
            // Terminal from the moment the winning move lands: no further
            // move is accepted even during the highlight delay.
            self.terminal = true;
            self.publish_snapshot();
            return Ok(MoveOutcome::Win(symbol));
        }

        if self.board.is_full() {
            self.terminal = true;
            self.publish_snapshot();
            return Ok(MoveOutcome::Draw);
        }

        self.turn = self.turn.opposite();
        self.begin_turn(cmd_tx);
        Ok(MoveOutcome::Continue)
    }

    /// Idempotent: the first caller to observe `!self.finished` performs
    /// the transition; every later call is a no-op. `winner` is `None`
    /// for a draw.
    fn finish(&mut self, winner: Option<&str>, reason: &'static str) -> Option<FinishedMatch> {
        if self.finished {
            return None;
        }
        self.finished = true;
        self.terminal = true;
        self.cancel_timer();

        for (who, name) in [
            (Symbol::X, self.player_x.as_str()),
            (Symbol::O, self.player_o.as_str()),
        ] {
            let (result, winner_field): (&'static str, &'static str) = match winner {
                Some(w) if w == name => ("win", "you"),
                Some(_) => ("lose", "opponent"),
                None => ("draw", "none"),
            };
            self.send_to(who, ServerFrame::MatchEnd { result, reason, winner: winner_field });
        }
        self.publish_snapshot();

        let record = FinishedMatch {
            match_id: self.match_id.clone(),
            player_x: self.player_x.clone(),
            player_o: self.player_o.clone(),
            winner: winner.map(str::to_string).unwrap_or_else(|| "draw".to_string()),
            started_at: self.started_at.clone(),
            finished_at: iso_seconds_now(),
            moves_json: serde_json::to_string(&self.moves).unwrap_or_else(|_| "[]".to_string()),
        };
        info!(match_id = %self.match_id, reason, winner, "match finished");
        Some(record)
    }
}

/// Spawns a new match actor and returns the handle both participants'
/// connection handlers use to drive it. `tx_x`/`tx_o` are the outbound
/// frame senders for the two participants (clones of the `Client`
/// handles the `Lobby` tracks).
pub fn spawn_match(
    player_x: String,
    player_o: String,
    tx_x: mpsc::UnboundedSender<ServerFrame>,
    tx_o: mpsc::UnboundedSender<ServerFrame>,
    lobby: Arc<Lobby>,
    history: Arc<HistoryStore>,
    match_slot: OwnedSemaphorePermit,
) -> MatchHandle {
    let match_id = next_match_id();
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();

    let initial_snapshot = MatchSnapshot {
        match_id: match_id.clone(),
        player_x: player_x.clone(),
        player_o: player_o.clone(),
        turn: 'X',
        board_text: Board::new().to_text(),
        last_move: None,
        terminal: false,
    };
    let (snapshot_tx, snapshot_rx) = watch::channel(initial_snapshot);

    let handle = MatchHandle {
        match_id: match_id.clone(),
        player_x: player_x.clone(),
        player_o: player_o.clone(),
        cmd_tx: cmd_tx.clone(),
        snapshot_rx,
    };

    let inner = MatchInner {
        match_id,
        player_x,
        player_o,
        tx_x,
        tx_o,
        board: Board::new(),
        turn: Symbol::X,
        started_at: iso_seconds_now(),
        moves: Vec::new(),
        deadline: None,
        terminal: false,
        finished: false,
        timer: None,
        snapshot_tx,
    };

    tokio::spawn(run_match(inner, cmd_tx, cmd_rx, lobby, history, match_slot));

    handle
}

async fn run_match(
    mut inner: MatchInner,
    cmd_tx: mpsc::UnboundedSender<MatchCommand>,
    mut cmd_rx: mpsc::UnboundedReceiver<MatchCommand>,
    lobby: Arc<Lobby>,
    history: Arc<HistoryStore>,
    _match_slot: OwnedSemaphorePermit,
) {
    // Held for the task's whole lifetime; dropped on return, returning
    // the slot to the lobby's match-count semaphore.
    info!(match_id = %inner.match_id, player_x = %inner.player_x, player_o = %inner.player_o, "match started");
    inner.send_to(
        Symbol::X,
        ServerFrame::MatchStart {
            you: 'X',
            opponent: inner.player_o.clone(),
            size: BOARD_SIZE,
        },
    );
    inner.send_to(
        Symbol::O,
        ServerFrame::MatchStart {
            you: 'O',
            opponent: inner.player_x.clone(),
            size: BOARD_SIZE,
        },
    );
    inner.begin_turn(&cmd_tx);

    while let Some(cmd) = cmd_rx.recv().await {
        match cmd {
            MatchCommand::ApplyMove { actor, x, y } => {
                match inner.apply_move(&cmd_tx, &actor, x, y) {
                    Ok(MoveOutcome::Continue) => {}
                    Ok(MoveOutcome::Draw) => {
                        finalize(&mut inner, &lobby, &history, None, "draw").await;
                    }
                    Ok(MoveOutcome::Win(symbol)) => {
                        // Schedule the finish for after the highlight delay
                        // rather than sleeping inline: the actor keeps
                        // pumping `cmd_rx` in the meantime, so a `move`
                        // arriving during the window still goes through
                        // `apply_move` and is rejected with `AlreadyTerminal`
                        // (the match is already `terminal`) instead of being
                        // silently dropped.
                        let winner = inner.name_of(symbol).to_string();
                        let tx = cmd_tx.clone();
                        tokio::spawn(async move {
                            tokio::time::sleep(Duration::from_secs(HIGHLIGHT_DELAY_SECS)).await;
                            let _ = tx.send(MatchCommand::Finish { winner: Some(winner), reason: "win" });
                        });
                    }
                    Err(e) => {
                        warn!(match_id = %inner.match_id, actor = %actor, error = %e, "move rejected");
                        inner.send_to_name(&actor, ServerFrame::error(e.to_string()));
                    }
                }
            }
            MatchCommand::OnClientTimeout { actor } => {
                if inner.terminal {
                    continue;
                }
                match inner.symbol_of(&actor) {
                    Some(sym) if sym == inner.turn => {
                        let winner = inner.name_of(sym.opposite()).to_string();
                        finalize(&mut inner, &lobby, &history, Some(&winner), "timeout").await;
                    }
                    Some(_) => {
                        inner.send_to_name(&actor, ServerFrame::error("not your turn"));
                    }
                    None => {
                        inner.send_to_name(&actor, ServerFrame::error("not in a match"));
                    }
                }
            }
            MatchCommand::OnTimeout { turn, deadline } => {
                if inner.terminal || inner.turn != turn || inner.deadline != Some(deadline) {
                    continue; // stale fire, discarded
                }
                let winner = inner.name_of(turn.opposite()).to_string();
                finalize(&mut inner, &lobby, &history, Some(&winner), "timeout").await;
            }
            MatchCommand::OnDisconnect { actor } => {
                if inner.terminal {
                    continue;
                }
                if let Some(sym) = inner.symbol_of(&actor) {
                    let winner = inner.name_of(sym.opposite()).to_string();
                    finalize(&mut inner, &lobby, &history, Some(&winner), "disconnect").await;
                }
            }
            MatchCommand::Finish { winner, reason } => {
                finalize(&mut inner, &lobby, &history, winner.as_deref(), reason).await;
            }
            MatchCommand::RelayChat { actor, text } => {
                let trimmed = text.trim();
                // No externally-visible effect once terminal, per the
                // Match's terminal-flag invariant (spec.md §3).
                if !inner.terminal {
                    if let Some(sym) = inner.symbol_of(&actor) {
                        if !trimmed.is_empty() && trimmed.len() <= MAX_CHAT_LEN {
                            inner.send_to(
                                sym.opposite(),
                                ServerFrame::Chat { from: actor.clone(), text: trimmed.to_string() },
                            );
                        }
                    }
                }
            }
        }
        if inner.finished {
            break;
        }
    }
}

/// Runs `MatchInner::finish` and, if it actually transitioned (first
/// caller), hands the record off to the lobby for cleanup and to history
/// for persistence. Lobby/history errors never affect the match's
/// already-sent `match_end` frames.
async fn finalize(
    inner: &mut MatchInner,
    lobby: &Arc<Lobby>,
    history: &Arc<HistoryStore>,
    winner: Option<&str>,
    reason: &'static str,
) {
    let Some(record) = inner.finish(winner, reason) else {
        return;
    };
    lobby.clear_membership(&inner.player_x).await;
    lobby.clear_membership(&inner.player_o).await;
    lobby.remove_match(&inner.match_id).await;
    history.save(record).await;
}
