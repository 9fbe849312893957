//! Read-only observer interface (spec.md §4.9): connected names, live
//! matches, and a given match's board/turn/last-move, for external
//! tooling. This is the headless analogue of the original's
//! `match_viewer.py`, a Tk GUI that polls `server.matches[match_id]`
//! every 250ms and recomputes the win highlight locally — the GUI is out
//! of scope, but the underlying poll-without-disturbing-the-game access
//! pattern is exactly what this module exposes. Snapshots are never torn:
//! they're read off `MatchHandle::snapshot`'s `watch`-published value
//! (see match_actor.rs), not off the match's live internal state.

use std::sync::Arc;

use crate::lobby::Lobby;

/// One live match as the observer interface enumerates it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiveMatchSummary {
    pub match_id: String,
    pub player_x: String,
    pub player_o: String,
    pub turn: char,
}

/// A single match's current board/turn/last-move, for a focused view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchView {
    pub match_id: String,
    pub board_text: String,
    pub turn: char,
    pub last_move: Option<(i64, i64)>,
    pub terminal: bool,
}

/// Enumerates currently-connected client names, sorted.
pub async fn connected_names(lobby: &Arc<Lobby>) -> Vec<String> {
    lobby.connected_names().await
}

/// Enumerates live matches as (match_id, player_x, player_o, turn).
pub async fn live_matches(lobby: &Arc<Lobby>) -> Vec<LiveMatchSummary> {
    let mut out: Vec<LiveMatchSummary> = lobby
        .live_matches()
        .await
        .into_iter()
        .map(|handle| {
            let snap = handle.snapshot();
            LiveMatchSummary {
                match_id: snap.match_id,
                player_x: snap.player_x,
                player_o: snap.player_o,
                turn: snap.turn,
            }
        })
        .collect();
    out.sort_by(|a, b| a.match_id.cmp(&b.match_id));
    out
}

/// Fetches one match's current board, turn, and last-move coordinates.
/// Returns `None` if the match id is unknown (already finished and
/// reaped, or never existed).
pub async fn match_view(lobby: &Arc<Lobby>, match_id: &str) -> Option<MatchView> {
    let handle = lobby.get_match(match_id).await?;
    let snap = handle.snapshot();
    Some(MatchView {
        match_id: snap.match_id,
        board_text: snap.board_text,
        turn: snap.turn,
        last_move: snap.last_move,
        terminal: snap.terminal,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::HistoryStore;
    use crate::protocol::ServerFrame;
    use std::time::Duration;
    use tokio::sync::mpsc;

    fn history() -> Arc<HistoryStore> {
        Arc::new(HistoryStore::open(":memory:").unwrap())
    }

    #[tokio::test]
    async fn match_view_reflects_moves_with_a_consistent_board_and_turn() {
        let lobby = Lobby::new(history(), 16);
        let (tx_a, mut rx_a) = mpsc::unbounded_channel::<ServerFrame>();
        let (tx_b, mut rx_b) = mpsc::unbounded_channel::<ServerFrame>();
        lobby.login("A", tx_a).await.unwrap();
        lobby.login("B", tx_b).await.unwrap();
        lobby.challenge("A", "B").await.unwrap();
        lobby.accept("B", "A").await.unwrap();
        let handle = lobby.match_for("A").await.expect("A should be in a match");

        // Drain match_start + your_turn so the moves below line up cleanly.
        assert!(matches!(rx_a.recv().await.unwrap(), ServerFrame::MatchStart { .. }));
        assert!(matches!(rx_b.recv().await.unwrap(), ServerFrame::MatchStart { .. }));
        assert!(matches!(rx_a.recv().await.unwrap(), ServerFrame::YourTurn { .. }));

        let live = live_matches(&lobby).await;
        assert_eq!(live.len(), 1);
        assert_eq!(live[0].match_id, handle.match_id);
        assert_eq!(live[0].turn, 'X');

        // A (X) plays (3,4); B (O) replies at (0,0).
        handle.apply_move("A".to_string(), 3, 4).unwrap();
        assert!(matches!(rx_a.recv().await.unwrap(), ServerFrame::MoveOk { .. }));
        assert!(matches!(rx_b.recv().await.unwrap(), ServerFrame::OpponentMove { .. }));
        assert!(matches!(rx_b.recv().await.unwrap(), ServerFrame::YourTurn { .. }));

        handle.apply_move("B".to_string(), 0, 0).unwrap();
        assert!(matches!(rx_b.recv().await.unwrap(), ServerFrame::MoveOk { .. }));
        assert!(matches!(rx_a.recv().await.unwrap(), ServerFrame::OpponentMove { .. }));
        assert!(matches!(rx_a.recv().await.unwrap(), ServerFrame::YourTurn { .. }));

        let view = match_view(&lobby, &handle.match_id).await.expect("match should still be live");
        assert_eq!(view.match_id, handle.match_id);
        assert_eq!(view.turn, 'X');
        assert_eq!(view.last_move, Some((0, 0)));
        assert!(!view.terminal);

        let rows: Vec<&str> = view.board_text.lines().collect();
        assert_eq!(rows[4].chars().nth(3), Some('X'));
        assert_eq!(rows[0].chars().nth(0), Some('O'));

        assert_eq!(connected_names(&lobby).await, vec!["A".to_string(), "B".to_string()]);
    }

    #[tokio::test]
    async fn match_view_is_none_once_the_match_has_been_reaped() {
        let lobby = Lobby::new(history(), 16);
        let (tx_a, _rx_a) = mpsc::unbounded_channel::<ServerFrame>();
        let (tx_b, _rx_b) = mpsc::unbounded_channel::<ServerFrame>();
        lobby.login("A", tx_a).await.unwrap();
        lobby.login("B", tx_b).await.unwrap();
        lobby.challenge("A", "B").await.unwrap();
        lobby.accept("B", "A").await.unwrap();
        let handle = lobby.match_for("A").await.expect("A should be in a match");

        handle.on_disconnect("A".to_string());
        // Give the actor a tick to finalize and have the lobby reap it.
        tokio::time::sleep(Duration::from_millis(20)).await;

        assert!(match_view(&lobby, &handle.match_id).await.is_none());
        assert!(live_matches(&lobby).await.is_empty());
    }
}
