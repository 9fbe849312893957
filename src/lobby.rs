//! Process-wide registry of connected clients, pending challenges, and
//! live matches (spec.md §4.4). Grounded on
//! `MantasImb-jet_raiders/game_server/use_cases/lobby.rs`'s
//! `LobbyRegistry` (a single `RwLock`-guarded map plus per-entry spawn),
//! generalized from one-world-per-lobby to one-`Match`-actor-per-game
//! and from a lobby-id keyed map to a player-name keyed map.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tokio::sync::{mpsc, RwLock, Semaphore};
use tracing::info;

use crate::broadcaster::Broadcaster;
use crate::client::ClientEntry;
use crate::error::LobbyError;
use crate::history::HistoryStore;
use crate::match_actor::{spawn_match, MatchHandle};
use crate::protocol::{ServerFrame, MAX_NAME_LEN};

struct LobbyInner {
    clients: HashMap<String, ClientEntry>,
    /// (challenger, target) pairs with no accept/decline yet.
    pending: HashSet<(String, String)>,
    matches: HashMap<String, MatchHandle>,
}

/// The single logical critical region guarding presence, challenges, and
/// match membership (spec.md §5). All mutations to those three
/// collections serialize on one `RwLock`.
pub struct Lobby {
    inner: RwLock<LobbyInner>,
    history: Arc<HistoryStore>,
    /// Caps concurrent live matches (spec.md §4.10's `--max-matches`, an
    /// optional resource knob — not a request cap). Grounded on the
    /// teacher's `Semaphore`-gated game slots in `src/bin/server.rs`: a
    /// permit is acquired before a match is created and held for the
    /// lifetime of its actor task, so `accept` naturally back-pressures
    /// once every slot is in use rather than erroring.
    match_slots: Arc<Semaphore>,
    broadcaster: Broadcaster,
}

impl Lobby {
    pub fn new(history: Arc<HistoryStore>, max_matches: usize) -> Arc<Self> {
        Arc::new(Self {
            inner: RwLock::new(LobbyInner {
                clients: HashMap::new(),
                pending: HashSet::new(),
                matches: HashMap::new(),
            }),
            history,
            match_slots: Arc::new(Semaphore::new(max_matches.max(1))),
            broadcaster: Broadcaster::new(),
        })
    }

    /// Runs forever, coalescing presence changes into debounced
    /// `user_list` sends to every connected client (spec.md §4.7). Spawn
    /// once at startup.
    pub async fn run_broadcast_loop(self: Arc<Self>) {
        loop {
            self.broadcaster.wait_for_batch().await;
            let names = self.connected_names().await;
            if let Some(names) = self.broadcaster.should_send(names).await {
                let inner = self.inner.read().await;
                for entry in inner.clients.values() {
                    let _ = entry.tx.send(ServerFrame::UserList { users: names.clone() });
                }
            }
        }
    }

    /// Trims `name`; rejects empty/too-long/duplicate names; otherwise
    /// registers the client and returns the current name list (itself
    /// included), matching the original's `login_ok` payload.
    pub async fn login(
        &self,
        name: &str,
        tx: mpsc::UnboundedSender<ServerFrame>,
    ) -> Result<Vec<String>, LobbyError> {
        let name = name.trim();
        if name.is_empty() || name.chars().count() > MAX_NAME_LEN {
            return Err(LobbyError::InvalidName);
        }

        let mut inner = self.inner.write().await;
        if inner.clients.contains_key(name) {
            return Err(LobbyError::NameInUse);
        }
        inner
            .clients
            .insert(name.to_string(), ClientEntry { tx, in_match: None });
        let mut users: Vec<String> = inner.clients.keys().cloned().collect();
        users.sort();
        drop(inner);
        self.broadcaster.mark_dirty();
        info!(name, "client logged in");
        Ok(users)
    }

    /// Removes `name` from the connected set, drops every pending
    /// challenge it's party to, and forfeits its match if it was in one.
    /// The returned `MatchHandle`, if any, still needs `on_disconnect`
    /// called on it by the caller — done outside the lock so the match
    /// actor's own async work never runs while this lock is held.
    pub async fn logout(&self, name: &str) -> Option<MatchHandle> {
        let mut inner = self.inner.write().await;
        let entry = inner.clients.remove(name)?;
        inner
            .pending
            .retain(|(from, to)| from != name && to != name);
        let handle = entry.in_match.and_then(|mid| inner.matches.get(&mid).cloned());
        drop(inner);
        self.broadcaster.mark_dirty();
        info!(name, "client logged out");
        handle
    }

    pub async fn challenge(&self, from: &str, target: &str) -> Result<(), LobbyError> {
        let mut inner = self.inner.write().await;
        if !inner.clients.contains_key(target) {
            return Err(LobbyError::OpponentNotFound);
        }
        if from == target {
            return Err(LobbyError::SelfChallenge);
        }
        if inner.clients[from].in_match.is_some() {
            return Err(LobbyError::AlreadyInMatch);
        }
        if inner.clients[target].in_match.is_some() {
            return Err(LobbyError::OpponentInMatch);
        }
        let key = (from.to_string(), target.to_string());
        if inner.pending.contains(&key) {
            return Err(LobbyError::ChallengeAlreadySent);
        }
        inner.pending.insert(key);

        inner.clients[target]
            .tx
            .send(ServerFrame::Invite { from: from.to_string() })
            .ok();
        inner.clients[from]
            .tx
            .send(ServerFrame::ChallengeSent { to: target.to_string() })
            .ok();
        Ok(())
    }

    /// Creates and spawns the match on acceptance. Needs `Arc<Self>`
    /// because the spawned match actor's finish callback calls back into
    /// `clear_membership`/`remove_match` on this same registry.
    pub async fn accept(
        self: &Arc<Self>,
        actor: &str,
        challenger: &str,
    ) -> Result<(), LobbyError> {
        // Acquired before the lock: a full semaphore must back-pressure
        // by suspending here, not while the critical region is held.
        let permit = Arc::clone(&self.match_slots)
            .acquire_owned()
            .await
            .expect("match_slots semaphore is never closed");

        let mut inner = self.inner.write().await;
        let key = (challenger.to_string(), actor.to_string());
        if !inner.pending.contains(&key) {
            return Err(LobbyError::NoInvite);
        }
        if !inner.clients.contains_key(challenger) {
            inner.pending.remove(&key);
            return Err(LobbyError::OpponentOffline);
        }
        if inner.clients[actor].in_match.is_some() || inner.clients[challenger].in_match.is_some()
        {
            return Err(LobbyError::AlreadyInMatch);
        }

        // Accepting clears every invite either side was part of, not
        // just this one pair, matching spec.md §4.4's "atomically remove
        // that and any other pending invites involving either participant".
        inner
            .pending
            .retain(|(from, to)| from != challenger && to != challenger && from != actor && to != actor);

        let tx_x = inner.clients[challenger].tx.clone();
        let tx_o = inner.clients[actor].tx.clone();
        let handle = spawn_match(
            challenger.to_string(),
            actor.to_string(),
            tx_x,
            tx_o,
            Arc::clone(self),
            Arc::clone(&self.history),
            permit,
        );

        inner.clients.get_mut(challenger).unwrap().in_match = Some(handle.match_id.clone());
        inner.clients.get_mut(actor).unwrap().in_match = Some(handle.match_id.clone());
        inner.matches.insert(handle.match_id.clone(), handle);
        Ok(())
    }

    /// Clears a client's match membership, called by a finishing match's
    /// cleanup callback for each participant.
    pub async fn clear_membership(&self, name: &str) {
        let mut inner = self.inner.write().await;
        if let Some(entry) = inner.clients.get_mut(name) {
            entry.in_match = None;
        }
    }

    pub async fn remove_match(&self, match_id: &str) {
        let mut inner = self.inner.write().await;
        inner.matches.remove(match_id);
    }

    pub async fn match_for(&self, name: &str) -> Option<MatchHandle> {
        let inner = self.inner.read().await;
        let entry = inner.clients.get(name)?;
        let mid = entry.in_match.as_ref()?;
        inner.matches.get(mid).cloned()
    }

    /// Sorted list of currently-connected names, for `user_list` sends
    /// and the observer interface.
    pub async fn connected_names(&self) -> Vec<String> {
        let inner = self.inner.read().await;
        let mut names: Vec<String> = inner.clients.keys().cloned().collect();
        names.sort();
        names
    }

    pub async fn live_matches(&self) -> Vec<MatchHandle> {
        let inner = self.inner.read().await;
        inner.matches.values().cloned().collect()
    }

    pub async fn get_match(&self, match_id: &str) -> Option<MatchHandle> {
        let inner = self.inner.read().await;
        inner.matches.get(match_id).cloned()
    }
}
