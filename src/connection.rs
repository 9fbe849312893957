//! Per-connection protocol state machine (spec.md §4.5). Grounded on
//! `other_examples/1f18090f_seanchen1991-sidestacker`'s `process` loop: a
//! `Framed<TcpStream, LinesCodec>` raced against an `mpsc::UnboundedReceiver`
//! of outbound frames via `tokio::select!`, generalized from a fixed two-
//! peer game to login → lobby → match dispatch with three explicit
//! states (Unauthenticated, Authenticated, Closing).

use std::sync::Arc;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_util::codec::{Framed, LinesCodec};
use tracing::{info, warn};

use crate::client::RateLimiter;
use crate::lobby::Lobby;
use crate::protocol::{ClientFrame, ServerFrame, MAX_CHAT_LEN, RATE_LIMIT_PENALTY_SECS};

type Transport = Framed<TcpStream, LinesCodec>;

/// Drives one accepted TCP connection end to end: login negotiation,
/// then frame dispatch until the socket closes. Never panics — every
/// protocol-level failure is surfaced as an `"error"` frame or a clean
/// close per spec.md §7.
pub async fn handle_connection(stream: TcpStream, lobby: Arc<Lobby>) {
    let peer_addr = stream.peer_addr().ok();
    let mut transport = Framed::new(stream, LinesCodec::new());
    let (tx, mut rx) = mpsc::unbounded_channel::<ServerFrame>();

    let name = match authenticate(&mut transport, &lobby, tx).await {
        Some(name) => name,
        None => return,
    };
    info!(name, ?peer_addr, "client authenticated");

    let mut limiter = RateLimiter::new();

    loop {
        tokio::select! {
            outbound = rx.recv() => {
                match outbound {
                    Some(frame) => {
                        if transport.send(frame.to_line()).await.is_err() {
                            break;
                        }
                    }
                    None => break, // sender side is gone; nothing more to deliver
                }
            }
            inbound = transport.next() => {
                match inbound {
                    Some(Ok(line)) => {
                        if limiter.record() {
                            let _ = transport.send(ServerFrame::error("Rate limit exceeded").to_line()).await;
                            tokio::time::sleep(Duration::from_secs_f64(RATE_LIMIT_PENALTY_SECS)).await;
                        }
                        match dispatch(&line, &name, &lobby).await {
                            DispatchOutcome::Continue(Some(frame)) => {
                                if transport.send(frame.to_line()).await.is_err() {
                                    break;
                                }
                            }
                            DispatchOutcome::Continue(None) => {}
                            DispatchOutcome::Close(frame) => {
                                let _ = transport.send(frame.to_line()).await;
                                break;
                            }
                        }
                    }
                    Some(Err(e)) => {
                        warn!(name, error = %e, "transport error");
                        break;
                    }
                    None => break, // EOF
                }
            }
        }
    }

    close(&name, &lobby).await;
}

/// Unauthenticated state: the only accepted frame is `login`. Returns
/// the trimmed, validated name on success, or `None` if the connection
/// should be dropped (already sent whatever error/close frame applies).
async fn authenticate(
    transport: &mut Transport,
    lobby: &Arc<Lobby>,
    tx: mpsc::UnboundedSender<ServerFrame>,
) -> Option<String> {
    let line = match transport.next().await {
        Some(Ok(line)) => line,
        _ => return None,
    };

    let frame: Result<ClientFrame, _> = serde_json::from_str(&line);
    let name = match frame {
        Ok(ClientFrame::Login { name }) => name,
        _ => {
            let _ = transport.send(ServerFrame::error("Must login first").to_line()).await;
            return None;
        }
    };

    match lobby.login(&name, tx).await {
        Ok(users) => {
            let _ = transport.send(ServerFrame::LoginOk { users }.to_line()).await;
            Some(name.trim().to_string())
        }
        Err(e) => {
            let _ = transport.send(ServerFrame::error(e.to_string()).to_line()).await;
            None
        }
    }
}

/// Result of dispatching one inbound frame.
enum DispatchOutcome {
    /// Stay open; optionally write one `error` frame back.
    Continue(Option<ServerFrame>),
    /// Write this frame, then close the connection (malformed frame,
    /// spec.md §7).
    Close(ServerFrame),
}

/// Authenticated state: dispatches one decoded inbound line.
///
/// A frame with no JSON object / no "type" string is malformed and
/// closes the connection (spec.md §7). A frame whose "type" is present
/// but unrecognised — or whose fields don't match that type's shape —
/// is merely an "unknown type"/bad-request error and stays open
/// (spec.md §4.5); the two cases are distinguished by first checking
/// for a "type" field before attempting the full tagged-enum parse.
async fn dispatch(line: &str, name: &str, lobby: &Arc<Lobby>) -> DispatchOutcome {
    let has_type_field = serde_json::from_str::<serde_json::Value>(line)
        .ok()
        .and_then(|v| v.get("type").and_then(|t| t.as_str().map(str::to_string)))
        .is_some();
    if !has_type_field {
        return DispatchOutcome::Close(ServerFrame::error("malformed frame"));
    }

    let frame: Result<ClientFrame, _> = serde_json::from_str(line);
    let frame = match frame {
        Ok(f) => f,
        Err(_) => return DispatchOutcome::Continue(Some(ServerFrame::error("unknown type"))),
    };

    let reply = match frame {
        ClientFrame::Login { .. } => Some(ServerFrame::error("already logged in")),
        ClientFrame::Challenge { opponent } => lobby
            .challenge(name, &opponent)
            .await
            .err()
            .map(|e| ServerFrame::error(e.to_string())),
        ClientFrame::Accept { opponent } => lobby
            .accept(name, &opponent)
            .await
            .err()
            .map(|e| ServerFrame::error(e.to_string())),
        ClientFrame::Move { x, y } => match lobby.match_for(name).await {
            Some(handle) => handle
                .apply_move(name.to_string(), x, y)
                .err()
                .map(|e| ServerFrame::error(e.to_string())),
            None => Some(ServerFrame::error("not in a match")),
        },
        ClientFrame::Timeout => match lobby.match_for(name).await {
            Some(handle) => handle
                .on_client_timeout(name.to_string())
                .err()
                .map(|e| ServerFrame::error(e.to_string())),
            None => Some(ServerFrame::error("not in a match")),
        },
        ClientFrame::Chat { text } => {
            let trimmed = text.trim();
            if !trimmed.is_empty() && trimmed.len() <= MAX_CHAT_LEN {
                if let Some(handle) = lobby.match_for(name).await {
                    handle.relay_chat(name.to_string(), trimmed.to_string());
                }
            }
            // Empty or over-length chat is silently dropped per spec.md §7.
            None
        }
    };
    DispatchOutcome::Continue(reply)
}

async fn close(name: &str, lobby: &Arc<Lobby>) {
    if let Some(handle) = lobby.logout(name).await {
        handle.on_disconnect(name.to_string());
    }
}
