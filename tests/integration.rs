//! Wire-level integration tests: a real `TcpStream` driving the
//! newline-JSON protocol end to end against an in-process server,
//! covering the concrete scenarios from spec.md §8 that a unit test
//! talking to `Lobby`/`MatchHandle` directly can't exercise (login
//! negotiation, connection close on bad frames, presence broadcast,
//! disconnect-triggered forfeit observed from the surviving socket).

mod support;

use support::{spawn_server, TestClient};

#[tokio::test]
async fn login_ok_lists_everyone_then_broadcasts_presence() {
    let addr = spawn_server().await;
    let mut a = TestClient::connect(addr).await;
    let reply = a.login("A").await;
    assert_eq!(reply["type"], "login_ok");
    assert_eq!(reply["users"], serde_json::json!(["A"]));

    let mut b = TestClient::connect(addr).await;
    let reply = b.login("B").await;
    assert_eq!(reply["type"], "login_ok");
    let mut users: Vec<String> =
        reply["users"].as_array().unwrap().iter().map(|v| v.as_str().unwrap().to_string()).collect();
    users.sort();
    assert_eq!(users, vec!["A", "B"]);

    // A's presence broadcast should include both names once the debounce
    // window (100ms) has elapsed.
    let broadcast = a.recv().await;
    assert_eq!(broadcast["type"], "user_list");
    let mut users: Vec<String> = broadcast["users"]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v.as_str().unwrap().to_string())
        .collect();
    users.sort();
    assert_eq!(users, vec!["A", "B"]);
}

#[tokio::test]
async fn duplicate_name_is_rejected_and_connection_closes() {
    let addr = spawn_server().await;
    let mut a = TestClient::connect(addr).await;
    assert_eq!(a.login("A").await["type"], "login_ok");

    let mut dup = TestClient::connect(addr).await;
    let reply = dup.login("A").await;
    assert_eq!(reply["type"], "error");
    assert_eq!(reply["msg"], "Name already in use");

    // The server closes the connection after the error.
    dup.expect_closed().await;
}

#[tokio::test]
async fn challenge_accept_produces_match_start_then_your_turn() {
    let addr = spawn_server().await;
    let mut a = TestClient::connect(addr).await;
    let mut b = TestClient::connect(addr).await;
    a.login("A").await;
    b.login("B").await;

    a.send(serde_json::json!({"type": "challenge", "opponent": "B"})).await;
    let invite = b.recv().await;
    assert_eq!(invite["type"], "invite");
    assert_eq!(invite["from"], "A");
    let sent = a.recv().await;
    assert_eq!(sent["type"], "challenge_sent");
    assert_eq!(sent["to"], "B");

    b.send(serde_json::json!({"type": "accept", "opponent": "A"})).await;

    let start_a = a.recv().await;
    assert_eq!(start_a["type"], "match_start");
    assert_eq!(start_a["you"], "X");
    assert_eq!(start_a["opponent"], "B");
    assert_eq!(start_a["size"], 15);

    let start_b = b.recv().await;
    assert_eq!(start_b["type"], "match_start");
    assert_eq!(start_b["you"], "O");
    assert_eq!(start_b["opponent"], "A");

    let your_turn = a.recv().await;
    assert_eq!(your_turn["type"], "your_turn");
    assert!(your_turn["deadline"].as_i64().unwrap() > 0);
}

#[tokio::test]
async fn challenging_a_player_already_in_a_match_is_rejected() {
    let addr = spawn_server().await;
    let mut a = TestClient::connect(addr).await;
    let mut b = TestClient::connect(addr).await;
    let mut c = TestClient::connect(addr).await;
    a.login("A").await;
    b.login("B").await;
    c.login("C").await;

    a.send(serde_json::json!({"type": "challenge", "opponent": "B"})).await;
    b.recv().await; // invite
    a.recv().await; // challenge_sent
    b.send(serde_json::json!({"type": "accept", "opponent": "A"})).await;
    a.recv().await; // match_start
    b.recv().await; // match_start
    a.recv().await; // your_turn

    c.send(serde_json::json!({"type": "challenge", "opponent": "A"})).await;
    let reply = c.recv().await;
    assert_eq!(reply["type"], "error");
}

#[tokio::test]
async fn moves_relay_to_the_opponent_and_chat_relays_too() {
    let addr = spawn_server().await;
    let mut a = TestClient::connect(addr).await;
    let mut b = TestClient::connect(addr).await;
    a.login("A").await;
    b.login("B").await;
    a.send(serde_json::json!({"type": "challenge", "opponent": "B"})).await;
    b.recv().await;
    a.recv().await;
    b.send(serde_json::json!({"type": "accept", "opponent": "A"})).await;
    a.recv().await; // match_start
    b.recv().await; // match_start
    a.recv().await; // your_turn

    a.send(serde_json::json!({"type": "move", "x": 7, "y": 7})).await;
    let move_ok = a.recv().await;
    assert_eq!(move_ok["type"], "move_ok");
    assert_eq!(move_ok["x"], 7);
    assert_eq!(move_ok["symbol"], "X");

    let opp_move = b.recv().await;
    assert_eq!(opp_move["type"], "opponent_move");
    assert_eq!(opp_move["y"], 7);

    let b_turn = b.recv().await;
    assert_eq!(b_turn["type"], "your_turn");

    b.send(serde_json::json!({"type": "chat", "text": "nice move"})).await;
    let chat = a.recv().await;
    assert_eq!(chat["type"], "chat");
    assert_eq!(chat["from"], "B");
    assert_eq!(chat["text"], "nice move");
}

#[tokio::test]
async fn disconnect_mid_match_forfeits_to_the_remaining_player() {
    let addr = spawn_server().await;
    let mut a = TestClient::connect(addr).await;
    let mut b = TestClient::connect(addr).await;
    a.login("A").await;
    b.login("B").await;
    a.send(serde_json::json!({"type": "challenge", "opponent": "B"})).await;
    b.recv().await;
    a.recv().await;
    b.send(serde_json::json!({"type": "accept", "opponent": "A"})).await;
    a.recv().await; // match_start
    b.recv().await; // match_start
    a.recv().await; // your_turn

    drop(a);

    let end = b.recv().await;
    assert_eq!(end["type"], "match_end");
    assert_eq!(end["result"], "win");
    assert_eq!(end["reason"], "disconnect");
}

#[tokio::test]
async fn unknown_frame_type_is_a_soft_error_connection_stays_open() {
    let addr = spawn_server().await;
    let mut a = TestClient::connect(addr).await;
    a.login("A").await;

    a.send(serde_json::json!({"type": "frobnicate"})).await;
    let reply = a.recv().await;
    assert_eq!(reply["type"], "error");

    // The connection is still usable afterwards.
    a.send(serde_json::json!({"type": "challenge", "opponent": "ghost"})).await;
    let reply = a.recv().await;
    assert_eq!(reply["type"], "error");
}
