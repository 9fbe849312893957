//! Interactive terminal reference client. Not part of the authoritative
//! server (spec.md §1 scopes any graphical client out), but a thin
//! line-oriented harness for exercising a running `caro-server` by hand —
//! grounded on the teacher's `src/bin/client.rs` `tokio::select!` loop
//! racing server lines against stdin, generalized from the teacher's
//! space-delimited wire format to this crate's newline-JSON frames
//! (`caro_server::protocol`), and keeping the teacher's `Logger` for
//! operational tracing of sends/receives.

use std::fmt;
use std::io::{self, Write as _};

use caro_server::logger::Logger;
use caro_server::protocol::ClientFrame;
use caro_server::protocol::ServerFrame;
use clap::{ArgAction, Parser};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;

#[derive(Parser, Debug)]
#[command(
    name = "client",
    version,
    about = "caro-server terminal client",
    long_about = "Connects to a running caro-server and plays interactively.\n\
                  Commands:\n  \
                    login <name>\n  \
                    challenge <name>\n  \
                    accept <name>\n  \
                    move <x> <y>\n  \
                    chat <text>\n  \
                    timeout\n  \
                    quit"
)]
struct Args {
    /// Server address to connect to.
    #[arg(default_value = "127.0.0.1:7777")]
    addr: String,

    /// Increase output verbosity (-v verbose, -vv debug, -vvv trace).
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

enum ClientEvent<'a> {
    Connecting { addr: &'a str },
    Connected { addr: &'a str },
    Sending { line: &'a str },
    Received { line: &'a str },
    Disconnected,
}

impl fmt::Display for ClientEvent<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClientEvent::Connecting { addr } => write!(f, "Connecting to {addr}…"),
            ClientEvent::Connected { addr } => write!(f, "Connected to {addr}"),
            ClientEvent::Sending { line } => write!(f, "→ {line}"),
            ClientEvent::Received { line } => write!(f, "← {line}"),
            ClientEvent::Disconnected => write!(f, "Connection closed by server"),
        }
    }
}

/// Renders one server frame as a human-readable line. Every variant gets
/// a one-line rendering; unrecognised wire shapes (a newer server, say)
/// fall back to the raw JSON via `Received` logging rather than a panic.
fn render(frame: &ServerFrame) -> String {
    match frame {
        ServerFrame::LoginOk { users } => format!("logged in. online: {}", users.join(", ")),
        ServerFrame::UserList { users } => format!("online: {}", users.join(", ")),
        ServerFrame::ChallengeSent { to } => format!("challenge sent to {to}"),
        ServerFrame::Invite { from } => format!("{from} is challenging you — 'accept {from}' to play"),
        ServerFrame::MatchStart { you, opponent, size } => {
            format!("match started: you are {you} vs {opponent} on a {size}x{size} board")
        }
        ServerFrame::YourTurn { deadline } => format!("your turn — deadline (unix secs): {deadline}"),
        ServerFrame::MoveOk { x, y, symbol } => format!("move accepted: {symbol} at ({x}, {y})"),
        ServerFrame::OpponentMove { x, y, symbol } => {
            format!("opponent played {symbol} at ({x}, {y})")
        }
        ServerFrame::Highlight { cells, winner } => {
            format!("winning line for {winner}: {cells:?}")
        }
        ServerFrame::MatchEnd { result, reason, winner } => {
            format!("match over: result={result} reason={reason} winner={winner}")
        }
        ServerFrame::Chat { from, text } => format!("{from}: {text}"),
        ServerFrame::Error { msg } => format!("error: {msg}"),
    }
}

/// Parses one line typed by the player into a wire frame.
fn parse_command(raw: &str) -> Result<ClientFrame, String> {
    let mut t = raw.split_whitespace();
    match t.next().unwrap_or("").to_ascii_lowercase().as_str() {
        "login" => {
            let name = t.next().ok_or("usage: login <name>")?;
            Ok(ClientFrame::Login { name: name.to_string() })
        }
        "challenge" => {
            let opponent = t.next().ok_or("usage: challenge <name>")?;
            Ok(ClientFrame::Challenge { opponent: opponent.to_string() })
        }
        "accept" => {
            let opponent = t.next().ok_or("usage: accept <name>")?;
            Ok(ClientFrame::Accept { opponent: opponent.to_string() })
        }
        "move" => {
            let x = t.next().ok_or("usage: move <x> <y>")?;
            let y = t.next().ok_or("usage: move <x> <y>")?;
            let x: i64 = x.parse().map_err(|_| "x must be a whole number".to_string())?;
            let y: i64 = y.parse().map_err(|_| "y must be a whole number".to_string())?;
            Ok(ClientFrame::Move { x, y })
        }
        "timeout" => Ok(ClientFrame::Timeout),
        "chat" => {
            let rest: Vec<&str> = t.collect();
            if rest.is_empty() {
                return Err("usage: chat <text>".to_string());
            }
            Ok(ClientFrame::Chat { text: rest.join(" ") })
        }
        "" => Err("empty input".into()),
        kw => Err(format!("unknown command '{kw}' (try: login, challenge, accept, move, chat, timeout, quit)")),
    }
}

fn print_prompt() {
    print!("> ");
    io::stdout().flush().ok();
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    let log = Logger::new(args.verbose);

    log.info(ClientEvent::Connecting { addr: &args.addr });

    let stream = match TcpStream::connect(&args.addr).await {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Failed to connect to {}: {e}", args.addr);
            std::process::exit(1);
        }
    };

    log.info(ClientEvent::Connected { addr: &args.addr });

    let (reader, mut writer) = tokio::io::split(stream);
    let mut server_lines = BufReader::new(reader).lines();
    let mut stdin_lines = BufReader::new(tokio::io::stdin()).lines();

    print_prompt();

    loop {
        tokio::select! {
            result = server_lines.next_line() => {
                let raw = match result {
                    Ok(Some(l)) => l,
                    _ => {
                        log.info(ClientEvent::Disconnected);
                        println!("\nDisconnected from server.");
                        break;
                    }
                };
                log.trace(ClientEvent::Received { line: &raw });

                match serde_json::from_str::<ServerFrame>(&raw) {
                    Ok(frame) => println!("\n{}", render(&frame)),
                    Err(_) => println!("\n(unrecognised frame: {raw})"),
                }
                print_prompt();
            }

            result = stdin_lines.next_line() => {
                let raw = match result {
                    Ok(Some(l)) => l,
                    _ => {
                        println!("\nInput closed.");
                        break;
                    }
                };
                let trimmed = raw.trim();
                if trimmed.is_empty() {
                    print_prompt();
                    continue;
                }
                if matches!(trimmed.to_ascii_lowercase().as_str(), "quit" | "exit") {
                    break;
                }

                match parse_command(trimmed) {
                    Ok(frame) => {
                        let line = frame.to_line();
                        log.verbose(ClientEvent::Sending { line: &line });
                        if writer.write_all(format!("{line}\n").as_bytes()).await.is_err() {
                            eprintln!("Failed to send command.");
                            break;
                        }
                    }
                    Err(reason) => {
                        println!("  ? {reason}");
                        print_prompt();
                    }
                }
            }
        }
    }
}
