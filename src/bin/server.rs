use std::sync::Arc;

use caro_server::config::Args;
use caro_server::connection::handle_connection;
use caro_server::history::HistoryStore;
use caro_server::lobby::Lobby;
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let args = Args::load();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(args.log_directive()));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let history = match HistoryStore::open(&args.db_path) {
        Ok(store) => Arc::new(store),
        Err(e) => {
            error!(error = %e, db_path = %args.db_path, "failed to open history store");
            std::process::exit(1);
        }
    };

    let lobby = Lobby::new(history, args.max_matches);
    tokio::spawn(Arc::clone(&lobby).run_broadcast_loop());

    let listener = match TcpListener::bind(&args.bind).await {
        Ok(listener) => listener,
        Err(e) => {
            error!(error = %e, bind = %args.bind, "failed to bind");
            std::process::exit(1);
        }
    };
    info!(bind = %args.bind, max_matches = args.max_matches, "caro-server listening");

    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                let lobby = Arc::clone(&lobby);
                tokio::spawn(async move {
                    handle_connection(stream, lobby).await;
                });
                info!(%addr, "accepted connection");
            }
            Err(e) => {
                warn!(error = %e, "accept error");
            }
        }
    }
}
