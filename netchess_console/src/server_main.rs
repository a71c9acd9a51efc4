use std::net::TcpListener;

use anyhow::Context;
use log::{error, info, warn};
use netchess::matchmaking::GamePool;

use crate::server_config::ServerConfig;


pub fn run(config: ServerConfig) -> anyhow::Result<()> {
    let listener = TcpListener::bind(("0.0.0.0", config.port))
        .with_context(|| format!("Cannot listen on port {}", config.port))?;
    info!("Starting chess server on {}", listener.local_addr()?);
    if let Some(timeout) = config.idle_timeout {
        info!("Idle players are dropped after {timeout:?}");
    }

    ctrlc::set_handler(|| {
        info!("Shutting down");
        std::process::exit(0);
    })
    .context("Cannot install Ctrl+C handler")?;

    let pool = GamePool::new(config.peer_options());
    for stream in listener.incoming() {
        match stream {
            Ok(stream) => {
                // Sessions run detached; they log their own outcome.
                if let Err(err) = pool.handle_incoming_player(stream) {
                    warn!("Cannot accept player: {err}");
                }
            }
            Err(err) => error!("Accept failed: {err}"),
        }
    }
    Ok(())
}
