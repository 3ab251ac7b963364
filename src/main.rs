mod app;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};

use crabirc::config;
use crabirc::irc::{Connection, ConnectionState};
use crabirc::logging::{self, Transcript};

use crate::app::App;

/// Capacity of the terminal's listener queue.
const INCOMING_CAPACITY: usize = 256;

#[derive(Debug, Parser)]
#[command(name = "crabirc", version, about = "A minimal IRC client")]
struct Cli {
    /// Config file (default: <config dir>/crabirc/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Server as host or host:port
    #[arg(short, long)]
    server: Option<String>,

    /// Nickname to register
    #[arg(short, long)]
    nick: Option<String>,

    /// Channel to join after registration (repeatable)
    #[arg(short, long = "join")]
    join: Vec<String>,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let code = match run_client(cli).await {
        Ok(()) => 0,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            1
        }
    };
    // Exit directly: the blocking stdin reader would otherwise hold the
    // runtime open until the next keypress.
    std::process::exit(code);
}

async fn run_client(cli: Cli) -> Result<()> {
    let mut cfg = config::load_config(cli.config.as_deref())?;

    if let Some(server) = cli.server {
        match server.rsplit_once(':') {
            Some((host, port)) => {
                cfg.server.host = host.to_string();
                cfg.server.port = port
                    .parse()
                    .with_context(|| format!("Invalid port in {}", server))?;
            }
            None => cfg.server.host = server,
        }
    }
    if let Some(nick) = cli.nick {
        cfg.server.nickname = nick;
    }
    cfg.server.channels.extend(cli.join);

    logging::init(&cfg.logging.level);

    let conn = Arc::new(Connection::from_config(&cfg.server));
    let incoming = conn.subscribe(INCOMING_CAPACITY);
    let transcript = cfg.logging.transcript.then(|| {
        Transcript::new(&cfg.logging.transcript_dir, &cfg.server.address())
            .spawn(conn.subscribe(INCOMING_CAPACITY))
    });

    conn.connect()
        .await
        .with_context(|| format!("Failed to connect to {}", conn.address()))?;
    info!(address = %conn.address(), nick = %conn.nickname(), "registered");

    let result = App::new(cfg.server.clone(), Arc::clone(&conn)).run(incoming).await;

    if conn.state() == ConnectionState::Connected {
        if let Err(e) = conn.close().await {
            warn!(error = %e, "error while closing connection");
        }
    }
    // The transcript queue ends with the connection.
    if let Some(handle) = transcript {
        if let Err(e) = handle.await {
            warn!(error = %e, "transcript task panicked");
        }
    }

    result
}
