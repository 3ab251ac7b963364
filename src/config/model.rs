//! Configuration data model.
//!
//! All structs derive `Serialize`/`Deserialize` for TOML persistence and
//! every field has a default, so an empty file is a valid configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::nickname::generate_nickname;

/// Root client configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClientConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// The server to connect to and the identity to register with.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_nickname")]
    pub nickname: String,
    /// Display name sent with USER.
    #[serde(default = "default_realname")]
    pub realname: String,
    /// Channels joined once the server welcomes us.
    #[serde(default)]
    pub channels: Vec<String>,
    #[serde(default = "default_quit_message")]
    pub quit_message: String,
}

impl ServerConfig {
    /// `host:port`, as passed to the socket.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            nickname: default_nickname(),
            realname: default_realname(),
            channels: Vec::new(),
            quit_message: default_quit_message(),
        }
    }
}

/// Diagnostics and transcript settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default `tracing` filter; `RUST_LOG` takes precedence.
    #[serde(default = "default_level")]
    pub level: String,
    /// Write every received line to a daily transcript file.
    #[serde(default)]
    pub transcript: bool,
    #[serde(default = "default_transcript_dir")]
    pub transcript_dir: PathBuf,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            transcript: false,
            transcript_dir: default_transcript_dir(),
        }
    }
}

fn default_host() -> String {
    "irc.libera.chat".to_string()
}
fn default_port() -> u16 {
    6667
}
fn default_nickname() -> String {
    generate_nickname()
}
pub fn default_realname() -> String {
    "crabirc IRC client".to_string()
}
fn default_quit_message() -> String {
    "Leaving".to_string()
}
fn default_level() -> String {
    "info".to_string()
}
fn default_transcript_dir() -> PathBuf {
    PathBuf::from("~/.local/share/crabirc/logs")
}
