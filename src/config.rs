//! Process configuration.
//!
//! Everything is read from environment variables once at startup:
//! - `HOST` / `PORT` - bind address for the HTTP server (default `0.0.0.0:5000`)
//! - `KANBAN_DB_PATH` - embedded database file (default `kanban.db`)
//! - `STATUS_COMMAND` - command line run by the agent status probe

use std::path::PathBuf;

use anyhow::Context;

/// Default command used by the status probe.
pub const DEFAULT_STATUS_COMMAND: &str = "clawdbot sessions list --json";

/// Server configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    /// Path of the SQLite database file.
    pub db_path: PathBuf,
    /// Program and arguments for the status probe.
    pub status_command: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            db_path: PathBuf::from("kanban.db"),
            status_command: split_command(DEFAULT_STATUS_COMMAND),
        }
    }
}

impl Config {
    /// Load configuration from the environment, falling back to defaults.
    pub fn from_env() -> anyhow::Result<Self> {
        let defaults = Self::default();

        let host = std::env::var("HOST").unwrap_or(defaults.host);
        let port = match std::env::var("PORT") {
            Ok(raw) => raw
                .trim()
                .parse::<u16>()
                .with_context(|| format!("PORT must be a valid port number, got {:?}", raw))?,
            Err(_) => defaults.port,
        };
        let db_path = std::env::var("KANBAN_DB_PATH")
            .map(PathBuf::from)
            .unwrap_or(defaults.db_path);
        let status_command = std::env::var("STATUS_COMMAND")
            .ok()
            .map(|raw| split_command(&raw))
            .filter(|parts| !parts.is_empty())
            .unwrap_or(defaults.status_command);

        Ok(Self {
            host,
            port,
            db_path,
            status_command,
        })
    }

    /// Address string suitable for `TcpListener::bind`.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn split_command(raw: &str) -> Vec<String> {
    raw.split_whitespace().map(str::to_string).collect()
}
