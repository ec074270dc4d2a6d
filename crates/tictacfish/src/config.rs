//! Process configuration for an actor system.

use crate::players::BotDifficulty;
use derive_getters::Getters;
use derive_more::{Display, Error};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tictacfish_game::CharacterTeam;
use tracing::{debug, info, instrument};

/// Configuration shared by every role of a tic-tac-fish process.
#[derive(Debug, Clone, Getters, Serialize, Deserialize)]
pub struct SystemConfig {
    /// Host to listen on (server) or connect to (client).
    #[serde(default = "default_host")]
    host: String,

    /// Port to listen on (server) or connect to (client).
    #[serde(default = "default_port")]
    port: u16,

    /// Upper bound on how long a remote call may wait for its response.
    #[serde(default = "default_call_timeout_ms")]
    call_timeout_ms: u64,

    /// Largest frame accepted from or sent to a peer.
    #[serde(default = "default_max_frame_bytes")]
    max_frame_bytes: usize,

    /// Known peers (`host:port`) to dial in local-network mode.
    #[serde(default)]
    peers: Vec<String>,

    /// Team played by server-side bots.
    #[serde(default = "default_bot_team")]
    bot_team: CharacterTeam,

    /// Strategy used by bots created in this process.
    #[serde(default)]
    bot_difficulty: BotDifficulty,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8888
}

fn default_call_timeout_ms() -> u64 {
    30_000
}

fn default_max_frame_bytes() -> usize {
    64 * 1024
}

fn default_bot_team() -> CharacterTeam {
    CharacterTeam::Rodents
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            call_timeout_ms: default_call_timeout_ms(),
            max_frame_bytes: default_max_frame_bytes(),
            peers: Vec::new(),
            bot_team: default_bot_team(),
            bot_difficulty: BotDifficulty::default(),
        }
    }
}

impl SystemConfig {
    /// Loads configuration from a TOML file.
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        debug!("Loading config from file");
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::new(format!("Failed to read config file: {}", e)))?;
        let config = Self::from_toml(&content)?;
        info!(host = %config.host, port = config.port, "Config loaded successfully");
        Ok(config)
    }

    /// Loads from `path` if it exists, otherwise returns defaults.
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        if path.as_ref().exists() {
            Self::from_file(path)
        } else {
            info!("Config file not found, using defaults");
            Ok(Self::default())
        }
    }

    /// Parses configuration from TOML text.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::new(format!("Failed to parse config: {}", e)))
    }

    /// Overrides the host and port.
    pub fn with_address(mut self, host: impl Into<String>, port: u16) -> Self {
        self.host = host.into();
        self.port = port;
        self
    }

    /// Overrides the call timeout.
    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Overrides the largest frame accepted or sent.
    pub fn with_max_frame_bytes(mut self, max_frame_bytes: usize) -> Self {
        self.max_frame_bytes = max_frame_bytes;
        self
    }

    /// Overrides the local-network peer list.
    pub fn with_peers(mut self, peers: Vec<String>) -> Self {
        self.peers = peers;
        self
    }

    /// Call timeout as a [`Duration`].
    pub fn call_timeout(&self) -> Duration {
        Duration::from_millis(self.call_timeout_ms)
    }

    /// `host:port` form of the configured address.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Configuration error.
#[derive(Debug, Clone, Display, Error)]
#[display("Config error: {} at {}:{}", message, file, line)]
pub struct ConfigError {
    /// Error message.
    pub message: String,
    /// Line number where error occurred.
    pub line: u32,
    /// Source file where error occurred.
    pub file: &'static str,
}

impl ConfigError {
    /// Creates a new configuration error.
    #[track_caller]
    pub fn new(message: String) -> Self {
        let loc = std::panic::Location::caller();
        Self {
            message,
            line: loc.line(),
            file: loc.file(),
        }
    }
}
