//! CLI argument definitions for the ShopBot binary.
//!
//! Priority resolution: CLI args > env vars > config file > defaults.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// ShopBot: a conversational shopping assistant server and client.
#[derive(Parser, Debug)]
#[command(name = "shopbot", version, about)]
pub struct CliArgs {
    /// Path to the configuration file.
    #[arg(short = 'c', long = "config", global = true)]
    pub config: Option<PathBuf>,

    /// Server port.
    #[arg(short = 'p', long = "port", global = true)]
    pub port: Option<u16>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short = 'l', long = "log-level", global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Run the HTTP and WebSocket server (default).
    Serve,
    /// Open a session against a running server and send one utterance.
    Ask {
        /// What to say to the assistant.
        text: String,

        /// Name the assistant addresses you by.
        #[arg(short = 'u', long = "user", default_value = "Guest")]
        user_name: String,

        /// Agent persona name.
        #[arg(short = 'a', long = "agent", default_value = "ShopBot")]
        agent_name: String,

        /// Server base URL. Defaults to the configured host and port.
        #[arg(short = 's', long = "server")]
        server: Option<String>,
    },
}

impl CliArgs {
    /// Resolve the configuration file path.
    ///
    /// Priority: --config flag > SHOPBOT_CONFIG env var > ~/.shopbot/config.toml.
    pub fn resolve_config_path(&self) -> PathBuf {
        if let Some(ref p) = self.config {
            return p.clone();
        }
        if let Ok(p) = std::env::var("SHOPBOT_CONFIG") {
            return PathBuf::from(p);
        }
        default_config_path()
    }

    /// Resolve the server port.
    ///
    /// Priority: --port flag > SHOPBOT_PORT env var > config file value > 4000.
    pub fn resolve_port(&self, config_port: u16) -> u16 {
        if let Some(p) = self.port {
            return p;
        }
        if let Ok(val) = std::env::var("SHOPBOT_PORT") {
            if let Ok(p) = val.parse::<u16>() {
                return p;
            }
        }
        if config_port != 0 {
            return config_port;
        }
        4000
    }

    /// Resolve the LLM API key: SHOPBOT_LLM_API_KEY env var > config file value.
    pub fn resolve_api_key(&self, config_key: &str) -> String {
        match std::env::var("SHOPBOT_LLM_API_KEY") {
            Ok(key) if !key.trim().is_empty() => key,
            _ => config_key.to_string(),
        }
    }

    /// Resolve the log level: --log-level flag > config file value.
    pub fn resolve_log_level(&self, config_level: &str) -> String {
        self.log_level
            .clone()
            .unwrap_or_else(|| config_level.to_string())
    }

    pub fn command(&self) -> Command {
        self.command.clone().unwrap_or(Command::Serve)
    }
}

/// Default config file path for the current platform.
fn default_config_path() -> PathBuf {
    #[cfg(target_os = "windows")]
    if let Ok(home) = std::env::var("USERPROFILE") {
        return PathBuf::from(home).join(".shopbot").join("config.toml");
    }
    #[cfg(not(target_os = "windows"))]
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".shopbot").join("config.toml");
    }
    PathBuf::from("config.toml")
}
