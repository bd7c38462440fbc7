//! CLI argument definitions for the maitre binary.
//!
//! Priority resolution: CLI args > env vars > config file > defaults.

use clap::Parser;
use std::path::PathBuf;

use maitre_core::config::MaitreConfig;

/// maitre - a conversational booking assistant for a single restaurant.
#[derive(Parser, Debug, Default)]
#[command(name = "maitre", version, about)]
pub struct CliArgs {
    /// Path to the configuration file.
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,

    /// Interface to bind the chat server to.
    #[arg(long = "host")]
    pub host: Option<String>,

    /// Chat server port.
    #[arg(short = 'p', long = "port")]
    pub port: Option<u16>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short = 'l', long = "log-level")]
    pub log_level: Option<String>,

    /// Base URL of the reservation service.
    #[arg(long = "booking-url")]
    pub booking_url: Option<String>,

    /// Base URL of the Ollama server.
    #[arg(long = "llm-url")]
    pub llm_url: Option<String>,

    /// Model name to request from Ollama.
    #[arg(long = "model")]
    pub model: Option<String>,
}

impl CliArgs {
    /// Resolve the configuration file path.
    ///
    /// Priority: --config flag > MAITRE_CONFIG env var > ~/.maitre/config.toml.
    pub fn resolve_config_path(&self) -> PathBuf {
        self.resolve_config_path_with(|key| std::env::var(key).ok())
    }

    fn resolve_config_path_with(&self, env: impl Fn(&str) -> Option<String>) -> PathBuf {
        if let Some(ref p) = self.config {
            return p.clone();
        }
        if let Some(p) = env("MAITRE_CONFIG") {
            return PathBuf::from(p);
        }
        default_config_path()
    }

    /// Apply flag and environment overrides on top of the loaded config.
    pub fn apply(&self, config: &mut MaitreConfig) {
        self.apply_with(config, |key| std::env::var(key).ok());
    }

    fn apply_with(&self, config: &mut MaitreConfig, env: impl Fn(&str) -> Option<String>) {
        if let Some(ref host) = self.host {
            config.server.host = host.clone();
        }
        config.server.port = self.resolve_port(config.server.port, &env);

        if let Some(ref level) = self.log_level {
            config.logging.level = level.clone();
        }
        if let Some(ref url) = self.booking_url {
            config.booking.base_url = url.clone();
        }
        if let Some(ref url) = self.llm_url {
            config.llm.base_url = url.clone();
        }
        if let Some(ref model) = self.model {
            config.llm.model = model.clone();
        }

        // The token is never taken from the command line.
        if let Some(token) = env("MAITRE_BOOKING_TOKEN").filter(|t| !t.is_empty()) {
            config.booking.bearer_token = token;
        }
    }

    /// Priority: --port flag > MAITRE_PORT env var > config file value > 8000.
    fn resolve_port(&self, config_port: u16, env: &impl Fn(&str) -> Option<String>) -> u16 {
        if let Some(p) = self.port {
            return p;
        }
        if let Some(p) = env("MAITRE_PORT").and_then(|v| v.parse::<u16>().ok()) {
            return p;
        }
        if config_port != 0 {
            return config_port;
        }
        8000
    }
}

/// Default config file path for the current platform.
fn default_config_path() -> PathBuf {
    #[cfg(target_os = "windows")]
    if let Ok(home) = std::env::var("USERPROFILE") {
        return PathBuf::from(home).join(".maitre").join("config.toml");
    }
    #[cfg(not(target_os = "windows"))]
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".maitre").join("config.toml");
    }
    PathBuf::from("config.toml")
}
