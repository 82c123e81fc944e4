//! Process configuration.
//!
//! Loaded once at startup from a TOML file with env-var fallbacks.
//! Transport credentials and logging knobs live here; per-cycle display
//! preferences are a separate value handed to each session, so the
//! `[display]` section only supplies process-wide defaults.

use serde::Deserialize;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;

use lr_protocol::DisplayPreferences;

const DEFAULT_BASE_URL: &str = "http://localhost:8283";

#[derive(Debug, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub letta: LettaConfig,
    pub log: LogConfig,
    pub display: DisplayConfig,
}

#[derive(Debug, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct LettaConfig {
    /// Base URL of the Letta server. Falls back to LETTA_BASE_URL.
    pub base_url: Option<String>,
    /// Agent to talk to. Falls back to LETTA_AGENT_ID.
    pub agent_id: Option<String>,
    /// Command to run to get the password (run via `sh -c`).
    /// Falls back to LETTA_PASSWORD.
    pub password_cmd: Option<String>,
}

impl LettaConfig {
    pub fn resolve_base_url(&self) -> String {
        self.base_url
            .clone()
            .or_else(|| std::env::var("LETTA_BASE_URL").ok())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
    }

    pub fn resolve_agent_id(&self) -> io::Result<String> {
        self.agent_id
            .clone()
            .or_else(|| std::env::var("LETTA_AGENT_ID").ok())
            .filter(|id| !id.is_empty())
            .ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::NotFound,
                    "LETTA_AGENT_ID not set and no agent_id configured",
                )
            })
    }

    /// Resolve the password from password_cmd or the LETTA_PASSWORD env var.
    pub fn resolve_password(&self) -> io::Result<String> {
        if let Some(cmd) = &self.password_cmd {
            let output = Command::new("sh").arg("-c").arg(cmd).output()?;

            if output.status.success() {
                let password = String::from_utf8_lossy(&output.stdout).trim().to_string();
                if !password.is_empty() {
                    return Ok(password);
                }
            }
        }

        std::env::var("LETTA_PASSWORD").map_err(|_| {
            io::Error::new(
                io::ErrorKind::NotFound,
                "LETTA_PASSWORD not set and no password_cmd configured",
            )
        })
    }
}

#[derive(Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct LogConfig {
    /// Print request/response detail to stderr.
    pub dev_mode: bool,
    /// Append raw and parsed messages to the response log.
    pub save_responses: bool,
    /// Custom response log path. Defaults to
    /// ~/.local/share/letta-relay/responses.jsonl.
    pub response_log_path: Option<String>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            dev_mode: false,
            save_responses: false,
            response_log_path: None,
        }
    }
}

impl LogConfig {
    /// Resolve the response log path, using the configured path or the
    /// XDG default.
    pub fn resolve_log_path(&self) -> PathBuf {
        if let Some(ref custom) = self.response_log_path {
            return PathBuf::from(custom);
        }

        let base = std::env::var("XDG_DATA_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| {
                let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
                PathBuf::from(home).join(".local").join("share")
            });
        base.join("letta-relay").join("responses.jsonl")
    }
}

/// Process-wide defaults for display preferences. A user's own flags are
/// combined with these by AND at cycle start.
#[derive(Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct DisplayConfig {
    pub display_events: bool,
    pub show_reasoning: bool,
    pub show_usage_stats: bool,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            display_events: true,
            show_reasoning: true,
            show_usage_stats: true,
        }
    }
}

impl DisplayConfig {
    pub fn to_preferences(&self) -> DisplayPreferences {
        DisplayPreferences {
            display_events: self.display_events,
            show_reasoning: self.show_reasoning,
            show_usage_stats: self.show_usage_stats,
        }
    }
}

impl Config {
    pub fn load_or_default() -> Self {
        Self::load_from(&config_path())
    }

    pub fn load_from(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(contents) => toml::from_str(&contents).unwrap_or_else(|e| {
                eprintln!("warning: failed to parse {}: {e}", path.display());
                Config::default()
            }),
            Err(_) => Config::default(),
        }
    }
}

fn config_path() -> PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
            PathBuf::from(home).join(".config")
        });
    base.join("letta-relay").join("config.toml")
}
