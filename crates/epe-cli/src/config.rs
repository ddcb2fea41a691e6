// crates/epe-cli/src/config.rs
//
// CLI configuration for the Edition Production Environment.
// Loaded from a TOML file or populated with defaults.

use serde::Deserialize;
use std::fs;
use std::path::PathBuf;

/// Default location of the configuration file.
pub const DEFAULT_CONFIG_PATH: &str = "~/.epe/config.toml";

/// Runtime configuration for the `epe` binary.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CliConfig {
    /// Base URL of the remote witness store.
    #[serde(default = "default_remote_url")]
    pub remote_url: String,

    /// Timeout applied to each remote request, in seconds.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Tokenization pattern used when `--pattern` is not given.
    #[serde(default = "default_pattern")]
    pub default_pattern: String,

    /// Title written into the markup header.
    #[serde(default = "default_edition_title")]
    pub edition_title: String,

    /// Directory that receives `edition.xml` / `edition.json`.
    #[serde(default = "default_output_dir")]
    pub output_dir: String,

    /// Log level: "trace", "debug", "info", "warn", "error".
    /// `RUST_LOG` takes precedence when set.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_remote_url() -> String {
    "http://127.0.0.1:8000".to_string()
}

fn default_request_timeout_secs() -> u64 {
    10
}

fn default_pattern() -> String {
    epe_core::DEFAULT_PATTERN.to_string()
}

fn default_edition_title() -> String {
    "Untitled Edition".to_string()
}

fn default_output_dir() -> String {
    ".".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            remote_url: default_remote_url(),
            request_timeout_secs: default_request_timeout_secs(),
            default_pattern: default_pattern(),
            edition_title: default_edition_title(),
            output_dir: default_output_dir(),
            log_level: default_log_level(),
        }
    }
}

impl CliConfig {
    /// Load configuration from a TOML file at the given path (`~` is expanded).
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let contents = fs::read_to_string(expand_tilde(path))?;
        let config: CliConfig = toml::from_str(&contents)?;
        Ok(config)
    }

    pub fn output_dir(&self) -> PathBuf {
        expand_tilde(&self.output_dir)
    }
}

/// Expand a leading `~/` to the user's home directory.
pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}
