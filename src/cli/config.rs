use std::time::Duration;

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};

use crate::background::service::{BackgroundConfig, DEFAULT_PLATFORM};
use crate::navigation::coordinator::BANNER_TIMEOUT;
use crate::navigation::delivery::{DEFAULT_RETRY_DELAY, RetryPolicy};
use crate::registry::registry_model::IdStyle;

// ============================================================================
// CLI Argument Parsing (clap derive)
// ============================================================================

#[derive(Parser, Debug)]
#[command(
    name = "journey-capture",
    version,
    about = "Record user journeys as page and element graphs with stable IDs"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to config file (default: journey-capture.yaml in current dir)
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// Durable state file
    #[arg(long, global = true)]
    pub store: Option<String>,

    /// Platform key to operate on
    #[arg(long, global = true)]
    pub platform: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Replay a YAML journey script through the capture pipeline
    Replay {
        /// Path to the journey script
        #[arg(long)]
        script: String,

        /// Write the resulting export as JSON (default: print a summary)
        #[arg(short, long)]
        output: Option<String>,
    },

    /// Export the platform's captured journey and all ID registries
    Export {
        /// Output file path (default: stdout)
        #[arg(short, long)]
        output: Option<String>,
    },

    /// Import ID registries from an export file or a bare registry map
    Import {
        #[arg(long)]
        input: String,
    },

    /// Reset the ID registry of a platform
    Reset {
        /// Also clear the capture session and recorded pages/elements
        #[arg(long, default_value_t = false)]
        session: bool,
    },

    /// Show the capture state of the active platform
    Status,
}

// ============================================================================
// Config File Model (optional YAML)
// ============================================================================

/// Optional YAML config file: `journey-capture.yaml`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub capture: CaptureConfig,
    #[serde(default)]
    pub navigation: NavigationConfig,
    #[serde(default)]
    pub ids: IdStyle,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_store_path")]
    pub path: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureConfig {
    #[serde(default = "default_platform")]
    pub platform: String,

    /// JSONL capture journal; no journal when unset
    pub journal: Option<String>,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            platform: default_platform(),
            journal: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NavigationConfig {
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,

    #[serde(default = "default_banner_timeout_ms")]
    pub banner_timeout_ms: u64,
}

impl Default for NavigationConfig {
    fn default() -> Self {
        Self {
            retry_delay_ms: default_retry_delay_ms(),
            banner_timeout_ms: default_banner_timeout_ms(),
        }
    }
}

// Serde default helpers
fn default_store_path() -> String { "journey-state.json".to_string() }
fn default_platform() -> String { DEFAULT_PLATFORM.to_string() }
fn default_retry_delay_ms() -> u64 { DEFAULT_RETRY_DELAY.as_millis() as u64 }
fn default_banner_timeout_ms() -> u64 { BANNER_TIMEOUT.as_millis() as u64 }

// ============================================================================
// Config File Loading
// ============================================================================

/// Load config from a YAML file. Returns defaults if file is missing or malformed.
pub fn load_config(path: Option<&str>) -> AppConfig {
    let config_path = path.unwrap_or("journey-capture.yaml");
    match std::fs::read_to_string(config_path) {
        Ok(content) => serde_yaml::from_str(&content).unwrap_or_default(),
        Err(_) => AppConfig::default(),
    }
}

// ============================================================================
// Config Builders (merge CLI args with config file)
// ============================================================================

/// Build the background service configuration. `platform` is the CLI value,
/// which wins over the config file.
pub fn build_background_config(config: &AppConfig, platform: Option<&str>) -> BackgroundConfig {
    BackgroundConfig {
        default_platform: platform.unwrap_or(&config.capture.platform).to_string(),
        retry: RetryPolicy::default()
            .with_retry_delay(Duration::from_millis(config.navigation.retry_delay_ms)),
        banner_timeout: Duration::from_millis(config.navigation.banner_timeout_ms),
        id_style: config.ids.clone(),
    }
}

/// Resolve the durable store path: CLI > config > default.
pub fn resolve_store_path<'a>(config: &'a AppConfig, cli_store: Option<&'a str>) -> &'a str {
    cli_store.unwrap_or(&config.store.path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_yaml_keeps_defaults() {
        let config: AppConfig = serde_yaml::from_str(
            "capture:\n  platform: crm\nnavigation:\n  retry_delay_ms: 250\nids:\n  page_prefix: page_\n",
        )
        .unwrap();

        assert_eq!(config.store.path, "journey-state.json");
        assert_eq!(config.capture.platform, "crm");
        assert_eq!(config.navigation.retry_delay_ms, 250);
        assert_eq!(config.navigation.banner_timeout_ms, 5000);
        assert_eq!(config.ids.page_prefix, "page_");
        assert_eq!(config.ids.element_prefix, "");
    }

    #[test]
    fn cli_platform_overrides_config() {
        let config = AppConfig::default();
        let built = build_background_config(&config, Some("billing"));
        assert_eq!(built.default_platform, "billing");
        assert_eq!(built.retry.retry_delay, DEFAULT_RETRY_DELAY);
        assert_eq!(built.banner_timeout, BANNER_TIMEOUT);

        assert_eq!(build_background_config(&config, None).default_platform, "default");
    }

    #[test]
    fn missing_config_file_gives_defaults() {
        let config = load_config(Some("/nonexistent/journey-capture.yaml"));
        assert_eq!(config.capture.platform, "default");
        assert!(config.capture.journal.is_none());
    }
}
