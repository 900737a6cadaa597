//! TOML file configuration structures.
//!
//! These structs directly map to the `linkcash.toml` file format. Every
//! section is optional; a missing file behaves like an empty one.

use serde::{Deserialize, Serialize};
use url::Url;

/// Root configuration structure as read from the TOML file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FileConfig {
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub polling: PollingConfig,
    #[serde(default)]
    pub checkout: CheckoutConfig,
}

/// Backend connection section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Root URL of the payment-link backend (e.g., "https://pay.example.com").
    /// May be left out when `--base-url` is given.
    pub base_url: Option<Url>,
    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_timeout_secs() -> u64 {
    30
}

/// Confirmation polling section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollingConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
    #[serde(default)]
    pub initial_delay_ms: u64,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            interval_ms: default_interval_ms(),
            initial_delay_ms: 0,
        }
    }
}

fn default_max_attempts() -> u32 {
    linkcash_core::poller::DEFAULT_MAX_ATTEMPTS
}

fn default_interval_ms() -> u64 {
    linkcash_core::poller::DEFAULT_INTERVAL.as_millis() as u64
}

/// Card widget section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CheckoutConfig {
    /// Publishable key of the card processor account.
    pub publishable_key: Option<String>,
}
