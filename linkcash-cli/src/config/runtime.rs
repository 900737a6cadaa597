//! Validated configuration used at runtime.

pub use linkcash_core::poller::PollPolicy;

use std::time::Duration;
use url::Url;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendSettings {
    pub base_url: Url,
    pub timeout: Duration,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CheckoutSettings {
    pub publishable_key: Option<String>,
}
