use serde::Deserialize;
use std::time::Duration;

use crate::{cache::SameItemPolicy, session::AuthToken};

const ENV_PREFIX: &str = "PIPOQUEIRO_";

/// Application configuration loaded from `PIPOQUEIRO_*` environment variables
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Base URL of the Pipoqueiro backend
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Bearer token of an existing session, if any
    #[serde(default)]
    pub token: Option<AuthToken>,

    /// Per-request timeout for remote list calls
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// What to do with a second toggle on an item whose first toggle is still in flight
    #[serde(default)]
    pub same_item_policy: SameItemPolicy,

    /// Buffered notices per subscriber before the slowest one starts lagging
    #[serde(default = "default_notice_capacity")]
    pub notice_capacity: usize,
}

fn default_api_url() -> String {
    "http://localhost:3001".to_string()
}

fn default_request_timeout_secs() -> u64 {
    10
}

fn default_notice_capacity() -> usize {
    64
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        envy::prefixed(ENV_PREFIX)
            .from_env::<Config>()
            .map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Token to start the session with; blank values count as logged out
    pub fn initial_token(&self) -> Option<AuthToken> {
        self.token
            .clone()
            .filter(|token| !token.expose().trim().is_empty())
    }
}
