//! Application configuration
//!
//! Configuration loaded from `.gh-pr-tracker.toml`. Every key is optional;
//! missing keys fall back to the defaults below.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// OAuth app used for the device flow when a request does not name one
pub const DEFAULT_CLIENT_ID: &str = "Ov23li2VVjfGHdt11COT";

/// Application configuration loaded from `.gh-pr-tracker.toml`
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct AppConfig {
    /// Port the proxy server listens on
    #[serde(default = "default_port")]
    pub port: u16,

    /// Address the proxy server binds to
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// Directory served for every non-API path
    #[serde(default = "default_static_dir")]
    pub static_dir: String,

    /// Upstream REST base URL (GraphQL lives at `{api_base_url}/graphql`)
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// Upstream base for the OAuth device flow
    #[serde(default = "default_oauth_base_url")]
    pub oauth_base_url: String,

    /// User-Agent sent upstream
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Device-flow client id used when the browser does not send one
    #[serde(default = "default_client_id")]
    pub client_id: String,

    /// Scopes requested in the device flow
    #[serde(default = "default_oauth_scope")]
    pub oauth_scope: String,

    /// Mark session cookies `Secure`
    #[serde(default = "default_true")]
    pub cookie_secure: bool,

    /// Lifetime of the session cookies
    #[serde(default = "default_cookie_max_age_secs")]
    pub cookie_max_age_secs: i64,

    /// Start periodic refresh after the first manual load
    #[serde(default = "default_true")]
    pub auto_refresh: bool,

    /// Seconds between periodic refreshes
    #[serde(default = "default_refresh_interval_secs")]
    pub refresh_interval_secs: u64,

    /// Safety ceiling on fetch attempts per session
    #[serde(default = "default_max_fetch_attempts")]
    pub max_fetch_attempts: u32,

    /// Seconds to wait after a CI restart before refreshing
    #[serde(default = "default_restart_refresh_delay_secs")]
    pub restart_refresh_delay_secs: u64,

    /// Initial repository substring filter
    #[serde(default)]
    pub repo_filter: String,

    /// Initial age cutoff in days (0 = all time)
    #[serde(default)]
    pub age_filter_days: u32,

    /// Extra optional-check name patterns (case-insensitive regexes)
    #[serde(default)]
    pub extra_optional_checks: Vec<String>,
}

fn default_port() -> u16 {
    3000
}

fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}

fn default_static_dir() -> String {
    ".".to_string()
}

fn default_api_base_url() -> String {
    "https://api.github.com".to_string()
}

fn default_oauth_base_url() -> String {
    "https://github.com".to_string()
}

fn default_user_agent() -> String {
    "PR-Tracker".to_string()
}

fn default_client_id() -> String {
    DEFAULT_CLIENT_ID.to_string()
}

fn default_oauth_scope() -> String {
    "repo workflow".to_string()
}

fn default_true() -> bool {
    true
}

fn default_cookie_max_age_secs() -> i64 {
    30 * 24 * 60 * 60
}

fn default_refresh_interval_secs() -> u64 {
    60
}

fn default_max_fetch_attempts() -> u32 {
    100
}

fn default_restart_refresh_delay_secs() -> u64 {
    3
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            bind_address: default_bind_address(),
            static_dir: default_static_dir(),
            api_base_url: default_api_base_url(),
            oauth_base_url: default_oauth_base_url(),
            user_agent: default_user_agent(),
            client_id: default_client_id(),
            oauth_scope: default_oauth_scope(),
            cookie_secure: true,
            cookie_max_age_secs: default_cookie_max_age_secs(),
            auto_refresh: true,
            refresh_interval_secs: default_refresh_interval_secs(),
            max_fetch_attempts: default_max_fetch_attempts(),
            restart_refresh_delay_secs: default_restart_refresh_delay_secs(),
            repo_filter: String::new(),
            age_filter_days: 0,
            extra_optional_checks: Vec::new(),
        }
    }
}

impl AppConfig {
    /// Load config from CWD first, then home directory, or use defaults
    pub fn load() -> Self {
        let config = crate::load_config_file()
            .map(|content| Self::parse_or_default(&content))
            .unwrap_or_else(|| {
                log::debug!("Using default app config");
                Self::default()
            });
        config.with_env_overrides()
    }

    /// Load config from an explicit file, falling back to defaults
    pub fn load_from(path: &Path) -> Self {
        crate::load_config_file_from(path)
            .map(|content| Self::parse_or_default(&content))
            .unwrap_or_default()
            .with_env_overrides()
    }

    fn parse_or_default(content: &str) -> Self {
        match toml::from_str(content) {
            Ok(config) => {
                log::info!("Loaded app config from file");
                config
            }
            Err(e) => {
                log::warn!("Failed to parse config file: {}", e);
                Self::default()
            }
        }
    }

    /// Apply `PORT` from the environment
    fn with_env_overrides(mut self) -> Self {
        if let Ok(port) = std::env::var("PORT") {
            match port.parse() {
                Ok(port) => self.port = port,
                Err(_) => log::warn!("Ignoring invalid PORT value {:?}", port),
            }
        }
        self
    }

    /// Periodic refresh cadence
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs.max(1))
    }

    /// Delay before the refresh that follows a CI restart
    pub fn restart_refresh_delay(&self) -> Duration {
        Duration::from_secs(self.restart_refresh_delay_secs)
    }
}
