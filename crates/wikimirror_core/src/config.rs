use std::env;

use crate::error::ConfigError;

pub const DEFAULT_API_BASE_URL: &str = "https://www.reddit.com";
pub const DEFAULT_USER_AGENT: &str = "wikimirror/0.1";
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;

/// Transport settings for the wiki client. Retry and throttle behavior is
/// fixed and deliberately absent here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MirrorConfig {
    pub api_base_url: String,
    pub user_agent: String,
    pub timeout_ms: u64,
}

impl Default for MirrorConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }
}

impl MirrorConfig {
    /// Resolve settings: env WIKIMIRROR_* > defaults.
    pub fn from_env() -> Self {
        Self {
            api_base_url: env_value("WIKIMIRROR_BASE_URL", DEFAULT_API_BASE_URL),
            user_agent: env_value("WIKIMIRROR_USER_AGENT", DEFAULT_USER_AGENT),
            timeout_ms: env_value_u64("WIKIMIRROR_HTTP_TIMEOUT_MS", DEFAULT_TIMEOUT_MS),
        }
    }

    /// Wiki root for a community, always ending in `/wiki/`.
    pub fn wiki_root(&self, community: &str) -> String {
        let base = self.api_base_url.trim_end_matches('/');
        format!("{base}/r/{community}/wiki/")
    }
}

pub fn validate_community(community: &str) -> Result<(), ConfigError> {
    if community.is_empty() {
        return Err(ConfigError::EmptyCommunity);
    }
    if community.contains('/') || community.chars().any(char::is_whitespace) {
        return Err(ConfigError::InvalidCommunity(community.to_string()));
    }
    Ok(())
}

fn env_value(key: &str, default: &str) -> String {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn env_value_u64(key: &str, default: u64) -> u64 {
    env::var(key)
        .ok()
        .and_then(|value| value.trim().parse::<u64>().ok())
        .unwrap_or(default)
}
