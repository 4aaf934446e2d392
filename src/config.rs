//! Application configuration loaded from environment variables.
//!
//! Secrets (token signing keys, media API key) are read once at startup and
//! cached in memory for the lifetime of the process.

use std::env;

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// GCP project ID (Firestore)
    pub gcp_project_id: String,
    /// Allowed CORS origin (the web frontend)
    pub cors_origin: String,
    /// Server port
    pub port: u16,

    /// Signing key for short-lived access tokens (raw bytes)
    pub access_token_secret: Vec<u8>,
    /// Signing key for long-lived refresh tokens (raw bytes)
    pub refresh_token_secret: Vec<u8>,
    /// Access token lifetime in seconds
    pub access_token_ttl_secs: u64,
    /// Refresh token lifetime in seconds
    pub refresh_token_ttl_secs: u64,
    /// Whether auth cookies carry the Secure flag (off for local HTTP dev)
    pub cookie_secure: bool,

    /// Image hosting API base URL
    pub media_base_url: String,
    /// Image hosting API key
    pub media_api_key: String,
}

const DEFAULT_ACCESS_TTL_SECS: u64 = 60 * 60; // 1 hour
const DEFAULT_REFRESH_TTL_SECS: u64 = 10 * 24 * 60 * 60; // 10 days

impl Default for Config {
    /// Default config for testing only.
    fn default() -> Self {
        Self {
            gcp_project_id: "test-project".to_string(),
            cors_origin: "http://localhost:5173".to_string(),
            port: 8080,
            access_token_secret: b"test_access_key_32_bytes_minimum".to_vec(),
            refresh_token_secret: b"test_refresh_key_32_bytes_minimu".to_vec(),
            access_token_ttl_secs: DEFAULT_ACCESS_TTL_SECS,
            refresh_token_ttl_secs: DEFAULT_REFRESH_TTL_SECS,
            cookie_secure: false,
            media_base_url: "http://localhost:9000".to_string(),
            media_api_key: "test_media_key".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        Ok(Self {
            gcp_project_id: env::var("GCP_PROJECT_ID").unwrap_or_else(|_| "local-dev".to_string()),
            cors_origin: env::var("CORS_ORIGIN")
                .unwrap_or_else(|_| "http://localhost:5173".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .unwrap_or(8080),

            access_token_secret: env::var("ACCESS_TOKEN_SECRET")
                .map_err(|_| ConfigError::Missing("ACCESS_TOKEN_SECRET"))?
                .into_bytes(),
            refresh_token_secret: env::var("REFRESH_TOKEN_SECRET")
                .map_err(|_| ConfigError::Missing("REFRESH_TOKEN_SECRET"))?
                .into_bytes(),
            access_token_ttl_secs: parse_ttl("ACCESS_TOKEN_TTL_SECS", DEFAULT_ACCESS_TTL_SECS),
            refresh_token_ttl_secs: parse_ttl("REFRESH_TOKEN_TTL_SECS", DEFAULT_REFRESH_TTL_SECS),
            cookie_secure: env::var("COOKIE_SECURE")
                .map(|v| v != "false" && v != "0")
                .unwrap_or(true),

            media_base_url: env::var("MEDIA_BASE_URL")
                .map(|v| v.trim_end_matches('/').to_string())
                .map_err(|_| ConfigError::Missing("MEDIA_BASE_URL"))?,
            media_api_key: env::var("MEDIA_API_KEY")
                .map(|v| v.trim().to_string())
                .map_err(|_| ConfigError::Missing("MEDIA_API_KEY"))?,
        })
    }
}

fn parse_ttl(var: &str, default: u64) -> u64 {
    env::var(var)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_from_env() {
        // Set required env vars for test
        env::set_var("ACCESS_TOKEN_SECRET", "access_secret_32_bytes_minimum!!");
        env::set_var("REFRESH_TOKEN_SECRET", "refresh_secret_32_bytes_minimum!");
        env::set_var("MEDIA_BASE_URL", "https://media.example.com/");
        env::set_var("MEDIA_API_KEY", "media_key");

        let config = Config::from_env().expect("Config should load");

        assert_eq!(config.access_token_secret, b"access_secret_32_bytes_minimum!!");
        assert_eq!(config.media_base_url, "https://media.example.com");
        assert_eq!(config.port, 8080);
        assert_eq!(config.access_token_ttl_secs, DEFAULT_ACCESS_TTL_SECS);
        assert!(config.refresh_token_ttl_secs > config.access_token_ttl_secs);
    }

    #[test]
    fn test_default_secrets_differ() {
        let config = Config::default();
        assert_ne!(config.access_token_secret, config.refresh_token_secret);
    }
}
