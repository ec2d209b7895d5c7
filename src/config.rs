use anyhow::{Context, Result};
use dotenvy::dotenv;
use std::env;

/// Application configuration loaded from environment variables.
///
/// Read once at startup (spec §6 "All are read once at engine start")
/// and carried around inside [`crate::kernel::EngineDeps`].
#[derive(Debug, Clone)]
pub struct Config {
    /// Persistence location for the Store (Postgres DSN).
    pub store_uri: String,
    pub port: u16,
    /// Expo-compatible push notification endpoint.
    pub notifier_url: String,
    /// Raises Expo rate limits when present; otherwise anonymous calls are used.
    pub expo_access_token: Option<String>,
    /// HMAC secret used by the identity service to sign/verify bearer tokens.
    pub session_secret: String,
    pub token_ttl_seconds: i64,
    pub undo_window_seconds: i64,
    pub restructure_horizon_seconds: i64,
    pub material_wait_delta_minutes: i64,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();

        Ok(Self {
            store_uri: env::var("STORE_URI")
                .or_else(|_| env::var("DATABASE_URL"))
                .context("STORE_URI (or DATABASE_URL) must be set")?,
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .context("PORT must be a valid number")?,
            notifier_url: env::var("NOTIFIER_URL")
                .unwrap_or_else(|_| "https://exp.host/--/api/v2/push/send".to_string()),
            expo_access_token: env::var("EXPO_ACCESS_TOKEN").ok(),
            session_secret: env::var("SESSION_SECRET")
                .context("SESSION_SECRET must be set")?,
            token_ttl_seconds: parse_env_or("TOKEN_TTL_SECONDS", 86_400)?,
            undo_window_seconds: parse_env_or("UNDO_WINDOW_SECONDS", 300)?,
            restructure_horizon_seconds: parse_env_or("RESTRUCTURE_HORIZON_SECONDS", 86_400)?,
            material_wait_delta_minutes: parse_env_or("MATERIAL_WAIT_DELTA_MINUTES", 5)?,
        })
    }
}

fn parse_env_or(key: &str, default: i64) -> Result<i64> {
    match env::var(key) {
        Ok(raw) => raw.parse().with_context(|| format!("{key} must be a valid integer")),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_env_or_falls_back_to_default() {
        std::env::remove_var("QUEUEDESK_TEST_KEY_ABSENT");
        let value = parse_env_or("QUEUEDESK_TEST_KEY_ABSENT", 42).unwrap();
        assert_eq!(value, 42);
    }
}
