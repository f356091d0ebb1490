use std::env;

/// Session and reset-token settings.
///
/// `refresh` is the sliding-window threshold: when a validated session has
/// `refresh` seconds or less remaining, its expiry is extended by
/// `expiration` from now.
#[derive(Clone, Debug)]
pub struct TokenConfig {
    pub secret: String,
    /// Total session lifetime in seconds.
    pub expiration: i64,
    /// Sliding-refresh threshold in seconds.
    pub refresh: i64,
    /// Password-reset token lifetime in seconds.
    pub reset_expiration: i64,
}

impl TokenConfig {
    pub fn from_env() -> Self {
        Self {
            secret: env::var("TOKEN_SECRET")
                .unwrap_or_else(|_| "your-secret-key-change-in-production".to_string()),
            expiration: env::var("TOKEN_EXPIRATION")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(3600), // 1 hour
            refresh: env::var("TOKEN_REFRESH")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(900), // 15 minutes
            reset_expiration: env::var("TOKEN_RESET_EXPIRATION")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(3600), // 1 hour
        }
    }
}
