//! Configuration module for environment variable parsing.
//!
//! Reads all configuration from environment variables.

use std::env;
use std::str::FromStr;
use tracing::warn;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Port for the web server to listen on
    pub port: u16,

    /// Svix signing secret (`whsec_...`) shared with the identity provider
    pub signing_secret: Option<String>,

    /// SQLite connection string
    pub database_url: String,

    /// Maximum allowed skew in seconds between the webhook timestamp and now
    pub signature_tolerance_secs: u64,

    /// Target of the landing page "Sign up" link
    pub sign_up_url: String,

    /// Target of the landing page "Sign out" link
    pub sign_out_url: String,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        Config {
            port: parse_or("PORT", 8080),

            signing_secret: env::var("SIGNING_SECRET")
                .ok()
                .filter(|s| !s.trim().is_empty()),

            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite:usersync.db".to_string()),

            signature_tolerance_secs: parse_or("SIGNATURE_TOLERANCE_SECS", 300), // 5 minutes

            sign_up_url: env::var("SIGN_UP_URL").unwrap_or_else(|_| "/sign-up".to_string()),

            sign_out_url: env::var("SIGN_OUT_URL").unwrap_or_else(|_| "/sign-out".to_string()),
        }
    }
}

/// Parse a numeric environment variable, falling back to `default` when it is
/// unset or unparseable.
fn parse_or<T: FromStr>(name: &str, default: T) -> T {
    let raw = match env::var(name) {
        Ok(v) => v,
        Err(_) => return default,
    };

    match raw.trim().parse() {
        Ok(v) => v,
        Err(_) => {
            warn!(env_var = name, value = %raw, "Invalid numeric value, using default");
            default
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_or_valid() {
        env::set_var("TEST_USERSYNC_PORT", "9090");
        let result: u16 = parse_or("TEST_USERSYNC_PORT", 8080);
        assert_eq!(result, 9090);
        env::remove_var("TEST_USERSYNC_PORT");
    }

    #[test]
    fn test_parse_or_invalid_falls_back() {
        env::set_var("TEST_USERSYNC_TOLERANCE", "five minutes");
        let result: u64 = parse_or("TEST_USERSYNC_TOLERANCE", 300);
        assert_eq!(result, 300);
        env::remove_var("TEST_USERSYNC_TOLERANCE");
    }

    #[test]
    fn test_parse_or_default() {
        let result: u64 = parse_or("NONEXISTENT_USERSYNC_VAR", 42);
        assert_eq!(result, 42);
    }
}
