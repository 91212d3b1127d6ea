//! Application configuration

use std::env;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    // Server
    pub bind_address: String,

    // Push notifications (disabled when unset)
    pub push_webhook_url: Option<String>,

    // Chat coordinator
    pub history_limit: usize,
    pub push_preview_max_chars: usize,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            bind_address: env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:3000".to_string()),

            push_webhook_url: env::var("PUSH_WEBHOOK_URL").ok().filter(|v| !v.is_empty()),

            history_limit: {
                let limit: usize = env::var("HISTORY_LIMIT")
                    .unwrap_or_else(|_| "50".to_string())
                    .parse()
                    .map_err(|_| ConfigError::Invalid("HISTORY_LIMIT must be a number"))?;
                if limit == 0 {
                    return Err(ConfigError::Invalid("HISTORY_LIMIT must be at least 1"));
                }
                limit
            },

            push_preview_max_chars: env::var("PUSH_PREVIEW_MAX_CHARS")
                .unwrap_or_else(|_| "100".to_string())
                .parse()
                .map_err(|_| ConfigError::Invalid("PUSH_PREVIEW_MAX_CHARS must be a number"))?,
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid environment variable: {0}")]
    Invalid(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // Mutex to ensure config tests run serially (they modify shared env vars)
    static CONFIG_TEST_MUTEX: Mutex<()> = Mutex::new(());

    fn cleanup_config() {
        env::remove_var("BIND_ADDRESS");
        env::remove_var("PUSH_WEBHOOK_URL");
        env::remove_var("HISTORY_LIMIT");
        env::remove_var("PUSH_PREVIEW_MAX_CHARS");
    }

    #[test]
    fn test_defaults() {
        let _lock = CONFIG_TEST_MUTEX.lock().unwrap();
        cleanup_config();

        let config = Config::from_env().unwrap();
        assert_eq!(config.bind_address, "0.0.0.0:3000");
        assert!(config.push_webhook_url.is_none());
        assert_eq!(config.history_limit, 50);
        assert_eq!(config.push_preview_max_chars, 100);
    }

    #[test]
    fn test_history_limit_validation() {
        let _lock = CONFIG_TEST_MUTEX.lock().unwrap();
        cleanup_config();

        env::set_var("HISTORY_LIMIT", "not a number");
        assert!(matches!(
            Config::from_env(),
            Err(ConfigError::Invalid(_))
        ));

        env::set_var("HISTORY_LIMIT", "0");
        assert!(matches!(
            Config::from_env(),
            Err(ConfigError::Invalid(_))
        ));

        env::set_var("HISTORY_LIMIT", "25");
        let config = Config::from_env().unwrap();
        assert_eq!(config.history_limit, 25);

        cleanup_config();
    }

    #[test]
    fn test_empty_webhook_url_is_disabled() {
        let _lock = CONFIG_TEST_MUTEX.lock().unwrap();
        cleanup_config();

        env::set_var("PUSH_WEBHOOK_URL", "");
        let config = Config::from_env().unwrap();
        assert!(config.push_webhook_url.is_none());

        env::set_var("PUSH_WEBHOOK_URL", "https://push.example/hook");
        let config = Config::from_env().unwrap();
        assert_eq!(
            config.push_webhook_url.as_deref(),
            Some("https://push.example/hook")
        );

        cleanup_config();
    }
}
