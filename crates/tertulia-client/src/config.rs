//! Client configuration loaded from environment variables.
//!
//! All settings have defaults so the console can start with zero
//! configuration.

use std::path::PathBuf;

use tertulia_shared::constants::DEFAULT_MIN_PASSWORD_LEN;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// SQLite file used by the local backend.
    /// Env: `TERTULIA_DB_PATH`
    /// Default: `None` (the platform data directory).
    pub database_path: Option<PathBuf>,

    /// Shortest password the local backend accepts at sign-up.
    /// Env: `TERTULIA_MIN_PASSWORD_LEN`
    /// Default: `6`
    pub min_password_len: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            database_path: None,
            min_password_len: DEFAULT_MIN_PASSWORD_LEN,
        }
    }
}

impl ClientConfig {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(path) = lookup("TERTULIA_DB_PATH") {
            if !path.trim().is_empty() {
                config.database_path = Some(PathBuf::from(path));
            }
        }

        if let Some(val) = lookup("TERTULIA_MIN_PASSWORD_LEN") {
            match val.trim().parse::<usize>() {
                Ok(n) if n > 0 => config.min_password_len = n,
                _ => tracing::warn!(
                    value = %val,
                    "Invalid TERTULIA_MIN_PASSWORD_LEN, using default"
                ),
            }
        }

        // RUST_LOG is handled directly by tracing-subscriber's EnvFilter,
        // so we do not store it here.

        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> ClientConfig {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ClientConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_default_config() {
        let config = load(&[]);
        assert_eq!(config, ClientConfig::default());
        assert_eq!(config.min_password_len, 6);
    }

    #[test]
    fn test_overrides() {
        let config = load(&[
            ("TERTULIA_DB_PATH", "/tmp/t.db"),
            ("TERTULIA_MIN_PASSWORD_LEN", "12"),
        ]);
        assert_eq!(config.database_path, Some(PathBuf::from("/tmp/t.db")));
        assert_eq!(config.min_password_len, 12);
    }

    #[test]
    fn test_invalid_values_fall_back() {
        let config = load(&[("TERTULIA_MIN_PASSWORD_LEN", "zero"), ("TERTULIA_DB_PATH", " ")]);
        assert_eq!(config, ClientConfig::default());
    }
}
