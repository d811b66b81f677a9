//! Configuration with validation and defaults.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Top-level configuration, loadable from TOML with per-section defaults.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    pub server: ServerConfig,
    pub auth: AuthConfig,
    pub game: GameConfig,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub allowed_origins: Vec<String>,
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            allowed_origins: vec!["*".to_string()],
            request_timeout_secs: 30,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Hex-encoded 32-byte ed25519 seed for the token signing key. When
    /// absent a fresh key is generated at startup, which invalidates all
    /// outstanding tokens on restart.
    pub signing_key_seed: Option<String>,
    /// Cookie name the session token travels in.
    pub session_cookie: String,
    /// Bootstrap admin created when the store is empty.
    pub bootstrap_username: String,
    pub bootstrap_name: String,
    pub bootstrap_password: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            signing_key_seed: None,
            session_cookie: "token".to_string(),
            bootstrap_username: "houseadmin".to_string(),
            bootstrap_name: "House Admin".to_string(),
            bootstrap_password: "ChangeMe123!".to_string(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Minimum stake per card.
    pub min_bet: f64,
    pub min_line_checker: u32,
    pub max_line_checker: u32,
    /// Games with this many cards or fewer start free of charge.
    pub free_card_threshold: usize,
    /// Optimistic-commit retries before a monetary operation gives up.
    pub commit_retry_limit: u32,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            min_bet: 10.0,
            min_line_checker: 1,
            max_line_checker: 5,
            free_card_threshold: 3,
            commit_retry_limit: 3,
        }
    }
}

impl LedgerConfig {
    /// Load from a TOML file, or fall back to defaults when no path is given.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config = match path {
            Some(path) => {
                let raw = std::fs::read_to_string(path)
                    .map_err(|e| ConfigError::Load(format!("{}: {e}", path.display())))?;
                toml::from_str(&raw).map_err(|e| ConfigError::Load(e.to_string()))?
            }
            None => Self::default(),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.request_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "request_timeout_secs must be > 0".to_string(),
            ));
        }
        if self.game.min_bet <= 0.0 || !self.game.min_bet.is_finite() {
            return Err(ConfigError::Invalid("min_bet must be > 0".to_string()));
        }
        if self.game.min_line_checker == 0 || self.game.max_line_checker < self.game.min_line_checker
        {
            return Err(ConfigError::Invalid(
                "line checker bounds must satisfy 1 <= min <= max".to_string(),
            ));
        }
        if self.game.commit_retry_limit == 0 {
            return Err(ConfigError::Invalid(
                "commit_retry_limit must be > 0".to_string(),
            ));
        }
        if let Some(seed) = &self.auth.signing_key_seed {
            let decoded = hex::decode(seed)
                .map_err(|_| ConfigError::Invalid("signing_key_seed must be hex".to_string()))?;
            if decoded.len() != 32 {
                return Err(ConfigError::Invalid(
                    "signing_key_seed must decode to 32 bytes".to_string(),
                ));
            }
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.server.request_timeout_secs)
    }
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(String),
    #[error("invalid configuration value: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(LedgerConfig::default().validate().is_ok());
    }

    #[test]
    fn rejects_inverted_line_checker_bounds() {
        let mut config = LedgerConfig::default();
        config.game.min_line_checker = 6;
        config.game.max_line_checker = 5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_bad_signing_seed() {
        let mut config = LedgerConfig::default();
        config.auth.signing_key_seed = Some("zz".to_string());
        assert!(config.validate().is_err());

        config.auth.signing_key_seed = Some("ab".repeat(32));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let config: LedgerConfig = toml::from_str(
            r#"
            [server]
            port = 9090

            [game]
            min_bet = 5.0
            "#,
        )
        .unwrap();
        assert_eq!(config.server.port, 9090);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.game.min_bet, 5.0);
        assert_eq!(config.game.max_line_checker, 5);
    }
}
