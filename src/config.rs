use std::collections::HashMap;
use std::path::PathBuf;
use thiserror::Error;

pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_ACCOUNT_NAME: &str = "Default";

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub transactions_path: PathBuf,
    /// Account name assigned to rows that carry none.
    pub default_account_name: String,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnv(String),
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_map(std::env::vars().collect())
    }

    pub fn from_env_map(env_map: HashMap<String, String>) -> Result<Self, ConfigError> {
        let port = match env_map.get("PORT") {
            Some(raw) => raw.parse::<u16>().map_err(|_| {
                ConfigError::InvalidValue("PORT".to_string(), "must be a valid u16".to_string())
            })?,
            None => DEFAULT_PORT,
        };

        let transactions_path = env_map
            .get("TRANSACTIONS_PATH")
            .map(|s| s.trim())
            .ok_or_else(|| ConfigError::MissingEnv("TRANSACTIONS_PATH".to_string()))?;
        if transactions_path.is_empty() {
            return Err(ConfigError::InvalidValue(
                "TRANSACTIONS_PATH".to_string(),
                "must not be empty".to_string(),
            ));
        }

        let default_account_name = env_map
            .get("DEFAULT_ACCOUNT_NAME")
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .unwrap_or(DEFAULT_ACCOUNT_NAME)
            .to_string();

        Ok(Config {
            port,
            transactions_path: PathBuf::from(transactions_path),
            default_account_name,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup_required_env() -> HashMap<String, String> {
        let mut map = HashMap::new();
        map.insert(
            "TRANSACTIONS_PATH".to_string(),
            "/tmp/transactions.csv".to_string(),
        );
        map
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_env_map(setup_required_env()).unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.transactions_path, PathBuf::from("/tmp/transactions.csv"));
        assert_eq!(config.default_account_name, "Default");
    }

    #[test]
    fn test_overrides() {
        let mut env_map = setup_required_env();
        env_map.insert("PORT".to_string(), "9090".to_string());
        env_map.insert("DEFAULT_ACCOUNT_NAME".to_string(), "  Brokerage ".to_string());
        let config = Config::from_env_map(env_map).unwrap();
        assert_eq!(config.port, 9090);
        assert_eq!(config.default_account_name, "Brokerage");
    }

    #[test]
    fn test_blank_default_account_name_falls_back() {
        let mut env_map = setup_required_env();
        env_map.insert("DEFAULT_ACCOUNT_NAME".to_string(), "   ".to_string());
        let config = Config::from_env_map(env_map).unwrap();
        assert_eq!(config.default_account_name, DEFAULT_ACCOUNT_NAME);
    }

    #[test]
    fn test_missing_transactions_path() {
        let mut env_map = setup_required_env();
        env_map.remove("TRANSACTIONS_PATH");
        let result = Config::from_env_map(env_map);
        match result {
            Err(ConfigError::MissingEnv(s)) => assert_eq!(s, "TRANSACTIONS_PATH"),
            _ => panic!("Expected MissingEnv error"),
        }
    }

    #[test]
    fn test_empty_transactions_path() {
        let mut env_map = setup_required_env();
        env_map.insert("TRANSACTIONS_PATH".to_string(), " ".to_string());
        let result = Config::from_env_map(env_map);
        match result {
            Err(ConfigError::InvalidValue(k, _)) => assert_eq!(k, "TRANSACTIONS_PATH"),
            _ => panic!("Expected InvalidValue error"),
        }
    }

    #[test]
    fn test_invalid_port() {
        let mut env_map = setup_required_env();
        env_map.insert("PORT".to_string(), "not_a_number".to_string());
        let result = Config::from_env_map(env_map);
        match result {
            Err(ConfigError::InvalidValue(k, _)) => assert_eq!(k, "PORT"),
            _ => panic!("Expected InvalidValue error"),
        }
    }
}
