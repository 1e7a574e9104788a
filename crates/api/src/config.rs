use extract::{FallbackConfig, FallbackTrigger, config::parse_flag};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";
pub const DEFAULT_STORE_PATH: &str = "data/parsed_store.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub fallback: FallbackConfig,
    pub storage: StorageConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub bind_addr: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub path: PathBuf,
    /// Write the store to disk after every change
    pub persist: bool,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive; `RUST_LOG` overrides it
    pub level: String,
    pub format: LogFormat,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                bind_addr: DEFAULT_BIND_ADDR.to_string(),
            },
            fallback: FallbackConfig::disabled(),
            storage: StorageConfig {
                path: PathBuf::from(DEFAULT_STORE_PATH),
                persist: false,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                format: LogFormat::Pretty,
            },
        }
    }
}

impl AppConfig {
    /// Read settings from the process environment (after `.env` is loaded).
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; unset keys keep their defaults and
    /// malformed booleans read as false.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let fallback = FallbackConfig::from_flags(
            lookup("USE_LLM_EXTRACTION").as_deref(),
            lookup("USE_LLM_QA").as_deref(),
        )
        .with_trigger(FallbackTrigger::parse(lookup("FALLBACK_TRIGGER").as_deref()));

        let format = match lookup("LOG_FORMAT").map(|f| f.trim().to_lowercase()).as_deref() {
            Some("json") => LogFormat::Json,
            _ => LogFormat::Pretty,
        };

        Self {
            server: ServerConfig {
                bind_addr: lookup("BIND_ADDR").unwrap_or(defaults.server.bind_addr),
            },
            fallback,
            storage: StorageConfig {
                path: lookup("CLAIMS_STORE_PATH")
                    .map(PathBuf::from)
                    .unwrap_or(defaults.storage.path),
                persist: parse_flag(lookup("CLAIMS_PERSIST").as_deref()),
            },
            logging: LoggingConfig {
                level: lookup("LOG_LEVEL")
                    .map(|l| l.to_lowercase())
                    .unwrap_or(defaults.logging.level),
                format,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> AppConfig {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]);
        assert_eq!(config.server.bind_addr, DEFAULT_BIND_ADDR);
        assert_eq!(config.fallback, FallbackConfig::disabled());
        assert_eq!(config.storage.path, PathBuf::from(DEFAULT_STORE_PATH));
        assert!(!config.storage.persist);
        assert_eq!(config.logging.format, LogFormat::Pretty);
    }

    #[test]
    fn test_overrides() {
        let config = config_from(&[
            ("BIND_ADDR", "127.0.0.1:8080"),
            ("USE_LLM_EXTRACTION", "true"),
            ("USE_LLM_QA", "1"),
            ("FALLBACK_TRIGGER", "missing_key_fields"),
            ("CLAIMS_STORE_PATH", "/tmp/claims.json"),
            ("CLAIMS_PERSIST", "yes"),
            ("LOG_LEVEL", "DEBUG"),
            ("LOG_FORMAT", "json"),
        ]);

        assert_eq!(config.server.bind_addr, "127.0.0.1:8080");
        assert!(config.fallback.extraction);
        assert!(config.fallback.qa);
        assert_eq!(config.fallback.trigger, FallbackTrigger::MissingKeyFields);
        assert_eq!(config.storage.path, PathBuf::from("/tmp/claims.json"));
        assert!(config.storage.persist);
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.format, LogFormat::Json);
    }

    #[test]
    fn test_malformed_flags_disable() {
        let config = config_from(&[("USE_LLM_QA", "sure"), ("CLAIMS_PERSIST", "")]);
        assert!(!config.fallback.qa);
        assert!(!config.storage.persist);
    }
}
