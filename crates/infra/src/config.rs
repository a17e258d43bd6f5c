//! Pipeline configuration, read from the environment.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

pub const QUEUE_BACKEND_VAR: &str = "CATALOG_QUEUE_BACKEND";
pub const QUEUE_PATH_VAR: &str = "CATALOG_QUEUE_PATH";
pub const REDIS_URL_VAR: &str = "CATALOG_REDIS_URL";
pub const EVENT_QUEUE_VAR: &str = "CATALOG_EVENT_QUEUE";
pub const COMMAND_QUEUE_VAR: &str = "CATALOG_COMMAND_QUEUE";
pub const BACKEND_TIMEOUT_VAR: &str = "CATALOG_BACKEND_TIMEOUT_MS";
pub const DATA_VERSION_FILE_VAR: &str = "CATALOG_DATA_VERSION_FILE";
pub const DEBUG_LOGGING_VAR: &str = "CATALOG_DEBUG_LOGGING";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var}: {reason}")]
    Invalid { var: &'static str, reason: String },
}

impl ConfigError {
    fn invalid(var: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            var,
            reason: reason.into(),
        }
    }
}

/// Storage behind both logical queues.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueBackend {
    Memory,
    Sqlite,
    Redis,
}

impl FromStr for QueueBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "sqlite" => Ok(Self::Sqlite),
            "redis" => Ok(Self::Redis),
            other => Err(format!(
                "unknown queue backend \"{other}\" (expected memory, sqlite or redis)"
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    pub queue_backend: QueueBackend,
    pub queue_path: PathBuf,
    pub redis_url: String,
    pub event_queue: String,
    pub command_queue: String,
    pub backend_timeout: Duration,
    pub data_version_file: PathBuf,
    pub debug_logging: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            queue_backend: QueueBackend::Sqlite,
            queue_path: PathBuf::from("var/queue.sqlite3"),
            redis_url: "redis://127.0.0.1:6379".to_string(),
            event_queue: "domain_events".to_string(),
            command_queue: "commands".to_string(),
            backend_timeout: Duration::from_millis(5000),
            data_version_file: PathBuf::from("var/data-version"),
            debug_logging: false,
        }
    }
}

impl PipelineConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Builds the config from an arbitrary variable source. Unset or empty
    /// variables fall back to their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |var: &str| lookup(var).filter(|v| !v.trim().is_empty());
        let mut config = Self::default();

        if let Some(raw) = get(QUEUE_BACKEND_VAR) {
            config.queue_backend = raw
                .parse()
                .map_err(|reason: String| ConfigError::invalid(QUEUE_BACKEND_VAR, reason))?;
        }
        if let Some(raw) = get(QUEUE_PATH_VAR) {
            config.queue_path = PathBuf::from(raw);
        }
        if let Some(raw) = get(REDIS_URL_VAR) {
            config.redis_url = raw;
        }
        if let Some(raw) = get(EVENT_QUEUE_VAR) {
            config.event_queue = raw;
        }
        if let Some(raw) = get(COMMAND_QUEUE_VAR) {
            config.command_queue = raw;
        }
        if let Some(raw) = get(BACKEND_TIMEOUT_VAR) {
            let millis: u64 = raw.trim().parse().map_err(|e| {
                ConfigError::invalid(BACKEND_TIMEOUT_VAR, format!("expected milliseconds: {e}"))
            })?;
            if millis == 0 {
                return Err(ConfigError::invalid(BACKEND_TIMEOUT_VAR, "must be greater than zero"));
            }
            config.backend_timeout = Duration::from_millis(millis);
        }
        if let Some(raw) = get(DATA_VERSION_FILE_VAR) {
            config.data_version_file = PathBuf::from(raw);
        }
        if let Some(raw) = get(DEBUG_LOGGING_VAR) {
            config.debug_logging = parse_bool(&raw)
                .ok_or_else(|| ConfigError::invalid(DEBUG_LOGGING_VAR, format!("expected a boolean, got \"{raw}\"")))?;
        }

        if config.event_queue == config.command_queue {
            return Err(ConfigError::invalid(
                COMMAND_QUEUE_VAR,
                format!("must differ from {EVENT_QUEUE_VAR} (both are \"{}\")", config.event_queue),
            ));
        }

        Ok(config)
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |var| map.get(var).cloned()
    }

    #[test]
    fn empty_environment_yields_defaults() {
        let config = PipelineConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, PipelineConfig::default());
        assert_eq!(config.queue_backend, QueueBackend::Sqlite);
        assert_eq!(config.backend_timeout, Duration::from_secs(5));
    }

    #[test]
    fn overrides_are_applied() {
        let config = PipelineConfig::from_lookup(lookup(&[
            (QUEUE_BACKEND_VAR, "Memory"),
            (EVENT_QUEUE_VAR, "events"),
            (BACKEND_TIMEOUT_VAR, "250"),
            (DEBUG_LOGGING_VAR, "yes"),
        ]))
        .unwrap();

        assert_eq!(config.queue_backend, QueueBackend::Memory);
        assert_eq!(config.event_queue, "events");
        assert_eq!(config.backend_timeout, Duration::from_millis(250));
        assert!(config.debug_logging);
    }

    #[test]
    fn invalid_values_name_the_variable() {
        let err = PipelineConfig::from_lookup(lookup(&[(QUEUE_BACKEND_VAR, "kafka")])).unwrap_err();
        assert!(err.to_string().starts_with(QUEUE_BACKEND_VAR));

        let err = PipelineConfig::from_lookup(lookup(&[(BACKEND_TIMEOUT_VAR, "soon")])).unwrap_err();
        assert!(err.to_string().starts_with(BACKEND_TIMEOUT_VAR));

        let err = PipelineConfig::from_lookup(lookup(&[(BACKEND_TIMEOUT_VAR, "0")])).unwrap_err();
        assert!(err.to_string().starts_with(BACKEND_TIMEOUT_VAR));

        let err = PipelineConfig::from_lookup(lookup(&[(DEBUG_LOGGING_VAR, "maybe")])).unwrap_err();
        assert!(err.to_string().starts_with(DEBUG_LOGGING_VAR));
    }

    #[test]
    fn queues_must_have_distinct_names() {
        let err = PipelineConfig::from_lookup(lookup(&[(COMMAND_QUEUE_VAR, "domain_events")])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { var: COMMAND_QUEUE_VAR, .. }));
    }
}
