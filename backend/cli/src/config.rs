use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;

use roundtable_core::{Layout, LlmProvider};
use roundtable_llm::{ModelBackend, PayloadLog, DEFAULT_LLAMA_SERVER_URL};

/// Roundtable runtime configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Base directory holding `agents/`, `convo.md` and `llama_payload.log`
    pub home: PathBuf,
    /// HTTP server bind address
    pub bind_address: String,
    /// HTTP server port
    pub port: u16,
    /// llama-server chat completions endpoint
    pub llama_url: String,
    pub model: String,
    pub temperature: f64,
    /// Pause between turns, in milliseconds
    pub turn_delay_ms: u64,
    /// Log level
    pub log_level: String,
    /// Directory for the rolling NDJSON log
    pub log_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            home: PathBuf::from("."),
            bind_address: "0.0.0.0".to_string(),
            port: 5009,
            llama_url: DEFAULT_LLAMA_SERVER_URL.to_string(),
            model: "llama-chat".to_string(),
            temperature: 0.7,
            turn_delay_ms: 200,
            log_level: "info".to_string(),
            log_dir: PathBuf::from("logs"),
        }
    }
}

impl Config {
    /// Load configuration from environment variables with sensible defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let home = var("ROUNDTABLE_HOME").map(PathBuf::from).unwrap_or(defaults.home);
        Self {
            bind_address: var("ROUNDTABLE_BIND").unwrap_or(defaults.bind_address),
            port: var("ROUNDTABLE_PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.port),
            llama_url: var("LLAMA_SERVER_URL").unwrap_or(defaults.llama_url),
            model: var("LLAMA_MODEL").unwrap_or(defaults.model),
            temperature: var("LLAMA_TEMPERATURE")
                .and_then(|t| t.parse().ok())
                .unwrap_or(defaults.temperature),
            turn_delay_ms: var("ROUNDTABLE_TURN_DELAY_MS")
                .and_then(|d| d.parse().ok())
                .unwrap_or(defaults.turn_delay_ms),
            log_level: var("RUST_LOG").unwrap_or(defaults.log_level),
            log_dir: var("ROUNDTABLE_LOG_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| home.join(defaults.log_dir)),
            home,
        }
    }

    pub fn layout(&self) -> Layout {
        Layout::new(&self.home)
    }

    pub fn turn_delay(&self) -> Duration {
        Duration::from_millis(self.turn_delay_ms)
    }

    /// Model backend over `provider`, logging to `payload_log`.
    pub fn backend(&self, provider: Arc<dyn LlmProvider>, payload_log: PayloadLog) -> ModelBackend {
        ModelBackend::new(provider, payload_log)
            .with_model(&self.model)
            .with_temperature(self.temperature)
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
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_without_environment() {
        let config = Config::from_lookup(lookup(&[]));
        assert_eq!(config.port, 5009);
        assert_eq!(config.turn_delay_ms, 200);
        assert_eq!(config.llama_url, DEFAULT_LLAMA_SERVER_URL);
        assert_eq!(config.log_dir, PathBuf::from("./logs"));
    }

    #[test]
    fn environment_overrides_and_bad_numbers_fall_back() {
        let config = Config::from_lookup(lookup(&[
            ("ROUNDTABLE_HOME", "/srv/rt"),
            ("ROUNDTABLE_PORT", "not-a-port"),
            ("LLAMA_TEMPERATURE", "0.2"),
            ("ROUNDTABLE_TURN_DELAY_MS", "0"),
        ]));
        assert_eq!(config.home, PathBuf::from("/srv/rt"));
        assert_eq!(config.port, 5009);
        assert_eq!(config.temperature, 0.2);
        assert!(config.turn_delay().is_zero());
        assert_eq!(config.log_dir, PathBuf::from("/srv/rt/logs"));
        assert_eq!(config.layout().conversation_path(), PathBuf::from("/srv/rt/convo.md"));
    }
}
