//! Configuration for the `neural` CLI.
//!
//! Provides the [`NeuralConfig`] struct that loads from TOML files,
//! environment variables, and defaults using the `confyg` crate.
//!
//! # Loading Priority
//!
//! 1. Explicit `--config <path>` flag
//! 2. `NEURAL_CONFIG` environment variable
//! 3. XDG default: `~/.config/neural/config.toml`
//! 4. Built-in defaults

use confyg::{Confygery, env};
use neural_core::{Error, Result};
use neural_inference::{HttpInferenceClient, InferenceClient, RetryingClient};
use neural_query::RewriteConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Environment variable naming the config file.
pub const CONFIG_ENV_VAR: &str = "NEURAL_CONFIG";

// ============================================================================
// Configuration structs
// ============================================================================

/// Main configuration for the CLI.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NeuralConfig {
    /// Inference service connection.
    pub inference: InferenceConfig,

    /// Rewrite driver bounds and tensor selection.
    pub rewrite: RewriteConfig,
}

/// Inference service connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InferenceConfig {
    /// Base URL of the inference service.
    pub endpoint: String,

    /// Per-request timeout in seconds.
    pub timeout_secs: u64,

    /// Value for the `Authorization` header.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth_header: Option<String>,

    /// Retry policy for transient failures.
    pub retry: RetryConfig,
}

/// Retry policy for transient inference failures.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Retries after the first attempt. `0` disables retrying.
    pub max_attempts: u32,

    /// First backoff delay in milliseconds.
    pub initial_delay_ms: u64,

    /// Backoff ceiling in milliseconds.
    pub max_delay_ms: u64,
}

// ============================================================================
// Default implementations
// ============================================================================

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:9200".to_string(),
            timeout_secs: 30,
            auth_header: None,
            retry: RetryConfig::default(),
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay_ms: 200,
            max_delay_ms: 5_000,
        }
    }
}

// ============================================================================
// Config loading
// ============================================================================

impl NeuralConfig {
    /// Load configuration from file, environment, and defaults.
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let mut builder =
            Confygery::new().map_err(|e| Error::config(format!("config init: {e}")))?;

        if let Some(path) = Self::resolve_config_path(config_path)
            && path.exists()
        {
            builder
                .add_file(&path.to_string_lossy())
                .map_err(|e| Error::config(format!("config file: {e}")))?;
        }

        let mut env_opts = env::Options::with_top_level("NEURAL");
        env_opts.add_section("inference");
        env_opts.add_section("rewrite");
        builder
            .add_env(env_opts)
            .map_err(|e| Error::config(format!("config env: {e}")))?;

        let config: Self = builder
            .build()
            .map_err(|e| Error::config(format!("config build: {e}")))?;

        config.validate()?;
        Ok(config)
    }

    /// Check values that would only fail later, at request time.
    pub fn validate(&self) -> Result<()> {
        if self.inference.endpoint.trim().is_empty() {
            return Err(Error::config("inference.endpoint must not be empty"));
        }
        if self.inference.timeout_secs == 0 {
            return Err(Error::config("inference.timeout_secs must be at least 1"));
        }
        self.rewrite.validate()
    }

    /// Resolve the config file path from explicit flag, env var, or XDG default.
    pub fn resolve_config_path(explicit: Option<&str>) -> Option<PathBuf> {
        if let Some(path) = explicit {
            return Some(PathBuf::from(path));
        }

        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            return Some(PathBuf::from(path));
        }

        Self::default_config_path()
    }

    /// Return the XDG default config path.
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("neural").join("config.toml"))
    }

    /// Build the HTTP client described by the `inference` section, wrapped
    /// in retries unless `retry.max_attempts` is zero.
    pub fn inference_client(&self) -> Result<Arc<dyn InferenceClient>> {
        let inference = &self.inference;
        let mut http = HttpInferenceClient::new(
            inference.endpoint.clone(),
            Duration::from_secs(inference.timeout_secs),
        )?;
        if let Some(header) = &inference.auth_header {
            http = http.with_auth_header(header.clone());
        }

        if inference.retry.max_attempts == 0 {
            return Ok(Arc::new(http));
        }

        Ok(Arc::new(
            RetryingClient::new(Arc::new(http))
                .with_max_attempts(inference.retry.max_attempts)
                .with_initial_delay(Duration::from_millis(inference.retry.initial_delay_ms))
                .with_max_delay(Duration::from_millis(inference.retry.max_delay_ms)),
        ))
    }

    /// Serialize this config to a pretty-printed TOML string.
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| Error::config(e.to_string()))
    }

    /// Flatten this config into environment variable pairs with `NEURAL_` prefix.
    pub fn to_env_vars(&self) -> Result<Vec<(String, String)>> {
        let value: toml::Value =
            toml::Value::try_from(self).map_err(|e| Error::config(e.to_string()))?;
        let mut vars = Vec::new();
        flatten_toml_value(&value, "NEURAL", &mut vars);
        Ok(vars)
    }
}

// ============================================================================
// Helper: flatten TOML to env vars
// ============================================================================

/// Recursively flatten a TOML value into `KEY=value` pairs.
fn flatten_toml_value(value: &toml::Value, prefix: &str, out: &mut Vec<(String, String)>) {
    match value {
        toml::Value::Table(table) => {
            for (key, val) in table {
                let env_key = format!("{}_{}", prefix, key.to_uppercase());
                flatten_toml_value(val, &env_key, out);
            }
        }
        toml::Value::Array(arr) => {
            if let Ok(json) = serde_json::to_string(arr) {
                out.push((prefix.to_string(), json));
            }
        }
        toml::Value::String(s) => out.push((prefix.to_string(), s.clone())),
        toml::Value::Integer(i) => out.push((prefix.to_string(), i.to_string())),
        toml::Value::Float(f) => out.push((prefix.to_string(), f.to_string())),
        toml::Value::Boolean(b) => out.push((prefix.to_string(), b.to_string())),
        toml::Value::Datetime(dt) => out.push((prefix.to_string(), dt.to_string())),
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::{Mutex, MutexGuard};

    static ENV_LOCK: Mutex<()> = Mutex::new(());

    /// Serializes tests that read or write process environment.
    fn env_lock() -> MutexGuard<'static, ()> {
        ENV_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// RAII guard for env var manipulation in tests.
    struct EnvGuard {
        key: String,
        prev: Option<String>,
    }

    #[allow(unsafe_code)]
    impl EnvGuard {
        fn new(key: &str, value: &str) -> Self {
            let prev = std::env::var(key).ok();
            // SAFETY: callers hold `env_lock()`.
            unsafe { std::env::set_var(key, value) };
            Self {
                key: key.to_string(),
                prev,
            }
        }

        fn remove(key: &str) -> Self {
            let prev = std::env::var(key).ok();
            // SAFETY: callers hold `env_lock()`.
            unsafe { std::env::remove_var(key) };
            Self {
                key: key.to_string(),
                prev,
            }
        }
    }

    #[allow(unsafe_code)]
    impl Drop for EnvGuard {
        fn drop(&mut self) {
            // SAFETY: the guard is dropped before the env lock is released.
            unsafe {
                match &self.prev {
                    Some(val) => std::env::set_var(&self.key, val),
                    None => std::env::remove_var(&self.key),
                }
            }
        }
    }

    // ------------------------------------------------------------------------
    // Default tests
    // ------------------------------------------------------------------------

    #[test]
    fn test_neural_config_default() {
        let config = NeuralConfig::default();
        assert_eq!(config.inference.endpoint, "http://localhost:9200");
        assert_eq!(config.inference.timeout_secs, 30);
        assert!(config.inference.auth_header.is_none());
        assert_eq!(config.inference.retry.max_attempts, 3);
        assert_eq!(config.rewrite, RewriteConfig::default());
        assert!(config.validate().is_ok());
    }

    // ------------------------------------------------------------------------
    // Serialization tests
    // ------------------------------------------------------------------------

    #[test]
    fn test_neural_config_from_toml() {
        let toml_str = r#"
            [inference]
            endpoint = "https://search.internal:9200"
            timeout_secs = 5
            auth_header = "Basic abc"

            [inference.retry]
            max_attempts = 0

            [rewrite]
            max_rounds = 4
            tensor_position = 1
        "#;

        let config: NeuralConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.inference.endpoint, "https://search.internal:9200");
        assert_eq!(config.inference.timeout_secs, 5);
        assert_eq!(config.inference.auth_header.as_deref(), Some("Basic abc"));
        assert_eq!(config.inference.retry.max_attempts, 0);
        assert_eq!(config.inference.retry.initial_delay_ms, 200);
        assert_eq!(config.rewrite.max_rounds, 4);
        assert_eq!(config.rewrite.max_passes_per_round, 32);
        assert_eq!(config.rewrite.tensor_position, Some(1));
    }

    #[test]
    fn test_neural_config_to_toml_roundtrip() {
        let config = NeuralConfig::default();
        let toml_str = config.to_toml_string().unwrap();
        assert!(toml_str.contains("[inference]"));
        assert!(toml_str.contains("[rewrite]"));
        assert!(toml_str.contains("max_rounds = 16"));
        assert!(!toml_str.contains("auth_header"));

        let parsed: NeuralConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.inference.endpoint, config.inference.endpoint);
        assert_eq!(parsed.rewrite, config.rewrite);
    }

    // ------------------------------------------------------------------------
    // Loading tests
    // ------------------------------------------------------------------------

    #[test]
    fn test_neural_config_load_from_file() {
        let _lock = env_lock();
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
                [inference]
                endpoint = "http://models:8080"
                [rewrite]
                max_rounds = 2
            "#,
        )
        .unwrap();

        let config = NeuralConfig::load(Some(path.to_str().unwrap())).unwrap();
        assert_eq!(config.inference.endpoint, "http://models:8080");
        assert_eq!(config.rewrite.max_rounds, 2);
    }

    #[test]
    fn test_neural_config_load_defaults() {
        let _lock = env_lock();
        let config = NeuralConfig::load(Some("/nonexistent/config.toml")).unwrap();
        assert_eq!(config.inference.timeout_secs, 30);
        assert_eq!(config.rewrite.max_rounds, 16);
    }

    #[test]
    fn test_neural_config_load_rejects_invalid() {
        let _lock = env_lock();
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[rewrite]\nmax_rounds = 0\n").unwrap();

        let err = NeuralConfig::load(Some(path.to_str().unwrap())).unwrap_err();
        assert!(err.to_string().contains("max_rounds"));
    }

    #[test]
    fn test_neural_config_load_env_overlay() {
        let _lock = env_lock();
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
                [inference]
                endpoint = "http://from-file:9200"
            "#,
        )
        .unwrap();

        // confyg passes env values as strings, so overlay a string field.
        let _guard = EnvGuard::new("NEURAL_INFERENCE_ENDPOINT", "http://from-env:9200");
        let config = NeuralConfig::load(Some(path.to_str().unwrap())).unwrap();
        assert_eq!(config.inference.endpoint, "http://from-env:9200");
    }

    // ------------------------------------------------------------------------
    // resolve_config_path tests
    // ------------------------------------------------------------------------

    #[test]
    fn test_resolve_config_path_explicit() {
        let path = NeuralConfig::resolve_config_path(Some("/explicit/config.toml"));
        assert_eq!(path, Some(PathBuf::from("/explicit/config.toml")));
    }

    #[test]
    fn test_resolve_config_path_env() {
        let _lock = env_lock();
        let _guard = EnvGuard::new(CONFIG_ENV_VAR, "/env/config.toml");
        let path = NeuralConfig::resolve_config_path(None);
        assert_eq!(path, Some(PathBuf::from("/env/config.toml")));
    }

    #[test]
    fn test_resolve_config_path_default() {
        let _lock = env_lock();
        let _guard = EnvGuard::remove(CONFIG_ENV_VAR);
        let path = NeuralConfig::resolve_config_path(None);
        let p = path.unwrap();
        assert!(p.to_str().unwrap().contains("neural"));
        assert!(p.to_str().unwrap().ends_with("config.toml"));
    }

    // ------------------------------------------------------------------------
    // Validation and client construction
    // ------------------------------------------------------------------------

    #[test]
    fn test_validate_rejects_empty_endpoint() {
        let mut config = NeuralConfig::default();
        config.inference.endpoint = " ".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_timeout() {
        let mut config = NeuralConfig::default();
        config.inference.timeout_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_inference_client_with_and_without_retry() {
        let config = NeuralConfig::default();
        assert!(config.inference_client().is_ok());

        let mut no_retry = NeuralConfig::default();
        no_retry.inference.retry.max_attempts = 0;
        no_retry.inference.auth_header = Some("Bearer t".into());
        assert!(no_retry.inference_client().is_ok());
    }

    // ------------------------------------------------------------------------
    // to_env_vars tests
    // ------------------------------------------------------------------------

    #[test]
    fn test_neural_config_to_env_vars() {
        let config = NeuralConfig::default();
        let vars = config.to_env_vars().unwrap();
        let map: HashMap<_, _> = vars.into_iter().collect();
        assert_eq!(
            map.get("NEURAL_INFERENCE_ENDPOINT").unwrap(),
            "http://localhost:9200"
        );
        assert_eq!(map.get("NEURAL_INFERENCE_RETRY_MAX_ATTEMPTS").unwrap(), "3");
        assert_eq!(map.get("NEURAL_REWRITE_MAX_ROUNDS").unwrap(), "16");
        assert_eq!(
            map.get("NEURAL_REWRITE_TENSOR_NAME").unwrap(),
            "sentence_embedding"
        );
    }

    #[test]
    fn test_neural_config_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<NeuralConfig>();
    }
}
