// Copyright 2025 LLM Benchkit Contributors
// SPDX-License-Identifier: Apache-2.0

//! Layered configuration.
//!
//! Sources, lowest precedence first:
//!
//! 1. built-in defaults
//! 2. an optional config file (`benchkit.toml` unless overridden)
//! 3. `BENCHKIT_*` environment variables, with `__` separating nested keys
//!    (`BENCHKIT_RUNNER__THROTTLE_MS=250`)
//!
//! A `.env` file in the working directory is loaded into the environment
//! before any of this happens.

use config::{Config, ConfigError, Environment, File};
use llm_benchkit_benchmarks::RunnerConfig;
use llm_benchkit_core::ModelCatalog;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default config file stem, resolved against the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "benchkit.toml";

/// Prefix of configuration environment variables.
pub const ENV_PREFIX: &str = "BENCHKIT";

/// Application settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// SQLite connection string for the result store.
    pub database_url: String,
    /// Base URL of the inference server.
    pub server_url: String,
    /// Client-side request timeout; unset waits indefinitely.
    pub request_timeout_secs: Option<u64>,
    /// Tokens to predict per prompt.
    pub n_predict: u32,
    /// Directory that relative model files are resolved against.
    pub model_dir: PathBuf,
    /// Log filter used when `RUST_LOG` is unset.
    pub log_level: String,
    /// Emit logs as JSON lines.
    pub log_json: bool,
    /// Address for the Prometheus scrape endpoint; disabled when unset.
    pub metrics_addr: Option<SocketAddr>,
    /// Runner tuning.
    pub runner: RunnerConfig,
    /// Known models.
    pub models: ModelCatalog,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            database_url: "sqlite://benchkit.db".to_string(),
            server_url: "http://127.0.0.1:8080".to_string(),
            request_timeout_secs: None,
            n_predict: 1024,
            model_dir: PathBuf::from("models"),
            log_level: "info".to_string(),
            log_json: false,
            metrics_addr: None,
            runner: RunnerConfig::default(),
            models: ModelCatalog::default(),
        }
    }
}

impl Settings {
    /// Load settings from `.env`, the config file and the process environment.
    ///
    /// A missing config file is not an error unless `config_file` was given
    /// explicitly.
    pub fn load(config_file: Option<&Path>) -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::load_from(config_file, None)
    }

    /// Load settings with an explicit environment map instead of the process
    /// environment.
    pub fn load_from(
        config_file: Option<&Path>,
        env: Option<HashMap<String, String>>,
    ) -> Result<Self, ConfigError> {
        let file = match config_file {
            Some(path) => File::from(path).required(true),
            None => File::with_name(DEFAULT_CONFIG_FILE).required(false),
        };

        Config::builder()
            .add_source(Config::try_from(&Settings::default())?)
            .add_source(file)
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .source(env),
            )
            .build()?
            .try_deserialize()
    }

    /// Request timeout as a duration.
    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }

    /// Resolve the model file for `model_id`.
    ///
    /// An explicit path wins. Otherwise the catalog entry's file is used,
    /// relative to [`model_dir`](Self::model_dir) unless absolute.
    pub fn model_path(&self, model_id: &str, explicit: Option<&Path>) -> Option<PathBuf> {
        if let Some(path) = explicit {
            return Some(path.to_path_buf());
        }
        let file = self.models.find(model_id)?.file.as_ref()?;
        Some(if file.is_absolute() {
            file.clone()
        } else {
            self.model_dir.join(file)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn env(pairs: &[(&str, &str)]) -> Option<HashMap<String, String>> {
        Some(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }

    #[test]
    fn test_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("absent.toml");
        // An explicit file must exist.
        assert!(Settings::load_from(Some(&missing), env(&[])).is_err());

        let settings = Settings::load_from(None, env(&[])).unwrap();
        assert_eq!(settings.database_url, "sqlite://benchkit.db");
        assert_eq!(settings.n_predict, 1024);
        assert_eq!(settings.runner.throttle_ms, 500);
        assert_eq!(settings.runner.eta_buffer_ms, 500);
        assert_eq!(settings.runner.default_prompt_count, 100);
        assert_eq!(settings.models.display_name("lfm2"), "LFM2 1.2B");
        assert!(settings.metrics_addr.is_none());
    }

    #[test]
    fn test_file_then_env_precedence() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
server_url = "http://gpu-box:9000"
n_predict = 256

[runner]
throttle_ms = 100

[[models]]
id = "tiny"
display_name = "Tiny Llama"
file = "/opt/models/tiny.gguf"
"#
        )
        .unwrap();

        let settings = Settings::load_from(
            Some(file.path()),
            env(&[
                ("BENCHKIT_N_PREDICT", "64"),
                ("BENCHKIT_RUNNER__ETA_BUFFER_MS", "0"),
                ("BENCHKIT_METRICS_ADDR", "127.0.0.1:9100"),
            ]),
        )
        .unwrap();

        assert_eq!(settings.server_url, "http://gpu-box:9000");
        assert_eq!(settings.n_predict, 64);
        assert_eq!(settings.runner.throttle_ms, 100);
        assert_eq!(settings.runner.eta_buffer_ms, 0);
        assert_eq!(settings.runner.default_prompt_count, 100);
        assert_eq!(settings.metrics_addr, Some("127.0.0.1:9100".parse().unwrap()));
        assert_eq!(
            settings.model_path("tiny", None),
            Some(PathBuf::from("/opt/models/tiny.gguf"))
        );
    }

    #[test]
    fn test_model_path_resolution() {
        let settings = Settings::default();
        assert_eq!(
            settings.model_path("lfm2", None),
            Some(PathBuf::from("models/LFM2-1.2B-Q4_0.gguf"))
        );
        assert_eq!(settings.model_path("phi4", None), None);
        assert_eq!(
            settings.model_path("phi4", Some(Path::new("/tmp/phi.gguf"))),
            Some(PathBuf::from("/tmp/phi.gguf"))
        );
    }
}
