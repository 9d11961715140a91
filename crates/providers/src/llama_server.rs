// Copyright 2025 LLM Benchkit Contributors
// SPDX-License-Identifier: Apache-2.0

//! Backend for a llama.cpp-compatible HTTP server.
//!
//! The server owns the model runtime. This backend verifies the local model
//! file, probes `/health` and then sends one `/completion` request per prompt.

use async_trait::async_trait;
use llm_benchkit_core::{BackendError, InferenceBackend};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tracing::{debug, info, instrument, warn};

/// Magic bytes at the start of every GGUF model file.
pub const GGUF_MAGIC: &[u8; 4] = b"GGUF";

/// Default number of tokens to predict per prompt.
pub const DEFAULT_N_PREDICT: u32 = 1024;

/// Connection settings for [`LlamaServerBackend`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlamaServerConfig {
    /// Base URL of the server, e.g. `http://127.0.0.1:8080`.
    pub base_url: String,
    /// Maximum tokens to generate per completion.
    pub n_predict: u32,
    /// Client-side request timeout. `None` waits for the server indefinitely.
    pub request_timeout: Option<Duration>,
}

impl Default for LlamaServerConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8080".to_string(),
            n_predict: DEFAULT_N_PREDICT,
            request_timeout: None,
        }
    }
}

impl LlamaServerConfig {
    /// Settings for the server at `base_url`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    /// Set the per-completion token limit.
    pub fn with_n_predict(mut self, n_predict: u32) -> Self {
        self.n_predict = n_predict;
        self
    }

    /// Set a client-side request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }
}

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    prompt: &'a str,
    n_predict: u32,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    content: String,
}

/// [`InferenceBackend`] talking to `llama-server` over HTTP.
pub struct LlamaServerBackend {
    client: reqwest::Client,
    config: LlamaServerConfig,
    ready: AtomicBool,
}

impl LlamaServerBackend {
    /// Create a backend. No connection is made until [`initialize`](InferenceBackend::initialize).
    pub fn new(config: LlamaServerConfig) -> Result<Self, BackendError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| BackendError::Request(e.to_string()))?;
        Ok(Self {
            client,
            config,
            ready: AtomicBool::new(false),
        })
    }

    /// Connection settings.
    pub fn config(&self) -> &LlamaServerConfig {
        &self.config
    }

    async fn check_health(&self) -> Result<(), BackendError> {
        let url = self.config.endpoint("/health");
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| BackendError::Request(e.to_string()))?;
        if !response.status().is_success() {
            return Err(BackendError::Response(format!(
                "health check returned {}",
                response.status()
            )));
        }
        Ok(())
    }
}

/// Verify that `path` is a readable GGUF file.
pub async fn check_model_file(path: &Path) -> Result<(), BackendError> {
    let mut file = tokio::fs::File::open(path)
        .await
        .map_err(|e| BackendError::ModelFile(format!("{}: {}", path.display(), e)))?;
    let mut magic = [0u8; 4];
    file.read_exact(&mut magic)
        .await
        .map_err(|e| BackendError::ModelFile(format!("{}: {}", path.display(), e)))?;
    if &magic != GGUF_MAGIC {
        return Err(BackendError::ModelFile(format!(
            "{} is not a GGUF file",
            path.display()
        )));
    }
    Ok(())
}

#[async_trait]
impl InferenceBackend for LlamaServerBackend {
    #[instrument(skip(self), fields(server = %self.config.base_url))]
    async fn initialize(&self, model_path: &Path) -> bool {
        if let Err(e) = check_model_file(model_path).await {
            warn!(error = %e, "Rejected model file");
            return false;
        }
        if let Err(e) = self.check_health().await {
            warn!(error = %e, "Inference server is not healthy");
            return false;
        }
        self.ready.store(true, Ordering::SeqCst);
        info!(model = %model_path.display(), "Inference backend ready");
        true
    }

    async fn generate(&self, prompt: &str) -> Result<String, BackendError> {
        if !self.is_ready() {
            return Err(BackendError::NotReady);
        }

        let url = self.config.endpoint("/completion");
        debug!(url = %url, prompt_len = prompt.len(), "Sending completion request");

        let response = self
            .client
            .post(&url)
            .json(&CompletionRequest {
                prompt,
                n_predict: self.config.n_predict,
            })
            .send()
            .await
            .map_err(|e| BackendError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BackendError::Response(format!("{}: {}", status, body)));
        }

        let completion: CompletionResponse = response
            .json()
            .await
            .map_err(|e| BackendError::Response(e.to_string()))?;
        Ok(completion.content)
    }

    fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    async fn shutdown(&self) {
        if self.ready.swap(false, Ordering::SeqCst) {
            info!("Inference backend shut down");
        }
    }
}
