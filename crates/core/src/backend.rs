// Copyright 2025 LLM Benchkit Contributors
// SPDX-License-Identifier: Apache-2.0

//! Inference backend contract.
//!
//! A backend wraps an inference engine that accepts one request at a time.
//! The benchmark runner only ever issues `generate` calls sequentially, so
//! implementations do not need to handle concurrent generation.

use async_trait::async_trait;
use std::path::Path;
use thiserror::Error;

/// Errors raised by an inference backend.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BackendError {
    /// `generate` was called before a successful `initialize`.
    #[error("Backend is not initialized")]
    NotReady,

    /// The model file is missing, unreadable or in an unsupported format.
    #[error("Model file error: {0}")]
    ModelFile(String),

    /// The request could not be delivered.
    #[error("Request failed: {0}")]
    Request(String),

    /// The engine answered with an error or an unusable payload.
    #[error("Invalid response: {0}")]
    Response(String),
}

/// An inference engine invoked once per prompt.
#[async_trait]
pub trait InferenceBackend: Send + Sync {
    /// Load the model at `model_path`.
    ///
    /// Returns `false` if the file is missing, unreadable or rejected. Callers
    /// must not call [`generate`](Self::generate) after a `false`.
    async fn initialize(&self, model_path: &Path) -> bool;

    /// Generate a completion for `prompt`. No timeout is enforced here.
    async fn generate(&self, prompt: &str) -> Result<String, BackendError>;

    /// Whether the backend has a model loaded.
    fn is_ready(&self) -> bool;

    /// Release the model. Safe to call when not initialized.
    async fn shutdown(&self);
}
