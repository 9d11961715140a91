// Copyright 2025 LLM Benchkit Contributors
// SPDX-License-Identifier: Apache-2.0

//! Error types shared across LLM Benchkit crates.

use thiserror::Error;

/// Result type alias using the core [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Errors produced by core benchmark operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Input failed validation.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A run status change that the state machine does not allow.
    #[error("Invalid status transition for run {run_id}: {from} -> {to}")]
    InvalidTransition {
        /// Run whose status was being changed.
        run_id: String,
        /// Current status.
        from: String,
        /// Requested status.
        to: String,
    },

    /// A referenced entity does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The inference backend failed.
    #[error("Backend error: {0}")]
    Backend(#[from] crate::backend::BackendError),

    /// The run task stopped without reaching a normal exit, e.g. a
    /// backend panic.
    #[error("Run aborted: {0}")]
    Aborted(String),

    /// The result store failed.
    #[error("Storage error: {0}")]
    Storage(String),

    /// JSON serialization failed.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Filesystem I/O failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create an invalid input error.
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Create a not found error.
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    /// Create a storage error.
    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }
}
