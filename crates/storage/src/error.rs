// Copyright 2025 LLM Benchkit Contributors
// SPDX-License-Identifier: Apache-2.0

//! Storage errors.

use llm_benchkit_core::BenchmarkStatus;
use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Errors that can occur while reading or writing benchmark data.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database driver error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Referenced run does not exist
    #[error("Run not found: {0}")]
    RunNotFound(String),

    /// The run already reached a terminal status
    #[error("Run {run_id} is already {status} and cannot be modified")]
    TerminalRun {
        /// Run that was targeted.
        run_id: String,
        /// Its stored terminal status.
        status: BenchmarkStatus,
    },

    /// A result for this prompt index was already written
    #[error("Result for prompt {prompt_index} of run {run_id} already exists")]
    DuplicateResult {
        /// Owning run.
        run_id: String,
        /// Prompt index that was written twice.
        prompt_index: u32,
    },

    /// The record violates a data model invariant
    #[error("Invalid record: {0}")]
    Invalid(String),

    /// A stored row could not be decoded
    #[error("Corrupt row: {0}")]
    Corrupt(String),
}

impl From<StoreError> for llm_benchkit_core::Error {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::RunNotFound(id) => llm_benchkit_core::Error::not_found(format!("run {}", id)),
            other => llm_benchkit_core::Error::storage(other.to_string()),
        }
    }
}
