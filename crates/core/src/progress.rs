// Copyright 2025 LLM Benchkit Contributors
// SPDX-License-Identifier: Apache-2.0

//! Live progress snapshots published while a run executes.

use crate::types::RunId;
use serde::{Deserialize, Serialize};

/// Latest known state of an active or just-finished run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkProgress {
    /// Run the snapshot belongs to.
    pub run_id: RunId,
    /// Model under test.
    pub model_id: String,
    /// Number of prompts processed, 1-based.
    pub current_prompt: u32,
    /// Number of prompts scheduled.
    pub total_prompts: u32,
    /// Latency of the latest prompt in milliseconds.
    pub current_latency: f64,
    /// Mean latency so far in milliseconds.
    pub average_latency: f64,
    /// Estimated milliseconds until the run finishes.
    pub estimated_time_remaining_ms: u64,
    /// Whether the run reached a terminal status.
    #[serde(default)]
    pub is_completed: bool,
    /// Whether the run was cancelled.
    #[serde(default)]
    pub is_cancelled: bool,
    /// Error that aborted the run, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
