// Copyright 2025 LLM Benchkit Contributors
// SPDX-License-Identifier: Apache-2.0

//! Benchmark run and result records.
//!
//! A [`BenchmarkRun`] is one execution of a fixed-size prompt sequence against a
//! single model. Each attempted prompt produces exactly one [`BenchmarkResult`].
//! Runs move through the status machine
//!
//! ```text
//! PENDING -> RUNNING -> { COMPLETED | FAILED | CANCELLED }
//! ```
//!
//! and terminal statuses are absorbing.

use crate::stats::BenchmarkStats;
use crate::tokens::estimate_tokens;
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Unique identifier of a benchmark run.
pub type RunId = String;

/// Unique identifier of a single prompt result.
pub type ResultId = String;

/// Status of a benchmark run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum BenchmarkStatus {
    /// Conceptual pre-state; runs are created directly in `Running`.
    #[default]
    Pending,
    /// Prompts are being executed.
    Running,
    /// All prompts were attempted.
    Completed,
    /// The run aborted on an unexpected error.
    Failed,
    /// The run was stopped by the caller.
    Cancelled,
}

impl BenchmarkStatus {
    /// Storage representation of the status.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Running => "RUNNING",
            Self::Completed => "COMPLETED",
            Self::Failed => "FAILED",
            Self::Cancelled => "CANCELLED",
        }
    }

    /// Whether the status is absorbing.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }

    /// Whether the state machine allows moving from `self` to `next`.
    pub fn can_transition_to(&self, next: BenchmarkStatus) -> bool {
        match (self, next) {
            (Self::Pending, Self::Running) => true,
            (Self::Pending | Self::Running, s) if s.is_terminal() => true,
            (Self::Running, Self::Running) => true,
            _ => false,
        }
    }
}

impl fmt::Display for BenchmarkStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BenchmarkStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "PENDING" => Ok(Self::Pending),
            "RUNNING" => Ok(Self::Running),
            "COMPLETED" => Ok(Self::Completed),
            "FAILED" => Ok(Self::Failed),
            "CANCELLED" => Ok(Self::Cancelled),
            other => Err(Error::invalid_input(format!(
                "unknown benchmark status '{}'",
                other
            ))),
        }
    }
}

/// One execution of a prompt sequence against a model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkRun {
    /// Unique run ID (UUID v4).
    pub id: RunId,
    /// Identifier of the model under test.
    pub model_id: String,
    /// Human-readable model name.
    pub model_name: String,
    /// When the run started.
    pub start_time: DateTime<Utc>,
    /// When the run reached a terminal status.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
    /// Number of prompts scheduled.
    pub total_prompts: u32,
    /// Number of prompts attempted so far.
    pub completed_prompts: u32,
    /// Current status.
    pub status: BenchmarkStatus,
    /// Mean latency of successful prompts, in milliseconds.
    pub average_latency: f64,
    /// 99th percentile latency, in milliseconds.
    pub p99_latency: f64,
    /// Fastest successful prompt, in milliseconds.
    pub min_latency: f64,
    /// Slowest successful prompt, in milliseconds.
    pub max_latency: f64,
    /// Estimated response tokens per second.
    pub tokens_per_second: f64,
}

impl BenchmarkRun {
    /// Create a run in the `Running` state, starting now.
    pub fn start(
        model_id: impl Into<String>,
        model_name: impl Into<String>,
        total_prompts: u32,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            model_id: model_id.into(),
            model_name: model_name.into(),
            start_time: Utc::now(),
            end_time: None,
            total_prompts,
            completed_prompts: 0,
            status: BenchmarkStatus::Running,
            average_latency: 0.0,
            p99_latency: 0.0,
            min_latency: 0.0,
            max_latency: 0.0,
            tokens_per_second: 0.0,
        }
    }

    /// Record incremental progress while the run is active.
    pub fn record_progress(&mut self, completed_prompts: u32, average_latency: f64) -> Result<()> {
        if self.status.is_terminal() {
            return Err(self.transition_error(self.status));
        }
        if completed_prompts > self.total_prompts {
            return Err(Error::invalid_input(format!(
                "completed prompts {} exceeds total {}",
                completed_prompts, self.total_prompts
            )));
        }
        self.completed_prompts = completed_prompts;
        self.average_latency = average_latency;
        Ok(())
    }

    /// Finalize the run as completed with the given aggregate statistics.
    pub fn complete(&mut self, stats: &BenchmarkStats) -> Result<()> {
        self.finish(BenchmarkStatus::Completed)?;
        self.completed_prompts = stats.total_prompts.min(self.total_prompts);
        self.average_latency = stats.average_latency;
        self.p99_latency = stats.p99_latency;
        self.min_latency = stats.min_latency;
        self.max_latency = stats.max_latency;
        self.tokens_per_second = stats.tokens_per_second;
        Ok(())
    }

    /// Finalize the run as cancelled.
    pub fn cancel(&mut self) -> Result<()> {
        self.finish(BenchmarkStatus::Cancelled)
    }

    /// Finalize the run as failed.
    pub fn fail(&mut self) -> Result<()> {
        self.finish(BenchmarkStatus::Failed)
    }

    fn finish(&mut self, status: BenchmarkStatus) -> Result<()> {
        if !self.status.can_transition_to(status) {
            return Err(self.transition_error(status));
        }
        self.status = status;
        self.end_time = Some(Utc::now());
        Ok(())
    }

    fn transition_error(&self, to: BenchmarkStatus) -> Error {
        Error::InvalidTransition {
            run_id: self.id.clone(),
            from: self.status.to_string(),
            to: to.to_string(),
        }
    }

    /// Whether the run is in a terminal status.
    pub fn is_finished(&self) -> bool {
        self.status.is_terminal()
    }

    /// Attempted prompts as a percentage of scheduled prompts.
    pub fn completion_rate(&self) -> f64 {
        if self.total_prompts == 0 {
            0.0
        } else {
            self.completed_prompts as f64 / self.total_prompts as f64 * 100.0
        }
    }
}

/// Outcome of one prompt within a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkResult {
    /// Unique result ID (UUID v4).
    pub id: ResultId,
    /// Run that owns this result.
    pub run_id: RunId,
    /// 0-based position of the prompt within the run.
    pub prompt_index: u32,
    /// Prompt text sent to the backend.
    pub prompt: String,
    /// Response text; empty for failures.
    pub response: String,
    /// When the request was issued.
    pub start_time: DateTime<Utc>,
    /// When the request returned.
    pub end_time: DateTime<Utc>,
    /// Wall-clock latency in milliseconds.
    pub response_time_ms: u64,
    /// Estimated tokens in the response.
    pub token_count: u32,
    /// Estimated tokens in the prompt.
    pub prompt_tokens: u32,
    /// Estimated tokens in the response.
    pub response_tokens: u32,
    /// Prompt plus response token estimate.
    pub context_length: u32,
    /// Whether the backend produced a response.
    pub success: bool,
    /// Backend error for failed prompts.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl BenchmarkResult {
    /// Build a successful result, estimating token counts from the texts.
    pub fn success(
        run_id: impl Into<RunId>,
        prompt_index: u32,
        prompt: impl Into<String>,
        response: impl Into<String>,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
        response_time_ms: u64,
    ) -> Self {
        let prompt = prompt.into();
        let response = response.into();
        let prompt_tokens = estimate_tokens(&prompt);
        let response_tokens = estimate_tokens(&response);

        Self {
            id: Uuid::new_v4().to_string(),
            run_id: run_id.into(),
            prompt_index,
            prompt,
            response,
            start_time,
            end_time,
            response_time_ms,
            token_count: response_tokens,
            prompt_tokens,
            response_tokens,
            context_length: prompt_tokens + response_tokens,
            success: true,
            error_message: None,
        }
    }

    /// Build a failed result with an empty response and zero token counts.
    pub fn failure(
        run_id: impl Into<RunId>,
        prompt_index: u32,
        prompt: impl Into<String>,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
        response_time_ms: u64,
        error_message: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            run_id: run_id.into(),
            prompt_index,
            prompt: prompt.into(),
            response: String::new(),
            start_time,
            end_time,
            response_time_ms,
            token_count: 0,
            prompt_tokens: 0,
            response_tokens: 0,
            context_length: 0,
            success: false,
            error_message: Some(error_message.into()),
        }
    }
}

/// Aggregate of completed runs for one model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelComparison {
    /// Model identifier.
    pub model_id: String,
    /// Human-readable model name.
    pub model_name: String,
    /// Number of completed runs.
    pub run_count: u32,
    /// Start time of the most recent completed run.
    pub last_run_time: DateTime<Utc>,
    /// Mean of the runs' average latencies, in milliseconds.
    pub avg_latency: f64,
    /// Mean of the runs' p99 latencies, in milliseconds.
    pub avg_p99_latency: f64,
    /// Mean of the runs' tokens per second.
    pub avg_tokens_per_second: f64,
}
