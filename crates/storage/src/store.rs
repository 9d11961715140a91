// Copyright 2025 LLM Benchkit Contributors
// SPDX-License-Identifier: Apache-2.0

//! The `ResultStore` contract.

use crate::error::{StoreError, StoreResult};
use async_trait::async_trait;
use llm_benchkit_core::{BenchmarkResult, BenchmarkRun, ModelComparison};
use tokio::sync::watch;

/// Durable storage for benchmark runs and their per-prompt results.
///
/// Implementations must keep these guarantees:
///
/// - a run in a terminal status is never modified again
/// - each `(run_id, prompt_index)` pair is written at most once, with the
///   index inside `[0, total_prompts)`
/// - deleting a run deletes its results
#[async_trait]
pub trait ResultStore: Send + Sync {
    /// Insert a run, replacing a stored non-terminal run with the same id.
    async fn insert_run(&self, run: &BenchmarkRun) -> StoreResult<()>;

    /// Overwrite the stored run with the same id.
    async fn update_run(&self, run: &BenchmarkRun) -> StoreResult<()>;

    /// Append a result to its run.
    async fn insert_result(&self, result: &BenchmarkResult) -> StoreResult<()>;

    /// Fetch a run by id.
    async fn get_run(&self, run_id: &str) -> StoreResult<Option<BenchmarkRun>>;

    /// All runs, most recent start first.
    async fn list_runs(&self) -> StoreResult<Vec<BenchmarkRun>>;

    /// Runs of one model, most recent start first.
    async fn runs_for_model(&self, model_id: &str) -> StoreResult<Vec<BenchmarkRun>>;

    /// Subscribe to the run list.
    ///
    /// The receiver holds the latest `list_runs` snapshot and is updated after
    /// every write.
    fn watch_runs(&self) -> watch::Receiver<Vec<BenchmarkRun>>;

    /// Results of a run ordered by prompt index.
    async fn results_for_run(&self, run_id: &str) -> StoreResult<Vec<BenchmarkResult>>;

    /// Latencies of a run's successful results, ascending.
    async fn response_times(&self, run_id: &str) -> StoreResult<Vec<u64>>;

    /// Delete a run and its results. Returns whether the run existed.
    async fn delete_run(&self, run_id: &str) -> StoreResult<bool>;

    /// Delete every run. Returns the number of runs removed.
    async fn delete_all_runs(&self) -> StoreResult<u64>;

    /// Per-model aggregates over completed runs, fastest average first.
    async fn model_comparisons(&self) -> StoreResult<Vec<ModelComparison>>;
}

/// Reject writes that would break the run/result invariants.
pub(crate) fn check_result_bounds(result: &BenchmarkResult, total_prompts: u32) -> StoreResult<()> {
    if result.prompt_index >= total_prompts {
        return Err(StoreError::Invalid(format!(
            "prompt index {} outside [0, {}) for run {}",
            result.prompt_index, total_prompts, result.run_id
        )));
    }
    Ok(())
}

/// Reject run updates that break `completed <= total`.
pub(crate) fn check_run_counts(run: &BenchmarkRun) -> StoreResult<()> {
    if run.completed_prompts > run.total_prompts {
        return Err(StoreError::Invalid(format!(
            "run {} has {} completed prompts but only {} total",
            run.id, run.completed_prompts, run.total_prompts
        )));
    }
    Ok(())
}
