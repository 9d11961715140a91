// Copyright 2025 LLM Benchkit Contributors
// SPDX-License-Identifier: Apache-2.0

//! The benchmark runner.
//!
//! A [`BenchmarkRunner`] drives one run at a time on a background task. Each
//! prompt is sent to the backend strictly in order; every outcome is
//! persisted before the next prompt is issued, and the latest progress is
//! published on a watch channel.
//!
//! Cancellation is cooperative. It is observed before each prompt and while
//! throttling between prompts; a `generate` call already in flight is allowed
//! to finish and its result is recorded.
//!
//! A panic inside the prompt loop, typically from a backend, is caught and
//! finalizes the run as `FAILED` like any other unexpected error.

use crate::prompts::{select_prompts, PromptSource};
use chrono::Utc;
use futures::future::{BoxFuture, FutureExt, Shared};
use llm_benchkit_core::{
    compute_stats, BackendError, BenchmarkProgress, BenchmarkResult, BenchmarkRun, Error,
    InferenceBackend, Result, RunId,
};
use llm_benchkit_storage::ResultStore;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn, Instrument};

/// Number of recent latencies used for the remaining-time estimate.
pub const ETA_WINDOW: usize = 10;

/// Runner tuning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    /// Pause after every prompt, in milliseconds.
    pub throttle_ms: u64,
    /// Per-prompt overhead added to the remaining-time estimate, in milliseconds.
    pub eta_buffer_ms: u64,
    /// Prompt count used when a request does not specify one.
    pub default_prompt_count: u32,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            throttle_ms: 500,
            eta_buffer_ms: 500,
            default_prompt_count: 100,
        }
    }
}

impl RunnerConfig {
    /// Pause after every prompt.
    pub fn throttle(&self) -> Duration {
        Duration::from_millis(self.throttle_ms)
    }
}

/// Parameters of a single run.
#[derive(Clone)]
pub struct RunRequest {
    /// Model identifier recorded on the run.
    pub model_id: String,
    /// Display name recorded on the run.
    pub model_name: String,
    /// Number of prompts; falls back to [`RunnerConfig::default_prompt_count`].
    pub prompt_count: Option<u32>,
    /// Where prompts come from; falls back to the built-ins.
    pub prompts: Option<Arc<dyn PromptSource>>,
}

impl RunRequest {
    /// Request a run of `model_id` with default count and prompts.
    pub fn new(model_id: impl Into<String>, model_name: impl Into<String>) -> Self {
        Self {
            model_id: model_id.into(),
            model_name: model_name.into(),
            prompt_count: None,
            prompts: None,
        }
    }

    /// Set the number of prompts.
    pub fn with_count(mut self, count: u32) -> Self {
        self.prompt_count = Some(count);
        self
    }

    /// Set the prompt source.
    pub fn with_prompts(mut self, source: Arc<dyn PromptSource>) -> Self {
        self.prompts = Some(source);
        self
    }
}

impl std::fmt::Debug for RunRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunRequest")
            .field("model_id", &self.model_id)
            .field("model_name", &self.model_name)
            .field("prompt_count", &self.prompt_count)
            .field("custom_prompts", &self.prompts.is_some())
            .finish()
    }
}

/// The active run: its id, its cancellation token and a future resolving
/// when its task has finalized the run.
struct RunnerHandle {
    run_id: RunId,
    cancel: CancellationToken,
    done: Shared<BoxFuture<'static, ()>>,
}

/// Executes benchmark runs against an [`InferenceBackend`].
pub struct BenchmarkRunner {
    store: Arc<dyn ResultStore>,
    config: RunnerConfig,
    progress: Arc<watch::Sender<Option<BenchmarkProgress>>>,
    active: Mutex<Option<RunnerHandle>>,
    start_lock: tokio::sync::Mutex<()>,
}

impl BenchmarkRunner {
    /// Create a runner writing to `store`.
    pub fn new(store: Arc<dyn ResultStore>, config: RunnerConfig) -> Self {
        let (progress, _) = watch::channel(None);
        Self {
            store,
            config,
            progress: Arc::new(progress),
            active: Mutex::new(None),
            start_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// Runner settings.
    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    /// Store the runner writes to.
    pub fn store(&self) -> &Arc<dyn ResultStore> {
        &self.store
    }

    /// Subscribe to progress. `None` means no run has reported yet.
    pub fn subscribe(&self) -> watch::Receiver<Option<BenchmarkProgress>> {
        self.progress.subscribe()
    }

    /// Latest progress snapshot.
    pub fn progress(&self) -> Option<BenchmarkProgress> {
        self.progress.borrow().clone()
    }

    /// Id of the run most recently started, while its handle is held.
    pub fn active_run_id(&self) -> Option<RunId> {
        self.lock_active().as_ref().map(|h| h.run_id.clone())
    }

    fn lock_active(&self) -> std::sync::MutexGuard<'_, Option<RunnerHandle>> {
        self.active.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Start a run and return its id once the `RUNNING` run is persisted.
    ///
    /// The request is validated and its prompts selected first; a rejected
    /// request leaves the active run alone. Otherwise any run still in
    /// progress is cancelled and allowed to finalize before the new one is
    /// persisted.
    pub async fn start(
        &self,
        request: RunRequest,
        backend: Arc<dyn InferenceBackend>,
    ) -> Result<RunId> {
        let _serialized = self.start_lock.lock().await;

        // A rejected request leaves the active run untouched.
        if !backend.is_ready() {
            return Err(BackendError::NotReady.into());
        }

        let count = request
            .prompt_count
            .unwrap_or(self.config.default_prompt_count);
        if count == 0 {
            return Err(Error::invalid_input("prompt count must be at least 1"));
        }

        // Prompt files are read with blocking I/O.
        let source = request.prompts.clone();
        let prompts = tokio::task::spawn_blocking(move || {
            select_prompts(source.as_deref(), count as usize)
        })
        .await
        .map_err(|e| Error::Aborted(format!("prompt selection failed: {}", e)))?;

        let previous = self.lock_active().take();
        if let Some(previous) = previous {
            info!(run_id = %previous.run_id, "Cancelling previous run before starting a new one");
            previous.cancel.cancel();
            previous.done.await;
        }

        let run = BenchmarkRun::start(&request.model_id, &request.model_name, count);
        self.store.insert_run(&run).await?;
        self.progress.send_replace(None);

        let run_id = run.id.clone();
        let cancel = CancellationToken::new();
        let span = tracing::info_span!("benchmark_run", run_id = %run_id, model_id = %run.model_id);
        let execution = RunExecution {
            store: Arc::clone(&self.store),
            backend,
            progress: Arc::clone(&self.progress),
            config: self.config.clone(),
            cancel: cancel.clone(),
        };

        info!(
            run_id = %run_id,
            model_id = %run.model_id,
            prompts = prompts.len(),
            "Benchmark run started"
        );

        let task = tokio::spawn(execution.execute(run, prompts).instrument(span));
        let done = task
            .map(|joined| {
                if let Err(e) = joined {
                    error!(error = %e, "Benchmark task aborted");
                }
            })
            .boxed()
            .shared();

        *self.lock_active() = Some(RunnerHandle {
            run_id: run_id.clone(),
            cancel,
            done,
        });
        Ok(run_id)
    }

    /// Ask the active run to stop at its next checkpoint. Idempotent.
    pub fn cancel(&self) {
        if let Some(handle) = self.lock_active().as_ref() {
            if !handle.cancel.is_cancelled() {
                info!(run_id = %handle.run_id, "Cancellation requested");
                handle.cancel.cancel();
            }
        }
    }

    /// Wait until the active run, if any, reaches a terminal status.
    ///
    /// Returns the id of the run waited on.
    pub async fn wait(&self) -> Option<RunId> {
        let (run_id, done) = {
            let guard = self.lock_active();
            let handle = guard.as_ref()?;
            (handle.run_id.clone(), handle.done.clone())
        };
        done.await;
        Some(run_id)
    }
}

/// Why the prompt loop stopped.
enum LoopExit {
    Finished,
    Cancelled,
}

/// Everything the background task needs.
struct RunExecution {
    store: Arc<dyn ResultStore>,
    backend: Arc<dyn InferenceBackend>,
    progress: Arc<watch::Sender<Option<BenchmarkProgress>>>,
    config: RunnerConfig,
    cancel: CancellationToken,
}

impl RunExecution {
    async fn execute(self, mut run: BenchmarkRun, prompts: Vec<String>) {
        let mut results = Vec::with_capacity(prompts.len());
        let outcome = AssertUnwindSafe(self.prompt_loop(&mut run, &prompts, &mut results))
            .catch_unwind()
            .await
            .unwrap_or_else(|payload| Err(Error::Aborted(panic_message(&*payload))));

        let finalized = match outcome {
            Ok(LoopExit::Finished) => self.complete(&mut run, &results).await,
            Ok(LoopExit::Cancelled) => self.cancelled(&mut run).await,
            Err(e) => {
                error!(error = %e, "Benchmark run failed");
                self.failed(&mut run, &e).await
            }
        };

        if let Err(e) = finalized {
            error!(error = %e, "Failed to finalize benchmark run");
        }
        metrics::counter!(
            "benchkit_runs_total",
            "model" => run.model_id.clone(),
            "status" => run.status.as_str()
        )
        .increment(1);
    }

    async fn prompt_loop(
        &self,
        run: &mut BenchmarkRun,
        prompts: &[String],
        results: &mut Vec<BenchmarkResult>,
    ) -> Result<LoopExit> {
        let total = prompts.len();
        let mut latencies: Vec<f64> = Vec::new();

        for (index, prompt) in prompts.iter().enumerate() {
            if self.cancel.is_cancelled() {
                return Ok(LoopExit::Cancelled);
            }

            let prompt_index = index as u32;
            let attempted = prompt_index + 1;
            let start_time = Utc::now();
            let clock = Instant::now();
            let outcome = self.backend.generate(prompt).await;
            let elapsed_ms = clock.elapsed().as_millis() as u64;
            let end_time = Utc::now();

            match outcome {
                Ok(response) => {
                    let result = BenchmarkResult::success(
                        &run.id,
                        prompt_index,
                        prompt.as_str(),
                        response,
                        start_time,
                        end_time,
                        elapsed_ms,
                    );
                    self.store.insert_result(&result).await?;
                    results.push(result);

                    latencies.push(elapsed_ms as f64);
                    let average = mean(&latencies);
                    run.record_progress(attempted, average)?;
                    self.store.update_run(run).await?;

                    self.progress.send_replace(Some(BenchmarkProgress {
                        run_id: run.id.clone(),
                        model_id: run.model_id.clone(),
                        current_prompt: attempted,
                        total_prompts: run.total_prompts,
                        current_latency: elapsed_ms as f64,
                        average_latency: average,
                        estimated_time_remaining_ms: estimate_remaining_ms(
                            &latencies,
                            total - index - 1,
                            self.config.eta_buffer_ms,
                        ),
                        is_completed: false,
                        is_cancelled: false,
                        error: None,
                    }));

                    metrics::counter!(
                        "benchkit_prompts_total",
                        "model" => run.model_id.clone(),
                        "outcome" => "success"
                    )
                    .increment(1);
                    metrics::histogram!("benchkit_prompt_latency_ms", "model" => run.model_id.clone())
                        .record(elapsed_ms as f64);
                    debug!(prompt_index, latency_ms = elapsed_ms, "Prompt completed");
                }
                Err(e) => {
                    warn!(prompt_index, error = %e, "Prompt failed");
                    let result = BenchmarkResult::failure(
                        &run.id,
                        prompt_index,
                        prompt.as_str(),
                        start_time,
                        end_time,
                        elapsed_ms,
                        e.to_string(),
                    );
                    self.store.insert_result(&result).await?;
                    results.push(result);

                    let average = run.average_latency;
                    run.record_progress(attempted, average)?;
                    self.store.update_run(run).await?;

                    metrics::counter!(
                        "benchkit_prompts_total",
                        "model" => run.model_id.clone(),
                        "outcome" => "failure"
                    )
                    .increment(1);
                }
            }

            tokio::select! {
                _ = tokio::time::sleep(self.config.throttle()) => {}
                _ = self.cancel.cancelled() => return Ok(LoopExit::Cancelled),
            }
        }

        Ok(LoopExit::Finished)
    }

    async fn complete(&self, run: &mut BenchmarkRun, results: &[BenchmarkResult]) -> Result<()> {
        let stats = compute_stats(results);
        run.complete(&stats)?;
        self.store.update_run(run).await?;

        self.progress.send_replace(Some(BenchmarkProgress {
            run_id: run.id.clone(),
            model_id: run.model_id.clone(),
            current_prompt: run.total_prompts,
            total_prompts: run.total_prompts,
            current_latency: stats.average_latency,
            average_latency: stats.average_latency,
            estimated_time_remaining_ms: 0,
            is_completed: true,
            is_cancelled: false,
            error: None,
        }));

        info!(
            average_ms = stats.average_latency,
            p99_ms = stats.p99_latency,
            success_rate = stats.success_rate,
            "Benchmark run completed"
        );
        Ok(())
    }

    async fn cancelled(&self, run: &mut BenchmarkRun) -> Result<()> {
        run.cancel()?;
        self.store.update_run(run).await?;
        self.publish_terminal(run, true, None);
        info!(completed = run.completed_prompts, "Benchmark run cancelled");
        Ok(())
    }

    async fn failed(&self, run: &mut BenchmarkRun, cause: &Error) -> Result<()> {
        // Publish first so observers learn about the failure even if the
        // store is what broke.
        self.publish_terminal(run, false, Some(cause.to_string()));
        run.fail()?;
        self.store.update_run(run).await?;
        Ok(())
    }

    fn publish_terminal(&self, run: &BenchmarkRun, cancelled: bool, error: Option<String>) {
        self.progress.send_modify(|slot| {
            let mut snapshot = slot.take().unwrap_or_else(|| BenchmarkProgress {
                run_id: run.id.clone(),
                model_id: run.model_id.clone(),
                current_prompt: run.completed_prompts,
                total_prompts: run.total_prompts,
                current_latency: 0.0,
                average_latency: run.average_latency,
                estimated_time_remaining_ms: 0,
                is_completed: false,
                is_cancelled: false,
                error: None,
            });
            snapshot.current_prompt = run.completed_prompts;
            snapshot.estimated_time_remaining_ms = 0;
            snapshot.is_completed = true;
            snapshot.is_cancelled = cancelled;
            snapshot.error = error;
            *slot = Some(snapshot);
        });
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    let detail = payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown cause".to_string());
    format!("run task panicked: {}", detail)
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

/// Estimated milliseconds for `remaining` prompts.
///
/// Mean of the last [`ETA_WINDOW`] successful latencies plus `buffer_ms`,
/// times `remaining`. Zero when nothing has been measured or nothing remains.
pub fn estimate_remaining_ms(latencies: &[f64], remaining: usize, buffer_ms: u64) -> u64 {
    if latencies.is_empty() || remaining == 0 {
        return 0;
    }
    let recent = &latencies[latencies.len().saturating_sub(ETA_WINDOW)..];
    ((mean(recent) + buffer_ms as f64) * remaining as f64) as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_estimate_remaining_uses_recent_window() {
        let mut latencies = vec![10_000.0; 5];
        latencies.extend(std::iter::repeat(100.0).take(10));
        assert_eq!(estimate_remaining_ms(&latencies, 3, 500), 1800);
    }

    #[test]
    fn test_estimate_remaining_zero_cases() {
        assert_eq!(estimate_remaining_ms(&[], 5, 500), 0);
        assert_eq!(estimate_remaining_ms(&[200.0], 0, 500), 0);
        assert_eq!(estimate_remaining_ms(&[200.0, 400.0], 2, 0), 600);
    }

    #[test]
    fn test_runner_config_defaults() {
        let config: RunnerConfig = serde_json::from_str(r#"{"throttle_ms": 0}"#).unwrap();
        assert_eq!(config.throttle(), Duration::ZERO);
        assert_eq!(config.eta_buffer_ms, 500);
        assert_eq!(config.default_prompt_count, 100);
    }
}
