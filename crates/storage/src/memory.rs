// Copyright 2025 LLM Benchkit Contributors
// SPDX-License-Identifier: Apache-2.0

//! In-process result store.
//!
//! Keeps everything in memory behind a single lock. Useful for tests and for
//! one-off runs that only need exports, not history.

use crate::error::{StoreError, StoreResult};
use crate::store::{check_result_bounds, check_run_counts, ResultStore};
use async_trait::async_trait;
use llm_benchkit_core::{BenchmarkResult, BenchmarkRun, BenchmarkStatus, ModelComparison};
use std::collections::{BTreeMap, HashMap};
use tokio::sync::{watch, RwLock};

#[derive(Default)]
struct MemoryState {
    runs: HashMap<String, BenchmarkRun>,
    results: HashMap<String, Vec<BenchmarkResult>>,
}

impl MemoryState {
    fn sorted_runs(&self, filter: impl Fn(&BenchmarkRun) -> bool) -> Vec<BenchmarkRun> {
        let mut runs: Vec<BenchmarkRun> = self.runs.values().filter(|&r| filter(r)).cloned().collect();
        runs.sort_by(|a, b| b.start_time.cmp(&a.start_time).then_with(|| a.id.cmp(&b.id)));
        runs
    }
}

/// Result store backed by in-memory maps.
pub struct MemoryStore {
    state: RwLock<MemoryState>,
    runs_tx: watch::Sender<Vec<BenchmarkRun>>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        let (runs_tx, _) = watch::channel(Vec::new());
        Self {
            state: RwLock::new(MemoryState::default()),
            runs_tx,
        }
    }

    fn publish(&self, state: &MemoryState) {
        self.runs_tx.send_replace(state.sorted_runs(|_| true));
    }
}

#[async_trait]
impl ResultStore for MemoryStore {
    async fn insert_run(&self, run: &BenchmarkRun) -> StoreResult<()> {
        check_run_counts(run)?;
        let mut state = self.state.write().await;
        if let Some(existing) = state.runs.get(&run.id) {
            if existing.status.is_terminal() {
                return Err(StoreError::TerminalRun {
                    run_id: run.id.clone(),
                    status: existing.status,
                });
            }
        }
        state.runs.insert(run.id.clone(), run.clone());
        self.publish(&state);
        Ok(())
    }

    async fn update_run(&self, run: &BenchmarkRun) -> StoreResult<()> {
        check_run_counts(run)?;
        let mut state = self.state.write().await;
        let existing = state
            .runs
            .get_mut(&run.id)
            .ok_or_else(|| StoreError::RunNotFound(run.id.clone()))?;
        if existing.status.is_terminal() {
            return Err(StoreError::TerminalRun {
                run_id: run.id.clone(),
                status: existing.status,
            });
        }
        *existing = run.clone();
        self.publish(&state);
        Ok(())
    }

    async fn insert_result(&self, result: &BenchmarkResult) -> StoreResult<()> {
        let mut state = self.state.write().await;
        let total = state
            .runs
            .get(&result.run_id)
            .map(|r| r.total_prompts)
            .ok_or_else(|| StoreError::RunNotFound(result.run_id.clone()))?;
        check_result_bounds(result, total)?;

        let results = state.results.entry(result.run_id.clone()).or_default();
        if results.iter().any(|r| r.prompt_index == result.prompt_index) {
            return Err(StoreError::DuplicateResult {
                run_id: result.run_id.clone(),
                prompt_index: result.prompt_index,
            });
        }
        let pos = results.partition_point(|r| r.prompt_index < result.prompt_index);
        results.insert(pos, result.clone());
        Ok(())
    }

    async fn get_run(&self, run_id: &str) -> StoreResult<Option<BenchmarkRun>> {
        Ok(self.state.read().await.runs.get(run_id).cloned())
    }

    async fn list_runs(&self) -> StoreResult<Vec<BenchmarkRun>> {
        Ok(self.state.read().await.sorted_runs(|_| true))
    }

    async fn runs_for_model(&self, model_id: &str) -> StoreResult<Vec<BenchmarkRun>> {
        Ok(self
            .state
            .read()
            .await
            .sorted_runs(|r| r.model_id == model_id))
    }

    fn watch_runs(&self) -> watch::Receiver<Vec<BenchmarkRun>> {
        self.runs_tx.subscribe()
    }

    async fn results_for_run(&self, run_id: &str) -> StoreResult<Vec<BenchmarkResult>> {
        Ok(self
            .state
            .read()
            .await
            .results
            .get(run_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn response_times(&self, run_id: &str) -> StoreResult<Vec<u64>> {
        let state = self.state.read().await;
        let mut times: Vec<u64> = state
            .results
            .get(run_id)
            .map(|rs| rs.iter().filter(|r| r.success).map(|r| r.response_time_ms).collect())
            .unwrap_or_default();
        times.sort_unstable();
        Ok(times)
    }

    async fn delete_run(&self, run_id: &str) -> StoreResult<bool> {
        let mut state = self.state.write().await;
        let existed = state.runs.remove(run_id).is_some();
        state.results.remove(run_id);
        if existed {
            self.publish(&state);
        }
        Ok(existed)
    }

    async fn delete_all_runs(&self) -> StoreResult<u64> {
        let mut state = self.state.write().await;
        let count = state.runs.len() as u64;
        state.runs.clear();
        state.results.clear();
        self.publish(&state);
        Ok(count)
    }

    async fn model_comparisons(&self) -> StoreResult<Vec<ModelComparison>> {
        let state = self.state.read().await;
        let mut groups: BTreeMap<(&str, &str), Vec<&BenchmarkRun>> = BTreeMap::new();
        for run in state
            .runs
            .values()
            .filter(|r| r.status == BenchmarkStatus::Completed)
        {
            groups
                .entry((run.model_id.as_str(), run.model_name.as_str()))
                .or_default()
                .push(run);
        }

        let mut comparisons: Vec<ModelComparison> = groups
            .into_iter()
            .filter_map(|((model_id, model_name), runs)| {
                let n = runs.len() as f64;
                let last_run_time = runs.iter().map(|r| r.start_time).max()?;
                Some(ModelComparison {
                    model_id: model_id.to_string(),
                    model_name: model_name.to_string(),
                    run_count: runs.len() as u32,
                    last_run_time,
                    avg_latency: runs.iter().map(|r| r.average_latency).sum::<f64>() / n,
                    avg_p99_latency: runs.iter().map(|r| r.p99_latency).sum::<f64>() / n,
                    avg_tokens_per_second: runs.iter().map(|r| r.tokens_per_second).sum::<f64>() / n,
                })
            })
            .collect();
        comparisons.sort_by(|a, b| a.avg_latency.total_cmp(&b.avg_latency));
        Ok(comparisons)
    }
}
