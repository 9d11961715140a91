// Copyright 2025 LLM Benchkit Contributors
// SPDX-License-Identifier: Apache-2.0

//! Behaviour shared by every `ResultStore` implementation.

use chrono::{Duration, TimeZone, Utc};
use llm_benchkit_core::{BenchmarkResult, BenchmarkRun, BenchmarkStats, BenchmarkStatus};
use llm_benchkit_storage::{MemoryStore, ResultStore, SqliteStore, StoreError};

fn run_at(model_id: &str, total: u32, minutes: i64) -> BenchmarkRun {
    let mut run = BenchmarkRun::start(model_id, model_id.to_uppercase(), total);
    run.start_time = Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap() + Duration::minutes(minutes);
    run
}

fn completed(model_id: &str, minutes: i64, avg: f64) -> BenchmarkRun {
    let mut run = run_at(model_id, 10, minutes);
    let stats = BenchmarkStats {
        total_prompts: 10,
        completed_prompts: 10,
        average_latency: avg,
        p99_latency: avg * 2.0,
        min_latency: avg / 2.0,
        max_latency: avg * 2.0,
        tokens_per_second: 1000.0 / avg,
        success_rate: 100.0,
        ..BenchmarkStats::default()
    };
    run.complete(&stats).unwrap();
    run
}

fn result(run: &BenchmarkRun, index: u32, ms: u64) -> BenchmarkResult {
    let now = Utc::now();
    BenchmarkResult::success(&run.id, index, format!("prompt {}", index), "some response", now, now, ms)
}

async fn check_round_trip(store: &dyn ResultStore) {
    let mut run = run_at("lfm2", 3, 0);
    store.insert_run(&run).await.unwrap();

    for (i, ms) in [(2, 300), (0, 100), (1, 200)] {
        store.insert_result(&result(&run, i, ms)).await.unwrap();
    }
    let failure = BenchmarkResult::failure(&run.id, 0, "p", Utc::now(), Utc::now(), 5, "boom");
    assert!(matches!(
        store.insert_result(&failure).await,
        Err(StoreError::DuplicateResult { prompt_index: 0, .. })
    ));

    let results = store.results_for_run(&run.id).await.unwrap();
    let indexes: Vec<u32> = results.iter().map(|r| r.prompt_index).collect();
    assert_eq!(indexes, vec![0, 1, 2]);
    assert_eq!(results[1].response, "some response");
    assert_eq!(results[1].response_time_ms, 200);

    run.record_progress(3, 200.0).unwrap();
    store.update_run(&run).await.unwrap();
    let stored = store.get_run(&run.id).await.unwrap().unwrap();
    assert_eq!(stored.completed_prompts, 3);
    assert_eq!(stored.status, BenchmarkStatus::Running);
    assert_eq!(stored.start_time, run.start_time);

    assert_eq!(store.response_times(&run.id).await.unwrap(), vec![100, 200, 300]);
}

async fn check_result_guards(store: &dyn ResultStore) {
    let run = run_at("phi4", 2, 0);
    let orphan = result(&run, 0, 10);
    assert!(matches!(
        store.insert_result(&orphan).await,
        Err(StoreError::RunNotFound(_))
    ));

    store.insert_run(&run).await.unwrap();
    assert!(matches!(
        store.insert_result(&result(&run, 2, 10)).await,
        Err(StoreError::Invalid(_))
    ));
}

async fn check_count_guard(store: &dyn ResultStore) {
    let mut fresh = run_at("deepseek", 2, 0);
    fresh.completed_prompts = 3;
    assert!(matches!(
        store.insert_run(&fresh).await,
        Err(StoreError::Invalid(_))
    ));
    assert!(store.get_run(&fresh.id).await.unwrap().is_none());

    let run = run_at("qwen", 2, 0);
    store.insert_run(&run).await.unwrap();
    let mut over = run.clone();
    over.completed_prompts = 3;
    assert!(matches!(
        store.update_run(&over).await,
        Err(StoreError::Invalid(_))
    ));
    assert!(matches!(
        store.insert_run(&over).await,
        Err(StoreError::Invalid(_))
    ));
    let stored = store.get_run(&run.id).await.unwrap().unwrap();
    assert_eq!(stored.completed_prompts, 0);
}

async fn check_terminal_guard(store: &dyn ResultStore) {
    let mut run = run_at("qwen", 4, 0);
    store.insert_run(&run).await.unwrap();
    run.cancel().unwrap();
    store.update_run(&run).await.unwrap();

    let mut revived = run.clone();
    revived.status = BenchmarkStatus::Running;
    revived.end_time = None;
    assert!(matches!(
        store.update_run(&revived).await,
        Err(StoreError::TerminalRun { status: BenchmarkStatus::Cancelled, .. })
    ));
    assert!(matches!(
        store.insert_run(&revived).await,
        Err(StoreError::TerminalRun { .. })
    ));
    let stored = store.get_run(&run.id).await.unwrap().unwrap();
    assert_eq!(stored.status, BenchmarkStatus::Cancelled);

    let missing = run_at("qwen", 4, 1);
    assert!(matches!(
        store.update_run(&missing).await,
        Err(StoreError::RunNotFound(_))
    ));
}

async fn check_ordering_and_filter(store: &dyn ResultStore) {
    let old = run_at("lfm2", 1, 0);
    let newest = run_at("phi4", 1, 20);
    let middle = run_at("lfm2", 1, 10);
    for run in [&old, &newest, &middle] {
        store.insert_run(run).await.unwrap();
    }

    let ids: Vec<String> = store.list_runs().await.unwrap().into_iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![newest.id.clone(), middle.id.clone(), old.id.clone()]);

    let lfm: Vec<String> = store
        .runs_for_model("lfm2")
        .await
        .unwrap()
        .into_iter()
        .map(|r| r.id)
        .collect();
    assert_eq!(lfm, vec![middle.id, old.id]);
}

async fn check_cascade_delete(store: &dyn ResultStore) {
    let keep = run_at("lfm2", 2, 0);
    let drop = run_at("lfm2", 2, 1);
    for run in [&keep, &drop] {
        store.insert_run(run).await.unwrap();
        store.insert_result(&result(run, 0, 50)).await.unwrap();
        store.insert_result(&result(run, 1, 60)).await.unwrap();
    }

    assert!(store.delete_run(&drop.id).await.unwrap());
    assert!(!store.delete_run(&drop.id).await.unwrap());
    assert!(store.get_run(&drop.id).await.unwrap().is_none());
    assert!(store.results_for_run(&drop.id).await.unwrap().is_empty());
    assert_eq!(store.results_for_run(&keep.id).await.unwrap().len(), 2);

    assert_eq!(store.delete_all_runs().await.unwrap(), 1);
    assert!(store.list_runs().await.unwrap().is_empty());
    assert!(store.results_for_run(&keep.id).await.unwrap().is_empty());
}

async fn check_comparisons(store: &dyn ResultStore) {
    store.insert_run(&completed("phi4", 0, 400.0)).await.unwrap();
    store.insert_run(&completed("phi4", 5, 600.0)).await.unwrap();
    store.insert_run(&completed("lfm2", 1, 200.0)).await.unwrap();
    // Unfinished runs never count.
    store.insert_run(&run_at("lfm2", 10, 30)).await.unwrap();

    let comparisons = store.model_comparisons().await.unwrap();
    assert_eq!(comparisons.len(), 2);

    assert_eq!(comparisons[0].model_id, "lfm2");
    assert_eq!(comparisons[0].run_count, 1);
    assert_eq!(comparisons[0].avg_latency, 200.0);

    let phi = &comparisons[1];
    assert_eq!(phi.model_id, "phi4");
    assert_eq!(phi.model_name, "PHI4");
    assert_eq!(phi.run_count, 2);
    assert_eq!(phi.avg_latency, 500.0);
    assert_eq!(phi.avg_p99_latency, 1000.0);
    assert_eq!(
        phi.last_run_time,
        Utc.with_ymd_and_hms(2025, 3, 1, 12, 5, 0).unwrap()
    );
}

async fn check_watch_runs(store: &dyn ResultStore) {
    let mut rx = store.watch_runs();
    assert!(rx.borrow_and_update().is_empty());

    let mut run = run_at("lfm2", 2, 0);
    store.insert_run(&run).await.unwrap();
    assert!(rx.has_changed().unwrap());
    assert_eq!(rx.borrow_and_update()[0].status, BenchmarkStatus::Running);

    run.fail().unwrap();
    store.update_run(&run).await.unwrap();
    assert_eq!(rx.borrow_and_update()[0].status, BenchmarkStatus::Failed);

    store.delete_run(&run.id).await.unwrap();
    assert!(rx.borrow_and_update().is_empty());
}

macro_rules! store_tests {
    ($module:ident, $make:expr) => {
        mod $module {
            use super::*;

            #[tokio::test]
            async fn test_round_trip() {
                check_round_trip(&$make).await;
            }

            #[tokio::test]
            async fn test_result_guards() {
                check_result_guards(&$make).await;
            }

            #[tokio::test]
            async fn test_count_guard() {
                check_count_guard(&$make).await;
            }

            #[tokio::test]
            async fn test_terminal_guard() {
                check_terminal_guard(&$make).await;
            }

            #[tokio::test]
            async fn test_ordering_and_filter() {
                check_ordering_and_filter(&$make).await;
            }

            #[tokio::test]
            async fn test_cascade_delete() {
                check_cascade_delete(&$make).await;
            }

            #[tokio::test]
            async fn test_comparisons() {
                check_comparisons(&$make).await;
            }

            #[tokio::test]
            async fn test_watch_runs() {
                check_watch_runs(&$make).await;
            }
        }
    };
}

store_tests!(memory, MemoryStore::new());
store_tests!(sqlite, SqliteStore::in_memory().await.unwrap());

#[tokio::test]
async fn test_sqlite_file_persists_across_connections() {
    let dir = tempfile::tempdir().unwrap();
    let url = format!("sqlite://{}", dir.path().join("bench.db").display());

    let run = completed("deepseek", 0, 321.0);
    {
        let store = SqliteStore::connect(&url).await.unwrap();
        store.insert_run(&run).await.unwrap();
        store.insert_result(&result(&run, 0, 321)).await.unwrap();
        store.pool().close().await;
    }

    let store = SqliteStore::connect(&url).await.unwrap();
    let stored = store.get_run(&run.id).await.unwrap().unwrap();
    assert_eq!(stored, run);
    assert_eq!(store.results_for_run(&run.id).await.unwrap().len(), 1);
    assert_eq!(store.watch_runs().borrow().len(), 1);
}
