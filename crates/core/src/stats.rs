// Copyright 2025 LLM Benchkit Contributors
// SPDX-License-Identifier: Apache-2.0

//! Benchmark statistics.
//!
//! Latency metrics are computed over successful results only, while the
//! success rate uses every attempted prompt. Percentiles use the nearest-rank
//! rule `sorted[floor(p * (n - 1))]` without interpolation, the same rule the
//! per-session statistics have always used, so historical numbers stay
//! comparable.

use crate::types::BenchmarkResult;
use serde::{Deserialize, Serialize};

/// Summary statistics for a set of benchmark results.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkStats {
    /// Number of attempted prompts.
    pub total_prompts: u32,
    /// Number of successful prompts.
    pub completed_prompts: u32,
    /// Mean latency in milliseconds.
    pub average_latency: f64,
    /// Median latency in milliseconds.
    pub p50_latency: f64,
    /// 90th percentile latency in milliseconds.
    pub p90_latency: f64,
    /// 95th percentile latency in milliseconds.
    pub p95_latency: f64,
    /// 99th percentile latency in milliseconds.
    pub p99_latency: f64,
    /// Fastest latency in milliseconds.
    pub min_latency: f64,
    /// Slowest latency in milliseconds.
    pub max_latency: f64,
    /// Estimated response tokens per second of generation time.
    pub tokens_per_second: f64,
    /// Successful prompts as a percentage of attempted prompts.
    pub success_rate: f64,
    /// Estimated response tokens across successful prompts.
    pub total_response_tokens: u64,
}

impl BenchmarkStats {
    /// Whether at least one successful latency contributed.
    pub fn has_samples(&self) -> bool {
        self.completed_prompts > 0
    }
}

/// Compute summary statistics over `results`.
pub fn compute_stats(results: &[BenchmarkResult]) -> BenchmarkStats {
    let successful: Vec<&BenchmarkResult> = results.iter().filter(|r| r.success).collect();

    let mut latencies: Vec<f64> = successful
        .iter()
        .map(|r| r.response_time_ms as f64)
        .collect();
    latencies.sort_by(|a, b| a.total_cmp(b));

    if latencies.is_empty() {
        return BenchmarkStats {
            total_prompts: results.len() as u32,
            ..BenchmarkStats::default()
        };
    }

    let total_tokens: u64 = successful.iter().map(|r| r.response_tokens as u64).sum();
    let total_ms: f64 = latencies.iter().sum();
    let total_seconds = total_ms / 1000.0;

    BenchmarkStats {
        total_prompts: results.len() as u32,
        completed_prompts: successful.len() as u32,
        average_latency: total_ms / latencies.len() as f64,
        p50_latency: percentile(&latencies, 0.5),
        p90_latency: percentile(&latencies, 0.9),
        p95_latency: percentile(&latencies, 0.95),
        p99_latency: percentile(&latencies, 0.99),
        min_latency: latencies[0],
        max_latency: latencies[latencies.len() - 1],
        tokens_per_second: if total_seconds > 0.0 {
            total_tokens as f64 / total_seconds
        } else {
            0.0
        },
        success_rate: successful.len() as f64 / results.len() as f64 * 100.0,
        total_response_tokens: total_tokens,
    }
}

/// Nearest-rank percentile of an ascending slice; `p` is a fraction in `[0, 1]`.
///
/// Returns 0 for an empty slice.
pub fn percentile(sorted: &[f64], p: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let last = sorted.len() - 1;
    let index = (p * last as f64).floor();
    let index = if index.is_nan() || index < 0.0 {
        0
    } else {
        (index as usize).min(last)
    };
    sorted[index]
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn ok(index: u32, ms: u64, response: &str) -> BenchmarkResult {
        let now = Utc::now();
        BenchmarkResult::success("run", index, "prompt", response, now, now, ms)
    }

    fn failed(index: u32, ms: u64) -> BenchmarkResult {
        let now = Utc::now();
        BenchmarkResult::failure("run", index, "prompt", now, now, ms, "backend error")
    }

    /// Deterministic pseudo-random latencies.
    fn samples(seed: u64, n: usize) -> Vec<f64> {
        let mut state = seed;
        (0..n)
            .map(|_| {
                state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
                ((state >> 33) % 10_000) as f64
            })
            .collect()
    }

    #[test]
    fn test_percentile_empty_is_zero() {
        assert_eq!(percentile(&[], 0.5), 0.0);
    }

    #[test]
    fn test_percentile_picks_existing_element() {
        for (seed, n) in [(1, 1), (7, 2), (42, 17), (99, 100), (1234, 257)] {
            let mut values = samples(seed, n);
            values.sort_by(|a, b| a.total_cmp(b));
            for p in [0.0, 0.1, 0.5, 0.9, 0.95, 0.99, 1.0] {
                let v = percentile(&values, p);
                assert!(values.contains(&v), "p={} n={} value={}", p, n, v);
            }
            assert_eq!(percentile(&values, 1.0), values[n - 1]);
            assert_eq!(percentile(&values, 0.0), values[0]);
        }
    }

    #[test]
    fn test_percentile_nearest_rank_index() {
        let values: Vec<f64> = (0..100).map(|i| i as f64).collect();
        // floor(0.99 * 99) = 98
        assert_eq!(percentile(&values, 0.99), 98.0);
        assert_eq!(percentile(&values, 0.5), 49.0);
        assert_eq!(percentile(&values, 0.9), 89.0);
    }

    #[test]
    fn test_percentile_clamps_out_of_range() {
        let values = [1.0, 2.0, 3.0];
        assert_eq!(percentile(&values, 2.0), 3.0);
        assert_eq!(percentile(&values, -1.0), 1.0);
    }

    #[test]
    fn test_empty_results() {
        let stats = compute_stats(&[]);
        assert_eq!(stats, BenchmarkStats::default());
        assert_eq!(stats.success_rate, 0.0);
        assert!(!stats.has_samples());
    }

    #[test]
    fn test_all_failed_keeps_total() {
        let stats = compute_stats(&[failed(0, 10), failed(1, 20)]);
        assert_eq!(stats.total_prompts, 2);
        assert_eq!(stats.completed_prompts, 0);
        assert_eq!(stats.average_latency, 0.0);
        assert_eq!(stats.success_rate, 0.0);
    }

    #[test]
    fn test_success_rate() {
        let results = vec![
            ok(0, 100, "aaaa"),
            ok(1, 200, "aaaa"),
            failed(2, 50),
            ok(3, 300, "aaaa"),
            ok(4, 400, "aaaa"),
        ];
        let stats = compute_stats(&results);
        assert_eq!(stats.total_prompts, 5);
        assert_eq!(stats.completed_prompts, 4);
        assert!((stats.success_rate - 80.0).abs() < 1e-9);
    }

    #[test]
    fn test_latency_metrics_ignore_failures() {
        let results = vec![ok(0, 100, ""), failed(1, 10_000), ok(2, 300, "")];
        let stats = compute_stats(&results);
        assert_eq!(stats.average_latency, 200.0);
        assert_eq!(stats.min_latency, 100.0);
        assert_eq!(stats.max_latency, 300.0);
        assert_eq!(stats.p50_latency, 100.0);
        assert_eq!(stats.p99_latency, 100.0);
    }

    #[test]
    fn test_tokens_per_second() {
        // 40 chars -> 10 tokens each, 2 seconds total.
        let response = "a".repeat(40);
        let results = vec![ok(0, 500, &response), ok(1, 1500, &response)];
        let stats = compute_stats(&results);
        assert_eq!(stats.total_response_tokens, 20);
        assert!((stats.tokens_per_second - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_zero_latency_gives_zero_throughput() {
        let stats = compute_stats(&[ok(0, 0, "abcdefgh")]);
        assert_eq!(stats.tokens_per_second, 0.0);
        assert_eq!(stats.success_rate, 100.0);
    }

    #[test]
    fn test_compute_stats_is_idempotent() {
        let results: Vec<BenchmarkResult> = samples(5, 30)
            .into_iter()
            .enumerate()
            .map(|(i, ms)| {
                if i % 7 == 3 {
                    failed(i as u32, ms as u64)
                } else {
                    ok(i as u32, ms as u64, "some response text")
                }
            })
            .collect();
        assert_eq!(compute_stats(&results), compute_stats(&results));
    }
}
