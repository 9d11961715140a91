// Copyright 2025 LLM Benchkit Contributors
// SPDX-License-Identifier: Apache-2.0

//! Plain-text reports.

use chrono::{DateTime, Utc};
use llm_benchkit_core::analysis::{self, Severity};
use llm_benchkit_core::{BenchmarkResult, BenchmarkRun, BenchmarkStats, ModelComparison};
use std::fmt::Write;

/// Body written instead of a report when there are no statistics.
pub const NO_PERFORMANCE_DATA: &str = "No performance data available";

/// Performance report for one model.
///
/// Returns [`NO_PERFORMANCE_DATA`] when no prompt was attempted.
pub fn performance_report(model_name: &str, stats: &BenchmarkStats) -> String {
    if stats.total_prompts == 0 {
        return NO_PERFORMANCE_DATA.to_string();
    }

    let mut out = String::new();
    let _ = writeln!(out, "Performance Report");
    let _ = writeln!(out, "=================");
    let _ = writeln!(out, "Model: {}", model_name);
    let _ = writeln!(out, "Total Prompts: {}", stats.total_prompts);
    let _ = writeln!(out, "Success Rate: {:.1}%", stats.success_rate);
    let _ = writeln!(out, "Average Response Time: {:.1}ms", stats.average_latency);
    let _ = writeln!(out, "P95 Response Time: {:.1}ms", stats.p95_latency);
    let _ = writeln!(out, "P99 Response Time: {:.1}ms", stats.p99_latency);
    let _ = writeln!(out, "Min Response Time: {}ms", stats.min_latency as u64);
    let _ = writeln!(out, "Max Response Time: {}ms", stats.max_latency as u64);
    let _ = writeln!(out, "Tokens per Second: {:.1}", stats.tokens_per_second);
    let _ = writeln!(out, "Total Tokens Generated: {}", stats.total_response_tokens);
    out
}

/// Ratings, latency distribution and recommendations for a run's results.
pub fn analysis_report(results: &[BenchmarkResult], stats: &BenchmarkStats) -> String {
    let latencies = analysis::latencies(results);

    let mut out = String::new();
    let _ = writeln!(out, "Analysis");
    let _ = writeln!(out, "========");
    let _ = writeln!(out, "Consistency: {}", analysis::consistency(&latencies));
    let _ = writeln!(out, "Trend: {}", analysis::trend(&latencies));
    if stats.has_samples() {
        let _ = writeln!(out, "Efficiency: {}", analysis::efficiency(stats));
    }

    let _ = writeln!(out);
    let _ = writeln!(out, "Latency Distribution:");
    for bucket in analysis::distribution(&latencies) {
        let _ = writeln!(out, "  {:<5} {:>5.1}%", bucket.label, bucket.percent);
    }

    let recommendations = analysis::recommendations(stats);
    if !recommendations.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "Recommendations:");
        for rec in recommendations {
            let marker = match rec.severity {
                Severity::Positive => "+",
                Severity::Warning => "!",
                Severity::Critical => "!!",
            };
            let _ = writeln!(out, "  [{}] {}: {}", marker, rec.title, rec.description);
        }
    }
    out
}

/// Report comparing models and listing every run.
pub fn comparison_report(
    comparisons: &[ModelComparison],
    runs: &[BenchmarkRun],
    generated_at: DateTime<Utc>,
) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Model Performance Comparison Report");
    let _ = writeln!(out, "Generated on: {}", generated_at.format("%Y-%m-%d %H:%M:%S"));
    let _ = writeln!(out, "{}", "=".repeat(50));
    let _ = writeln!(out);

    let _ = writeln!(out, "Model Comparisons:");
    let _ = writeln!(out, "{}", "-".repeat(30));
    for comparison in comparisons {
        let _ = writeln!(out, "{}:", comparison.model_name);
        let _ = writeln!(out, "  • Average Latency: {}ms", comparison.avg_latency as i64);
        let _ = writeln!(out, "  • P99 Latency: {}ms", comparison.avg_p99_latency as i64);
        let _ = writeln!(out, "  • Success Rate: 100%");
        let _ = writeln!(out, "  • Tokens/Second: {:.1}", comparison.avg_tokens_per_second);
        let _ = writeln!(out, "  • Runs: {}", comparison.run_count);
        let _ = writeln!(out);
    }

    let _ = writeln!(out, "Benchmark Runs:");
    let _ = writeln!(out, "{}", "-".repeat(30));
    for run in runs {
        let _ = writeln!(out, "{}:", run.model_id);
        let _ = writeln!(out, "  • Status: {}", run.status);
        let _ = writeln!(out, "  • Average Latency: {}ms", run.average_latency as i64);
        let _ = writeln!(out, "  • P99 Latency: {}ms", run.p99_latency as i64);
        let _ = writeln!(out, "  • Success Rate: {}%", run.completion_rate() as i64);
        let _ = writeln!(out, "  • Tokens/Second: {:.1}", run.tokens_per_second);
        let _ = writeln!(out, "  • Completed: {}/{}", run.completed_prompts, run.total_prompts);
        let _ = writeln!(out);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use llm_benchkit_core::compute_stats;

    fn results() -> Vec<BenchmarkResult> {
        let now = Utc::now();
        let response = "r".repeat(400);
        vec![
            BenchmarkResult::success("run", 0, "a", response.as_str(), now, now, 1000),
            BenchmarkResult::success("run", 1, "b", response.as_str(), now, now, 1500),
            BenchmarkResult::success("run", 2, "c", response.as_str(), now, now, 2500),
            BenchmarkResult::failure("run", 3, "d", now, now, 10, "timeout"),
        ]
    }

    #[test]
    fn test_performance_report_lines() {
        let stats = compute_stats(&results());
        let report = performance_report("LFM2 1.2B", &stats);
        let lines: Vec<&str> = report.lines().collect();
        assert_eq!(lines[0], "Performance Report");
        assert_eq!(lines[2], "Model: LFM2 1.2B");
        assert_eq!(lines[3], "Total Prompts: 4");
        assert_eq!(lines[4], "Success Rate: 75.0%");
        assert_eq!(lines[5], "Average Response Time: 1666.7ms");
        assert_eq!(lines[8], "Min Response Time: 1000ms");
        assert_eq!(lines[9], "Max Response Time: 2500ms");
        assert_eq!(lines[10], "Tokens per Second: 60.0");
        assert_eq!(lines[11], "Total Tokens Generated: 300");
    }

    #[test]
    fn test_performance_report_empty() {
        assert_eq!(
            performance_report("x", &BenchmarkStats::default()),
            NO_PERFORMANCE_DATA
        );
    }

    #[test]
    fn test_analysis_report_sections() {
        let results = results();
        let stats = compute_stats(&results);
        let report = analysis_report(&results, &stats);
        assert!(report.contains("Trend: N/A"));
        assert!(report.contains("Improve Reliability"));
        assert!(report.contains("1-2s"));
    }

    #[test]
    fn test_comparison_report() {
        let comparison = ModelComparison {
            model_id: "lfm2".to_string(),
            model_name: "LFM2 1.2B".to_string(),
            run_count: 3,
            last_run_time: Utc::now(),
            avg_latency: 812.6,
            avg_p99_latency: 1400.0,
            avg_tokens_per_second: 14.26,
        };
        let run = BenchmarkRun::start("lfm2", "LFM2 1.2B", 10);
        let at = Utc.with_ymd_and_hms(2025, 6, 1, 9, 30, 0).unwrap();

        let report = comparison_report(&[comparison], &[run], at);
        assert!(report.starts_with("Model Performance Comparison Report\nGenerated on: 2025-06-01 09:30:00\n"));
        assert!(report.contains("  • Average Latency: 812ms"));
        assert!(report.contains("  • Tokens/Second: 14.3"));
        assert!(report.contains("  • Status: RUNNING"));
        assert!(report.contains("  • Completed: 0/10"));
    }
}
