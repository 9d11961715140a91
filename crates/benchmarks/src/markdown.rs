// Copyright 2025 LLM Benchkit Contributors
// SPDX-License-Identifier: Apache-2.0

//! Markdown output generation for benchmark runs.

use llm_benchkit_core::{BenchmarkResult, BenchmarkRun, BenchmarkStats};
use std::fmt::Write;

const PREVIEW_CHARS: usize = 50;

fn preview(text: &str) -> String {
    let flat = text.replace(&['\n', '\r'][..], " ").replace('|', "\\|");
    if flat.chars().count() > PREVIEW_CHARS {
        let head: String = flat.chars().take(PREVIEW_CHARS - 3).collect();
        format!("{}...", head)
    } else {
        flat
    }
}

fn short_id(id: &str) -> &str {
    id.get(..8).unwrap_or(id)
}

/// Generate a markdown summary table of runs.
pub fn generate_summary(runs: &[BenchmarkRun]) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# Benchmark Summary");
    let _ = writeln!(output);
    let _ = writeln!(output, "Generated: {}", chrono::Utc::now().to_rfc3339());
    let _ = writeln!(output);
    let _ = writeln!(output, "## Runs");
    let _ = writeln!(output);
    let _ = writeln!(
        output,
        "| Run | Model | Status | Started | Prompts | Avg (ms) | P99 (ms) | Tokens/s |"
    );
    let _ = writeln!(
        output,
        "|-----|-------|--------|---------|---------|----------|----------|----------|"
    );

    for run in runs {
        let _ = writeln!(
            output,
            "| {} | {} | {} | {} | {}/{} | {:.1} | {:.1} | {:.1} |",
            short_id(&run.id),
            run.model_name,
            run.status,
            run.start_time.format("%Y-%m-%d %H:%M:%S UTC"),
            run.completed_prompts,
            run.total_prompts,
            run.average_latency,
            run.p99_latency,
            run.tokens_per_second
        );
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "---");
    let _ = writeln!(output, "Total runs: {}", runs.len());

    output
}

/// Generate a detailed markdown report for one run.
pub fn generate_run_report(
    run: &BenchmarkRun,
    results: &[BenchmarkResult],
    stats: &BenchmarkStats,
) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# Benchmark Run {}", run.id);
    let _ = writeln!(output);
    let _ = writeln!(output, "**Model:** {} (`{}`)", run.model_name, run.model_id);
    let _ = writeln!(output, "**Status:** {}", run.status);
    let _ = writeln!(output, "**Started:** {}", run.start_time.to_rfc3339());
    if let Some(end) = run.end_time {
        let _ = writeln!(output, "**Finished:** {}", end.to_rfc3339());
    }
    let _ = writeln!(output);

    let _ = writeln!(output, "## Statistics");
    let _ = writeln!(output);
    let _ = writeln!(output, "| Metric | Value |");
    let _ = writeln!(output, "|--------|-------|");
    let _ = writeln!(output, "| Prompts | {}/{} |", stats.completed_prompts, stats.total_prompts);
    let _ = writeln!(output, "| Success rate | {:.1}% |", stats.success_rate);
    let _ = writeln!(output, "| Mean | {:.1} ms |", stats.average_latency);
    let _ = writeln!(output, "| P50 | {:.1} ms |", stats.p50_latency);
    let _ = writeln!(output, "| P90 | {:.1} ms |", stats.p90_latency);
    let _ = writeln!(output, "| P95 | {:.1} ms |", stats.p95_latency);
    let _ = writeln!(output, "| P99 | {:.1} ms |", stats.p99_latency);
    let _ = writeln!(output, "| Min | {:.1} ms |", stats.min_latency);
    let _ = writeln!(output, "| Max | {:.1} ms |", stats.max_latency);
    let _ = writeln!(output, "| Tokens/s | {:.1} |", stats.tokens_per_second);
    let _ = writeln!(output);

    let _ = writeln!(output, "## Prompts");
    let _ = writeln!(output);
    let _ = writeln!(output, "| # | Prompt | Latency (ms) | Tokens | Outcome |");
    let _ = writeln!(output, "|---|--------|--------------|--------|---------|");
    for result in results {
        let outcome = match &result.error_message {
            Some(err) if !result.success => format!("failed: {}", preview(err)),
            _ => "ok".to_string(),
        };
        let _ = writeln!(
            output,
            "| {} | {} | {} | {} | {} |",
            result.prompt_index,
            preview(&result.prompt),
            result.response_time_ms,
            result.token_count,
            outcome
        );
    }

    output
}
