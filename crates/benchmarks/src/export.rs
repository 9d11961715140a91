// Copyright 2025 LLM Benchkit Contributors
// SPDX-License-Identifier: Apache-2.0

//! CSV exports.

use llm_benchkit_core::{BenchmarkResult, BenchmarkRun, ModelComparison};
use std::fmt::Write;

/// Header of the per-response CSV.
pub const RESPONSES_HEADER: &str =
    "Index,Prompt,ResponseTime(ms),Timestamp,ModelId,TokenCount,Success";

/// Header of the model comparison CSV.
pub const COMPARISON_HEADER: &str =
    "Model,Average Latency (ms),P99 Latency (ms),Success Rate (%),Tokens/s";

/// Body written instead of a CSV when there is nothing to export.
pub const NO_DATA: &str = "No data available";

/// Maximum number of prompt characters kept in the response CSV.
pub const PROMPT_PREVIEW_CHARS: usize = 100;

/// Quote a field, doubling embedded quotes.
pub fn quote(field: &str) -> String {
    format!("\"{}\"", field.replace('"', "\"\""))
}

/// Quote a field only when it contains a separator, quote or line break.
fn field(value: &str) -> String {
    if value.contains(&[',', '"', '\n', '\r'][..]) {
        quote(value)
    } else {
        value.to_string()
    }
}

/// One CSV row per result of a run, in prompt order.
///
/// `Timestamp` is the result's end time in Unix milliseconds and `TokenCount`
/// the response token estimate.
pub fn responses_csv(model_id: &str, results: &[BenchmarkResult]) -> String {
    if results.is_empty() {
        return NO_DATA.to_string();
    }

    let mut csv = String::new();
    let _ = writeln!(csv, "{}", RESPONSES_HEADER);
    for result in results {
        let prompt: String = result.prompt.chars().take(PROMPT_PREVIEW_CHARS).collect();
        let _ = writeln!(
            csv,
            "{},{},{},{},{},{},{}",
            result.prompt_index,
            quote(&prompt),
            result.response_time_ms,
            result.end_time.timestamp_millis(),
            field(model_id),
            result.token_count,
            result.success
        );
    }
    csv
}

/// Comparison rows per model followed by one row per run.
///
/// Latencies are truncated to whole milliseconds. Model aggregates only cover
/// completed runs, so their success rate is reported as 100; run rows use
/// completed over total prompts.
pub fn comparison_csv(comparisons: &[ModelComparison], runs: &[BenchmarkRun]) -> String {
    let mut csv = String::new();
    let _ = writeln!(csv, "{}", COMPARISON_HEADER);
    for comparison in comparisons {
        let _ = writeln!(
            csv,
            "{},{},{},100,{}",
            field(&comparison.model_name),
            comparison.avg_latency as i64,
            comparison.avg_p99_latency as i64,
            comparison.avg_tokens_per_second
        );
    }
    for run in runs {
        let _ = writeln!(
            csv,
            "{},{},{},{},{}",
            field(&run.model_id),
            run.average_latency as i64,
            run.p99_latency as i64,
            run.completion_rate() as i64,
            run.tokens_per_second
        );
    }
    csv
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn result(index: u32, prompt: &str, ms: u64, success: bool) -> BenchmarkResult {
        let start = Utc.timestamp_millis_opt(1_700_000_000_000).unwrap();
        let end = Utc.timestamp_millis_opt(1_700_000_000_000 + ms as i64).unwrap();
        if success {
            BenchmarkResult::success("run", index, prompt, "twelve chars", start, end, ms)
        } else {
            BenchmarkResult::failure("run", index, prompt, start, end, ms, "boom")
        }
    }

    #[test]
    fn test_responses_csv_rows() {
        let csv = responses_csv(
            "lfm2",
            &[
                result(0, "Say \"hi\"", 250, true),
                result(1, "Second", 40, false),
            ],
        );
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], RESPONSES_HEADER);
        assert_eq!(lines[1], "0,\"Say \"\"hi\"\"\",250,1700000000250,lfm2,3,true");
        assert_eq!(lines[2], "1,\"Second\",40,1700000000040,lfm2,0,false");
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn test_responses_csv_truncates_prompt() {
        let long = "x".repeat(150);
        let csv = responses_csv("m", &[result(0, &long, 1, true)]);
        let row = csv.lines().nth(1).unwrap();
        assert!(row.contains(&format!("\"{}\"", "x".repeat(100))));
        assert!(!row.contains(&"x".repeat(101)));
    }

    #[test]
    fn test_responses_csv_empty() {
        assert_eq!(responses_csv("m", &[]), NO_DATA);
    }

    #[test]
    fn test_comparison_csv() {
        let comparison = ModelComparison {
            model_id: "phi4".to_string(),
            model_name: "Phi-4 Mini Instruct".to_string(),
            run_count: 2,
            last_run_time: Utc::now(),
            avg_latency: 1234.9,
            avg_p99_latency: 2000.2,
            avg_tokens_per_second: 12.5,
        };
        let mut run = BenchmarkRun::start("phi4", "Phi-4 Mini Instruct", 10);
        run.record_progress(5, 900.7).unwrap();

        let csv = comparison_csv(&[comparison], &[run]);
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], COMPARISON_HEADER);
        assert_eq!(lines[1], "Phi-4 Mini Instruct,1234,2000,100,12.5");
        assert_eq!(lines[2], "phi4,900,0,50,0");
    }

    #[test]
    fn test_field_quotes_commas() {
        assert_eq!(field("a,b"), "\"a,b\"");
        assert_eq!(field("plain"), "plain");
    }
}
