// Copyright 2025 LLM Benchkit Contributors
// SPDX-License-Identifier: Apache-2.0

//! Filesystem output for benchmark runs.
//!
//! A run export directory contains:
//!
//! - `results.json` - the run, its statistics and every result
//! - `responses.csv` - per-response CSV
//! - `report.txt` - performance report followed by the analysis
//! - `summary.md` - markdown run report
//!
//! A comparison export directory contains `comparison.csv`, `comparison.txt`
//! and a `summary.md` table of every run.

use crate::{export, markdown, report};
use chrono::Utc;
use llm_benchkit_core::{
    compute_stats, BenchmarkResult, BenchmarkRun, BenchmarkStats, ModelComparison, Result,
};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// Default output directory path.
pub const OUTPUT_DIR: &str = "benchmarks/output";

/// Combined JSON file name.
pub const RESULTS_FILE: &str = "results.json";

/// Response CSV file name.
pub const RESPONSES_FILE: &str = "responses.csv";

/// Text report file name.
pub const REPORT_FILE: &str = "report.txt";

/// Markdown summary file name.
pub const SUMMARY_FILE: &str = "summary.md";

/// Comparison CSV file name.
pub const COMPARISON_CSV_FILE: &str = "comparison.csv";

/// Comparison report file name.
pub const COMPARISON_REPORT_FILE: &str = "comparison.txt";

/// Everything known about one run, as written to `results.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunExport {
    /// The run record.
    pub run: BenchmarkRun,
    /// Statistics over `results`.
    pub stats: BenchmarkStats,
    /// Per-prompt results in prompt order.
    pub results: Vec<BenchmarkResult>,
}

impl RunExport {
    /// Bundle a run with its results, computing statistics.
    pub fn new(run: BenchmarkRun, results: Vec<BenchmarkResult>) -> Self {
        let stats = compute_stats(&results);
        Self { run, stats, results }
    }
}

/// Write `value` as pretty JSON.
pub fn write_json<T: Serialize>(value: &T, path: impl AsRef<Path>) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    fs::write(path, json)?;
    Ok(())
}

/// Write all outputs of one run into `dir`, creating it if needed.
///
/// Returns the paths written, in the order listed in the module docs.
pub fn write_run_outputs(dir: impl AsRef<Path>, bundle: &RunExport) -> Result<Vec<PathBuf>> {
    let dir = dir.as_ref();
    fs::create_dir_all(dir)?;

    let json_path = dir.join(RESULTS_FILE);
    write_json(bundle, &json_path)?;

    let csv_path = dir.join(RESPONSES_FILE);
    fs::write(
        &csv_path,
        export::responses_csv(&bundle.run.model_id, &bundle.results),
    )?;

    let report_path = dir.join(REPORT_FILE);
    let mut text = report::performance_report(&bundle.run.model_name, &bundle.stats);
    if !bundle.results.is_empty() {
        text.push('\n');
        text.push_str(&report::analysis_report(&bundle.results, &bundle.stats));
    }
    fs::write(&report_path, text)?;

    let summary_path = dir.join(SUMMARY_FILE);
    fs::write(
        &summary_path,
        markdown::generate_run_report(&bundle.run, &bundle.results, &bundle.stats),
    )?;

    info!(run_id = %bundle.run.id, dir = %dir.display(), "Wrote run outputs");
    Ok(vec![json_path, csv_path, report_path, summary_path])
}

/// Write the comparison CSV, the comparison report and the markdown run
/// summary into `dir`.
pub fn write_comparison_outputs(
    dir: impl AsRef<Path>,
    comparisons: &[ModelComparison],
    runs: &[BenchmarkRun],
) -> Result<Vec<PathBuf>> {
    let dir = dir.as_ref();
    fs::create_dir_all(dir)?;

    let csv_path = dir.join(COMPARISON_CSV_FILE);
    fs::write(&csv_path, export::comparison_csv(comparisons, runs))?;

    let report_path = dir.join(COMPARISON_REPORT_FILE);
    fs::write(
        &report_path,
        report::comparison_report(comparisons, runs, Utc::now()),
    )?;

    let summary_path = dir.join(SUMMARY_FILE);
    fs::write(&summary_path, markdown::generate_summary(runs))?;

    info!(dir = %dir.display(), runs = runs.len(), "Wrote comparison outputs");
    Ok(vec![csv_path, report_path, summary_path])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_export() -> RunExport {
        let mut run = BenchmarkRun::start("lfm2", "LFM2 1.2B", 2);
        let now = Utc::now();
        let results = vec![
            BenchmarkResult::success(&run.id, 0, "hello", "hi there, friend", now, now, 120),
            BenchmarkResult::failure(&run.id, 1, "again", now, now, 7, "boom"),
        ];
        run.complete(&compute_stats(&results)).unwrap();
        RunExport::new(run, results)
    }

    #[test]
    fn test_write_run_outputs() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("nested").join("run");
        let bundle = sample_export();

        let written = write_run_outputs(&out, &bundle).unwrap();
        assert_eq!(written.len(), 4);
        assert!(written.iter().all(|p| p.exists()));

        let json = fs::read_to_string(out.join(RESULTS_FILE)).unwrap();
        let read_back: RunExport = serde_json::from_str(&json).unwrap();
        assert_eq!(read_back.run.id, bundle.run.id);
        assert_eq!(read_back.results, bundle.results);
        assert_eq!(read_back.stats.total_prompts, 2);

        let csv = fs::read_to_string(out.join(RESPONSES_FILE)).unwrap();
        assert_eq!(csv.lines().count(), 3);

        let text = fs::read_to_string(out.join(REPORT_FILE)).unwrap();
        assert!(text.starts_with("Performance Report"));
        assert!(text.contains("Latency Distribution:"));
    }

    #[test]
    fn test_write_empty_run_outputs() {
        let dir = tempfile::tempdir().unwrap();
        let empty = RunExport::new(BenchmarkRun::start("m", "M", 1), Vec::new());
        write_run_outputs(dir.path(), &empty).unwrap();

        let csv = fs::read_to_string(dir.path().join(RESPONSES_FILE)).unwrap();
        assert_eq!(csv, export::NO_DATA);
        let text = fs::read_to_string(dir.path().join(REPORT_FILE)).unwrap();
        assert_eq!(text, report::NO_PERFORMANCE_DATA);
    }

    #[test]
    fn test_write_into_file_path_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("taken");
        fs::write(&blocker, "not a directory").unwrap();
        let err = write_run_outputs(&blocker, &sample_export()).unwrap_err();
        assert!(matches!(err, llm_benchkit_core::Error::Io(_)));
    }

    #[test]
    fn test_write_comparison_outputs() {
        let dir = tempfile::tempdir().unwrap();
        let written = write_comparison_outputs(dir.path(), &[], &[]).unwrap();
        assert_eq!(written.len(), 3);
        let csv = fs::read_to_string(&written[0]).unwrap();
        assert_eq!(csv.trim_end(), export::COMPARISON_HEADER);
    }

    #[test]
    fn test_comparison_outputs_include_run_summary() {
        let dir = tempfile::tempdir().unwrap();
        let bundle = sample_export();
        write_comparison_outputs(dir.path(), &[], std::slice::from_ref(&bundle.run)).unwrap();

        let summary = fs::read_to_string(dir.path().join(SUMMARY_FILE)).unwrap();
        assert!(summary.starts_with("# Benchmark Summary"));
        assert!(summary.contains("| LFM2 1.2B | COMPLETED |"));
        assert!(summary.ends_with("Total runs: 1\n"));
    }
}
