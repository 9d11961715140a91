// Copyright 2025 LLM Benchkit Contributors
// SPDX-License-Identifier: Apache-2.0

//! Command implementations.

use crate::settings::Settings;
use anyhow::{bail, Context};
use colored::{ColoredString, Colorize};
use indicatif::{ProgressBar, ProgressStyle};
use llm_benchkit_benchmarks::io::{write_comparison_outputs, OUTPUT_DIR};
use llm_benchkit_benchmarks::{
    report, write_run_outputs, BenchmarkRunner, PromptFile, RunExport, RunRequest,
};
use llm_benchkit_core::{BenchmarkProgress, BenchmarkRun, BenchmarkStatus, InferenceBackend};
use llm_benchkit_providers::{LlamaServerBackend, LlamaServerConfig};
use llm_benchkit_storage::{ResultStore, SqliteStore};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

/// Options of the `run` command.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Model id, looked up in the catalog.
    pub model: String,
    /// Model file overriding the catalog entry.
    pub model_path: Option<PathBuf>,
    /// Number of prompts; the configured default when unset.
    pub count: Option<u32>,
    /// Prompt file replacing the built-in prompts.
    pub prompts: Option<PathBuf>,
    /// Directory to write run outputs to.
    pub output: Option<PathBuf>,
}

/// Open the configured result store.
pub async fn open_store(settings: &Settings) -> anyhow::Result<Arc<dyn ResultStore>> {
    let store = SqliteStore::connect(&settings.database_url)
        .await
        .with_context(|| format!("failed to open database {}", settings.database_url))?;
    Ok(Arc::new(store))
}

fn paint(status: BenchmarkStatus, text: &str) -> ColoredString {
    match status {
        BenchmarkStatus::Completed => text.green(),
        BenchmarkStatus::Running | BenchmarkStatus::Pending => text.yellow(),
        BenchmarkStatus::Cancelled => text.dimmed(),
        BenchmarkStatus::Failed => text.red(),
    }
}

fn status_label(status: BenchmarkStatus) -> ColoredString {
    paint(status, status.as_str())
}

fn progress_bar(total: u32) -> anyhow::Result<ProgressBar> {
    let bar = ProgressBar::new(u64::from(total));
    bar.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
            .progress_chars("=> "),
    );
    Ok(bar)
}

fn update_bar(bar: &ProgressBar, progress: &BenchmarkProgress) {
    bar.set_length(u64::from(progress.total_prompts));
    bar.set_position(u64::from(progress.current_prompt));
    bar.set_message(format!(
        "last {:.0}ms, avg {:.0}ms, eta {}s",
        progress.current_latency,
        progress.average_latency,
        progress.estimated_time_remaining_ms / 1000
    ));
}

/// Benchmark one model against the configured inference server.
///
/// Ctrl-C cancels the run; results recorded so far are kept.
pub async fn run_benchmark(
    settings: &Settings,
    store: Arc<dyn ResultStore>,
    options: RunOptions,
) -> anyhow::Result<()> {
    let model_name = settings.models.display_name(&options.model);
    let model_path = settings
        .model_path(&options.model, options.model_path.as_deref())
        .with_context(|| {
            format!(
                "no model file configured for {:?}; pass --model-path",
                options.model
            )
        })?;

    let mut server = LlamaServerConfig::new(&settings.server_url).with_n_predict(settings.n_predict);
    if let Some(timeout) = settings.request_timeout() {
        server = server.with_timeout(timeout);
    }
    let backend = Arc::new(LlamaServerBackend::new(server)?);

    println!(
        "{} {} from {}",
        "Loading".bold(),
        model_name,
        model_path.display()
    );
    if !backend.initialize(&model_path).await {
        bail!(
            "failed to initialize {} from {} (is the server at {} running?)",
            model_name,
            model_path.display(),
            settings.server_url
        );
    }

    let mut request = RunRequest::new(&options.model, &model_name);
    if let Some(count) = options.count {
        request = request.with_count(count);
    }
    if let Some(path) = &options.prompts {
        let file = PromptFile::new(path);
        println!("{} {}", "Prompts from".bold(), file.path().display());
        request = request.with_prompts(Arc::new(file));
    }

    let runner = BenchmarkRunner::new(Arc::clone(&store), settings.runner.clone());
    let mut updates = runner.subscribe();
    let run_id = runner
        .start(request, Arc::clone(&backend) as Arc<dyn InferenceBackend>)
        .await?;

    let bar = progress_bar(
        options
            .count
            .unwrap_or(settings.runner.default_prompt_count),
    )?;
    loop {
        tokio::select! {
            _ = runner.wait() => break,
            changed = updates.changed() => {
                if changed.is_err() {
                    runner.wait().await;
                    break;
                }
                if let Some(progress) = updates.borrow_and_update().as_ref() {
                    update_bar(&bar, progress);
                }
            }
            signal = tokio::signal::ctrl_c() => {
                if let Err(e) = signal {
                    warn!(error = %e, "Failed to listen for Ctrl-C");
                }
                bar.set_message("cancelling...");
                runner.cancel();
            }
        }
    }
    bar.finish_and_clear();
    backend.shutdown().await;

    let run = store
        .get_run(&run_id)
        .await?
        .with_context(|| format!("run {run_id} disappeared from the store"))?;
    let results = store.results_for_run(&run_id).await?;
    let bundle = RunExport::new(run, results);

    println!(
        "Run {} finished: {} ({}/{} prompts)",
        bundle.run.id,
        status_label(bundle.run.status),
        bundle.run.completed_prompts,
        bundle.run.total_prompts
    );
    if let Some(error) = runner.progress().and_then(|p| p.error) {
        println!("{} {}", "Error:".red().bold(), error);
    }
    println!();
    println!("{}", report::performance_report(&bundle.run.model_name, &bundle.stats));

    if let Some(dir) = &options.output {
        let written = write_run_outputs(dir, &bundle)
            .with_context(|| format!("failed to write outputs to {}", dir.display()))?;
        print_written(&written);
    }
    Ok(())
}

/// List runs, optionally for one model.
pub async fn list_runs(store: &dyn ResultStore, model: Option<&str>) -> anyhow::Result<()> {
    let runs = match model {
        Some(model_id) => store.runs_for_model(model_id).await?,
        None => store.list_runs().await?,
    };
    if runs.is_empty() {
        println!("No benchmark runs found");
        return Ok(());
    }

    println!(
        "{:<36}  {:<22}  {:<9}  {:>9}  {:>9}  {:>9}  {}",
        "RUN", "MODEL", "STATUS", "PROMPTS", "AVG (ms)", "P99 (ms)", "STARTED"
    );
    for run in &runs {
        print_run_row(run);
    }
    Ok(())
}

fn print_run_row(run: &BenchmarkRun) {
    // Pad before colouring so ANSI codes do not skew the column width.
    let status = format!("{:<9}", run.status.as_str());
    println!(
        "{:<36}  {:<22}  {}  {:>9}  {:>9.1}  {:>9.1}  {}",
        run.id,
        run.model_name,
        paint(run.status, &status),
        format!("{}/{}", run.completed_prompts, run.total_prompts),
        run.average_latency,
        run.p99_latency,
        run.start_time.format("%Y-%m-%d %H:%M:%S")
    );
}

/// Show a run with its results and analysis.
pub async fn show_results(store: &dyn ResultStore, run_id: &str) -> anyhow::Result<()> {
    let run = store
        .get_run(run_id)
        .await?
        .with_context(|| format!("run {run_id} not found"))?;
    let results = store.results_for_run(run_id).await?;
    let bundle = RunExport::new(run, results);

    println!(
        "{} {} [{}]",
        bundle.run.model_name.as_str().bold(),
        bundle.run.id,
        status_label(bundle.run.status)
    );
    println!();
    for result in &bundle.results {
        let outcome = if result.success {
            format!("{} tokens", result.response_tokens).as_str().normal()
        } else {
            result
                .error_message
                .as_deref()
                .unwrap_or("failed")
                .red()
        };
        println!(
            "{:>4}  {:>7}ms  {}",
            result.prompt_index, result.response_time_ms, outcome
        );
    }
    println!();
    println!("{}", report::performance_report(&bundle.run.model_name, &bundle.stats));
    if !bundle.results.is_empty() {
        println!("{}", report::analysis_report(&bundle.results, &bundle.stats));
    }
    Ok(())
}

/// Compare models over their completed runs.
pub async fn compare(store: &dyn ResultStore, output: Option<&Path>) -> anyhow::Result<()> {
    let comparisons = store.model_comparisons().await?;
    let runs = store.list_runs().await?;
    if comparisons.is_empty() && runs.is_empty() {
        println!("No benchmark runs found");
        return Ok(());
    }

    println!(
        "{}",
        report::comparison_report(&comparisons, &runs, chrono::Utc::now())
    );

    if let Some(dir) = output {
        let written = write_comparison_outputs(dir, &comparisons, &runs)
            .with_context(|| format!("failed to write outputs to {}", dir.display()))?;
        print_written(&written);
    }
    Ok(())
}

/// Delete one run, or every run when `run_id` is `None`.
pub async fn delete(store: &dyn ResultStore, run_id: Option<&str>) -> anyhow::Result<()> {
    match run_id {
        Some(run_id) => {
            if !store.delete_run(run_id).await? {
                bail!("run {run_id} not found");
            }
            info!(run_id, "Deleted run");
            println!("Deleted run {run_id}");
        }
        None => {
            let removed = store.delete_all_runs().await?;
            info!(removed, "Deleted all runs");
            println!("Deleted {removed} run(s)");
        }
    }
    Ok(())
}

/// Write every output of a run to `output`, or `benchmarks/output/<run-id>`.
pub async fn export(
    store: &dyn ResultStore,
    run_id: &str,
    output: Option<&Path>,
) -> anyhow::Result<()> {
    let run = store
        .get_run(run_id)
        .await?
        .with_context(|| format!("run {run_id} not found"))?;
    let results = store.results_for_run(run_id).await?;
    let bundle = RunExport::new(run, results);

    let dir = output.map_or_else(|| Path::new(OUTPUT_DIR).join(run_id), Path::to_path_buf);
    let written = write_run_outputs(&dir, &bundle)
        .with_context(|| format!("failed to write outputs to {}", dir.display()))?;
    print_written(&written);
    Ok(())
}

/// Print version and configuration.
pub async fn status(settings: &Settings, detailed: bool) -> anyhow::Result<()> {
    println!("LLM Benchkit");
    println!("Version: {}", env!("CARGO_PKG_VERSION"));
    println!("Database: {}", settings.database_url);
    println!("Server: {}", settings.server_url);

    if detailed {
        println!("\nRunner:");
        println!("  - throttle: {}ms", settings.runner.throttle_ms);
        println!("  - ETA buffer: {}ms", settings.runner.eta_buffer_ms);
        println!("  - default prompts: {}", settings.runner.default_prompt_count);
        println!("  - n_predict: {}", settings.n_predict);

        println!("\nModels:");
        for spec in settings.models.models() {
            let file = settings
                .model_path(&spec.id, None)
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "-".to_string());
            println!("  - {} ({}): {}", spec.id, spec.display_name, file);
        }

        let store = open_store(settings).await?;
        let runs = store.list_runs().await?;
        let unfinished = runs.iter().filter(|r| !r.is_finished()).count();
        println!("\nStored runs: {} ({} unfinished)", runs.len(), unfinished);
    }
    Ok(())
}

fn print_written(paths: &[PathBuf]) {
    println!("Wrote:");
    for path in paths {
        println!("  - {}", path.display());
    }
}
