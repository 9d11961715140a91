// Copyright 2025 LLM Benchkit Contributors
// SPDX-License-Identifier: Apache-2.0

//! CLI for LLM Benchkit.
//!
//! This crate provides the `benchkit` command-line interface: running
//! benchmarks against a llama.cpp-compatible server, browsing stored runs and
//! exporting reports.

#![warn(missing_docs, rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod commands;
pub mod settings;
pub mod telemetry;

use clap::{Parser, Subcommand};
use commands::RunOptions;
use settings::Settings;
use std::path::PathBuf;

/// LLM Benchkit CLI.
#[derive(Parser, Debug)]
#[command(name = "benchkit")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Config file (defaults to `benchkit.toml` when present).
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Subcommand to run.
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Benchmark a model.
    ///
    /// Prompts run one at a time against the configured inference server.
    /// Press Ctrl-C to cancel; prompts already answered stay recorded.
    Run {
        /// Model id from the catalog (e.g. lfm2, phi4, qwen, deepseek).
        #[arg(short, long)]
        model: String,

        /// Model file, overriding the catalog entry.
        #[arg(long)]
        model_path: Option<PathBuf>,

        /// Number of prompts to run.
        #[arg(short = 'n', long)]
        count: Option<u32>,

        /// File with one prompt per line.
        #[arg(short, long)]
        prompts: Option<PathBuf>,

        /// Write results, CSV and reports to this directory.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// List benchmark runs, most recent first.
    Runs {
        /// Only runs of this model.
        #[arg(short, long)]
        model: Option<String>,
    },

    /// Show the results of one run.
    Results {
        /// Run id.
        run_id: String,
    },

    /// Compare models across completed runs.
    Compare {
        /// Write the comparison CSV and report to this directory.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Delete a run and its results.
    Delete {
        /// Run id.
        #[arg(required_unless_present = "all", conflicts_with = "all")]
        run_id: Option<String>,

        /// Delete every run.
        #[arg(long)]
        all: bool,
    },

    /// Export a run to JSON, CSV, text and markdown files.
    Export {
        /// Run id.
        run_id: String,

        /// Output directory (default: benchmarks/output/<run-id>).
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show version and configuration.
    Status {
        /// Show detailed status information.
        #[arg(short, long)]
        detailed: bool,
    },
}

/// Run the CLI with parsed arguments.
pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let settings = Settings::load(cli.config.as_deref())?;
    telemetry::init_tracing(&settings.log_level, settings.log_json)?;
    if let Some(addr) = settings.metrics_addr {
        telemetry::install_metrics(addr)?;
    }

    match cli.command {
        Commands::Run {
            model,
            model_path,
            count,
            prompts,
            output,
        } => {
            let store = commands::open_store(&settings).await?;
            let options = RunOptions {
                model,
                model_path,
                count,
                prompts,
                output,
            };
            commands::run_benchmark(&settings, store, options).await
        }
        Commands::Runs { model } => {
            let store = commands::open_store(&settings).await?;
            commands::list_runs(store.as_ref(), model.as_deref()).await
        }
        Commands::Results { run_id } => {
            let store = commands::open_store(&settings).await?;
            commands::show_results(store.as_ref(), &run_id).await
        }
        Commands::Compare { output } => {
            let store = commands::open_store(&settings).await?;
            commands::compare(store.as_ref(), output.as_deref()).await
        }
        Commands::Delete { run_id, all } => {
            let store = commands::open_store(&settings).await?;
            let target = if all { None } else { run_id.as_deref() };
            commands::delete(store.as_ref(), target).await
        }
        Commands::Export { run_id, output } => {
            let store = commands::open_store(&settings).await?;
            commands::export(store.as_ref(), &run_id, output.as_deref()).await
        }
        Commands::Status { detailed } => commands::status(&settings, detailed).await,
    }
}
