// Copyright 2025 LLM Benchkit Contributors
// SPDX-License-Identifier: Apache-2.0

//! Benchmark execution and reporting for LLM Benchkit.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use llm_benchkit_benchmarks::{BenchmarkRunner, RunRequest, RunnerConfig};
//! use llm_benchkit_core::InferenceBackend;
//! use llm_benchkit_storage::MemoryStore;
//!
//! # async fn demo(backend: Arc<dyn InferenceBackend>) -> llm_benchkit_core::Result<()> {
//! let runner = BenchmarkRunner::new(Arc::new(MemoryStore::new()), RunnerConfig::default());
//! let run_id = runner
//!     .start(RunRequest::new("lfm2", "LFM2 1.2B").with_count(10), backend)
//!     .await?;
//! runner.wait().await;
//! println!("finished {}", run_id);
//! # Ok(())
//! # }
//! ```
//!
//! # Modules
//!
//! - [`prompts`] - prompt sources and selection
//! - [`runner`] - the sequential benchmark runner
//! - [`export`] - CSV exports
//! - [`report`] - plain-text reports
//! - [`markdown`] - markdown summaries
//! - [`io`] - writing run outputs to disk

#![warn(missing_docs, rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod export;
pub mod io;
pub mod markdown;
pub mod prompts;
pub mod report;
pub mod runner;

pub use io::{write_run_outputs, RunExport};
pub use prompts::{select_prompts, PromptFile, PromptSource, BUILTIN_PROMPTS};
pub use runner::{BenchmarkRunner, RunRequest, RunnerConfig};
