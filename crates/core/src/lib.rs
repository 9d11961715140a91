// Copyright 2025 LLM Benchkit Contributors
// SPDX-License-Identifier: Apache-2.0

//! Core types for LLM Benchkit.
//!
//! This crate holds everything the benchmark runner and its consumers share:
//!
//! - [`types`] - `BenchmarkRun`, `BenchmarkResult` and the run status machine
//! - [`stats`] - nearest-rank latency statistics
//! - [`tokens`] - the fixed token count approximation
//! - [`analysis`] - consistency, trend and efficiency ratings
//! - [`backend`] - the `InferenceBackend` contract
//! - [`catalog`] - the model catalog
//! - [`progress`] - live progress snapshots
//!
//! # Example
//!
//! ```
//! use chrono::Utc;
//! use llm_benchkit_core::{compute_stats, BenchmarkResult};
//!
//! let now = Utc::now();
//! let results = vec![
//!     BenchmarkResult::success("run-1", 0, "hi", "hello there!", now, now, 120),
//!     BenchmarkResult::failure("run-1", 1, "hi", now, now, 30, "timeout"),
//! ];
//! let stats = compute_stats(&results);
//! assert_eq!(stats.success_rate, 50.0);
//! assert_eq!(stats.average_latency, 120.0);
//! ```

#![warn(missing_docs, rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod analysis;
pub mod backend;
pub mod catalog;
pub mod error;
pub mod progress;
pub mod stats;
pub mod tokens;
pub mod types;

pub use backend::{BackendError, InferenceBackend};
pub use catalog::{ModelCatalog, ModelSpec};
pub use error::{Error, Result};
pub use progress::BenchmarkProgress;
pub use stats::{compute_stats, percentile, BenchmarkStats};
pub use tokens::estimate_tokens;
pub use types::{BenchmarkResult, BenchmarkRun, BenchmarkStatus, ModelComparison, ResultId, RunId};
