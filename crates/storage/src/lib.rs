// Copyright 2025 LLM Benchkit Contributors
// SPDX-License-Identifier: Apache-2.0

//! Persistence for benchmark runs and per-prompt results.
//!
//! [`ResultStore`] is the contract the runner writes through. Two
//! implementations ship with the crate:
//!
//! - [`SqliteStore`] - durable storage on a sqlx SQLite pool
//! - [`MemoryStore`] - in-process maps, for tests and throwaway runs

#![warn(missing_docs, rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod error;
pub mod memory;
pub mod sqlite;
pub mod store;

pub use error::{StoreError, StoreResult};
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use store::ResultStore;
