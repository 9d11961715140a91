// Copyright 2025 LLM Benchkit Contributors
// SPDX-License-Identifier: Apache-2.0

//! Inference backends for LLM Benchkit.
//!
//! - [`llama_server`] - a llama.cpp-compatible HTTP server

#![warn(missing_docs, rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod llama_server;

pub use llama_server::{check_model_file, LlamaServerBackend, LlamaServerConfig};
