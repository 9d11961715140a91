// Copyright 2025 LLM Benchkit Contributors
// SPDX-License-Identifier: Apache-2.0

//! Model catalog.
//!
//! Maps model identifiers to display names and model files. The catalog is
//! plain configuration handed to whoever needs it; nothing in the workspace
//! hard-codes model names outside [`ModelCatalog::default`].

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Maximum length of a display name derived from an unknown model id.
pub const FALLBACK_NAME_LEN: usize = 15;

/// One known model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelSpec {
    /// Short identifier, also matched as a substring of longer ids.
    pub id: String,
    /// Human-readable name.
    pub display_name: String,
    /// Model file, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
}

impl ModelSpec {
    /// Create a spec without a model file.
    pub fn new(id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            file: None,
        }
    }

    /// Attach a model file.
    pub fn with_file(mut self, file: impl Into<PathBuf>) -> Self {
        self.file = Some(file.into());
        self
    }
}

/// Table of known models.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModelCatalog {
    models: Vec<ModelSpec>,
}

impl Default for ModelCatalog {
    fn default() -> Self {
        Self::new(vec![
            ModelSpec::new("lfm2", "LFM2 1.2B").with_file("LFM2-1.2B-Q4_0.gguf"),
            ModelSpec::new("phi4", "Phi-4 Mini Instruct"),
            ModelSpec::new("qwen", "Qwen 1.5 1.8B"),
            ModelSpec::new("deepseek", "DeepSeek-R1 Distill 1.5B"),
        ])
    }
}

impl ModelCatalog {
    /// Create a catalog from explicit entries.
    pub fn new(models: Vec<ModelSpec>) -> Self {
        Self { models }
    }

    /// All entries in declaration order.
    pub fn models(&self) -> &[ModelSpec] {
        &self.models
    }

    /// Find the spec for `model_id`.
    ///
    /// Exact matches win; otherwise the first entry whose id appears in
    /// `model_id` (case-insensitive) is returned.
    pub fn find(&self, model_id: &str) -> Option<&ModelSpec> {
        if let Some(spec) = self.models.iter().find(|m| m.id == model_id) {
            return Some(spec);
        }
        let needle = model_id.to_lowercase();
        self.models
            .iter()
            .find(|m| needle.contains(&m.id.to_lowercase()))
    }

    /// Display name for `model_id`, falling back to a truncated id.
    pub fn display_name(&self, model_id: &str) -> String {
        match self.find(model_id) {
            Some(spec) => spec.display_name.clone(),
            None => model_id.chars().take(FALLBACK_NAME_LEN).collect(),
        }
    }
}
