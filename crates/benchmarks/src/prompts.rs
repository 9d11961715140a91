// Copyright 2025 LLM Benchkit Contributors
// SPDX-License-Identifier: Apache-2.0

//! Prompt sources and prompt selection.

use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, error};

/// Prompts used when no other source yields anything.
pub const BUILTIN_PROMPTS: [&str; 5] = [
    "What is artificial intelligence?",
    "Explain quantum computing in simple terms.",
    "Write a short story about a robot learning emotions.",
    "If a pen costs ₹15, how many pens can you buy with ₹120?",
    "A is taller than B, B is taller than C; who is the shortest among A, B, and C?",
];

/// Something that can supply benchmark prompts.
pub trait PromptSource: Send + Sync {
    /// Load the prompts. An empty list means "nothing usable".
    fn prompts(&self) -> Vec<String>;
}

impl PromptSource for Vec<String> {
    fn prompts(&self) -> Vec<String> {
        self.clone()
    }
}

/// Prompts read from a text file, one per line.
///
/// Lines may be written as quoted list items (`"prompt",` or `"prompt" +`);
/// the surrounding punctuation is stripped.
#[derive(Debug, Clone)]
pub struct PromptFile {
    path: PathBuf,
}

impl PromptFile {
    /// Prompt file at `path`. The file is read lazily.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Parse prompt file contents.
    pub fn parse(content: &str) -> Vec<String> {
        content
            .lines()
            .map(clean_line)
            .filter(|line| !line.is_empty())
            .collect()
    }
}

fn clean_line(line: &str) -> String {
    let line = line.trim();
    let mut line = line.strip_prefix('"').unwrap_or(line);
    while let Some(stripped) = line
        .strip_suffix(',')
        .or_else(|| line.strip_suffix('+'))
        .or_else(|| line.strip_suffix('"'))
    {
        line = stripped;
    }
    line.trim().to_string()
}

impl PromptSource for PromptFile {
    fn prompts(&self) -> Vec<String> {
        match fs::read_to_string(&self.path) {
            Ok(content) => {
                let prompts = Self::parse(&content);
                debug!(path = %self.path.display(), count = prompts.len(), "Loaded prompt file");
                prompts
            }
            Err(e) => {
                error!(path = %self.path.display(), error = %e, "Failed to read prompt file");
                Vec::new()
            }
        }
    }
}

/// The built-in prompts as owned strings.
pub fn builtin_prompts() -> Vec<String> {
    BUILTIN_PROMPTS.iter().map(|p| p.to_string()).collect()
}

/// Choose `count` prompts.
///
/// Uses `source` when it yields at least one non-blank prompt, otherwise the
/// built-ins. When `count` exceeds what is available the list is cycled, so
/// element `i` is `available[i % available.len()]`.
pub fn select_prompts(source: Option<&dyn PromptSource>, count: usize) -> Vec<String> {
    let from_source: Vec<String> = source
        .map(|s| s.prompts())
        .unwrap_or_default()
        .into_iter()
        .filter(|p| !p.trim().is_empty())
        .collect();

    let available = if from_source.is_empty() {
        builtin_prompts()
    } else {
        from_source
    };

    if count <= available.len() {
        available.into_iter().take(count).collect()
    } else {
        (0..count).map(|i| available[i % available.len()].clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_strips_list_punctuation() {
        let content = "\"What is Rust?\",\n  \"Explain ownership\"+\n\n   \nPlain line\n\"Trailing\"\"\",,";
        assert_eq!(
            PromptFile::parse(content),
            vec!["What is Rust?", "Explain ownership", "Plain line", "Trailing"]
        );
    }

    #[test]
    fn test_parse_keeps_inner_quotes() {
        assert_eq!(
            PromptFile::parse("\"Say \"hi\" politely\","),
            vec!["Say \"hi\" politely"]
        );
    }

    #[test]
    fn test_prompt_file_reads_lines() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "\"one\",").unwrap();
        writeln!(file, "\"two\",").unwrap();
        let source = PromptFile::new(file.path());
        assert_eq!(source.path(), file.path());
        assert_eq!(source.prompts(), vec!["one", "two"]);
    }

    #[test]
    fn test_missing_prompt_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let source = PromptFile::new(dir.path().join("nope.txt"));
        assert!(source.prompts().is_empty());
    }

    #[test]
    fn test_select_takes_prefix() {
        let prompts = select_prompts(None, 3);
        assert_eq!(prompts, builtin_prompts()[..3].to_vec());
    }

    #[test]
    fn test_select_cycles_builtins() {
        let prompts = select_prompts(None, 7);
        assert_eq!(prompts.len(), 7);
        for (i, prompt) in prompts.iter().enumerate() {
            assert_eq!(prompt, BUILTIN_PROMPTS[i % 5]);
        }
    }

    #[test]
    fn test_select_prefers_source() {
        let source = vec!["a".to_string(), "b".to_string()];
        assert_eq!(select_prompts(Some(&source as &dyn PromptSource), 3), vec!["a", "b", "a"]);
    }

    #[test]
    fn test_select_falls_back_on_blank_source() {
        let source = vec!["   ".to_string(), String::new()];
        assert_eq!(select_prompts(Some(&source as &dyn PromptSource), 2), builtin_prompts()[..2].to_vec());
    }

    #[test]
    fn test_select_zero() {
        assert!(select_prompts(None, 0).is_empty());
    }
}
