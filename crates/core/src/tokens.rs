// Copyright 2025 LLM Benchkit Contributors
// SPDX-License-Identifier: Apache-2.0

//! Token count approximation.

/// Characters per token assumed by [`estimate_tokens`].
pub const CHARS_PER_TOKEN: usize = 4;

/// Estimate the token count of `text` as `floor(len / 4)`.
///
/// Length is measured in UTF-16 code units so estimates match the recorded
/// history of the mobile client. This is not a tokenizer.
pub fn estimate_tokens(text: &str) -> u32 {
    (text.encode_utf16().count() / CHARS_PER_TOKEN) as u32
}
