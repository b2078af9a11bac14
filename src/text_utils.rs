// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Sanitizing of generated text before it reaches the UI.

/// Characters the generator uses for markdown emphasis, headings and code.
const MARKUP_CHARS: [char; 4] = ['*', '_', '#', '`'];

/// Strip markdown emphasis markers and surrounding whitespace.
///
/// Removes every `*`, `_`, `#` and backtick, so `**Paz** e _bem_` becomes
/// `Paz e bem`.
pub fn clean_output(text: &str) -> String {
    text.chars()
        .filter(|c| !MARKUP_CHARS.contains(c))
        .collect::<String>()
        .trim()
        .to_string()
}

/// Clean `text`, substituting `fallback` when nothing usable remains.
pub fn clean_or(text: Option<&str>, fallback: &str) -> String {
    let cleaned = text.map(clean_output).unwrap_or_default();
    if cleaned.is_empty() {
        fallback.to_string()
    } else {
        cleaned
    }
}
