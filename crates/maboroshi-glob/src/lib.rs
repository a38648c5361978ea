//! # maboroshi-glob
//!
//! Path-oriented glob matching for watch patterns.
//!
//! Patterns are matched against slash-separated relative paths. Unlike a
//! plain character-level glob, `*` and `?` never cross a `/` separator, so
//! `view/*.svelte` matches `view/index.svelte` but not
//! `view/nested/index.svelte`. Use `**` to span directories.
//!
//! Supported syntax:
//! - `*` - zero or more characters within a segment
//! - `**` - zero or more characters including separators; `**/` matches
//!   zero or more whole segments
//! - `?` - exactly one character within a segment
//! - `[abc]`, `[a-z]`, `[!abc]` - character classes
//! - `{a,b}` - alternation, expanded before matching
//! - `\x` - escapes the next character

mod glob;

pub use glob::{expand_braces, glob_match, is_pattern};
