//! Normalization of raw extracted document text.
//!
//! Layout-based extraction (PDF in particular) fuses words across line
//! breaks, leaks bullet glyphs, and splits hyphenated words. The
//! [`normalize`] pipeline repairs those artifacts and collapses the
//! result into single-spaced text suitable for splitting.

use regex::Regex;
use std::sync::LazyLock;

static FUSED_WORDS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([a-z])([A-Z])").expect("valid regex"));
static BULLET_GLYPHS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[●•]").expect("valid regex"));
static SPLIT_HYPHENS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"-\s+").expect("valid regex"));
static NEWLINE_RUNS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n{2,}").expect("valid regex"));
static WHITESPACE_RUNS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

/// Clean raw extracted text into a consistent, single-spaced form.
///
/// Applies six transformations in order (later steps operate on the
/// output of earlier ones):
///
/// 1. Insert a space between a lowercase letter and an immediately
///    following uppercase letter (`"wordNext"` → `"word Next"`).
/// 2. Replace bullet glyphs with a newline plus `"- "` list marker.
/// 3. Collapse a hyphen followed by whitespace into `"- "`.
/// 4. Collapse runs of two or more newlines into one.
/// 5. Collapse any whitespace run into a single space.
/// 6. Trim leading and trailing whitespace.
///
/// Total over all inputs (the empty string maps to the empty string)
/// and idempotent: `normalize(normalize(s)) == normalize(s)`.
pub fn normalize(text: &str) -> String {
    let text = FUSED_WORDS.replace_all(text, "$1 $2");
    let text = BULLET_GLYPHS.replace_all(&text, "\n- ");
    let text = SPLIT_HYPHENS.replace_all(&text, "- ");
    let text = NEWLINE_RUNS.replace_all(&text, "\n");
    let text = WHITESPACE_RUNS.replace_all(&text, " ");
    text.trim().to_string()
}
