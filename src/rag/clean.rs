//! Post-processing of raw model output.

use regex::Regex;
use std::sync::LazyLock;

static REASONING_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<think>.*?</think>").expect("valid reasoning pattern"));

static CONTROL_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<\|.*?\|>").expect("valid control token pattern"));

/// Strip `<think>...</think>` reasoning blocks and `<|...|>` control tokens,
/// then trim surrounding whitespace.
pub fn clean_output(raw: &str) -> String {
    let without_reasoning = REASONING_BLOCK.replace_all(raw, "");
    CONTROL_TOKEN
        .replace_all(&without_reasoning, "")
        .trim()
        .to_string()
}
