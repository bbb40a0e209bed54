//! Injection guard for user-supplied strings that are persisted, logged or
//! echoed back in responses.
//!
//! Only high-confidence patterns are matched: HTML/script markup and printf-style
//! format specifiers. Matches are rejected, never stripped.

use regex::Regex;
use std::sync::LazyLock;

use crate::AppError;

const MARKUP_PATTERN: &str = r"(?i)</?[a-z!?][^<>]*>|javascript\s*:|\bon[a-z]+\s*=";

const FORMAT_SPECIFIER_PATTERN: &str =
    r"%(?:\d+\$)?[-+#0]*\d*(?:\.\d+)?(?:hh|h|ll|l|z)?[sdinxXp](?:\b|$)";

/// Both guards as one alternation.
static INJECTION_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!("(?:{})|(?:{})", MARKUP_PATTERN, FORMAT_SPECIFIER_PATTERN))
        .expect("Injection regex should be valid")
});

/// Whether `value` contains markup or format specifiers.
pub fn contains_injection(value: &str) -> bool {
    INJECTION_PATTERN.is_match(value)
}

/// Reject `value` if it trips the guard. `field` names the input in the error;
/// the value itself is not included.
pub fn ensure_safe_input(field: &str, value: &str) -> Result<(), AppError> {
    if contains_injection(value) {
        tracing::warn!(field = field, "Rejected user input containing markup or format specifiers");
        return Err(AppError::UnsafeInput(format!(
            "{} contains disallowed content",
            field
        )));
    }
    Ok(())
}
