//! Canonical codes for locations, departments, units, rooms and resources.

use crate::error::ValidationError;

/// Longest segment a caller may supply.
pub const MAX_SEGMENT_LEN: usize = 32;

/// Trim, uppercase, turn spaces and underscores into hyphens, collapse
/// repeated hyphens and strip them from both ends.
#[must_use]
pub fn canonicalize(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.trim().chars() {
        let ch = if ch.is_whitespace() || ch == '_' {
            '-'
        } else {
            ch.to_ascii_uppercase()
        };
        if ch == '-' && (out.is_empty() || out.ends_with('-')) {
            continue;
        }
        out.push(ch);
    }
    while out.ends_with('-') {
        out.pop();
    }
    out
}

/// Canonicalize `raw` and check it is a usable code segment.
///
/// # Errors
///
/// Returns [`ValidationError::InvalidCode`] when the canonical form is empty,
/// too long, or contains anything other than `A-Z`, `0-9` and `-`.
pub fn segment(raw: &str) -> Result<String, ValidationError> {
    let code = canonicalize(raw);
    let reason = if code.is_empty() {
        Some("code must not be empty")
    } else if code.len() > MAX_SEGMENT_LEN {
        Some("code must be at most 32 characters")
    } else if !code
        .chars()
        .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '-')
    {
        Some("only letters, digits and hyphens are allowed")
    } else {
        None
    };
    match reason {
        Some(reason) => Err(ValidationError::InvalidCode {
            value: raw.to_string(),
            reason,
        }),
        None => Ok(code),
    }
}

/// Join a parent's full code and a child segment (`C01` + `B02` → `C01-B02`).
#[must_use]
pub fn compose(parent: Option<&str>, segment: &str) -> String {
    match parent {
        Some(parent) => format!("{parent}-{segment}"),
        None => segment.to_string(),
    }
}
