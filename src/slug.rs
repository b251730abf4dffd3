//! Identifier normalization
//!
//! Every derived document id (index values, company ids, capability ids,
//! criterion ids) passes through [`slug`] so that the same human-entered
//! value always lands on the same document. Distinct inputs may collide
//! ("A B" and "a-b" both become "a_b"); collisions are accepted.

use crate::error::{Error, Result};

/// Normalize a raw value into a document identifier.
///
/// Lowercases the input, collapses every run of characters outside
/// `[a-z0-9]` into a single underscore, and strips leading and trailing
/// underscores. Inputs that normalize to nothing are a validation failure.
pub fn slug(input: &str) -> Result<String> {
    let mut out = String::with_capacity(input.len());
    let mut pending_sep = false;

    for c in input.chars() {
        let c = c.to_ascii_lowercase();
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            if pending_sep && !out.is_empty() {
                out.push('_');
            }
            pending_sep = false;
            out.push(c);
        } else {
            pending_sep = true;
        }
    }

    if out.is_empty() {
        return Err(Error::Validation(format!(
            "cannot derive identifier from {:?}",
            input
        )));
    }
    Ok(out)
}

/// Slug of `input`, falling back to `fallback` when `input` yields nothing.
pub fn slug_or(input: &str, fallback: &str) -> Result<String> {
    slug(input).or_else(|_| slug(fallback))
}

/// Check whether a string is already in normalized form.
pub fn is_valid_slug(s: &str) -> bool {
    if s.is_empty() || s.starts_with('_') || s.ends_with('_') || s.contains("__") {
        return false;
    }
    s.chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}

/// Slug the value, or pass it through untouched when already normalized.
///
/// Used on index values so that already-clean vocabulary ids skip the
/// allocation.
pub fn normalize_value(value: &str) -> Result<String> {
    if is_valid_slug(value) {
        Ok(value.to_string())
    } else {
        slug(value)
    }
}
