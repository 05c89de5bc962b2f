//! Slug resolution inside a caller-supplied uniqueness scope.
//!
//! # Responsibility
//! - Normalize free text into a URL-safe identifier.
//! - Append `-2`, `-3`, ... until the candidate is free in scope.
//!
//! # Invariants
//! - Output holds lowercase letters and digits of any script joined by single
//!   hyphens, with no leading or trailing hyphen.
//! - Diacritics are dropped from Latin letters only; marks on other scripts
//!   are part of the letter and survive.
//! - The existence check is owned by the caller, who binds it to the right
//!   scope and excludes the record being updated.

use crate::error::{GraphError, GraphResult};
use crate::repo::RepoResult;
use once_cell::sync::Lazy;
use regex::Regex;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

static NON_ALNUM_RUN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[^\p{Alphabetic}\p{N}\p{M}]+").expect("valid slug separator regex")
});

/// Normalizes free text into a slug base.
///
/// Lowercases, strips Latin diacritics, collapses every non-alphanumeric run
/// into a single hyphen and trims edge hyphens. Returns an empty string only
/// when the text has no letter or digit in any script.
pub fn slugify(text: &str) -> String {
    let folded = strip_latin_marks(text).to_lowercase();
    NON_ALNUM_RUN_RE
        .replace_all(&folded, "-")
        .trim_matches('-')
        .to_string()
}

/// Drops combining marks that sit on an ASCII base (`é` -> `e`) and
/// recomposes the rest, so `й` stays `й`.
fn strip_latin_marks(text: &str) -> String {
    let mut kept = String::with_capacity(text.len());
    let mut base_is_ascii = false;
    for ch in text.nfd() {
        if is_combining_mark(ch) {
            if !base_is_ascii {
                kept.push(ch);
            }
            continue;
        }
        base_is_ascii = ch.is_ascii();
        kept.push(ch);
    }
    kept.nfc().collect()
}

/// Resolves a collision-free slug for `text`.
///
/// `exists_in_scope` answers whether a candidate is already taken. The base
/// slug is returned when free, otherwise the first free numbered suffix.
///
/// # Errors
/// - `InvalidData` when `text` normalizes to an empty slug.
/// - Propagates repository failures from `exists_in_scope` unchanged.
pub fn resolve(
    text: &str,
    mut exists_in_scope: impl FnMut(&str) -> RepoResult<bool>,
) -> GraphResult<String> {
    let base = slugify(text);
    if base.is_empty() {
        return Err(GraphError::invalid(format!(
            "`{}` does not produce a usable slug",
            text.trim()
        )));
    }
    if !exists_in_scope(&base)? {
        return Ok(base);
    }

    let mut suffix: u64 = 2;
    loop {
        let candidate = format!("{base}-{suffix}");
        if !exists_in_scope(&candidate)? {
            return Ok(candidate);
        }
        suffix += 1;
    }
}
