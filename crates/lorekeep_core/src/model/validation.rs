//! Field-level validation shared by lifecycle services.
//!
//! # Invariants
//! - Names and titles are trimmed and must keep at least
//!   [`MIN_TITLE_CHARS`] characters.
//! - Required prose fields (description, synopsis) must not be blank.

use crate::error::{GraphError, GraphResult};

pub const MIN_TITLE_CHARS: usize = 2;

/// Validates and normalizes a name or title.
pub fn require_title(field: &'static str, value: &str) -> GraphResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(GraphError::invalid(format!("{field} is required")));
    }
    if trimmed.chars().count() < MIN_TITLE_CHARS {
        return Err(GraphError::invalid(format!(
            "{field} must have at least {MIN_TITLE_CHARS} characters"
        )));
    }
    Ok(trimmed.to_string())
}

/// Validates a required free-text field.
pub fn require_text(field: &'static str, value: &str) -> GraphResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(GraphError::invalid(format!("{field} is required")));
    }
    Ok(trimmed.to_string())
}

/// Trims an optional free-text field; blank collapses to `None`.
pub fn optional_text(value: Option<String>) -> Option<String> {
    value
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty())
}

#[cfg(test)]
mod tests {
    use super::{optional_text, require_text, require_title};

    #[test]
    fn title_is_trimmed_and_needs_two_chars() {
        assert_eq!(require_title("name", "  Saga A ").unwrap(), "Saga A");
        assert!(require_title("name", " x ").is_err());
        assert!(require_title("name", "   ").is_err());
        assert_eq!(require_title("name", "Éa").unwrap(), "Éa");
    }

    #[test]
    fn blank_text_is_rejected_or_dropped() {
        assert!(require_text("synopsis", "\n\t").is_err());
        assert_eq!(optional_text(Some("  ".into())), None);
        assert_eq!(optional_text(Some(" hero ".into())).as_deref(), Some("hero"));
    }
}
