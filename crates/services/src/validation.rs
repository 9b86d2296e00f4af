//! Payload checks shared by the services.

use domains::{DomainError, Result};

pub const MAX_SLUG_LEN: usize = 100;
pub const MAX_TITLE_LEN: usize = 200;

/// Lowercase ASCII words joined by single hyphens, e.g. `actors-lounge`.
pub fn validate_slug(slug: &str) -> Result<()> {
    if slug.is_empty() || slug.len() > MAX_SLUG_LEN {
        return Err(DomainError::validation(format!(
            "slug must be between 1 and {MAX_SLUG_LEN} characters"
        )));
    }
    let well_formed = slug
        .split('-')
        .all(|word| {
            !word.is_empty() && word.bytes().all(|b| b.is_ascii_lowercase() || b.is_ascii_digit())
        });
    if !well_formed {
        return Err(DomainError::validation(format!(
            "slug '{slug}' is not URL-safe"
        )));
    }
    Ok(())
}

/// Rejects blank text and, when `max_chars` is set, overlong text.
pub fn require_text(field: &str, value: &str, max_chars: Option<usize>) -> Result<()> {
    if value.trim().is_empty() {
        return Err(DomainError::validation(format!("{field} must not be blank")));
    }
    if let Some(max) = max_chars {
        if value.chars().count() > max {
            return Err(DomainError::validation(format!(
                "{field} must be at most {max} characters"
            )));
        }
    }
    Ok(())
}
