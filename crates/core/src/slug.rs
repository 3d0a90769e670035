//! Retro slug validation.
//!
//! Slugs are the human-readable, URL-routable identifiers for retros. They
//! are mutable (a retro can be renamed) but unique at any point in time;
//! uniqueness is enforced by the database, format is enforced here.

use std::sync::OnceLock;

use regex::Regex;

use crate::error::CoreError;

/// Maximum slug length accepted by the API.
pub const MAX_SLUG_LENGTH: usize = 236;

fn slug_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[A-Za-z0-9-]+$").expect("slug pattern is valid"))
}

/// Validate a retro slug's format.
///
/// A valid slug is 1..=236 characters of ASCII letters, digits, and
/// hyphens. Returns a [`CoreError::Validation`] describing the first
/// violation otherwise.
pub fn validate_slug(slug: &str) -> Result<(), CoreError> {
    if slug.is_empty() {
        return Err(CoreError::Validation("Slug must not be empty".into()));
    }
    if slug.len() > MAX_SLUG_LENGTH {
        return Err(CoreError::Validation(format!(
            "Slug must be at most {MAX_SLUG_LENGTH} characters"
        )));
    }
    if !slug_pattern().is_match(slug) {
        return Err(CoreError::Validation(
            "Slug may only contain letters, numbers, and hyphens".into(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_simple_slugs() {
        assert!(validate_slug("my-team-retro").is_ok());
        assert!(validate_slug("Retro123").is_ok());
        assert!(validate_slug("a").is_ok());
    }

    #[test]
    fn rejects_empty_slug() {
        assert!(validate_slug("").is_err());
    }

    #[test]
    fn rejects_invalid_characters() {
        assert!(validate_slug("has space").is_err());
        assert!(validate_slug("has/slash").is_err());
        assert!(validate_slug("émoji").is_err());
    }

    #[test]
    fn rejects_overlong_slug() {
        let slug = "a".repeat(MAX_SLUG_LENGTH + 1);
        assert!(validate_slug(&slug).is_err());

        let slug = "a".repeat(MAX_SLUG_LENGTH);
        assert!(validate_slug(&slug).is_ok());
    }
}
