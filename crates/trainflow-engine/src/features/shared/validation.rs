//! Shared validation utilities
//!
//! ```rust,ignore
//! use trainflow_engine::features::shared::validation::{validate_title, validate_tags};
//!
//! validate_title("Warehouse safety", MAX_TITLE_LENGTH)?;
//! validate_tags(&["safety".to_string()])?;
//! ```

use thiserror::Error;

/// Maximum length of flow, step and component titles.
pub const MAX_TITLE_LENGTH: usize = 256;

/// Maximum number of tags on one flow version.
pub const MAX_TAGS: usize = 20;

/// Maximum length of a single tag.
pub const MAX_TAG_LENGTH: usize = 50;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TitleValidationError {
    #[error("{field} is required and cannot be empty")]
    Required { field: &'static str },

    #[error("{field} must be between 1 and {max_length} characters")]
    TooLong {
        field: &'static str,
        max_length: usize,
    },
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TagValidationError {
    #[error("At most {max} tags are allowed")]
    TooMany { max: usize },

    #[error("Tags cannot be empty")]
    Empty,

    #[error("Tag '{tag}' exceeds {max_length} characters")]
    TooLong { tag: String, max_length: usize },

    #[error("Tag '{0}' appears more than once")]
    Duplicate(String),
}

/// Validate a required display text such as a title or option text.
///
/// Must not be blank after trimming and must fit in `max_length` characters.
pub fn validate_text(
    value: &str,
    field: &'static str,
    max_length: usize,
) -> Result<(), TitleValidationError> {
    if value.trim().is_empty() {
        return Err(TitleValidationError::Required { field });
    }
    if value.chars().count() > max_length {
        return Err(TitleValidationError::TooLong { field, max_length });
    }
    Ok(())
}

pub fn validate_title(title: &str, max_length: usize) -> Result<(), TitleValidationError> {
    validate_text(title, "Title", max_length)
}

/// Validate a flow's tag list.
pub fn validate_tags(tags: &[String]) -> Result<(), TagValidationError> {
    if tags.len() > MAX_TAGS {
        return Err(TagValidationError::TooMany { max: MAX_TAGS });
    }
    let mut seen = std::collections::HashSet::new();
    for tag in tags {
        let trimmed = tag.trim();
        if trimmed.is_empty() {
            return Err(TagValidationError::Empty);
        }
        if trimmed.chars().count() > MAX_TAG_LENGTH {
            return Err(TagValidationError::TooLong {
                tag: tag.clone(),
                max_length: MAX_TAG_LENGTH,
            });
        }
        if !seen.insert(trimmed.to_lowercase()) {
            return Err(TagValidationError::Duplicate(tag.clone()));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_title() {
        assert!(validate_title("Onboarding", MAX_TITLE_LENGTH).is_ok());
        assert_eq!(
            validate_title("   ", MAX_TITLE_LENGTH),
            Err(TitleValidationError::Required { field: "Title" })
        );
        assert!(matches!(
            validate_title(&"x".repeat(300), MAX_TITLE_LENGTH),
            Err(TitleValidationError::TooLong { .. })
        ));
    }

    #[test]
    fn test_validate_tags() {
        assert!(validate_tags(&[]).is_ok());
        assert!(validate_tags(&["safety".into(), "forklift".into()]).is_ok());
        assert_eq!(validate_tags(&[" ".into()]), Err(TagValidationError::Empty));
        assert!(matches!(
            validate_tags(&["Safety".into(), "safety".into()]),
            Err(TagValidationError::Duplicate(_))
        ));
        let many: Vec<String> = (0..=MAX_TAGS).map(|i| format!("t{i}")).collect();
        assert_eq!(validate_tags(&many), Err(TagValidationError::TooMany { max: MAX_TAGS }));
    }
}
