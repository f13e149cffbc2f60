use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::CategoryId;

const MAX_CATEGORY_NAME_CHARS: usize = 64;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum CategoryError {
    #[error("category name cannot be empty")]
    EmptyName,

    #[error("category name is too long ({len} > 64 chars)")]
    NameTooLong { len: usize },
}

/// A named group of questions.
///
/// Names are unique; inactive categories are hidden from learners but keep
/// their questions and progress rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// Unvalidated category name coming from the admin wizard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryDraft {
    pub name: String,
}

impl CategoryDraft {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    /// Normalize and validate the category name.
    ///
    /// # Errors
    ///
    /// Returns `CategoryError::EmptyName` for blank names and
    /// `CategoryError::NameTooLong` when the trimmed name exceeds the limit.
    pub fn validate(self) -> Result<String, CategoryError> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(CategoryError::EmptyName);
        }
        let len = name.chars().count();
        if len > MAX_CATEGORY_NAME_CHARS {
            return Err(CategoryError::NameTooLong { len });
        }
        Ok(name.to_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn draft_trims_name() {
        let name = CategoryDraft::new("  Grammar \n").validate().unwrap();
        assert_eq!(name, "Grammar");
    }

    #[test]
    fn blank_name_is_rejected() {
        let err = CategoryDraft::new("   ").validate().unwrap_err();
        assert_eq!(err, CategoryError::EmptyName);
    }

    #[test]
    fn long_name_is_rejected() {
        let err = CategoryDraft::new("x".repeat(65)).validate().unwrap_err();
        assert_eq!(err, CategoryError::NameTooLong { len: 65 });
    }
}
