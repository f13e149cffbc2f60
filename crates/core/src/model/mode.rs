use serde::{Deserialize, Serialize};

use crate::model::ids::{CategoryId, QuestionId};

/// Quiz mode of a session.
///
/// - `Learning`: only questions the user has not yet answered correctly;
///   the first answer per question updates statistics.
/// - `Review`: only questions the user has answered before; never touches statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QuizMode {
    Learning,
    Review,
}

impl QuizMode {
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            QuizMode::Learning => "Learning",
            QuizMode::Review => "Review",
        }
    }

    #[must_use]
    pub fn is_review(self) -> bool {
        matches!(self, QuizMode::Review)
    }
}

/// Which pool of questions the selector draws from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionScope {
    /// Any active question not yet answered correctly.
    GlobalUnseen,
    /// As `GlobalUnseen`, restricted to one category.
    CategoryUnseen(CategoryId),
    /// Any active question answered at least once, minus `excluded`.
    GlobalReview { excluded: Vec<QuestionId> },
    /// As `GlobalReview`, restricted to one category.
    CategoryReview {
        category_id: CategoryId,
        excluded: Vec<QuestionId>,
    },
}

impl SelectionScope {
    /// Build the scope for a mode, optional category and exclusion list.
    ///
    /// Exclusions only apply to review scopes and are dropped for learning.
    #[must_use]
    pub fn for_mode(
        mode: QuizMode,
        category_id: Option<CategoryId>,
        excluded: &[QuestionId],
    ) -> Self {
        match (mode, category_id) {
            (QuizMode::Learning, None) => SelectionScope::GlobalUnseen,
            (QuizMode::Learning, Some(id)) => SelectionScope::CategoryUnseen(id),
            (QuizMode::Review, None) => SelectionScope::GlobalReview {
                excluded: excluded.to_vec(),
            },
            (QuizMode::Review, Some(id)) => SelectionScope::CategoryReview {
                category_id: id,
                excluded: excluded.to_vec(),
            },
        }
    }

    #[must_use]
    pub fn mode(&self) -> QuizMode {
        match self {
            SelectionScope::GlobalUnseen | SelectionScope::CategoryUnseen(_) => QuizMode::Learning,
            SelectionScope::GlobalReview { .. } | SelectionScope::CategoryReview { .. } => {
                QuizMode::Review
            }
        }
    }

    #[must_use]
    pub fn category_id(&self) -> Option<CategoryId> {
        match self {
            SelectionScope::CategoryUnseen(id) => Some(*id),
            SelectionScope::CategoryReview { category_id, .. } => Some(*category_id),
            SelectionScope::GlobalUnseen | SelectionScope::GlobalReview { .. } => None,
        }
    }

    #[must_use]
    pub fn excluded(&self) -> &[QuestionId] {
        match self {
            SelectionScope::GlobalReview { excluded }
            | SelectionScope::CategoryReview { excluded, .. } => excluded,
            SelectionScope::GlobalUnseen | SelectionScope::CategoryUnseen(_) => &[],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn learning_scope_ignores_exclusions() {
        let scope = SelectionScope::for_mode(
            QuizMode::Learning,
            Some(CategoryId::new(3)),
            &[QuestionId::new(1)],
        );
        assert_eq!(scope, SelectionScope::CategoryUnseen(CategoryId::new(3)));
        assert!(scope.excluded().is_empty());
    }

    #[test]
    fn review_scope_keeps_exclusions() {
        let scope = SelectionScope::for_mode(QuizMode::Review, None, &[QuestionId::new(7)]);
        assert_eq!(scope.mode(), QuizMode::Review);
        assert_eq!(scope.category_id(), None);
        assert_eq!(scope.excluded(), &[QuestionId::new(7)]);
    }
}
