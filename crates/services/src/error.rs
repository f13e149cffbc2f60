//! Shared error types for the services crate.

use thiserror::Error;

use quiz_core::model::{CategoryId, QuestionId, SessionTransitionError, UserId};
use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;

/// Errors emitted by `AssistantService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AssistantError {
    #[error("assistant is not configured")]
    Disabled,
    #[error("assistant message is empty")]
    EmptyMessage,
    #[error("assistant returned an empty response")]
    EmptyResponse,
    #[error("assistant request failed with status {0}")]
    HttpStatus(reqwest::StatusCode),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `ProgressTracker`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum GradeError {
    #[error("question {0} no longer exists")]
    StaleQuestion(QuestionId),
    #[error("grading write did not finish: {0}")]
    Interrupted(String),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Coarse classification of quiz session failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionErrorKind {
    /// Something the user referenced is gone; fall back to a menu.
    NotFound,
    /// Content is malformed; offer another question.
    IntegrityViolation,
    /// The event does not fit the current session state.
    InvalidTransition,
    /// Storage failed; show a generic failure and let the user retry.
    TransientStoreFailure,
}

/// Errors emitted by `QuizSessionService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SessionError {
    #[error("category {0} is not available")]
    CategoryNotFound(CategoryId),
    #[error("question {0} no longer exists")]
    StaleQuestion(QuestionId),
    #[error("question {0} has no correct answer configured")]
    MissingCorrectAnswer(QuestionId),
    #[error(transparent)]
    Transition(#[from] SessionTransitionError),
    #[error(transparent)]
    Grade(#[from] GradeError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl SessionError {
    #[must_use]
    pub fn kind(&self) -> SessionErrorKind {
        match self {
            SessionError::CategoryNotFound(_)
            | SessionError::StaleQuestion(_)
            | SessionError::Grade(GradeError::StaleQuestion(_))
            | SessionError::Storage(StorageError::NotFound) => SessionErrorKind::NotFound,
            SessionError::MissingCorrectAnswer(_) => SessionErrorKind::IntegrityViolation,
            SessionError::Transition(_) => SessionErrorKind::InvalidTransition,
            SessionError::Grade(_) | SessionError::Storage(_) => {
                SessionErrorKind::TransientStoreFailure
            }
        }
    }

    /// `true` when the user can continue by navigating, without a generic failure message.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        !matches!(self.kind(), SessionErrorKind::TransientStoreFailure)
    }
}

/// Errors emitted by `StatsService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StatsError {
    #[error("user {0} is not registered")]
    UnknownUser(UserId),
    #[error("user {0} is not an administrator")]
    Forbidden(UserId),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `ContentService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ContentError {
    #[error("user {0} is not an administrator")]
    Forbidden(UserId),
    #[error("content not found")]
    NotFound,
    #[error(transparent)]
    Invalid(#[from] quiz_core::Error),
    #[error(transparent)]
    Storage(StorageError),
}

impl From<StorageError> for ContentError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound => ContentError::NotFound,
            other => ContentError::Storage(other),
        }
    }
}

/// Errors emitted by `UserService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum UserServiceError {
    #[error("user {0} is not registered")]
    UnknownUser(UserId),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stale_and_missing_content_are_recoverable() {
        let stale = SessionError::StaleQuestion(QuestionId::new(1));
        assert_eq!(stale.kind(), SessionErrorKind::NotFound);
        assert!(stale.is_recoverable());

        let broken = SessionError::MissingCorrectAnswer(QuestionId::new(2));
        assert_eq!(broken.kind(), SessionErrorKind::IntegrityViolation);
        assert!(broken.is_recoverable());
    }

    #[test]
    fn store_failures_are_not_recoverable() {
        let err = SessionError::Storage(StorageError::Connection("disk I/O error".into()));
        assert_eq!(err.kind(), SessionErrorKind::TransientStoreFailure);
        assert!(!err.is_recoverable());
    }

    #[test]
    fn content_maps_missing_rows_to_not_found() {
        assert!(matches!(
            ContentError::from(StorageError::NotFound),
            ContentError::NotFound
        ));
        assert!(matches!(
            ContentError::from(StorageError::Conflict),
            ContentError::Storage(StorageError::Conflict)
        ));
    }
}
