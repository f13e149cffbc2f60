use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use quiz_core::model::{
    AnswerEvent, AnswerId, Category, CategoryCatalogStats, CategoryId, CategoryProgress,
    OverallProgress, ProgressAggregate, Question, QuestionId, QuestionWithAnswers, SelectionScope,
    User, UserId, UserProfile, ValidatedQuestion,
};
use thiserror::Error;

use crate::memory::InMemoryRepository;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

//
// ─── RECORDS ───────────────────────────────────────────────────────────────────
//

/// A single answer as submitted by a user, before it is logged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerSubmission {
    pub user_id: UserId,
    pub question_id: QuestionId,
    pub answer_id: AnswerId,
    pub is_correct: bool,
    pub answered_at: DateTime<Utc>,
}

/// What a learning-mode answer did to the log and the statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LearningRecord {
    /// First answer for (user, question): logged and counted.
    Counted,
    /// Later correct answer: logged, statistics untouched.
    RepeatRecorded,
    /// Later incorrect answer: nothing written.
    RepeatIgnored,
}

impl LearningRecord {
    #[must_use]
    pub fn statistics_applied(self) -> bool {
        matches!(self, LearningRecord::Counted)
    }
}

/// Author of a chat history entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatRole {
    User,
    Assistant,
}

impl ChatRole {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ChatRole::User => "user",
            ChatRole::Assistant => "assistant",
        }
    }

    /// Parse the storage representation.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Serialization` for unknown roles.
    pub fn parse(raw: &str) -> Result<Self, StorageError> {
        match raw {
            "user" => Ok(ChatRole::User),
            "assistant" => Ok(ChatRole::Assistant),
            other => Err(StorageError::Serialization(format!(
                "invalid chat role: {other}"
            ))),
        }
    }
}

impl fmt::Display for ChatRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl ChatMessage {
    #[must_use]
    pub fn new(role: ChatRole, content: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Self {
            role,
            content: content.into(),
            created_at,
        }
    }
}

/// Number of chat messages kept per user.
pub const DEFAULT_HISTORY_WINDOW: usize = 5;

//
// ─── REPOSITORY CONTRACTS ──────────────────────────────────────────────────────
//

#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Insert the user on first interaction; an existing row is left untouched.
    ///
    /// Returns `true` if the user was created by this call.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the user cannot be stored.
    async fn register_user(
        &self,
        profile: &UserProfile,
        now: DateTime<Utc>,
    ) -> Result<bool, StorageError>;

    /// Fetch a user with their lifetime counters.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the user never registered.
    async fn get_user(&self, id: UserId) -> Result<User, StorageError>;
}

#[async_trait]
pub trait CategoryRepository: Send + Sync {
    /// Create a category by name, or return the id of the existing one.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the category cannot be stored.
    async fn upsert_category_by_name(
        &self,
        name: &str,
        now: DateTime<Utc>,
    ) -> Result<CategoryId, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing, or other storage errors.
    async fn get_category(&self, id: CategoryId) -> Result<Category, StorageError>;

    /// All categories, active or not, ordered by name.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the query fails.
    async fn list_categories(&self) -> Result<Vec<Category>, StorageError>;

    /// Active categories ordered by name.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the query fails.
    async fn list_active_categories(&self) -> Result<Vec<Category>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the category does not exist.
    async fn set_category_active(&self, id: CategoryId, active: bool)
    -> Result<(), StorageError>;

    /// Hard delete, cascading to questions, answers, answer events and progress rows.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the category does not exist.
    async fn delete_category(&self, id: CategoryId) -> Result<(), StorageError>;
}

#[async_trait]
pub trait QuestionRepository: Send + Sync {
    /// Insert a question and its answers atomically.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the category does not exist.
    async fn insert_question(
        &self,
        question: &ValidatedQuestion,
        now: DateTime<Utc>,
    ) -> Result<QuestionId, StorageError>;

    /// Overwrite the question's content and replace its answer set.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the question or target category is missing.
    async fn replace_question(
        &self,
        id: QuestionId,
        question: &ValidatedQuestion,
    ) -> Result<(), StorageError>;

    /// Fetch a question with answers in insertion order, active or not.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing, or other storage errors.
    async fn get_question(&self, id: QuestionId) -> Result<QuestionWithAnswers, StorageError>;

    /// Questions of a category ordered by id, including inactive ones.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the query fails.
    async fn list_questions(&self, category_id: CategoryId)
    -> Result<Vec<Question>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the question does not exist.
    async fn set_question_active(&self, id: QuestionId, active: bool)
    -> Result<(), StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the question does not exist.
    async fn delete_question(&self, id: QuestionId) -> Result<(), StorageError>;

    /// Pick one eligible question uniformly at random for `user_id`.
    ///
    /// Only active questions in active categories are eligible. Returns
    /// `Ok(None)` when the pool for `scope` is empty.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the query fails.
    async fn random_question(
        &self,
        user_id: UserId,
        scope: &SelectionScope,
    ) -> Result<Option<QuestionWithAnswers>, StorageError>;
}

#[async_trait]
pub trait ProgressRepository: Send + Sync {
    /// Log a learning-mode answer, counting it only if it is the first for
    /// (user, question). The existence check and every write happen atomically.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the question or user no longer exists.
    async fn record_learning_answer(
        &self,
        submission: &AnswerSubmission,
    ) -> Result<LearningRecord, StorageError>;

    /// Log a review-mode answer without touching statistics.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the question or user no longer exists.
    async fn record_review_answer(&self, submission: &AnswerSubmission)
    -> Result<(), StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` if the query fails.
    async fn has_answered(
        &self,
        user_id: UserId,
        question_id: QuestionId,
    ) -> Result<bool, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` if the query fails.
    async fn has_answered_correctly(
        &self,
        user_id: UserId,
        question_id: QuestionId,
    ) -> Result<bool, StorageError>;

    /// Answer log of a user, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the query fails.
    async fn answer_events(&self, user_id: UserId) -> Result<Vec<AnswerEvent>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` if the query fails.
    async fn progress_for_category(
        &self,
        user_id: UserId,
        category_id: CategoryId,
    ) -> Result<Option<ProgressAggregate>, StorageError>;

    /// Aggregates joined with category names, ordered by name.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the query fails.
    async fn progress_by_category(
        &self,
        user_id: UserId,
    ) -> Result<Vec<CategoryProgress>, StorageError>;

    /// Sum of all aggregates; `None` when the user has no progress rows.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the query fails.
    async fn overall_progress(
        &self,
        user_id: UserId,
    ) -> Result<Option<OverallProgress>, StorageError>;

    /// Active question and distinct learner counts per active category, ordered by name.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the query fails.
    async fn category_catalog_stats(&self) -> Result<Vec<CategoryCatalogStats>, StorageError>;
}

#[async_trait]
pub trait ChatHistoryRepository: Send + Sync {
    /// Append a message and drop everything but the `keep` most recent ones.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the message cannot be stored.
    async fn append_message(
        &self,
        user_id: UserId,
        message: &ChatMessage,
        keep: usize,
    ) -> Result<(), StorageError>;

    /// Up to `limit` most recent messages, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the query fails.
    async fn recent_messages(
        &self,
        user_id: UserId,
        limit: usize,
    ) -> Result<Vec<ChatMessage>, StorageError>;
}

/// Aggregates the repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub users: Arc<dyn UserRepository>,
    pub categories: Arc<dyn CategoryRepository>,
    pub questions: Arc<dyn QuestionRepository>,
    pub progress: Arc<dyn ProgressRepository>,
    pub chat: Arc<dyn ChatHistoryRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryRepository::new();
        Self {
            users: Arc::new(repo.clone()),
            categories: Arc::new(repo.clone()),
            questions: Arc::new(repo.clone()),
            progress: Arc::new(repo.clone()),
            chat: Arc::new(repo),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_role_round_trips() {
        for role in [ChatRole::User, ChatRole::Assistant] {
            assert_eq!(ChatRole::parse(role.as_str()).unwrap(), role);
        }
        assert!(matches!(
            ChatRole::parse("system"),
            Err(StorageError::Serialization(_))
        ));
    }

    #[test]
    fn only_counted_record_applies_statistics() {
        assert!(LearningRecord::Counted.statistics_applied());
        assert!(!LearningRecord::RepeatRecorded.statistics_applied());
        assert!(!LearningRecord::RepeatIgnored.statistics_applied());
    }
}
