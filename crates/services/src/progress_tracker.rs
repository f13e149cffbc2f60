use std::sync::Arc;

use quiz_core::model::{AnswerId, CurrentQuestion, QuestionId, QuizMode, UserId};
use storage::repository::{AnswerSubmission, ProgressRepository, StorageError};

use crate::Clock;
use crate::error::GradeError;

/// One answer to grade against the question currently on screen.
#[derive(Debug, Clone, Copy)]
pub struct GradeRequest<'a> {
    pub user_id: UserId,
    pub current: &'a CurrentQuestion,
    pub chosen: AnswerId,
    pub mode: QuizMode,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GradeResult {
    pub is_correct: bool,
    pub explanation: Option<String>,
    pub statistics_applied: bool,
    pub correct_answer_text: String,
}

/// Grades answers and records them exactly once for statistics.
#[derive(Clone)]
pub struct ProgressTracker {
    clock: Clock,
    progress: Arc<dyn ProgressRepository>,
}

impl ProgressTracker {
    #[must_use]
    pub fn new(clock: Clock, progress: Arc<dyn ProgressRepository>) -> Self {
        Self { clock, progress }
    }

    /// Grade `request.chosen` against the cached correct answer and log it.
    ///
    /// Learning answers update statistics only the first time a question is
    /// answered; review answers never do. The write runs on its own task, so
    /// dropping the returned future does not abort a started commit.
    ///
    /// # Errors
    ///
    /// Returns `GradeError::StaleQuestion` if the question was deleted meanwhile,
    /// or `GradeError::Storage` for other storage failures.
    pub async fn grade(&self, request: GradeRequest<'_>) -> Result<GradeResult, GradeError> {
        let current = request.current;
        let question_id = current.id();
        let is_correct = request.chosen == current.correct_answer_id();
        let submission = AnswerSubmission {
            user_id: request.user_id,
            question_id,
            answer_id: request.chosen,
            is_correct,
            answered_at: self.clock.now(),
        };

        let progress = Arc::clone(&self.progress);
        let mode = request.mode;
        let write = tokio::spawn(async move {
            match mode {
                QuizMode::Learning => progress
                    .record_learning_answer(&submission)
                    .await
                    .map(|record| record.statistics_applied()),
                QuizMode::Review => progress
                    .record_review_answer(&submission)
                    .await
                    .map(|()| false),
            }
        });

        let statistics_applied = write
            .await
            .map_err(|e| GradeError::Interrupted(e.to_string()))?
            .map_err(|e| stale_or_storage(question_id, e))?;

        tracing::debug!(
            user_id = %request.user_id,
            %question_id,
            mode = mode.label(),
            is_correct,
            statistics_applied,
            "answer graded"
        );

        Ok(GradeResult {
            is_correct,
            explanation: current.question().question.explanation.clone(),
            statistics_applied,
            correct_answer_text: current
                .correct_answer()
                .map(|answer| answer.text.clone())
                .unwrap_or_default(),
        })
    }
}

fn stale_or_storage(question_id: QuestionId, err: StorageError) -> GradeError {
    match err {
        StorageError::NotFound => GradeError::StaleQuestion(question_id),
        other => GradeError::Storage(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use quiz_core::model::{
        AnswerDraft, Difficulty, SessionState, UserProfile, ValidatedQuestion,
    };
    use quiz_core::time::{fixed_clock, fixed_now};
    use storage::InMemoryRepository;
    use storage::repository::{CategoryRepository, QuestionRepository, UserRepository};

    async fn showing(repo: &InMemoryRepository, mode: QuizMode) -> SessionState {
        repo.register_user(&UserProfile::new(UserId::new(1)), fixed_now())
            .await
            .unwrap();
        let category = repo
            .upsert_category_by_name("Grammar", fixed_now())
            .await
            .unwrap();
        let id = repo
            .insert_question(
                &ValidatedQuestion {
                    category_id: category,
                    text: "She ___ happy.".into(),
                    difficulty: Difficulty::Beginner,
                    explanation: Some("Use \"is\" with she.".into()),
                    answers: vec![AnswerDraft::new("is", true), AnswerDraft::new("are", false)],
                },
                fixed_now(),
            )
            .await
            .unwrap();

        let mut state = SessionState::Idle;
        match mode {
            QuizMode::Learning => state.enter_learning(),
            QuizMode::Review => state.enter_review(),
        }
        state
            .show_question(repo.get_question(id).await.unwrap())
            .unwrap();
        state
    }

    fn wrong_answer(current: &CurrentQuestion) -> AnswerId {
        current
            .question()
            .answers
            .iter()
            .find(|a| !a.is_correct)
            .unwrap()
            .id
    }

    #[tokio::test]
    async fn first_wrong_answer_counts_then_correct_repeat_does_not() {
        let repo = InMemoryRepository::new();
        let state = showing(&repo, QuizMode::Learning).await;
        let current = state.current().unwrap();
        let tracker = ProgressTracker::new(fixed_clock(), Arc::new(repo.clone()));

        let first = tracker
            .grade(GradeRequest {
                user_id: UserId::new(1),
                current,
                chosen: wrong_answer(current),
                mode: QuizMode::Learning,
            })
            .await
            .unwrap();
        assert!(!first.is_correct);
        assert!(first.statistics_applied);
        assert_eq!(first.correct_answer_text, "is");
        assert_eq!(first.explanation.as_deref(), Some("Use \"is\" with she."));

        let second = tracker
            .grade(GradeRequest {
                user_id: UserId::new(1),
                current,
                chosen: current.correct_answer_id(),
                mode: QuizMode::Learning,
            })
            .await
            .unwrap();
        assert!(second.is_correct);
        assert!(!second.statistics_applied);

        let user = repo.get_user(UserId::new(1)).await.unwrap();
        assert_eq!(user.total_questions, 1);
        assert_eq!(user.correct_answers, 0);
    }

    #[tokio::test]
    async fn review_answers_leave_counters_alone() {
        let repo = InMemoryRepository::new();
        let state = showing(&repo, QuizMode::Review).await;
        let current = state.current().unwrap();
        let tracker = ProgressTracker::new(fixed_clock(), Arc::new(repo.clone()));

        let graded = tracker
            .grade(GradeRequest {
                user_id: UserId::new(1),
                current,
                chosen: current.correct_answer_id(),
                mode: QuizMode::Review,
            })
            .await
            .unwrap();
        assert!(graded.is_correct);
        assert!(!graded.statistics_applied);
        assert_eq!(repo.get_user(UserId::new(1)).await.unwrap().total_questions, 0);
    }

    #[tokio::test]
    async fn deleted_question_is_stale() {
        let repo = InMemoryRepository::new();
        let state = showing(&repo, QuizMode::Learning).await;
        let current = state.current().unwrap();
        repo.delete_question(current.id()).await.unwrap();

        let tracker = ProgressTracker::new(fixed_clock(), Arc::new(repo));
        let err = tracker
            .grade(GradeRequest {
                user_id: UserId::new(1),
                current,
                chosen: current.correct_answer_id(),
                mode: QuizMode::Learning,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, GradeError::StaleQuestion(id) if id == current.id()));
    }
}
