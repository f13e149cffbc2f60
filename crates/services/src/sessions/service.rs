use std::sync::Arc;

use quiz_core::model::{
    AnswerId, AnswerOutcome, CategoryId, QuizMode, SelectionScope, SessionState,
    SessionTransitionError, UserId,
};
use rand::seq::SliceRandom;
use storage::repository::{CategoryRepository, StorageError};

use super::view::{AnswerFeedback, CategoryChoice, ExhaustedView, QuestionView, QuizView};
use crate::error::{GradeError, SessionError};
use crate::progress_tracker::{GradeRequest, ProgressTracker};
use crate::selector::QuestionSelector;

//
// ─── SESSION ───────────────────────────────────────────────────────────────────
//

/// One user's conversation-scoped quiz state.
///
/// Owned by the transport; events for a session are processed one at a time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizSession {
    user_id: UserId,
    state: SessionState,
}

impl QuizSession {
    #[must_use]
    pub fn new(user_id: UserId) -> Self {
        Self {
            user_id,
            state: SessionState::Idle,
        }
    }

    #[must_use]
    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    #[must_use]
    pub fn state(&self) -> &SessionState {
        &self.state
    }
}

//
// ─── SERVICE ───────────────────────────────────────────────────────────────────
//

/// Drives `SessionState` from transport events: category picks, answers and navigation.
#[derive(Clone)]
pub struct QuizSessionService {
    categories: Arc<dyn CategoryRepository>,
    selector: QuestionSelector,
    tracker: ProgressTracker,
}

impl QuizSessionService {
    #[must_use]
    pub fn new(
        categories: Arc<dyn CategoryRepository>,
        selector: QuestionSelector,
        tracker: ProgressTracker,
    ) -> Self {
        Self {
            categories,
            selector,
            tracker,
        }
    }

    /// Enter learning mode and list the categories to choose from.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Storage` if categories cannot be loaded.
    pub async fn start_learning(
        &self,
        session: &mut QuizSession,
    ) -> Result<CategoryChoice, SessionError> {
        session.state.enter_learning();
        self.category_choice(QuizMode::Learning).await
    }

    /// Enter review mode with an empty shown-question set.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Storage` if categories cannot be loaded.
    pub async fn start_review(
        &self,
        session: &mut QuizSession,
    ) -> Result<CategoryChoice, SessionError> {
        session.state.enter_review();
        self.category_choice(QuizMode::Review).await
    }

    /// Forget which questions this review session has shown and start over.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Transition` outside review mode.
    pub async fn restart_review(
        &self,
        session: &mut QuizSession,
    ) -> Result<CategoryChoice, SessionError> {
        session.state.restart_review()?;
        self.category_choice(QuizMode::Review).await
    }

    /// Show a question from the chosen category in the active mode.
    ///
    /// From `Idle` this enters learning mode first.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::CategoryNotFound` (session reset to idle) when the
    /// category is missing or inactive, `MissingCorrectAnswer` when the picked
    /// question is malformed, or storage errors.
    pub async fn choose_category(
        &self,
        session: &mut QuizSession,
        category_id: CategoryId,
    ) -> Result<QuizView, SessionError> {
        if session.state.is_idle() {
            session.state.enter_learning();
        }

        match self.categories.get_category(category_id).await {
            Ok(category) if category.is_active => {}
            Ok(_) | Err(StorageError::NotFound) => {
                session.state.reset();
                return Err(SessionError::CategoryNotFound(category_id));
            }
            Err(err) => return Err(err.into()),
        }

        let scope = session.state.scope_for(Some(category_id))?;
        self.present(session, &scope).await
    }

    /// Show a question from any category.
    ///
    /// Stays in the active mode; from `Idle` this enters learning mode. A
    /// following `next_question` continues in the shown question's category.
    ///
    /// # Errors
    ///
    /// Returns `SessionError` on malformed questions or storage failures.
    pub async fn random_question(&self, session: &mut QuizSession) -> Result<QuizView, SessionError> {
        if session.state.is_idle() {
            session.state.enter_learning();
        }
        let scope = session.state.scope_for(None)?;
        self.present(session, &scope).await
    }

    /// Advance to another question in the current category.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Transition` unless a question or result is on screen.
    pub async fn next_question(&self, session: &mut QuizSession) -> Result<QuizView, SessionError> {
        let scope = session.state.next_scope()?;
        self.present(session, &scope).await
    }

    /// Grade the chosen option of the question on screen.
    ///
    /// An incorrect learning-mode answer keeps the same question on screen
    /// with reshuffled options; anything else moves to the result.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::StaleQuestion` (session reset to idle) if the
    /// question was deleted, `Transition` for answers that do not fit the
    /// state, or storage errors.
    pub async fn answer(
        &self,
        session: &mut QuizSession,
        chosen: AnswerId,
    ) -> Result<QuizView, SessionError> {
        let check = session.state.check_answer(chosen)?;

        let graded = match self
            .tracker
            .grade(GradeRequest {
                user_id: session.user_id,
                current: &check.current,
                chosen,
                mode: check.mode,
            })
            .await
        {
            Ok(graded) => graded,
            Err(GradeError::StaleQuestion(question_id)) => {
                tracing::warn!(user_id = %session.user_id, %question_id, "answered a deleted question");
                session.state.reset();
                return Err(SessionError::StaleQuestion(question_id));
            }
            Err(err) => return Err(err.into()),
        };

        let feedback = AnswerFeedback {
            question_id: check.current.id(),
            category_id: check.current.category_id(),
            mode: check.mode,
            is_correct: graded.is_correct,
            chosen_answer_id: chosen,
            correct_answer_text: graded.correct_answer_text,
            explanation: graded.explanation,
            statistics_applied: graded.statistics_applied,
        };

        if check.mode == QuizMode::Learning && !graded.is_correct {
            session.state.finish_answer(AnswerOutcome::Retry)?;
            if let Some(answers) = session.state.current_answers_mut() {
                answers.shuffle(&mut rand::rng());
            }
            let current = session
                .state
                .current()
                .ok_or(SessionTransitionError::NoCurrentQuestion)?;
            return Ok(QuizView::Retry {
                feedback,
                question: QuestionView::from_current(check.mode, current),
            });
        }

        session.state.finish_answer(AnswerOutcome::Advance)?;
        Ok(QuizView::Result(feedback))
    }

    /// Return to the top-level menu, dropping all session fields.
    pub fn leave(&self, session: &mut QuizSession) {
        session.state.reset();
    }

    async fn category_choice(&self, mode: QuizMode) -> Result<CategoryChoice, SessionError> {
        let categories = self.categories.list_active_categories().await?;
        Ok(CategoryChoice { mode, categories })
    }

    async fn present(
        &self,
        session: &mut QuizSession,
        scope: &SelectionScope,
    ) -> Result<QuizView, SessionError> {
        let Some(question) = self.selector.select(session.user_id, scope).await? else {
            let can_restart_review =
                scope.mode().is_review() && !session.state.shown_questions().is_empty();
            session.state.mark_exhausted();
            return Ok(QuizView::Exhausted(ExhaustedView {
                mode: scope.mode(),
                category_id: scope.category_id(),
                can_restart_review,
            }));
        };

        let category_id = question.question.category_id;
        match session.state.show_question(question) {
            Ok(()) => {}
            Err(SessionTransitionError::MissingCorrectAnswer(question_id)) => {
                tracing::warn!(
                    %question_id,
                    %category_id,
                    mode = scope.mode().label(),
                    "question has no correct answer; skipping"
                );
                return Err(SessionError::MissingCorrectAnswer(question_id));
            }
            Err(err) => return Err(err.into()),
        }

        let current = session
            .state
            .current()
            .ok_or(SessionTransitionError::NoCurrentQuestion)?;
        Ok(QuizView::Question(QuestionView::from_current(
            scope.mode(),
            current,
        )))
    }
}
