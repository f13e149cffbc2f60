use thiserror::Error;

use crate::model::ids::{AnswerId, CategoryId, QuestionId};
use crate::model::mode::{QuizMode, SelectionScope};
use crate::model::question::{Answer, QuestionWithAnswers};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

/// An event arrived that the current session state cannot handle.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SessionTransitionError {
    #[error("no quiz mode is active")]
    NoActiveMode,

    #[error("no question is being shown")]
    NoCurrentQuestion,

    #[error("there is no question to continue from")]
    NothingToAdvance,

    #[error("answer {0} is not an option of the current question")]
    UnknownAnswer(AnswerId),

    #[error("question {0} has no correct answer configured")]
    MissingCorrectAnswer(QuestionId),

    #[error("review session is not active")]
    NotInReview,
}

//
// ─── REVIEW EXCLUSION SET ──────────────────────────────────────────────────────
//

/// Question ids already surfaced in the current review session, in display order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShownQuestions(Vec<QuestionId>);

impl ShownQuestions {
    /// Returns `false` if the id was already recorded.
    pub fn insert(&mut self, id: QuestionId) -> bool {
        if self.0.contains(&id) {
            return false;
        }
        self.0.push(id);
        true
    }

    #[must_use]
    pub fn contains(&self, id: QuestionId) -> bool {
        self.0.contains(&id)
    }

    #[must_use]
    pub fn as_slice(&self) -> &[QuestionId] {
        &self.0
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Active mode together with the state only that mode carries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModeState {
    Learning,
    Review { shown: ShownQuestions },
}

impl ModeState {
    #[must_use]
    pub fn review() -> Self {
        ModeState::Review {
            shown: ShownQuestions::default(),
        }
    }

    #[must_use]
    pub fn mode(&self) -> QuizMode {
        match self {
            ModeState::Learning => QuizMode::Learning,
            ModeState::Review { .. } => QuizMode::Review,
        }
    }

    /// Exclusion set of the review session; always empty in learning mode.
    #[must_use]
    pub fn shown(&self) -> &[QuestionId] {
        match self {
            ModeState::Learning => &[],
            ModeState::Review { shown } => shown.as_slice(),
        }
    }

    fn record_shown(&mut self, id: QuestionId) {
        if let ModeState::Review { shown } = self {
            shown.insert(id);
        }
    }

    fn scope(&self, category_id: Option<CategoryId>) -> SelectionScope {
        SelectionScope::for_mode(self.mode(), category_id, self.shown())
    }
}

//
// ─── CURRENT QUESTION ──────────────────────────────────────────────────────────
//

/// The question on screen, with its correct answer resolved once at display time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentQuestion {
    question: QuestionWithAnswers,
    correct_answer_id: AnswerId,
    attempts: u32,
}

impl CurrentQuestion {
    #[must_use]
    pub fn question(&self) -> &QuestionWithAnswers {
        &self.question
    }

    #[must_use]
    pub fn id(&self) -> QuestionId {
        self.question.id()
    }

    #[must_use]
    pub fn category_id(&self) -> CategoryId {
        self.question.category_id()
    }

    #[must_use]
    pub fn correct_answer_id(&self) -> AnswerId {
        self.correct_answer_id
    }

    #[must_use]
    pub fn correct_answer(&self) -> Option<&Answer> {
        self.question.answer(self.correct_answer_id)
    }

    /// 1 for the first showing; incremented on every learning-mode retry.
    #[must_use]
    pub fn attempts(&self) -> u32 {
        self.attempts
    }
}

/// Result of checking a chosen option against the cached correct answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerCheck {
    pub mode: QuizMode,
    pub current: CurrentQuestion,
    pub chosen: AnswerId,
    pub is_correct: bool,
}

/// What the session does once an answer has been graded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnswerOutcome {
    /// Show the result with navigation to the next question.
    Advance,
    /// Ask the same question again.
    Retry,
}

//
// ─── SESSION STATE ─────────────────────────────────────────────────────────────
//

/// Per-conversation quiz state.
///
/// Transient: rebuilt from scratch whenever the user re-enters a mode.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SessionState {
    #[default]
    Idle,
    AwaitingCategory {
        mode: ModeState,
    },
    ShowingQuestion {
        mode: ModeState,
        current: CurrentQuestion,
    },
    ShowingResult {
        mode: ModeState,
        question_id: QuestionId,
        category_id: CategoryId,
    },
}

impl SessionState {
    fn mode_state(&self) -> Option<&ModeState> {
        match self {
            SessionState::Idle => None,
            SessionState::AwaitingCategory { mode }
            | SessionState::ShowingQuestion { mode, .. }
            | SessionState::ShowingResult { mode, .. } => Some(mode),
        }
    }

    #[must_use]
    pub fn mode(&self) -> Option<QuizMode> {
        self.mode_state().map(ModeState::mode)
    }

    #[must_use]
    pub fn is_idle(&self) -> bool {
        matches!(self, SessionState::Idle)
    }

    /// Review exclusion set; empty outside review mode.
    #[must_use]
    pub fn shown_questions(&self) -> &[QuestionId] {
        self.mode_state().map_or(&[], ModeState::shown)
    }

    #[must_use]
    pub fn current(&self) -> Option<&CurrentQuestion> {
        match self {
            SessionState::ShowingQuestion { current, .. } => Some(current),
            _ => None,
        }
    }

    /// Mutable access to the displayed options, e.g. to reorder them for a retry.
    pub fn current_answers_mut(&mut self) -> Option<&mut [Answer]> {
        match self {
            SessionState::ShowingQuestion { current, .. } => {
                Some(current.question.answers.as_mut_slice())
            }
            _ => None,
        }
    }

    /// Category of the question on screen or of the last answered one.
    #[must_use]
    pub fn current_category(&self) -> Option<CategoryId> {
        match self {
            SessionState::ShowingQuestion { current, .. } => Some(current.category_id()),
            SessionState::ShowingResult { category_id, .. } => Some(*category_id),
            SessionState::Idle | SessionState::AwaitingCategory { .. } => None,
        }
    }

    pub fn enter_learning(&mut self) {
        *self = SessionState::AwaitingCategory {
            mode: ModeState::Learning,
        };
    }

    /// Enter review mode with an empty exclusion set.
    pub fn enter_review(&mut self) {
        *self = SessionState::AwaitingCategory {
            mode: ModeState::review(),
        };
    }

    /// Clear the exclusion set and return to category choice, staying in review.
    ///
    /// # Errors
    ///
    /// Returns `SessionTransitionError::NotInReview` outside review mode.
    pub fn restart_review(&mut self) -> Result<(), SessionTransitionError> {
        if self.mode() != Some(QuizMode::Review) {
            return Err(SessionTransitionError::NotInReview);
        }
        self.enter_review();
        Ok(())
    }

    /// Back to the top-level menu; clears every session field.
    pub fn reset(&mut self) {
        *self = SessionState::Idle;
    }

    /// Scope for a fresh pick in the active mode.
    ///
    /// # Errors
    ///
    /// Returns `SessionTransitionError::NoActiveMode` when idle.
    pub fn scope_for(
        &self,
        category_id: Option<CategoryId>,
    ) -> Result<SelectionScope, SessionTransitionError> {
        self.mode_state()
            .map(|mode| mode.scope(category_id))
            .ok_or(SessionTransitionError::NoActiveMode)
    }

    /// Scope for "next question": the current category plus accumulated exclusions.
    ///
    /// # Errors
    ///
    /// Returns `SessionTransitionError::NothingToAdvance` unless a question or
    /// a result is on screen.
    pub fn next_scope(&self) -> Result<SelectionScope, SessionTransitionError> {
        match (self.mode_state(), self.current_category()) {
            (Some(mode), Some(category_id)) => Ok(mode.scope(Some(category_id))),
            _ => Err(SessionTransitionError::NothingToAdvance),
        }
    }

    /// Put a freshly selected question on screen.
    ///
    /// In review mode the id enters the exclusion set before anything else,
    /// so it is never re-surfaced in this session even if it cannot be shown.
    ///
    /// # Errors
    ///
    /// Returns `NoActiveMode` when idle, or `MissingCorrectAnswer` when the
    /// question has no correct option; the session then waits for a category.
    pub fn show_question(
        &mut self,
        question: QuestionWithAnswers,
    ) -> Result<(), SessionTransitionError> {
        let mut mode = self
            .mode_state()
            .cloned()
            .ok_or(SessionTransitionError::NoActiveMode)?;
        mode.record_shown(question.id());

        let Some(correct_answer_id) = question.correct_answer().map(|answer| answer.id) else {
            let id = question.id();
            *self = SessionState::AwaitingCategory { mode };
            return Err(SessionTransitionError::MissingCorrectAnswer(id));
        };

        *self = SessionState::ShowingQuestion {
            mode,
            current: CurrentQuestion {
                question,
                correct_answer_id,
                attempts: 1,
            },
        };
        Ok(())
    }

    /// Compare a chosen option with the cached correct answer without mutating state.
    ///
    /// # Errors
    ///
    /// Returns `NoCurrentQuestion` if nothing is on screen, or `UnknownAnswer`
    /// if `chosen` is not one of the displayed options.
    pub fn check_answer(&self, chosen: AnswerId) -> Result<AnswerCheck, SessionTransitionError> {
        let SessionState::ShowingQuestion { mode, current } = self else {
            return Err(SessionTransitionError::NoCurrentQuestion);
        };
        if current.question.answer(chosen).is_none() {
            return Err(SessionTransitionError::UnknownAnswer(chosen));
        }
        Ok(AnswerCheck {
            mode: mode.mode(),
            current: current.clone(),
            chosen,
            is_correct: chosen == current.correct_answer_id,
        })
    }

    /// Apply the post-grading transition.
    ///
    /// # Errors
    ///
    /// Returns `NoCurrentQuestion` if nothing is on screen.
    pub fn finish_answer(&mut self, outcome: AnswerOutcome) -> Result<(), SessionTransitionError> {
        match std::mem::take(self) {
            SessionState::ShowingQuestion { mode, mut current } => {
                *self = match outcome {
                    AnswerOutcome::Retry => {
                        current.attempts += 1;
                        SessionState::ShowingQuestion { mode, current }
                    }
                    AnswerOutcome::Advance => SessionState::ShowingResult {
                        mode,
                        question_id: current.id(),
                        category_id: current.category_id(),
                    },
                };
                Ok(())
            }
            other => {
                *self = other;
                Err(SessionTransitionError::NoCurrentQuestion)
            }
        }
    }

    /// The selector found nothing: wait for a category again, keeping the mode
    /// and (in review) the exclusion set.
    pub fn mark_exhausted(&mut self) {
        if let Some(mode) = self.mode_state().cloned() {
            *self = SessionState::AwaitingCategory { mode };
        }
    }
}
