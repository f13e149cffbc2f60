//! Presentation-agnostic payloads for the transport.
//!
//! No markup and no localisation: the transport decides how to render
//! options, badges and explanations.

use quiz_core::model::{
    AnswerId, Category, CategoryId, CurrentQuestion, Difficulty, QuestionId, QuizMode,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerOption {
    pub answer_id: AnswerId,
    pub text: String,
    pub is_correct: bool,
}

/// A question ready to be shown, options in display order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionView {
    pub question_id: QuestionId,
    pub category_id: CategoryId,
    pub mode: QuizMode,
    pub mode_label: &'static str,
    pub difficulty: Difficulty,
    pub text: String,
    pub options: Vec<AnswerOption>,
    pub attempt: u32,
}

impl QuestionView {
    #[must_use]
    pub fn from_current(mode: QuizMode, current: &CurrentQuestion) -> Self {
        let question = current.question();
        Self {
            question_id: current.id(),
            category_id: current.category_id(),
            mode,
            mode_label: mode.label(),
            difficulty: question.question.difficulty,
            text: question.question.text.clone(),
            options: question
                .answers
                .iter()
                .map(|answer| AnswerOption {
                    answer_id: answer.id,
                    text: answer.text.clone(),
                    is_correct: answer.is_correct,
                })
                .collect(),
            attempt: current.attempts(),
        }
    }
}

/// Outcome of one graded answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerFeedback {
    pub question_id: QuestionId,
    pub category_id: CategoryId,
    pub mode: QuizMode,
    pub is_correct: bool,
    pub chosen_answer_id: AnswerId,
    pub correct_answer_text: String,
    pub explanation: Option<String>,
    pub statistics_applied: bool,
}

/// Nothing left to ask in the requested scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExhaustedView {
    pub mode: QuizMode,
    pub category_id: Option<CategoryId>,
    /// Review sessions offer a restart that clears the shown-question set.
    pub can_restart_review: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuizView {
    Question(QuestionView),
    Result(AnswerFeedback),
    /// Learning mode, wrong answer: same question again.
    Retry {
        feedback: AnswerFeedback,
        question: QuestionView,
    },
    Exhausted(ExhaustedView),
}

/// Category menu shown after entering a mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryChoice {
    pub mode: QuizMode,
    pub categories: Vec<Category>,
}
