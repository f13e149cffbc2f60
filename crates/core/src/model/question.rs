use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::{AnswerId, CategoryId, QuestionId};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuestionError {
    #[error("question text cannot be empty")]
    EmptyText,

    #[error("a question needs at least 2 answer options, got {0}")]
    TooFewAnswers(usize),

    #[error("answer option {index} is empty")]
    EmptyAnswer { index: usize },

    #[error("exactly one answer must be marked correct, got {0}")]
    CorrectAnswerCount(usize),

    #[error("unknown difficulty level: {0}")]
    UnknownDifficulty(String),
}

//
// ─── DIFFICULTY ────────────────────────────────────────────────────────────────
//

/// Difficulty badge shown next to a question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    #[default]
    Beginner,
    Intermediate,
    Advanced,
}

impl Difficulty {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Difficulty::Beginner => "beginner",
            Difficulty::Intermediate => "intermediate",
            Difficulty::Advanced => "advanced",
        }
    }

    /// Parse the storage representation.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError::UnknownDifficulty` for anything but the three levels.
    pub fn parse(raw: &str) -> Result<Self, QuestionError> {
        match raw.trim() {
            "beginner" => Ok(Difficulty::Beginner),
            "intermediate" => Ok(Difficulty::Intermediate),
            "advanced" => Ok(Difficulty::Advanced),
            other => Err(QuestionError::UnknownDifficulty(other.to_owned())),
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

//
// ─── RECORDS ───────────────────────────────────────────────────────────────────
//

/// A multiple-choice question owned by exactly one category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub id: QuestionId,
    pub category_id: CategoryId,
    pub text: String,
    pub difficulty: Difficulty,
    pub explanation: Option<String>,
    pub is_active: bool,
}

/// One answer option of a question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Answer {
    pub id: AnswerId,
    pub question_id: QuestionId,
    pub text: String,
    pub is_correct: bool,
}

/// A question bundled with its full answer set.
///
/// The order of `answers` is the display order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionWithAnswers {
    pub question: Question,
    pub answers: Vec<Answer>,
}

impl QuestionWithAnswers {
    #[must_use]
    pub fn id(&self) -> QuestionId {
        self.question.id
    }

    #[must_use]
    pub fn category_id(&self) -> CategoryId {
        self.question.category_id
    }

    /// First answer flagged correct, if the question is well-formed.
    #[must_use]
    pub fn correct_answer(&self) -> Option<&Answer> {
        self.answers.iter().find(|answer| answer.is_correct)
    }

    #[must_use]
    pub fn answer(&self, id: AnswerId) -> Option<&Answer> {
        self.answers.iter().find(|answer| answer.id == id)
    }
}

//
// ─── DRAFTS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerDraft {
    pub text: String,
    #[serde(default)]
    pub is_correct: bool,
}

impl AnswerDraft {
    #[must_use]
    pub fn new(text: impl Into<String>, is_correct: bool) -> Self {
        Self {
            text: text.into(),
            is_correct,
        }
    }
}

/// Question content as authored in the admin wizard, before persistence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionDraft {
    pub category_id: CategoryId,
    pub text: String,
    #[serde(default)]
    pub difficulty: Difficulty,
    #[serde(default)]
    pub explanation: Option<String>,
    pub answers: Vec<AnswerDraft>,
}

/// A draft that passed authoring validation: trimmed texts, at least two
/// options and exactly one correct answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedQuestion {
    pub category_id: CategoryId,
    pub text: String,
    pub difficulty: Difficulty,
    pub explanation: Option<String>,
    pub answers: Vec<AnswerDraft>,
}

impl QuestionDraft {
    /// Validate authoring invariants.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError` when text is blank, fewer than two options are
    /// given, an option is blank, or the number of correct options is not one.
    pub fn validate(self) -> Result<ValidatedQuestion, QuestionError> {
        let text = self.text.trim();
        if text.is_empty() {
            return Err(QuestionError::EmptyText);
        }
        if self.answers.len() < 2 {
            return Err(QuestionError::TooFewAnswers(self.answers.len()));
        }

        let mut answers = Vec::with_capacity(self.answers.len());
        for (index, answer) in self.answers.into_iter().enumerate() {
            let answer_text = answer.text.trim();
            if answer_text.is_empty() {
                return Err(QuestionError::EmptyAnswer { index });
            }
            answers.push(AnswerDraft::new(answer_text, answer.is_correct));
        }

        let correct = answers.iter().filter(|a| a.is_correct).count();
        if correct != 1 {
            return Err(QuestionError::CorrectAnswerCount(correct));
        }

        let explanation = self
            .explanation
            .map(|e| e.trim().to_owned())
            .filter(|e| !e.is_empty());

        Ok(ValidatedQuestion {
            category_id: self.category_id,
            text: text.to_owned(),
            difficulty: self.difficulty,
            explanation,
            answers,
        })
    }
}
