use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::ids::{AnswerId, CategoryId, QuestionId, UserId};

/// Percentage of correct answers, rounded to one decimal place.
///
/// A zero total yields `0.0` instead of propagating a division by zero.
#[must_use]
pub fn accuracy(correct: u32, total: u32) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let ratio = f64::from(correct) / f64::from(total) * 100.0;
    (ratio * 10.0).round() / 10.0
}

/// One entry of the append-only answer log.
///
/// `counted` marks the single event per (user, question) that was applied to
/// the statistics; repeats and review answers are stored with `counted = false`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerEvent {
    pub id: i64,
    pub user_id: UserId,
    pub question_id: QuestionId,
    pub answer_id: AnswerId,
    pub is_correct: bool,
    pub counted: bool,
    pub answered_at: DateTime<Utc>,
}

/// Per-(user, category) running totals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressAggregate {
    pub user_id: UserId,
    pub category_id: CategoryId,
    pub questions_answered: u32,
    pub correct_answers: u32,
    pub last_activity: DateTime<Utc>,
}

impl ProgressAggregate {
    #[must_use]
    pub fn accuracy(&self) -> f64 {
        accuracy(self.correct_answers, self.questions_answered)
    }
}

/// Progress aggregate joined with its category name, for per-category stats.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryProgress {
    pub category_id: CategoryId,
    pub category_name: String,
    pub questions_answered: u32,
    pub correct_answers: u32,
    pub accuracy: f64,
    pub last_activity: DateTime<Utc>,
}

/// Sum of a user's progress aggregates across every category touched.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OverallProgress {
    pub questions_answered: u32,
    pub correct_answers: u32,
    pub accuracy: f64,
    pub categories_studied: u32,
}

impl OverallProgress {
    #[must_use]
    pub fn new(questions_answered: u32, correct_answers: u32, categories_studied: u32) -> Self {
        Self {
            questions_answered,
            correct_answers,
            accuracy: accuracy(correct_answers, questions_answered),
            categories_studied,
        }
    }
}

/// Catalog-wide numbers for one active category (admin view).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryCatalogStats {
    pub category_id: CategoryId,
    pub name: String,
    pub active_questions: u32,
    pub learners: u32,
}
