use chrono::{DateTime, Utc};
use quiz_core::model::{
    Answer, AnswerEvent, AnswerId, Category, CategoryId, Difficulty, Question, QuestionId, User,
    UserId, UserProfile,
};
use sqlx::Row;
use sqlx::sqlite::SqliteRow;

use crate::repository::{ChatMessage, ChatRole, StorageError};

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

/// Classify driver errors: broken references become `NotFound`, duplicate
/// keys `Conflict`, everything else a connection failure.
pub(crate) fn db_err(e: sqlx::Error) -> StorageError {
    if let Some(db) = e.as_database_error() {
        if db.is_foreign_key_violation() {
            return StorageError::NotFound;
        }
        if db.is_unique_violation() {
            return StorageError::Conflict;
        }
    }
    StorageError::Connection(e.to_string())
}

pub(crate) fn id_i64(field: &'static str, v: u64) -> Result<i64, StorageError> {
    i64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} overflow")))
}

fn i64_to_u64(field: &'static str, v: i64) -> Result<u64, StorageError> {
    u64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} sign overflow")))
}

pub(crate) fn u32_from_i64(field: &'static str, v: i64) -> Result<u32, StorageError> {
    u32::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}

pub(crate) fn user_id_from_i64(v: i64) -> Result<UserId, StorageError> {
    Ok(UserId::new(i64_to_u64("user_id", v)?))
}

pub(crate) fn category_id_from_i64(v: i64) -> Result<CategoryId, StorageError> {
    Ok(CategoryId::new(i64_to_u64("category_id", v)?))
}

pub(crate) fn question_id_from_i64(v: i64) -> Result<QuestionId, StorageError> {
    Ok(QuestionId::new(i64_to_u64("question_id", v)?))
}

pub(crate) fn answer_id_from_i64(v: i64) -> Result<AnswerId, StorageError> {
    Ok(AnswerId::new(i64_to_u64("answer_id", v)?))
}

pub(crate) fn map_user_row(row: &SqliteRow) -> Result<User, StorageError> {
    Ok(User {
        profile: UserProfile {
            id: user_id_from_i64(row.try_get("id").map_err(ser)?)?,
            username: row.try_get("username").map_err(ser)?,
            first_name: row.try_get("first_name").map_err(ser)?,
            last_name: row.try_get("last_name").map_err(ser)?,
        },
        total_questions: u32_from_i64(
            "total_questions",
            row.try_get("total_questions").map_err(ser)?,
        )?,
        correct_answers: u32_from_i64(
            "correct_answers",
            row.try_get("correct_answers").map_err(ser)?,
        )?,
        created_at: row.try_get("created_at").map_err(ser)?,
    })
}

pub(crate) fn map_category_row(row: &SqliteRow) -> Result<Category, StorageError> {
    Ok(Category {
        id: category_id_from_i64(row.try_get("id").map_err(ser)?)?,
        name: row.try_get("name").map_err(ser)?,
        is_active: row.try_get("is_active").map_err(ser)?,
        created_at: row.try_get("created_at").map_err(ser)?,
    })
}

pub(crate) fn map_question_row(row: &SqliteRow) -> Result<Question, StorageError> {
    let difficulty: String = row.try_get("difficulty").map_err(ser)?;
    Ok(Question {
        id: question_id_from_i64(row.try_get("id").map_err(ser)?)?,
        category_id: category_id_from_i64(row.try_get("category_id").map_err(ser)?)?,
        text: row.try_get("text").map_err(ser)?,
        difficulty: Difficulty::parse(&difficulty).map_err(ser)?,
        explanation: row.try_get("explanation").map_err(ser)?,
        is_active: row.try_get("is_active").map_err(ser)?,
    })
}

pub(crate) fn map_answer_row(row: &SqliteRow) -> Result<Answer, StorageError> {
    Ok(Answer {
        id: answer_id_from_i64(row.try_get("id").map_err(ser)?)?,
        question_id: question_id_from_i64(row.try_get("question_id").map_err(ser)?)?,
        text: row.try_get("text").map_err(ser)?,
        is_correct: row.try_get("is_correct").map_err(ser)?,
    })
}

pub(crate) fn map_event_row(row: &SqliteRow) -> Result<AnswerEvent, StorageError> {
    Ok(AnswerEvent {
        id: row.try_get("id").map_err(ser)?,
        user_id: user_id_from_i64(row.try_get("user_id").map_err(ser)?)?,
        question_id: question_id_from_i64(row.try_get("question_id").map_err(ser)?)?,
        answer_id: answer_id_from_i64(row.try_get("answer_id").map_err(ser)?)?,
        is_correct: row.try_get("is_correct").map_err(ser)?,
        counted: row.try_get("counted").map_err(ser)?,
        answered_at: row.try_get("answered_at").map_err(ser)?,
    })
}

pub(crate) fn map_chat_row(row: &SqliteRow) -> Result<ChatMessage, StorageError> {
    let role: String = row.try_get("role").map_err(ser)?;
    let created_at: DateTime<Utc> = row.try_get("created_at").map_err(ser)?;
    Ok(ChatMessage {
        role: ChatRole::parse(&role)?,
        content: row.try_get("content").map_err(ser)?,
        created_at,
    })
}
