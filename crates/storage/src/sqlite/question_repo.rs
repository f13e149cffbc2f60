use chrono::{DateTime, Utc};
use quiz_core::model::{
    Answer, CategoryId, Question, QuestionId, QuestionWithAnswers, QuizMode, SelectionScope,
    UserId, ValidatedQuestion,
};
use sqlx::{Sqlite, SqlitePool, Transaction};

use super::SqliteRepository;
use super::mapping::{db_err, id_i64, map_answer_row, map_question_row, question_id_from_i64};
use crate::repository::{QuestionRepository, StorageError};

const QUESTION_COLUMNS: &str =
    "q.id, q.category_id, q.text, q.difficulty, q.explanation, q.is_active";

async fn load_answers(
    pool: &SqlitePool,
    question_id: QuestionId,
) -> Result<Vec<Answer>, StorageError> {
    let rows = sqlx::query(
        r"
            SELECT id, question_id, text, is_correct
            FROM answers
            WHERE question_id = ?1
            ORDER BY id ASC
        ",
    )
    .bind(id_i64("question_id", question_id.value())?)
    .fetch_all(pool)
    .await
    .map_err(db_err)?;

    rows.iter().map(map_answer_row).collect()
}

async fn insert_answers(
    tx: &mut Transaction<'_, Sqlite>,
    question_id: i64,
    question: &ValidatedQuestion,
) -> Result<(), StorageError> {
    for answer in &question.answers {
        sqlx::query(
            r"
                INSERT INTO answers (question_id, text, is_correct)
                VALUES (?1, ?2, ?3)
            ",
        )
        .bind(question_id)
        .bind(answer.text.as_str())
        .bind(answer.is_correct)
        .execute(&mut **tx)
        .await
        .map_err(db_err)?;
    }
    Ok(())
}

/// Builds the eligibility query for `scope`; `?1` is always the user id.
fn selection_sql(scope: &SelectionScope) -> String {
    let mut sql = format!(
        r"
            SELECT {QUESTION_COLUMNS}
            FROM questions q
            JOIN categories c ON c.id = q.category_id
            WHERE q.is_active = 1
              AND c.is_active = 1
        "
    );

    let mut bind_index = 2;
    if scope.category_id().is_some() {
        sql.push_str(" AND q.category_id = ?2");
        bind_index += 1;
    }

    match scope.mode() {
        QuizMode::Learning => sql.push_str(
            r"
              AND NOT EXISTS (
                  SELECT 1 FROM user_answers ua
                  WHERE ua.user_id = ?1 AND ua.question_id = q.id AND ua.is_correct = 1
              )
            ",
        ),
        QuizMode::Review => {
            sql.push_str(
                r"
              AND EXISTS (
                  SELECT 1 FROM user_answers ua
                  WHERE ua.user_id = ?1 AND ua.question_id = q.id
              )
                ",
            );
            let excluded = scope.excluded();
            if !excluded.is_empty() {
                sql.push_str(" AND q.id NOT IN (");
                for i in 0..excluded.len() {
                    if i > 0 {
                        sql.push_str(", ");
                    }
                    sql.push('?');
                    sql.push_str(&(bind_index + i).to_string());
                }
                sql.push(')');
            }
        }
    }

    sql.push_str(" ORDER BY RANDOM() LIMIT 1");
    sql
}

#[async_trait::async_trait]
impl QuestionRepository for SqliteRepository {
    async fn insert_question(
        &self,
        question: &ValidatedQuestion,
        now: DateTime<Utc>,
    ) -> Result<QuestionId, StorageError> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        let res = sqlx::query(
            r"
                INSERT INTO questions (
                    category_id, text, difficulty, explanation, is_active, created_at
                )
                VALUES (?1, ?2, ?3, ?4, 1, ?5)
            ",
        )
        .bind(id_i64("category_id", question.category_id.value())?)
        .bind(question.text.as_str())
        .bind(question.difficulty.as_str())
        .bind(question.explanation.as_deref())
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(db_err)?;

        let id = res.last_insert_rowid();
        insert_answers(&mut tx, id, question).await?;
        tx.commit().await.map_err(db_err)?;

        question_id_from_i64(id)
    }

    async fn replace_question(
        &self,
        id: QuestionId,
        question: &ValidatedQuestion,
    ) -> Result<(), StorageError> {
        let question_id = id_i64("question_id", id.value())?;
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        let res = sqlx::query(
            r"
                UPDATE questions
                SET category_id = ?2, text = ?3, difficulty = ?4, explanation = ?5
                WHERE id = ?1
            ",
        )
        .bind(question_id)
        .bind(id_i64("category_id", question.category_id.value())?)
        .bind(question.text.as_str())
        .bind(question.difficulty.as_str())
        .bind(question.explanation.as_deref())
        .execute(&mut *tx)
        .await
        .map_err(db_err)?;

        if res.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }

        sqlx::query("DELETE FROM answers WHERE question_id = ?1")
            .bind(question_id)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;

        insert_answers(&mut tx, question_id, question).await?;
        tx.commit().await.map_err(db_err)?;
        Ok(())
    }

    async fn get_question(&self, id: QuestionId) -> Result<QuestionWithAnswers, StorageError> {
        let row = sqlx::query(&format!(
            "SELECT {QUESTION_COLUMNS} FROM questions q WHERE q.id = ?1"
        ))
        .bind(id_i64("question_id", id.value())?)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?
        .ok_or(StorageError::NotFound)?;

        let question = map_question_row(&row)?;
        let answers = load_answers(&self.pool, question.id).await?;
        Ok(QuestionWithAnswers { question, answers })
    }

    async fn list_questions(
        &self,
        category_id: CategoryId,
    ) -> Result<Vec<Question>, StorageError> {
        let rows = sqlx::query(&format!(
            "SELECT {QUESTION_COLUMNS} FROM questions q WHERE q.category_id = ?1 ORDER BY q.id ASC"
        ))
        .bind(id_i64("category_id", category_id.value())?)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        rows.iter().map(map_question_row).collect()
    }

    async fn set_question_active(
        &self,
        id: QuestionId,
        active: bool,
    ) -> Result<(), StorageError> {
        let res = sqlx::query("UPDATE questions SET is_active = ?2 WHERE id = ?1")
            .bind(id_i64("question_id", id.value())?)
            .bind(active)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;

        if res.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }

    async fn delete_question(&self, id: QuestionId) -> Result<(), StorageError> {
        let res = sqlx::query("DELETE FROM questions WHERE id = ?1")
            .bind(id_i64("question_id", id.value())?)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;

        if res.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }

    async fn random_question(
        &self,
        user_id: UserId,
        scope: &SelectionScope,
    ) -> Result<Option<QuestionWithAnswers>, StorageError> {
        let sql = selection_sql(scope);

        let mut query = sqlx::query(&sql).bind(id_i64("user_id", user_id.value())?);
        if let Some(category_id) = scope.category_id() {
            query = query.bind(id_i64("category_id", category_id.value())?);
        }
        for excluded in scope.excluded() {
            query = query.bind(id_i64("question_id", excluded.value())?);
        }

        let Some(row) = query.fetch_optional(&self.pool).await.map_err(db_err)? else {
            return Ok(None);
        };

        let question = map_question_row(&row)?;
        let answers = load_answers(&self.pool, question.id).await?;
        Ok(Some(QuestionWithAnswers { question, answers }))
    }
}
