use quiz_core::model::{
    AnswerEvent, CategoryCatalogStats, CategoryId, CategoryProgress, OverallProgress,
    ProgressAggregate, QuestionId, UserId, accuracy,
};
use sqlx::Row;
use sqlx::sqlite::SqliteRow;

use super::SqliteRepository;
use super::mapping::{
    category_id_from_i64, db_err, id_i64, map_event_row, ser, u32_from_i64, user_id_from_i64,
};
use crate::repository::{AnswerSubmission, LearningRecord, ProgressRepository, StorageError};

struct SubmissionBinds {
    user_id: i64,
    question_id: i64,
    answer_id: i64,
}

impl SubmissionBinds {
    fn new(submission: &AnswerSubmission) -> Result<Self, StorageError> {
        Ok(Self {
            user_id: id_i64("user_id", submission.user_id.value())?,
            question_id: id_i64("question_id", submission.question_id.value())?,
            answer_id: id_i64("answer_id", submission.answer_id.value())?,
        })
    }
}

fn map_aggregate_row(row: &SqliteRow) -> Result<ProgressAggregate, StorageError> {
    Ok(ProgressAggregate {
        user_id: user_id_from_i64(row.try_get("user_id").map_err(ser)?)?,
        category_id: category_id_from_i64(row.try_get("category_id").map_err(ser)?)?,
        questions_answered: u32_from_i64(
            "questions_answered",
            row.try_get("questions_answered").map_err(ser)?,
        )?,
        correct_answers: u32_from_i64(
            "correct_answers",
            row.try_get("correct_answers").map_err(ser)?,
        )?,
        last_activity: row.try_get("last_activity").map_err(ser)?,
    })
}

#[async_trait::async_trait]
impl ProgressRepository for SqliteRepository {
    async fn record_learning_answer(
        &self,
        submission: &AnswerSubmission,
    ) -> Result<LearningRecord, StorageError> {
        let binds = SubmissionBinds::new(submission)?;
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        // Write first: the partial unique index decides which event is the counted one.
        let counted = sqlx::query(
            r"
                INSERT INTO user_answers (
                    user_id, question_id, answer_id, is_correct, counted, answered_at
                )
                VALUES (?1, ?2, ?3, ?4, 1, ?5)
                ON CONFLICT(user_id, question_id) WHERE counted = 1 DO NOTHING
            ",
        )
        .bind(binds.user_id)
        .bind(binds.question_id)
        .bind(binds.answer_id)
        .bind(submission.is_correct)
        .bind(submission.answered_at)
        .execute(&mut *tx)
        .await
        .map_err(db_err)?
        .rows_affected()
            > 0;

        if !counted {
            if !submission.is_correct {
                tx.rollback().await.map_err(db_err)?;
                tracing::debug!(
                    user_id = %submission.user_id,
                    question_id = %submission.question_id,
                    "repeat incorrect answer ignored"
                );
                return Ok(LearningRecord::RepeatIgnored);
            }

            sqlx::query(
                r"
                    INSERT INTO user_answers (
                        user_id, question_id, answer_id, is_correct, counted, answered_at
                    )
                    VALUES (?1, ?2, ?3, 1, 0, ?4)
                ",
            )
            .bind(binds.user_id)
            .bind(binds.question_id)
            .bind(binds.answer_id)
            .bind(submission.answered_at)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;

            tx.commit().await.map_err(db_err)?;
            return Ok(LearningRecord::RepeatRecorded);
        }

        let correct = i64::from(submission.is_correct);

        let res = sqlx::query(
            r"
                UPDATE users
                SET total_questions = total_questions + 1,
                    correct_answers = correct_answers + ?2
                WHERE id = ?1
            ",
        )
        .bind(binds.user_id)
        .bind(correct)
        .execute(&mut *tx)
        .await
        .map_err(db_err)?;
        if res.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }

        let category_id: i64 = sqlx::query("SELECT category_id FROM questions WHERE id = ?1")
            .bind(binds.question_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(db_err)?
            .ok_or(StorageError::NotFound)?
            .try_get("category_id")
            .map_err(ser)?;

        sqlx::query(
            r"
                INSERT INTO user_progress (
                    user_id, category_id, questions_answered, correct_answers, last_activity
                )
                VALUES (?1, ?2, 1, ?3, ?4)
                ON CONFLICT(user_id, category_id) DO UPDATE SET
                    questions_answered = questions_answered + 1,
                    correct_answers = correct_answers + excluded.correct_answers,
                    last_activity = excluded.last_activity
            ",
        )
        .bind(binds.user_id)
        .bind(category_id)
        .bind(correct)
        .bind(submission.answered_at)
        .execute(&mut *tx)
        .await
        .map_err(db_err)?;

        tx.commit().await.map_err(db_err)?;
        tracing::debug!(
            user_id = %submission.user_id,
            question_id = %submission.question_id,
            is_correct = submission.is_correct,
            "first answer counted"
        );
        Ok(LearningRecord::Counted)
    }

    async fn record_review_answer(
        &self,
        submission: &AnswerSubmission,
    ) -> Result<(), StorageError> {
        let binds = SubmissionBinds::new(submission)?;
        sqlx::query(
            r"
                INSERT INTO user_answers (
                    user_id, question_id, answer_id, is_correct, counted, answered_at
                )
                VALUES (?1, ?2, ?3, ?4, 0, ?5)
            ",
        )
        .bind(binds.user_id)
        .bind(binds.question_id)
        .bind(binds.answer_id)
        .bind(submission.is_correct)
        .bind(submission.answered_at)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    async fn has_answered(
        &self,
        user_id: UserId,
        question_id: QuestionId,
    ) -> Result<bool, StorageError> {
        let row = sqlx::query(
            r"
                SELECT EXISTS (
                    SELECT 1 FROM user_answers WHERE user_id = ?1 AND question_id = ?2
                ) AS answered
            ",
        )
        .bind(id_i64("user_id", user_id.value())?)
        .bind(id_i64("question_id", question_id.value())?)
        .fetch_one(&self.pool)
        .await
        .map_err(db_err)?;
        row.try_get("answered").map_err(ser)
    }

    async fn has_answered_correctly(
        &self,
        user_id: UserId,
        question_id: QuestionId,
    ) -> Result<bool, StorageError> {
        let row = sqlx::query(
            r"
                SELECT EXISTS (
                    SELECT 1 FROM user_answers
                    WHERE user_id = ?1 AND question_id = ?2 AND is_correct = 1
                ) AS answered
            ",
        )
        .bind(id_i64("user_id", user_id.value())?)
        .bind(id_i64("question_id", question_id.value())?)
        .fetch_one(&self.pool)
        .await
        .map_err(db_err)?;
        row.try_get("answered").map_err(ser)
    }

    async fn answer_events(&self, user_id: UserId) -> Result<Vec<AnswerEvent>, StorageError> {
        let rows = sqlx::query(
            r"
                SELECT id, user_id, question_id, answer_id, is_correct, counted, answered_at
                FROM user_answers
                WHERE user_id = ?1
                ORDER BY id ASC
            ",
        )
        .bind(id_i64("user_id", user_id.value())?)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        rows.iter().map(map_event_row).collect()
    }

    async fn progress_for_category(
        &self,
        user_id: UserId,
        category_id: CategoryId,
    ) -> Result<Option<ProgressAggregate>, StorageError> {
        let row = sqlx::query(
            r"
                SELECT user_id, category_id, questions_answered, correct_answers, last_activity
                FROM user_progress
                WHERE user_id = ?1 AND category_id = ?2
            ",
        )
        .bind(id_i64("user_id", user_id.value())?)
        .bind(id_i64("category_id", category_id.value())?)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        row.as_ref().map(map_aggregate_row).transpose()
    }

    async fn progress_by_category(
        &self,
        user_id: UserId,
    ) -> Result<Vec<CategoryProgress>, StorageError> {
        let rows = sqlx::query(
            r"
                SELECT p.category_id, c.name AS category_name,
                       p.questions_answered, p.correct_answers, p.last_activity
                FROM user_progress p
                JOIN categories c ON c.id = p.category_id
                WHERE p.user_id = ?1
                ORDER BY c.name ASC
            ",
        )
        .bind(id_i64("user_id", user_id.value())?)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            let questions_answered = u32_from_i64(
                "questions_answered",
                row.try_get("questions_answered").map_err(ser)?,
            )?;
            let correct_answers = u32_from_i64(
                "correct_answers",
                row.try_get("correct_answers").map_err(ser)?,
            )?;
            out.push(CategoryProgress {
                category_id: category_id_from_i64(row.try_get("category_id").map_err(ser)?)?,
                category_name: row.try_get("category_name").map_err(ser)?,
                questions_answered,
                correct_answers,
                accuracy: accuracy(correct_answers, questions_answered),
                last_activity: row.try_get("last_activity").map_err(ser)?,
            });
        }
        Ok(out)
    }

    async fn overall_progress(
        &self,
        user_id: UserId,
    ) -> Result<Option<OverallProgress>, StorageError> {
        let row = sqlx::query(
            r"
                SELECT COUNT(*) AS categories_studied,
                       COALESCE(SUM(questions_answered), 0) AS questions_answered,
                       COALESCE(SUM(correct_answers), 0) AS correct_answers
                FROM user_progress
                WHERE user_id = ?1
            ",
        )
        .bind(id_i64("user_id", user_id.value())?)
        .fetch_one(&self.pool)
        .await
        .map_err(db_err)?;

        let categories_studied = u32_from_i64(
            "categories_studied",
            row.try_get("categories_studied").map_err(ser)?,
        )?;
        if categories_studied == 0 {
            return Ok(None);
        }
        Ok(Some(OverallProgress::new(
            u32_from_i64(
                "questions_answered",
                row.try_get("questions_answered").map_err(ser)?,
            )?,
            u32_from_i64("correct_answers", row.try_get("correct_answers").map_err(ser)?)?,
            categories_studied,
        )))
    }

    async fn category_catalog_stats(&self) -> Result<Vec<CategoryCatalogStats>, StorageError> {
        let rows = sqlx::query(
            r"
                SELECT c.id, c.name,
                       (SELECT COUNT(*) FROM questions q
                        WHERE q.category_id = c.id AND q.is_active = 1) AS active_questions,
                       (SELECT COUNT(DISTINCT p.user_id) FROM user_progress p
                        WHERE p.category_id = c.id) AS learners
                FROM categories c
                WHERE c.is_active = 1
                ORDER BY c.name ASC
            ",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(CategoryCatalogStats {
                category_id: category_id_from_i64(row.try_get("id").map_err(ser)?)?,
                name: row.try_get("name").map_err(ser)?,
                active_questions: u32_from_i64(
                    "active_questions",
                    row.try_get("active_questions").map_err(ser)?,
                )?,
                learners: u32_from_i64("learners", row.try_get("learners").map_err(ser)?)?,
            });
        }
        Ok(out)
    }
}
