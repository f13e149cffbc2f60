use chrono::{DateTime, Utc};
use quiz_core::model::{User, UserId, UserProfile};

use super::SqliteRepository;
use super::mapping::{db_err, id_i64, map_user_row};
use crate::repository::{StorageError, UserRepository};

#[async_trait::async_trait]
impl UserRepository for SqliteRepository {
    async fn register_user(
        &self,
        profile: &UserProfile,
        now: DateTime<Utc>,
    ) -> Result<bool, StorageError> {
        let res = sqlx::query(
            r"
                INSERT INTO users (id, username, first_name, last_name, created_at)
                VALUES (?1, ?2, ?3, ?4, ?5)
                ON CONFLICT(id) DO NOTHING
            ",
        )
        .bind(id_i64("user_id", profile.id.value())?)
        .bind(profile.username.as_deref())
        .bind(profile.first_name.as_deref())
        .bind(profile.last_name.as_deref())
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(res.rows_affected() > 0)
    }

    async fn get_user(&self, id: UserId) -> Result<User, StorageError> {
        let row = sqlx::query(
            r"
                SELECT id, username, first_name, last_name,
                       total_questions, correct_answers, created_at
                FROM users
                WHERE id = ?1
            ",
        )
        .bind(id_i64("user_id", id.value())?)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?
        .ok_or(StorageError::NotFound)?;

        map_user_row(&row)
    }
}
