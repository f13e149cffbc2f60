use quiz_core::model::UserId;

use super::SqliteRepository;
use super::mapping::{db_err, id_i64, map_chat_row};
use crate::repository::{ChatHistoryRepository, ChatMessage, StorageError};

fn limit_i64(limit: usize) -> Result<i64, StorageError> {
    i64::try_from(limit).map_err(|_| StorageError::Serialization("limit overflow".into()))
}

#[async_trait::async_trait]
impl ChatHistoryRepository for SqliteRepository {
    async fn append_message(
        &self,
        user_id: UserId,
        message: &ChatMessage,
        keep: usize,
    ) -> Result<(), StorageError> {
        let user = id_i64("user_id", user_id.value())?;
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        sqlx::query(
            r"
                INSERT INTO chat_messages (user_id, role, content, created_at)
                VALUES (?1, ?2, ?3, ?4)
            ",
        )
        .bind(user)
        .bind(message.role.as_str())
        .bind(message.content.as_str())
        .bind(message.created_at)
        .execute(&mut *tx)
        .await
        .map_err(db_err)?;

        sqlx::query(
            r"
                DELETE FROM chat_messages
                WHERE user_id = ?1
                  AND id NOT IN (
                      SELECT id FROM chat_messages
                      WHERE user_id = ?1
                      ORDER BY id DESC
                      LIMIT ?2
                  )
            ",
        )
        .bind(user)
        .bind(limit_i64(keep)?)
        .execute(&mut *tx)
        .await
        .map_err(db_err)?;

        tx.commit().await.map_err(db_err)?;
        Ok(())
    }

    async fn recent_messages(
        &self,
        user_id: UserId,
        limit: usize,
    ) -> Result<Vec<ChatMessage>, StorageError> {
        let rows = sqlx::query(
            r"
                SELECT role, content, created_at FROM (
                    SELECT id, role, content, created_at
                    FROM chat_messages
                    WHERE user_id = ?1
                    ORDER BY id DESC
                    LIMIT ?2
                )
                ORDER BY id ASC
            ",
        )
        .bind(id_i64("user_id", user_id.value())?)
        .bind(limit_i64(limit)?)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        rows.iter().map(map_chat_row).collect()
    }
}
