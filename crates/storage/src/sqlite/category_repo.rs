use chrono::{DateTime, Utc};
use quiz_core::model::{Category, CategoryId};
use sqlx::Row;

use super::SqliteRepository;
use super::mapping::{category_id_from_i64, db_err, id_i64, map_category_row, ser};
use crate::repository::{CategoryRepository, StorageError};

fn map_categories(rows: &[sqlx::sqlite::SqliteRow]) -> Result<Vec<Category>, StorageError> {
    rows.iter().map(map_category_row).collect()
}

#[async_trait::async_trait]
impl CategoryRepository for SqliteRepository {
    async fn upsert_category_by_name(
        &self,
        name: &str,
        now: DateTime<Utc>,
    ) -> Result<CategoryId, StorageError> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        sqlx::query(
            r"
                INSERT INTO categories (name, is_active, created_at)
                VALUES (?1, 1, ?2)
                ON CONFLICT(name) DO NOTHING
            ",
        )
        .bind(name)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(db_err)?;

        let row = sqlx::query("SELECT id FROM categories WHERE name = ?1")
            .bind(name)
            .fetch_one(&mut *tx)
            .await
            .map_err(db_err)?;

        tx.commit().await.map_err(db_err)?;
        category_id_from_i64(row.try_get("id").map_err(ser)?)
    }

    async fn get_category(&self, id: CategoryId) -> Result<Category, StorageError> {
        let row = sqlx::query(
            r"
                SELECT id, name, is_active, created_at
                FROM categories
                WHERE id = ?1
            ",
        )
        .bind(id_i64("category_id", id.value())?)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?
        .ok_or(StorageError::NotFound)?;

        map_category_row(&row)
    }

    async fn list_categories(&self) -> Result<Vec<Category>, StorageError> {
        let rows = sqlx::query(
            r"
                SELECT id, name, is_active, created_at
                FROM categories
                ORDER BY name ASC, id ASC
            ",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        map_categories(&rows)
    }

    async fn list_active_categories(&self) -> Result<Vec<Category>, StorageError> {
        let rows = sqlx::query(
            r"
                SELECT id, name, is_active, created_at
                FROM categories
                WHERE is_active = 1
                ORDER BY name ASC, id ASC
            ",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        map_categories(&rows)
    }

    async fn set_category_active(
        &self,
        id: CategoryId,
        active: bool,
    ) -> Result<(), StorageError> {
        let res = sqlx::query("UPDATE categories SET is_active = ?2 WHERE id = ?1")
            .bind(id_i64("category_id", id.value())?)
            .bind(active)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;

        if res.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }

    async fn delete_category(&self, id: CategoryId) -> Result<(), StorageError> {
        // Foreign keys cascade to questions, answers, user_answers and user_progress.
        let res = sqlx::query("DELETE FROM categories WHERE id = ?1")
            .bind(id_i64("category_id", id.value())?)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;

        if res.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        tracing::info!(category_id = %id, "deleted category");
        Ok(())
    }
}
