use std::sync::Arc;

use quiz_core::model::{
    CategoryCatalogStats, CategoryProgress, OverallProgress, User, UserId,
};
use serde::Serialize;
use storage::repository::{ProgressRepository, StorageError, UserRepository};

use crate::config::AdminPolicy;
use crate::error::StatsError;

/// Everything the "my statistics" screen shows for one user.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserStats {
    pub user_id: UserId,
    pub display_name: String,
    pub total_questions: u32,
    pub correct_answers: u32,
    pub accuracy: f64,
    pub overall: OverallProgress,
    pub categories: Vec<CategoryProgress>,
}

impl UserStats {
    fn new(user: &User, overall: OverallProgress, categories: Vec<CategoryProgress>) -> Self {
        Self {
            user_id: user.id(),
            display_name: user.profile.display_name(),
            total_questions: user.total_questions,
            correct_answers: user.correct_answers,
            accuracy: user.accuracy(),
            overall,
            categories,
        }
    }
}

/// Read-only statistics over users, progress aggregates and the catalog.
#[derive(Clone)]
pub struct StatsService {
    admins: AdminPolicy,
    users: Arc<dyn UserRepository>,
    progress: Arc<dyn ProgressRepository>,
}

impl StatsService {
    #[must_use]
    pub fn new(
        admins: AdminPolicy,
        users: Arc<dyn UserRepository>,
        progress: Arc<dyn ProgressRepository>,
    ) -> Self {
        Self {
            admins,
            users,
            progress,
        }
    }

    /// User counters with accuracy, overall progress and the per-category breakdown.
    ///
    /// # Errors
    ///
    /// Returns `StatsError::UnknownUser` for unregistered users.
    /// Returns `StatsError::Storage` if repository access fails.
    pub async fn user_stats(&self, user_id: UserId) -> Result<UserStats, StatsError> {
        let user = match self.users.get_user(user_id).await {
            Ok(user) => user,
            Err(StorageError::NotFound) => return Err(StatsError::UnknownUser(user_id)),
            Err(err) => return Err(err.into()),
        };
        let overall = self.overall_progress(user_id).await?;
        let categories = self.category_breakdown(user_id).await?;
        Ok(UserStats::new(&user, overall, categories))
    }

    /// Sum over every category the user touched; all zeros before the first answer.
    ///
    /// # Errors
    ///
    /// Returns `StatsError::Storage` if repository access fails.
    pub async fn overall_progress(&self, user_id: UserId) -> Result<OverallProgress, StatsError> {
        let overall = self
            .progress
            .overall_progress(user_id)
            .await?
            .unwrap_or_else(|| OverallProgress::new(0, 0, 0));
        Ok(overall)
    }

    /// Per-category progress ordered by category name.
    ///
    /// # Errors
    ///
    /// Returns `StatsError::Storage` if repository access fails.
    pub async fn category_breakdown(
        &self,
        user_id: UserId,
    ) -> Result<Vec<CategoryProgress>, StatsError> {
        Ok(self.progress.progress_by_category(user_id).await?)
    }

    /// Active questions and distinct learners per active category.
    ///
    /// # Errors
    ///
    /// Returns `StatsError::Forbidden` unless `actor` is an administrator.
    /// Returns `StatsError::Storage` if repository access fails.
    pub async fn catalog_stats(
        &self,
        actor: UserId,
    ) -> Result<Vec<CategoryCatalogStats>, StatsError> {
        if !self.admins.is_admin(actor) {
            return Err(StatsError::Forbidden(actor));
        }
        Ok(self.progress.category_catalog_stats().await?)
    }
}
