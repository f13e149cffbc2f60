use std::sync::Arc;

use quiz_core::model::{
    Category, CategoryDraft, CategoryId, Question, QuestionDraft, QuestionId,
    QuestionWithAnswers, UserId,
};
use storage::repository::{CategoryRepository, QuestionRepository};

use crate::Clock;
use crate::config::AdminPolicy;
use crate::error::ContentError;

/// Backend of the admin content wizard.
///
/// Every call names the acting user and is rejected unless that user is in
/// the configured admin set.
#[derive(Clone)]
pub struct ContentService {
    clock: Clock,
    admins: AdminPolicy,
    categories: Arc<dyn CategoryRepository>,
    questions: Arc<dyn QuestionRepository>,
}

impl ContentService {
    #[must_use]
    pub fn new(
        clock: Clock,
        admins: AdminPolicy,
        categories: Arc<dyn CategoryRepository>,
        questions: Arc<dyn QuestionRepository>,
    ) -> Self {
        Self {
            clock,
            admins,
            categories,
            questions,
        }
    }

    #[must_use]
    pub fn is_admin(&self, user_id: UserId) -> bool {
        self.admins.is_admin(user_id)
    }

    fn authorize(&self, actor: UserId) -> Result<(), ContentError> {
        if self.admins.is_admin(actor) {
            Ok(())
        } else {
            tracing::warn!(%actor, "content access denied");
            Err(ContentError::Forbidden(actor))
        }
    }

    // ─── CATEGORIES ────────────────────────────────────────────────────────────

    /// Create a category, or return the existing id for a known name.
    ///
    /// # Errors
    ///
    /// Returns `ContentError::Forbidden` for non-admins and
    /// `ContentError::Invalid` for a blank name.
    pub async fn add_category(
        &self,
        actor: UserId,
        draft: CategoryDraft,
    ) -> Result<CategoryId, ContentError> {
        self.authorize(actor)?;
        let name = draft.validate().map_err(quiz_core::Error::from)?;
        let id = self
            .categories
            .upsert_category_by_name(&name, self.clock.now())
            .await?;
        tracing::info!(%actor, category_id = %id, name, "category saved");
        Ok(id)
    }

    /// # Errors
    ///
    /// Returns `ContentError::Forbidden` for non-admins and
    /// `ContentError::NotFound` for unknown categories.
    pub async fn set_category_active(
        &self,
        actor: UserId,
        id: CategoryId,
        active: bool,
    ) -> Result<(), ContentError> {
        self.authorize(actor)?;
        self.categories.set_category_active(id, active).await?;
        tracing::info!(%actor, category_id = %id, active, "category visibility changed");
        Ok(())
    }

    /// Flip the category's active flag and return the new value.
    ///
    /// # Errors
    ///
    /// Returns `ContentError::Forbidden` for non-admins and
    /// `ContentError::NotFound` for unknown categories.
    pub async fn toggle_category(
        &self,
        actor: UserId,
        id: CategoryId,
    ) -> Result<bool, ContentError> {
        self.authorize(actor)?;
        let category = self.categories.get_category(id).await?;
        let active = !category.is_active;
        self.set_category_active(actor, id, active).await?;
        Ok(active)
    }

    /// Hard delete; questions, answers and progress of the category go with it.
    ///
    /// # Errors
    ///
    /// Returns `ContentError::Forbidden` for non-admins and
    /// `ContentError::NotFound` for unknown categories.
    pub async fn delete_category(&self, actor: UserId, id: CategoryId) -> Result<(), ContentError> {
        self.authorize(actor)?;
        self.categories.delete_category(id).await?;
        tracing::info!(%actor, category_id = %id, "category deleted");
        Ok(())
    }

    /// All categories including inactive ones.
    ///
    /// # Errors
    ///
    /// Returns `ContentError::Forbidden` for non-admins.
    pub async fn list_categories(&self, actor: UserId) -> Result<Vec<Category>, ContentError> {
        self.authorize(actor)?;
        Ok(self.categories.list_categories().await?)
    }

    // ─── QUESTIONS ─────────────────────────────────────────────────────────────

    /// Validate and store a question with its answers.
    ///
    /// # Errors
    ///
    /// Returns `ContentError::Forbidden` for non-admins,
    /// `ContentError::Invalid` when the draft fails validation and
    /// `ContentError::NotFound` when the category does not exist.
    pub async fn add_question(
        &self,
        actor: UserId,
        draft: QuestionDraft,
    ) -> Result<QuestionId, ContentError> {
        self.authorize(actor)?;
        let question = draft.validate().map_err(quiz_core::Error::from)?;
        let id = self
            .questions
            .insert_question(&question, self.clock.now())
            .await?;
        tracing::info!(
            %actor,
            question_id = %id,
            category_id = %question.category_id,
            answers = question.answers.len(),
            "question added"
        );
        Ok(id)
    }

    /// Replace text, difficulty, explanation and the whole answer set.
    ///
    /// # Errors
    ///
    /// Returns `ContentError::Forbidden` for non-admins,
    /// `ContentError::Invalid` when the draft fails validation and
    /// `ContentError::NotFound` when the question or category is missing.
    pub async fn update_question(
        &self,
        actor: UserId,
        id: QuestionId,
        draft: QuestionDraft,
    ) -> Result<(), ContentError> {
        self.authorize(actor)?;
        let question = draft.validate().map_err(quiz_core::Error::from)?;
        self.questions.replace_question(id, &question).await?;
        tracing::info!(%actor, question_id = %id, "question updated");
        Ok(())
    }

    /// Flip the question's active flag and return the new value.
    ///
    /// # Errors
    ///
    /// Returns `ContentError::Forbidden` for non-admins and
    /// `ContentError::NotFound` for unknown questions.
    pub async fn toggle_question(&self, actor: UserId, id: QuestionId) -> Result<bool, ContentError> {
        self.authorize(actor)?;
        let current = self.questions.get_question(id).await?;
        let active = !current.question.is_active;
        self.questions.set_question_active(id, active).await?;
        tracing::info!(%actor, question_id = %id, active, "question visibility changed");
        Ok(active)
    }

    /// # Errors
    ///
    /// Returns `ContentError::Forbidden` for non-admins and
    /// `ContentError::NotFound` for unknown questions.
    pub async fn delete_question(&self, actor: UserId, id: QuestionId) -> Result<(), ContentError> {
        self.authorize(actor)?;
        self.questions.delete_question(id).await?;
        tracing::info!(%actor, question_id = %id, "question deleted");
        Ok(())
    }

    /// Questions of one category, inactive ones included.
    ///
    /// # Errors
    ///
    /// Returns `ContentError::Forbidden` for non-admins.
    pub async fn list_questions(
        &self,
        actor: UserId,
        category_id: CategoryId,
    ) -> Result<Vec<Question>, ContentError> {
        self.authorize(actor)?;
        Ok(self.questions.list_questions(category_id).await?)
    }

    /// # Errors
    ///
    /// Returns `ContentError::Forbidden` for non-admins and
    /// `ContentError::NotFound` for unknown questions.
    pub async fn get_question(
        &self,
        actor: UserId,
        id: QuestionId,
    ) -> Result<QuestionWithAnswers, ContentError> {
        self.authorize(actor)?;
        Ok(self.questions.get_question(id).await?)
    }
}
