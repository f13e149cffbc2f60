use std::sync::Arc;

use quiz_core::model::{QuestionWithAnswers, SelectionScope, UserId};
use rand::seq::SliceRandom;
use storage::repository::{QuestionRepository, StorageError};

/// Picks the next question for a user within a scope.
#[derive(Clone)]
pub struct QuestionSelector {
    questions: Arc<dyn QuestionRepository>,
}

impl QuestionSelector {
    #[must_use]
    pub fn new(questions: Arc<dyn QuestionRepository>) -> Self {
        Self { questions }
    }

    /// Uniformly random eligible question with its answers in shuffled display order.
    ///
    /// `Ok(None)` means the pool is exhausted, which callers present as a
    /// terminal state rather than an error.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the underlying query fails.
    pub async fn select(
        &self,
        user_id: UserId,
        scope: &SelectionScope,
    ) -> Result<Option<QuestionWithAnswers>, StorageError> {
        let picked = self.questions.random_question(user_id, scope).await?;
        tracing::debug!(
            %user_id,
            mode = scope.mode().label(),
            category_id = ?scope.category_id(),
            excluded = scope.excluded().len(),
            question_id = ?picked.as_ref().map(QuestionWithAnswers::id),
            "question selected"
        );
        Ok(picked.map(|mut question| {
            question.answers.shuffle(&mut rand::rng());
            question
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quiz_core::model::{AnswerDraft, Difficulty, ValidatedQuestion};
    use quiz_core::time::fixed_now;
    use storage::repository::CategoryRepository;
    use storage::InMemoryRepository;

    #[tokio::test]
    async fn shuffles_but_keeps_full_answer_set() {
        let repo = InMemoryRepository::new();
        let category = repo
            .upsert_category_by_name("Grammar", fixed_now())
            .await
            .unwrap();
        let answers: Vec<AnswerDraft> = (0..6)
            .map(|i| AnswerDraft::new(format!("option {i}"), i == 0))
            .collect();
        repo.insert_question(
            &ValidatedQuestion {
                category_id: category,
                text: "Pick one".into(),
                difficulty: Difficulty::Beginner,
                explanation: None,
                answers,
            },
            fixed_now(),
        )
        .await
        .unwrap();

        let selector = QuestionSelector::new(Arc::new(repo));
        let picked = selector
            .select(UserId::new(1), &SelectionScope::GlobalUnseen)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(picked.answers.len(), 6);
        assert_eq!(picked.answers.iter().filter(|a| a.is_correct).count(), 1);
    }

    #[tokio::test]
    async fn empty_pool_is_none() {
        let selector = QuestionSelector::new(Arc::new(InMemoryRepository::new()));
        let picked = selector
            .select(
                UserId::new(1),
                &SelectionScope::GlobalReview {
                    excluded: Vec::new(),
                },
            )
            .await
            .unwrap();
        assert!(picked.is_none());
    }
}
