use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use quiz_core::model::{
    Answer, AnswerEvent, AnswerId, Category, CategoryCatalogStats, CategoryId, CategoryProgress,
    OverallProgress, ProgressAggregate, Question, QuestionId, QuestionWithAnswers, QuizMode,
    SelectionScope, User, UserId, UserProfile, ValidatedQuestion,
};
use rand::seq::IndexedRandom;

use crate::repository::{
    AnswerSubmission, CategoryRepository, ChatHistoryRepository, ChatMessage, LearningRecord,
    ProgressRepository, QuestionRepository, StorageError, UserRepository,
};

#[derive(Default)]
struct Inner {
    users: BTreeMap<UserId, User>,
    categories: BTreeMap<CategoryId, Category>,
    questions: BTreeMap<QuestionId, Question>,
    answers: BTreeMap<QuestionId, Vec<Answer>>,
    events: Vec<AnswerEvent>,
    progress: BTreeMap<(UserId, CategoryId), ProgressAggregate>,
    chat: HashMap<UserId, VecDeque<ChatMessage>>,
    last_category_id: u64,
    last_question_id: u64,
    last_answer_id: u64,
    last_event_id: i64,
}

impl Inner {
    fn with_answers(&self, id: QuestionId) -> Option<QuestionWithAnswers> {
        let question = self.questions.get(&id)?.clone();
        let answers = self.answers.get(&id).cloned().unwrap_or_default();
        Some(QuestionWithAnswers { question, answers })
    }

    fn answered(&self, user_id: UserId, question_id: QuestionId, correct_only: bool) -> bool {
        self.events.iter().any(|event| {
            event.user_id == user_id
                && event.question_id == question_id
                && (!correct_only || event.is_correct)
        })
    }

    fn is_eligible(&self, user_id: UserId, question: &Question, scope: &SelectionScope) -> bool {
        if !question.is_active {
            return false;
        }
        let category_active = self
            .categories
            .get(&question.category_id)
            .is_some_and(|category| category.is_active);
        if !category_active {
            return false;
        }
        if scope
            .category_id()
            .is_some_and(|id| id != question.category_id)
        {
            return false;
        }
        match scope.mode() {
            QuizMode::Learning => !self.answered(user_id, question.id, true),
            QuizMode::Review => {
                self.answered(user_id, question.id, false) && !scope.excluded().contains(&question.id)
            }
        }
    }

    fn build_answers(&mut self, question_id: QuestionId, question: &ValidatedQuestion) -> Vec<Answer> {
        question
            .answers
            .iter()
            .map(|draft| {
                self.last_answer_id += 1;
                Answer {
                    id: AnswerId::new(self.last_answer_id),
                    question_id,
                    text: draft.text.clone(),
                    is_correct: draft.is_correct,
                }
            })
            .collect()
    }

    fn push_event(&mut self, submission: &AnswerSubmission, counted: bool) {
        self.last_event_id += 1;
        self.events.push(AnswerEvent {
            id: self.last_event_id,
            user_id: submission.user_id,
            question_id: submission.question_id,
            answer_id: submission.answer_id,
            is_correct: submission.is_correct,
            counted,
            answered_at: submission.answered_at,
        });
    }

    fn has_counted_event(&self, user_id: UserId, question_id: QuestionId) -> bool {
        self.events
            .iter()
            .any(|e| e.user_id == user_id && e.question_id == question_id && e.counted)
    }

    fn remove_question(&mut self, id: QuestionId) {
        self.questions.remove(&id);
        self.answers.remove(&id);
        self.events.retain(|event| event.question_id != id);
    }

    fn question_category(&self, submission: &AnswerSubmission) -> Result<CategoryId, StorageError> {
        if !self.users.contains_key(&submission.user_id) {
            return Err(StorageError::NotFound);
        }
        self.questions
            .get(&submission.question_id)
            .map(|question| question.category_id)
            .ok_or(StorageError::NotFound)
    }
}

/// In-memory repository for tests and prototyping.
///
/// All state sits behind one lock so the learning-answer check-and-insert is atomic.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    inner: Arc<Mutex<Inner>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner>, StorageError> {
        self.inner
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))
    }
}

//
// ─── USERS ─────────────────────────────────────────────────────────────────────
//

#[async_trait]
impl UserRepository for InMemoryRepository {
    async fn register_user(
        &self,
        profile: &UserProfile,
        now: DateTime<Utc>,
    ) -> Result<bool, StorageError> {
        let mut guard = self.lock()?;
        if guard.users.contains_key(&profile.id) {
            return Ok(false);
        }
        guard.users.insert(
            profile.id,
            User {
                profile: profile.clone(),
                total_questions: 0,
                correct_answers: 0,
                created_at: now,
            },
        );
        Ok(true)
    }

    async fn get_user(&self, id: UserId) -> Result<User, StorageError> {
        let guard = self.lock()?;
        guard.users.get(&id).cloned().ok_or(StorageError::NotFound)
    }
}

//
// ─── CATEGORIES ────────────────────────────────────────────────────────────────
//

fn sorted_by_name(mut categories: Vec<Category>) -> Vec<Category> {
    categories.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
    categories
}

#[async_trait]
impl CategoryRepository for InMemoryRepository {
    async fn upsert_category_by_name(
        &self,
        name: &str,
        now: DateTime<Utc>,
    ) -> Result<CategoryId, StorageError> {
        let mut guard = self.lock()?;
        if let Some(existing) = guard.categories.values().find(|c| c.name == name) {
            return Ok(existing.id);
        }
        guard.last_category_id += 1;
        let id = CategoryId::new(guard.last_category_id);
        guard.categories.insert(
            id,
            Category {
                id,
                name: name.to_owned(),
                is_active: true,
                created_at: now,
            },
        );
        Ok(id)
    }

    async fn get_category(&self, id: CategoryId) -> Result<Category, StorageError> {
        let guard = self.lock()?;
        guard
            .categories
            .get(&id)
            .cloned()
            .ok_or(StorageError::NotFound)
    }

    async fn list_categories(&self) -> Result<Vec<Category>, StorageError> {
        let guard = self.lock()?;
        Ok(sorted_by_name(guard.categories.values().cloned().collect()))
    }

    async fn list_active_categories(&self) -> Result<Vec<Category>, StorageError> {
        let guard = self.lock()?;
        Ok(sorted_by_name(
            guard
                .categories
                .values()
                .filter(|c| c.is_active)
                .cloned()
                .collect(),
        ))
    }

    async fn set_category_active(
        &self,
        id: CategoryId,
        active: bool,
    ) -> Result<(), StorageError> {
        let mut guard = self.lock()?;
        let category = guard.categories.get_mut(&id).ok_or(StorageError::NotFound)?;
        category.is_active = active;
        Ok(())
    }

    async fn delete_category(&self, id: CategoryId) -> Result<(), StorageError> {
        let mut guard = self.lock()?;
        if guard.categories.remove(&id).is_none() {
            return Err(StorageError::NotFound);
        }
        let owned: Vec<QuestionId> = guard
            .questions
            .values()
            .filter(|q| q.category_id == id)
            .map(|q| q.id)
            .collect();
        for question_id in owned {
            guard.remove_question(question_id);
        }
        guard.progress.retain(|(_, category_id), _| *category_id != id);
        Ok(())
    }
}

//
// ─── QUESTIONS ─────────────────────────────────────────────────────────────────
//

#[async_trait]
impl QuestionRepository for InMemoryRepository {
    async fn insert_question(
        &self,
        question: &ValidatedQuestion,
        _now: DateTime<Utc>,
    ) -> Result<QuestionId, StorageError> {
        let mut guard = self.lock()?;
        if !guard.categories.contains_key(&question.category_id) {
            return Err(StorageError::NotFound);
        }
        guard.last_question_id += 1;
        let id = QuestionId::new(guard.last_question_id);
        let answers = guard.build_answers(id, question);
        guard.questions.insert(
            id,
            Question {
                id,
                category_id: question.category_id,
                text: question.text.clone(),
                difficulty: question.difficulty,
                explanation: question.explanation.clone(),
                is_active: true,
            },
        );
        guard.answers.insert(id, answers);
        Ok(id)
    }

    async fn replace_question(
        &self,
        id: QuestionId,
        question: &ValidatedQuestion,
    ) -> Result<(), StorageError> {
        let mut guard = self.lock()?;
        if !guard.categories.contains_key(&question.category_id) {
            return Err(StorageError::NotFound);
        }
        if !guard.questions.contains_key(&id) {
            return Err(StorageError::NotFound);
        }
        let answers = guard.build_answers(id, question);
        if let Some(existing) = guard.questions.get_mut(&id) {
            existing.category_id = question.category_id;
            existing.text.clone_from(&question.text);
            existing.difficulty = question.difficulty;
            existing.explanation.clone_from(&question.explanation);
        }
        guard.answers.insert(id, answers);
        Ok(())
    }

    async fn get_question(&self, id: QuestionId) -> Result<QuestionWithAnswers, StorageError> {
        let guard = self.lock()?;
        guard.with_answers(id).ok_or(StorageError::NotFound)
    }

    async fn list_questions(
        &self,
        category_id: CategoryId,
    ) -> Result<Vec<Question>, StorageError> {
        let guard = self.lock()?;
        Ok(guard
            .questions
            .values()
            .filter(|q| q.category_id == category_id)
            .cloned()
            .collect())
    }

    async fn set_question_active(
        &self,
        id: QuestionId,
        active: bool,
    ) -> Result<(), StorageError> {
        let mut guard = self.lock()?;
        let question = guard.questions.get_mut(&id).ok_or(StorageError::NotFound)?;
        question.is_active = active;
        Ok(())
    }

    async fn delete_question(&self, id: QuestionId) -> Result<(), StorageError> {
        let mut guard = self.lock()?;
        if !guard.questions.contains_key(&id) {
            return Err(StorageError::NotFound);
        }
        guard.remove_question(id);
        Ok(())
    }

    async fn random_question(
        &self,
        user_id: UserId,
        scope: &SelectionScope,
    ) -> Result<Option<QuestionWithAnswers>, StorageError> {
        let guard = self.lock()?;
        let eligible: Vec<QuestionId> = guard
            .questions
            .values()
            .filter(|question| guard.is_eligible(user_id, question, scope))
            .map(|question| question.id)
            .collect();
        Ok(eligible
            .choose(&mut rand::rng())
            .and_then(|id| guard.with_answers(*id)))
    }
}

//
// ─── PROGRESS ──────────────────────────────────────────────────────────────────
//

#[async_trait]
impl ProgressRepository for InMemoryRepository {
    async fn record_learning_answer(
        &self,
        submission: &AnswerSubmission,
    ) -> Result<LearningRecord, StorageError> {
        let mut guard = self.lock()?;
        let inner = &mut *guard;
        let category_id = inner.question_category(submission)?;

        if inner.has_counted_event(submission.user_id, submission.question_id) {
            if !submission.is_correct {
                return Ok(LearningRecord::RepeatIgnored);
            }
            inner.push_event(submission, false);
            return Ok(LearningRecord::RepeatRecorded);
        }

        inner.push_event(submission, true);
        let correct = u32::from(submission.is_correct);
        if let Some(user) = inner.users.get_mut(&submission.user_id) {
            user.total_questions += 1;
            user.correct_answers += correct;
        }
        inner
            .progress
            .entry((submission.user_id, category_id))
            .and_modify(|aggregate| {
                aggregate.questions_answered += 1;
                aggregate.correct_answers += correct;
                aggregate.last_activity = submission.answered_at;
            })
            .or_insert_with(|| ProgressAggregate {
                user_id: submission.user_id,
                category_id,
                questions_answered: 1,
                correct_answers: correct,
                last_activity: submission.answered_at,
            });
        Ok(LearningRecord::Counted)
    }

    async fn record_review_answer(
        &self,
        submission: &AnswerSubmission,
    ) -> Result<(), StorageError> {
        let mut guard = self.lock()?;
        guard.question_category(submission)?;
        guard.push_event(submission, false);
        Ok(())
    }

    async fn has_answered(
        &self,
        user_id: UserId,
        question_id: QuestionId,
    ) -> Result<bool, StorageError> {
        let guard = self.lock()?;
        Ok(guard.answered(user_id, question_id, false))
    }

    async fn has_answered_correctly(
        &self,
        user_id: UserId,
        question_id: QuestionId,
    ) -> Result<bool, StorageError> {
        let guard = self.lock()?;
        Ok(guard.answered(user_id, question_id, true))
    }

    async fn answer_events(&self, user_id: UserId) -> Result<Vec<AnswerEvent>, StorageError> {
        let guard = self.lock()?;
        Ok(guard
            .events
            .iter()
            .filter(|event| event.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn progress_for_category(
        &self,
        user_id: UserId,
        category_id: CategoryId,
    ) -> Result<Option<ProgressAggregate>, StorageError> {
        let guard = self.lock()?;
        Ok(guard.progress.get(&(user_id, category_id)).cloned())
    }

    async fn progress_by_category(
        &self,
        user_id: UserId,
    ) -> Result<Vec<CategoryProgress>, StorageError> {
        let guard = self.lock()?;
        let mut rows: Vec<CategoryProgress> = guard
            .progress
            .values()
            .filter(|aggregate| aggregate.user_id == user_id)
            .filter_map(|aggregate| {
                let category = guard.categories.get(&aggregate.category_id)?;
                Some(CategoryProgress {
                    category_id: category.id,
                    category_name: category.name.clone(),
                    questions_answered: aggregate.questions_answered,
                    correct_answers: aggregate.correct_answers,
                    accuracy: aggregate.accuracy(),
                    last_activity: aggregate.last_activity,
                })
            })
            .collect();
        rows.sort_by(|a, b| a.category_name.cmp(&b.category_name));
        Ok(rows)
    }

    async fn overall_progress(
        &self,
        user_id: UserId,
    ) -> Result<Option<OverallProgress>, StorageError> {
        let guard = self.lock()?;
        let mut touched = 0_u32;
        let mut answered = 0_u32;
        let mut correct = 0_u32;
        for aggregate in guard.progress.values().filter(|a| a.user_id == user_id) {
            touched += 1;
            answered += aggregate.questions_answered;
            correct += aggregate.correct_answers;
        }
        if touched == 0 {
            return Ok(None);
        }
        Ok(Some(OverallProgress::new(answered, correct, touched)))
    }

    async fn category_catalog_stats(&self) -> Result<Vec<CategoryCatalogStats>, StorageError> {
        let guard = self.lock()?;
        let mut stats = Vec::new();
        for category in sorted_by_name(
            guard
                .categories
                .values()
                .filter(|c| c.is_active)
                .cloned()
                .collect(),
        ) {
            let active_questions = guard
                .questions
                .values()
                .filter(|q| q.category_id == category.id && q.is_active)
                .count();
            let learners: BTreeSet<UserId> = guard
                .progress
                .keys()
                .filter(|(_, category_id)| *category_id == category.id)
                .map(|(user_id, _)| *user_id)
                .collect();
            stats.push(CategoryCatalogStats {
                category_id: category.id,
                name: category.name,
                active_questions: u32::try_from(active_questions).unwrap_or(u32::MAX),
                learners: u32::try_from(learners.len()).unwrap_or(u32::MAX),
            });
        }
        Ok(stats)
    }
}

//
// ─── CHAT HISTORY ──────────────────────────────────────────────────────────────
//

#[async_trait]
impl ChatHistoryRepository for InMemoryRepository {
    async fn append_message(
        &self,
        user_id: UserId,
        message: &ChatMessage,
        keep: usize,
    ) -> Result<(), StorageError> {
        let mut guard = self.lock()?;
        let history = guard.chat.entry(user_id).or_default();
        history.push_back(message.clone());
        while history.len() > keep {
            history.pop_front();
        }
        Ok(())
    }

    async fn recent_messages(
        &self,
        user_id: UserId,
        limit: usize,
    ) -> Result<Vec<ChatMessage>, StorageError> {
        let guard = self.lock()?;
        let Some(history) = guard.chat.get(&user_id) else {
            return Ok(Vec::new());
        };
        let skip = history.len().saturating_sub(limit);
        Ok(history.iter().skip(skip).cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::{ChatRole, DEFAULT_HISTORY_WINDOW};
    use quiz_core::model::{AnswerDraft, Difficulty};
    use quiz_core::time::fixed_now;

    fn question(category_id: CategoryId, text: &str) -> ValidatedQuestion {
        ValidatedQuestion {
            category_id,
            text: text.into(),
            difficulty: Difficulty::Beginner,
            explanation: Some(format!("{text} explained")),
            answers: vec![AnswerDraft::new("right", true), AnswerDraft::new("wrong", false)],
        }
    }

    async fn seeded() -> (InMemoryRepository, UserId, CategoryId, QuestionWithAnswers) {
        let repo = InMemoryRepository::new();
        let user = UserId::new(42);
        repo.register_user(&UserProfile::new(user), fixed_now())
            .await
            .unwrap();
        let category = repo
            .upsert_category_by_name("Grammar", fixed_now())
            .await
            .unwrap();
        let id = repo
            .insert_question(&question(category, "Q1"), fixed_now())
            .await
            .unwrap();
        let stored = repo.get_question(id).await.unwrap();
        (repo, user, category, stored)
    }

    fn submission(user: UserId, question: &QuestionWithAnswers, correct: bool) -> AnswerSubmission {
        let answer = question
            .answers
            .iter()
            .find(|a| a.is_correct == correct)
            .unwrap();
        AnswerSubmission {
            user_id: user,
            question_id: question.id(),
            answer_id: answer.id,
            is_correct: correct,
            answered_at: fixed_now(),
        }
    }

    #[tokio::test]
    async fn register_user_is_insert_or_ignore() {
        let repo = InMemoryRepository::new();
        let profile = UserProfile::new(UserId::new(1)).with_username("kate");
        assert!(repo.register_user(&profile, fixed_now()).await.unwrap());
        assert!(!repo.register_user(&profile, fixed_now()).await.unwrap());
        let stored = repo.get_user(UserId::new(1)).await.unwrap();
        assert_eq!(stored.profile.username.as_deref(), Some("kate"));
        assert_eq!(stored.total_questions, 0);
    }

    #[tokio::test]
    async fn upsert_category_by_existing_name_is_noop() {
        let repo = InMemoryRepository::new();
        let first = repo
            .upsert_category_by_name("Vocabulary", fixed_now())
            .await
            .unwrap();
        let second = repo
            .upsert_category_by_name("Vocabulary", fixed_now())
            .await
            .unwrap();
        assert_eq!(first, second);
        assert_eq!(repo.list_categories().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn learning_answers_count_once() {
        let (repo, user, category, q1) = seeded().await;

        let wrong = repo
            .record_learning_answer(&submission(user, &q1, false))
            .await
            .unwrap();
        assert_eq!(wrong, LearningRecord::Counted);

        let ignored = repo
            .record_learning_answer(&submission(user, &q1, false))
            .await
            .unwrap();
        assert_eq!(ignored, LearningRecord::RepeatIgnored);

        let late = repo
            .record_learning_answer(&submission(user, &q1, true))
            .await
            .unwrap();
        assert_eq!(late, LearningRecord::RepeatRecorded);

        let stored = repo.get_user(user).await.unwrap();
        assert_eq!(stored.total_questions, 1);
        assert_eq!(stored.correct_answers, 0);

        let aggregate = repo
            .progress_for_category(user, category)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(aggregate.questions_answered, 1);
        assert_eq!(aggregate.correct_answers, 0);

        let events = repo.answer_events(user).await.unwrap();
        assert_eq!(events.len(), 2);
        assert!(events[0].counted);
        assert!(!events[1].counted);
        assert!(repo.has_answered_correctly(user, q1.id()).await.unwrap());
    }

    #[tokio::test]
    async fn review_answers_never_touch_statistics() {
        let (repo, user, category, q1) = seeded().await;
        repo.record_learning_answer(&submission(user, &q1, true))
            .await
            .unwrap();

        for correct in [false, true, false] {
            repo.record_review_answer(&submission(user, &q1, correct))
                .await
                .unwrap();
        }

        let stored = repo.get_user(user).await.unwrap();
        assert_eq!((stored.total_questions, stored.correct_answers), (1, 1));
        let aggregate = repo
            .progress_for_category(user, category)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(aggregate.questions_answered, 1);
        assert_eq!(repo.answer_events(user).await.unwrap().len(), 4);
    }

    #[tokio::test]
    async fn answering_a_deleted_question_is_not_found() {
        let (repo, user, _, q1) = seeded().await;
        repo.delete_question(q1.id()).await.unwrap();
        let err = repo
            .record_learning_answer(&submission(user, &q1, true))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::NotFound));
    }

    #[tokio::test]
    async fn selection_respects_mode_and_exclusions() {
        let (repo, user, category, q1) = seeded().await;

        let unseen = SelectionScope::CategoryUnseen(category);
        assert_eq!(
            repo.random_question(user, &unseen).await.unwrap().map(|q| q.id()),
            Some(q1.id())
        );
        let review = SelectionScope::CategoryReview {
            category_id: category,
            excluded: Vec::new(),
        };
        assert!(repo.random_question(user, &review).await.unwrap().is_none());

        repo.record_learning_answer(&submission(user, &q1, true))
            .await
            .unwrap();
        assert!(repo.random_question(user, &unseen).await.unwrap().is_none());
        assert!(repo.random_question(user, &review).await.unwrap().is_some());

        let excluded = SelectionScope::GlobalReview {
            excluded: vec![q1.id()],
        };
        assert!(repo.random_question(user, &excluded).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn inactive_category_hides_its_questions() {
        let (repo, user, category, _) = seeded().await;
        repo.set_category_active(category, false).await.unwrap();
        assert!(
            repo.random_question(user, &SelectionScope::GlobalUnseen)
                .await
                .unwrap()
                .is_none()
        );
        assert!(repo.list_active_categories().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn delete_category_cascades() {
        let (repo, user, category, q1) = seeded().await;
        repo.record_learning_answer(&submission(user, &q1, true))
            .await
            .unwrap();

        repo.delete_category(category).await.unwrap();

        assert!(matches!(
            repo.get_question(q1.id()).await,
            Err(StorageError::NotFound)
        ));
        assert!(repo.answer_events(user).await.unwrap().is_empty());
        assert!(repo.overall_progress(user).await.unwrap().is_none());
        // Lifetime counters survive.
        assert_eq!(repo.get_user(user).await.unwrap().total_questions, 1);
    }

    #[tokio::test]
    async fn overall_progress_sums_categories() {
        let (repo, user, grammar, q1) = seeded().await;
        let vocab = repo
            .upsert_category_by_name("Vocabulary", fixed_now())
            .await
            .unwrap();
        let q2_id = repo
            .insert_question(&question(vocab, "Q2"), fixed_now())
            .await
            .unwrap();
        let q2 = repo.get_question(q2_id).await.unwrap();

        repo.record_learning_answer(&submission(user, &q1, true))
            .await
            .unwrap();
        repo.record_learning_answer(&submission(user, &q2, false))
            .await
            .unwrap();

        let overall = repo.overall_progress(user).await.unwrap().unwrap();
        assert_eq!(overall.questions_answered, 2);
        assert_eq!(overall.correct_answers, 1);
        assert_eq!(overall.categories_studied, 2);
        assert_eq!(overall.accuracy, 50.0);

        let breakdown = repo.progress_by_category(user).await.unwrap();
        assert_eq!(breakdown[0].category_id, grammar);
        assert_eq!(breakdown[1].category_name, "Vocabulary");

        let catalog = repo.category_catalog_stats().await.unwrap();
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog[0].active_questions, 1);
        assert_eq!(catalog[0].learners, 1);
    }

    #[tokio::test]
    async fn chat_history_keeps_latest_window() {
        let repo = InMemoryRepository::new();
        let user = UserId::new(7);
        for i in 0..7 {
            let message = ChatMessage::new(ChatRole::User, format!("m{i}"), fixed_now());
            repo.append_message(user, &message, DEFAULT_HISTORY_WINDOW)
                .await
                .unwrap();
        }
        let recent = repo.recent_messages(user, 10).await.unwrap();
        let texts: Vec<&str> = recent.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(texts, ["m2", "m3", "m4", "m5", "m6"]);

        let last_two = repo.recent_messages(user, 2).await.unwrap();
        assert_eq!(last_two[1].content, "m6");
    }
}
