use std::sync::Arc;

use storage::repository::Storage;

use crate::Clock;
use crate::assistant_service::AssistantService;
use crate::config::BotConfig;
use crate::content_service::ContentService;
use crate::error::AppServicesError;
use crate::progress_tracker::ProgressTracker;
use crate::selector::QuestionSelector;
use crate::sessions::QuizSessionService;
use crate::stats_service::StatsService;
use crate::user_service::UserService;

/// Assembles transport-facing services over one storage backend.
#[derive(Clone)]
pub struct AppServices {
    users: Arc<UserService>,
    quiz: Arc<QuizSessionService>,
    stats: Arc<StatsService>,
    content: Arc<ContentService>,
    assistant: Arc<AssistantService>,
}

impl AppServices {
    /// Build services backed by `SQLite` storage at `config.db_url`.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if connecting or migrating the database fails.
    pub async fn new_sqlite(config: &BotConfig, clock: Clock) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(&config.db_url).await?;
        tracing::info!(
            admins = config.admins.ids().count(),
            assistant = config.assistant.is_some(),
            "services ready"
        );
        Ok(Self::from_storage(&storage, config, clock))
    }

    /// Build services backed by the in-memory repository.
    #[must_use]
    pub fn in_memory(config: &BotConfig, clock: Clock) -> Self {
        Self::from_storage(&Storage::in_memory(), config, clock)
    }

    #[must_use]
    pub fn from_storage(storage: &Storage, config: &BotConfig, clock: Clock) -> Self {
        let selector = QuestionSelector::new(Arc::clone(&storage.questions));
        let tracker = ProgressTracker::new(clock, Arc::clone(&storage.progress));
        let quiz = Arc::new(QuizSessionService::new(
            Arc::clone(&storage.categories),
            selector,
            tracker,
        ));
        let users = Arc::new(UserService::new(clock, Arc::clone(&storage.users)));
        let stats = Arc::new(StatsService::new(
            config.admins.clone(),
            Arc::clone(&storage.users),
            Arc::clone(&storage.progress),
        ));
        let content = Arc::new(ContentService::new(
            clock,
            config.admins.clone(),
            Arc::clone(&storage.categories),
            Arc::clone(&storage.questions),
        ));
        let assistant = Arc::new(AssistantService::new(
            clock,
            config.assistant.clone(),
            Arc::clone(&storage.chat),
        ));

        Self {
            users,
            quiz,
            stats,
            content,
            assistant,
        }
    }

    #[must_use]
    pub fn users(&self) -> Arc<UserService> {
        Arc::clone(&self.users)
    }

    #[must_use]
    pub fn quiz(&self) -> Arc<QuizSessionService> {
        Arc::clone(&self.quiz)
    }

    #[must_use]
    pub fn stats(&self) -> Arc<StatsService> {
        Arc::clone(&self.stats)
    }

    #[must_use]
    pub fn content(&self) -> Arc<ContentService> {
        Arc::clone(&self.content)
    }

    #[must_use]
    pub fn assistant(&self) -> Arc<AssistantService> {
        Arc::clone(&self.assistant)
    }
}
