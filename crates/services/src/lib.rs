#![forbid(unsafe_code)]

pub mod app_services;
pub mod assistant_service;
pub mod config;
pub mod content_service;
pub mod error;
pub mod progress_tracker;
pub mod selector;
pub mod sessions;
pub mod stats_service;
pub mod user_service;

pub use quiz_core::Clock;

pub use app_services::AppServices;
pub use assistant_service::AssistantService;
pub use config::{AdminPolicy, AssistantConfig, BotConfig};
pub use content_service::ContentService;
pub use error::{
    AppServicesError, AssistantError, ContentError, GradeError, SessionError, SessionErrorKind,
    StatsError, UserServiceError,
};
pub use progress_tracker::{GradeRequest, GradeResult, ProgressTracker};
pub use selector::QuestionSelector;
pub use sessions::{
    AnswerFeedback, AnswerOption, CategoryChoice, ExhaustedView, QuestionView, QuizSession,
    QuizSessionService, QuizView,
};
pub use stats_service::{StatsService, UserStats};
pub use user_service::UserService;
