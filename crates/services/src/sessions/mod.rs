mod service;
mod view;

pub use crate::error::{SessionError, SessionErrorKind};
pub use service::{QuizSession, QuizSessionService};
pub use view::{
    AnswerFeedback, AnswerOption, CategoryChoice, ExhaustedView, QuestionView, QuizView,
};
