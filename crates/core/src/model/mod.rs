mod category;
mod ids;
mod mode;
mod progress;
mod question;
mod session;
mod user;

pub use ids::{AnswerId, CategoryId, ParseIdError, QuestionId, UserId};

pub use category::{Category, CategoryDraft, CategoryError};
pub use mode::{QuizMode, SelectionScope};
pub use progress::{
    AnswerEvent, CategoryCatalogStats, CategoryProgress, OverallProgress, ProgressAggregate,
    accuracy,
};
pub use question::{
    Answer, AnswerDraft, Difficulty, Question, QuestionDraft, QuestionError, QuestionWithAnswers,
    ValidatedQuestion,
};
pub use session::{
    AnswerCheck, AnswerOutcome, CurrentQuestion, ModeState, SessionState, SessionTransitionError,
    ShownQuestions,
};
pub use user::{User, UserProfile};
