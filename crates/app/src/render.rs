//! Plain-text rendering of service payloads for the console transport.

use std::fmt::Write as _;

use services::{
    AnswerFeedback, CategoryChoice, ExhaustedView, QuestionView, SessionError, SessionErrorKind,
    UserStats,
};

pub const MENU: &str = "\
Commands:
  learn     practise questions you have not mastered yet
  review    go over questions you answered before
  random    a random question from any category
  next      another question from the same category
  restart   start the review session over
  stats     your statistics
  menu      back to this menu
  quit      exit
Anything else is sent to the assistant when it is configured.";

#[must_use]
pub fn categories(choice: &CategoryChoice) -> String {
    if choice.categories.is_empty() {
        return "No categories are available yet.".to_owned();
    }
    let mut out = format!("{} mode: choose a category\n", choice.mode.label());
    for (index, category) in choice.categories.iter().enumerate() {
        let _ = writeln!(out, "  {}. {}", index + 1, category.name);
    }
    out.trim_end().to_owned()
}

#[must_use]
pub fn question(view: &QuestionView) -> String {
    let mut out = format!("[{} | {}]", view.mode_label, view.difficulty);
    if view.attempt > 1 {
        let _ = write!(out, " attempt {}", view.attempt);
    }
    let _ = writeln!(out, "\n{}", view.text);
    for (index, option) in view.options.iter().enumerate() {
        let _ = writeln!(out, "  {}. {}", index + 1, option.text);
    }
    out.trim_end().to_owned()
}

#[must_use]
pub fn feedback(feedback: &AnswerFeedback) -> String {
    let mut out = if feedback.is_correct {
        "Correct!".to_owned()
    } else {
        format!("Not quite. The answer is: {}", feedback.correct_answer_text)
    };
    if let Some(explanation) = &feedback.explanation {
        let _ = write!(out, "\n{explanation}");
    }
    out
}

#[must_use]
pub fn exhausted(view: &ExhaustedView) -> String {
    let scope = if view.category_id.is_some() {
        "in this category"
    } else {
        "anywhere"
    };
    if view.can_restart_review {
        format!("You have reviewed every answered question {scope}. Type `restart` to go again.")
    } else if view.mode.is_review() {
        format!("Nothing to review {scope} yet. Answer some questions in learning mode first.")
    } else {
        format!("You have mastered every question {scope}. Try `review` or another category.")
    }
}

#[must_use]
pub fn stats(stats: &UserStats) -> String {
    let mut out = format!(
        "{}: {} answered, {} correct ({:.1}%), {} categories studied",
        stats.display_name,
        stats.total_questions,
        stats.correct_answers,
        stats.accuracy,
        stats.overall.categories_studied,
    );
    for category in &stats.categories {
        let _ = write!(
            out,
            "\n  {}: {}/{} ({:.1}%)",
            category.category_name,
            category.correct_answers,
            category.questions_answered,
            category.accuracy,
        );
    }
    out
}

#[must_use]
pub fn session_error(err: &SessionError) -> String {
    match err.kind() {
        SessionErrorKind::NotFound => "That is no longer available. Back to the menu.".to_owned(),
        SessionErrorKind::IntegrityViolation => {
            "This question is not set up correctly. Pick a category to try another one.".to_owned()
        }
        SessionErrorKind::InvalidTransition => {
            "That does not fit here. Type `menu` to see the commands.".to_owned()
        }
        SessionErrorKind::TransientStoreFailure => {
            "Something went wrong. Please try again.".to_owned()
        }
    }
}
