//! Line-oriented transport: reads commands, drives the quiz session, prints replies.

use std::io;

use quiz_core::model::{AnswerId, CategoryId, SessionState, UserId};
use services::{AppServices, AssistantError, CategoryChoice, QuizSession, QuizView, SessionError};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

use crate::render;

enum Step {
    Reply(String),
    Quit,
}

/// One user's console conversation.
pub struct Console<'a> {
    services: &'a AppServices,
    session: QuizSession,
    categories: Vec<CategoryId>,
    options: Vec<AnswerId>,
}

impl<'a> Console<'a> {
    #[must_use]
    pub fn new(services: &'a AppServices, user_id: UserId) -> Self {
        Self {
            services,
            session: QuizSession::new(user_id),
            categories: Vec::new(),
            options: Vec::new(),
        }
    }

    /// Process lines until `quit` or end of input.
    ///
    /// # Errors
    ///
    /// Returns `io::Error` if reading input or writing output fails.
    pub async fn run<R, W>(&mut self, input: R, output: &mut W) -> io::Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        output.write_all(render::MENU.as_bytes()).await?;
        output.write_all(b"\n").await?;

        let mut lines = input.lines();
        loop {
            output.write_all(b"> ").await?;
            output.flush().await?;
            let Some(line) = lines.next_line().await? else {
                break;
            };
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            match self.handle(line).await {
                Step::Reply(reply) => {
                    output.write_all(reply.as_bytes()).await?;
                    output.write_all(b"\n").await?;
                }
                Step::Quit => break,
            }
        }
        output.write_all(b"Bye!\n").await?;
        output.flush().await
    }

    async fn handle(&mut self, line: &str) -> Step {
        let quiz = self.services.quiz();
        let reply = match line.to_ascii_lowercase().as_str() {
            "quit" | "exit" => return Step::Quit,
            "menu" | "help" => {
                quiz.leave(&mut self.session);
                self.forget();
                render::MENU.to_owned()
            }
            "learn" => {
                let choice = quiz.start_learning(&mut self.session).await;
                self.choice(choice)
            }
            "review" => {
                let choice = quiz.start_review(&mut self.session).await;
                self.choice(choice)
            }
            "restart" => {
                let choice = quiz.restart_review(&mut self.session).await;
                self.choice(choice)
            }
            "random" => {
                let view = quiz.random_question(&mut self.session).await;
                self.view(view)
            }
            "next" => {
                let view = quiz.next_question(&mut self.session).await;
                self.view(view)
            }
            "stats" => self.stats().await,
            other => match other.parse::<usize>() {
                Ok(number) => self.pick(number).await,
                Err(_) => self.ask_assistant(line).await,
            },
        };
        Step::Reply(reply)
    }

    async fn pick(&mut self, number: usize) -> String {
        let index = number.wrapping_sub(1);
        let quiz = self.services.quiz();
        if self.session.state().current().is_some() {
            return match self.options.get(index).copied() {
                Some(answer_id) => {
                    let view = quiz.answer(&mut self.session, answer_id).await;
                    self.view(view)
                }
                None => format!("Choose an option between 1 and {}.", self.options.len()),
            };
        }
        if matches!(self.session.state(), SessionState::AwaitingCategory { .. }) {
            return match self.categories.get(index).copied() {
                Some(category_id) => {
                    let view = quiz.choose_category(&mut self.session, category_id).await;
                    self.view(view)
                }
                None => format!("Choose a category between 1 and {}.", self.categories.len()),
            };
        }
        "Type `learn`, `review` or `next` first.".to_owned()
    }

    fn choice(&mut self, choice: Result<CategoryChoice, SessionError>) -> String {
        match choice {
            Ok(choice) => {
                self.categories = choice.categories.iter().map(|c| c.id).collect();
                self.options.clear();
                render::categories(&choice)
            }
            Err(err) => self.failure(&err),
        }
    }

    fn view(&mut self, view: Result<QuizView, SessionError>) -> String {
        match view {
            Ok(QuizView::Question(question)) => {
                self.options = question.options.iter().map(|o| o.answer_id).collect();
                render::question(&question)
            }
            Ok(QuizView::Retry { feedback, question }) => {
                self.options = question.options.iter().map(|o| o.answer_id).collect();
                format!(
                    "{}\nTry again:\n{}",
                    render::feedback(&feedback),
                    render::question(&question)
                )
            }
            Ok(QuizView::Result(feedback)) => {
                self.options.clear();
                format!(
                    "{}\nType `next` for another question or `menu`.",
                    render::feedback(&feedback)
                )
            }
            Ok(QuizView::Exhausted(exhausted)) => {
                self.options.clear();
                render::exhausted(&exhausted)
            }
            Err(err) => self.failure(&err),
        }
    }

    fn failure(&mut self, err: &SessionError) -> String {
        if err.is_recoverable() {
            tracing::debug!(error = %err, "session event rejected");
        } else {
            tracing::error!(error = %err, "session event failed");
        }
        if self.session.state().is_idle() {
            self.forget();
        }
        render::session_error(err)
    }

    async fn stats(&self) -> String {
        match self
            .services
            .stats()
            .user_stats(self.session.user_id())
            .await
        {
            Ok(stats) => render::stats(&stats),
            Err(err) => {
                tracing::error!(error = %err, "statistics unavailable");
                "Statistics are not available right now.".to_owned()
            }
        }
    }

    async fn ask_assistant(&self, message: &str) -> String {
        let assistant = self.services.assistant();
        if !assistant.enabled() {
            return "Unknown command. Type `menu` to see what I can do.".to_owned();
        }
        match assistant.reply(self.session.user_id(), message).await {
            Ok(reply) => reply,
            Err(AssistantError::EmptyMessage) => String::new(),
            Err(err) => {
                tracing::warn!(error = %err, "assistant request failed");
                "The assistant is not available right now.".to_owned()
            }
        }
    }

    fn forget(&mut self) {
        self.categories.clear();
        self.options.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use quiz_core::model::{AnswerDraft, CategoryDraft, Difficulty, QuestionDraft, UserProfile};
    use quiz_core::time::fixed_clock;
    use services::{AdminPolicy, BotConfig};

    const ADMIN: UserId = UserId::new(1);
    const LEARNER: UserId = UserId::new(2);

    async fn services() -> AppServices {
        let config = BotConfig {
            admins: AdminPolicy::new([ADMIN]),
            ..BotConfig::default()
        };
        let services = AppServices::in_memory(&config, fixed_clock());
        services
            .users()
            .register(&UserProfile::new(LEARNER).with_username("kate"))
            .await
            .unwrap();
        let category = services
            .content()
            .add_category(ADMIN, CategoryDraft::new("Grammar"))
            .await
            .unwrap();
        services
            .content()
            .add_question(
                ADMIN,
                QuestionDraft {
                    category_id: category,
                    text: "She ___ happy.".into(),
                    difficulty: Difficulty::Beginner,
                    explanation: None,
                    answers: vec![AnswerDraft::new("is", true), AnswerDraft::new("are", false)],
                },
            )
            .await
            .unwrap();
        services
    }

    async fn transcript(input: &str) -> String {
        let services = services().await;
        let mut console = Console::new(&services, LEARNER);
        let mut output = Vec::new();
        console.run(input.as_bytes(), &mut output).await.unwrap();
        String::from_utf8(output).unwrap()
    }

    #[tokio::test]
    async fn learning_shows_categories_then_a_question() {
        let out = transcript("learn\n1\n").await;
        assert!(out.contains("Learning mode: choose a category\n  1. Grammar"));
        assert!(out.contains("[Learning | beginner]\nShe ___ happy."));
        assert!(out.ends_with("Bye!\n"));
    }

    #[tokio::test]
    async fn review_without_history_explains_itself() {
        let out = transcript("review\n1\nquit\n").await;
        assert!(out.contains("Nothing to review in this category yet."));
    }

    #[tokio::test]
    async fn stats_and_unknown_commands() {
        let out = transcript("stats\nwhat is a verb?\n").await;
        assert!(out.contains("@kate: 0 answered, 0 correct (0.0%), 0 categories studied"));
        assert!(out.contains("Unknown command."));
    }

    #[tokio::test]
    async fn numbers_need_something_to_pick() {
        let out = transcript("3\nlearn\n9\n").await;
        assert!(out.contains("Type `learn`, `review` or `next` first."));
        assert!(out.contains("Choose a category between 1 and 1."));
    }
}
