//! `admin` subcommand: content management and catalog statistics.

use std::fmt::Write as _;
use std::path::Path;

use quiz_core::model::{
    AnswerDraft, CategoryDraft, CategoryId, Difficulty, QuestionDraft, QuestionId, UserId,
};
use serde::Deserialize;
use services::{AppServices, ContentError, StatsError};

/// Parsed `admin` action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdminCommand {
    AddCategory(String),
    ToggleCategory(CategoryId),
    DeleteCategory(CategoryId),
    ListCategories,
    ListQuestions(CategoryId),
    ToggleQuestion(QuestionId),
    DeleteQuestion(QuestionId),
    Import(String),
    Catalog,
}

impl AdminCommand {
    /// Parse `<action> [argument]`.
    ///
    /// # Errors
    ///
    /// Returns a usage message for unknown actions or bad arguments.
    pub fn parse(words: &[String]) -> Result<Self, String> {
        let (action, rest) = words
            .split_first()
            .ok_or_else(|| "admin requires an action".to_owned())?;
        let arg = || {
            rest.first()
                .cloned()
                .ok_or_else(|| format!("admin {action} requires an argument"))
        };
        let id = || {
            let raw = arg()?;
            raw.parse::<u64>()
                .map_err(|_| format!("invalid id for admin {action}: {raw}"))
        };

        match action.as_str() {
            "add-category" => {
                if rest.is_empty() {
                    return Err("admin add-category requires a name".to_owned());
                }
                Ok(Self::AddCategory(rest.join(" ")))
            }
            "toggle-category" => Ok(Self::ToggleCategory(CategoryId::new(id()?))),
            "delete-category" => Ok(Self::DeleteCategory(CategoryId::new(id()?))),
            "list-categories" => Ok(Self::ListCategories),
            "list-questions" => Ok(Self::ListQuestions(CategoryId::new(id()?))),
            "toggle-question" => Ok(Self::ToggleQuestion(QuestionId::new(id()?))),
            "delete-question" => Ok(Self::DeleteQuestion(QuestionId::new(id()?))),
            "import" => Ok(Self::Import(arg()?)),
            "catalog" => Ok(Self::Catalog),
            other => Err(format!("unknown admin action: {other}")),
        }
    }
}

/// Question set file accepted by `admin import`.
#[derive(Debug, Deserialize)]
struct ImportFile {
    category: String,
    questions: Vec<ImportQuestion>,
}

#[derive(Debug, Deserialize)]
struct ImportQuestion {
    text: String,
    #[serde(default)]
    difficulty: Difficulty,
    #[serde(default)]
    explanation: Option<String>,
    answers: Vec<AnswerDraft>,
}

/// Run one admin action as `actor` and return the text to print.
///
/// # Errors
///
/// Returns `ContentError`/`StatsError` (for example `Forbidden` for
/// non-admins), or I/O and JSON errors for `import`.
pub async fn execute(
    services: &AppServices,
    actor: UserId,
    command: AdminCommand,
) -> Result<String, Box<dyn std::error::Error>> {
    let content = services.content();
    let message = match command {
        AdminCommand::AddCategory(name) => {
            let id = content.add_category(actor, CategoryDraft::new(name)).await?;
            format!("category {id} saved")
        }
        AdminCommand::ToggleCategory(id) => {
            let active = content.toggle_category(actor, id).await?;
            format!("category {id} is now {}", visibility(active))
        }
        AdminCommand::DeleteCategory(id) => {
            content.delete_category(actor, id).await?;
            format!("category {id} deleted")
        }
        AdminCommand::ListCategories => {
            let mut out = String::new();
            for category in content.list_categories(actor).await? {
                let _ = writeln!(
                    out,
                    "{:>4}  {:<8} {}",
                    category.id.value(),
                    visibility(category.is_active),
                    category.name
                );
            }
            out.trim_end().to_owned()
        }
        AdminCommand::ListQuestions(category_id) => {
            let mut out = String::new();
            for question in content.list_questions(actor, category_id).await? {
                let _ = writeln!(
                    out,
                    "{:>4}  {:<8} {:<12} {}",
                    question.id.value(),
                    visibility(question.is_active),
                    question.difficulty.as_str(),
                    question.text
                );
            }
            out.trim_end().to_owned()
        }
        AdminCommand::ToggleQuestion(id) => {
            let active = content.toggle_question(actor, id).await?;
            format!("question {id} is now {}", visibility(active))
        }
        AdminCommand::DeleteQuestion(id) => {
            content.delete_question(actor, id).await?;
            format!("question {id} deleted")
        }
        AdminCommand::Import(path) => import(services, actor, Path::new(&path)).await?,
        AdminCommand::Catalog => {
            let mut out = String::new();
            for entry in services.stats().catalog_stats(actor).await? {
                let _ = writeln!(
                    out,
                    "{:>4}  {}: {} active questions, {} learners",
                    entry.category_id.value(),
                    entry.name,
                    entry.active_questions,
                    entry.learners
                );
            }
            out.trim_end().to_owned()
        }
    };
    Ok(message)
}

async fn import(
    services: &AppServices,
    actor: UserId,
    path: &Path,
) -> Result<String, Box<dyn std::error::Error>> {
    let raw = tokio::fs::read_to_string(path).await?;
    let file: ImportFile = serde_json::from_str(&raw)?;
    let content = services.content();

    let category_id = content
        .add_category(actor, CategoryDraft::new(file.category.as_str()))
        .await?;
    let mut imported = 0_usize;
    for question in file.questions {
        content
            .add_question(
                actor,
                QuestionDraft {
                    category_id,
                    text: question.text,
                    difficulty: question.difficulty,
                    explanation: question.explanation,
                    answers: question.answers,
                },
            )
            .await?;
        imported += 1;
    }
    tracing::info!(%actor, %category_id, imported, "question set imported");
    Ok(format!(
        "imported {imported} questions into category {category_id} ({})",
        file.category.trim()
    ))
}

fn visibility(active: bool) -> &'static str {
    if active { "active" } else { "hidden" }
}

/// `true` when the error means the actor lacks admin rights.
#[must_use]
pub fn is_forbidden(err: &(dyn std::error::Error + 'static)) -> bool {
    matches!(err.downcast_ref::<ContentError>(), Some(ContentError::Forbidden(_)))
        || matches!(err.downcast_ref::<StatsError>(), Some(StatsError::Forbidden(_)))
}

#[cfg(test)]
mod tests {
    use super::*;

    use quiz_core::time::fixed_clock;
    use services::{AdminPolicy, BotConfig};

    const ADMIN: UserId = UserId::new(1);

    fn words(raw: &str) -> Vec<String> {
        raw.split_whitespace().map(str::to_owned).collect()
    }

    fn services() -> AppServices {
        let config = BotConfig {
            admins: AdminPolicy::new([ADMIN]),
            ..BotConfig::default()
        };
        AppServices::in_memory(&config, fixed_clock())
    }

    #[test]
    fn parses_actions_and_arguments() {
        assert_eq!(
            AdminCommand::parse(&words("add-category Phrasal verbs")).unwrap(),
            AdminCommand::AddCategory("Phrasal verbs".into())
        );
        assert_eq!(
            AdminCommand::parse(&words("toggle-question 12")).unwrap(),
            AdminCommand::ToggleQuestion(QuestionId::new(12))
        );
        assert!(AdminCommand::parse(&words("delete-category abc")).is_err());
        assert!(AdminCommand::parse(&words("import")).is_err());
        assert!(AdminCommand::parse(&words("launch")).is_err());
        assert!(AdminCommand::parse(&[]).is_err());
    }

    #[test]
    fn import_file_defaults_optional_fields() {
        let file: ImportFile = serde_json::from_str(
            r#"{"category":"Idioms","questions":[{"text":"Break the ice?","answers":[{"text":"start talking","is_correct":true},{"text":"smash"}]}]}"#,
        )
        .unwrap();
        assert_eq!(file.questions[0].difficulty, Difficulty::Beginner);
        assert!(file.questions[0].explanation.is_none());
        assert!(!file.questions[0].answers[1].is_correct);
    }

    #[tokio::test]
    async fn executes_against_content_service() {
        let services = services();
        let saved = execute(&services, ADMIN, AdminCommand::AddCategory("Grammar".into()))
            .await
            .unwrap();
        assert_eq!(saved, "category 1 saved");

        let toggled = execute(&services, ADMIN, AdminCommand::ToggleCategory(CategoryId::new(1)))
            .await
            .unwrap();
        assert_eq!(toggled, "category 1 is now hidden");

        let listed = execute(&services, ADMIN, AdminCommand::ListCategories)
            .await
            .unwrap();
        assert!(listed.contains("hidden"));
        assert!(listed.ends_with("Grammar"));
    }

    #[tokio::test]
    async fn non_admin_is_forbidden() {
        let err = execute(&services(), UserId::new(5), AdminCommand::Catalog)
            .await
            .unwrap_err();
        assert!(is_forbidden(err.as_ref()));
    }
}
