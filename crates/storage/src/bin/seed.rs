use std::fmt;

use chrono::{DateTime, Utc};
use quiz_core::model::{AnswerDraft, CategoryDraft, Difficulty, QuestionDraft, UserId, UserProfile};
use storage::repository::Storage;

#[derive(Debug, Clone)]
struct Args {
    db_url: String,
    user_id: Option<UserId>,
    now: Option<DateTime<Utc>>,
}

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidUserId { raw: String },
    InvalidDbUrl { raw: String },
    InvalidNow { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidUserId { raw } => write!(f, "invalid --user-id value: {raw}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::InvalidNow { raw } => {
                write!(f, "invalid --now value (expected RFC3339): {raw}")
            }
        }
    }
}

impl std::error::Error for ArgsError {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

impl Args {
    fn parse() -> Result<Self, ArgsError> {
        let mut db_url =
            std::env::var("QUIZ_DB_URL").unwrap_or_else(|_| "sqlite://quiz.sqlite3".into());
        let mut user_id = std::env::var("QUIZ_SEED_USER_ID")
            .ok()
            .and_then(|value| value.parse::<UserId>().ok());
        let mut now: Option<DateTime<Utc>> = None;

        let mut args = std::env::args().skip(1);
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(&mut args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = value;
                }
                "--user-id" => {
                    let value = require_value(&mut args, "--user-id")?;
                    let parsed = value
                        .parse::<UserId>()
                        .map_err(|_| ArgsError::InvalidUserId { raw: value.clone() })?;
                    user_id = Some(parsed);
                }
                "--now" => {
                    let value = require_value(&mut args, "--now")?;
                    let parsed = DateTime::parse_from_rfc3339(&value)
                        .map_err(|_| ArgsError::InvalidNow { raw: value.clone() })?
                        .with_timezone(&Utc);
                    now = Some(parsed);
                }
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(Self {
            db_url,
            user_id,
            now,
        })
    }
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p storage --bin seed -- [options]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --db <sqlite_url>         SQLite URL (default: sqlite://quiz.sqlite3)");
    eprintln!("  --user-id <id>            Also register this user id");
    eprintln!("  --now <rfc3339>           Fixed current time for deterministic seeding");
    eprintln!("  -h, --help                Show this help");
    eprintln!();
    eprintln!("Environment (same as flags):");
    eprintln!("  QUIZ_DB_URL, QUIZ_SEED_USER_ID");
}

struct SampleQuestion {
    text: &'static str,
    difficulty: Difficulty,
    explanation: &'static str,
    answers: &'static [(&'static str, bool)],
}

const SAMPLES: &[(&str, &[SampleQuestion])] = &[
    (
        "Grammar",
        &[
            SampleQuestion {
                text: "Choose the correct form: She ___ to school every day.",
                difficulty: Difficulty::Beginner,
                explanation: "Third person singular takes -s in the present simple.",
                answers: &[("go", false), ("goes", true), ("going", false), ("gone", false)],
            },
            SampleQuestion {
                text: "Which sentence uses the present perfect?",
                difficulty: Difficulty::Intermediate,
                explanation: "Present perfect is have/has + past participle.",
                answers: &[
                    ("I saw that film.", false),
                    ("I have seen that film.", true),
                    ("I am seeing that film.", false),
                ],
            },
        ],
    ),
    (
        "Vocabulary",
        &[
            SampleQuestion {
                text: "What is a synonym of \"rapid\"?",
                difficulty: Difficulty::Beginner,
                explanation: "Rapid and fast both describe high speed.",
                answers: &[("slow", false), ("fast", true), ("quiet", false)],
            },
            SampleQuestion {
                text: "Pick the word that means \"to make something less severe\".",
                difficulty: Difficulty::Advanced,
                explanation: "To mitigate is to reduce the severity of something.",
                answers: &[("mitigate", true), ("aggravate", false), ("instigate", false)],
            },
        ],
    ),
    (
        "Idioms",
        &[SampleQuestion {
            text: "\"Break the ice\" means...",
            difficulty: Difficulty::Intermediate,
            explanation: "It means easing the first awkwardness between people.",
            answers: &[
                ("to start a conversation", true),
                ("to damage something", false),
                ("to feel cold", false),
            ],
        }],
    ),
];

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse().map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    let storage = Storage::sqlite(&args.db_url).await?;
    let now = args.now.unwrap_or_else(Utc::now);

    let mut inserted = 0_usize;
    for (name, questions) in SAMPLES {
        let name = CategoryDraft::new(*name).validate()?;
        let category_id = storage.categories.upsert_category_by_name(&name, now).await?;

        // Re-running the seed must not duplicate questions.
        if !storage.questions.list_questions(category_id).await?.is_empty() {
            continue;
        }

        for sample in *questions {
            let draft = QuestionDraft {
                category_id,
                text: sample.text.to_owned(),
                difficulty: sample.difficulty,
                explanation: Some(sample.explanation.to_owned()),
                answers: sample
                    .answers
                    .iter()
                    .map(|(text, is_correct)| AnswerDraft::new(*text, *is_correct))
                    .collect(),
            };
            storage
                .questions
                .insert_question(&draft.validate()?, now)
                .await?;
            inserted += 1;
        }
    }

    if let Some(user_id) = args.user_id {
        storage
            .users
            .register_user(&UserProfile::new(user_id), now)
            .await?;
    }

    println!(
        "Seeded {} categories and {} new questions into {}",
        SAMPLES.len(),
        inserted,
        args.db_url
    );

    Ok(())
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
