mod admin;
mod console;
mod logging;
mod render;

use std::fmt;

use quiz_core::model::{UserId, UserProfile};
use services::{AppServices, BotConfig, Clock};
use tokio::io::BufReader;

use crate::admin::AdminCommand;
use crate::console::Console;

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    UnknownCommand(String),
    InvalidUserId { flag: &'static str, raw: String },
    InvalidDbUrl { raw: String },
    MissingUserId,
    Admin(String),
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::UnknownCommand(cmd) => write!(f, "unknown subcommand: {cmd}"),
            ArgsError::InvalidUserId { flag, raw } => write!(f, "invalid {flag} value: {raw}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::MissingUserId => write!(f, "a user id is required (--user-id or QUIZ_USER_ID)"),
            ArgsError::Admin(msg) => f.write_str(msg),
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

fn parse_user_id(raw: String, flag: &'static str) -> Result<UserId, ArgsError> {
    raw.parse::<UserId>()
        .map_err(|_| ArgsError::InvalidUserId { flag, raw })
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Command {
    Play,
    Stats,
    Admin(AdminCommand),
}

#[derive(Debug)]
struct Args {
    command: Command,
    db_url: Option<String>,
    user_id: Option<UserId>,
    username: Option<String>,
    actor: Option<UserId>,
}

impl Args {
    fn parse(argv: impl IntoIterator<Item = String>) -> Result<Self, ArgsError> {
        let mut db_url = None;
        let mut user_id = std::env::var("QUIZ_USER_ID")
            .ok()
            .and_then(|value| value.parse::<UserId>().ok());
        let mut username = std::env::var("QUIZ_USERNAME").ok();
        let mut actor = None;
        let mut words = Vec::new();

        let mut args = argv.into_iter();
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(&mut args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = Some(value);
                }
                "--user-id" => {
                    let value = require_value(&mut args, "--user-id")?;
                    user_id = Some(parse_user_id(value, "--user-id")?);
                }
                "--username" => username = Some(require_value(&mut args, "--username")?),
                "--actor" => {
                    let value = require_value(&mut args, "--actor")?;
                    actor = Some(parse_user_id(value, "--actor")?);
                }
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                flag if flag.starts_with("--") => return Err(ArgsError::UnknownArg(arg)),
                _ => words.push(arg),
            }
        }

        let command = match words.split_first() {
            None => Command::Play,
            Some((first, rest)) => match first.as_str() {
                "play" if rest.is_empty() => Command::Play,
                "stats" if rest.is_empty() => Command::Stats,
                "admin" => Command::Admin(AdminCommand::parse(rest).map_err(ArgsError::Admin)?),
                "play" | "stats" => return Err(ArgsError::UnknownArg(rest[0].clone())),
                other => return Err(ArgsError::UnknownCommand(other.to_owned())),
            },
        };

        Ok(Self {
            command,
            db_url,
            user_id,
            username,
            actor,
        })
    }
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  quiz [play]  --user-id <id> [--username <name>] [--db <sqlite_url>]");
    eprintln!("  quiz stats   --user-id <id> [--db <sqlite_url>]");
    eprintln!("  quiz admin <action> [arg] --actor <id> [--db <sqlite_url>]");
    eprintln!();
    eprintln!("Admin actions:");
    eprintln!("  add-category <name>, toggle-category <id>, delete-category <id>,");
    eprintln!("  list-categories, list-questions <category-id>, toggle-question <id>,");
    eprintln!("  delete-question <id>, import <file.json>, catalog");
    eprintln!();
    eprintln!("Environment (flags win):");
    eprintln!("  QUIZ_DB_URL, QUIZ_USER_ID, QUIZ_USERNAME, QUIZ_ADMIN_IDS,");
    eprintln!("  QUIZ_AI_API_KEY, QUIZ_AI_BASE_URL, QUIZ_AI_MODEL, QUIZ_AI_SYSTEM_PROMPT, RUST_LOG");
}

fn prepare_sqlite_dir(db_url: &str) -> std::io::Result<()> {
    let Some(path) = db_url.strip_prefix("sqlite://") else {
        return Ok(());
    };
    let path = path.split('?').next().unwrap_or(path);
    if let Some(parent) = std::path::Path::new(path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let _ = dotenvy::dotenv();
    let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into());
    logging::init_tracing(&log_level);

    let args = Args::parse(std::env::args().skip(1)).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    let mut config = BotConfig::from_env();
    if let Some(db_url) = args.db_url {
        config.db_url = db_url;
    }
    prepare_sqlite_dir(&config.db_url)?;
    let services = AppServices::new_sqlite(&config, Clock::default_clock()).await?;

    match args.command {
        Command::Play => {
            let user_id = args.user_id.ok_or(ArgsError::MissingUserId)?;
            let mut profile = UserProfile::new(user_id);
            if let Some(username) = args.username {
                profile = profile.with_username(username);
            }
            services.users().register(&profile).await?;

            let mut stdout = tokio::io::stdout();
            Console::new(&services, user_id)
                .run(BufReader::new(tokio::io::stdin()), &mut stdout)
                .await?;
        }
        Command::Stats => {
            let user_id = args.user_id.ok_or(ArgsError::MissingUserId)?;
            let stats = services.stats().user_stats(user_id).await?;
            println!("{}", render::stats(&stats));
        }
        Command::Admin(command) => {
            let actor = args
                .actor
                .or(args.user_id)
                .ok_or(ArgsError::MissingUserId)?;
            match admin::execute(&services, actor, command).await {
                Ok(message) => println!("{message}"),
                Err(err) if admin::is_forbidden(err.as_ref()) => {
                    tracing::warn!(%actor, "admin command refused");
                    return Err(err);
                }
                Err(err) => return Err(err),
            }
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(raw: &str) -> Vec<String> {
        raw.split_whitespace().map(str::to_owned).collect()
    }

    #[test]
    fn defaults_to_play() {
        let args = Args::parse(argv("--user-id 42 --username kate")).unwrap();
        assert_eq!(args.command, Command::Play);
        assert_eq!(args.user_id, Some(UserId::new(42)));
        assert_eq!(args.username.as_deref(), Some("kate"));
    }

    #[test]
    fn admin_flags_may_follow_the_action() {
        let args = Args::parse(argv("admin toggle-category 3 --actor 1 --db sqlite::memory:")).unwrap();
        assert_eq!(
            args.command,
            Command::Admin(AdminCommand::ToggleCategory(
                quiz_core::model::CategoryId::new(3)
            ))
        );
        assert_eq!(args.actor, Some(UserId::new(1)));
        assert_eq!(args.db_url.as_deref(), Some("sqlite::memory:"));
    }

    #[test]
    fn rejects_bad_input() {
        assert!(matches!(
            Args::parse(argv("--user-id abc")),
            Err(ArgsError::InvalidUserId { .. })
        ));
        assert!(matches!(
            Args::parse(argv("--db")),
            Err(ArgsError::MissingValue { flag: "--db" })
        ));
        assert!(matches!(
            Args::parse(argv("dance")),
            Err(ArgsError::UnknownCommand(_))
        ));
        assert!(matches!(
            Args::parse(argv("--verbose")),
            Err(ArgsError::UnknownArg(_))
        ));
        assert!(matches!(Args::parse(argv("admin")), Err(ArgsError::Admin(_))));
    }
}
