use std::collections::BTreeSet;
use std::env;

use quiz_core::model::UserId;

pub const DEFAULT_DB_URL: &str = "sqlite://quiz.sqlite3";
pub const DEFAULT_AI_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_AI_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a friendly English tutor. Answer briefly, \
     explain grammar and vocabulary with short examples, and encourage the learner to keep practising.";

/// Immutable set of users allowed to curate content and see catalog statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdminPolicy {
    admins: BTreeSet<UserId>,
}

impl AdminPolicy {
    #[must_use]
    pub fn new(admins: impl IntoIterator<Item = UserId>) -> Self {
        Self {
            admins: admins.into_iter().collect(),
        }
    }

    /// Parse a comma separated id list; malformed entries are skipped with a warning.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        let mut admins = BTreeSet::new();
        for entry in raw.split(',').map(str::trim).filter(|e| !e.is_empty()) {
            match entry.parse::<UserId>() {
                Ok(id) => {
                    admins.insert(id);
                }
                Err(err) => tracing::warn!(entry, %err, "skipping invalid admin id"),
            }
        }
        Self { admins }
    }

    #[must_use]
    pub fn is_admin(&self, user_id: UserId) -> bool {
        self.admins.contains(&user_id)
    }

    pub fn ids(&self) -> impl Iterator<Item = UserId> + '_ {
        self.admins.iter().copied()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.admins.is_empty()
    }
}

/// Connection settings for the OpenAI-compatible chat endpoint.
#[derive(Clone, Debug)]
pub struct AssistantConfig {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
    pub system_prompt: String,
}

/// Process configuration, read once at startup and passed down explicitly.
#[derive(Clone, Debug)]
pub struct BotConfig {
    pub db_url: String,
    pub admins: AdminPolicy,
    pub assistant: Option<AssistantConfig>,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            db_url: DEFAULT_DB_URL.to_owned(),
            admins: AdminPolicy::default(),
            assistant: None,
        }
    }
}

impl BotConfig {
    /// Read `QUIZ_*` variables from the process environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from any key lookup; unset or blank keys use defaults.
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let assistant = get("QUIZ_AI_API_KEY").map(|api_key| AssistantConfig {
            base_url: get("QUIZ_AI_BASE_URL").unwrap_or_else(|| DEFAULT_AI_BASE_URL.into()),
            api_key,
            model: get("QUIZ_AI_MODEL").unwrap_or_else(|| DEFAULT_AI_MODEL.into()),
            system_prompt: get("QUIZ_AI_SYSTEM_PROMPT")
                .unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.into()),
        });

        Self {
            db_url: get("QUIZ_DB_URL").unwrap_or_else(|| DEFAULT_DB_URL.into()),
            admins: get("QUIZ_ADMIN_IDS")
                .map(|raw| AdminPolicy::parse(&raw))
                .unwrap_or_default(),
            assistant,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn admin_list_tolerates_whitespace_and_garbage() {
        let policy = AdminPolicy::parse(" 12, 34 ,abc,, 56 ");
        assert!(policy.is_admin(UserId::new(12)));
        assert!(policy.is_admin(UserId::new(34)));
        assert!(policy.is_admin(UserId::new(56)));
        assert_eq!(policy.ids().count(), 3);
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = BotConfig::from_lookup(lookup(&[]));
        assert_eq!(config.db_url, DEFAULT_DB_URL);
        assert!(config.admins.is_empty());
        assert!(config.assistant.is_none());
    }

    #[test]
    fn assistant_requires_api_key() {
        let blank = BotConfig::from_lookup(lookup(&[("QUIZ_AI_API_KEY", "  ")]));
        assert!(blank.assistant.is_none());

        let config = BotConfig::from_lookup(lookup(&[
            ("QUIZ_AI_API_KEY", "sk-test"),
            ("QUIZ_AI_MODEL", "tiny"),
            ("QUIZ_DB_URL", "sqlite::memory:"),
            ("QUIZ_ADMIN_IDS", "1"),
        ]));
        let assistant = config.assistant.unwrap();
        assert_eq!(assistant.model, "tiny");
        assert_eq!(assistant.base_url, DEFAULT_AI_BASE_URL);
        assert_eq!(config.db_url, "sqlite::memory:");
        assert!(config.admins.is_admin(UserId::new(1)));
    }
}
