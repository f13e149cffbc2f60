use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::ids::UserId;
use crate::model::progress::accuracy;

/// Display fields captured the first time a user interacts with the bot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: UserId,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

impl UserProfile {
    #[must_use]
    pub fn new(id: UserId) -> Self {
        Self {
            id,
            username: None,
            first_name: None,
            last_name: None,
        }
    }

    #[must_use]
    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    /// Best human-readable name for greetings.
    #[must_use]
    pub fn display_name(&self) -> String {
        match (&self.first_name, &self.last_name, &self.username) {
            (Some(first), Some(last), _) => format!("{first} {last}"),
            (Some(first), None, _) => first.clone(),
            (None, _, Some(username)) => format!("@{username}"),
            _ => format!("user {}", self.id),
        }
    }
}

/// A registered quiz participant with lifetime counters.
///
/// Counters are only mutated when a learning-mode answer is counted for the
/// first time; they are never decremented.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub profile: UserProfile,
    pub total_questions: u32,
    pub correct_answers: u32,
    pub created_at: DateTime<Utc>,
}

impl User {
    #[must_use]
    pub fn id(&self) -> UserId {
        self.profile.id
    }

    /// Percentage of correct first answers, rounded to one decimal.
    #[must_use]
    pub fn accuracy(&self) -> f64 {
        accuracy(self.correct_answers, self.total_questions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    #[test]
    fn display_name_prefers_full_name() {
        let mut profile = UserProfile::new(UserId::new(5)).with_username("kate");
        assert_eq!(profile.display_name(), "@kate");

        profile.first_name = Some("Kate".into());
        assert_eq!(profile.display_name(), "Kate");

        profile.last_name = Some("Ivanova".into());
        assert_eq!(profile.display_name(), "Kate Ivanova");
    }

    #[test]
    fn user_accuracy_uses_counters() {
        let user = User {
            profile: UserProfile::new(UserId::new(1)),
            total_questions: 3,
            correct_answers: 1,
            created_at: fixed_now(),
        };
        assert!((user.accuracy() - 33.3).abs() < f64::EPSILON);
    }
}
