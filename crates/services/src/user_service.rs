use std::sync::Arc;

use quiz_core::model::{User, UserId, UserProfile};
use storage::repository::{StorageError, UserRepository};

use crate::Clock;
use crate::error::UserServiceError;

/// Registers users on first contact and looks them up.
#[derive(Clone)]
pub struct UserService {
    clock: Clock,
    users: Arc<dyn UserRepository>,
}

impl UserService {
    #[must_use]
    pub fn new(clock: Clock, users: Arc<dyn UserRepository>) -> Self {
        Self { clock, users }
    }

    /// Insert the user if unknown; returns `true` when a new row was created.
    ///
    /// # Errors
    ///
    /// Returns `UserServiceError::Storage` if persistence fails.
    pub async fn register(&self, profile: &UserProfile) -> Result<bool, UserServiceError> {
        let created = self.users.register_user(profile, self.clock.now()).await?;
        if created {
            tracing::info!(user_id = %profile.id, "registered new user");
        }
        Ok(created)
    }

    /// Fetch a registered user.
    ///
    /// # Errors
    ///
    /// Returns `UserServiceError::UnknownUser` if the user never registered.
    /// Returns `UserServiceError::Storage` if repository access fails.
    pub async fn get(&self, user_id: UserId) -> Result<User, UserServiceError> {
        match self.users.get_user(user_id).await {
            Ok(user) => Ok(user),
            Err(StorageError::NotFound) => Err(UserServiceError::UnknownUser(user_id)),
            Err(err) => Err(err.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use quiz_core::time::{fixed_clock, fixed_now};
    use storage::InMemoryRepository;

    #[tokio::test]
    async fn register_is_insert_or_ignore() {
        let service = UserService::new(fixed_clock(), Arc::new(InMemoryRepository::new()));
        let profile = UserProfile::new(UserId::new(5)).with_username("first");

        assert!(service.register(&profile).await.unwrap());
        let renamed = UserProfile::new(UserId::new(5)).with_username("second");
        assert!(!service.register(&renamed).await.unwrap());

        let user = service.get(UserId::new(5)).await.unwrap();
        assert_eq!(user.profile.username.as_deref(), Some("first"));
        assert_eq!(user.created_at, fixed_now());
    }

    #[tokio::test]
    async fn missing_user_is_unknown() {
        let service = UserService::new(fixed_clock(), Arc::new(InMemoryRepository::new()));
        assert!(matches!(
            service.get(UserId::new(1)).await,
            Err(UserServiceError::UnknownUser(_))
        ));
    }
}
