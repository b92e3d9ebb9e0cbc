//! Username + password strategy over the `users` table.
//!
//! Key derivation is CPU bound, so every hash and verify runs on tokio's
//! blocking pool and login traffic cannot stall other requests.

use super::{AuthError, Authenticator, NewUser, PasswordHasher, RegistrationError};
use crate::db::models::{Identity, User};
use crate::db::users;
use async_trait::async_trait;
use sqlx::SqlitePool;
use tokio::task::{self, JoinError};

pub const MIN_SECRET_LEN: usize = 8;

#[derive(Clone)]
pub struct LocalStrategy {
    pool: SqlitePool,
    hasher: PasswordHasher,
}

impl LocalStrategy {
    pub fn new(pool: SqlitePool, hasher: PasswordHasher) -> Self {
        Self { pool, hasher }
    }

    async fn with_hasher<T, F>(&self, work: F) -> Result<T, JoinError>
    where
        F: FnOnce(PasswordHasher) -> T + Send + 'static,
        T: Send + 'static,
    {
        let hasher = self.hasher;
        task::spawn_blocking(move || work(hasher)).await
    }
}

fn is_strong(secret: &str) -> bool {
    secret.trim().chars().count() >= MIN_SECRET_LEN
}

#[async_trait]
impl Authenticator for LocalStrategy {
    async fn authenticate(&self, identifier: &str, secret: &str) -> Result<Identity, AuthError> {
        let secret = secret.to_owned();
        match users::find_by_username(&self.pool, identifier).await? {
            Some(user) => {
                let encoded = user.password_hash.clone();
                let verified = self
                    .with_hasher(move |hasher| hasher.verify(&secret, &encoded))
                    .await?;
                if verified {
                    Ok(user.into())
                } else {
                    Err(AuthError::BadCredential)
                }
            }
            None => {
                self.with_hasher(move |hasher| hasher.burn(&secret)).await?;
                Err(AuthError::NotFound)
            }
        }
    }

    fn serialize(&self, identity: &Identity) -> String {
        identity.id.clone()
    }

    async fn deserialize(&self, token: &str) -> Result<Identity, AuthError> {
        users::find_by_id(&self.pool, token)
            .await?
            .map(Identity::from)
            .ok_or(AuthError::NotFound)
    }

    async fn register(&self, candidate: NewUser, secret: &str) -> Result<Identity, RegistrationError> {
        if !is_strong(secret) {
            return Err(RegistrationError::WeakSecret);
        }

        if users::find_by_username(&self.pool, &candidate.username)
            .await?
            .is_some()
        {
            return Err(RegistrationError::DuplicateIdentifier);
        }

        let secret = secret.to_owned();
        let password_hash = self.with_hasher(move |hasher| hasher.hash(&secret)).await?;
        let user = User::new(candidate.username, candidate.email, password_hash);

        // The UNIQUE constraints also catch a concurrent registration and
        // a reused email address
        match users::create_user(&self.pool, &user).await {
            Ok(()) => {
                tracing::info!(user_id = %user.id, username = %user.username, "user registered");
                Ok(user.into())
            }
            Err(err) if users::is_duplicate(&err) => Err(RegistrationError::DuplicateIdentifier),
            Err(err) => Err(err.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use std::time::Duration;
    use tokio::time::Instant;

    async fn strategy() -> LocalStrategy {
        LocalStrategy::new(db::memory_pool().await, PasswordHasher::new(1_000))
    }

    fn alice() -> NewUser {
        NewUser {
            username: "alice".into(),
            email: "alice@example.com".into(),
        }
    }

    #[tokio::test]
    async fn registered_users_can_authenticate() {
        let strategy = strategy().await;
        let registered = strategy.register(alice(), "correct-horse").await.unwrap();

        let authenticated = strategy.authenticate("alice", "correct-horse").await.unwrap();
        assert_eq!(authenticated, registered);
        assert_eq!(authenticated.email, "alice@example.com");
    }

    #[tokio::test]
    async fn wrong_secret_is_a_bad_credential() {
        let strategy = strategy().await;
        strategy.register(alice(), "correct-horse").await.unwrap();

        let err = strategy.authenticate("alice", "battery-staple").await.unwrap_err();
        assert!(matches!(err, AuthError::BadCredential));
    }

    #[tokio::test]
    async fn unknown_identifier_is_not_found_with_the_same_message() {
        let strategy = strategy().await;
        strategy.register(alice(), "correct-horse").await.unwrap();

        let missing = strategy.authenticate("bob", "correct-horse").await.unwrap_err();
        let wrong = strategy.authenticate("alice", "nope-nope-nope").await.unwrap_err();

        assert!(matches!(missing, AuthError::NotFound));
        assert_eq!(missing.to_string(), wrong.to_string());
    }

    #[tokio::test]
    async fn duplicate_registration_leaves_the_first_identity_intact() {
        let strategy = strategy().await;
        let first = strategy.register(alice(), "correct-horse").await.unwrap();

        let err = strategy
            .register(
                NewUser {
                    username: "alice".into(),
                    email: "other@example.com".into(),
                },
                "different-secret",
            )
            .await
            .unwrap_err();
        assert!(matches!(err, RegistrationError::DuplicateIdentifier));

        let still = strategy.authenticate("alice", "correct-horse").await.unwrap();
        assert_eq!(still, first);
        assert!(strategy.authenticate("alice", "different-secret").await.is_err());
    }

    #[tokio::test]
    async fn reused_email_is_a_duplicate() {
        let strategy = strategy().await;
        strategy.register(alice(), "correct-horse").await.unwrap();

        let err = strategy
            .register(
                NewUser {
                    username: "alice2".into(),
                    email: "alice@example.com".into(),
                },
                "correct-horse",
            )
            .await
            .unwrap_err();
        assert!(matches!(err, RegistrationError::DuplicateIdentifier));
    }

    #[tokio::test]
    async fn weak_secrets_are_refused_before_touching_the_store() {
        let strategy = strategy().await;

        for secret in ["", "short", "        ", " 1234567 "] {
            let err = strategy.register(alice(), secret).await.unwrap_err();
            assert!(matches!(err, RegistrationError::WeakSecret), "{secret:?}");
        }
        assert!(matches!(
            strategy.authenticate("alice", "short").await,
            Err(AuthError::NotFound)
        ));
    }

    #[tokio::test]
    async fn session_tokens_resolve_back_to_the_identity() {
        let strategy = strategy().await;
        let identity = strategy.register(alice(), "correct-horse").await.unwrap();

        let token = strategy.serialize(&identity);
        assert_eq!(token, identity.id);
        assert_eq!(strategy.deserialize(&token).await.unwrap(), identity);
    }

    #[tokio::test]
    async fn other_tasks_keep_running_while_a_secret_is_checked() {
        let strategy = LocalStrategy::new(db::memory_pool().await, PasswordHasher::default());

        let timer = tokio::spawn(async {
            tokio::time::sleep(Duration::from_millis(1)).await;
            Instant::now()
        });
        let err = strategy.authenticate("nobody", "correct-horse").await.unwrap_err();
        let finished = Instant::now();

        assert!(matches!(err, AuthError::NotFound));
        assert!(timer.await.unwrap() < finished);
    }

    #[tokio::test]
    async fn stale_tokens_do_not_resolve() {
        let strategy = strategy().await;
        let err = strategy.deserialize("no-such-user").await.unwrap_err();
        assert!(matches!(err, AuthError::NotFound));
    }
}
