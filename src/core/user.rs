//! User business logic - the identity stand-in the rest of the registry refers to.
//!
//! Authentication is handled elsewhere; this module only creates user records and
//! resolves usernames, which is what invitation creation needs.

use crate::{
    config::users::Config,
    entities::{User, user},
    errors::{Error, Result},
};
use sea_orm::{Set, prelude::*};
use tracing::{debug, info};

/// Longest accepted username, in characters.
pub const MAX_USERNAME_LEN: usize = 150;

/// Finds a user by primary key.
pub async fn get_user<C>(db: &C, user_id: i64) -> Result<Option<user::Model>>
where
    C: ConnectionTrait,
{
    User::find_by_id(user_id).one(db).await.map_err(Into::into)
}

/// Finds a user by exact username.
pub async fn find_user_by_username<C>(db: &C, username: &str) -> Result<Option<user::Model>>
where
    C: ConnectionTrait,
{
    User::find()
        .filter(user::Column::Username.eq(username))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Creates a new user after trimming and validating the username.
///
/// # Errors
/// Returns an error if:
/// - The username is empty, whitespace-only or longer than [`MAX_USERNAME_LEN`]
/// - The username is already taken
/// - The database insert operation fails
pub async fn create_user(db: &DatabaseConnection, username: String) -> Result<user::Model> {
    let username = username.trim().to_string();
    if username.is_empty() {
        return Err(Error::InvalidInput {
            message: "Username cannot be empty".to_string(),
        });
    }
    if username.chars().count() > MAX_USERNAME_LEN {
        return Err(Error::InvalidInput {
            message: format!("Username cannot be longer than {MAX_USERNAME_LEN} characters"),
        });
    }

    if find_user_by_username(db, &username).await?.is_some() {
        return Err(Error::InvalidInput {
            message: format!("Username '{username}' is already taken"),
        });
    }

    let user = user::ActiveModel {
        username: Set(username),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    };
    user.insert(db).await.map_err(Into::into)
}

/// Creates the users listed in the seed configuration that do not exist yet.
///
/// Returns the number of users created.
pub async fn seed_users(db: &DatabaseConnection, config: &Config) -> Result<usize> {
    let mut created = 0;
    for entry in &config.users {
        if find_user_by_username(db, entry.username.trim()).await?.is_some() {
            debug!("Seed user '{}' already exists. Skipping.", entry.username);
            continue;
        }
        create_user(db, entry.username.clone()).await?;
        created += 1;
    }
    info!("Seeded {} of {} configured users.", created, config.users.len());
    Ok(created)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::config::users::UserConfig;
    use crate::test_utils::*;
    use sea_orm::{DatabaseBackend, MockDatabase};

    #[tokio::test]
    async fn test_create_user_validation() -> Result<()> {
        let db = MockDatabase::new(DatabaseBackend::Sqlite).into_connection();

        let result = create_user(&db, "   ".to_string()).await;
        assert!(matches!(result, Err(Error::InvalidInput { .. })));

        let result = create_user(&db, "u".repeat(MAX_USERNAME_LEN + 1)).await;
        assert!(matches!(result, Err(Error::InvalidInput { .. })));

        Ok(())
    }

    #[tokio::test]
    async fn test_create_and_find_user() -> Result<()> {
        let db = setup_test_db().await?;

        let alice = create_user(&db, "  alice ".to_string()).await?;
        assert_eq!(alice.username, "alice");

        let found = find_user_by_username(&db, "alice").await?;
        assert_eq!(found.unwrap().id, alice.id);
        assert!(find_user_by_username(&db, "nobody").await?.is_none());
        assert_eq!(get_user(&db, alice.id).await?.unwrap(), alice);

        Ok(())
    }

    #[tokio::test]
    async fn test_duplicate_username_rejected() -> Result<()> {
        let db = setup_test_db().await?;
        create_user(&db, "alice".to_string()).await?;

        let result = create_user(&db, "alice".to_string()).await;
        assert!(matches!(result, Err(Error::InvalidInput { .. })));

        Ok(())
    }

    #[tokio::test]
    async fn test_seed_users_is_idempotent() -> Result<()> {
        let db = setup_test_db().await?;
        let config = Config {
            users: vec![
                UserConfig {
                    username: "alice".to_string(),
                },
                UserConfig {
                    username: "bob".to_string(),
                },
            ],
        };

        assert_eq!(seed_users(&db, &config).await?, 2);
        assert_eq!(seed_users(&db, &config).await?, 0);
        assert_eq!(User::find().all(&db).await?.len(), 2);

        Ok(())
    }
}
