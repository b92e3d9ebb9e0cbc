use crate::db::models::User;
use sqlx::SqlitePool;

pub async fn create_user(pool: &SqlitePool, user: &User) -> sqlx::Result<()> {
    sqlx::query(
        "INSERT INTO users (id, username, email, password_hash, created_at, updated_at)
         VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(&user.id)
    .bind(&user.username)
    .bind(&user.email)
    .bind(&user.password_hash)
    .bind(&user.created_at)
    .bind(&user.updated_at)
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn find_by_username(pool: &SqlitePool, username: &str) -> sqlx::Result<Option<User>> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE username = ?")
        .bind(username)
        .fetch_optional(pool)
        .await
}

pub async fn find_by_id(pool: &SqlitePool, user_id: &str) -> sqlx::Result<Option<User>> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
        .bind(user_id)
        .fetch_optional(pool)
        .await
}

/// Whether the error is a UNIQUE constraint violation on insert
pub fn is_duplicate(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .map_or(false, |db_err| db_err.is_unique_violation())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    #[tokio::test]
    async fn created_users_can_be_found_by_name_and_id() {
        let pool = db::memory_pool().await;
        let user = User::new("alice".into(), "alice@example.com".into(), "hash".into());
        create_user(&pool, &user).await.unwrap();

        let by_name = find_by_username(&pool, "alice").await.unwrap().unwrap();
        let by_id = find_by_id(&pool, &user.id).await.unwrap().unwrap();

        assert_eq!(by_name.id, user.id);
        assert_eq!(by_id.email, "alice@example.com");
        assert!(find_by_username(&pool, "bob").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn duplicate_usernames_violate_the_unique_constraint() {
        let pool = db::memory_pool().await;
        let first = User::new("alice".into(), "a@example.com".into(), "hash".into());
        let second = User::new("alice".into(), "b@example.com".into(), "hash".into());
        create_user(&pool, &first).await.unwrap();

        let err = create_user(&pool, &second).await.unwrap_err();
        assert!(is_duplicate(&err));
    }
}
