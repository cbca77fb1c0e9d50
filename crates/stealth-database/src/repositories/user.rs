//! User repository implementation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use stealth_core::error::{AppError, ErrorKind};
use stealth_core::result::AppResult;
use stealth_core::types::UserId;
use stealth_entity::user::{NewUser, User};

use crate::store::UserDirectory;

/// Repository for user lookup and the presence mirror.
#[derive(Debug, Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    /// Create a new user repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserDirectory for UserRepository {
    async fn find_user(&self, id: UserId) -> AppResult<Option<User>> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1 AND is_active")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::StoreUnavailable, "Failed to find user by id", e)
            })
    }

    async fn find_by_username(&self, username: &str) -> AppResult<Option<User>> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE username = $1 AND is_active")
            .bind(username)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(
                    ErrorKind::StoreUnavailable,
                    "Failed to find user by username",
                    e,
                )
            })
    }

    async fn search_users(&self, query: &str, limit: u32) -> AppResult<Vec<User>> {
        let pattern = format!("%{}%", escape_like(query.trim()));
        sqlx::query_as::<_, User>(
            r#"SELECT * FROM users
               WHERE is_active
                 AND (username ILIKE $1 ESCAPE '\' OR display_name ILIKE $1 ESCAPE '\')
               ORDER BY username
               LIMIT $2"#,
        )
        .bind(pattern)
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::StoreUnavailable, "Failed to search users", e))
    }

    async fn create_user(&self, user: NewUser) -> AppResult<User> {
        let id = user.id.unwrap_or_default();
        sqlx::query_as::<_, User>(
            r#"INSERT INTO users (id, username, display_name, avatar_url)
               VALUES ($1, $2, $3, $4)
               RETURNING *"#,
        )
        .bind(id)
        .bind(&user.username)
        .bind(&user.display_name)
        .bind(&user.avatar_url)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                AppError::conflict(format!("Username '{}' is already taken", user.username))
            }
            _ => AppError::with_source(ErrorKind::StoreUnavailable, "Failed to create user", e),
        })
    }

    async fn deactivate_user(&self, id: UserId) -> AppResult<bool> {
        let result = sqlx::query(
            "UPDATE users SET is_active = FALSE, is_online = FALSE WHERE id = $1 AND is_active",
        )
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::StoreUnavailable, "Failed to deactivate user", e)
        })?;
        Ok(result.rows_affected() > 0)
    }

    async fn upsert_presence_mirror(
        &self,
        id: UserId,
        is_online: bool,
        last_seen: DateTime<Utc>,
    ) -> AppResult<()> {
        sqlx::query("UPDATE users SET is_online = $2, last_seen = $3 WHERE id = $1")
            .bind(id)
            .bind(is_online)
            .bind(last_seen)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(
                    ErrorKind::StoreUnavailable,
                    "Failed to write presence mirror",
                    e,
                )
            })?;
        Ok(())
    }
}

/// Escape `LIKE` wildcards in user input.
fn escape_like(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("al"), "al");
        assert_eq!(escape_like("50%_off\\"), "50\\%\\_off\\\\");
    }
}
