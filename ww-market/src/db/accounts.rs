//! User and session rows

use sqlx::{Row, SqlitePool};
use ww_common::Result;

/// Stored credentials for one account
#[derive(Debug, Clone, PartialEq)]
pub struct UserRecord {
    pub id: String,
    pub email: String,
    pub password_hash: String,
    pub salt: String,
    pub created_at: String,
}

/// Insert a user; returns false if the email is already registered
pub async fn insert_user(pool: &SqlitePool, user: &UserRecord) -> Result<bool> {
    let result = sqlx::query(
        r#"
        INSERT INTO users (id, email, password_hash, salt, created_at)
        VALUES (?, ?, ?, ?, ?)
        ON CONFLICT(email) DO NOTHING
        "#,
    )
    .bind(&user.id)
    .bind(&user.email)
    .bind(&user.password_hash)
    .bind(&user.salt)
    .bind(&user.created_at)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() == 1)
}

pub async fn find_user_by_email(pool: &SqlitePool, email: &str) -> Result<Option<UserRecord>> {
    let row = sqlx::query(
        "SELECT id, email, password_hash, salt, created_at FROM users WHERE email = ?",
    )
    .bind(email)
    .fetch_optional(pool)
    .await?;

    row.map(|row| {
        Ok(UserRecord {
            id: row.try_get("id")?,
            email: row.try_get("email")?,
            password_hash: row.try_get("password_hash")?,
            salt: row.try_get("salt")?,
            created_at: row.try_get("created_at")?,
        })
    })
    .transpose()
}

pub async fn insert_session(
    pool: &SqlitePool,
    token: &str,
    user_id: &str,
    created_at: &str,
) -> Result<()> {
    sqlx::query("INSERT INTO sessions (token, user_id, created_at) VALUES (?, ?, ?)")
        .bind(token)
        .bind(user_id)
        .bind(created_at)
        .execute(pool)
        .await?;
    Ok(())
}

/// User id owning a session token
pub async fn session_user(pool: &SqlitePool, token: &str) -> Result<Option<String>> {
    let user_id = sqlx::query_scalar("SELECT user_id FROM sessions WHERE token = ?")
        .bind(token)
        .fetch_optional(pool)
        .await?;
    Ok(user_id)
}

/// Returns whether a session was removed
pub async fn delete_session(pool: &SqlitePool, token: &str) -> Result<bool> {
    let result = sqlx::query("DELETE FROM sessions WHERE token = ?")
        .bind(token)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}
