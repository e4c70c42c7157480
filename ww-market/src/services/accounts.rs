//! Email/password accounts and bearer sessions
//!
//! Passwords are stored as hex SHA-256 of `salt || password` with a random
//! per-user salt. Sessions are opaque random tokens with no expiry; signing
//! out deletes the row.

use chrono::Utc;
use rand::RngCore;
use serde::Serialize;
use sha2::{Digest, Sha256};
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

use crate::db::accounts::{self as account_db, UserRecord};

const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Error)]
pub enum AccountError {
    #[error("Invalid email address")]
    InvalidEmail,

    #[error("Password must be at least {0} characters")]
    WeakPassword(usize),

    #[error("An account already exists for {0}")]
    EmailTaken(String),

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error(transparent)]
    Store(#[from] ww_common::Error),
}

/// Signed-in user and the token that identifies them
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub token: String,
    pub user_id: String,
    pub email: String,
}

#[derive(Clone)]
pub struct Accounts {
    db: SqlitePool,
}

fn random_hex(len: usize) -> String {
    let mut bytes = vec![0u8; len];
    rand::thread_rng().fill_bytes(&mut bytes);
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

fn hash_password(salt: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    format!("{:x}", hasher.finalize())
}

fn normalize_email(email: &str) -> Result<String, AccountError> {
    let email = email.trim().to_lowercase();
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => Ok(email),
        _ => Err(AccountError::InvalidEmail),
    }
}

impl Accounts {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Register and sign in
    pub async fn sign_up(&self, email: &str, password: &str) -> Result<Session, AccountError> {
        let email = normalize_email(email)?;
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AccountError::WeakPassword(MIN_PASSWORD_LEN));
        }

        let salt = random_hex(16);
        let user = UserRecord {
            id: Uuid::new_v4().to_string(),
            email: email.clone(),
            password_hash: hash_password(&salt, password),
            salt,
            created_at: Utc::now().to_rfc3339(),
        };
        if !account_db::insert_user(&self.db, &user).await? {
            return Err(AccountError::EmailTaken(email));
        }

        info!(user_id = %user.id, "Account created");
        self.open_session(user).await
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Session, AccountError> {
        let email = normalize_email(email).map_err(|_| AccountError::InvalidCredentials)?;
        let user = account_db::find_user_by_email(&self.db, &email)
            .await?
            .ok_or(AccountError::InvalidCredentials)?;

        if hash_password(&user.salt, password) != user.password_hash {
            debug!(user_id = %user.id, "Password mismatch");
            return Err(AccountError::InvalidCredentials);
        }
        self.open_session(user).await
    }

    /// Returns whether the token named a live session
    pub async fn sign_out(&self, token: &str) -> Result<bool, AccountError> {
        let removed = account_db::delete_session(&self.db, token).await?;
        if removed {
            info!("Session closed");
        }
        Ok(removed)
    }

    /// User id for a bearer token
    pub async fn resolve_session(&self, token: &str) -> Result<Option<String>, AccountError> {
        Ok(account_db::session_user(&self.db, token).await?)
    }

    async fn open_session(&self, user: UserRecord) -> Result<Session, AccountError> {
        let token = random_hex(32);
        account_db::insert_session(&self.db, &token, &user.id, &Utc::now().to_rfc3339())
            .await?;
        info!(user_id = %user.id, "Signed in");
        Ok(Session {
            token,
            user_id: user.id,
            email: user.email,
        })
    }
}
