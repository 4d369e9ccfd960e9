use async_trait::async_trait;
use sqlx::PgPool;
use thiserror::Error;

use crate::auth::repo_types::{NewUser, User};

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("username or email already exists")]
    Conflict,

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Access to the user table.
#[async_trait]
pub trait UserRepo: Send + Sync {
    async fn username_exists(&self, username: &str) -> Result<bool, RepoError>;
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, RepoError>;
    /// Inserts a user; a duplicate username or email yields `RepoError::Conflict`.
    async fn create(&self, new_user: NewUser) -> Result<User, RepoError>;
}

#[derive(Clone)]
pub struct PgUserRepo {
    db: PgPool,
}

impl PgUserRepo {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserRepo for PgUserRepo {
    async fn username_exists(&self, username: &str) -> Result<bool, RepoError> {
        let exists = sqlx::query_scalar::<_, bool>(
            r#"SELECT EXISTS (SELECT 1 FROM users WHERE username = $1)"#,
        )
        .bind(username)
        .fetch_one(&self.db)
        .await?;
        Ok(exists)
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, RepoError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, full_name, dob, email, username, password_hash, created_at
            FROM users
            WHERE username = $1
            "#,
        )
        .bind(username)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn create(&self, new_user: NewUser) -> Result<User, RepoError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (full_name, dob, email, username, password_hash)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, full_name, dob, email, username, password_hash, created_at
            "#,
        )
        .bind(&new_user.full_name)
        .bind(new_user.dob)
        .bind(&new_user.email)
        .bind(&new_user.username)
        .bind(&new_user.password_hash)
        .fetch_one(&self.db)
        .await
        .map_err(insert_error)?;
        Ok(user)
    }
}

/// Unique violations on `username` or `email` become `Conflict`.
fn insert_error(e: sqlx::Error) -> RepoError {
    if let sqlx::Error::Database(db_err) = &e {
        if db_err.is_unique_violation() {
            return RepoError::Conflict;
        }
    }
    RepoError::Database(e)
}
