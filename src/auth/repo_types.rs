use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::{Date, OffsetDateTime};
use uuid::Uuid;

/// User record in the database.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub full_name: String,
    pub dob: Date,
    pub email: String,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String, // bcrypt hash, not exposed in JSON
    pub created_at: OffsetDateTime,
}

/// Validated registration data ready for insert.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub full_name: String,
    pub dob: Date,
    pub email: String,
    pub username: String,
    pub password_hash: String,
}
