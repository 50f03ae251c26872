use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    /// Argon2id PHC string. Never leaves the process in a response body.
    #[serde(skip_serializing)]
    pub password_hash: String,
    /// Active session tokens, newest last. Membership here is the
    /// revocation check: logout removes the token from this list even
    /// though its signature would still verify.
    #[serde(skip_serializing)]
    pub tokens: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn new(email: String, password_hash: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            email,
            password_hash,
            tokens: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }
}
