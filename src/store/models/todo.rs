use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Todo {
    pub id: Uuid,
    pub text: String,
    pub completed: bool,
    pub completed_at: Option<DateTime<Utc>>,
    /// Owning user id, immutable after creation
    pub creator_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Todo {
    pub fn new(text: String, creator_id: Uuid) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            text,
            completed: false,
            completed_at: None,
            creator_id,
            created_at: now,
            updated_at: now,
        }
    }
}
