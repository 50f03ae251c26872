use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

pub mod memory;
pub mod models;
pub mod postgres;

pub use memory::MemoryStore;
pub use models::{Todo, User};

/// Errors surfaced by store backends
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("duplicate value: {0}")]
    Duplicate(String),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("query error: {0}")]
    Query(String),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

/// Allow-listed update for a single todo, produced by the PATCH handler.
///
/// `completed`/`completed_at` are written unconditionally on every update
/// (overwrite, never merge); `text` is only written when present.
#[derive(Debug, Clone, Default)]
pub struct TodoPatch {
    pub text: Option<String>,
    pub completed: bool,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Credential store: user records plus their active session token lists.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Insert a new user. A taken email yields [`StoreError::Duplicate`].
    async fn insert(&self, user: User) -> Result<User, StoreError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError>;

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    /// Append a session token to the user's active-token list.
    async fn push_token(&self, id: Uuid, token: &str) -> Result<(), StoreError>;

    /// Remove one session token from the user's active-token list. Removing
    /// a token that is not present is not an error.
    async fn remove_token(&self, id: Uuid, token: &str) -> Result<(), StoreError>;

    /// Backend liveness probe for the health endpoint.
    async fn ping(&self) -> Result<(), StoreError>;
}

/// Resource store: todos, each owned by exactly one user.
///
/// Every single-record operation filters by `(id, creator_id)` in the same
/// store query. Fetching by id alone and checking ownership afterwards is
/// not offered, so a non-owner can never observe that a record exists.
#[async_trait]
pub trait TodoStore: Send + Sync {
    async fn insert(&self, todo: Todo) -> Result<Todo, StoreError>;

    async fn list_for_owner(&self, owner: Uuid) -> Result<Vec<Todo>, StoreError>;

    async fn find_owned(&self, id: Uuid, owner: Uuid) -> Result<Option<Todo>, StoreError>;

    async fn update_owned(
        &self,
        id: Uuid,
        owner: Uuid,
        patch: TodoPatch,
    ) -> Result<Option<Todo>, StoreError>;

    async fn delete_owned(&self, id: Uuid, owner: Uuid) -> Result<Option<Todo>, StoreError>;
}
