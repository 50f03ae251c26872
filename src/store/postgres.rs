use async_trait::async_trait;
use sqlx::{postgres::PgPoolOptions, PgPool};
use std::time::Duration;
use tracing::info;
use uuid::Uuid;

use crate::config;
use crate::store::{StoreError, Todo, TodoPatch, TodoStore, User, UserStore};

/// Connect a pool using the configured limits.
pub async fn connect(database_url: &str) -> Result<PgPool, StoreError> {
    let db = &config::config().database;

    let pool = PgPoolOptions::new()
        .max_connections(db.max_connections)
        .acquire_timeout(Duration::from_secs(db.connection_timeout))
        .connect(database_url)
        .await?;

    info!("Created database pool");
    Ok(pool)
}

/// Create the backing tables if they do not exist yet.
///
/// `tokens` is a text[] so that push/remove are single atomic statements
/// (array_append/array_remove); the store is the only serialization point.
pub async fn ensure_schema(pool: &PgPool) -> Result<(), StoreError> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id            UUID PRIMARY KEY,
            email         TEXT NOT NULL UNIQUE,
            password_hash TEXT NOT NULL,
            tokens        TEXT[] NOT NULL DEFAULT '{}',
            created_at    TIMESTAMPTZ NOT NULL,
            updated_at    TIMESTAMPTZ NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS todos (
            id           UUID PRIMARY KEY,
            text         TEXT NOT NULL,
            completed    BOOLEAN NOT NULL DEFAULT FALSE,
            completed_at TIMESTAMPTZ,
            creator_id   UUID NOT NULL REFERENCES users (id),
            created_at   TIMESTAMPTZ NOT NULL,
            updated_at   TIMESTAMPTZ NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn insert(&self, user: User) -> Result<User, StoreError> {
        sqlx::query(
            "INSERT INTO users (id, email, password_hash, tokens, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(user.id)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.tokens)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                StoreError::Duplicate(format!("email {} is already registered", user.email))
            }
            other => StoreError::Sqlx(other),
        })?;

        Ok(user)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    async fn push_token(&self, id: Uuid, token: &str) -> Result<(), StoreError> {
        sqlx::query(
            "UPDATE users SET tokens = array_append(tokens, $2), updated_at = now() WHERE id = $1",
        )
        .bind(id)
        .bind(token)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn remove_token(&self, id: Uuid, token: &str) -> Result<(), StoreError> {
        sqlx::query(
            "UPDATE users SET tokens = array_remove(tokens, $2), updated_at = now() WHERE id = $1",
        )
        .bind(id)
        .bind(token)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

pub struct PgTodoStore {
    pool: PgPool,
}

impl PgTodoStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TodoStore for PgTodoStore {
    async fn insert(&self, todo: Todo) -> Result<Todo, StoreError> {
        sqlx::query(
            "INSERT INTO todos (id, text, completed, completed_at, creator_id, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(todo.id)
        .bind(&todo.text)
        .bind(todo.completed)
        .bind(todo.completed_at)
        .bind(todo.creator_id)
        .bind(todo.created_at)
        .bind(todo.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(todo)
    }

    async fn list_for_owner(&self, owner: Uuid) -> Result<Vec<Todo>, StoreError> {
        let todos = sqlx::query_as::<_, Todo>(
            "SELECT * FROM todos WHERE creator_id = $1 ORDER BY created_at",
        )
        .bind(owner)
        .fetch_all(&self.pool)
        .await?;

        Ok(todos)
    }

    async fn find_owned(&self, id: Uuid, owner: Uuid) -> Result<Option<Todo>, StoreError> {
        let todo = sqlx::query_as::<_, Todo>(
            "SELECT * FROM todos WHERE id = $1 AND creator_id = $2",
        )
        .bind(id)
        .bind(owner)
        .fetch_optional(&self.pool)
        .await?;

        Ok(todo)
    }

    async fn update_owned(
        &self,
        id: Uuid,
        owner: Uuid,
        patch: TodoPatch,
    ) -> Result<Option<Todo>, StoreError> {
        // Single statement so the ownership filter and the write are atomic
        let todo = sqlx::query_as::<_, Todo>(
            "UPDATE todos \
             SET text = COALESCE($3, text), completed = $4, completed_at = $5, updated_at = now() \
             WHERE id = $1 AND creator_id = $2 \
             RETURNING *",
        )
        .bind(id)
        .bind(owner)
        .bind(patch.text)
        .bind(patch.completed)
        .bind(patch.completed_at)
        .fetch_optional(&self.pool)
        .await?;

        Ok(todo)
    }

    async fn delete_owned(&self, id: Uuid, owner: Uuid) -> Result<Option<Todo>, StoreError> {
        let todo = sqlx::query_as::<_, Todo>(
            "DELETE FROM todos WHERE id = $1 AND creator_id = $2 RETURNING *",
        )
        .bind(id)
        .bind(owner)
        .fetch_optional(&self.pool)
        .await?;

        Ok(todo)
    }
}
