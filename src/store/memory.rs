use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::store::{StoreError, Todo, TodoPatch, TodoStore, User, UserStore};

/// In-process store backend.
///
/// Used for development without a DATABASE_URL and for the integration
/// tests. Each operation takes the lock once, so single-record semantics
/// stay atomic like their SQL counterparts.
#[derive(Default)]
pub struct MemoryStore {
    users: RwLock<HashMap<Uuid, User>>,
    todos: RwLock<HashMap<Uuid, Todo>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn insert(&self, user: User) -> Result<User, StoreError> {
        let mut users = self.users.write().await;

        if users.values().any(|u| u.email == user.email) {
            return Err(StoreError::Duplicate(format!(
                "email {} is already registered",
                user.email
            )));
        }

        users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        Ok(self
            .users
            .read()
            .await
            .values()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn push_token(&self, id: Uuid, token: &str) -> Result<(), StoreError> {
        let mut users = self.users.write().await;
        if let Some(user) = users.get_mut(&id) {
            user.tokens.push(token.to_string());
            user.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn remove_token(&self, id: Uuid, token: &str) -> Result<(), StoreError> {
        let mut users = self.users.write().await;
        if let Some(user) = users.get_mut(&id) {
            user.tokens.retain(|t| t != token);
            user.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[async_trait]
impl TodoStore for MemoryStore {
    async fn insert(&self, todo: Todo) -> Result<Todo, StoreError> {
        self.todos.write().await.insert(todo.id, todo.clone());
        Ok(todo)
    }

    async fn list_for_owner(&self, owner: Uuid) -> Result<Vec<Todo>, StoreError> {
        let mut todos: Vec<Todo> = self
            .todos
            .read()
            .await
            .values()
            .filter(|t| t.creator_id == owner)
            .cloned()
            .collect();

        todos.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(todos)
    }

    async fn find_owned(&self, id: Uuid, owner: Uuid) -> Result<Option<Todo>, StoreError> {
        Ok(self
            .todos
            .read()
            .await
            .get(&id)
            .filter(|t| t.creator_id == owner)
            .cloned())
    }

    async fn update_owned(
        &self,
        id: Uuid,
        owner: Uuid,
        patch: TodoPatch,
    ) -> Result<Option<Todo>, StoreError> {
        let mut todos = self.todos.write().await;

        let Some(todo) = todos.get_mut(&id).filter(|t| t.creator_id == owner) else {
            return Ok(None);
        };

        if let Some(text) = patch.text {
            todo.text = text;
        }
        todo.completed = patch.completed;
        todo.completed_at = patch.completed_at;
        todo.updated_at = Utc::now();

        Ok(Some(todo.clone()))
    }

    async fn delete_owned(&self, id: Uuid, owner: Uuid) -> Result<Option<Todo>, StoreError> {
        let mut todos = self.todos.write().await;

        match todos.get(&id) {
            Some(t) if t.creator_id == owner => Ok(todos.remove(&id)),
            _ => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn duplicate_email_is_rejected() {
        let store = MemoryStore::new();
        let user = User::new("a@example.com".into(), "hash".into());
        UserStore::insert(&store, user).await.unwrap();

        let dup = User::new("a@example.com".into(), "other".into());
        assert!(matches!(
            UserStore::insert(&store, dup).await,
            Err(StoreError::Duplicate(_))
        ));
    }

    #[tokio::test]
    async fn owned_operations_ignore_other_owners() {
        let store = MemoryStore::new();
        let owner = Uuid::new_v4();
        let stranger = Uuid::new_v4();
        let todo = TodoStore::insert(&store, Todo::new("walk dog".into(), owner))
            .await
            .unwrap();

        assert!(store.find_owned(todo.id, stranger).await.unwrap().is_none());
        assert!(store
            .update_owned(todo.id, stranger, TodoPatch::default())
            .await
            .unwrap()
            .is_none());
        assert!(store.delete_owned(todo.id, stranger).await.unwrap().is_none());

        // Still there for the real owner
        assert!(store.find_owned(todo.id, owner).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn remove_token_only_drops_matching_token() {
        let store = MemoryStore::new();
        let user = UserStore::insert(&store, User::new("b@example.com".into(), "hash".into()))
            .await
            .unwrap();

        store.push_token(user.id, "tok-1").await.unwrap();
        store.push_token(user.id, "tok-2").await.unwrap();
        store.remove_token(user.id, "tok-1").await.unwrap();

        let user = store.find_by_id(user.id).await.unwrap().unwrap();
        assert_eq!(user.tokens, vec!["tok-2".to_string()]);
    }
}
