use std::collections::BTreeMap;

use axum::async_trait;
use tokio::sync::RwLock;

use crate::users::{
    repo::{StoreError, UserStore},
    repo_types::{NewUser, User, UserChanges},
};

#[derive(Debug)]
struct Table {
    next_id: i64,
    rows: BTreeMap<i64, User>,
}

impl Default for Table {
    fn default() -> Self {
        Self {
            next_id: 1,
            rows: BTreeMap::new(),
        }
    }
}

/// In-process user table, selected with a `memory://` database URL.
#[derive(Debug, Default)]
pub struct MemoryUserStore {
    table: RwLock<Table>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn create(&self, new: NewUser) -> Result<User, StoreError> {
        let mut table = self.table.write().await;
        let id = match new.id {
            Some(id) if table.rows.contains_key(&id) => return Err(StoreError::AlreadyExists(id)),
            Some(id) => id,
            None => table.next_id,
        };
        let after = id.checked_add(1).ok_or(StoreError::IdsExhausted)?;
        table.next_id = table.next_id.max(after);

        let user = User {
            id,
            username: new.username,
            email: new.email,
            fullname: new.fullname,
            password: None,
        };
        table.rows.insert(id, user.clone());
        Ok(user)
    }

    async fn get(&self, id: i64) -> Result<Option<User>, StoreError> {
        Ok(self.table.read().await.rows.get(&id).cloned())
    }

    async fn list(&self) -> Result<Vec<User>, StoreError> {
        Ok(self.table.read().await.rows.values().cloned().collect())
    }

    async fn update(&self, id: i64, changes: UserChanges) -> Result<User, StoreError> {
        let mut table = self.table.write().await;
        let user = table.rows.get_mut(&id).ok_or(StoreError::NotFound(id))?;
        changes.apply(user);
        Ok(user.clone())
    }

    async fn set_password(&self, id: i64, hashed: &str) -> Result<User, StoreError> {
        let mut table = self.table.write().await;
        let user = table.rows.get_mut(&id).ok_or(StoreError::NotFound(id))?;
        user.password = Some(hashed.to_owned());
        Ok(user.clone())
    }

    async fn delete(&self, id: i64) -> Result<(), StoreError> {
        self.table
            .write()
            .await
            .rows
            .remove(&id)
            .map(|_| ())
            .ok_or(StoreError::NotFound(id))
    }

    async fn reset(&self) -> Result<(), StoreError> {
        *self.table.write().await = Table::default();
        Ok(())
    }
}
