// SPDX-License-Identifier: MIT
//! User registry — identity and chat-user-id lookups.

use std::collections::HashMap;
use std::sync::RwLock;

use crate::config::{ConfigError, UsersConfig};

#[derive(Default)]
struct UsersIndex {
    by_identity: HashMap<String, crate::config::UserRecord>,
    by_chat_user_id: HashMap<i64, String>,
}

#[derive(Default)]
pub struct UserRegistry {
    inner: RwLock<UsersIndex>,
}

impl UserRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate and atomically replace both indices.
    pub fn update(&self, users: &UsersConfig) -> Result<(), ConfigError> {
        users.validate()?;

        let mut index = UsersIndex::default();
        for record in users.records() {
            if let Some(chat) = &record.chat {
                index.by_chat_user_id.insert(chat.id, record.identity.clone());
            }
            index.by_identity.insert(record.identity.clone(), record);
        }

        *self.inner.write().expect("user registry lock poisoned") = index;
        Ok(())
    }

    pub fn by_identity(&self, identity: &str) -> Option<crate::config::UserRecord> {
        self.inner
            .read()
            .expect("user registry lock poisoned")
            .by_identity
            .get(identity)
            .cloned()
    }

    pub fn by_chat_user_id(&self, chat_user_id: i64) -> Option<crate::config::UserRecord> {
        let inner = self.inner.read().expect("user registry lock poisoned");
        let identity = inner.by_chat_user_id.get(&chat_user_id)?;
        inner.by_identity.get(identity).cloned()
    }

    pub fn root_identities(&self) -> Vec<String> {
        self.inner
            .read()
            .expect("user registry lock poisoned")
            .by_identity
            .values()
            .filter(|r| r.root)
            .map(|r| r.identity.clone())
            .collect()
    }
}
