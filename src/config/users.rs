// SPDX-License-Identifier: MIT
//! `users.yaml` — the people alerts are delivered to.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;

use super::{check_file_permission, ConfigError, USERS_FILE_NAME};

static IDENTITY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z\d_]+$").expect("static regex"));

/// Chat delivery coordinates for one user. The token keys a bot instance;
/// several users may share one token (one bot, many chats).
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct ChatConfig {
    pub username: String,
    pub id: i64,
    pub token: String,
}

impl ChatConfig {
    /// A config the daemon can actually deliver through.
    pub fn is_complete(&self) -> bool {
        !self.username.is_empty() && self.id != 0 && !self.token.is_empty()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct UserRecord {
    /// Filled from the map key after deserialisation.
    #[serde(skip)]
    pub identity: String,
    #[serde(default)]
    pub root: bool,
    #[serde(default, rename = "telegram")]
    pub chat: Option<ChatConfig>,
}

impl UserRecord {
    pub fn has_complete_chat(&self) -> bool {
        self.chat.as_ref().is_some_and(ChatConfig::is_complete)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.identity.is_empty() {
            return Err(ConfigError::Invalid("user identity is missing".into()));
        }
        if !IDENTITY.is_match(&self.identity) {
            return Err(ConfigError::Invalid(format!(
                "user identity {} must be alphanumeric and underscore only",
                self.identity
            )));
        }
        if let Some(chat) = &self.chat {
            if chat.username.is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "chat username for {} must be set",
                    self.identity
                )));
            }
            if !IDENTITY.is_match(&chat.username) {
                return Err(ConfigError::Invalid(format!(
                    "chat username for {} must be alphanumeric and underscore only",
                    self.identity
                )));
            }
            if chat.id == 0 {
                return Err(ConfigError::Invalid(format!(
                    "chat user id for {} must be set",
                    self.identity
                )));
            }
            if chat.token.is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "chat token for {} must be set",
                    self.identity
                )));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UsersConfig {
    #[serde(default)]
    pub users: HashMap<String, UserRecord>,
}

impl UsersConfig {
    /// Load and parse `users.yaml` from the home directory.
    pub fn load(home_dir: &Path) -> Result<Self, ConfigError> {
        let path = home_dir.join(USERS_FILE_NAME);
        if !path.exists() {
            return Err(ConfigError::Invalid(format!(
                "users file {} could not be found",
                path.display()
            )));
        }
        check_file_permission(&path)?;

        let raw = std::fs::read_to_string(&path)?;
        let mut config: UsersConfig = serde_yaml::from_str(&raw)?;
        for (identity, record) in config.users.iter_mut() {
            record.identity = identity.clone();
        }
        Ok(config)
    }

    pub fn get(&self, identity: &str) -> Option<&UserRecord> {
        self.users.get(identity)
    }

    /// Flatten into records (identity field populated).
    pub fn records(&self) -> Vec<UserRecord> {
        self.users.values().cloned().collect()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.users.is_empty() {
            return Err(ConfigError::Invalid("no user record".into()));
        }

        let mut usernames: HashSet<&str> = HashSet::new();
        let mut user_ids: HashSet<i64> = HashSet::new();
        let mut any_root = false;

        for record in self.users.values() {
            record.validate()?;
            any_root = any_root || record.root;
            if let Some(chat) = &record.chat {
                if !usernames.insert(&chat.username) {
                    return Err(ConfigError::Invalid(format!(
                        "duplicate chat username: {}",
                        chat.username
                    )));
                }
                if !user_ids.insert(chat.id) {
                    return Err(ConfigError::Invalid(format!(
                        "duplicate chat user id: {}",
                        chat.id
                    )));
                }
            }
        }

        if !any_root {
            return Err(ConfigError::Invalid("at least one root user is required".into()));
        }

        Ok(())
    }
}
