// SPDX-License-Identifier: MIT
//! Per-chat silence patterns.
//!
//! A chat can register substring patterns with a TTL; outgoing messages that
//! contain a live pattern are dropped at delivery time. Expired patterns are
//! cleaned lazily whenever a chat's set is touched.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use chrono::{DateTime, Utc};
use thiserror::Error;

pub const MIN_PATTERN_LENGTH: usize = 3;
pub const MAX_PATTERNS_PER_CHAT: usize = 50;

#[derive(Debug, Error)]
pub enum SilenceError {
    #[error("pattern must be at least {MIN_PATTERN_LENGTH} characters long, got: {0}")]
    PatternTooShort(usize),
    #[error("maximum {MAX_PATTERNS_PER_CHAT} patterns are allowed per chat, please wait for expiry first")]
    TooManyPatterns,
    #[error("missing pattern")]
    MissingPattern,
    #[error("no silence pattern is set for this chat")]
    NoPatterns,
    #[error("pattern does not exist")]
    UnknownPattern,
}

#[derive(Default)]
pub struct Silencer {
    patterns_by_chat: Mutex<HashMap<i64, HashMap<String, DateTime<Utc>>>>,
}

fn evict_expired(patterns: &mut HashMap<String, DateTime<Utc>>, now: DateTime<Utc>) {
    patterns.retain(|_, expiry| *expiry > now);
}

impl Silencer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `pattern` for `chat_id` with expiry `now + ttl`. Returns `true`
    /// when an unexpired entry was replaced (expiry refreshed).
    pub fn set_pattern(&self, chat_id: i64, pattern: &str, ttl: Duration) -> Result<bool, SilenceError> {
        self.set_pattern_at(chat_id, pattern, ttl, Utc::now())
    }

    pub fn set_pattern_at(
        &self,
        chat_id: i64,
        pattern: &str,
        ttl: Duration,
        now: DateTime<Utc>,
    ) -> Result<bool, SilenceError> {
        let pattern = pattern.trim();
        if pattern.len() < MIN_PATTERN_LENGTH {
            return Err(SilenceError::PatternTooShort(pattern.len()));
        }

        let mut map = self.patterns_by_chat.lock().expect("silencer lock poisoned");
        let patterns = map.entry(chat_id).or_default();
        evict_expired(patterns, now);

        if patterns.len() >= MAX_PATTERNS_PER_CHAT && !patterns.contains_key(pattern) {
            return Err(SilenceError::TooManyPatterns);
        }

        let expiry = now + chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::MAX);
        let replaced = patterns.insert(pattern.to_string(), expiry).is_some();
        Ok(replaced)
    }

    pub fn remove_pattern(&self, chat_id: i64, pattern: &str) -> Result<(), SilenceError> {
        let pattern = pattern.trim();
        if pattern.is_empty() {
            return Err(SilenceError::MissingPattern);
        }

        let mut map = self.patterns_by_chat.lock().expect("silencer lock poisoned");
        let patterns = map.get_mut(&chat_id).ok_or(SilenceError::NoPatterns)?;
        if patterns.remove(pattern).is_none() {
            return Err(SilenceError::UnknownPattern);
        }
        Ok(())
    }

    /// Snapshot of the chat's live (unexpired) patterns with expiries.
    pub fn patterns(&self, chat_id: i64) -> Vec<(String, DateTime<Utc>)> {
        self.patterns_at(chat_id, Utc::now())
    }

    pub fn patterns_at(&self, chat_id: i64, now: DateTime<Utc>) -> Vec<(String, DateTime<Utc>)> {
        let map = self.patterns_by_chat.lock().expect("silencer lock poisoned");
        let Some(patterns) = map.get(&chat_id) else {
            return Vec::new();
        };
        let mut live: Vec<(String, DateTime<Utc>)> = patterns
            .iter()
            .filter(|(_, expiry)| **expiry > now)
            .map(|(p, e)| (p.clone(), *e))
            .collect();
        live.sort_by(|a, b| a.0.cmp(&b.0));
        live
    }

    /// Whether any live pattern of the chat is a substring of `text`.
    /// Expired entries encountered on the way are cleaned up.
    pub fn is_silenced(&self, chat_id: i64, text: &str) -> bool {
        self.is_silenced_at(chat_id, text, Utc::now())
    }

    pub fn is_silenced_at(&self, chat_id: i64, text: &str, now: DateTime<Utc>) -> bool {
        let mut map = self.patterns_by_chat.lock().expect("silencer lock poisoned");
        let Some(patterns) = map.get_mut(&chat_id) else {
            return false;
        };
        evict_expired(patterns, now);
        patterns.keys().any(|pattern| text.contains(pattern.as_str()))
    }
}
