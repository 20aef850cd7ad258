// SPDX-License-Identifier: MIT
//! Pause registry — operator-driven mute windows for chains and validators.
//!
//! "Paused" means an entry exists AND its expiry is in the future; expired
//! entries are simply overridden by time, no sweeper needed.

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::Duration;

use chrono::{DateTime, Utc};

#[derive(Default)]
struct PauseState {
    chains: HashMap<String, DateTime<Utc>>,
    validators: HashMap<String, DateTime<Utc>>,
}

#[derive(Default)]
pub struct PauseRegistry {
    inner: RwLock<PauseState>,
}

fn expiry_after(duration: Duration) -> DateTime<Utc> {
    Utc::now() + chrono::Duration::from_std(duration).unwrap_or(chrono::Duration::MAX)
}

fn check(map: &HashMap<String, DateTime<Utc>>, key: &str) -> (bool, Option<DateTime<Utc>>) {
    match map.get(key) {
        Some(expiry) if *expiry > Utc::now() => (true, Some(*expiry)),
        _ => (false, None),
    }
}

impl PauseRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pause_chain(&self, chain_name: &str, duration: Duration) -> DateTime<Utc> {
        let expiry = expiry_after(duration);
        self.inner
            .write()
            .expect("pause lock poisoned")
            .chains
            .insert(chain_name.to_string(), expiry);
        expiry
    }

    pub fn unpause_chain(&self, chain_name: &str) {
        self.inner
            .write()
            .expect("pause lock poisoned")
            .chains
            .remove(chain_name);
    }

    /// Returns the paused flag together with the expiry so callers can
    /// render it.
    pub fn is_chain_paused(&self, chain_name: &str) -> (bool, Option<DateTime<Utc>>) {
        check(&self.inner.read().expect("pause lock poisoned").chains, chain_name)
    }

    pub fn pause_validator(&self, valoper: &str, duration: Duration) -> DateTime<Utc> {
        let expiry = expiry_after(duration);
        self.inner
            .write()
            .expect("pause lock poisoned")
            .validators
            .insert(valoper.to_string(), expiry);
        expiry
    }

    pub fn unpause_validator(&self, valoper: &str) {
        self.inner
            .write()
            .expect("pause lock poisoned")
            .validators
            .remove(valoper);
    }

    pub fn is_validator_paused(&self, valoper: &str) -> (bool, Option<DateTime<Utc>>) {
        check(
            &self.inner.read().expect("pause lock poisoned").validators,
            valoper,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pause_then_unpause_chain() {
        let registry = PauseRegistry::new();
        assert_eq!(registry.is_chain_paused("gaia"), (false, None));

        let expiry = registry.pause_chain("gaia", Duration::from_secs(600));
        let (paused, stored) = registry.is_chain_paused("gaia");
        assert!(paused);
        assert_eq!(stored, Some(expiry));

        registry.unpause_chain("gaia");
        assert_eq!(registry.is_chain_paused("gaia"), (false, None));
    }

    #[test]
    fn expired_pause_reads_as_unpaused() {
        let registry = PauseRegistry::new();
        registry.pause_validator("cosmosvaloper1xyz", Duration::ZERO);
        let (paused, expiry) = registry.is_validator_paused("cosmosvaloper1xyz");
        assert!(!paused);
        assert!(expiry.is_none());
    }

    #[test]
    fn chain_and_validator_pauses_are_independent() {
        let registry = PauseRegistry::new();
        registry.pause_chain("gaia", Duration::from_secs(60));
        assert!(!registry.is_validator_paused("gaia").0);
    }
}
