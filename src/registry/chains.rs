// SPDX-License-Identifier: MIT
//! Chain registry — the worker pool's shared work list.
//!
//! `pick_next_due` both selects a due chain and stamps its
//! `last_health_check` timestamp inside one critical section; that stamp is
//! the dispatch-once mechanism that keeps N workers from probing the same
//! chain concurrently.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::config::{ChainConfig, ChainsConfig, ConfigError, UsersConfig};

#[derive(Debug, Clone)]
pub struct ValidatorEntry {
    pub operator_address: String,
    pub watchers: Vec<String>,
    /// The validator's own node, probed directly when present.
    pub direct_rpc: Option<String>,
}

#[derive(Debug)]
struct ChainState {
    /// Ordered; the front is the preferred endpoint and the most recently
    /// healthy one is rotated there after each probe.
    rpc_endpoints: Vec<String>,
    last_health_check_utc: DateTime<Utc>,
}

/// Runtime state wrapping one enabled [`ChainConfig`].
#[derive(Debug)]
pub struct RegisteredChain {
    chain_name: String,
    chain_id: String,
    priority: bool,
    health_check_endpoints: Vec<String>,
    validators: Vec<ValidatorEntry>,
    state: RwLock<ChainState>,
}

impl RegisteredChain {
    fn from_config(config: &ChainConfig) -> Self {
        let mut validators: Vec<ValidatorEntry> = config
            .validators
            .values()
            .map(|v| ValidatorEntry {
                operator_address: v.operator_address.clone(),
                watchers: v.watchers.clone(),
                direct_rpc: v.direct_rpc.clone(),
            })
            .collect();
        // The source map is unordered; keep listings stable.
        validators.sort_by(|a, b| a.operator_address.cmp(&b.operator_address));

        Self {
            chain_name: config.chain_name.clone(),
            chain_id: config.chain_id.clone(),
            priority: config.priority,
            health_check_endpoints: config.health_check_rpc.clone(),
            validators,
            state: RwLock::new(ChainState {
                rpc_endpoints: config.rpc.clone(),
                // Epoch start: a fresh chain is immediately due.
                last_health_check_utc: DateTime::UNIX_EPOCH,
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.chain_name
    }

    pub fn chain_id(&self) -> &str {
        &self.chain_id
    }

    pub fn is_priority(&self) -> bool {
        self.priority
    }

    pub fn validators(&self) -> &[ValidatorEntry] {
        &self.validators
    }

    pub fn health_check_endpoints(&self) -> &[String] {
        &self.health_check_endpoints
    }

    /// Snapshot of the ordered endpoint list.
    pub fn rpc_endpoints(&self) -> Vec<String> {
        self.state.read().expect("chain lock poisoned").rpc_endpoints.clone()
    }

    /// Rotate the most recently healthy endpoint to the front.
    pub fn promote_endpoint(&self, endpoint: &str) {
        let mut state = self.state.write().expect("chain lock poisoned");
        if let Some(pos) = state.rpc_endpoints.iter().position(|e| e == endpoint) {
            if pos > 0 {
                let chosen = state.rpc_endpoints.remove(pos);
                state.rpc_endpoints.insert(0, chosen);
            }
        }
    }

    pub fn last_health_check(&self) -> DateTime<Utc> {
        self.state.read().expect("chain lock poisoned").last_health_check_utc
    }

    /// Claim this chain for a probe pass if it has not been checked within
    /// `min_age`. Check and stamp happen under one write lock, so exactly
    /// one of any number of concurrent claimants wins.
    pub fn try_claim(&self, min_age: Duration, now: DateTime<Utc>) -> bool {
        let min_age = chrono::Duration::from_std(min_age).unwrap_or(chrono::Duration::MAX);
        let mut state = self.state.write().expect("chain lock poisoned");
        if now - state.last_health_check_utc >= min_age {
            state.last_health_check_utc = now;
            true
        } else {
            false
        }
    }
}

#[derive(Default)]
struct ChainsIndex {
    by_name: HashMap<String, Arc<RegisteredChain>>,
    /// watcher identity → chain name → operator addresses.
    by_watcher: HashMap<String, HashMap<String, Vec<String>>>,
}

/// Registry of enabled chains, replaced wholesale on each successful reload.
#[derive(Default)]
pub struct ChainRegistry {
    inner: RwLock<ChainsIndex>,
}

impl ChainRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate the incoming config set against `users` and atomically
    /// replace the chain map and the watcher reverse index. Disabled chains
    /// are dropped. In-flight probe passes keep the snapshots they already
    /// hold.
    pub fn update(&self, chains: ChainsConfig, users: &UsersConfig) -> Result<(), ConfigError> {
        crate::config::validate_chains_config(&chains, users)?;

        let mut index = ChainsIndex::default();
        for config in &chains {
            if config.disable {
                continue;
            }
            let chain = Arc::new(RegisteredChain::from_config(config));
            for validator in chain.validators() {
                for watcher in &validator.watchers {
                    index
                        .by_watcher
                        .entry(watcher.clone())
                        .or_default()
                        .entry(chain.name().to_string())
                        .or_default()
                        .push(validator.operator_address.clone());
                }
            }
            index.by_name.insert(config.chain_name.clone(), chain);
        }

        *self.inner.write().expect("chain registry lock poisoned") = index;
        Ok(())
    }

    /// Select the first chain whose last check is older than `min_age` and
    /// stamp it to now in the same step. Iteration order is unspecified.
    pub fn pick_next_due(&self, min_age: Duration) -> Option<Arc<RegisteredChain>> {
        let now = Utc::now();
        let inner = self.inner.read().expect("chain registry lock poisoned");
        inner
            .by_name
            .values()
            .find(|chain| chain.try_claim(min_age, now))
            .cloned()
    }

    pub fn get(&self, chain_name: &str) -> Option<Arc<RegisteredChain>> {
        self.inner
            .read()
            .expect("chain registry lock poisoned")
            .by_name
            .get(chain_name)
            .cloned()
    }

    pub fn has_chain(&self, chain_name: &str) -> bool {
        self.inner
            .read()
            .expect("chain registry lock poisoned")
            .by_name
            .contains_key(chain_name)
    }

    /// Snapshot of all registered chains.
    pub fn all(&self) -> Vec<Arc<RegisteredChain>> {
        self.inner
            .read()
            .expect("chain registry lock poisoned")
            .by_name
            .values()
            .cloned()
            .collect()
    }

    /// chain name → operator addresses the identity watches.
    pub fn watched_by(&self, identity: &str) -> HashMap<String, Vec<String>> {
        self.inner
            .read()
            .expect("chain registry lock poisoned")
            .by_watcher
            .get(identity)
            .cloned()
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ChainValidatorConfig;

    const VALOPER: &str = "cosmosvaloper1sjllsnramtg3ewxqwwrwjxfgc4n4ef9u2lcnj0";

    fn users() -> UsersConfig {
        let mut config: UsersConfig = serde_yaml::from_str(
            r#"
users:
  alice:
    root: true
    telegram: {username: alice, id: 1001, token: t}
"#,
        )
        .unwrap();
        for (identity, record) in config.users.iter_mut() {
            record.identity = identity.clone();
        }
        config
    }

    fn chain_config(name: &str, disabled: bool) -> ChainConfig {
        let mut validators = HashMap::new();
        validators.insert(
            VALOPER.to_string(),
            ChainValidatorConfig {
                operator_address: VALOPER.to_string(),
                watchers: vec!["alice".to_string()],
                direct_rpc: None,
            },
        );
        ChainConfig {
            chain_name: name.to_string(),
            chain_id: format!("{name}-1"),
            disable: disabled,
            priority: false,
            rpc: vec!["http://a:26657".to_string(), "http://b:26657".to_string()],
            health_check_rpc: vec![],
            validators,
        }
    }

    #[test]
    fn update_drops_disabled_chains_and_builds_watcher_index() {
        let registry = ChainRegistry::new();
        registry
            .update(
                vec![chain_config("gaia", false), chain_config("parked", true)],
                &users(),
            )
            .unwrap();

        assert!(registry.has_chain("gaia"));
        assert!(!registry.has_chain("parked"));

        let watched = registry.watched_by("alice");
        assert_eq!(watched.get("gaia").unwrap(), &vec![VALOPER.to_string()]);
    }

    #[test]
    fn pick_next_due_claims_each_chain_once() {
        let registry = ChainRegistry::new();
        registry.update(vec![chain_config("gaia", false)], &users()).unwrap();

        let min_age = Duration::from_secs(30);
        let first = registry.pick_next_due(min_age);
        assert!(first.is_some());
        // Stamped by the claim — not due again.
        assert!(registry.pick_next_due(min_age).is_none());
    }

    #[test]
    fn concurrent_claims_hand_out_each_chain_to_one_winner() {
        let registry = Arc::new(ChainRegistry::new());
        registry.update(vec![chain_config("gaia", false)], &users()).unwrap();

        let mut handles = Vec::new();
        for _ in 0..8 {
            let registry = registry.clone();
            handles.push(std::thread::spawn(move || {
                registry.pick_next_due(Duration::from_secs(30)).is_some()
            }));
        }
        let winners = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|&won| won)
            .count();
        assert_eq!(winners, 1);
    }

    #[test]
    fn promote_endpoint_rotates_to_front() {
        let registry = ChainRegistry::new();
        registry.update(vec![chain_config("gaia", false)], &users()).unwrap();
        let chain = registry.get("gaia").unwrap();

        chain.promote_endpoint("http://b:26657");
        assert_eq!(
            chain.rpc_endpoints(),
            vec!["http://b:26657".to_string(), "http://a:26657".to_string()]
        );

        // Promoting an unknown endpoint is a no-op.
        chain.promote_endpoint("http://zzz:26657");
        assert_eq!(chain.rpc_endpoints().len(), 2);
    }

    #[test]
    fn reload_swaps_the_chain_set() {
        let registry = ChainRegistry::new();
        registry.update(vec![chain_config("gaia", false)], &users()).unwrap();
        registry.update(vec![chain_config("osmosis", false)], &users()).unwrap();

        assert!(!registry.has_chain("gaia"));
        assert!(registry.has_chain("osmosis"));
    }
}
