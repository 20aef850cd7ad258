// SPDX-License-Identifier: MIT
//! Governance sweep cache.
//!
//! Per-chain throttle for the proposal sweep plus an additive record of the
//! highest proposal id each validator is known to have voted on, so
//! confirmed votes are never queried twice.

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::Duration;

use chrono::{DateTime, Utc};

#[derive(Default)]
struct GovState {
    last_check_by_chain: HashMap<String, DateTime<Utc>>,
    highest_voted_by_valoper: HashMap<String, u64>,
}

#[derive(Default)]
pub struct GovCache {
    inner: RwLock<GovState>,
}

impl GovCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim a governance sweep for `chain_name` if the previous one is
    /// older than `interval`. Check and stamp are one atomic step.
    pub fn should_check(&self, chain_name: &str, interval: Duration) -> bool {
        self.should_check_at(chain_name, interval, Utc::now())
    }

    pub fn should_check_at(&self, chain_name: &str, interval: Duration, now: DateTime<Utc>) -> bool {
        let interval = chrono::Duration::from_std(interval).unwrap_or(chrono::Duration::MAX);
        let mut state = self.inner.write().expect("gov cache lock poisoned");
        let due = state
            .last_check_by_chain
            .get(chain_name)
            .map(|last| now - *last >= interval)
            .unwrap_or(true);
        if due {
            state.last_check_by_chain.insert(chain_name.to_string(), now);
        }
        due
    }

    /// Record a confirmed vote; only ever raises the stored id.
    pub fn mark_voted(&self, valoper: &str, proposal_id: u64) {
        let mut state = self.inner.write().expect("gov cache lock poisoned");
        let entry = state
            .highest_voted_by_valoper
            .entry(valoper.to_string())
            .or_insert(0);
        *entry = (*entry).max(proposal_id);
    }

    pub fn has_voted(&self, valoper: &str, proposal_id: u64) -> bool {
        self.inner
            .read()
            .expect("gov cache lock poisoned")
            .highest_voted_by_valoper
            .get(valoper)
            .is_some_and(|highest| *highest >= proposal_id)
    }
}
