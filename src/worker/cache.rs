// SPDX-License-Identifier: MIT
//! Most recent derived view per validator, rendered by the `/last` command.

use std::collections::HashMap;
use std::sync::RwLock;

use chrono::{DateTime, Utc};

use crate::rpc::types::BondStatus;

#[derive(Debug, Clone)]
pub struct ValidatorSnapshot {
    pub valoper: String,
    pub valcons: String,
    pub moniker: String,
    /// Position in the bonded-first, stake-descending ordering; display only.
    pub rank: usize,
    pub bond_status: Option<BondStatus>,
    pub tombstoned: Option<bool>,
    pub jailed: Option<bool>,
    pub jailed_until: Option<DateTime<Utc>>,
    pub missed_blocks: Option<i64>,
    /// Misses the downtime window tolerates before slashing.
    pub allowed_misses: Option<i64>,
    pub uptime: Option<f64>,
    pub observed_at: DateTime<Utc>,
}

impl ValidatorSnapshot {
    pub fn new(valoper: &str) -> Self {
        Self {
            valoper: valoper.to_string(),
            valcons: String::new(),
            moniker: String::new(),
            rank: 0,
            bond_status: None,
            tombstoned: None,
            jailed: None,
            jailed_until: None,
            missed_blocks: None,
            allowed_misses: None,
            uptime: None,
            observed_at: DateTime::UNIX_EPOCH,
        }
    }
}

#[derive(Default)]
pub struct HealthCheckCache {
    by_valoper: RwLock<HashMap<String, ValidatorSnapshot>>,
}

impl HealthCheckCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store the snapshot, stamping `observed_at` to now.
    pub fn put(&self, mut snapshot: ValidatorSnapshot) {
        snapshot.observed_at = Utc::now();
        self.by_valoper
            .write()
            .expect("health cache lock poisoned")
            .insert(snapshot.valoper.clone(), snapshot);
    }

    pub fn get(&self, valoper: &str) -> Option<ValidatorSnapshot> {
        self.by_valoper
            .read()
            .expect("health cache lock poisoned")
            .get(valoper)
            .cloned()
    }
}
