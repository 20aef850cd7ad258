// SPDX-License-Identifier: MIT
//! Alert deduplication over sliding windows.
//!
//! One last-sent timestamp per (case, user identity). The filter and the
//! stamp are a single atomic step, so two workers probing the same chain at
//! once cannot both get through for the same user.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use chrono::{DateTime, Utc};

/// Closed set of alert conditions that are rate limited per user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AlertCase {
    Tombstoned,
    Jailed,
    LowUptime,
    MissedBlocksDanger,
    DirectRpcFail,
    ManagedRpcFail,
    GovVote,
}

#[derive(Default)]
pub struct AlertThrottle {
    last_sent: Mutex<HashMap<AlertCase, HashMap<String, DateTime<Utc>>>>,
}

impl AlertThrottle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the subset of `identities` whose last `case` alert is absent
    /// or older than `min_interval`, stamping each returned identity to now.
    pub fn filter_allowed(
        &self,
        case: AlertCase,
        identities: &[String],
        min_interval: Duration,
    ) -> Vec<String> {
        self.filter_allowed_at(case, identities, min_interval, Utc::now())
    }

    /// Clock-injected variant backing [`Self::filter_allowed`].
    pub fn filter_allowed_at(
        &self,
        case: AlertCase,
        identities: &[String],
        min_interval: Duration,
        now: DateTime<Utc>,
    ) -> Vec<String> {
        let min_interval =
            chrono::Duration::from_std(min_interval).unwrap_or(chrono::Duration::MAX);

        let mut map = self.last_sent.lock().expect("throttle lock poisoned");
        let per_case = map.entry(case).or_default();

        let mut allowed = Vec::new();
        for identity in identities {
            let recent = per_case
                .get(identity)
                .is_some_and(|last| now - *last < min_interval);
            if recent {
                continue;
            }
            per_case.insert(identity.clone(), now);
            allowed.push(identity.clone());
        }
        allowed
    }
}
