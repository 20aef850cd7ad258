// SPDX-License-Identifier: MIT
//! Health-check worker pool — the probing core of the daemon.
//!
//! N identical workers share the chain registry; each pulls the next due
//! chain (the registry stamps it inside the same critical section, so a
//! chain is probed by at most one worker at a time) and runs a full probe
//! pass: select the healthiest RPC endpoint, fetch the staking and slashing
//! state, evaluate every subscribed validator, probe the validators' own
//! nodes and the operator's managed nodes, and sweep governance proposals.
//! Workers hold no state of their own across passes — everything shared
//! lives in the registries, the caches, the anti-spam tracker and the push
//! queue, which is what lets N of them compose.

pub mod alerts;
pub mod cache;
pub mod gov;

pub use cache::{HealthCheckCache, ValidatorSnapshot};
pub use gov::GovCache;

use std::collections::{BTreeSet, HashMap};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context};
use chrono::Utc;
use futures_util::FutureExt;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::address::{
    account_address_from_valoper, consensus_address_from_ed25519, encode_consensus_address,
    valcons_hrp_from_valoper,
};
use crate::push::AlertCase;
use crate::registry::{RegisteredChain, ValidatorEntry};
use crate::retry::retry_default;
use crate::rpc::types::{BondStatus, SlashingParams, Validator, ValidatorSigningInfo};
use crate::rpc::{
    fetch_all_signing_infos, fetch_all_validators, fetch_has_voted, fetch_slashing_params,
    fetch_voting_proposals, NodeClient, NodeStatus,
};
use crate::AppContext;
use alerts::AlertSink;

const IDLE_SLEEP: Duration = Duration::from_millis(30);

/// Chain-level staleness: alert when the best endpoint's latest block is
/// older than this.
const STALE_BLOCK_THRESHOLD: Duration = Duration::from_secs(3 * 60);
/// A validator's own node must be within this of the wall clock.
const DIRECT_RPC_STALE_AFTER: Duration = Duration::from_secs(30);
/// Managed (operator-owned) nodes tolerate more lag.
const MANAGED_RPC_STALE_AFTER: Duration = Duration::from_secs(180);

const TOMBSTONED_MIN_INTERVAL: Duration = Duration::from_secs(60 * 60);
const JAILED_MIN_INTERVAL: Duration = Duration::from_secs(30 * 60);
const MISSED_DANGER_MIN_INTERVAL: Duration = Duration::from_secs(15 * 60);
const MISSED_WARN_MIN_INTERVAL: Duration = Duration::from_secs(2 * 60 * 60);
const DIRECT_RPC_MIN_INTERVAL: Duration = Duration::from_secs(15 * 60);
const DIRECT_RPC_STALE_MIN_INTERVAL: Duration = Duration::from_secs(10 * 60);
const MANAGED_RPC_MIN_INTERVAL: Duration = Duration::from_secs(30 * 60);
const GOV_VOTE_MIN_INTERVAL: Duration = Duration::from_secs(6 * 60 * 60);
const GOV_SWEEP_INTERVAL: Duration = Duration::from_secs(30 * 60);

pub struct HealthWorker {
    id: usize,
    ctx: AppContext,
    sink: AlertSink,
}

impl HealthWorker {
    pub fn new(ctx: AppContext, id: usize) -> Self {
        let sink = AlertSink::new(ctx.users.clone(), ctx.throttle.clone(), ctx.pusher.clone());
        Self { id, ctx, sink }
    }

    /// Worker loop: sleep, claim the next due chain, probe it. A panic or
    /// error inside one probe pass is caught, logged and surfaced as a
    /// single non-fatal alert — it never takes the worker down.
    pub async fn run(self) {
        let interval = self.ctx.config.health_check_interval();
        info!(wid = self.id, "health-check worker started");

        loop {
            tokio::select! {
                _ = self.ctx.shutdown.cancelled() => break,
                _ = tokio::time::sleep(IDLE_SLEEP) => {}
            }

            let Some(chain) = self.ctx.chains.pick_next_due(interval) else {
                continue;
            };
            if self.ctx.pauses.is_chain_paused(chain.name()).0 {
                debug!(chain = chain.name(), "chain is paused — skipping probe");
                continue;
            }

            debug!(chain = chain.name(), wid = self.id, "health-checking chain");
            let outcome = AssertUnwindSafe(self.probe_chain(&chain)).catch_unwind().await;
            let failure = match outcome {
                Ok(Ok(())) => {
                    debug!(chain = chain.name(), wid = self.id, "health-check pass complete");
                    None
                }
                Ok(Err(e)) => Some(format!("{e:#}")),
                Err(payload) => Some(panic_message(payload)),
            };

            if let Some(reason) = failure {
                error!(chain = chain.name(), wid = self.id, error = %reason, "failed to health-check chain");
                self.sink.dispatch(
                    chain.name(),
                    None,
                    &format!("health-check failed: {reason}"),
                    false,
                    None,
                    &chain_watchers(&chain),
                );
            }
        }

        info!(wid = self.id, "health-check worker stopped");
    }

    /// One full probe pass over `chain`.
    pub async fn probe_chain(&self, chain: &Arc<RegisteredChain>) -> anyhow::Result<()> {
        let watchers = chain_watchers(chain);

        // Most healthy endpoint wins; the chain rotates it to the front.
        let (client, endpoint, status) = self.probe_endpoints(chain).await?;
        chain.promote_endpoint(&endpoint);

        let now = Utc::now();
        if now - status.latest_block_time
            > chrono::Duration::from_std(STALE_BLOCK_THRESHOLD).expect("const fits")
        {
            self.sink.dispatch(
                chain.name(),
                None,
                &format!(
                    "latest block is stale: {} (height {})",
                    status.latest_block_time, status.latest_block_height
                ),
                false,
                None,
                &watchers,
            );
        }

        // Staking set failure fails the whole pass; the slashing queries
        // only cost their own checks.
        let validators = fetch_all_validators(client.as_ref())
            .await
            .context("failed to query staking validators")?;

        let signing_infos = match fetch_all_signing_infos(client.as_ref()).await {
            Ok(infos) => Some(
                infos
                    .into_iter()
                    .map(|info| (info.address.clone(), info))
                    .collect::<HashMap<_, _>>(),
            ),
            Err(e) => {
                warn!(chain = chain.name(), err = %e, "failed to query signing infos");
                self.sink.dispatch(
                    chain.name(),
                    None,
                    &format!("signing infos could not be fetched: {e}"),
                    false,
                    None,
                    &watchers,
                );
                None
            }
        };

        let slashing_params = match fetch_slashing_params(client.as_ref()).await {
            Ok(params) => Some(params),
            Err(e) => {
                warn!(chain = chain.name(), err = %e, "failed to query slashing params");
                self.sink.dispatch(
                    chain.name(),
                    None,
                    &format!("slashing params could not be fetched: {e}"),
                    false,
                    None,
                    &watchers,
                );
                None
            }
        };

        self.reload_address_mapping_if_needed(chain, &validators);

        let rank_by_valoper = rank_validators(&validators);
        let staking_by_valoper: HashMap<&str, &Validator> = validators
            .iter()
            .map(|v| (v.operator_address.as_str(), v))
            .collect();

        for entry in chain.validators() {
            if self.ctx.pauses.is_validator_paused(&entry.operator_address).0 {
                debug!(valoper = %entry.operator_address, "validator is paused — skipping");
                continue;
            }

            let Some(validator) = staking_by_valoper.get(entry.operator_address.as_str()) else {
                self.sink.dispatch(
                    chain.name(),
                    Some(entry.operator_address.as_str()),
                    "could not be found in the staking validator set",
                    false,
                    None,
                    &entry.watchers,
                );
                continue;
            };

            let mut snapshot = ValidatorSnapshot::new(&entry.operator_address);
            snapshot.moniker = validator.moniker().to_string();
            snapshot.rank = rank_by_valoper
                .get(entry.operator_address.as_str())
                .copied()
                .unwrap_or(0);
            snapshot.valcons = self
                .ctx
                .val_addrs
                .valcons_by_valoper(chain.name(), &entry.operator_address)
                .unwrap_or_default();

            self.evaluate_bond_status(chain, entry, validator, &mut snapshot);
            if let Some(signing_infos) = &signing_infos {
                self.evaluate_signing_info(
                    chain,
                    entry,
                    signing_infos,
                    slashing_params.as_ref(),
                    &mut snapshot,
                );
            }

            if let Some(direct_rpc) = &entry.direct_rpc {
                self.probe_direct_rpc(chain, entry, direct_rpc).await;
            }

            self.ctx.health_cache.put(snapshot);
        }

        self.probe_managed_endpoints(chain, &watchers).await;
        self.sweep_governance(chain, client.as_ref()).await;

        Ok(())
    }

    /// Step B: probe every endpoint in parallel, join over a bounded
    /// channel, pick the maximum block height (ties: earliest endpoint).
    async fn probe_endpoints(
        &self,
        chain: &Arc<RegisteredChain>,
    ) -> anyhow::Result<(Arc<dyn NodeClient>, String, NodeStatus)> {
        let endpoints = chain.rpc_endpoints();
        if endpoints.is_empty() {
            bail!("no RPC endpoint configured");
        }

        let (tx, mut rx) = mpsc::channel(endpoints.len());
        for (index, endpoint) in endpoints.iter().cloned().enumerate() {
            let tx = tx.clone();
            let pool = self.ctx.rpc_clients.clone();
            let chain_id = chain.chain_id().to_string();
            tokio::spawn(async move {
                let result: Result<NodeStatus, String> = async {
                    let client = pool.get_or_create(&endpoint).map_err(|e| e.to_string())?;
                    let status = retry_default(|| client.status())
                        .await
                        .map_err(|e| e.to_string())?;
                    if status.network != chain_id {
                        return Err(format!(
                            "network mismatch, expected {chain_id}, got {}",
                            status.network
                        ));
                    }
                    Ok(status)
                }
                .await;
                let _ = tx.send((index, result)).await;
            });
        }
        drop(tx);

        let mut statuses: Vec<Option<NodeStatus>> = vec![None; endpoints.len()];
        let mut first_error: Option<String> = None;
        while let Some((index, result)) = rx.recv().await {
            match result {
                Ok(status) => statuses[index] = Some(status),
                Err(e) => {
                    debug!(endpoint = %endpoints[index], error = %e, "endpoint probe failed");
                    first_error.get_or_insert(e);
                }
            }
        }

        let best = statuses
            .iter()
            .enumerate()
            .filter_map(|(i, s)| s.as_ref().map(|s| (i, s.latest_block_height)))
            .max_by_key(|&(i, height)| (height, std::cmp::Reverse(i)));

        let Some((best_index, _)) = best else {
            bail!(
                "all {} RPC endpoints failed, first error: {}",
                endpoints.len(),
                first_error.unwrap_or_else(|| "unknown".into())
            );
        };

        let endpoint = endpoints[best_index].clone();
        let status = statuses[best_index].take().expect("selected endpoint has a status");
        let client = self
            .ctx
            .rpc_clients
            .get_or_create(&endpoint)
            .context("failed to get client for the selected endpoint")?;
        Ok((client, endpoint, status))
    }

    /// Step D: when any subscribed validator lacks an operator→consensus
    /// pair, walk the fetched set and register every derivable pair.
    fn reload_address_mapping_if_needed(&self, chain: &Arc<RegisteredChain>, validators: &[Validator]) {
        let needs_reload = chain.validators().iter().any(|entry| {
            self.ctx
                .val_addrs
                .valcons_by_valoper(chain.name(), &entry.operator_address)
                .is_none()
        });
        if !needs_reload {
            return;
        }
        info!(chain = chain.name(), "reloading validator address mapping");

        for validator in validators {
            let Some(key) = validator
                .consensus_pubkey
                .as_ref()
                .and_then(|any| any.ed25519_key_bytes())
            else {
                info!(
                    valoper = %validator.operator_address,
                    "consensus pubkey is not ed25519 — cannot derive consensus address"
                );
                continue;
            };
            let Some(hrp) = valcons_hrp_from_valoper(&validator.operator_address) else {
                info!(valoper = %validator.operator_address, "operator address has no valoper HRP");
                continue;
            };

            let address = consensus_address_from_ed25519(&key);
            match encode_consensus_address(&hrp, &address) {
                Ok(valcons) => {
                    self.ctx
                        .val_addrs
                        .register_pair(chain.name(), &validator.operator_address, &valcons);
                }
                Err(e) => {
                    warn!(valoper = %validator.operator_address, err = %e, "bech32 encoding failed");
                }
            }
        }
    }

    fn evaluate_bond_status(
        &self,
        chain: &Arc<RegisteredChain>,
        entry: &ValidatorEntry,
        validator: &Validator,
        snapshot: &mut ValidatorSnapshot,
    ) {
        let bond_status = validator.bond_status();
        snapshot.bond_status = Some(bond_status);

        match bond_status {
            BondStatus::Bonded => {}
            BondStatus::Unbonded => {
                self.sink.dispatch(
                    chain.name(),
                    Some(entry.operator_address.as_str()),
                    "is un-bonded",
                    true,
                    None,
                    &entry.watchers,
                );
            }
            BondStatus::Unbonding => {
                self.sink.dispatch(
                    chain.name(),
                    Some(entry.operator_address.as_str()),
                    "is unbonding — fell out of the active set or was jailed",
                    true,
                    None,
                    &entry.watchers,
                );
            }
            BondStatus::Unspecified => {
                self.sink.dispatch(
                    chain.name(),
                    Some(entry.operator_address.as_str()),
                    &format!("has unknown bond status {}", validator.status),
                    true,
                    None,
                    &entry.watchers,
                );
            }
        }
    }

    fn evaluate_signing_info(
        &self,
        chain: &Arc<RegisteredChain>,
        entry: &ValidatorEntry,
        signing_infos: &HashMap<String, ValidatorSigningInfo>,
        slashing_params: Option<&SlashingParams>,
        snapshot: &mut ValidatorSnapshot,
    ) {
        let info = if snapshot.valcons.is_empty() {
            None
        } else {
            signing_infos.get(&snapshot.valcons)
        };

        let Some(info) = info else {
            self.sink.dispatch(
                chain.name(),
                Some(entry.operator_address.as_str()),
                "signing info could not be found",
                false,
                None,
                &entry.watchers,
            );
            return;
        };

        snapshot.missed_blocks = Some(info.missed_blocks_counter);
        snapshot.tombstoned = Some(info.tombstoned);
        let jailed_until = info.jailed_until.as_ref().and_then(|t| t.to_datetime());
        let now = Utc::now();

        if info.tombstoned {
            self.sink.dispatch(
                chain.name(),
                Some(entry.operator_address.as_str()),
                "is tombstoned — permanently removed from the active set",
                true,
                Some((AlertCase::Tombstoned, TOMBSTONED_MIN_INTERVAL)),
                &entry.watchers,
            );
            return;
        }

        if let Some(jailed_until) = jailed_until.filter(|ju| *ju > now) {
            snapshot.jailed = Some(true);
            snapshot.jailed_until = Some(jailed_until);
            let minutes_left = (jailed_until - now).num_minutes();
            self.sink.dispatch(
                chain.name(),
                Some(entry.operator_address.as_str()),
                &format!("is jailed until {jailed_until}, {minutes_left} minutes left"),
                true,
                Some((AlertCase::Jailed, JAILED_MIN_INTERVAL)),
                &entry.watchers,
            );
            return;
        }
        snapshot.jailed = Some(false);

        let Some(assessment) = slashing_params.and_then(|params| {
            slashing_assessment(
                info.missed_blocks_counter,
                params.signed_blocks_window,
                params.min_signed_per_window_ratio()?,
            )
        }) else {
            return;
        };

        snapshot.allowed_misses = Some(assessment.allowed_misses);
        snapshot.uptime = Some(assessment.uptime);

        if assessment.miss_ratio > 50.0 {
            self.sink.dispatch(
                chain.name(),
                Some(entry.operator_address.as_str()),
                &format!(
                    "missed {}/{} blocks of the downtime allowance ({:.2}%), slashing is close",
                    info.missed_blocks_counter, assessment.allowed_misses, assessment.miss_ratio
                ),
                true,
                Some((AlertCase::MissedBlocksDanger, MISSED_DANGER_MIN_INTERVAL)),
                &entry.watchers,
            );
        } else if assessment.miss_ratio > 10.0 {
            self.sink.dispatch(
                chain.name(),
                Some(entry.operator_address.as_str()),
                &format!(
                    "missed {}/{} blocks of the downtime allowance ({:.2}%)",
                    info.missed_blocks_counter, assessment.allowed_misses, assessment.miss_ratio
                ),
                false,
                Some((AlertCase::MissedBlocksDanger, MISSED_WARN_MIN_INTERVAL)),
                &entry.watchers,
            );
        }

        if assessment.uptime <= 90.0 {
            let min_interval = if assessment.uptime <= 65.0 {
                Duration::from_secs(15 * 60)
            } else if assessment.uptime <= 75.0 {
                Duration::from_secs(30 * 60)
            } else {
                Duration::from_secs(60 * 60)
            };
            self.sink.dispatch(
                chain.name(),
                Some(entry.operator_address.as_str()),
                &format!("has low uptime {:.2}%", assessment.uptime),
                assessment.uptime <= 70.0,
                Some((AlertCase::LowUptime, min_interval)),
                &entry.watchers,
            );
        }
    }

    /// Step F.5: probe the validator's own node.
    async fn probe_direct_rpc(&self, chain: &Arc<RegisteredChain>, entry: &ValidatorEntry, endpoint: &str) {
        let failure: Option<(String, bool)> = match self.ctx.rpc_clients.get_or_create(endpoint) {
            Err(e) => Some((format!("own node RPC client could not be built: {e}"), false)),
            Ok(client) => match retry_default(|| client.status()).await {
                Err(e) => Some((format!("own node status query failed: {e}"), false)),
                Ok(status) if status.catching_up => Some(("own node is catching up".to_string(), false)),
                Ok(status)
                    if Utc::now() - status.latest_block_time
                        > chrono::Duration::from_std(DIRECT_RPC_STALE_AFTER).expect("const fits") =>
                {
                    Some((
                        format!("own node latest block is stale: {}", status.latest_block_time),
                        true,
                    ))
                }
                Ok(_) => None,
            },
        };

        if let Some((text, stale_triggered)) = failure {
            let min_interval = if stale_triggered {
                DIRECT_RPC_STALE_MIN_INTERVAL
            } else {
                DIRECT_RPC_MIN_INTERVAL
            };
            self.sink.dispatch(
                chain.name(),
                Some(entry.operator_address.as_str()),
                &text,
                true,
                Some((AlertCase::DirectRpcFail, min_interval)),
                &entry.watchers,
            );
        }
    }

    /// Step G: probe the operator's managed nodes; findings go only to root
    /// users who also watch this chain.
    async fn probe_managed_endpoints(&self, chain: &Arc<RegisteredChain>, watchers: &[String]) {
        if chain.health_check_endpoints().is_empty() {
            return;
        }
        let roots: BTreeSet<String> = self.ctx.users.root_identities().into_iter().collect();
        let root_watchers: Vec<String> = watchers
            .iter()
            .filter(|identity| roots.contains(*identity))
            .cloned()
            .collect();
        if root_watchers.is_empty() {
            return;
        }

        for endpoint in chain.health_check_endpoints() {
            let failure: Option<String> = match self.ctx.rpc_clients.get_or_create(endpoint) {
                Err(e) => Some(format!("managed RPC {endpoint} client could not be built: {e}")),
                Ok(client) => match retry_default(|| client.status()).await {
                    Err(e) => Some(format!("managed RPC {endpoint} status query failed: {e}")),
                    Ok(status) if status.catching_up => {
                        Some(format!("managed RPC {endpoint} is catching up"))
                    }
                    Ok(status)
                        if Utc::now() - status.latest_block_time
                            >= chrono::Duration::from_std(MANAGED_RPC_STALE_AFTER)
                                .expect("const fits") =>
                    {
                        Some(format!(
                            "managed RPC {endpoint} latest block is stale: {}",
                            status.latest_block_time
                        ))
                    }
                    Ok(_) => None,
                },
            };

            if let Some(text) = failure {
                self.sink.dispatch(
                    chain.name(),
                    None,
                    &text,
                    false,
                    Some((AlertCase::ManagedRpcFail, MANAGED_RPC_MIN_INTERVAL)),
                    &root_watchers,
                );
            }
        }
    }

    /// Governance sweep: at most once per chain per 30 minutes, remind
    /// watchers of proposals in voting period their validator has not voted
    /// on. Failures are logged and never fail the probe.
    async fn sweep_governance(&self, chain: &Arc<RegisteredChain>, client: &dyn NodeClient) {
        if !self.ctx.gov_cache.should_check(chain.name(), GOV_SWEEP_INTERVAL) {
            return;
        }

        let proposals = match fetch_voting_proposals(client).await {
            Ok(proposals) => proposals,
            Err(e) => {
                warn!(chain = chain.name(), err = %e, "failed to query governance proposals");
                return;
            }
        };
        if proposals.is_empty() {
            return;
        }

        for entry in chain.validators() {
            if self.ctx.pauses.is_validator_paused(&entry.operator_address).0 {
                continue;
            }
            let Some(voter) = account_address_from_valoper(&entry.operator_address) else {
                warn!(valoper = %entry.operator_address, "cannot derive account address for gov check");
                continue;
            };

            for proposal in &proposals {
                if self.ctx.gov_cache.has_voted(&entry.operator_address, proposal.proposal_id) {
                    continue;
                }
                match fetch_has_voted(client, proposal.proposal_id, &voter).await {
                    Ok(true) => {
                        self.ctx
                            .gov_cache
                            .mark_voted(&entry.operator_address, proposal.proposal_id);
                    }
                    Ok(false) => {
                        self.sink.dispatch(
                            chain.name(),
                            Some(entry.operator_address.as_str()),
                            &format!(
                                "has not voted on governance proposal #{}",
                                proposal.proposal_id
                            ),
                            false,
                            Some((AlertCase::GovVote, GOV_VOTE_MIN_INTERVAL)),
                            &entry.watchers,
                        );
                    }
                    Err(e) => {
                        warn!(
                            valoper = %entry.operator_address,
                            proposal = proposal.proposal_id,
                            err = %e,
                            "gov vote query failed"
                        );
                    }
                }
            }
        }
    }
}

/// Distinct watcher identities across the chain's validators, stable order.
pub fn chain_watchers(chain: &RegisteredChain) -> Vec<String> {
    let set: BTreeSet<&String> = chain
        .validators()
        .iter()
        .flat_map(|v| v.watchers.iter())
        .collect();
    set.into_iter().cloned().collect()
}

/// Rank validators for display: bonded first, then stake descending.
fn rank_validators(validators: &[Validator]) -> HashMap<&str, usize> {
    let mut order: Vec<usize> = (0..validators.len()).collect();
    order.sort_by(|&a, &b| {
        let (va, vb) = (&validators[a], &validators[b]);
        let bonded_a = va.bond_status() == BondStatus::Bonded;
        let bonded_b = vb.bond_status() == BondStatus::Bonded;
        bonded_b
            .cmp(&bonded_a)
            .then(vb.tokens_amount().cmp(&va.tokens_amount()))
    });
    order
        .into_iter()
        .enumerate()
        .map(|(rank, index)| (validators[index].operator_address.as_str(), rank + 1))
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SlashingAssessment {
    pub allowed_misses: i64,
    /// Misses as a percentage of the allowance.
    pub miss_ratio: f64,
    /// Signed blocks as a percentage of the window.
    pub uptime: f64,
}

/// Downtime-slashing arithmetic. Returns `None` when the parameters rule
/// out a meaningful window.
pub fn slashing_assessment(missed: i64, window: i64, min_signed: f64) -> Option<SlashingAssessment> {
    if window <= 0 || min_signed <= 0.0 {
        return None;
    }

    let allowed_misses = if min_signed >= 1.0 {
        0
    } else {
        window - (min_signed * window as f64).ceil() as i64
    };

    let miss_ratio = if allowed_misses > 0 {
        missed as f64 / allowed_misses as f64 * 100.0
    } else if missed > 0 {
        f64::INFINITY
    } else {
        0.0
    };

    let uptime = 100.0 - missed as f64 / window as f64 * 100.0;

    Some(SlashingAssessment {
        allowed_misses,
        miss_ratio,
        uptime,
    })
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slashing_arithmetic_matches_the_reference_numbers() {
        // window 1000, min signed 0.5 → 500 allowed; 600 missed → 120%.
        let a = slashing_assessment(600, 1000, 0.5).unwrap();
        assert_eq!(a.allowed_misses, 500);
        assert!((a.miss_ratio - 120.0).abs() < 1e-9);
        assert!((a.uptime - 40.0).abs() < 1e-9);
    }

    #[test]
    fn full_min_signed_leaves_zero_allowance() {
        let a = slashing_assessment(0, 1000, 1.0).unwrap();
        assert_eq!(a.allowed_misses, 0);
        assert_eq!(a.miss_ratio, 0.0);

        let b = slashing_assessment(1, 1000, 1.0).unwrap();
        assert!(b.miss_ratio.is_infinite());
    }

    #[test]
    fn degenerate_params_yield_no_assessment() {
        assert!(slashing_assessment(5, 0, 0.5).is_none());
        assert!(slashing_assessment(5, 1000, 0.0).is_none());
        assert!(slashing_assessment(5, -10, 0.5).is_none());
    }

    #[test]
    fn quarter_missed_is_75_percent_uptime() {
        let a = slashing_assessment(250, 1000, 0.05).unwrap();
        assert!((a.uptime - 75.0).abs() < 1e-9);
    }

    #[test]
    fn ranking_puts_bonded_before_stake() {
        let make = |valoper: &str, status: BondStatus, tokens: &str| Validator {
            operator_address: valoper.to_string(),
            consensus_pubkey: None,
            jailed: false,
            status: status as i32,
            tokens: tokens.to_string(),
            description: None,
        };
        let validators = vec![
            make("val-unbonded-rich", BondStatus::Unbonded, "9000000"),
            make("val-bonded-small", BondStatus::Bonded, "100"),
            make("val-bonded-big", BondStatus::Bonded, "5000"),
        ];

        let ranks = rank_validators(&validators);
        assert_eq!(ranks["val-bonded-big"], 1);
        assert_eq!(ranks["val-bonded-small"], 2);
        assert_eq!(ranks["val-unbonded-rich"], 3);
    }
}
