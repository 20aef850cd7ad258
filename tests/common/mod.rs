// SPDX-License-Identifier: MIT
//! Shared fakes for the integration tests: a programmable RPC node and a
//! capturing chat transport, wired into an [`AppContext`] the same way the
//! daemon wires the real ones.
#![allow(dead_code)]

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use prost::Message;
use tokio_util::sync::CancellationToken;

use valwatchd::bot::{BotError, ChatTransport, Update};
use valwatchd::config::{AppConfig, ChainConfig, ChainValidatorConfig, UsersConfig};
use valwatchd::push::{AlertThrottle, MessagePusher, Silencer};
use valwatchd::registry::{
    BotRegistry, ChainRegistry, PauseRegistry, UserRegistry, ValidatorAddressRegistry,
};
use valwatchd::rpc::types::{
    self, BondStatus, PageResponse, SlashingParams, Validator, ValidatorSigningInfo,
};
use valwatchd::rpc::{NodeClient, NodeStatus, RpcClientPool, RpcError};
use valwatchd::worker::{GovCache, HealthCheckCache};
use valwatchd::AppContext;

pub const VALOPER: &str = "cosmosvaloper1qqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqq";

// ─── Fake RPC node ───────────────────────────────────────────────────────────

pub struct FakeNodeState {
    pub network: String,
    pub height: i64,
    /// How far behind the wall clock the latest block is.
    pub block_lag: Duration,
    pub catching_up: bool,
    pub status_fails: bool,
    pub validators: Vec<Validator>,
    pub signing_infos: Vec<ValidatorSigningInfo>,
    pub slashing_params: Option<SlashingParams>,
}

impl Default for FakeNodeState {
    fn default() -> Self {
        Self {
            network: "testchain-1".to_string(),
            height: 100,
            block_lag: Duration::ZERO,
            catching_up: false,
            status_fails: false,
            validators: Vec::new(),
            signing_infos: Vec::new(),
            slashing_params: None,
        }
    }
}

#[derive(Default)]
pub struct FakeNode {
    pub state: Mutex<FakeNodeState>,
}

impl FakeNode {
    pub fn new(state: FakeNodeState) -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(state),
        })
    }

    pub fn set<F: FnOnce(&mut FakeNodeState)>(&self, f: F) {
        f(&mut self.state.lock().unwrap());
    }
}

#[async_trait]
impl NodeClient for FakeNode {
    async fn status(&self) -> Result<NodeStatus, RpcError> {
        let state = self.state.lock().unwrap();
        if state.status_fails {
            return Err(RpcError::Malformed("status unavailable".into()));
        }
        Ok(NodeStatus {
            network: state.network.clone(),
            latest_block_height: state.height,
            latest_block_time: Utc::now()
                - chrono::Duration::from_std(state.block_lag).unwrap(),
            catching_up: state.catching_up,
        })
    }

    async fn abci_query(&self, path: &str, _data: Vec<u8>) -> Result<Vec<u8>, RpcError> {
        let state = self.state.lock().unwrap();
        let bytes = match path {
            valwatchd::rpc::PATH_STAKING_VALIDATORS => types::QueryValidatorsResponse {
                validators: state.validators.clone(),
                pagination: Some(PageResponse {
                    next_key: vec![],
                    total: state.validators.len() as u64,
                }),
            }
            .encode_to_vec(),
            valwatchd::rpc::PATH_SLASHING_SIGNING_INFOS => types::QuerySigningInfosResponse {
                info: state.signing_infos.clone(),
                pagination: Some(PageResponse {
                    next_key: vec![],
                    total: state.signing_infos.len() as u64,
                }),
            }
            .encode_to_vec(),
            valwatchd::rpc::PATH_SLASHING_PARAMS => match &state.slashing_params {
                Some(params) => types::QuerySlashingParamsResponse {
                    params: Some(params.clone()),
                }
                .encode_to_vec(),
                None => Vec::new(),
            },
            _ => Vec::new(),
        };
        Ok(bytes)
    }
}

// ─── Capturing chat transport ────────────────────────────────────────────────

#[derive(Default)]
pub struct CapturingTransport {
    pub sent: Mutex<Vec<(i64, String)>>,
    pub fail_sends: Mutex<bool>,
}

impl CapturingTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn sent_texts(&self) -> Vec<String> {
        self.sent.lock().unwrap().iter().map(|(_, t)| t.clone()).collect()
    }

    pub fn set_failing(&self, failing: bool) {
        *self.fail_sends.lock().unwrap() = failing;
    }
}

#[async_trait]
impl ChatTransport for CapturingTransport {
    async fn send_message(&self, text: &str, chat_id: i64) -> Result<(), BotError> {
        if *self.fail_sends.lock().unwrap() {
            return Err(BotError::Api("simulated outage".into()));
        }
        self.sent.lock().unwrap().push((chat_id, text.to_string()));
        Ok(())
    }

    async fn poll_updates(&self) -> Result<Vec<Update>, BotError> {
        Ok(Vec::new())
    }
}

// ─── Context assembly ────────────────────────────────────────────────────────

pub const ALICE_CHAT_ID: i64 = 1001;
pub const BOB_CHAT_ID: i64 = 1002;

pub fn users_config() -> UsersConfig {
    let mut config: UsersConfig = serde_yaml::from_str(
        r#"
users:
  alice:
    root: true
    telegram: {username: alice, id: 1001, token: shared-token}
  bob:
    telegram: {username: bob, id: 1002, token: shared-token}
"#,
    )
    .unwrap();
    for (identity, record) in config.users.iter_mut() {
        record.identity = identity.clone();
    }
    config
}

/// One chain, two public endpoints, one validator watched by bob.
pub fn chain_config(endpoints: &[&str], watchers: &[&str]) -> ChainConfig {
    let mut validators = HashMap::new();
    validators.insert(
        VALOPER.to_string(),
        ChainValidatorConfig {
            operator_address: VALOPER.to_string(),
            watchers: watchers.iter().map(|s| s.to_string()).collect(),
            direct_rpc: None,
        },
    );
    ChainConfig {
        chain_name: "testchain".to_string(),
        chain_id: "testchain-1".to_string(),
        disable: false,
        priority: false,
        rpc: endpoints.iter().map(|s| s.to_string()).collect(),
        health_check_rpc: vec![],
        validators,
    }
}

/// Assemble an [`AppContext`] over fake nodes and a capturing transport.
/// `nodes` is keyed by normalised endpoint.
pub fn test_context(
    nodes: HashMap<String, Arc<FakeNode>>,
    transport: Arc<CapturingTransport>,
) -> AppContext {
    let (bots, _announced) = BotRegistry::with_factory(Box::new(move |_| {
        Ok(transport.clone() as Arc<dyn ChatTransport>)
    }));

    let rpc_clients = RpcClientPool::with_factory(Box::new(move |endpoint| {
        nodes
            .get(endpoint)
            .cloned()
            .map(|node| node as Arc<dyn NodeClient>)
            .ok_or_else(|| RpcError::Malformed(format!("no fake node for {endpoint}")))
    }));

    let ctx = AppContext {
        config: Arc::new(AppConfig::default()),
        home_dir: PathBuf::new(),
        chains: Arc::new(ChainRegistry::new()),
        users: Arc::new(UserRegistry::new()),
        bots: Arc::new(bots),
        rpc_clients: Arc::new(rpc_clients),
        val_addrs: Arc::new(ValidatorAddressRegistry::new()),
        pauses: Arc::new(PauseRegistry::new()),
        throttle: Arc::new(AlertThrottle::new()),
        silencer: Arc::new(Silencer::new()),
        // No cooldown so tests can drive delivery passes directly.
        pusher: Arc::new(MessagePusher::with_pacing(
            Duration::ZERO,
            Duration::from_millis(1),
            Duration::from_millis(1),
        )),
        health_cache: Arc::new(HealthCheckCache::new()),
        gov_cache: Arc::new(GovCache::new()),
        shutdown: CancellationToken::new(),
    };

    ctx.users.update(&users_config()).unwrap();
    // Bot exists up front so delivery resolves it by token.
    let bot = ctx.bots.get_or_create("shared-token").unwrap();
    bot.add_chat_id(ALICE_CHAT_ID);
    bot.add_chat_id(BOB_CHAT_ID);
    ctx
}

// ─── Staking fixtures ────────────────────────────────────────────────────────

pub const CONSENSUS_KEY: [u8; 32] = [7u8; 32];

pub fn expected_valcons() -> String {
    let address = valwatchd::address::consensus_address_from_ed25519(&CONSENSUS_KEY);
    valwatchd::address::encode_consensus_address("cosmosvalcons", &address).unwrap()
}

pub fn bonded_validator() -> Validator {
    let pubkey = types::Ed25519PubKey {
        key: CONSENSUS_KEY.to_vec(),
    };
    Validator {
        operator_address: VALOPER.to_string(),
        consensus_pubkey: Some(types::Any {
            type_url: types::ED25519_PUBKEY_TYPE_URL.to_string(),
            value: pubkey.encode_to_vec(),
        }),
        jailed: false,
        status: BondStatus::Bonded as i32,
        tokens: "1000000".to_string(),
        description: Some(types::ValidatorDescription {
            moniker: "test-validator".to_string(),
        }),
    }
}

pub fn signing_info(missed: i64) -> ValidatorSigningInfo {
    ValidatorSigningInfo {
        address: expected_valcons(),
        jailed_until: None,
        tombstoned: false,
        missed_blocks_counter: missed,
    }
}

pub fn slashing_params(window: i64, min_signed: f64) -> SlashingParams {
    let scaled = (min_signed * 1e18) as i128;
    SlashingParams {
        signed_blocks_window: window,
        min_signed_per_window: scaled.to_string().into_bytes(),
    }
}
