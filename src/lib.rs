// SPDX-License-Identifier: MIT
//! valwatchd — always-on validator health-watch daemon.
//!
//! A pool of health-check workers probes a fleet of chains over their RPC
//! endpoints, classifies every subscribed validator's condition (bond
//! status, jailing, tombstoning, downtime-slashing exposure, the health of
//! the validator's own node) and pushes typed alerts to the watching users
//! through a chat bot, behind an anti-spam tracker, per-chat silence
//! patterns and a paced per-receiver push queue. Config is hot-reloaded;
//! users steer the daemon through chat commands.

pub mod address;
pub mod bot;
pub mod commands;
pub mod config;
pub mod endpoint;
pub mod push;
pub mod registry;
pub mod reload;
pub mod retry;
pub mod rpc;
pub mod worker;

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use config::AppConfig;
use push::{AlertThrottle, MessagePusher, Silencer};
use registry::{
    BotRegistry, ChainRegistry, PauseRegistry, RegisteredBot, UserRegistry,
    ValidatorAddressRegistry,
};
use rpc::RpcClientPool;
use worker::{GovCache, HealthCheckCache};

/// Shared application state handed to every background task and command
/// handler. All registries are owned singletons behind `Arc`s — injected,
/// never reached through globals — so tests substitute fakes freely.
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<AppConfig>,
    pub home_dir: PathBuf,
    pub chains: Arc<ChainRegistry>,
    pub users: Arc<UserRegistry>,
    pub bots: Arc<BotRegistry>,
    pub rpc_clients: Arc<RpcClientPool>,
    pub val_addrs: Arc<ValidatorAddressRegistry>,
    pub pauses: Arc<PauseRegistry>,
    pub throttle: Arc<AlertThrottle>,
    pub silencer: Arc<Silencer>,
    pub pusher: Arc<MessagePusher>,
    pub health_cache: Arc<HealthCheckCache>,
    pub gov_cache: Arc<GovCache>,
    /// Root cancellation token; cancelling it unblocks every loop.
    pub shutdown: CancellationToken,
}

impl AppContext {
    /// Assemble the production context. The returned receiver yields each
    /// newly registered bot for the command dispatch service.
    pub fn new(
        config: Arc<AppConfig>,
        home_dir: PathBuf,
    ) -> (Self, mpsc::UnboundedReceiver<Arc<RegisteredBot>>) {
        let (bots, announced) = BotRegistry::new();
        let ctx = Self {
            config,
            home_dir,
            chains: Arc::new(ChainRegistry::new()),
            users: Arc::new(UserRegistry::new()),
            bots: Arc::new(bots),
            rpc_clients: Arc::new(RpcClientPool::new()),
            val_addrs: Arc::new(ValidatorAddressRegistry::new()),
            pauses: Arc::new(PauseRegistry::new()),
            throttle: Arc::new(AlertThrottle::new()),
            silencer: Arc::new(Silencer::new()),
            pusher: Arc::new(MessagePusher::new()),
            health_cache: Arc::new(HealthCheckCache::new()),
            gov_cache: Arc::new(GovCache::new()),
            shutdown: CancellationToken::new(),
        };
        (ctx, announced)
    }
}
