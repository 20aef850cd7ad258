// SPDX-License-Identifier: MIT
//! Memoized RPC clients, one per normalised endpoint.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use super::{HttpNodeClient, NodeClient, RpcError};
use crate::endpoint::normalize_endpoint;

type ClientFactory = Box<dyn Fn(&str) -> Result<Arc<dyn NodeClient>, RpcError> + Send + Sync>;

/// Lazy, process-lifetime pool of [`NodeClient`]s keyed by normalised
/// endpoint. Construction failures are returned to the caller and NOT
/// cached, so a flaky endpoint gets a fresh construction attempt next time.
pub struct RpcClientPool {
    clients: RwLock<HashMap<String, Arc<dyn NodeClient>>>,
    factory: ClientFactory,
}

impl RpcClientPool {
    pub fn new() -> Self {
        Self::with_factory(Box::new(|endpoint| {
            Ok(Arc::new(HttpNodeClient::new(endpoint)?) as Arc<dyn NodeClient>)
        }))
    }

    /// Pool with a custom client constructor. Tests inject fakes here.
    pub fn with_factory(factory: ClientFactory) -> Self {
        Self {
            clients: RwLock::new(HashMap::new()),
            factory,
        }
    }

    /// Return the cached client for `endpoint`, constructing it under the
    /// write lock (double-checked) on first use.
    pub fn get_or_create(&self, endpoint: &str) -> Result<Arc<dyn NodeClient>, RpcError> {
        assert!(!endpoint.is_empty(), "empty rpc endpoint");
        let key = normalize_endpoint(endpoint);

        if let Some(client) = self.clients.read().expect("rpc pool lock poisoned").get(&key) {
            return Ok(client.clone());
        }

        let mut clients = self.clients.write().expect("rpc pool lock poisoned");
        // Double check — another caller may have won the race.
        if let Some(client) = clients.get(&key) {
            return Ok(client.clone());
        }

        let client = (self.factory)(&key)?;
        clients.insert(key, client.clone());
        Ok(client)
    }
}

impl Default for RpcClientPool {
    fn default() -> Self {
        Self::new()
    }
}
