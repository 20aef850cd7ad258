// SPDX-License-Identifier: MIT
//! Chain RPC plumbing.
//!
//! [`NodeClient`] is the seam the workers talk through: a `status()` call and
//! a raw `abci_query(path, bytes) → bytes` call. The production
//! implementation speaks Tendermint/CometBFT JSON-RPC over HTTP; tests
//! substitute fakes. Paged query helpers that decode the protobuf envelopes
//! live here too so both the worker and the tests share them.

pub mod pool;
pub mod types;

pub use pool::RpcClientPool;

use std::time::Duration;

use async_trait::async_trait;
use base64::Engine as _;
use chrono::{DateTime, Utc};
use prost::Message;
use serde::Deserialize;
use thiserror::Error;

use crate::endpoint::http_base_url;
use crate::retry::retry_default;

const RPC_CALL_TIMEOUT: Duration = Duration::from_secs(10);

/// Page size for the validators / signing-infos sweeps. The staking endpoint
/// handles large pages without trouble.
const QUERY_PAGE_LIMIT: u64 = 200;

pub const PATH_STAKING_VALIDATORS: &str = "/cosmos.staking.v1beta1.Query/Validators";
pub const PATH_SLASHING_SIGNING_INFOS: &str = "/cosmos.slashing.v1beta1.Query/SigningInfos";
pub const PATH_SLASHING_PARAMS: &str = "/cosmos.slashing.v1beta1.Query/Params";
pub const PATH_GOV_PROPOSALS: &str = "/cosmos.gov.v1beta1.Query/Proposals";
pub const PATH_GOV_VOTE: &str = "/cosmos.gov.v1beta1.Query/Vote";

#[derive(Debug, Error)]
pub enum RpcError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("rpc error {code}: {message}")]
    Rpc { code: i64, message: String },
    #[error("abci query failed with code {code}: {log}")]
    Abci { code: u32, log: String },
    #[error("decode error: {0}")]
    Decode(#[from] prost::DecodeError),
    #[error("malformed response: {0}")]
    Malformed(String),
}

/// Node status snapshot as reported by the `status` RPC.
#[derive(Debug, Clone)]
pub struct NodeStatus {
    pub network: String,
    pub latest_block_height: i64,
    pub latest_block_time: DateTime<Utc>,
    pub catching_up: bool,
}

/// The transport seam to one RPC endpoint.
#[async_trait]
pub trait NodeClient: Send + Sync {
    async fn status(&self) -> Result<NodeStatus, RpcError>;
    async fn abci_query(&self, path: &str, data: Vec<u8>) -> Result<Vec<u8>, RpcError>;
}

// ─── HTTP JSON-RPC implementation ────────────────────────────────────────────

pub struct HttpNodeClient {
    http: reqwest::Client,
    base_url: String,
}

impl HttpNodeClient {
    /// Build a client for `endpoint`. Websocket schemes are mapped onto
    /// their HTTP equivalents; the per-call timeout is 10 s.
    pub fn new(endpoint: &str) -> Result<Self, RpcError> {
        let http = reqwest::Client::builder()
            .timeout(RPC_CALL_TIMEOUT)
            .build()?;
        Ok(Self {
            http,
            base_url: http_base_url(endpoint),
        })
    }

    async fn call(&self, method: &str, params: serde_json::Value) -> Result<serde_json::Value, RpcError> {
        #[derive(Deserialize)]
        struct JsonRpcError {
            code: i64,
            message: String,
            #[serde(default)]
            data: Option<String>,
        }

        #[derive(Deserialize)]
        struct JsonRpcResponse {
            result: Option<serde_json::Value>,
            error: Option<JsonRpcError>,
        }

        let body = serde_json::json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": method,
            "params": params,
        });

        let response: JsonRpcResponse = self
            .http
            .post(&self.base_url)
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if let Some(err) = response.error {
            return Err(RpcError::Rpc {
                code: err.code,
                message: match err.data {
                    Some(data) if !data.is_empty() => format!("{}: {data}", err.message),
                    _ => err.message,
                },
            });
        }
        response
            .result
            .ok_or_else(|| RpcError::Malformed("response carries neither result nor error".into()))
    }
}

#[async_trait]
impl NodeClient for HttpNodeClient {
    async fn status(&self) -> Result<NodeStatus, RpcError> {
        #[derive(Deserialize)]
        struct NodeInfo {
            network: String,
        }
        #[derive(Deserialize)]
        struct SyncInfo {
            latest_block_height: String,
            latest_block_time: DateTime<Utc>,
            catching_up: bool,
        }
        #[derive(Deserialize)]
        struct StatusResult {
            node_info: NodeInfo,
            sync_info: SyncInfo,
        }

        let raw = self.call("status", serde_json::json!({})).await?;
        let result: StatusResult = serde_json::from_value(raw)
            .map_err(|e| RpcError::Malformed(format!("status result: {e}")))?;

        let latest_block_height = result
            .sync_info
            .latest_block_height
            .parse()
            .map_err(|e| RpcError::Malformed(format!("latest_block_height: {e}")))?;

        Ok(NodeStatus {
            network: result.node_info.network,
            latest_block_height,
            latest_block_time: result.sync_info.latest_block_time,
            catching_up: result.sync_info.catching_up,
        })
    }

    async fn abci_query(&self, path: &str, data: Vec<u8>) -> Result<Vec<u8>, RpcError> {
        #[derive(Deserialize)]
        struct AbciResponse {
            #[serde(default)]
            code: u32,
            #[serde(default)]
            log: String,
            #[serde(default)]
            value: Option<String>,
        }
        #[derive(Deserialize)]
        struct AbciResult {
            response: AbciResponse,
        }

        let params = serde_json::json!({
            "path": path,
            "data": hex::encode(&data),
            "height": "0",
            "prove": false,
        });

        let raw = self.call("abci_query", params).await?;
        let result: AbciResult = serde_json::from_value(raw)
            .map_err(|e| RpcError::Malformed(format!("abci_query result: {e}")))?;

        if result.response.code != 0 {
            return Err(RpcError::Abci {
                code: result.response.code,
                log: result.response.log,
            });
        }

        match result.response.value {
            Some(value) if !value.is_empty() => base64::engine::general_purpose::STANDARD
                .decode(value)
                .map_err(|e| RpcError::Malformed(format!("abci_query value: {e}"))),
            _ => Ok(Vec::new()),
        }
    }
}

// ─── Paged query helpers ─────────────────────────────────────────────────────

/// Fetch the full validator set, following `next_key` pagination.
pub async fn fetch_all_validators(client: &dyn NodeClient) -> Result<Vec<types::Validator>, RpcError> {
    let mut validators = Vec::new();
    let mut key = Vec::new();

    loop {
        let request = types::QueryValidatorsRequest {
            status: String::new(),
            pagination: Some(types::PageRequest {
                key: key.clone(),
                limit: QUERY_PAGE_LIMIT,
            }),
        };
        let payload = request.encode_to_vec();
        let bytes = retry_default(|| {
            let payload = payload.clone();
            async move { client.abci_query(PATH_STAKING_VALIDATORS, payload).await }
        })
        .await?;
        if bytes.is_empty() {
            return Err(RpcError::Malformed("empty validators response".into()));
        }

        let response = types::QueryValidatorsResponse::decode(bytes.as_slice())?;
        validators.extend(response.validators);

        key = response.pagination.map(|p| p.next_key).unwrap_or_default();
        if key.is_empty() {
            break;
        }
    }

    Ok(validators)
}

/// Fetch every validator signing-info, following `next_key` pagination.
pub async fn fetch_all_signing_infos(
    client: &dyn NodeClient,
) -> Result<Vec<types::ValidatorSigningInfo>, RpcError> {
    let mut infos = Vec::new();
    let mut key = Vec::new();

    loop {
        let request = types::QuerySigningInfosRequest {
            pagination: Some(types::PageRequest {
                key: key.clone(),
                limit: QUERY_PAGE_LIMIT,
            }),
        };
        let payload = request.encode_to_vec();
        let bytes = retry_default(|| {
            let payload = payload.clone();
            async move { client.abci_query(PATH_SLASHING_SIGNING_INFOS, payload).await }
        })
        .await?;
        if bytes.is_empty() {
            return Err(RpcError::Malformed("empty signing-infos response".into()));
        }

        let response = types::QuerySigningInfosResponse::decode(bytes.as_slice())?;
        infos.extend(response.info);

        key = response.pagination.map(|p| p.next_key).unwrap_or_default();
        if key.is_empty() {
            break;
        }
    }

    Ok(infos)
}

/// Fetch the slashing module parameters.
pub async fn fetch_slashing_params(client: &dyn NodeClient) -> Result<types::SlashingParams, RpcError> {
    let payload = types::QuerySlashingParamsRequest {}.encode_to_vec();
    let bytes = retry_default(|| {
        let payload = payload.clone();
        async move { client.abci_query(PATH_SLASHING_PARAMS, payload).await }
    })
    .await?;
    if bytes.is_empty() {
        return Err(RpcError::Malformed("empty slashing params response".into()));
    }

    let response = types::QuerySlashingParamsResponse::decode(bytes.as_slice())?;
    response
        .params
        .ok_or_else(|| RpcError::Malformed("slashing params missing from response".into()))
}

/// Fetch proposals currently in their voting period.
pub async fn fetch_voting_proposals(client: &dyn NodeClient) -> Result<Vec<types::Proposal>, RpcError> {
    let mut proposals = Vec::new();
    let mut key = Vec::new();

    loop {
        let request = types::QueryProposalsRequest {
            proposal_status: types::PROPOSAL_STATUS_VOTING_PERIOD,
            voter: String::new(),
            depositor: String::new(),
            pagination: Some(types::PageRequest {
                key: key.clone(),
                limit: QUERY_PAGE_LIMIT,
            }),
        };
        let payload = request.encode_to_vec();
        let bytes = retry_default(|| {
            let payload = payload.clone();
            async move { client.abci_query(PATH_GOV_PROPOSALS, payload).await }
        })
        .await?;
        if bytes.is_empty() {
            break;
        }

        let response = types::QueryProposalsResponse::decode(bytes.as_slice())?;
        proposals.extend(response.proposals);

        key = response.pagination.map(|p| p.next_key).unwrap_or_default();
        if key.is_empty() {
            break;
        }
    }

    Ok(proposals)
}

/// Whether `voter` has a recorded vote on `proposal_id`.
///
/// The gov module answers a missing vote with a non-zero ABCI code, so that
/// outcome maps to `Ok(false)` rather than an error.
pub async fn fetch_has_voted(
    client: &dyn NodeClient,
    proposal_id: u64,
    voter: &str,
) -> Result<bool, RpcError> {
    let request = types::QueryVoteRequest {
        proposal_id,
        voter: voter.to_string(),
    };
    let payload = request.encode_to_vec();

    match client.abci_query(PATH_GOV_VOTE, payload).await {
        Ok(bytes) => {
            if bytes.is_empty() {
                return Ok(false);
            }
            let response = types::QueryVoteResponse::decode(bytes.as_slice())?;
            Ok(response.vote.is_some())
        }
        Err(RpcError::Abci { .. }) => Ok(false),
        Err(e) => Err(e),
    }
}
