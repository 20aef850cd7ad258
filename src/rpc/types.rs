// SPDX-License-Identifier: MIT
//! Protobuf envelopes for the ABCI queries the workers issue.
//!
//! Hand-declared subsets of the cosmos-sdk message types — only the fields
//! this daemon reads are declared; protobuf skips unknown fields on decode,
//! so partial declarations stay wire-compatible.

use chrono::{DateTime, TimeZone, Utc};
use prost::Message;

// ─── cosmos.base.query.v1beta1 — pagination envelope ─────────────────────────

#[derive(Clone, PartialEq, Message)]
pub struct PageRequest {
    #[prost(bytes = "vec", tag = "1")]
    pub key: Vec<u8>,
    #[prost(uint64, tag = "3")]
    pub limit: u64,
}

#[derive(Clone, PartialEq, Message)]
pub struct PageResponse {
    #[prost(bytes = "vec", tag = "1")]
    pub next_key: Vec<u8>,
    #[prost(uint64, tag = "2")]
    pub total: u64,
}

// ─── google.protobuf ─────────────────────────────────────────────────────────

#[derive(Clone, PartialEq, Message)]
pub struct Any {
    #[prost(string, tag = "1")]
    pub type_url: String,
    #[prost(bytes = "vec", tag = "2")]
    pub value: Vec<u8>,
}

#[derive(Clone, PartialEq, Message)]
pub struct Timestamp {
    #[prost(int64, tag = "1")]
    pub seconds: i64,
    #[prost(int32, tag = "2")]
    pub nanos: i32,
}

impl Timestamp {
    pub fn to_datetime(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_opt(self.seconds, self.nanos.max(0) as u32).single()
    }
}

// ─── cosmos.crypto ───────────────────────────────────────────────────────────

pub const ED25519_PUBKEY_TYPE_URL: &str = "/cosmos.crypto.ed25519.PubKey";

#[derive(Clone, PartialEq, Message)]
pub struct Ed25519PubKey {
    #[prost(bytes = "vec", tag = "1")]
    pub key: Vec<u8>,
}

impl Any {
    /// Raw key bytes when this `Any` wraps an ed25519 consensus pubkey.
    /// Other key types (notably secp256k1) are not used as consensus keys by
    /// CometBFT chains, so they are reported as `None` and skipped upstream.
    pub fn ed25519_key_bytes(&self) -> Option<Vec<u8>> {
        if self.type_url != ED25519_PUBKEY_TYPE_URL {
            return None;
        }
        Ed25519PubKey::decode(self.value.as_slice())
            .ok()
            .map(|k| k.key)
    }
}

// ─── cosmos.staking.v1beta1 ──────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, prost::Enumeration)]
#[repr(i32)]
pub enum BondStatus {
    Unspecified = 0,
    Unbonded = 1,
    Unbonding = 2,
    Bonded = 3,
}

impl std::fmt::Display for BondStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            BondStatus::Unspecified => "Unspecified",
            BondStatus::Unbonded => "Unbonded",
            BondStatus::Unbonding => "Unbonding",
            BondStatus::Bonded => "Bonded",
        };
        f.write_str(label)
    }
}

#[derive(Clone, PartialEq, Message)]
pub struct ValidatorDescription {
    #[prost(string, tag = "1")]
    pub moniker: String,
}

#[derive(Clone, PartialEq, Message)]
pub struct Validator {
    #[prost(string, tag = "1")]
    pub operator_address: String,
    #[prost(message, optional, tag = "2")]
    pub consensus_pubkey: Option<Any>,
    #[prost(bool, tag = "3")]
    pub jailed: bool,
    #[prost(enumeration = "BondStatus", tag = "4")]
    pub status: i32,
    /// Stake as a decimal integer string.
    #[prost(string, tag = "5")]
    pub tokens: String,
    #[prost(message, optional, tag = "7")]
    pub description: Option<ValidatorDescription>,
}

impl Validator {
    pub fn bond_status(&self) -> BondStatus {
        BondStatus::try_from(self.status).unwrap_or(BondStatus::Unspecified)
    }

    /// Stake tokens for ranking; unparsable values rank last.
    pub fn tokens_amount(&self) -> u128 {
        self.tokens.parse().unwrap_or(0)
    }

    pub fn moniker(&self) -> &str {
        self.description.as_ref().map(|d| d.moniker.as_str()).unwrap_or("")
    }
}

#[derive(Clone, PartialEq, Message)]
pub struct QueryValidatorsRequest {
    #[prost(string, tag = "1")]
    pub status: String,
    #[prost(message, optional, tag = "2")]
    pub pagination: Option<PageRequest>,
}

#[derive(Clone, PartialEq, Message)]
pub struct QueryValidatorsResponse {
    #[prost(message, repeated, tag = "1")]
    pub validators: Vec<Validator>,
    #[prost(message, optional, tag = "2")]
    pub pagination: Option<PageResponse>,
}

// ─── cosmos.slashing.v1beta1 ─────────────────────────────────────────────────

#[derive(Clone, PartialEq, Message)]
pub struct ValidatorSigningInfo {
    /// Bech32 consensus address (`…valcons1…`).
    #[prost(string, tag = "1")]
    pub address: String,
    #[prost(message, optional, tag = "4")]
    pub jailed_until: Option<Timestamp>,
    #[prost(bool, tag = "5")]
    pub tombstoned: bool,
    #[prost(int64, tag = "6")]
    pub missed_blocks_counter: i64,
}

#[derive(Clone, PartialEq, Message)]
pub struct QuerySigningInfosRequest {
    #[prost(message, optional, tag = "1")]
    pub pagination: Option<PageRequest>,
}

#[derive(Clone, PartialEq, Message)]
pub struct QuerySigningInfosResponse {
    #[prost(message, repeated, tag = "1")]
    pub info: Vec<ValidatorSigningInfo>,
    #[prost(message, optional, tag = "2")]
    pub pagination: Option<PageResponse>,
}

#[derive(Clone, PartialEq, Message)]
pub struct SlashingParams {
    #[prost(int64, tag = "1")]
    pub signed_blocks_window: i64,
    /// `Dec` on the wire: a decimal integer string scaled by 10^18.
    #[prost(bytes = "vec", tag = "2")]
    pub min_signed_per_window: Vec<u8>,
}

impl SlashingParams {
    pub fn min_signed_per_window_ratio(&self) -> Option<f64> {
        parse_dec(&self.min_signed_per_window)
    }
}

#[derive(Clone, PartialEq, Message)]
pub struct QuerySlashingParamsRequest {}

#[derive(Clone, PartialEq, Message)]
pub struct QuerySlashingParamsResponse {
    #[prost(message, optional, tag = "1")]
    pub params: Option<SlashingParams>,
}

// ─── cosmos.gov.v1beta1 ──────────────────────────────────────────────────────

/// Proposal status filter value for "currently in voting period".
pub const PROPOSAL_STATUS_VOTING_PERIOD: i32 = 2;

#[derive(Clone, PartialEq, Message)]
pub struct Proposal {
    #[prost(uint64, tag = "1")]
    pub proposal_id: u64,
    #[prost(int32, tag = "3")]
    pub status: i32,
    #[prost(message, optional, tag = "9")]
    pub voting_end_time: Option<Timestamp>,
}

#[derive(Clone, PartialEq, Message)]
pub struct QueryProposalsRequest {
    #[prost(int32, tag = "1")]
    pub proposal_status: i32,
    #[prost(string, tag = "2")]
    pub voter: String,
    #[prost(string, tag = "3")]
    pub depositor: String,
    #[prost(message, optional, tag = "4")]
    pub pagination: Option<PageRequest>,
}

#[derive(Clone, PartialEq, Message)]
pub struct QueryProposalsResponse {
    #[prost(message, repeated, tag = "1")]
    pub proposals: Vec<Proposal>,
    #[prost(message, optional, tag = "2")]
    pub pagination: Option<PageResponse>,
}

#[derive(Clone, PartialEq, Message)]
pub struct QueryVoteRequest {
    #[prost(uint64, tag = "1")]
    pub proposal_id: u64,
    #[prost(string, tag = "2")]
    pub voter: String,
}

#[derive(Clone, PartialEq, Message)]
pub struct Vote {
    #[prost(uint64, tag = "1")]
    pub proposal_id: u64,
    #[prost(string, tag = "2")]
    pub voter: String,
}

#[derive(Clone, PartialEq, Message)]
pub struct QueryVoteResponse {
    #[prost(message, optional, tag = "1")]
    pub vote: Option<Vote>,
}

// ─── Helpers ─────────────────────────────────────────────────────────────────

/// Parse a cosmos `Dec` wire value (decimal integer string, 18 fractional
/// digits) into an `f64` ratio.
pub fn parse_dec(raw: &[u8]) -> Option<f64> {
    let text = std::str::from_utf8(raw).ok()?;
    let scaled: i128 = text.trim().parse().ok()?;
    Some(scaled as f64 / 1e18)
}
