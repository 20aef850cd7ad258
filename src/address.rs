// SPDX-License-Identifier: MIT
//! Bech32 address helpers.
//!
//! Validators carry two addresses: the operator address (`…valoper1…`) from
//! configuration and the consensus address (`…valcons1…`) derived from the
//! consensus public key reported by the chain. The consensus HRP is never
//! configured — it is predicted from the operator HRP by swapping the
//! `valoper` suffix for `valcons`.

use bech32::{ToBase32, Variant};
use once_cell::sync::Lazy;
use regex::Regex;
use sha2::{Digest, Sha256};

static VALOPER_ADDRESS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-z\d]+valoper1[qpzry9x8gf2tvdw0s3jn54khce6mua7l]{38,}$").expect("static regex")
});

/// Whether `address` looks like a bech32 validator operator address.
pub fn is_valoper_address(address: &str) -> bool {
    VALOPER_ADDRESS.is_match(address)
}

/// Predict the consensus-address HRP from an operator address.
///
/// `cosmosvaloper1…` → `cosmosvalcons`. Returns `None` when the input has no
/// separator or its HRP does not end in `valoper`.
pub fn valcons_hrp_from_valoper(valoper: &str) -> Option<String> {
    let sep = valoper.rfind('1')?;
    if sep == 0 {
        return None;
    }
    let hrp = &valoper[..sep];
    let stem = hrp.strip_suffix("valoper")?;
    Some(format!("{stem}valcons"))
}

/// Derive the 20-byte consensus address from an ed25519 consensus pubkey.
///
/// CometBFT address derivation: first 20 bytes of SHA-256 over the raw key.
pub fn consensus_address_from_ed25519(pubkey: &[u8]) -> [u8; 20] {
    let digest = Sha256::digest(pubkey);
    let mut out = [0u8; 20];
    out.copy_from_slice(&digest[..20]);
    out
}

/// Bech32-encode a consensus address under the given HRP.
pub fn encode_consensus_address(hrp: &str, address: &[u8; 20]) -> Result<String, bech32::Error> {
    bech32::encode(hrp, address.to_base32(), Variant::Bech32)
}

/// Re-encode an operator address as the matching account address
/// (`cosmosvaloper1…` → `cosmos1…`). The payload bytes are identical; only
/// the HRP changes. Governance votes are cast by the account address.
pub fn account_address_from_valoper(valoper: &str) -> Option<String> {
    let (hrp, data, variant) = bech32::decode(valoper).ok()?;
    let stem = hrp.strip_suffix("valoper")?;
    bech32::encode(stem, data, variant).ok()
}
