// SPDX-License-Identifier: MIT
//! Validator address registry — operator ↔ consensus pairs per chain.
//!
//! Purely additive for the process lifetime; pairs are registered on demand
//! when a probe pass walks the fetched validator set.

use std::collections::HashMap;
use std::sync::RwLock;

#[derive(Default)]
struct AddressIndex {
    /// chain name → valoper → valcons
    valcons_by_valoper: HashMap<String, HashMap<String, String>>,
    /// chain name → valcons → valoper
    valoper_by_valcons: HashMap<String, HashMap<String, String>>,
}

#[derive(Default)]
pub struct ValidatorAddressRegistry {
    inner: RwLock<AddressIndex>,
}

impl ValidatorAddressRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_pair(&self, chain_name: &str, valoper: &str, valcons: &str) {
        let mut inner = self.inner.write().expect("address registry lock poisoned");
        inner
            .valcons_by_valoper
            .entry(chain_name.to_string())
            .or_default()
            .insert(valoper.to_string(), valcons.to_string());
        inner
            .valoper_by_valcons
            .entry(chain_name.to_string())
            .or_default()
            .insert(valcons.to_string(), valoper.to_string());
    }

    pub fn valcons_by_valoper(&self, chain_name: &str, valoper: &str) -> Option<String> {
        self.inner
            .read()
            .expect("address registry lock poisoned")
            .valcons_by_valoper
            .get(chain_name)?
            .get(valoper)
            .cloned()
    }

    pub fn valoper_by_valcons(&self, chain_name: &str, valcons: &str) -> Option<String> {
        self.inner
            .read()
            .expect("address registry lock poisoned")
            .valoper_by_valcons
            .get(chain_name)?
            .get(valcons)
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registers_and_resolves_both_directions() {
        let registry = ValidatorAddressRegistry::new();
        registry.register_pair("gaia", "cosmosvaloper1aaa", "cosmosvalcons1bbb");

        assert_eq!(
            registry.valcons_by_valoper("gaia", "cosmosvaloper1aaa").as_deref(),
            Some("cosmosvalcons1bbb")
        );
        assert_eq!(
            registry.valoper_by_valcons("gaia", "cosmosvalcons1bbb").as_deref(),
            Some("cosmosvaloper1aaa")
        );
    }

    #[test]
    fn pairs_are_scoped_per_chain() {
        let registry = ValidatorAddressRegistry::new();
        registry.register_pair("gaia", "cosmosvaloper1aaa", "cosmosvalcons1bbb");

        assert!(registry.valcons_by_valoper("osmosis", "cosmosvaloper1aaa").is_none());
    }
}
