// SPDX-License-Identifier: MIT
//! `chain.<name>.yaml` — one file per monitored chain.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;

use super::{check_file_permission, ConfigError, UsersConfig, CHAIN_FILE_PREFIX, CHAIN_FILE_SUFFIX};
use crate::address::is_valoper_address;

static NAME: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[\w-]+$").expect("static regex"));

#[derive(Debug, Clone, Deserialize)]
pub struct ChainValidatorConfig {
    /// Filled from the map key after deserialisation.
    #[serde(skip)]
    pub operator_address: String,
    #[serde(default)]
    pub watchers: Vec<String>,
    /// The validator's own node; when present it is probed directly.
    #[serde(default, rename = "health-check-rpc")]
    pub direct_rpc: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChainConfig {
    #[serde(rename = "chain-name")]
    pub chain_name: String,
    #[serde(rename = "chain-id")]
    pub chain_id: String,
    #[serde(default)]
    pub disable: bool,
    #[serde(default)]
    pub priority: bool,
    #[serde(default)]
    pub rpc: Vec<String>,
    /// The operator's own RPC nodes, probed in addition to the public set.
    #[serde(default, rename = "health-check-rpc")]
    pub health_check_rpc: Vec<String>,
    #[serde(default)]
    pub validators: HashMap<String, ChainValidatorConfig>,
}

impl ChainConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.chain_name.is_empty() {
            return Err(ConfigError::Invalid("chain name is missing".into()));
        }
        if !NAME.is_match(&self.chain_name) {
            return Err(ConfigError::Invalid(format!(
                "chain name {} must be alphanumeric, underscore and dash only",
                self.chain_name
            )));
        }
        if self.chain_id.is_empty() {
            return Err(ConfigError::Invalid(format!(
                "chain id is missing for {}",
                self.chain_name
            )));
        }
        if !NAME.is_match(&self.chain_id) {
            return Err(ConfigError::Invalid(format!(
                "chain id {} must be alphanumeric, underscore and dash only",
                self.chain_id
            )));
        }

        // A disabled chain only needs a well-formed identity.
        if self.disable {
            return Ok(());
        }

        if self.rpc.is_empty() {
            return Err(ConfigError::Invalid(format!(
                "RPC endpoints are missing for {}",
                self.chain_name
            )));
        }
        if self.rpc.iter().any(String::is_empty)
            || self.health_check_rpc.iter().any(String::is_empty)
        {
            return Err(ConfigError::Invalid(format!(
                "RPC endpoints for {} contain an empty string",
                self.chain_name
            )));
        }
        if self.validators.is_empty() {
            return Err(ConfigError::Invalid(format!(
                "validators are missing for {}",
                self.chain_name
            )));
        }

        for validator in self.validators.values() {
            if !is_valoper_address(&validator.operator_address) {
                return Err(ConfigError::Invalid(format!(
                    "validator operator address {} is invalid",
                    validator.operator_address
                )));
            }
            if validator.watchers.is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "watchers for {} are missing",
                    validator.operator_address
                )));
            }
            if validator.watchers.iter().any(String::is_empty) {
                return Err(ConfigError::Invalid(format!(
                    "watchers for {} contain an empty string",
                    validator.operator_address
                )));
            }
        }

        Ok(())
    }
}

pub type ChainsConfig = Vec<ChainConfig>;

/// Load every `chain.*.yaml` file in the home directory.
pub fn load_chains_config(home_dir: &Path) -> Result<ChainsConfig, ConfigError> {
    let mut configs = ChainsConfig::new();

    for entry in std::fs::read_dir(home_dir)? {
        let entry = entry?;
        let file_name = entry.file_name();
        let Some(name) = file_name.to_str() else {
            continue;
        };
        if !name.starts_with(CHAIN_FILE_PREFIX) || !name.ends_with(CHAIN_FILE_SUFFIX) {
            continue;
        }
        if !entry.file_type()?.is_file() {
            continue;
        }

        let path = entry.path();
        check_file_permission(&path)?;

        let raw = std::fs::read_to_string(&path)?;
        let mut config: ChainConfig = serde_yaml::from_str(&raw)?;
        for (valoper, validator) in config.validators.iter_mut() {
            validator.operator_address = valoper.clone();
        }
        configs.push(config);
    }

    if configs.is_empty() {
        return Err(ConfigError::Invalid(format!(
            "no chain config found in {}",
            home_dir.display()
        )));
    }

    Ok(configs)
}

/// Validate a full chain set against the user set it will run with.
///
/// Every watcher identity must resolve to a user with a complete chat config
/// — the workers and the pusher rely on this and treat a miss at runtime as
/// a programming error.
pub fn validate_chains_config(
    chains: &ChainsConfig,
    users: &UsersConfig,
) -> Result<(), ConfigError> {
    if chains.is_empty() {
        return Err(ConfigError::Invalid("no chain config".into()));
    }

    let mut unique_names: HashSet<&str> = HashSet::new();
    let mut enabled = 0usize;

    for chain in chains {
        chain.validate()?;
        if !unique_names.insert(&chain.chain_name) {
            return Err(ConfigError::Invalid(format!(
                "duplicate chain name: {}",
                chain.chain_name
            )));
        }
        if chain.disable {
            continue;
        }
        enabled += 1;

        for validator in chain.validators.values() {
            for watcher in &validator.watchers {
                let Some(user) = users.get(watcher) else {
                    return Err(ConfigError::Invalid(format!(
                        "watcher identity {watcher} for chain {} validator {} does not exist",
                        chain.chain_name, validator.operator_address
                    )));
                };
                if !user.has_complete_chat() {
                    return Err(ConfigError::Invalid(format!(
                        "watcher identity {watcher} for chain {} validator {} has no complete chat config",
                        chain.chain_name, validator.operator_address
                    )));
                }
            }
        }
    }

    if enabled == 0 {
        return Err(ConfigError::Invalid("no enabled chain config".into()));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALOPER: &str = "cosmosvaloper1sjllsnramtg3ewxqwwrwjxfgc4n4ef9u2lcnj0";

    fn users() -> UsersConfig {
        let mut config: UsersConfig = serde_yaml::from_str(
            r#"
users:
  alice:
    root: true
    telegram: {username: alice, id: 1001, token: t}
"#,
        )
        .unwrap();
        for (identity, record) in config.users.iter_mut() {
            record.identity = identity.clone();
        }
        config
    }

    fn chain(yaml: &str) -> ChainConfig {
        let mut config: ChainConfig = serde_yaml::from_str(yaml).unwrap();
        for (valoper, validator) in config.validators.iter_mut() {
            validator.operator_address = valoper.clone();
        }
        config
    }

    #[test]
    fn accepts_well_formed_chain() {
        let config = chain(&format!(
            r#"
chain-name: cosmoshub
chain-id: cosmoshub-4
rpc: ["https://rpc.one", "https://rpc.two"]
health-check-rpc: ["https://own.node"]
validators:
  {VALOPER}:
    watchers: [alice]
"#
        ));
        validate_chains_config(&vec![config], &users()).unwrap();
    }

    #[test]
    fn rejects_unknown_watcher() {
        let config = chain(&format!(
            r#"
chain-name: cosmoshub
chain-id: cosmoshub-4
rpc: ["https://rpc.one"]
validators:
  {VALOPER}:
    watchers: [nobody]
"#
        ));
        assert!(validate_chains_config(&vec![config], &users()).is_err());
    }

    #[test]
    fn rejects_duplicate_chain_names() {
        let make = || {
            chain(&format!(
                r#"
chain-name: cosmoshub
chain-id: cosmoshub-4
rpc: ["https://rpc.one"]
validators:
  {VALOPER}:
    watchers: [alice]
"#
            ))
        };
        assert!(validate_chains_config(&vec![make(), make()], &users()).is_err());
    }

    #[test]
    fn rejects_invalid_operator_address() {
        let config = chain(
            r#"
chain-name: cosmoshub
chain-id: cosmoshub-4
rpc: ["https://rpc.one"]
validators:
  notanaddress:
    watchers: [alice]
"#,
        );
        assert!(validate_chains_config(&vec![config], &users()).is_err());
    }

    #[test]
    fn disabled_chain_skips_content_checks() {
        let config = chain(
            r#"
chain-name: parked
chain-id: parked-1
disable: true
"#,
        );
        // A second, enabled chain keeps the "no enabled chain" check quiet.
        let enabled = chain(&format!(
            r#"
chain-name: cosmoshub
chain-id: cosmoshub-4
rpc: ["https://rpc.one"]
validators:
  {VALOPER}:
    watchers: [alice]
"#
        ));
        validate_chains_config(&vec![config, enabled], &users()).unwrap();
    }

    #[test]
    fn all_disabled_is_an_error() {
        let config = chain(
            r#"
chain-name: parked
chain-id: parked-1
disable: true
"#,
        );
        assert!(validate_chains_config(&vec![config], &users()).is_err());
    }
}
