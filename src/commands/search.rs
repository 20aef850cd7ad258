// SPDX-License-Identifier: MIT
//! `/search <substring>` — find operator addresses you watch.

use std::collections::BTreeMap;

use super::CommandContext;
use crate::AppContext;

pub(super) fn run(ctx: &AppContext, cmd: &CommandContext) -> String {
    let query = cmd.args.trim().to_lowercase();
    if query.is_empty() {
        return "Please provide a part of the validator operator address you want to search for!\nUse /validators to list all validators"
            .to_string();
    }
    if query.len() < 3 {
        return "Search query must be at least 3 characters long!".to_string();
    }

    // valoper → watched-by-caller
    let mut matches: BTreeMap<String, bool> = BTreeMap::new();
    for chain in ctx.chains.all() {
        for validator in chain.validators() {
            if !validator.operator_address.contains(&query) {
                continue;
            }
            let watched = validator.watchers.iter().any(|w| w == &cmd.identity);
            if watched {
                matches.insert(validator.operator_address.clone(), true);
            } else if cmd.is_root {
                matches.entry(validator.operator_address.clone()).or_insert(false);
            }
        }
    }

    if matches.is_empty() {
        return "Not match any, try longer query!".to_string();
    }

    let mut out = String::new();
    for (i, (valoper, watched)) in matches.iter().enumerate() {
        if i > 0 {
            out.push_str("\n\n");
        }
        out.push_str(valoper);
        if !watched {
            out.push_str(" (not subscribed)");
        }
    }
    out
}
