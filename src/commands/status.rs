// SPDX-License-Identifier: MIT
//! `/status` — currently paused chains and validators, with expiries.

use chrono::{DateTime, Utc};

use super::{format_time, CommandContext};
use crate::AppContext;

pub(super) fn run(ctx: &AppContext, cmd: &CommandContext) -> String {
    let mut paused_chains_subscribed: Vec<(String, Option<DateTime<Utc>>)> = Vec::new();
    let mut paused_chains_other: Vec<(String, Option<DateTime<Utc>>)> = Vec::new();
    let mut paused_validators_subscribed: Vec<(String, Option<DateTime<Utc>>)> = Vec::new();
    let mut paused_validators_other: Vec<(String, Option<DateTime<Utc>>)> = Vec::new();

    for chain in ctx.chains.all() {
        let (chain_paused, chain_expiry) = ctx.pauses.is_chain_paused(chain.name());
        let mut subscribed_chain = false;

        for validator in chain.validators() {
            let subscribed = validator.watchers.iter().any(|w| w == &cmd.identity);
            subscribed_chain = subscribed_chain || subscribed;

            let (paused, expiry) = ctx.pauses.is_validator_paused(&validator.operator_address);
            if !paused {
                continue;
            }
            if subscribed {
                paused_validators_subscribed.push((validator.operator_address.clone(), expiry));
            } else {
                paused_validators_other.push((validator.operator_address.clone(), expiry));
            }
        }

        if chain_paused {
            if subscribed_chain {
                paused_chains_subscribed.push((chain.name().to_string(), chain_expiry));
            } else {
                paused_chains_other.push((chain.name().to_string(), chain_expiry));
            }
        }
    }

    let render = |out: &mut String, entries: &mut Vec<(String, Option<DateTime<Utc>>)>| {
        if entries.is_empty() {
            out.push_str(" None");
            return;
        }
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        for (name, expiry) in entries {
            out.push_str("\n- ");
            out.push_str(name);
            if let Some(expiry) = expiry {
                out.push_str(&format!(" (until {})", format_time(*expiry)));
            }
        }
    };

    let mut out = String::from("Paused chains you subscribed:");
    render(&mut out, &mut paused_chains_subscribed);

    out.push_str("\n\nPaused validators you subscribed:");
    render(&mut out, &mut paused_validators_subscribed);

    if cmd.is_root {
        out.push_str("\n\n(Root) Paused chains you not subscribed:");
        render(&mut out, &mut paused_chains_other);

        out.push_str("\n\n(Root) Paused validators you not subscribed:");
        render(&mut out, &mut paused_validators_other);
    }

    out
}
