// SPDX-License-Identifier: MIT
//! `/last <valoper>` — render the cached health-check view.

use chrono::Utc;

use super::{format_time, CommandContext};
use crate::AppContext;

pub(super) fn run(ctx: &AppContext, cmd: &CommandContext) -> String {
    let valoper = cmd.args.trim();
    if valoper.is_empty() {
        return "Please provide a validator operator address".to_string();
    }

    let Some(cache) = ctx.health_cache.get(valoper) else {
        let mut out = String::from("No health-check data found for the validator, reason maybe:");
        out.push_str("\n- The daemon has just restarted and no health-check data yet");
        out.push_str("\n- The validator is not registered");
        out.push_str("\n- The provided address is invalid, use /validators to list or /search by part of address");
        return out;
    };

    let mut out = String::new();
    if cache.tombstoned == Some(true) {
        out.push_str("** Tombstoned **\n");
    }
    if cache.jailed == Some(true) {
        out.push_str("** Jailed **\n");
        if let Some(until) = cache.jailed_until {
            out.push_str(&format!("(until: {})\n", format_time(until)));
        }
    }

    out.push_str("Moniker: ");
    out.push_str(&cache.moniker);
    if cache.rank > 0 {
        out.push_str(&format!("\nRank: {}", cache.rank));
    }
    out.push_str(&format!("\nValoper: {}", cache.valoper));
    out.push_str(&format!("\nValcons: {}", cache.valcons));
    if let Some(uptime) = cache.uptime {
        out.push_str(&format!("\nUptime: {uptime:.2}%"));
    }
    if let Some(bond_status) = cache.bond_status {
        out.push_str(&format!("\nBond status: {bond_status}"));
    }
    if let Some(missed) = cache.missed_blocks {
        match cache.allowed_misses {
            Some(allowed) => out.push_str(&format!("\nMissed blocks: {missed}/{allowed}")),
            None => out.push_str(&format!("\nMissed blocks: {missed}")),
        }
    }

    let age = (Utc::now() - cache.observed_at).num_seconds();
    out.push_str(&format!(
        "\nLast updated: {} ({age}s ago)",
        format_time(cache.observed_at)
    ));
    out
}
