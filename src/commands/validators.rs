// SPDX-License-Identifier: MIT
//! `/validators` — your validators grouped by chain.

use super::CommandContext;
use crate::AppContext;

pub(super) fn run(ctx: &AppContext, cmd: &CommandContext) -> String {
    let watched = ctx.chains.watched_by(&cmd.identity);

    let mut all = ctx.chains.all();
    all.sort_by(|a, b| {
        b.is_priority()
            .cmp(&a.is_priority())
            .then_with(|| a.name().cmp(b.name()))
    });

    let mut out = String::from("Validators you subscribed:");
    if watched.is_empty() {
        out.push_str(" None");
    } else {
        for chain in &all {
            let Some(valopers) = watched.get(chain.name()) else {
                continue;
            };
            let chain_paused = ctx.pauses.is_chain_paused(chain.name()).0;
            for valoper in valopers {
                out.push_str("\n\n- ");
                if ctx.pauses.is_validator_paused(valoper).0 {
                    out.push_str("(PAUSED) ");
                }
                out.push_str(valoper);
                if chain_paused {
                    out.push_str(&format!(" ({} - PAUSED)", chain.name()));
                } else {
                    out.push_str(&format!(" ({})", chain.name()));
                }
            }
        }
    }

    if cmd.is_root {
        let not_watched: Vec<&str> = all
            .iter()
            .filter(|chain| !watched.contains_key(chain.name()))
            .map(|chain| chain.name())
            .collect();
        if !not_watched.is_empty() {
            out.push_str("\n\n(Root) Chains you not subscribed:");
            for name in not_watched {
                out.push_str("\n- ");
                if ctx.pauses.is_chain_paused(name).0 {
                    out.push_str("(PAUSED) ");
                }
                out.push_str(name);
            }
        }
    }

    out
}
