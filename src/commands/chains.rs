// SPDX-License-Identifier: MIT
//! `/chains` — chains you subscribe to; root users also see the rest.

use super::CommandContext;
use crate::AppContext;

pub(super) fn run(ctx: &AppContext, cmd: &CommandContext) -> String {
    let watched = ctx.chains.watched_by(&cmd.identity);

    let mut all = ctx.chains.all();
    // Priority chains first, then by name.
    all.sort_by(|a, b| {
        b.is_priority()
            .cmp(&a.is_priority())
            .then_with(|| a.name().cmp(b.name()))
    });

    let mut subscribed = Vec::new();
    let mut not_subscribed = Vec::new();
    for chain in &all {
        if watched.contains_key(chain.name()) {
            subscribed.push(chain.name().to_string());
        } else {
            not_subscribed.push(chain.name().to_string());
        }
    }

    let render = |out: &mut String, names: &[String]| {
        if names.is_empty() {
            out.push_str(" None");
            return;
        }
        for name in names {
            out.push_str("\n- ");
            if ctx.pauses.is_chain_paused(name).0 {
                out.push_str("(PAUSED) ");
            }
            out.push_str(name);
        }
    };

    let mut out = String::from("Chains you subscribed:");
    render(&mut out, &subscribed);

    if cmd.is_root && !not_subscribed.is_empty() {
        out.push_str("\n\n(Root) Chains you not subscribed:");
        render(&mut out, &not_subscribed);
    }

    out
}
