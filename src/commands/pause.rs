// SPDX-License-Identifier: MIT
//! `/pause <target> [<duration>]` — mute a validator, or (root) a chain.
//!
//! A target containing `valoper` is a validator operator address; anything
//! else is a chain name and needs root. `0`/`0s` unpauses, an omitted
//! duration pauses "without release date" (~30 years), finite pauses are
//! capped at 7 hours. Root users are notified of every change.

use std::time::Duration;

use super::{enqueue_to_all_root_users, format_time, parse_duration_arg, CommandContext};
use crate::AppContext;

const MAX_PAUSE: Duration = Duration::from_secs(7 * 60 * 60);
/// "Without release date".
const PRACTICALLY_FOREVER: Duration = Duration::from_secs(30 * 365 * 24 * 60 * 60);

pub(super) fn run(ctx: &AppContext, cmd: &CommandContext) -> String {
    let args = cmd.args.trim();
    if args.is_empty() {
        return if cmd.is_root {
            "Please provide a chain or a validator to pause!\nSee the list at /chains or /validators"
                .to_string()
        } else {
            "Please provide a validator to pause!\nSee the list at /validators".to_string()
        };
    }

    let parts: Vec<&str> = args.split_whitespace().collect();
    if parts.len() > 2 {
        return "Invalid arguments!".to_string();
    }

    let target = parts[0];
    let duration = match parts.get(1) {
        None => Some(PRACTICALLY_FOREVER),
        Some(token) => match parse_duration_arg(token) {
            Ok(None) => None,
            Ok(Some(duration)) => {
                if duration > MAX_PAUSE {
                    return "Duration must be less than 7 hours!".to_string();
                }
                if duration.is_zero() {
                    return "Duration must be positive!".to_string();
                }
                Some(duration)
            }
            Err(message) => return message,
        },
    };

    if cmd.is_root && !target.contains("valoper") {
        if let Some(reply) = try_pause_chain(ctx, cmd, target, duration) {
            return reply;
        }
    }

    if let Some(reply) = try_pause_validator(ctx, cmd, target, duration) {
        return reply;
    }

    if cmd.is_root {
        "No chain or validator found with the provided identifier!\nSee the list at /chains or /validators"
            .to_string()
    } else {
        "No validator found with the provided identifier!\nSee the list at /validators".to_string()
    }
}

fn try_pause_chain(
    ctx: &AppContext,
    cmd: &CommandContext,
    chain_name: &str,
    duration: Option<Duration>,
) -> Option<String> {
    assert!(cmd.is_root, "chain pause requires root");

    if !ctx.chains.has_chain(chain_name) {
        return None;
    }

    match duration {
        None => {
            ctx.pauses.unpause_chain(chain_name);
            enqueue_to_all_root_users(
                ctx,
                &format!("{} has unpaused chain [{chain_name}]", cmd.username),
                false,
            );
            Some(format!("Unpaused chain [{chain_name}]"))
        }
        Some(duration) => {
            let expiry = ctx.pauses.pause_chain(chain_name, duration);
            enqueue_to_all_root_users(
                ctx,
                &format!(
                    "{} has paused chain [{chain_name}] for {}, until {}",
                    cmd.username,
                    humantime::format_duration(duration),
                    format_time(expiry)
                ),
                true,
            );
            Some(format!("Paused chain [{chain_name}] until {}", format_time(expiry)))
        }
    }
}

fn try_pause_validator(
    ctx: &AppContext,
    cmd: &CommandContext,
    valoper: &str,
    duration: Option<Duration>,
) -> Option<String> {
    // Locate the validator and check the caller is allowed to touch it:
    // root, or one of its watchers.
    let mut chain_name: Option<String> = None;
    let mut granted = cmd.is_root;

    'chains: for chain in ctx.chains.all() {
        for validator in chain.validators() {
            if validator.operator_address != valoper {
                continue;
            }
            chain_name = Some(chain.name().to_string());
            granted = granted || validator.watchers.iter().any(|w| w == &cmd.identity);
            break 'chains;
        }
    }

    let chain_name = chain_name?;
    if !granted {
        return None;
    }

    match duration {
        None => {
            ctx.pauses.unpause_validator(valoper);
            enqueue_to_all_root_users(
                ctx,
                &format!(
                    "{} has unpaused validator [{valoper}] in chain [{chain_name}]",
                    cmd.username
                ),
                false,
            );
            Some(format!("Unpaused validator [{valoper}] in chain [{chain_name}]"))
        }
        Some(duration) => {
            let expiry = ctx.pauses.pause_validator(valoper, duration);
            enqueue_to_all_root_users(
                ctx,
                &format!(
                    "{} has paused validator [{valoper}] in chain [{chain_name}] for {}, until {}",
                    cmd.username,
                    humantime::format_duration(duration),
                    format_time(expiry)
                ),
                true,
            );
            Some(format!(
                "Paused validator [{valoper}] in chain [{chain_name}] until {}",
                format_time(expiry)
            ))
        }
    }
}
