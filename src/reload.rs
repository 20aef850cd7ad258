// SPDX-License-Identifier: MIT
//! Hot-reload loop.
//!
//! Re-reads the config files on an interval and rebuilds the user and chain
//! registries. Each pass is three stages — users, bots, chains — and any
//! validation failure leaves the previously installed state in effect. The
//! first pass runs immediately on startup.

use tracing::{error, info, warn};

use crate::config::{load_chains_config, UsersConfig};
use crate::AppContext;

pub async fn run_hot_reload(ctx: AppContext) {
    let interval = ctx.config.hot_reload_interval();
    info!(interval = ?interval, "hot-reload loop started");

    loop {
        reload_once(&ctx);
        tokio::select! {
            _ = ctx.shutdown.cancelled() => break,
            _ = tokio::time::sleep(interval) => {}
        }
    }

    info!("hot-reload loop stopped");
}

/// One full reload pass.
pub fn reload_once(ctx: &AppContext) {
    // Stage 1 — users. A bad users file aborts the whole pass.
    let users = match UsersConfig::load(&ctx.home_dir) {
        Ok(users) => users,
        Err(e) => {
            error!(err = %e, "failed to load users config — keeping previous state");
            return;
        }
    };
    if let Err(e) = ctx.users.update(&users) {
        error!(err = %e, "users config failed validation — keeping previous state");
        return;
    }

    // Stage 2 — bots. One bot per distinct token; creation failures are
    // retried on the next pass, the user's alerts stay queued meanwhile.
    for record in users.records() {
        let Some(chat) = record.chat.as_ref().filter(|c| c.is_complete()) else {
            continue;
        };
        match ctx.bots.get_or_create(&chat.token) {
            Ok(bot) => {
                bot.add_chat_id(chat.id);
                if record.root {
                    bot.mark_priority();
                }
            }
            Err(e) => {
                warn!(identity = %record.identity, err = %e, "failed to create bot — will retry next reload");
            }
        }
    }

    // Stage 3 — chains, validated against the users just installed.
    let chains = match load_chains_config(&ctx.home_dir) {
        Ok(chains) => chains,
        Err(e) => {
            error!(err = %e, "failed to load chains config — keeping previous chains");
            return;
        }
    };
    match ctx.chains.update(chains, &users) {
        Ok(()) => info!("config reloaded"),
        Err(e) => error!(err = %e, "chains config failed validation — keeping previous chains"),
    }
}
