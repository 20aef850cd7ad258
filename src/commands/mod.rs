// SPDX-License-Identifier: MIT
//! Command dispatcher — the inbound control channel.
//!
//! One dispatcher task per bot reads that bot's update stream, authenticates
//! the sender against the user registry, applies a per-user rate limit and
//! routes to the command handlers. Handlers read the registries and reply
//! directly through the bot; only `/pause` additionally fans a notification
//! out to root users via the push queue.

mod chains;
mod help;
mod last;
mod me;
mod pause;
mod search;
mod silent;
mod status;
mod validators;

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::bot::{parse_command, BotError, Update};
use crate::push::QueueMessage;
use crate::registry::RegisteredBot;
use crate::AppContext;

/// One command per user per this interval.
const COMMAND_RATE_LIMIT: Duration = Duration::from_secs(3);
/// Backoff after a failed update poll.
const POLL_FAILURE_BACKOFF: Duration = Duration::from_secs(3);

/// Resolved sender plus parsed command arguments, handed to every handler.
pub struct CommandContext {
    pub chat_id: i64,
    pub user_id: i64,
    pub identity: String,
    pub username: String,
    pub is_root: bool,
    pub args: String,
}

// ─── Rate limiter ────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct RateLimiter {
    last_request: Mutex<HashMap<i64, DateTime<Utc>>>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allow(&self, key: i64, interval: Duration) -> bool {
        self.allow_at(key, interval, Utc::now())
    }

    pub fn allow_at(&self, key: i64, interval: Duration, now: DateTime<Utc>) -> bool {
        let interval = chrono::Duration::from_std(interval).unwrap_or(chrono::Duration::MAX);
        let mut map = self.last_request.lock().expect("rate limiter lock poisoned");
        if map.get(&key).is_some_and(|last| now - *last < interval) {
            return false;
        }
        map.insert(key, now);
        true
    }
}

// ─── Dispatcher service ──────────────────────────────────────────────────────

/// Consume bot announcements and spawn one dispatcher task per bot.
pub async fn run_dispatch_service(
    ctx: AppContext,
    mut announced: mpsc::UnboundedReceiver<Arc<RegisteredBot>>,
) {
    let rate_limiter = Arc::new(RateLimiter::new());
    info!("command dispatch service started");

    loop {
        tokio::select! {
            _ = ctx.shutdown.cancelled() => break,
            bot = announced.recv() => {
                let Some(bot) = bot else { break };
                tokio::spawn(dispatcher_loop(ctx.clone(), bot, rate_limiter.clone()));
            }
        }
    }

    info!("command dispatch service stopped");
}

async fn dispatcher_loop(ctx: AppContext, bot: Arc<RegisteredBot>, rate_limiter: Arc<RateLimiter>) {
    let transport = bot.transport();
    info!("command dispatcher started for new bot");

    loop {
        let updates = tokio::select! {
            _ = ctx.shutdown.cancelled() => break,
            polled = transport.poll_updates() => match polled {
                Ok(updates) => updates,
                Err(e) => {
                    warn!(err = %e, "update poll failed");
                    tokio::select! {
                        _ = ctx.shutdown.cancelled() => break,
                        _ = tokio::time::sleep(POLL_FAILURE_BACKOFF) => {}
                    }
                    continue;
                }
            }
        };

        for update in updates {
            let Some((command, args)) = parse_command(&update.text) else {
                continue;
            };
            info!(from = update.from_user_id, command = %command, "new chat command");
            if let Err(e) = process_command(&ctx, &*transport, &rate_limiter, &update, &command, args).await
            {
                warn!(from = update.from_user_id, err = %e, "failed to process command");
            }
        }
    }

    info!("command dispatcher stopped");
}

async fn process_command(
    ctx: &AppContext,
    transport: &dyn crate::bot::ChatTransport,
    rate_limiter: &RateLimiter,
    update: &Update,
    command: &str,
    args: String,
) -> Result<(), BotError> {
    let user = ctx.users.by_chat_user_id(update.from_user_id);
    let Some(user) = user.filter(|u| u.has_complete_chat()) else {
        warn!(from = update.from_user_id, "forbidden access");
        return transport
            .send_message(
                &format!("Hey {}, you are not allowed to use this bot", update.from_user_id),
                update.chat_id,
            )
            .await;
    };

    if !rate_limiter.allow(update.from_user_id, COMMAND_RATE_LIMIT) {
        return transport
            .send_message("Rate limit exceeded, please try again later", update.chat_id)
            .await;
    }

    let username = user
        .chat
        .as_ref()
        .map(|c| c.username.clone())
        .unwrap_or_default();
    let cmd = CommandContext {
        chat_id: update.chat_id,
        user_id: update.from_user_id,
        identity: user.identity.clone(),
        username,
        is_root: user.root,
        args,
    };

    let reply = handle(ctx, &cmd, command);
    transport.send_message(&reply, update.chat_id).await
}

/// Route one authenticated command to its handler and return the reply.
/// Unknown commands fall through to `/help`.
pub fn handle(ctx: &AppContext, cmd: &CommandContext, command: &str) -> String {
    match command {
        "me" => me::run(cmd),
        "chains" => chains::run(ctx, cmd),
        "validators" => validators::run(ctx, cmd),
        "last" => last::run(ctx, cmd),
        "pause" => pause::run(ctx, cmd),
        "status" => status::run(ctx, cmd),
        "search" => search::run(ctx, cmd),
        "silent" => silent::run(ctx, cmd),
        _ => help::run(cmd),
    }
}

// ─── Shared helpers ──────────────────────────────────────────────────────────

/// Fan a notification out to every root user through the push queue.
pub(crate) fn enqueue_to_all_root_users(ctx: &AppContext, text: &str, fatal: bool) {
    for identity in ctx.users.root_identities() {
        let Some(user) = ctx.users.by_identity(&identity) else {
            continue;
        };
        let Some(chat) = user.chat.as_ref().filter(|c| c.is_complete()) else {
            continue;
        };
        ctx.pusher.enqueue(QueueMessage {
            receiver_id: chat.id,
            priority: true,
            fatal,
            text: text.to_string(),
            enqueued_at_utc: None,
        });
    }
}

/// Parse a user-supplied duration token. `"0"` and `"0s"` mean "remove",
/// mapped to `None`.
pub(crate) fn parse_duration_arg(token: &str) -> Result<Option<Duration>, String> {
    match token {
        "0" | "0s" => Ok(None),
        other => humantime::parse_duration(other)
            .map(Some)
            .map_err(|_| "Invalid duration format!".to_string()),
    }
}

pub(crate) fn format_time(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%d %H:%M:%S").to_string()
}
