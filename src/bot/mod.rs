// SPDX-License-Identifier: MIT
//! Chat transport seam.
//!
//! [`ChatTransport`] is everything the daemon needs from a chat backend:
//! send a text to a chat id, and poll for inbound updates. The production
//! implementation is the Telegram Bot API ([`TelegramTransport`]); tests and
//! future backends plug in behind the same trait.

pub mod telegram;

pub use telegram::TelegramTransport;

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BotError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("chat api error: {0}")]
    Api(String),
    #[error("malformed chat api response: {0}")]
    Malformed(String),
    #[error("bot registry is shutting down")]
    ShuttingDown,
}

/// One inbound chat message.
#[derive(Debug, Clone)]
pub struct Update {
    pub chat_id: i64,
    pub from_user_id: i64,
    pub text: String,
}

/// The transport seam to one chat bot instance.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    async fn send_message(&self, text: &str, chat_id: i64) -> Result<(), BotError>;
    /// Long-poll for the next batch of updates. May return an empty batch.
    async fn poll_updates(&self) -> Result<Vec<Update>, BotError>;
}

/// Split a `/command arg arg` text into `(command, args)`.
///
/// A `@botname` suffix on the command (group-chat addressing) is stripped.
/// Returns `None` for plain messages.
pub fn parse_command(text: &str) -> Option<(String, String)> {
    let text = text.trim();
    let rest = text.strip_prefix('/')?;
    if rest.is_empty() {
        return None;
    }

    let (head, args) = match rest.split_once(char::is_whitespace) {
        Some((head, args)) => (head, args.trim()),
        None => (rest, ""),
    };
    let command = head.split('@').next().unwrap_or(head);
    if command.is_empty() {
        return None;
    }
    Some((command.to_string(), args.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_command_with_args() {
        assert_eq!(
            parse_command("/pause cosmoshub 5m"),
            Some(("pause".to_string(), "cosmoshub 5m".to_string()))
        );
    }

    #[test]
    fn parses_bare_command() {
        assert_eq!(parse_command("/me"), Some(("me".to_string(), String::new())));
    }

    #[test]
    fn strips_bot_name_suffix() {
        assert_eq!(
            parse_command("/chains@valwatch_bot"),
            Some(("chains".to_string(), String::new()))
        );
    }

    #[test]
    fn ignores_plain_messages() {
        assert_eq!(parse_command("hello there"), None);
        assert_eq!(parse_command("/"), None);
        assert_eq!(parse_command(""), None);
    }
}
