// SPDX-License-Identifier: MIT
//! Alert formatting and fan-out.
//!
//! Every alert funnels through [`AlertSink::dispatch`]: anti-spam filter
//! first (when the alert carries a case), then one [`QueueMessage`] per
//! surviving watcher identity, each addressed to that user's own chat and
//! classed priority when the user is root.

use std::sync::Arc;
use std::time::Duration;

use tracing::warn;

use crate::push::{AlertCase, AlertThrottle, MessagePusher, QueueMessage};
use crate::registry::UserRegistry;

pub struct AlertSink {
    users: Arc<UserRegistry>,
    throttle: Arc<AlertThrottle>,
    pusher: Arc<MessagePusher>,
}

impl AlertSink {
    pub fn new(
        users: Arc<UserRegistry>,
        throttle: Arc<AlertThrottle>,
        pusher: Arc<MessagePusher>,
    ) -> Self {
        Self {
            users,
            throttle,
            pusher,
        }
    }

    /// Enqueue `text` for every identity that passes the anti-spam filter.
    ///
    /// `case = None` skips deduplication entirely. A watcher identity with
    /// an incomplete chat config is a programming error — the reload
    /// validator forbids it — and panics; the probe guard turns that into a
    /// logged, non-lethal probe failure.
    pub fn dispatch(
        &self,
        chain_name: &str,
        validator: Option<&str>,
        text: &str,
        fatal: bool,
        case: Option<(AlertCase, Duration)>,
        identities: &[String],
    ) {
        let allowed = match case {
            Some((case, min_interval)) => self.throttle.filter_allowed(case, identities, min_interval),
            None => identities.to_vec(),
        };
        if allowed.is_empty() {
            return;
        }

        let mut formatted = String::new();
        if fatal {
            formatted.push_str("*FATAL!!* ");
        }
        formatted.push_str(&format!("[{chain_name}] "));
        if let Some(valoper) = validator {
            formatted.push_str(&format!("[{valoper}] "));
        }
        formatted.push_str(text);

        for identity in allowed {
            let Some(user) = self.users.by_identity(&identity) else {
                warn!(identity = %identity, "watcher identity unknown — skipping alert");
                continue;
            };
            let Some(chat) = user.chat.as_ref().filter(|c| c.is_complete()) else {
                panic!("watcher {identity} has no complete chat config — forbidden by reload validation");
            };

            self.pusher.enqueue(QueueMessage {
                receiver_id: chat.id,
                priority: user.root,
                fatal,
                text: formatted.clone(),
                enqueued_at_utc: None,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::UsersConfig;

    fn sink_with_users() -> (AlertSink, Arc<MessagePusher>) {
        let users = Arc::new(UserRegistry::new());
        let mut config: UsersConfig = serde_yaml::from_str(
            r#"
users:
  alice:
    root: true
    telegram: {username: alice, id: 1001, token: t}
  bob:
    telegram: {username: bob, id: 1002, token: t}
"#,
        )
        .unwrap();
        for (identity, record) in config.users.iter_mut() {
            record.identity = identity.clone();
        }
        users.update(&config).unwrap();

        let pusher = Arc::new(MessagePusher::new());
        let sink = AlertSink::new(users, Arc::new(AlertThrottle::new()), pusher.clone());
        (sink, pusher)
    }

    #[test]
    fn formats_and_routes_per_identity() {
        let (sink, pusher) = sink_with_users();
        sink.dispatch(
            "gaia",
            Some("cosmosvaloper1aaa"),
            "is jailed",
            true,
            None,
            &["alice".to_string(), "bob".to_string()],
        );

        assert_eq!(pusher.pending_for(1001), 1);
        assert_eq!(pusher.pending_for(1002), 1);
    }

    #[test]
    fn case_alerts_are_deduplicated_per_user() {
        let (sink, pusher) = sink_with_users();
        let case = Some((AlertCase::Jailed, Duration::from_secs(1800)));
        let ids = vec!["alice".to_string()];

        sink.dispatch("gaia", Some("cosmosvaloper1aaa"), "is jailed", true, case, &ids);
        sink.dispatch("gaia", Some("cosmosvaloper1aaa"), "is jailed", true, case, &ids);

        assert_eq!(pusher.pending_for(1001), 1);
    }

    #[test]
    fn unknown_identities_are_skipped() {
        let (sink, pusher) = sink_with_users();
        sink.dispatch("gaia", None, "stale block", false, None, &["ghost".to_string()]);
        assert_eq!(pusher.pending_for(1001), 0);
    }
}
