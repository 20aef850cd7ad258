// SPDX-License-Identifier: MIT
//! Receiver-based push queue and pacer.
//!
//! Exactly one [`MessagePusher`] exists per process. Alerts and command
//! side-effects are enqueued per receiver; a single background loop picks an
//! eligible receiver, batches its pending messages under the wire-size cap,
//! filters silenced texts, and delivers through the receiver's bot. Failed
//! batches are re-enqueued in full with their original timestamps.

pub mod antispam;
pub mod queue;
pub mod silencer;

pub use antispam::{AlertCase, AlertThrottle};
pub use queue::ReceiverQueue;
pub use silencer::{SilenceError, Silencer};

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::registry::{BotRegistry, UserRegistry};
use crate::retry::retry_default;

/// Literal divider between batched messages.
pub const BATCH_LINE_DIVIDER: &str = "\n---\n";
/// Cumulative text cap per delivered batch (the transport's message limit).
pub const MAX_BATCH_TEXT_BYTES: usize = 4096;
/// Maximum messages drained per delivery.
pub const BATCH_SIZE_PER_USER: usize = 20;
/// Cooldown between sends to the same receiver.
pub const MIN_BETWEEN_SAME_RECEIVER: Duration = Duration::from_secs(60);

const PACER_TICK: Duration = Duration::from_millis(300);
/// Global breather after a delivered pass, against transport rate limits.
const POST_DELIVERY_THROTTLE: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct QueueMessage {
    /// Chat user id of the receiver.
    pub receiver_id: i64,
    pub priority: bool,
    pub fatal: bool,
    pub text: String,
    /// Stamped on first enqueue; preserved across re-enqueues.
    pub enqueued_at_utc: Option<DateTime<Utc>>,
}

#[derive(Default)]
struct Queues {
    by_receiver: HashMap<i64, Arc<ReceiverQueue>>,
    priority: Vec<Arc<ReceiverQueue>>,
    normal: Vec<Arc<ReceiverQueue>>,
}

pub struct MessagePusher {
    queues: RwLock<Queues>,
    cooldown: Duration,
    tick: Duration,
    post_delivery_throttle: Duration,
}

impl MessagePusher {
    pub fn new() -> Self {
        Self::with_pacing(MIN_BETWEEN_SAME_RECEIVER, PACER_TICK, POST_DELIVERY_THROTTLE)
    }

    /// Pusher with custom pacing. Tests shrink the intervals.
    pub fn with_pacing(cooldown: Duration, tick: Duration, post_delivery_throttle: Duration) -> Self {
        Self {
            queues: RwLock::new(Queues::default()),
            cooldown,
            tick,
            post_delivery_throttle,
        }
    }

    /// Stamp the enqueue time if unset and append to the receiver's queue,
    /// creating it on first contact. The parent lock only guards the queue
    /// lookup; the append happens on the child's own lock.
    pub fn enqueue(&self, mut message: QueueMessage) {
        if message.enqueued_at_utc.is_none() {
            message.enqueued_at_utc = Some(Utc::now());
        }

        let queue = {
            let mut queues = self.queues.write().expect("pusher lock poisoned");
            match queues.by_receiver.get(&message.receiver_id) {
                Some(queue) => queue.clone(),
                None => {
                    let queue = Arc::new(ReceiverQueue::new(message.receiver_id, message.priority));
                    queues.by_receiver.insert(message.receiver_id, queue.clone());
                    if message.priority {
                        queues.priority.push(queue.clone());
                    } else {
                        queues.normal.push(queue.clone());
                    }
                    queue
                }
            }
        };

        queue.enqueue(message);
    }

    /// Priority class first, then non-priority, in registration order.
    fn snapshot(&self) -> Vec<Arc<ReceiverQueue>> {
        let queues = self.queues.read().expect("pusher lock poisoned");
        queues
            .priority
            .iter()
            .chain(queues.normal.iter())
            .cloned()
            .collect()
    }

    /// Number of messages currently pending for `receiver_id`.
    pub fn pending_for(&self, receiver_id: i64) -> usize {
        self.queues
            .read()
            .expect("pusher lock poisoned")
            .by_receiver
            .get(&receiver_id)
            .map(|q| q.len())
            .unwrap_or(0)
    }

    /// Run one delivery pass. Returns `true` when a batch was delivered.
    pub async fn deliver_once(
        &self,
        users: &UserRegistry,
        bots: &BotRegistry,
        silencer: &Silencer,
    ) -> bool {
        let Some(queue) = pick_eligible(&self.snapshot(), self.cooldown, Utc::now()) else {
            return false;
        };
        let receiver_id = queue.receiver_id();

        let mut messages = queue.dequeue(BATCH_SIZE_PER_USER);
        if messages.is_empty() {
            return false;
        }

        messages.retain(|message| {
            let silenced = silencer.is_silenced(receiver_id, &message.text);
            if silenced {
                debug!(receiver = receiver_id, "dropping silenced message");
            }
            !silenced
        });
        if messages.is_empty() {
            return false;
        }

        // Fatal first, then oldest first.
        messages.sort_by(|a, b| {
            b.fatal
                .cmp(&a.fatal)
                .then(a.enqueued_at_utc.cmp(&b.enqueued_at_utc))
        });

        let combined: String = messages
            .iter()
            .map(|m| m.text.as_str())
            .collect::<Vec<_>>()
            .join(BATCH_LINE_DIVIDER);

        let outcome = self
            .send_batch(users, bots, receiver_id, &combined)
            .await;

        match outcome {
            Ok(()) => {
                info!(
                    receiver = receiver_id,
                    count = messages.len(),
                    bytes = combined.len(),
                    "delivered message batch"
                );
                true
            }
            Err(e) => {
                warn!(
                    receiver = receiver_id,
                    count = messages.len(),
                    err = %e,
                    "failed to deliver batch — re-enqueueing"
                );
                for message in messages {
                    self.enqueue(message);
                }
                false
            }
        }
    }

    async fn send_batch(
        &self,
        users: &UserRegistry,
        bots: &BotRegistry,
        receiver_id: i64,
        text: &str,
    ) -> anyhow::Result<()> {
        let user = users
            .by_chat_user_id(receiver_id)
            .ok_or_else(|| anyhow::anyhow!("user record not found for receiver id {receiver_id}"))?;
        let chat = user
            .chat
            .as_ref()
            .filter(|c| c.is_complete())
            .ok_or_else(|| anyhow::anyhow!("chat config is incomplete for {}", user.identity))?;

        let bot = bots.get_or_create(&chat.token)?;
        let transport = bot.transport();
        retry_default(|| transport.send_message(text, receiver_id)).await?;
        Ok(())
    }

    /// Background delivery loop; exits when `shutdown` fires.
    pub async fn run(
        self: Arc<Self>,
        users: Arc<UserRegistry>,
        bots: Arc<BotRegistry>,
        silencer: Arc<Silencer>,
        shutdown: CancellationToken,
    ) {
        info!("message pusher started");
        let mut delivered_prev = false;
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = tokio::time::sleep(self.tick) => {}
            }
            if delivered_prev {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = tokio::time::sleep(self.post_delivery_throttle) => {}
                }
            }
            delivered_prev = self.deliver_once(&users, &bots, &silencer).await;
        }
        info!("message pusher stopped");
    }
}

impl Default for MessagePusher {
    fn default() -> Self {
        Self::new()
    }
}

/// Scan for a sendable queue: non-empty and past its cooldown. The scan
/// deliberately keeps overwriting, so the LAST eligible queue in snapshot
/// order wins; since priority queues sit at the front of the snapshot, this
/// hands the slot to a starved non-priority receiver whenever one is ready.
fn pick_eligible(
    queues: &[Arc<ReceiverQueue>],
    cooldown: Duration,
    now: DateTime<Utc>,
) -> Option<Arc<ReceiverQueue>> {
    let cooldown = chrono::Duration::from_std(cooldown).unwrap_or(chrono::Duration::MAX);
    let mut chosen = None;
    for queue in queues {
        if queue.is_empty() {
            continue;
        }
        if now - queue.last_enqueue() < cooldown {
            continue;
        }
        chosen = Some(queue.clone());
    }
    chosen
}
