// SPDX-License-Identifier: MIT
//! Per-receiver FIFO with the wire-size cap applied at dequeue.

use std::collections::VecDeque;
use std::sync::Mutex;

use chrono::{DateTime, Utc};

use super::{QueueMessage, BATCH_LINE_DIVIDER, MAX_BATCH_TEXT_BYTES};

struct QueueState {
    messages: VecDeque<QueueMessage>,
    /// Refreshed on enqueue AND on dequeue; the pacer compares against it to
    /// enforce the cooldown between sends to the same receiver.
    last_enqueue_utc: DateTime<Utc>,
}

pub struct ReceiverQueue {
    receiver_id: i64,
    priority: bool,
    state: Mutex<QueueState>,
}

impl ReceiverQueue {
    pub fn new(receiver_id: i64, priority: bool) -> Self {
        Self {
            receiver_id,
            priority,
            state: Mutex::new(QueueState {
                messages: VecDeque::new(),
                last_enqueue_utc: DateTime::UNIX_EPOCH,
            }),
        }
    }

    pub fn receiver_id(&self) -> i64 {
        self.receiver_id
    }

    pub fn is_priority(&self) -> bool {
        self.priority
    }

    pub fn len(&self) -> usize {
        self.state.lock().expect("queue lock poisoned").messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn last_enqueue(&self) -> DateTime<Utc> {
        self.state.lock().expect("queue lock poisoned").last_enqueue_utc
    }

    /// Append a message. The message must be addressed to this queue's
    /// receiver — a mismatch is a routing bug in the pusher.
    pub fn enqueue(&self, message: QueueMessage) {
        assert_eq!(
            message.receiver_id, self.receiver_id,
            "receiver id mismatch on enqueue"
        );
        let mut state = self.state.lock().expect("queue lock poisoned");
        state.messages.push_back(message);
        state.last_enqueue_utc = Utc::now();
    }

    /// Remove up to `max` messages from the head, then walk the cumulative
    /// text size (divider bytes included) and push everything past the
    /// 4096-byte cap back to the head in original order. Also refreshes the
    /// cooldown stamp so the pacer spaces out successive sends.
    pub fn dequeue(&self, max: usize) -> Vec<QueueMessage> {
        let mut state = self.state.lock().expect("queue lock poisoned");

        let take = max.min(state.messages.len());
        let mut drained: Vec<QueueMessage> = state.messages.drain(..take).collect();

        let mut cumulative = 0usize;
        let mut admitted = 0usize;
        for (i, message) in drained.iter().enumerate() {
            let mut next = cumulative + message.text.len();
            if i > 0 {
                next += BATCH_LINE_DIVIDER.len();
            }
            if next >= MAX_BATCH_TEXT_BYTES {
                break;
            }
            cumulative = next;
            admitted += 1;
        }

        for message in drained.drain(admitted..).rev() {
            state.messages.push_front(message);
        }

        state.last_enqueue_utc = Utc::now();
        drained
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(receiver_id: i64, text: &str) -> QueueMessage {
        QueueMessage {
            receiver_id,
            priority: false,
            fatal: false,
            text: text.to_string(),
            enqueued_at_utc: Some(Utc::now()),
        }
    }

    #[test]
    fn fifo_order_is_preserved() {
        let queue = ReceiverQueue::new(7, false);
        queue.enqueue(message(7, "one"));
        queue.enqueue(message(7, "two"));
        queue.enqueue(message(7, "three"));

        let batch = queue.dequeue(2);
        assert_eq!(batch.len(), 2);
        assert_eq!(batch[0].text, "one");
        assert_eq!(batch[1].text, "two");
        assert_eq!(queue.len(), 1);
    }

    #[test]
    #[should_panic(expected = "receiver id mismatch")]
    fn rejects_misrouted_message() {
        let queue = ReceiverQueue::new(7, false);
        queue.enqueue(message(8, "lost"));
    }

    #[test]
    fn size_cap_puts_the_tail_back_at_the_head() {
        let queue = ReceiverQueue::new(7, false);
        // Three messages of 1500 bytes: two fit under 4096 with one divider,
        // the third would push past the cap.
        for i in 0..3 {
            queue.enqueue(message(7, &"x".repeat(1500).replacen('x', &i.to_string(), 1)));
        }

        let batch = queue.dequeue(20);
        assert_eq!(batch.len(), 2);
        assert_eq!(queue.len(), 1);

        let total: usize = batch.iter().map(|m| m.text.len()).sum::<usize>()
            + BATCH_LINE_DIVIDER.len() * (batch.len() - 1);
        assert!(total < MAX_BATCH_TEXT_BYTES);

        // The residual message is the one that was third in line.
        let rest = queue.dequeue(20);
        assert!(rest[0].text.starts_with('2'));
    }

    #[test]
    fn residual_order_and_timestamps_survive() {
        let queue = ReceiverQueue::new(7, false);
        let stamps: Vec<DateTime<Utc>> = (0..4)
            .map(|i| Utc::now() + chrono::Duration::seconds(i))
            .collect();
        for (i, stamp) in stamps.iter().enumerate() {
            queue.enqueue(QueueMessage {
                receiver_id: 7,
                priority: false,
                fatal: false,
                text: format!("{i}-{}", "y".repeat(3000)),
                enqueued_at_utc: Some(*stamp),
            });
        }

        // Only the first fits (2nd would cross the cap).
        let first = queue.dequeue(20);
        assert_eq!(first.len(), 1);

        let rest = queue.dequeue(20);
        assert!(rest[0].text.starts_with('1'));
        assert_eq!(rest[0].enqueued_at_utc, Some(stamps[1]));
    }

    #[test]
    fn dequeue_refreshes_the_cooldown_stamp() {
        let queue = ReceiverQueue::new(7, false);
        queue.enqueue(message(7, "one"));
        let before = queue.last_enqueue();
        queue.dequeue(20);
        assert!(queue.last_enqueue() >= before);
    }
}
