// SPDX-License-Identifier: MIT
//! Delivery-path scenarios: batching with the divider, fatal-first ordering,
//! silence filtering at delivery time, and full-batch re-enqueue when the
//! transport fails.

mod common;

use std::collections::HashMap;
use std::time::Duration;

use chrono::Utc;
use common::*;
use valwatchd::push::{QueueMessage, BATCH_LINE_DIVIDER};

fn message(receiver_id: i64, fatal: bool, text: &str) -> QueueMessage {
    QueueMessage {
        receiver_id,
        priority: false,
        fatal,
        text: text.to_string(),
        enqueued_at_utc: None,
    }
}

fn delivery_context() -> (valwatchd::AppContext, std::sync::Arc<CapturingTransport>) {
    let transport = CapturingTransport::new();
    (test_context(HashMap::new(), transport.clone()), transport)
}

#[tokio::test]
async fn batches_with_divider_and_fatal_first() {
    let (ctx, transport) = delivery_context();

    ctx.pusher.enqueue(message(BOB_CHAT_ID, false, "first normal"));
    ctx.pusher.enqueue(message(BOB_CHAT_ID, false, "second normal"));
    ctx.pusher.enqueue(message(BOB_CHAT_ID, true, "the fatal one"));

    assert!(ctx.pusher.deliver_once(&ctx.users, &ctx.bots, &ctx.silencer).await);

    let sent = transport.sent_texts();
    assert_eq!(sent.len(), 1);
    let parts: Vec<&str> = sent[0].split(BATCH_LINE_DIVIDER).collect();
    assert_eq!(parts, vec!["the fatal one", "first normal", "second normal"]);
    assert_eq!(ctx.pusher.pending_for(BOB_CHAT_ID), 0);
}

#[tokio::test]
async fn silenced_messages_are_dropped_at_delivery() {
    let (ctx, transport) = delivery_context();

    ctx.silencer
        .set_pattern(BOB_CHAT_ID, "low uptime", Duration::from_secs(300))
        .unwrap();
    ctx.pusher.enqueue(message(BOB_CHAT_ID, false, "[gaia] low uptime 75%"));

    // The batch is dequeued but everything in it is silenced.
    assert!(!ctx.pusher.deliver_once(&ctx.users, &ctx.bots, &ctx.silencer).await);
    assert!(transport.sent_texts().is_empty());
    assert_eq!(ctx.pusher.pending_for(BOB_CHAT_ID), 0);

    // Pattern removed — the next alert goes through.
    ctx.silencer.remove_pattern(BOB_CHAT_ID, "low uptime").unwrap();
    ctx.pusher.enqueue(message(BOB_CHAT_ID, false, "[gaia] low uptime 74%"));
    assert!(ctx.pusher.deliver_once(&ctx.users, &ctx.bots, &ctx.silencer).await);
    assert_eq!(transport.sent_texts().len(), 1);
}

#[tokio::test]
async fn silencing_only_applies_to_that_chat() {
    let (ctx, transport) = delivery_context();

    ctx.silencer
        .set_pattern(BOB_CHAT_ID, "low uptime", Duration::from_secs(300))
        .unwrap();
    ctx.pusher.enqueue(message(ALICE_CHAT_ID, false, "[gaia] low uptime 75%"));

    assert!(ctx.pusher.deliver_once(&ctx.users, &ctx.bots, &ctx.silencer).await);
    assert_eq!(transport.sent_texts().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn failed_send_re_enqueues_the_whole_batch() {
    let (ctx, transport) = delivery_context();
    transport.set_failing(true);

    let stamp = Utc::now() - chrono::Duration::minutes(5);
    ctx.pusher.enqueue(QueueMessage {
        receiver_id: BOB_CHAT_ID,
        priority: false,
        fatal: false,
        text: "do not lose me".to_string(),
        enqueued_at_utc: Some(stamp),
    });
    ctx.pusher.enqueue(message(BOB_CHAT_ID, true, "me neither"));

    assert!(!ctx.pusher.deliver_once(&ctx.users, &ctx.bots, &ctx.silencer).await);
    assert!(transport.sent_texts().is_empty());
    assert_eq!(ctx.pusher.pending_for(BOB_CHAT_ID), 2);

    // Transport heals: both messages arrive, the old stamp survived.
    transport.set_failing(false);
    assert!(ctx.pusher.deliver_once(&ctx.users, &ctx.bots, &ctx.silencer).await);
    let sent = transport.sent_texts();
    assert_eq!(sent.len(), 1);
    assert!(sent[0].contains("do not lose me"));
    assert!(sent[0].contains("me neither"));
    assert_eq!(ctx.pusher.pending_for(BOB_CHAT_ID), 0);
}

#[tokio::test]
async fn unknown_receiver_keeps_messages_queued() {
    let (ctx, transport) = delivery_context();

    ctx.pusher.enqueue(message(99999, false, "orphan"));
    assert!(!ctx.pusher.deliver_once(&ctx.users, &ctx.bots, &ctx.silencer).await);
    assert!(transport.sent_texts().is_empty());
    // Re-enqueued for a later pass (hot-reload may restore the user).
    assert_eq!(ctx.pusher.pending_for(99999), 1);
}
