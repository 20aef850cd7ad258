// SPDX-License-Identifier: MIT
//! Hot-reload passes over real config files in a temp home directory:
//! a good pass installs users, bots and chains; a broken chains file leaves
//! the previously installed chain set in effect.

mod common;

use std::collections::HashMap;
use std::path::Path;

use common::*;
use valwatchd::reload::reload_once;

const USERS_YAML: &str = r#"
users:
  alice:
    root: true
    telegram: {username: alice, id: 1001, token: shared-token}
  bob:
    telegram: {username: bob, id: 1002, token: shared-token}
"#;

const CHAIN_YAML: &str = r#"
chain-name: testchain
chain-id: testchain-1
priority: true
rpc: ["http://node-a:26657"]
validators:
  cosmosvaloper1qqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqq:
    watchers: [bob]
"#;

fn write_config(dir: &Path, name: &str, contents: &str) {
    let path = dir.join(name);
    std::fs::write(&path, contents).unwrap();
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o600)).unwrap();
    }
}

#[tokio::test]
async fn reload_installs_users_bots_and_chains() {
    let home = tempfile::tempdir().unwrap();
    write_config(home.path(), "users.yaml", USERS_YAML);
    write_config(home.path(), "chain.testchain.yaml", CHAIN_YAML);

    let mut ctx = test_context(HashMap::new(), CapturingTransport::new());
    ctx.home_dir = home.path().to_path_buf();

    reload_once(&ctx);

    assert!(ctx.users.by_identity("alice").unwrap().root);
    assert!(ctx.chains.has_chain("testchain"));
    assert!(ctx.chains.get("testchain").unwrap().is_priority());
    assert_eq!(
        ctx.chains.watched_by("bob").get("testchain").unwrap(),
        &vec![VALOPER.to_string()]
    );

    // One bot for the shared token, priority because alice is root, both
    // chat ids subscribed.
    let bots = ctx.bots.all();
    assert_eq!(bots.len(), 1);
    assert!(bots[0].is_priority());
    let mut chat_ids = bots[0].chat_ids();
    chat_ids.sort_unstable();
    assert_eq!(chat_ids, vec![ALICE_CHAT_ID, BOB_CHAT_ID]);
}

#[tokio::test]
async fn broken_chains_file_keeps_previous_chains() {
    let home = tempfile::tempdir().unwrap();
    write_config(home.path(), "users.yaml", USERS_YAML);
    write_config(home.path(), "chain.testchain.yaml", CHAIN_YAML);

    let mut ctx = test_context(HashMap::new(), CapturingTransport::new());
    ctx.home_dir = home.path().to_path_buf();
    reload_once(&ctx);
    assert!(ctx.chains.has_chain("testchain"));

    // The watcher now references a user that does not exist — the pass
    // must reject the new set and retain the old one.
    write_config(
        home.path(),
        "chain.testchain.yaml",
        &CHAIN_YAML.replace("watchers: [bob]", "watchers: [nobody]"),
    );
    reload_once(&ctx);
    assert!(ctx.chains.has_chain("testchain"));
    assert_eq!(
        ctx.chains.watched_by("bob").get("testchain").unwrap(),
        &vec![VALOPER.to_string()]
    );
}

#[tokio::test]
async fn broken_users_file_keeps_everything() {
    let home = tempfile::tempdir().unwrap();
    write_config(home.path(), "users.yaml", USERS_YAML);
    write_config(home.path(), "chain.testchain.yaml", CHAIN_YAML);

    let mut ctx = test_context(HashMap::new(), CapturingTransport::new());
    ctx.home_dir = home.path().to_path_buf();
    reload_once(&ctx);

    // No root user at all — invalid; previous users stay.
    write_config(
        home.path(),
        "users.yaml",
        "users:\n  mallory:\n    telegram: {username: mallory, id: 3, token: t}\n",
    );
    reload_once(&ctx);
    assert!(ctx.users.by_identity("alice").is_some());
    assert!(ctx.users.by_identity("mallory").is_none());
}
