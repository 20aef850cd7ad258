// SPDX-License-Identifier: MIT
//! `/me` — who the bot thinks you are.

use super::CommandContext;

pub(super) fn run(cmd: &CommandContext) -> String {
    let mut out = String::new();
    out.push_str("Username: ");
    out.push_str(&cmd.username);
    if cmd.is_root {
        out.push_str("\n(Root)");
    }
    out.push_str(&format!("\nUser ID: {}", cmd.user_id));
    out.push_str(&format!("\nChat ID: {}", cmd.chat_id));
    out
}
