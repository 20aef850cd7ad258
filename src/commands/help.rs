// SPDX-License-Identifier: MIT
//! `/help` — and the fallback for anything unrecognised.

use super::CommandContext;

pub(super) fn run(cmd: &CommandContext) -> String {
    let mut out = String::from("Available commands:");
    out.push_str("\n/me - Show your user information");
    out.push_str("\n/chains - Show chains you subscribed");
    out.push_str("\n/validators - Show validators you subscribed");
    out.push_str("\n/last - Show the latest health-check data for a validator");
    if cmd.is_root {
        out.push_str("\n/pause - Pause alerts for a validator or a whole chain");
    } else {
        out.push_str("\n/pause - Pause alerts for a validator you watch");
    }
    out.push_str("\n/status - Show paused chains and validators");
    out.push_str("\n/search - Search validators by part of the operator address");
    out.push_str("\n/help - Show this help message");
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cmd(is_root: bool) -> CommandContext {
        CommandContext {
            chat_id: 1,
            user_id: 2,
            identity: "alice".into(),
            username: "alice".into(),
            is_root,
            args: String::new(),
        }
    }

    #[test]
    fn silent_is_not_advertised() {
        assert!(!run(&cmd(false)).contains("/silent"));
        assert!(!run(&cmd(true)).contains("/silent"));
    }

    #[test]
    fn pause_help_depends_on_root() {
        assert!(run(&cmd(true)).contains("whole chain"));
        assert!(!run(&cmd(false)).contains("whole chain"));
    }
}
