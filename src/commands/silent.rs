// SPDX-License-Identifier: MIT
//! `/silent` — list patterns, `/silent <duration> <pattern>` — set or
//! (duration `0`) remove one. Intentionally absent from `/help`.

use std::time::Duration;

use super::{format_time, parse_duration_arg, CommandContext};
use crate::AppContext;

const MAX_SILENCE: Duration = Duration::from_secs(12 * 60 * 60);

pub(super) fn run(ctx: &AppContext, cmd: &CommandContext) -> String {
    let args = cmd.args.trim();

    if args.is_empty() {
        let patterns = ctx.silencer.patterns(cmd.chat_id);
        if patterns.is_empty() {
            return "(none)".to_string();
        }
        let mut out = String::from("Current effective patterns:");
        for (pattern, expiry) in patterns {
            out.push_str(&format!("\n\n- [{}] {pattern}", format_time(expiry)));
        }
        return out;
    }

    let Some((duration_token, pattern)) = args.split_once(' ') else {
        return "Invalid arguments!\n\nUsage: /silent <duration> <pattern>".to_string();
    };
    let pattern = pattern.trim();

    let duration = match parse_duration_arg(duration_token) {
        Ok(duration) => duration,
        Err(message) => return message,
    };

    match duration {
        None => match ctx.silencer.remove_pattern(cmd.chat_id, pattern) {
            Ok(()) => "Removed the silent pattern".to_string(),
            Err(e) => format!("Failed to remove the silent pattern:\n\n{e}"),
        },
        Some(duration) => {
            if duration.is_zero() || duration > MAX_SILENCE {
                return "Duration must be positive and less than 12 hours!".to_string();
            }
            match ctx.silencer.set_pattern(cmd.chat_id, pattern, duration) {
                Ok(true) => "Successfully updated expiration for the silent pattern".to_string(),
                Ok(false) => "Successfully set new silent pattern".to_string(),
                Err(e) => format!("Failed to set the silent pattern:\n\n{e}"),
            }
        }
    }
}
