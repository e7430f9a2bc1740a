//! /coffee command plugin.

use tracing::error;

use super::CommandContext;
use crate::bot::dispatcher::AppState;
use crate::bot::reply::Reply;
use crate::coffee::{BlockReason, Decision, Roll};
use crate::i18n::get_text;
use crate::utils::escape_markdown;

/// Handle /coffee: roll, or explain why not.
pub async fn coffee_command(state: &AppState, ctx: &CommandContext) -> Reply {
    let result = state
        .policy
        .evaluate_async(ctx.chat_id, ctx.chat_kind, ctx.user_id, ctx.now)
        .await;

    match result {
        Ok(Decision::Allowed(roll)) => Reply::Photo {
            caption: format_caption(&roll),
            image: roll.image,
        },
        Ok(Decision::Blocked(reason)) => Reply::Text(blocked_text(reason)),
        Err(e) => {
            error!("Coffee roll failed in chat {}: {}", ctx.chat_id, e);
            Reply::Text(get_text("common.error"))
        }
    }
}

/// MarkdownV2 caption: bold roll number, italic result.
pub fn format_caption(roll: &Roll) -> String {
    get_text("coffee.caption")
        .replace("{roll}", &roll.value.to_string())
        .replace("{result}", &escape_markdown(roll.caption))
}

fn blocked_text(reason: BlockReason) -> String {
    match reason {
        BlockReason::Blacklisted => get_text("coffee.blacklisted"),
        BlockReason::Disabled => get_text("coffee.disabled"),
        BlockReason::RateLimited { retry_after } => {
            let seconds = (retry_after.ceil() as u64).max(1);
            get_text("coffee.rate_limited").replace("{seconds}", &seconds.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    #[test]
    fn test_caption_format() {
        let roll = Roll {
            value: 13,
            caption: "Cold brew from Elven woods",
            image: PathBuf::from("dice/13.png"),
        };

        assert_eq!(
            format_caption(&roll),
            "🎲 You rolled a *13*\n☕ Result: _Cold brew from Elven woods_"
        );
    }

    #[test]
    fn test_rate_limited_text_rounds_up() {
        let text = blocked_text(BlockReason::RateLimited { retry_after: 4.2 });
        assert!(text.contains("5s"));

        let text = blocked_text(BlockReason::RateLimited { retry_after: 0.01 });
        assert!(text.contains("1s"));
    }
}
