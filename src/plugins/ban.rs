//! Blacklist commands (bot owner only).
//!
//! /coffeeban <chat id> bars a chat from every command, /coffeewhitelist
//! <chat id> lets it back in.

use tracing::error;

use super::CommandContext;
use crate::bot::dispatcher::AppState;
use crate::bot::reply::Reply;
use crate::i18n::get_text;
use crate::permissions::{AdminError, BlacklistChange};

/// Handle /coffeeban.
pub async fn coffeeban_command(state: &AppState, ctx: &CommandContext, args: &str) -> Reply {
    let result = state.admin.ban_chat(args, ctx.user_id).await;
    blacklist_reply(ctx, result, "admin.ban_usage")
}

/// Handle /coffeewhitelist.
pub async fn coffeewhitelist_command(state: &AppState, ctx: &CommandContext, args: &str) -> Reply {
    let result = state.admin.unban_chat(args, ctx.user_id).await;
    blacklist_reply(ctx, result, "admin.whitelist_usage")
}

fn blacklist_reply(
    ctx: &CommandContext,
    result: Result<BlacklistChange, AdminError>,
    usage_key: &str,
) -> Reply {
    let (key, chat) = match result {
        Ok(BlacklistChange::Added(chat)) => ("admin.banned", chat),
        Ok(BlacklistChange::AlreadyBlacklisted(chat)) => ("admin.already_banned", chat),
        Ok(BlacklistChange::Removed(chat)) => ("admin.unbanned", chat),
        Ok(BlacklistChange::NotBlacklisted(chat)) => ("admin.not_banned", chat),
        Err(AdminError::Unauthorized) => return Reply::Text(get_text("admin.owner_only")),
        Err(AdminError::InvalidChatId(_)) => return Reply::Text(get_text(usage_key)),
        Err(e) => {
            error!("Blacklist command failed in chat {}: {}", ctx.chat_id, e);
            return Reply::Text(get_text("common.error"));
        }
    };

    Reply::Text(get_text(key).replace("{chat}", &chat.to_string()))
}
