//! Group admin commands.
//!
//! /coffeeon and /coffeeoff switch /coffee on or off for a whole group.

use tracing::error;

use super::CommandContext;
use crate::bot::dispatcher::AppState;
use crate::bot::reply::Reply;
use crate::i18n::get_text;
use crate::permissions::AdminError;

/// Handle /coffeeon.
pub async fn coffeeon_command(state: &AppState, ctx: &CommandContext) -> Reply {
    let result = state
        .admin
        .enable(ctx.chat_id, ctx.chat_kind, &ctx.chat_title, ctx.user_id)
        .await;

    match result {
        Ok(()) => Reply::Text(get_text("admin.enabled")),
        Err(e) => admin_error_reply(ctx, e),
    }
}

/// Handle /coffeeoff.
pub async fn coffeeoff_command(state: &AppState, ctx: &CommandContext) -> Reply {
    let result = state
        .admin
        .disable(ctx.chat_id, ctx.chat_kind, &ctx.chat_title, ctx.user_id)
        .await;

    match result {
        Ok(()) => Reply::Text(get_text("admin.disabled")),
        Err(e) => admin_error_reply(ctx, e),
    }
}

fn admin_error_reply(ctx: &CommandContext, err: AdminError) -> Reply {
    let key = match err {
        AdminError::NotAGroup => "admin.not_a_group",
        AdminError::Unauthorized => "admin.unauthorized",
        AdminError::LookupFailed(_) => "admin.lookup_failed",
        other => {
            error!("Admin command failed in chat {}: {}", ctx.chat_id, other);
            "common.error"
        }
    };
    Reply::Text(get_text(key))
}
