//! /start and /help: static text.

use crate::bot::dispatcher::AppState;
use crate::bot::reply::Reply;
use crate::i18n::get_text;

/// Greeting with a link for adding the bot to a group.
pub fn start_command(state: &AppState) -> Reply {
    let invite = format!("https://t.me/{}?startgroup=true", state.bot_username);
    Reply::Text(get_text("start.text").replace("{invite}", &invite))
}

pub fn help_command() -> Reply {
    Reply::Text(get_text("help.text"))
}
