//! Plugin system for command handlers.
//!
//! Add new plugins by:
//! 1. Creating a new file in this directory
//! 2. Adding `pub mod your_plugin;` below
//! 3. Adding a `Command` variant and its arm in `respond()`
//!
//! Plugins turn a [`CommandContext`] into a [`Reply`] and never call the
//! Telegram API themselves, so they can be tested without a bot.

pub mod admin;
pub mod ban;
pub mod coffee;
pub mod start;

use teloxide::dispatching::UpdateHandler;
use teloxide::prelude::*;
use teloxide::utils::command::BotCommands;
use tracing::{debug, error};

use crate::bot::dispatcher::{AppState, ThrottledBot};
use crate::bot::reply::{self, Reply};
use crate::coffee::ChatKind;
use crate::i18n::get_text;
use crate::utils::now_epoch;

/// All bot commands.
#[derive(BotCommands, Clone, Debug, PartialEq)]
#[command(rename_rule = "lowercase", description = "Available commands:")]
pub enum Command {
    #[command(description = "Start the bot")]
    Start(String),

    #[command(description = "Show help")]
    Help,

    #[command(description = "Roll a d20 for your coffee")]
    Coffee,

    #[command(description = "Enable /coffee in this group (admins)")]
    Coffeeon,

    #[command(description = "Disable /coffee in this group (admins)")]
    Coffeeoff,

    #[command(description = "Blacklist a chat (bot owner)")]
    Coffeeban(String),

    #[command(description = "Remove a chat from the blacklist (bot owner)")]
    Coffeewhitelist(String),
}

/// Everything a plugin needs to know about an incoming command.
#[derive(Debug, Clone)]
pub struct CommandContext {
    pub chat_id: i64,
    pub chat_kind: ChatKind,
    pub chat_title: String,
    pub user_id: u64,
    /// Epoch seconds when the command was received.
    pub now: f64,
}

impl CommandContext {
    /// Context for a message, or `None` if it has no sender.
    pub fn from_message(msg: &Message, now: f64) -> Option<Self> {
        let user = msg.from.as_ref()?;

        let chat_kind = if msg.chat.is_private() {
            ChatKind::Private
        } else {
            ChatKind::Group
        };

        Some(Self {
            chat_id: msg.chat.id.0,
            chat_kind,
            chat_title: msg.chat.title().unwrap_or_default().to_string(),
            user_id: user.id.0,
            now,
        })
    }
}

/// Dispatch table: command -> reply.
///
/// A blacklisted chat gets no command at all, except the owner's blacklist
/// commands so the ban can be lifted from inside the chat.
pub async fn respond(state: &AppState, ctx: &CommandContext, command: Command) -> Reply {
    let owner_command = state.admin.is_owner(ctx.user_id)
        && matches!(command, Command::Coffeeban(_) | Command::Coffeewhitelist(_));

    if !owner_command {
        let chat_id = ctx.chat_id;
        match state.store.read_async(move |s| s.is_blacklisted(chat_id)).await {
            Ok(false) => {}
            Ok(true) => {
                debug!("Ignoring {:?} in blacklisted chat {}", command, chat_id);
                return Reply::Text(get_text("coffee.blacklisted"));
            }
            Err(e) => {
                error!("Blacklist check failed in chat {}: {}", chat_id, e);
                return Reply::Text(get_text("common.error"));
            }
        }
    }

    match command {
        Command::Start(_) => start::start_command(state),
        Command::Help => start::help_command(),
        Command::Coffee => coffee::coffee_command(state, ctx).await,
        Command::Coffeeon => admin::coffeeon_command(state, ctx).await,
        Command::Coffeeoff => admin::coffeeoff_command(state, ctx).await,
        Command::Coffeeban(args) => ban::coffeeban_command(state, ctx, &args).await,
        Command::Coffeewhitelist(args) => ban::coffeewhitelist_command(state, ctx, &args).await,
    }
}

/// Build the command handler.
pub fn command_handler() -> UpdateHandler<anyhow::Error> {
    teloxide::filter_command::<Command, _>().endpoint(handle_command)
}

async fn handle_command(
    bot: ThrottledBot,
    msg: Message,
    state: AppState,
    command: Command,
) -> anyhow::Result<()> {
    let Some(ctx) = CommandContext::from_message(&msg, now_epoch()) else {
        return Ok(());
    };

    debug!(
        "Command {:?} from user {} in chat {}",
        command, ctx.user_id, ctx.chat_id
    );

    let reply = respond(&state, &ctx, command).await;
    reply::deliver(&bot, &msg, reply).await
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::coffee::policy::tests::LoadedDie;
    use crate::coffee::OutcomeTable;
    use crate::database::{ChatStore, MemoryBackend};
    use crate::i18n::get_text;
    use crate::permissions::{FakeLookup, MemberRole, OWNER};

    const GROUP: i64 = -1001;
    const ADMIN: u64 = 20;
    const MEMBER: u64 = 21;

    fn state() -> AppState {
        let store = Arc::new(ChatStore::open(Box::new(MemoryBackend::new())).unwrap());
        let outcomes = Arc::new(OutcomeTable::new("dice").unwrap());
        let mut lookup = FakeLookup::default();
        lookup.roles.insert((GROUP, ADMIN), MemberRole::Administrator);
        lookup.broken.push(-9999);

        AppState::new(
            store,
            outcomes,
            Arc::new(LoadedDie::new(&[20, 1])),
            Arc::new(lookup),
            OWNER,
            "coffee_test_bot".to_string(),
        )
    }

    fn group(user_id: u64, now: f64) -> CommandContext {
        CommandContext {
            chat_id: GROUP,
            chat_kind: ChatKind::Group,
            chat_title: "Brew Crew".to_string(),
            user_id,
            now,
        }
    }

    fn private(user_id: u64, now: f64) -> CommandContext {
        CommandContext {
            chat_id: user_id as i64,
            chat_kind: ChatKind::Private,
            chat_title: String::new(),
            user_id,
            now,
        }
    }

    fn text(key: &str) -> Reply {
        Reply::Text(get_text(key))
    }

    #[test]
    fn test_command_parsing() {
        assert_eq!(Command::parse("/coffee", "coffee_bot").unwrap(), Command::Coffee);
        assert_eq!(
            Command::parse("/coffeeban -100123", "coffee_bot").unwrap(),
            Command::Coffeeban("-100123".to_string())
        );
        assert_eq!(
            Command::parse("/coffeeon@coffee_bot", "coffee_bot").unwrap(),
            Command::Coffeeon
        );
        assert!(Command::parse("/espresso", "coffee_bot").is_err());
    }

    #[tokio::test]
    async fn test_coffee_scenario() {
        let state = state();

        let first = respond(&state, &group(MEMBER, 1000.0), Command::Coffee).await;
        assert_eq!(
            first,
            Reply::Photo {
                image: "dice/20.png".into(),
                caption: "🎲 You rolled a *20*\n☕ Result: _COFFEE OF THE GODS_".to_string(),
            }
        );

        let second = respond(&state, &group(MEMBER, 1005.0), Command::Coffee).await;
        assert_eq!(
            second,
            Reply::Text(get_text("coffee.rate_limited").replace("{seconds}", "10"))
        );

        let third = respond(&state, &group(MEMBER, 1016.0), Command::Coffee).await;
        assert!(matches!(third, Reply::Photo { ref image, .. } if image.ends_with("1.png")));
    }

    #[tokio::test]
    async fn test_toggle_flow() {
        let state = state();

        let denied = respond(&state, &group(MEMBER, 1000.0), Command::Coffeeoff).await;
        assert_eq!(denied, text("admin.unauthorized"));

        let off = respond(&state, &group(ADMIN, 1000.0), Command::Coffeeoff).await;
        assert_eq!(off, text("admin.disabled"));
        assert_eq!(state.store.chat(GROUP).unwrap().title, "Brew Crew");

        let blocked = respond(&state, &group(MEMBER, 2000.0), Command::Coffee).await;
        assert_eq!(blocked, text("coffee.disabled"));

        let on = respond(&state, &group(ADMIN, 2000.0), Command::Coffeeon).await;
        assert_eq!(on, text("admin.enabled"));

        let allowed = respond(&state, &group(MEMBER, 2001.0), Command::Coffee).await;
        assert!(matches!(allowed, Reply::Photo { .. }));
    }

    #[tokio::test]
    async fn test_toggle_in_private_chat() {
        let state = state();

        let reply = respond(&state, &private(ADMIN, 1000.0), Command::Coffeeon).await;
        assert_eq!(reply, text("admin.not_a_group"));
    }

    #[tokio::test]
    async fn test_lookup_failure_reply() {
        let state = state();
        let mut ctx = group(ADMIN, 1000.0);
        ctx.chat_id = -9999;

        let reply = respond(&state, &ctx, Command::Coffeeoff).await;

        assert_eq!(reply, text("admin.lookup_failed"));
        assert!(state.store.chat(-9999).unwrap().enabled);
    }

    #[tokio::test]
    async fn test_blacklist_flow() {
        let state = state();
        let owner = private(OWNER, 1000.0);
        let ban = || Command::Coffeeban(GROUP.to_string());

        let denied = respond(&state, &group(ADMIN, 1000.0), ban()).await;
        assert_eq!(denied, text("admin.owner_only"));

        let banned = respond(&state, &owner, ban()).await;
        assert_eq!(banned, Reply::Text(get_text("admin.banned").replace("{chat}", "-1001")));

        let again = respond(&state, &owner, ban()).await;
        assert_eq!(
            again,
            Reply::Text(get_text("admin.already_banned").replace("{chat}", "-1001"))
        );

        let blocked = respond(&state, &group(MEMBER, 1000.0), Command::Coffee).await;
        assert_eq!(blocked, text("coffee.blacklisted"));

        // Every other command is refused too, and nothing is written
        for command in [Command::Help, Command::Start(String::new()), Command::Coffeeon] {
            let reply = respond(&state, &group(ADMIN, 1000.0), command).await;
            assert_eq!(reply, text("coffee.blacklisted"));
        }
        assert!(state.store.read(|s| s.chats.is_empty()).unwrap());

        // A non-owner cannot use the blacklist commands from inside the chat
        let denied = respond(&state, &group(ADMIN, 1000.0), Command::Coffeewhitelist(GROUP.to_string())).await;
        assert_eq!(denied, text("coffee.blacklisted"));

        // The owner can lift the ban from inside the banned group
        let lifted = respond(&state, &group(OWNER, 1000.0), Command::Coffeewhitelist(GROUP.to_string())).await;
        assert_eq!(lifted, Reply::Text(get_text("admin.unbanned").replace("{chat}", "-1001")));

        let allowed = respond(&state, &group(MEMBER, 1000.0), Command::Coffee).await;
        assert!(matches!(allowed, Reply::Photo { .. }));
    }

    #[tokio::test]
    async fn test_blacklist_usage() {
        let state = state();
        let owner = private(OWNER, 1000.0);

        let reply = respond(&state, &owner, Command::Coffeeban(String::new())).await;
        assert_eq!(reply, text("admin.ban_usage"));

        let reply = respond(&state, &owner, Command::Coffeewhitelist("abc".to_string())).await;
        assert_eq!(reply, text("admin.whitelist_usage"));
    }

    #[tokio::test]
    async fn test_static_commands() {
        let state = state();
        let ctx = private(MEMBER, 1000.0);

        let Reply::Text(start) = respond(&state, &ctx, Command::Start(String::new())).await else {
            panic!("start should reply with text");
        };
        assert!(start.contains("https://t.me/coffee_test_bot?startgroup=true"));

        assert_eq!(respond(&state, &ctx, Command::Help).await, text("help.text"));
    }
}
