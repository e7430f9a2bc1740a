//! Bot runtime - Polling and Webhook runners.

use teloxide::prelude::*;
use tracing::info;

use super::dispatcher::ThrottledBot;
use super::webhook;
use crate::config::{BotMode, Config};

/// Run the bot with the configured mode.
pub async fn run(
    config: &Config,
    bot: ThrottledBot,
    mut dispatcher: Dispatcher<ThrottledBot, anyhow::Error, teloxide::dispatching::DefaultKey>,
) -> anyhow::Result<()> {
    match (config.bot_mode, &config.webhook) {
        (BotMode::Webhook, Some(webhook)) => {
            info!("Starting bot in webhook mode...");
            webhook::start_webhook(webhook, dispatcher, bot).await
        }
        (BotMode::Webhook, None) => {
            anyhow::bail!("webhook mode requires PUBLIC_URL and WEBHOOK_SECRET")
        }
        (BotMode::Polling, _) => {
            info!("Starting bot in polling mode...");
            dispatcher.dispatch().await;
            Ok(())
        }
    }
}
