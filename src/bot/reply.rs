//! Outgoing replies.
//!
//! Plugins decide *what* to say as a [`Reply`]; only [`deliver`] talks to
//! Telegram.

use std::path::PathBuf;

use teloxide::prelude::*;
use teloxide::types::{InputFile, ParseMode, ReplyParameters};
use tracing::warn;

use super::dispatcher::ThrottledBot;

#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    /// Photo with a MarkdownV2 caption.
    Photo { image: PathBuf, caption: String },
    /// Plain text.
    Text(String),
}

/// Send a reply to the message that triggered it.
///
/// A photo whose file has gone missing is sent as its caption alone, so the
/// user still sees their roll.
pub async fn deliver(bot: &ThrottledBot, msg: &Message, reply: Reply) -> anyhow::Result<()> {
    match reply {
        Reply::Text(text) => {
            bot.send_message(msg.chat.id, text)
                .reply_parameters(ReplyParameters::new(msg.id))
                .await?;
        }
        Reply::Photo { image, caption } => {
            if tokio::fs::try_exists(&image).await.unwrap_or(false) {
                bot.send_photo(msg.chat.id, InputFile::file(image))
                    .caption(caption)
                    .parse_mode(ParseMode::MarkdownV2)
                    .reply_parameters(ReplyParameters::new(msg.id))
                    .await?;
            } else {
                warn!("Image {} is missing, sending caption only", image.display());
                bot.send_message(msg.chat.id, caption)
                    .parse_mode(ParseMode::MarkdownV2)
                    .reply_parameters(ReplyParameters::new(msg.id))
                    .await?;
            }
        }
    }

    Ok(())
}
