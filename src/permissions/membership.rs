//! Chat membership lookups.
//!
//! The admin gate needs to know a user's role in a group. That answer lives
//! in Telegram, so it sits behind [`MembershipLookup`] and is cached briefly.

use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::{ChatMemberKind, UserId};
use thiserror::Error;
use tracing::debug;

use crate::cache::{CacheConfig, TypedCache};

/// A user's role in a chat, as far as the admin gate cares.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberRole {
    Owner,
    Administrator,
    Member,
}

impl MemberRole {
    pub fn is_admin(self) -> bool {
        matches!(self, Self::Owner | Self::Administrator)
    }
}

#[derive(Debug, Error)]
#[error("membership lookup failed: {0}")]
pub struct LookupError(pub String);

#[async_trait]
pub trait MembershipLookup: Send + Sync {
    async fn role(&self, chat_id: i64, user_id: u64) -> Result<MemberRole, LookupError>;
}

/// Cache key for role lookups.
type RoleCacheKey = (i64, u64); // (chat_id, user_id)

/// Looks roles up with `getChatMember`, caching answers for a minute.
#[derive(Clone)]
pub struct TelegramMembership {
    bot: Bot,
    cache: TypedCache<RoleCacheKey, MemberRole>,
}

impl TelegramMembership {
    pub fn new(bot: Bot) -> Self {
        Self {
            bot,
            cache: TypedCache::new("member_roles", CacheConfig::membership()),
        }
    }
}

#[async_trait]
impl MembershipLookup for TelegramMembership {
    async fn role(&self, chat_id: i64, user_id: u64) -> Result<MemberRole, LookupError> {
        let key = (chat_id, user_id);

        if let Some(role) = self.cache.get(&key) {
            debug!("{} cache hit for user {} in chat {}", self.cache.name(), user_id, chat_id);
            return Ok(role);
        }

        let member = self
            .bot
            .get_chat_member(ChatId(chat_id), UserId(user_id))
            .await
            .map_err(|e| LookupError(e.to_string()))?;

        let role = match member.kind {
            ChatMemberKind::Owner(_) => MemberRole::Owner,
            ChatMemberKind::Administrator(_) => MemberRole::Administrator,
            _ => MemberRole::Member,
        };

        self.cache.insert(key, role);
        Ok(role)
    }
}
