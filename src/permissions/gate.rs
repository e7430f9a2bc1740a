//! Admin gate: who may toggle /coffee in a group and manage the blacklist.

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info, warn};

use super::membership::{LookupError, MembershipLookup};
use crate::coffee::ChatKind;
use crate::database::{ChatStore, StoreError};

#[derive(Debug, Error)]
pub enum AdminError {
    #[error("this command only works in groups")]
    NotAGroup,

    #[error("not authorized")]
    Unauthorized,

    #[error(transparent)]
    LookupFailed(#[from] LookupError),

    #[error("invalid chat id: {0:?}")]
    InvalidChatId(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Result of a blacklist command. Repeating a command is not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlacklistChange {
    Added(i64),
    AlreadyBlacklisted(i64),
    Removed(i64),
    NotBlacklisted(i64),
}

/// Authorizes privileged operations and applies them to the store.
///
/// The configured owner passes every check without a membership lookup.
#[derive(Clone)]
pub struct AdminGate {
    store: Arc<ChatStore>,
    lookup: Arc<dyn MembershipLookup>,
    owner_id: u64,
}

impl AdminGate {
    pub fn new(store: Arc<ChatStore>, lookup: Arc<dyn MembershipLookup>, owner_id: u64) -> Self {
        Self {
            store,
            lookup,
            owner_id,
        }
    }

    #[inline]
    pub fn is_owner(&self, user_id: u64) -> bool {
        user_id == self.owner_id
    }

    /// Allow /coffee in a group.
    pub async fn enable(
        &self,
        chat_id: i64,
        chat_kind: ChatKind,
        title: &str,
        requesting_user: u64,
    ) -> Result<(), AdminError> {
        self.set_enabled(chat_id, chat_kind, title, requesting_user, true)
            .await
    }

    /// Block /coffee in a group.
    pub async fn disable(
        &self,
        chat_id: i64,
        chat_kind: ChatKind,
        title: &str,
        requesting_user: u64,
    ) -> Result<(), AdminError> {
        self.set_enabled(chat_id, chat_kind, title, requesting_user, false)
            .await
    }

    async fn set_enabled(
        &self,
        chat_id: i64,
        chat_kind: ChatKind,
        title: &str,
        requesting_user: u64,
        enabled: bool,
    ) -> Result<(), AdminError> {
        if chat_kind == ChatKind::Private {
            return Err(AdminError::NotAGroup);
        }

        self.require_group_admin(chat_id, requesting_user).await?;

        let title = title.to_string();
        self.store
            .update_async(move |state| {
                let chat = state.chat_mut(chat_id);
                chat.enabled = enabled;
                chat.title = title;
            })
            .await?;

        info!(
            "Coffee {} in chat {} by user {}",
            if enabled { "enabled" } else { "disabled" },
            chat_id,
            requesting_user
        );
        Ok(())
    }

    async fn require_group_admin(&self, chat_id: i64, user_id: u64) -> Result<(), AdminError> {
        if self.is_owner(user_id) {
            debug!("User {} is bot owner, skipping role check", user_id);
            return Ok(());
        }

        let role = self.lookup.role(chat_id, user_id).await.inspect_err(|e| {
            warn!("Could not verify user {} in chat {}: {}", user_id, chat_id, e);
        })?;

        if role.is_admin() {
            Ok(())
        } else {
            Err(AdminError::Unauthorized)
        }
    }

    /// Bar a chat from all use. Owner only.
    pub async fn ban_chat(&self, group_id: &str, requesting_user: u64) -> Result<BlacklistChange, AdminError> {
        let chat_id = self.owner_target(group_id, requesting_user)?;

        let added = self
            .store
            .update_async(move |state| state.blacklist_chat(chat_id))
            .await?;
        if added {
            info!("Chat {} blacklisted", chat_id);
            Ok(BlacklistChange::Added(chat_id))
        } else {
            Ok(BlacklistChange::AlreadyBlacklisted(chat_id))
        }
    }

    /// Lift a ban. Owner only.
    pub async fn unban_chat(&self, group_id: &str, requesting_user: u64) -> Result<BlacklistChange, AdminError> {
        let chat_id = self.owner_target(group_id, requesting_user)?;

        let removed = self
            .store
            .update_async(move |state| state.whitelist_chat(chat_id))
            .await?;
        if removed {
            info!("Chat {} removed from blacklist", chat_id);
            Ok(BlacklistChange::Removed(chat_id))
        } else {
            Ok(BlacklistChange::NotBlacklisted(chat_id))
        }
    }

    fn owner_target(&self, group_id: &str, requesting_user: u64) -> Result<i64, AdminError> {
        if !self.is_owner(requesting_user) {
            return Err(AdminError::Unauthorized);
        }

        let group_id = group_id.trim();
        group_id
            .parse::<i64>()
            .map_err(|_| AdminError::InvalidChatId(group_id.to_string()))
    }
}
