//! Permission system for privileged commands.
//!
//! ## Features
//!
//! - Group enable/disable for chat owners and administrators
//! - Blacklist management for the configured bot owner
//! - Cached role lookups (reduces API hits)
//!
//! ## Usage
//!
//! ```rust,ignore
//! let lookup = Arc::new(TelegramMembership::new(bot.clone()));
//! let gate = AdminGate::new(store.clone(), lookup, config.owner_id);
//!
//! gate.disable(chat_id, ChatKind::Group, "My Group", user_id).await?;
//! ```

mod gate;
mod membership;

pub use gate::{AdminError, AdminGate, BlacklistChange};
pub use membership::{LookupError, MemberRole, MembershipLookup, TelegramMembership};

#[cfg(test)]
pub(crate) use gate::tests::{FakeLookup, OWNER};
