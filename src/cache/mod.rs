//! Cache module - TTL caching using Moka.
//!
//! Used to avoid hitting the Telegram API for every admin check:
//!
//! ```rust,ignore
//! let roles: TypedCache<(i64, u64), MemberRole> =
//!     TypedCache::new("member_roles", CacheConfig::membership());
//! roles.insert((chat_id, user_id), role);
//! ```

mod config;
mod typed;

pub use config::CacheConfig;
pub use typed::TypedCache;
