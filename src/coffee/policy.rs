//! Decides whether a /coffee request may roll, and records the roll.

use std::path::PathBuf;
use std::sync::Arc;

use rand::Rng;
use thiserror::Error;
use tracing::debug;

use super::outcome::{MAX_ROLL, MIN_ROLL, OutcomeError, OutcomeTable};
use crate::database::{ChatStore, StoreError};

/// Minimum seconds between two allowed rolls by one user in one chat.
pub const RATE_LIMIT_SECS: f64 = 15.0;

/// Private 1:1 conversation or any kind of group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatKind {
    Private,
    Group,
}

/// Source of d20 rolls.
pub trait Die: Send + Sync {
    /// A value in `1..=20`.
    fn roll(&self) -> u8;
}

/// Uniform d20 backed by the thread-local RNG.
#[derive(Debug, Default, Clone, Copy)]
pub struct D20;

impl Die for D20 {
    fn roll(&self) -> u8 {
        rand::thread_rng().gen_range(MIN_ROLL..=MAX_ROLL)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BlockReason {
    Blacklisted,
    Disabled,
    /// Seconds left until the user may roll again.
    RateLimited { retry_after: f64 },
}

impl BlockReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Blacklisted => "blacklisted",
            Self::Disabled => "disabled",
            Self::RateLimited { .. } => "rate_limited",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Roll {
    pub value: u8,
    pub caption: &'static str,
    pub image: PathBuf,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    Allowed(Roll),
    Blocked(BlockReason),
}

#[derive(Debug, Error)]
pub enum PolicyError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Outcome(#[from] OutcomeError),
}

/// The /coffee policy engine.
#[derive(Clone)]
pub struct CoffeePolicy {
    store: Arc<ChatStore>,
    outcomes: Arc<OutcomeTable>,
    die: Arc<dyn Die>,
}

impl CoffeePolicy {
    pub fn new(store: Arc<ChatStore>, outcomes: Arc<OutcomeTable>, die: Arc<dyn Die>) -> Self {
        Self {
            store,
            outcomes,
            die,
        }
    }

    /// Evaluate a /coffee invocation at time `now` (epoch seconds).
    ///
    /// Checks run in order: blacklist, group enabled flag, per-user rate
    /// limit. Only an allowed roll writes to the store.
    pub fn evaluate(
        &self,
        chat_id: i64,
        chat_kind: ChatKind,
        user_id: u64,
        now: f64,
    ) -> Result<Decision, PolicyError> {
        let decision = self.store.update(|state| -> Result<Decision, OutcomeError> {
            if state.is_blacklisted(chat_id) {
                return Ok(Decision::Blocked(BlockReason::Blacklisted));
            }

            let chat = state.chat(chat_id);

            if chat_kind == ChatKind::Group && !chat.enabled {
                return Ok(Decision::Blocked(BlockReason::Disabled));
            }

            let elapsed = now - chat.last_used_by(user_id);
            if elapsed < RATE_LIMIT_SECS {
                return Ok(Decision::Blocked(BlockReason::RateLimited {
                    retry_after: RATE_LIMIT_SECS - elapsed,
                }));
            }

            let value = self.die.roll();
            let roll = Roll {
                value,
                caption: self.outcomes.caption_for(value.into())?,
                image: self.outcomes.image_for(value.into())?.to_path_buf(),
            };

            state.chat_mut(chat_id).mark_used(user_id, now);
            Ok(Decision::Allowed(roll))
        })??;

        match &decision {
            Decision::Allowed(roll) => {
                debug!("Chat {} user {} rolled {}", chat_id, user_id, roll.value)
            }
            Decision::Blocked(reason) => {
                debug!("Chat {} user {} blocked: {}", chat_id, user_id, reason.as_str())
            }
        }

        Ok(decision)
    }

    /// [`CoffeePolicy::evaluate`] on the blocking pool, so store I/O never
    /// stalls the async workers.
    pub async fn evaluate_async(
        &self,
        chat_id: i64,
        chat_kind: ChatKind,
        user_id: u64,
        now: f64,
    ) -> Result<Decision, PolicyError> {
        let policy = self.clone();
        tokio::task::spawn_blocking(move || policy.evaluate(chat_id, chat_kind, user_id, now))
            .await
            .map_err(StoreError::from)?
    }
}
