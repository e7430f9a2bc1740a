//! Message dispatcher setup.
//!
//! Builds the dispatcher and the shared state every handler receives.

use std::sync::Arc;

use teloxide::adaptors::Throttle;
use teloxide::dispatching::UpdateHandler;
use teloxide::prelude::*;

use crate::coffee::{CoffeePolicy, Die, OutcomeTable};
use crate::database::ChatStore;
use crate::permissions::{AdminGate, MembershipLookup};
use crate::plugins;

/// Bot type with Throttle adaptor for automatic rate limiting.
pub type ThrottledBot = Throttle<Bot>;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Chat settings and blacklist.
    pub store: Arc<ChatStore>,

    /// /coffee decision logic.
    pub policy: CoffeePolicy,

    /// Authorization for /coffeeon, /coffeeoff and the blacklist commands.
    pub admin: AdminGate,

    /// Bot username (without @) for invite links.
    pub bot_username: String,
}

impl AppState {
    pub fn new(
        store: Arc<ChatStore>,
        outcomes: Arc<OutcomeTable>,
        die: Arc<dyn Die>,
        lookup: Arc<dyn MembershipLookup>,
        owner_id: u64,
        bot_username: String,
    ) -> Self {
        let policy = CoffeePolicy::new(store.clone(), outcomes, die);
        let admin = AdminGate::new(store.clone(), lookup, owner_id);

        Self {
            store,
            policy,
            admin,
            bot_username,
        }
    }
}

/// Build the dispatcher with all handlers.
pub fn build_dispatcher(
    bot: ThrottledBot,
    state: AppState,
) -> Dispatcher<ThrottledBot, anyhow::Error, teloxide::dispatching::DefaultKey> {
    Dispatcher::builder(bot, schema())
        .dependencies(dptree::deps![state])
        .enable_ctrlc_handler()
        .build()
}

/// Build the handler schema.
fn schema() -> UpdateHandler<anyhow::Error> {
    Update::filter_message().branch(plugins::command_handler())
}
