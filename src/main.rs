//! CoffeeBot - a d20 coffee oracle for Telegram.
//!
//! `/coffee` rolls a d20 and replies with a picture and caption describing
//! the quality of your next cup. Group admins can switch the command off,
//! and the bot owner can blacklist chats entirely.
//!
//! ## Architecture
//!
//! - `config` - Environment configuration
//! - `coffee` - Outcome table and the /coffee policy engine
//! - `database` - Chat settings and blacklist (JSON files or memory)
//! - `permissions` - Admin gate with cached role lookups
//! - `cache` - TTL caching with Moka
//! - `plugins` - Command dispatch table
//! - `bot` - Dispatcher, polling/webhook runtime, reply delivery
//! - `i18n` - User-facing text
//! - `utils` - Utility functions

mod bot;
mod cache;
mod coffee;
mod config;
mod database;
mod i18n;
mod permissions;
mod plugins;
mod utils;

use std::sync::Arc;

use teloxide::adaptors::throttle::Limits;
use teloxide::prelude::*;
use teloxide::utils::command::BotCommands;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use bot::dispatcher::AppState;
use coffee::{D20, OutcomeTable};
use config::{Config, StorageKind};
use database::{ChatStore, JsonFileBackend, MemoryBackend, StateBackend};
use permissions::TelegramMembership;
use plugins::Command;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file first (before anything else)
    dotenvy::dotenv().ok();

    // If RUST_LOG is not set, default to "info" level for our crate
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("coffeebot=info,teloxide=warn"));

    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("Starting CoffeeBot...");

    // Missing or malformed settings are fatal
    let config = Config::from_env()?;
    info!("Configuration loaded successfully");
    info!("Bot mode: {:?}", config.bot_mode);

    // Every roll needs a caption and an image
    let outcomes = OutcomeTable::new(&config.dice_dir)?;
    outcomes.verify_assets()?;
    info!("Outcome table loaded from {}", config.dice_dir.display());

    let backend: Box<dyn StateBackend> = match config.storage {
        StorageKind::Json => Box::new(JsonFileBackend::open(&config.data_dir)?),
        StorageKind::Memory => {
            warn!("Using in-memory storage, settings are lost on restart");
            Box::new(MemoryBackend::new())
        }
    };
    let store = Arc::new(ChatStore::open(backend)?);

    // Initialize bot with Throttle for automatic rate limiting
    let bot = Bot::new(&config.bot_token).throttle(Limits::default());
    info!("Bot initialized with rate limiting (Throttle)");

    let me = bot.get_me().await?;
    let bot_username = config
        .bot_username
        .clone()
        .unwrap_or_else(|| me.username().to_string());
    info!("Using bot username: @{}", bot_username);
    info!("Bot owner: {}", config.owner_id);

    if let Err(e) = bot.set_my_commands(Command::bot_commands()).await {
        warn!("Could not register command list: {}", e);
    }

    // Role lookups need the inner Bot for API calls
    let lookup = Arc::new(TelegramMembership::new(bot.inner().clone()));

    let state = AppState::new(
        store,
        Arc::new(outcomes),
        Arc::new(D20),
        lookup,
        config.owner_id,
        bot_username,
    );

    let dispatcher = bot::build_dispatcher(bot.clone(), state);

    bot::run(&config, bot, dispatcher).await
}
