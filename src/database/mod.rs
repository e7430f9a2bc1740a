//! Persistence: chat settings and the chat blacklist.

mod backend;
mod models;
mod store;

pub use backend::{JsonFileBackend, MemoryBackend, StateBackend, StoreError};
pub use models::{BotState, ChatSetting};
pub use store::ChatStore;
