//! Chat store: the single owner of chat settings and the blacklist.
//!
//! Every read-modify-write goes through [`ChatStore::update`], which holds a
//! process-wide lock across load, the caller's mutation, and save. Two
//! concurrent rolls in the same chat therefore never overwrite each other's
//! `last_used` entries.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, error, info};

use super::backend::{StateBackend, StoreError};
use super::models::{BotState, ChatSetting};

pub struct ChatStore {
    backend: Box<dyn StateBackend>,
    lock: Mutex<()>,
}

impl ChatStore {
    /// Wrap a backend, recovering from a corrupt document up front.
    pub fn open(backend: Box<dyn StateBackend>) -> Result<Self, StoreError> {
        let store = Self {
            backend,
            lock: Mutex::new(()),
        };

        let state = store.read(|state| (state.chats.len(), state.blacklist.len()))?;
        info!(
            "Chat store ready ({}): {} chats, {} blacklisted",
            store.backend.describe(),
            state.0,
            state.1
        );

        Ok(store)
    }

    /// Run `f` against a snapshot of the current state.
    pub fn read<R>(&self, f: impl FnOnce(&BotState) -> R) -> Result<R, StoreError> {
        let _guard = self.lock.lock();
        let state = self.load_or_reset()?;
        Ok(f(&state))
    }

    /// Load, mutate, and save as one step.
    ///
    /// Nothing is written when `f` leaves the state unchanged.
    pub fn update<R>(&self, f: impl FnOnce(&mut BotState) -> R) -> Result<R, StoreError> {
        let _guard = self.lock.lock();
        let mut state = self.load_or_reset()?;
        let before = state.clone();

        let result = f(&mut state);

        if state != before {
            self.backend.save(&state)?;
        } else {
            debug!("State unchanged, skipping save");
        }

        Ok(result)
    }

    /// [`ChatStore::read`] on the blocking pool, for use from async handlers.
    pub async fn read_async<R, F>(self: &Arc<Self>, f: F) -> Result<R, StoreError>
    where
        F: FnOnce(&BotState) -> R + Send + 'static,
        R: Send + 'static,
    {
        let store = Arc::clone(self);
        tokio::task::spawn_blocking(move || store.read(f)).await?
    }

    /// [`ChatStore::update`] on the blocking pool, for use from async handlers.
    pub async fn update_async<R, F>(self: &Arc<Self>, f: F) -> Result<R, StoreError>
    where
        F: FnOnce(&mut BotState) -> R + Send + 'static,
        R: Send + 'static,
    {
        let store = Arc::clone(self);
        tokio::task::spawn_blocking(move || store.update(f)).await?
    }

    /// Load the document. A corrupt document is logged, moved aside, and
    /// replaced by an empty one; its contents are lost.
    fn load_or_reset(&self) -> Result<BotState, StoreError> {
        match self.backend.load() {
            Err(err @ StoreError::CorruptState { .. }) => {
                error!("{err}; resetting to an empty document");
                self.backend.quarantine()?;
                self.backend.load()
            }
            other => other,
        }
    }
}

#[cfg(test)]
impl ChatStore {
    /// Settings for one chat (defaults if never touched).
    pub(crate) fn chat(&self, chat_id: i64) -> Result<ChatSetting, StoreError> {
        self.read(|state| state.chat(chat_id))
    }

    pub(crate) fn is_blacklisted(&self, chat_id: i64) -> Result<bool, StoreError> {
        self.read(|state| state.is_blacklisted(chat_id))
    }
}

impl std::fmt::Debug for ChatStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatStore")
            .field("backend", &self.backend.describe())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::backend::{BLACKLIST_FILE, JsonFileBackend, MemoryBackend, SETTINGS_FILE};

    #[test]
    fn test_update_persists_and_read_sees_it() {
        let dir = tempfile::tempdir().unwrap();
        let store = ChatStore::open(Box::new(JsonFileBackend::open(dir.path()).unwrap())).unwrap();

        store
            .update(|state| state.chat_mut(-10).enabled = false)
            .unwrap();

        assert!(!store.chat(-10).unwrap().enabled);
        assert!(store.chat(-11).unwrap().enabled);

        // A fresh store over the same directory sees the write
        let reopened = ChatStore::open(Box::new(JsonFileBackend::open(dir.path()).unwrap())).unwrap();
        assert!(!reopened.chat(-10).unwrap().enabled);
    }

    #[test]
    fn test_unchanged_state_is_not_written() {
        let dir = tempfile::tempdir().unwrap();
        let store = ChatStore::open(Box::new(JsonFileBackend::open(dir.path()).unwrap())).unwrap();

        let blocked = store.update(|state| state.is_blacklisted(-1)).unwrap();

        assert!(!blocked);
        assert!(!dir.path().join(SETTINGS_FILE).exists());
    }

    #[test]
    fn test_corrupt_document_resets_to_empty() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(SETTINGS_FILE), b"][").unwrap();

        let store = ChatStore::open(Box::new(JsonFileBackend::open(dir.path()).unwrap())).unwrap();

        assert!(store.chat(-1).unwrap().enabled);
        assert!(dir.path().join("chat_settings.bak").exists());
    }

    #[test]
    fn test_wrong_shape_document_resets_to_empty() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(SETTINGS_FILE), b"[]").unwrap();
        std::fs::write(dir.path().join(BLACKLIST_FILE), b"[-100]").unwrap();

        let store = ChatStore::open(Box::new(JsonFileBackend::open(dir.path()).unwrap())).unwrap();

        assert_eq!(store.read(|state| state.clone()).unwrap(), BotState::default());
        assert!(dir.path().join("chat_settings.bak").exists());
        assert!(dir.path().join("blacklist.bak").exists());

        // Later writes land in fresh files
        store.update(|state| state.blacklist_chat(-7)).unwrap();
        assert!(store.is_blacklisted(-7).unwrap());
    }

    #[tokio::test]
    async fn test_async_access_uses_same_state() {
        let store = Arc::new(ChatStore::open(Box::new(MemoryBackend::new())).unwrap());

        let added = store.update_async(|state| state.blacklist_chat(-3)).await.unwrap();
        assert!(added);

        let blocked = store.read_async(|state| state.is_blacklisted(-3)).await.unwrap();
        assert!(blocked);
        assert!(store.is_blacklisted(-3).unwrap());
    }

    #[test]
    fn test_concurrent_updates_do_not_lose_writes() {
        let store = Arc::new(ChatStore::open(Box::new(MemoryBackend::new())).unwrap());

        let handles: Vec<_> = (0..16u64)
            .map(|user| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    store
                        .update(|state| state.chat_mut(-42).mark_used(user, 1000.0))
                        .unwrap();
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(store.chat(-42).unwrap().last_used.len(), 16);
    }
}
