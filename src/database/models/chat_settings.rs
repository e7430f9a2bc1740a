//! Per-chat settings and the persisted bot state document.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

/// Settings for one chat, keyed by chat id in [`BotState::chats`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatSetting {
    /// Whether /coffee is allowed in this group.
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Chat title snapshot (informational only)
    #[serde(default)]
    pub title: String,

    /// User id -> epoch seconds of that user's last allowed roll.
    #[serde(default)]
    pub last_used: BTreeMap<String, f64>,
}

fn default_enabled() -> bool {
    true
}

impl Default for ChatSetting {
    fn default() -> Self {
        Self {
            enabled: true,
            title: String::new(),
            last_used: BTreeMap::new(),
        }
    }
}

impl ChatSetting {
    /// Last roll time for a user, `0.0` if they never rolled here.
    pub fn last_used_by(&self, user_id: u64) -> f64 {
        self.last_used
            .get(&user_id.to_string())
            .copied()
            .unwrap_or(0.0)
    }

    pub fn mark_used(&mut self, user_id: u64, now: f64) {
        self.last_used.insert(user_id.to_string(), now);
    }
}

/// The whole persisted document: chat settings plus the blacklist.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BotState {
    pub chats: BTreeMap<String, ChatSetting>,
    pub blacklist: BTreeSet<String>,
}

impl BotState {
    /// Settings for a chat. Absent chats read as the defaults.
    pub fn chat(&self, chat_id: i64) -> ChatSetting {
        self.chats
            .get(&chat_id.to_string())
            .cloned()
            .unwrap_or_default()
    }

    /// Mutable settings for a chat, created with defaults on first touch.
    pub fn chat_mut(&mut self, chat_id: i64) -> &mut ChatSetting {
        self.chats.entry(chat_id.to_string()).or_default()
    }

    pub fn is_blacklisted(&self, chat_id: i64) -> bool {
        self.blacklist.contains(&chat_id.to_string())
    }

    /// Add a chat to the blacklist. Returns `false` if it was already there.
    pub fn blacklist_chat(&mut self, chat_id: i64) -> bool {
        self.blacklist.insert(chat_id.to_string())
    }

    /// Remove a chat from the blacklist. Returns `false` if it was not there.
    pub fn whitelist_chat(&mut self, chat_id: i64) -> bool {
        self.blacklist.remove(&chat_id.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absent_chat_reads_as_default() {
        let state = BotState::default();
        let chat = state.chat(-100123);

        assert!(chat.enabled);
        assert!(chat.last_used.is_empty());
        assert_eq!(chat.last_used_by(7), 0.0);
        assert!(state.chats.is_empty());
    }

    #[test]
    fn test_blacklist_is_a_set() {
        let mut state = BotState::default();

        assert!(state.blacklist_chat(-1001));
        assert!(!state.blacklist_chat(-1001));
        assert_eq!(state.blacklist.len(), 1);

        assert!(state.whitelist_chat(-1001));
        assert!(!state.whitelist_chat(-1001));
        assert!(state.blacklist.is_empty());
    }

    #[test]
    fn test_chat_setting_json_layout() {
        let mut chat = ChatSetting {
            enabled: false,
            title: "Coffee Lovers".to_string(),
            ..Default::default()
        };
        chat.mark_used(55, 1000.5);

        let json = serde_json::to_value(&chat).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "enabled": false,
                "title": "Coffee Lovers",
                "last_used": { "55": 1000.5 }
            })
        );

        // Older documents may lack fields entirely
        let sparse: ChatSetting = serde_json::from_str(r#"{"title": "x"}"#).unwrap();
        assert!(sparse.enabled);
    }
}
