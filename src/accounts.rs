//! # Accounts
//!
//! Per-guild (or per-user, for direct messages) records holding prefixes,
//! per-command settings and usage counters. Storage is an external concern
//! behind [`AccountStore`]; [`AccountService`] serializes read-modify-write
//! cycles per account so concurrent invocations never lose an update.
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.1.0
//! - **Toggleable**: false

use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use serenity::async_trait;
use tokio::sync::Mutex;

use crate::error::PersistenceError;

/// Identity of an account record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AccountKey {
    pub id: u64,
    pub guild_scoped: bool,
}

impl AccountKey {
    pub fn guild(id: u64) -> Self {
        AccountKey { id, guild_scoped: true }
    }

    pub fn user(id: u64) -> Self {
        AccountKey { id, guild_scoped: false }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountCommandInfo {
    pub name: String,
    pub times_run: u64,
    pub times_failed: u64,
}

impl AccountCommandInfo {
    pub fn new(name: impl Into<String>) -> Self {
        AccountCommandInfo {
            name: name.into(),
            times_run: 0,
            times_failed: 0,
        }
    }
}

/// Per-account behaviour overrides for one command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandSettings {
    pub name: String,
    #[serde(default)]
    pub delete_original_message: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub id: u64,
    pub guild_scoped: bool,
    pub prefixes: Vec<String>,
    #[serde(default)]
    pub command_infos: Vec<AccountCommandInfo>,
    #[serde(default)]
    pub command_settings: Vec<CommandSettings>,
    pub created_at: DateTime<Utc>,
}

impl Account {
    pub fn new(key: AccountKey, default_prefix: &str) -> Self {
        Account {
            id: key.id,
            guild_scoped: key.guild_scoped,
            prefixes: vec![default_prefix.to_string()],
            command_infos: Vec::new(),
            command_settings: Vec::new(),
            created_at: Utc::now(),
        }
    }

    pub fn key(&self) -> AccountKey {
        AccountKey {
            id: self.id,
            guild_scoped: self.guild_scoped,
        }
    }

    /// Prefix shown in usage strings, falling back when every prefix was removed.
    pub fn display_prefix<'a>(&'a self, fallback: &'a str) -> &'a str {
        self.prefixes.first().map(String::as_str).unwrap_or(fallback)
    }

    pub fn command_info(&self, name: &str) -> Option<&AccountCommandInfo> {
        self.command_infos.iter().find(|info| info.name == name)
    }

    /// Counters for `name`, created on first use.
    pub fn command_info_mut(&mut self, name: &str) -> &mut AccountCommandInfo {
        match self.command_infos.iter().position(|info| info.name == name) {
            Some(index) => &mut self.command_infos[index],
            None => {
                self.command_infos.push(AccountCommandInfo::new(name));
                let last = self.command_infos.len() - 1;
                &mut self.command_infos[last]
            }
        }
    }

    pub fn settings(&self, name: &str) -> Option<&CommandSettings> {
        self.command_settings.iter().find(|s| s.name == name)
    }

    pub fn settings_mut(&mut self, name: &str) -> &mut CommandSettings {
        match self.command_settings.iter().position(|s| s.name == name) {
            Some(index) => &mut self.command_settings[index],
            None => {
                self.command_settings.push(CommandSettings {
                    name: name.to_string(),
                    delete_original_message: false,
                });
                let last = self.command_settings.len() - 1;
                &mut self.command_settings[last]
            }
        }
    }

    pub fn deletes_original_message(&self, name: &str) -> bool {
        self.settings(name).map_or(false, |s| s.delete_original_message)
    }
}

/// Storage collaborator for account records.
#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Never fails: a missing or unreadable record yields a fresh default one.
    async fn get_or_create(&self, key: AccountKey) -> Account;

    async fn save(&self, account: &Account) -> Result<(), PersistenceError>;
}

/// Process-local store, used when no database is configured and in tests.
#[derive(Clone)]
pub struct MemoryAccountStore {
    accounts: Arc<DashMap<AccountKey, Account>>,
    default_prefix: String,
}

impl MemoryAccountStore {
    pub fn new(default_prefix: impl Into<String>) -> Self {
        MemoryAccountStore {
            accounts: Arc::new(DashMap::new()),
            default_prefix: default_prefix.into(),
        }
    }

    pub fn get(&self, key: AccountKey) -> Option<Account> {
        self.accounts.get(&key).map(|entry| entry.value().clone())
    }
}

#[async_trait]
impl AccountStore for MemoryAccountStore {
    async fn get_or_create(&self, key: AccountKey) -> Account {
        self.accounts
            .entry(key)
            .or_insert_with(|| Account::new(key, &self.default_prefix))
            .value()
            .clone()
    }

    async fn save(&self, account: &Account) -> Result<(), PersistenceError> {
        self.accounts.insert(account.key(), account.clone());
        Ok(())
    }
}

/// Serializes get-or-create / mutate / save per account key.
#[derive(Clone)]
pub struct AccountService {
    store: Arc<dyn AccountStore>,
    locks: Arc<DashMap<AccountKey, Arc<Mutex<()>>>>,
}

impl AccountService {
    pub fn new(store: Arc<dyn AccountStore>) -> Self {
        AccountService {
            store,
            locks: Arc::new(DashMap::new()),
        }
    }

    /// Read-only snapshot of the account.
    pub async fn get(&self, key: AccountKey) -> Account {
        self.store.get_or_create(key).await
    }

    /// Applies `f` to the freshest copy of the account and saves it.
    ///
    /// Concurrent updates of the same key run one after another.
    pub async fn update<T, F>(&self, key: AccountKey, f: F) -> Result<T, PersistenceError>
    where
        F: FnOnce(&mut Account) -> T + Send,
        T: Send,
    {
        let lock = self
            .locks
            .entry(key)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();

        let result = {
            let _guard = lock.lock().await;
            let mut account = self.store.get_or_create(key).await;
            let value = f(&mut account);
            self.store.save(&account).await.map(|_| value)
        };

        // only the map holds the lock now, nobody is waiting on it
        drop(lock);
        self.locks.remove_if(&key, |_, entry| Arc::strong_count(entry) == 1);
        result
    }

    /// Number of accounts with an update in flight or queued.
    pub fn pending_locks(&self) -> usize {
        self.locks.len()
    }
}
