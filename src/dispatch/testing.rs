//! Test doubles for the dispatcher's collaborators.

use std::sync::{Arc, Mutex};

use anyhow::Result;
use serenity::async_trait;
use serenity::model::permissions::Permissions;

use super::{BotInfo, Dispatcher, InvocationSource};
use crate::accounts::{Account, AccountKey, AccountStore, MemoryAccountStore};
use crate::error::PersistenceError;
use crate::registry::ModuleTree;
use crate::slash::SlashSchema;
use crate::transport::{Reply, ReplyTarget, Transport};

pub const GUILD: u64 = 100;
pub const CHANNEL: u64 = 200;
pub const AUTHOR: u64 = 300;

/// Keeps every outbound call for later inspection.
#[derive(Default)]
pub struct RecordingTransport {
    pub replies: Mutex<Vec<(ReplyTarget, Reply)>>,
    pub deleted: Mutex<Vec<(u64, u64)>>,
    pub reactions: Mutex<Vec<(u64, u64, String)>>,
    pub registered: Mutex<Vec<SlashSchema>>,
}

impl RecordingTransport {
    pub fn replies(&self) -> Vec<Reply> {
        self.replies.lock().unwrap().iter().map(|(_, r)| r.clone()).collect()
    }

    pub fn deleted(&self) -> Vec<(u64, u64)> {
        self.deleted.lock().unwrap().clone()
    }

    pub fn reactions(&self) -> Vec<(u64, u64, String)> {
        self.reactions.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn send_reply(&self, target: &ReplyTarget, reply: Reply) -> Result<()> {
        self.replies.lock().unwrap().push((target.clone(), reply));
        Ok(())
    }

    async fn delete_message(&self, channel_id: u64, message_id: u64) -> Result<()> {
        self.deleted.lock().unwrap().push((channel_id, message_id));
        Ok(())
    }

    async fn add_reaction(&self, channel_id: u64, message_id: u64, emoji: &str) -> Result<()> {
        self.reactions
            .lock()
            .unwrap()
            .push((channel_id, message_id, emoji.to_string()));
        Ok(())
    }

    async fn register_schemas(&self, schemas: &[SlashSchema]) -> Result<()> {
        self.registered.lock().unwrap().extend_from_slice(schemas);
        Ok(())
    }
}

/// Reads like a memory store, refuses every save.
pub struct FailingStore(pub MemoryAccountStore);

#[async_trait]
impl AccountStore for FailingStore {
    async fn get_or_create(&self, key: AccountKey) -> Account {
        self.0.get_or_create(key).await
    }

    async fn save(&self, account: &Account) -> Result<(), PersistenceError> {
        Err(PersistenceError {
            account_id: account.id,
            reason: "disk full".to_string(),
        })
    }
}

pub struct Harness {
    pub dispatcher: Dispatcher,
    pub transport: Arc<RecordingTransport>,
    pub store: MemoryAccountStore,
}

impl Harness {
    pub fn new(tree: ModuleTree) -> Self {
        let store = MemoryAccountStore::new("!");
        Self::with_store(tree, store.clone(), Arc::new(store))
    }

    pub fn failing(tree: ModuleTree) -> Self {
        let store = MemoryAccountStore::new("!");
        Self::with_store(tree, store.clone(), Arc::new(FailingStore(store)))
    }

    fn with_store(tree: ModuleTree, store: MemoryAccountStore, backing: Arc<dyn AccountStore>) -> Self {
        let transport = Arc::new(RecordingTransport::default());
        let info = BotInfo {
            default_prefix: "!".to_string(),
            ..Default::default()
        };
        let dispatcher = Dispatcher::new(Arc::new(tree), backing, transport.clone(), info);
        Harness {
            dispatcher,
            transport,
            store,
        }
    }

    pub fn account(&self) -> Account {
        self.store
            .get(AccountKey::guild(GUILD))
            .unwrap_or_else(|| Account::new(AccountKey::guild(GUILD), "!"))
    }
}

pub fn guild_source(permissions: Permissions) -> InvocationSource {
    InvocationSource {
        guild_id: Some(GUILD),
        channel_id: CHANNEL,
        author_id: AUTHOR,
        permissions,
        reply_to: ReplyTarget::Channel(CHANNEL),
    }
}

pub fn interaction_source(permissions: Permissions) -> InvocationSource {
    InvocationSource {
        reply_to: ReplyTarget::Interaction {
            channel_id: CHANNEL,
            token: "token".to_string(),
        },
        ..guild_source(permissions)
    }
}
