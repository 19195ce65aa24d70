//! SQLite backed [`AccountStore`]. Each account is one JSON document keyed by
//! its id and scope.

use std::sync::Arc;

use anyhow::Result;
use dashmap::DashSet;
use log::{error, info};
use serenity::async_trait;
use sqlite::{Connection, State};
use tokio::sync::Mutex;

use crate::accounts::{Account, AccountKey, AccountStore};
use crate::error::PersistenceError;

#[derive(Clone)]
pub struct Database {
    connection: Arc<Mutex<Connection>>,
    default_prefix: String,
    /// Records that exist but failed to load; saving over them would lose data.
    unreadable: Arc<DashSet<AccountKey>>,
}

impl Database {
    pub async fn new(database_path: &str, default_prefix: &str) -> Result<Self> {
        let connection = sqlite::open(database_path)?;
        let db = Database {
            connection: Arc::new(Mutex::new(connection)),
            default_prefix: default_prefix.to_string(),
            unreadable: Arc::new(DashSet::new()),
        };

        db.init_tables().await?;
        info!("Database initialized at: {}", database_path);
        Ok(db)
    }

    async fn init_tables(&self) -> Result<()> {
        let conn = self.connection.lock().await;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS accounts (
                account_id TEXT NOT NULL,
                guild_scoped INTEGER NOT NULL,
                data TEXT NOT NULL,
                updated_at DATETIME DEFAULT CURRENT_TIMESTAMP,
                PRIMARY KEY (account_id, guild_scoped)
            )",
        )?;

        Ok(())
    }

    pub async fn load_account(&self, key: AccountKey) -> Result<Option<Account>> {
        let conn = self.connection.lock().await;
        let mut statement =
            conn.prepare("SELECT data FROM accounts WHERE account_id = ? AND guild_scoped = ?")?;
        statement.bind((1, key.id.to_string().as_str()))?;
        statement.bind((2, i64::from(key.guild_scoped)))?;

        if let Ok(State::Row) = statement.next() {
            let data = statement.read::<String, _>("data")?;
            Ok(Some(serde_json::from_str(&data)?))
        } else {
            Ok(None)
        }
    }

    pub async fn store_account(&self, account: &Account) -> Result<()> {
        let data = serde_json::to_string(account)?;
        let conn = self.connection.lock().await;
        let mut statement = conn.prepare(
            "INSERT OR REPLACE INTO accounts (account_id, guild_scoped, data, updated_at)
             VALUES (?, ?, ?, CURRENT_TIMESTAMP)",
        )?;
        statement.bind((1, account.id.to_string().as_str()))?;
        statement.bind((2, i64::from(account.guild_scoped)))?;
        statement.bind((3, data.as_str()))?;
        statement.next()?;
        Ok(())
    }
}

#[async_trait]
impl AccountStore for Database {
    async fn get_or_create(&self, key: AccountKey) -> Account {
        match self.load_account(key).await {
            Ok(Some(account)) => {
                self.unreadable.remove(&key);
                account
            }
            Ok(None) => {
                self.unreadable.remove(&key);
                Account::new(key, &self.default_prefix)
            }
            Err(e) => {
                error!("Failed to load account {}: {}", key.id, e);
                self.unreadable.insert(key);
                Account::new(key, &self.default_prefix)
            }
        }
    }

    async fn save(&self, account: &Account) -> Result<(), PersistenceError> {
        if self.unreadable.contains(&account.key()) {
            error!("Refusing to overwrite unreadable account {}", account.id);
            return Err(PersistenceError {
                account_id: account.id,
                reason: "the stored record could not be read and was left untouched".to_string(),
            });
        }
        self.store_account(account).await.map_err(|e| PersistenceError {
            account_id: account.id,
            reason: e.to_string(),
        })
    }
}
