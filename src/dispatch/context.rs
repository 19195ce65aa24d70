//! What a command handler sees while it runs.

use serenity::async_trait;

use super::invocation::{BoundArgs, InvocationSource};
use crate::accounts::{AccountKey, AccountService};
use crate::error::CommandError;
use crate::registry::{Command, CommandId, ModuleTree};
use crate::transport::Reply;

/// `Ok(None)` succeeds without a message of its own.
pub type CommandResult = Result<Option<Reply>, CommandError>;

/// Behaviour behind a registered command.
///
/// # Example
///
/// ```ignore
/// pub struct Ping;
///
/// #[async_trait]
/// impl CommandHandler for Ping {
///     async fn run(&self, _ctx: &CommandContext<'_>) -> CommandResult {
///         Ok(Some(Reply::text("Pong!")))
///     }
/// }
/// ```
#[async_trait]
pub trait CommandHandler: Send + Sync {
    async fn run(&self, ctx: &CommandContext<'_>) -> CommandResult;
}

/// Static facts about the bot shown by informational commands.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BotInfo {
    pub default_prefix: String,
    pub documentation_url: Option<String>,
    pub repository_url: Option<String>,
    pub contributors: Option<String>,
    pub invite_private: bool,
}

pub struct CommandContext<'a> {
    pub tree: &'a ModuleTree,
    pub accounts: &'a AccountService,
    pub info: &'a BotInfo,
    pub source: &'a InvocationSource,
    pub command_id: CommandId,
    pub args: BoundArgs,
    pub account: AccountKey,
    /// Prefix to show in usage strings for this invocation.
    pub prefix: &'a str,
    pub bot_user_id: Option<u64>,
}

impl<'a> CommandContext<'a> {
    pub fn command(&self) -> &'a Command {
        self.tree.command(self.command_id)
    }
}
