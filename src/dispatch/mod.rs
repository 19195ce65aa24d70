//! # Invocation Dispatcher
//!
//! Single entry point for prefix messages and slash interactions. Both are
//! lowered to a resolved overload list plus raw arguments, executed the same
//! way, and handed to the outcome recorder.
//!
//! ```text
//! Received -> Resolving -> Executing -> Succeeded | Failed(reason) -> Recorded
//! ```
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.1.0
//! - **Toggleable**: false

mod context;
pub mod invocation;
mod recorder;

use std::sync::{Arc, OnceLock};

use anyhow::Result;
use log::{debug, info, warn};

use crate::accounts::{AccountService, AccountStore};
use crate::error::{CommandError, PersistenceError};
use crate::registry::{AliasTarget, CommandId, ModuleId, ModuleTree};
use crate::slash::SlashSchema;
use crate::transport::{Reply, ReplyTarget, Transport};

pub use context::{BotInfo, CommandContext, CommandHandler, CommandResult};
pub use recorder::{error_reply, module_info_reply, usage_reply, SUCCESS_EMOJI};
pub use invocation::{
    ArgValue, BoundArgs, Invocation, InvocationSource, RawArgs, StructuredInvocation, TextInvocation,
};

use invocation::{bind, select_overload, strip_prefix, tokenize};

pub const GUILD_ONLY_REPLY: &str = "I only respond in guilds.";

/// Prefix shown in usage strings for slash invocations.
const SLASH_PREFIX: &str = "/";

/// Terminal state of one invocation.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Not addressed to the bot (no prefix).
    Ignored,
    /// Prefix message outside a guild.
    Rejected,
    /// Input named a module without an invocable command; its summary was sent.
    ModuleInfo(ModuleId),
    Succeeded(CommandId),
    Failed {
        command: Option<CommandId>,
        error: CommandError,
    },
}

/// Outcome plus any non-fatal persistence failure while recording it.
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchReport {
    pub outcome: Outcome,
    pub persistence_error: Option<PersistenceError>,
}

impl From<Outcome> for DispatchReport {
    fn from(outcome: Outcome) -> Self {
        DispatchReport {
            outcome,
            persistence_error: None,
        }
    }
}

/// How the invocation arrived; decides acknowledgement style.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Origin {
    Text { message_id: u64 },
    Structured,
}

pub struct Dispatcher {
    tree: Arc<ModuleTree>,
    accounts: AccountService,
    transport: Arc<dyn Transport>,
    info: BotInfo,
    bot_user_id: OnceLock<u64>,
}

impl Dispatcher {
    pub fn new(
        tree: Arc<ModuleTree>,
        store: Arc<dyn AccountStore>,
        transport: Arc<dyn Transport>,
        info: BotInfo,
    ) -> Self {
        Dispatcher {
            tree,
            accounts: AccountService::new(store),
            transport,
            info,
            bot_user_id: OnceLock::new(),
        }
    }

    pub fn tree(&self) -> &ModuleTree {
        &self.tree
    }

    pub fn accounts(&self) -> &AccountService {
        &self.accounts
    }

    /// Records the bot's own user id once the gateway reports it; enables mention prefixes.
    pub fn set_bot_user_id(&self, id: u64) {
        if self.bot_user_id.set(id).is_err() {
            debug!("Bot user id already set, keeping the first one");
        }
    }

    /// Hands already synthesized schemas to the platform.
    pub async fn register_schemas(&self, schemas: &[SlashSchema]) -> Result<()> {
        self.transport.register_schemas(schemas).await?;
        info!("Registered {} slash schemas", schemas.len());
        Ok(())
    }

    pub async fn dispatch(&self, invocation: Invocation) -> DispatchReport {
        match invocation {
            Invocation::FreeText(text) => self.dispatch_text(text).await,
            Invocation::Structured(structured) => self.dispatch_structured(structured).await,
        }
    }

    async fn dispatch_text(&self, text: TextInvocation) -> DispatchReport {
        let source = &text.source;
        if source.guild_id.is_none() {
            self.send(&source.reply_to, Reply::text(GUILD_ONLY_REPLY)).await;
            return Outcome::Rejected.into();
        }

        let account = self.accounts.get(source.account_key()).await;
        let Some(body) = strip_prefix(&text.content, &account.prefixes, self.bot_user_id.get().copied()) else {
            return Outcome::Ignored.into();
        };
        let prefix = account.display_prefix(&self.info.default_prefix).to_string();

        let words = tokenize(body);
        debug!("Received prefix invocation {:?} from user {}", words, source.author_id);

        let resolution = match self.tree.resolve_words(&words) {
            Ok(resolution) => resolution,
            Err(e) => {
                debug!("Dropping unknown prefix command: {}", e);
                return Outcome::Failed {
                    command: None,
                    error: CommandError::UnknownCommand,
                }
                .into();
            }
        };

        if resolution.overloads.is_empty() {
            self.send(&source.reply_to, recorder::module_info_reply(&self.tree, resolution.module, &prefix))
                .await;
            return Outcome::ModuleInfo(resolution.module).into();
        }

        let args = RawArgs::Positional(words[resolution.consumed..].to_vec());
        let origin = Origin::Text {
            message_id: text.message_id,
        };
        self.execute(source, origin, &resolution.overloads, args, &prefix).await
    }

    async fn dispatch_structured(&self, structured: StructuredInvocation) -> DispatchReport {
        let source = &structured.source;
        debug!("Received slash invocation {:?} from user {}", structured.path, source.author_id);

        let overloads = self.slash_overloads(&structured.path);

        if overloads.is_empty() {
            warn!("Slash invocation {:?} matches no command", structured.path);
            let error = CommandError::UnknownCommand;
            self.send(&source.reply_to, recorder::error_reply(&error.to_string())).await;
            return Outcome::Failed { command: None, error }.into();
        }

        let args = RawArgs::Named(structured.options.clone());
        self.execute(source, Origin::Structured, &overloads, args, SLASH_PREFIX).await
    }

    /// Slash commands registered under exactly `path`.
    ///
    /// A module sharing the path only supplies its default command when no
    /// command owns the path itself.
    fn slash_overloads(&self, path: &[String]) -> Vec<CommandId> {
        let joined = path.join(" ").to_lowercase();
        let exact: Vec<CommandId> = self
            .tree
            .alias_index()
            .lookup(&joined)
            .iter()
            .filter_map(|target| match target {
                AliasTarget::Command(id) => Some(*id),
                AliasTarget::Module(_) => None,
            })
            .filter(|&id| self.tree.command(id).is_slash() && self.tree.full_name(id) == joined)
            .collect();
        if !exact.is_empty() {
            return exact;
        }

        self.tree
            .resolve_words(path)
            .ok()
            .filter(|resolution| resolution.consumed == path.len())
            .map(|resolution| resolution.overloads)
            .unwrap_or_default()
            .into_iter()
            .filter(|&id| self.tree.command(id).is_slash())
            .collect()
    }

    async fn execute(
        &self,
        source: &InvocationSource,
        origin: Origin,
        overloads: &[CommandId],
        args: RawArgs,
        prefix: &str,
    ) -> DispatchReport {
        let Some(command_id) = select_overload(&self.tree, overloads, &args) else {
            return Outcome::Failed {
                command: None,
                error: CommandError::UnknownCommand,
            }
            .into();
        };

        let result = self.run_command(source, command_id, &args, prefix).await;
        self.record(source, origin, command_id, result, prefix).await
    }

    async fn run_command(
        &self,
        source: &InvocationSource,
        command_id: CommandId,
        args: &RawArgs,
        prefix: &str,
    ) -> CommandResult {
        let command = self.tree.command(command_id);
        if !source.permissions.contains(command.required_permissions) {
            return Err(CommandError::PermissionDenied);
        }

        let ctx = CommandContext {
            tree: &self.tree,
            accounts: &self.accounts,
            info: &self.info,
            source,
            command_id,
            args: bind(command, args)?,
            account: source.account_key(),
            prefix,
            bot_user_id: self.bot_user_id.get().copied(),
        };
        command.handler.run(&ctx).await
    }

    /// Fire-and-forget delivery; failures are logged only.
    async fn send(&self, target: &ReplyTarget, reply: Reply) {
        if let Err(e) = self.transport.send_reply(target, reply).await {
            warn!("Failed to deliver reply to channel {}: {}", target.channel_id(), e);
        }
    }
}

#[cfg(test)]
pub(crate) mod testing;
