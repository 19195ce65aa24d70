//! Outcome recording: counters, acknowledgements and user-facing errors.

use log::{debug, error, warn};

use super::{CommandResult, DispatchReport, Dispatcher, InvocationSource, Origin, Outcome};
use crate::error::CommandError;
use crate::registry::usage::{format_command_usage, format_module_commands, format_module_summary};
use crate::registry::{CommandId, ModuleId, ModuleTree};
use crate::transport::{Embed, Reply, COLOUR_BLURPLE, COLOUR_DARK_ORANGE, COLOUR_RED};

pub const SUCCESS_EMOJI: &str = "✅";

const USAGE_TITLE: &str = "Wrongly executed, correct example:";
const USAGE_TIP: &str = "Tip: <> means mandatory, [] means optional";
const MISSING_FILE_PREFIX: &str = "Could not find file";
const MISSING_FILE_REPLY: &str = "Requested file not found.";

/// Error embed titled with the failure reason.
pub fn error_reply(reason: &str) -> Reply {
    let reason = if reason.starts_with(MISSING_FILE_PREFIX) {
        MISSING_FILE_REPLY
    } else {
        reason
    };
    Reply::embed(Embed::titled(reason).colour(COLOUR_DARK_ORANGE))
}

/// Embed showing how the command should have been called.
pub fn usage_reply(tree: &ModuleTree, command: CommandId, prefix: &str) -> Reply {
    Reply::embed(
        Embed::titled(USAGE_TITLE)
            .description(format_command_usage(tree, command, prefix))
            .footer(USAGE_TIP)
            .colour(COLOUR_RED),
    )
}

/// Summary of a module plus the usage of its direct commands.
pub fn module_info_reply(tree: &ModuleTree, module: ModuleId, prefix: &str) -> Reply {
    let path = tree.module_path(module).join(" ");
    let mut description = format_module_summary(tree, module);

    let commands = format_module_commands(tree, module, prefix);
    if !commands.is_empty() {
        description.push_str("\n\n**Commands:**\n");
        description.push_str(&commands);
    }

    let submodules: Vec<String> = tree
        .module(module)
        .submodules
        .iter()
        .map(|&m| format!("`{}`", tree.module_path(m).join(" ")))
        .collect();
    if !submodules.is_empty() {
        description.push_str("\n\n**Submodules:** ");
        description.push_str(&submodules.join(", "));
    }

    Reply::embed(
        Embed::titled(format!("Module: {}", path))
            .description(description)
            .colour(COLOUR_BLURPLE),
    )
}

impl Dispatcher {
    /// Replies first, then updates counters, then acknowledges the trigger.
    pub(super) async fn record(
        &self,
        source: &InvocationSource,
        origin: Origin,
        command_id: CommandId,
        result: CommandResult,
        prefix: &str,
    ) -> DispatchReport {
        let name = self.tree.full_name(command_id);

        match &result {
            Ok(Some(reply)) => self.send(&source.reply_to, reply.clone()).await,
            Ok(None) if origin == Origin::Structured => {
                self.send(&source.reply_to, Reply::text(SUCCESS_EMOJI)).await
            }
            Ok(None) => {}
            // a deferred interaction stays "thinking" until it gets an answer
            Err(e) if e.is_silent() && origin == Origin::Structured => {
                debug!("Denied `{}` to user {}: {}", name, source.author_id, e);
                self.send(&source.reply_to, error_reply(&e.to_string())).await
            }
            Err(e) if e.is_silent() => {
                debug!("Suppressed failure of `{}` for user {}: {}", name, source.author_id, e)
            }
            Err(CommandError::BadArgCount) => {
                warn!("`{}` called with a bad argument count", name);
                self.send(&source.reply_to, usage_reply(&self.tree, command_id, prefix)).await
            }
            Err(e) => {
                warn!("`{}` failed: {}", name, e);
                self.send(&source.reply_to, error_reply(&e.to_string())).await
            }
        }

        let failed = result.is_err();
        let update = self
            .accounts
            .update(source.account_key(), |account| {
                let info = account.command_info_mut(&name);
                info.times_run += 1;
                if failed {
                    info.times_failed += 1;
                }
                account.deletes_original_message(&name)
            })
            .await;

        let (delete_original, persistence_error) = match update {
            Ok(delete_original) => (delete_original, None),
            Err(e) => {
                error!("Could not record outcome of `{}`: {}", name, e);
                (false, Some(e))
            }
        };

        if let (Ok(_), Origin::Text { message_id }) = (&result, origin) {
            self.acknowledge(source.reply_to.channel_id(), message_id, delete_original)
                .await;
        }

        let outcome = match result {
            Ok(_) => Outcome::Succeeded(command_id),
            Err(error) => Outcome::Failed {
                command: Some(command_id),
                error,
            },
        };
        DispatchReport {
            outcome,
            persistence_error,
        }
    }

    /// The trigger may already be gone, so failures here are not errors.
    async fn acknowledge(&self, channel_id: u64, message_id: u64, delete_original: bool) {
        let result = if delete_original {
            self.transport.delete_message(channel_id, message_id).await
        } else {
            self.transport
                .add_reaction(channel_id, message_id, SUCCESS_EMOJI)
                .await
        };
        if let Err(e) = result {
            debug!("Could not acknowledge message {}: {}", message_id, e);
        }
    }
}
