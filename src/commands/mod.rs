//! # Command System
//!
//! Built-in command set shared by prefix messages (`!ping`) and slash
//! commands (`/ping`). Every handler is a unit struct implementing
//! [`CommandHandler`](crate::dispatch::CommandHandler); the tree below is the
//! single place where names, parameters and permissions are declared.
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.1.0
//! - **Toggleable**: false

pub mod general;
pub mod prefix;
pub mod stats;

use serenity::model::permissions::Permissions;

use crate::error::CommandError;
use crate::registry::{CommandBuilder, CommandId, ModuleBuilder, ModuleTree, Parameter, ParameterKind};

/// Assembles every built-in module.
pub fn create_module_tree() -> ModuleTree {
    ModuleTree::builder()
        .module(general_module())
        .module(prefix_module())
        .module(commands_module())
        .build()
}

fn general_module() -> ModuleBuilder {
    ModuleBuilder::ungrouped()
        .summary("General purpose commands")
        .command(
            CommandBuilder::new("ping", general::Ping)
                .summary("Test bot responsiveness")
                .slash(),
        )
        .command(
            CommandBuilder::new("about", general::About)
                .summary("Links and credits for this bot")
                .slash(),
        )
        .command(
            CommandBuilder::new("help", general::Help)
                .summary("Show modules, or how to use a module or command")
                .parameter(
                    Parameter::new("query", ParameterKind::Text)
                        .optional()
                        .remainder()
                        .summary("Module or command to look up"),
                )
                .slash(),
        )
}

fn prefix_module() -> ModuleBuilder {
    ModuleBuilder::new("prefix")
        .summary("Manage the prefixes this server uses")
        .command(
            CommandBuilder::new("list", prefix::List)
                .summary("Show every prefix")
                .slash(),
        )
        .command(
            CommandBuilder::new("add", prefix::Add)
                .summary("Add a prefix")
                .parameter(Parameter::new("prefix", ParameterKind::Text).summary("Prefix to add"))
                .requires(Permissions::MANAGE_GUILD)
                .slash(),
        )
        .command(
            CommandBuilder::new("remove", prefix::Remove)
                .alias("rm")
                .summary("Remove a prefix")
                .parameter(Parameter::new("prefix", ParameterKind::Text).summary("Prefix to remove"))
                .requires(Permissions::MANAGE_GUILD)
                .slash(),
        )
}

fn commands_module() -> ModuleBuilder {
    ModuleBuilder::new("commands")
        .alias("cmd")
        .summary("Usage statistics and per-command settings")
        .command(
            CommandBuilder::new("stats", stats::Stats)
                .summary("How often commands ran and failed here")
                .parameter(
                    Parameter::new("command", ParameterKind::Text)
                        .optional()
                        .remainder()
                        .summary("Only show this command"),
                )
                .slash(),
        )
        .command(
            CommandBuilder::new("delete-original", stats::DeleteOriginal)
                .summary("Delete the triggering message when a command succeeds")
                .parameter(Parameter::new("command", ParameterKind::Text).summary("Command to configure"))
                .parameter(Parameter::new("enabled", ParameterKind::Boolean).summary("Whether to delete"))
                .requires(Permissions::MANAGE_GUILD)
                .slash(),
        )
}

/// Resolves `query` to exactly one command, consuming every word.
pub(crate) fn find_command(tree: &ModuleTree, query: &str) -> Result<CommandId, CommandError> {
    let words: Vec<&str> = query.split_whitespace().collect();
    tree.resolve_words(&words)
        .ok()
        .filter(|resolution| resolution.consumed == words.len())
        .and_then(|resolution| resolution.command)
        .ok_or_else(|| CommandError::failed(format!("No command named `{}`.", query.trim())))
}
