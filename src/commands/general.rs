//! General commands: ping, about, help

use serenity::async_trait;

use crate::dispatch::{module_info_reply, CommandContext, CommandHandler, CommandResult};
use crate::error::CommandError;
use crate::registry::usage::{format_command_usage, format_module_commands};
use crate::registry::{AliasTarget, ModuleTree};
use crate::transport::{Embed, Reply, COLOUR_BLURPLE};

const NOT_AVAILABLE: &str = "N/A";

pub struct Ping;

#[async_trait]
impl CommandHandler for Ping {
    async fn run(&self, _ctx: &CommandContext<'_>) -> CommandResult {
        Ok(Some(Reply::text("Pong!")))
    }
}

/// Documentation, source, credits and invite link.
pub struct About;

fn link(url: Option<&str>) -> String {
    match url {
        Some(url) if !url.is_empty() => format!("[Click me!]({})", url),
        _ => NOT_AVAILABLE.to_string(),
    }
}

#[async_trait]
impl CommandHandler for About {
    async fn run(&self, ctx: &CommandContext<'_>) -> CommandResult {
        let info = ctx.info;
        let invite = match (info.invite_private, ctx.bot_user_id) {
            (true, _) => "Private Bot.".to_string(),
            (false, Some(id)) => format!(
                "[Click me!](https://discord.com/api/oauth2/authorize?client_id={}&permissions=8&scope=bot)",
                id
            ),
            (false, None) => NOT_AVAILABLE.to_string(),
        };

        let description = format!(
            "**Documentation:** {}\n\n**Source code:** {}\n\n**Developed by:** {}\n\n**Invite the bot:** {}",
            link(info.documentation_url.as_deref()),
            link(info.repository_url.as_deref()),
            info.contributors.as_deref().unwrap_or(NOT_AVAILABLE),
            invite
        );

        Ok(Some(Reply::embed(
            Embed::titled("About the bot")
                .description(description)
                .colour(COLOUR_BLURPLE),
        )))
    }
}

/// Overview without a query; module summary or command usage with one.
pub struct Help;

#[async_trait]
impl CommandHandler for Help {
    async fn run(&self, ctx: &CommandContext<'_>) -> CommandResult {
        match ctx.args.text("query") {
            None => Ok(Some(overview(ctx.tree, ctx.prefix))),
            Some(query) => lookup(ctx.tree, query, ctx.prefix).map(Some),
        }
    }
}

/// Lists commands reachable without a module word, then every module whose
/// name is the first word of its path. Top markers and ungrouped sets are
/// looked through rather than listed.
fn overview(tree: &ModuleTree, prefix: &str) -> Reply {
    let mut sections = Vec::new();
    let mut modules = Vec::new();

    for (id, module) in tree.modules() {
        let path = tree.module_path(id);
        if path.is_empty() {
            let commands = format_module_commands(tree, id, prefix);
            if !commands.is_empty() {
                sections.push(commands);
            }
        } else if path.len() == 1 && module.contributes_segment() {
            modules.push(format!("`{}`", module.name));
        }
    }

    if !modules.is_empty() {
        sections.push(format!("**Modules:** {}", modules.join(", ")));
    }

    Reply::embed(
        Embed::titled("Help")
            .description(sections.join("\n\n"))
            .footer(format!("Use {}help <module or command> for details", prefix))
            .colour(COLOUR_BLURPLE),
    )
}

fn lookup(tree: &ModuleTree, query: &str, prefix: &str) -> Result<Reply, CommandError> {
    let not_found = || CommandError::failed(format!("No module or command named `{}`.", query.trim()));

    let words: Vec<&str> = query.split_whitespace().collect();
    let resolution = tree
        .resolve_words(&words)
        .ok()
        .filter(|resolution| resolution.consumed == words.len())
        .ok_or_else(not_found)?;

    let names_module = tree
        .alias_index()
        .lookup(&words.join(" "))
        .iter()
        .any(|target| matches!(target, AliasTarget::Module(_)));
    if names_module || resolution.overloads.is_empty() {
        return Ok(module_info_reply(tree, resolution.module, prefix));
    }

    let lines: Vec<String> = resolution
        .overloads
        .iter()
        .map(|&id| {
            let usage = format_command_usage(tree, id, prefix);
            let summary = &tree.command(id).summary;
            if summary.is_empty() {
                format!("`{}`", usage.trim_end())
            } else {
                format!("`{}` - {}", usage.trim_end(), summary)
            }
        })
        .collect();

    let name = resolution
        .command
        .map(|id| tree.full_name(id))
        .unwrap_or_default();
    Ok(Reply::embed(
        Embed::titled(format!("Command: {}", name))
            .description(lines.join("\n"))
            .footer("Tip: <> means mandatory, [] means optional")
            .colour(COLOUR_BLURPLE),
    ))
}

#[cfg(test)]
mod tests {
    use serenity::model::permissions::Permissions;

    use super::*;
    use crate::commands::tests::{accounts, run};
    use crate::dispatch::BotInfo;
    use crate::registry::tests::Noop;
    use crate::registry::{CommandBuilder, ModuleBuilder};

    fn description(result: CommandResult) -> String {
        result.unwrap().unwrap().embed.unwrap().description.unwrap()
    }

    #[tokio::test]
    async fn test_ping() {
        let reply = run(&accounts(), &BotInfo::default(), Permissions::empty(), "ping", &[])
            .await
            .unwrap();
        assert_eq!(reply, Some(Reply::text("Pong!")));
    }

    #[tokio::test]
    async fn test_about_private_and_public() {
        let info = BotInfo {
            repository_url: Some("https://example.com/repo".to_string()),
            invite_private: true,
            ..Default::default()
        };
        let text = description(run(&accounts(), &info, Permissions::empty(), "about", &[]).await);
        assert!(text.contains("**Documentation:** N/A"));
        assert!(text.contains("**Source code:** [Click me!](https://example.com/repo)"));
        assert!(text.ends_with("**Invite the bot:** Private Bot."));

        let info = BotInfo {
            invite_private: false,
            ..Default::default()
        };
        let text = description(run(&accounts(), &info, Permissions::empty(), "about", &[]).await);
        assert!(text.contains("client_id=42"));
    }

    #[tokio::test]
    async fn test_help_overview_lists_modules_and_loose_commands() {
        let text = description(run(&accounts(), &BotInfo::default(), Permissions::empty(), "help", &[]).await);
        assert!(text.contains("`!ping` - Test bot responsiveness"));
        assert!(text.contains("**Modules:** `prefix`, `commands`"));
    }

    #[test]
    fn test_overview_looks_through_top_markers() {
        let tree = ModuleTree::builder()
            .module(
                ModuleBuilder::new("core")
                    .top_module()
                    .command(CommandBuilder::new("status", Noop).summary("Bot status"))
                    .submodule(ModuleBuilder::new("admin").command(CommandBuilder::new("ban", Noop))),
            )
            .module(
                ModuleBuilder::ungrouped()
                    .top_module()
                    .submodule(ModuleBuilder::new("tools").command(CommandBuilder::new("roll", Noop))),
            )
            .build();

        let text = overview(&tree, "!").embed.unwrap().description.unwrap();
        assert!(text.contains("`!status` - Bot status"));
        assert!(text.contains("**Modules:** `admin`, `tools`"));
        assert!(!text.contains("`core`"));
    }

    #[tokio::test]
    async fn test_help_for_module_and_command() {
        let text = description(
            run(&accounts(), &BotInfo::default(), Permissions::empty(), "help", &["cmd"]).await,
        );
        assert!(text.starts_with("Usage statistics and per-command settings"));

        let text = description(
            run(&accounts(), &BotInfo::default(), Permissions::empty(), "help", &["prefix", "add"]).await,
        );
        assert_eq!(text, "`!prefix add <prefix>` - Add a prefix");
    }

    #[tokio::test]
    async fn test_help_unknown_query_fails() {
        let result = run(&accounts(), &BotInfo::default(), Permissions::empty(), "help", &["nothing"]).await;
        assert_eq!(
            result,
            Err(CommandError::failed("No module or command named `nothing`."))
        );
    }
}
