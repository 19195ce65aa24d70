//! Command statistics and per-command settings: commands stats, commands delete-original

use serenity::async_trait;

use super::find_command;
use crate::accounts::AccountCommandInfo;
use crate::dispatch::{CommandContext, CommandHandler, CommandResult};
use crate::error::CommandError;
use crate::transport::{Embed, Reply, COLOUR_BLURPLE};

const TOP_COMMANDS: usize = 10;

fn format_info(info: &AccountCommandInfo) -> String {
    format!(
        "`{}`: run {} times, failed {} times",
        info.name, info.times_run, info.times_failed
    )
}

pub struct Stats;

#[async_trait]
impl CommandHandler for Stats {
    async fn run(&self, ctx: &CommandContext<'_>) -> CommandResult {
        let account = ctx.accounts.get(ctx.account).await;

        if let Some(query) = ctx.args.text("command") {
            let name = ctx.tree.full_name(find_command(ctx.tree, query)?);
            let line = match account.command_info(&name) {
                Some(info) => format_info(info),
                None => format!("`{}` has not been used yet.", name),
            };
            return Ok(Some(Reply::text(line)));
        }

        let mut infos: Vec<&AccountCommandInfo> = account.command_infos.iter().collect();
        if infos.is_empty() {
            return Ok(Some(Reply::text("No commands have been used yet.")));
        }
        infos.sort_by(|a, b| b.times_run.cmp(&a.times_run).then_with(|| a.name.cmp(&b.name)));

        let lines: Vec<String> = infos.into_iter().take(TOP_COMMANDS).map(format_info).collect();
        Ok(Some(Reply::embed(
            Embed::titled("Most used commands")
                .description(lines.join("\n"))
                .colour(COLOUR_BLURPLE),
        )))
    }
}

/// Toggles deleting the triggering message after a successful run.
pub struct DeleteOriginal;

#[async_trait]
impl CommandHandler for DeleteOriginal {
    async fn run(&self, ctx: &CommandContext<'_>) -> CommandResult {
        let query = ctx.args.text("command").unwrap_or_default();
        let enabled = ctx.args.boolean("enabled").unwrap_or(false);
        let name = ctx.tree.full_name(find_command(ctx.tree, query)?);

        ctx.accounts
            .update(ctx.account, |account| {
                account.settings_mut(&name).delete_original_message = enabled
            })
            .await
            .map_err(|e| CommandError::failed(e.to_string()))?;

        let verb = if enabled { "deleted" } else { "kept" };
        Ok(Some(Reply::text(format!(
            "Original messages of `{}` will now be {}.",
            name, verb
        ))))
    }
}
