//! Prefix commands: prefix list, prefix add, prefix remove

use serenity::async_trait;

use crate::dispatch::{CommandContext, CommandHandler, CommandResult};
use crate::error::CommandError;
use crate::transport::Reply;

pub struct List;

#[async_trait]
impl CommandHandler for List {
    async fn run(&self, ctx: &CommandContext<'_>) -> CommandResult {
        let account = ctx.accounts.get(ctx.account).await;
        if account.prefixes.is_empty() {
            return Ok(Some(Reply::text("No prefixes set, mention me instead.")));
        }

        let prefixes: Vec<String> = account.prefixes.iter().map(|p| format!("`{}`", p)).collect();
        Ok(Some(Reply::text(format!("**Prefixes:** {}", prefixes.join(", ")))))
    }
}

fn requested_prefix<'a>(ctx: &'a CommandContext<'_>) -> Result<&'a str, CommandError> {
    ctx.args
        .text("prefix")
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .ok_or_else(|| CommandError::failed("A prefix cannot be empty."))
}

pub struct Add;

#[async_trait]
impl CommandHandler for Add {
    async fn run(&self, ctx: &CommandContext<'_>) -> CommandResult {
        let prefix = requested_prefix(ctx)?;

        ctx.accounts
            .update(ctx.account, |account| {
                if account.prefixes.iter().any(|p| p == prefix) {
                    return Err(CommandError::failed(format!("`{}` is already a prefix.", prefix)));
                }
                account.prefixes.push(prefix.to_string());
                Ok(())
            })
            .await
            .map_err(|e| CommandError::failed(e.to_string()))??;

        Ok(Some(Reply::text(format!("Added prefix `{}`.", prefix))))
    }
}

pub struct Remove;

#[async_trait]
impl CommandHandler for Remove {
    async fn run(&self, ctx: &CommandContext<'_>) -> CommandResult {
        let prefix = requested_prefix(ctx)?;

        ctx.accounts
            .update(ctx.account, |account| {
                let before = account.prefixes.len();
                account.prefixes.retain(|p| p != prefix);
                if account.prefixes.len() == before {
                    return Err(CommandError::failed(format!("`{}` is not a prefix.", prefix)));
                }
                Ok(())
            })
            .await
            .map_err(|e| CommandError::failed(e.to_string()))??;

        Ok(Some(Reply::text(format!("Removed prefix `{}`.", prefix))))
    }
}
