//! # Gateway
//!
//! Serenity glue: turns gateway events into [`Invocation`]s for the
//! [`Dispatcher`] and implements [`Transport`] on top of the REST client.
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.1.0
//! - **Toggleable**: false

use std::sync::Arc;

use anyhow::Result;
use log::{debug, error, info, warn};
use serde_json::Value;
use serenity::async_trait;
use serenity::http::Http;
use serenity::model::application::command::CommandOptionType;
use serenity::model::application::interaction::application_command::{
    ApplicationCommandInteraction, CommandDataOption,
};
use serenity::model::application::interaction::{Interaction, InteractionResponseType};
use serenity::model::channel::{GuildChannel, Message, ReactionType};
use serenity::model::gateway::Ready;
use serenity::model::guild::{Guild, Member};
use serenity::model::id::GuildId;
use serenity::model::permissions::Permissions;
use serenity::prelude::*;

use crate::dispatch::{
    ArgValue, DispatchReport, Dispatcher, Invocation, InvocationSource, StructuredInvocation, TextInvocation,
};
use crate::slash::register::{register_global_schemas, register_guild_schemas};
use crate::slash::SlashSchema;
use crate::transport::{Reply, ReplyTarget, Transport};

/// REST-backed [`Transport`].
pub struct SerenityTransport {
    http: Arc<Http>,
    test_guild: Option<GuildId>,
}

impl SerenityTransport {
    pub fn new(token: &str, test_guild_id: Option<u64>) -> Self {
        SerenityTransport {
            http: Arc::new(Http::new(token)),
            test_guild: test_guild_id.map(GuildId),
        }
    }

    /// Interaction endpoints need the application id; it is only known after `ready`.
    pub fn set_application_id(&self, application_id: u64) {
        self.http.set_application_id(application_id);
    }
}

#[async_trait]
impl Transport for SerenityTransport {
    async fn send_reply(&self, target: &ReplyTarget, reply: Reply) -> Result<()> {
        let body = reply.to_json();
        match target {
            ReplyTarget::Channel(channel_id) => {
                self.http.send_message(*channel_id, &body).await?;
            }
            ReplyTarget::Interaction { token, .. } => {
                self.http.edit_original_interaction_response(token, &body).await?;
            }
        }
        Ok(())
    }

    async fn delete_message(&self, channel_id: u64, message_id: u64) -> Result<()> {
        self.http.delete_message(channel_id, message_id).await?;
        Ok(())
    }

    async fn add_reaction(&self, channel_id: u64, message_id: u64, emoji: &str) -> Result<()> {
        let reaction = ReactionType::Unicode(emoji.to_string());
        self.http.create_reaction(channel_id, message_id, &reaction).await?;
        Ok(())
    }

    async fn register_schemas(&self, schemas: &[SlashSchema]) -> Result<()> {
        match self.test_guild {
            Some(guild_id) => register_guild_schemas(&self.http, guild_id, schemas).await,
            None => register_global_schemas(&self.http, schemas).await,
        }
    }
}

/// Converts one leaf interaction option to an argument value.
pub fn option_value(kind: CommandOptionType, value: &Value) -> Option<ArgValue> {
    let snowflake = || value.as_str().and_then(|s| s.parse::<u64>().ok());
    match kind {
        CommandOptionType::String => value.as_str().map(|s| ArgValue::Text(s.to_string())),
        CommandOptionType::Integer => value.as_i64().map(ArgValue::Integer),
        CommandOptionType::Number => value.as_f64().map(ArgValue::Number),
        CommandOptionType::Boolean => value.as_bool().map(ArgValue::Boolean),
        CommandOptionType::User => snowflake().map(ArgValue::User),
        CommandOptionType::Channel => snowflake().map(ArgValue::Channel),
        CommandOptionType::Role => snowflake().map(ArgValue::Role),
        _ => Some(ArgValue::Text(value.as_str().map_or_else(|| value.to_string(), str::to_string))),
    }
}

/// Permissions of `member` in `channel`, with the channel's overwrites applied
/// on top of the member's roles. Empty when they cannot be computed.
pub fn channel_permissions(guild: &Guild, channel: &GuildChannel, member: &Member) -> Permissions {
    guild.user_permissions_in(channel, member).unwrap_or_else(|e| {
        warn!("Could not compute permissions of {} in {}: {}", member.user.id, channel.id, e);
        Permissions::empty()
    })
}

fn is_branch(kind: CommandOptionType) -> bool {
    matches!(kind, CommandOptionType::SubCommand | CommandOptionType::SubCommandGroup)
}

/// Follows subcommand groups and subcommands down to the leaf options.
fn flatten_options(
    name: &str,
    mut options: &[CommandDataOption],
) -> (Vec<String>, Vec<(String, ArgValue)>) {
    let mut path = vec![name.to_string()];
    while let Some(branch) = options.iter().find(|o| is_branch(o.kind)) {
        path.push(branch.name.clone());
        options = &branch.options;
    }

    let values = options
        .iter()
        .filter_map(|option| {
            let value = option.value.as_ref()?;
            match option_value(option.kind, value) {
                Some(value) => Some((option.name.clone(), value)),
                None => {
                    warn!("Dropping malformed value for option `{}`", option.name);
                    None
                }
            }
        })
        .collect();
    (path, values)
}

pub struct Handler {
    dispatcher: Arc<Dispatcher>,
    transport: Arc<SerenityTransport>,
    schemas: Vec<SlashSchema>,
}

impl Handler {
    pub fn new(dispatcher: Arc<Dispatcher>, transport: Arc<SerenityTransport>, schemas: Vec<SlashSchema>) -> Self {
        Handler {
            dispatcher,
            transport,
            schemas,
        }
    }

    fn report(&self, report: DispatchReport) {
        debug!("Invocation finished: {:?}", report.outcome);
        if let Some(e) = report.persistence_error {
            error!("Account changes were not saved: {}", e);
        }
    }

    async fn message_permissions(&self, ctx: &Context, msg: &Message) -> Permissions {
        let Some(guild) = msg.guild(&ctx.cache) else {
            return Permissions::empty();
        };
        let Some(channel) = msg.channel_id.to_channel_cached(&ctx.cache).and_then(|c| c.guild()) else {
            warn!("Channel {} is not cached, treating {} as unprivileged", msg.channel_id, msg.author.id);
            return Permissions::empty();
        };
        let member = match msg.member(ctx).await {
            Ok(member) => member,
            Err(e) => {
                warn!("Could not fetch member {} for permissions: {}", msg.author.id, e);
                return Permissions::empty();
            }
        };
        channel_permissions(&guild, &channel, &member)
    }

    async fn handle_command(&self, ctx: &Context, command: ApplicationCommandInteraction) {
        if let Err(e) = command
            .create_interaction_response(&ctx.http, |response| {
                response.kind(InteractionResponseType::DeferredChannelMessageWithSource)
            })
            .await
        {
            error!("Failed to defer slash command '{}': {}", command.data.name, e);
            return;
        }

        let (path, options) = flatten_options(&command.data.name, &command.data.options);
        let permissions = command
            .member
            .as_ref()
            .and_then(|member| member.permissions)
            .unwrap_or_else(Permissions::empty);

        let invocation = Invocation::Structured(StructuredInvocation {
            source: InvocationSource {
                guild_id: command.guild_id.map(|id| id.0),
                channel_id: command.channel_id.0,
                author_id: command.user.id.0,
                permissions,
                reply_to: ReplyTarget::Interaction {
                    channel_id: command.channel_id.0,
                    token: command.token.clone(),
                },
            },
            path,
            options,
        });
        let report = self.dispatcher.dispatch(invocation).await;
        self.report(report);
    }
}

#[async_trait]
impl EventHandler for Handler {
    async fn message(&self, ctx: Context, msg: Message) {
        if msg.author.bot {
            return;
        }

        let permissions = self.message_permissions(&ctx, &msg).await;
        let invocation = Invocation::FreeText(TextInvocation {
            source: InvocationSource {
                guild_id: msg.guild_id.map(|id| id.0),
                channel_id: msg.channel_id.0,
                author_id: msg.author.id.0,
                permissions,
                reply_to: ReplyTarget::Channel(msg.channel_id.0),
            },
            message_id: msg.id.0,
            content: msg.content.clone(),
        });
        let report = self.dispatcher.dispatch(invocation).await;
        self.report(report);
    }

    async fn ready(&self, _ctx: Context, ready: Ready) {
        info!("{} is connected and ready!", ready.user.name);
        info!("Connected to {} guilds", ready.guilds.len());

        self.transport.set_application_id(ready.application.id.0);
        self.dispatcher.set_bot_user_id(ready.user.id.0);

        if let Err(e) = self.dispatcher.register_schemas(&self.schemas).await {
            error!("Failed to register slash commands: {}", e);
        }
    }

    async fn interaction_create(&self, ctx: Context, interaction: Interaction) {
        match interaction {
            Interaction::ApplicationCommand(command) => self.handle_command(&ctx, command).await,
            other => debug!("Ignoring interaction {:?}", other.kind()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_option_values_by_kind() {
        assert_eq!(
            option_value(CommandOptionType::String, &json!("hi")),
            Some(ArgValue::Text("hi".to_string()))
        );
        assert_eq!(option_value(CommandOptionType::Integer, &json!(4)), Some(ArgValue::Integer(4)));
        assert_eq!(option_value(CommandOptionType::Number, &json!(2.5)), Some(ArgValue::Number(2.5)));
        assert_eq!(option_value(CommandOptionType::Boolean, &json!(true)), Some(ArgValue::Boolean(true)));
        assert_eq!(
            option_value(CommandOptionType::User, &json!("80351110224678912")),
            Some(ArgValue::User(80351110224678912))
        );
        assert_eq!(option_value(CommandOptionType::Role, &json!("x")), None);
        assert_eq!(option_value(CommandOptionType::Integer, &json!("4")), None);
    }

    fn guild() -> Guild {
        serde_json::from_value(json!({
            "id": "1",
            "name": "test",
            "owner_id": "9",
            "afk_timeout": 300,
            "channels": [],
            "default_message_notifications": 0,
            "emojis": [],
            "explicit_content_filter": 0,
            "features": [],
            "joined_at": "2021-01-01T00:00:00Z",
            "large": false,
            "member_count": 1,
            "members": [],
            "mfa_level": 0,
            "presences": [],
            "roles": [
                {"id": "1", "color": 0, "hoist": false, "managed": false, "name": "@everyone",
                 "permissions": "3072", "position": 0},
                {"id": "5", "color": 0, "hoist": false, "managed": false, "name": "mods",
                 "permissions": "2", "position": 1}
            ],
            "verification_level": 0,
            "voice_states": [],
            "preferred_locale": "en-US",
            "nsfw_level": 0,
            "system_channel_flags": 0,
            "stickers": []
        }))
        .unwrap()
    }

    fn channel(id: &str, overwrites: Value) -> GuildChannel {
        serde_json::from_value(json!({
            "id": id,
            "guild_id": "1",
            "type": 0,
            "name": "general",
            "permission_overwrites": overwrites
        }))
        .unwrap()
    }

    fn moderator() -> Member {
        serde_json::from_value(json!({
            "deaf": false,
            "mute": false,
            "guild_id": "1",
            "roles": ["5"],
            "user": {"id": "7", "username": "mod", "discriminator": "0001", "avatar": null}
        }))
        .unwrap()
    }

    #[test]
    fn test_channel_overwrites_limit_role_permissions() {
        let guild = guild();
        let open = channel("20", json!([]));
        let locked = channel("21", json!([{"id": "5", "type": 0, "allow": "0", "deny": "2"}]));

        assert!(channel_permissions(&guild, &open, &moderator()).contains(Permissions::KICK_MEMBERS));
        assert!(!channel_permissions(&guild, &locked, &moderator()).contains(Permissions::KICK_MEMBERS));
        assert!(channel_permissions(&guild, &locked, &moderator()).contains(Permissions::SEND_MESSAGES));
    }

    #[test]
    fn test_unknown_member_role_yields_no_permissions() {
        let mut member = moderator();
        member.roles = vec![serenity::model::id::RoleId(404)];
        assert_eq!(channel_permissions(&guild(), &channel("20", json!([])), &member), Permissions::empty());
    }
}
