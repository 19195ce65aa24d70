//! Converts synthesized schemas into serenity builders and registers them.

use std::sync::Arc;

use anyhow::Result;
use log::info;
use serenity::builder::{CreateApplicationCommand, CreateApplicationCommandOption};
use serenity::http::Http;
use serenity::model::application::command::{Command, CommandOptionType};
use serenity::model::id::GuildId;

use super::{OptionKind, SchemaOption, SlashSchema};

impl From<OptionKind> for CommandOptionType {
    fn from(kind: OptionKind) -> Self {
        match kind {
            OptionKind::String => CommandOptionType::String,
            OptionKind::Integer => CommandOptionType::Integer,
            OptionKind::Number => CommandOptionType::Number,
            OptionKind::Boolean => CommandOptionType::Boolean,
            OptionKind::User => CommandOptionType::User,
            OptionKind::Channel => CommandOptionType::Channel,
            OptionKind::Role => CommandOptionType::Role,
        }
    }
}

/// Creates the application command definition for one schema
pub fn create_application_command(schema: &SlashSchema) -> CreateApplicationCommand {
    let mut command = CreateApplicationCommand::default();
    command.name(&schema.name).description(&schema.description);
    for option in &schema.options {
        command.create_option(|builder| fill_option(builder, option));
    }
    command
}

fn fill_option<'a>(
    builder: &'a mut CreateApplicationCommandOption,
    option: &SchemaOption,
) -> &'a mut CreateApplicationCommandOption {
    match option {
        SchemaOption::SubCommandGroup { name, description, options } => {
            builder
                .name(name)
                .description(description)
                .kind(CommandOptionType::SubCommandGroup);
            for child in options {
                builder.create_sub_option(|sub| fill_option(sub, child));
            }
            builder
        }
        SchemaOption::SubCommand { name, description, options } => {
            builder
                .name(name)
                .description(description)
                .kind(CommandOptionType::SubCommand);
            for child in options {
                builder.create_sub_option(|sub| fill_option(sub, child));
            }
            builder
        }
        SchemaOption::Parameter(parameter) => builder
            .name(&parameter.name)
            .description(&parameter.description)
            .kind(parameter.kind.into())
            .required(parameter.required),
    }
}

/// Bulk-overwrites the global application commands with `schemas`
pub async fn register_global_schemas(http: &Arc<Http>, schemas: &[SlashSchema]) -> Result<()> {
    Command::set_global_application_commands(http, |commands| {
        for schema in schemas {
            commands.add_application_command(create_application_command(schema));
        }
        commands
    })
    .await?;

    info!("Registered {} slash commands globally", schemas.len());
    Ok(())
}

/// Bulk-overwrites the commands of a single guild (faster to propagate while testing)
pub async fn register_guild_schemas(http: &Arc<Http>, guild_id: GuildId, schemas: &[SlashSchema]) -> Result<()> {
    guild_id
        .set_application_commands(http, |commands| {
            for schema in schemas {
                commands.add_application_command(create_application_command(schema));
            }
            commands
        })
        .await?;

    info!("Registered {} slash commands for guild: {}", schemas.len(), guild_id);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::slash::ParameterOption;
    use serde_json::Value;

    #[test]
    fn test_create_application_command_nests_options() {
        let schema = SlashSchema {
            name: "admin".to_string(),
            description: "Administration".to_string(),
            options: vec![SchemaOption::SubCommandGroup {
                name: "role".to_string(),
                description: "Roles".to_string(),
                options: vec![SchemaOption::SubCommand {
                    name: "add".to_string(),
                    description: "Add".to_string(),
                    options: vec![SchemaOption::Parameter(ParameterOption {
                        name: "role".to_string(),
                        kind: OptionKind::Role,
                        description: "Role".to_string(),
                        required: true,
                    })],
                }],
            }],
        };

        let command = create_application_command(&schema);
        assert_eq!(command.0.get("name").and_then(Value::as_str), Some("admin"));

        let options = command.0.get("options").and_then(Value::as_array).unwrap();
        assert_eq!(options.len(), 1);
        assert_eq!(options[0]["name"], "role");
        // SUB_COMMAND_GROUP
        assert_eq!(options[0]["type"], 2);

        let leaf = &options[0]["options"][0]["options"][0];
        assert_eq!(leaf["name"], "role");
        assert_eq!(leaf["required"], true);
        // ROLE
        assert_eq!(leaf["type"], 8);
    }
}
