use anyhow::Result;
use log::{error, info};
use serenity::prelude::*;
use std::sync::Arc;

use switchboard::commands::create_module_tree;
use switchboard::config::Config;
use switchboard::database::Database;
use switchboard::dispatch::Dispatcher;
use switchboard::gateway::{Handler, SerenityTransport};
use switchboard::slash::build_schemas;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let config = Config::from_env()?;

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&config.log_level))
        .init();

    info!("Starting switchboard...");

    let tree = Arc::new(create_module_tree());
    info!(
        "Loaded {} modules with {} commands",
        tree.modules().count(),
        tree.commands().count()
    );

    // a conflicting command set must never reach the platform
    let schemas = build_schemas(&tree).map_err(|e| {
        error!("Slash command synthesis failed: {}", e);
        anyhow::anyhow!("Refusing to start with conflicting slash commands: {}", e)
    })?;
    info!("Synthesized {} slash commands", schemas.len());

    let database = Database::new(&config.database_path, &config.default_prefix).await?;
    let transport = Arc::new(SerenityTransport::new(&config.discord_token, config.test_guild_id));
    let dispatcher = Arc::new(Dispatcher::new(
        tree,
        Arc::new(database),
        transport.clone(),
        config.bot_info(),
    ));
    let handler = Handler::new(dispatcher, transport, schemas);

    let intents = GatewayIntents::GUILDS
        | GatewayIntents::GUILD_MESSAGES
        | GatewayIntents::DIRECT_MESSAGES
        | GatewayIntents::MESSAGE_CONTENT;

    let mut client = Client::builder(&config.discord_token, intents)
        .event_handler(handler)
        .await
        .map_err(|e| {
            error!("Failed to create Discord client: {}", e);
            anyhow::anyhow!("Client creation failed: {}", e)
        })?;

    match config.test_guild_id {
        Some(guild_id) => info!("Slash commands will be registered to test guild {}", guild_id),
        None => info!("Slash commands will be registered globally"),
    }
    info!("Connecting to Discord gateway with intents {:?}", intents);

    if let Err(why) = client.start().await {
        error!("Gateway connection failed: {:?}", why);
        return Err(anyhow::anyhow!("Failed to establish gateway connection: {}", why));
    }

    Ok(())
}
