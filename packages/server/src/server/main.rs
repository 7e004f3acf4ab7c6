// Main entry point for the supporter sync service

use std::sync::Arc;

use anyhow::{Context, Result};
use discord::{ApplicationCommand, DiscordClient, DiscordOptions};
use sqlx::mysql::MySqlPoolOptions;
use supporter_sync::kernel::{
    start_scheduler, DiscordDirectory, DiscordInteractionResponder, MySqlEntitlementStore,
    ServerDeps, SupporterSettings,
};
use supporter_sync::server::{
    build_app, AppState, InteractionVerifier, SUPPORTER_COMMAND, SUPPORTER_COMMAND_DESCRIPTION,
};
use supporter_sync::Config;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,supporter_sync=debug,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env().context("Failed to load configuration")?;
    tracing::info!(
        app_env = %config.app_env,
        app_component = %config.app_component,
        "Starting supporter sync"
    );

    let verifier = InteractionVerifier::from_hex(&config.discord_public_key)?;

    // Connect to database
    tracing::info!("Connecting to database...");
    let pool = tokio::time::timeout(
        config.readiness_timeout,
        MySqlPoolOptions::new()
            .min_connections(config.database.pool_min_size)
            .max_connections(config.database.pool_max_size)
            .acquire_timeout(config.readiness_timeout)
            .connect_with(config.database.connect_options()?),
    )
    .await
    .context("Timed out connecting to database")?
    .context("Failed to connect to database")?;
    sqlx::query("SELECT 1")
        .execute(&pool)
        .await
        .context("Database is not answering queries")?;
    tracing::info!("Database connected");

    // Check Discord
    let discord = Arc::new(
        DiscordClient::new(DiscordOptions {
            token: config.discord_token.clone(),
            application_id: config.discord_application_id,
        })
        .context("Failed to build Discord client")?,
    );
    let guild = tokio::time::timeout(config.readiness_timeout, discord.get_guild(config.guild_id))
        .await
        .context("Timed out reaching Discord")?
        .context("Failed to fetch guild from Discord")?;
    tracing::info!("Connected to guild {} ({})", guild.name, guild.id);

    discord
        .overwrite_guild_commands(
            config.guild_id,
            &[ApplicationCommand::chat_input(
                SUPPORTER_COMMAND,
                SUPPORTER_COMMAND_DESCRIPTION,
            )],
        )
        .await
        .context("Failed to register slash commands")?;
    tracing::info!("Registered /{} command", SUPPORTER_COMMAND);

    let deps = ServerDeps::new(
        Arc::new(MySqlEntitlementStore::new(pool.clone())),
        Arc::new(DiscordDirectory::new(discord.clone(), config.guild_id)),
        SupporterSettings {
            role_id: config.supporter_role_id,
            audit_channel_id: config.admin_logs_channel_id,
        },
    );

    // Keep the scheduler alive for the lifetime of the process
    let _scheduler = start_scheduler(deps.clone(), config.sync_interval)
        .await
        .context("Failed to start scheduler")?;

    let app = build_app(AppState {
        deps,
        verifier,
        responder: Arc::new(DiscordInteractionResponder::new(discord)),
        db_pool: Some(pool),
    });

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("Listening for interactions on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
