// This is the entry point of the Discord bot.
//
// **Architecture Overview:**
// - `core/` = Business logic (platform-agnostic)
// - `infra/` = Implementations of core traits (databases, APIs)
// - `discord/` = Discord-specific adapters (commands, events)
//
// This file's job is to:
// 1. Load configuration
// 2. Initialize services (dependency injection)
// 3. Set up the Discord framework
// 4. Register commands and event handlers

// These attrs point each module declaration at a more descriptive root file
// so we don't end up with half a dozen mod.rs files that all look the same.
#[path = "core/core_layer.rs"]
mod core;
#[path = "discord/discord_layer.rs"]
mod discord;
#[path = "infra/infra_layer.rs"]
mod infra;

mod config;

use std::sync::Arc;
use std::time::Instant;

use anyhow::Context as _;

use crate::config::BotConfig;
use crate::core::cooldown::CooldownTracker;
use crate::core::leveling::{LevelCurve, LevelingService};
use crate::core::moderation::ModerationService;
use crate::core::modlog::ModlogService;
use crate::core::settings::SettingsService;
use crate::core::snippets::SnippetService;
use crate::discord::commands::presence;
use crate::discord::{Data, Error};
use crate::infra::database::{self, database_path};
use crate::infra::leveling::SqliteProgressionStore;
use crate::infra::moderation::SqliteModerationStore;
use crate::infra::paste::HastebinClient;
use crate::infra::settings::SqliteSettingsStore;
use crate::infra::snippets::SqliteSnippetStore;
use poise::serenity_prelude as serenity;

const LONGCAT_COOLDOWN: std::time::Duration = std::time::Duration::from_secs(60);

async fn on_error(error: poise::FrameworkError<'_, Data, Error>) {
    match error {
        poise::FrameworkError::Command { error, ctx, .. } => {
            tracing::error!(
                command = %ctx.command().qualified_name,
                "Command failed: {error}"
            );
            let reply = poise::CreateReply::default()
                .content("There was an error while running this command.")
                .ephemeral(true);
            if let Err(e) = ctx.send(reply).await {
                tracing::warn!("Failed to report command error: {e}");
            }
        }
        other => {
            if let Err(e) = poise::builtins::on_error(other).await {
                tracing::error!("Error while handling error: {e}");
            }
        }
    }
}

/// Open the database, run every store's migrations and wire the services.
async fn build_data(config: &BotConfig) -> anyhow::Result<Data> {
    let pool = database::connect(&database_path(&config.data_dir)).await?;

    let progression_store = SqliteProgressionStore::new(pool.clone());
    progression_store
        .migrate()
        .await
        .context("migrating leveling tables")?;
    let settings_store = SqliteSettingsStore::new(pool.clone());
    settings_store
        .migrate()
        .await
        .context("migrating settings tables")?;
    let moderation_store = SqliteModerationStore::new(pool.clone());
    moderation_store
        .migrate()
        .await
        .context("migrating moderation tables")?;
    let snippet_store = SqliteSnippetStore::new(pool);
    snippet_store
        .migrate()
        .await
        .context("migrating snippet tables")?;

    let pastes = HastebinClient::new().context("building paste client")?;

    Ok(Data {
        leveling: Arc::new(LevelingService::with_settings(
            progression_store,
            config.xp_per_message,
            config.xp_cooldown,
            LevelCurve::default(),
        )),
        settings: Arc::new(SettingsService::new(settings_store)),
        moderation: Arc::new(ModerationService::new(
            moderation_store,
            config.duration_aliases,
        )),
        snippets: Arc::new(SnippetService::new(snippet_store)),
        modlog: Arc::new(ModlogService::default()),
        pastes: Arc::new(pastes),
        fun_cooldowns: Arc::new(CooldownTracker::new(LONGCAT_COOLDOWN)),
        owner_id: config.owner_id,
        started_at: Instant::now(),
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging so we can see what's happening
    tracing_subscriber::fmt::init();

    // Load environment variables from .env file (if it exists)
    dotenv::dotenv().ok();

    let config = BotConfig::from_env()?;

    // ========================================================================
    // DEPENDENCY INJECTION
    // ========================================================================
    // This is the "composition root" where we wire everything together.
    let data = build_data(&config).await?;

    // ========================================================================
    // DISCORD FRAMEWORK SETUP
    // ========================================================================

    let intents = serenity::GatewayIntents::GUILD_MESSAGES
        | serenity::GatewayIntents::MESSAGE_CONTENT // Required for snippets and triggers
        | serenity::GatewayIntents::GUILD_MESSAGE_REACTIONS
        | serenity::GatewayIntents::GUILD_MODERATION // Ban and unban events for the modlog
        | serenity::GatewayIntents::GUILDS
        | serenity::GatewayIntents::GUILD_MEMBERS;

    let dev_guild_id = config.dev_guild_id;

    let framework = poise::Framework::builder()
        .options(poise::FrameworkOptions {
            commands: discord::commands::all(),
            event_handler: |ctx, event, framework, data| {
                Box::pin(discord::events::event_handler(ctx, event, framework, data))
            },
            on_error: |error| Box::pin(on_error(error)),
            ..Default::default()
        })
        .setup(move |ctx, ready, framework| {
            Box::pin(async move {
                tracing::info!("🤖 Bot is starting up as {}", ready.user.tag());

                match dev_guild_id {
                    // Guild commands update instantly, global ones can take up to an hour
                    Some(guild_id) => {
                        poise::builtins::register_in_guild(
                            ctx,
                            &framework.options().commands,
                            serenity::GuildId::new(guild_id),
                        )
                        .await?;
                    }
                    None => {
                        poise::builtins::register_globally(ctx, &framework.options().commands)
                            .await?;
                    }
                }
                tracing::info!("✅ Commands registered!");

                presence::on_ready(ctx);
                discord::tasks::spawn(ctx.http.clone(), ready.user.tag(), data.clone());

                tracing::info!("🚀 Bot is ready!");
                Ok(data)
            })
        })
        .build();

    let mut client = serenity::ClientBuilder::new(&config.token, intents)
        .framework(framework)
        .await
        .context("creating Discord client")?;

    client.start().await.context("running bot")?;
    Ok(())
}
