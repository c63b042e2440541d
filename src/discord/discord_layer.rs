// Discord layer - commands, gateway events and everything that talks to the
// Discord API. Core services receive primitive ids only.

use std::sync::Arc;
use std::time::Instant;

use crate::core::cooldown::CooldownTracker;
use crate::core::leveling::LevelingService;
use crate::core::moderation::ModerationService;
use crate::core::modlog::ModlogService;
use crate::core::settings::SettingsService;
use crate::core::snippets::{PasteFetcher, SnippetService};
use crate::infra::leveling::SqliteProgressionStore;
use crate::infra::moderation::SqliteModerationStore;
use crate::infra::settings::SqliteSettingsStore;
use crate::infra::snippets::SqliteSnippetStore;

#[path = "commands/command_catalog.rs"]
pub mod commands;

#[path = "commands/checks.rs"]
pub mod checks;

#[path = "leveling/leveling_announcements.rs"]
pub mod leveling_announcements;

#[path = "modlog/modlog_formatter.rs"]
pub mod modlog;

#[path = "snippets/snippet_responder.rs"]
pub mod snippet_responder;

#[path = "events/event_handler.rs"]
pub mod events;

#[path = "tasks/ban_sweeper.rs"]
pub mod tasks;

// User data, which is stored and accessible in all command invocations.
// Every field is shared, so cloning hands background tasks the same services.
#[derive(Clone)]
pub struct Data {
    pub leveling: Arc<LevelingService<SqliteProgressionStore>>,
    pub settings: Arc<SettingsService<SqliteSettingsStore>>,
    pub moderation: Arc<ModerationService<SqliteModerationStore>>,
    pub snippets: Arc<SnippetService<SqliteSnippetStore>>,
    pub modlog: Arc<ModlogService>,
    pub pastes: Arc<dyn PasteFetcher>,
    /// Per-user cooldown for `/longcat`.
    pub fun_cooldowns: Arc<CooldownTracker<u64>>,
    pub owner_id: Option<u64>,
    pub started_at: Instant,
}

pub type Error = Box<dyn std::error::Error + Send + Sync>;
pub type Context<'a> = poise::Context<'a, Data, Error>;

/// Reply visible only to the invoking user.
pub async fn say_ephemeral(ctx: Context<'_>, content: impl Into<String>) -> Result<(), Error> {
    ctx.send(
        poise::CreateReply::default()
            .content(content)
            .ephemeral(true),
    )
    .await?;
    Ok(())
}

/// The guild a `guild_only` command runs in.
pub fn guild_of(ctx: Context<'_>) -> Result<u64, Error> {
    Ok(ctx
        .guild_id()
        .ok_or("This command can only be used in a server.")?
        .get())
}
