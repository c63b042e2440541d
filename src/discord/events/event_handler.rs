// Gateway events that are not slash commands.

use crate::core::leveling::LevelingError;
use crate::discord::leveling_announcements::announce_level_up;
use crate::discord::modlog;
use crate::discord::snippet_responder::respond_to_message;
use crate::discord::{Data, Error};
use poise::serenity_prelude as serenity;

/// Event handler for non-command Discord events.
pub async fn event_handler(
    ctx: &serenity::Context,
    event: &serenity::FullEvent,
    _framework: poise::FrameworkContext<'_, Data, Error>,
    data: &Data,
) -> Result<(), Error> {
    match event {
        serenity::FullEvent::Message { new_message } => {
            handle_message(ctx, new_message, data).await;
        }
        serenity::FullEvent::GuildBanAddition {
            guild_id,
            banned_user,
        } => {
            modlog::handle_ban_addition(&ctx.http, data, *guild_id, banned_user).await;
        }
        serenity::FullEvent::GuildBanRemoval {
            guild_id,
            unbanned_user,
        } => {
            modlog::handle_ban_removal(&ctx.http, data, *guild_id, unbanned_user).await;
        }
        _ => {}
    }

    Ok(())
}

async fn handle_message(ctx: &serenity::Context, message: &serenity::Message, data: &Data) {
    // Ignore bot messages (including our own) and DMs
    if message.author.bot {
        return;
    }
    let Some(guild_id) = message.guild_id.map(|id| id.get()) else {
        return;
    };

    let settings = match data.settings.get(guild_id).await {
        Ok(settings) => settings,
        Err(e) => {
            tracing::error!(guild_id, "Failed to load guild settings: {e}");
            return;
        }
    };

    if settings.utility {
        if let Err(e) = respond_to_message(ctx, message, data, guild_id).await {
            tracing::error!(guild_id, "Error answering snippets: {e}");
        }
    }

    if !settings.earns_xp_in(message.channel_id.get()) {
        return;
    }

    match data
        .leveling
        .award_message_xp(message.author.id.get(), guild_id)
        .await
    {
        Ok(award) => {
            if let Some(level_up) = award.level_up() {
                tracing::info!(
                    user_id = level_up.user_id,
                    guild_id = level_up.guild_id,
                    old_level = level_up.old_level,
                    new_level = level_up.new_level,
                    total_xp = level_up.total_xp,
                    "User leveled up"
                );

                if let Err(e) = announce_level_up(ctx, message, data, &level_up).await {
                    tracing::warn!("Failed to announce level-up: {e}");
                }
            }
        }
        Err(LevelingError::StorageUnavailable(e)) => {
            tracing::error!(guild_id, "Error processing XP for message: {e}");
        }
        Err(e) => tracing::warn!(guild_id, "XP award rejected: {e}"),
    }
}
