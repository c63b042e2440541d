// Command checks shared by the feature-gated commands.
//
// A failing check replies to the user itself and returns `Ok(false)`, so the
// framework has nothing left to report.

use crate::core::settings::{Feature, GuildSettings};
use crate::discord::{say_ephemeral, Context, Error};
use poise::serenity_prelude as serenity;

async fn load_settings(ctx: Context<'_>) -> Result<Option<GuildSettings>, Error> {
    let Some(guild_id) = ctx.guild_id() else {
        say_ephemeral(ctx, "This command can only be used in a server.").await?;
        return Ok(None);
    };
    Ok(Some(ctx.data().settings.get(guild_id.get()).await?))
}

async fn feature_gate(ctx: Context<'_>, feature: Feature) -> Result<bool, Error> {
    let Some(settings) = load_settings(ctx).await? else {
        return Ok(false);
    };
    if !settings.is_enabled(feature) {
        say_ephemeral(ctx, "❌ This command is disabled on this server.").await?;
        return Ok(false);
    }
    Ok(true)
}

/// `Some(channel)` when commands must be used in `channel` and this is not it.
pub fn command_channel_mismatch(settings: &GuildSettings, channel_id: u64) -> Option<u64> {
    settings
        .command_channel_restriction()
        .filter(|&allowed| allowed != channel_id)
}

async fn command_channel_gate(ctx: Context<'_>) -> Result<bool, Error> {
    let Some(settings) = load_settings(ctx).await? else {
        return Ok(false);
    };
    if let Some(allowed) = command_channel_mismatch(&settings, ctx.channel_id().get()) {
        say_ephemeral(ctx, format!("❌ Use commands in <#{allowed}>")).await?;
        return Ok(false);
    }
    Ok(true)
}

pub async fn moderation_enabled(ctx: Context<'_>) -> Result<bool, Error> {
    feature_gate(ctx, Feature::Moderation).await
}

pub async fn utility_enabled(ctx: Context<'_>) -> Result<bool, Error> {
    feature_gate(ctx, Feature::Utility).await
}

pub async fn leveling_enabled(ctx: Context<'_>) -> Result<bool, Error> {
    Ok(feature_gate(ctx, Feature::Leveling).await? && command_channel_gate(ctx).await?)
}

pub async fn fun_enabled(ctx: Context<'_>) -> Result<bool, Error> {
    Ok(feature_gate(ctx, Feature::Fun).await? && command_channel_gate(ctx).await?)
}

pub async fn is_bot_owner(ctx: Context<'_>) -> Result<bool, Error> {
    match ctx.data().owner_id {
        None => {
            say_ephemeral(ctx, "No bot owner set in the `.env` file!").await?;
            Ok(false)
        }
        Some(owner) if owner != ctx.author().id.get() => {
            say_ephemeral(ctx, "Only the bot owner can set the bot's global status!").await?;
            Ok(false)
        }
        Some(_) => Ok(true),
    }
}

/// Whether `user_id` can moderate members in this guild. Moderators may not
/// act on each other through the bot.
pub async fn is_moderator(ctx: Context<'_>, user_id: serenity::UserId) -> bool {
    let Some(guild_id) = ctx.guild_id() else {
        return false;
    };
    let Ok(member) = guild_id.member(ctx, user_id).await else {
        // Not a member (e.g. already left), so no permissions here.
        return false;
    };
    ctx.guild()
        .map(|guild| guild.member_permissions(&member).moderate_members())
        .unwrap_or(false)
}
