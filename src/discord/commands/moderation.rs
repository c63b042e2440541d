// Moderation slash commands.
//
// The core validates lengths, builds audit-log reasons and keeps the warning
// and temp-ban records; this file performs the Discord calls and reports.

use std::time::Instant;

use crate::core::moderation::{
    audit_reason, ban_audit_reason, BanLength, ModerationError, WarningPage,
};
use crate::core::modlog::{ActionOrigin, ModAction, ModlogEntry};
use crate::discord::checks::{is_moderator, moderation_enabled};
use crate::discord::modlog::post_modlog;
use crate::discord::{guild_of, say_ephemeral, Context, Error};
use poise::serenity_prelude as serenity;

const INVALID_DURATION: &str = "Invalid duration format. Use `10s`, `5m`, `1h`, `1w max`.";

/// Reply with a user-facing moderation error, propagate storage failures.
async fn report(ctx: Context<'_>, error: ModerationError) -> Result<(), Error> {
    match error {
        ModerationError::StorageError(_) => Err(error.into()),
        ModerationError::InvalidDuration(_) => say_ephemeral(ctx, INVALID_DURATION).await,
        other => say_ephemeral(ctx, other.to_string()).await,
    }
}

async fn log_action(
    ctx: Context<'_>,
    guild_id: u64,
    action: ModAction,
    target: &serenity::User,
    reason: Option<String>,
    duration: Option<String>,
) {
    let entry = ModlogEntry {
        action,
        moderator: Some(ctx.author().tag()),
        target: target.tag(),
        reason,
        duration,
    };
    post_modlog(ctx.http(), ctx.data(), guild_id, ActionOrigin::Bot, entry).await;
}

/// DM the target before acting. A closed DM inbox is not an error.
async fn notify_target(ctx: Context<'_>, target: &serenity::User, text: String) {
    if let Err(e) = target
        .direct_message(ctx.serenity_context(), serenity::CreateMessage::new().content(text))
        .await
    {
        tracing::debug!(user_id = target.id.get(), "Could not DM moderation target: {e}");
    }
}

fn guild_name(ctx: Context<'_>) -> String {
    ctx.guild()
        .map(|g| g.name.clone())
        .unwrap_or_else(|| "this server".to_string())
}

fn quoted_reason(reason: Option<&str>) -> String {
    let reason = reason
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .unwrap_or(crate::core::moderation::DEFAULT_REASON);
    format!("-# **Reason:**\n`{reason}`")
}

/// Ban a member, optionally for a limited time.
#[poise::command(
    slash_command,
    guild_only,
    check = "moderation_enabled",
    default_member_permissions = "BAN_MEMBERS",
    required_permissions = "MODERATE_MEMBERS",
    required_bot_permissions = "BAN_MEMBERS"
)]
pub async fn ban(
    ctx: Context<'_>,
    #[description = "The member to ban"] target: serenity::User,
    #[description = "Ban duration (e.g. 1d 12h), permanent if empty"] duration: Option<String>,
    #[description = "Reason for the ban"] reason: Option<String>,
) -> Result<(), Error> {
    let guild_id = guild_of(ctx)?;

    if is_moderator(ctx, target.id).await {
        return say_ephemeral(ctx, "You cannot ban another moderator.").await;
    }

    let length = match ctx.data().moderation.ban_length(duration.as_deref()) {
        Ok(length) => length,
        Err(e) => return report(ctx, e).await,
    };

    let audit = ban_audit_reason(&ctx.author().tag(), &length, reason.as_deref());
    ctx.data()
        .modlog
        .mark_bot_action(guild_id, target.id.get(), ModAction::Ban, Instant::now());

    if let Err(e) = serenity::GuildId::new(guild_id)
        .ban_with_reason(ctx.http(), target.id, 0, &audit)
        .await
    {
        tracing::warn!(guild_id, user_id = target.id.get(), "Ban failed: {e}");
        return say_ephemeral(ctx, "There was an error trying to ban this member.").await;
    }

    let bookkeeping = match length.expires_at(chrono::Utc::now()) {
        Some(until) => {
            ctx.data()
                .moderation
                .record_temp_ban(guild_id, target.id.get(), until)
                .await
        }
        // A permanent ban replaces any pending automatic unban.
        None => ctx
            .data()
            .moderation
            .clear_temp_ban(guild_id, target.id.get())
            .await
            .map(|_| ()),
    };
    if let Err(e) = bookkeeping {
        tracing::error!(guild_id, "Failed to store ban expiry: {e}");
    }

    let reply = match length {
        BanLength::Permanent => format!("🔨 Banned `{}` permanently", target.tag()),
        BanLength::Temporary(_) => format!("🔨 Banned `{}` for `{}`", target.tag(), length.describe()),
    };
    say_ephemeral(ctx, reply).await?;

    log_action(
        ctx,
        guild_id,
        ModAction::Ban,
        &target,
        reason,
        Some(length.describe()),
    )
    .await;
    Ok(())
}

/// HTTP status of a failed Discord request, if it got that far.
pub fn http_status(error: &serenity::Error) -> Option<u16> {
    match error {
        serenity::Error::Http(serenity::HttpError::UnsuccessfulRequest(response)) => {
            Some(response.status_code.as_u16())
        }
        _ => None,
    }
}

fn is_unknown_ban(error: &serenity::Error) -> bool {
    http_status(error) == Some(404)
}

/// Unban a user.
#[poise::command(
    slash_command,
    guild_only,
    check = "moderation_enabled",
    default_member_permissions = "BAN_MEMBERS",
    required_permissions = "MODERATE_MEMBERS",
    required_bot_permissions = "BAN_MEMBERS"
)]
pub async fn unban(
    ctx: Context<'_>,
    #[description = "The user to unban"] target: serenity::User,
    #[description = "Reason for the unban"] reason: Option<String>,
) -> Result<(), Error> {
    let guild_id = guild_of(ctx)?;
    let audit = audit_reason(&ctx.author().tag(), reason.as_deref());

    ctx.data()
        .modlog
        .mark_bot_action(guild_id, target.id.get(), ModAction::Unban, Instant::now());

    match ctx
        .http()
        .remove_ban(serenity::GuildId::new(guild_id), target.id, Some(audit.as_str()))
        .await
    {
        Ok(()) => {}
        Err(e) if is_unknown_ban(&e) => {
            ctx.data()
                .modlog
                .take_bot_action(guild_id, target.id.get(), ModAction::Unban, Instant::now());
            return say_ephemeral(ctx, format!("User <@{}> is not banned.", target.id)).await;
        }
        Err(e) => {
            tracing::warn!(guild_id, user_id = target.id.get(), "Unban failed: {e}");
            return say_ephemeral(ctx, "There was an error trying to unban this user.").await;
        }
    }

    ctx.data()
        .moderation
        .clear_temp_ban(guild_id, target.id.get())
        .await?;

    say_ephemeral(ctx, format!("🔓 Unbanned user <@{}>.", target.id)).await?;
    log_action(ctx, guild_id, ModAction::Unban, &target, reason, None).await;
    Ok(())
}

/// Kick a member from the server.
#[poise::command(
    slash_command,
    guild_only,
    check = "moderation_enabled",
    default_member_permissions = "KICK_MEMBERS",
    required_permissions = "MODERATE_MEMBERS",
    required_bot_permissions = "KICK_MEMBERS"
)]
pub async fn kick(
    ctx: Context<'_>,
    #[description = "The member to kick"] target: serenity::User,
    #[description = "Reason for the kick"] reason: Option<String>,
) -> Result<(), Error> {
    let guild_id = guild_of(ctx)?;

    if is_moderator(ctx, target.id).await {
        return say_ephemeral(ctx, "You cannot kick another moderator.").await;
    }

    notify_target(
        ctx,
        &target,
        format!(
            "👢 **You were kicked from {}**\n{}",
            guild_name(ctx),
            quoted_reason(reason.as_deref())
        ),
    )
    .await;

    let audit = audit_reason(&ctx.author().tag(), reason.as_deref());
    if let Err(e) = serenity::GuildId::new(guild_id)
        .kick_with_reason(ctx.http(), target.id, &audit)
        .await
    {
        tracing::warn!(guild_id, user_id = target.id.get(), "Kick failed: {e}");
        return say_ephemeral(ctx, "There was an error trying to kick this member.").await;
    }

    say_ephemeral(ctx, format!("👢 Kicked `{}`", target.tag())).await?;
    log_action(ctx, guild_id, ModAction::Kick, &target, reason, None).await;
    Ok(())
}

/// Time out members or lift their timeout.
#[poise::command(
    slash_command,
    guild_only,
    subcommands("timeout_add", "timeout_remove"),
    subcommand_required,
    default_member_permissions = "MODERATE_MEMBERS"
)]
pub async fn timeout(_ctx: Context<'_>) -> Result<(), Error> {
    Ok(())
}

/// Time out a member (max 4 weeks).
#[poise::command(
    slash_command,
    guild_only,
    rename = "add",
    check = "moderation_enabled",
    required_permissions = "MODERATE_MEMBERS",
    required_bot_permissions = "MODERATE_MEMBERS"
)]
pub async fn timeout_add(
    ctx: Context<'_>,
    #[description = "The member to timeout"] target: serenity::User,
    #[description = "Timeout duration (max 4 weeks)"] duration: String,
    #[description = "Reason for the timeout"] reason: Option<String>,
) -> Result<(), Error> {
    let guild_id = guild_of(ctx)?;

    if is_moderator(ctx, target.id).await {
        return say_ephemeral(ctx, "You cannot timeout another moderator.").await;
    }

    let length = match ctx.data().moderation.timeout_length(&duration) {
        Ok(length) => length,
        Err(e) => return report(ctx, e).await,
    };

    let until = length.until(chrono::Utc::now());
    let until = serenity::Timestamp::from_unix_timestamp(until.timestamp())
        .map_err(|e| format!("Invalid timeout end: {e}"))?;
    let audit = audit_reason(&ctx.author().tag(), reason.as_deref());

    let edit = serenity::EditMember::new()
        .disable_communication_until_datetime(until)
        .audit_log_reason(&audit);
    if let Err(e) = serenity::GuildId::new(guild_id)
        .edit_member(ctx.http(), target.id, edit)
        .await
    {
        tracing::warn!(guild_id, user_id = target.id.get(), "Timeout failed: {e}");
        return say_ephemeral(ctx, "There was an error trying to timeout this member.").await;
    }

    say_ephemeral(
        ctx,
        format!("⏳ Timed out `{}` for `{}`", target.tag(), length.describe()),
    )
    .await?;
    log_action(
        ctx,
        guild_id,
        ModAction::Timeout,
        &target,
        reason,
        Some(length.describe()),
    )
    .await;
    Ok(())
}

/// Remove the timeout of a member.
#[poise::command(
    slash_command,
    guild_only,
    rename = "remove",
    check = "moderation_enabled",
    required_permissions = "MODERATE_MEMBERS",
    required_bot_permissions = "MODERATE_MEMBERS"
)]
pub async fn timeout_remove(
    ctx: Context<'_>,
    #[description = "The member to remove the timeout from"] target: serenity::User,
    #[description = "Reason for removing the timeout"] reason: Option<String>,
) -> Result<(), Error> {
    let guild_id = guild_of(ctx)?;
    let audit = audit_reason(&ctx.author().tag(), reason.as_deref());

    let edit = serenity::EditMember::new()
        .enable_communication()
        .audit_log_reason(&audit);
    if let Err(e) = serenity::GuildId::new(guild_id)
        .edit_member(ctx.http(), target.id, edit)
        .await
    {
        tracing::warn!(guild_id, user_id = target.id.get(), "Timeout removal failed: {e}");
        return say_ephemeral(ctx, "There was an error trying to remove this timeout.").await;
    }

    say_ephemeral(ctx, format!("⏳ Removed the timeout of `{}`", target.tag())).await?;
    log_action(ctx, guild_id, ModAction::TimeoutRemoved, &target, reason, None).await;
    Ok(())
}

/// Warn a member.
#[poise::command(
    slash_command,
    guild_only,
    check = "moderation_enabled",
    default_member_permissions = "MODERATE_MEMBERS",
    required_permissions = "MODERATE_MEMBERS"
)]
pub async fn warn(
    ctx: Context<'_>,
    #[description = "The member to warn"] target: serenity::User,
    #[description = "Reason for the warning"] reason: String,
) -> Result<(), Error> {
    let guild_id = guild_of(ctx)?;

    if is_moderator(ctx, target.id).await {
        return say_ephemeral(ctx, "You cannot warn another moderator.").await;
    }

    notify_target(
        ctx,
        &target,
        format!(
            "⚠️ **You were warned on {}**\n{}",
            guild_name(ctx),
            quoted_reason(Some(&reason))
        ),
    )
    .await;

    ctx.data()
        .moderation
        .add_warning(guild_id, target.id.get(), ctx.author().id.get(), &reason)
        .await?;

    say_ephemeral(ctx, format!("⚠️ Warned `{}`", target.tag())).await?;
    log_action(ctx, guild_id, ModAction::Warn, &target, Some(reason), None).await;
    Ok(())
}

pub fn warnings_embed(
    target_tag: &str,
    requester_tag: &str,
    page: &WarningPage,
    moderator_name: impl Fn(u64) -> String,
) -> serenity::CreateEmbed {
    let fields = page.warnings.iter().map(|warning| {
        (
            format!("Reason: `{}`", warning.reason),
            format!(
                "-# 📛 Moderator: **{}**\n-# 📝 <t:{}>",
                moderator_name(warning.moderator_id),
                warning.created_at.timestamp()
            ),
            false,
        )
    });

    serenity::CreateEmbed::new()
        .title(format!("⚠️ Warnings for **{target_tag}**"))
        .color(serenity::Colour::new(ModAction::Warn.color()))
        .fields(fields)
        .footer(serenity::CreateEmbedFooter::new(format!(
            "Page {} out of {} • Requested by {}",
            page.page, page.total_pages, requester_tag
        )))
}

/// List a member's warnings.
#[poise::command(
    slash_command,
    guild_only,
    check = "moderation_enabled",
    default_member_permissions = "MODERATE_MEMBERS",
    required_permissions = "MODERATE_MEMBERS"
)]
pub async fn warnings(
    ctx: Context<'_>,
    #[description = "The member to list warnings for"] target: serenity::User,
    #[description = "Page number"]
    #[min = 1]
    page: Option<u32>,
) -> Result<(), Error> {
    let guild_id = guild_of(ctx)?;
    let page = page.unwrap_or(1) as usize;

    let page = match ctx
        .data()
        .moderation
        .warnings_page(guild_id, target.id.get(), page)
        .await
    {
        Ok(page) => page,
        Err(e) => return report(ctx, e).await,
    };

    if page.is_empty() {
        return say_ephemeral(ctx, "No warnings found for this member.").await;
    }

    let cache = ctx.cache();
    let embed = warnings_embed(&target.tag(), &ctx.author().tag(), &page, |id| {
        cache
            .user(serenity::UserId::new(id))
            .map(|u| u.tag())
            .unwrap_or_else(|| id.to_string())
    });

    ctx.send(poise::CreateReply::default().embed(embed).ephemeral(true))
        .await?;
    Ok(())
}
