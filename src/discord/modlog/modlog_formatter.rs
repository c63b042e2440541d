// Moderation log embeds and delivery.

use crate::core::modlog::{ActionOrigin, ModAction, ModlogEntry};
use crate::discord::Data;
use poise::serenity_prelude::{self as serenity, CreateEmbed, CreateEmbedFooter, CreateMessage};
use std::time::Instant;

pub fn format_modlog_entry(entry: &ModlogEntry) -> CreateEmbed {
    let mut embed = CreateEmbed::default()
        .description(entry.summary())
        .color(serenity::Colour::new(entry.action.color()))
        .field("Reason", entry.reason_or_default(), false)
        .footer(CreateEmbedFooter::new(entry.action.footer()))
        .timestamp(serenity::Timestamp::now());

    if let Some(duration) = &entry.duration {
        embed = embed.field("Duration", duration, true);
    }

    embed
}

/// Post `entry` to the guild's modlog channel if the guild logs this kind of
/// action. Delivery failures are logged, never returned.
pub async fn post_modlog(
    http: &serenity::Http,
    data: &Data,
    guild_id: u64,
    origin: ActionOrigin,
    entry: ModlogEntry,
) {
    let settings = match data.settings.get(guild_id).await {
        Ok(settings) => settings,
        Err(e) => {
            tracing::error!(guild_id, "Failed to load settings for modlog: {e}");
            return;
        }
    };

    let Some(channel_id) = data.modlog.target_channel(&settings, origin) else {
        return;
    };

    if let Err(e) = serenity::ChannelId::new(channel_id)
        .send_message(http, CreateMessage::new().embed(format_modlog_entry(&entry)))
        .await
    {
        tracing::warn!(guild_id, channel_id, "Failed to send modlog embed: {e}");
    }
}

/// Log a ban seen on the gateway unless the bot itself just performed it.
pub async fn handle_ban_addition(
    http: &serenity::Http,
    data: &Data,
    guild_id: serenity::GuildId,
    user: &serenity::User,
) {
    external_action(http, data, guild_id, user, ModAction::Ban).await;
}

pub async fn handle_ban_removal(
    http: &serenity::Http,
    data: &Data,
    guild_id: serenity::GuildId,
    user: &serenity::User,
) {
    external_action(http, data, guild_id, user, ModAction::Unban).await;
}

async fn external_action(
    http: &serenity::Http,
    data: &Data,
    guild_id: serenity::GuildId,
    user: &serenity::User,
    action: ModAction,
) {
    let guild_id = guild_id.get();
    if data
        .modlog
        .take_bot_action(guild_id, user.id.get(), action, Instant::now())
    {
        return;
    }

    // Gateway ban events do not say who acted or why.
    let entry = ModlogEntry {
        action,
        moderator: None,
        target: user.tag(),
        reason: None,
        duration: None,
    };
    post_modlog(http, data, guild_id, ActionOrigin::External, entry).await;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embeds_carry_reason_and_duration() {
        let entry = ModlogEntry {
            action: ModAction::Timeout,
            moderator: Some("mod#0001".into()),
            target: "user#0002".into(),
            reason: None,
            duration: Some("10 minutes".into()),
        };
        let json = serde_json::to_value(format_modlog_entry(&entry)).unwrap();

        assert_eq!(json["color"], 0xff6666);
        assert_eq!(json["footer"]["text"], "Timeout Action");
        assert_eq!(json["fields"][0]["name"], "Reason");
        assert_eq!(json["fields"][0]["value"], "No reason provided");
        assert_eq!(json["fields"][1]["value"], "10 minutes");
        assert!(json["description"]
            .as_str()
            .unwrap()
            .contains("**mod#0001** timed out **user#0002**"));
    }
}
