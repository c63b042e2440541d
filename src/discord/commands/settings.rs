// Guild configuration commands: feature flags and bot channels.

use crate::core::settings::{ChannelKind, Feature, GuildSettings, Toggle};
use crate::discord::{guild_of, say_ephemeral, Context, Error};
use poise::serenity_prelude as serenity;

#[derive(Debug, Clone, Copy, poise::ChoiceParameter)]
pub enum FeatureChoice {
    #[name = "Restrict bot commands to cmd channel"]
    RestrictCommands,
    #[name = "Logging"]
    Logging,
    #[name = "Only log moderation actions made through the bot"]
    BotOnlyLogging,
    #[name = "Moderation Commands"]
    Moderation,
    #[name = "Utility Commands"]
    Utility,
    #[name = "Fun Commands"]
    Fun,
    #[name = "Leveling System"]
    Leveling,
}

impl From<FeatureChoice> for Feature {
    fn from(choice: FeatureChoice) -> Self {
        match choice {
            FeatureChoice::RestrictCommands => Feature::RestrictCommands,
            FeatureChoice::Logging => Feature::Logging,
            FeatureChoice::BotOnlyLogging => Feature::BotOnlyLogging,
            FeatureChoice::Moderation => Feature::Moderation,
            FeatureChoice::Utility => Feature::Utility,
            FeatureChoice::Fun => Feature::Fun,
            FeatureChoice::Leveling => Feature::Leveling,
        }
    }
}

#[derive(Debug, Clone, Copy, poise::ChoiceParameter)]
pub enum ChannelChoice {
    #[name = "Modlog Channel"]
    Modlog,
    #[name = "Commands Channel"]
    Commands,
}

impl From<ChannelChoice> for ChannelKind {
    fn from(choice: ChannelChoice) -> Self {
        match choice {
            ChannelChoice::Modlog => ChannelKind::Modlog,
            ChannelChoice::Commands => ChannelKind::Commands,
        }
    }
}

fn state(enabled: bool) -> &'static str {
    if enabled {
        "enabled"
    } else {
        "disabled"
    }
}

pub fn toggle_reply(feature: Feature, enabled: bool, outcome: Toggle) -> String {
    match outcome {
        Toggle::Changed => format!(
            "Successfully set `{}` as **{}**",
            feature.label(),
            state(enabled)
        ),
        Toggle::Unchanged => format!(
            "`{}` is already set to **{}**",
            feature.label(),
            state(enabled)
        ),
    }
}

/// Manage bot features for this server.
#[poise::command(
    slash_command,
    guild_only,
    rename = "settings",
    subcommands("enable", "disable", "list"),
    subcommand_required,
    default_member_permissions = "MANAGE_GUILD",
    required_permissions = "MANAGE_GUILD"
)]
pub async fn settings_command(_ctx: Context<'_>) -> Result<(), Error> {
    Ok(())
}

async fn toggle(ctx: Context<'_>, feature: Feature, enabled: bool) -> Result<(), Error> {
    let guild_id = guild_of(ctx)?;
    let outcome = ctx
        .data()
        .settings
        .set_feature(guild_id, feature, enabled)
        .await?;

    tracing::info!(guild_id, feature = feature.key(), enabled, "Feature toggled");
    say_ephemeral(ctx, toggle_reply(feature, enabled, outcome)).await
}

/// Enable a bot feature.
#[poise::command(slash_command, guild_only, required_permissions = "MANAGE_GUILD")]
pub async fn enable(
    ctx: Context<'_>,
    #[description = "Feature to enable"] feature: FeatureChoice,
) -> Result<(), Error> {
    toggle(ctx, feature.into(), true).await
}

/// Disable a bot feature.
#[poise::command(slash_command, guild_only, required_permissions = "MANAGE_GUILD")]
pub async fn disable(
    ctx: Context<'_>,
    #[description = "Feature to disable"] feature: FeatureChoice,
) -> Result<(), Error> {
    toggle(ctx, feature.into(), false).await
}

fn channel_value(channel: Option<u64>) -> String {
    channel
        .map(|id| format!("<#{id}>"))
        .unwrap_or_else(|| "Not Set".to_string())
}

pub fn settings_embed(guild_name: &str, settings: &GuildSettings) -> serenity::CreateEmbed {
    let flags = Feature::ALL.into_iter().map(|feature| {
        let value = if settings.is_enabled(feature) {
            "Enabled"
        } else {
            "Disabled"
        };
        (feature.label().to_string(), value.to_string(), true)
    });

    serenity::CreateEmbed::new()
        .title(format!("⚙️ Settings for **{guild_name}**"))
        .color(serenity::Colour::new(0xe6d47b))
        .fields(flags)
        .field(
            "Moderation Log Channel",
            channel_value(settings.channel(ChannelKind::Modlog)),
            true,
        )
        .field(
            "CMD Channel",
            channel_value(settings.channel(ChannelKind::Commands)),
            true,
        )
        .timestamp(serenity::Timestamp::now())
}

/// List the current settings for the bot.
#[poise::command(slash_command, guild_only, required_permissions = "MANAGE_GUILD")]
pub async fn list(ctx: Context<'_>) -> Result<(), Error> {
    let guild_id = guild_of(ctx)?;
    let settings = ctx.data().settings.get(guild_id).await?;
    let guild_name = ctx
        .guild()
        .map(|g| g.name.clone())
        .unwrap_or_else(|| "this server".to_string());

    ctx.send(
        poise::CreateReply::default()
            .embed(settings_embed(&guild_name, &settings))
            .ephemeral(true),
    )
    .await?;
    Ok(())
}

/// Set channels for bot features.
#[poise::command(
    slash_command,
    guild_only,
    default_member_permissions = "MANAGE_GUILD",
    required_permissions = "MANAGE_GUILD"
)]
pub async fn setchannel(
    ctx: Context<'_>,
    #[description = "Type of channel to set"]
    #[rename = "type"]
    kind: ChannelChoice,
    #[description = "The channel to use"]
    #[channel_types("Text")]
    channel: serenity::GuildChannel,
) -> Result<(), Error> {
    let guild_id = guild_of(ctx)?;
    let kind = ChannelKind::from(kind);

    ctx.data()
        .settings
        .set_channel(guild_id, kind, channel.id.get())
        .await?;

    say_ephemeral(
        ctx,
        format!("Successfully set <#{}> as {}", channel.id, kind.label()),
    )
    .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn choices_map_to_every_feature() {
        let choices = [
            FeatureChoice::RestrictCommands,
            FeatureChoice::Logging,
            FeatureChoice::BotOnlyLogging,
            FeatureChoice::Moderation,
            FeatureChoice::Utility,
            FeatureChoice::Fun,
            FeatureChoice::Leveling,
        ];
        let mapped: Vec<Feature> = choices.into_iter().map(Feature::from).collect();
        assert_eq!(mapped, Feature::ALL.to_vec());
    }

    #[test]
    fn toggle_replies() {
        assert_eq!(
            toggle_reply(Feature::Logging, true, Toggle::Changed),
            "Successfully set `Logging` as **enabled**"
        );
        assert_eq!(
            toggle_reply(Feature::Fun, false, Toggle::Unchanged),
            "`Fun Commands` is already set to **disabled**"
        );
    }

    #[test]
    fn settings_embed_lists_flags_and_channels() {
        let mut settings = GuildSettings::defaults(1);
        settings.modlog_channel = Some(42);
        let json = serde_json::to_value(settings_embed("Guild", &settings)).unwrap();

        let fields = json["fields"].as_array().unwrap();
        assert_eq!(fields.len(), Feature::ALL.len() + 2);
        assert_eq!(fields[1]["name"], "Logging");
        assert_eq!(fields[1]["value"], "Disabled");
        assert_eq!(fields[Feature::ALL.len()]["value"], "<#42>");
        assert_eq!(fields[Feature::ALL.len() + 1]["value"], "Not Set");
    }
}
