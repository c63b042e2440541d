// General commands: help, bot status and the owner-only status line.

use crate::core::duration::format_compact_duration;
use crate::discord::checks::is_bot_owner;
use crate::discord::commands::presence;
use crate::discord::{say_ephemeral, Context, Error};
use poise::serenity_prelude as serenity;

const HELP_COLOR: u32 = 0xe6d47b;

#[derive(Debug, Clone, Copy, PartialEq, Eq, poise::ChoiceParameter)]
pub enum HelpCategory {
    #[name = "General Commands"]
    General,
    #[name = "Fun Commands"]
    Fun,
    #[name = "Leveling"]
    Leveling,
    #[name = "Moderation"]
    Moderation,
    #[name = "Utilities"]
    Utilities,
}

impl HelpCategory {
    fn title(self) -> &'static str {
        match self {
            HelpCategory::General => "🛠️ General Commands",
            HelpCategory::Fun => "🎉 Fun Commands",
            HelpCategory::Leveling => "📈 Leveling Commands",
            HelpCategory::Moderation => "🔨 Moderation Commands",
            HelpCategory::Utilities => "⚙️ Utility Commands",
        }
    }

    /// `(usage, description)` for every command in the category.
    pub fn entries(self) -> &'static [(&'static str, &'static str)] {
        match self {
            HelpCategory::General => &[
                ("`/help <category>`", "Gives info about commands"),
                ("`/setchannel <type> <channel>`", "Set channels for bot features"),
                ("`/settings list`", "List the current settings for the bot"),
                ("`/settings enable <feature>`", "Enable a bot feature"),
                ("`/settings disable <feature>`", "Disable a bot feature"),
                ("`/status`", "Get the bot's status"),
            ],
            HelpCategory::Fun => &[("`/longcat [length]`", "Sends a long cat emoji chain.")],
            HelpCategory::Leveling => &[
                ("`/rank [target]`", "Checks someone's rank"),
                ("`/top`", "Check top 10 leaderboard"),
                ("`/levels noxp_add <channel>`", "Add a channel to be excluded from giving XP"),
                ("`/levels noxp_rem <channel>`", "Remove a channel from exclusion"),
                ("`/levels noxp_list`", "List channels excluded from XP"),
                ("`/levels rewards_add <role> <level>`", "Add a level reward"),
                ("`/levels rewards_rem <role>`", "Remove a level reward"),
                ("`/levels rewards_list`", "List the level rewards"),
                ("`/levels notif_disable`", "Disable Level-Up Notifications"),
                ("`/levels notif_enable`", "Enable Level-Up Notifications"),
            ],
            HelpCategory::Moderation => &[
                ("`/timeout add <target> <duration> [reason]`", "Time out a member"),
                ("`/timeout remove <target> [reason]`", "Remove timeout from a member"),
                ("`/kick <target> [reason]`", "Kick a member from the Server"),
                ("`/ban <target> [duration] [reason]`", "Ban a member from the Server"),
                ("`/unban <target> [reason]`", "Unban a user from the Server"),
                ("`/warn <target> <reason>`", "Warn a member"),
                ("`/warnings <target> [page]`", "List a member's warnings"),
            ],
            HelpCategory::Utilities => &[
                ("`/snippet list`", "List all snippets"),
                ("`/snippet create <name> <content>`", "Add a snippet"),
                ("`/snippet delete <name>`", "Delete a snippet"),
                ("`/snippet edit <name> [new_name] [new_content]`", "Edit a snippet"),
                ("`;<snippet>`", "Show a snippet"),
                ("`/trigger create <name> <trigger> <channels>`", "Create a trigger for a snippet"),
                ("`/trigger delete <trigger>`", "Delete a snippet trigger"),
                ("`/trigger edit <trigger> [new_trigger] [new_channels]`", "Edit a snippet trigger"),
                ("`/trigger list <name>`", "List triggers for a snippet"),
            ],
        }
    }
}

pub fn help_embed(category: HelpCategory) -> serenity::CreateEmbed {
    serenity::CreateEmbed::new()
        .title(category.title())
        .color(serenity::Colour::new(HELP_COLOR))
        .fields(
            category
                .entries()
                .iter()
                .map(|(usage, description)| (*usage, *description, false)),
        )
        .timestamp(serenity::Timestamp::now())
}

/// List all bot commands.
#[poise::command(slash_command, guild_only)]
pub async fn help(
    ctx: Context<'_>,
    #[description = "The command category"] category: HelpCategory,
) -> Result<(), Error> {
    ctx.send(
        poise::CreateReply::default()
            .embed(help_embed(category))
            .ephemeral(true),
    )
    .await?;
    Ok(())
}

/// Get the bot's status, including uptime.
#[poise::command(slash_command)]
pub async fn status(ctx: Context<'_>) -> Result<(), Error> {
    let uptime = ctx.data().started_at.elapsed();
    let uptime_ms = i64::try_from(uptime.as_millis()).unwrap_or(i64::MAX);
    let uptime = format_compact_duration(uptime_ms).unwrap_or_else(|| "0s".to_string());
    let guilds = ctx.cache().guild_count();

    let embed = serenity::CreateEmbed::new()
        .title("Dorito Status")
        .color(serenity::Colour::new(HELP_COLOR))
        .field("Bot Uptime", uptime, true)
        .field("Servers", guilds.to_string(), true)
        .field("Version", env!("CARGO_PKG_VERSION"), true)
        .footer(serenity::CreateEmbedFooter::new("DoritoBot Status"))
        .timestamp(serenity::Timestamp::now());

    ctx.send(poise::CreateReply::default().embed(embed)).await?;
    Ok(())
}

/// Set the bot's status.
#[poise::command(slash_command, check = "is_bot_owner")]
pub async fn setstatus(
    ctx: Context<'_>,
    #[description = "The new status"] status: String,
) -> Result<(), Error> {
    let status = status.trim();
    if status.is_empty() {
        return say_ephemeral(ctx, "You need to enter a new status!").await;
    }

    presence::set_custom_status(ctx.serenity_context(), status);
    tracing::info!(status, "Bot status changed");
    say_ephemeral(ctx, format!("Successfully set the bot's status to `{status}`!")).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_category_lists_commands() {
        for category in [
            HelpCategory::General,
            HelpCategory::Fun,
            HelpCategory::Leveling,
            HelpCategory::Moderation,
            HelpCategory::Utilities,
        ] {
            let json = serde_json::to_value(help_embed(category)).unwrap();
            assert_eq!(
                json["fields"].as_array().unwrap().len(),
                category.entries().len()
            );
        }
    }
}
