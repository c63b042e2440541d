// Discord commands for the leveling system.
//
// **Notice the pattern:**
// 1. Extract primitive data from Discord types
// 2. Call core service
// 3. Format the response based on the result
//
// This layer is THIN - no business logic, just translation.

use crate::core::leveling::{ProgressSnapshot, Progression};
use crate::core::settings::{LevelRewards, SettingsError, Toggle};
use crate::discord::checks::leveling_enabled;
use crate::discord::leveling_announcements::build_progress_bar;
use crate::discord::{guild_of, say_ephemeral, Context, Error};
use poise::serenity_prelude as serenity;

const LEVELING_COLOR: u32 = 0xe6d47b;
const LEADERBOARD_SIZE: usize = 10;

pub fn rank_card(display_name: &str, avatar: String, snapshot: &ProgressSnapshot) -> serenity::CreateEmbed {
    let progress = if snapshot.next_level_xp > 0 {
        snapshot.xp as f64 / snapshot.next_level_xp as f64
    } else {
        0.0
    };
    let rank = snapshot
        .rank
        .map(|r| format!("#{r}"))
        .unwrap_or_else(|| "Unranked".to_string());

    serenity::CreateEmbed::new()
        .title(format!("{display_name}'s Rank Card"))
        .thumbnail(avatar)
        .color(serenity::Colour::new(LEVELING_COLOR))
        .field("Rank", rank, true)
        .field("Level", format!("**{}**", snapshot.level), true)
        .field(
            "XP",
            format!(
                "{}/{} XP\n{}",
                snapshot.xp,
                snapshot.next_level_xp,
                build_progress_bar(progress, 15)
            ),
            false,
        )
}

/// Check someone's rank.
#[poise::command(slash_command, guild_only, check = "leveling_enabled")]
pub async fn rank(
    ctx: Context<'_>,
    #[description = "User to check (defaults to you)"] target: Option<serenity::User>,
) -> Result<(), Error> {
    let guild_id = guild_of(ctx)?;
    let target = target.as_ref().unwrap_or_else(|| ctx.author());

    if target.bot {
        return say_ephemeral(ctx, "Bots don't earn XP! 🤖").await;
    }

    let snapshot = ctx
        .data()
        .leveling
        .get_progress(target.id.get(), guild_id)
        .await?;

    let embed = rank_card(target.display_name(), target.face(), &snapshot);
    ctx.send(poise::CreateReply::default().embed(embed)).await?;
    Ok(())
}

pub fn leaderboard_embed(entries: &[Progression]) -> serenity::CreateEmbed {
    let fields = entries.iter().enumerate().map(|(index, entry)| {
        (
            format!("**#{}** - `{}` XP", index + 1, entry.xp),
            format!("<@{}> - Level: `{}`", entry.user_id, entry.level),
            false,
        )
    });

    serenity::CreateEmbed::new()
        .title("Rank Leaderboard")
        .color(serenity::Colour::new(LEVELING_COLOR))
        .description(format!("Top {LEADERBOARD_SIZE} members based on XP:"))
        .fields(fields)
}

/// Check the top 10 leaderboard.
#[poise::command(slash_command, guild_only, check = "leveling_enabled")]
pub async fn top(ctx: Context<'_>) -> Result<(), Error> {
    let guild_id = guild_of(ctx)?;
    let entries = ctx
        .data()
        .leveling
        .get_top_ranks(guild_id, LEADERBOARD_SIZE)
        .await?;

    if entries.is_empty() {
        return say_ephemeral(ctx, "Nobody has earned XP on this server yet.").await;
    }

    ctx.send(poise::CreateReply::default().embed(leaderboard_embed(&entries)))
        .await?;
    Ok(())
}

/// Configure leveling for this server.
#[poise::command(
    slash_command,
    guild_only,
    subcommands(
        "noxp_add",
        "noxp_rem",
        "noxp_list",
        "rewards_add",
        "rewards_rem",
        "rewards_list",
        "notif_enable",
        "notif_disable"
    ),
    subcommand_required,
    default_member_permissions = "MANAGE_GUILD"
)]
pub async fn levels(_ctx: Context<'_>) -> Result<(), Error> {
    Ok(())
}

/// Exclude a channel from giving XP.
#[poise::command(
    slash_command,
    guild_only,
    check = "leveling_enabled",
    required_permissions = "MANAGE_GUILD"
)]
pub async fn noxp_add(
    ctx: Context<'_>,
    #[description = "Channel to exclude"] channel: serenity::GuildChannel,
) -> Result<(), Error> {
    let guild_id = guild_of(ctx)?;
    let added = ctx
        .data()
        .settings
        .add_no_xp_channel(guild_id, channel.id.get())
        .await?;

    let reply = if added {
        format!("✅ Successfully added <#{}> to No XP channels.", channel.id)
    } else {
        format!("❌ The channel <#{}> is already excluded from XP gain.", channel.id)
    };
    say_ephemeral(ctx, reply).await
}

/// Let a channel give XP again.
#[poise::command(
    slash_command,
    guild_only,
    check = "leveling_enabled",
    required_permissions = "MANAGE_GUILD"
)]
pub async fn noxp_rem(
    ctx: Context<'_>,
    #[description = "Channel to include again"] channel: serenity::GuildChannel,
) -> Result<(), Error> {
    let guild_id = guild_of(ctx)?;
    let removed = ctx
        .data()
        .settings
        .remove_no_xp_channel(guild_id, channel.id.get())
        .await?;

    let reply = if removed {
        format!("✅ Successfully removed <#{}> from No XP channels.", channel.id)
    } else {
        format!("❌ The channel <#{}> is not in the No XP list.", channel.id)
    };
    say_ephemeral(ctx, reply).await
}

/// List channels that give no XP.
#[poise::command(
    slash_command,
    guild_only,
    check = "leveling_enabled",
    required_permissions = "MANAGE_GUILD"
)]
pub async fn noxp_list(ctx: Context<'_>) -> Result<(), Error> {
    let guild_id = guild_of(ctx)?;
    let settings = ctx.data().settings.get(guild_id).await?;

    let reply = if settings.no_xp_channels.is_empty() {
        "No channels are excluded from XP gain.".to_string()
    } else {
        let channels: Vec<String> = settings
            .no_xp_channels
            .iter()
            .map(|id| format!("<#{id}>"))
            .collect();
        format!("Excluded XP Channels: {}", channels.join(", "))
    };
    say_ephemeral(ctx, reply).await
}

/// Grant a role when members reach a level.
#[poise::command(
    slash_command,
    guild_only,
    check = "leveling_enabled",
    required_permissions = "MANAGE_GUILD"
)]
pub async fn rewards_add(
    ctx: Context<'_>,
    #[description = "Role to grant"] role: serenity::Role,
    #[description = "Level that grants the role"]
    #[min = 1]
    #[max = 200]
    level: u32,
) -> Result<(), Error> {
    let guild_id = guild_of(ctx)?;
    let reply = match ctx
        .data()
        .settings
        .add_level_reward(guild_id, level, role.id.get())
        .await
    {
        Ok(true) => format!("✅ Successfully added <@&{}> at level {level}.", role.id),
        Ok(false) => format!("❌ <@&{}> is already a reward for level {level}.", role.id),
        Err(e @ SettingsError::InvalidLevel(_)) => format!("❌ {e}"),
        Err(e) => return Err(e.into()),
    };
    say_ephemeral(ctx, reply).await
}

/// Stop granting a role as a level reward.
#[poise::command(
    slash_command,
    guild_only,
    check = "leveling_enabled",
    required_permissions = "MANAGE_GUILD"
)]
pub async fn rewards_rem(
    ctx: Context<'_>,
    #[description = "Role to remove from the rewards"] role: serenity::Role,
) -> Result<(), Error> {
    let guild_id = guild_of(ctx)?;
    let removed = ctx
        .data()
        .settings
        .remove_level_reward(guild_id, role.id.get())
        .await?;

    let reply = if removed {
        format!("✅ Successfully removed <@&{}> from rewards", role.id)
    } else {
        format!("❌ <@&{}> is not a level reward.", role.id)
    };
    say_ephemeral(ctx, reply).await
}

pub fn rewards_embed(rewards: &LevelRewards) -> serenity::CreateEmbed {
    let lines: Vec<String> = rewards
        .iter()
        .map(|(level, roles)| {
            let roles: Vec<String> = roles.iter().map(|id| format!("<@&{id}>")).collect();
            format!("**Level {level}:** {}", roles.join(", "))
        })
        .collect();

    serenity::CreateEmbed::new()
        .title("📜 Level Rewards")
        .color(serenity::Colour::new(0xffa500))
        .description(lines.join("\n"))
}

/// List the configured level rewards.
#[poise::command(
    slash_command,
    guild_only,
    check = "leveling_enabled",
    required_permissions = "MANAGE_GUILD"
)]
pub async fn rewards_list(ctx: Context<'_>) -> Result<(), Error> {
    let guild_id = guild_of(ctx)?;
    let settings = ctx.data().settings.get(guild_id).await?;

    if settings.level_rewards.is_empty() {
        return say_ephemeral(ctx, "No level rewards set.").await;
    }

    ctx.send(
        poise::CreateReply::default()
            .embed(rewards_embed(&settings.level_rewards))
            .ephemeral(true),
    )
    .await?;
    Ok(())
}

async fn set_notifications(ctx: Context<'_>, enabled: bool) -> Result<(), Error> {
    let guild_id = guild_of(ctx)?;
    let state = if enabled { "enabled" } else { "disabled" };

    let reply = match ctx
        .data()
        .settings
        .set_level_notifications(guild_id, enabled)
        .await?
    {
        Toggle::Changed => format!("✅ Successfully {state} Level-Up Notifications!"),
        Toggle::Unchanged => format!("Level-Up Notifications are already {state}!"),
    };
    say_ephemeral(ctx, reply).await
}

/// Enable level-up notifications.
#[poise::command(
    slash_command,
    guild_only,
    check = "leveling_enabled",
    required_permissions = "MANAGE_GUILD"
)]
pub async fn notif_enable(ctx: Context<'_>) -> Result<(), Error> {
    set_notifications(ctx, true).await
}

/// Disable level-up notifications.
#[poise::command(
    slash_command,
    guild_only,
    check = "leveling_enabled",
    required_permissions = "MANAGE_GUILD"
)]
pub async fn notif_disable(ctx: Context<'_>) -> Result<(), Error> {
    set_notifications(ctx, false).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leaderboard_numbers_entries_in_order() {
        let entries = vec![
            Progression {
                user_id: 5,
                guild_id: 1,
                xp: 300,
                level: 2,
            },
            Progression {
                user_id: 9,
                guild_id: 1,
                xp: 120,
                level: 1,
            },
        ];
        let json = serde_json::to_value(leaderboard_embed(&entries)).unwrap();

        assert_eq!(json["fields"][0]["name"], "**#1** - `300` XP");
        assert_eq!(json["fields"][0]["value"], "<@5> - Level: `2`");
        assert_eq!(json["fields"][1]["name"], "**#2** - `120` XP");
    }

    #[test]
    fn rank_card_shows_unranked_users() {
        let snapshot = ProgressSnapshot {
            xp: 0,
            level: 0,
            next_level_xp: 100,
            rank: None,
        };
        let json = serde_json::to_value(rank_card("Dorito", String::new(), &snapshot)).unwrap();
        assert_eq!(json["title"], "Dorito's Rank Card");
        assert_eq!(json["fields"][0]["value"], "Unranked");
    }

    #[test]
    fn rewards_are_listed_per_level() {
        let mut rewards = LevelRewards::default();
        rewards.add(5, 10);
        rewards.add(5, 11);
        rewards.add(20, 12);

        let json = serde_json::to_value(rewards_embed(&rewards)).unwrap();
        assert_eq!(
            json["description"],
            "**Level 5:** <@&10>, <@&11>\n**Level 20:** <@&12>"
        );
    }
}
