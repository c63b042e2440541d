use crate::core::leveling::LevelUpEvent;
use crate::discord::Data;
use poise::serenity_prelude::{self as serenity, builder::CreateMessage};
use rand::seq::SliceRandom;

/// Announce a level-up in the channel the message was sent in (unless the
/// guild turned notifications off) and grant the reward roles of the new
/// level the member does not have yet.
pub async fn announce_level_up(
    ctx: &serenity::Context,
    message: &serenity::Message,
    data: &Data,
    level_up: &LevelUpEvent,
) -> Result<(), serenity::Error> {
    let settings = match data.settings.get(level_up.guild_id).await {
        Ok(settings) => settings,
        Err(e) => {
            tracing::error!(guild_id = level_up.guild_id, "Failed to load settings: {e}");
            return Ok(());
        }
    };

    if settings.level_notifs {
        let next_threshold = data.leveling.threshold_for_level(level_up.new_level);
        message
            .channel_id
            .send_message(
                ctx,
                CreateMessage::new()
                    .content(level_up_text(message.author.display_name(), level_up.new_level))
                    .embed(level_up_embed(level_up, next_threshold)),
            )
            .await?;
    }

    let rewards = settings.level_rewards.rewards_for(level_up.new_level);
    if rewards.is_empty() {
        return Ok(());
    }

    let member_roles: Vec<u64> = message
        .member
        .as_ref()
        .map(|m| m.roles.iter().map(|r| r.get()).collect())
        .unwrap_or_default();

    for role_id in missing_roles(rewards, &member_roles) {
        if let Err(e) = ctx
            .http
            .add_member_role(
                serenity::GuildId::new(level_up.guild_id),
                serenity::UserId::new(level_up.user_id),
                serenity::RoleId::new(role_id),
                Some("Level reward"),
            )
            .await
        {
            tracing::warn!(
                user_id = level_up.user_id,
                role_id,
                "Failed to grant level reward: {e}"
            );
        }
    }

    Ok(())
}

pub fn level_up_text(display_name: &str, level: u32) -> String {
    format!("🎉 **{display_name}** leveled up to {level}!")
}

fn level_up_embed(level_up: &LevelUpEvent, next_threshold: u64) -> serenity::CreateEmbed {
    let progress = if next_threshold > 0 {
        level_up.total_xp as f64 / next_threshold as f64
    } else {
        0.0
    };

    serenity::CreateEmbed::new()
        .color(level_color(level_up.new_level))
        .field(
            "Next level",
            format!(
                "{}/{} XP\n{}",
                level_up.total_xp,
                next_threshold,
                build_progress_bar(progress, 18)
            ),
            false,
        )
        .footer(serenity::CreateEmbedFooter::new(random_flavor_line()))
}

/// Reward roles the member is still missing.
fn missing_roles(rewards: &[u64], member_roles: &[u64]) -> Vec<u64> {
    rewards
        .iter()
        .copied()
        .filter(|role| !member_roles.contains(role))
        .collect()
}

fn level_color(level: u32) -> serenity::Colour {
    if level >= 50 {
        serenity::Colour::DARK_PURPLE
    } else if level >= 25 {
        serenity::Colour::ORANGE
    } else if level >= 10 {
        serenity::Colour::GOLD
    } else if level >= 5 {
        serenity::Colour::BLURPLE
    } else {
        serenity::Colour::LIGHT_GREY
    }
}

pub fn build_progress_bar(progress: f64, length: usize) -> String {
    let clamped = progress.clamp(0.0, 1.0);
    let mut filled = (clamped * length as f64).round() as usize;
    if clamped > 0.0 && filled == 0 {
        filled = 1;
    }
    filled = filled.min(length);
    let bar = "▰".repeat(filled) + &"▱".repeat(length - filled);
    format!("{} ({}%)", bar, (clamped * 100.0).round() as u32)
}

fn random_flavor_line() -> &'static str {
    const FLAVOR_LINES: [&str; 4] = [
        "Keep chatting!",
        "Dorito approves.",
        "Another level, another flex.",
        "That XP bar never stood a chance.",
    ];

    FLAVOR_LINES
        .choose(&mut rand::thread_rng())
        .copied()
        .unwrap_or(FLAVOR_LINES[0])
}
