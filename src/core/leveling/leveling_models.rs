// Leveling domain models.
//
// Plain data with primitive ids so the Discord layer can translate them into
// embeds and role grants without the core knowing about either.

use std::time::Duration;

/// A user's stored progression in one guild.
///
/// Users can be in several guilds, and progress is tracked separately in each.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Progression {
    pub user_id: u64,
    pub guild_id: u64,
    pub xp: u64,
    pub level: u32,
}

impl Progression {
    /// The implicit record of someone who never earned XP.
    pub fn empty(user_id: u64, guild_id: u64) -> Self {
        Self {
            user_id,
            guild_id,
            xp: 0,
            level: 0,
        }
    }
}

/// What a store reports back after writing an award.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedAward {
    pub previous_level: u32,
    pub progression: Progression,
}

/// The totals written by an accepted award.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AwardedXp {
    pub user_id: u64,
    pub guild_id: u64,
    pub total_xp: u64,
    pub old_level: u32,
    pub new_level: u32,
}

/// Result of an XP award.
///
/// Skipped awards never touch the store, so they carry no totals.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum XpAward {
    Applied(AwardedXp),
    /// The (guild, user) pair earned XP too recently.
    OnCooldown(Duration),
    /// Zero or negative amounts are ignored.
    NotPositive,
}

impl XpAward {
    /// The level-up to announce, if this award crossed a threshold.
    pub fn level_up(&self) -> Option<LevelUpEvent> {
        match self {
            XpAward::Applied(awarded) if awarded.new_level > awarded.old_level => {
                Some(LevelUpEvent {
                    user_id: awarded.user_id,
                    guild_id: awarded.guild_id,
                    old_level: awarded.old_level,
                    new_level: awarded.new_level,
                    total_xp: awarded.total_xp,
                })
            }
            _ => None,
        }
    }
}

/// Represents when a user levels up.
/// Returned to the Discord layer so it can announce it and grant reward roles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LevelUpEvent {
    pub user_id: u64,
    pub guild_id: u64,
    pub old_level: u32,
    pub new_level: u32,
    pub total_xp: u64,
}

/// Everything the `/rank` card shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressSnapshot {
    pub xp: u64,
    pub level: u32,
    pub next_level_xp: u64,
    /// `None` when the user has no record in this guild yet.
    pub rank: Option<u64>,
}
