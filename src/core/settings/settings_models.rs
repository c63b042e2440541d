// Per-guild configuration models.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Highest level a reward role can be attached to.
pub const MAX_REWARD_LEVEL: u32 = 200;

/// A feature flag that can be switched with `/settings`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Feature {
    RestrictCommands,
    Logging,
    BotOnlyLogging,
    Moderation,
    Utility,
    Fun,
    Leveling,
}

impl Feature {
    pub const ALL: [Feature; 7] = [
        Feature::RestrictCommands,
        Feature::Logging,
        Feature::BotOnlyLogging,
        Feature::Moderation,
        Feature::Utility,
        Feature::Fun,
        Feature::Leveling,
    ];

    /// Column name in `guild_settings`.
    pub fn key(self) -> &'static str {
        match self {
            Feature::RestrictCommands => "restrict_cmds",
            Feature::Logging => "logging",
            Feature::BotOnlyLogging => "botonly_logging",
            Feature::Moderation => "moderation",
            Feature::Utility => "utility",
            Feature::Fun => "fun",
            Feature::Leveling => "leveling",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Feature::RestrictCommands => "Restrict bot commands to cmd channel",
            Feature::Logging => "Logging",
            Feature::BotOnlyLogging => "Only log moderation actions made through the bot",
            Feature::Moderation => "Moderation Commands",
            Feature::Utility => "Utility Commands",
            Feature::Fun => "Fun Commands",
            Feature::Leveling => "Leveling System",
        }
    }
}

/// Channels a guild can point the bot at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelKind {
    Modlog,
    Commands,
}

impl ChannelKind {
    pub fn label(self) -> &'static str {
        match self {
            ChannelKind::Modlog => "modlog channel",
            ChannelKind::Commands => "commands channel",
        }
    }
}

/// Outcome of flipping a flag: whether anything actually changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Toggle {
    Changed,
    Unchanged,
}

/// Level -> role ids granted on reaching it.
///
/// Serialized as a JSON object keyed by level, e.g. `{"5":[123,456]}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LevelRewards(BTreeMap<u32, Vec<u64>>);

impl LevelRewards {
    /// Roles granted for reaching exactly `level`.
    pub fn rewards_for(&self, level: u32) -> &[u64] {
        self.0.get(&level).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Returns `false` if the role was already attached to that level.
    pub fn add(&mut self, level: u32, role_id: u64) -> bool {
        let roles = self.0.entry(level).or_default();
        if roles.contains(&role_id) {
            return false;
        }
        roles.push(role_id);
        true
    }

    /// Detach the role from every level; levels left empty are dropped.
    /// Returns `false` if the role was not configured anywhere.
    pub fn remove_role(&mut self, role_id: u64) -> bool {
        let mut removed = false;
        self.0.retain(|_, roles| {
            let before = roles.len();
            roles.retain(|r| *r != role_id);
            removed |= roles.len() != before;
            !roles.is_empty()
        });
        removed
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (u32, &[u64])> {
        self.0.iter().map(|(level, roles)| (*level, roles.as_slice()))
    }
}

/// Everything configurable for one guild.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuildSettings {
    pub guild_id: u64,
    pub logging: bool,
    pub botonly_logging: bool,
    pub moderation: bool,
    pub utility: bool,
    pub fun: bool,
    pub leveling: bool,
    pub restrict_cmds: bool,
    pub modlog_channel: Option<u64>,
    pub cmd_channel: Option<u64>,
    pub no_xp_channels: Vec<u64>,
    pub level_rewards: LevelRewards,
    pub level_notifs: bool,
}

impl GuildSettings {
    /// What a guild with no stored row gets.
    pub fn defaults(guild_id: u64) -> Self {
        Self {
            guild_id,
            logging: false,
            botonly_logging: true,
            moderation: true,
            utility: true,
            fun: true,
            leveling: true,
            restrict_cmds: false,
            modlog_channel: None,
            cmd_channel: None,
            no_xp_channels: Vec::new(),
            level_rewards: LevelRewards::default(),
            level_notifs: true,
        }
    }

    pub fn is_enabled(&self, feature: Feature) -> bool {
        match feature {
            Feature::RestrictCommands => self.restrict_cmds,
            Feature::Logging => self.logging,
            Feature::BotOnlyLogging => self.botonly_logging,
            Feature::Moderation => self.moderation,
            Feature::Utility => self.utility,
            Feature::Fun => self.fun,
            Feature::Leveling => self.leveling,
        }
    }

    pub fn set_enabled(&mut self, feature: Feature, enabled: bool) {
        let flag = match feature {
            Feature::RestrictCommands => &mut self.restrict_cmds,
            Feature::Logging => &mut self.logging,
            Feature::BotOnlyLogging => &mut self.botonly_logging,
            Feature::Moderation => &mut self.moderation,
            Feature::Utility => &mut self.utility,
            Feature::Fun => &mut self.fun,
            Feature::Leveling => &mut self.leveling,
        };
        *flag = enabled;
    }

    pub fn channel(&self, kind: ChannelKind) -> Option<u64> {
        match kind {
            ChannelKind::Modlog => self.modlog_channel,
            ChannelKind::Commands => self.cmd_channel,
        }
    }

    /// The channel commands are confined to, when restriction is on.
    pub fn command_channel_restriction(&self) -> Option<u64> {
        if self.restrict_cmds {
            self.cmd_channel
        } else {
            None
        }
    }

    pub fn earns_xp_in(&self, channel_id: u64) -> bool {
        self.leveling && !self.no_xp_channels.contains(&channel_id)
    }
}
