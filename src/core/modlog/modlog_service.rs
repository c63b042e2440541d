// Moderation log routing.
//
// Decides whether a moderation action is logged and where, and remembers
// actions the bot just performed so the gateway event they cause is not
// logged a second time.

use dashmap::DashMap;
use std::time::{Duration, Instant};

use crate::core::moderation::DEFAULT_REASON;
use crate::core::settings::GuildSettings;

/// How long a bot action suppresses the matching gateway event.
pub const BOT_ACTION_MEMORY: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModAction {
    Ban,
    Unban,
    Kick,
    Timeout,
    TimeoutRemoved,
    Warn,
}

impl ModAction {
    fn verb(self) -> &'static str {
        match self {
            ModAction::Ban => "banned",
            ModAction::Unban => "unbanned",
            ModAction::Kick => "kicked",
            ModAction::Timeout => "timed out",
            ModAction::TimeoutRemoved => "removed the timeout of",
            ModAction::Warn => "warned",
        }
    }

    pub fn emoji(self) -> &'static str {
        match self {
            ModAction::Ban => "🔨",
            ModAction::Unban => "🔓",
            ModAction::Kick => "👢",
            ModAction::Timeout | ModAction::TimeoutRemoved => "⏳",
            ModAction::Warn => "⚠️",
        }
    }

    pub fn footer(self) -> &'static str {
        match self {
            ModAction::Ban => "Ban Action",
            ModAction::Unban => "Unban Action",
            ModAction::Kick => "Kick Action",
            ModAction::Timeout | ModAction::TimeoutRemoved => "Timeout Action",
            ModAction::Warn => "Warn Action",
        }
    }

    /// Embed colour as `0xRRGGBB`.
    pub fn color(self) -> u32 {
        match self {
            ModAction::Ban => 0x781723,
            ModAction::Unban => 0x57f287,
            ModAction::Kick => 0xffad33,
            ModAction::Timeout | ModAction::TimeoutRemoved | ModAction::Warn => 0xff6666,
        }
    }
}

/// Who performed an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionOrigin {
    /// Through one of the bot's commands or its unban sweeper.
    Bot,
    /// Directly in the Discord client or by another bot.
    External,
}

/// One line of the moderation log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModlogEntry {
    pub action: ModAction,
    /// `None` when the gateway event does not say who did it.
    pub moderator: Option<String>,
    pub target: String,
    pub reason: Option<String>,
    pub duration: Option<String>,
}

impl ModlogEntry {
    pub fn summary(&self) -> String {
        match &self.moderator {
            Some(moderator) => format!(
                "{} **{}** {} **{}**",
                self.action.emoji(),
                moderator,
                self.action.verb(),
                self.target
            ),
            None => format!(
                "{} **{}** was {}",
                self.action.emoji(),
                self.target,
                self.action.verb()
            ),
        }
    }

    pub fn reason_or_default(&self) -> &str {
        self.reason
            .as_deref()
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .unwrap_or(DEFAULT_REASON)
    }
}

pub struct ModlogService {
    memory: Duration,
    bot_actions: DashMap<(u64, u64, ModAction), Instant>,
}

impl Default for ModlogService {
    fn default() -> Self {
        Self::new(BOT_ACTION_MEMORY)
    }
}

impl ModlogService {
    pub fn new(memory: Duration) -> Self {
        Self {
            memory,
            bot_actions: DashMap::new(),
        }
    }

    /// The channel to log to, if the guild wants this action logged.
    ///
    /// Logging must be on and a modlog channel set. External actions are only
    /// logged when the guild does not restrict the log to bot actions.
    pub fn target_channel(&self, settings: &GuildSettings, origin: ActionOrigin) -> Option<u64> {
        if !settings.logging {
            return None;
        }
        if origin == ActionOrigin::External && settings.botonly_logging {
            return None;
        }
        settings.modlog_channel
    }

    /// Remember that the bot itself is about to perform `action`.
    pub fn mark_bot_action(&self, guild_id: u64, user_id: u64, action: ModAction, now: Instant) {
        self.bot_actions.insert((guild_id, user_id, action), now);
    }

    /// Consume a recent mark for this action. Returns `true` if the bot
    /// performed it, meaning the gateway event is already logged.
    pub fn take_bot_action(
        &self,
        guild_id: u64,
        user_id: u64,
        action: ModAction,
        now: Instant,
    ) -> bool {
        match self.bot_actions.remove(&(guild_id, user_id, action)) {
            Some((_, marked)) => now.saturating_duration_since(marked) < self.memory,
            None => false,
        }
    }

    /// Drop marks whose gateway event never arrived.
    pub fn purge(&self, now: Instant) -> usize {
        let before = self.bot_actions.len();
        self.bot_actions
            .retain(|_, marked| now.saturating_duration_since(*marked) < self.memory);
        before - self.bot_actions.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn logging_settings() -> GuildSettings {
        let mut settings = GuildSettings::defaults(1);
        settings.logging = true;
        settings.modlog_channel = Some(77);
        settings
    }

    #[test]
    fn nothing_is_logged_without_logging_or_channel() {
        let service = ModlogService::default();

        let mut settings = GuildSettings::defaults(1);
        settings.modlog_channel = Some(77);
        assert_eq!(service.target_channel(&settings, ActionOrigin::Bot), None);

        let mut settings = logging_settings();
        settings.modlog_channel = None;
        assert_eq!(service.target_channel(&settings, ActionOrigin::Bot), None);
    }

    #[test]
    fn external_actions_respect_botonly_logging() {
        let service = ModlogService::default();
        let mut settings = logging_settings();

        assert_eq!(service.target_channel(&settings, ActionOrigin::Bot), Some(77));
        assert_eq!(service.target_channel(&settings, ActionOrigin::External), None);

        settings.botonly_logging = false;
        assert_eq!(
            service.target_channel(&settings, ActionOrigin::External),
            Some(77)
        );
    }

    #[test]
    fn bot_marks_are_consumed_once() {
        let service = ModlogService::default();
        let now = Instant::now();

        service.mark_bot_action(1, 2, ModAction::Ban, now);

        assert!(!service.take_bot_action(1, 2, ModAction::Unban, now));
        assert!(service.take_bot_action(1, 2, ModAction::Ban, now));
        assert!(!service.take_bot_action(1, 2, ModAction::Ban, now));
    }

    #[test]
    fn stale_marks_do_not_suppress() {
        let service = ModlogService::new(Duration::from_secs(5));
        let now = Instant::now();

        service.mark_bot_action(1, 2, ModAction::Ban, now);
        assert!(!service.take_bot_action(1, 2, ModAction::Ban, now + Duration::from_secs(6)));

        service.mark_bot_action(1, 3, ModAction::Kick, now);
        assert_eq!(service.purge(now + Duration::from_secs(6)), 1);
    }

    #[test]
    fn summaries_name_the_moderator_when_known() {
        let entry = ModlogEntry {
            action: ModAction::Kick,
            moderator: Some("mod".into()),
            target: "user".into(),
            reason: None,
            duration: None,
        };
        assert_eq!(entry.summary(), "👢 **mod** kicked **user**");
        assert_eq!(entry.reason_or_default(), "No reason provided");

        let external = ModlogEntry {
            moderator: None,
            action: ModAction::Ban,
            ..entry
        };
        assert_eq!(external.summary(), "🔨 **user** was banned");
    }
}
