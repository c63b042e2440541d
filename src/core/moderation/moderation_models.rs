// Moderation domain models.
//
// These types validate and describe moderation actions. Executing them
// (the actual ban/kick/timeout REST calls) is the Discord layer's job.

use chrono::{DateTime, Duration as ChronoDuration, Utc};

use super::moderation_service::ModerationError;
use crate::core::duration::{format_human_duration, parse_duration, AliasPolicy};

/// Reason used when a moderator gives none.
pub const DEFAULT_REASON: &str = "No reason provided";

/// Discord refuses timeouts longer than 28 days.
pub const MAX_TIMEOUT_MS: u64 = 2_419_200_000;

pub const WARNINGS_PER_PAGE: usize = 20;

/// Literal accepted (and shown) for bans without an end.
pub const PERMANENT: &str = "Permanent";

/// How long a ban lasts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BanLength {
    Permanent,
    /// Milliseconds, always > 0.
    Temporary(u64),
}

impl BanLength {
    /// Missing, blank or `Permanent` input means a permanent ban; anything
    /// else must parse to a positive duration.
    pub fn parse(input: Option<&str>, aliases: AliasPolicy) -> Result<Self, ModerationError> {
        let Some(raw) = input.map(str::trim).filter(|s| !s.is_empty()) else {
            return Ok(BanLength::Permanent);
        };
        if raw.eq_ignore_ascii_case(PERMANENT) {
            return Ok(BanLength::Permanent);
        }

        match parse_duration(raw, aliases) {
            Some(ms) if ms > 0 => Ok(BanLength::Temporary(ms)),
            _ => Err(ModerationError::InvalidDuration(raw.to_string())),
        }
    }

    /// When the ban should be lifted, or `None` for permanent bans.
    pub fn expires_at(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            BanLength::Permanent => None,
            BanLength::Temporary(ms) => {
                let ms = i64::try_from(*ms).ok()?;
                now.checked_add_signed(ChronoDuration::milliseconds(ms))
            }
        }
    }

    pub fn describe(&self) -> String {
        match self {
            BanLength::Permanent => PERMANENT.to_string(),
            BanLength::Temporary(ms) => describe_millis(*ms),
        }
    }
}

/// A validated timeout length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeoutLength(u64);

impl TimeoutLength {
    pub fn parse(input: &str, aliases: AliasPolicy) -> Result<Self, ModerationError> {
        let raw = input.trim();
        let ms = parse_duration(raw, aliases)
            .filter(|ms| *ms > 0)
            .ok_or_else(|| ModerationError::InvalidDuration(raw.to_string()))?;

        if ms > MAX_TIMEOUT_MS {
            return Err(ModerationError::TimeoutTooLong);
        }
        Ok(Self(ms))
    }

    pub fn until(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        // Bounded by MAX_TIMEOUT_MS, so this cannot overflow.
        now + ChronoDuration::milliseconds(self.0 as i64)
    }

    pub fn describe(&self) -> String {
        describe_millis(self.0)
    }
}

fn describe_millis(ms: u64) -> String {
    i64::try_from(ms)
        .ok()
        .and_then(format_human_duration)
        .unwrap_or_else(|| format!("{ms}ms"))
}

fn reason_or_default(reason: Option<&str>) -> &str {
    reason
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .unwrap_or(DEFAULT_REASON)
}

/// Audit-log reason: `"<moderator>: <reason>"`.
pub fn audit_reason(moderator: &str, reason: Option<&str>) -> String {
    format!("{}: {}", moderator, reason_or_default(reason))
}

/// Audit-log reason for bans: `"<moderator>: <length>: <reason>"`.
pub fn ban_audit_reason(moderator: &str, length: &BanLength, reason: Option<&str>) -> String {
    format!(
        "{}: {}: {}",
        moderator,
        length.describe(),
        reason_or_default(reason)
    )
}

/// A stored warning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Warning {
    pub id: i64,
    pub guild_id: u64,
    pub user_id: u64,
    pub moderator_id: u64,
    pub reason: String,
    pub created_at: DateTime<Utc>,
}

/// One page of a member's warnings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WarningPage {
    pub warnings: Vec<Warning>,
    /// 1-based.
    pub page: usize,
    pub total_pages: usize,
    pub total: usize,
}

impl WarningPage {
    pub fn is_empty(&self) -> bool {
        self.total == 0
    }
}

/// A ban the sweeper lifts once `banned_until` passes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TempBan {
    pub guild_id: u64,
    pub user_id: u64,
    pub banned_until: DateTime<Utc>,
}
