// Moderation service - warnings and temporary-ban bookkeeping.
//
// The service records what moderators did and answers "which bans are due",
// while the Discord layer performs the REST calls. NO Discord dependencies here.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use super::moderation_models::{
    BanLength, TempBan, TimeoutLength, Warning, WarningPage, WARNINGS_PER_PAGE,
};
use crate::core::duration::AliasPolicy;

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, Error)]
pub enum ModerationError {
    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("Invalid duration `{0}`. Use formats like `10s`, `5m`, `1h`, `2d`, `1w`.")]
    InvalidDuration(String),

    #[error("The maximum timeout duration is 4 weeks.")]
    TimeoutTooLong,

    #[error("Invalid page number. Please provide a page between 1 and {total_pages}.")]
    PageOutOfRange { total_pages: usize },
}

// ============================================================================
// STORAGE TRAIT (PORT)
// ============================================================================

#[async_trait]
pub trait ModerationStore: Send + Sync {
    /// Persist a warning and return it with its id and timestamp.
    async fn add_warning(
        &self,
        guild_id: u64,
        user_id: u64,
        moderator_id: u64,
        reason: &str,
        created_at: DateTime<Utc>,
    ) -> Result<Warning, ModerationError>;

    /// All warnings for a member, oldest first.
    async fn list_warnings(
        &self,
        guild_id: u64,
        user_id: u64,
    ) -> Result<Vec<Warning>, ModerationError>;

    /// Insert or replace the temp-ban record for a member.
    async fn upsert_temp_ban(&self, ban: &TempBan) -> Result<(), ModerationError>;

    /// Returns `true` if a record was deleted.
    async fn delete_temp_ban(&self, guild_id: u64, user_id: u64) -> Result<bool, ModerationError>;

    /// Temp bans whose `banned_until` is at or before `now`.
    async fn due_temp_bans(&self, now: DateTime<Utc>) -> Result<Vec<TempBan>, ModerationError>;
}

// ============================================================================
// CORE SERVICE
// ============================================================================

pub struct ModerationService<S: ModerationStore> {
    store: S,
    /// How `/ban` and `/timeout` read their duration option.
    aliases: AliasPolicy,
}

impl<S: ModerationStore> ModerationService<S> {
    pub fn new(store: S, aliases: AliasPolicy) -> Self {
        Self { store, aliases }
    }

    pub fn ban_length(&self, input: Option<&str>) -> Result<BanLength, ModerationError> {
        BanLength::parse(input, self.aliases)
    }

    pub fn timeout_length(&self, input: &str) -> Result<TimeoutLength, ModerationError> {
        TimeoutLength::parse(input, self.aliases)
    }

    pub async fn add_warning(
        &self,
        guild_id: u64,
        user_id: u64,
        moderator_id: u64,
        reason: &str,
    ) -> Result<Warning, ModerationError> {
        self.store
            .add_warning(guild_id, user_id, moderator_id, reason.trim(), Utc::now())
            .await
    }

    /// A 1-based page of a member's warnings.
    ///
    /// A member without warnings gets an empty page 1; any other page outside
    /// `1..=total_pages` is an error.
    pub async fn warnings_page(
        &self,
        guild_id: u64,
        user_id: u64,
        page: usize,
    ) -> Result<WarningPage, ModerationError> {
        let all = self.store.list_warnings(guild_id, user_id).await?;
        let total = all.len();
        let total_pages = total.div_ceil(WARNINGS_PER_PAGE);

        if total == 0 && page == 1 {
            return Ok(WarningPage {
                warnings: Vec::new(),
                page,
                total_pages,
                total,
            });
        }
        if page == 0 || page > total_pages {
            return Err(ModerationError::PageOutOfRange { total_pages });
        }

        let warnings = all
            .into_iter()
            .skip((page - 1) * WARNINGS_PER_PAGE)
            .take(WARNINGS_PER_PAGE)
            .collect();

        Ok(WarningPage {
            warnings,
            page,
            total_pages,
            total,
        })
    }

    pub async fn record_temp_ban(
        &self,
        guild_id: u64,
        user_id: u64,
        banned_until: DateTime<Utc>,
    ) -> Result<(), ModerationError> {
        self.store
            .upsert_temp_ban(&TempBan {
                guild_id,
                user_id,
                banned_until,
            })
            .await
    }

    /// Forget a pending automatic unban. Returns `false` if there was none.
    pub async fn clear_temp_ban(&self, guild_id: u64, user_id: u64) -> Result<bool, ModerationError> {
        self.store.delete_temp_ban(guild_id, user_id).await
    }

    pub async fn due_bans(&self, now: DateTime<Utc>) -> Result<Vec<TempBan>, ModerationError> {
        self.store.due_temp_bans(now).await
    }
}

// ============================================================================
// TESTS
// ============================================================================
