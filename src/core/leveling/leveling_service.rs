// This is the leveling module - it contains ALL the business logic for the leveling system.
// It has NO Discord-specific code (no serenity, no poise imports) and works with
// primitive ids, so the message handler and the slash commands share it.

use async_trait::async_trait;
use std::time::{Duration, Instant};
use thiserror::Error;

use super::level_curve::LevelCurve;
use super::leveling_models::{AppliedAward, AwardedXp, ProgressSnapshot, Progression, XpAward};
use crate::core::cooldown::CooldownTracker;

/// XP granted for one chat message.
pub const DEFAULT_XP_PER_MESSAGE: u64 = 15;
/// Minimum gap between two awards for the same member of a guild.
pub const DEFAULT_XP_COOLDOWN: Duration = Duration::from_secs(30);

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, Error)]
pub enum LevelingError {
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error("Invalid user or guild ID")]
    InvalidId,
}

// ============================================================================
// STORAGE TRAIT (PORT)
// ============================================================================

/// Persistence for per-guild progression records.
///
/// Implemented by the SQLite store for production and by the in-memory store
/// for tests and ephemeral runs.
#[async_trait]
pub trait ProgressionStore: Send + Sync {
    /// A user's record in a guild, or `None` if they never earned XP there.
    async fn get_progress(
        &self,
        user_id: u64,
        guild_id: u64,
    ) -> Result<Option<Progression>, LevelingError>;

    /// Add `amount` XP (creating the record at XP 0, level 0 if needed) and
    /// step the level along `curve`, as one atomic update.
    async fn apply_award(
        &self,
        user_id: u64,
        guild_id: u64,
        amount: u64,
        curve: LevelCurve,
    ) -> Result<AppliedAward, LevelingError>;

    /// How many users in the guild have strictly more XP than `xp`.
    async fn count_ahead(&self, guild_id: u64, xp: u64) -> Result<u64, LevelingError>;

    /// Highest-XP users first, ties broken by ascending user id.
    async fn top(&self, guild_id: u64, limit: usize) -> Result<Vec<Progression>, LevelingError>;
}

// ============================================================================
// CORE SERVICE
// ============================================================================

pub struct LevelingService<S: ProgressionStore> {
    store: S,
    curve: LevelCurve,
    xp_per_message: u64,
    /// Keyed by `(guild_id, user_id)`.
    cooldowns: CooldownTracker<(u64, u64)>,
}

impl<S: ProgressionStore> LevelingService<S> {
    #[cfg(test)]
    pub fn new(store: S) -> Self {
        Self::with_settings(
            store,
            DEFAULT_XP_PER_MESSAGE,
            DEFAULT_XP_COOLDOWN,
            LevelCurve::default(),
        )
    }

    pub fn with_settings(
        store: S,
        xp_per_message: u64,
        cooldown: Duration,
        curve: LevelCurve,
    ) -> Self {
        Self {
            store,
            curve,
            xp_per_message,
            cooldowns: CooldownTracker::new(cooldown),
        }
    }

    fn validate_ids(user_id: u64, guild_id: u64) -> Result<(), LevelingError> {
        if user_id == 0 || guild_id == 0 {
            Err(LevelingError::InvalidId)
        } else {
            Ok(())
        }
    }

    pub fn threshold_for_level(&self, level: u32) -> u64 {
        self.curve.threshold_for_level(level)
    }

    /// Award the per-message amount for a chat message.
    pub async fn award_message_xp(
        &self,
        user_id: u64,
        guild_id: u64,
    ) -> Result<XpAward, LevelingError> {
        self.award_xp(user_id, guild_id, self.xp_per_message as i64)
            .await
    }

    pub async fn award_xp(
        &self,
        user_id: u64,
        guild_id: u64,
        amount: i64,
    ) -> Result<XpAward, LevelingError> {
        self.award_xp_at(user_id, guild_id, amount, Instant::now())
            .await
    }

    /// Award XP as of `now`.
    ///
    /// Skipped awards (non-positive amount, cooldown) return without touching
    /// the store. The cooldown slot is claimed before the write and handed
    /// back if the write fails, so a storage error neither applies XP nor
    /// burns the window.
    pub async fn award_xp_at(
        &self,
        user_id: u64,
        guild_id: u64,
        amount: i64,
        now: Instant,
    ) -> Result<XpAward, LevelingError> {
        Self::validate_ids(user_id, guild_id)?;

        if amount <= 0 {
            return Ok(XpAward::NotPositive);
        }

        let key = (guild_id, user_id);
        let claim = match self.cooldowns.try_claim(key, now) {
            Ok(claim) => claim,
            Err(remaining) => {
                tracing::debug!(user_id, guild_id, ?remaining, "XP award on cooldown");
                return Ok(XpAward::OnCooldown(remaining));
            }
        };

        match self
            .store
            .apply_award(user_id, guild_id, amount as u64, self.curve)
            .await
        {
            Ok(applied) => Ok(XpAward::Applied(AwardedXp {
                user_id,
                guild_id,
                total_xp: applied.progression.xp,
                old_level: applied.previous_level,
                new_level: applied.progression.level,
            })),
            Err(e) => {
                self.cooldowns.release(key, claim);
                Err(e)
            }
        }
    }

    /// 1-based position in the guild by descending XP. Tied users share the
    /// best rank.
    pub async fn get_rank(&self, user_id: u64, guild_id: u64) -> Result<Option<u64>, LevelingError> {
        Self::validate_ids(user_id, guild_id)?;

        let Some(progress) = self.store.get_progress(user_id, guild_id).await? else {
            return Ok(None);
        };
        let ahead = self.store.count_ahead(guild_id, progress.xp).await?;
        Ok(Some(ahead + 1))
    }

    pub async fn get_top_ranks(
        &self,
        guild_id: u64,
        limit: usize,
    ) -> Result<Vec<Progression>, LevelingError> {
        if guild_id == 0 {
            return Err(LevelingError::InvalidId);
        }
        if limit == 0 {
            return Ok(Vec::new());
        }

        let mut entries = self.store.top(guild_id, limit).await?;
        entries.truncate(limit);
        Ok(entries)
    }

    /// XP, level, next threshold and rank, for the rank card.
    pub async fn get_progress(
        &self,
        user_id: u64,
        guild_id: u64,
    ) -> Result<ProgressSnapshot, LevelingError> {
        Self::validate_ids(user_id, guild_id)?;

        let progress = self
            .store
            .get_progress(user_id, guild_id)
            .await?
            .unwrap_or_else(|| Progression::empty(user_id, guild_id));
        let rank = self.get_rank(user_id, guild_id).await?;

        Ok(ProgressSnapshot {
            xp: progress.xp,
            level: progress.level,
            next_level_xp: self.curve.threshold_for_level(progress.level),
            rank,
        })
    }

    /// Forget cooldown entries that can no longer block an award.
    pub fn purge_cooldowns(&self, now: Instant) -> usize {
        self.cooldowns.purge_expired(now)
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use dashmap::DashMap;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    const GUILD: u64 = 900;

    #[derive(Default)]
    struct MockStore {
        rows: DashMap<(u64, u64), Progression>,
        failing: AtomicBool,
    }

    impl MockStore {
        fn check(&self) -> Result<(), LevelingError> {
            if self.failing.load(Ordering::SeqCst) {
                Err(LevelingError::StorageUnavailable("db down".into()))
            } else {
                Ok(())
            }
        }

        fn seed(&self, user_id: u64, guild_id: u64, xp: u64, level: u32) {
            self.rows.insert(
                (guild_id, user_id),
                Progression {
                    user_id,
                    guild_id,
                    xp,
                    level,
                },
            );
        }
    }

    #[async_trait]
    impl ProgressionStore for Arc<MockStore> {
        async fn get_progress(
            &self,
            user_id: u64,
            guild_id: u64,
        ) -> Result<Option<Progression>, LevelingError> {
            self.check()?;
            Ok(self.rows.get(&(guild_id, user_id)).map(|r| r.value().clone()))
        }

        async fn apply_award(
            &self,
            user_id: u64,
            guild_id: u64,
            amount: u64,
            curve: LevelCurve,
        ) -> Result<AppliedAward, LevelingError> {
            self.check()?;
            let mut row = self
                .rows
                .entry((guild_id, user_id))
                .or_insert_with(|| Progression::empty(user_id, guild_id));
            let previous_level = row.level;
            row.xp += amount;
            row.level = curve.next_level(row.level, row.xp);
            Ok(AppliedAward {
                previous_level,
                progression: row.value().clone(),
            })
        }

        async fn count_ahead(&self, guild_id: u64, xp: u64) -> Result<u64, LevelingError> {
            self.check()?;
            Ok(self
                .rows
                .iter()
                .filter(|r| r.guild_id == guild_id && r.xp > xp)
                .count() as u64)
        }

        async fn top(
            &self,
            guild_id: u64,
            limit: usize,
        ) -> Result<Vec<Progression>, LevelingError> {
            self.check()?;
            let mut rows: Vec<Progression> = self
                .rows
                .iter()
                .filter(|r| r.guild_id == guild_id)
                .map(|r| r.value().clone())
                .collect();
            rows.sort_by(|a, b| b.xp.cmp(&a.xp).then(a.user_id.cmp(&b.user_id)));
            rows.truncate(limit);
            Ok(rows)
        }
    }

    fn make_service() -> (Arc<MockStore>, LevelingService<Arc<MockStore>>) {
        let store = Arc::new(MockStore::default());
        let service = LevelingService::new(store.clone());
        (store, service)
    }

    fn applied(award: XpAward) -> AwardedXp {
        match award {
            XpAward::Applied(awarded) => awarded,
            other => panic!("expected an applied award, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn first_award_creates_the_record() {
        let (store, service) = make_service();

        let award = service.award_xp(1, GUILD, 15).await.unwrap();

        assert!(award.level_up().is_none());
        let awarded = applied(award);
        assert_eq!(awarded.total_xp, 15);
        assert_eq!(awarded.new_level, 0);
        assert_eq!(store.rows.get(&(GUILD, 1)).unwrap().xp, 15);
    }

    #[tokio::test]
    async fn second_award_inside_the_window_is_a_no_op() {
        let (store, service) = make_service();
        let start = Instant::now();

        service.award_xp_at(1, GUILD, 15, start).await.unwrap();
        let second = service
            .award_xp_at(1, GUILD, 15, start + Duration::from_secs(29))
            .await
            .unwrap();

        assert_eq!(second, XpAward::OnCooldown(Duration::from_secs(1)));
        assert!(second.level_up().is_none());
        assert_eq!(store.rows.get(&(GUILD, 1)).unwrap().xp, 15);

        let third = service
            .award_xp_at(1, GUILD, 15, start + Duration::from_secs(30))
            .await
            .unwrap();
        assert_eq!(applied(third).total_xp, 30);
    }

    #[tokio::test]
    async fn cooldown_is_per_guild() {
        let (_, service) = make_service();
        let now = Instant::now();

        service.award_xp_at(1, GUILD, 15, now).await.unwrap();
        let elsewhere = service.award_xp_at(1, GUILD + 1, 15, now).await.unwrap();

        assert!(matches!(elsewhere, XpAward::Applied(_)));
    }

    #[tokio::test]
    async fn non_positive_amounts_are_ignored() {
        let (store, service) = make_service();
        store.seed(1, GUILD, 40, 0);

        for amount in [0, -10] {
            let award = service.award_xp(1, GUILD, amount).await.unwrap();
            assert_eq!(award, XpAward::NotPositive);
        }
        assert_eq!(store.rows.get(&(GUILD, 1)).unwrap().xp, 40);

        // A skipped award must not start the cooldown.
        assert!(matches!(
            service.award_xp(1, GUILD, 15).await.unwrap(),
            XpAward::Applied(_)
        ));
    }

    #[tokio::test]
    async fn skipped_awards_stay_silent_while_storage_is_down() {
        let (store, service) = make_service();
        let now = Instant::now();
        service.award_xp_at(1, GUILD, 15, now).await.unwrap();

        store.failing.store(true, Ordering::SeqCst);

        let cooling = service
            .award_xp_at(1, GUILD, 15, now + Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(cooling, XpAward::OnCooldown(Duration::from_secs(25)));
        assert_eq!(
            service.award_xp_at(1, GUILD, 0, now).await.unwrap(),
            XpAward::NotPositive
        );
    }

    #[tokio::test]
    async fn crossing_the_threshold_levels_up_once() {
        let (store, service) = make_service();
        store.seed(1, GUILD, 90, 0);

        let award = service.award_xp(1, GUILD, 15).await.unwrap();

        let event = award.level_up().unwrap();
        assert_eq!(event.old_level, 0);
        assert_eq!(event.new_level, 1);
        assert_eq!(event.total_xp, 105);
    }

    #[tokio::test]
    async fn landing_exactly_on_the_threshold_does_not_level() {
        let (store, service) = make_service();
        store.seed(1, GUILD, 85, 0);

        let award = service.award_xp(1, GUILD, 15).await.unwrap();

        assert!(award.level_up().is_none());
        assert_eq!(applied(award).total_xp, 100);
    }

    #[tokio::test]
    async fn a_huge_award_moves_a_single_level() {
        let (_, service) = make_service();

        let awarded = applied(service.award_xp(1, GUILD, 50_000).await.unwrap());

        assert_eq!(awarded.old_level, 0);
        assert_eq!(awarded.new_level, 1);
    }

    #[tokio::test]
    async fn failed_write_releases_the_cooldown() {
        let (store, service) = make_service();
        let now = Instant::now();

        store.failing.store(true, Ordering::SeqCst);
        let err = service.award_xp_at(1, GUILD, 15, now).await.unwrap_err();
        assert!(matches!(err, LevelingError::StorageUnavailable(_)));

        store.failing.store(false, Ordering::SeqCst);
        let retry = service.award_xp_at(1, GUILD, 15, now).await.unwrap();
        assert!(matches!(retry, XpAward::Applied(_)));
    }

    #[tokio::test]
    async fn concurrent_awards_apply_once() {
        let store = Arc::new(MockStore::default());
        let service = Arc::new(LevelingService::new(store.clone()));
        let now = Instant::now();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let service = service.clone();
                tokio::spawn(async move { service.award_xp_at(1, GUILD, 15, now).await })
            })
            .collect();

        let mut applied = 0;
        for handle in handles {
            if matches!(handle.await.unwrap().unwrap(), XpAward::Applied(_)) {
                applied += 1;
            }
        }

        assert_eq!(applied, 1);
        assert_eq!(store.rows.get(&(GUILD, 1)).unwrap().xp, 15);
    }

    #[tokio::test]
    async fn rank_is_absent_without_a_record() {
        let (_, service) = make_service();
        assert_eq!(service.get_rank(1, GUILD).await.unwrap(), None);
    }

    #[tokio::test]
    async fn tied_users_share_the_best_rank() {
        let (store, service) = make_service();
        store.seed(1, GUILD, 500, 3);
        store.seed(2, GUILD, 300, 2);
        store.seed(3, GUILD, 300, 2);
        store.seed(4, GUILD, 10, 0);

        assert_eq!(service.get_rank(1, GUILD).await.unwrap(), Some(1));
        assert_eq!(service.get_rank(2, GUILD).await.unwrap(), Some(2));
        assert_eq!(service.get_rank(3, GUILD).await.unwrap(), Some(2));
        assert_eq!(service.get_rank(4, GUILD).await.unwrap(), Some(4));
    }

    #[tokio::test]
    async fn storage_errors_are_not_reported_as_missing() {
        let (store, service) = make_service();
        store.failing.store(true, Ordering::SeqCst);

        let err = service.get_rank(1, GUILD).await.unwrap_err();
        assert!(matches!(err, LevelingError::StorageUnavailable(_)));
    }

    #[tokio::test]
    async fn top_ranks_are_bounded_and_sorted() {
        let (store, service) = make_service();
        for user in 1..=15 {
            store.seed(user, GUILD, (user * 37) % 400, 0);
        }
        store.seed(99, GUILD + 1, 10_000, 9);

        let top = service.get_top_ranks(GUILD, 10).await.unwrap();

        assert_eq!(top.len(), 10);
        assert!(top.windows(2).all(|w| w[0].xp >= w[1].xp));
        assert!(top.iter().all(|p| p.guild_id == GUILD));
        assert!(service.get_top_ranks(GUILD, 0).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn progress_snapshot_includes_next_threshold() {
        let (store, service) = make_service();
        store.seed(1, GUILD, 130, 1);
        store.seed(2, GUILD, 200, 2);

        let snapshot = service.get_progress(1, GUILD).await.unwrap();
        assert_eq!(snapshot.xp, 130);
        assert_eq!(snapshot.level, 1);
        assert_eq!(snapshot.next_level_xp, 120);
        assert_eq!(snapshot.rank, Some(2));

        let fresh = service.get_progress(3, GUILD).await.unwrap();
        assert_eq!(fresh.xp, 0);
        assert_eq!(fresh.next_level_xp, 100);
        assert_eq!(fresh.rank, None);
    }

    #[tokio::test]
    async fn zero_ids_are_rejected() {
        let (_, service) = make_service();
        assert!(matches!(
            service.award_xp(0, GUILD, 15).await,
            Err(LevelingError::InvalidId)
        ));
        assert!(matches!(
            service.get_top_ranks(0, 5).await,
            Err(LevelingError::InvalidId)
        ));
    }

    #[test]
    fn leveling_error_messages_are_descriptive() {
        let storage_error = LevelingError::StorageUnavailable("db down".into());
        assert!(storage_error.to_string().contains("db down"));
        assert_eq!(LevelingError::InvalidId.to_string(), "Invalid user or guild ID");
    }
}
