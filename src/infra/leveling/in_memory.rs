// In-memory implementation of ProgressionStore.
//
// Lets the leveling rules run end to end without SQLite in tests of the
// Discord-side formatting.

use crate::core::leveling::{AppliedAward, LevelCurve, LevelingError, Progression, ProgressionStore};
use async_trait::async_trait;
use dashmap::DashMap;

/// A composite key for looking up progression.
/// We need both guild_id AND user_id since users can be in multiple guilds.
#[derive(Hash, Eq, PartialEq, Clone, Copy, Debug)]
struct GuildUserKey {
    guild_id: u64,
    user_id: u64,
}

#[derive(Clone, Copy, Debug, Default)]
struct StoredProgress {
    xp: u64,
    level: u32,
}

/// **DashMap:**
/// A concurrent HashMap that is safe to use across async tasks without a
/// Mutex. The entry API gives per-key atomic read-modify-write, which is what
/// `apply_award` needs.
#[derive(Default)]
pub struct InMemoryProgressionStore {
    data: DashMap<GuildUserKey, StoredProgress>,
}

#[async_trait]
impl ProgressionStore for InMemoryProgressionStore {
    async fn get_progress(
        &self,
        user_id: u64,
        guild_id: u64,
    ) -> Result<Option<Progression>, LevelingError> {
        let key = GuildUserKey { guild_id, user_id };
        Ok(self.data.get(&key).map(|entry| Progression {
            user_id,
            guild_id,
            xp: entry.xp,
            level: entry.level,
        }))
    }

    async fn apply_award(
        &self,
        user_id: u64,
        guild_id: u64,
        amount: u64,
        curve: LevelCurve,
    ) -> Result<AppliedAward, LevelingError> {
        let key = GuildUserKey { guild_id, user_id };

        // The entry guard holds the shard lock for the whole update.
        let mut entry = self.data.entry(key).or_default();
        let previous_level = entry.level;
        entry.xp = entry.xp.saturating_add(amount); // saturating_add prevents overflow
        entry.level = curve.next_level(entry.level, entry.xp);

        Ok(AppliedAward {
            previous_level,
            progression: Progression {
                user_id,
                guild_id,
                xp: entry.xp,
                level: entry.level,
            },
        })
    }

    async fn count_ahead(&self, guild_id: u64, xp: u64) -> Result<u64, LevelingError> {
        Ok(self
            .data
            .iter()
            .filter(|entry| entry.key().guild_id == guild_id && entry.value().xp > xp)
            .count() as u64)
    }

    async fn top(&self, guild_id: u64, limit: usize) -> Result<Vec<Progression>, LevelingError> {
        let mut users: Vec<Progression> = self
            .data
            .iter()
            .filter(|entry| entry.key().guild_id == guild_id)
            .map(|entry| Progression {
                user_id: entry.key().user_id,
                guild_id,
                xp: entry.value().xp,
                level: entry.value().level,
            })
            .collect();

        // Highest XP first, stable by user id
        users.sort_by(|a, b| b.xp.cmp(&a.xp).then(a.user_id.cmp(&b.user_id)));
        users.truncate(limit);

        Ok(users)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_in_memory_store() {
        let store = InMemoryProgressionStore::default();
        let curve = LevelCurve::default();

        // Initially, the user has no record
        assert!(store.get_progress(123, 456).await.unwrap().is_none());

        store.apply_award(123, 456, 100, curve).await.unwrap();
        let applied = store.apply_award(123, 456, 50, curve).await.unwrap();

        assert_eq!(applied.previous_level, 0);
        assert_eq!(applied.progression.xp, 150);
        assert_eq!(applied.progression.level, 1);
    }

    #[tokio::test]
    async fn test_leaderboard() {
        let store = InMemoryProgressionStore::default();
        let curve = LevelCurve::default();

        store.apply_award(1, 100, 500, curve).await.unwrap();
        store.apply_award(2, 100, 300, curve).await.unwrap();
        store.apply_award(3, 100, 700, curve).await.unwrap();
        store.apply_award(5, 100, 300, curve).await.unwrap();
        store.apply_award(4, 200, 400, curve).await.unwrap(); // Different guild

        let top = store.top(100, 10).await.unwrap();
        let ids: Vec<u64> = top.iter().map(|p| p.user_id).collect();
        assert_eq!(ids, vec![3, 1, 2, 5]);

        assert_eq!(store.count_ahead(100, 300).await.unwrap(), 2);
        assert_eq!(store.top(100, 1).await.unwrap().len(), 1);
    }
}
