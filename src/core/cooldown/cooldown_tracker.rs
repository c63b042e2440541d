// Cooldown bookkeeping shared by XP awards and rate-limited fun commands.
//
// The tracker is an explicit value owned by whichever service needs it, so
// each caller picks its own key (for XP that is `(guild_id, user_id)`) and
// tests can drive it with their own `Instant`s.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::hash::Hash;
use std::time::{Duration, Instant};

/// A successful claim on a cooldown slot.
///
/// Holds the previous timestamp so the claim can be undone when the guarded
/// operation fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CooldownClaim {
    previous: Option<Instant>,
}

pub struct CooldownTracker<K: Hash + Eq> {
    window: Duration,
    last_seen: DashMap<K, Instant>,
}

impl<K: Hash + Eq + Clone> CooldownTracker<K> {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            last_seen: DashMap::new(),
        }
    }

    /// Atomically check the window for `key` and, if it has passed, stamp
    /// `now` into it.
    ///
    /// Returns the remaining wait when the key is still cooling down. The
    /// check and the stamp happen under one shard lock, so two callers racing
    /// on the same key cannot both get a claim.
    pub fn try_claim(&self, key: K, now: Instant) -> Result<CooldownClaim, Duration> {
        match self.last_seen.entry(key) {
            Entry::Occupied(mut entry) => {
                let elapsed = now.saturating_duration_since(*entry.get());
                if elapsed < self.window {
                    return Err(self.window - elapsed);
                }
                let previous = entry.insert(now);
                Ok(CooldownClaim {
                    previous: Some(previous),
                })
            }
            Entry::Vacant(entry) => {
                entry.insert(now);
                Ok(CooldownClaim { previous: None })
            }
        }
    }

    /// Undo a claim whose guarded work did not happen.
    pub fn release(&self, key: K, claim: CooldownClaim) {
        match claim.previous {
            Some(previous) => {
                self.last_seen.insert(key, previous);
            }
            None => {
                self.last_seen.remove(&key);
            }
        }
    }

    /// Time left before `key` may claim again, if any.
    #[cfg(test)]
    pub fn remaining(&self, key: &K, now: Instant) -> Option<Duration> {
        let last = *self.last_seen.get(key)?;
        let elapsed = now.saturating_duration_since(last);
        (elapsed < self.window).then(|| self.window - elapsed)
    }

    /// Drop entries whose window has passed. Returns how many were removed.
    pub fn purge_expired(&self, now: Instant) -> usize {
        let before = self.last_seen.len();
        self.last_seen
            .retain(|_, last| now.saturating_duration_since(*last) < self.window);
        before - self.last_seen.len()
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.last_seen.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WINDOW: Duration = Duration::from_secs(30);

    #[test]
    fn first_claim_succeeds_and_second_is_rejected() {
        let tracker = CooldownTracker::new(WINDOW);
        let start = Instant::now();

        assert!(tracker.try_claim(1_u64, start).is_ok());

        let remaining = tracker
            .try_claim(1, start + Duration::from_secs(10))
            .unwrap_err();
        assert_eq!(remaining, Duration::from_secs(20));
    }

    #[test]
    fn claim_succeeds_again_once_window_passes() {
        let tracker = CooldownTracker::new(WINDOW);
        let start = Instant::now();

        tracker.try_claim(1_u64, start).unwrap();
        assert!(tracker.try_claim(1, start + WINDOW).is_ok());
    }

    #[test]
    fn keys_do_not_share_a_window() {
        let tracker = CooldownTracker::new(WINDOW);
        let start = Instant::now();

        tracker.try_claim((10_u64, 1_u64), start).unwrap();
        assert!(tracker.try_claim((20, 1), start).is_ok());
        assert!(tracker.try_claim((10, 2), start).is_ok());
        assert!(tracker.try_claim((10, 1), start).is_err());
    }

    #[test]
    fn release_restores_previous_state() {
        let tracker = CooldownTracker::new(WINDOW);
        let start = Instant::now();

        let claim = tracker.try_claim(7_u64, start).unwrap();
        tracker.release(7, claim);
        assert_eq!(tracker.len(), 0);
        assert!(tracker.try_claim(7, start).is_ok());

        let later = start + WINDOW;
        let claim = tracker.try_claim(7, later).unwrap();
        tracker.release(7, claim);
        assert_eq!(tracker.remaining(&7, later), None);
        assert_eq!(
            tracker.remaining(&7, start + Duration::from_secs(5)),
            Some(Duration::from_secs(25))
        );
    }

    #[test]
    fn purge_drops_only_expired_entries() {
        let tracker = CooldownTracker::new(WINDOW);
        let start = Instant::now();

        tracker.try_claim(1_u64, start).unwrap();
        tracker
            .try_claim(2, start + Duration::from_secs(20))
            .unwrap();

        let removed = tracker.purge_expired(start + Duration::from_secs(35));
        assert_eq!(removed, 1);
        assert_eq!(tracker.len(), 1);
    }
}
