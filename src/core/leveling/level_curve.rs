// The level curve: how much XP a level asks for.

/// XP required to leave level 0.
pub const LEVEL_UP_BASE: f64 = 100.0;
/// Growth factor applied per level.
pub const LEVEL_MULTIPLIER: f64 = 1.2;

/// Exponential, flat (non-cumulative) level curve.
///
/// `threshold_for_level(L)` is compared directly against a user's *total* XP;
/// nothing is subtracted when a level is gained.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LevelCurve {
    base: f64,
    rate: f64,
}

impl Default for LevelCurve {
    fn default() -> Self {
        Self {
            base: LEVEL_UP_BASE,
            rate: LEVEL_MULTIPLIER,
        }
    }
}

impl LevelCurve {
    /// `floor(base * rate^level)`, saturating at `u64::MAX`.
    pub fn threshold_for_level(&self, level: u32) -> u64 {
        (self.base * self.rate.powf(level as f64)).floor() as u64
    }

    /// Level reached after adding XP, given the stored level.
    ///
    /// Moves by at most one step: a single award never skips levels, no
    /// matter how far past the threshold the total lands.
    pub fn next_level(&self, current_level: u32, total_xp: u64) -> u32 {
        if total_xp > self.threshold_for_level(current_level) {
            current_level.saturating_add(1)
        } else {
            current_level
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_thresholds_match_the_curve() {
        let curve = LevelCurve::default();

        assert_eq!(curve.threshold_for_level(0), 100);
        assert_eq!(curve.threshold_for_level(1), 120);
        assert_eq!(curve.threshold_for_level(3), 172);
        assert_eq!(curve.threshold_for_level(10), 619);
    }

    #[test]
    fn thresholds_are_monotonic() {
        let curve = LevelCurve::default();
        let mut previous = curve.threshold_for_level(0);

        for level in 1..120 {
            let current = curve.threshold_for_level(level);
            assert!(current > previous, "level {level}: {current} <= {previous}");
            previous = current;
        }
    }

    #[test]
    fn level_steps_only_when_strictly_above_threshold() {
        let curve = LevelCurve::default();

        assert_eq!(curve.next_level(0, 100), 0);
        assert_eq!(curve.next_level(0, 101), 1);
        assert_eq!(curve.next_level(1, 120), 1);
        assert_eq!(curve.next_level(1, 121), 2);
    }

    #[test]
    fn a_huge_total_still_moves_one_level() {
        let curve = LevelCurve::default();
        assert_eq!(curve.next_level(0, 1_000_000), 1);
        assert_eq!(curve.next_level(4, 1_000_000), 5);
    }

    #[test]
    fn absurd_levels_saturate_instead_of_wrapping() {
        let curve = LevelCurve::default();
        assert_eq!(curve.threshold_for_level(10_000), u64::MAX);
    }
}
