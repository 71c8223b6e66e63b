//! Level calculation
//!
//! Maps cumulative XP to a level with a smooth square-root curve:
//!
//! - `level(xp) = floor(sqrt(xp / 50)) + 1`
//! - `xp_for_level(n) = 50 * (n - 1)^2`
//!
//! Level 1 starts at 0 XP, level 2 at 50 XP, level 3 at 200 XP, level 7 at 1800 XP.
//! The inverse is only used for progress display; reward math never needs it.

use serde::{Deserialize, Serialize};

/// XP scale of the level curve
const XP_PER_LEVEL_UNIT: u64 = 50;

/// Level reached with `total_xp` cumulative XP (always ≥ 1)
pub fn level_for_xp(total_xp: u64) -> u32 {
    // floor(sqrt(x / 50)) == isqrt(floor(x / 50)) for every non-negative x
    let level = isqrt(total_xp / XP_PER_LEVEL_UNIT) + 1;
    u32::try_from(level).unwrap_or(u32::MAX)
}

/// Cumulative XP at which `level` begins
pub fn xp_for_level(level: u32) -> u64 {
    let steps = u64::from(level.saturating_sub(1));
    XP_PER_LEVEL_UNIT.saturating_mul(steps.saturating_mul(steps))
}

/// Integer square root (floor)
fn isqrt(n: u64) -> u64 {
    if n < 2 {
        return n;
    }
    let mut x = (n as f64).sqrt() as u64;
    // Float estimate can be off by one near large perfect squares
    while x.saturating_mul(x) > n {
        x -= 1;
    }
    while (x + 1).saturating_mul(x + 1) <= n {
        x += 1;
    }
    x
}

/// Progress through the current level, for progress-bar display
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LevelProgress {
    /// Current level
    pub level: u32,
    /// Cumulative XP
    pub total_xp: u64,
    /// XP earned since the current level began
    pub xp_into_level: u64,
    /// XP still needed to reach the next level
    pub xp_to_next_level: u64,
    /// Fraction of the current level completed (0.0-1.0)
    pub fraction: f64,
}

impl LevelProgress {
    /// Compute level progress for a cumulative XP total
    pub fn from_total_xp(total_xp: u64) -> Self {
        let level = level_for_xp(total_xp);
        let floor = xp_for_level(level);
        let ceiling = xp_for_level(level.saturating_add(1));
        let span = ceiling.saturating_sub(floor);
        let xp_into_level = total_xp.saturating_sub(floor);

        let fraction = if span == 0 {
            1.0
        } else {
            (xp_into_level as f64 / span as f64).clamp(0.0, 1.0)
        };

        Self {
            level,
            total_xp,
            xp_into_level,
            xp_to_next_level: ceiling.saturating_sub(total_xp),
            fraction,
        }
    }
}
