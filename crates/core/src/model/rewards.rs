use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

//
// ─── DIFFICULTY ────────────────────────────────────────────────────────────────
//

/// Difficulty tier of a Level. One Level exists per tier, in this order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Difficulty {
    Easy,
    Normal,
    Hard,
}

impl Difficulty {
    pub const ALL: [Difficulty; 3] = [Difficulty::Easy, Difficulty::Normal, Difficulty::Hard];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Normal => "normal",
            Difficulty::Hard => "hard",
        }
    }

    /// Difficulty of the level at `index`, if one exists.
    #[must_use]
    pub fn from_level_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

//
// ─── REWARDS ───────────────────────────────────────────────────────────────────
//

/// Treasure Box contents granted when a Round or Level completes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rewards {
    pub stars: u32,
    pub badges: BTreeSet<String>,
    pub prizes: BTreeSet<String>,
}

impl Rewards {
    #[must_use]
    pub fn new(stars: u32, badges: BTreeSet<String>, prizes: BTreeSet<String>) -> Self {
        Self {
            stars,
            badges,
            prizes,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stars == 0 && self.badges.is_empty() && self.prizes.is_empty()
    }
}

/// Decides what each Round and Level Treasure Box holds.
///
/// Round boxes start with zero stars; the round's earned stars are written in
/// when it completes. Level boxes carry a fixed bonus per difficulty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewardTable {
    easy_bonus: u32,
    normal_bonus: u32,
    hard_bonus: u32,
}

impl RewardTable {
    #[must_use]
    pub fn standard() -> Self {
        Self {
            easy_bonus: 10,
            normal_bonus: 20,
            hard_bonus: 30,
        }
    }

    #[must_use]
    pub fn with_level_bonus(easy: u32, normal: u32, hard: u32) -> Self {
        Self {
            easy_bonus: easy,
            normal_bonus: normal,
            hard_bonus: hard,
        }
    }

    #[must_use]
    pub fn level_bonus(&self, difficulty: Difficulty) -> u32 {
        match difficulty {
            Difficulty::Easy => self.easy_bonus,
            Difficulty::Normal => self.normal_bonus,
            Difficulty::Hard => self.hard_bonus,
        }
    }

    /// Treasure Box for round `round` (zero-based) of a level.
    #[must_use]
    pub fn round_box(&self, difficulty: Difficulty, round: usize) -> Rewards {
        let n = round + 1;
        Rewards {
            stars: 0,
            badges: BTreeSet::from([format!("{difficulty}-round-{n}")]),
            prizes: BTreeSet::from([format!("treasure-box-{difficulty}-{n}")]),
        }
    }

    #[must_use]
    pub fn level_box(&self, difficulty: Difficulty) -> Rewards {
        Rewards {
            stars: self.level_bonus(difficulty),
            badges: BTreeSet::from([format!("{difficulty}-champion")]),
            prizes: BTreeSet::from([format!("{difficulty}-trophy")]),
        }
    }
}

impl Default for RewardTable {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn difficulty_follows_level_order() {
        assert_eq!(Difficulty::from_level_index(0), Some(Difficulty::Easy));
        assert_eq!(Difficulty::from_level_index(2), Some(Difficulty::Hard));
        assert_eq!(Difficulty::from_level_index(3), None);
    }

    #[test]
    fn round_box_names_are_one_based() {
        let table = RewardTable::standard();
        let rewards = table.round_box(Difficulty::Normal, 0);
        assert_eq!(rewards.stars, 0);
        assert!(rewards.badges.contains("normal-round-1"));
        assert!(rewards.prizes.contains("treasure-box-normal-1"));
    }

    #[test]
    fn level_box_uses_difficulty_bonus() {
        let table = RewardTable::standard();
        assert_eq!(table.level_box(Difficulty::Easy).stars, 10);
        assert_eq!(table.level_box(Difficulty::Hard).stars, 30);
        assert!(table.level_box(Difficulty::Hard).badges.contains("hard-champion"));
    }
}
