use std::time::Duration;

use thiserror::Error;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SettingsError {
    #[error("quest shape dimensions must all be > 0")]
    EmptyShape,

    #[error("quest shape needs {needed} levels but only {available} difficulties exist")]
    TooManyLevels { needed: usize, available: usize },

    #[error("hearts must be > 0")]
    InvalidHearts,

    #[error("hint cost must be > 0")]
    InvalidHintCost,

    #[error("reveal cost must be > 0")]
    InvalidRevealCost,

    #[error("minimum advance delay must be <= maximum advance delay")]
    InvalidAdvanceBounds,

    #[error("hint display must be between 500 and 30000 ms")]
    InvalidHintDisplay,
}

//
// ─── QUEST SHAPE ───────────────────────────────────────────────────────────────
//

/// Fixed dimensions of the progression tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuestShape {
    levels: usize,
    rounds_per_level: usize,
    sub_rounds_per_round: usize,
    questions_per_sub_round: usize,
}

impl QuestShape {
    /// 3 levels × 10 rounds × 5 sub-rounds × 10 questions.
    #[must_use]
    pub fn standard() -> Self {
        Self {
            levels: 3,
            rounds_per_level: 10,
            sub_rounds_per_round: 5,
            questions_per_sub_round: 10,
        }
    }

    /// Custom tree dimensions, mostly useful for small test trees.
    ///
    /// # Errors
    ///
    /// Returns `SettingsError::EmptyShape` if any dimension is zero and
    /// `SettingsError::TooManyLevels` if there are more levels than difficulties.
    pub fn new(
        levels: usize,
        rounds_per_level: usize,
        sub_rounds_per_round: usize,
        questions_per_sub_round: usize,
    ) -> Result<Self, SettingsError> {
        if levels == 0
            || rounds_per_level == 0
            || sub_rounds_per_round == 0
            || questions_per_sub_round == 0
        {
            return Err(SettingsError::EmptyShape);
        }
        let available = crate::model::Difficulty::ALL.len();
        if levels > available {
            return Err(SettingsError::TooManyLevels {
                needed: levels,
                available,
            });
        }
        Ok(Self {
            levels,
            rounds_per_level,
            sub_rounds_per_round,
            questions_per_sub_round,
        })
    }

    #[must_use]
    pub fn levels(&self) -> usize {
        self.levels
    }

    #[must_use]
    pub fn rounds_per_level(&self) -> usize {
        self.rounds_per_level
    }

    #[must_use]
    pub fn sub_rounds_per_round(&self) -> usize {
        self.sub_rounds_per_round
    }

    #[must_use]
    pub fn questions_per_sub_round(&self) -> usize {
        self.questions_per_sub_round
    }
}

impl Default for QuestShape {
    fn default() -> Self {
        Self::standard()
    }
}

//
// ─── SESSION SETTINGS ──────────────────────────────────────────────────────────
//

/// Economy and pacing rules for a single play session.
///
/// "Currency" here is the in-session spendable star counter used for hints and
/// reveals. It is unrelated to the reward stars a session earns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSettings {
    hearts: u32,
    starting_currency: u32,
    hint_cost: u32,
    reveal_cost: u32,
    advance_ms_per_char: u32,
    min_advance_ms: u32,
    max_advance_ms: u32,
    hint_display_ms: u32,
}

impl SessionSettings {
    /// Default rules:
    /// - 5 hearts, 100 currency
    /// - hint costs 10, reveal costs 20
    /// - advance after 60 ms per prompt character, clamped to 1.5–6 s
    /// - hints stay on screen for 3 s
    #[must_use]
    pub fn standard() -> Self {
        Self {
            hearts: 5,
            starting_currency: 100,
            hint_cost: 10,
            reveal_cost: 20,
            advance_ms_per_char: 60,
            min_advance_ms: 1_500,
            max_advance_ms: 6_000,
            hint_display_ms: 3_000,
        }
    }

    /// Creates custom session rules.
    ///
    /// # Errors
    ///
    /// Returns `SettingsError` if hearts or costs are zero, the advance bounds
    /// are inverted, or the hint display time is out of range.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        hearts: u32,
        starting_currency: u32,
        hint_cost: u32,
        reveal_cost: u32,
        advance_ms_per_char: u32,
        min_advance_ms: u32,
        max_advance_ms: u32,
        hint_display_ms: u32,
    ) -> Result<Self, SettingsError> {
        if hearts == 0 {
            return Err(SettingsError::InvalidHearts);
        }
        if hint_cost == 0 {
            return Err(SettingsError::InvalidHintCost);
        }
        if reveal_cost == 0 {
            return Err(SettingsError::InvalidRevealCost);
        }
        if min_advance_ms > max_advance_ms {
            return Err(SettingsError::InvalidAdvanceBounds);
        }
        if !(500..=30_000).contains(&hint_display_ms) {
            return Err(SettingsError::InvalidHintDisplay);
        }

        Ok(Self {
            hearts,
            starting_currency,
            hint_cost,
            reveal_cost,
            advance_ms_per_char,
            min_advance_ms,
            max_advance_ms,
            hint_display_ms,
        })
    }

    #[must_use]
    pub fn hearts(&self) -> u32 {
        self.hearts
    }

    #[must_use]
    pub fn starting_currency(&self) -> u32 {
        self.starting_currency
    }

    #[must_use]
    pub fn hint_cost(&self) -> u32 {
        self.hint_cost
    }

    #[must_use]
    pub fn reveal_cost(&self) -> u32 {
        self.reveal_cost
    }

    #[must_use]
    pub fn hint_display(&self) -> Duration {
        Duration::from_millis(u64::from(self.hint_display_ms))
    }

    /// Read-aloud pacing before moving on from a question with this prompt.
    #[must_use]
    pub fn advance_delay(&self, prompt: &str) -> Duration {
        let chars = u64::try_from(prompt.chars().count()).unwrap_or(u64::MAX);
        let raw = chars.saturating_mul(u64::from(self.advance_ms_per_char));
        let ms = raw.clamp(
            u64::from(self.min_advance_ms),
            u64::from(self.max_advance_ms),
        );
        Duration::from_millis(ms)
    }
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self::standard()
    }
}
