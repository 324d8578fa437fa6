use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::model::ids::{NodeRef, RoundRef, SubRoundRef};
use crate::model::question::Question;
use crate::model::rewards::{Difficulty, RewardTable, Rewards};
use crate::model::settings::QuestShape;

/// Highest star rating a sub-round can hold.
pub const MAX_STARS: u8 = 3;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

/// Tier of the progression tree, used in error reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    Level,
    Round,
    SubRound,
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Tier::Level => "level",
            Tier::Round => "round",
            Tier::SubRound => "sub-round",
        })
    }
}

/// Caller errors at the progression boundary. These indicate bugs in the
/// navigation layer and are never clamped or ignored.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ProgressError {
    #[error("{tier} index {index} is out of range (len {len})")]
    InvalidIndex { tier: Tier, index: usize, len: usize },

    #[error("stars must be between 0 and {max}, got {stars}")]
    InvalidStars { stars: u8, max: u8 },

    #[error("question source returned {got} questions for {at}, expected {expected}")]
    QuestionCount {
        at: SubRoundRef,
        expected: usize,
        got: usize,
    },
}

/// A structural rule the tree breaks. Used to vet restored snapshots.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum InvariantViolation {
    #[error("tree does not match the expected quest shape")]
    ShapeMismatch,

    #[error("more than one playable sub-round: {first} and {second}")]
    MultipleFrontiers {
        first: SubRoundRef,
        second: SubRoundRef,
    },

    #[error("no playable sub-round although the quest is not complete")]
    MissingFrontier,

    #[error("{0} completion flag disagrees with its children")]
    CompletionMismatch(NodeRef),

    #[error("{0} cached star total is stale")]
    StaleTotal(NodeRef),

    #[error("{0} holds more than {MAX_STARS} stars")]
    StarsOutOfRange(SubRoundRef),

    #[error("{0} is unlocked under a locked parent")]
    UnlockedUnderLockedParent(NodeRef),
}

//
// ─── QUESTION SOURCE ───────────────────────────────────────────────────────────
//

/// Supplies the fixed question list for each sub-round when the tree is built.
pub trait QuestionSource {
    /// Questions for `sub_round` of `round`. Must return exactly the
    /// configured sub-round size.
    fn questions_for_sub_round(&self, round: usize, sub_round: usize) -> Vec<Question>;

    /// Level-aware variant used by the tree builder. Sources that vary
    /// selection per level override this.
    fn questions_for(&self, at: SubRoundRef) -> Vec<Question> {
        self.questions_for_sub_round(at.round, at.sub_round)
    }
}

//
// ─── TREE NODES ────────────────────────────────────────────────────────────────
//

/// One playable 10-question session; the atomic unit of progress.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubRound {
    pub(crate) id: SubRoundRef,
    pub(crate) questions: Vec<Question>,
    pub(crate) is_completed: bool,
    pub(crate) is_locked: bool,
    pub(crate) stars: u8,
    pub(crate) max_stars: u8,
}

impl SubRound {
    #[must_use]
    pub fn id(&self) -> SubRoundRef {
        self.id
    }

    #[must_use]
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.is_completed
    }

    #[must_use]
    pub fn is_locked(&self) -> bool {
        self.is_locked
    }

    #[must_use]
    pub fn stars(&self) -> u8 {
        self.stars
    }

    #[must_use]
    pub fn max_stars(&self) -> u8 {
        self.max_stars
    }

    /// Unlocked and not yet completed.
    #[must_use]
    pub fn is_playable(&self) -> bool {
        !self.is_locked && !self.is_completed
    }

    fn reset(&mut self) {
        self.is_completed = false;
        self.is_locked = true;
        self.stars = 0;
    }
}

/// A group of sub-rounds plus its Treasure Box.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Round {
    pub(crate) id: RoundRef,
    pub(crate) sub_rounds: Vec<SubRound>,
    pub(crate) is_completed: bool,
    pub(crate) is_locked: bool,
    pub(crate) total_stars: u32,
    pub(crate) rewards: Rewards,
}

impl Round {
    #[must_use]
    pub fn id(&self) -> RoundRef {
        self.id
    }

    #[must_use]
    pub fn sub_rounds(&self) -> &[SubRound] {
        &self.sub_rounds
    }

    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.is_completed
    }

    #[must_use]
    pub fn is_locked(&self) -> bool {
        self.is_locked
    }

    #[must_use]
    pub fn total_stars(&self) -> u32 {
        self.total_stars
    }

    #[must_use]
    pub fn rewards(&self) -> &Rewards {
        &self.rewards
    }

    pub(crate) fn star_sum(&self) -> u32 {
        self.sub_rounds.iter().map(|s| u32::from(s.stars)).sum()
    }

    pub(crate) fn all_sub_rounds_completed(&self) -> bool {
        self.sub_rounds.iter().all(|s| s.is_completed)
    }
}

/// A difficulty tier containing rounds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Level {
    pub(crate) id: usize,
    pub(crate) difficulty: Difficulty,
    pub(crate) rounds: Vec<Round>,
    pub(crate) is_completed: bool,
    pub(crate) is_locked: bool,
    pub(crate) total_stars: u32,
    pub(crate) total_rewards: Rewards,
}

impl Level {
    #[must_use]
    pub fn id(&self) -> usize {
        self.id
    }

    #[must_use]
    pub fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    #[must_use]
    pub fn rounds(&self) -> &[Round] {
        &self.rounds
    }

    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.is_completed
    }

    #[must_use]
    pub fn is_locked(&self) -> bool {
        self.is_locked
    }

    #[must_use]
    pub fn total_stars(&self) -> u32 {
        self.total_stars
    }

    #[must_use]
    pub fn total_rewards(&self) -> &Rewards {
        &self.total_rewards
    }

    pub(crate) fn round_star_sum(&self) -> u32 {
        self.rounds.iter().map(|r| r.total_stars).sum()
    }

    pub(crate) fn all_rounds_completed(&self) -> bool {
        self.rounds.iter().all(|r| r.is_completed)
    }
}

//
// ─── AGGREGATE ROOT ────────────────────────────────────────────────────────────
//

/// The whole progression tree and the player's reward totals.
///
/// This is the only persisted entity. Badges and prizes are multisets, stored
/// in the order they were granted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestProgress {
    pub(crate) levels: Vec<Level>,
    pub(crate) total_stars: u32,
    pub(crate) total_badges: Vec<String>,
    pub(crate) total_prizes: Vec<String>,
}

impl QuestProgress {
    /// Build the initial tree with only the very first sub-round unlocked.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::QuestionCount` if the source does not return
    /// exactly `shape.questions_per_sub_round()` questions for a sub-round.
    pub fn build(
        shape: &QuestShape,
        rewards: &RewardTable,
        source: &dyn QuestionSource,
    ) -> Result<Self, ProgressError> {
        let mut levels = Vec::with_capacity(shape.levels());
        let difficulties = Difficulty::ALL.iter().copied().take(shape.levels());
        for (level_idx, difficulty) in difficulties.enumerate() {
            let mut rounds = Vec::with_capacity(shape.rounds_per_level());
            for round_idx in 0..shape.rounds_per_level() {
                let round_ref = RoundRef::new(level_idx, round_idx);
                let mut sub_rounds = Vec::with_capacity(shape.sub_rounds_per_round());
                for sub_idx in 0..shape.sub_rounds_per_round() {
                    let at = round_ref.sub_round(sub_idx);
                    let questions = source.questions_for(at);
                    if questions.len() != shape.questions_per_sub_round() {
                        return Err(ProgressError::QuestionCount {
                            at,
                            expected: shape.questions_per_sub_round(),
                            got: questions.len(),
                        });
                    }
                    sub_rounds.push(SubRound {
                        id: at,
                        questions,
                        is_completed: false,
                        is_locked: true,
                        stars: 0,
                        max_stars: MAX_STARS,
                    });
                }
                rounds.push(Round {
                    id: round_ref,
                    sub_rounds,
                    is_completed: false,
                    is_locked: true,
                    total_stars: 0,
                    rewards: rewards.round_box(difficulty, round_idx),
                });
            }
            levels.push(Level {
                id: level_idx,
                difficulty,
                rounds,
                is_completed: false,
                is_locked: true,
                total_stars: 0,
                total_rewards: rewards.level_box(difficulty),
            });
        }

        let mut progress = Self {
            levels,
            total_stars: 0,
            total_badges: Vec::new(),
            total_prizes: Vec::new(),
        };
        progress.unlock_first_chain();
        Ok(progress)
    }

    /// Same question assignment, every status field back to its initial value.
    #[must_use]
    pub fn reset_statuses(&self) -> Self {
        let mut next = self.clone();
        for level in &mut next.levels {
            level.is_completed = false;
            level.is_locked = true;
            level.total_stars = 0;
            for round in &mut level.rounds {
                round.is_completed = false;
                round.is_locked = true;
                round.total_stars = 0;
                round.rewards.stars = 0;
                for sub in &mut round.sub_rounds {
                    sub.reset();
                }
            }
        }
        next.total_stars = 0;
        next.total_badges.clear();
        next.total_prizes.clear();
        next.unlock_first_chain();
        next
    }

    fn unlock_first_chain(&mut self) {
        if let Some(level) = self.levels.first_mut() {
            level.is_locked = false;
            if let Some(round) = level.rounds.first_mut() {
                round.is_locked = false;
                if let Some(sub) = round.sub_rounds.first_mut() {
                    sub.is_locked = false;
                }
            }
        }
    }

    #[must_use]
    pub fn levels(&self) -> &[Level] {
        &self.levels
    }

    #[must_use]
    pub fn total_stars(&self) -> u32 {
        self.total_stars
    }

    #[must_use]
    pub fn total_badges(&self) -> &[String] {
        &self.total_badges
    }

    #[must_use]
    pub fn total_prizes(&self) -> &[String] {
        &self.total_prizes
    }

    /// # Errors
    ///
    /// Returns `ProgressError::InvalidIndex` if `index` is out of range.
    pub fn level(&self, index: usize) -> Result<&Level, ProgressError> {
        self.levels.get(index).ok_or(ProgressError::InvalidIndex {
            tier: Tier::Level,
            index,
            len: self.levels.len(),
        })
    }

    /// # Errors
    ///
    /// Returns `ProgressError::InvalidIndex` if either index is out of range.
    pub fn round(&self, at: RoundRef) -> Result<&Round, ProgressError> {
        let level = self.level(at.level)?;
        level.rounds.get(at.round).ok_or(ProgressError::InvalidIndex {
            tier: Tier::Round,
            index: at.round,
            len: level.rounds.len(),
        })
    }

    /// # Errors
    ///
    /// Returns `ProgressError::InvalidIndex` if any index is out of range.
    pub fn sub_round(&self, at: SubRoundRef) -> Result<&SubRound, ProgressError> {
        let round = self.round(at.round_ref())?;
        round
            .sub_rounds
            .get(at.sub_round)
            .ok_or(ProgressError::InvalidIndex {
                tier: Tier::SubRound,
                index: at.sub_round,
                len: round.sub_rounds.len(),
            })
    }

    /// Every sub-round in traversal order (level, then round, then sub-round).
    pub fn sub_rounds(&self) -> impl Iterator<Item = &SubRound> {
        self.levels
            .iter()
            .flat_map(|l| l.rounds.iter())
            .flat_map(|r| r.sub_rounds.iter())
    }

    /// First unlocked-and-incomplete sub-round, or `None` once everything is done.
    #[must_use]
    pub fn frontier(&self) -> Option<SubRoundRef> {
        self.sub_rounds().find(|s| s.is_playable()).map(SubRound::id)
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.levels.iter().all(|l| l.is_completed)
    }

    /// Whether the tree has exactly the dimensions of `shape`.
    #[must_use]
    pub fn conforms_to(&self, shape: &QuestShape) -> bool {
        self.levels.len() == shape.levels()
            && self.levels.iter().all(|l| {
                l.rounds.len() == shape.rounds_per_level()
                    && l.rounds.iter().all(|r| {
                        r.sub_rounds.len() == shape.sub_rounds_per_round()
                            && r.sub_rounds
                                .iter()
                                .all(|s| s.questions.len() == shape.questions_per_sub_round())
                    })
            })
    }

    /// Verify the structural invariants every reachable state satisfies.
    ///
    /// # Errors
    ///
    /// Returns the first `InvariantViolation` found.
    pub fn check_invariants(&self) -> Result<(), InvariantViolation> {
        if self.levels.is_empty() {
            return Err(InvariantViolation::ShapeMismatch);
        }

        let mut frontier: Option<SubRoundRef> = None;
        for level in &self.levels {
            let level_ref = NodeRef::Level(level.id);
            if level.rounds.is_empty() {
                return Err(InvariantViolation::ShapeMismatch);
            }
            if level.is_completed != level.all_rounds_completed() {
                return Err(InvariantViolation::CompletionMismatch(level_ref));
            }
            if level.is_completed && level.total_stars != level.round_star_sum() {
                return Err(InvariantViolation::StaleTotal(level_ref));
            }

            for round in &level.rounds {
                let round_ref = NodeRef::Round(round.id);
                if round.sub_rounds.is_empty() {
                    return Err(InvariantViolation::ShapeMismatch);
                }
                if level.is_locked && !round.is_locked {
                    return Err(InvariantViolation::UnlockedUnderLockedParent(round_ref));
                }
                if round.is_completed != round.all_sub_rounds_completed() {
                    return Err(InvariantViolation::CompletionMismatch(round_ref));
                }
                if round.is_completed && round.total_stars != round.star_sum() {
                    return Err(InvariantViolation::StaleTotal(round_ref));
                }

                for sub in &round.sub_rounds {
                    if sub.stars > MAX_STARS {
                        return Err(InvariantViolation::StarsOutOfRange(sub.id));
                    }
                    if round.is_locked && !sub.is_locked {
                        return Err(InvariantViolation::UnlockedUnderLockedParent(
                            NodeRef::SubRound(sub.id),
                        ));
                    }
                    if sub.is_playable() {
                        if let Some(first) = frontier {
                            return Err(InvariantViolation::MultipleFrontiers {
                                first,
                                second: sub.id,
                            });
                        }
                        frontier = Some(sub.id);
                    }
                }
            }
        }

        if frontier.is_none() && !self.is_complete() {
            return Err(InvariantViolation::MissingFrontier);
        }
        Ok(())
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
