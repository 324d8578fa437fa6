//! Pure transitions over [`QuestProgress`].
//!
//! Every transition clones the tree and returns the new snapshot; the caller's
//! previous snapshot is never touched. Indices are stable identifiers into the
//! fixed-shape tree.

use serde::{Deserialize, Serialize};

use crate::model::{
    MAX_STARS, NodeRef, ProgressError, QuestProgress, RoundRef, Rewards, SubRoundRef,
};

//
// ─── ACTIONS / RESULTS ─────────────────────────────────────────────────────────
//

/// Transition requests understood by [`dispatch`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProgressAction {
    CompleteSubRound { at: SubRoundRef, stars: u8 },
    Reset,
}

/// Observable effect of an applied transition, in the order it happened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProgressEvent {
    SubRoundCompleted { at: SubRoundRef, stars: u8 },
    Unlocked(NodeRef),
    RoundCompleted { at: RoundRef, rewards: Rewards },
    LevelCompleted { level: usize, rewards: Rewards },
    QuestCompleted,
    Reset,
}

impl ProgressEvent {
    /// Rewards carried by round/level completion events.
    #[must_use]
    pub fn rewards(&self) -> Option<&Rewards> {
        match self {
            ProgressEvent::RoundCompleted { rewards, .. }
            | ProgressEvent::LevelCompleted { rewards, .. } => Some(rewards),
            _ => None,
        }
    }
}

/// Why a transition was refused. Recoverable and shown to the player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Rejection {
    Locked(SubRoundRef),
}

/// Outcome of a transition request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    /// New snapshot plus what changed. `events` is empty when the request was
    /// a no-op (e.g. repeating a completion with the same stars).
    Applied {
        progress: QuestProgress,
        events: Vec<ProgressEvent>,
    },
    Rejected(Rejection),
}

impl Transition {
    #[must_use]
    pub fn is_rejected(&self) -> bool {
        matches!(self, Transition::Rejected(_))
    }
}

//
// ─── DISPATCH ──────────────────────────────────────────────────────────────────
//

/// Single entry point for all progress mutations.
///
/// # Errors
///
/// Returns `ProgressError` for out-of-range indices or star values.
pub fn dispatch(
    progress: &QuestProgress,
    action: ProgressAction,
) -> Result<Transition, ProgressError> {
    match action {
        ProgressAction::CompleteSubRound { at, stars } => complete_sub_round(progress, at, stars),
        ProgressAction::Reset => Ok(reset(progress)),
    }
}

/// Rebuild every status field from the initial shape.
#[must_use]
pub fn reset(progress: &QuestProgress) -> Transition {
    Transition::Applied {
        progress: progress.reset_statuses(),
        events: vec![ProgressEvent::Reset],
    }
}

/// Record a finished sub-round and cascade unlocks and rewards upward.
///
/// - Locked targets are rejected without mutation.
/// - Stored stars only ever rise: `max(previous, stars)`.
/// - Completing a node unlocks only its next sibling; at a boundary, the first
///   child chain of the next parent.
/// - Round and level rewards are granted once, on first completion.
///
/// # Errors
///
/// Returns `ProgressError::InvalidIndex` if `at` does not exist and
/// `ProgressError::InvalidStars` if `stars` exceeds the maximum.
pub fn complete_sub_round(
    progress: &QuestProgress,
    at: SubRoundRef,
    stars: u8,
) -> Result<Transition, ProgressError> {
    // Validates every index before anything is cloned.
    let target = progress.sub_round(at)?;
    if stars > MAX_STARS {
        return Err(ProgressError::InvalidStars {
            stars,
            max: MAX_STARS,
        });
    }
    if target.is_locked() {
        return Ok(Transition::Rejected(Rejection::Locked(at)));
    }

    let mut next = progress.clone();
    let mut events = Vec::new();
    let level_count = next.levels.len();

    // Sub-round.
    {
        let round = &mut next.levels[at.level].rounds[at.round];
        let sub = &mut round.sub_rounds[at.sub_round];
        let previous = sub.stars;
        let was_completed = sub.is_completed;
        sub.is_completed = true;
        sub.stars = previous.max(stars);
        if !was_completed || sub.stars != previous {
            events.push(ProgressEvent::SubRoundCompleted {
                at,
                stars: sub.stars,
            });
        }

        if let Some(sibling) = round.sub_rounds.get_mut(at.sub_round + 1) {
            if sibling.is_locked {
                sibling.is_locked = false;
                events.push(ProgressEvent::Unlocked(NodeRef::SubRound(sibling.id)));
            }
        }
    }

    // Round.
    let round_ref = at.round_ref();
    let round_done = next.levels[at.level].rounds[at.round].all_sub_rounds_completed();
    if round_done {
        let level = &mut next.levels[at.level];
        let round_count = level.rounds.len();
        let round = &mut level.rounds[at.round];
        round.total_stars = round.star_sum();

        if !round.is_completed {
            round.is_completed = true;
            round.rewards.stars = round.total_stars;
            let rewards = round.rewards.clone();
            next.total_stars = next.total_stars.saturating_add(rewards.stars);
            next.total_badges.extend(rewards.badges.iter().cloned());
            next.total_prizes.extend(rewards.prizes.iter().cloned());
            events.push(ProgressEvent::RoundCompleted {
                at: round_ref,
                rewards,
            });

            if at.round + 1 < round_count {
                let following = &mut level.rounds[at.round + 1];
                unlock_round(following, &mut events);
            }
        }
    }

    // Level.
    let level_done = next.levels[at.level].all_rounds_completed();
    if level_done {
        let level = &mut next.levels[at.level];
        level.total_stars = level.round_star_sum();

        if !level.is_completed {
            level.is_completed = true;
            let rewards = level.total_rewards.clone();
            next.total_stars = next.total_stars.saturating_add(rewards.stars);
            next.total_badges.extend(rewards.badges.iter().cloned());
            next.total_prizes.extend(rewards.prizes.iter().cloned());
            events.push(ProgressEvent::LevelCompleted {
                level: at.level,
                rewards,
            });

            if at.level + 1 < level_count {
                let following = &mut next.levels[at.level + 1];
                if following.is_locked {
                    following.is_locked = false;
                    events.push(ProgressEvent::Unlocked(NodeRef::Level(following.id)));
                }
                if let Some(first) = following.rounds.first_mut() {
                    unlock_round(first, &mut events);
                }
            } else {
                events.push(ProgressEvent::QuestCompleted);
            }
        }
    }

    Ok(Transition::Applied {
        progress: next,
        events,
    })
}

/// Unlock a round and its first sub-round.
fn unlock_round(round: &mut crate::model::Round, events: &mut Vec<ProgressEvent>) {
    if round.is_locked {
        round.is_locked = false;
        events.push(ProgressEvent::Unlocked(NodeRef::Round(round.id)));
    }
    if let Some(first) = round.sub_rounds.first_mut() {
        if first.is_locked {
            first.is_locked = false;
            events.push(ProgressEvent::Unlocked(NodeRef::SubRound(first.id)));
        }
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
