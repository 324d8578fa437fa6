use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Unique identifier for a Question in the catalog
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct QuestionId(u32);

impl QuestionId {
    /// Creates a new `QuestionId`
    #[must_use]
    pub fn new(id: u32) -> Self {
        Self(id)
    }

    /// Returns the underlying u32 value
    #[must_use]
    pub fn value(&self) -> u32 {
        self.0
    }
}

impl fmt::Debug for QuestionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "QuestionId({})", self.0)
    }
}

impl fmt::Display for QuestionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

//
// ─── TREE COORDINATES ──────────────────────────────────────────────────────────
//

/// Position of a Round inside the quest tree (zero-based indices).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RoundRef {
    pub level: usize,
    pub round: usize,
}

impl RoundRef {
    #[must_use]
    pub fn new(level: usize, round: usize) -> Self {
        Self { level, round }
    }

    /// The sub-round at `sub_round` inside this round.
    #[must_use]
    pub fn sub_round(self, sub_round: usize) -> SubRoundRef {
        SubRoundRef::new(self.level, self.round, sub_round)
    }
}

/// Position of a Sub-Round inside the quest tree (zero-based indices).
///
/// Indices are stable: the tree is never resized after construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SubRoundRef {
    pub level: usize,
    pub round: usize,
    pub sub_round: usize,
}

impl SubRoundRef {
    #[must_use]
    pub fn new(level: usize, round: usize, sub_round: usize) -> Self {
        Self {
            level,
            round,
            sub_round,
        }
    }

    #[must_use]
    pub fn round_ref(self) -> RoundRef {
        RoundRef::new(self.level, self.round)
    }
}

/// Any addressable node of the quest tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeRef {
    Level(usize),
    Round(RoundRef),
    SubRound(SubRoundRef),
}

// Display is one-based, matching what players see.

impl fmt::Display for RoundRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "L{}-R{}", self.level + 1, self.round + 1)
    }
}

impl fmt::Display for SubRoundRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "L{}-R{}-S{}",
            self.level + 1,
            self.round + 1,
            self.sub_round + 1
        )
    }
}

impl fmt::Display for NodeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeRef::Level(level) => write!(f, "L{}", level + 1),
            NodeRef::Round(round) => round.fmt(f),
            NodeRef::SubRound(sub) => sub.fmt(f),
        }
    }
}

// ─── FromStr Implementations ───────────────────────────────────────────────────

/// Error type for parsing IDs and tree coordinates from strings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseIdError {
    kind: &'static str,
}

impl fmt::Display for ParseIdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to parse {} from string", self.kind)
    }
}

impl std::error::Error for ParseIdError {}

impl FromStr for QuestionId {
    type Err = ParseIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<u32>()
            .map(QuestionId::new)
            .map_err(|_| ParseIdError { kind: "QuestionId" })
    }
}

impl FromStr for SubRoundRef {
    type Err = ParseIdError;

    /// Parses the one-based `L<level>-R<round>-S<sub>` form produced by `Display`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseIdError { kind: "SubRoundRef" };
        let mut parts = s.trim().split('-');
        let mut next = |prefix: char| -> Result<usize, ParseIdError> {
            let part = parts.next().ok_or_else(err)?;
            let digits = part
                .strip_prefix(prefix)
                .or_else(|| part.strip_prefix(prefix.to_ascii_lowercase()))
                .ok_or_else(err)?;
            let one_based: usize = digits.parse().map_err(|_| err())?;
            one_based.checked_sub(1).ok_or_else(err)
        };
        let level = next('L')?;
        let round = next('R')?;
        let sub_round = next('S')?;
        if parts.next().is_some() {
            return Err(err());
        }
        Ok(SubRoundRef::new(level, round, sub_round))
    }
}

// ─── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn question_id_display_and_parse() {
        let id = QuestionId::new(42);
        assert_eq!(id.to_string(), "42");
        assert_eq!("42".parse::<QuestionId>().unwrap(), id);
        assert!("forty-two".parse::<QuestionId>().is_err());
    }

    #[test]
    fn sub_round_ref_displays_one_based() {
        let at = SubRoundRef::new(0, 1, 4);
        assert_eq!(at.to_string(), "L1-R2-S5");
        assert_eq!(at.round_ref().to_string(), "L1-R2");
    }

    #[test]
    fn sub_round_ref_parses_display_form() {
        let at: SubRoundRef = "L2-R10-S3".parse().unwrap();
        assert_eq!(at, SubRoundRef::new(1, 9, 2));
        let lower: SubRoundRef = "l1-r1-s1".parse().unwrap();
        assert_eq!(lower, SubRoundRef::new(0, 0, 0));
    }

    #[test]
    fn sub_round_ref_rejects_zero_and_garbage() {
        assert!("L0-R1-S1".parse::<SubRoundRef>().is_err());
        assert!("L1-R1".parse::<SubRoundRef>().is_err());
        assert!("L1-R1-S1-X2".parse::<SubRoundRef>().is_err());
        assert!("round one".parse::<SubRoundRef>().is_err());
    }
}
