//! Question catalog and per-sub-round selection.
//!
//! The bank owns a validated pool of questions and hands out a fixed list for
//! every sub-round when the progress tree is first built. Selection is either
//! sequential (stable, test friendly) or a seeded shuffle so that different
//! levels and sub-rounds draw different questions from the same pool.

use std::collections::HashSet;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use quest_core::Clock;
use quest_core::model::{QuestShape, Question, QuestionDraft, QuestionSource, SubRoundRef};

use crate::error::QuestionBankError;

const STANDARD_CATALOG: &str = include_str!("catalog.json");

/// How a bank distributes its pool across sub-rounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    /// Consecutive windows of the pool, wrapping at the end.
    Sequential,
    /// Seeded shuffle per sub-round; the same seed always yields the same tree.
    Shuffled { seed: u64 },
}

impl Selection {
    /// Shuffle seeded from the clock.
    #[must_use]
    pub fn from_clock(clock: Clock) -> Self {
        Self::Shuffled { seed: clock.seed() }
    }
}

/// Validated question pool sized for a particular `QuestShape`.
#[derive(Debug, Clone)]
pub struct QuestionBank {
    questions: Vec<Question>,
    shape: QuestShape,
    selection: Selection,
}

impl QuestionBank {
    /// Build a bank from already validated questions.
    ///
    /// # Errors
    ///
    /// Returns `QuestionBankError::TooFewQuestions` if the pool cannot fill a
    /// single sub-round without repeats, or `DuplicateId` if two questions
    /// share an id.
    pub fn from_questions(
        questions: Vec<Question>,
        shape: QuestShape,
        selection: Selection,
    ) -> Result<Self, QuestionBankError> {
        let needed = shape.questions_per_sub_round();
        if questions.len() < needed {
            return Err(QuestionBankError::TooFewQuestions {
                needed,
                available: questions.len(),
            });
        }

        let mut seen = HashSet::with_capacity(questions.len());
        for question in &questions {
            if !seen.insert(question.id()) {
                return Err(QuestionBankError::DuplicateId(question.id()));
            }
        }

        Ok(Self {
            questions,
            shape,
            selection,
        })
    }

    /// Parse a JSON array of question drafts and validate each one.
    ///
    /// # Errors
    ///
    /// Returns `QuestionBankError::Json` for malformed input, `Question` for
    /// the first draft that fails validation, and the `from_questions` errors.
    pub fn from_json(
        json: &str,
        shape: QuestShape,
        selection: Selection,
    ) -> Result<Self, QuestionBankError> {
        let drafts: Vec<QuestionDraft> = serde_json::from_str(json)?;
        let questions = drafts
            .into_iter()
            .map(QuestionDraft::validate)
            .collect::<Result<Vec<_>, _>>()?;
        Self::from_questions(questions, shape, selection)
    }

    /// The built-in food-literacy catalog.
    ///
    /// # Errors
    ///
    /// Returns `QuestionBankError::TooFewQuestions` if `shape` asks for more
    /// questions per sub-round than the catalog holds.
    pub fn standard(shape: QuestShape, selection: Selection) -> Result<Self, QuestionBankError> {
        Self::from_json(STANDARD_CATALOG, shape, selection)
    }

    fn slot(&self, at: SubRoundRef) -> usize {
        (at.level * self.shape.rounds_per_level() + at.round) * self.shape.sub_rounds_per_round()
            + at.sub_round
    }

    fn select(&self, at: SubRoundRef) -> Vec<Question> {
        let per = self.shape.questions_per_sub_round();
        let len = self.questions.len();
        let slot = self.slot(at);

        match self.selection {
            Selection::Sequential => (0..per)
                .map(|i| self.questions[(slot * per + i) % len].clone())
                .collect(),
            Selection::Shuffled { seed } => {
                let slot = u64::try_from(slot).unwrap_or_default();
                let mixed = seed ^ slot.wrapping_mul(0x9E37_79B9_7F4A_7C15);
                let mut rng = StdRng::seed_from_u64(mixed);
                let mut indices: Vec<usize> = (0..len).collect();
                indices.shuffle(&mut rng);
                indices
                    .into_iter()
                    .take(per)
                    .map(|i| self.questions[i].clone())
                    .collect()
            }
        }
    }
}

impl QuestionSource for QuestionBank {
    fn questions_for_sub_round(&self, round: usize, sub_round: usize) -> Vec<Question> {
        self.select(SubRoundRef::new(0, round, sub_round))
    }

    fn questions_for(&self, at: SubRoundRef) -> Vec<Question> {
        self.select(at)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;
    use quest_core::model::{QuestionError, QuestionId};

    fn shape(per: usize) -> QuestShape {
        QuestShape::new(2, 2, 2, per).unwrap()
    }

    fn question(id: u32) -> Question {
        QuestionDraft {
            id: QuestionId::new(id),
            prompt: format!("Question {id}?"),
            options: vec!["Yes".into(), "No".into()],
            correct_index: 0,
            topic: if id % 2 == 0 { "Fruits" } else { "Dairy" }.into(),
            explanation: None,
        }
        .validate()
        .unwrap()
    }

    fn pool(n: u32) -> Vec<Question> {
        (1..=n).map(question).collect()
    }

    #[test]
    fn standard_catalog_fills_the_standard_shape() {
        let bank = QuestionBank::standard(QuestShape::standard(), Selection::Sequential).unwrap();
        let topics: BTreeSet<String> = (0..5)
            .flat_map(|sub_round| bank.questions_for(SubRoundRef::new(0, 0, sub_round)))
            .map(|q| q.topic().to_owned())
            .collect();
        assert_eq!(
            topics.into_iter().collect::<Vec<_>>(),
            vec!["Dairy", "Fruits", "Grains", "Nutrition", "Protein", "Vegetables"]
        );
        assert_eq!(bank.questions_for(SubRoundRef::new(2, 9, 4)).len(), 10);
    }

    #[test]
    fn rejects_pool_smaller_than_a_sub_round() {
        let err =
            QuestionBank::from_questions(pool(3), shape(4), Selection::Sequential).unwrap_err();
        assert!(matches!(
            err,
            QuestionBankError::TooFewQuestions {
                needed: 4,
                available: 3
            }
        ));
    }

    #[test]
    fn rejects_duplicate_ids() {
        let mut questions = pool(4);
        questions.push(question(2));
        let err =
            QuestionBank::from_questions(questions, shape(2), Selection::Sequential).unwrap_err();
        assert!(matches!(err, QuestionBankError::DuplicateId(id) if id == QuestionId::new(2)));
    }

    #[test]
    fn from_json_validates_drafts() {
        let json = r#"[
            {"id": 1, "prompt": "Is cheese dairy?", "options": ["Yes", "No"], "correct_index": 0, "topic": "Dairy"},
            {"id": 2, "prompt": "Pick one", "options": ["Only"], "correct_index": 0, "topic": "Dairy"}
        ]"#;
        let err = QuestionBank::from_json(json, shape(1), Selection::Sequential).unwrap_err();
        assert!(matches!(
            err,
            QuestionBankError::Question(QuestionError::TooFewOptions { .. })
        ));

        let err =
            QuestionBank::from_json("{not json", shape(1), Selection::Sequential).unwrap_err();
        assert!(matches!(err, QuestionBankError::Json(_)));
    }

    #[test]
    fn sequential_selection_walks_the_pool() {
        let bank = QuestionBank::from_questions(pool(5), shape(2), Selection::Sequential).unwrap();
        let ids = |at| {
            bank.questions_for(at)
                .iter()
                .map(|q| q.id().value())
                .collect::<Vec<_>>()
        };
        assert_eq!(ids(SubRoundRef::new(0, 0, 0)), vec![1, 2]);
        assert_eq!(ids(SubRoundRef::new(0, 0, 1)), vec![3, 4]);
        assert_eq!(ids(SubRoundRef::new(0, 1, 0)), vec![5, 1]);
    }

    #[test]
    fn shuffled_selection_is_seeded_and_varies_by_level() {
        let bank = QuestionBank::from_questions(pool(30), shape(5), Selection::Shuffled { seed: 7 })
            .unwrap();
        let again = bank.clone();

        let first = bank.questions_for(SubRoundRef::new(0, 1, 1));
        assert_eq!(first, again.questions_for(SubRoundRef::new(0, 1, 1)));
        assert_ne!(first, bank.questions_for(SubRoundRef::new(1, 1, 1)));

        let unique: HashSet<_> = first.iter().map(Question::id).collect();
        assert_eq!(unique.len(), 5);
    }

    #[test]
    fn sub_round_index_form_matches_first_level() {
        let bank = QuestionBank::from_questions(pool(12), shape(3), Selection::Shuffled { seed: 1 })
            .unwrap();
        assert_eq!(
            bank.questions_for_sub_round(1, 0),
            bank.questions_for(SubRoundRef::new(0, 1, 0))
        );
    }
}
