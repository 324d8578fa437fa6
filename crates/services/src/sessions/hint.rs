use quest_core::model::Question;

/// Partial clue for a question: the topic, the answer's first letter and
/// length, and one eliminated wrong option when at least two remain.
///
/// Answers of two letters or fewer get no letter clue.
#[must_use]
pub fn hint_for(question: &Question) -> String {
    let answer = question.correct_option();
    let letters = answer.chars().filter(|c| c.is_alphanumeric()).count();
    let first = answer
        .chars()
        .find(|c| c.is_alphanumeric())
        .map(|c| c.to_uppercase().to_string())
        .unwrap_or_default();

    let mut hint = format!("Think about {}.", question.topic().to_lowercase());
    if letters > 2 {
        hint.push_str(&format!(
            " The answer starts with \"{first}\" and has {letters} letters."
        ));
    } else {
        hint.push_str(" The answer is a short one.");
    }

    if question.options().len() > 2 {
        let wrong = question
            .options()
            .iter()
            .enumerate()
            .find(|(i, _)| *i != question.correct_index());
        if let Some((_, wrong)) = wrong {
            hint.push_str(&format!(" It is not \"{wrong}\"."));
        }
    }
    hint
}

#[cfg(test)]
mod tests {
    use super::*;
    use quest_core::model::{QuestionDraft, QuestionId};

    fn question(options: &[&str], correct_index: usize) -> Question {
        QuestionDraft {
            id: QuestionId::new(1),
            prompt: "Which one?".into(),
            options: options.iter().map(|o| (*o).to_string()).collect(),
            correct_index,
            topic: "Fruits".into(),
            explanation: None,
        }
        .validate()
        .unwrap()
    }

    #[test]
    fn hint_eliminates_first_wrong_option() {
        let hint = hint_for(&question(&["Carrot", "apple", "Potato"], 1));
        assert_eq!(
            hint,
            "Think about fruits. The answer starts with \"A\" and has 5 letters. It is not \"Carrot\"."
        );
    }

    #[test]
    fn short_answer_hint_keeps_its_letters_hidden() {
        let hint = hint_for(&question(&["A", "Carrot", "Potato"], 0));
        assert_eq!(
            hint,
            "Think about fruits. The answer is a short one. It is not \"Carrot\"."
        );

        let hint = hint_for(&question(&["Yes", "No"], 1));
        assert!(!hint.contains("starts with"));
        assert!(!hint.contains("letters"));
    }

    #[test]
    fn two_option_hint_does_not_eliminate() {
        let hint = hint_for(&question(&["Yes", "No"], 0));
        assert!(!hint.contains("It is not"));
        assert!(!hint.contains("\"Yes\""));
    }
}
