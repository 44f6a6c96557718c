// src/exam/status.rs

use serde::Serialize;

/// Per-question visitation / answer / review state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionStatus {
    NotVisited,
    /// Visited but still unanswered.
    NotAnswered,
    Answered,
    /// Marked for review without an answer.
    Review,
    AnsweredAndReview,
}

impl QuestionStatus {
    /// Pure derivation from the three flags a session tracks per question.
    ///
    /// Answering or marking implies a visit, so `visited` only matters
    /// when neither of the other two is set.
    pub fn derive(visited: bool, answered: bool, marked_for_review: bool) -> Self {
        match (answered, marked_for_review, visited) {
            (true, true, _) => QuestionStatus::AnsweredAndReview,
            (true, false, _) => QuestionStatus::Answered,
            (false, true, _) => QuestionStatus::Review,
            (false, false, true) => QuestionStatus::NotAnswered,
            (false, false, false) => QuestionStatus::NotVisited,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derivation_is_total() {
        for visited in [false, true] {
            for answered in [false, true] {
                for marked in [false, true] {
                    let status = QuestionStatus::derive(visited, answered, marked);
                    let shows_answer = matches!(
                        status,
                        QuestionStatus::Answered | QuestionStatus::AnsweredAndReview
                    );
                    assert_eq!(shows_answer, answered);
                }
            }
        }
    }

    #[test]
    fn visit_only_matters_for_untouched_questions() {
        assert_eq!(QuestionStatus::derive(false, false, false), QuestionStatus::NotVisited);
        assert_eq!(QuestionStatus::derive(true, false, false), QuestionStatus::NotAnswered);
        assert_eq!(QuestionStatus::derive(false, true, false), QuestionStatus::Answered);
        assert_eq!(QuestionStatus::derive(false, false, true), QuestionStatus::Review);
        assert_eq!(QuestionStatus::derive(true, true, true), QuestionStatus::AnsweredAndReview);
    }

    #[test]
    fn serializes_snake_case() {
        let json = serde_json::to_string(&QuestionStatus::AnsweredAndReview).unwrap();
        assert_eq!(json, "\"answered_and_review\"");
    }
}
