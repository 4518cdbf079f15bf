//! crates/study_notes_core/src/scoring.rs
//!
//! Grades a learner's answers against a parsed quiz.

use crate::domain::QuizQuestion;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Grade {
    Excellent,
    Good,
    KeepStudying,
    Practice,
}

impl Grade {
    fn from_percentage(percentage: u32) -> Self {
        match percentage {
            80.. => Grade::Excellent,
            60..=79 => Grade::Good,
            40..=59 => Grade::KeepStudying,
            _ => Grade::Practice,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Grade::Excellent => "excellent",
            Grade::Good => "good",
            Grade::KeepStudying => "keep_studying",
            Grade::Practice => "practice",
        }
    }

    pub fn message(self) -> &'static str {
        match self {
            Grade::Excellent => "Excellent work!",
            Grade::Good => "Good job!",
            Grade::KeepStudying => "Keep studying!",
            Grade::Practice => "Practice makes perfect!",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuizScore {
    pub correct: usize,
    pub total: usize,
    pub percentage: u32,
    pub grade: Grade,
}

/// Scores `answers[i]` against `questions[i]`. Unanswered (`None`) and missing entries
/// count as wrong; extra answers are ignored.
pub fn score_quiz(questions: &[QuizQuestion], answers: &[Option<usize>]) -> QuizScore {
    let total = questions.len();
    let correct = questions
        .iter()
        .zip(answers.iter())
        .filter(|(q, a)| **a == Some(q.correct_answer))
        .count();
    let percentage = if total == 0 {
        0
    } else {
        ((correct as f64 / total as f64) * 100.0).round() as u32
    };
    QuizScore {
        correct,
        total,
        percentage,
        grade: Grade::from_percentage(percentage),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn question(correct_answer: usize) -> QuizQuestion {
        QuizQuestion {
            question: "?".into(),
            options: vec!["a".into(), "b".into(), "c".into(), "d".into()],
            correct_answer,
            explanation: None,
        }
    }

    #[test]
    fn counts_matching_answers_and_rounds() {
        let quiz = [question(0), question(1), question(2)];
        let score = score_quiz(&quiz, &[Some(0), Some(1), Some(3)]);
        assert_eq!(score.correct, 2);
        assert_eq!(score.total, 3);
        assert_eq!(score.percentage, 67);
        assert_eq!(score.grade, Grade::Good);
    }

    #[test]
    fn unanswered_questions_are_wrong() {
        let quiz = [question(0), question(1)];
        let score = score_quiz(&quiz, &[None]);
        assert_eq!(score.correct, 0);
        assert_eq!(score.grade, Grade::Practice);
    }

    #[test]
    fn grade_bands() {
        assert_eq!(Grade::from_percentage(100), Grade::Excellent);
        assert_eq!(Grade::from_percentage(80), Grade::Excellent);
        assert_eq!(Grade::from_percentage(40), Grade::KeepStudying);
        assert_eq!(Grade::from_percentage(39), Grade::Practice);
    }

    #[test]
    fn empty_quiz_scores_zero() {
        assert_eq!(score_quiz(&[], &[]).percentage, 0);
    }
}
