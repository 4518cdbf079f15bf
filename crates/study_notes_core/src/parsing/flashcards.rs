//! Flashcard extraction.
//!
//! Expected shape (the generation prompt asks for exactly this):
//!
//! ```text
//! ### Flashcard 1
//! **Q:** What is 2+2?
//! **A:** 4
//!
//! ---
//! ```
//!
//! Blocks are delimited by `Flashcard N` headings and horizontal rules. Inside a block,
//! lines accumulate into the question or the answer depending on the last marker seen.
//! Lines before the first marker are dropped, and a blank line closes an answer.
//! When that finds nothing, each `---` section is retried with a single inline
//! `Q: ... A: ...` match.

use super::{
    is_horizontal_rule, numbered_heading, push_line, starts_with_keyword, strip_heading, EMPHASIS,
};
use crate::domain::Flashcard;
use regex::Regex;
use std::sync::LazyLock;

static INLINE_CARD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?is)\bQ\*{0,2}\s*:\*{0,2}\s*(.+?)\s*\*{0,2}\bA\*{0,2}\s*:\*{0,2}\s*(.+?)\s*(?:\n\s*\n|###|\z)",
    )
    .expect("inline flashcard pattern is valid")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Question,
    Answer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// No marker seen yet in this block, or the last answer was closed.
    Idle,
    Reading(Side),
}

pub fn parse_flashcards(content: &str) -> Vec<Flashcard> {
    let mut cards = Vec::new();
    for block in split_blocks(content) {
        parse_block(&block, &mut cards);
    }
    if cards.is_empty() {
        cards = parse_inline_sections(content);
    }
    cards
}

fn is_card_heading(line: &str) -> bool {
    numbered_heading(strip_heading(line), "flashcard").is_some()
}

fn split_blocks(content: &str) -> Vec<Vec<&str>> {
    let mut blocks = vec![Vec::new()];
    for line in content.lines() {
        if is_card_heading(line) || is_horizontal_rule(line) {
            blocks.push(Vec::new());
            continue;
        }
        if let Some(block) = blocks.last_mut() {
            block.push(line);
        }
    }
    blocks.retain(|b| !b.is_empty());
    blocks
}

/// Recognizes `Q:`, `**Q:**`, `**Q**`, `*A*:` and the spelled-out `Question:` /
/// `Answer:`, case-insensitively. Returns the side and the text after the marker.
fn card_marker(line: &str) -> Option<(Side, &str)> {
    let trimmed = line.trim_start();
    let opened = trimmed.trim_start_matches(EMPHASIS);
    let has_open = opened.len() != trimmed.len();

    let (side, rest, spelled_out) = if starts_with_keyword(opened, "question") {
        (Side::Question, &opened["question".len()..], true)
    } else if starts_with_keyword(opened, "answer") {
        (Side::Answer, &opened["answer".len()..], true)
    } else if starts_with_keyword(opened, "q") {
        (Side::Question, &opened[1..], false)
    } else if starts_with_keyword(opened, "a") {
        (Side::Answer, &opened[1..], false)
    } else {
        return None;
    };

    let closed = rest.trim_start_matches(EMPHASIS);
    let has_close = closed.len() != rest.len();
    let (has_colon, after) = match closed.trim_start().strip_prefix(':') {
        Some(after) => (true, after.trim_start_matches(EMPHASIS)),
        None => (false, closed),
    };

    let accepted = if spelled_out {
        has_colon
    } else {
        has_colon || (has_open && has_close)
    };
    let separated = after.is_empty() || after.starts_with(char::is_whitespace) || has_colon;
    if accepted && separated {
        Some((side, after.trim()))
    } else {
        None
    }
}

fn parse_block(lines: &[&str], cards: &mut Vec<Flashcard>) {
    let mut state = State::Idle;
    let mut question = String::new();
    let mut answer = String::new();

    for line in lines {
        if let Some((side, rest)) = card_marker(line) {
            if side == Side::Question {
                emit(&mut question, &mut answer, cards);
            }
            let buffer = match side {
                Side::Question => &mut question,
                Side::Answer => &mut answer,
            };
            if !rest.is_empty() {
                push_line(buffer, rest, '\n');
            }
            state = State::Reading(side);
            continue;
        }

        let text = line.trim();
        match state {
            State::Idle => {}
            State::Reading(Side::Answer) if text.is_empty() => {
                if !answer.trim().is_empty() {
                    state = State::Idle;
                }
            }
            State::Reading(_) if text.is_empty() => {}
            State::Reading(Side::Question) => push_line(&mut question, text, '\n'),
            State::Reading(Side::Answer) => push_line(&mut answer, text, '\n'),
        }
    }
    emit(&mut question, &mut answer, cards);
}

/// Pushes a card when both sides have content, and clears the buffers either way.
fn emit(question: &mut String, answer: &mut String, cards: &mut Vec<Flashcard>) {
    let q = question.trim();
    let a = answer.trim();
    if !q.is_empty() && !a.is_empty() {
        cards.push(Flashcard {
            question: q.to_string(),
            answer: a.to_string(),
        });
    }
    question.clear();
    answer.clear();
}

fn parse_inline_sections(content: &str) -> Vec<Flashcard> {
    let mut sections = vec![String::new()];
    for line in content.lines() {
        if is_horizontal_rule(line) {
            sections.push(String::new());
        } else if let Some(section) = sections.last_mut() {
            push_line(section, line, '\n');
        }
    }

    sections
        .iter()
        .filter_map(|section| {
            let caps = INLINE_CARD.captures(section.trim())?;
            let question = caps.get(1)?.as_str().trim();
            let answer = caps.get(2)?.as_str().trim();
            (!question.is_empty() && !answer.is_empty()).then(|| Flashcard {
                question: question.to_string(),
                answer: answer.to_string(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn card(q: &str, a: &str) -> Flashcard {
        Flashcard {
            question: q.to_string(),
            answer: a.to_string(),
        }
    }

    #[test]
    fn parses_heading_delimited_cards() {
        let text = "### Flashcard 1\n**Q:** What is 2+2?\n**A:** 4\n---\n### Flashcard 2\n**Q:** Capital of France?\n**A:** Paris";
        assert_eq!(
            parse_flashcards(text),
            vec![card("What is 2+2?", "4"), card("Capital of France?", "Paris")]
        );
    }

    #[test]
    fn tolerates_preamble_marker_variants_and_trailing_prose() {
        let text = "Here are your flashcards!\n\n\
            ### Flashcard 1\n\
            q: What does DNA stand for?  \n\
            *A*: Deoxyribonucleic acid\n\n\
            ### flashcard 2\n\
            **Q** Which organelle makes ATP?\n\
            **A** The mitochondrion,\n\
            via cellular respiration.\n\n\
            Good luck studying!";
        assert_eq!(
            parse_flashcards(text),
            vec![
                card("What does DNA stand for?", "Deoxyribonucleic acid"),
                card(
                    "Which organelle makes ATP?",
                    "The mitochondrion,\nvia cellular respiration."
                ),
            ]
        );
    }

    #[test]
    fn multiple_pairs_in_one_block_are_kept_in_order() {
        let text = "Question: First?\nAnswer: One\n\nQuestion: Second?\nAnswer: Two";
        assert_eq!(
            parse_flashcards(text),
            vec![card("First?", "One"), card("Second?", "Two")]
        );
    }

    #[test]
    fn block_without_answer_yields_nothing() {
        let text = "### Flashcard 1\n**Q:** Orphan question\n\n### Flashcard 2\n**Q:** Kept?\n**A:** Yes";
        assert_eq!(parse_flashcards(text), vec![card("Kept?", "Yes")]);
    }

    #[test]
    fn words_starting_with_marker_letters_are_not_markers() {
        let text = "**Q:** Name a quick test\nQuite tricky\n**A:** Alpha\nAnd more";
        assert_eq!(
            parse_flashcards(text),
            vec![card("Name a quick test\nQuite tricky", "Alpha\nAnd more")]
        );
    }

    #[test]
    fn falls_back_to_inline_pairs_per_section() {
        let text = "**Q:** What is H2O? **A:** Water\n---\nQ: Speed of light? A: About 300,000 km/s";
        assert_eq!(
            parse_flashcards(text),
            vec![
                card("What is H2O?", "Water"),
                card("Speed of light?", "About 300,000 km/s"),
            ]
        );
    }

    #[test]
    fn unstructured_text_gives_empty_list() {
        assert!(parse_flashcards("The model refused to answer.").is_empty());
        assert!(parse_flashcards("").is_empty());
    }

    #[test]
    fn parsing_is_repeatable() {
        let text = "### Flashcard 1\n**Q:** A?\n**A:** B\n";
        assert_eq!(parse_flashcards(text), parse_flashcards(text));
    }
}
