//! Multiple-choice quiz extraction.
//!
//! Blocks start at a `Question N` heading (with or without `#`) or at a line that
//! begins with `N.`. Inside a block the question is the text before the first
//! `A)` marker; options run until the next marker, an `Answer:` or `Explanation:`
//! label (on its own line or inline), or the end of the block. At most four options
//! are kept and blocks with fewer than two are dropped. A missing `Answer:` line
//! means option A.

use super::{
    is_horizontal_rule, numbered_heading, push_line, starts_with_keyword, strip_heading,
    unwrap_emphasis, EMPHASIS,
};
use crate::domain::QuizQuestion;

const MAX_OPTIONS: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Question,
    Options,
    /// After an answer line; plain text is ignored until the next marker.
    Terminated,
    Explanation,
}

#[derive(Debug, Default)]
struct BlockBuilder {
    question: String,
    options: Vec<String>,
    answer: Option<usize>,
    explanation: String,
}

pub fn parse_quiz(content: &str) -> Vec<QuizQuestion> {
    split_blocks(content)
        .into_iter()
        .filter_map(|block| parse_block(&block))
        .collect()
}

/// Returns the text that follows a block-opening line, or `None` for other lines.
fn block_opening(line: &str) -> Option<&str> {
    let stripped = strip_heading(line);
    if let Some(rest) = numbered_heading(stripped, "question") {
        return Some(rest.trim());
    }
    let start = line.trim_start().trim_start_matches(EMPHASIS);
    let digits = start.chars().take_while(char::is_ascii_digit).count();
    if digits > 0 {
        if let Some(rest) = start[digits..].strip_prefix('.') {
            return Some(rest.trim());
        }
    }
    None
}

fn split_blocks(content: &str) -> Vec<Vec<&str>> {
    let mut blocks = vec![Vec::new()];
    for line in content.lines() {
        match block_opening(line) {
            Some(rest) => blocks.push(vec![rest]),
            None => {
                if let Some(block) = blocks.last_mut() {
                    block.push(line);
                }
            }
        }
    }
    blocks
}

/// Finds option markers such as `A)` or `**b)**` at the start of `line` or after
/// whitespace. Returns the text before the first marker and each option's text.
fn split_options(line: &str) -> (&str, Vec<&str>) {
    let bytes = line.as_bytes();
    let mut markers: Vec<(usize, usize)> = Vec::new();

    let mut i = 0;
    while i < bytes.len() {
        let at_boundary = i == 0 || bytes[i - 1].is_ascii_whitespace();
        if at_boundary {
            let mut j = i;
            while j < bytes.len() && (bytes[j] == b'*' || bytes[j] == b'_') {
                j += 1;
            }
            let is_letter = j < bytes.len() && matches!(bytes[j].to_ascii_uppercase(), b'A'..=b'D');
            if is_letter && bytes.get(j + 1) == Some(&b')') {
                let mut end = j + 2;
                while end < bytes.len() && (bytes[end] == b'*' || bytes[end] == b'_') {
                    end += 1;
                }
                markers.push((i, end));
                i = end;
                continue;
            }
        }
        i += 1;
    }

    let Some(&(first_start, _)) = markers.first() else {
        return (line, Vec::new());
    };
    let options = markers
        .iter()
        .enumerate()
        .map(|(n, &(_, text_start))| {
            let text_end = markers.get(n + 1).map_or(line.len(), |&(next, _)| next);
            &line[text_start..text_end]
        })
        .collect();
    (&line[..first_start], options)
}

const ANSWER_KEYWORDS: [&str; 2] = ["correct answer", "answer"];
const LABEL_KEYWORDS: [&str; 3] = ["correct answer", "answer", "explanation"];

/// `Answer: B`, `**Correct Answer:** c)`, `Answer B`. Returns `Some(None)` for a
/// labelled answer without a recognizable letter, and `None` when the keyword is
/// just the start of a sentence such as "Answer the following".
fn answer_line(plain: &str) -> Option<Option<usize>> {
    let keyword = ANSWER_KEYWORDS
        .into_iter()
        .find(|keyword| starts_with_keyword(plain, keyword))?;
    let after = &plain[keyword.len()..];
    let rest = after.trim_start();
    if let Some(value) = rest.strip_prefix(':') {
        return Some(answer_letter(value.trim_start()));
    }
    if !after.starts_with(char::is_whitespace) {
        return None;
    }
    let bare = rest.trim_end_matches([')', '.']);
    if bare.chars().count() != 1 {
        return None;
    }
    answer_letter(bare).map(Some)
}

/// `B`, `b)`, `(C)` map to their option index; anything else, such as a word that
/// merely starts with A to D, gives `None`.
fn answer_letter(value: &str) -> Option<usize> {
    let mut chars = value.trim_start_matches('(').chars();
    let letter = chars.next()?.to_ascii_uppercase();
    if chars.next().is_some_and(char::is_alphanumeric) {
        return None;
    }
    matches!(letter, 'A'..='D').then(|| letter as usize - 'A' as usize)
}

fn explanation_line(plain: &str) -> Option<&str> {
    if !starts_with_keyword(plain, "explanation") {
        return None;
    }
    let rest = plain["explanation".len()..].trim_start();
    rest.strip_prefix(':').map(str::trim)
}

/// Splits an option at an inline `Answer:`, `Correct Answer:` or `Explanation:` label,
/// returning the option text and the labelled remainder.
fn split_at_label(text: &str) -> (&str, Option<&str>) {
    let bytes = text.as_bytes();
    for i in 0..bytes.len() {
        if i > 0 && !bytes[i - 1].is_ascii_whitespace() {
            continue;
        }
        let start = text[i..].trim_start_matches(EMPHASIS);
        let Some(keyword) = LABEL_KEYWORDS
            .into_iter()
            .find(|keyword| starts_with_keyword(start, keyword))
        else {
            continue;
        };
        if start[keyword.len()..].trim_start_matches(EMPHASIS).starts_with(':') {
            return (&text[..i], Some(&text[i..]));
        }
    }
    (text, None)
}

fn plain_text(line: &str) -> String {
    line.trim()
        .chars()
        .filter(|c| !EMPHASIS.contains(c))
        .collect::<String>()
        .trim()
        .to_string()
}

fn parse_block(lines: &[&str]) -> Option<QuizQuestion> {
    let mut block = BlockBuilder::default();
    let mut state = State::Question;

    for line in lines {
        let plain = plain_text(line);

        if plain.is_empty() || is_horizontal_rule(line) {
            if state == State::Explanation {
                state = State::Terminated;
            }
            continue;
        }

        if block.apply_label(&plain, &mut state) {
            continue;
        }

        let (prefix, options) = split_options(line);
        if options.is_empty() {
            let text = line.trim();
            match state {
                State::Question => push_line(&mut block.question, text, ' '),
                State::Options => {
                    if let Some(last) = block.options.last_mut() {
                        push_line(last, text, ' ');
                    }
                }
                State::Explanation => push_line(&mut block.explanation, &plain, ' '),
                State::Terminated => {}
            }
            continue;
        }

        let mut label = None;
        let mut option_texts = Vec::with_capacity(options.len());
        for option in options {
            let (text, rest) = split_at_label(option);
            option_texts.push(text);
            if rest.is_some() {
                label = rest;
                break;
            }
        }

        if state == State::Question {
            let prefix = prefix.trim();
            if !prefix.is_empty() {
                push_line(&mut block.question, prefix, ' ');
            }
        }
        if matches!(state, State::Question | State::Options | State::Terminated) {
            for option in option_texts {
                if block.options.len() < MAX_OPTIONS {
                    block.options.push(option.trim().to_string());
                }
            }
            state = if block.options.len() < MAX_OPTIONS {
                State::Options
            } else {
                State::Terminated
            };
        }
        if let Some(label) = label {
            block.apply_label(&plain_text(label), &mut state);
        }
    }

    block.finish()
}

impl BlockBuilder {
    /// Handles an answer or explanation line. Returns `false` for any other line.
    fn apply_label(&mut self, plain: &str, state: &mut State) -> bool {
        if let Some(letter) = answer_line(plain) {
            if self.answer.is_none() {
                self.answer = letter;
            }
            *state = State::Terminated;
            return true;
        }
        if let Some(rest) = explanation_line(plain) {
            if self.explanation.is_empty() {
                push_line(&mut self.explanation, rest, ' ');
                *state = State::Explanation;
            } else {
                *state = State::Terminated;
            }
            return true;
        }
        false
    }

    fn finish(self) -> Option<QuizQuestion> {
        let question = unwrap_emphasis(&self.question).to_string();
        let options: Vec<String> = self
            .options
            .iter()
            .map(|o| unwrap_emphasis(o).to_string())
            .collect();
        if question.is_empty() || options.len() < 2 {
            return None;
        }
        let explanation = self.explanation.trim();
        Some(QuizQuestion {
            question,
            options,
            correct_answer: self.answer.unwrap_or(0),
            explanation: (!explanation.is_empty()).then(|| explanation.to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GENERATED: &str = "Here is your quiz:\n\n\
        ### Question 1\n\
        What is the powerhouse of the cell?\n\n\
        A) Nucleus  \n\
        B) Mitochondria  \n\
        C) Ribosome  \n\
        D) Golgi apparatus\n\n\
        **Correct Answer:** B  \n\
        **Explanation:** Mitochondria produce most of the cell's ATP.\n\n\
        ---\n\n\
        ### Question 2\n\
        Which gas do plants absorb?\n\n\
        A) Oxygen  \n\
        B) Nitrogen  \n\
        C) Carbon dioxide  \n\
        D) Helium\n\n\
        **Correct Answer:** **C**  \n\
        **Explanation:** Plants take in CO2 for photosynthesis.\n";

    #[test]
    fn parses_prompted_format() {
        let questions = parse_quiz(GENERATED);
        assert_eq!(questions.len(), 2);

        assert_eq!(questions[0].question, "What is the powerhouse of the cell?");
        assert_eq!(
            questions[0].options,
            vec!["Nucleus", "Mitochondria", "Ribosome", "Golgi apparatus"]
        );
        assert_eq!(questions[0].correct_answer, 1);
        assert_eq!(
            questions[0].explanation.as_deref(),
            Some("Mitochondria produce most of the cell's ATP.")
        );

        assert_eq!(questions[1].correct_answer, 2);
        assert_eq!(questions[1].options[2], "Carbon dioxide");
    }

    #[test]
    fn missing_answer_line_defaults_to_first_option() {
        let text = "### Question 1\nPick one\nA) left\nB) right\n";
        let questions = parse_quiz(text);
        assert_eq!(questions.len(), 1);
        assert_eq!(questions[0].correct_answer, 0);
        assert_eq!(questions[0].explanation, None);
    }

    #[test]
    fn blocks_with_fewer_than_two_options_are_dropped() {
        let text = "Question 1: Only one?\nA) yes\nAnswer: A\n\nQuestion 2: Two?\nA) yes\nB) no\nAnswer: b";
        let questions = parse_quiz(text);
        assert_eq!(questions.len(), 1);
        assert_eq!(questions[0].question, "Two?");
        assert_eq!(questions[0].correct_answer, 1);
    }

    #[test]
    fn numbered_questions_with_inline_options() {
        let text = "1. What is 2+2? A) 3 B) 4 C) 5 D) 22\nAnswer: B\n2. **Largest planet?**\nA) Mars\nB) Jupiter\nExplanation: Jupiter is a gas giant\nwith many moons.\nAnswer: B";
        let questions = parse_quiz(text);
        assert_eq!(questions.len(), 2);
        assert_eq!(questions[0].question, "What is 2+2?");
        assert_eq!(questions[0].options, vec!["3", "4", "5", "22"]);
        assert_eq!(questions[0].correct_answer, 1);
        assert_eq!(questions[1].question, "Largest planet?");
        assert_eq!(
            questions[1].explanation.as_deref(),
            Some("Jupiter is a gas giant with many moons.")
        );
    }

    #[test]
    fn options_stop_at_four_and_continue_across_lines() {
        let text = "### Question 1\nWhich?\nA) first part\ncontinued\nB) two\nC) three\nD) four\nE) five\n";
        let questions = parse_quiz(text);
        assert_eq!(
            questions[0].options,
            vec!["first part continued", "two", "three", "four"]
        );
    }

    #[test]
    fn answer_word_after_label_is_not_a_letter() {
        assert_eq!(answer_line("Answer: Because it is"), Some(None));
        assert_eq!(answer_line("Correct Answer: d)"), Some(Some(3)));
        assert_eq!(answer_line("Answer B"), Some(Some(1)));
        assert_eq!(answer_line("Answers vary"), None);
        assert_eq!(answer_line("Answer a few of these"), None);
        assert_eq!(answer_line("Another line"), None);
    }

    #[test]
    fn inline_answer_ends_the_last_option() {
        let questions = parse_quiz("1. What is 2+2? A) 3 B) 4 C) 5 D) 22 Answer: B");
        assert_eq!(questions.len(), 1);
        assert_eq!(questions[0].options, vec!["3", "4", "5", "22"]);
        assert_eq!(questions[0].correct_answer, 1);
    }

    #[test]
    fn inline_explanation_and_emphasised_answer_are_split_off() {
        let text = "### Question 1\nWhich is a noble gas?\nA) Oxygen\nB) Neon **Correct Answer:** B\nExplanation: Neon has a full outer shell.";
        let questions = parse_quiz(text);
        assert_eq!(questions[0].options, vec!["Oxygen", "Neon"]);
        assert_eq!(questions[0].correct_answer, 1);
        assert_eq!(
            questions[0].explanation.as_deref(),
            Some("Neon has a full outer shell.")
        );

        let inline = parse_quiz("1. Pick one A) left B) right Explanation: it is right");
        assert_eq!(inline[0].options, vec!["left", "right"]);
        assert_eq!(inline[0].explanation.as_deref(), Some("it is right"));
    }

    #[test]
    fn question_starting_with_answer_is_kept() {
        let text = "### Question 1\nAnswer the following: which number is prime?\nA) 4\nB) 7\nCorrect Answer: B";
        let questions = parse_quiz(text);
        assert_eq!(questions.len(), 1);
        assert_eq!(
            questions[0].question,
            "Answer the following: which number is prime?"
        );
        assert_eq!(questions[0].correct_answer, 1);
    }

    #[test]
    fn correct_answer_is_always_in_range() {
        for question in parse_quiz(GENERATED) {
            assert!(question.correct_answer <= 3);
        }
    }

    #[test]
    fn unstructured_text_gives_empty_list() {
        assert!(parse_quiz("No quiz today.").is_empty());
    }

    #[test]
    fn parsing_is_repeatable() {
        assert_eq!(parse_quiz(GENERATED), parse_quiz(GENERATED));
    }
}
