//! crates/study_notes_core/src/parsing/mod.rs
//!
//! Turns the semi-structured Markdown returned by the model into typed study items.
//!
//! Both parsers walk the text line by line with an explicit state machine. They are
//! pure: the same text always yields the same items, and text that matches nothing
//! yields an empty list rather than an error.

mod flashcards;
mod quiz;

pub use flashcards::parse_flashcards;
pub use quiz::parse_quiz;

const EMPHASIS: [char; 2] = ['*', '_'];

/// Drops leading Markdown heading hashes, emphasis and whitespace.
fn strip_heading(line: &str) -> &str {
    line.trim()
        .trim_start_matches('#')
        .trim_start()
        .trim_start_matches(EMPHASIS)
        .trim_start()
}

/// `---`, `----`, ... on a line of its own.
fn is_horizontal_rule(line: &str) -> bool {
    let line = line.trim();
    line.len() >= 3 && line.chars().all(|c| c == '-')
}

/// Removes a matching pair of `**` or `__` around the whole text.
fn unwrap_emphasis(text: &str) -> &str {
    let text = text.trim();
    for wrapper in ["**", "__"] {
        if text.len() > 2 * wrapper.len() && text.starts_with(wrapper) && text.ends_with(wrapper)
        {
            return text[wrapper.len()..text.len() - wrapper.len()].trim();
        }
    }
    text
}

/// Case-insensitive `starts_with` for ASCII keywords.
fn starts_with_keyword(text: &str, keyword: &str) -> bool {
    text.len() >= keyword.len()
        && text.is_char_boundary(keyword.len())
        && text[..keyword.len()].eq_ignore_ascii_case(keyword)
}

/// If `text` starts with a keyword followed by a number (e.g. `Question 3`), returns
/// whatever follows the number.
fn numbered_heading<'a>(text: &'a str, keyword: &str) -> Option<&'a str> {
    if !starts_with_keyword(text, keyword) {
        return None;
    }
    let after = text[keyword.len()..].trim_start();
    let digits = after.chars().take_while(char::is_ascii_digit).count();
    if digits == 0 {
        return None;
    }
    Some(after[digits..].trim_start_matches([':', '.', ')', '*', '_', ' ', '\t']))
}

fn push_line(buffer: &mut String, line: &str, separator: char) {
    if !buffer.is_empty() {
        buffer.push(separator);
    }
    buffer.push_str(line);
}
