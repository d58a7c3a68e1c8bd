//! crates/studyforge_core/src/normalize.rs
//!
//! Cleans up raw model output. Free-text responses get quote/escape/markup
//! cleanup for rendering; flashcard and quiz responses are parsed from JSON
//! into typed records, with the duck-typed field synonyms the model
//! sometimes emits normalized at this boundary.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;

use crate::domain::{Flashcard, QuizQuestion};

static BOLD_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\*\*(.*?)\*\*").expect("valid regex"));
static ITALIC_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\*(.*?)\*").expect("valid regex"));

/// A structured response that could not be turned into records. Terminal
/// for the request: no partial list is ever returned, and the raw model
/// output is never shown to the user.
#[derive(Debug, thiserror::Error)]
pub enum InvalidFormatError {
    #[error("response is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("expected a JSON array of objects")]
    NotAnArray,
    #[error("flashcard {index} is missing its front or back text")]
    BadFlashcard { index: usize },
    #[error("quiz question {index} is malformed")]
    BadQuizQuestion { index: usize },
}

/// Cleans a free-text response for rendering.
///
/// Strips one leading and one trailing double quote, unescapes literal
/// `\n` sequences, and rewrites the model's lightweight emphasis markup to
/// HTML. The bold pass runs before the italic pass so double asterisks are
/// never half-consumed. Running the cleanup on its own output is a no-op.
pub fn clean_free_text(raw: &str) -> String {
    let text = raw.strip_prefix('"').unwrap_or(raw);
    let text = text.strip_suffix('"').unwrap_or(text);
    let text = text.replace("\\n", "\n");
    let text = BOLD_RE.replace_all(&text, "<strong>$1</strong>");
    let text = ITALIC_RE.replace_all(&text, "<em>$1</em>");
    text.into_owned()
}

/// Drops a leading ```` ```json ```` (or bare ```` ``` ````) fence and a
/// trailing ```` ``` ```` fence, if present.
fn strip_fences(raw: &str) -> &str {
    let mut text = raw.trim();
    if let Some(rest) = text.strip_prefix("```json") {
        text = rest.trim_start();
    } else if let Some(rest) = text.strip_prefix("```") {
        text = rest.trim_start();
    }
    if let Some(rest) = text.strip_suffix("```") {
        text = rest.trim_end();
    }
    text
}

fn top_level_array(raw: &str) -> Result<Vec<serde_json::Value>, InvalidFormatError> {
    let value: serde_json::Value = serde_json::from_str(strip_fences(raw))?;
    match value {
        serde_json::Value::Array(items) => Ok(items),
        _ => Err(InvalidFormatError::NotAnArray),
    }
}

/// The duck-typed flashcard shapes the model emits, collapsed into one
/// canonical record. `question`/`answer` are accepted as synonyms for
/// `front`/`back`; any id the model invents is ignored.
#[derive(Deserialize)]
struct RawFlashcard {
    #[serde(alias = "question")]
    front: String,
    #[serde(alias = "answer")]
    back: String,
}

#[derive(Deserialize)]
struct RawQuizQuestion {
    question: String,
    options: Vec<String>,
    #[serde(rename = "correctAnswer")]
    correct_answer: usize,
}

/// Parses a flashcards response into records with 1-based sequential ids.
pub fn parse_flashcards(raw: &str) -> Result<Vec<Flashcard>, InvalidFormatError> {
    top_level_array(raw)?
        .into_iter()
        .enumerate()
        .map(|(i, item)| {
            let index = i + 1;
            let card: RawFlashcard = serde_json::from_value(item)
                .map_err(|_| InvalidFormatError::BadFlashcard { index })?;
            if card.front.trim().is_empty() || card.back.trim().is_empty() {
                return Err(InvalidFormatError::BadFlashcard { index });
            }
            Ok(Flashcard {
                id: index as u32,
                front: card.front,
                back: card.back,
            })
        })
        .collect()
}

/// Parses a quiz response into records with 1-based sequential ids.
/// Each question must carry exactly four non-empty options and a correct
/// index in 0..=3; `user_answer_index` always starts unset.
pub fn parse_quiz(raw: &str) -> Result<Vec<QuizQuestion>, InvalidFormatError> {
    top_level_array(raw)?
        .into_iter()
        .enumerate()
        .map(|(i, item)| {
            let index = i + 1;
            let question: RawQuizQuestion = serde_json::from_value(item)
                .map_err(|_| InvalidFormatError::BadQuizQuestion { index })?;

            let well_formed = !question.question.trim().is_empty()
                && question.options.len() == 4
                && question.options.iter().all(|o| !o.trim().is_empty())
                && question.correct_answer <= 3;
            if !well_formed {
                return Err(InvalidFormatError::BadQuizQuestion { index });
            }

            Ok(QuizQuestion {
                id: index as u32,
                question: question.question,
                options: question.options,
                correct_answer_index: question.correct_answer,
                user_answer_index: None,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cleanup_strips_wrapping_quotes_and_unescapes_newlines() {
        let cleaned = clean_free_text("\"First line\\nSecond line\"");
        assert_eq!(cleaned, "First line\nSecond line");
    }

    #[test]
    fn emphasis_markup_becomes_html_tags() {
        let cleaned = clean_free_text("A **key theme** and an *aside*.");
        assert_eq!(cleaned, "A <strong>key theme</strong> and an <em>aside</em>.");
    }

    #[test]
    fn cleanup_is_idempotent() {
        let once = clean_free_text("\"**Main idea**\\nwith *detail* below\"");
        let twice = clean_free_text(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn fenced_json_normalizes_like_bare_json() {
        let bare = r#"[{"front":"Q1","back":"A1"}]"#;
        let fenced = format!("```json\n{bare}\n```");
        assert_eq!(
            parse_flashcards(bare).unwrap(),
            parse_flashcards(&fenced).unwrap()
        );
    }

    #[test]
    fn flashcards_get_sequential_ids_from_one() {
        let raw = r#"[
            {"front": "What is osmosis?", "back": "Diffusion of water."},
            {"id": 99, "front": "Define enzyme", "back": "A biological catalyst."}
        ]"#;
        let cards = parse_flashcards(raw).unwrap();
        assert_eq!(cards.len(), 2);
        assert_eq!(cards[0].id, 1);
        // The id the model invented is ignored.
        assert_eq!(cards[1].id, 2);
        assert_eq!(cards[1].front, "Define enzyme");
    }

    #[test]
    fn flashcard_synonym_fields_are_accepted() {
        let raw = r#"[{"question": "Largest planet?", "answer": "Jupiter"}]"#;
        let cards = parse_flashcards(raw).unwrap();
        assert_eq!(cards[0].front, "Largest planet?");
        assert_eq!(cards[0].back, "Jupiter");
    }

    #[test]
    fn empty_front_or_back_fails_the_whole_parse() {
        let raw = r#"[{"front": "ok", "back": "ok"}, {"front": " ", "back": "x"}]"#;
        let err = parse_flashcards(raw).unwrap_err();
        assert!(matches!(err, InvalidFormatError::BadFlashcard { index: 2 }));
    }

    #[test]
    fn quiz_question_maps_correct_answer_and_leaves_user_answer_unset() {
        let raw = r#"[{"question":"Q","options":["A","B","C","D"],"correctAnswer":1}]"#;
        let quiz = parse_quiz(raw).unwrap();
        assert_eq!(quiz.len(), 1);
        assert_eq!(quiz[0].correct_answer_index, 1);
        assert_eq!(quiz[0].user_answer_index, None);
        assert_eq!(quiz[0].id, 1);
    }

    #[test]
    fn quiz_with_wrong_option_count_is_rejected() {
        let raw = r#"[{"question":"Q","options":["A","B","C"],"correctAnswer":1}]"#;
        let err = parse_quiz(raw).unwrap_err();
        assert!(matches!(err, InvalidFormatError::BadQuizQuestion { index: 1 }));
    }

    #[test]
    fn quiz_with_out_of_range_answer_is_rejected() {
        let raw = r#"[{"question":"Q","options":["A","B","C","D"],"correctAnswer":4}]"#;
        assert!(parse_quiz(raw).is_err());
    }

    #[test]
    fn trailing_comma_json_is_terminal() {
        let raw = r#"[{"front":"Q","back":"A"},]"#;
        let err = parse_flashcards(raw).unwrap_err();
        assert!(matches!(err, InvalidFormatError::Json(_)));
    }

    #[test]
    fn non_array_top_level_is_rejected() {
        let raw = r#"{"front":"Q","back":"A"}"#;
        let err = parse_flashcards(raw).unwrap_err();
        assert!(matches!(err, InvalidFormatError::NotAnArray));
    }
}
