//! crates/studyforge_core/src/prompt.rs
//!
//! Builds the natural-language instruction for each generation kind. Pure
//! functions: the corpus is embedded verbatim, never truncated or
//! summarized here. Context-limit handling is explicitly out of scope.

use crate::domain::{ChatRole, ChatTurn, Difficulty, GenerationTask};

/// System instruction for the document Q&A conversation.
pub const CHAT_SYSTEM_INSTRUCTIONS: &str = "You are an intelligent assistant helping explain content from uploaded documents. Your role is to:\n1. Provide clear, accurate answers based on the document content\n2. If the answer isn't in the document, say so clearly\n3. Use markdown formatting for better readability\n4. Be concise but thorough in your explanations";

/// Rejected before any prompt is produced; nothing reaches the AI gateway.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PromptError {
    #[error("requested item count must be at least 1")]
    InvalidCount,
}

/// Composes the instruction string for one generation task.
///
/// Tier caps are the caller's responsibility; this layer only refuses
/// counts below 1.
pub fn build_prompt(task: &GenerationTask, corpus: &str) -> Result<String, PromptError> {
    match task {
        GenerationTask::Summary => Ok(summary_prompt(corpus)),
        GenerationTask::Explanation { topic } => Ok(explanation_prompt(topic.as_deref(), corpus)),
        GenerationTask::Flashcards { count, difficulty } => {
            if *count == 0 {
                return Err(PromptError::InvalidCount);
            }
            Ok(flashcards_prompt(*count, *difficulty, corpus))
        }
        GenerationTask::Quiz { count, difficulty } => {
            if *count == 0 {
                return Err(PromptError::InvalidCount);
            }
            Ok(quiz_prompt(*count, *difficulty, corpus))
        }
    }
}

fn summary_prompt(corpus: &str) -> String {
    format!(
        "Please summarize the following text as if summarizing a book. Focus on the main \
         themes, key events, and core ideas. Eliminate unnecessary details and present the \
         summary in a clear, coherent, and structured way: {corpus}"
    )
}

fn explanation_prompt(topic: Option<&str>, corpus: &str) -> String {
    match topic.map(str::trim).filter(|t| !t.is_empty()) {
        Some(topic) => format!(
            "Please explain the topic: \"{topic}\" based on the provided text. Highlight the \
             main ideas, clarify important concepts, and offer detailed, easy-to-understand \
             explanations: {corpus}"
        ),
        None => format!(
            "Please explain the following content. Highlight the main ideas, clarify \
             important concepts, and offer detailed, easy-to-understand explanations: {corpus}"
        ),
    }
}

fn flashcards_prompt(count: u32, difficulty: Difficulty, corpus: &str) -> String {
    format!(
        "Generate {count} flashcards with questions and answers based on the following text. \
         The difficulty level should be {difficulty}. Format each flashcard as a JSON object \
         with \"front\" for the question and \"back\" for the answer. The questions should \
         test understanding of key concepts, and answers should be clear and concise. For \
         {difficulty} difficulty, make the questions {descriptor}. Text: {corpus}",
        descriptor = difficulty.descriptor(),
    )
}

fn quiz_prompt(count: u32, difficulty: Difficulty, corpus: &str) -> String {
    format!(
        "Generate {count} multiple-choice questions (MCQs) based on the following book text. \
         The difficulty level should be {difficulty}. Focus on the main ideas, important \
         themes, and key concepts, not minor details. Each question should include 4 answer \
         options. For {difficulty} difficulty, make the questions {descriptor}. Format the \
         output as a JSON array, where each item is an object like: {{ \"question\": \"...\", \
         \"options\": [\"...\", \"...\", \"...\", \"...\"], \"correctAnswer\": <index from 0 \
         to 3> }}. Text: {corpus}",
        descriptor = difficulty.descriptor(),
    )
}

/// Folds the document corpus into a conversation by prepending it to the
/// newest user turn. With no corpus, or no trailing user turn, the history
/// is returned unchanged.
pub fn chat_turns_with_context(history: &[ChatTurn], corpus: Option<&str>) -> Vec<ChatTurn> {
    let mut turns = history.to_vec();

    if let Some(corpus) = corpus.map(str::trim).filter(|c| !c.is_empty()) {
        if let Some(last) = turns.last_mut() {
            if last.role == ChatRole::User {
                last.content = format!(
                    "Document content: \"\"\"{corpus}\"\"\"\n\nUser question: \"{question}\"\n\n\
                     Please provide a helpful answer based on the document content.",
                    question = last.content,
                );
            }
        }
    }

    turns
}

#[cfg(test)]
mod tests {
    use super::*;

    const CORPUS: &str = "Photosynthesis converts light into chemical energy.";

    #[test]
    fn summary_prompt_embeds_corpus_verbatim() {
        let prompt = build_prompt(&GenerationTask::Summary, CORPUS).unwrap();
        assert!(prompt.contains(CORPUS));
        assert!(prompt.contains("as if summarizing a book"));
    }

    #[test]
    fn explanation_prompt_quotes_the_topic() {
        let task = GenerationTask::Explanation {
            topic: Some("chlorophyll".to_string()),
        };
        let prompt = build_prompt(&task, CORPUS).unwrap();
        assert!(prompt.contains("the topic: \"chlorophyll\""));
        assert!(prompt.contains(CORPUS));
    }

    #[test]
    fn empty_topic_falls_back_to_general_explanation() {
        for topic in [None, Some("".to_string()), Some("   ".to_string())] {
            let prompt = build_prompt(&GenerationTask::Explanation { topic }, CORPUS).unwrap();
            assert!(prompt.starts_with("Please explain the following content."));
            assert!(!prompt.contains("the topic:"));
        }
    }

    #[test]
    fn flashcards_prompt_names_count_difficulty_and_contract() {
        let task = GenerationTask::Flashcards {
            count: 7,
            difficulty: Difficulty::Hard,
        };
        let prompt = build_prompt(&task, CORPUS).unwrap();
        assert!(prompt.contains("Generate 7 flashcards"));
        assert!(prompt.contains("difficulty level should be hard"));
        assert!(prompt.contains("complex and detailed"));
        assert!(prompt.contains("\"front\""));
        assert!(prompt.contains("\"back\""));
    }

    #[test]
    fn quiz_prompt_spells_out_the_json_shape() {
        let task = GenerationTask::Quiz {
            count: 3,
            difficulty: Difficulty::Easy,
        };
        let prompt = build_prompt(&task, CORPUS).unwrap();
        assert!(prompt.contains("Generate 3 multiple-choice questions"));
        assert!(prompt.contains("\"correctAnswer\": <index from 0 to 3>"));
        assert!(prompt.contains("basic and straightforward"));
    }

    #[test]
    fn zero_count_is_rejected_before_any_prompt_exists() {
        for task in [
            GenerationTask::Flashcards {
                count: 0,
                difficulty: Difficulty::Medium,
            },
            GenerationTask::Quiz {
                count: 0,
                difficulty: Difficulty::Medium,
            },
        ] {
            assert_eq!(build_prompt(&task, CORPUS), Err(PromptError::InvalidCount));
        }
    }

    #[test]
    fn chat_context_is_prepended_to_the_newest_user_turn() {
        let history = vec![
            ChatTurn::user("What is this about?"),
            ChatTurn::assistant("It covers photosynthesis."),
            ChatTurn::user("How does it start?"),
        ];
        let turns = chat_turns_with_context(&history, Some(CORPUS));

        assert_eq!(turns.len(), 3);
        assert_eq!(turns[0].content, "What is this about?");
        assert!(turns[2].content.contains(CORPUS));
        assert!(turns[2].content.contains("How does it start?"));
    }

    #[test]
    fn chat_without_corpus_is_untouched() {
        let history = vec![ChatTurn::user("Hello there")];
        let turns = chat_turns_with_context(&history, None);
        assert_eq!(turns[0].content, "Hello there");
    }
}
