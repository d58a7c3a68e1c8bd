//! crates/studyforge_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! These structs are independent of any database or serialization format,
//! except where a type is itself a wire shape (AI response records).

use chrono::{DateTime, Utc};
use std::fmt;
use uuid::Uuid;

/// A file the user selected for a generation request.
///
/// Lives only in memory for the duration of one request; the raw bytes are
/// never persisted.
#[derive(Debug, Clone)]
pub struct UploadFile {
    /// Opaque per-request token used to tie extracted text back to its source.
    pub id: String,
    pub file_name: String,
    pub file_size: u64,
    pub mime_type: String,
    pub data: Vec<u8>,
}

/// Plain text extracted from one [`UploadFile`]. Derived, never persisted.
#[derive(Debug, Clone)]
pub struct ExtractedDocument {
    pub source_file_id: String,
    pub text: String,
}

/// The four generation task types the service supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationKind {
    Summary,
    Explanation,
    Flashcards,
    Quiz,
}

impl fmt::Display for GenerationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            GenerationKind::Summary => "summary",
            GenerationKind::Explanation => "explanation",
            GenerationKind::Flashcards => "flashcards",
            GenerationKind::Quiz => "quiz",
        };
        f.write_str(s)
    }
}

/// Difficulty requested for flashcard and quiz generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }

    /// The phrasing the prompt uses to describe this difficulty to the model.
    pub fn descriptor(&self) -> &'static str {
        match self {
            Difficulty::Easy => "basic and straightforward",
            Difficulty::Medium => "moderately challenging",
            Difficulty::Hard => "complex and detailed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "easy" => Some(Difficulty::Easy),
            "medium" => Some(Difficulty::Medium),
            "hard" => Some(Difficulty::Hard),
            _ => None,
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One generation task with its kind-dependent parameters.
///
/// Modeled as a tagged union so a task can never carry parameters that do
/// not apply to its kind.
#[derive(Debug, Clone)]
pub enum GenerationTask {
    Summary,
    Explanation { topic: Option<String> },
    Flashcards { count: u32, difficulty: Difficulty },
    Quiz { count: u32, difficulty: Difficulty },
}

impl GenerationTask {
    pub fn kind(&self) -> GenerationKind {
        match self {
            GenerationTask::Summary => GenerationKind::Summary,
            GenerationTask::Explanation { .. } => GenerationKind::Explanation,
            GenerationTask::Flashcards { .. } => GenerationKind::Flashcards,
            GenerationTask::Quiz { .. } => GenerationKind::Quiz,
        }
    }
}

/// A single front/back study card, in the order the model produced them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Flashcard {
    /// 1-based sequential id assigned during normalization.
    pub id: u32,
    pub front: String,
    pub back: String,
}

/// A four-option multiple-choice question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizQuestion {
    /// 1-based sequential id assigned during normalization.
    pub id: u32,
    pub question: String,
    pub options: Vec<String>,
    pub correct_answer_index: usize,
    /// Set by the caller once the user answers; never produced by the model.
    pub user_answer_index: Option<usize>,
}

/// The normalized result of one generation request.
#[derive(Debug, Clone)]
pub enum GenerationOutput {
    Summary(String),
    Explanation(String),
    Flashcards(Vec<Flashcard>),
    Quiz(Vec<QuizQuestion>),
}

/// Subscription plan bounding per-request item counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanTier {
    Basic,
    Pro,
    Premium,
}

impl PlanTier {
    /// Maximum flashcards or quiz questions a single request may ask for.
    pub fn max_items(&self) -> u32 {
        match self {
            PlanTier::Basic => 5,
            PlanTier::Pro => 10,
            PlanTier::Premium => 50,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PlanTier::Basic => "basic",
            PlanTier::Pro => "pro",
            PlanTier::Premium => "premium",
        }
    }

    /// Unknown tier strings fall back to basic rather than failing the request.
    pub fn parse(s: &str) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "premium" => PlanTier::Premium,
            "pro" => PlanTier::Pro,
            _ => PlanTier::Basic,
        }
    }
}

impl fmt::Display for PlanTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-user generation counters, owned by the external user-record store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UsageCounters {
    pub file_uploads: u32,
    pub summaries: u32,
    pub explanations: u32,
    pub flashcard_sets: u32,
    pub quizzes: u32,
}

impl UsageCounters {
    pub fn count_for(&self, kind: GenerationKind) -> u32 {
        match kind {
            GenerationKind::Summary => self.summaries,
            GenerationKind::Explanation => self.explanations,
            GenerationKind::Flashcards => self.flashcard_sets,
            GenerationKind::Quiz => self.quizzes,
        }
    }
}

/// Represents a user account - used throughout the app.
#[derive(Debug, Clone)]
pub struct UserAccount {
    pub id: Uuid,
    pub email: Option<String>,
    pub plan: PlanTier,
    pub usage: UsageCounters,
    pub created_at: DateTime<Utc>,
}

// Only used internally for login/signup - contains sensitive data
#[derive(Debug, Clone)]
pub struct UserCredentials {
    pub user_id: Uuid,
    pub email: String,
    pub hashed_password: String,
}

// Represents a browser login session (auth cookie)
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub id: String,
    pub user_id: Uuid,
    pub expires_at: DateTime<Utc>,
}

/// Who produced a chat turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatRole {
    User,
    Assistant,
}

/// One turn of the document Q&A conversation.
#[derive(Debug, Clone)]
pub struct ChatTurn {
    pub role: ChatRole,
    pub content: String,
}

impl ChatTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self { role: ChatRole::User, content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: ChatRole::Assistant, content: content.into() }
    }
}

/// Everything the payment gateway needs to open a checkout session.
#[derive(Debug, Clone)]
pub struct CheckoutRequest {
    pub amount: f64,
    pub currency: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub tx_ref: String,
    pub callback_url: String,
}

impl CheckoutRequest {
    /// The name of the first required field that is missing or empty, if any.
    ///
    /// Callers must reject the request before dispatching it to the gateway
    /// when this returns `Some`.
    pub fn missing_field(&self) -> Option<&'static str> {
        if self.amount <= 0.0 {
            return Some("amount");
        }
        if self.email.trim().is_empty() {
            return Some("email");
        }
        if self.first_name.trim().is_empty() {
            return Some("first_name");
        }
        if self.last_name.trim().is_empty() {
            return Some("last_name");
        }
        if self.tx_ref.trim().is_empty() {
            return Some("tx_ref");
        }
        if self.callback_url.trim().is_empty() {
            return Some("callback_url");
        }
        None
    }
}

/// A checkout session opened by the payment gateway.
#[derive(Debug, Clone)]
pub struct CheckoutSession {
    pub checkout_url: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tier_caps_match_plans() {
        assert_eq!(PlanTier::Basic.max_items(), 5);
        assert_eq!(PlanTier::Pro.max_items(), 10);
        assert_eq!(PlanTier::Premium.max_items(), 50);
    }

    #[test]
    fn unknown_plan_string_falls_back_to_basic() {
        assert_eq!(PlanTier::parse("Premium"), PlanTier::Premium);
        assert_eq!(PlanTier::parse("enterprise"), PlanTier::Basic);
    }

    #[test]
    fn checkout_request_reports_first_missing_field() {
        let req = CheckoutRequest {
            amount: 500.0,
            currency: "ETB".to_string(),
            email: "student@example.com".to_string(),
            first_name: "Abel".to_string(),
            last_name: "Tesfaye".to_string(),
            tx_ref: "tx-123".to_string(),
            callback_url: "https://example.com/cb".to_string(),
        };
        assert_eq!(req.missing_field(), None);

        let mut missing_email = req.clone();
        missing_email.email.clear();
        assert_eq!(missing_email.missing_field(), Some("email"));

        let mut zero_amount = req;
        zero_amount.amount = 0.0;
        assert_eq!(zero_amount.missing_field(), Some("amount"));
    }
}
