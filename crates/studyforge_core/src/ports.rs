//! crates/studyforge_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of specific external implementations like databases or APIs.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::{
    ChatTurn, CheckoutRequest, CheckoutSession, GenerationKind, PlanTier, UserAccount,
    UserCredentials,
};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for record-store and payment port operations.
/// This abstracts away the specific errors from external services (e.g., database, network).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
    #[error("Unauthorized")]
    Unauthorized,
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

/// Failures the AI gateway can surface. The three variants are deliberately
/// distinguishable so the request boundary can word each one differently.
#[derive(Debug, thiserror::Error)]
pub enum AiError {
    /// The credential is missing or the provider rejected it (401/403).
    #[error("AI provider rejected the credential: {0}")]
    Auth(String),
    /// The provider signalled throttling (429). Callers should suggest waiting.
    #[error("AI provider rate limit reached: {0}")]
    RateLimit(String),
    /// Any other non-2xx status or malformed response.
    #[error("AI provider error: {0}")]
    Provider(String),
}

/// A convenience type alias for `Result<T, AiError>`.
pub type AiResult<T> = Result<T, AiError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

/// The external generative-AI endpoint. No retry is performed by
/// implementations; the caller decides whether to surface the error.
#[async_trait]
pub trait GenerativeAiService: Send + Sync {
    /// Sends a single prompt and returns the raw response text.
    async fn generate(&self, prompt: &str) -> AiResult<String>;

    /// Sends an ordered conversation (oldest first) and returns the next
    /// assistant turn. Corpus context, if any, is already folded into the
    /// newest user turn by the prompt layer.
    async fn chat(&self, turns: &[ChatTurn]) -> AiResult<String>;
}

/// The external user-record store: account documents keyed by an opaque id,
/// holding the plan tier and usage counters, plus the auth session records.
#[async_trait]
pub trait UserRecordStore: Send + Sync {
    // --- Account Management ---
    async fn create_account_with_email(
        &self,
        email: &str,
        hashed_password: &str,
    ) -> PortResult<UserAccount>;

    async fn get_account(&self, user_id: Uuid) -> PortResult<UserAccount>;

    async fn get_credentials_by_email(&self, email: &str) -> PortResult<UserCredentials>;

    async fn set_plan(&self, user_id: Uuid, plan: PlanTier) -> PortResult<()>;

    // --- Usage Counters ---
    // Field-level writes only. The read-then-write increment lives in the
    // core usage recorder, not here, so the accepted last-write-wins
    // semantics stay visible in one place.
    async fn write_generation_count(
        &self,
        user_id: Uuid,
        kind: GenerationKind,
        value: u32,
    ) -> PortResult<()>;

    async fn write_file_upload_count(&self, user_id: Uuid, value: u32) -> PortResult<()>;

    // --- Auth Methods ---
    async fn create_auth_session(
        &self,
        session_id: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()>;

    async fn validate_auth_session(&self, session_id: &str) -> PortResult<Uuid>;

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()>;
}

/// The external payment gateway used for plan upgrades.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Opens a hosted checkout session and returns its URL.
    ///
    /// Implementations must reject a request whose required fields are
    /// missing (see [`CheckoutRequest::missing_field`]) before dispatching
    /// anything over the wire.
    async fn initialize_checkout(&self, request: &CheckoutRequest) -> PortResult<CheckoutSession>;
}
