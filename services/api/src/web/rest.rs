//! services/api/src/web/rest.rs
//!
//! Contains the Axum handlers for the REST API endpoints and the master
//! definition for the OpenAPI specification.

use crate::web::state::AppState;
use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    Extension,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, warn};
use utoipa::{OpenApi, ToSchema};
use uuid::Uuid;

use studyforge_core::domain::{
    ChatTurn, CheckoutRequest, Difficulty, GenerationOutput, GenerationTask, PlanTier,
    UploadFile,
};
use studyforge_core::pipeline::GenerationError;
use studyforge_core::ports::AiError;
use studyforge_core::prompt::chat_turns_with_context;
use studyforge_core::validate::{is_duplicate, validate_upload};

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        generate_summary_handler,
        generate_explanation_handler,
        generate_flashcards_handler,
        generate_quiz_handler,
        chat_handler,
        uploads_handler,
        account_handler,
        initialize_payment_handler,
    ),
    components(
        schemas(
            SummaryResponse,
            ExplanationResponse,
            FlashcardDto,
            FlashcardsResponse,
            QuizQuestionDto,
            QuizResponse,
            ChatMessageDto,
            ChatRequest,
            ChatResponse,
            UploadsResponse,
            RejectedFileDto,
            AccountResponse,
            PaymentRequest,
            PaymentResponse,
        )
    ),
    tags(
        (name = "StudyForge API", description = "API endpoints for AI-assisted study material generation.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// API Response and Payload Structs
//=========================================================================================

#[derive(Serialize, ToSchema)]
pub struct SummaryResponse {
    summary: String,
}

#[derive(Serialize, ToSchema)]
pub struct ExplanationResponse {
    explanation: String,
}

#[derive(Serialize, ToSchema)]
pub struct FlashcardDto {
    id: u32,
    front: String,
    back: String,
}

#[derive(Serialize, ToSchema)]
pub struct FlashcardsResponse {
    flashcards: Vec<FlashcardDto>,
}

#[derive(Serialize, ToSchema)]
pub struct QuizQuestionDto {
    id: u32,
    question: String,
    options: Vec<String>,
    correct_answer: usize,
}

#[derive(Serialize, ToSchema)]
pub struct QuizResponse {
    questions: Vec<QuizQuestionDto>,
}

#[derive(Deserialize, ToSchema)]
pub struct ChatMessageDto {
    role: String,
    content: String,
}

#[derive(Deserialize, ToSchema)]
pub struct ChatRequest {
    messages: Vec<ChatMessageDto>,
    file_content: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct ChatResponse {
    response: String,
}

#[derive(Serialize, ToSchema)]
pub struct RejectedFileDto {
    file_name: String,
    reason: String,
}

#[derive(Serialize, ToSchema)]
pub struct UploadsResponse {
    accepted: Vec<String>,
    skipped_duplicates: Vec<String>,
    rejected: Vec<RejectedFileDto>,
}

#[derive(Serialize, ToSchema)]
pub struct AccountResponse {
    user_id: Uuid,
    email: Option<String>,
    plan: String,
    file_uploads: u32,
    summaries_generated: u32,
    explanations_generated: u32,
    flashcards_generated: u32,
    quizzes_generated: u32,
    created_at: DateTime<Utc>,
}

#[derive(Deserialize, ToSchema)]
pub struct PaymentRequest {
    amount: f64,
    currency: Option<String>,
    email: String,
    first_name: String,
    last_name: String,
    tx_ref: String,
    callback_url: String,
    /// Plan being purchased; applied to the account once checkout opens.
    plan: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct PaymentResponse {
    checkout_url: String,
}

//=========================================================================================
// Multipart Helpers
//=========================================================================================

/// Everything one generation request carries: the selected files plus the
/// kind-dependent text fields (`count`, `difficulty`, `topic`).
struct UploadBatch {
    files: Vec<UploadFile>,
    count: Option<String>,
    difficulty: Option<String>,
    topic: Option<String>,
}

/// Reads a multipart form into an [`UploadBatch`]. Duplicate files (same
/// name and size as one already in the batch) are skipped with a notice
/// rather than failing the request.
async fn collect_upload_batch(
    mut multipart: Multipart,
) -> Result<UploadBatch, (StatusCode, String)> {
    let mut batch = UploadBatch {
        files: Vec::new(),
        count: None,
        difficulty: None,
        topic: None,
    };

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        (
            StatusCode::BAD_REQUEST,
            format!("Failed to read multipart data: {}", e),
        )
    })? {
        let field_name = field.name().unwrap_or_default().to_string();

        if let Some(file_name) = field.file_name().map(str::to_string) {
            let mime_type = field
                .content_type()
                .unwrap_or("application/octet-stream")
                .to_string();
            let data = field.bytes().await.map_err(|e| {
                (
                    StatusCode::BAD_REQUEST,
                    format!("Failed to read file bytes: {}", e),
                )
            })?;
            let file_size = data.len() as u64;

            if is_duplicate(&batch.files, &file_name, file_size) {
                warn!(%file_name, "duplicate file in batch, skipping");
                continue;
            }

            batch.files.push(UploadFile {
                id: Uuid::new_v4().to_string(),
                file_name,
                file_size,
                mime_type,
                data: data.to_vec(),
            });
        } else {
            let value = field.text().await.map_err(|e| {
                (
                    StatusCode::BAD_REQUEST,
                    format!("Failed to read form field: {}", e),
                )
            })?;
            match field_name.as_str() {
                "count" => batch.count = Some(value),
                "difficulty" => batch.difficulty = Some(value),
                "topic" => batch.topic = Some(value),
                _ => {}
            }
        }
    }

    if batch.files.is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            "Select at least one file".to_string(),
        ));
    }

    Ok(batch)
}

fn parse_count(batch: &UploadBatch) -> Result<u32, (StatusCode, String)> {
    let raw = batch
        .count
        .as_deref()
        .ok_or((StatusCode::BAD_REQUEST, "count is required".to_string()))?;
    raw.trim().parse::<u32>().map_err(|_| {
        (
            StatusCode::BAD_REQUEST,
            format!("'{}' is not a valid item count", raw),
        )
    })
}

fn parse_difficulty(batch: &UploadBatch) -> Result<Difficulty, (StatusCode, String)> {
    let raw = batch.difficulty.as_deref().unwrap_or("medium");
    Difficulty::parse(raw).ok_or((
        StatusCode::BAD_REQUEST,
        format!("'{}' is not a valid difficulty", raw),
    ))
}

/// Converts a pipeline failure into the user-facing status and notice.
/// Raw model output is never included in a response.
fn generation_error_response(err: GenerationError) -> (StatusCode, String) {
    error!(error = ?err, "generation request failed");
    match err {
        GenerationError::Validation { file_name, source } => {
            (StatusCode::BAD_REQUEST, format!("{file_name}: {source}"))
        }
        GenerationError::Extraction(e) => (StatusCode::UNPROCESSABLE_ENTITY, e.to_string()),
        GenerationError::Prompt(e) => (StatusCode::BAD_REQUEST, e.to_string()),
        GenerationError::Ai(AiError::Auth(_)) => (
            StatusCode::BAD_GATEWAY,
            "The AI provider rejected our credentials.".to_string(),
        ),
        GenerationError::Ai(AiError::RateLimit(_)) => (
            StatusCode::TOO_MANY_REQUESTS,
            "The AI provider is rate limiting requests. Please wait a moment and try again."
                .to_string(),
        ),
        GenerationError::Ai(AiError::Provider(_)) => (
            StatusCode::BAD_GATEWAY,
            "The AI provider could not complete the request.".to_string(),
        ),
        GenerationError::InvalidFormat(_) => (
            StatusCode::BAD_GATEWAY,
            "Failed to generate. Please try again.".to_string(),
        ),
    }
}

/// Caps the requested item count by the caller's plan tier; the prompt
/// builder never sees a request above the cap.
fn enforce_tier_cap(plan: PlanTier, count: u32) -> Result<(), (StatusCode, String)> {
    if count > plan.max_items() {
        return Err((
            StatusCode::BAD_REQUEST,
            format!(
                "Your {} plan allows at most {} items per request",
                plan,
                plan.max_items()
            ),
        ));
    }
    Ok(())
}

//=========================================================================================
// Generation Handlers
//=========================================================================================

/// Generate a book-style summary from the uploaded documents.
#[utoipa::path(
    post,
    path = "/generate/summary",
    request_body(content_type = "multipart/form-data", description = "The documents to summarize."),
    responses(
        (status = 200, description = "Summary generated", body = SummaryResponse),
        (status = 400, description = "Invalid file or missing input"),
        (status = 422, description = "A file's text could not be extracted"),
        (status = 429, description = "AI provider rate limit"),
        (status = 502, description = "AI provider failure")
    )
)]
pub async fn generate_summary_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    multipart: Multipart,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let batch = collect_upload_batch(multipart).await?;

    let output = app_state
        .pipeline
        .run(user_id, GenerationTask::Summary, &batch.files)
        .await
        .map_err(generation_error_response)?;

    match output {
        GenerationOutput::Summary(summary) => Ok(Json(SummaryResponse { summary })),
        _ => Err((
            StatusCode::INTERNAL_SERVER_ERROR,
            "Unexpected generation output".to_string(),
        )),
    }
}

/// Generate a topic-focused explanation from the uploaded documents.
#[utoipa::path(
    post,
    path = "/generate/explanation",
    request_body(content_type = "multipart/form-data", description = "The documents plus an optional `topic` field."),
    responses(
        (status = 200, description = "Explanation generated", body = ExplanationResponse),
        (status = 400, description = "Invalid file or missing input"),
        (status = 422, description = "A file's text could not be extracted"),
        (status = 429, description = "AI provider rate limit"),
        (status = 502, description = "AI provider failure")
    )
)]
pub async fn generate_explanation_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    multipart: Multipart,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let batch = collect_upload_batch(multipart).await?;
    let task = GenerationTask::Explanation {
        topic: batch.topic.clone(),
    };

    let output = app_state
        .pipeline
        .run(user_id, task, &batch.files)
        .await
        .map_err(generation_error_response)?;

    match output {
        GenerationOutput::Explanation(explanation) => {
            Ok(Json(ExplanationResponse { explanation }))
        }
        _ => Err((
            StatusCode::INTERNAL_SERVER_ERROR,
            "Unexpected generation output".to_string(),
        )),
    }
}

/// Generate flashcards from the uploaded documents.
#[utoipa::path(
    post,
    path = "/generate/flashcards",
    request_body(content_type = "multipart/form-data", description = "The documents plus `count` and `difficulty` fields."),
    responses(
        (status = 200, description = "Flashcards generated", body = FlashcardsResponse),
        (status = 400, description = "Invalid input or count above the plan cap"),
        (status = 422, description = "A file's text could not be extracted"),
        (status = 429, description = "AI provider rate limit"),
        (status = 502, description = "AI provider failure or unusable response")
    )
)]
pub async fn generate_flashcards_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    multipart: Multipart,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let batch = collect_upload_batch(multipart).await?;
    let count = parse_count(&batch)?;
    let difficulty = parse_difficulty(&batch)?;

    let account = app_state.db.get_account(user_id).await.map_err(|e| {
        error!("Failed to load account: {:?}", e);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to load account".to_string(),
        )
    })?;
    enforce_tier_cap(account.plan, count)?;

    let task = GenerationTask::Flashcards { count, difficulty };
    let output = app_state
        .pipeline
        .run(user_id, task, &batch.files)
        .await
        .map_err(generation_error_response)?;

    match output {
        GenerationOutput::Flashcards(cards) => Ok(Json(FlashcardsResponse {
            flashcards: cards
                .into_iter()
                .map(|c| FlashcardDto {
                    id: c.id,
                    front: c.front,
                    back: c.back,
                })
                .collect(),
        })),
        _ => Err((
            StatusCode::INTERNAL_SERVER_ERROR,
            "Unexpected generation output".to_string(),
        )),
    }
}

/// Generate a multiple-choice quiz from the uploaded documents.
#[utoipa::path(
    post,
    path = "/generate/quiz",
    request_body(content_type = "multipart/form-data", description = "The documents plus `count` and `difficulty` fields."),
    responses(
        (status = 200, description = "Quiz generated", body = QuizResponse),
        (status = 400, description = "Invalid input or count above the plan cap"),
        (status = 422, description = "A file's text could not be extracted"),
        (status = 429, description = "AI provider rate limit"),
        (status = 502, description = "AI provider failure or unusable response")
    )
)]
pub async fn generate_quiz_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    multipart: Multipart,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let batch = collect_upload_batch(multipart).await?;
    let count = parse_count(&batch)?;
    let difficulty = parse_difficulty(&batch)?;

    let account = app_state.db.get_account(user_id).await.map_err(|e| {
        error!("Failed to load account: {:?}", e);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to load account".to_string(),
        )
    })?;
    enforce_tier_cap(account.plan, count)?;

    let task = GenerationTask::Quiz { count, difficulty };
    let output = app_state
        .pipeline
        .run(user_id, task, &batch.files)
        .await
        .map_err(generation_error_response)?;

    match output {
        GenerationOutput::Quiz(questions) => Ok(Json(QuizResponse {
            questions: questions
                .into_iter()
                .map(|q| QuizQuestionDto {
                    id: q.id,
                    question: q.question,
                    options: q.options,
                    correct_answer: q.correct_answer_index,
                })
                .collect(),
        })),
        _ => Err((
            StatusCode::INTERNAL_SERVER_ERROR,
            "Unexpected generation output".to_string(),
        )),
    }
}

//=========================================================================================
// Chat, Uploads, Account, Payments
//=========================================================================================

/// Answer a question about previously extracted document content.
#[utoipa::path(
    post,
    path = "/chat",
    request_body = ChatRequest,
    responses(
        (status = 200, description = "Assistant reply", body = ChatResponse),
        (status = 400, description = "Empty conversation"),
        (status = 429, description = "AI provider rate limit"),
        (status = 502, description = "AI provider failure")
    )
)]
pub async fn chat_handler(
    State(app_state): State<Arc<AppState>>,
    Json(req): Json<ChatRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    if req.messages.is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            "Missing file content or user messages".to_string(),
        ));
    }

    let history: Vec<ChatTurn> = req
        .messages
        .iter()
        .map(|m| match m.role.as_str() {
            "assistant" => ChatTurn::assistant(m.content.clone()),
            _ => ChatTurn::user(m.content.clone()),
        })
        .collect();
    let turns = chat_turns_with_context(&history, req.file_content.as_deref());

    let response = app_state.ai.chat(&turns).await.map_err(|err| {
        generation_error_response(GenerationError::Ai(err))
    })?;

    Ok(Json(ChatResponse { response }))
}

/// Validate a batch of files against the shared allow-list and count the
/// accepted ones toward the user's upload counter.
#[utoipa::path(
    post,
    path = "/uploads",
    request_body(content_type = "multipart/form-data", description = "The files to upload."),
    responses(
        (status = 200, description = "Per-file validation outcome", body = UploadsResponse),
        (status = 400, description = "Malformed multipart body")
    )
)]
pub async fn uploads_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let mut accepted: Vec<UploadFile> = Vec::new();
    let mut skipped_duplicates = Vec::new();
    let mut rejected = Vec::new();

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        (
            StatusCode::BAD_REQUEST,
            format!("Failed to read multipart data: {}", e),
        )
    })? {
        let Some(file_name) = field.file_name().map(str::to_string) else {
            continue;
        };
        let mime_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let data = field.bytes().await.map_err(|e| {
            (
                StatusCode::BAD_REQUEST,
                format!("Failed to read file bytes: {}", e),
            )
        })?;
        let file_size = data.len() as u64;

        if let Err(reason) = validate_upload(&file_name, file_size, &mime_type) {
            rejected.push(RejectedFileDto {
                file_name,
                reason: reason.to_string(),
            });
            continue;
        }
        if is_duplicate(&accepted, &file_name, file_size) {
            skipped_duplicates.push(file_name);
            continue;
        }

        accepted.push(UploadFile {
            id: Uuid::new_v4().to_string(),
            file_name,
            file_size,
            mime_type,
            data: data.to_vec(),
        });
    }

    if !accepted.is_empty() {
        // Read-then-write counter update; last write wins across tabs.
        let result = async {
            let account = app_state.db.get_account(user_id).await?;
            app_state
                .db
                .write_file_upload_count(
                    user_id,
                    account.usage.file_uploads + accepted.len() as u32,
                )
                .await
        }
        .await;
        if let Err(err) = result {
            warn!(%user_id, error = %err, "failed to record file uploads");
        }
    }

    Ok(Json(UploadsResponse {
        accepted: accepted.into_iter().map(|f| f.file_name).collect(),
        skipped_duplicates,
        rejected,
    }))
}

/// The caller's plan tier and usage counters.
#[utoipa::path(
    get,
    path = "/account",
    responses(
        (status = 200, description = "Account profile", body = AccountResponse),
        (status = 401, description = "Not logged in"),
        (status = 404, description = "Account not found")
    )
)]
pub async fn account_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let account = app_state.db.get_account(user_id).await.map_err(|e| {
        error!("Failed to load account: {:?}", e);
        (StatusCode::NOT_FOUND, "Account not found".to_string())
    })?;

    Ok(Json(AccountResponse {
        user_id: account.id,
        email: account.email,
        plan: account.plan.to_string(),
        file_uploads: account.usage.file_uploads,
        summaries_generated: account.usage.summaries,
        explanations_generated: account.usage.explanations,
        flashcards_generated: account.usage.flashcard_sets,
        quizzes_generated: account.usage.quizzes,
        created_at: account.created_at,
    }))
}

/// Open a hosted checkout session for a plan change.
#[utoipa::path(
    post,
    path = "/payments/initialize",
    request_body = PaymentRequest,
    responses(
        (status = 200, description = "Checkout session opened", body = PaymentResponse),
        (status = 400, description = "A required field is missing"),
        (status = 502, description = "Payment gateway failure")
    )
)]
pub async fn initialize_payment_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Json(req): Json<PaymentRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let checkout = CheckoutRequest {
        amount: req.amount,
        currency: req.currency.unwrap_or_else(|| "ETB".to_string()),
        email: req.email,
        first_name: req.first_name,
        last_name: req.last_name,
        tx_ref: req.tx_ref,
        callback_url: req.callback_url,
    };

    // Rejected here, before anything reaches the gateway adapter.
    if let Some(field) = checkout.missing_field() {
        return Err((
            StatusCode::BAD_REQUEST,
            format!("Missing required fields: {field}"),
        ));
    }

    let session = app_state
        .payments
        .initialize_checkout(&checkout)
        .await
        .map_err(|e| {
            error!("Payment initialization failed: {:?}", e);
            (
                StatusCode::BAD_GATEWAY,
                "Payment processing error".to_string(),
            )
        })?;

    if let Some(plan) = req.plan.as_deref() {
        let tier = PlanTier::parse(plan);
        if let Err(err) = app_state.db.set_plan(user_id, tier).await {
            warn!(%user_id, error = %err, "failed to update plan after checkout");
        }
    }

    Ok(Json(PaymentResponse {
        checkout_url: session.checkout_url,
    }))
}
