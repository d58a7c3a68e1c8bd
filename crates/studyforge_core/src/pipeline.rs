//! crates/studyforge_core/src/pipeline.rs
//!
//! Orchestrates one generation request end to end:
//! validate -> extract -> prompt -> AI call -> normalize -> record usage.
//!
//! Each request walks the phases in order and never revisits one; `Failed`
//! is terminal and the caller must start a fresh request. There is no
//! shared mutable state between requests, so no locking is needed here.

use std::sync::Arc;

use tracing::{debug, warn};
use uuid::Uuid;

use crate::domain::{GenerationKind, GenerationOutput, GenerationTask, UploadFile};
use crate::extract::{build_corpus, CorpusError};
use crate::normalize::{clean_free_text, parse_flashcards, parse_quiz, InvalidFormatError};
use crate::ports::{AiError, GenerativeAiService, UserRecordStore};
use crate::prompt::{build_prompt, PromptError};
use crate::validate::{validate_upload, ValidationError};

/// The phases a single generation request moves through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationPhase {
    Idle,
    Validating,
    Extracting,
    Prompting,
    AwaitingResponse,
    Normalizing,
    Done,
    Failed,
}

/// Everything that can end a generation request in `Failed`, preserving the
/// originating error kind for the request boundary to word appropriately.
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("{file_name}: {source}")]
    Validation {
        file_name: String,
        #[source]
        source: ValidationError,
    },
    #[error(transparent)]
    Extraction(#[from] CorpusError),
    #[error(transparent)]
    Prompt(#[from] PromptError),
    #[error(transparent)]
    Ai(#[from] AiError),
    #[error(transparent)]
    InvalidFormat(#[from] InvalidFormatError),
}

/// Runs generation requests against the injected AI gateway and user-record
/// store. Owns no per-request state; every call to [`run`] is independent.
///
/// [`run`]: GenerationPipeline::run
#[derive(Clone)]
pub struct GenerationPipeline {
    ai: Arc<dyn GenerativeAiService>,
    store: Arc<dyn UserRecordStore>,
}

impl GenerationPipeline {
    pub fn new(ai: Arc<dyn GenerativeAiService>, store: Arc<dyn UserRecordStore>) -> Self {
        Self { ai, store }
    }

    /// Runs one request to completion and, on success, records the usage
    /// counter for its kind.
    pub async fn run(
        &self,
        user_id: Uuid,
        task: GenerationTask,
        files: &[UploadFile],
    ) -> Result<GenerationOutput, GenerationError> {
        let kind = task.kind();
        debug!(%kind, files = files.len(), "starting generation request");

        match self.execute(&task, files).await {
            Ok(output) => {
                self.transition(kind, GenerationPhase::Done);
                self.record_usage(user_id, kind).await;
                Ok(output)
            }
            Err(err) => {
                self.transition(kind, GenerationPhase::Failed);
                Err(err)
            }
        }
    }

    async fn execute(
        &self,
        task: &GenerationTask,
        files: &[UploadFile],
    ) -> Result<GenerationOutput, GenerationError> {
        let kind = task.kind();

        self.transition(kind, GenerationPhase::Validating);
        for file in files {
            validate_upload(&file.file_name, file.file_size, &file.mime_type).map_err(
                |source| GenerationError::Validation {
                    file_name: file.file_name.clone(),
                    source,
                },
            )?;
        }

        // Files are extracted sequentially so corpus order stays
        // deterministic and the first failure can abort the whole batch.
        self.transition(kind, GenerationPhase::Extracting);
        let corpus = build_corpus(files)?;

        self.transition(kind, GenerationPhase::Prompting);
        let prompt = build_prompt(task, &corpus)?;

        self.transition(kind, GenerationPhase::AwaitingResponse);
        let raw = self.ai.generate(&prompt).await?;

        self.transition(kind, GenerationPhase::Normalizing);
        let output = match task {
            GenerationTask::Summary => GenerationOutput::Summary(clean_free_text(&raw)),
            GenerationTask::Explanation { .. } => {
                GenerationOutput::Explanation(clean_free_text(&raw))
            }
            GenerationTask::Flashcards { .. } => {
                GenerationOutput::Flashcards(parse_flashcards(&raw)?)
            }
            GenerationTask::Quiz { .. } => GenerationOutput::Quiz(parse_quiz(&raw)?),
        };

        Ok(output)
    }

    /// Bumps the user's counter for this kind with a read-then-write update,
    /// deliberately not an atomic increment: overlapping generations by the
    /// same user may under-count, which is an accepted limitation of the
    /// counter data. A failed write is logged and does not fail the
    /// already-completed generation.
    async fn record_usage(&self, user_id: Uuid, kind: GenerationKind) {
        let result = async {
            let account = self.store.get_account(user_id).await?;
            let current = account.usage.count_for(kind);
            self.store
                .write_generation_count(user_id, kind, current + 1)
                .await
        }
        .await;

        if let Err(err) = result {
            warn!(%kind, %user_id, error = %err, "failed to record usage after generation");
        }
    }

    fn transition(&self, kind: GenerationKind, phase: GenerationPhase) {
        debug!(%kind, ?phase, "generation phase");
    }
}
