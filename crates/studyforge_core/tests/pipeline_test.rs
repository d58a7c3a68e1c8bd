//! End-to-end pipeline tests against scripted in-memory ports.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use studyforge_core::domain::{
    ChatTurn, CheckoutRequest, CheckoutSession, Difficulty, GenerationKind, GenerationOutput,
    GenerationTask, PlanTier, UploadFile, UsageCounters, UserAccount, UserCredentials,
};
use studyforge_core::pipeline::{GenerationError, GenerationPipeline};
use studyforge_core::ports::{
    AiResult, GenerativeAiService, PaymentGateway, PortError, PortResult, UserRecordStore,
};

//=========================================================================================
// Scripted port implementations
//=========================================================================================

/// AI gateway that records every prompt and replays a canned response.
struct ScriptedAi {
    response: String,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedAi {
    fn new(response: &str) -> Arc<Self> {
        Arc::new(Self {
            response: response.to_string(),
            prompts: Mutex::new(Vec::new()),
        })
    }

    fn prompt_count(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }
}

#[async_trait]
impl GenerativeAiService for ScriptedAi {
    async fn generate(&self, prompt: &str) -> AiResult<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        Ok(self.response.clone())
    }

    async fn chat(&self, _turns: &[ChatTurn]) -> AiResult<String> {
        Ok(self.response.clone())
    }
}

/// In-memory user-record store capturing counter writes.
struct InMemoryStore {
    accounts: Mutex<HashMap<Uuid, UserAccount>>,
    counter_writes: Mutex<Vec<(GenerationKind, u32)>>,
}

impl InMemoryStore {
    fn with_account(account: UserAccount) -> Arc<Self> {
        let mut accounts = HashMap::new();
        accounts.insert(account.id, account);
        Arc::new(Self {
            accounts: Mutex::new(accounts),
            counter_writes: Mutex::new(Vec::new()),
        })
    }

    fn writes(&self) -> Vec<(GenerationKind, u32)> {
        self.counter_writes.lock().unwrap().clone()
    }
}

#[async_trait]
impl UserRecordStore for InMemoryStore {
    async fn create_account_with_email(
        &self,
        _email: &str,
        _hashed_password: &str,
    ) -> PortResult<UserAccount> {
        Err(PortError::Unexpected("not used in this test".to_string()))
    }

    async fn get_account(&self, user_id: Uuid) -> PortResult<UserAccount> {
        self.accounts
            .lock()
            .unwrap()
            .get(&user_id)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("user {user_id}")))
    }

    async fn get_credentials_by_email(&self, email: &str) -> PortResult<UserCredentials> {
        Err(PortError::NotFound(email.to_string()))
    }

    async fn set_plan(&self, _user_id: Uuid, _plan: PlanTier) -> PortResult<()> {
        Ok(())
    }

    async fn write_generation_count(
        &self,
        _user_id: Uuid,
        kind: GenerationKind,
        value: u32,
    ) -> PortResult<()> {
        self.counter_writes.lock().unwrap().push((kind, value));
        Ok(())
    }

    async fn write_file_upload_count(&self, _user_id: Uuid, _value: u32) -> PortResult<()> {
        Ok(())
    }

    async fn create_auth_session(
        &self,
        _session_id: &str,
        _user_id: Uuid,
        _expires_at: DateTime<Utc>,
    ) -> PortResult<()> {
        Ok(())
    }

    async fn validate_auth_session(&self, _session_id: &str) -> PortResult<Uuid> {
        Err(PortError::Unauthorized)
    }

    async fn delete_auth_session(&self, _session_id: &str) -> PortResult<()> {
        Ok(())
    }
}

/// Payment gateway double; present only so the port surface stays honest.
struct RejectingGateway;

#[async_trait]
impl PaymentGateway for RejectingGateway {
    async fn initialize_checkout(&self, _request: &CheckoutRequest) -> PortResult<CheckoutSession> {
        Err(PortError::Unexpected("offline".to_string()))
    }
}

//=========================================================================================
// Helpers
//=========================================================================================

fn account(user_id: Uuid, usage: UsageCounters) -> UserAccount {
    UserAccount {
        id: user_id,
        email: Some("student@example.com".to_string()),
        plan: PlanTier::Pro,
        usage,
        created_at: Utc::now(),
    }
}

fn text_file(name: &str, contents: &str) -> UploadFile {
    UploadFile {
        id: name.to_string(),
        file_name: name.to_string(),
        file_size: contents.len() as u64,
        mime_type: "text/plain".to_string(),
        data: contents.as_bytes().to_vec(),
    }
}

//=========================================================================================
// Tests
//=========================================================================================

#[tokio::test]
async fn flashcards_round_trip_yields_sequential_records_and_bumps_the_counter() {
    let user_id = Uuid::new_v4();
    let response = r#"[
        {"front": "Q1", "back": "A1"},
        {"front": "Q2", "back": "A2"},
        {"front": "Q3", "back": "A3"}
    ]"#;
    let ai = ScriptedAi::new(response);
    let store = InMemoryStore::with_account(account(
        user_id,
        UsageCounters {
            flashcard_sets: 2,
            ..UsageCounters::default()
        },
    ));
    let pipeline = GenerationPipeline::new(ai.clone(), store.clone());

    let task = GenerationTask::Flashcards {
        count: 3,
        difficulty: Difficulty::Medium,
    };
    let files = vec![text_file("notes.txt", "Cells are the unit of life.")];

    let output = pipeline.run(user_id, task, &files).await.unwrap();
    let cards = match output {
        GenerationOutput::Flashcards(cards) => cards,
        other => panic!("expected flashcards, got {other:?}"),
    };

    assert_eq!(cards.len(), 3);
    assert_eq!(
        cards.iter().map(|c| c.id).collect::<Vec<_>>(),
        vec![1, 2, 3]
    );

    // The prompt embedded the corpus verbatim.
    let prompts = ai.prompts.lock().unwrap();
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].contains("Cells are the unit of life."));

    // Read-then-write increment: previous count 2, written back as 3.
    assert_eq!(store.writes(), vec![(GenerationKind::Flashcards, 3)]);
}

#[tokio::test]
async fn summary_output_is_cleaned_before_it_reaches_the_caller() {
    let user_id = Uuid::new_v4();
    let ai = ScriptedAi::new("\"The **main** theme\\nis growth\"");
    let store = InMemoryStore::with_account(account(user_id, UsageCounters::default()));
    let pipeline = GenerationPipeline::new(ai, store.clone());

    let files = vec![text_file("essay.txt", "A story about growth.")];
    let output = pipeline
        .run(user_id, GenerationTask::Summary, &files)
        .await
        .unwrap();

    match output {
        GenerationOutput::Summary(text) => {
            assert_eq!(text, "The <strong>main</strong> theme\nis growth");
        }
        other => panic!("expected summary, got {other:?}"),
    }
    assert_eq!(store.writes(), vec![(GenerationKind::Summary, 1)]);
}

#[tokio::test]
async fn malformed_json_fails_the_request_and_records_nothing() {
    let user_id = Uuid::new_v4();
    let ai = ScriptedAi::new(r#"[{"front":"Q","back":"A"},]"#);
    let store = InMemoryStore::with_account(account(user_id, UsageCounters::default()));
    let pipeline = GenerationPipeline::new(ai, store.clone());

    let task = GenerationTask::Quiz {
        count: 2,
        difficulty: Difficulty::Easy,
    };
    let files = vec![text_file("notes.txt", "content")];

    let err = pipeline.run(user_id, task, &files).await.unwrap_err();
    assert!(matches!(err, GenerationError::InvalidFormat(_)));
    assert!(store.writes().is_empty());
}

#[tokio::test]
async fn zero_count_is_rejected_before_the_ai_is_called() {
    let user_id = Uuid::new_v4();
    let ai = ScriptedAi::new("[]");
    let store = InMemoryStore::with_account(account(user_id, UsageCounters::default()));
    let pipeline = GenerationPipeline::new(ai.clone(), store.clone());

    let task = GenerationTask::Flashcards {
        count: 0,
        difficulty: Difficulty::Hard,
    };
    let files = vec![text_file("notes.txt", "content")];

    let err = pipeline.run(user_id, task, &files).await.unwrap_err();
    assert!(matches!(err, GenerationError::Prompt(_)));
    assert_eq!(ai.prompt_count(), 0);
    assert!(store.writes().is_empty());
}

#[tokio::test]
async fn unsupported_file_fails_validation_before_extraction() {
    let user_id = Uuid::new_v4();
    let ai = ScriptedAi::new("irrelevant");
    let store = InMemoryStore::with_account(account(user_id, UsageCounters::default()));
    let pipeline = GenerationPipeline::new(ai.clone(), store);

    let file = UploadFile {
        id: "clip".to_string(),
        file_name: "clip.mp4".to_string(),
        file_size: 10,
        mime_type: "video/mp4".to_string(),
        data: vec![0; 10],
    };

    let err = pipeline
        .run(user_id, GenerationTask::Summary, &[file])
        .await
        .unwrap_err();
    match err {
        GenerationError::Validation { file_name, .. } => assert_eq!(file_name, "clip.mp4"),
        other => panic!("expected validation error, got {other:?}"),
    }
    assert_eq!(ai.prompt_count(), 0);
}

#[tokio::test]
async fn a_failed_counter_write_does_not_fail_the_generation() {
    // The store knows no accounts, so the usage read fails after Done.
    let user_id = Uuid::new_v4();
    let ai = ScriptedAi::new("plain answer");
    let store = Arc::new(InMemoryStore {
        accounts: Mutex::new(HashMap::new()),
        counter_writes: Mutex::new(Vec::new()),
    });
    let pipeline = GenerationPipeline::new(ai, store.clone());

    let files = vec![text_file("notes.txt", "content")];
    let output = pipeline
        .run(user_id, GenerationTask::Summary, &files)
        .await
        .unwrap();
    assert!(matches!(output, GenerationOutput::Summary(_)));
    assert!(store.writes().is_empty());
}

#[tokio::test]
async fn rejecting_gateway_surfaces_port_error() {
    let gateway = RejectingGateway;
    let request = CheckoutRequest {
        amount: 100.0,
        currency: "ETB".to_string(),
        email: "student@example.com".to_string(),
        first_name: "Sara".to_string(),
        last_name: "Bekele".to_string(),
        tx_ref: "tx-1".to_string(),
        callback_url: "https://example.com/cb".to_string(),
    };
    let err = gateway.initialize_checkout(&request).await.unwrap_err();
    assert!(matches!(err, PortError::Unexpected(_)));
}
