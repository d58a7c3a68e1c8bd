//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, which is the concrete implementation
//! of the `UserRecordStore` port from the `core` crate. It handles all interactions
//! with the PostgreSQL database using `sqlx`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool, Row};
use uuid::Uuid;

use studyforge_core::domain::{
    GenerationKind, PlanTier, UsageCounters, UserAccount, UserCredentials,
};
use studyforge_core::ports::{PortError, PortResult, UserRecordStore};

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the `UserRecordStore` port.
#[derive(Clone)]
pub struct DbAdapter {
    pool: PgPool,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::Error> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

/// The column holding the counter for one generation kind. The names come
/// from a closed match, never from input, so interpolating them is safe.
fn counter_column(kind: GenerationKind) -> &'static str {
    match kind {
        GenerationKind::Summary => "summaries_generated",
        GenerationKind::Explanation => "explanations_generated",
        GenerationKind::Flashcards => "flashcards_generated",
        GenerationKind::Quiz => "quizzes_generated",
    }
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct UserRecord {
    user_id: Uuid,
    email: Option<String>,
    plan: String,
    file_uploads: i32,
    summaries_generated: i32,
    explanations_generated: i32,
    flashcards_generated: i32,
    quizzes_generated: i32,
    created_at: DateTime<Utc>,
}

impl UserRecord {
    fn to_domain(self) -> UserAccount {
        UserAccount {
            id: self.user_id,
            email: self.email,
            plan: PlanTier::parse(&self.plan),
            usage: UsageCounters {
                file_uploads: self.file_uploads.max(0) as u32,
                summaries: self.summaries_generated.max(0) as u32,
                explanations: self.explanations_generated.max(0) as u32,
                flashcard_sets: self.flashcards_generated.max(0) as u32,
                quizzes: self.quizzes_generated.max(0) as u32,
            },
            created_at: self.created_at,
        }
    }
}

#[derive(FromRow)]
struct CredentialsRecord {
    user_id: Uuid,
    email: String,
    hashed_password: String,
}

impl CredentialsRecord {
    fn to_domain(self) -> UserCredentials {
        UserCredentials {
            user_id: self.user_id,
            email: self.email,
            hashed_password: self.hashed_password,
        }
    }
}

const ACCOUNT_COLUMNS: &str = "user_id, email, plan, file_uploads, summaries_generated, \
     explanations_generated, flashcards_generated, quizzes_generated, created_at";

//=========================================================================================
// `UserRecordStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl UserRecordStore for DbAdapter {
    async fn create_account_with_email(
        &self,
        email: &str,
        hashed_password: &str,
    ) -> PortResult<UserAccount> {
        let sql = format!(
            "INSERT INTO users (user_id, email, hashed_password) VALUES ($1, $2, $3) \
             RETURNING {ACCOUNT_COLUMNS}"
        );
        let record: UserRecord = sqlx::query_as(&sql)
            .bind(Uuid::new_v4())
            .bind(email)
            .bind(hashed_password)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        Ok(record.to_domain())
    }

    async fn get_account(&self, user_id: Uuid) -> PortResult<UserAccount> {
        let sql = format!("SELECT {ACCOUNT_COLUMNS} FROM users WHERE user_id = $1");
        let record: UserRecord = sqlx::query_as(&sql)
            .bind(user_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| match e {
                sqlx::Error::RowNotFound => {
                    PortError::NotFound(format!("User {} not found", user_id))
                }
                _ => PortError::Unexpected(e.to_string()),
            })?;

        Ok(record.to_domain())
    }

    async fn get_credentials_by_email(&self, email: &str) -> PortResult<UserCredentials> {
        let record: CredentialsRecord = sqlx::query_as(
            "SELECT user_id, email, hashed_password FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => {
                PortError::NotFound(format!("No account for {}", email))
            }
            _ => PortError::Unexpected(e.to_string()),
        })?;

        Ok(record.to_domain())
    }

    async fn set_plan(&self, user_id: Uuid, plan: PlanTier) -> PortResult<()> {
        sqlx::query("UPDATE users SET plan = $1 WHERE user_id = $2")
            .bind(plan.as_str())
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        Ok(())
    }

    async fn write_generation_count(
        &self,
        user_id: Uuid,
        kind: GenerationKind,
        value: u32,
    ) -> PortResult<()> {
        // Field-level write of the new value; the read-then-write increment
        // semantics live in the core usage recorder.
        let sql = format!(
            "UPDATE users SET {} = $1 WHERE user_id = $2",
            counter_column(kind)
        );
        sqlx::query(&sql)
            .bind(value as i32)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        Ok(())
    }

    async fn write_file_upload_count(&self, user_id: Uuid, value: u32) -> PortResult<()> {
        sqlx::query("UPDATE users SET file_uploads = $1 WHERE user_id = $2")
            .bind(value as i32)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        Ok(())
    }

    async fn create_auth_session(
        &self,
        session_id: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()> {
        sqlx::query("INSERT INTO auth_sessions (id, user_id, expires_at) VALUES ($1, $2, $3)")
            .bind(session_id)
            .bind(user_id)
            .bind(expires_at)
            .execute(&self.pool)
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        Ok(())
    }

    async fn validate_auth_session(&self, session_id: &str) -> PortResult<Uuid> {
        let row = sqlx::query(
            "SELECT user_id FROM auth_sessions WHERE id = $1 AND expires_at > NOW()",
        )
        .bind(session_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => PortError::Unauthorized,
            _ => PortError::Unexpected(e.to_string()),
        })?;

        row.try_get("user_id")
            .map_err(|e| PortError::Unexpected(e.to_string()))
    }

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()> {
        sqlx::query("DELETE FROM auth_sessions WHERE id = $1")
            .bind(session_id)
            .execute(&self.pool)
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        Ok(())
    }
}
