//! services/api/src/adapters/gen_llm.rs
//!
//! This module contains the adapter for the generative-AI gateway.
//! It implements the `GenerativeAiService` port from the `core` crate.

use async_openai::{
    config::OpenAIConfig,
    error::OpenAIError,
    types::chat::{
        ChatCompletionRequestAssistantMessageArgs, ChatCompletionRequestMessage,
        ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
        CreateChatCompletionRequestArgs,
    },
    Client,
};
use async_trait::async_trait;

use studyforge_core::domain::{ChatRole, ChatTurn};
use studyforge_core::ports::{AiError, AiResult, GenerativeAiService};
use studyforge_core::prompt::CHAT_SYSTEM_INSTRUCTIONS;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements `GenerativeAiService` using an OpenAI-compatible LLM.
///
/// Construction never fails: with no API key configured, every call surfaces
/// `AiError::Auth` so the request boundary can report the missing credential.
#[derive(Clone)]
pub struct OpenAiGatewayAdapter {
    client: Option<Client<OpenAIConfig>>,
    gen_model: String,
    chat_model: String,
}

impl OpenAiGatewayAdapter {
    /// Creates a new `OpenAiGatewayAdapter`.
    pub fn new(api_key: Option<&str>, gen_model: String, chat_model: String) -> Self {
        let client =
            api_key.map(|key| Client::with_config(OpenAIConfig::new().with_api_key(key)));
        Self {
            client,
            gen_model,
            chat_model,
        }
    }

    fn client(&self) -> AiResult<&Client<OpenAIConfig>> {
        self.client
            .as_ref()
            .ok_or_else(|| AiError::Auth("OPENAI_API_KEY is not configured".to_string()))
    }

    fn turn_to_message(turn: &ChatTurn) -> Result<ChatCompletionRequestMessage, OpenAIError> {
        let message = match turn.role {
            ChatRole::User => ChatCompletionRequestUserMessageArgs::default()
                .content(turn.content.clone())
                .build()?
                .into(),
            ChatRole::Assistant => ChatCompletionRequestAssistantMessageArgs::default()
                .content(turn.content.clone())
                .build()?
                .into(),
        };
        Ok(message)
    }

    async fn complete(
        &self,
        model: &str,
        messages: Vec<ChatCompletionRequestMessage>,
    ) -> AiResult<String> {
        let request = CreateChatCompletionRequestArgs::default()
            .model(model)
            .messages(messages)
            .n(1)
            .build()
            .map_err(map_ai_error)?;

        // Call the API and manually map the error if it occurs, which respects the orphan rule.
        let response = self
            .client()?
            .chat()
            .create(request)
            .await
            .map_err(map_ai_error)?;

        // Extract the text content from the first choice in the response.
        if let Some(choice) = response.choices.into_iter().next() {
            if let Some(content) = choice.message.content {
                Ok(content)
            } else {
                Err(AiError::Provider(
                    "LLM response contained no text content.".to_string(),
                ))
            }
        } else {
            Err(AiError::Provider(
                "LLM returned no choices in its response.".to_string(),
            ))
        }
    }
}

/// Maps the provider's error surface onto the gateway taxonomy: credential
/// problems, throttling, and everything else.
fn map_ai_error(err: OpenAIError) -> AiError {
    match err {
        OpenAIError::ApiError(api) => {
            let code = api.code.as_deref().unwrap_or_default();
            let kind = api.r#type.as_deref().unwrap_or_default();
            if code.contains("invalid_api_key") || kind.contains("authentication") {
                AiError::Auth(api.message)
            } else if code.contains("rate_limit")
                || code.contains("insufficient_quota")
                || kind.contains("rate_limit")
            {
                AiError::RateLimit(api.message)
            } else {
                AiError::Provider(api.message)
            }
        }
        other => AiError::Provider(other.to_string()),
    }
}

//=========================================================================================
// `GenerativeAiService` Trait Implementation
//=========================================================================================

#[async_trait]
impl GenerativeAiService for OpenAiGatewayAdapter {
    /// Sends one generation prompt and returns the raw response text.
    /// No retry is performed here; the caller decides what to do on failure.
    async fn generate(&self, prompt: &str) -> AiResult<String> {
        let messages = vec![ChatCompletionRequestUserMessageArgs::default()
            .content(prompt.to_string())
            .build()
            .map_err(map_ai_error)?
            .into()];

        self.complete(&self.gen_model, messages).await
    }

    /// Sends the document Q&A conversation and returns the next assistant
    /// turn. The corpus, if any, was already folded into the newest user
    /// turn by the prompt layer.
    async fn chat(&self, turns: &[ChatTurn]) -> AiResult<String> {
        let mut messages: Vec<ChatCompletionRequestMessage> =
            vec![ChatCompletionRequestSystemMessageArgs::default()
                .content(CHAT_SYSTEM_INSTRUCTIONS)
                .build()
                .map_err(map_ai_error)?
                .into()];
        for turn in turns {
            messages.push(Self::turn_to_message(turn).map_err(map_ai_error)?);
        }

        self.complete(&self.chat_model, messages).await
    }
}
