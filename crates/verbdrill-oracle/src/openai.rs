//! OpenAI chat-completions backend.

use std::time::Instant;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use verbdrill_core::model::Verb;
use verbdrill_core::traits::{
    hint_prompt, EquivalenceOracle, HintWriter, JudgeRequest, JudgeResponse, HINT_SYSTEM_PROMPT,
};

use crate::error::OracleError;
use crate::http::{build_client, check_status, send_error};

const DEFAULT_BASE_URL: &str = "https://api.openai.com";
pub const DEFAULT_MODEL: &str = "gpt-4o";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

const JUDGE_MAX_TOKENS: u32 = 10;
const JUDGE_TEMPERATURE: f64 = 0.1;
const HINT_MAX_TOKENS: u32 = 150;
const HINT_TEMPERATURE: f64 = 0.7;

/// OpenAI-compatible chat backend.
pub struct OpenAiOracle {
    api_key: String,
    base_url: String,
    model: String,
    client: reqwest::Client,
}

impl OpenAiOracle {
    pub fn new(
        api_key: &str,
        base_url: Option<String>,
        model: Option<String>,
    ) -> Result<Self, OracleError> {
        Ok(Self {
            api_key: api_key.to_string(),
            base_url: base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            model: model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            client: build_client(DEFAULT_TIMEOUT_SECS)?,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    async fn chat(
        &self,
        system: &str,
        prompt: &str,
        max_tokens: u32,
        temperature: f64,
    ) -> Result<(String, String), OracleError> {
        let body = ChatRequest {
            model: self.model.clone(),
            max_tokens,
            temperature,
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: system.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: prompt.to_string(),
                },
            ],
        };

        let response = self
            .client
            .post(format!("{}/v1/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| send_error(e, DEFAULT_TIMEOUT_SECS))?;

        let response = check_status(response, &self.model, error_message).await?;
        let api_response: ChatResponse =
            response.json().await.map_err(|e| OracleError::ApiError {
                status: 0,
                message: format!("failed to parse response: {e}"),
            })?;

        let content = api_response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .ok_or_else(|| OracleError::EmptyReply("openai".into()))?;

        Ok((content, api_response.model))
    }
}

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    max_tokens: u32,
    temperature: f64,
    messages: Vec<ChatMessage>,
}

#[derive(Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
    model: String,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct ChatError {
    error: ChatErrorBody,
}

#[derive(Deserialize)]
struct ChatErrorBody {
    message: String,
}

fn error_message(body: &str) -> Option<String> {
    serde_json::from_str::<ChatError>(body)
        .ok()
        .map(|e| e.error.message)
}

#[async_trait]
impl EquivalenceOracle for OpenAiOracle {
    fn name(&self) -> &str {
        "openai"
    }

    #[instrument(skip(self, request), fields(model = %self.model, direction = %request.direction))]
    async fn judge(&self, request: &JudgeRequest) -> anyhow::Result<JudgeResponse> {
        let start = Instant::now();
        let (reply, model) = self
            .chat(
                &request.system_prompt(),
                &request.prompt(),
                JUDGE_MAX_TOKENS,
                JUDGE_TEMPERATURE,
            )
            .await?;

        Ok(JudgeResponse {
            reply,
            model,
            latency_ms: start.elapsed().as_millis() as u64,
        })
    }
}

#[async_trait]
impl HintWriter for OpenAiOracle {
    fn name(&self) -> &str {
        "openai"
    }

    #[instrument(skip(self, verb), fields(model = %self.model, verb = %verb.id))]
    async fn write_hint(&self, verb: &Verb) -> anyhow::Result<String> {
        let (text, _) = self
            .chat(
                HINT_SYSTEM_PROMPT,
                &hint_prompt(verb),
                HINT_MAX_TOKENS,
                HINT_TEMPERATURE,
            )
            .await?;
        Ok(text)
    }
}
