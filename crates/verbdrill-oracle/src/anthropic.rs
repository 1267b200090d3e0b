//! Anthropic messages backend.

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

const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
pub const DEFAULT_MODEL: &str = "claude-3-5-haiku-latest";
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const API_VERSION: &str = "2023-06-01";

const JUDGE_MAX_TOKENS: u32 = 10;
const JUDGE_TEMPERATURE: f64 = 0.1;
const HINT_MAX_TOKENS: u32 = 150;
const HINT_TEMPERATURE: f64 = 0.7;

/// Anthropic API backend.
pub struct AnthropicOracle {
    api_key: String,
    base_url: String,
    model: String,
    client: reqwest::Client,
}

impl AnthropicOracle {
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

    async fn message(
        &self,
        system: &str,
        prompt: &str,
        max_tokens: u32,
        temperature: f64,
    ) -> Result<(String, String), OracleError> {
        let body = MessagesRequest {
            model: self.model.clone(),
            max_tokens,
            temperature,
            system: Some(system.to_string()),
            messages: vec![Message {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
        };

        let response = self
            .client
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| send_error(e, DEFAULT_TIMEOUT_SECS))?;

        let response = check_status(response, &self.model, error_message).await?;
        let api_response: MessagesResponse =
            response.json().await.map_err(|e| OracleError::ApiError {
                status: 0,
                message: format!("failed to parse response: {e}"),
            })?;

        let text = api_response
            .content
            .iter()
            .filter_map(|c| c.text.as_deref())
            .collect::<Vec<_>>()
            .join("")
            .trim()
            .to_string();
        if text.is_empty() {
            return Err(OracleError::EmptyReply("anthropic".into()));
        }

        Ok((text, api_response.model))
    }
}

#[derive(Serialize)]
struct MessagesRequest {
    model: String,
    max_tokens: u32,
    temperature: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<Message>,
}

#[derive(Serialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
    model: String,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Deserialize)]
struct AnthropicError {
    error: AnthropicErrorBody,
}

#[derive(Deserialize)]
struct AnthropicErrorBody {
    message: String,
}

fn error_message(body: &str) -> Option<String> {
    serde_json::from_str::<AnthropicError>(body)
        .ok()
        .map(|e| e.error.message)
}

#[async_trait]
impl EquivalenceOracle for AnthropicOracle {
    fn name(&self) -> &str {
        "anthropic"
    }

    #[instrument(skip(self, request), fields(model = %self.model, direction = %request.direction))]
    async fn judge(&self, request: &JudgeRequest) -> anyhow::Result<JudgeResponse> {
        let start = Instant::now();
        let (reply, model) = self
            .message(
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
impl HintWriter for AnthropicOracle {
    fn name(&self) -> &str {
        "anthropic"
    }

    #[instrument(skip(self, verb), fields(model = %self.model, verb = %verb.id))]
    async fn write_hint(&self, verb: &Verb) -> anyhow::Result<String> {
        let (text, _) = self
            .message(
                HINT_SYSTEM_PROMPT,
                &hint_prompt(verb),
                HINT_MAX_TOKENS,
                HINT_TEMPERATURE,
            )
            .await?;
        Ok(text)
    }
}
