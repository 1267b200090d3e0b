//! Mock oracle for testing.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use verbdrill_core::model::Verb;
use verbdrill_core::traits::{EquivalenceOracle, HintWriter, JudgeRequest, JudgeResponse};

use crate::error::OracleError;

/// A scripted oracle for exercising the grader without real API calls.
///
/// Replies are chosen by matching the learner's answer against known
/// substrings, falling back to a default reply.
pub struct MockOracle {
    /// Map of answer substring → reply.
    replies: HashMap<String, String>,
    default_reply: String,
    hint: String,
    failing: bool,
    call_count: AtomicU32,
    last_request: Mutex<Option<JudgeRequest>>,
}

impl MockOracle {
    /// Create a mock with the given answer→reply mappings. Unmatched
    /// answers get "no".
    pub fn new(replies: HashMap<String, String>) -> Self {
        Self {
            replies,
            default_reply: "no".to_string(),
            hint: "Concise Explanation: A common verb.\nExample Sentence: Jeg gjør det.\nMnemonic: Think of it often.".to_string(),
            failing: false,
            call_count: AtomicU32::new(0),
            last_request: Mutex::new(None),
        }
    }

    /// Create a mock that always gives the same reply.
    pub fn with_fixed_reply(reply: &str) -> Self {
        Self {
            default_reply: reply.to_string(),
            ..Self::new(HashMap::new())
        }
    }

    /// Create a mock whose every call fails like an unreachable backend.
    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::new(HashMap::new())
        }
    }

    pub fn with_hint(mut self, hint: &str) -> Self {
        self.hint = hint.to_string();
        self
    }

    /// Number of calls made to this oracle, judging and hints combined.
    pub fn call_count(&self) -> u32 {
        self.call_count.load(Ordering::Relaxed)
    }

    /// The last judge request received.
    pub fn last_request(&self) -> Option<JudgeRequest> {
        self.last_request
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl EquivalenceOracle for MockOracle {
    fn name(&self) -> &str {
        "mock"
    }

    async fn judge(&self, request: &JudgeRequest) -> anyhow::Result<JudgeResponse> {
        self.call_count.fetch_add(1, Ordering::Relaxed);
        if let Ok(mut last) = self.last_request.lock() {
            *last = Some(request.clone());
        }
        if self.failing {
            return Err(OracleError::NetworkError("connection refused".into()).into());
        }

        let reply = self
            .replies
            .iter()
            .find(|(key, _)| request.user_answer.contains(key.as_str()))
            .map(|(_, v)| v.clone())
            .unwrap_or_else(|| self.default_reply.clone());

        Ok(JudgeResponse {
            reply,
            model: "mock-model".to_string(),
            latency_ms: 1,
        })
    }
}

#[async_trait]
impl HintWriter for MockOracle {
    fn name(&self) -> &str {
        "mock"
    }

    async fn write_hint(&self, _verb: &Verb) -> anyhow::Result<String> {
        self.call_count.fetch_add(1, Ordering::Relaxed);
        if self.failing {
            return Err(OracleError::NetworkError("connection refused".into()).into());
        }
        Ok(self.hint.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use verbdrill_core::model::ExerciseDirection;

    fn request(answer: &str) -> JudgeRequest {
        JudgeRequest {
            user_answer: answer.into(),
            reference: "eat".into(),
            direction: ExerciseDirection::VerbToMeaning,
        }
    }

    #[tokio::test]
    async fn fixed_reply() {
        let oracle = MockOracle::with_fixed_reply("Yes");
        let response = oracle.judge(&request("anything")).await.unwrap();
        assert!(response.accepted());
        assert_eq!(oracle.call_count(), 1);
        assert_eq!(oracle.last_request().unwrap().user_answer, "anything");
    }

    #[tokio::test]
    async fn answer_matching() {
        let mut replies = HashMap::new();
        replies.insert("consume".to_string(), "yes".to_string());
        let oracle = MockOracle::new(replies);

        assert!(oracle.judge(&request("consume food")).await.unwrap().accepted());
        assert!(!oracle.judge(&request("drink")).await.unwrap().accepted());
        assert_eq!(oracle.call_count(), 2);
    }

    #[tokio::test]
    async fn failing_mock() {
        let oracle = MockOracle::failing();
        assert!(oracle.judge(&request("x")).await.is_err());
        let verb = Verb::from_meaning_str("gå", "gå", "walk").unwrap();
        assert!(oracle.write_hint(&verb).await.is_err());
        assert_eq!(oracle.call_count(), 2);
    }
}
