//! AI fallback classifier seam.
//!
//! The verdict policy only consults the classifier for scores in the
//! ambiguous band, so call volume is bounded to the hardest-to-classify
//! messages. Supports a real OpenAI-compatible HTTP backend and a fake
//! client for testing.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{info, warn};

use crate::error::ClassifyError;

/// Configuration for the HTTP classifier backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierConfig {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default)]
    pub api_key: Option<String>,

    /// Request timeout in seconds. A single attempt, no retries.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_endpoint() -> String {
    "https://api.openai.com".to_string()
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_timeout_secs() -> u64 {
    20
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: default_endpoint(),
            model: default_model(),
            api_key: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// External classifier boundary. Returns free-form advisory text on
/// success; the core never parses beyond success/failure.
pub trait ScamClassifier: Send + Sync {
    fn classify(&self, text: &str) -> Result<String, ClassifyError>;
}

/// Wire a classifier from configuration. Missing key or disabled config
/// yields the disabled variant, which keeps the rule-based path fully
/// functional.
pub fn from_config(config: &ClassifierConfig) -> Arc<dyn ScamClassifier> {
    if !config.enabled {
        info!("AI classifier disabled in configuration, rule-based verdicts only");
        return Arc::new(DisabledClassifier);
    }
    if config.api_key.is_none() {
        warn!("AI classifier enabled but no api_key set, treating as disabled");
        return Arc::new(DisabledClassifier);
    }
    match HttpClassifier::new(config.clone()) {
        Ok(client) => Arc::new(client),
        Err(e) => {
            warn!("Failed to build HTTP classifier ({e}), treating as disabled");
            Arc::new(DisabledClassifier)
        }
    }
}

/// Always reports `NotConfigured`.
pub struct DisabledClassifier;

impl ScamClassifier for DisabledClassifier {
    fn classify(&self, _text: &str) -> Result<String, ClassifyError> {
        Err(ClassifyError::NotConfigured)
    }
}

const SYSTEM_PROMPT: &str = "You are a scam-detection assistant. Short, precise verdicts.";

/// HTTP classifier speaking the OpenAI-compatible chat-completions shape.
pub struct HttpClassifier {
    config: ClassifierConfig,
    client: reqwest::blocking::Client,
}

impl HttpClassifier {
    pub fn new(config: ClassifierConfig) -> Result<Self, ClassifyError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ClassifyError::Transport(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self { config, client })
    }
}

impl ScamClassifier for HttpClassifier {
    fn classify(&self, text: &str) -> Result<String, ClassifyError> {
        let url = format!(
            "{}/v1/chat/completions",
            self.config.endpoint.trim_end_matches('/')
        );

        let user_prompt = format!(
            "Analyze this message for scam risk. Give a short verdict, \
             up to three reasons, and one line of advice:\n\n{text}"
        );

        let body = serde_json::json!({
            "model": self.config.model,
            "messages": [
                {"role": "system", "content": SYSTEM_PROMPT},
                {"role": "user", "content": user_prompt},
            ],
            "temperature": 0.0,
            "max_tokens": 300,
        });

        let mut request = self.client.post(&url).json(&body);
        if let Some(api_key) = &self.config.api_key {
            request = request.bearer_auth(api_key);
        }

        let response = request.send().map_err(|e| {
            if e.is_timeout() {
                ClassifyError::Transport(format!(
                    "Request timed out after {}s",
                    self.config.timeout_secs
                ))
            } else {
                ClassifyError::Transport(format!("Request failed: {e}"))
            }
        })?;

        if !response.status().is_success() {
            return Err(ClassifyError::Transport(format!(
                "HTTP {} from classifier",
                response.status()
            )));
        }

        let json: serde_json::Value = response
            .json()
            .map_err(|e| ClassifyError::Unparseable(format!("Invalid JSON body: {e}")))?;

        let content = json
            .get("choices")
            .and_then(|v| v.get(0))
            .and_then(|v| v.get("message"))
            .and_then(|v| v.get("content"))
            .and_then(|v| v.as_str())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| {
                ClassifyError::Unparseable("Missing choices[0].message.content".to_string())
            })?;

        Ok(content.to_string())
    }
}

/// Scripted classifier for tests: pops pre-defined responses and counts
/// calls. The last response is repeated once the queue drains.
pub struct FakeClassifier {
    responses: Mutex<VecDeque<Result<String, ClassifyError>>>,
    call_count: Mutex<usize>,
}

impl FakeClassifier {
    pub fn new(responses: Vec<Result<String, ClassifyError>>) -> Self {
        Self {
            responses: Mutex::new(responses.into_iter().collect()),
            call_count: Mutex::new(0),
        }
    }

    /// A fake that always answers with the same advisory text.
    pub fn always_text(text: &str) -> Self {
        Self::new(vec![Ok(text.to_string())])
    }

    /// A fake that always fails.
    pub fn always_error(error: ClassifyError) -> Self {
        Self::new(vec![Err(error)])
    }

    pub fn call_count(&self) -> usize {
        *self.call_count.lock().unwrap()
    }
}

impl ScamClassifier for FakeClassifier {
    fn classify(&self, _text: &str) -> Result<String, ClassifyError> {
        let mut count = self.call_count.lock().unwrap();
        *count += 1;

        let mut responses = self.responses.lock().unwrap();
        if responses.len() > 1 {
            responses.pop_front().unwrap()
        } else {
            responses
                .front()
                .cloned()
                .unwrap_or_else(|| Err(ClassifyError::NotConfigured))
        }
    }
}
