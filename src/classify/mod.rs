pub mod prompt;
pub mod types;

pub use types::{Classification, DocsImpact};

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info_span, warn, Instrument};

use crate::config::Config;
use crate::github::PullRequest;
use crate::report::types::PrAnalysis;

const MAX_RETRIES: u32 = 3;
const RETRY_BASE_DELAY_MS: u64 = 1000;
const REQUEST_TIMEOUT_SECS: u64 = 60;

/// Maximum simultaneous in-flight completion requests. Keeps wall-clock time
/// down without tripping upstream rate limits.
const CLASSIFY_CONCURRENCY: usize = 4;

#[derive(Debug, Error)]
pub enum ClassifyError {
    #[error("Completion API request failed: {0}")]
    ApiRequest(#[from] reqwest::Error),

    #[error("Completion API returned status {status}: {body}")]
    ApiStatus { status: u16, body: String },

    #[error("Completion response had no choices")]
    EmptyResponse,

    #[error("Failed to parse model response: {0}")]
    ResponseParse(String),
}

impl ClassifyError {
    /// Transient failures are worth retrying; schema problems are not.
    fn is_transient(&self) -> bool {
        match self {
            ClassifyError::ApiStatus { status, .. } => *status == 429 || *status >= 500,
            ClassifyError::ApiRequest(e) => e.is_timeout() || e.is_connect(),
            _ => false,
        }
    }
}

/// Seam for the per-PR judgment call, so the pipeline can be exercised
/// without a live completion endpoint.
#[async_trait]
pub trait Classifier: Send + Sync {
    /// Judge one pull request. Must not mutate shared state; each call
    /// operates on an independent PR.
    async fn classify(&self, pr: &PullRequest) -> Result<Classification, ClassifyError>;
}

/// Classifier backed by an OpenAI-compatible chat-completion endpoint.
pub struct OpenAiClassifier {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
    response_format: ResponseFormat,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: String,
}

impl OpenAiClassifier {
    pub fn new(config: &Config) -> Result<Self, ClassifyError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;
        Ok(Self {
            client,
            api_key: config.openai_api_key.clone(),
            base_url: config.openai_base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
        })
    }

    async fn request_completion(&self, user_message: &str) -> Result<String, ClassifyError> {
        let body = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: prompt::SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: user_message,
                },
            ],
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            response_format: ResponseFormat {
                kind: "json_object",
            },
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClassifyError::ApiStatus {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ChatResponse = response.json().await?;
        parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or(ClassifyError::EmptyResponse)
    }
}

#[async_trait]
impl Classifier for OpenAiClassifier {
    async fn classify(&self, pr: &PullRequest) -> Result<Classification, ClassifyError> {
        let user_message = prompt::user_message(pr);
        let mut attempt: u32 = 0;
        loop {
            match self.request_completion(&user_message).await {
                Ok(content) => {
                    debug!(pr = pr.number, response_bytes = content.len(), "received completion");
                    return parse_classification(&content);
                }
                Err(e) if e.is_transient() && attempt + 1 < MAX_RETRIES => {
                    let delay = RETRY_BASE_DELAY_MS * 2u64.pow(attempt);
                    warn!(
                        pr = pr.number,
                        attempt = attempt + 1,
                        error = %e,
                        "transient completion failure, retrying in {delay}ms"
                    );
                    tokio::time::sleep(std::time::Duration::from_millis(delay)).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// Parse the model's reply into a Classification.
///
/// Tries the content as plain JSON first, then salvages JSON from a fenced
/// ```json block or the outermost braces. Anything else is a parse error,
/// recorded as an unclassified PR rather than a silent guess.
fn parse_classification(content: &str) -> Result<Classification, ClassifyError> {
    let trimmed = content.trim();

    if let Ok(c) = serde_json::from_str::<Classification>(trimmed) {
        return Ok(c);
    }

    if let Some(candidate) = extract_json(trimmed) {
        if let Ok(c) = serde_json::from_str::<Classification>(candidate) {
            return Ok(c);
        }
    }

    Err(ClassifyError::ResponseParse(format!(
        "response does not conform to the classification schema: {}",
        summarize(trimmed)
    )))
}

/// Pull a JSON candidate out of surrounding prose: a ```json fence if
/// present, otherwise the outermost brace pair.
fn extract_json(content: &str) -> Option<&str> {
    if let Some(start) = content.find("```json") {
        let rest = &content[start + 7..];
        if let Some(end) = rest.find("```") {
            return Some(rest[..end].trim());
        }
    }

    let start = content.find('{')?;
    let end = content.rfind('}')?;
    (end > start).then(|| &content[start..=end])
}

fn summarize(content: &str) -> &str {
    match content.char_indices().nth(200) {
        Some((idx, _)) => &content[..idx],
        None => content,
    }
}

/// Classify every PR with bounded concurrency, preserving fetch order.
///
/// Per-PR failures are non-fatal: they are logged and recorded as
/// unclassified entries so the report still accounts for every fetched PR.
pub async fn classify_all(classifier: &dyn Classifier, prs: &[PullRequest]) -> Vec<PrAnalysis> {
    stream::iter(prs.iter().map(|pr| {
        async move {
            match classifier.classify(pr).await {
                Ok(classification) => PrAnalysis::classified(pr, classification),
                Err(e) => {
                    warn!(pr = pr.number, error = %e, "classification failed, recording as unclassified");
                    PrAnalysis::unclassified(pr, e.to_string())
                }
            }
        }
        .instrument(info_span!("classify", pr = pr.number))
    }))
    // buffered() yields results in input order regardless of completion order.
    .buffered(CLASSIFY_CONCURRENCY)
    .collect()
    .await
}
