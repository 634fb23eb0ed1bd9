/// LLM Client: the single point of entry for all Gemini API calls.
///
/// ARCHITECTURAL RULE: No other module may call the Gemini API directly.
/// All LLM interactions MUST go through this module.
///
/// One HTTP attempt per call. Retry, backoff and timeouts are owned by the
/// reaction generator, which decides what is transient via `LlmError::is_retryable`.
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
/// The model used for all reaction calls.
/// This is intentionally hardcoded to prevent accidental drift.
pub const MODEL: &str = "gemini-1.5-flash";
const MAX_OUTPUT_TOKENS: u32 = 256;
const TEMPERATURE: f32 = 0.9;
/// Transport-level ceiling; per-call deadlines are tighter and set by the caller.
const HTTP_TIMEOUT: Duration = Duration::from_secs(120);

/// Finish reasons that mean the candidate was withheld by a content policy.
const BLOCKING_FINISH_REASONS: [&str; 5] = [
    "SAFETY",
    "RECITATION",
    "BLOCKLIST",
    "PROHIBITED_CONTENT",
    "SPII",
];

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Rate limited after {retries} retries")]
    RateLimited { retries: u32 },

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Response blocked ({reason}){}", .detail.as_ref().map(|d| format!(": {d}")).unwrap_or_default())]
    Blocked {
        reason: String,
        detail: Option<String>,
    },

    #[error("LLM returned empty content")]
    EmptyContent,

    #[error("GEMINI_API_KEY is not configured")]
    MissingApiKey,
}

impl LlmError {
    /// Transient failures worth another attempt: timeouts, transport errors, 429 and 5xx.
    /// Content-policy blocks and client errors are final.
    pub fn is_retryable(&self) -> bool {
        match self {
            LlmError::Http(_) | LlmError::Timeout(_) | LlmError::RateLimited { .. } => true,
            LlmError::Api { status, .. } => *status == 429 || *status >= 500,
            LlmError::Parse(_)
            | LlmError::Blocked { .. }
            | LlmError::EmptyContent
            | LlmError::MissingApiKey => false,
        }
    }
}

/// The external text-generation capability, as seen by the reaction generator.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Returns the trimmed, non-empty generated text for `prompt`.
    async fn generate_text(&self, prompt: &str) -> Result<String, LlmError>;
}

// ────────────────────────────────────────────────────────────────────────────
// Wire types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<RequestContent<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct RequestContent<'a> {
    role: &'a str,
    parts: Vec<RequestPart<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    max_output_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    pub prompt_feedback: Option<PromptFeedback>,
    pub usage_metadata: Option<UsageMetadata>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    pub content: Option<CandidateContent>,
    pub finish_reason: Option<String>,
    #[serde(default)]
    pub safety_ratings: Vec<SafetyRating>,
}

#[derive(Debug, Deserialize)]
pub struct CandidateContent {
    #[serde(default)]
    pub parts: Vec<ContentPart>,
}

#[derive(Debug, Deserialize)]
pub struct ContentPart {
    pub text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptFeedback {
    pub block_reason: Option<String>,
    #[serde(default)]
    pub safety_ratings: Vec<SafetyRating>,
}

#[derive(Debug, Deserialize)]
pub struct SafetyRating {
    pub category: String,
    pub probability: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageMetadata {
    #[serde(default)]
    pub prompt_token_count: u32,
    #[serde(default)]
    pub candidates_token_count: u32,
}

impl GenerateContentResponse {
    /// Concatenated text parts of the first candidate, if any are non-blank.
    pub fn text(&self) -> Option<String> {
        let text: String = self
            .candidates
            .first()?
            .content
            .as_ref()?
            .parts
            .iter()
            .filter_map(|p| p.text.as_deref())
            .collect();
        let text = text.trim();
        (!text.is_empty()).then(|| text.to_string())
    }

    /// Extracts the reaction text or explains why there is none.
    pub fn into_text(self) -> Result<String, LlmError> {
        if let Some(text) = self.text() {
            return Ok(text);
        }

        if let Some(feedback) = &self.prompt_feedback {
            if let Some(reason) = &feedback.block_reason {
                return Err(LlmError::Blocked {
                    reason: reason.clone(),
                    detail: describe_ratings(&feedback.safety_ratings),
                });
            }
        }

        if let Some(candidate) = self.candidates.first() {
            if let Some(reason) = candidate
                .finish_reason
                .as_deref()
                .filter(|r| BLOCKING_FINISH_REASONS.contains(r))
            {
                return Err(LlmError::Blocked {
                    reason: reason.to_string(),
                    detail: describe_ratings(&candidate.safety_ratings),
                });
            }
        }

        Err(LlmError::EmptyContent)
    }
}

/// "HARM_CATEGORY_X=HIGH, ..." for ratings above NEGLIGIBLE, or None.
fn describe_ratings(ratings: &[SafetyRating]) -> Option<String> {
    let flagged: Vec<String> = ratings
        .iter()
        .filter(|r| r.probability != "NEGLIGIBLE")
        .map(|r| format!("{}={}", r.category, r.probability))
        .collect();
    (!flagged.is_empty()).then(|| flagged.join(", "))
}

#[derive(Debug, Deserialize)]
struct GeminiError {
    error: GeminiErrorBody,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorBody {
    message: String,
}

fn api_error_message(body: String) -> String {
    serde_json::from_str::<GeminiError>(&body)
        .map(|e| e.error.message)
        .unwrap_or(body)
}

// ────────────────────────────────────────────────────────────────────────────
// Client
// ────────────────────────────────────────────────────────────────────────────

/// The single Gemini client shared by every reaction call.
/// Cheap to clone; clones share one connection pool.
#[derive(Clone)]
pub struct GeminiClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl GeminiClient {
    pub fn new(api_key: Option<String>, base_url: impl Into<String>) -> Result<Self, LlmError> {
        Ok(Self {
            client: Client::builder().timeout(HTTP_TIMEOUT).build()?,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
        })
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    fn endpoint(&self) -> String {
        format!("{}/v1beta/models/{}:generateContent", self.base_url, MODEL)
    }

    /// Makes a single raw call to the Gemini API, returning the full response object.
    pub async fn call(&self, prompt: &str) -> Result<GenerateContentResponse, LlmError> {
        let api_key = self.api_key.as_deref().ok_or(LlmError::MissingApiKey)?;

        let request_body = GenerateContentRequest {
            contents: vec![RequestContent {
                role: "user",
                parts: vec![RequestPart { text: prompt }],
            }],
            generation_config: GenerationConfig {
                max_output_tokens: MAX_OUTPUT_TOKENS,
                temperature: TEMPERATURE,
            },
        };

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", api_key)
            .json(&request_body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!("Gemini API returned {}: {}", status, body);
            return Err(LlmError::Api {
                status: status.as_u16(),
                message: api_error_message(body),
            });
        }

        let body = response.text().await?;
        let parsed: GenerateContentResponse = serde_json::from_str(&body)?;

        if let Some(usage) = &parsed.usage_metadata {
            debug!(
                "Gemini call succeeded: prompt_tokens={}, output_tokens={}",
                usage.prompt_token_count, usage.candidates_token_count
            );
        }

        Ok(parsed)
    }
}

#[async_trait]
impl TextGenerator for GeminiClient {
    async fn generate_text(&self, prompt: &str) -> Result<String, LlmError> {
        self.call(prompt).await?.into_text()
    }
}
