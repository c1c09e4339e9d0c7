
use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use url::Url;

use super::{GenerationError, Generator};
use crate::config::GeminiConfig;

/// Blocking client for the Gemini `generateContent` API.
///
/// Each call is a single attempt bounded by the agent's global timeout.
#[derive(Debug, Clone)]
pub struct GeminiClient {
    url: Url,
    model: String,
    api_key: String,
    agent: ureq::Agent,
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    contents: [Content<'a>; 1],
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: [RequestPart<'a>; 1],
}

#[derive(Debug, Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

impl GeminiClient {
    #[inline]
    pub fn new(config: &GeminiConfig, api_key: impl Into<String>) -> anyhow::Result<Self> {
        let url = config
            .endpoint_url()?
            .join(&format!("v1beta/models/{}:generateContent", config.model))
            .context("Failed to build generateContent URL")?;

        let agent = ureq::Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(config.timeout_seconds)))
            .build()
            .into();

        Ok(Self {
            url,
            model: config.model.clone(),
            api_key: api_key.into(),
            agent,
        })
    }

    /// Full URL requests are posted to
    #[inline]
    pub fn url(&self) -> &Url {
        &self.url
    }

    fn call(&self, prompt: &str) -> Result<String, GenerationError> {
        let request = GenerateRequest {
            contents: [Content {
                role: "user",
                parts: [RequestPart { text: prompt }],
            }],
        };
        let body = serde_json::to_string(&request)
            .map_err(|e| GenerationError::MalformedResponse(e.to_string()))?;

        self.agent
            .post(self.url.as_str())
            .header("Content-Type", "application/json")
            .header("x-goog-api-key", &self.api_key)
            .send(&body)
            .and_then(|mut response| response.body_mut().read_to_string())
            .map_err(map_transport_error)
    }
}

fn map_transport_error(error: ureq::Error) -> GenerationError {
    match error {
        ureq::Error::StatusCode(status) => GenerationError::from_status(status),
        ureq::Error::Timeout(_) => GenerationError::Timeout,
        other => GenerationError::Transport(other.to_string()),
    }
}

/// Concatenate the text parts of the first candidate
fn extract_answer(body: &str) -> Result<String, GenerationError> {
    let response: GenerateResponse = serde_json::from_str(body)
        .map_err(|e| GenerationError::MalformedResponse(e.to_string()))?;

    let Some(candidate) = response.candidates.into_iter().next() else {
        if let Some(reason) = response.prompt_feedback.and_then(|f| f.block_reason) {
            warn!("Prompt blocked by the generative model: {}", reason);
        }
        return Err(GenerationError::EmptyResponse);
    };

    let text: String = candidate
        .content
        .into_iter()
        .flat_map(|content| content.parts)
        .filter_map(|part| part.text)
        .collect();

    if text.is_empty() {
        if let Some(reason) = candidate.finish_reason {
            warn!("Candidate finished without text: {}", reason);
        }
        return Err(GenerationError::EmptyResponse);
    }

    Ok(text)
}

impl Generator for GeminiClient {
    fn model(&self) -> &str {
        &self.model
    }

    fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        debug!(
            "Requesting answer from {} ({} prompt characters)",
            self.model,
            prompt.chars().count()
        );

        let body = self.call(prompt).inspect_err(|e| {
            warn!("Generation with {} failed: {}", self.model, e);
        })?;
        extract_answer(&body)
    }
}
