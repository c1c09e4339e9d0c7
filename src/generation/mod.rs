// Generation module
// Tutor prompt construction and generative-model backends


pub mod gemini;
pub mod prompt;

use thiserror::Error;

pub use gemini::GeminiClient;
pub use prompt::{CONTEXT_SEPARATOR, build_prompt};

/// Why a generation attempt produced no answer
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenerationError {
    #[error("the generative model did not respond in time")]
    Timeout,
    #[error("rate limited or quota exhausted (HTTP 429)")]
    RateLimited,
    #[error("request rejected (HTTP {status})")]
    Rejected { status: u16 },
    #[error("server error (HTTP {status})")]
    Server { status: u16 },
    #[error("transport error: {0}")]
    Transport(String),
    #[error("malformed response: {0}")]
    MalformedResponse(String),
    #[error("the model returned no text")]
    EmptyResponse,
}

impl GenerationError {
    /// Classify an HTTP error status
    #[inline]
    pub fn from_status(status: u16) -> Self {
        match status {
            429 => Self::RateLimited,
            500.. => Self::Server { status },
            _ => Self::Rejected { status },
        }
    }
}

/// Produces an answer for a fully built prompt
pub trait Generator: Send + Sync {
    fn model(&self) -> &str;

    fn generate(&self, prompt: &str) -> Result<String, GenerationError>;
}

/// The answer shown to the user in place of a failed generation
#[inline]
pub fn placeholder_answer(error: &GenerationError) -> String {
    format!("Model error: {}", error)
}
