//! Domain error types for copyforge.
//!
//! Typed errors at module boundaries replace string-encoded errors and
//! enable structured handling via pattern matching: the retry layer matches
//! on [`GenerationError::RateLimited`], the CLI renders everything else as a
//! single user-facing message.

use thiserror::Error;

/// Errors from prompt building, generation, normalization and video polling.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("{0}")]
    InvalidInput(String),

    #[error("Rate limited (status {status}): {message}")]
    RateLimited { status: u16, message: String },

    #[error("Rate limit retries exhausted after {attempts} attempts")]
    RetriesExhausted {
        attempts: u32,
        #[source]
        last: Box<GenerationError>,
    },

    #[error("Failed to parse AI response: {0}")]
    MalformedResponse(String),

    #[error("Not signed in: an authenticated identity is required for this action")]
    AuthenticationRequired,

    #[error("Video generation failed: {0}")]
    VideoOperation(String),

    #[error("Video status check failed too many times ({failures} failures)")]
    PollingExhausted { failures: u32 },

    #[error("Failed to download generated video (status {status})")]
    Download { status: u16 },

    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("Failed to read response body: {0}")]
    ResponseRead(String),

    #[error("Stream failed mid-flight: {0}")]
    Stream(String),
}

impl GenerationError {
    /// True for the one class of error the retry wrapper is allowed to retry.
    pub fn is_rate_limit(&self) -> bool {
        matches!(self, GenerationError::RateLimited { .. })
    }
}

pub type Result<T> = std::result::Result<T, GenerationError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_limited_display() {
        let e = GenerationError::RateLimited {
            status: 429,
            message: "RESOURCE_EXHAUSTED".into(),
        };
        assert!(e.to_string().contains("429"));
        assert!(e.is_rate_limit());
    }

    #[test]
    fn test_only_rate_limit_is_retriable() {
        assert!(!GenerationError::Http("connection refused".into()).is_rate_limit());
        assert!(!GenerationError::MalformedResponse("empty".into()).is_rate_limit());
        assert!(!GenerationError::PollingExhausted { failures: 10 }.is_rate_limit());
    }

    #[test]
    fn test_retries_exhausted_carries_source() {
        let e = GenerationError::RetriesExhausted {
            attempts: 3,
            last: Box::new(GenerationError::RateLimited {
                status: 429,
                message: "quota".into(),
            }),
        };
        assert!(e.to_string().contains("3 attempts"));
        let source = std::error::Error::source(&e).expect("source");
        assert!(source.to_string().contains("429"));
    }
}
