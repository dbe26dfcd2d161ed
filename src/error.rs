//! Fatal errors of an indexing run.
//!
//! Anything that ends up here stops the run. Rejections reported by the bulk
//! endpoint itself are not errors, see [`crate::reconciler::Rejection`].

/// Errors that abort the run.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Cannot encode record {id}: {source}")]
    Generation {
        id: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Failure to parse response body from {url}: {reason}")]
    ResponseDecode { url: String, reason: String },

    #[error("Cannot {action} index {index}: [{status}] {reason}")]
    IndexLifecycle {
        action: &'static str,
        index: String,
        status: u16,
        reason: String,
    },

    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl PipelineError {
    pub fn decode(url: &str, reason: impl ToString) -> Self {
        PipelineError::ResponseDecode {
            url: url.to_string(),
            reason: reason.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;
