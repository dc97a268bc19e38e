//! The external text-completion capability the orchestrator depends on.
//!
//! The pipeline never talks to a model vendor directly. A host hands the
//! orchestrator something that turns a prompt into text, and every failure
//! it reports is treated as opaque and retryable.

use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CompletionError {
    #[error("completion transport failed: {0}")]
    Transport(String),

    #[error("completion quota exhausted: {0}")]
    Quota(String),

    #[error("completion timed out after {0:?}")]
    Timeout(Duration),

    #[error("completion took {elapsed:?}, past the {deadline:?} deadline")]
    DeadlineExceeded { deadline: Duration, elapsed: Duration },
}

/// Turns a prompt into raw model text.
pub trait CompletionProvider: Send + Sync {
    fn complete(&self, prompt: &str) -> Result<String, CompletionError>;

    /// Short label for logs.
    fn name(&self) -> &str {
        "completion"
    }
}

impl<F> CompletionProvider for F
where
    F: Fn(&str) -> Result<String, CompletionError> + Send + Sync,
{
    fn complete(&self, prompt: &str) -> Result<String, CompletionError> {
        self(prompt)
    }
}
