use thiserror::Error;

use crate::completion::CompletionError;
use crate::types::AnalysisMode;

pub type AnalysisOutcome<T> = Result<T, AnalysisError>;

/// Everything that can stop an analysis run.
///
/// Request-shape errors (everything except `AnalysisUnavailable`) are fixed
/// by the caller issuing a valid request. A malformed model response is not
/// an error: the parser degrades to empty sections instead.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AnalysisError {
    #[error("no campaigns selected")]
    EmptySelection,

    #[error("unknown campaign: {0}")]
    UnknownCampaign(String),

    #[error("campaign selected more than once: {0}")]
    DuplicateCampaign(String),

    #[error("{mode} needs at least {required} campaigns, got {provided}")]
    InsufficientData {
        mode: AnalysisMode,
        required: usize,
        provided: usize,
    },

    #[error("analysis unavailable: {0}")]
    AnalysisUnavailable(#[source] CompletionError),
}

impl AnalysisError {
    /// Only completion failures are worth retrying unchanged. The
    /// orchestrator itself never retries.
    pub fn is_retryable(&self) -> bool {
        matches!(self, AnalysisError::AnalysisUnavailable(_))
    }

    /// Actionable message for an end user.
    pub fn user_message(&self) -> String {
        match self {
            AnalysisError::EmptySelection => "Select at least one campaign to analyze.".to_string(),
            AnalysisError::UnknownCampaign(id) => {
                format!("Campaign '{id}' is not in the loaded data. Reload the data or pick another campaign.")
            }
            AnalysisError::DuplicateCampaign(id) => {
                format!("Campaign '{id}' is selected twice. Select each campaign once.")
            }
            AnalysisError::InsufficientData { mode, required, .. } => {
                format!("Select at least {required} campaigns for {mode}.")
            }
            AnalysisError::AnalysisUnavailable(_) => {
                "The analysis service did not answer. Retry, or switch to demo mode explicitly.".to_string()
            }
        }
    }
}
