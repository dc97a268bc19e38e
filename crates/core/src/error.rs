use thiserror::Error;

pub type CampaignResult<T> = Result<T, CampaignError>;

#[derive(Error, Debug)]
pub enum CampaignError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Ingestion error: {0}")]
    Ingest(#[from] IngestError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<config::ConfigError> for CampaignError {
    fn from(err: config::ConfigError) -> Self {
        CampaignError::Config(err.to_string())
    }
}

/// Rejections raised while turning provider records into `CampaignStats`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IngestError {
    #[error("campaign record without an id")]
    MissingId,

    #[error("campaign {campaign}: {field} is negative ({value})")]
    Negative {
        campaign: String,
        field: &'static str,
        value: i64,
    },

    #[error("campaign {campaign}: {numerator} ({numerator_value}) exceeds {denominator} ({denominator_value})")]
    Inconsistent {
        campaign: String,
        numerator: &'static str,
        numerator_value: u64,
        denominator: &'static str,
        denominator_value: u64,
    },

    #[error("duplicate campaign id: {0}")]
    DuplicateId(String),

    #[error("campaign {campaign}: malformed provider payload ({reason})")]
    Malformed { campaign: String, reason: String },
}
