//! Campaign data model shared by the analysis pipeline: validated campaign
//! snapshots, provider ingestion, configuration and the demo dataset.

pub mod config;
pub mod error;
pub mod fixtures;
pub mod ingest;
pub mod types;

pub use config::{AnalysisConfig, AppConfig, CompletionConfig, ScoringWeights, WeightTable};
pub use error::{CampaignError, CampaignResult, IngestError};
pub use ingest::RawCampaignRecord;
pub use types::{CampaignContent, CampaignStats, Channel, Counters, LinkedInCounters, Metric};
