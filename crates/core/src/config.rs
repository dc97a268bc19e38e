use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::error::{CampaignError, CampaignResult};
use crate::types::{Channel, Metric};

/// Metric → weight table for one channel.
pub type WeightTable = BTreeMap<Metric, f64>;

/// Root application configuration. Loaded from an optional TOML file and
/// environment variables with the prefix `CAMPAIGN_INSIGHTS__`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub analysis: AnalysisConfig,
    #[serde(default)]
    pub completion: CompletionConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AnalysisConfig {
    /// Minimum conversion or reply rate (fraction) for a campaign to count
    /// as a winner when generating variants.
    #[serde(default = "default_winner_threshold")]
    pub winner_threshold: f64,
    #[serde(default = "default_variant_count")]
    pub variant_count: usize,
    #[serde(default)]
    pub weights: ScoringWeights,
}

/// Per-channel weight tables for the composite score.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ScoringWeights {
    #[serde(default = "default_email_weights")]
    pub email: WeightTable,
    #[serde(default = "default_linkedin_weights")]
    pub linkedin: WeightTable,
    #[serde(default = "default_mixed_weights")]
    pub mixed: WeightTable,
}

/// External command used as the language-model completion capability.
#[derive(Debug, Clone, Deserialize)]
pub struct CompletionConfig {
    #[serde(default)]
    pub command: Option<String>,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default = "default_completion_timeout_ms")]
    pub timeout_ms: u64,
}

pub const MIN_VARIANTS: usize = 2;
pub const MAX_VARIANTS: usize = 5;

// Default functions
fn default_winner_threshold() -> f64 {
    0.0
}
fn default_variant_count() -> usize {
    3
}
fn default_completion_timeout_ms() -> u64 {
    60_000
}
fn default_email_weights() -> WeightTable {
    BTreeMap::from([
        (Metric::OpenRate, 0.2),
        (Metric::ClickRate, 0.2),
        (Metric::ReplyRateEmail, 0.35),
        (Metric::ConversionRate, 0.25),
    ])
}
fn default_linkedin_weights() -> WeightTable {
    BTreeMap::from([
        (Metric::AcceptanceRate, 0.3),
        (Metric::ReplyRateLinkedin, 0.4),
        (Metric::ConversionRate, 0.3),
    ])
}
/// Union of the email and LinkedIn tables; a metric present in both keeps
/// the larger weight.
fn default_mixed_weights() -> WeightTable {
    let mut mixed = default_email_weights();
    for (metric, weight) in default_linkedin_weights() {
        let entry = mixed.entry(metric).or_insert(weight);
        *entry = entry.max(weight);
    }
    mixed
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            winner_threshold: default_winner_threshold(),
            variant_count: default_variant_count(),
            weights: ScoringWeights::default(),
        }
    }
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            email: default_email_weights(),
            linkedin: default_linkedin_weights(),
            mixed: default_mixed_weights(),
        }
    }
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            command: None,
            args: Vec::new(),
            timeout_ms: default_completion_timeout_ms(),
        }
    }
}

impl ScoringWeights {
    pub fn for_channel(&self, channel: Channel) -> &WeightTable {
        match channel {
            Channel::Email => &self.email,
            Channel::Linkedin => &self.linkedin,
            Channel::Mixed => &self.mixed,
        }
    }

    /// Weights must be finite and non-negative, and may only name metrics
    /// that apply to the table's channel.
    pub fn validate(&self) -> CampaignResult<()> {
        for channel in [Channel::Email, Channel::Linkedin, Channel::Mixed] {
            for (metric, weight) in self.for_channel(channel) {
                if !weight.is_finite() || *weight < 0.0 {
                    return Err(CampaignError::Config(format!(
                        "weight for {metric} on {channel} must be a non-negative number, got {weight}"
                    )));
                }
                if !metric.applies_to(channel) {
                    return Err(CampaignError::Config(format!(
                        "{metric} does not apply to {channel} campaigns"
                    )));
                }
            }
        }
        Ok(())
    }
}

impl AnalysisConfig {
    /// Requested variant count clamped to the supported range.
    pub fn clamp_variant_count(requested: usize) -> usize {
        requested.clamp(MIN_VARIANTS, MAX_VARIANTS)
    }
}

impl CompletionConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl AppConfig {
    /// Load configuration from environment variables only.
    pub fn load() -> CampaignResult<Self> {
        Self::load_from(None)
    }

    /// Load configuration from an optional TOML file, overridden by
    /// environment variables.
    pub fn load_from(path: Option<&Path>) -> CampaignResult<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(true));
        }
        builder = builder.add_source(
            config::Environment::with_prefix("CAMPAIGN_INSIGHTS")
                .separator("__")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("completion.args"),
        );

        let config: AppConfig = builder.build()?.try_deserialize()?;
        config.analysis.weights.validate()?;
        if config.analysis.winner_threshold < 0.0 || !config.analysis.winner_threshold.is_finite() {
            return Err(CampaignError::Config(format!(
                "winner_threshold must be a non-negative fraction, got {}",
                config.analysis.winner_threshold
            )));
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_weights() {
        let weights = ScoringWeights::default();
        assert_eq!(weights.email[&Metric::ReplyRateEmail], 0.35);
        assert_eq!(weights.linkedin[&Metric::ReplyRateLinkedin], 0.4);
        assert_eq!(weights.mixed.len(), 6);
        assert_eq!(weights.mixed[&Metric::ConversionRate], 0.3);
        assert!(weights.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_negative_and_misplaced_weights() {
        let mut weights = ScoringWeights::default();
        weights.email.insert(Metric::OpenRate, -0.1);
        assert!(weights.validate().is_err());

        let mut weights = ScoringWeights::default();
        weights.email.insert(Metric::AcceptanceRate, 0.1);
        assert!(weights.validate().is_err());
    }

    #[test]
    fn test_variant_count_clamp() {
        assert_eq!(AnalysisConfig::clamp_variant_count(0), MIN_VARIANTS);
        assert_eq!(AnalysisConfig::clamp_variant_count(4), 4);
        assert_eq!(AnalysisConfig::clamp_variant_count(12), MAX_VARIANTS);
    }

    #[test]
    fn test_load_from_toml_file() {
        let path = std::env::temp_dir().join(format!(
            "campaign-insights-config-{}.toml",
            std::process::id()
        ));
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(
            file,
            r#"
[analysis]
winner_threshold = 0.05
variant_count = 4

[analysis.weights.email]
open_rate = 0.5
reply_rate_email = 0.5

[completion]
command = "llm"
args = ["-m", "fast"]
timeout_ms = 1500
"#
        )
        .unwrap();

        let config = AppConfig::load_from(Some(&path)).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(config.analysis.winner_threshold, 0.05);
        assert_eq!(config.analysis.variant_count, 4);
        assert_eq!(config.analysis.weights.email.len(), 2);
        assert_eq!(config.analysis.weights.linkedin, default_linkedin_weights());
        assert_eq!(config.completion.command.as_deref(), Some("llm"));
        assert_eq!(config.completion.args, vec!["-m", "fast"]);
        assert_eq!(config.completion.timeout(), Duration::from_millis(1500));
    }
}
