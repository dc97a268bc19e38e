use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use campaign_core::{CampaignContent, CampaignStats, Channel, Metric};
use serde::{Deserialize, Serialize};

/// Rates derived from one campaign's counters. `None` means the metric has
/// no eligible base (zero denominator or not applicable to the channel),
/// which is distinct from a measured zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct NormalizedMetrics {
    pub open_rate: Option<f64>,
    pub click_rate: Option<f64>,
    pub reply_rate_email: Option<f64>,
    pub acceptance_rate: Option<f64>,
    pub reply_rate_linkedin: Option<f64>,
    pub conversion_rate: Option<f64>,
}

impl NormalizedMetrics {
    pub fn get(&self, metric: Metric) -> Option<f64> {
        match metric {
            Metric::OpenRate => self.open_rate,
            Metric::ClickRate => self.click_rate,
            Metric::ReplyRateEmail => self.reply_rate_email,
            Metric::AcceptanceRate => self.acceptance_rate,
            Metric::ReplyRateLinkedin => self.reply_rate_linkedin,
            Metric::ConversionRate => self.conversion_rate,
        }
    }

    /// Defined metrics in canonical order.
    pub fn defined(&self) -> impl Iterator<Item = (Metric, f64)> + '_ {
        Metric::ALL
            .into_iter()
            .filter_map(|metric| self.get(metric).map(|value| (metric, value)))
    }

    pub fn defined_count(&self) -> usize {
        self.defined().count()
    }
}

/// Weighted summary of a campaign's normalized metrics, in [0, 1].
#[derive(Debug, Clone, Copy, Default, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CompositeScore(f64);

impl CompositeScore {
    pub const ZERO: CompositeScore = CompositeScore(0.0);

    pub fn new(value: f64) -> Self {
        Self(value)
    }

    pub fn value(self) -> f64 {
        self.0
    }
}

impl fmt::Display for CompositeScore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.1}%", self.0 * 100.0)
    }
}

/// A campaign together with everything the pipeline derived from it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredCampaign {
    pub stats: CampaignStats,
    pub metrics: NormalizedMetrics,
    pub score: CompositeScore,
}

impl ScoredCampaign {
    pub fn id(&self) -> &str {
        &self.stats.id
    }

    pub fn name(&self) -> &str {
        &self.stats.name
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisMode {
    FullAnalysis,
    Comparison,
    AbSuggestions,
    VariantGeneration,
}

impl AnalysisMode {
    pub const ALL: [AnalysisMode; 4] = [
        AnalysisMode::FullAnalysis,
        AnalysisMode::Comparison,
        AnalysisMode::AbSuggestions,
        AnalysisMode::VariantGeneration,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            AnalysisMode::FullAnalysis => "full_analysis",
            AnalysisMode::Comparison => "comparison",
            AnalysisMode::AbSuggestions => "ab_suggestions",
            AnalysisMode::VariantGeneration => "variant_generation",
        }
    }

    /// Fewest campaigns the mode can work with.
    pub fn min_campaigns(self) -> usize {
        match self {
            AnalysisMode::Comparison | AnalysisMode::AbSuggestions => 2,
            AnalysisMode::FullAnalysis | AnalysisMode::VariantGeneration => 1,
        }
    }
}

impl fmt::Display for AnalysisMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AnalysisMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        AnalysisMode::ALL
            .into_iter()
            .find(|mode| mode.as_str() == normalized)
            .ok_or_else(|| {
                format!(
                    "unknown analysis mode '{s}' (expected one of: full_analysis, comparison, ab_suggestions, variant_generation)"
                )
            })
    }
}

/// Caller-supplied material that shapes the prompt and the demo output.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestContext {
    /// Free-text notes from the caller.
    pub notes: Option<String>,
    /// Copy used by the campaigns, keyed by campaign id.
    pub content: BTreeMap<String, CampaignContent>,
    /// Number of variants to produce in `variant_generation` mode.
    pub variant_count: usize,
}

impl RequestContext {
    pub fn content_for(&self, campaign_id: &str) -> Option<&CampaignContent> {
        self.content.get(campaign_id).filter(|c| !c.is_empty())
    }
}

/// One analysis to run over a selection of campaigns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisRequest {
    pub mode: AnalysisMode,
    pub campaign_ids: Vec<String>,
    pub context: Option<String>,
    pub content: BTreeMap<String, CampaignContent>,
    /// Overrides the configured variant count.
    pub variant_count: Option<usize>,
    /// A completion that resolves later than this is treated as failed.
    pub deadline: Option<Duration>,
}

impl AnalysisRequest {
    pub fn new<I, S>(mode: AnalysisMode, campaign_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            mode,
            campaign_ids: campaign_ids.into_iter().map(Into::into).collect(),
            context: None,
            content: BTreeMap::new(),
            variant_count: None,
            deadline: None,
        }
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    pub fn with_content(mut self, content: BTreeMap<String, CampaignContent>) -> Self {
        self.content = content;
        self
    }

    pub fn with_variant_count(mut self, count: usize) -> Self {
        self.variant_count = Some(count);
        self
    }

    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }
}

/// Where an [`AnalysisResult`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultSource {
    Live,
    Demo,
}

/// Structured output of one analysis run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub source: ResultSource,
    /// Set when the prompt had to warn the model that no campaign qualified
    /// as a winner.
    pub low_confidence: bool,
    #[serde(flatten)]
    pub insights: Insights,
}

impl AnalysisResult {
    pub fn mode(&self) -> AnalysisMode {
        self.insights.mode()
    }
}

/// Mode-tagged insight payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum Insights {
    FullAnalysis(FullAnalysis),
    Comparison(Comparison),
    AbSuggestions(AbSuggestions),
    VariantGeneration(VariantSet),
}

impl Insights {
    /// The payload for `mode` with every list empty.
    pub fn empty(mode: AnalysisMode) -> Self {
        match mode {
            AnalysisMode::FullAnalysis => Insights::FullAnalysis(FullAnalysis::default()),
            AnalysisMode::Comparison => Insights::Comparison(Comparison::default()),
            AnalysisMode::AbSuggestions => Insights::AbSuggestions(AbSuggestions::default()),
            AnalysisMode::VariantGeneration => Insights::VariantGeneration(VariantSet::default()),
        }
    }

    pub fn mode(&self) -> AnalysisMode {
        match self {
            Insights::FullAnalysis(_) => AnalysisMode::FullAnalysis,
            Insights::Comparison(_) => AnalysisMode::Comparison,
            Insights::AbSuggestions(_) => AnalysisMode::AbSuggestions,
            Insights::VariantGeneration(_) => AnalysisMode::VariantGeneration,
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Insights::FullAnalysis(a) => {
                a.winning_patterns.is_empty()
                    && a.losing_patterns.is_empty()
                    && a.recommendations.is_empty()
            }
            Insights::Comparison(c) => c.ranking.is_empty(),
            Insights::AbSuggestions(s) => s.suggestions.is_empty(),
            Insights::VariantGeneration(v) => v.variants.is_empty(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FullAnalysis {
    pub winning_patterns: Vec<String>,
    pub losing_patterns: Vec<String>,
    pub recommendations: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comparison {
    pub ranking: Vec<RankedEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankedEntry {
    pub rank: usize,
    pub campaign: String,
    pub justification: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbSuggestions {
    pub suggestions: Vec<AbTestSuggestion>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbTestSuggestion {
    pub hypothesis: String,
    pub variant_a: String,
    pub variant_b: String,
    pub metric_to_watch: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantSet {
    pub variants: Vec<ContentVariant>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentVariant {
    pub channel: Channel,
    pub subject_or_opener: String,
    pub body: String,
}
