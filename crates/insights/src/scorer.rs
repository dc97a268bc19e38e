use std::cmp::Ordering;

use campaign_core::{CampaignStats, Channel, Metric, ScoringWeights};

use crate::normalizer::normalize;
use crate::types::{CompositeScore, NormalizedMetrics, ScoredCampaign};

/// Combines normalized metrics into one comparable score per campaign and
/// orders campaigns by it.
#[derive(Debug, Clone, Default)]
pub struct ScoringEngine {
    weights: ScoringWeights,
}

impl ScoringEngine {
    pub fn new(weights: ScoringWeights) -> Self {
        Self { weights }
    }

    pub fn weights(&self) -> &ScoringWeights {
        &self.weights
    }

    /// Weights of the metrics that are both weighted for `channel` and
    /// defined in `metrics`, re-normalized to sum to 1.
    ///
    /// Iterates in canonical metric order so the floating-point result does
    /// not depend on how the weight table was written. Empty when nothing
    /// is defined.
    pub fn effective_weights(
        &self,
        metrics: &NormalizedMetrics,
        channel: Channel,
    ) -> Vec<(Metric, f64)> {
        let table = self.weights.for_channel(channel);
        let applicable: Vec<(Metric, f64)> = Metric::ALL
            .into_iter()
            .filter(|metric| metrics.get(*metric).is_some())
            .filter_map(|metric| {
                table
                    .get(&metric)
                    .copied()
                    .filter(|weight| *weight > 0.0)
                    .map(|weight| (metric, weight))
            })
            .collect();

        let total: f64 = applicable.iter().map(|(_, weight)| weight).sum();
        if total <= 0.0 {
            return Vec::new();
        }
        applicable
            .into_iter()
            .map(|(metric, weight)| (metric, weight / total))
            .collect()
    }

    /// Per-metric share of the composite score (effective weight × value).
    pub fn contributions(
        &self,
        metrics: &NormalizedMetrics,
        channel: Channel,
    ) -> Vec<(Metric, f64)> {
        self.effective_weights(metrics, channel)
            .into_iter()
            .filter_map(|(metric, weight)| metrics.get(metric).map(|value| (metric, weight * value)))
            .collect()
    }

    /// Weighted mean of the defined metrics; zero when none is defined.
    pub fn score(&self, metrics: &NormalizedMetrics, channel: Channel) -> CompositeScore {
        let table = self.weights.for_channel(channel);
        let mut weighted = 0.0;
        let mut total_weight = 0.0;
        for (metric, value) in metrics.defined() {
            if let Some(weight) = table.get(&metric).copied().filter(|w| *w > 0.0) {
                weighted += weight * value;
                total_weight += weight;
            }
        }
        if total_weight > 0.0 {
            CompositeScore::new(weighted / total_weight)
        } else {
            CompositeScore::ZERO
        }
    }

    pub fn score_campaign(&self, stats: &CampaignStats) -> ScoredCampaign {
        let metrics = normalize(stats);
        let score = self.score(&metrics, stats.channel);
        ScoredCampaign {
            stats: stats.clone(),
            metrics,
            score,
        }
    }

    /// Score every campaign and sort them best first.
    pub fn score_and_rank<'a>(
        &self,
        campaigns: impl IntoIterator<Item = &'a CampaignStats>,
    ) -> Vec<ScoredCampaign> {
        let mut scored: Vec<ScoredCampaign> =
            campaigns.into_iter().map(|c| self.score_campaign(c)).collect();
        scored.sort_by(rank_order);
        scored
    }

    /// Sort campaigns best first. See [`rank_order`] for tie-breaks.
    pub fn rank(&self, mut campaigns: Vec<ScoredCampaign>) -> Vec<ScoredCampaign> {
        campaigns.sort_by(rank_order);
        campaigns
    }
}

/// Ranking comparator: higher score first, then campaigns with at least one
/// defined metric ahead of unscored ones, then higher conversion rate (an
/// undefined rate sorts below any defined one), then larger send volume,
/// then ascending id.
pub fn rank_order(a: &ScoredCampaign, b: &ScoredCampaign) -> Ordering {
    b.score
        .value()
        .total_cmp(&a.score.value())
        .then_with(|| {
            let has_metrics = |c: &ScoredCampaign| c.metrics.defined_count() > 0;
            has_metrics(b).cmp(&has_metrics(a))
        })
        .then_with(|| cmp_optional_desc(a.metrics.conversion_rate, b.metrics.conversion_rate))
        .then_with(|| b.stats.counters.sent.cmp(&a.stats.counters.sent))
        .then_with(|| a.stats.id.cmp(&b.stats.id))
}

fn cmp_optional_desc(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => b.total_cmp(&a),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Ids of `campaigns`, best first.
pub fn rank(campaigns: &[ScoredCampaign]) -> Vec<String> {
    let mut ordered: Vec<&ScoredCampaign> = campaigns.iter().collect();
    ordered.sort_by(|a, b| rank_order(a, b));
    ordered.into_iter().map(|c| c.stats.id.clone()).collect()
}
