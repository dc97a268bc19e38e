//! Portfolio-level summary across all loaded campaigns.

use campaign_core::{CampaignStats, Channel};
use serde::Serialize;

use crate::normalizer::normalize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PortfolioOverview {
    pub campaigns: usize,
    /// Emails plus LinkedIn requests sent.
    pub total_sent: u64,
    pub total_conversions: u64,
    pub avg_open_rate: Option<f64>,
    /// Mean of each campaign's replies over everything it sent, both channels.
    pub avg_reply_rate: Option<f64>,
    pub avg_conversion_rate: Option<f64>,
}

/// Summarize `campaigns`. Each average only counts the campaigns where the
/// rate is defined and is `None` when no campaign defines it.
pub fn summarize(campaigns: &[CampaignStats]) -> PortfolioOverview {
    let mut opens = Vec::new();
    let mut replies = Vec::new();
    let mut conversions = Vec::new();
    let mut total_sent = 0u64;
    let mut total_conversions = 0u64;

    for stats in campaigns {
        let metrics = normalize(stats);
        opens.extend(metrics.open_rate);
        conversions.extend(metrics.conversion_rate);
        replies.extend(global_reply_rate(stats));

        total_sent = total_sent.saturating_add(sent(stats));
        total_conversions = total_conversions.saturating_add(stats.counters.converted);
    }

    PortfolioOverview {
        campaigns: campaigns.len(),
        total_sent,
        total_conversions,
        avg_open_rate: mean(&opens),
        avg_reply_rate: mean(&replies),
        avg_conversion_rate: mean(&conversions),
    }
}

fn sent(stats: &CampaignStats) -> u64 {
    match (stats.channel, stats.linkedin) {
        (Channel::Mixed, Some(linkedin)) => stats.counters.sent.saturating_add(linkedin.sent),
        _ => stats.counters.sent,
    }
}

fn global_reply_rate(stats: &CampaignStats) -> Option<f64> {
    let replied = match (stats.channel, stats.linkedin) {
        (Channel::Mixed, Some(linkedin)) => stats.counters.replied.saturating_add(linkedin.replied),
        _ => stats.counters.replied,
    };
    let sent = sent(stats);
    (sent > 0).then(|| replied as f64 / sent as f64)
}

fn mean(values: &[f64]) -> Option<f64> {
    (!values.is_empty()).then(|| values.iter().sum::<f64>() / values.len() as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use campaign_core::fixtures::demo_campaigns;
    use campaign_core::Counters;

    fn approx(a: Option<f64>, b: f64) -> bool {
        a.is_some_and(|a| (a - b).abs() < 1e-12)
    }

    #[test]
    fn test_empty_portfolio() {
        let overview = summarize(&[]);
        assert_eq!(overview.campaigns, 0);
        assert_eq!(overview.total_sent, 0);
        assert_eq!(overview.avg_open_rate, None);
        assert_eq!(overview.avg_reply_rate, None);
    }

    #[test]
    fn test_averages_skip_undefined_rates() {
        let active = CampaignStats::new(
            "a",
            "Active",
            Channel::Email,
            Counters {
                sent: 100,
                opened: 50,
                replied: 10,
                converted: 2,
                ..Default::default()
            },
        )
        .unwrap();
        let unsent = CampaignStats::new("u", "Unsent", Channel::Email, Counters::default()).unwrap();
        let overview = summarize(&[active, unsent]);
        assert_eq!(overview.campaigns, 2);
        assert!(approx(overview.avg_open_rate, 0.5));
        assert!(approx(overview.avg_reply_rate, 0.1));
        assert!(approx(overview.avg_conversion_rate, 0.02));
    }

    #[test]
    fn test_demo_portfolio_totals() {
        let overview = summarize(&demo_campaigns());
        assert_eq!(overview.campaigns, 4);
        assert_eq!(overview.total_sent, 145 + 120 + 95 + 120 + 195 + 75 + 80);
        assert_eq!(overview.total_conversions, 5 + 7 + 3 + 9);
        // demo_4: (10 + 28) / (75 + 80)
        let replies = [30.0 / 265.0, 30.0 / 215.0, 15.0 / 195.0, 38.0 / 155.0];
        assert!(approx(overview.avg_reply_rate, replies.iter().sum::<f64>() / 4.0));
    }
}
