//! Counter → rate conversion.

use campaign_core::CampaignStats;

use crate::types::NormalizedMetrics;

/// Derive rate metrics from a campaign's counters.
///
/// Email-side rates use `sent` as the base, acceptance uses LinkedIn requests
/// sent, LinkedIn replies use acceptances, conversion uses `sent`. A rate
/// whose base is zero, or whose channel it does not apply to, is `None`.
pub fn normalize(stats: &CampaignStats) -> NormalizedMetrics {
    let c = &stats.counters;
    let email = stats.channel.has_email();
    let linkedin = stats.channel.has_linkedin();
    let li = stats.linkedin_counters();

    NormalizedMetrics {
        open_rate: email.then(|| rate(c.opened, c.sent)).flatten(),
        click_rate: email.then(|| rate(c.clicked, c.sent)).flatten(),
        reply_rate_email: email.then(|| rate(c.replied, c.sent)).flatten(),
        acceptance_rate: linkedin.then(|| rate(li.accepted, li.sent)).flatten(),
        reply_rate_linkedin: linkedin.then(|| rate(li.replied, li.accepted)).flatten(),
        conversion_rate: rate(c.converted, c.sent),
    }
}

fn rate(numerator: u64, denominator: u64) -> Option<f64> {
    (denominator > 0).then(|| numerator as f64 / denominator as f64)
}
