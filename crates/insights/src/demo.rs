//! Deterministic stand-in for a live completion.
//!
//! Every sentence is assembled from the campaigns' computed scores and
//! metrics, so the same selection always yields the same result and the
//! result has exactly the shape [`crate::parser::parse`] produces.

use campaign_core::{Channel, Metric};

use crate::prompt::percent;
use crate::scorer::ScoringEngine;
use crate::types::{
    AbSuggestions, AbTestSuggestion, AnalysisMode, AnalysisResult, Comparison, ContentVariant,
    FullAnalysis, Insights, RankedEntry, RequestContext, ResultSource, ScoredCampaign, VariantSet,
};

const EMAIL_SUBJECTS: [&str; 5] = [
    "Quick question, {{firstName}}",
    "Idea for {{company}}",
    "{{firstName}}, worth a look?",
    "Saw what {{company}} is building",
    "One last note, {{firstName}}",
];

const LINKEDIN_OPENERS: [&str; 5] = [
    "Hi {{firstName}}, loved your recent post",
    "{{firstName}}, quick idea for {{company}}",
    "Hi {{firstName}}, one question",
    "Congrats on the new role, {{firstName}}",
    "{{firstName}}, fellow operator here",
];

const ANGLES: [&str; 5] = [
    "Lead with the problem you solve.",
    "Open with a concrete customer result.",
    "Keep it under 60 words.",
    "Ask one direct question.",
    "Reference a recent trigger event.",
];

/// Build a demo result for `mode` from `campaigns`.
///
/// `low_confidence` mirrors the prompt annotation: when set, variants are
/// framed as exploratory and no campaign is presented as a proven winner.
pub fn demo_result(
    mode: AnalysisMode,
    campaigns: &[ScoredCampaign],
    engine: &ScoringEngine,
    context: &RequestContext,
    low_confidence: bool,
) -> AnalysisResult {
    let ranked = engine.rank(campaigns.to_vec());
    let insights = match mode {
        AnalysisMode::FullAnalysis => Insights::FullAnalysis(full_analysis(&ranked, engine)),
        AnalysisMode::Comparison => Insights::Comparison(comparison(&ranked, engine)),
        AnalysisMode::AbSuggestions => Insights::AbSuggestions(ab_suggestions(&ranked, engine)),
        AnalysisMode::VariantGeneration => Insights::VariantGeneration(variants(
            &ranked,
            engine,
            context,
            low_confidence,
        )),
    };
    AnalysisResult {
        source: ResultSource::Demo,
        low_confidence,
        insights,
    }
}

fn full_analysis(ranked: &[ScoredCampaign], engine: &ScoringEngine) -> FullAnalysis {
    let mut analysis = FullAnalysis::default();
    let Some(leader) = ranked.first() else {
        return analysis;
    };

    match driver(engine, leader) {
        Some((metric, value)) => analysis.winning_patterns.push(format!(
            "{} leads with a {} composite score driven by {} ({}).",
            leader.name(),
            leader.score,
            metric.label(),
            percent(value)
        )),
        None => analysis
            .winning_patterns
            .push("No campaign has enough volume to measure yet.".to_string()),
    }
    for metric in Metric::ALL {
        if let Some((best, value)) = best_on(ranked, metric) {
            analysis.winning_patterns.push(format!(
                "Best {}: {} at {}.",
                metric.label(),
                best.name(),
                percent(value)
            ));
        }
    }

    let laggard = ranked.last().filter(|_| ranked.len() > 1);
    if let Some(laggard) = laggard {
        let weakest_note = weakest(engine, laggard).map_or_else(
            || "it has no measurable rates yet".to_string(),
            |(metric, value)| format!("its weakest signal is {} ({})", metric.label(), percent(value)),
        );
        analysis.losing_patterns.push(format!(
            "{} trails with a {} composite score; {}.",
            laggard.name(),
            laggard.score,
            weakest_note
        ));
    }
    for campaign in ranked {
        if campaign.metrics.defined_count() == 0 && Some(campaign) != laggard {
            analysis
                .losing_patterns
                .push(format!("{} has no measurable rates yet.", campaign.name()));
        }
    }
    if ranked.len() == 1 {
        if let Some((metric, value)) = weakest(engine, leader) {
            analysis.losing_patterns.push(format!(
                "{}'s weakest signal is {} ({}).",
                leader.name(),
                metric.label(),
                percent(value)
            ));
        }
    }

    if let Some((metric, _)) = driver(engine, leader) {
        analysis.recommendations.push(format!(
            "Reuse the {} of {} in the next campaigns; it is what drives its {}.",
            element(metric),
            leader.name(),
            metric.label()
        ));
    }
    let target = laggard.unwrap_or(leader);
    if let Some((metric, _)) = weakest(engine, target) {
        analysis.recommendations.push(format!(
            "Rework the {} of {} to lift its {}.",
            element(metric),
            target.name(),
            metric.label()
        ));
    }
    analysis
}

fn comparison(ranked: &[ScoredCampaign], engine: &ScoringEngine) -> Comparison {
    let ranking = ranked
        .iter()
        .enumerate()
        .map(|(index, campaign)| {
            let justification = match driver(engine, campaign) {
                Some((metric, value)) => format!(
                    "{} composite score, strongest on {} ({}).",
                    campaign.score,
                    metric.label(),
                    percent(value)
                ),
                None => format!("{} composite score, no measurable rates yet.", campaign.score),
            };
            RankedEntry {
                rank: index + 1,
                campaign: campaign.name().to_string(),
                justification,
            }
        })
        .collect();
    Comparison { ranking }
}

fn ab_suggestions(ranked: &[ScoredCampaign], engine: &ScoringEngine) -> AbSuggestions {
    let leader = ranked.first();
    let suggestions = ranked
        .iter()
        .filter_map(|campaign| {
            let (metric, value) = weakest(engine, campaign)?;
            let piece = element(metric);
            let variant_b = match leader.filter(|l| l.id() != campaign.id()) {
                Some(leader) => format!("{} modelled on {}", capitalize(piece), leader.name()),
                None => format!("Shorter, more personal {piece}"),
            };
            Some(AbTestSuggestion {
                hypothesis: format!(
                    "A new {piece} will lift the {} of {} (currently {}).",
                    metric.label(),
                    campaign.name(),
                    percent(value)
                ),
                variant_a: format!("Current {piece}"),
                variant_b,
                metric_to_watch: metric.label().to_string(),
            })
        })
        .collect();
    AbSuggestions { suggestions }
}

fn variants(
    ranked: &[ScoredCampaign],
    engine: &ScoringEngine,
    context: &RequestContext,
    low_confidence: bool,
) -> VariantSet {
    let Some(leader) = ranked.first() else {
        return VariantSet::default();
    };
    let content = context.content_for(leader.id());
    let leader_driver = driver(engine, leader);

    let variants = (0..context.variant_count)
        .map(|index| {
            let channel = match leader.stats.channel {
                Channel::Mixed if index % 2 == 1 => Channel::Linkedin,
                Channel::Mixed => Channel::Email,
                channel => channel,
            };
            let reused = match channel {
                Channel::Linkedin => content
                    .and_then(|c| c.linkedin_message.as_deref())
                    .and_then(|m| m.lines().next()),
                _ => content.and_then(|c| c.subject.as_deref()),
            }
            .map(str::trim)
            .filter(|s| !s.is_empty() && index < 2);

            let slot = index % ANGLES.len();
            let subject_or_opener = reused.map_or_else(
                || match channel {
                    Channel::Linkedin => LINKEDIN_OPENERS[slot].to_string(),
                    _ => EMAIL_SUBJECTS[slot].to_string(),
                },
                str::to_string,
            );

            let mut body = String::from("Hi {{firstName}},\n");
            if low_confidence {
                body.push_str(&format!(
                    "Exploratory idea: no campaign has a proven reply or conversion rate yet, so this borrows from {} only as a starting point. ",
                    leader.name()
                ));
            } else if let Some((metric, value)) = leader_driver {
                body.push_str(&format!(
                    "Built on {}, which leads on {} ({}). ",
                    leader.name(),
                    metric.label(),
                    percent(value)
                ));
            }
            body.push_str(ANGLES[slot]);
            body.push_str("\nWorth a 15-minute call next week?");

            ContentVariant {
                channel,
                subject_or_opener,
                body,
            }
        })
        .collect();
    VariantSet { variants }
}

/// Metric contributing most to the composite score, with its raw value.
fn driver(engine: &ScoringEngine, campaign: &ScoredCampaign) -> Option<(Metric, f64)> {
    let (metric, _) = engine
        .contributions(&campaign.metrics, campaign.stats.channel)
        .into_iter()
        .fold(None, |best: Option<(Metric, f64)>, (metric, share)| match best {
            Some((_, top)) if top >= share => best,
            _ => Some((metric, share)),
        })?;
    campaign.metrics.get(metric).map(|value| (metric, value))
}

/// Lowest weighted metric the campaign defines.
fn weakest(engine: &ScoringEngine, campaign: &ScoredCampaign) -> Option<(Metric, f64)> {
    engine
        .effective_weights(&campaign.metrics, campaign.stats.channel)
        .into_iter()
        .filter_map(|(metric, _)| campaign.metrics.get(metric).map(|value| (metric, value)))
        .fold(None, |worst: Option<(Metric, f64)>, (metric, value)| match worst {
            Some((_, low)) if low <= value => worst,
            _ => Some((metric, value)),
        })
}

/// Campaign with the highest value for `metric`; earlier rank wins ties.
fn best_on(ranked: &[ScoredCampaign], metric: Metric) -> Option<(&ScoredCampaign, f64)> {
    ranked
        .iter()
        .filter_map(|c| c.metrics.get(metric).map(|value| (c, value)))
        .fold(None, |best, (campaign, value)| match best {
            Some((_, top)) if top >= value => best,
            _ => Some((campaign, value)),
        })
}

/// The piece of copy that most directly moves `metric`.
fn element(metric: Metric) -> &'static str {
    match metric {
        Metric::OpenRate => "subject line",
        Metric::ClickRate => "call to action",
        Metric::ReplyRateEmail => "email opener",
        Metric::AcceptanceRate => "connection request note",
        Metric::ReplyRateLinkedin => "first LinkedIn message",
        Metric::ConversionRate => "offer",
    }
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
