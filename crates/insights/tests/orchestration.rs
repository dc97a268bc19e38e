//! End-to-end runs: provider records in, structured insights out.

use std::collections::BTreeMap;
use std::sync::Mutex;

use campaign_core::ingest::{catalog, from_engagement_stats};
use campaign_core::{CampaignStats, Channel};
use campaign_insights::{
    AnalysisError, AnalysisMode, AnalysisOrchestrator, AnalysisRequest, CompletionError, Insights,
    ResultSource,
};
use serde_json::json;

fn reference_portfolio() -> BTreeMap<String, CampaignStats> {
    let records: Vec<CampaignStats> = serde_json::from_value(json!([
        { "id": "A", "name": "Campaign A", "channel": "email", "sent": 1000, "opened": 650, "replied": 90 },
        { "id": "B", "name": "Campaign B", "channel": "email", "sent": 500, "opened": 200, "replied": 60 }
    ]))
    .unwrap();
    catalog(records).unwrap()
}

#[test]
fn reference_scenario_ranks_a_first() {
    let all = reference_portfolio();
    let request = AnalysisRequest::new(AnalysisMode::Comparison, ["B", "A"]);
    let prepared = AnalysisOrchestrator::default().prepare(&request, &all).unwrap();

    let a = &prepared.campaigns[0];
    let b = &prepared.campaigns[1];
    assert_eq!(a.id(), "A");
    assert_eq!(a.metrics.open_rate, Some(0.65));
    assert_eq!(b.metrics.open_rate, Some(0.40));
    assert_eq!(a.metrics.reply_rate_email, Some(0.09));
    assert_eq!(b.metrics.reply_rate_email, Some(0.12));
    assert!(prepared.prompt.text.find("[1] Campaign A") < prepared.prompt.text.find("[2] Campaign B"));
}

#[test]
fn inconsistent_record_is_rejected_at_ingestion() {
    let result: Result<Vec<CampaignStats>, _> = serde_json::from_value(json!([
        { "id": "bad", "channel": "email", "sent": 10, "opened": 11 }
    ]));
    assert!(result.is_err());
}

#[test]
fn live_full_analysis_round_trip() {
    let all = reference_portfolio();
    let seen_prompt = Mutex::new(String::new());
    let provider = |prompt: &str| {
        *seen_prompt.lock().unwrap() = prompt.to_string();
        Ok::<_, CompletionError>(
            "Sure! Here is the analysis.\n\n\
             ## WINNING_PATTERNS:\n- Campaign A opens far better\n\n\
             **RECOMMENDATIONS:**\n1. Port A's subject line to B\n"
                .to_string(),
        )
    };
    let request = AnalysisRequest::new(AnalysisMode::FullAnalysis, ["A", "B"])
        .with_context("Series B SaaS founders");
    let result = AnalysisOrchestrator::default()
        .run(&request, &all, Some(&provider))
        .unwrap();

    assert!(seen_prompt.lock().unwrap().contains("Series B SaaS founders"));
    assert_eq!(result.source, ResultSource::Live);
    let Insights::FullAnalysis(analysis) = result.insights else {
        panic!("wrong mode");
    };
    assert_eq!(analysis.winning_patterns, vec!["Campaign A opens far better"]);
    assert!(analysis.losing_patterns.is_empty());
    assert_eq!(analysis.recommendations, vec!["Port A's subject line to B"]);
}

#[test]
fn quota_failure_is_unavailable() {
    let all = reference_portfolio();
    let provider = |_: &str| Err::<String, _>(CompletionError::Quota("429".into()));
    let request = AnalysisRequest::new(AnalysisMode::AbSuggestions, ["A", "B"]);
    let err = AnalysisOrchestrator::default()
        .run(&request, &all, Some(&provider))
        .unwrap_err();
    assert!(matches!(err, AnalysisError::AnalysisUnavailable(CompletionError::Quota(_))));
    assert!(err.is_retryable());
}

#[test]
fn demo_and_live_results_share_a_shape() {
    let all = reference_portfolio();
    let orchestrator = AnalysisOrchestrator::default();
    for mode in AnalysisMode::ALL {
        let request = AnalysisRequest::new(mode, ["A", "B"]);
        let demo = orchestrator.run(&request, &all, None).unwrap();
        let silent = |_: &str| Ok::<_, CompletionError>(String::new());
        let live = orchestrator.run(&request, &all, Some(&silent)).unwrap();

        assert_eq!(demo.mode(), mode);
        assert_eq!(live.mode(), mode);
        let demo_json = serde_json::to_value(&demo).unwrap();
        let live_json = serde_json::to_value(&live).unwrap();
        let keys = |v: &serde_json::Value| {
            let mut keys: Vec<String> = v.as_object().unwrap().keys().cloned().collect();
            keys.sort();
            keys
        };
        assert_eq!(keys(&demo_json), keys(&live_json));
    }
}

#[test]
fn engagement_stats_payload_feeds_the_pipeline() {
    let payload = json!({
        "engagementStats": {
            "channel": {
                "email": { "sent": 200, "opened": 120, "clicked": 30, "replied": 20 },
                "linkedin": { "contactRequest": { "sent": 100 } }
            },
            "relations": { "newRelations": 35, "alreadyConnected": 5 },
            "replies": { "linkedinReplied": 12 },
            "converted": 6
        }
    });
    let raw = from_engagement_stats("lgm-1", Some("Founders Q3"), &payload).unwrap();
    let stats = CampaignStats::try_from(raw).unwrap();
    assert_eq!(stats.channel, Channel::Mixed);

    let all = catalog([stats]).unwrap();
    let request = AnalysisRequest::new(AnalysisMode::FullAnalysis, ["lgm-1"]);
    let prepared = AnalysisOrchestrator::default().prepare(&request, &all).unwrap();
    let metrics = prepared.campaigns[0].metrics;
    assert_eq!(metrics.acceptance_rate, Some(0.4));
    assert_eq!(metrics.reply_rate_linkedin, Some(0.3));
    assert_eq!(metrics.conversion_rate, Some(0.03));
}
