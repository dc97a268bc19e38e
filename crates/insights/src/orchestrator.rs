//! Analysis façade: validates a request, runs normalize → score → rank →
//! prompt, then either calls the completion capability and parses its text
//! or builds the demo result.

use std::collections::{BTreeMap, BTreeSet};
use std::time::Instant;

use campaign_core::{AnalysisConfig, CampaignStats};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::completion::{CompletionError, CompletionProvider};
use crate::demo::demo_result;
use crate::error::{AnalysisError, AnalysisOutcome};
use crate::parser::parse;
use crate::prompt::{Prompt, PromptBuilder};
use crate::scorer::ScoringEngine;
use crate::types::{AnalysisMode, AnalysisRequest, AnalysisResult, RequestContext, ScoredCampaign};

/// A validated request with everything computed up to the prompt.
#[derive(Debug, Clone)]
pub struct PreparedAnalysis {
    pub mode: AnalysisMode,
    /// Selected campaigns, best first.
    pub campaigns: Vec<ScoredCampaign>,
    pub context: RequestContext,
    pub prompt: Prompt,
}

pub struct AnalysisOrchestrator {
    scorer: ScoringEngine,
    prompts: PromptBuilder,
    default_variant_count: usize,
}

impl AnalysisOrchestrator {
    pub fn new(config: &AnalysisConfig) -> Self {
        Self {
            scorer: ScoringEngine::new(config.weights.clone()),
            prompts: PromptBuilder::new(config.winner_threshold),
            default_variant_count: AnalysisConfig::clamp_variant_count(config.variant_count),
        }
    }

    pub fn scorer(&self) -> &ScoringEngine {
        &self.scorer
    }

    /// Validate the selection and build the prompt without calling out.
    ///
    /// Checks run in a fixed order: empty selection, repeated id, unknown id,
    /// then the mode's minimum campaign count.
    pub fn prepare(
        &self,
        request: &AnalysisRequest,
        all_stats: &BTreeMap<String, CampaignStats>,
    ) -> AnalysisOutcome<PreparedAnalysis> {
        let selected = select(request, all_stats)?;
        let campaigns = self.scorer.score_and_rank(selected);

        let context = RequestContext {
            notes: request.context.clone(),
            content: request.content.clone(),
            variant_count: request
                .variant_count
                .map_or(self.default_variant_count, AnalysisConfig::clamp_variant_count),
        };
        let prompt = self.prompts.build(request.mode, &campaigns, &context);

        Ok(PreparedAnalysis {
            mode: request.mode,
            campaigns,
            context,
            prompt,
        })
    }

    /// Run one analysis.
    ///
    /// With a completion capability the result is parsed from its text and
    /// any failure, including a missed deadline, is `AnalysisUnavailable`.
    /// Without one the deterministic demo result is returned. A failed live
    /// call never falls back to demo output.
    pub fn run(
        &self,
        request: &AnalysisRequest,
        all_stats: &BTreeMap<String, CampaignStats>,
        completion: Option<&dyn CompletionProvider>,
    ) -> AnalysisOutcome<AnalysisResult> {
        let run_id = Uuid::new_v4();
        metrics::counter!("analysis.requests").increment(1);
        info!(
            run_id = %run_id,
            mode = %request.mode,
            campaigns = request.campaign_ids.len(),
            live = completion.is_some(),
            "Starting analysis"
        );

        let prepared = self.prepare(request, all_stats).map_err(|e| {
            metrics::counter!("analysis.rejected").increment(1);
            warn!(run_id = %run_id, error = %e, "Analysis request rejected");
            e
        })?;
        debug!(
            run_id = %run_id,
            prompt_bytes = prepared.prompt.text.len(),
            low_confidence = prepared.prompt.low_confidence,
            "Prompt built"
        );

        let Some(provider) = completion else {
            metrics::counter!("analysis.demo").increment(1);
            let result = demo_result(
                prepared.mode,
                &prepared.campaigns,
                &self.scorer,
                &prepared.context,
                prepared.prompt.low_confidence,
            );
            info!(run_id = %run_id, source = "demo", "Analysis complete");
            return Ok(result);
        };

        let started = Instant::now();
        let outcome = provider.complete(&prepared.prompt.text);
        let elapsed = started.elapsed();
        metrics::histogram!("analysis.completion_latency_ms").record(elapsed.as_secs_f64() * 1000.0);

        let raw = outcome
            .and_then(|raw| match request.deadline {
                Some(deadline) if elapsed > deadline => {
                    Err(CompletionError::DeadlineExceeded { deadline, elapsed })
                }
                _ => Ok(raw),
            })
            .map_err(|e| {
                metrics::counter!("analysis.unavailable").increment(1);
                warn!(
                    run_id = %run_id,
                    provider = provider.name(),
                    error = %e,
                    elapsed_ms = elapsed.as_millis() as u64,
                    "Completion failed"
                );
                AnalysisError::AnalysisUnavailable(e)
            })?;

        let mut result = parse(prepared.mode, &raw);
        result.low_confidence = prepared.prompt.low_confidence;
        if result.insights.is_empty() {
            warn!(run_id = %run_id, "Completion contained none of the expected sections");
        }
        info!(
            run_id = %run_id,
            source = "live",
            elapsed_ms = elapsed.as_millis() as u64,
            "Analysis complete"
        );
        Ok(result)
    }
}

impl Default for AnalysisOrchestrator {
    fn default() -> Self {
        Self::new(&AnalysisConfig::default())
    }
}

fn select<'a>(
    request: &AnalysisRequest,
    all_stats: &'a BTreeMap<String, CampaignStats>,
) -> AnalysisOutcome<Vec<&'a CampaignStats>> {
    if request.campaign_ids.is_empty() {
        return Err(AnalysisError::EmptySelection);
    }

    let mut seen = BTreeSet::new();
    if let Some(repeated) = request.campaign_ids.iter().find(|id| !seen.insert(id.as_str())) {
        return Err(AnalysisError::DuplicateCampaign(repeated.clone()));
    }

    let selected = request
        .campaign_ids
        .iter()
        .map(|id| {
            all_stats
                .get(id)
                .ok_or_else(|| AnalysisError::UnknownCampaign(id.clone()))
        })
        .collect::<AnalysisOutcome<Vec<_>>>()?;

    let required = request.mode.min_campaigns();
    if selected.len() < required {
        return Err(AnalysisError::InsufficientData {
            mode: request.mode,
            required,
            provided: selected.len(),
        });
    }
    Ok(selected)
}
