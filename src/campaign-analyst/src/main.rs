//! Campaign Analyst: scores outbound campaigns and turns their metrics into
//! structured insights, live through an external completion command or as
//! deterministic demo output.

mod command;

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context};
use campaign_core::config::AppConfig;
use campaign_core::{fixtures, ingest, CampaignContent, CampaignStats};
use campaign_insights::{
    summarize, AnalysisMode, AnalysisOrchestrator, AnalysisRequest, AnalysisResult,
    CompletionProvider, PROMPT_VERSION,
};
use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tracing::{error, info, warn};

use crate::command::CommandCompletion;

#[derive(Parser, Debug)]
#[command(name = "campaign-analyst")]
#[command(about = "Score outbound campaigns and turn their metrics into structured insights")]
#[command(version)]
struct Cli {
    /// JSON array of provider campaign records
    #[arg(long, global = true, conflicts_with = "demo_data")]
    input: Option<PathBuf>,

    /// Use the built-in demo campaigns and their copy
    #[arg(long, global = true, default_value_t = false)]
    demo_data: bool,

    /// JSON object mapping campaign ids to their copy
    #[arg(long, global = true)]
    content: Option<PathBuf>,

    /// TOML configuration file (environment overrides use CAMPAIGN_INSIGHTS__*)
    #[arg(long, global = true, env = "CAMPAIGN_ANALYST_CONFIG")]
    config: Option<PathBuf>,

    /// Log output format
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Json)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Json,
    Pretty,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run an analysis over selected campaigns and print the result as JSON
    Analyze(AnalyzeArgs),

    /// Print every loaded campaign ranked by composite score
    Rank,

    /// Print portfolio-wide totals and average rates as JSON
    Overview,

    /// Print the prompt an analysis would send, without sending it
    Prompt(SelectionArgs),
}

#[derive(Args, Debug)]
struct SelectionArgs {
    /// full_analysis, comparison, ab_suggestions or variant_generation
    #[arg(long)]
    mode: AnalysisMode,

    /// Campaign id; repeat to select several
    #[arg(long = "campaign")]
    campaigns: Vec<String>,

    /// Free-text notes passed to the model
    #[arg(long)]
    context: Option<String>,

    /// Number of variants for variant_generation (clamped to 2..=5)
    #[arg(long)]
    variants: Option<usize>,
}

#[derive(Args, Debug)]
struct AnalyzeArgs {
    #[command(flatten)]
    selection: SelectionArgs,

    /// Command that reads a prompt on stdin and writes the completion to stdout
    /// (overrides completion.command)
    #[arg(long)]
    llm_command: Option<String>,

    /// Use deterministic demo output instead of a live completion
    #[arg(long, default_value_t = false, conflicts_with = "llm_command")]
    demo: bool,

    /// Treat a completion slower than this as failed
    #[arg(long)]
    deadline_ms: Option<u64>,
}

/// Envelope printed by `analyze`.
#[derive(Serialize)]
struct AnalysisReport {
    generated_at: DateTime<Utc>,
    prompt_version: u32,
    campaigns: Vec<String>,
    #[serde(flatten)]
    result: AnalysisResult,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_format);

    let mut config = match cli.config.as_deref() {
        Some(path) => AppConfig::load_from(Some(path))
            .with_context(|| format!("loading configuration from {}", path.display()))?,
        None => AppConfig::load().unwrap_or_else(|e| {
            warn!(error = %e, "Failed to load config, using defaults");
            AppConfig::default()
        }),
    };
    if let Commands::Analyze(args) = &cli.command {
        if let Some(command) = &args.llm_command {
            config.completion.command = Some(command.clone());
        }
    }

    let (campaigns, content) = load_campaigns(&cli)?;
    let stats = ingest::catalog(campaigns).context("indexing campaigns")?;
    info!(
        campaigns = stats.len(),
        winner_threshold = config.analysis.winner_threshold,
        variant_count = config.analysis.variant_count,
        "Configuration loaded"
    );

    let orchestrator = AnalysisOrchestrator::new(&config.analysis);
    match cli.command {
        Commands::Analyze(args) => {
            let request = build_request(&args.selection, content, args.deadline_ms);
            let completion = if args.demo {
                None
            } else {
                match CommandCompletion::from_config(&config.completion, tokio::runtime::Handle::current()) {
                    Some(completion) => Some(completion),
                    None => bail!(
                        "no completion command configured: pass --llm-command, set completion.command, or use --demo"
                    ),
                }
            };
            let campaigns = request.campaign_ids.clone();

            // The completion blocks on the runtime, so the pipeline runs off the async workers.
            let outcome = tokio::task::spawn_blocking(move || {
                let provider = completion.as_ref().map(|c| c as &dyn CompletionProvider);
                orchestrator.run(&request, &stats, provider)
            })
            .await
            .context("analysis task panicked")?;

            let result = match outcome {
                Ok(result) => result,
                Err(e) => {
                    error!(error = %e, retryable = e.is_retryable(), "Analysis failed");
                    bail!("{}", e.user_message());
                }
            };
            let report = AnalysisReport {
                generated_at: Utc::now(),
                prompt_version: PROMPT_VERSION,
                campaigns,
                result,
            };
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Commands::Rank => {
            let ranked = orchestrator.scorer().score_and_rank(stats.values());
            println!("{:<5} {:>7}  {:<16} NAME", "RANK", "SCORE", "ID");
            for (index, campaign) in ranked.iter().enumerate() {
                println!(
                    "{:<5} {:>7}  {:<16} {}",
                    index + 1,
                    campaign.score.to_string(),
                    campaign.id(),
                    campaign.name()
                );
            }
        }
        Commands::Overview => {
            let all: Vec<CampaignStats> = stats.into_values().collect();
            println!("{}", serde_json::to_string_pretty(&summarize(&all))?);
        }
        Commands::Prompt(selection) => {
            let request = build_request(&selection, content, None);
            let prepared = match orchestrator.prepare(&request, &stats) {
                Ok(prepared) => prepared,
                Err(e) => bail!("{}", e.user_message()),
            };
            if prepared.prompt.low_confidence {
                warn!("No campaign clears the winner threshold; prompt is flagged low confidence");
            }
            print!("{}", prepared.prompt.text);
        }
    }

    Ok(())
}

fn init_tracing(format: LogFormat) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "campaign_analyst=info,campaign_insights=info,campaign_core=info".into());
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    match format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Pretty => builder.pretty().init(),
    }
}

fn load_campaigns(
    cli: &Cli,
) -> anyhow::Result<(Vec<CampaignStats>, BTreeMap<String, CampaignContent>)> {
    let (campaigns, mut content) = match (&cli.input, cli.demo_data) {
        (Some(path), _) => (
            ingest::read_records(path)
                .with_context(|| format!("reading campaign records from {}", path.display()))?,
            BTreeMap::new(),
        ),
        (None, true) => (fixtures::demo_campaigns(), fixtures::demo_content()),
        (None, false) => bail!("no campaign data: pass --input FILE or --demo-data"),
    };
    if let Some(path) = &cli.content {
        let extra = ingest::read_content(path)
            .with_context(|| format!("reading campaign content from {}", path.display()))?;
        content.extend(extra);
    }
    Ok((campaigns, content))
}

fn build_request(
    selection: &SelectionArgs,
    content: BTreeMap<String, CampaignContent>,
    deadline_ms: Option<u64>,
) -> AnalysisRequest {
    let mut request = AnalysisRequest::new(selection.mode, selection.campaigns.iter().cloned())
        .with_content(content);
    if let Some(notes) = &selection.context {
        request = request.with_context(notes.clone());
    }
    if let Some(count) = selection.variants {
        request = request.with_variant_count(count);
    }
    if let Some(ms) = deadline_ms {
        request = request.with_deadline(Duration::from_millis(ms));
    }
    request
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_analyze() {
        let cli = Cli::try_parse_from([
            "campaign-analyst",
            "--demo-data",
            "analyze",
            "--mode",
            "comparison",
            "--campaign",
            "demo_1",
            "--campaign",
            "demo_4",
            "--demo",
            "--variants",
            "4",
        ])
        .unwrap();
        assert!(cli.demo_data);
        assert_eq!(cli.log_format, LogFormat::Json);
        let Commands::Analyze(args) = cli.command else {
            panic!("expected analyze");
        };
        assert!(args.demo);
        assert_eq!(args.selection.mode, AnalysisMode::Comparison);
        assert_eq!(args.selection.campaigns, vec!["demo_1", "demo_4"]);

        let request = build_request(&args.selection, BTreeMap::new(), Some(250));
        assert_eq!(request.variant_count, Some(4));
        assert_eq!(request.deadline, Some(Duration::from_millis(250)));
    }

    #[test]
    fn test_demo_conflicts_with_llm_command() {
        let parsed = Cli::try_parse_from([
            "campaign-analyst",
            "analyze",
            "--mode",
            "full_analysis",
            "--demo",
            "--llm-command",
            "llm",
        ]);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_unknown_mode_is_rejected() {
        let parsed = Cli::try_parse_from(["campaign-analyst", "prompt", "--mode", "summary"]);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_demo_data_loads_with_content() {
        let cli = Cli::try_parse_from(["campaign-analyst", "--demo-data", "rank"]).unwrap();
        let (campaigns, content) = load_campaigns(&cli).unwrap();
        assert_eq!(campaigns.len(), 4);
        assert_eq!(content.len(), 4);
    }

    #[test]
    fn test_missing_data_source_is_an_error() {
        let cli = Cli::try_parse_from(["campaign-analyst", "overview"]).unwrap();
        assert!(load_campaigns(&cli).is_err());
    }
}
