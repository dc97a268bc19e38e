//! Campaign scoring and language-model analysis orchestration.

pub mod completion;
pub mod demo;
pub mod error;
pub mod normalizer;
pub mod orchestrator;
pub mod overview;
pub mod parser;
pub mod prompt;
pub mod scorer;
pub mod sections;
pub mod types;

pub use completion::{CompletionError, CompletionProvider};
pub use demo::demo_result;
pub use error::{AnalysisError, AnalysisOutcome};
pub use normalizer::normalize;
pub use orchestrator::{AnalysisOrchestrator, PreparedAnalysis};
pub use overview::{summarize, PortfolioOverview};
pub use parser::parse;
pub use prompt::{Prompt, PromptBuilder, PROMPT_VERSION};
pub use scorer::{rank, ScoringEngine};
pub use sections::{Section, VOCABULARY_VERSION};
pub use types::{
    AbSuggestions, AbTestSuggestion, AnalysisMode, AnalysisRequest, AnalysisResult, Comparison,
    CompositeScore, ContentVariant, FullAnalysis, Insights, NormalizedMetrics, RankedEntry,
    RequestContext, ResultSource, ScoredCampaign, VariantSet,
};
