//! Header-driven extraction of model responses.
//!
//! Parsing never fails. A section the model left out comes back as an empty
//! list, and lines that do not fit the expected item format are skipped.

use std::collections::BTreeMap;

use campaign_core::Channel;
use tracing::debug;

use crate::sections::Section;
use crate::types::{
    AbSuggestions, AbTestSuggestion, AnalysisMode, AnalysisResult, Comparison, ContentVariant,
    FullAnalysis, Insights, RankedEntry, ResultSource, VariantSet,
};

/// Parse a raw completion into the result shape for `mode`.
pub fn parse(mode: AnalysisMode, raw: &str) -> AnalysisResult {
    let sections = extract_sections(raw);
    let items = |section: Section| sections.get(&section).map(Vec::as_slice).unwrap_or_default();

    let insights = match mode {
        AnalysisMode::FullAnalysis => Insights::FullAnalysis(FullAnalysis {
            winning_patterns: list(items(Section::WinningPatterns)),
            losing_patterns: list(items(Section::LosingPatterns)),
            recommendations: list(items(Section::Recommendations)),
        }),
        AnalysisMode::Comparison => Insights::Comparison(Comparison {
            ranking: ranking(items(Section::Ranking)),
        }),
        AnalysisMode::AbSuggestions => Insights::AbSuggestions(AbSuggestions {
            suggestions: ab_suggestions(items(Section::AbSuggestions)),
        }),
        AnalysisMode::VariantGeneration => Insights::VariantGeneration(VariantSet {
            variants: variants(items(Section::Variants)),
        }),
    };

    AnalysisResult {
        source: ResultSource::Live,
        low_confidence: false,
        insights,
    }
}

/// Split a response into its sections. Each section holds its non-empty
/// lines, trimmed. Text before the first header and code-fence lines are
/// dropped. A repeated header appends to the earlier block.
pub fn extract_sections(raw: &str) -> BTreeMap<Section, Vec<String>> {
    let mut sections: BTreeMap<Section, Vec<String>> = BTreeMap::new();
    let mut current: Option<Section> = None;
    let mut preamble = 0usize;

    for line in raw.lines() {
        let line = line.trim();
        if line.starts_with("```") || is_rule(line) {
            continue;
        }
        if let Some((section, inline)) = Section::match_header(line) {
            current = Some(section);
            let block = sections.entry(section).or_default();
            if !inline.is_empty() {
                block.push(inline.to_string());
            }
            continue;
        }
        if line.is_empty() {
            continue;
        }
        match current {
            Some(section) => sections.entry(section).or_default().push(line.to_string()),
            None => preamble += 1,
        }
    }

    if preamble > 0 {
        debug!(lines = preamble, "ignored text before the first section header");
    }
    sections
}

fn is_rule(line: &str) -> bool {
    line.len() >= 3 && line.chars().all(|c| matches!(c, '-' | '*' | '_' | '='))
}

fn list(items: &[String]) -> Vec<String> {
    items
        .iter()
        .map(|item| strip_bullet(item))
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

fn ranking(items: &[String]) -> Vec<RankedEntry> {
    items
        .iter()
        .enumerate()
        .filter_map(|(index, item)| {
            let (rank, rest) = split_ordinal(item).unwrap_or((index + 1, strip_bullet(item)));
            let (campaign, justification) = match rest.split_once('|') {
                Some((campaign, justification)) => (campaign, justification),
                None => rest.split_once(" - ").unwrap_or((rest, "")),
            };
            let campaign = clean_name(strip_label(campaign, &["campaign"]));
            if campaign.is_empty() {
                return None;
            }
            Some(RankedEntry {
                rank,
                campaign: campaign.to_string(),
                justification: strip_label(justification, &["justification", "reason"])
                    .to_string(),
            })
        })
        .collect()
}

fn ab_suggestions(items: &[String]) -> Vec<AbTestSuggestion> {
    items
        .iter()
        .filter_map(|item| {
            let fields: Vec<&str> = strip_bullet(item).splitn(4, '|').map(str::trim).collect();
            let (hypothesis, variant_a, variant_b, metric) = match fields.as_slice() {
                [h, a, b] => (*h, *a, *b, ""),
                [h, a, b, m] => (*h, *a, *b, *m),
                _ => {
                    debug!(line = %item, "skipping A/B suggestion without hypothesis and both variants");
                    return None;
                }
            };
            Some(AbTestSuggestion {
                hypothesis: strip_label(hypothesis, &["hypothesis"]).to_string(),
                variant_a: strip_label(variant_a, &["variant a", "a"]).to_string(),
                variant_b: strip_label(variant_b, &["variant b", "b"]).to_string(),
                metric_to_watch: strip_label(metric, &["metric to watch", "metric"]).to_string(),
            })
        })
        .collect()
}

fn variants(items: &[String]) -> Vec<ContentVariant> {
    items
        .iter()
        .filter_map(|item| {
            let fields: Vec<&str> = strip_bullet(item).split('|').map(str::trim).collect();
            let (channel, rest) = match fields.split_first() {
                Some((first, rest)) => match parse_channel(first) {
                    Some(channel) => (channel, rest),
                    None => (Channel::Mixed, fields.as_slice()),
                },
                None => return None,
            };
            let [opener, body @ ..] = rest else {
                return None;
            };
            if body.is_empty() {
                debug!(line = %item, "skipping variant without a body");
                return None;
            }
            Some(ContentVariant {
                channel,
                subject_or_opener: strip_label(
                    opener,
                    &["subject/opener", "subject line", "subject", "opener"],
                )
                .to_string(),
                body: strip_label(&body.join(" | "), &["body", "message body", "message"])
                    .replace("\\n", "\n"),
            })
        })
        .collect()
}

fn parse_channel(field: &str) -> Option<Channel> {
    strip_label(field, &["channel"]).parse().ok()
}

/// Remove a leading list marker (`- `, `* `, `• `, `+ `, `1. `, `1) `).
fn strip_bullet(line: &str) -> &str {
    let line = line.trim();
    for marker in ["- ", "* ", "• ", "+ "] {
        if let Some(rest) = line.strip_prefix(marker) {
            return rest.trim_start();
        }
    }
    split_ordinal(line).map_or(line, |(_, rest)| rest)
}

/// `"3. text"` or `"3) text"` as `(3, "text")`.
fn split_ordinal(line: &str) -> Option<(usize, &str)> {
    let line = line.trim();
    let digits = line.find(|c: char| !c.is_ascii_digit())?;
    if digits == 0 {
        return None;
    }
    let after = &line[digits..];
    let rest = after.strip_prefix('.').or_else(|| after.strip_prefix(')'))?;
    if !rest.starts_with(char::is_whitespace) {
        return None;
    }
    let ordinal = line[..digits].parse().ok()?;
    Some((ordinal, rest.trim_start()))
}

/// Drop a `Label:` prefix the model sometimes echoes back from the format
/// description. Labels match case-insensitively.
fn strip_label<'a>(field: &'a str, labels: &[&str]) -> &'a str {
    let field = field.trim();
    labels
        .iter()
        .find_map(|label| {
            let head = field.get(..label.len())?;
            if !head.eq_ignore_ascii_case(label) {
                return None;
            }
            field[label.len()..].trim_start().strip_prefix(':')
        })
        .map_or(field, str::trim)
}

fn clean_name(name: &str) -> &str {
    name.trim_matches(|c: char| matches!(c, '*' | '_' | '"' | '`') || c.is_whitespace())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_analysis() {
        let raw = "\
Here is my analysis.

WINNING_PATTERNS:
- Short subject lines
* Personalised openers
1. Sending on Tuesdays

LOSING_PATTERNS:
• Long bodies

RECOMMENDATIONS:
+ Cut the body to 80 words
2) Add a clear call to action
";
        let result = parse(AnalysisMode::FullAnalysis, raw);
        assert_eq!(result.source, ResultSource::Live);
        let Insights::FullAnalysis(analysis) = result.insights else {
            panic!("wrong mode");
        };
        assert_eq!(
            analysis.winning_patterns,
            vec!["Short subject lines", "Personalised openers", "Sending on Tuesdays"]
        );
        assert_eq!(analysis.losing_patterns, vec!["Long bodies"]);
        assert_eq!(
            analysis.recommendations,
            vec!["Cut the body to 80 words", "Add a clear call to action"]
        );
    }

    #[test]
    fn test_missing_header_yields_empty_list() {
        let raw = "WINNING_PATTERNS:\n- Short subject lines\nRECOMMENDATIONS:\n- Test more\n";
        let Insights::FullAnalysis(analysis) = parse(AnalysisMode::FullAnalysis, raw).insights else {
            panic!("wrong mode");
        };
        assert_eq!(analysis.winning_patterns.len(), 1);
        assert!(analysis.losing_patterns.is_empty());
        assert_eq!(analysis.recommendations, vec!["Test more"]);
    }

    #[test]
    fn test_unstructured_response_is_empty_not_error() {
        for mode in AnalysisMode::ALL {
            let result = parse(mode, "Sorry, I cannot help with that.");
            assert_eq!(result.mode(), mode);
            assert!(result.insights.is_empty());
        }
        assert!(parse(AnalysisMode::Comparison, "").insights.is_empty());
    }

    #[test]
    fn test_decorated_headers_code_fences_and_inline_items() {
        let raw = "\
```
## winning_patterns:
- Clear value proposition
**LOSING_PATTERNS:** Generic openers
---
```
";
        let Insights::FullAnalysis(analysis) = parse(AnalysisMode::FullAnalysis, raw).insights else {
            panic!("wrong mode");
        };
        assert_eq!(analysis.winning_patterns, vec!["Clear value proposition"]);
        assert_eq!(analysis.losing_patterns, vec!["Generic openers"]);
    }

    #[test]
    fn test_repeated_header_appends() {
        let raw = "RECOMMENDATIONS:\n- one\nWINNING_PATTERNS:\n- w\nRECOMMENDATIONS:\n- two\n";
        let sections = extract_sections(raw);
        assert_eq!(sections[&Section::Recommendations], vec!["- one", "- two"]);
    }

    #[test]
    fn test_comparison() {
        let raw = "\
RANKING:
1. **Alpha** | Highest reply rate
2. Campaign: Beta | Justification: Solid opens but few replies
Gamma - no clicks at all
";
        let Insights::Comparison(comparison) = parse(AnalysisMode::Comparison, raw).insights else {
            panic!("wrong mode");
        };
        assert_eq!(
            comparison.ranking,
            vec![
                RankedEntry {
                    rank: 1,
                    campaign: "Alpha".into(),
                    justification: "Highest reply rate".into(),
                },
                RankedEntry {
                    rank: 2,
                    campaign: "Beta".into(),
                    justification: "Solid opens but few replies".into(),
                },
                RankedEntry {
                    rank: 3,
                    campaign: "Gamma".into(),
                    justification: "no clicks at all".into(),
                },
            ]
        );
    }

    #[test]
    fn test_comparison_ignores_other_sections() {
        let raw = "WINNING_PATTERNS:\n- something\n";
        assert!(parse(AnalysisMode::Comparison, raw).insights.is_empty());
    }

    #[test]
    fn test_ab_suggestions() {
        let raw = "\
AB_SUGGESTIONS:
- Question subjects lift opens | Variant A: \"Quick question\" | Variant B: \"Idea for {{company}}\" | Metric to watch: open rate
- Shorter bodies get replies | 150 words | 60 words
- This line is just commentary
";
        let Insights::AbSuggestions(ab) = parse(AnalysisMode::AbSuggestions, raw).insights else {
            panic!("wrong mode");
        };
        assert_eq!(ab.suggestions.len(), 2);
        assert_eq!(
            ab.suggestions[0],
            AbTestSuggestion {
                hypothesis: "Question subjects lift opens".into(),
                variant_a: "\"Quick question\"".into(),
                variant_b: "\"Idea for {{company}}\"".into(),
                metric_to_watch: "open rate".into(),
            }
        );
        assert_eq!(ab.suggestions[1].variant_b, "60 words");
        assert_eq!(ab.suggestions[1].metric_to_watch, "");
    }

    #[test]
    fn test_prose_line_inside_section_is_not_a_header() {
        let raw = "\
AB_SUGGESTIONS:
Variants: the two tests below isolate one change each
- Shorter subject | long | short | open rate
";
        let Insights::AbSuggestions(ab) = parse(AnalysisMode::AbSuggestions, raw).insights else {
            panic!("wrong mode");
        };
        assert_eq!(
            ab.suggestions,
            vec![AbTestSuggestion {
                hypothesis: "Shorter subject".into(),
                variant_a: "long".into(),
                variant_b: "short".into(),
                metric_to_watch: "open rate".into(),
            }]
        );
    }

    #[test]
    fn test_variants() {
        let raw = "\
VARIANTS:
- email | Subject: Quick question, {{firstName}} | Hi {{firstName}},\\nSaw your post.
- LinkedIn | Loved your talk | Would you be open to connect?
- One idea | with | pipes inside
- only a subject line
";
        let Insights::VariantGeneration(set) = parse(AnalysisMode::VariantGeneration, raw).insights
        else {
            panic!("wrong mode");
        };
        assert_eq!(set.variants.len(), 3);
        assert_eq!(set.variants[0].channel, Channel::Email);
        assert_eq!(set.variants[0].subject_or_opener, "Quick question, {{firstName}}");
        assert_eq!(set.variants[0].body, "Hi {{firstName}},\nSaw your post.");
        assert_eq!(set.variants[1].channel, Channel::Linkedin);
        assert_eq!(set.variants[2].channel, Channel::Mixed);
        assert_eq!(set.variants[2].subject_or_opener, "One idea");
        assert_eq!(set.variants[2].body, "with | pipes inside");
    }

    #[test]
    fn test_strip_bullet_keeps_numbers_that_are_not_ordinals() {
        assert_eq!(strip_bullet("3.5% reply rate is strong"), "3.5% reply rate is strong");
        assert_eq!(strip_bullet("10) Ten"), "Ten");
        assert_eq!(strip_bullet("-no space"), "-no space");
    }

    #[test]
    fn test_strip_label() {
        assert_eq!(strip_label("Metric to watch: reply rate", &["metric to watch"]), "reply rate");
        assert_eq!(strip_label("metric : opens", &["metric"]), "opens");
        assert_eq!(strip_label("Metrics matter", &["metric"]), "Metrics matter");
    }
}
