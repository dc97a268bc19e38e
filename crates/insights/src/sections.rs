//! Section-header vocabulary shared by the prompt builder and the response
//! parser.
//!
//! The tokens are a wire contract with every prompt already sent: renaming
//! one requires bumping [`VOCABULARY_VERSION`].

use crate::types::AnalysisMode;

pub const VOCABULARY_VERSION: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Section {
    WinningPatterns,
    LosingPatterns,
    Recommendations,
    Ranking,
    AbSuggestions,
    Variants,
}

impl Section {
    pub const ALL: [Section; 6] = [
        Section::WinningPatterns,
        Section::LosingPatterns,
        Section::Recommendations,
        Section::Ranking,
        Section::AbSuggestions,
        Section::Variants,
    ];

    pub fn token(self) -> &'static str {
        match self {
            Section::WinningPatterns => "WINNING_PATTERNS",
            Section::LosingPatterns => "LOSING_PATTERNS",
            Section::Recommendations => "RECOMMENDATIONS",
            Section::Ranking => "RANKING",
            Section::AbSuggestions => "AB_SUGGESTIONS",
            Section::Variants => "VARIANTS",
        }
    }

    /// Header line as the model is asked to write it.
    pub fn header(self) -> String {
        format!("{}:", self.token())
    }

    /// Sections a response for `mode` is expected to contain.
    pub fn for_mode(mode: AnalysisMode) -> &'static [Section] {
        match mode {
            AnalysisMode::FullAnalysis => &[
                Section::WinningPatterns,
                Section::LosingPatterns,
                Section::Recommendations,
            ],
            AnalysisMode::Comparison => &[Section::Ranking],
            AnalysisMode::AbSuggestions => &[Section::AbSuggestions],
            AnalysisMode::VariantGeneration => &[Section::Variants],
        }
    }

    /// Recognize a header line. Returns the section and whatever text
    /// follows the colon on the same line.
    ///
    /// A line wearing markdown decoration (`## `, `> `, `**...**`) may spell
    /// the token in any case. A bare line must spell it exactly, so prose
    /// such as `Variants: two tests below` stays inside its section.
    pub fn match_header(line: &str) -> Option<(Section, &str)> {
        let line = line.trim();
        let unquoted = line.trim_start_matches(['#', '>', ' ', '\t']);
        let body = unquoted.trim_start_matches(['*', '_']);
        let emphasis = &unquoted[..unquoted.len() - body.len()];
        let body = body.trim_start();
        let decorated = body.len() != line.len();

        Section::ALL.into_iter().find_map(|section| {
            let token = section.token();
            let head = body.get(..token.len())?;
            let matches = if decorated {
                head.eq_ignore_ascii_case(token)
            } else {
                head == token
            };
            if !matches {
                return None;
            }
            let rest = &body[token.len()..];
            let rest = rest.strip_prefix(emphasis).unwrap_or(rest).trim_start();
            if rest.is_empty() {
                return Some((section, ""));
            }
            let inline = rest.strip_prefix(':')?;
            let inline = match inline.strip_prefix(emphasis) {
                Some(after_close) if !emphasis.is_empty() => after_close.trim(),
                _ => {
                    let inline = inline.trim();
                    inline.strip_suffix(emphasis).unwrap_or(inline).trim_end()
                }
            };
            Some((section, inline))
        })
    }
}
