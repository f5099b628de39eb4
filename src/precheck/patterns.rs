use regex::{Regex, RegexBuilder};

use crate::error::PrecheckError;

// Optional markdown heading marker, numbering token and bullet, in that order.
const HEADING_PREFIX: &str = r"^\s*(?:#{1,6}\s*)?(?:\d+[\).]\s*)?(?:[-*]\s*)?";
const LOOSE_TOKEN_LIMIT: usize = 2;

#[derive(Debug, Clone)]
pub struct CompiledPattern {
    pub label: String,
    pub strong: Regex,
    pub loose: Regex,
    pub loose_tokens: Vec<String>,
}

pub fn compile_requirement(label: &str) -> Result<CompiledPattern, PrecheckError> {
    let strong_source = strong_pattern_source(label);
    let strong = RegexBuilder::new(&strong_source)
        .case_insensitive(true)
        .multi_line(true)
        .build()
        .map_err(|err| {
            PrecheckError::Processing(format!(
                "failed to compile heading pattern for requirement '{label}': {err}"
            ))
        })?;

    let loose_tokens = loose_tokens(label);
    let loose_source = loose_tokens
        .iter()
        .map(|token| regex::escape(&token.to_lowercase()))
        .collect::<Vec<String>>()
        .join("|");
    let loose = RegexBuilder::new(&loose_source)
        .case_insensitive(true)
        .build()
        .map_err(|err| {
            PrecheckError::Processing(format!(
                "failed to compile keyword pattern for requirement '{label}': {err}"
            ))
        })?;

    Ok(CompiledPattern {
        label: label.to_string(),
        strong,
        loose,
        loose_tokens,
    })
}

pub fn compile_requirements(labels: &[String]) -> Result<Vec<CompiledPattern>, PrecheckError> {
    labels
        .iter()
        .map(|label| compile_requirement(label))
        .collect()
}

pub(crate) fn strong_pattern_source(label: &str) -> String {
    let core = label
        .trim()
        .to_lowercase()
        .chars()
        .filter(|character| {
            character.is_ascii_lowercase() || character.is_ascii_digit() || character.is_whitespace()
        })
        .collect::<String>();

    let words = core
        .split_whitespace()
        .map(regex::escape)
        .collect::<Vec<String>>();
    if words.is_empty() {
        return regex::escape(&core);
    }

    format!(r"{HEADING_PREFIX}{}\b[:\-]?", words.join(r"\s+"))
}

pub(crate) fn loose_tokens(label: &str) -> Vec<String> {
    let mut tokens = label
        .split_whitespace()
        .filter(|token| token.chars().count() > 2)
        .take(LOOSE_TOKEN_LIMIT)
        .map(ToOwned::to_owned)
        .collect::<Vec<String>>();

    if tokens.is_empty() {
        tokens.push(label.to_string());
    }
    tokens
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strong_pattern_tolerates_heading_prefixes_and_spacing() {
        let pattern = compile_requirement("Executive summary").expect("pattern should compile");

        for heading in [
            "Executive Summary",
            "# Executive Summary",
            "### executive   summary:",
            "2) Executive Summary",
            "3. - Executive summary -",
            "  * EXECUTIVE SUMMARY",
        ] {
            assert!(pattern.strong.is_match(heading), "expected match for {heading:?}");
        }
    }

    #[test]
    fn strong_pattern_is_line_anchored() {
        let pattern = compile_requirement("Success metrics").expect("pattern should compile");
        assert!(!pattern.strong.is_match("We track success metrics weekly."));
        assert!(pattern.strong.is_match("Intro line\nSuccess metrics\nbody"));
    }

    #[test]
    fn strong_pattern_strips_punctuation_from_label() {
        assert_eq!(
            strong_pattern_source("Risk & Assessment!"),
            format!(r"{HEADING_PREFIX}risk\s+assessment\b[:\-]?")
        );
    }

    #[test]
    fn degenerate_label_falls_back_to_normalized_core() {
        assert_eq!(strong_pattern_source("!!!"), "");
    }

    #[test]
    fn loose_tokens_keep_first_two_significant_words() {
        assert_eq!(
            loose_tokens("Target audience analysis"),
            vec!["Target".to_string(), "audience".to_string()]
        );
        assert_eq!(loose_tokens("Go to market"), vec!["market".to_string()]);
        assert_eq!(loose_tokens("QA"), vec!["QA".to_string()]);
    }

    #[test]
    fn loose_pattern_matches_any_token_case_insensitively() {
        let pattern = compile_requirement("Budget justification").expect("pattern should compile");
        assert!(pattern.loose.is_match("the BUDGET is fixed"));
        assert!(pattern.loose.is_match("needs more Justification"));
        assert!(!pattern.loose.is_match("no relevant words here"));
    }
}
