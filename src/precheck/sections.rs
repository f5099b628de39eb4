use regex::{Regex, RegexBuilder};
use tracing::debug;

use super::patterns::CompiledPattern;
use crate::error::PrecheckError;
use crate::model::SectionMatch;

pub const STRONG_HEADING_MIN_CHARS: usize = 8;
pub const LOOSE_MATCH_MIN_CHARS: usize = 20;
const SECTION_BODY_CAP_CHARS: usize = 1000;
const LOOSE_TAIL_CAP_CHARS: usize = 500;

// A markdown heading with text, or a short capitalized line followed by a blank line.
const HEADING_BARRIER: &str = r"^[ \t]*(?:#{1,6}[ \t]+\S[^\n]*|[A-Z][A-Za-z0-9 ]{2,}\n)$";

#[derive(Debug, Clone, Default)]
pub struct SectionReport {
    pub sections: Vec<SectionMatch>,
    pub passed: Vec<String>,
    pub failed: Vec<String>,
}

impl SectionReport {
    pub fn evaluated(&self) -> usize {
        self.passed.len() + self.failed.len()
    }

    pub fn coverage(&self) -> f64 {
        let evaluated = self.evaluated();
        if evaluated == 0 {
            return 0.5;
        }
        self.passed.len() as f64 / evaluated as f64
    }
}

pub struct SectionDetector {
    barrier: Regex,
}

impl SectionDetector {
    pub fn new() -> Result<Self, PrecheckError> {
        let barrier = RegexBuilder::new(HEADING_BARRIER)
            .multi_line(true)
            .build()
            .map_err(|err| {
                PrecheckError::Processing(format!("failed to compile heading barrier: {err}"))
            })?;
        Ok(Self { barrier })
    }

    pub fn detect(&self, content: &str, patterns: &[CompiledPattern]) -> SectionReport {
        let mut report = SectionReport::default();

        for pattern in patterns {
            let section = if content.trim().is_empty() {
                unmatched(&pattern.label)
            } else {
                self.evaluate(content, pattern)
            };

            debug!(
                label = %section.label,
                strong_heading = section.strong_heading_matched,
                chars_after = section.chars_after,
                threshold = section.threshold_used,
                passed = section.passed,
                "section evaluated"
            );

            if section.passed {
                report.passed.push(section.label.clone());
            } else {
                report.failed.push(section.label.clone());
            }
            report.sections.push(section);
        }

        report
    }

    fn evaluate(&self, content: &str, pattern: &CompiledPattern) -> SectionMatch {
        if let Some(heading) = pattern.strong.find(content) {
            let tail = &content[heading.end()..];
            let body = match self.barrier.find(tail) {
                Some(barrier) => &tail[..barrier.start()],
                None => take_chars(tail, SECTION_BODY_CAP_CHARS),
            };
            let chars_after = meaningful_chars(body);

            return SectionMatch {
                label: pattern.label.clone(),
                strong_heading_matched: true,
                chars_after,
                threshold_used: STRONG_HEADING_MIN_CHARS,
                passed: chars_after >= STRONG_HEADING_MIN_CHARS,
            };
        }

        debug!(
            label = %pattern.label,
            tokens = ?pattern.loose_tokens,
            "no heading found, trying keyword fallback"
        );
        let Some(keyword) = pattern.loose.find(content) else {
            return unmatched(&pattern.label);
        };

        let tail = take_chars(&content[keyword.end()..], LOOSE_TAIL_CAP_CHARS);
        let chars_after = meaningful_chars(tail);

        SectionMatch {
            label: pattern.label.clone(),
            strong_heading_matched: false,
            chars_after,
            threshold_used: LOOSE_MATCH_MIN_CHARS,
            passed: chars_after >= LOOSE_MATCH_MIN_CHARS,
        }
    }
}

fn unmatched(label: &str) -> SectionMatch {
    SectionMatch {
        label: label.to_string(),
        strong_heading_matched: false,
        chars_after: 0,
        threshold_used: LOOSE_MATCH_MIN_CHARS,
        passed: false,
    }
}

fn take_chars(input: &str, limit: usize) -> &str {
    match input.char_indices().nth(limit) {
        Some((offset, _)) => &input[..offset],
        None => input,
    }
}

fn meaningful_chars(input: &str) -> usize {
    input
        .chars()
        .filter(|character| !character.is_whitespace())
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::precheck::patterns::compile_requirement;

    fn detect(content: &str, labels: &[&str]) -> SectionReport {
        let patterns = labels
            .iter()
            .map(|label| compile_requirement(label).expect("pattern should compile"))
            .collect::<Vec<CompiledPattern>>();
        SectionDetector::new()
            .expect("detector should build")
            .detect(content, &patterns)
    }

    #[test]
    fn strong_heading_with_short_body_passes_at_eight_chars() {
        let report = detect("## Success Metrics\nCTR +5% up", &["Success metrics"]);
        let section = &report.sections[0];
        assert!(section.strong_heading_matched);
        assert_eq!(section.chars_after, 8);
        assert_eq!(section.threshold_used, STRONG_HEADING_MIN_CHARS);
        assert!(section.passed);
    }

    #[test]
    fn strong_heading_body_stops_at_next_markdown_heading() {
        let content = "# Executive Summary\nShort.\n# Budget Justification\nA very long budget section that goes on.";
        let report = detect(content, &["Executive summary"]);
        let section = &report.sections[0];
        assert!(section.strong_heading_matched);
        assert_eq!(section.chars_after, "Short.".len());
        assert!(!section.passed);
    }

    #[test]
    fn strong_heading_body_stops_at_standalone_capitalized_line() {
        let content = "Executive Summary:\nTiny.\n\nBudget Notes\n\nLots of budget text follows here.";
        let report = detect(content, &["Executive summary"]);
        assert_eq!(report.sections[0].chars_after, 5);
        assert_eq!(report.failed, vec!["Executive summary".to_string()]);
    }

    #[test]
    fn strong_heading_body_is_capped_without_barrier() {
        let body = "x".repeat(1500);
        let content = format!("Success metrics\n{body}");
        let report = detect(&content, &["Success metrics"]);
        assert_eq!(report.sections[0].chars_after, SECTION_BODY_CAP_CHARS - 1);
    }

    #[test]
    fn loose_keyword_requires_twenty_meaningful_chars() {
        let passing = detect(
            "Our budget covers paid social, search ads and influencer fees.",
            &["Budget justification"],
        );
        let section = &passing.sections[0];
        assert!(!section.strong_heading_matched);
        assert_eq!(section.threshold_used, LOOSE_MATCH_MIN_CHARS);
        assert!(section.passed);

        let failing = detect("Tight budget.", &["Budget justification"]);
        assert!(!failing.sections[0].passed);
        assert_eq!(failing.sections[0].chars_after, 1);
    }

    #[test]
    fn loose_keyword_tail_is_capped() {
        let content = format!("budget{}", "x".repeat(600));
        let report = detect(&content, &["Budget justification"]);
        let section = &report.sections[0];
        assert!(!section.strong_heading_matched);
        assert_eq!(section.chars_after, LOOSE_TAIL_CAP_CHARS);
        assert_eq!(section.threshold_used, LOOSE_MATCH_MIN_CHARS);
        assert!(section.passed);
    }

    #[test]
    fn missing_requirement_fails_with_zero_chars() {
        let report = detect("Nothing relevant here at all.", &["Legal compliance review"]);
        let section = &report.sections[0];
        assert!(!section.passed);
        assert_eq!(section.chars_after, 0);
        assert!(!section.strong_heading_matched);
    }

    #[test]
    fn empty_content_fails_every_requirement() {
        let report = detect("", &["Executive summary", "Budget justification"]);
        assert!(report.passed.is_empty());
        assert_eq!(report.failed.len(), 2);
        assert!(report.sections.iter().all(|section| {
            section.chars_after == 0 && !section.strong_heading_matched && !section.passed
        }));
    }

    #[test]
    fn duplicate_labels_are_evaluated_independently_in_order() {
        let report = detect(
            "# Success Metrics\nConversion rate above four percent.",
            &["Success metrics", "Legal compliance review", "Success metrics"],
        );
        assert_eq!(report.sections.len(), 3);
        assert_eq!(
            report.passed,
            vec!["Success metrics".to_string(), "Success metrics".to_string()]
        );
        assert_eq!(report.failed, vec!["Legal compliance review".to_string()]);
    }

    #[test]
    fn coverage_is_neutral_without_requirements() {
        let report = detect("anything", &[]);
        assert_eq!(report.coverage(), 0.5);

        let report = detect(
            "# Success Metrics\nConversion rate above four percent.",
            &["Success metrics", "Legal compliance review"],
        );
        assert_eq!(report.coverage(), 0.5);
    }

    #[test]
    fn detection_is_deterministic() {
        let content = "1. Executive Summary - growth plan for the next quarter\nBudget: $10k";
        let labels = ["Executive summary", "Budget justification"];
        assert_eq!(detect(content, &labels).sections, detect(content, &labels).sections);
    }
}
