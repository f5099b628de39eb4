use std::collections::HashSet;

use tracing::info;

use super::patterns::compile_requirements;
use super::qualitative::analyze;
use super::sections::{SectionDetector, SectionReport};
use super::similarity::similarity_score;
use crate::capability::{Embedder, EmbeddingMetadata, LanguageModel, VectorIndex};
use crate::error::PrecheckError;
use crate::model::{Document, PrecheckDebug, PrecheckResult};
use crate::semantic::embedding_text_hash;
use crate::util::now_utc_precise_string;

pub const SIMILARITY_WEIGHT: f64 = 0.6;
pub const COVERAGE_WEIGHT: f64 = 0.4;
pub const MAX_SUGGESTIONS: usize = 3;

pub struct PrecheckContext<'a> {
    embedder: &'a dyn Embedder,
    index: &'a dyn VectorIndex,
    model: &'a dyn LanguageModel,
    embedding_model_id: String,
    detector: SectionDetector,
}

impl<'a> PrecheckContext<'a> {
    pub fn new(
        embedder: &'a dyn Embedder,
        index: &'a dyn VectorIndex,
        model: &'a dyn LanguageModel,
        embedding_model_id: impl Into<String>,
    ) -> Result<Self, PrecheckError> {
        Ok(Self {
            embedder,
            index,
            model,
            embedding_model_id: embedding_model_id.into(),
            detector: SectionDetector::new()?,
        })
    }
}

pub fn run_precheck(
    context: &PrecheckContext<'_>,
    document: &Document,
) -> Result<PrecheckResult, PrecheckError> {
    info!(
        task_id = %document.task_id,
        content_length = document.content.chars().count(),
        custom_requirements = document.custom_requirements().is_some(),
        "precheck started"
    );

    let similarity = score_document(context, document)?;
    let qualitative = analyze(
        context.model,
        &document.content,
        document.custom_requirements(),
    )?;

    let active_requirements = document.active_requirements();
    let patterns = compile_requirements(&active_requirements)?;
    let report = context.detector.detect(&document.content, &patterns);

    let used_dynamic_requirements = document.custom_requirements().is_some();
    let missing_sections = if used_dynamic_requirements {
        report.failed.clone()
    } else {
        merge_missing_sections(&qualitative.missing_sections, &report.failed)
    };

    let coverage = report.coverage();
    let pre_score = combine_scores(similarity, coverage);
    if !(0.0..=1.0).contains(&pre_score) {
        return Err(PrecheckError::Processing(format!(
            "pre-score {pre_score} out of range (similarity {similarity}, coverage {coverage})"
        )));
    }

    let SectionReport {
        sections,
        passed,
        failed,
    } = report;
    let mut suggestions = qualitative.suggestions;
    suggestions.truncate(MAX_SUGGESTIONS);

    info!(
        task_id = %document.task_id,
        similarity,
        coverage,
        pre_score,
        passed = passed.len(),
        failed = failed.len(),
        "precheck completed"
    );

    Ok(PrecheckResult {
        task_id: document.task_id.clone(),
        missing_sections,
        flagged_phrases: qualitative.flagged_phrases,
        suggestions,
        pre_score,
        checked_at: now_utc_precise_string(),
        passed_checks: passed,
        failed_checks: failed,
        debug: PrecheckDebug {
            content_length: document.content.chars().count(),
            sections,
            active_requirements,
            used_dynamic_requirements,
        },
    })
}

fn score_document(
    context: &PrecheckContext<'_>,
    document: &Document,
) -> Result<f64, PrecheckError> {
    if document.content.trim().is_empty() {
        return Ok(0.0);
    }

    let embedding = context
        .embedder
        .embed(&document.content)
        .map_err(|err| PrecheckError::capability("embedding", err))?;
    let metadata = EmbeddingMetadata {
        task_id: document.task_id.clone(),
        model_id: context.embedding_model_id.clone(),
        text_hash: embedding_text_hash(&document.content),
    };

    similarity_score(context.index, &document.task_id, &embedding, &metadata)
}

pub(crate) fn merge_missing_sections(model_missing: &[String], failed: &[String]) -> Vec<String> {
    let mut seen = HashSet::<&str>::new();
    model_missing
        .iter()
        .chain(failed.iter())
        .filter(|label| seen.insert(label.as_str()))
        .cloned()
        .collect()
}

pub(crate) fn combine_scores(similarity: f64, coverage: f64) -> f64 {
    round_to_places(SIMILARITY_WEIGHT * similarity + COVERAGE_WEIGHT * coverage, 4)
}

fn round_to_places(value: f64, places: i32) -> f64 {
    let factor = 10_f64.powi(places);
    (value * factor).round() / factor
}
