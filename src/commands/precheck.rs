use std::io::{self, Write};
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use tracing::info;

use crate::capability::{
    Embedder, LanguageModel, LocalHashEmbedder, OfflineModel, OllamaChat, OllamaEmbedder,
    OllamaSettings,
};
use crate::cli::{EmbeddingBackend, IndexArgs, LlmBackend, PrecheckArgs};
use crate::model::{Document, PrecheckResult};
use crate::precheck::{PrecheckContext, build_document, document_from_request, run_precheck};
use crate::semantic::{EmbeddingSource, LOCAL_EMBEDDING_DIM, resolve_model_config};
use crate::store::{INDEX_DB_FILE, SqliteVectorIndex};
use crate::util::{ensure_directory, read_text_input, write_json_pretty, write_json_stdout};

pub fn run(args: PrecheckArgs) -> Result<()> {
    let document = load_document(&args)?;

    let model_config = resolve_model_config(
        embedding_source(args.embedding_backend),
        args.embedding_model.as_deref(),
    );
    let settings = OllamaSettings {
        base_url: args.ollama_url.clone(),
        timeout: Duration::from_millis(args.timeout_ms.max(1)),
        max_retries: args.max_retries,
    };

    let embedder: Box<dyn Embedder> = match args.embedding_backend {
        EmbeddingBackend::Local => Box::new(LocalHashEmbedder::new(
            model_config.dimensions.unwrap_or(LOCAL_EMBEDDING_DIM),
        )),
        EmbeddingBackend::Ollama => Box::new(OllamaEmbedder::new(
            &settings,
            model_config.model_name.clone(),
        )?),
    };
    let model: Box<dyn LanguageModel> = match args.llm_backend {
        LlmBackend::Ollama => Box::new(OllamaChat::new(
            &settings,
            args.llm_model.clone(),
            args.llm_temperature,
        )?),
        LlmBackend::Offline => Box::new(OfflineModel),
    };

    let db_path = resolve_db_path(&args.index);
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            ensure_directory(parent)?;
        }
    }
    let index = SqliteVectorIndex::open(&db_path)?;
    index.ensure_schema()?;
    index.ensure_model_entry(&model_config)?;

    info!(
        db_path = %db_path.display(),
        embedding_model = %model_config.model_id,
        llm_backend = args.llm_backend.as_str(),
        "precheck context initialized"
    );

    let context = PrecheckContext::new(
        embedder.as_ref(),
        &index,
        model.as_ref(),
        model_config.model_id.clone(),
    )?;
    let result = run_precheck(&context, &document)?;

    if let Some(output_path) = &args.output {
        write_json_pretty(output_path, &result)?;
        info!(path = %output_path.display(), "wrote precheck result");
    }

    if args.text {
        write_text_summary(&result)
    } else {
        write_json_stdout(&result)
    }
}

fn embedding_source(backend: EmbeddingBackend) -> EmbeddingSource {
    match backend {
        EmbeddingBackend::Local => EmbeddingSource::LocalHash,
        EmbeddingBackend::Ollama => EmbeddingSource::Ollama,
    }
}

pub fn resolve_db_path(index: &IndexArgs) -> PathBuf {
    index
        .db_path
        .clone()
        .unwrap_or_else(|| index.cache_root.join(INDEX_DB_FILE))
}

fn load_document(args: &PrecheckArgs) -> Result<Document> {
    if let Some(request_path) = &args.request {
        let raw = read_text_input(request_path)?;
        let body: serde_json::Value = serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse request {}", request_path.display()))?;
        return Ok(document_from_request(&body)?);
    }

    let Some(content_path) = &args.content_file else {
        bail!("either --request or --task-id with --content-file is required");
    };
    let content = read_text_input(content_path)?;
    let requirements = (!args.requirements.is_empty()).then(|| args.requirements.clone());

    Ok(build_document(
        args.task_id.as_deref().unwrap_or_default(),
        &content,
        requirements,
    )?)
}

fn write_text_summary(result: &PrecheckResult) -> Result<()> {
    let mut output = io::BufWriter::new(io::stdout().lock());

    writeln!(output, "Task: {}", result.task_id)?;
    writeln!(
        output,
        "Pre-score: {:.4} (checked at {})",
        result.pre_score, result.checked_at
    )?;
    writeln!(
        output,
        "Requirements: {} passed, {} failed (custom={})",
        result.passed_checks.len(),
        result.failed_checks.len(),
        result.debug.used_dynamic_requirements
    )?;

    for section in &result.debug.sections {
        writeln!(
            output,
            "\t{}\t{}\theading={} chars={} threshold={}",
            if section.passed { "PASS" } else { "FAIL" },
            section.label,
            section.strong_heading_matched,
            section.chars_after,
            section.threshold_used
        )?;
    }

    if !result.missing_sections.is_empty() {
        writeln!(output, "Missing: {}", result.missing_sections.join(", "))?;
    }
    if !result.flagged_phrases.is_empty() {
        writeln!(output, "Flagged: {}", result.flagged_phrases.join(", "))?;
    }
    for suggestion in &result.suggestions {
        writeln!(output, "- {suggestion}")?;
    }

    output.flush()?;
    Ok(())
}
