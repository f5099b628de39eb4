use anyhow::{Context, Result};
use tracing::info;

use crate::cli::SearchArgs;
use crate::model::{SearchHit, SearchRequest};
use crate::util::{read_text_input, write_json_stdout};

const MATCH_TYPE_TITLE_DESCRIPTION: &str = "title_description";

pub fn run(args: SearchArgs) -> Result<()> {
    let raw = read_text_input(&args.request)?;
    let request: SearchRequest = serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse search request {}", args.request.display()))?;

    let hits = keyword_search(&request);
    info!(
        items = request.items.len(),
        hits = hits.len(),
        "keyword search completed"
    );

    write_json_stdout(&hits)
}

pub fn keyword_search(request: &SearchRequest) -> Vec<SearchHit> {
    let query = request
        .query
        .as_deref()
        .unwrap_or_default()
        .trim()
        .to_lowercase();
    if query.is_empty() || request.items.is_empty() {
        return Vec::new();
    }

    request
        .items
        .iter()
        .filter(|item| {
            let title = item.title.as_deref().unwrap_or_default().to_lowercase();
            let description = item.description.as_deref().unwrap_or_default().to_lowercase();
            title.contains(&query) || description.contains(&query)
        })
        .map(|item| SearchHit {
            task_id: item.id.clone(),
            title: item.title.clone(),
            description: item.description.clone(),
            match_type: MATCH_TYPE_TITLE_DESCRIPTION,
        })
        .collect()
}
