use serde::{Deserialize, Serialize};

pub const DEFAULT_REQUIREMENTS: [&str; 5] = [
    "Executive summary",
    "Budget justification",
    "Target audience analysis",
    "Success metrics",
    "Legal compliance review",
];

#[derive(Debug, Clone)]
pub struct Document {
    pub task_id: String,
    pub content: String,
    pub requirements: Option<Vec<String>>,
}

impl Document {
    pub fn custom_requirements(&self) -> Option<&[String]> {
        self.requirements
            .as_deref()
            .filter(|requirements| !requirements.is_empty())
    }

    pub fn active_requirements(&self) -> Vec<String> {
        match self.custom_requirements() {
            Some(requirements) => requirements.to_vec(),
            None => DEFAULT_REQUIREMENTS
                .iter()
                .map(|label| (*label).to_string())
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionMatch {
    pub label: String,
    pub strong_heading_matched: bool,
    pub chars_after: usize,
    pub threshold_used: usize,
    pub passed: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QualitativeResult {
    #[serde(default)]
    pub missing_sections: Vec<String>,
    #[serde(default)]
    pub flagged_phrases: Vec<String>,
    #[serde(default)]
    pub suggestions: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrecheckDebug {
    pub content_length: usize,
    pub sections: Vec<SectionMatch>,
    pub active_requirements: Vec<String>,
    pub used_dynamic_requirements: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrecheckResult {
    pub task_id: String,
    pub missing_sections: Vec<String>,
    pub flagged_phrases: Vec<String>,
    pub suggestions: Vec<String>,
    pub pre_score: f64,
    pub checked_at: String,
    pub passed_checks: Vec<String>,
    pub failed_checks: Vec<String>,
    pub debug: PrecheckDebug,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchItem {
    #[serde(default)]
    pub id: Option<serde_json::Value>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchRequest {
    #[serde(default)]
    pub query: Option<String>,
    #[serde(default)]
    pub items: Vec<SearchItem>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchHit {
    pub task_id: Option<serde_json::Value>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub match_type: &'static str,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexStatus {
    pub db_path: String,
    pub schema_present: bool,
    pub stored_embeddings: i64,
    pub registered_models: Vec<String>,
    pub last_generated_at: Option<String>,
    pub checked_at: String,
}
