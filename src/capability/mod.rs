use anyhow::Result;
use serde::Serialize;

mod ollama;

pub use ollama::{OllamaChat, OllamaEmbedder, OllamaSettings};

use crate::semantic::embed_text_local;

pub trait Embedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>>;
}

pub trait LanguageModel {
    fn complete(&self, prompt: &str) -> Result<String>;
}

#[derive(Debug, Clone, Serialize)]
pub struct EmbeddingMetadata {
    pub task_id: String,
    pub model_id: String,
    pub text_hash: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NeighborHit {
    pub key: String,
    pub distance: f64,
}

pub trait VectorIndex {
    fn upsert(&self, key: &str, vector: &[f32], metadata: &EmbeddingMetadata) -> Result<()>;
    fn list_keys(&self) -> Result<Vec<String>>;
    fn query_nearest(&self, vector: &[f32], k: usize) -> Result<Vec<NeighborHit>>;
}

pub struct LocalHashEmbedder {
    dimensions: usize,
}

impl LocalHashEmbedder {
    pub fn new(dimensions: usize) -> Self {
        Self { dimensions }
    }
}

impl Embedder for LocalHashEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(embed_text_local(text, self.dimensions))
    }
}

// An empty reply always routes the analyzer to the local heuristic.
pub struct OfflineModel;

impl LanguageModel for OfflineModel {
    fn complete(&self, _prompt: &str) -> Result<String> {
        Ok(String::new())
    }
}
