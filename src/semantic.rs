use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

pub const LOCAL_MODEL_ID: &str = "hash-384-local-v1";
pub const LOCAL_EMBEDDING_DIM: usize = 384;
pub const LOCAL_BACKEND: &str = "local-hash-v1";
pub const OLLAMA_BACKEND: &str = "ollama";
pub const DEFAULT_OLLAMA_EMBEDDING_MODEL: &str = "llama2";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbeddingSource {
    LocalHash,
    Ollama,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingModelConfig {
    pub model_id: String,
    pub model_name: String,
    pub dimensions: Option<usize>,
    pub backend: String,
}

pub fn resolve_model_config(
    source: EmbeddingSource,
    model_name: Option<&str>,
) -> EmbeddingModelConfig {
    let requested = model_name.map(str::trim).filter(|value| !value.is_empty());

    match source {
        EmbeddingSource::LocalHash => EmbeddingModelConfig {
            model_id: LOCAL_MODEL_ID.to_string(),
            model_name: requested.unwrap_or(LOCAL_MODEL_ID).to_string(),
            dimensions: Some(LOCAL_EMBEDDING_DIM),
            backend: LOCAL_BACKEND.to_string(),
        },
        EmbeddingSource::Ollama => {
            let name = requested.unwrap_or(DEFAULT_OLLAMA_EMBEDDING_MODEL);
            EmbeddingModelConfig {
                model_id: format!("ollama:{name}"),
                model_name: name.to_string(),
                dimensions: None,
                backend: OLLAMA_BACKEND.to_string(),
            }
        }
    }
}

pub fn normalize_whitespace(input: &str) -> String {
    input.split_whitespace().collect::<Vec<&str>>().join(" ")
}

pub fn embedding_text_hash(payload: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(payload.as_bytes());
    format!("{:x}", hasher.finalize())
}

pub fn embed_text_local(payload: &str, dimensions: usize) -> Vec<f32> {
    let dims = dimensions.max(8);
    let mut vector = vec![0_f32; dims];
    let mut tokens = tokenize_payload(payload);

    if tokens.is_empty() {
        return vector;
    }

    for token in tokens.drain(..) {
        let hash = stable_hash(&token);
        let index = (hash as usize) % dims;
        let sign = if (hash >> 63) & 1 == 0 { 1.0 } else { -1.0 };
        let weight = 1.0 + (((hash >> 48) & 0xFF) as f32 / 255.0);
        vector[index] += sign * weight;
    }

    normalize_vector(&mut vector);
    vector
}

pub fn squared_l2_distance(left: &[f32], right: &[f32]) -> Option<f64> {
    if left.len() != right.len() || left.is_empty() {
        return None;
    }

    Some(
        left.iter()
            .zip(right.iter())
            .map(|(left_value, right_value)| {
                let delta = f64::from(*left_value) - f64::from(*right_value);
                delta * delta
            })
            .sum::<f64>(),
    )
}

pub fn encode_embedding_blob(values: &[f32]) -> Vec<u8> {
    let mut out = Vec::<u8>::with_capacity(values.len() * 4);
    for value in values {
        out.extend_from_slice(&value.to_le_bytes());
    }
    out
}

pub fn decode_embedding_blob(blob: &[u8], expected_dim: usize) -> Option<Vec<f32>> {
    if expected_dim == 0 || blob.len() != expected_dim.saturating_mul(4) {
        return None;
    }

    let out = blob
        .chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect::<Vec<f32>>();

    (out.len() == expected_dim).then_some(out)
}

// DefaultHasher::new() uses fixed keys, so vectors are stable across runs.
fn stable_hash(value: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

fn tokenize_payload(payload: &str) -> Vec<String> {
    let normalized = normalize_whitespace(payload);
    if normalized.is_empty() {
        return Vec::new();
    }

    let words = normalized
        .split(' ')
        .map(|value| {
            value
                .chars()
                .filter(|character| character.is_ascii_alphanumeric())
                .collect::<String>()
                .to_ascii_lowercase()
        })
        .filter(|value| !value.is_empty())
        .collect::<Vec<String>>();

    let mut features = Vec::<String>::with_capacity(words.len() * 2);
    for (index, word) in words.iter().enumerate() {
        features.push(format!("w:{word}"));
        if let Some(next) = words.get(index + 1) {
            features.push(format!("b:{word}_{next}"));
        }
    }
    features
}

fn normalize_vector(values: &mut [f32]) {
    let squared_norm = values
        .iter()
        .map(|value| f64::from(*value) * f64::from(*value))
        .sum::<f64>();

    if squared_norm <= 0.0 {
        return;
    }

    let norm = squared_norm.sqrt() as f32;
    if norm == 0.0 {
        return;
    }

    for value in values {
        *value /= norm;
    }
}
