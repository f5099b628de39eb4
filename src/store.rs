use std::path::Path;

use anyhow::{Context, Result};
use rusqlite::{Connection, OpenFlags, OptionalExtension, params};
use tracing::{debug, warn};

use crate::capability::{EmbeddingMetadata, NeighborHit, VectorIndex};
use crate::semantic::{
    EmbeddingModelConfig, decode_embedding_blob, encode_embedding_blob, squared_l2_distance,
};
use crate::util::now_utc_string;

pub const INDEX_DB_FILE: &str = "precheck_index.sqlite";

pub struct SqliteVectorIndex {
    connection: Connection,
}

impl SqliteVectorIndex {
    pub fn open(db_path: &Path) -> Result<Self> {
        let connection = Connection::open(db_path)
            .with_context(|| format!("failed to open index database: {}", db_path.display()))?;

        connection
            .pragma_update(None, "journal_mode", "WAL")
            .context("failed to set journal_mode=WAL for index")?;
        connection
            .pragma_update(None, "synchronous", "NORMAL")
            .context("failed to set synchronous=NORMAL for index")?;

        Ok(Self { connection })
    }

    pub fn open_read_only(db_path: &Path) -> Result<Self> {
        let connection = Connection::open_with_flags(
            db_path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .with_context(|| {
            format!("failed to open index database read-only: {}", db_path.display())
        })?;

        Ok(Self { connection })
    }

    #[cfg(test)]
    pub fn open_in_memory() -> Result<Self> {
        let connection =
            Connection::open_in_memory().context("failed to open in-memory index database")?;
        Ok(Self { connection })
    }

    pub fn ensure_schema(&self) -> Result<()> {
        self.connection
            .execute_batch(
                "
                CREATE TABLE IF NOT EXISTS embedding_models (
                  model_id TEXT PRIMARY KEY,
                  backend TEXT NOT NULL,
                  model_name TEXT NOT NULL,
                  dimensions INTEGER,
                  created_at TEXT NOT NULL,
                  config_json TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS task_embeddings (
                  task_id TEXT PRIMARY KEY,
                  model_id TEXT NOT NULL,
                  embedding BLOB NOT NULL,
                  embedding_dim INTEGER NOT NULL,
                  text_hash TEXT NOT NULL,
                  metadata_json TEXT NOT NULL,
                  generated_at TEXT NOT NULL
                );

                CREATE INDEX IF NOT EXISTS idx_task_embeddings_model ON task_embeddings(model_id);
                ",
            )
            .context("failed to create index schema")?;

        Ok(())
    }

    pub fn ensure_model_entry(&self, model: &EmbeddingModelConfig) -> Result<()> {
        let config_json = serde_json::to_string(model)
            .context("failed to serialize embedding model config")?;

        self.connection.execute(
            "
            INSERT INTO embedding_models(model_id, backend, model_name, dimensions, created_at, config_json)
            VALUES(?1, ?2, ?3, ?4, ?5, ?6)
            ON CONFLICT(model_id) DO UPDATE SET
              backend=excluded.backend,
              model_name=excluded.model_name,
              dimensions=excluded.dimensions,
              config_json=excluded.config_json
            ",
            params![
                model.model_id,
                model.backend,
                model.model_name,
                model.dimensions.map(|value| value as i64),
                now_utc_string(),
                config_json,
            ],
        )?;

        Ok(())
    }

    pub fn schema_present(&self) -> Result<bool> {
        let present = self
            .connection
            .query_row(
                "
                SELECT name
                FROM sqlite_master
                WHERE type = 'table' AND name = 'task_embeddings'
                LIMIT 1
                ",
                [],
                |row| row.get::<_, String>(0),
            )
            .optional()?
            .is_some();

        Ok(present)
    }

    pub fn embedding_count(&self) -> Result<i64> {
        let count = self
            .connection
            .query_row("SELECT COUNT(*) FROM task_embeddings", [], |row| row.get(0))?;
        Ok(count)
    }

    pub fn registered_models(&self) -> Result<Vec<String>> {
        let mut statement = self
            .connection
            .prepare("SELECT model_id FROM embedding_models ORDER BY model_id ASC")?;
        let models = statement
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(models)
    }

    pub fn last_generated_at(&self) -> Result<Option<String>> {
        let value = self
            .connection
            .query_row("SELECT MAX(generated_at) FROM task_embeddings", [], |row| {
                row.get::<_, Option<String>>(0)
            })?;
        Ok(value)
    }
}

impl VectorIndex for SqliteVectorIndex {
    fn upsert(&self, key: &str, vector: &[f32], metadata: &EmbeddingMetadata) -> Result<()> {
        let metadata_json =
            serde_json::to_string(metadata).context("failed to serialize embedding metadata")?;

        self.connection
            .execute(
                "
                INSERT INTO task_embeddings(task_id, model_id, embedding, embedding_dim, text_hash, metadata_json, generated_at)
                VALUES(?1, ?2, ?3, ?4, ?5, ?6, ?7)
                ON CONFLICT(task_id) DO UPDATE SET
                  model_id=excluded.model_id,
                  embedding=excluded.embedding,
                  embedding_dim=excluded.embedding_dim,
                  text_hash=excluded.text_hash,
                  metadata_json=excluded.metadata_json,
                  generated_at=excluded.generated_at
                ",
                params![
                    key,
                    metadata.model_id,
                    encode_embedding_blob(vector),
                    vector.len() as i64,
                    metadata.text_hash,
                    metadata_json,
                    now_utc_string(),
                ],
            )
            .with_context(|| format!("failed to upsert embedding for task {key}"))?;

        Ok(())
    }

    fn list_keys(&self) -> Result<Vec<String>> {
        let mut statement = self
            .connection
            .prepare("SELECT task_id FROM task_embeddings ORDER BY task_id ASC")?;
        let keys = statement
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(keys)
    }

    fn query_nearest(&self, vector: &[f32], k: usize) -> Result<Vec<NeighborHit>> {
        if k == 0 || vector.is_empty() {
            return Ok(Vec::new());
        }

        let mut statement = self.connection.prepare(
            "
            SELECT task_id, embedding, embedding_dim
            FROM task_embeddings
            ",
        )?;
        let mut rows = statement.query([])?;

        let mut hits = Vec::<NeighborHit>::new();
        let mut skipped_rows = 0usize;
        while let Some(row) = rows.next()? {
            let task_id = row.get::<_, String>(0)?;
            let row_dim = row.get::<_, i64>(2)? as usize;
            if row_dim != vector.len() {
                skipped_rows += 1;
                continue;
            }

            let blob = row.get::<_, Vec<u8>>(1)?;
            let Some(candidate) = decode_embedding_blob(&blob, row_dim) else {
                skipped_rows += 1;
                continue;
            };
            let Some(distance) = squared_l2_distance(vector, &candidate) else {
                continue;
            };

            hits.push(NeighborHit {
                key: task_id,
                distance,
            });
        }

        if skipped_rows > 0 {
            warn!(
                skipped_rows,
                query_dim = vector.len(),
                "skipped index rows with mismatched embedding dimension"
            );
        }

        hits.sort_by(|left, right| {
            left.distance
                .total_cmp(&right.distance)
                .then_with(|| left.key.cmp(&right.key))
        });
        hits.truncate(k);
        debug!(returned = hits.len(), k, "nearest-neighbor query completed");

        Ok(hits)
    }
}
