use anyhow::Result;
use tracing::{info, warn};

use crate::cli::StatusArgs;
use crate::commands::precheck::resolve_db_path;
use crate::model::IndexStatus;
use crate::store::SqliteVectorIndex;
use crate::util::{now_utc_string, write_json_stdout};

pub fn run(args: StatusArgs) -> Result<()> {
    let db_path = resolve_db_path(&args.index);
    info!(db_path = %db_path.display(), "status requested");

    let status = if db_path.exists() {
        collect_status(
            &SqliteVectorIndex::open_read_only(&db_path)?,
            db_path.display().to_string(),
        )?
    } else {
        warn!(path = %db_path.display(), "index database missing");
        IndexStatus {
            db_path: db_path.display().to_string(),
            schema_present: false,
            stored_embeddings: 0,
            registered_models: Vec::new(),
            last_generated_at: None,
            checked_at: now_utc_string(),
        }
    };

    if args.json {
        return write_json_stdout(&status);
    }

    info!(
        path = %status.db_path,
        schema_present = status.schema_present,
        embeddings = status.stored_embeddings,
        models = %status.registered_models.join(","),
        last_generated_at = %status.last_generated_at.clone().unwrap_or_default(),
        "index status"
    );
    Ok(())
}

fn collect_status(index: &SqliteVectorIndex, db_path: String) -> Result<IndexStatus> {
    if !index.schema_present()? {
        warn!(path = %db_path, "index schema missing; run a precheck to initialize it");
        return Ok(IndexStatus {
            db_path,
            schema_present: false,
            stored_embeddings: 0,
            registered_models: Vec::new(),
            last_generated_at: None,
            checked_at: now_utc_string(),
        });
    }

    Ok(IndexStatus {
        db_path,
        schema_present: true,
        stored_embeddings: index.embedding_count()?,
        registered_models: index.registered_models()?,
        last_generated_at: index.last_generated_at()?,
        checked_at: now_utc_string(),
    })
}
