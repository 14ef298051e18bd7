//! ROWID chunk planning for one table.
//!
//! Splits a table into bounded ROWID ranges through Oracle's
//! DBMS_PARALLEL_EXECUTE facility and persists one FullSyncMeta row per
//! range. The server-side task is cluster state that survives crashes, so
//! the planner always drops a leftover populated task before creating its
//! own; restarting a crashed run can never fail on "task exists".

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::catalog::OracleCatalog;
use crate::config::SyncMode;
use crate::error::{MigrateError, Result};
use crate::meta::{full_table_scan_sql, rowid_scan_sql, FullSyncMeta, MetaStore};

/// Inputs for planning one table.
#[derive(Debug, Clone)]
pub struct ChunkRequest {
    pub schema: String,
    pub table: String,
    /// Distinguishes concurrent planners in the server-side task name.
    pub worker_id: usize,
    /// Snapshot SCN recorded on every chunk row.
    pub global_scn: i64,
    /// Rows per chunk handed to CREATE_CHUNKS_BY_ROWID.
    pub chunk_size: usize,
    /// Maximum chunk rows per metadata INSERT batch.
    pub insert_batch_size: usize,
    pub sync_mode: SyncMode,
}

impl ChunkRequest {
    /// Server-side task name: `<SCHEMA>_<TABLE>_TASK<worker-id>`.
    pub fn task_name(&self) -> String {
        format!(
            "{}_{}_TASK{}",
            self.schema.to_uppercase(),
            self.table.to_uppercase(),
            self.worker_id
        )
    }
}

/// Plan one table into ROWID chunks and persist the metadata rows.
///
/// Returns the number of chunk rows written (at least one). On
/// cancellation the planner exits without writing partial chunk metadata;
/// any half-created server-side task is cleaned up by the drop-before-create
/// path of the next run.
pub async fn split_table_into_chunks(
    catalog: &dyn OracleCatalog,
    store: &dyn MetaStore,
    request: &ChunkRequest,
    cancel: &CancellationToken,
) -> Result<i64> {
    let schema = request.schema.to_uppercase();
    let table = request.table.to_uppercase();

    if cancel.is_cancelled() {
        return Err(MigrateError::Cancelled);
    }

    let stats = catalog.table_statistics(&schema, &table).await?;

    // Statistics report no rows: skip chunking and scan the whole table.
    if stats.num_rows == 0 {
        let sql = full_table_scan_sql(&schema, &table);
        warn!(
            schema = %schema,
            table = %table,
            sql = %sql,
            statistics_rows = stats.num_rows,
            "zero statistics rows, falling back to a full-table scan chunk"
        );
        store
            .create_full_chunks(
                vec![FullSyncMeta {
                    source_schema_name: schema.clone(),
                    source_table_name: table.clone(),
                    rowid_sql: sql,
                    global_scn: request.global_scn,
                    is_partition: stats.is_partition,
                }],
                request.insert_batch_size,
            )
            .await?;
        store
            .update_wait(
                &schema,
                &table,
                0,
                request.global_scn,
                stats.is_partition,
                request.sync_mode,
            )
            .await?;
        return Ok(1);
    }

    info!(
        schema = %schema,
        table = %table,
        rows = stats.num_rows,
        "get oracle table statistics rows"
    );

    let task_name = request.task_name();

    // A crashed prior run may have left a populated task behind.
    if catalog.has_chunk_task(&task_name).await? {
        catalog.drop_chunk_task(&task_name).await?;
    }
    catalog.create_chunk_task(&task_name).await?;

    tokio::select! {
        _ = cancel.cancelled() => return Err(MigrateError::Cancelled),
        created = catalog.create_chunks_by_rowid(&task_name, &schema, &table, request.chunk_size) => created?,
    }

    let ranges = tokio::select! {
        _ = cancel.cancelled() => return Err(MigrateError::Cancelled),
        ranges = catalog.chunk_ranges(&task_name) => ranges?,
    };

    // CREATE_CHUNKS_BY_ROWID can come back empty (e.g. all blocks empty
    // below the high-water mark); treat it like the zero-row case.
    if ranges.is_empty() {
        let sql = full_table_scan_sql(&schema, &table);
        warn!(
            schema = %schema,
            table = %table,
            sql = %sql,
            rowid_ranges = 0usize,
            "no rowid chunks generated, falling back to a full-table scan chunk"
        );
        store
            .create_full_chunks(
                vec![FullSyncMeta {
                    source_schema_name: schema.clone(),
                    source_table_name: table.clone(),
                    rowid_sql: sql,
                    global_scn: request.global_scn,
                    is_partition: stats.is_partition,
                }],
                request.insert_batch_size,
            )
            .await?;
        store
            .update_wait(
                &schema,
                &table,
                0,
                request.global_scn,
                stats.is_partition,
                request.sync_mode,
            )
            .await?;
        catalog.drop_chunk_task(&task_name).await?;
        return Ok(1);
    }

    let chunk_count = ranges.len() as i64;
    let chunks: Vec<FullSyncMeta> = ranges
        .iter()
        .map(|range| FullSyncMeta {
            source_schema_name: schema.clone(),
            source_table_name: table.clone(),
            rowid_sql: rowid_scan_sql(&schema, &table, &range.start_rowid, &range.end_rowid),
            global_scn: request.global_scn,
            is_partition: stats.is_partition,
        })
        .collect();

    // Chunk rows land before the wait row flips out of its sentinel, so a
    // crash between the two is caught by the resume judge.
    store
        .create_full_chunks(chunks, request.insert_batch_size)
        .await?;
    store
        .update_wait(
            &schema,
            &table,
            chunk_count,
            request.global_scn,
            stats.is_partition,
            request.sync_mode,
        )
        .await?;

    catalog.drop_chunk_task(&task_name).await?;

    info!(
        schema = %schema,
        table = %table,
        chunks = chunk_count,
        task = %task_name,
        "table split into rowid chunks"
    );

    Ok(chunk_count)
}
