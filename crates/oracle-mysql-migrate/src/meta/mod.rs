//! Durable sync-metadata tracking.
//!
//! Three tables track the lifecycle of every synchronized table:
//!
//! - `wait_sync_meta` — one row per (schema, table, sync mode). A pristine
//!   table carries the `(-1, -1)` sentinel; after chunk planning
//!   `full_global_scn` holds the snapshot SCN and `full_split_times` the
//!   number of outstanding chunks. Zero outstanding chunks means the full
//!   sync is complete and the table may cut over to increment mode.
//! - `full_sync_meta` — one row per ROWID chunk, deleted as each chunk is
//!   copied. The row count always equals `full_split_times`.
//! - `increment_sync_meta` — one row per table, created after full sync with
//!   the snapshot SCN as the starting anchor.
//!
//! The [`MetaStore`] trait decouples the planner from the storage backend:
//! [`MysqlMetaStore`] persists into the target database, [`MemoryMetaStore`]
//! backs tests and dry runs. Keys are compared case-insensitively and stored
//! uppercased, matching Oracle's unquoted-identifier convention.

pub mod memory;
pub mod mysql;
pub mod resume;

pub use memory::MemoryMetaStore;
pub use mysql::MysqlMetaStore;
pub use resume::{
    increment_ready_tables, inconsistent_tables, judge_tables, unfinished_tables, TableJudgement,
    TableSyncState,
};

use async_trait::async_trait;

use crate::config::SyncMode;
use crate::error::Result;

/// SCN / split-times sentinel marking a table that has not been planned yet.
pub const UNINITIALIZED: i64 = -1;

/// Per-table lifecycle row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WaitSyncMeta {
    pub source_schema_name: String,
    pub source_table_name: String,
    pub sync_mode: SyncMode,
    pub full_global_scn: i64,
    pub full_split_times: i64,
    pub is_partition: bool,
}

impl WaitSyncMeta {
    /// A freshly registered table, not yet chunk-planned.
    pub fn pristine(schema: &str, table: &str, sync_mode: SyncMode) -> Self {
        Self {
            source_schema_name: schema.to_uppercase(),
            source_table_name: table.to_uppercase(),
            sync_mode,
            full_global_scn: UNINITIALIZED,
            full_split_times: UNINITIALIZED,
            is_partition: false,
        }
    }
}

/// One ROWID chunk of a table's full sync.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FullSyncMeta {
    pub source_schema_name: String,
    pub source_table_name: String,
    /// Row-selection predicate: a full-table scan or a ROWID BETWEEN range.
    pub rowid_sql: String,
    pub global_scn: i64,
    pub is_partition: bool,
}

/// Increment-sync anchor for one table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncrementSyncMeta {
    pub source_schema_name: String,
    pub source_table_name: String,
    pub global_scn: i64,
    pub source_table_scn: i64,
    pub is_partition: bool,
}

/// Full-table scan predicate used for zero-row tables.
pub fn full_table_scan_sql(schema: &str, table: &str) -> String {
    format!("SELECT * FROM {}.{}", schema, table)
}

/// ROWID-bounded scan predicate for one chunk.
pub fn rowid_scan_sql(schema: &str, table: &str, start_rowid: &str, end_rowid: &str) -> String {
    format!(
        "SELECT * FROM {}.{} WHERE ROWID BETWEEN '{}' AND '{}'",
        schema, table, start_rowid, end_rowid
    )
}

/// A table whose statistics report zero rows still gets exactly one
/// full-table chunk, so the split count floor is one.
pub(crate) fn normalize_split_times(split_times: i64) -> i64 {
    if split_times == 0 {
        1
    } else {
        split_times
    }
}

/// Persistence contract for the sync-metadata tables.
///
/// Implementations must be `Send + Sync`; the chunk planner runs for several
/// tables concurrently and shares one store. [`delete_chunk`] must be atomic:
/// the chunk row removal and the counter decrement happen in one transaction
/// or not at all.
///
/// [`delete_chunk`]: MetaStore::delete_chunk
#[async_trait]
pub trait MetaStore: Send + Sync {
    /// Create the metadata schema and tables. Idempotent.
    async fn init_schema(&self) -> Result<()>;

    /// Register tables with the `(-1, -1)` sentinel.
    async fn init_wait(&self, schema: &str, tables: &[String], sync_mode: SyncMode) -> Result<()>;

    /// Fetch one table's lifecycle row.
    async fn wait_meta(
        &self,
        schema: &str,
        table: &str,
        sync_mode: SyncMode,
    ) -> Result<Option<WaitSyncMeta>>;

    /// Record the planning outcome for a table. A `split_times` of zero is
    /// normalized to one (the synthetic full-table chunk).
    async fn update_wait(
        &self,
        schema: &str,
        table: &str,
        split_times: i64,
        global_scn: i64,
        is_partition: bool,
        sync_mode: SyncMode,
    ) -> Result<()>;

    /// Bulk-insert chunk rows, at most `batch_size` rows per statement.
    async fn create_full_chunks(&self, chunks: Vec<FullSyncMeta>, batch_size: usize) -> Result<()>;

    /// Remove one completed chunk and decrement the table's outstanding
    /// split count, atomically.
    async fn delete_chunk(
        &self,
        schema: &str,
        table: &str,
        rowid_sql: &str,
        sync_mode: SyncMode,
    ) -> Result<()>;

    /// Number of chunk rows currently recorded for a table.
    async fn chunk_count(&self, schema: &str, table: &str) -> Result<i64>;

    /// The pending row-selection predicates for a table.
    async fn chunk_predicates(&self, schema: &str, table: &str) -> Result<Vec<String>>;

    /// Tables still carrying the pristine sentinel.
    async fn waiting_tables(&self, schema: &str, sync_mode: SyncMode) -> Result<Vec<WaitSyncMeta>>;

    /// Tables planned but with outstanding chunks.
    async fn pending_tables(&self, schema: &str, sync_mode: SyncMode) -> Result<Vec<WaitSyncMeta>>;

    /// Tables whose full sync has completed.
    async fn finished_tables(&self, schema: &str, sync_mode: SyncMode)
        -> Result<Vec<WaitSyncMeta>>;

    /// Create the increment anchor with both SCN fields at the full-sync
    /// snapshot SCN.
    async fn init_increment(
        &self,
        schema: &str,
        table: &str,
        global_scn: i64,
        is_partition: bool,
    ) -> Result<()>;

    /// Number of increment anchor rows for a table (expected 0 or 1).
    async fn increment_count(&self, schema: &str, table: &str) -> Result<i64>;

    /// Administrative reset: drop every chunk row.
    async fn truncate_full(&self) -> Result<()>;

    /// Administrative reset: drop one table's lifecycle row.
    async fn delete_wait(&self, schema: &str, table: &str, sync_mode: SyncMode) -> Result<()>;

    /// Backend name for logging.
    fn backend_type(&self) -> &'static str;
}
