//! In-memory sync-metadata store.
//!
//! Backs unit tests and dry runs where no target database is available.
//! Mutations take one lock for the whole operation, so the delete +
//! decrement pair in [`delete_chunk`](super::MetaStore::delete_chunk) is
//! atomic here too.

use async_trait::async_trait;
use std::sync::Mutex;

use super::{
    normalize_split_times, FullSyncMeta, IncrementSyncMeta, MetaStore, WaitSyncMeta, UNINITIALIZED,
};
use crate::config::SyncMode;
use crate::error::{MigrateError, Result};

/// Mutex-guarded metadata rows.
#[derive(Debug, Default)]
pub struct MemoryMetaStore {
    inner: Mutex<MemoryState>,
}

#[derive(Debug, Default)]
struct MemoryState {
    wait: Vec<WaitSyncMeta>,
    full: Vec<FullSyncMeta>,
    increment: Vec<IncrementSyncMeta>,
}

impl MemoryMetaStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the increment anchors, for assertions.
    pub fn increment_rows(&self) -> Vec<IncrementSyncMeta> {
        self.inner.lock().unwrap().increment.clone()
    }

    /// Snapshot of the chunk rows, for assertions.
    pub fn full_rows(&self) -> Vec<FullSyncMeta> {
        self.inner.lock().unwrap().full.clone()
    }
}

#[async_trait]
impl MetaStore for MemoryMetaStore {
    async fn init_schema(&self) -> Result<()> {
        Ok(())
    }

    async fn init_wait(&self, schema: &str, tables: &[String], sync_mode: SyncMode) -> Result<()> {
        let mut state = self.inner.lock().unwrap();
        for table in tables {
            let duplicate = state.wait.iter().any(|m| {
                m.source_schema_name.eq_ignore_ascii_case(schema)
                    && m.source_table_name.eq_ignore_ascii_case(table)
                    && m.sync_mode == sync_mode
            });
            if duplicate {
                return Err(MigrateError::store(
                    format!("wait_sync_meta row already exists for {}.{}", schema, table),
                    "registering wait_sync_meta rows",
                ));
            }
            state.wait.push(WaitSyncMeta::pristine(schema, table, sync_mode));
        }
        Ok(())
    }

    async fn wait_meta(
        &self,
        schema: &str,
        table: &str,
        sync_mode: SyncMode,
    ) -> Result<Option<WaitSyncMeta>> {
        let state = self.inner.lock().unwrap();
        Ok(state
            .wait
            .iter()
            .find(|m| {
                m.source_schema_name.eq_ignore_ascii_case(schema)
                    && m.source_table_name.eq_ignore_ascii_case(table)
                    && m.sync_mode == sync_mode
            })
            .cloned())
    }

    async fn update_wait(
        &self,
        schema: &str,
        table: &str,
        split_times: i64,
        global_scn: i64,
        is_partition: bool,
        sync_mode: SyncMode,
    ) -> Result<()> {
        let mut state = self.inner.lock().unwrap();
        for meta in state.wait.iter_mut() {
            if meta.source_schema_name.eq_ignore_ascii_case(schema)
                && meta.source_table_name.eq_ignore_ascii_case(table)
                && meta.sync_mode == sync_mode
            {
                meta.full_global_scn = global_scn;
                meta.full_split_times = normalize_split_times(split_times);
                meta.is_partition = is_partition;
            }
        }
        Ok(())
    }

    async fn create_full_chunks(&self, chunks: Vec<FullSyncMeta>, _batch_size: usize) -> Result<()> {
        let mut state = self.inner.lock().unwrap();
        for chunk in chunks {
            state.full.push(FullSyncMeta {
                source_schema_name: chunk.source_schema_name.to_uppercase(),
                source_table_name: chunk.source_table_name.to_uppercase(),
                ..chunk
            });
        }
        Ok(())
    }

    async fn delete_chunk(
        &self,
        schema: &str,
        table: &str,
        rowid_sql: &str,
        sync_mode: SyncMode,
    ) -> Result<()> {
        let mut state = self.inner.lock().unwrap();

        let before = state.full.len();
        state.full.retain(|chunk| {
            !(chunk.source_schema_name.eq_ignore_ascii_case(schema)
                && chunk.source_table_name.eq_ignore_ascii_case(table)
                && chunk.rowid_sql.eq_ignore_ascii_case(rowid_sql))
        });
        if state.full.len() == before {
            return Err(MigrateError::store(
                format!("no chunk row matches {:?}", rowid_sql),
                "deleting chunk row",
            ));
        }

        for meta in state.wait.iter_mut() {
            if meta.source_schema_name.eq_ignore_ascii_case(schema)
                && meta.source_table_name.eq_ignore_ascii_case(table)
                && meta.sync_mode == sync_mode
            {
                meta.full_split_times -= 1;
            }
        }
        Ok(())
    }

    async fn chunk_count(&self, schema: &str, table: &str) -> Result<i64> {
        let state = self.inner.lock().unwrap();
        Ok(state
            .full
            .iter()
            .filter(|c| {
                c.source_schema_name.eq_ignore_ascii_case(schema)
                    && c.source_table_name.eq_ignore_ascii_case(table)
            })
            .count() as i64)
    }

    async fn chunk_predicates(&self, schema: &str, table: &str) -> Result<Vec<String>> {
        let state = self.inner.lock().unwrap();
        Ok(state
            .full
            .iter()
            .filter(|c| {
                c.source_schema_name.eq_ignore_ascii_case(schema)
                    && c.source_table_name.eq_ignore_ascii_case(table)
            })
            .map(|c| c.rowid_sql.clone())
            .collect())
    }

    async fn waiting_tables(&self, schema: &str, sync_mode: SyncMode) -> Result<Vec<WaitSyncMeta>> {
        let state = self.inner.lock().unwrap();
        Ok(state
            .wait
            .iter()
            .filter(|m| {
                m.source_schema_name.eq_ignore_ascii_case(schema)
                    && m.sync_mode == sync_mode
                    && m.full_global_scn == UNINITIALIZED
                    && m.full_split_times == UNINITIALIZED
            })
            .cloned()
            .collect())
    }

    async fn pending_tables(&self, schema: &str, sync_mode: SyncMode) -> Result<Vec<WaitSyncMeta>> {
        let state = self.inner.lock().unwrap();
        Ok(state
            .wait
            .iter()
            .filter(|m| {
                m.source_schema_name.eq_ignore_ascii_case(schema)
                    && m.sync_mode == sync_mode
                    && m.full_global_scn > UNINITIALIZED
                    && m.full_split_times > 0
            })
            .cloned()
            .collect())
    }

    async fn finished_tables(
        &self,
        schema: &str,
        sync_mode: SyncMode,
    ) -> Result<Vec<WaitSyncMeta>> {
        let state = self.inner.lock().unwrap();
        Ok(state
            .wait
            .iter()
            .filter(|m| {
                m.source_schema_name.eq_ignore_ascii_case(schema)
                    && m.sync_mode == sync_mode
                    && m.full_global_scn > UNINITIALIZED
                    && m.full_split_times == 0
            })
            .cloned()
            .collect())
    }

    async fn init_increment(
        &self,
        schema: &str,
        table: &str,
        global_scn: i64,
        is_partition: bool,
    ) -> Result<()> {
        let mut state = self.inner.lock().unwrap();
        state.increment.push(IncrementSyncMeta {
            source_schema_name: schema.to_uppercase(),
            source_table_name: table.to_uppercase(),
            global_scn,
            source_table_scn: global_scn,
            is_partition,
        });
        Ok(())
    }

    async fn increment_count(&self, schema: &str, table: &str) -> Result<i64> {
        let state = self.inner.lock().unwrap();
        Ok(state
            .increment
            .iter()
            .filter(|m| {
                m.source_schema_name.eq_ignore_ascii_case(schema)
                    && m.source_table_name.eq_ignore_ascii_case(table)
            })
            .count() as i64)
    }

    async fn truncate_full(&self) -> Result<()> {
        self.inner.lock().unwrap().full.clear();
        Ok(())
    }

    async fn delete_wait(&self, schema: &str, table: &str, sync_mode: SyncMode) -> Result<()> {
        let mut state = self.inner.lock().unwrap();
        state.wait.retain(|m| {
            !(m.source_schema_name.eq_ignore_ascii_case(schema)
                && m.source_table_name.eq_ignore_ascii_case(table)
                && m.sync_mode == sync_mode)
        });
        Ok(())
    }

    fn backend_type(&self) -> &'static str {
        "memory"
    }
}
