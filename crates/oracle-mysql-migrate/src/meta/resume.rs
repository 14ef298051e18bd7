//! Checkpoint reconciliation.
//!
//! Before a run starts, the configured table set is compared against the
//! sync-metadata store to decide, per table, whether planning must start
//! from scratch, can resume, or must be redone because a crash left the
//! chunk set inconsistent.

use tracing::warn;

use super::{MetaStore, WaitSyncMeta, UNINITIALIZED};
use crate::config::SyncMode;
use crate::error::Result;

/// Where a table stands in the full-sync lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableSyncState {
    /// No wait_sync_meta row; the table must be registered first.
    Uninitialized,
    /// Registered with the pristine sentinel; chunk planning is needed.
    NeedsSplit,
    /// Planned, and the chunk rows agree with the outstanding count.
    Resumable {
        global_scn: i64,
        split_times: i64,
        chunk_count: i64,
    },
    /// Planned, but the chunk rows disagree with the outstanding count;
    /// the table must be re-planned.
    Inconsistent { split_times: i64, chunk_count: i64 },
    /// Full sync complete; eligible for increment initialization.
    Finished { global_scn: i64 },
}

/// One table's judgement.
#[derive(Debug, Clone)]
pub struct TableJudgement {
    pub table: String,
    pub state: TableSyncState,
}

/// Judge every table in the configured scope.
pub async fn judge_tables(
    store: &dyn MetaStore,
    schema: &str,
    tables: &[String],
    sync_mode: SyncMode,
) -> Result<Vec<TableJudgement>> {
    let mut judgements = Vec::with_capacity(tables.len());

    for table in tables {
        let state = match store.wait_meta(schema, table, sync_mode).await? {
            None => TableSyncState::Uninitialized,
            Some(meta) => {
                if meta.full_global_scn == UNINITIALIZED && meta.full_split_times == UNINITIALIZED {
                    TableSyncState::NeedsSplit
                } else if meta.full_split_times == 0 {
                    TableSyncState::Finished {
                        global_scn: meta.full_global_scn,
                    }
                } else {
                    let chunk_count = store.chunk_count(schema, table).await?;
                    if chunk_count == meta.full_split_times {
                        TableSyncState::Resumable {
                            global_scn: meta.full_global_scn,
                            split_times: meta.full_split_times,
                            chunk_count,
                        }
                    } else {
                        warn!(
                            schema,
                            table = table.as_str(),
                            split_times = meta.full_split_times,
                            chunk_count,
                            "chunk rows disagree with split count, table must be re-planned"
                        );
                        TableSyncState::Inconsistent {
                            split_times: meta.full_split_times,
                            chunk_count,
                        }
                    }
                }
            }
        };
        judgements.push(TableJudgement {
            table: table.to_uppercase(),
            state,
        });
    }

    Ok(judgements)
}

/// Scan planned tables whose chunk rows disagree with their outstanding
/// split count. Returns the offending table names.
pub async fn inconsistent_tables(
    store: &dyn MetaStore,
    schema: &str,
    metas: &[WaitSyncMeta],
) -> Result<Vec<String>> {
    let mut tables = Vec::new();
    for meta in metas {
        let chunk_count = store.chunk_count(schema, &meta.source_table_name).await?;
        if chunk_count != meta.full_split_times {
            tables.push(meta.source_table_name.clone());
        }
    }
    Ok(tables)
}

/// Partition tables into those with exactly one increment anchor and those
/// without one (zero or duplicated rows both count as missing).
pub async fn increment_ready_tables(
    store: &dyn MetaStore,
    schema: &str,
    tables: &[String],
) -> Result<(Vec<String>, Vec<String>)> {
    let mut ready = Vec::new();
    let mut missing = Vec::new();
    for table in tables {
        let count = store.increment_count(schema, table).await?;
        if count == 1 {
            ready.push(table.to_uppercase());
        } else {
            missing.push(table.to_uppercase());
        }
    }
    Ok((ready, missing))
}

/// Tables in scope whose full sync has not finished.
pub async fn unfinished_tables(
    store: &dyn MetaStore,
    schema: &str,
    tables: &[String],
    sync_mode: SyncMode,
) -> Result<Vec<String>> {
    let mut unfinished = Vec::new();
    for table in tables {
        let finished = match store.wait_meta(schema, table, sync_mode).await? {
            Some(meta) => meta.full_global_scn > UNINITIALIZED && meta.full_split_times == 0,
            None => false,
        };
        if !finished {
            unfinished.push(table.to_uppercase());
        }
    }
    Ok(unfinished)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::meta::{rowid_scan_sql, FullSyncMeta, MemoryMetaStore};

    async fn planned_store(split_times: i64, chunk_rows: i64) -> MemoryMetaStore {
        let store = MemoryMetaStore::new();
        store
            .init_wait("MARVIN", &["T1".to_string()], SyncMode::Full)
            .await
            .unwrap();
        store
            .update_wait("MARVIN", "T1", split_times, 100, false, SyncMode::Full)
            .await
            .unwrap();
        let chunks: Vec<FullSyncMeta> = (0..chunk_rows)
            .map(|i| FullSyncMeta {
                source_schema_name: "MARVIN".into(),
                source_table_name: "T1".into(),
                rowid_sql: rowid_scan_sql("MARVIN", "T1", &format!("A{}", i), &format!("B{}", i)),
                global_scn: 100,
                is_partition: false,
            })
            .collect();
        store.create_full_chunks(chunks, 500).await.unwrap();
        store
    }

    #[tokio::test]
    async fn test_absent_table_is_uninitialized() {
        let store = MemoryMetaStore::new();
        let judgements = judge_tables(&store, "MARVIN", &["T1".to_string()], SyncMode::Full)
            .await
            .unwrap();
        assert_eq!(judgements[0].state, TableSyncState::Uninitialized);
    }

    #[tokio::test]
    async fn test_sentinel_table_needs_split() {
        let store = MemoryMetaStore::new();
        store
            .init_wait("MARVIN", &["T1".to_string()], SyncMode::Full)
            .await
            .unwrap();
        let judgements = judge_tables(&store, "MARVIN", &["T1".to_string()], SyncMode::Full)
            .await
            .unwrap();
        assert_eq!(judgements[0].state, TableSyncState::NeedsSplit);
    }

    #[tokio::test]
    async fn test_matching_counts_are_resumable() {
        let store = planned_store(3, 3).await;
        let judgements = judge_tables(&store, "MARVIN", &["T1".to_string()], SyncMode::Full)
            .await
            .unwrap();
        assert_eq!(
            judgements[0].state,
            TableSyncState::Resumable {
                global_scn: 100,
                split_times: 3,
                chunk_count: 3
            }
        );
    }

    #[tokio::test]
    async fn test_crash_leaves_table_inconsistent() {
        // Three planned chunks but only two rows survived the crash.
        let store = planned_store(3, 2).await;
        let judgements = judge_tables(&store, "MARVIN", &["T1".to_string()], SyncMode::Full)
            .await
            .unwrap();
        assert_eq!(
            judgements[0].state,
            TableSyncState::Inconsistent {
                split_times: 3,
                chunk_count: 2
            }
        );

        let metas = store.pending_tables("MARVIN", SyncMode::Full).await.unwrap();
        let bad = inconsistent_tables(&store, "MARVIN", &metas).await.unwrap();
        assert_eq!(bad, vec!["T1".to_string()]);
    }

    #[tokio::test]
    async fn test_zero_split_times_is_finished() {
        let store = planned_store(3, 3).await;
        for predicate in store.chunk_predicates("MARVIN", "T1").await.unwrap() {
            store
                .delete_chunk("MARVIN", "T1", &predicate, SyncMode::Full)
                .await
                .unwrap();
        }
        let judgements = judge_tables(&store, "MARVIN", &["T1".to_string()], SyncMode::Full)
            .await
            .unwrap();
        assert_eq!(
            judgements[0].state,
            TableSyncState::Finished { global_scn: 100 }
        );
    }

    #[tokio::test]
    async fn test_increment_ready_partition() {
        let store = MemoryMetaStore::new();
        store.init_increment("MARVIN", "T1", 100, false).await.unwrap();
        // T2 has no anchor; T3 has a duplicated anchor.
        store.init_increment("MARVIN", "T3", 100, false).await.unwrap();
        store.init_increment("MARVIN", "T3", 101, false).await.unwrap();

        let (ready, missing) = increment_ready_tables(
            &store,
            "MARVIN",
            &["T1".to_string(), "T2".to_string(), "T3".to_string()],
        )
        .await
        .unwrap();
        assert_eq!(ready, vec!["T1".to_string()]);
        assert_eq!(missing, vec!["T2".to_string(), "T3".to_string()]);
    }

    #[tokio::test]
    async fn test_unfinished_tables() {
        let store = planned_store(2, 2).await;
        store
            .init_wait("MARVIN", &["T2".to_string()], SyncMode::Full)
            .await
            .unwrap();

        let unfinished = unfinished_tables(
            &store,
            "MARVIN",
            &["T1".to_string(), "T2".to_string()],
            SyncMode::Full,
        )
        .await
        .unwrap();
        assert_eq!(unfinished, vec!["T1".to_string(), "T2".to_string()]);

        for predicate in store.chunk_predicates("MARVIN", "T1").await.unwrap() {
            store
                .delete_chunk("MARVIN", "T1", &predicate, SyncMode::Full)
                .await
                .unwrap();
        }
        let unfinished = unfinished_tables(
            &store,
            "MARVIN",
            &["T1".to_string(), "T2".to_string()],
            SyncMode::Full,
        )
        .await
        .unwrap();
        assert_eq!(unfinished, vec!["T2".to_string()]);
    }
}
