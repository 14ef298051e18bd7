//! Migration planning.
//!
//! [`build_table_list`] enumerates the candidate tables of a schema, puts
//! unsupported kinds aside, resolves the environment gates (character set,
//! version, collation) and fans the remaining tables out across a worker
//! pool to produce one [`TablePlan`] each. [`generate_schema_ddl`] then
//! drives DDL generation over those plans, collecting per-table failures
//! instead of halting. [`chunk`] holds the per-table ROWID chunk planner.

pub mod chunk;

pub use chunk::{split_table_into_chunks, ChunkRequest};

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::catalog::OracleCatalog;
use crate::config::Config;
use crate::ddl::{
    charset_component, mysql_character_set, version_at_least, TableDdl, TablePlan, TidbVariables,
    COLLATION_DB_VERSION,
};
use crate::error::{MigrateError, Result};
use crate::meta::{judge_tables, MetaStore, TableSyncState};
use crate::rules::{RuleStore, TableRules};

/// Bounded-channel capacity for the planner fan-out.
const CHANNEL_BUFFER: usize = 1024;

/// Result of table-list planning.
#[derive(Debug, Default)]
pub struct TableListOutcome {
    /// One plan per ordinary table.
    pub plans: Vec<TablePlan>,
    /// Partitioned tables, surfaced for manual conversion.
    pub partition_tables: Vec<String>,
    /// Temporary tables, surfaced for manual handling.
    pub temporary_tables: Vec<String>,
    /// Cluster-organized tables, surfaced for manual handling.
    pub clustered_tables: Vec<String>,
}

/// A table whose DDL generation failed.
#[derive(Debug)]
pub struct TableFailure {
    pub table: String,
    pub error: MigrateError,
}

/// DDL generation output for a schema.
#[derive(Debug, Default)]
pub struct ReverseOutcome {
    /// Successfully generated DDL, keyed by source table name.
    pub tables: Vec<(String, TableDdl)>,
    /// Tables that failed, with their errors.
    pub failures: Vec<TableFailure>,
}

struct PlanContext {
    source_schema: String,
    target_schema: String,
    dialect: crate::config::TargetDialect,
    table_option: String,
    overwrite: bool,
    oracle_collation: bool,
    schema_collation: String,
    table_collations: HashMap<String, String>,
    nls_sort: String,
    nls_comp: String,
    table_types: HashMap<String, String>,
}

/// Build the table plans for a schema.
///
/// Partitioned, temporary and clustered tables are set aside with a warning;
/// an unsupported database character set aborts the run. The remaining
/// tables are pushed through a bounded channel to `config.migration.threads`
/// workers; a single collector owns the result vector.
pub async fn build_table_list(
    catalog: Arc<dyn OracleCatalog>,
    config: &Config,
    tables: &[String],
    cancel: &CancellationToken,
) -> Result<TableListOutcome> {
    let source_schema = config.oracle.schema.to_uppercase();
    let tables: Vec<String> = tables.iter().map(|t| t.to_uppercase()).collect();

    let partition_tables = catalog.filter_partitioned(&source_schema, &tables).await?;
    let temporary_tables = catalog.filter_temporary(&source_schema, &tables).await?;
    let clustered_tables = catalog.filter_clustered(&source_schema, &tables).await?;

    if !partition_tables.is_empty() {
        warn!(
            schema = %source_schema,
            tables = ?partition_tables,
            "partition tables are not reversed automatically, please convert them manually if necessary"
        );
    }
    if !temporary_tables.is_empty() {
        warn!(
            schema = %source_schema,
            tables = ?temporary_tables,
            "temporary tables are not reversed automatically, please handle them manually if necessary"
        );
    }
    if !clustered_tables.is_empty() {
        warn!(
            schema = %source_schema,
            tables = ?clustered_tables,
            "clustered tables are not reversed automatically, please handle them manually if necessary"
        );
    }

    let ordinary: Vec<String> = tables
        .iter()
        .filter(|t| {
            !partition_tables.contains(*t)
                && !temporary_tables.contains(*t)
                && !clustered_tables.contains(*t)
        })
        .cloned()
        .collect();

    let character_set = catalog.db_character_set().await?;
    let charset = charset_component(&character_set);
    if mysql_character_set(charset).is_none() {
        return Err(MigrateError::UnsupportedCharacterSet(
            character_set.clone(),
        ));
    }

    let version = catalog.db_version().await?;
    let oracle_collation = version_at_least(&version, COLLATION_DB_VERSION);
    let nls_sort = catalog.nls_sort().await?;
    let nls_comp = catalog.nls_comp().await?;

    info!(
        schema = %source_schema,
        db_version = %version,
        db_character = %character_set,
        table_totals = tables.len(),
        table_collation = oracle_collation,
        "get oracle db character and version finished"
    );

    let (schema_collation, table_collations) = if oracle_collation {
        let schema_collation = catalog.schema_collation(&source_schema).await?;
        let table_collations = catalog
            .table_collations(&source_schema, &schema_collation)
            .await?;
        (schema_collation, table_collations)
    } else {
        (String::new(), HashMap::new())
    };

    let table_types = catalog.table_types(&source_schema).await?;

    let context = Arc::new(PlanContext {
        source_schema: source_schema.clone(),
        target_schema: config.mysql.schema.to_uppercase(),
        dialect: config.mysql.dialect,
        table_option: config.mysql.table_option.to_uppercase(),
        overwrite: config.mysql.overwrite,
        oracle_collation,
        schema_collation,
        table_collations,
        nls_sort,
        nls_comp,
        table_types,
    });

    let (name_tx, name_rx) = async_channel::bounded::<String>(CHANNEL_BUFFER);
    let (plan_tx, mut plan_rx) = mpsc::channel::<TablePlan>(CHANNEL_BUFFER);

    // Producer feeds the candidate names and closes the queue when done.
    let producer_tables = ordinary.clone();
    tokio::spawn(async move {
        for table in producer_tables {
            if name_tx.send(table).await.is_err() {
                break;
            }
        }
    });

    // Workers turn names into plans.
    for _ in 0..config.migration.threads.max(1) {
        let name_rx = name_rx.clone();
        let plan_tx = plan_tx.clone();
        let context = context.clone();
        let cancel = cancel.clone();
        tokio::spawn(async move {
            while let Ok(table) = name_rx.recv().await {
                if cancel.is_cancelled() {
                    break;
                }
                let plan = TablePlan {
                    source_schema: context.source_schema.clone(),
                    source_table: table.clone(),
                    target_schema: context.target_schema.clone(),
                    target_table: String::new(),
                    dialect: context.dialect,
                    table_option: context.table_option.clone(),
                    overwrite: context.overwrite,
                    oracle_collation: context.oracle_collation,
                    schema_collation: context.schema_collation.clone(),
                    table_collation: context
                        .table_collations
                        .get(&table)
                        .cloned()
                        .unwrap_or_default(),
                    nls_sort: context.nls_sort.clone(),
                    nls_comp: context.nls_comp.clone(),
                    table_kind: context.table_types.get(&table).cloned().unwrap_or_default(),
                };
                if plan_tx.send(plan).await.is_err() {
                    break;
                }
            }
        });
    }
    drop(plan_tx);
    drop(name_rx);

    // The collector owns the result container; the output queue closes once
    // every worker has finished.
    let mut plans = Vec::with_capacity(ordinary.len());
    while let Some(plan) = plan_rx.recv().await {
        plans.push(plan);
    }

    if cancel.is_cancelled() {
        return Err(MigrateError::Cancelled);
    }

    info!(
        schema = %source_schema,
        table_totals = tables.len(),
        table_gens = plans.len(),
        "gen oracle table list finished"
    );

    Ok(TableListOutcome {
        plans,
        partition_tables,
        temporary_tables,
        clustered_tables,
    })
}

/// Result of schema-level sync planning.
#[derive(Debug, Default)]
pub struct SyncPlanOutcome {
    /// Tables planned in this run, with their chunk counts.
    pub planned: Vec<(String, i64)>,
    /// Tables already planned with a consistent chunk set, left untouched.
    pub resumable: Vec<String>,
    /// Tables whose full sync is already complete.
    pub finished: Vec<String>,
    /// Tables whose planning failed in this run.
    pub failures: Vec<TableFailure>,
}

/// Prepare the sync metadata for a schema's table set.
///
/// Registers unseen tables, snapshots the current SCN, and chunk-plans every
/// table still carrying the pristine sentinel. Tables that already hold a
/// consistent chunk set resume as-is; a table whose chunk rows disagree with
/// its split count aborts the run so the operator can reset it before
/// re-planning.
pub async fn plan_schema_sync(
    catalog: Arc<dyn OracleCatalog>,
    store: Arc<dyn MetaStore>,
    config: &Config,
    tables: &[String],
    cancel: &CancellationToken,
) -> Result<SyncPlanOutcome> {
    let schema = config.oracle.schema.to_uppercase();
    let sync_mode = config.migration.sync_mode;
    let tables: Vec<String> = tables.iter().map(|t| t.to_uppercase()).collect();

    store.init_schema().await?;

    let judgements = judge_tables(store.as_ref(), &schema, &tables, sync_mode).await?;

    let mut outcome = SyncPlanOutcome::default();
    let mut unseen = Vec::new();
    let mut to_split = Vec::new();
    let mut inconsistent = Vec::new();
    for judgement in judgements {
        match judgement.state {
            TableSyncState::Uninitialized => {
                unseen.push(judgement.table.clone());
                to_split.push(judgement.table);
            }
            TableSyncState::NeedsSplit => to_split.push(judgement.table),
            TableSyncState::Resumable { .. } => outcome.resumable.push(judgement.table),
            TableSyncState::Inconsistent { .. } => inconsistent.push(judgement.table),
            TableSyncState::Finished { .. } => outcome.finished.push(judgement.table),
        }
    }

    if !inconsistent.is_empty() {
        return Err(MigrateError::store(
            format!(
                "chunk metadata is inconsistent for tables {:?}, reset them before re-planning",
                inconsistent
            ),
            "judging checkpoint resume",
        ));
    }

    if !unseen.is_empty() {
        store.init_wait(&schema, &unseen, sync_mode).await?;
    }

    if to_split.is_empty() {
        return Ok(outcome);
    }

    let global_scn = catalog.current_scn().await?;
    info!(
        schema = %schema,
        scn = global_scn,
        tables = to_split.len(),
        "snapshot scn taken, splitting tables into rowid chunks"
    );

    for (worker_id, table) in to_split.into_iter().enumerate() {
        let request = ChunkRequest {
            schema: schema.clone(),
            table: table.clone(),
            worker_id,
            global_scn,
            chunk_size: config.migration.chunk_size,
            insert_batch_size: config.migration.insert_batch_size,
            sync_mode,
        };
        match split_table_into_chunks(catalog.as_ref(), store.as_ref(), &request, cancel).await {
            Ok(chunks) => outcome.planned.push((table, chunks)),
            Err(MigrateError::Cancelled) => return Err(MigrateError::Cancelled),
            Err(error) => {
                warn!(
                    schema = %schema,
                    table = %table,
                    error = %error,
                    "chunk planning failed, collected and skipped"
                );
                outcome.failures.push(TableFailure { table, error });
            }
        }
    }

    Ok(outcome)
}

/// Generate DDL for every plan, collecting per-table failures.
///
/// A failing table never halts the run; its error is surfaced next to the
/// successful plans so the caller can report both.
pub async fn generate_schema_ddl(
    catalog: &dyn OracleCatalog,
    rules: &dyn RuleStore,
    plans: &[TablePlan],
    tidb: Option<&TidbVariables>,
) -> Result<ReverseOutcome> {
    let mut outcome = ReverseOutcome::default();

    for plan in plans {
        let table_rules =
            TableRules::load(rules, &plan.source_schema, &plan.source_table).await?;
        match plan.generate(catalog, &table_rules, tidb).await {
            Ok(ddl) => outcome.tables.push((plan.source_table.clone(), ddl)),
            Err(error) => {
                warn!(
                    schema = %plan.source_schema,
                    table = %plan.source_table,
                    error = %error,
                    "table reverse failed, collected and skipped"
                );
                outcome.failures.push(TableFailure {
                    table: plan.source_table.clone(),
                    error,
                });
            }
        }
    }

    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::testing::StubCatalog;
    use crate::catalog::{ColumnRow, ConstraintRow};
    use crate::config::TargetDialect;
    use crate::rules::MemoryRuleStore;

    fn config() -> Config {
        Config::from_yaml(
            r#"
oracle:
  host: localhost
  service_name: orcl
  user: system
  password: oracle
  schema: marvin
mysql:
  host: localhost
  user: root
  password: mysql
  schema: marvin
migration:
  threads: 3
"#,
        )
        .unwrap()
    }

    fn catalog_with_tables(tables: &[&str]) -> StubCatalog {
        let stub = StubCatalog::new();
        stub.set_table_types(
            tables
                .iter()
                .map(|t| (t.to_string(), "HEAP".to_string()))
                .collect(),
        );
        stub.set_schema_collation("BINARY");
        for table in tables {
            stub.set_table_collation(table, "BINARY_CI");
        }
        stub
    }

    fn names(tables: &[&str]) -> Vec<String> {
        tables.iter().map(|t| t.to_string()).collect()
    }

    #[tokio::test]
    async fn test_buckets_are_surfaced_and_excluded() {
        let stub = catalog_with_tables(&["T1", "T2", "P1", "TMP1", "C1"]);
        stub.set_partitioned(vec!["P1".to_string()]);
        stub.set_temporary(vec!["TMP1".to_string()]);
        stub.set_clustered(vec!["C1".to_string()]);

        let outcome = build_table_list(
            Arc::new(stub),
            &config(),
            &names(&["T1", "T2", "P1", "TMP1", "C1"]),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

        assert_eq!(outcome.partition_tables, vec!["P1"]);
        assert_eq!(outcome.temporary_tables, vec!["TMP1"]);
        assert_eq!(outcome.clustered_tables, vec!["C1"]);

        let mut planned: Vec<String> =
            outcome.plans.iter().map(|p| p.source_table.clone()).collect();
        planned.sort();
        assert_eq!(planned, vec!["T1", "T2"]);
    }

    #[tokio::test]
    async fn test_plans_carry_collation_when_supported() {
        let stub = catalog_with_tables(&["T1"]);
        let outcome = build_table_list(
            Arc::new(stub),
            &config(),
            &names(&["t1"]),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

        let plan = &outcome.plans[0];
        assert_eq!(plan.source_schema, "MARVIN");
        assert_eq!(plan.source_table, "T1");
        assert_eq!(plan.target_table_name(), "T1");
        assert!(plan.oracle_collation);
        assert_eq!(plan.schema_collation, "BINARY");
        assert_eq!(plan.table_collation, "BINARY_CI");
        assert_eq!(plan.dialect, TargetDialect::Mysql);
        assert_eq!(plan.table_kind, "HEAP");
    }

    #[tokio::test]
    async fn test_old_version_disables_collation_gate() {
        let stub = catalog_with_tables(&["T1"]);
        stub.set_version("11.2.0.4.0");
        let outcome = build_table_list(
            Arc::new(stub),
            &config(),
            &names(&["T1"]),
            &CancellationToken::new(),
        )
        .await
        .unwrap();
        let plan = &outcome.plans[0];
        assert!(!plan.oracle_collation);
        assert!(plan.schema_collation.is_empty());
        assert!(plan.table_collation.is_empty());
        assert_eq!(plan.nls_comp, "BINARY");
    }

    #[tokio::test]
    async fn test_unsupported_character_set_is_fatal() {
        let stub = catalog_with_tables(&["T1"]);
        stub.set_character_set("AMERICAN_AMERICA.WE8ISO8859P1");
        let result = build_table_list(
            Arc::new(stub),
            &config(),
            &names(&["T1"]),
            &CancellationToken::new(),
        )
        .await;
        assert!(matches!(
            result,
            Err(MigrateError::UnsupportedCharacterSet(_))
        ));
    }

    #[tokio::test]
    async fn test_generate_schema_ddl_collects_failures() {
        let stub = Arc::new(catalog_with_tables(&["GOOD", "BAD"]));
        for table in ["GOOD", "BAD"] {
            stub.set_columns(
                table,
                vec![ColumnRow {
                    column_name: "ID".into(),
                    data_type: "NUMBER".into(),
                    nullable: "N".into(),
                    data_length: "22".into(),
                    data_precision: "10".into(),
                    data_scale: "0".into(),
                    ..Default::default()
                }],
            );
        }
        // Two primary keys make BAD unreversible.
        stub.set_primary_keys(
            "BAD",
            vec![
                ConstraintRow {
                    constraint_name: "PK1".into(),
                    column_list: "ID".into(),
                },
                ConstraintRow {
                    constraint_name: "PK2".into(),
                    column_list: "ID".into(),
                },
            ],
        );

        let outcome = build_table_list(
            stub.clone(),
            &config(),
            &names(&["GOOD", "BAD"]),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

        let rules = MemoryRuleStore::new();
        let result = generate_schema_ddl(stub.as_ref(), &rules, &outcome.plans, None)
            .await
            .unwrap();

        assert_eq!(result.tables.len(), 1);
        assert_eq!(result.tables[0].0, "GOOD");
        assert_eq!(result.failures.len(), 1);
        assert_eq!(result.failures[0].table, "BAD");
        assert!(matches!(
            result.failures[0].error,
            MigrateError::MultiplePk { .. }
        ));
    }

    #[tokio::test]
    async fn test_plan_schema_sync_registers_and_splits() {
        use crate::catalog::{RowidRange, TableStatistics};
        use crate::meta::{MemoryMetaStore, MetaStore};

        let stub = Arc::new(catalog_with_tables(&["T1", "T2"]));
        stub.set_statistics(
            "T1",
            TableStatistics {
                num_rows: 200,
                is_partition: false,
            },
        );
        stub.set_statistics(
            "T2",
            TableStatistics {
                num_rows: 0,
                is_partition: false,
            },
        );
        stub.set_chunk_ranges(vec![
            RowidRange {
                start_rowid: "AAA".into(),
                end_rowid: "BBB".into(),
            },
            RowidRange {
                start_rowid: "CCC".into(),
                end_rowid: "DDD".into(),
            },
        ]);
        stub.set_scn(555);

        let store: Arc<MemoryMetaStore> = Arc::new(MemoryMetaStore::new());
        let outcome = plan_schema_sync(
            stub.clone(),
            store.clone(),
            &config(),
            &names(&["T1", "T2"]),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

        let mut planned = outcome.planned.clone();
        planned.sort();
        assert_eq!(planned, vec![("T1".to_string(), 2), ("T2".to_string(), 1)]);

        let meta = store
            .wait_meta("MARVIN", "T1", crate::config::SyncMode::Full)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(meta.full_global_scn, 555);
        assert_eq!(meta.full_split_times, 2);
        assert_eq!(store.chunk_count("MARVIN", "T2").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_plan_schema_sync_resumes_and_rejects_inconsistency() {
        use crate::catalog::TableStatistics;
        use crate::meta::{FullSyncMeta, MemoryMetaStore, MetaStore};

        let stub = Arc::new(catalog_with_tables(&["T1"]));
        stub.set_statistics(
            "T1",
            TableStatistics {
                num_rows: 100,
                is_partition: false,
            },
        );

        // A previously planned table with matching counts resumes untouched.
        let store: Arc<MemoryMetaStore> = Arc::new(MemoryMetaStore::new());
        store
            .init_wait("MARVIN", &["T1".to_string()], crate::config::SyncMode::Full)
            .await
            .unwrap();
        store
            .update_wait("MARVIN", "T1", 1, 99, false, crate::config::SyncMode::Full)
            .await
            .unwrap();
        store
            .create_full_chunks(
                vec![FullSyncMeta {
                    source_schema_name: "MARVIN".into(),
                    source_table_name: "T1".into(),
                    rowid_sql: "SELECT * FROM MARVIN.T1".into(),
                    global_scn: 99,
                    is_partition: false,
                }],
                500,
            )
            .await
            .unwrap();

        let outcome = plan_schema_sync(
            stub.clone(),
            store.clone(),
            &config(),
            &names(&["T1"]),
            &CancellationToken::new(),
        )
        .await
        .unwrap();
        assert_eq!(outcome.resumable, vec!["T1"]);
        assert!(outcome.planned.is_empty());

        // Removing the chunk row behind the store's back makes it
        // inconsistent and planning refuses to proceed.
        store.truncate_full().await.unwrap();
        let result = plan_schema_sync(
            stub,
            store,
            &config(),
            &names(&["T1"]),
            &CancellationToken::new(),
        )
        .await;
        assert!(matches!(result, Err(MigrateError::Store { .. })));
    }
}
