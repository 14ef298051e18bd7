//! MySQL-backed sync-metadata store.
//!
//! Persists the metadata tables inside the target database so planning state
//! survives restarts and can be shared between runs. All writes go through
//! the pool; chunk completion uses a single transaction for the delete +
//! decrement pair.

use async_trait::async_trait;
use mysql_async::prelude::*;
use mysql_async::{params, Pool, Row as MySqlRow, TxOpts};
use tracing::info;

use super::{
    normalize_split_times, FullSyncMeta, MetaStore, WaitSyncMeta, UNINITIALIZED,
};
use crate::config::{MysqlConfig, SyncMode};
use crate::ddl::TidbVariables;
use crate::error::{MigrateError, Result};

/// MySQL/TiDB sync-metadata store.
pub struct MysqlMetaStore {
    pool: Pool,
    schema: String,
}

impl MysqlMetaStore {
    /// Create a store over an existing pool.
    pub fn new(pool: Pool, meta_schema: impl Into<String>) -> Self {
        Self {
            pool,
            schema: meta_schema.into(),
        }
    }

    /// Create a store from the target configuration.
    pub fn from_config(config: &MysqlConfig) -> Self {
        let pool = Pool::new(config.connection_url().as_str());
        Self::new(pool, config.meta_schema.clone())
    }

    async fn conn(&self, context: &'static str) -> Result<mysql_async::Conn> {
        self.pool
            .get_conn()
            .await
            .map_err(|e| MigrateError::store(e.to_string(), context))
    }

    /// Read the TiDB variables consulted by the table-option policy.
    ///
    /// `tidb_enable_clustered_index` is read directly; `alter-primary-key`
    /// is extracted from the `@@global.tidb_config` JSON document. Absent
    /// keys resolve to `None`.
    pub async fn tidb_variables(&self) -> Result<TidbVariables> {
        let mut conn = self.conn("reading tidb variables").await?;

        let clustered_index: Option<String> = conn
            .query_first("SELECT @@tidb_enable_clustered_index")
            .await
            .map_err(|e| MigrateError::store(e.to_string(), "reading tidb_enable_clustered_index"))?;

        let config_json: Option<String> = conn
            .query_first("SELECT @@global.tidb_config")
            .await
            .map_err(|e| MigrateError::store(e.to_string(), "reading @@global.tidb_config"))?;

        let alter_primary_key = match config_json {
            Some(raw) => serde_json::from_str::<serde_json::Value>(&raw)?
                .get("alter-primary-key")
                .and_then(|v| v.as_bool()),
            None => None,
        };

        Ok(TidbVariables {
            clustered_index: clustered_index.unwrap_or_default().to_uppercase(),
            alter_primary_key,
        })
    }

    /// Truncate a table in the target schema ahead of an overwrite re-run.
    pub async fn truncate_target_table(&self, target_schema: &str, table: &str) -> Result<()> {
        let mut conn = self.conn("truncating target table").await?;
        let sql = format!(
            "TRUNCATE TABLE `{}`.`{}`",
            target_schema.to_uppercase(),
            table.to_uppercase()
        );
        conn.query_drop(&sql)
            .await
            .map_err(|e| MigrateError::store(e.to_string(), "truncating target table"))?;
        info!(schema = target_schema, table, "truncate table");
        Ok(())
    }

    fn wait_meta_from_row(&self, row: &MySqlRow) -> Result<WaitSyncMeta> {
        Ok(WaitSyncMeta {
            source_schema_name: row.get("source_schema_name").unwrap_or_default(),
            source_table_name: row.get("source_table_name").unwrap_or_default(),
            sync_mode: parse_sync_mode(&row.get::<String, _>("sync_mode").unwrap_or_default())?,
            full_global_scn: row
                .get::<Option<i64>, _>("full_global_scn")
                .flatten()
                .unwrap_or(UNINITIALIZED),
            full_split_times: row
                .get::<Option<i64>, _>("full_split_times")
                .flatten()
                .unwrap_or(UNINITIALIZED),
            is_partition: row.get::<Option<bool>, _>("is_partition").flatten().unwrap_or(false),
        })
    }

    async fn wait_metas_where(
        &self,
        schema: &str,
        sync_mode: SyncMode,
        condition: &str,
        context: &'static str,
    ) -> Result<Vec<WaitSyncMeta>> {
        let mut conn = self.conn(context).await?;
        let sql = format!(
            "SELECT source_schema_name, source_table_name, sync_mode,
                    full_global_scn, full_split_times, is_partition
             FROM `{}`.`wait_sync_meta`
             WHERE source_schema_name = :schema AND sync_mode = :sync_mode AND {}",
            self.schema, condition
        );
        let rows: Vec<MySqlRow> = conn
            .exec(
                &sql,
                params! {
                    "schema" => schema.to_uppercase(),
                    "sync_mode" => sync_mode.as_str(),
                },
            )
            .await
            .map_err(|e| MigrateError::store(e.to_string(), context))?;

        rows.iter().map(|row| self.wait_meta_from_row(row)).collect()
    }
}

fn parse_sync_mode(value: &str) -> Result<SyncMode> {
    match value.to_uppercase().as_str() {
        "FULL" => Ok(SyncMode::Full),
        "INCREMENT" => Ok(SyncMode::Increment),
        "ALL" => Ok(SyncMode::All),
        other => Err(MigrateError::store(
            format!("invalid sync mode {:?}", other),
            "decoding wait_sync_meta row",
        )),
    }
}

#[async_trait]
impl MetaStore for MysqlMetaStore {
    async fn init_schema(&self) -> Result<()> {
        let mut conn = self.conn("creating metadata schema").await?;

        let sql = format!("CREATE DATABASE IF NOT EXISTS `{}`", self.schema);
        conn.query_drop(&sql)
            .await
            .map_err(|e| MigrateError::store(e.to_string(), "creating metadata schema"))?;

        let sql = format!(
            "CREATE TABLE IF NOT EXISTS `{}`.`wait_sync_meta` (
                source_schema_name VARCHAR(100) NOT NULL,
                source_table_name VARCHAR(100) NOT NULL,
                sync_mode VARCHAR(10) NOT NULL,
                full_global_scn BIGINT NOT NULL DEFAULT -1,
                full_split_times BIGINT NOT NULL DEFAULT -1,
                is_partition BOOL NOT NULL DEFAULT FALSE,
                created_at DATETIME(6) NOT NULL DEFAULT CURRENT_TIMESTAMP(6),
                updated_at DATETIME(6) NOT NULL DEFAULT CURRENT_TIMESTAMP(6) ON UPDATE CURRENT_TIMESTAMP(6),
                UNIQUE KEY uniq_schema_table_mode (source_schema_name, source_table_name, sync_mode)
            ) ENGINE=InnoDB DEFAULT CHARSET=utf8mb4",
            self.schema
        );
        conn.query_drop(&sql)
            .await
            .map_err(|e| MigrateError::store(e.to_string(), "creating wait_sync_meta table"))?;

        let sql = format!(
            "CREATE TABLE IF NOT EXISTS `{}`.`full_sync_meta` (
                source_schema_name VARCHAR(100) NOT NULL,
                source_table_name VARCHAR(100) NOT NULL,
                rowid_sql VARCHAR(600) NOT NULL,
                global_scn BIGINT NOT NULL,
                is_partition BOOL NOT NULL DEFAULT FALSE,
                created_at DATETIME(6) NOT NULL DEFAULT CURRENT_TIMESTAMP(6),
                UNIQUE KEY uniq_schema_table_rowid (source_schema_name, source_table_name, rowid_sql)
            ) ENGINE=InnoDB DEFAULT CHARSET=utf8mb4",
            self.schema
        );
        conn.query_drop(&sql)
            .await
            .map_err(|e| MigrateError::store(e.to_string(), "creating full_sync_meta table"))?;

        let sql = format!(
            "CREATE TABLE IF NOT EXISTS `{}`.`increment_sync_meta` (
                source_schema_name VARCHAR(100) NOT NULL,
                source_table_name VARCHAR(100) NOT NULL,
                global_scn BIGINT NOT NULL,
                source_table_scn BIGINT NOT NULL,
                is_partition BOOL NOT NULL DEFAULT FALSE,
                created_at DATETIME(6) NOT NULL DEFAULT CURRENT_TIMESTAMP(6),
                UNIQUE KEY uniq_schema_table (source_schema_name, source_table_name)
            ) ENGINE=InnoDB DEFAULT CHARSET=utf8mb4",
            self.schema
        );
        conn.query_drop(&sql)
            .await
            .map_err(|e| MigrateError::store(e.to_string(), "creating increment_sync_meta table"))?;

        Ok(())
    }

    async fn init_wait(&self, schema: &str, tables: &[String], sync_mode: SyncMode) -> Result<()> {
        let mut conn = self.conn("registering wait_sync_meta rows").await?;
        let sql = format!(
            "INSERT INTO `{}`.`wait_sync_meta`
             (source_schema_name, source_table_name, sync_mode, full_global_scn, full_split_times)
             VALUES (:schema, :table, :sync_mode, -1, -1)",
            self.schema
        );
        conn.exec_batch(
            &sql,
            tables.iter().map(|table| {
                params! {
                    "schema" => schema.to_uppercase(),
                    "table" => table.to_uppercase(),
                    "sync_mode" => sync_mode.as_str(),
                }
            }),
        )
        .await
        .map_err(|e| MigrateError::store(e.to_string(), "registering wait_sync_meta rows"))?;
        Ok(())
    }

    async fn wait_meta(
        &self,
        schema: &str,
        table: &str,
        sync_mode: SyncMode,
    ) -> Result<Option<WaitSyncMeta>> {
        let mut conn = self.conn("reading wait_sync_meta row").await?;
        let sql = format!(
            "SELECT source_schema_name, source_table_name, sync_mode,
                    full_global_scn, full_split_times, is_partition
             FROM `{}`.`wait_sync_meta`
             WHERE source_schema_name = :schema
               AND source_table_name = :table
               AND sync_mode = :sync_mode",
            self.schema
        );
        let row: Option<MySqlRow> = conn
            .exec_first(
                &sql,
                params! {
                    "schema" => schema.to_uppercase(),
                    "table" => table.to_uppercase(),
                    "sync_mode" => sync_mode.as_str(),
                },
            )
            .await
            .map_err(|e| MigrateError::store(e.to_string(), "reading wait_sync_meta row"))?;

        row.map(|r| self.wait_meta_from_row(&r)).transpose()
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
        let mut conn = self.conn("updating wait_sync_meta row").await?;
        let sql = format!(
            "UPDATE `{}`.`wait_sync_meta`
             SET full_global_scn = :scn, full_split_times = :split_times, is_partition = :is_partition
             WHERE source_schema_name = :schema
               AND source_table_name = :table
               AND sync_mode = :sync_mode",
            self.schema
        );
        conn.exec_drop(
            &sql,
            params! {
                "scn" => global_scn,
                "split_times" => normalize_split_times(split_times),
                "is_partition" => is_partition,
                "schema" => schema.to_uppercase(),
                "table" => table.to_uppercase(),
                "sync_mode" => sync_mode.as_str(),
            },
        )
        .await
        .map_err(|e| MigrateError::store(e.to_string(), "updating wait_sync_meta row"))?;
        Ok(())
    }

    async fn create_full_chunks(&self, chunks: Vec<FullSyncMeta>, batch_size: usize) -> Result<()> {
        if chunks.is_empty() {
            return Ok(());
        }
        let mut conn = self.conn("inserting full_sync_meta rows").await?;
        let sql = format!(
            "INSERT INTO `{}`.`full_sync_meta`
             (source_schema_name, source_table_name, rowid_sql, global_scn, is_partition)
             VALUES (:schema, :table, :rowid_sql, :scn, :is_partition)",
            self.schema
        );
        for batch in chunks.chunks(batch_size.max(1)) {
            conn.exec_batch(
                &sql,
                batch.iter().map(|chunk| {
                    params! {
                        "schema" => chunk.source_schema_name.to_uppercase(),
                        "table" => chunk.source_table_name.to_uppercase(),
                        "rowid_sql" => &chunk.rowid_sql,
                        "scn" => chunk.global_scn,
                        "is_partition" => chunk.is_partition,
                    }
                }),
            )
            .await
            .map_err(|e| MigrateError::store(e.to_string(), "inserting full_sync_meta rows"))?;
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
        let mut conn = self.conn("deleting chunk row").await?;
        let mut tx = conn
            .start_transaction(TxOpts::default())
            .await
            .map_err(|e| MigrateError::store(e.to_string(), "starting chunk delete transaction"))?;

        let sql = format!(
            "DELETE FROM `{}`.`full_sync_meta`
             WHERE source_schema_name = :schema
               AND source_table_name = :table
               AND UPPER(rowid_sql) = :rowid_sql",
            self.schema
        );
        tx.exec_drop(
            &sql,
            params! {
                "schema" => schema.to_uppercase(),
                "table" => table.to_uppercase(),
                "rowid_sql" => rowid_sql.to_uppercase(),
            },
        )
        .await
        .map_err(|e| MigrateError::store(e.to_string(), "deleting full_sync_meta row"))?;

        let sql = format!(
            "UPDATE `{}`.`wait_sync_meta`
             SET full_split_times = full_split_times - 1
             WHERE source_schema_name = :schema
               AND source_table_name = :table
               AND sync_mode = :sync_mode",
            self.schema
        );
        tx.exec_drop(
            &sql,
            params! {
                "schema" => schema.to_uppercase(),
                "table" => table.to_uppercase(),
                "sync_mode" => sync_mode.as_str(),
            },
        )
        .await
        .map_err(|e| MigrateError::store(e.to_string(), "decrementing full_split_times"))?;

        tx.commit()
            .await
            .map_err(|e| MigrateError::store(e.to_string(), "committing chunk delete transaction"))?;

        info!(schema, table, sql = rowid_sql, "clear and update sync meta");
        Ok(())
    }

    async fn chunk_count(&self, schema: &str, table: &str) -> Result<i64> {
        let mut conn = self.conn("counting chunk rows").await?;
        let sql = format!(
            "SELECT COUNT(1) FROM `{}`.`full_sync_meta`
             WHERE source_schema_name = :schema AND source_table_name = :table",
            self.schema
        );
        let count: Option<i64> = conn
            .exec_first(
                &sql,
                params! {
                    "schema" => schema.to_uppercase(),
                    "table" => table.to_uppercase(),
                },
            )
            .await
            .map_err(|e| MigrateError::store(e.to_string(), "counting chunk rows"))?;
        Ok(count.unwrap_or(0))
    }

    async fn chunk_predicates(&self, schema: &str, table: &str) -> Result<Vec<String>> {
        let mut conn = self.conn("reading chunk predicates").await?;
        let sql = format!(
            "SELECT rowid_sql FROM `{}`.`full_sync_meta`
             WHERE source_schema_name = :schema AND source_table_name = :table",
            self.schema
        );
        conn.exec(
            &sql,
            params! {
                "schema" => schema.to_uppercase(),
                "table" => table.to_uppercase(),
            },
        )
        .await
        .map_err(|e| MigrateError::store(e.to_string(), "reading chunk predicates"))
    }

    async fn waiting_tables(&self, schema: &str, sync_mode: SyncMode) -> Result<Vec<WaitSyncMeta>> {
        self.wait_metas_where(
            schema,
            sync_mode,
            "full_global_scn = -1 AND full_split_times = -1",
            "reading waiting tables",
        )
        .await
    }

    async fn pending_tables(&self, schema: &str, sync_mode: SyncMode) -> Result<Vec<WaitSyncMeta>> {
        self.wait_metas_where(
            schema,
            sync_mode,
            "full_global_scn > -1 AND full_split_times > 0",
            "reading pending tables",
        )
        .await
    }

    async fn finished_tables(
        &self,
        schema: &str,
        sync_mode: SyncMode,
    ) -> Result<Vec<WaitSyncMeta>> {
        self.wait_metas_where(
            schema,
            sync_mode,
            "full_global_scn > -1 AND full_split_times = 0",
            "reading finished tables",
        )
        .await
    }

    async fn init_increment(
        &self,
        schema: &str,
        table: &str,
        global_scn: i64,
        is_partition: bool,
    ) -> Result<()> {
        let mut conn = self.conn("creating increment_sync_meta row").await?;
        let sql = format!(
            "INSERT INTO `{}`.`increment_sync_meta`
             (source_schema_name, source_table_name, global_scn, source_table_scn, is_partition)
             VALUES (:schema, :table, :scn, :scn, :is_partition)",
            self.schema
        );
        conn.exec_drop(
            &sql,
            params! {
                "schema" => schema.to_uppercase(),
                "table" => table.to_uppercase(),
                "scn" => global_scn,
                "is_partition" => is_partition,
            },
        )
        .await
        .map_err(|e| MigrateError::store(e.to_string(), "creating increment_sync_meta row"))?;
        Ok(())
    }

    async fn increment_count(&self, schema: &str, table: &str) -> Result<i64> {
        let mut conn = self.conn("counting increment rows").await?;
        let sql = format!(
            "SELECT COUNT(1) FROM `{}`.`increment_sync_meta`
             WHERE source_schema_name = :schema AND source_table_name = :table",
            self.schema
        );
        let count: Option<i64> = conn
            .exec_first(
                &sql,
                params! {
                    "schema" => schema.to_uppercase(),
                    "table" => table.to_uppercase(),
                },
            )
            .await
            .map_err(|e| MigrateError::store(e.to_string(), "counting increment rows"))?;
        Ok(count.unwrap_or(0))
    }

    async fn truncate_full(&self) -> Result<()> {
        let mut conn = self.conn("truncating full_sync_meta").await?;
        let sql = format!("TRUNCATE TABLE `{}`.`full_sync_meta`", self.schema);
        conn.query_drop(&sql)
            .await
            .map_err(|e| MigrateError::store(e.to_string(), "truncating full_sync_meta"))?;
        info!(schema = %self.schema, table = "full_sync_meta", "truncate table full meta record");
        Ok(())
    }

    async fn delete_wait(&self, schema: &str, table: &str, sync_mode: SyncMode) -> Result<()> {
        let mut conn = self.conn("deleting wait_sync_meta row").await?;
        let sql = format!(
            "DELETE FROM `{}`.`wait_sync_meta`
             WHERE source_schema_name = :schema
               AND source_table_name = :table
               AND sync_mode = :sync_mode",
            self.schema
        );
        conn.exec_drop(
            &sql,
            params! {
                "schema" => schema.to_uppercase(),
                "table" => table.to_uppercase(),
                "sync_mode" => sync_mode.as_str(),
            },
        )
        .await
        .map_err(|e| MigrateError::store(e.to_string(), "deleting wait_sync_meta row"))?;
        info!(schema, table, sync_mode = sync_mode.as_str(), "delete wait sync record");
        Ok(())
    }

    fn backend_type(&self) -> &'static str {
        "mysql"
    }
}
