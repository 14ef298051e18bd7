//! Read-only facade over the Oracle data dictionary.
//!
//! The [`OracleCatalog`] trait is the boundary between the translation /
//! planning core and the actual Oracle connection. Everything the core needs
//! is expressed as dictionary rows (string-typed, the way `DBA_TAB_COLUMNS`
//! and friends return them); parsing and interpretation happen on this side
//! of the boundary.
//!
//! # Thread Safety
//!
//! Implementations must be `Send + Sync`: the table-list planner shares one
//! catalog across its worker pool, and the chunk planner may run for several
//! tables concurrently.

use async_trait::async_trait;
use std::collections::HashMap;

use crate::error::Result;

#[cfg(test)]
pub(crate) mod testing;

/// One row of `DBA_TAB_COLUMNS` joined with comments and (12.2+) collation.
///
/// Numeric fields arrive as decimal strings with NULLs already normalized to
/// `"0"` (`NVL(DATA_PRECISION, 0)` etc.); the type mapper parses them and
/// reports `InvalidMetadata` on garbage.
#[derive(Debug, Clone, Default)]
pub struct ColumnRow {
    pub column_name: String,
    pub data_type: String,
    /// "Y" when the column allows NULL.
    pub nullable: String,
    pub comments: String,
    pub data_default: String,
    pub data_scale: String,
    pub data_precision: String,
    pub data_length: String,
    /// Column collation; empty when the source predates collation support.
    pub collation: String,
}

/// A primary- or unique-key constraint row. `column_list` is comma-separated.
#[derive(Debug, Clone)]
pub struct ConstraintRow {
    pub constraint_name: String,
    pub column_list: String,
}

/// A foreign-key constraint row.
#[derive(Debug, Clone)]
pub struct ForeignKeyRow {
    pub constraint_name: String,
    pub column_list: String,
    pub r_owner: String,
    pub r_table_name: String,
    pub r_column_list: String,
    /// Oracle delete rule: "", "NO ACTION", "CASCADE", "SET NULL", ...
    pub delete_rule: String,
}

/// A check-constraint row with its raw search condition.
#[derive(Debug, Clone)]
pub struct CheckKeyRow {
    pub constraint_name: String,
    pub search_condition: String,
}

/// One index definition from `DBA_INDEXES`/`DBA_IND_COLUMNS`.
///
/// `index_type` is the dictionary classification: NORMAL, FUNCTION-BASED
/// NORMAL, BITMAP, FUNCTION-BASED BITMAP, DOMAIN. Domain indexes carry the
/// indextype owner/name and parameter string.
#[derive(Debug, Clone, Default)]
pub struct IndexRow {
    pub table_name: String,
    pub index_name: String,
    /// "UNIQUE" or "NONUNIQUE".
    pub uniqueness: String,
    pub index_type: String,
    pub column_list: String,
    pub ityp_owner: String,
    pub ityp_name: String,
    pub parameters: String,
}

/// Row-count statistics for one table.
#[derive(Debug, Clone)]
pub struct TableStatistics {
    /// `NVL(NUM_ROWS, 0)` from `DBA_TABLES`.
    pub num_rows: i64,
    /// Whether the table is partitioned.
    pub is_partition: bool,
}

/// A `(start_rowid, end_rowid)` range generated by DBMS_PARALLEL_EXECUTE,
/// ordered by chunk id.
#[derive(Debug, Clone)]
pub struct RowidRange {
    pub start_rowid: String,
    pub end_rowid: String,
}

/// Read-only Oracle data-dictionary access plus the DBMS_PARALLEL_EXECUTE
/// task facility used by the chunk planner.
#[async_trait]
pub trait OracleCatalog: Send + Sync {
    /// Map of table name to table kind for a schema.
    async fn table_types(&self, schema: &str) -> Result<HashMap<String, String>>;

    /// Column rows for one table. When `collation_aware` is false the
    /// `collation` field is left empty (pre-12.2 sources).
    async fn columns(
        &self,
        schema: &str,
        table: &str,
        collation_aware: bool,
    ) -> Result<Vec<ColumnRow>>;

    /// Primary-key constraint rows. A well-formed table yields zero or one.
    async fn primary_keys(&self, schema: &str, table: &str) -> Result<Vec<ConstraintRow>>;

    /// Unique-key constraint rows.
    async fn unique_keys(&self, schema: &str, table: &str) -> Result<Vec<ConstraintRow>>;

    /// Foreign-key constraint rows.
    async fn foreign_keys(&self, schema: &str, table: &str) -> Result<Vec<ForeignKeyRow>>;

    /// Check-constraint rows.
    async fn check_keys(&self, schema: &str, table: &str) -> Result<Vec<CheckKeyRow>>;

    /// Non-unique index rows.
    async fn normal_indexes(&self, schema: &str, table: &str) -> Result<Vec<IndexRow>>;

    /// Unique index rows not backing a constraint.
    async fn unique_indexes(&self, schema: &str, table: &str) -> Result<Vec<IndexRow>>;

    /// Table comment, empty when absent.
    async fn table_comment(&self, schema: &str, table: &str) -> Result<String>;

    /// Default collation of a schema (12.2+).
    async fn schema_collation(&self, schema: &str) -> Result<String>;

    /// Per-table collation map; tables without an explicit collation fall
    /// back to `schema_collation`.
    async fn table_collations(
        &self,
        schema: &str,
        schema_collation: &str,
    ) -> Result<HashMap<String, String>>;

    /// Database character set, e.g. "AMERICAN_AMERICA.AL32UTF8".
    async fn db_character_set(&self) -> Result<String>;

    /// Database version string, e.g. "19.3.0.0.0".
    async fn db_version(&self) -> Result<String>;

    /// `NLS_SORT` session/database parameter.
    async fn nls_sort(&self) -> Result<String>;

    /// `NLS_COMP` session/database parameter.
    async fn nls_comp(&self) -> Result<String>;

    /// Current SCN, the consistent-read anchor for a sync run.
    async fn current_scn(&self) -> Result<i64>;

    /// Row-count statistics and partition flag for one table.
    async fn table_statistics(&self, schema: &str, table: &str) -> Result<TableStatistics>;

    /// Subset of `tables` that is partitioned.
    async fn filter_partitioned(&self, schema: &str, tables: &[String]) -> Result<Vec<String>>;

    /// Subset of `tables` that is temporary.
    async fn filter_temporary(&self, schema: &str, tables: &[String]) -> Result<Vec<String>>;

    /// Subset of `tables` that belongs to a cluster.
    async fn filter_clustered(&self, schema: &str, tables: &[String]) -> Result<Vec<String>>;

    /// Whether a DBMS_PARALLEL_EXECUTE task of this name already has chunk
    /// rows in `user_parallel_execute_chunks`.
    async fn has_chunk_task(&self, task_name: &str) -> Result<bool>;

    /// `DBMS_PARALLEL_EXECUTE.CREATE_TASK`.
    async fn create_chunk_task(&self, task_name: &str) -> Result<()>;

    /// `DBMS_PARALLEL_EXECUTE.CREATE_CHUNKS_BY_ROWID` with `by_row => TRUE`.
    async fn create_chunks_by_rowid(
        &self,
        task_name: &str,
        schema: &str,
        table: &str,
        chunk_size: usize,
    ) -> Result<()>;

    /// The generated ROWID ranges for a task, ordered by chunk id.
    async fn chunk_ranges(&self, task_name: &str) -> Result<Vec<RowidRange>>;

    /// `DBMS_PARALLEL_EXECUTE.DROP_TASK`.
    async fn drop_chunk_task(&self, task_name: &str) -> Result<()>;
}
