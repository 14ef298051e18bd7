//! Configurable in-memory catalog for unit tests.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use super::{
    CheckKeyRow, ColumnRow, ConstraintRow, ForeignKeyRow, IndexRow, OracleCatalog, RowidRange,
    TableStatistics,
};
use crate::error::Result;

/// Stub [`OracleCatalog`] whose answers are set up per test. Parallel-execute
/// calls are recorded in an operation log so idempotency can be asserted.
#[derive(Default)]
pub struct StubCatalog {
    inner: Mutex<StubState>,
}

#[derive(Default)]
struct StubState {
    table_types: HashMap<String, String>,
    columns: HashMap<String, Vec<ColumnRow>>,
    primary_keys: HashMap<String, Vec<ConstraintRow>>,
    unique_keys: HashMap<String, Vec<ConstraintRow>>,
    foreign_keys: HashMap<String, Vec<ForeignKeyRow>>,
    check_keys: HashMap<String, Vec<CheckKeyRow>>,
    normal_indexes: HashMap<String, Vec<IndexRow>>,
    unique_indexes: HashMap<String, Vec<IndexRow>>,
    table_comments: HashMap<String, String>,
    schema_collation: String,
    table_collations: HashMap<String, String>,
    character_set: String,
    version: String,
    nls_sort: String,
    nls_comp: String,
    scn: i64,
    statistics: HashMap<String, TableStatistics>,
    partitioned: Vec<String>,
    temporary: Vec<String>,
    clustered: Vec<String>,
    chunk_ranges: Vec<RowidRange>,
    populated_tasks: HashSet<String>,
    ops: Vec<String>,
}

impl StubCatalog {
    pub fn new() -> Self {
        let stub = Self::default();
        {
            let mut state = stub.inner.lock().unwrap();
            state.character_set = "AMERICAN_AMERICA.AL32UTF8".to_string();
            state.version = "19.3.0.0.0".to_string();
            state.nls_sort = "BINARY".to_string();
            state.nls_comp = "BINARY".to_string();
            state.scn = 73_344_001;
        }
        stub
    }

    pub fn set_table_types(&self, types: HashMap<String, String>) {
        self.inner.lock().unwrap().table_types = types;
    }

    pub fn set_columns(&self, table: &str, rows: Vec<ColumnRow>) {
        self.inner.lock().unwrap().columns.insert(table.to_string(), rows);
    }

    pub fn set_primary_keys(&self, table: &str, rows: Vec<ConstraintRow>) {
        self.inner.lock().unwrap().primary_keys.insert(table.to_string(), rows);
    }

    pub fn set_unique_keys(&self, table: &str, rows: Vec<ConstraintRow>) {
        self.inner.lock().unwrap().unique_keys.insert(table.to_string(), rows);
    }

    pub fn set_foreign_keys(&self, table: &str, rows: Vec<ForeignKeyRow>) {
        self.inner.lock().unwrap().foreign_keys.insert(table.to_string(), rows);
    }

    pub fn set_check_keys(&self, table: &str, rows: Vec<CheckKeyRow>) {
        self.inner.lock().unwrap().check_keys.insert(table.to_string(), rows);
    }

    pub fn set_normal_indexes(&self, table: &str, rows: Vec<IndexRow>) {
        self.inner.lock().unwrap().normal_indexes.insert(table.to_string(), rows);
    }

    pub fn set_unique_indexes(&self, table: &str, rows: Vec<IndexRow>) {
        self.inner.lock().unwrap().unique_indexes.insert(table.to_string(), rows);
    }

    pub fn set_table_comment(&self, table: &str, comment: &str) {
        self.inner
            .lock()
            .unwrap()
            .table_comments
            .insert(table.to_string(), comment.to_string());
    }

    pub fn set_schema_collation(&self, collation: &str) {
        self.inner.lock().unwrap().schema_collation = collation.to_string();
    }

    pub fn set_table_collation(&self, table: &str, collation: &str) {
        self.inner
            .lock()
            .unwrap()
            .table_collations
            .insert(table.to_string(), collation.to_string());
    }

    pub fn set_character_set(&self, character_set: &str) {
        self.inner.lock().unwrap().character_set = character_set.to_string();
    }

    pub fn set_version(&self, version: &str) {
        self.inner.lock().unwrap().version = version.to_string();
    }

    pub fn set_scn(&self, scn: i64) {
        self.inner.lock().unwrap().scn = scn;
    }

    pub fn set_statistics(&self, table: &str, stats: TableStatistics) {
        self.inner.lock().unwrap().statistics.insert(table.to_string(), stats);
    }

    pub fn set_partitioned(&self, tables: Vec<String>) {
        self.inner.lock().unwrap().partitioned = tables;
    }

    pub fn set_temporary(&self, tables: Vec<String>) {
        self.inner.lock().unwrap().temporary = tables;
    }

    pub fn set_clustered(&self, tables: Vec<String>) {
        self.inner.lock().unwrap().clustered = tables;
    }

    pub fn set_chunk_ranges(&self, ranges: Vec<RowidRange>) {
        self.inner.lock().unwrap().chunk_ranges = ranges;
    }

    /// Mark a parallel-execute task as left over from a previous run.
    pub fn leave_populated_task(&self, task_name: &str) {
        self.inner.lock().unwrap().populated_tasks.insert(task_name.to_string());
    }

    /// The recorded parallel-execute operations, in call order.
    pub fn operations(&self) -> Vec<String> {
        self.inner.lock().unwrap().ops.clone()
    }
}

#[async_trait]
impl OracleCatalog for StubCatalog {
    async fn table_types(&self, _schema: &str) -> Result<HashMap<String, String>> {
        Ok(self.inner.lock().unwrap().table_types.clone())
    }

    async fn columns(
        &self,
        _schema: &str,
        table: &str,
        _collation_aware: bool,
    ) -> Result<Vec<ColumnRow>> {
        Ok(self.inner.lock().unwrap().columns.get(table).cloned().unwrap_or_default())
    }

    async fn primary_keys(&self, _schema: &str, table: &str) -> Result<Vec<ConstraintRow>> {
        Ok(self.inner.lock().unwrap().primary_keys.get(table).cloned().unwrap_or_default())
    }

    async fn unique_keys(&self, _schema: &str, table: &str) -> Result<Vec<ConstraintRow>> {
        Ok(self.inner.lock().unwrap().unique_keys.get(table).cloned().unwrap_or_default())
    }

    async fn foreign_keys(&self, _schema: &str, table: &str) -> Result<Vec<ForeignKeyRow>> {
        Ok(self.inner.lock().unwrap().foreign_keys.get(table).cloned().unwrap_or_default())
    }

    async fn check_keys(&self, _schema: &str, table: &str) -> Result<Vec<CheckKeyRow>> {
        Ok(self.inner.lock().unwrap().check_keys.get(table).cloned().unwrap_or_default())
    }

    async fn normal_indexes(&self, _schema: &str, table: &str) -> Result<Vec<IndexRow>> {
        Ok(self.inner.lock().unwrap().normal_indexes.get(table).cloned().unwrap_or_default())
    }

    async fn unique_indexes(&self, _schema: &str, table: &str) -> Result<Vec<IndexRow>> {
        Ok(self.inner.lock().unwrap().unique_indexes.get(table).cloned().unwrap_or_default())
    }

    async fn table_comment(&self, _schema: &str, table: &str) -> Result<String> {
        Ok(self.inner.lock().unwrap().table_comments.get(table).cloned().unwrap_or_default())
    }

    async fn schema_collation(&self, _schema: &str) -> Result<String> {
        Ok(self.inner.lock().unwrap().schema_collation.clone())
    }

    async fn table_collations(
        &self,
        _schema: &str,
        _schema_collation: &str,
    ) -> Result<HashMap<String, String>> {
        Ok(self.inner.lock().unwrap().table_collations.clone())
    }

    async fn db_character_set(&self) -> Result<String> {
        Ok(self.inner.lock().unwrap().character_set.clone())
    }

    async fn db_version(&self) -> Result<String> {
        Ok(self.inner.lock().unwrap().version.clone())
    }

    async fn nls_sort(&self) -> Result<String> {
        Ok(self.inner.lock().unwrap().nls_sort.clone())
    }

    async fn nls_comp(&self) -> Result<String> {
        Ok(self.inner.lock().unwrap().nls_comp.clone())
    }

    async fn current_scn(&self) -> Result<i64> {
        Ok(self.inner.lock().unwrap().scn)
    }

    async fn table_statistics(&self, _schema: &str, table: &str) -> Result<TableStatistics> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .statistics
            .get(table)
            .cloned()
            .unwrap_or(TableStatistics {
                num_rows: 0,
                is_partition: false,
            }))
    }

    async fn filter_partitioned(&self, _schema: &str, tables: &[String]) -> Result<Vec<String>> {
        let state = self.inner.lock().unwrap();
        Ok(tables.iter().filter(|t| state.partitioned.contains(*t)).cloned().collect())
    }

    async fn filter_temporary(&self, _schema: &str, tables: &[String]) -> Result<Vec<String>> {
        let state = self.inner.lock().unwrap();
        Ok(tables.iter().filter(|t| state.temporary.contains(*t)).cloned().collect())
    }

    async fn filter_clustered(&self, _schema: &str, tables: &[String]) -> Result<Vec<String>> {
        let state = self.inner.lock().unwrap();
        Ok(tables.iter().filter(|t| state.clustered.contains(*t)).cloned().collect())
    }

    async fn has_chunk_task(&self, task_name: &str) -> Result<bool> {
        Ok(self.inner.lock().unwrap().populated_tasks.contains(task_name))
    }

    async fn create_chunk_task(&self, task_name: &str) -> Result<()> {
        let mut state = self.inner.lock().unwrap();
        state.ops.push(format!("create_task:{}", task_name));
        Ok(())
    }

    async fn create_chunks_by_rowid(
        &self,
        task_name: &str,
        _schema: &str,
        _table: &str,
        chunk_size: usize,
    ) -> Result<()> {
        let mut state = self.inner.lock().unwrap();
        state.ops.push(format!("create_chunks:{}:{}", task_name, chunk_size));
        Ok(())
    }

    async fn chunk_ranges(&self, _task_name: &str) -> Result<Vec<RowidRange>> {
        Ok(self.inner.lock().unwrap().chunk_ranges.clone())
    }

    async fn drop_chunk_task(&self, task_name: &str) -> Result<()> {
        let mut state = self.inner.lock().unwrap();
        state.populated_tasks.remove(task_name);
        state.ops.push(format!("drop_task:{}", task_name));
        Ok(())
    }
}
