//! User-defined type and default-value mapping rules.
//!
//! Rules override the built-in Oracle→MySQL type map at three scopes, most
//! specific first: column, table, schema. A rule with an empty target type
//! means "no override". Default-value rules rewrite source default
//! expressions case-insensitively.
//!
//! The [`RuleStore`] trait abstracts where rules are persisted; the planner
//! loads one [`TableRules`] bundle per table and hands read-only slices to
//! the type mapper.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Mutex;

use crate::error::Result;

/// Column-scope rule: matches by column name and source type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnRule {
    pub source_column_name: String,
    /// Rendered source type, e.g. "NUMBER(10,2)" or "VARCHAR2(500)".
    pub source_column_type: String,
    pub target_column_type: String,
}

/// Table-scope rule: matches every column of the table by source type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableRule {
    pub source_column_type: String,
    pub target_column_type: String,
}

/// Schema-scope rule: matches every column of the schema by source type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaRule {
    pub source_column_type: String,
    pub target_column_type: String,
}

/// Default-expression rewrite, compared case-insensitively.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultValueRule {
    pub source_default_value: String,
    pub target_default_value: String,
}

/// Persisted rule access, keyed by schema and table.
#[async_trait]
pub trait RuleStore: Send + Sync {
    async fn column_rules(&self, schema: &str, table: &str) -> Result<Vec<ColumnRule>>;

    async fn table_rules(&self, schema: &str, table: &str) -> Result<Vec<TableRule>>;

    async fn schema_rules(&self, schema: &str) -> Result<Vec<SchemaRule>>;

    async fn default_rules(&self) -> Result<Vec<DefaultValueRule>>;
}

/// The rule slices applying to a single table, read-only after load.
#[derive(Debug, Clone, Default)]
pub struct TableRules {
    pub column: Vec<ColumnRule>,
    pub table: Vec<TableRule>,
    pub schema: Vec<SchemaRule>,
    pub defaults: Vec<DefaultValueRule>,
}

impl TableRules {
    /// Load every scope for one table from a rule store.
    pub async fn load(store: &dyn RuleStore, schema: &str, table: &str) -> Result<Self> {
        Ok(Self {
            column: store.column_rules(schema, table).await?,
            table: store.table_rules(schema, table).await?,
            schema: store.schema_rules(schema).await?,
            defaults: store.default_rules().await?,
        })
    }
}

/// In-memory rule store, loaded from configuration or built up in tests.
#[derive(Debug, Default)]
pub struct MemoryRuleStore {
    inner: Mutex<MemoryRules>,
}

#[derive(Debug, Default)]
struct MemoryRules {
    /// (SCHEMA, TABLE) → column rules.
    column: HashMap<(String, String), Vec<ColumnRule>>,
    /// (SCHEMA, TABLE) → table rules.
    table: HashMap<(String, String), Vec<TableRule>>,
    /// SCHEMA → schema rules.
    schema: HashMap<String, Vec<SchemaRule>>,
    defaults: Vec<DefaultValueRule>,
}

impl MemoryRuleStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_column_rule(&self, schema: &str, table: &str, rule: ColumnRule) {
        let mut inner = self.inner.lock().unwrap();
        inner
            .column
            .entry((schema.to_uppercase(), table.to_uppercase()))
            .or_default()
            .push(rule);
    }

    pub fn add_table_rule(&self, schema: &str, table: &str, rule: TableRule) {
        let mut inner = self.inner.lock().unwrap();
        inner
            .table
            .entry((schema.to_uppercase(), table.to_uppercase()))
            .or_default()
            .push(rule);
    }

    pub fn add_schema_rule(&self, schema: &str, rule: SchemaRule) {
        let mut inner = self.inner.lock().unwrap();
        inner
            .schema
            .entry(schema.to_uppercase())
            .or_default()
            .push(rule);
    }

    pub fn add_default_rule(&self, rule: DefaultValueRule) {
        self.inner.lock().unwrap().defaults.push(rule);
    }
}

#[async_trait]
impl RuleStore for MemoryRuleStore {
    async fn column_rules(&self, schema: &str, table: &str) -> Result<Vec<ColumnRule>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .column
            .get(&(schema.to_uppercase(), table.to_uppercase()))
            .cloned()
            .unwrap_or_default())
    }

    async fn table_rules(&self, schema: &str, table: &str) -> Result<Vec<TableRule>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .table
            .get(&(schema.to_uppercase(), table.to_uppercase()))
            .cloned()
            .unwrap_or_default())
    }

    async fn schema_rules(&self, schema: &str) -> Result<Vec<SchemaRule>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .schema
            .get(&schema.to_uppercase())
            .cloned()
            .unwrap_or_default())
    }

    async fn default_rules(&self) -> Result<Vec<DefaultValueRule>> {
        Ok(self.inner.lock().unwrap().defaults.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_store_scopes_are_keyed_case_insensitively() {
        let store = MemoryRuleStore::new();
        store.add_schema_rule(
            "marvin",
            SchemaRule {
                source_column_type: "VARCHAR2(500)".into(),
                target_column_type: "TEXT".into(),
            },
        );

        let rules = TableRules::load(&store, "MARVIN", "T1").await.unwrap();
        assert_eq!(rules.schema.len(), 1);
        assert!(rules.column.is_empty());
        assert!(rules.table.is_empty());
    }

    #[tokio::test]
    async fn test_table_rules_scoped_to_table() {
        let store = MemoryRuleStore::new();
        store.add_table_rule(
            "MARVIN",
            "T1",
            TableRule {
                source_column_type: "DATE".into(),
                target_column_type: "TIMESTAMP".into(),
            },
        );

        let hit = TableRules::load(&store, "MARVIN", "T1").await.unwrap();
        let miss = TableRules::load(&store, "MARVIN", "T2").await.unwrap();
        assert_eq!(hit.table.len(), 1);
        assert!(miss.table.is_empty());
    }
}
