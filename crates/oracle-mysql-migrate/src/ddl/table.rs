//! Per-table CREATE TABLE assembly.
//!
//! A [`TablePlan`] carries everything the assembler needs to know about one
//! table: names on both sides, target dialect, collation inputs and the
//! table-option flags. [`TablePlan::generate`] pulls the dictionary rows,
//! runs the type mapper and constraint/index translators, and composes the
//! final DDL.

use tracing::{info, warn};

use super::collation::{mysql_collation, MYSQL_CHARACTER_SET};
use super::constraints;
use super::indexes;
use crate::catalog::OracleCatalog;
use crate::config::TargetDialect;
use crate::error::{MigrateError, Result};
use crate::rules::TableRules;
use crate::typemap::reverse_column_meta;

/// Target types TiDB clusters on when `alter-primary-key` is false and the
/// primary key is a single column.
const TIDB_INTEGER_PRIMARY_KEY_TYPES: [&str; 5] =
    ["TINYINT", "SMALLINT", "MEDIUMINT", "INT", "BIGINT"];

/// TiDB server variables consulted by the table-option policy.
///
/// `clustered_index` is the uppercased `tidb_enable_clustered_index` value
/// ("ON", "OFF", "INT_ONLY", or empty when unset); `alter_primary_key` comes
/// from the `alter-primary-key` key of `@@global.tidb_config`, `None` when
/// the key is absent.
#[derive(Debug, Clone, Default)]
pub struct TidbVariables {
    pub clustered_index: String,
    pub alter_primary_key: Option<bool>,
}

/// Everything known about one table before its DDL is generated.
#[derive(Debug, Clone)]
pub struct TablePlan {
    pub source_schema: String,
    pub source_table: String,
    pub target_schema: String,
    /// Explicit target name; empty means "same as source".
    pub target_table: String,
    pub dialect: TargetDialect,
    /// Table suffix options (TiDB only), e.g. "SHARD_ROW_ID_BITS = 4".
    pub table_option: String,
    pub overwrite: bool,
    /// Whether the source version supports table/column collation.
    pub oracle_collation: bool,
    pub schema_collation: String,
    pub table_collation: String,
    pub nls_sort: String,
    pub nls_comp: String,
    /// Dictionary table kind (e.g. "HEAP").
    pub table_kind: String,
}

/// Generated DDL for one table.
#[derive(Debug, Clone, Default)]
pub struct TableDdl {
    /// The CREATE TABLE statement.
    pub create_table: String,
    /// Standalone index statements the target may not support.
    pub compatibility_indexes: Vec<String>,
    /// ALTER TABLE … ADD CONSTRAINT … FOREIGN KEY statements.
    pub foreign_keys: Vec<String>,
    /// ALTER TABLE … ADD CONSTRAINT … CHECK statements.
    pub check_constraints: Vec<String>,
}

impl TablePlan {
    /// Effective target table name: the explicit target when set, otherwise
    /// the source name.
    pub fn target_table_name(&self) -> &str {
        if self.target_table.is_empty() {
            &self.source_table
        } else {
            &self.target_table
        }
    }

    /// Resolve the table collation.
    ///
    /// Collation-aware sources prefer the table collation and fall back to
    /// the schema collation; older sources derive it from `NLS_COMP`. Any
    /// value missing from the translation map is fatal for the table.
    pub fn resolve_collation(&self) -> Result<&'static str> {
        let oracle_value = if self.oracle_collation {
            if !self.table_collation.is_empty() {
                self.table_collation.as_str()
            } else if !self.schema_collation.is_empty() {
                self.schema_collation.as_str()
            } else {
                return Err(self.unsupported_collation("schema and table collation both empty"));
            }
        } else {
            self.nls_comp.as_str()
        };

        mysql_collation(oracle_value).ok_or_else(|| {
            self.unsupported_collation(format!("no MySQL collation for {:?}", oracle_value))
        })
    }

    /// Generate the full DDL set for this table.
    ///
    /// `tidb` must carry the server variables when the target dialect is
    /// TiDB; it is ignored for MySQL.
    pub async fn generate(
        &self,
        catalog: &dyn OracleCatalog,
        rules: &TableRules,
        tidb: Option<&TidbVariables>,
    ) -> Result<TableDdl> {
        let table_collation = self.resolve_collation()?;
        let target_table = self.target_table_name().to_uppercase();
        let target_schema = self.target_schema.to_uppercase();

        let unique_keys =
            constraints::unique_keys(&catalog.unique_keys(&self.source_schema, &self.source_table).await?);

        let normal_index_ddl = indexes::normal_indexes(
            &self.source_schema,
            &self.source_table,
            &target_schema,
            &target_table,
            &catalog
                .normal_indexes(&self.source_schema, &self.source_table)
                .await?,
        )?;

        let unique_index_ddl = indexes::unique_indexes(
            &self.source_schema,
            &self.source_table,
            &target_schema,
            &target_table,
            &catalog
                .unique_indexes(&self.source_schema, &self.source_table)
                .await?,
        )?;

        let primary_key = constraints::primary_key(
            &self.source_schema,
            &self.source_table,
            &catalog
                .primary_keys(&self.source_schema, &self.source_table)
                .await?,
        )?;

        let columns = catalog
            .columns(&self.source_schema, &self.source_table, self.oracle_collation)
            .await?;

        let mut column_metas = Vec::with_capacity(columns.len());
        let mut single_pk_is_integer = false;
        let single_pk_column = match &primary_key {
            Some(pk) if pk.columns.len() == 1 => Some(pk.columns[0].clone()),
            _ => None,
        };

        for column in &columns {
            let meta =
                reverse_column_meta(&self.source_schema, &self.source_table, column, rules)?;

            if let Some(pk_column) = &single_pk_column {
                if *pk_column == format!("`{}`", column.column_name.to_uppercase()) {
                    single_pk_is_integer = column_type_is_integer(&meta);
                }
            }

            column_metas.push(meta);
        }

        let table_comment = catalog
            .table_comment(&self.source_schema, &self.source_table)
            .await?;

        let mut table_metas = column_metas;
        if let Some(pk) = &primary_key {
            table_metas.push(pk.fragment.clone());
        }
        table_metas.extend(unique_keys);
        table_metas.extend(normal_index_ddl.inline);
        table_metas.extend(unique_index_ddl.inline);
        let table_meta = table_metas.join(",\n");

        let pk_column_count = primary_key.as_ref().map_or(0, |pk| pk.columns.len());
        let with_options =
            self.table_option_enabled(tidb, pk_column_count, single_pk_is_integer)?;

        let mut create_table = format!(
            "CREATE TABLE `{}`.`{}` (\n{}\n) ENGINE=InnoDB DEFAULT CHARSET={} COLLATE={}",
            target_schema,
            target_table,
            table_meta,
            MYSQL_CHARACTER_SET.to_lowercase(),
            table_collation
        );
        if with_options {
            create_table.push(' ');
            create_table.push_str(&self.table_option.to_uppercase());
        }
        if !table_comment.is_empty() {
            create_table.push_str(&format!(" COMMENT='{}'", table_comment));
        }
        create_table.push(';');

        info!(
            schema = %self.source_schema,
            table = %self.source_table,
            sql = %create_table,
            "reverse oracle table struct"
        );

        let foreign_keys = constraints::foreign_keys(
            &catalog
                .foreign_keys(&self.source_schema, &self.source_table)
                .await?,
        )
        .into_iter()
        .map(|clause| format!("ALTER TABLE `{}`.`{}` ADD {};", target_schema, target_table, clause))
        .collect();

        let check_constraints = constraints::check_constraints(
            &catalog
                .check_keys(&self.source_schema, &self.source_table)
                .await?,
        )
        .into_iter()
        .map(|clause| format!("ALTER TABLE `{}`.`{}` ADD {};", target_schema, target_table, clause))
        .collect();

        let mut compatibility_indexes = normal_index_ddl.compatibility;
        compatibility_indexes.extend(unique_index_ddl.compatibility);

        Ok(TableDdl {
            create_table,
            compatibility_indexes,
            foreign_keys,
            check_constraints,
        })
    }

    /// Decide whether the table-option suffix is emitted.
    ///
    /// MySQL never takes options. TiDB consults
    /// `tidb_enable_clustered_index`: OFF keeps the options, ON drops them
    /// (the clustered layout replaces sharding options), and for the
    /// int-only/unset value the decision falls to `alter-primary-key` — a
    /// single integer primary key with `alter-primary-key = false` clusters
    /// implicitly, so options are dropped there too.
    fn table_option_enabled(
        &self,
        tidb: Option<&TidbVariables>,
        pk_column_count: usize,
        single_pk_is_integer: bool,
    ) -> Result<bool> {
        if self.dialect == TargetDialect::Mysql || self.table_option.is_empty() {
            return Ok(false);
        }

        let vars = tidb.cloned().unwrap_or_default();
        match vars.clustered_index.to_uppercase().as_str() {
            "OFF" => Ok(true),
            "ON" => {
                warn!(
                    schema = %self.source_schema,
                    table = %self.source_table,
                    "tidb_enable_clustered_index is on, table-option would be disabled"
                );
                Ok(false)
            }
            other => match vars.alter_primary_key {
                None => {
                    warn!(
                        schema = %self.source_schema,
                        table = %self.source_table,
                        tidb_enable_clustered_index = other,
                        "alter-primary-key isn't set, table-option would be disabled"
                    );
                    Ok(false)
                }
                Some(alter_pk) => {
                    if !alter_pk && pk_column_count == 1 && single_pk_is_integer {
                        warn!(
                            schema = %self.source_schema,
                            table = %self.source_table,
                            "integer primary key, table-option would be disabled"
                        );
                        Ok(false)
                    } else if alter_pk || pk_column_count != 1 || !single_pk_is_integer {
                        Ok(true)
                    } else {
                        Err(MigrateError::UnsupportedTableOption {
                            schema: self.source_schema.clone(),
                            table: self.source_table.clone(),
                            clustered_index: other.to_string(),
                        })
                    }
                }
            },
        }
    }

    fn unsupported_collation(&self, detail: impl Into<String>) -> MigrateError {
        MigrateError::UnsupportedCollation {
            schema: self.source_schema.clone(),
            table: self.source_table.clone(),
            detail: detail.into(),
        }
    }
}

/// Whether a column fragment's type token is one of the integer families
/// TiDB can cluster on. The fragment looks like `` `NAME` TYPE … ``.
fn column_type_is_integer(column_meta: &str) -> bool {
    let column_type = column_meta
        .split_whitespace()
        .nth(1)
        .unwrap_or_default()
        .to_uppercase();
    TIDB_INTEGER_PRIMARY_KEY_TYPES
        .iter()
        .any(|integer_type| column_type.contains(integer_type))
}
