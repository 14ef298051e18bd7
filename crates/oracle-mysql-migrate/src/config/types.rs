//! Configuration type definitions.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Source database configuration (Oracle).
    pub oracle: OracleConfig,

    /// Target database configuration (MySQL or TiDB).
    pub mysql: MysqlConfig,

    /// Migration behavior configuration.
    #[serde(default)]
    pub migration: MigrationConfig,
}

/// Source database (Oracle) configuration.
#[derive(Clone, Serialize, Deserialize)]
pub struct OracleConfig {
    /// Database host.
    pub host: String,

    /// Database port (default: 1521).
    #[serde(default = "default_oracle_port")]
    pub port: u16,

    /// Service name used to connect.
    pub service_name: String,

    /// Username.
    pub user: String,

    /// Password.
    pub password: String,

    /// Source schema whose tables are migrated.
    pub schema: String,
}

impl fmt::Debug for OracleConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OracleConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("service_name", &self.service_name)
            .field("user", &self.user)
            .field("password", &"[REDACTED]")
            .field("schema", &self.schema)
            .finish()
    }
}

/// Target database (MySQL/TiDB) configuration.
#[derive(Clone, Serialize, Deserialize)]
pub struct MysqlConfig {
    /// Target dialect (default: mysql).
    #[serde(default)]
    pub dialect: TargetDialect,

    /// Database host.
    pub host: String,

    /// Database port (default: 3306).
    #[serde(default = "default_mysql_port")]
    pub port: u16,

    /// Username.
    pub user: String,

    /// Password.
    pub password: String,

    /// Target schema receiving the translated tables.
    pub schema: String,

    /// Schema holding the sync-metadata tables (default: "_oracle_mysql_migrate").
    #[serde(default = "default_meta_schema")]
    pub meta_schema: String,

    /// Table suffix options appended to CREATE TABLE for TiDB
    /// (e.g. "SHARD_ROW_ID_BITS = 4 PRE_SPLIT_REGIONS = 4").
    #[serde(default)]
    pub table_option: String,

    /// Drop and recreate target tables that already exist.
    #[serde(default)]
    pub overwrite: bool,
}

impl fmt::Debug for MysqlConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MysqlConfig")
            .field("dialect", &self.dialect)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"[REDACTED]")
            .field("schema", &self.schema)
            .field("meta_schema", &self.meta_schema)
            .field("table_option", &self.table_option)
            .field("overwrite", &self.overwrite)
            .finish()
    }
}

/// Target database dialect.
///
/// TiDB shares the MySQL wire protocol but adds clustered-index rules that
/// change whether table options may be emitted at create time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TargetDialect {
    #[default]
    Mysql,
    Tidb,
}

impl TargetDialect {
    pub fn as_str(&self) -> &'static str {
        match self {
            TargetDialect::Mysql => "MYSQL",
            TargetDialect::Tidb => "TIDB",
        }
    }
}

/// Synchronization mode for a migration run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SyncMode {
    /// One-shot full copy.
    #[default]
    Full,
    /// Log-mining increment only (requires a prior full sync).
    Increment,
    /// Full copy followed by increment.
    All,
}

impl SyncMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncMode::Full => "FULL",
            SyncMode::Increment => "INCREMENT",
            SyncMode::All => "ALL",
        }
    }
}

impl fmt::Display for SyncMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Migration behavior configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationConfig {
    /// Number of parallel planner workers (default: 8).
    #[serde(default = "default_threads")]
    pub threads: usize,

    /// Rows per ROWID chunk handed to DBMS_PARALLEL_EXECUTE (default: 100000).
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Maximum FullSyncMeta rows written per INSERT batch (default: 500).
    #[serde(default = "default_insert_batch_size")]
    pub insert_batch_size: usize,

    /// Sync mode for this run (default: full).
    #[serde(default)]
    pub sync_mode: SyncMode,
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            threads: default_threads(),
            chunk_size: default_chunk_size(),
            insert_batch_size: default_insert_batch_size(),
            sync_mode: SyncMode::default(),
        }
    }
}

fn default_oracle_port() -> u16 {
    1521
}

fn default_mysql_port() -> u16 {
    3306
}

fn default_meta_schema() -> String {
    "_oracle_mysql_migrate".to_string()
}

fn default_threads() -> usize {
    8
}

fn default_chunk_size() -> usize {
    100_000
}

fn default_insert_batch_size() -> usize {
    500
}
