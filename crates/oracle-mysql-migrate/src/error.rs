//! Error types for the migration library.

use thiserror::Error;

/// Main error type for migration operations.
#[derive(Error, Debug)]
pub enum MigrateError {
    /// Configuration error (invalid YAML, missing fields, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// A numeric dictionary field (precision/scale/length) could not be parsed.
    #[error("Invalid metadata for {schema}.{table}: column field {field} = {value:?} is not numeric")]
    InvalidMetadata {
        schema: String,
        table: String,
        field: &'static str,
        value: String,
    },

    /// Oracle collation or database character set absent from the translation map.
    #[error("Unsupported collation for {schema}.{table}: {detail}")]
    UnsupportedCollation {
        schema: String,
        table: String,
        detail: String,
    },

    /// Source database character set absent from the supported map.
    #[error("Unsupported Oracle character set: {0}")]
    UnsupportedCharacterSet(String),

    /// Index type outside the documented set.
    #[error("Unsupported index type {index_type:?} for index {index} on {schema}.{table}")]
    UnsupportedIndex {
        schema: String,
        table: String,
        index: String,
        index_type: String,
    },

    /// The catalog returned more than one primary key for a table.
    #[error("Table {schema}.{table} has multiple primary keys")]
    MultiplePk { schema: String, table: String },

    /// The TiDB table-option policy matrix reached a dead end.
    #[error("Table option not supported for {schema}.{table} (tidb_enable_clustered_index = {clustered_index:?})")]
    UnsupportedTableOption {
        schema: String,
        table: String,
        clustered_index: String,
    },

    /// Oracle data-dictionary read failed.
    #[error("Catalog error: {message}\n  Context: {context}")]
    Catalog { message: String, context: String },

    /// Sync-metadata store read or write failed.
    #[error("Store error: {message}\n  Context: {context}")]
    Store { message: String, context: String },

    /// IO error (file operations)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML serialization/deserialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Operation was cancelled (SIGINT, etc.)
    #[error("Migration cancelled")]
    Cancelled,
}

impl MigrateError {
    /// Create a Catalog error with context about where it occurred.
    pub fn catalog(message: impl Into<String>, context: impl Into<String>) -> Self {
        MigrateError::Catalog {
            message: message.into(),
            context: context.into(),
        }
    }

    /// Create a Store error with context about where it occurred.
    pub fn store(message: impl Into<String>, context: impl Into<String>) -> Self {
        MigrateError::Store {
            message: message.into(),
            context: context.into(),
        }
    }

    /// Create an InvalidMetadata error for a dictionary field.
    pub fn invalid_metadata(
        schema: impl Into<String>,
        table: impl Into<String>,
        field: &'static str,
        value: impl Into<String>,
    ) -> Self {
        MigrateError::InvalidMetadata {
            schema: schema.into(),
            table: table.into(),
            field,
            value: value.into(),
        }
    }

    /// Format error with full details including error chain.
    pub fn format_detailed(&self) -> String {
        let mut output = format!("Error: {}\n", self);

        let mut source = std::error::Error::source(self);
        let mut depth = 1;
        while let Some(err) = source {
            output.push_str(&format!("\nCaused by:\n  {}: {}", depth, err));
            source = err.source();
            depth += 1;
        }

        output
    }
}

/// Result type alias for migration operations.
pub type Result<T> = std::result::Result<T, MigrateError>;
