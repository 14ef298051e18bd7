//! Oracle to MySQL column type mapping and column-meta assembly.
//!
//! Each dictionary column row is turned into a full column fragment of the
//! form `` `NAME` TYPE [NOT NULL] [DEFAULT x] [COMMENT c] ``. The built-in
//! type map can be overridden per column, per table, or per schema through
//! the [`rules`](crate::rules) module; precedence is strictly
//! column > table > schema, short-circuiting at the first override that
//! differs from the built-in result.

use crate::catalog::ColumnRow;
use crate::error::{MigrateError, Result};
use crate::rules::{ColumnRule, DefaultValueRule, SchemaRule, TableRule, TableRules};

/// Translate one dictionary column row into a target column fragment.
///
/// `schema`/`table` are only used for error context. Numeric dictionary
/// fields must parse as integers (the catalog NVLs NULLs to "0"); anything
/// else is an [`MigrateError::InvalidMetadata`].
pub fn reverse_column_meta(
    schema: &str,
    table: &str,
    row: &ColumnRow,
    rules: &TableRules,
) -> Result<String> {
    let data_length = parse_dict_int(schema, table, "DATA_LENGTH", &row.data_length)?;
    let data_precision = parse_dict_int(schema, table, "DATA_PRECISION", &row.data_precision)?;
    let data_scale = parse_dict_int(schema, table, "DATA_SCALE", &row.data_scale)?;

    let (origin_type, builtin_type) =
        builtin_column_type(&row.data_type, data_length, data_precision, data_scale);

    let column_type = resolve_column_type(&row.column_name, &origin_type, &builtin_type, rules);

    Ok(assemble_column_meta(
        &row.column_name,
        &column_type,
        &row.nullable,
        &row.comments,
        &row.data_default,
        &rules.defaults,
    ))
}

fn parse_dict_int(schema: &str, table: &str, field: &'static str, value: &str) -> Result<i64> {
    value
        .trim()
        .parse::<i64>()
        .map_err(|_| MigrateError::invalid_metadata(schema, table, field, value))
}

/// Built-in mapping from an Oracle type to `(origin_type, builtin_type)`.
///
/// `origin_type` is the rendered source type used for rule matching (e.g.
/// "NUMBER(10,2)"); `builtin_type` is the default target type used when no
/// rule overrides it.
fn builtin_column_type(
    data_type: &str,
    data_length: i64,
    data_precision: i64,
    data_scale: i64,
) -> (String, String) {
    match data_type.to_uppercase().as_str() {
        "NUMBER" => {
            if data_scale > 0 {
                (
                    format!("NUMBER({},{})", data_precision, data_scale),
                    format!("DECIMAL({},{})", data_precision, data_scale),
                )
            } else {
                match data_precision {
                    0 => ("NUMBER".to_string(), "DECIMAL(65,30)".to_string()),
                    1..=2 => (format!("NUMBER({})", data_precision), "TINYINT".to_string()),
                    3..=4 => (
                        format!("NUMBER({})", data_precision),
                        "SMALLINT".to_string(),
                    ),
                    5..=8 => (format!("NUMBER({})", data_precision), "INT".to_string()),
                    9..=18 => (format!("NUMBER({})", data_precision), "BIGINT".to_string()),
                    19..=38 => (
                        format!("NUMBER({})", data_precision),
                        format!("DECIMAL({})", data_precision),
                    ),
                    _ => (
                        format!("NUMBER({})", data_precision),
                        format!("DECIMAL({},4)", data_precision),
                    ),
                }
            }
        }
        "BFILE" => ("BFILE".to_string(), "VARCHAR(255)".to_string()),
        "CHAR" => {
            let origin = format!("CHAR({})", data_length);
            if data_length < 256 {
                (origin.clone(), origin)
            } else {
                (origin, format!("VARCHAR({})", data_length))
            }
        }
        "CHARACTER" => {
            let origin = format!("CHARACTER({})", data_length);
            if data_length < 256 {
                (origin.clone(), origin)
            } else {
                (origin, format!("VARCHAR({})", data_length))
            }
        }
        "CLOB" => ("CLOB".to_string(), "LONGTEXT".to_string()),
        "BLOB" => ("BLOB".to_string(), "BLOB".to_string()),
        "DATE" => ("DATE".to_string(), "DATETIME".to_string()),
        "DECIMAL" | "DEC" => {
            if data_precision == 0 && data_scale == 0 {
                ("DECIMAL".to_string(), "DECIMAL".to_string())
            } else {
                let rendered = format!("DECIMAL({},{})", data_precision, data_scale);
                (rendered.clone(), rendered)
            }
        }
        "DOUBLE PRECISION" => (
            "DOUBLE PRECISION".to_string(),
            "DOUBLE PRECISION".to_string(),
        ),
        "FLOAT" => {
            if data_precision == 0 {
                ("FLOAT".to_string(), "FLOAT".to_string())
            } else {
                ("FLOAT".to_string(), "DOUBLE".to_string())
            }
        }
        "INTEGER" | "INT" => ("INTEGER".to_string(), "INT".to_string()),
        "LONG" => ("LONG".to_string(), "LONGTEXT".to_string()),
        "LONG RAW" => ("LONG RAW".to_string(), "LONGBLOB".to_string()),
        "BINARY_FLOAT" => ("BINARY_FLOAT".to_string(), "DOUBLE".to_string()),
        "BINARY_DOUBLE" => ("BINARY_DOUBLE".to_string(), "DOUBLE".to_string()),
        "NCHAR" => {
            let origin = format!("NCHAR({})", data_length);
            if data_length < 256 {
                (origin.clone(), origin)
            } else {
                (origin, format!("NVARCHAR({})", data_length))
            }
        }
        "NCHAR VARYING" => (
            "NCHAR VARYING".to_string(),
            format!("NCHAR VARYING({})", data_length),
        ),
        "NCLOB" => ("NCLOB".to_string(), "TEXT".to_string()),
        "NUMERIC" => {
            let rendered = format!("NUMERIC({},{})", data_precision, data_scale);
            (rendered.clone(), rendered)
        }
        "NVARCHAR2" => (
            format!("NVARCHAR2({})", data_length),
            format!("NVARCHAR({})", data_length),
        ),
        "RAW" => {
            let origin = format!("RAW({})", data_length);
            if data_length < 256 {
                (origin, format!("BINARY({})", data_length))
            } else {
                (origin, format!("VARBINARY({})", data_length))
            }
        }
        "REAL" => ("REAL".to_string(), "DOUBLE".to_string()),
        "ROWID" => ("ROWID".to_string(), "CHAR(10)".to_string()),
        "SMALLINT" => ("SMALLINT".to_string(), "DECIMAL(38)".to_string()),
        "UROWID" => (
            "UROWID".to_string(),
            format!("VARCHAR({})", data_length),
        ),
        "VARCHAR2" => (
            format!("VARCHAR2({})", data_length),
            format!("VARCHAR({})", data_length),
        ),
        "VARCHAR" => {
            let rendered = format!("VARCHAR({})", data_length);
            (rendered.clone(), rendered)
        }
        "XMLTYPE" => ("XMLTYPE".to_string(), "LONGTEXT".to_string()),
        upper => {
            // Interval and timestamp families carry qualifiers in the type
            // name itself (e.g. "TIMESTAMP(6) WITH TIME ZONE").
            if upper.contains("INTERVAL") {
                (upper.to_string(), "VARCHAR(30)".to_string())
            } else if upper.contains("TIMESTAMP") {
                let scale = if data_scale <= 6 { data_scale } else { 6 };
                if upper.contains("WITH TIME ZONE") || upper.contains("WITH LOCAL TIME ZONE") {
                    (upper.to_string(), format!("DATETIME({})", scale))
                } else {
                    (upper.to_string(), format!("TIMESTAMP({})", scale))
                }
            } else {
                (upper.to_string(), "TEXT".to_string())
            }
        }
    }
}

/// Apply the rule hierarchy to a built-in mapping result.
///
/// The column-scope hit wins whenever it differs from the built-in type;
/// otherwise the table/schema hit wins whenever it differs; otherwise the
/// built-in type stands. The final type is always uppercased.
fn resolve_column_type(
    column_name: &str,
    origin_type: &str,
    builtin_type: &str,
    rules: &TableRules,
) -> String {
    let from_column = column_scope_type(column_name, origin_type, builtin_type, &rules.column);
    let from_other = table_or_schema_type(origin_type, builtin_type, &rules.table, &rules.schema);

    if from_column != builtin_type {
        from_column.to_uppercase()
    } else if from_other != builtin_type {
        from_other.to_uppercase()
    } else {
        builtin_type.to_uppercase()
    }
}

fn column_scope_type(
    column_name: &str,
    origin_type: &str,
    builtin_type: &str,
    rules: &[ColumnRule],
) -> String {
    for rule in rules {
        if rule.source_column_name.eq_ignore_ascii_case(column_name)
            && rule.source_column_type.eq_ignore_ascii_case(origin_type)
            && !rule.target_column_type.is_empty()
        {
            return rule.target_column_type.clone();
        }
    }
    builtin_type.to_string()
}

fn table_or_schema_type(
    origin_type: &str,
    builtin_type: &str,
    table_rules: &[TableRule],
    schema_rules: &[SchemaRule],
) -> String {
    let from_table = table_rules
        .iter()
        .find(|r| {
            r.source_column_type.eq_ignore_ascii_case(origin_type)
                && !r.target_column_type.is_empty()
        })
        .map(|r| r.target_column_type.clone())
        .unwrap_or_else(|| builtin_type.to_string());

    let from_schema = schema_rules
        .iter()
        .find(|r| {
            r.source_column_type.eq_ignore_ascii_case(origin_type)
                && !r.target_column_type.is_empty()
        })
        .map(|r| r.target_column_type.clone())
        .unwrap_or_else(|| builtin_type.to_string());

    // Table scope shadows schema scope whenever it actually overrides.
    if from_table != builtin_type {
        from_table
    } else if from_schema != builtin_type {
        from_schema
    } else {
        builtin_type.to_string()
    }
}

fn map_default_value(default_value: &str, rules: &[DefaultValueRule]) -> String {
    for rule in rules {
        if rule
            .source_default_value
            .eq_ignore_ascii_case(default_value)
            && !rule.target_default_value.is_empty()
        {
            return rule.target_default_value.clone();
        }
    }
    default_value.to_string()
}

/// Quote a comment for the COMMENT clause.
///
/// Double quotes in the source comment are replaced with single quotes.
/// If the result still contains a quoted `'…'` span it is wrapped in double
/// quotes, otherwise in single quotes.
fn quote_comment(comments: &str) -> String {
    let comments = comments.replace('"', "'");
    let wrap_double = match (comments.find('\''), comments.rfind('\'')) {
        (Some(first), Some(last)) => first < last,
        _ => false,
    };
    if wrap_double {
        format!("\"{}\"", comments)
    } else {
        format!("'{}'", comments)
    }
}

fn assemble_column_meta(
    column_name: &str,
    column_type: &str,
    nullable: &str,
    comments: &str,
    default_value: &str,
    default_rules: &[DefaultValueRule],
) -> String {
    let mut meta = format!("`{}` {}", column_name.to_uppercase(), column_type);

    // NULL is the implicit default; only NOT NULL is spelled out.
    if nullable != "Y" {
        meta.push_str(" NOT NULL");
    }

    if !default_value.is_empty() {
        meta.push_str(" DEFAULT ");
        meta.push_str(&map_default_value(default_value, default_rules));
    }

    if !comments.is_empty() {
        meta.push_str(" COMMENT ");
        meta.push_str(&quote_comment(comments));
    }

    meta
}
