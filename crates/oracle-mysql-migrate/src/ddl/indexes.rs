//! Index translation.
//!
//! NORMAL indexes become inline `KEY`/`UNIQUE INDEX` fragments inside CREATE
//! TABLE. Function-based, bitmap and domain indexes have no MySQL
//! equivalent; they are preserved as standalone statements on a
//! compatibility list so an operator can review and port them by hand. Any
//! other index type fails the table.

use tracing::{info, warn};

use crate::catalog::IndexRow;
use crate::error::{MigrateError, Result};

/// Inline fragments plus standalone compatibility statements for one table.
#[derive(Debug, Clone, Default)]
pub struct IndexDdl {
    pub inline: Vec<String>,
    pub compatibility: Vec<String>,
}

/// Translate the unique indexes of one table.
pub fn unique_indexes(
    source_schema: &str,
    source_table: &str,
    target_schema: &str,
    target_table: &str,
    rows: &[IndexRow],
) -> Result<IndexDdl> {
    let mut ddl = IndexDdl::default();

    for row in rows {
        if row.table_name.is_empty() || !row.uniqueness.eq_ignore_ascii_case("UNIQUE") {
            return Err(unsupported(source_schema, source_table, row));
        }
        match row.index_type.as_str() {
            "NORMAL" => {
                let fragment = format!(
                    "UNIQUE INDEX `{}` ({})",
                    row.index_name.to_uppercase(),
                    quote_column_list(&row.column_list).join(",")
                );
                info!(
                    schema = source_schema,
                    table = source_table,
                    index = %row.index_name,
                    "reverse unique index"
                );
                ddl.inline.push(fragment);
            }
            "FUNCTION-BASED NORMAL" => {
                let sql = format!(
                    "CREATE UNIQUE INDEX `{}` ON `{}`.`{}` ({});",
                    row.index_name.to_uppercase(),
                    target_schema.to_uppercase(),
                    target_table.to_uppercase(),
                    row.column_list
                );
                warn!(
                    schema = source_schema,
                    table = source_table,
                    index = %row.index_name,
                    index_type = %row.index_type,
                    sql = %sql,
                    "function-based unique index may not be supported by the target"
                );
                ddl.compatibility.push(sql);
            }
            _ => return Err(unsupported(source_schema, source_table, row)),
        }
    }

    Ok(ddl)
}

/// Translate the non-unique indexes of one table.
pub fn normal_indexes(
    source_schema: &str,
    source_table: &str,
    target_schema: &str,
    target_table: &str,
    rows: &[IndexRow],
) -> Result<IndexDdl> {
    let mut ddl = IndexDdl::default();

    for row in rows {
        if row.table_name.is_empty() || !row.uniqueness.eq_ignore_ascii_case("NONUNIQUE") {
            return Err(unsupported(source_schema, source_table, row));
        }
        match row.index_type.as_str() {
            "NORMAL" => {
                let fragment = format!(
                    "KEY `{}` ({})",
                    row.index_name.to_uppercase(),
                    quote_column_list(&row.column_list).join(",")
                );
                info!(
                    schema = source_schema,
                    table = source_table,
                    index = %row.index_name,
                    "reverse normal index"
                );
                ddl.inline.push(fragment);
            }
            "FUNCTION-BASED NORMAL" => {
                let sql = format!(
                    "CREATE INDEX `{}` ON `{}`.`{}` ({});",
                    row.index_name.to_uppercase(),
                    target_schema.to_uppercase(),
                    target_table.to_uppercase(),
                    row.column_list
                );
                push_compat(&mut ddl, source_schema, source_table, row, sql);
            }
            "BITMAP" | "FUNCTION-BASED BITMAP" => {
                let sql = format!(
                    "CREATE BITMAP INDEX `{}` ON `{}`.`{}` ({});",
                    row.index_name.to_uppercase(),
                    target_schema.to_uppercase(),
                    target_table.to_uppercase(),
                    row.column_list
                );
                push_compat(&mut ddl, source_schema, source_table, row, sql);
            }
            "DOMAIN" => {
                let sql = format!(
                    "CREATE INDEX `{}` ON `{}`.`{}` ({}) INDEXTYPE IS `{}`.`{}` PARAMETERS ('{}');",
                    row.index_name.to_uppercase(),
                    target_schema.to_uppercase(),
                    target_table.to_uppercase(),
                    row.column_list,
                    row.ityp_owner.to_uppercase(),
                    row.ityp_name.to_uppercase(),
                    row.parameters
                );
                push_compat(&mut ddl, source_schema, source_table, row, sql);
            }
            _ => return Err(unsupported(source_schema, source_table, row)),
        }
    }

    Ok(ddl)
}

fn push_compat(ddl: &mut IndexDdl, schema: &str, table: &str, row: &IndexRow, sql: String) {
    warn!(
        schema,
        table,
        index = %row.index_name,
        index_type = %row.index_type,
        sql = %sql,
        "index type not supported by the target, preserved on the compatibility list"
    );
    ddl.compatibility.push(sql);
}

fn unsupported(schema: &str, table: &str, row: &IndexRow) -> MigrateError {
    MigrateError::UnsupportedIndex {
        schema: schema.to_string(),
        table: table.to_string(),
        index: row.index_name.clone(),
        index_type: row.index_type.clone(),
    }
}

fn quote_column_list(column_list: &str) -> Vec<String> {
    column_list
        .split(',')
        .map(|col| format!("`{}`", col.trim().to_uppercase()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(name: &str, uniqueness: &str, index_type: &str, columns: &str) -> IndexRow {
        IndexRow {
            table_name: "T1".into(),
            index_name: name.into(),
            uniqueness: uniqueness.into(),
            index_type: index_type.into(),
            column_list: columns.into(),
            ..Default::default()
        }
    }

    #[test]
    fn test_unique_normal_inline() {
        let ddl = unique_indexes(
            "MARVIN",
            "T1",
            "MARVIN",
            "T1",
            &[row("idx_u", "UNIQUE", "NORMAL", "a")],
        )
        .unwrap();
        assert_eq!(ddl.inline, vec!["UNIQUE INDEX `IDX_U` (`A`)"]);
        assert!(ddl.compatibility.is_empty());
    }

    #[test]
    fn test_unique_function_based_goes_standalone() {
        let ddl = unique_indexes(
            "MARVIN",
            "T1",
            "MARVIN",
            "T1",
            &[row("idx_f", "UNIQUE", "FUNCTION-BASED NORMAL", "UPPER(\"B\")")],
        )
        .unwrap();
        assert!(ddl.inline.is_empty());
        assert_eq!(
            ddl.compatibility,
            vec!["CREATE UNIQUE INDEX `IDX_F` ON `MARVIN`.`T1` (UPPER(\"B\"));"]
        );
    }

    #[test]
    fn test_unique_unknown_type_fails() {
        let result = unique_indexes(
            "MARVIN",
            "T1",
            "MARVIN",
            "T1",
            &[row("idx_b", "UNIQUE", "BITMAP", "a")],
        );
        assert!(matches!(result, Err(MigrateError::UnsupportedIndex { .. })));
    }

    #[test]
    fn test_normal_index_kinds() {
        let ddl = normal_indexes(
            "MARVIN",
            "T1",
            "MARVIN",
            "T1",
            &[
                row("idx_n", "NONUNIQUE", "NORMAL", "a,b"),
                row("idx_bm", "NONUNIQUE", "BITMAP", "c"),
                row("idx_fb", "NONUNIQUE", "FUNCTION-BASED NORMAL", "UPPER(\"D\")"),
            ],
        )
        .unwrap();
        assert_eq!(ddl.inline, vec!["KEY `IDX_N` (`A`,`B`)"]);
        assert_eq!(ddl.compatibility.len(), 2);
        assert!(ddl.compatibility[0].starts_with("CREATE BITMAP INDEX `IDX_BM`"));
        assert!(ddl.compatibility[1].starts_with("CREATE INDEX `IDX_FB`"));
    }

    #[test]
    fn test_domain_index_preserved_with_parameters() {
        let mut r = row("idx_txt", "NONUNIQUE", "DOMAIN", "doc");
        r.ityp_owner = "ctxsys".into();
        r.ityp_name = "context".into();
        r.parameters = "LEXER my_lexer".into();
        let ddl = normal_indexes("MARVIN", "T1", "MARVIN", "T1", &[r]).unwrap();
        assert_eq!(
            ddl.compatibility,
            vec![
                "CREATE INDEX `IDX_TXT` ON `MARVIN`.`T1` (doc) INDEXTYPE IS `CTXSYS`.`CONTEXT` PARAMETERS ('LEXER my_lexer');"
            ]
        );
    }

    #[test]
    fn test_normal_unknown_type_fails() {
        let result = normal_indexes(
            "MARVIN",
            "T1",
            "MARVIN",
            "T1",
            &[row("idx_x", "NONUNIQUE", "CLUSTER", "a")],
        );
        assert!(matches!(result, Err(MigrateError::UnsupportedIndex { .. })));
    }
}
