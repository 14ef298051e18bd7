//! Primary, unique, foreign and check constraint translation.
//!
//! Fragments returned here are embedded into CREATE TABLE (PK, UK) or wrapped
//! in ALTER TABLE statements by the assembler (FK, CHECK). All identifiers
//! are uppercased and backtick-quoted.

use crate::catalog::{CheckKeyRow, ConstraintRow, ForeignKeyRow};
use crate::error::{MigrateError, Result};

/// A translated primary key: the inline fragment plus the quoted column
/// list, kept for the clustered-index policy check.
#[derive(Debug, Clone)]
pub struct PrimaryKey {
    pub fragment: String,
    /// Backtick-quoted, uppercased column names.
    pub columns: Vec<String>,
}

/// Translate the primary-key rows of one table.
///
/// A well-formed table yields at most one row; more is a dictionary anomaly
/// and fails with [`MigrateError::MultiplePk`].
pub fn primary_key(
    schema: &str,
    table: &str,
    rows: &[ConstraintRow],
) -> Result<Option<PrimaryKey>> {
    if rows.len() > 1 {
        return Err(MigrateError::MultiplePk {
            schema: schema.to_string(),
            table: table.to_string(),
        });
    }
    Ok(rows.first().map(|row| {
        let columns = quote_column_list(&row.column_list);
        let fragment = format!("PRIMARY KEY ({})", columns.join(","));
        PrimaryKey { fragment, columns }
    }))
}

/// Translate unique-key constraint rows into inline `UNIQUE KEY` fragments.
pub fn unique_keys(rows: &[ConstraintRow]) -> Vec<String> {
    rows.iter()
        .map(|row| {
            format!(
                "UNIQUE KEY `{}` ({})",
                row.constraint_name.to_uppercase(),
                quote_column_list(&row.column_list).join(",")
            )
        })
        .collect()
}

/// Translate foreign-key rows into `CONSTRAINT … FOREIGN KEY …` clauses.
///
/// Only delete rules MySQL understands are carried over; anything else
/// (e.g. Oracle's implicit RESTRICT variants from third-party tooling) is
/// dropped silently.
pub fn foreign_keys(rows: &[ForeignKeyRow]) -> Vec<String> {
    let mut clauses = Vec::new();
    for row in rows {
        let base = format!(
            "CONSTRAINT `{}` FOREIGN KEY ({}) REFERENCES `{}`.`{}` ({})",
            row.constraint_name.to_uppercase(),
            row.column_list.to_uppercase(),
            row.r_owner.to_uppercase(),
            row.r_table_name.to_uppercase(),
            row.r_column_list.to_uppercase()
        );
        match row.delete_rule.as_str() {
            "" | "NO ACTION" => clauses.push(base),
            "CASCADE" => clauses.push(format!("{} ON DELETE CASCADE", base)),
            "SET NULL" => clauses.push(format!("{} ON DELETE SET NULL", base)),
            _ => {}
        }
    }
    clauses
}

/// Translate check-constraint rows into `CONSTRAINT … CHECK (…)` clauses.
///
/// Clauses that are purely `col IS NOT NULL` are already covered by column
/// nullability and are stripped: the condition is tokenized on whitespace,
/// split at AND/OR connectors, surviving clauses are re-joined and dangling
/// connectors trimmed. A condition reduced to nothing emits no constraint.
pub fn check_constraints(rows: &[CheckKeyRow]) -> Vec<String> {
    let mut clauses = Vec::new();
    for row in rows {
        let condition = row.search_condition.trim();
        let tokens: Vec<&str> = condition.split_whitespace().collect();
        let has_connector = tokens.iter().any(|t| is_connector(t));

        if !has_connector {
            if !contains_is_not_null(condition) {
                clauses.push(format!(
                    "CONSTRAINT `{}` CHECK ({})",
                    row.constraint_name.to_uppercase(),
                    row.search_condition
                ));
            }
            continue;
        }

        // Split into clauses; each clause after the first keeps its leading
        // connector so the surviving expression stays well-formed.
        let mut boundaries: Vec<usize> = tokens
            .iter()
            .enumerate()
            .filter(|(_, t)| is_connector(t))
            .map(|(i, _)| i)
            .collect();
        boundaries.push(tokens.len());

        let mut kept: Vec<&str> = Vec::new();
        let mut start = 0;
        for &end in &boundaries {
            if start < end {
                let clause = &tokens[start..end];
                if !contains_is_not_null(&clause.join(" ")) {
                    kept.extend_from_slice(clause);
                }
            }
            start = end;
        }

        // Trim connectors left dangling at either end.
        let mut kept = kept.as_slice();
        while let Some(first) = kept.first() {
            if is_connector(first) {
                kept = &kept[1..];
            } else {
                break;
            }
        }
        while let Some(last) = kept.last() {
            if is_connector(last) {
                kept = &kept[..kept.len() - 1];
            } else {
                break;
            }
        }

        if kept.is_empty() {
            continue;
        }

        clauses.push(format!(
            "CONSTRAINT `{}` CHECK ({})",
            row.constraint_name.to_uppercase(),
            kept.join(" ")
        ));
    }
    clauses
}

fn is_connector(token: &str) -> bool {
    token.eq_ignore_ascii_case("AND") || token.eq_ignore_ascii_case("OR")
}

fn contains_is_not_null(clause: &str) -> bool {
    clause.to_uppercase().contains("IS NOT NULL")
}

fn quote_column_list(column_list: &str) -> Vec<String> {
    column_list
        .split(',')
        .map(|col| format!("`{}`", col.trim().to_uppercase()))
        .collect()
}
