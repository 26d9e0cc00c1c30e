//! Constraint assembly: catalog rows arrive one per constraint column and
//! are folded into composite records keyed by `(table, constraint_name)`.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;
use sqlx::postgres::PgPool;
use tracing::debug;

use crate::model::{Constraint, ConstraintType, Database, FkAction};

use super::queries;
use super::rows::ConstraintRow;

static NOT_NULL_CHECK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^\(?\s*"?[A-Za-z_][A-Za-z0-9_.]*"?\s+IS NOT NULL\s*\)?$"#)
        .expect("not-null check regex")
});

pub(crate) async fn load(
    pool: &PgPool,
    target: &str,
    db: &mut Database,
) -> Result<(), sqlx::Error> {
    let rows: Vec<ConstraintRow> = sqlx::query(queries::CONSTRAINTS)
        .bind(target)
        .fetch_all(pool)
        .await?
        .iter()
        .map(ConstraintRow::from)
        .collect();

    let constraints = assemble_constraints(target, &rows);
    let schema = db.get_or_create_schema(target);
    for constraint in constraints {
        let Some(table) = schema.tables.get_mut(&constraint.table) else {
            continue;
        };
        table
            .constraints
            .insert(constraint.name.clone(), constraint);
    }
    reorder_partitioned_primary_keys(db, target);
    Ok(())
}

/// Fold per-column rows into composite constraints. The first sighting of a
/// `(table, name)` pair classifies the constraint; later rows contribute
/// columns only. Unknown kinds and synthetic `IS NOT NULL` checks are
/// dropped.
pub(crate) fn assemble_constraints(target: &str, rows: &[ConstraintRow]) -> Vec<Constraint> {
    let mut out: Vec<Constraint> = Vec::new();
    let mut index: HashMap<(String, String), usize> = HashMap::new();

    for row in rows {
        if row.table_name.is_empty() || row.constraint_name.is_empty() {
            continue;
        }
        let key = (row.table_name.clone(), row.constraint_name.clone());

        let slot = match index.get(&key) {
            Some(&i) => i,
            None => {
                let Some(kind) = classify(&row.constraint_type) else {
                    debug!(
                        constraint = row.constraint_name,
                        kind = row.constraint_type,
                        "unknown constraint kind dropped"
                    );
                    continue;
                };
                if kind == ConstraintType::Check
                    && row
                        .check_clause
                        .as_deref()
                        .is_some_and(|c| NOT_NULL_CHECK_RE.is_match(c.trim()))
                {
                    continue;
                }
                let mut constraint =
                    Constraint::new(kind, target, &row.table_name, &row.constraint_name);
                constraint.deferrable = row.deferrable;
                constraint.initially_deferred = row.initially_deferred;
                if kind == ConstraintType::Check {
                    constraint.check_clause = row.check_clause.clone();
                }
                if kind == ConstraintType::ForeignKey {
                    constraint.referenced_schema = row.foreign_schema.clone();
                    constraint.referenced_table = row.foreign_table.clone();
                    constraint.delete_rule = parse_rule(row.delete_rule.as_deref());
                    constraint.update_rule = parse_rule(row.update_rule.as_deref());
                }
                out.push(constraint);
                index.insert(key.clone(), out.len() - 1);
                out.len() - 1
            }
        };

        let constraint = &mut out[slot];
        if let Some(column) = row.column_name.as_deref() {
            constraint.push_column(column);
        }
        if constraint.constraint_type == ConstraintType::ForeignKey
            && let Some(foreign_column) = row.foreign_column.as_deref()
        {
            constraint.push_referenced_column(foreign_column);
        }
    }

    // Referenced columns follow the catalog's foreign ordinal when present,
    // the source ordinal otherwise; rows arrive in that order already, so
    // positions assigned during the fold are final.
    out
}

fn classify(kind: &str) -> Option<ConstraintType> {
    match kind {
        "PRIMARY KEY" => Some(ConstraintType::PrimaryKey),
        "UNIQUE" => Some(ConstraintType::Unique),
        "FOREIGN KEY" => Some(ConstraintType::ForeignKey),
        "CHECK" => Some(ConstraintType::Check),
        "EXCLUSION" => Some(ConstraintType::Exclusion),
        _ => None,
    }
}

fn parse_rule(rule: Option<&str>) -> Option<FkAction> {
    rule.and_then(|r| r.parse().ok())
}

/// Invariant pass: a primary key on a partitioned table (or on one of its
/// partition children) leads with the partition-key columns. Children find
/// their parent's key through the attachment list restricted to the target
/// schema.
pub(crate) fn reorder_partitioned_primary_keys(db: &mut Database, target: &str) {
    let Some(schema) = db.schemas.get(target) else {
        return;
    };

    // parent table -> partition key columns, for the target schema.
    let parent_keys: HashMap<String, Vec<String>> = schema
        .tables
        .values()
        .filter(|t| t.is_partitioned)
        .map(|t| (t.name.clone(), t.partition_key_columns()))
        .collect();

    // child table -> parent's key, via same-schema attachments.
    let child_keys: HashMap<String, Vec<String>> = db
        .partition_attachments
        .iter()
        .filter(|a| a.parent_schema == target && a.child_schema == target)
        .filter_map(|a| {
            parent_keys
                .get(&a.parent_table)
                .map(|key| (a.child_table.clone(), key.clone()))
        })
        .collect();

    let Some(schema) = db.schemas.get_mut(target) else {
        return;
    };
    for table in schema.tables.values_mut() {
        let key_columns = if table.is_partitioned {
            table.partition_key_columns()
        } else if let Some(key) = child_keys.get(&table.name) {
            key.clone()
        } else {
            continue;
        };
        for constraint in table.constraints.values_mut() {
            if constraint.constraint_type == ConstraintType::PrimaryKey {
                constraint.order_partition_key_first(&key_columns);
            }
        }
    }
}
