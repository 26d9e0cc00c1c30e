//! Index assembly. The catalog's `pg_get_indexdef` text is kept verbatim
//! and also parsed to recover the access method and column list.

use sqlx::postgres::PgPool;

use crate::model::{Database, Index, IndexColumn, IndexType, SortDirection};
use crate::normalize::simplify_json_expression;

use super::queries;
use super::rows::IndexRow;

pub(crate) async fn load(
    pool: &PgPool,
    target: &str,
    db: &mut Database,
) -> Result<(), sqlx::Error> {
    let rows: Vec<IndexRow> = sqlx::query(queries::INDEXES)
        .bind(target)
        .fetch_all(pool)
        .await?
        .iter()
        .map(IndexRow::from)
        .collect();

    let schema = db.get_or_create_schema(target);
    for row in &rows {
        let Some(table) = schema.tables.get_mut(&row.table_name) else {
            continue;
        };
        let index = assemble_index(target, row);
        table.indexes.insert(index.name.clone(), index);
    }
    Ok(())
}

pub(crate) fn assemble_index(target: &str, row: &IndexRow) -> Index {
    let mut index = Index::new(target, &row.table_name, &row.index_name);
    index.is_unique = row.is_unique;
    index.is_partial = row.is_partial;
    index.is_expression = row.has_expressions;
    index.index_type = if row.is_primary {
        IndexType::Primary
    } else if row.is_unique {
        IndexType::Unique
    } else if row.has_expressions {
        IndexType::Expression
    } else {
        IndexType::Regular
    };
    index.definition = row.definition.clone();
    index.where_clause = row.where_clause.clone();

    let (method, columns) = parse_index_definition(&row.definition);
    index.method = if method.is_empty() { row.method.clone() } else { method };
    index.columns = columns;
    index
}

/// Recover `(method, columns)` from `CREATE INDEX` text: the token after
/// `USING`, then the outermost balanced parenthesised group split on
/// top-level commas.
pub(crate) fn parse_index_definition(definition: &str) -> (String, Vec<IndexColumn>) {
    let mut method = String::new();
    let mut rest = definition;
    if let Some(pos) = definition.find(" USING ") {
        let after = &definition[pos + 7..];
        method = after
            .split_whitespace()
            .next()
            .unwrap_or_default()
            .to_string();
        rest = after;
    }

    let Some(open) = rest.find('(') else {
        return (method, Vec::new());
    };
    let Some(group) = balanced_group(&rest[open..]) else {
        return (method, Vec::new());
    };

    let columns = split_top_level(group)
        .into_iter()
        .enumerate()
        .map(|(i, entry)| classify_column(entry.trim(), i as i32 + 1))
        .collect();
    (method, columns)
}

/// The contents of the balanced group starting at the `(` in `s[0]`.
fn balanced_group(s: &str) -> Option<&str> {
    let mut depth = 0i32;
    let mut in_quote = false;
    for (i, ch) in s.char_indices() {
        match ch {
            '\'' => in_quote = !in_quote,
            '(' if !in_quote => depth += 1,
            ')' if !in_quote => {
                depth -= 1;
                if depth == 0 {
                    return Some(&s[1..i]);
                }
            }
            _ => {}
        }
    }
    None
}

fn split_top_level(s: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut in_quote = false;
    let mut start = 0usize;
    for (i, ch) in s.char_indices() {
        match ch {
            '\'' => in_quote = !in_quote,
            '(' if !in_quote => depth += 1,
            ')' if !in_quote => depth -= 1,
            ',' if !in_quote && depth == 0 => {
                parts.push(&s[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    if start < s.len() {
        parts.push(&s[start..]);
    }
    parts
}

/// Classify one index entry. Entries opening with `(` are expressions: the
/// balanced group is the column name (JSON paths simplified), a trailing
/// `ASC`/`DESC` drives the direction. Plain entries read as
/// `name [direction | opclass ...]`.
fn classify_column(entry: &str, position: i32) -> IndexColumn {
    if entry.starts_with('(') {
        let expression_len = balanced_group(entry)
            .map(|inner| inner.len() + 2)
            .unwrap_or(entry.len());
        let expression = &entry[..expression_len];
        let name = if expression.contains("->") {
            simplify_json_expression(expression)
        } else {
            expression.to_string()
        };
        let mut column = IndexColumn::new(name, position);
        for token in entry[expression_len..].split_whitespace() {
            match token.to_uppercase().as_str() {
                "DESC" => column.direction = SortDirection::Desc,
                "ASC" => column.direction = SortDirection::Asc,
                _ => {}
            }
        }
        return column;
    }

    let mut tokens = entry.split_whitespace();
    let name = tokens.next().unwrap_or_default().to_string();
    let mut column = IndexColumn::new(name, position);
    for token in tokens {
        match token.to_uppercase().as_str() {
            "DESC" => column.direction = SortDirection::Desc,
            "ASC" => column.direction = SortDirection::Asc,
            "NULLS" | "FIRST" | "LAST" => {}
            _ => column.operator_class = Some(token.to_string()),
        }
    }
    column
}
