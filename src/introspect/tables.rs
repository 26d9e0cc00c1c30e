//! Tables, columns, and partition topology from the catalog.

use sqlx::postgres::PgPool;
use tracing::debug;

use crate::model::{
    Column, Database, Identity, IdentityGeneration, PartitionAttachment, PartitionStrategy, Table,
    TableType,
};
use crate::normalize::canonical_type_name;

use super::queries;
use super::rows::{AttachmentRow, ColumnRow, TableRow};

pub(crate) async fn load(
    pool: &PgPool,
    target: &str,
    db: &mut Database,
) -> Result<(), sqlx::Error> {
    let table_rows: Vec<TableRow> = sqlx::query(queries::TABLES)
        .bind(target)
        .fetch_all(pool)
        .await?
        .iter()
        .map(TableRow::from)
        .collect();
    let column_rows: Vec<ColumnRow> = sqlx::query(queries::COLUMNS)
        .bind(target)
        .fetch_all(pool)
        .await?
        .iter()
        .map(ColumnRow::from)
        .collect();

    let tables = assemble_tables(target, &table_rows, &column_rows);
    let schema = db.get_or_create_schema(target);
    for table in tables {
        schema.tables.insert(table.name.clone(), table);
    }
    Ok(())
}

pub(crate) async fn load_partition_attachments(
    pool: &PgPool,
    target: &str,
    db: &mut Database,
) -> Result<(), sqlx::Error> {
    let rows: Vec<AttachmentRow> = sqlx::query(queries::PARTITION_ATTACHMENTS)
        .bind(target)
        .fetch_all(pool)
        .await?
        .iter()
        .map(AttachmentRow::from)
        .collect();

    for row in rows {
        if row.parent_table.is_empty() || row.child_table.is_empty() {
            continue;
        }
        db.partition_attachments.push(PartitionAttachment {
            parent_schema: row.parent_schema,
            parent_table: row.parent_table,
            child_schema: row.child_schema,
            child_table: row.child_table,
            partition_bound: row.partition_bound.unwrap_or_default(),
        });
    }
    Ok(())
}

pub(crate) async fn load_index_attachments(
    pool: &PgPool,
    target: &str,
    db: &mut Database,
) -> Result<(), sqlx::Error> {
    let rows = sqlx::query(queries::INDEX_ATTACHMENTS)
        .bind(target)
        .fetch_all(pool)
        .await?;

    for row in &rows {
        use super::rows::req_string;
        let parent_index = req_string(row, "parent_index");
        let child_index = req_string(row, "child_index");
        if parent_index.is_empty() || child_index.is_empty() {
            continue;
        }
        db.index_attachments.push(crate::model::IndexAttachment {
            parent_schema: req_string(row, "parent_schema"),
            parent_index,
            child_schema: req_string(row, "child_schema"),
            child_index,
        });
    }
    Ok(())
}

/// Join table rows with their columns, in catalog ordinal order.
pub(crate) fn assemble_tables(
    target: &str,
    table_rows: &[TableRow],
    column_rows: &[ColumnRow],
) -> Vec<Table> {
    let mut tables: Vec<Table> = Vec::with_capacity(table_rows.len());
    for row in table_rows {
        if row.table_name.is_empty() {
            continue;
        }
        let mut table = Table::new(target, &row.table_name);
        table.table_type = match row.persistence.as_str() {
            "t" => TableType::Temporary,
            _ => TableType::Base,
        };
        table.rls_enabled = row.rls_enabled;
        if row.relkind == "p" {
            table.is_partitioned = true;
            if let Some(def) = row.partition_key_def.as_deref()
                && let Some((strategy, key)) = parse_partition_key_def(def)
            {
                table.partition_strategy = Some(strategy);
                table.partition_key = key;
            }
        }
        tables.push(table);
    }

    for row in column_rows {
        let Some(table) = tables.iter_mut().find(|t| t.name == row.table_name) else {
            continue;
        };
        if let Some(column) = assemble_column(row) {
            table.columns.push(column);
        }
    }
    tables
}

/// One column from an information-schema row; rows with no ordinal are
/// structurally incomplete and skipped.
pub(crate) fn assemble_column(row: &ColumnRow) -> Option<Column> {
    if row.column_name.is_empty() {
        return None;
    }
    let Some(position) = row.ordinal_position else {
        debug!(column = row.column_name, "column row without ordinal skipped");
        return None;
    };

    let data_type = resolve_column_type(&row.data_type, &row.udt_name);
    let mut column = Column::new(&row.column_name, position, data_type);
    column.udt_name = row.udt_name.clone();
    column.nullable = row.is_nullable == "YES";
    column.max_length = row.character_maximum_length;
    column.precision = row.numeric_precision;
    column.scale = row.numeric_scale;

    if row.is_identity == "YES" {
        // Identity columns carry no user default; the two are exclusive.
        column.identity = Some(Identity {
            generation: row
                .identity_generation
                .as_deref()
                .and_then(|g| g.parse::<IdentityGeneration>().ok())
                .unwrap_or(IdentityGeneration::ByDefault),
            start: parse_i64(row.identity_start.as_deref(), 1),
            increment: parse_i64(row.identity_increment.as_deref(), 1),
            min_value: row.identity_minimum.as_deref().and_then(|v| v.parse().ok()),
            max_value: row.identity_maximum.as_deref().and_then(|v| v.parse().ok()),
            cycle: row.identity_cycle.as_deref() == Some("YES"),
        });
    } else {
        column.default_value = row.column_default.clone().filter(|d| !d.is_empty());
    }
    Some(column)
}

fn parse_i64(value: Option<&str>, fallback: i64) -> i64 {
    value.and_then(|v| v.parse().ok()).unwrap_or(fallback)
}

/// The information schema reports `USER-DEFINED` / `ARRAY` placeholders and
/// leaves the real name in `udt_name`; resolve to one canonical spelling.
pub(crate) fn resolve_column_type(data_type: &str, udt_name: &str) -> String {
    match data_type {
        "USER-DEFINED" => canonical_type_name(udt_name),
        "ARRAY" => canonical_type_name(udt_name),
        other => canonical_type_name(other),
    }
}

/// `pg_get_partkeydef` output: `RANGE (tenant_id, created_at)`.
pub(crate) fn parse_partition_key_def(def: &str) -> Option<(PartitionStrategy, String)> {
    let trimmed = def.trim();
    let open = trimmed.find('(')?;
    let close = trimmed.rfind(')')?;
    if close <= open {
        return None;
    }
    let strategy = trimmed[..open].trim().to_uppercase().parse().ok()?;
    let key = trimmed[open + 1..close]
        .split(',')
        .map(|c| c.trim())
        .collect::<Vec<_>>()
        .join(", ");
    Some((strategy, key))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table_row(name: &str, relkind: &str, partkey: Option<&str>) -> TableRow {
        TableRow {
            table_name: name.to_string(),
            relkind: relkind.to_string(),
            persistence: "p".to_string(),
            rls_enabled: false,
            partition_key_def: partkey.map(str::to_string),
        }
    }

    fn column_row(table: &str, name: &str, position: i32, data_type: &str) -> ColumnRow {
        ColumnRow {
            table_name: table.to_string(),
            column_name: name.to_string(),
            ordinal_position: Some(position),
            data_type: data_type.to_string(),
            udt_name: data_type.to_string(),
            is_nullable: "YES".to_string(),
            column_default: None,
            character_maximum_length: None,
            numeric_precision: None,
            numeric_scale: None,
            is_identity: "NO".to_string(),
            identity_generation: None,
            identity_start: None,
            identity_increment: None,
            identity_minimum: None,
            identity_maximum: None,
            identity_cycle: None,
        }
    }

    #[test]
    fn test_assemble_tables_with_columns_in_order() {
        let tables = assemble_tables(
            "public",
            &[table_row("t", "r", None)],
            &[
                column_row("t", "id", 1, "integer"),
                column_row("t", "name", 2, "text"),
            ],
        );
        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].columns.len(), 2);
        assert_eq!(tables[0].columns[1].position, 2);
        assert_eq!(tables[0].schema, "public");
    }

    #[test]
    fn test_partitioned_parent_parses_key_def() {
        let tables = assemble_tables(
            "public",
            &[table_row("events", "p", Some("RANGE (tenant_id, created_at)"))],
            &[],
        );
        assert!(tables[0].is_partitioned);
        assert_eq!(tables[0].partition_strategy, Some(PartitionStrategy::Range));
        assert_eq!(tables[0].partition_key, "tenant_id, created_at");
    }

    #[test]
    fn test_column_type_placeholders_resolved() {
        assert_eq!(resolve_column_type("USER-DEFINED", "status"), "status");
        assert_eq!(resolve_column_type("ARRAY", "_int4"), "integer[]");
        assert_eq!(
            resolve_column_type("timestamp with time zone", "timestamptz"),
            "timestamptz"
        );
    }

    #[test]
    fn test_identity_column_has_no_default() {
        let mut row = column_row("t", "id", 1, "bigint");
        row.is_identity = "YES".to_string();
        row.identity_generation = Some("ALWAYS".to_string());
        row.identity_start = Some("100".to_string());
        row.identity_cycle = Some("NO".to_string());
        row.column_default = Some("should_not_survive".to_string());

        let column = assemble_column(&row).expect("column");
        let identity = column.identity.expect("identity");
        assert_eq!(identity.generation, IdentityGeneration::Always);
        assert_eq!(identity.start, 100);
        assert!(!identity.cycle);
        assert!(column.default_value.is_none());
    }

    #[test]
    fn test_column_without_ordinal_skipped() {
        let mut row = column_row("t", "ghost", 1, "text");
        row.ordinal_position = None;
        assert!(assemble_column(&row).is_none());
    }

    #[test]
    fn test_malformed_partition_def_ignored() {
        assert!(parse_partition_key_def("not a key def").is_none());
        assert!(parse_partition_key_def("LIST ()").is_some());
    }
}
