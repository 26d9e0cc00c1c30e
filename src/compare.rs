//! Field-by-field equivalence checking between two loaded databases.
//!
//! The checker never stops at the first discrepancy: every difference is
//! reported with a dotted path, both values, and a severity. `Mismatch` means
//! the two sides genuinely disagree; `LoaderLimitation` marks divergences a
//! loader is known to produce (cross-schema type spellings), so callers can
//! treat them as soft.

use serde::{Deserialize, Serialize};

use crate::model::{Database, Index, Schema, Table, Trigger};
use crate::normalize::{
    canonical_index_where, canonical_trigger_when, canonical_type_name, defaults_equal,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DiffSeverity {
    Mismatch,
    LoaderLimitation,
}

/// One reported difference between the two sides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaDiff {
    /// Dotted location, e.g. `public.orders.created_at.data_type`.
    pub path: String,
    pub left: String,
    pub right: String,
    pub severity: DiffSeverity,
}

impl SchemaDiff {
    fn new(path: impl Into<String>, left: impl Into<String>, right: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            left: left.into(),
            right: right.into(),
            severity: DiffSeverity::Mismatch,
        }
    }

    fn soft(mut self) -> Self {
        self.severity = DiffSeverity::LoaderLimitation;
        self
    }
}

const ABSENT: &str = "<absent>";

/// Compare two databases and report every difference.
pub fn diff_databases(left: &Database, right: &Database) -> Vec<SchemaDiff> {
    let mut diffs = Vec::new();

    compare_name_sets(
        &mut diffs,
        "schemas",
        &left.sorted_schema_names(),
        &right.sorted_schema_names(),
    );
    compare_name_sets(
        &mut diffs,
        "extensions",
        &left.sorted_extension_names(),
        &right.sorted_extension_names(),
    );

    for name in left.sorted_schema_names() {
        let Some(right_schema) = right.schemas.get(&name) else {
            continue;
        };
        compare_schemas(&mut diffs, &left.schemas[&name], right_schema);
    }
    diffs
}

fn compare_schemas(diffs: &mut Vec<SchemaDiff>, left: &Schema, right: &Schema) {
    let prefix = &left.name;

    let left_tables = left.sorted_base_table_names();
    let right_tables = right.sorted_base_table_names();
    if left_tables.len() != right_tables.len() {
        diffs.push(SchemaDiff::new(
            format!("{prefix}.tables.count"),
            left_tables.len().to_string(),
            right_tables.len().to_string(),
        ));
    }
    compare_name_sets(diffs, &format!("{prefix}.tables"), &left_tables, &right_tables);
    compare_name_sets(
        diffs,
        &format!("{prefix}.views"),
        &left.sorted_view_names(),
        &right.sorted_view_names(),
    );
    compare_name_sets(
        diffs,
        &format!("{prefix}.functions"),
        &left.sorted_function_names(),
        &right.sorted_function_names(),
    );
    compare_name_sets(
        diffs,
        &format!("{prefix}.procedures"),
        &left.sorted_procedure_names(),
        &right.sorted_procedure_names(),
    );
    compare_name_sets(
        diffs,
        &format!("{prefix}.sequences"),
        &left.sorted_sequence_names(),
        &right.sorted_sequence_names(),
    );
    compare_name_sets(
        diffs,
        &format!("{prefix}.aggregates"),
        &left.sorted_aggregate_names(),
        &right.sorted_aggregate_names(),
    );

    for table_name in &left_tables {
        let Some(right_table) = right.tables.get(table_name) else {
            continue;
        };
        compare_tables(diffs, &left.tables[table_name], right_table);
    }
}

fn compare_tables(diffs: &mut Vec<SchemaDiff>, left: &Table, right: &Table) {
    let prefix = format!("{}.{}", left.schema, left.name);

    if left.columns.len() != right.columns.len() {
        diffs.push(SchemaDiff::new(
            format!("{prefix}.columns.count"),
            left.columns.len().to_string(),
            right.columns.len().to_string(),
        ));
    }

    for left_col in &left.columns {
        let Some(right_col) = right.get_column(&left_col.name) else {
            diffs.push(SchemaDiff::new(
                format!("{prefix}.{}", left_col.name),
                left_col.name.clone(),
                ABSENT,
            ));
            continue;
        };
        let col_prefix = format!("{prefix}.{}", left_col.name);

        if left_col.position != right_col.position {
            diffs.push(SchemaDiff::new(
                format!("{col_prefix}.position"),
                left_col.position.to_string(),
                right_col.position.to_string(),
            ));
        }
        let left_type = canonical_type_name(&left_col.data_type);
        let right_type = canonical_type_name(&right_col.data_type);
        if left_type != right_type {
            let diff = SchemaDiff::new(format!("{col_prefix}.data_type"), left_type.clone(), right_type.clone());
            // A loader that strips only same-schema qualifiers spells
            // cross-schema types differently; flag rather than fail.
            if unqualified(&left_type) == unqualified(&right_type) {
                diffs.push(diff.soft());
            } else {
                diffs.push(diff);
            }
        }
        if left_col.nullable != right_col.nullable {
            diffs.push(SchemaDiff::new(
                format!("{col_prefix}.nullable"),
                left_col.nullable.to_string(),
                right_col.nullable.to_string(),
            ));
        }
        if !defaults_equal(
            left_col.default_value.as_deref(),
            right_col.default_value.as_deref(),
        ) {
            diffs.push(SchemaDiff::new(
                format!("{col_prefix}.default"),
                left_col.default_value.clone().unwrap_or_else(|| ABSENT.into()),
                right_col.default_value.clone().unwrap_or_else(|| ABSENT.into()),
            ));
        }
    }
    for right_col in &right.columns {
        if left.get_column(&right_col.name).is_none() {
            diffs.push(SchemaDiff::new(
                format!("{prefix}.{}", right_col.name),
                ABSENT,
                right_col.name.clone(),
            ));
        }
    }

    // Indexes are table-scoped: count, then field-by-field on shared names.
    if left.indexes.len() != right.indexes.len() {
        diffs.push(SchemaDiff::new(
            format!("{prefix}.indexes.count"),
            left.indexes.len().to_string(),
            right.indexes.len().to_string(),
        ));
    }
    compare_name_sets(
        diffs,
        &format!("{prefix}.indexes"),
        &left.sorted_index_names(),
        &right.sorted_index_names(),
    );
    for name in left.sorted_index_names() {
        if let Some(right_index) = right.indexes.get(&name) {
            compare_indexes(diffs, &left.indexes[&name], right_index);
        }
    }

    compare_name_sets(
        diffs,
        &format!("{prefix}.triggers"),
        &left.sorted_trigger_names(),
        &right.sorted_trigger_names(),
    );
    for name in left.sorted_trigger_names() {
        if let Some(right_trigger) = right.triggers.get(&name) {
            compare_triggers(diffs, &left.triggers[&name], right_trigger);
        }
    }
}

fn compare_indexes(diffs: &mut Vec<SchemaDiff>, left: &Index, right: &Index) {
    let prefix = format!("{}.{}.{}", left.schema, left.table, left.name);

    if left.index_type != right.index_type {
        diffs.push(SchemaDiff::new(
            format!("{prefix}.kind"),
            left.index_type.to_string(),
            right.index_type.to_string(),
        ));
    }
    if left.is_unique != right.is_unique {
        diffs.push(SchemaDiff::new(
            format!("{prefix}.unique"),
            left.is_unique.to_string(),
            right.is_unique.to_string(),
        ));
    }
    if left.is_partial != right.is_partial {
        diffs.push(SchemaDiff::new(
            format!("{prefix}.partial"),
            left.is_partial.to_string(),
            right.is_partial.to_string(),
        ));
    }
    if left.method != right.method {
        diffs.push(SchemaDiff::new(
            format!("{prefix}.method"),
            left.method.clone(),
            right.method.clone(),
        ));
    }
    if left.columns.len() != right.columns.len() {
        diffs.push(SchemaDiff::new(
            format!("{prefix}.columns.count"),
            left.columns.len().to_string(),
            right.columns.len().to_string(),
        ));
    }
    for (left_col, right_col) in left.columns.iter().zip(&right.columns) {
        let col_prefix = format!("{prefix}.column{}", left_col.position);
        if left_col.name != right_col.name {
            diffs.push(SchemaDiff::new(
                format!("{col_prefix}.name"),
                left_col.name.clone(),
                right_col.name.clone(),
            ));
        }
        if left_col.position != right_col.position {
            diffs.push(SchemaDiff::new(
                format!("{col_prefix}.position"),
                left_col.position.to_string(),
                right_col.position.to_string(),
            ));
        }
        if left_col.direction != right_col.direction {
            diffs.push(SchemaDiff::new(
                format!("{col_prefix}.direction"),
                left_col.direction.to_string(),
                right_col.direction.to_string(),
            ));
        }
        if left_col.operator_class != right_col.operator_class {
            diffs.push(SchemaDiff::new(
                format!("{col_prefix}.operator_class"),
                left_col.operator_class.clone().unwrap_or_else(|| ABSENT.into()),
                right_col.operator_class.clone().unwrap_or_else(|| ABSENT.into()),
            ));
        }
    }
    let left_where = left.where_clause.as_deref().map(canonical_index_where);
    let right_where = right.where_clause.as_deref().map(canonical_index_where);
    if left_where != right_where {
        diffs.push(SchemaDiff::new(
            format!("{prefix}.where"),
            left_where.unwrap_or_else(|| ABSENT.into()),
            right_where.unwrap_or_else(|| ABSENT.into()),
        ));
    }
}

fn compare_triggers(diffs: &mut Vec<SchemaDiff>, left: &Trigger, right: &Trigger) {
    let prefix = format!("{}.{}.{}", left.schema, left.table, left.name);

    if left.timing != right.timing {
        diffs.push(SchemaDiff::new(
            format!("{prefix}.timing"),
            left.timing.to_string(),
            right.timing.to_string(),
        ));
    }
    if left.level != right.level {
        diffs.push(SchemaDiff::new(
            format!("{prefix}.level"),
            left.level.to_string(),
            right.level.to_string(),
        ));
    }
    if left.events != right.events {
        diffs.push(SchemaDiff::new(
            format!("{prefix}.events"),
            event_list(left),
            event_list(right),
        ));
    }
    if left.function_call != right.function_call {
        diffs.push(SchemaDiff::new(
            format!("{prefix}.function"),
            left.function_call.clone(),
            right.function_call.clone(),
        ));
    }
    let left_when = left.when_condition.as_deref().map(canonical_trigger_when);
    let right_when = right.when_condition.as_deref().map(canonical_trigger_when);
    if left_when != right_when {
        diffs.push(SchemaDiff::new(
            format!("{prefix}.when"),
            left_when.unwrap_or_else(|| ABSENT.into()),
            right_when.unwrap_or_else(|| ABSENT.into()),
        ));
    }
}

fn event_list(trigger: &Trigger) -> String {
    trigger
        .events
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Report names present on one side only. Both inputs are sorted.
fn compare_name_sets(
    diffs: &mut Vec<SchemaDiff>,
    path: &str,
    left: &[String],
    right: &[String],
) {
    for name in left {
        if !right.contains(name) {
            diffs.push(SchemaDiff::new(
                format!("{path}.{name}"),
                name.clone(),
                ABSENT,
            ));
        }
    }
    for name in right {
        if !left.contains(name) {
            diffs.push(SchemaDiff::new(
                format!("{path}.{name}"),
                ABSENT,
                name.clone(),
            ));
        }
    }
}

fn unqualified(type_name: &str) -> &str {
    type_name.rsplit('.').next().unwrap_or(type_name)
}
