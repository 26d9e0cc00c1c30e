//! Raw catalog row shapes and the coercion helpers that produce them.
//!
//! The catalog surfaces everything as nullable strings, ints, and bools;
//! these helpers coerce at the query boundary so the assembly code and the
//! model stay strongly typed. A row missing a structurally required field is
//! skipped by its assembler, never fatal.

use sqlx::Row;
use sqlx::postgres::PgRow;

pub(crate) fn opt_string(row: &PgRow, column: &str) -> Option<String> {
    row.try_get::<Option<String>, _>(column).ok().flatten()
}

pub(crate) fn req_string(row: &PgRow, column: &str) -> String {
    opt_string(row, column).unwrap_or_default()
}

pub(crate) fn opt_i32(row: &PgRow, column: &str) -> Option<i32> {
    row.try_get::<Option<i32>, _>(column).ok().flatten()
}

pub(crate) fn opt_i64(row: &PgRow, column: &str) -> Option<i64> {
    row.try_get::<Option<i64>, _>(column).ok().flatten()
}

pub(crate) fn opt_bool(row: &PgRow, column: &str) -> Option<bool> {
    row.try_get::<Option<bool>, _>(column).ok().flatten()
}

pub(crate) fn req_bool(row: &PgRow, column: &str) -> bool {
    opt_bool(row, column).unwrap_or(false)
}

pub(crate) fn string_vec(row: &PgRow, column: &str) -> Vec<String> {
    row.try_get::<Option<Vec<String>>, _>(column)
        .ok()
        .flatten()
        .unwrap_or_default()
}

// ---------------------------------------------------------------------------
// Row shapes
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub(crate) struct TableRow {
    pub table_name: String,
    pub relkind: String,
    pub persistence: String,
    pub rls_enabled: bool,
    /// `pg_get_partkeydef` output, e.g. `RANGE (tenant_id, created_at)`.
    pub partition_key_def: Option<String>,
}

#[derive(Debug, Clone)]
pub(crate) struct ColumnRow {
    pub table_name: String,
    pub column_name: String,
    pub ordinal_position: Option<i32>,
    pub data_type: String,
    pub udt_name: String,
    pub is_nullable: String,
    pub column_default: Option<String>,
    pub character_maximum_length: Option<i32>,
    pub numeric_precision: Option<i32>,
    pub numeric_scale: Option<i32>,
    pub is_identity: String,
    pub identity_generation: Option<String>,
    pub identity_start: Option<String>,
    pub identity_increment: Option<String>,
    pub identity_minimum: Option<String>,
    pub identity_maximum: Option<String>,
    pub identity_cycle: Option<String>,
}

#[derive(Debug, Clone)]
pub(crate) struct AttachmentRow {
    pub parent_schema: String,
    pub parent_table: String,
    pub child_schema: String,
    pub child_table: String,
    pub partition_bound: Option<String>,
}

#[derive(Debug, Clone)]
pub(crate) struct ConstraintRow {
    pub table_name: String,
    pub constraint_name: String,
    pub constraint_type: String,
    pub column_name: Option<String>,
    pub column_position: Option<i32>,
    pub foreign_schema: Option<String>,
    pub foreign_table: Option<String>,
    pub foreign_column: Option<String>,
    pub foreign_ordinal_position: Option<i32>,
    pub delete_rule: Option<String>,
    pub update_rule: Option<String>,
    pub deferrable: bool,
    pub initially_deferred: bool,
    pub check_clause: Option<String>,
}

#[derive(Debug, Clone)]
pub(crate) struct IndexRow {
    pub table_name: String,
    pub index_name: String,
    pub method: String,
    pub is_unique: bool,
    pub is_primary: bool,
    pub is_partial: bool,
    pub has_expressions: bool,
    pub definition: String,
    pub where_clause: Option<String>,
}

#[derive(Debug, Clone)]
pub(crate) struct SequenceRow {
    pub sequence_name: String,
    pub data_type: String,
    pub start_value: Option<i64>,
    pub increment_by: Option<i64>,
    pub min_value: Option<i64>,
    pub max_value: Option<i64>,
    pub cycle: bool,
}

#[derive(Debug, Clone)]
pub(crate) struct SequenceOwnerRow {
    pub sequence_name: String,
    pub table_name: String,
    pub column_name: String,
}

#[derive(Debug, Clone)]
pub(crate) struct FunctionRow {
    pub name: String,
    pub definition: String,
    pub language: String,
    pub return_type: Option<String>,
    pub arguments: String,
    pub signature: String,
    pub volatility: Option<String>,
    pub is_strict: bool,
    pub security_definer: bool,
}

#[derive(Debug, Clone)]
pub(crate) struct AggregateRow {
    pub name: String,
    pub arguments: String,
    pub signature: String,
    pub return_type: String,
    pub state_type: String,
    pub transition_function: Option<String>,
    pub transition_function_schema: Option<String>,
    pub initial_condition: Option<String>,
    pub final_function: Option<String>,
    pub final_function_schema: Option<String>,
}

#[derive(Debug, Clone)]
pub(crate) struct ViewRow {
    pub view_name: String,
    pub definition: String,
}

#[derive(Debug, Clone)]
pub(crate) struct TriggerRow {
    pub table_name: String,
    pub trigger_name: String,
    pub action_timing: String,
    pub event_manipulation: String,
    pub action_orientation: String,
    pub action_statement: String,
    pub action_condition: Option<String>,
}

#[derive(Debug, Clone)]
pub(crate) struct PolicyRow {
    pub table_name: String,
    pub policy_name: String,
    pub command: String,
    pub permissive: String,
    pub roles: Vec<String>,
    pub using_expression: Option<String>,
    pub with_check_expression: Option<String>,
}

#[derive(Debug, Clone)]
pub(crate) struct ExtensionRow {
    pub name: String,
    pub schema: String,
    pub version: String,
}

#[derive(Debug, Clone)]
pub(crate) struct EnumValueRow {
    pub type_name: String,
    pub label: String,
}

#[derive(Debug, Clone)]
pub(crate) struct CompositeColumnRow {
    pub type_name: String,
    pub column_name: String,
    pub data_type: String,
    pub position: Option<i32>,
}

#[derive(Debug, Clone)]
pub(crate) struct DomainRow {
    pub domain_name: String,
    pub base_type: String,
    pub not_null: bool,
    pub default_value: Option<String>,
}

#[derive(Debug, Clone)]
pub(crate) struct DomainConstraintRow {
    pub domain_name: String,
    pub constraint_name: String,
    pub definition: String,
}

// ---------------------------------------------------------------------------
// PgRow -> row shape conversions
// ---------------------------------------------------------------------------

impl From<&PgRow> for TableRow {
    fn from(row: &PgRow) -> Self {
        Self {
            table_name: req_string(row, "table_name"),
            relkind: req_string(row, "relkind"),
            persistence: req_string(row, "persistence"),
            rls_enabled: req_bool(row, "rls_enabled"),
            partition_key_def: opt_string(row, "partition_key_def"),
        }
    }
}

impl From<&PgRow> for ColumnRow {
    fn from(row: &PgRow) -> Self {
        Self {
            table_name: req_string(row, "table_name"),
            column_name: req_string(row, "column_name"),
            ordinal_position: opt_i32(row, "ordinal_position"),
            data_type: req_string(row, "data_type"),
            udt_name: req_string(row, "udt_name"),
            is_nullable: req_string(row, "is_nullable"),
            column_default: opt_string(row, "column_default"),
            character_maximum_length: opt_i32(row, "character_maximum_length"),
            numeric_precision: opt_i32(row, "numeric_precision"),
            numeric_scale: opt_i32(row, "numeric_scale"),
            is_identity: req_string(row, "is_identity"),
            identity_generation: opt_string(row, "identity_generation"),
            identity_start: opt_string(row, "identity_start"),
            identity_increment: opt_string(row, "identity_increment"),
            identity_minimum: opt_string(row, "identity_minimum"),
            identity_maximum: opt_string(row, "identity_maximum"),
            identity_cycle: opt_string(row, "identity_cycle"),
        }
    }
}

impl From<&PgRow> for AttachmentRow {
    fn from(row: &PgRow) -> Self {
        Self {
            parent_schema: req_string(row, "parent_schema"),
            parent_table: req_string(row, "parent_table"),
            child_schema: req_string(row, "child_schema"),
            child_table: req_string(row, "child_table"),
            partition_bound: opt_string(row, "partition_bound"),
        }
    }
}

impl From<&PgRow> for ConstraintRow {
    fn from(row: &PgRow) -> Self {
        Self {
            table_name: req_string(row, "table_name"),
            constraint_name: req_string(row, "constraint_name"),
            constraint_type: req_string(row, "constraint_type"),
            column_name: opt_string(row, "column_name"),
            column_position: opt_i32(row, "column_position"),
            foreign_schema: opt_string(row, "foreign_schema"),
            foreign_table: opt_string(row, "foreign_table"),
            foreign_column: opt_string(row, "foreign_column"),
            foreign_ordinal_position: opt_i32(row, "foreign_ordinal_position"),
            delete_rule: opt_string(row, "delete_rule"),
            update_rule: opt_string(row, "update_rule"),
            deferrable: req_bool(row, "deferrable"),
            initially_deferred: req_bool(row, "initially_deferred"),
            check_clause: opt_string(row, "check_clause"),
        }
    }
}

impl From<&PgRow> for IndexRow {
    fn from(row: &PgRow) -> Self {
        Self {
            table_name: req_string(row, "table_name"),
            index_name: req_string(row, "index_name"),
            method: req_string(row, "method"),
            is_unique: req_bool(row, "is_unique"),
            is_primary: req_bool(row, "is_primary"),
            is_partial: req_bool(row, "is_partial"),
            has_expressions: req_bool(row, "has_expressions"),
            definition: req_string(row, "definition"),
            where_clause: opt_string(row, "where_clause"),
        }
    }
}

impl From<&PgRow> for SequenceRow {
    fn from(row: &PgRow) -> Self {
        Self {
            sequence_name: req_string(row, "sequence_name"),
            data_type: req_string(row, "data_type"),
            start_value: opt_i64(row, "start_value"),
            increment_by: opt_i64(row, "increment_by"),
            min_value: opt_i64(row, "min_value"),
            max_value: opt_i64(row, "max_value"),
            cycle: req_bool(row, "cycle"),
        }
    }
}

impl From<&PgRow> for SequenceOwnerRow {
    fn from(row: &PgRow) -> Self {
        Self {
            sequence_name: req_string(row, "sequence_name"),
            table_name: req_string(row, "table_name"),
            column_name: req_string(row, "column_name"),
        }
    }
}

impl From<&PgRow> for FunctionRow {
    fn from(row: &PgRow) -> Self {
        Self {
            name: req_string(row, "name"),
            definition: req_string(row, "definition"),
            language: req_string(row, "language"),
            return_type: opt_string(row, "return_type"),
            arguments: req_string(row, "arguments"),
            signature: req_string(row, "signature"),
            volatility: opt_string(row, "volatility"),
            is_strict: req_bool(row, "is_strict"),
            security_definer: req_bool(row, "security_definer"),
        }
    }
}

impl From<&PgRow> for AggregateRow {
    fn from(row: &PgRow) -> Self {
        Self {
            name: req_string(row, "name"),
            arguments: req_string(row, "arguments"),
            signature: req_string(row, "signature"),
            return_type: req_string(row, "return_type"),
            state_type: req_string(row, "state_type"),
            transition_function: opt_string(row, "transition_function"),
            transition_function_schema: opt_string(row, "transition_function_schema"),
            initial_condition: opt_string(row, "initial_condition"),
            final_function: opt_string(row, "final_function"),
            final_function_schema: opt_string(row, "final_function_schema"),
        }
    }
}

impl From<&PgRow> for ViewRow {
    fn from(row: &PgRow) -> Self {
        Self {
            view_name: req_string(row, "view_name"),
            definition: req_string(row, "definition"),
        }
    }
}

impl From<&PgRow> for TriggerRow {
    fn from(row: &PgRow) -> Self {
        Self {
            table_name: req_string(row, "table_name"),
            trigger_name: req_string(row, "trigger_name"),
            action_timing: req_string(row, "action_timing"),
            event_manipulation: req_string(row, "event_manipulation"),
            action_orientation: req_string(row, "action_orientation"),
            action_statement: req_string(row, "action_statement"),
            action_condition: opt_string(row, "action_condition"),
        }
    }
}

impl From<&PgRow> for PolicyRow {
    fn from(row: &PgRow) -> Self {
        Self {
            table_name: req_string(row, "table_name"),
            policy_name: req_string(row, "policy_name"),
            command: req_string(row, "command"),
            permissive: req_string(row, "permissive"),
            roles: string_vec(row, "roles"),
            using_expression: opt_string(row, "using_expression"),
            with_check_expression: opt_string(row, "with_check_expression"),
        }
    }
}

impl From<&PgRow> for ExtensionRow {
    fn from(row: &PgRow) -> Self {
        Self {
            name: req_string(row, "name"),
            schema: req_string(row, "schema"),
            version: req_string(row, "version"),
        }
    }
}

impl From<&PgRow> for EnumValueRow {
    fn from(row: &PgRow) -> Self {
        Self {
            type_name: req_string(row, "type_name"),
            label: req_string(row, "label"),
        }
    }
}

impl From<&PgRow> for CompositeColumnRow {
    fn from(row: &PgRow) -> Self {
        Self {
            type_name: req_string(row, "type_name"),
            column_name: req_string(row, "column_name"),
            data_type: req_string(row, "data_type"),
            position: opt_i32(row, "position"),
        }
    }
}

impl From<&PgRow> for DomainRow {
    fn from(row: &PgRow) -> Self {
        Self {
            domain_name: req_string(row, "domain_name"),
            base_type: req_string(row, "base_type"),
            not_null: req_bool(row, "not_null"),
            default_value: opt_string(row, "default_value"),
        }
    }
}

impl From<&PgRow> for DomainConstraintRow {
    fn from(row: &PgRow) -> Self {
        Self {
            domain_name: req_string(row, "domain_name"),
            constraint_name: req_string(row, "constraint_name"),
            definition: req_string(row, "definition"),
        }
    }
}
