//! Relational DDL: tables, constraints, indexes, sequences, types, schemas,
//! and extensions.

use std::sync::LazyLock;

use pg_query::NodeEnum;
use pg_query::protobuf::{self, ConstrType};
use regex::Regex;
use tracing::debug;

use crate::error::LoadError;
use crate::model::{
    Column, CompositeColumn, Constraint, ConstraintType, Database, DomainConstraint, Extension,
    FkAction, Identity, IdentityGeneration, Index, IndexColumn, IndexType, PartitionAttachment,
    PartitionStrategy, Sequence, SortDirection, Table, TableType, TypeDef, TypeKind,
};
use crate::normalize::{
    canonical_default, canonical_index_where, canonical_type_name, simplify_json_expression,
};
use crate::parser::DdlLoader;
use crate::parser::expr::{print_opt_node, type_name_text};

/// Schema assumed for unqualified names, as PostgreSQL does by default.
pub(crate) const DEFAULT_SCHEMA: &str = "public";

/// Suffixes PostgreSQL deployments conventionally give partition children:
/// `_p2024`, `_p2024_01`, `_2024`, `_2024_01`, `_2024_01_15`.
static PARTITION_SUFFIX_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"_(?:p\d{4}(?:_\d{2})?|\d{4}(?:_\d{2}(?:_\d{2})?)?)$").expect("partition regex")
});

// ---------------------------------------------------------------------------
// Shared helpers
// ---------------------------------------------------------------------------

/// `(schema, name)` of a relation reference, defaulting the schema.
pub(crate) fn qualified_name(rel: Option<&protobuf::RangeVar>) -> (String, String) {
    match rel {
        Some(r) if !r.schemaname.is_empty() => (r.schemaname.clone(), r.relname.clone()),
        Some(r) => (DEFAULT_SCHEMA.to_string(), r.relname.clone()),
        None => (DEFAULT_SCHEMA.to_string(), String::new()),
    }
}

/// Extract the string items of a node list (constraint keys, name lists).
pub(crate) fn string_list(nodes: &[protobuf::Node]) -> Vec<String> {
    nodes
        .iter()
        .filter_map(|n| match n.node.as_ref() {
            Some(NodeEnum::String(s)) => Some(s.sval.clone()),
            _ => None,
        })
        .collect()
}

/// Split a dotted object name list into `(schema, name)`.
pub(crate) fn object_name(nodes: &[protobuf::Node]) -> (String, String) {
    let parts = string_list(nodes);
    match parts.len() {
        0 => (DEFAULT_SCHEMA.to_string(), String::new()),
        1 => (DEFAULT_SCHEMA.to_string(), parts[0].clone()),
        _ => (
            parts[parts.len() - 2].clone(),
            parts[parts.len() - 1].clone(),
        ),
    }
}

pub(crate) fn def_elem_string(def: &protobuf::DefElem) -> Option<String> {
    match def.arg.as_ref().and_then(|a| a.node.as_ref()) {
        Some(NodeEnum::String(s)) => Some(s.sval.clone()),
        Some(NodeEnum::Integer(i)) => Some(i.ival.to_string()),
        Some(NodeEnum::Float(f)) => Some(f.fval.clone()),
        Some(NodeEnum::Boolean(b)) => Some(b.boolval.to_string()),
        Some(NodeEnum::TypeName(tn)) => Some(type_name_text(tn)),
        Some(NodeEnum::List(list)) => {
            let parts = string_list(&list.items);
            if parts.is_empty() {
                None
            } else {
                Some(parts.join("."))
            }
        }
        _ => None,
    }
}

fn def_elem_i64(def: &protobuf::DefElem) -> Option<i64> {
    match def.arg.as_ref().and_then(|a| a.node.as_ref()) {
        Some(NodeEnum::Integer(i)) => Some(i.ival as i64),
        Some(NodeEnum::Float(f)) => f.fval.parse().ok(),
        _ => None,
    }
}

fn def_elem_bool(def: &protobuf::DefElem) -> bool {
    match def.arg.as_ref().and_then(|a| a.node.as_ref()) {
        Some(NodeEnum::Boolean(b)) => b.boolval,
        Some(NodeEnum::Integer(i)) => i.ival != 0,
        // A bare `CYCLE` option with no argument means true.
        None => true,
        _ => false,
    }
}

/// Column type information recovered from a `TypeName` node.
pub(crate) struct ParsedColumnType {
    pub data_type: String,
    pub udt_name: String,
    pub max_length: Option<i32>,
    pub precision: Option<i32>,
    pub scale: Option<i32>,
    /// Canonical integer type when the declared type was a SERIAL flavor.
    pub serial: Option<&'static str>,
}

/// Canonicalise a column's declared type. The last element of `names[]` is
/// the type; a qualifier equal to the owning schema is dropped so both
/// loaders spell same-schema types the same way.
pub(crate) fn parse_column_type(
    tn: Option<&protobuf::TypeName>,
    owning_schema: &str,
) -> ParsedColumnType {
    let mut out = ParsedColumnType {
        data_type: "text".to_string(),
        udt_name: "text".to_string(),
        max_length: None,
        precision: None,
        scale: None,
        serial: None,
    };
    let Some(tn) = tn else {
        return out;
    };

    let parts: Vec<String> = tn
        .names
        .iter()
        .filter_map(|n| match n.node.as_ref() {
            Some(NodeEnum::String(s)) if s.sval != "pg_catalog" => Some(s.sval.clone()),
            _ => None,
        })
        .collect();
    let Some(raw) = parts.last() else {
        return out;
    };
    out.udt_name = raw.clone();

    let lowered = raw.to_lowercase();
    out.serial = match lowered.as_str() {
        "smallserial" | "serial2" => Some("smallint"),
        "serial" | "serial4" => Some("integer"),
        "bigserial" | "serial8" => Some("bigint"),
        _ => None,
    };

    let mut base = match out.serial {
        Some(serial) => serial.to_string(),
        None => canonical_type_name(raw),
    };
    if parts.len() > 1 {
        let qualifier = &parts[parts.len() - 2];
        if qualifier != owning_schema {
            base = format!("{qualifier}.{base}");
        }
    }

    let mods: Vec<i32> = tn
        .typmods
        .iter()
        .filter_map(|n| match n.node.as_ref() {
            Some(NodeEnum::Integer(i)) => Some(i.ival),
            Some(NodeEnum::AConst(ac)) => match ac.val.as_ref() {
                Some(protobuf::a_const::Val::Ival(i)) => Some(i.ival),
                _ => None,
            },
            _ => None,
        })
        .collect();
    match base.as_str() {
        "numeric" | "decimal" => {
            out.precision = mods.first().copied();
            out.scale = mods.get(1).copied().or(if mods.is_empty() {
                None
            } else {
                Some(0)
            });
        }
        "varchar" | "character" | "char" => {
            out.max_length = mods.first().copied();
        }
        _ => {}
    }

    if !tn.array_bounds.is_empty() {
        base.push_str("[]");
    }
    out.data_type = base;
    out
}

fn fk_action(code: &str) -> Option<FkAction> {
    match code {
        "a" => Some(FkAction::NoAction),
        "r" => Some(FkAction::Restrict),
        "c" => Some(FkAction::Cascade),
        "n" => Some(FkAction::SetNull),
        "d" => Some(FkAction::SetDefault),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Statement handlers
// ---------------------------------------------------------------------------

impl DdlLoader {
    pub(crate) fn create_schema(
        &mut self,
        stmt: &protobuf::CreateSchemaStmt,
    ) -> Result<(), LoadError> {
        if stmt.schemaname.is_empty() {
            return Ok(());
        }
        let owner = stmt
            .authrole
            .as_ref()
            .filter(|r| !r.rolename.is_empty())
            .map(|r| r.rolename.clone());
        let schema = self.db.get_or_create_schema(&stmt.schemaname);
        if owner.is_some() {
            schema.owner = owner;
        }
        Ok(())
    }

    pub(crate) fn create_extension(
        &mut self,
        stmt: &protobuf::CreateExtensionStmt,
    ) -> Result<(), LoadError> {
        if stmt.extname.is_empty() {
            return Ok(());
        }
        let mut schema = DEFAULT_SCHEMA.to_string();
        let mut version = String::new();
        for opt in &stmt.options {
            if let Some(NodeEnum::DefElem(def)) = opt.node.as_ref() {
                match def.defname.as_str() {
                    "schema" => {
                        if let Some(s) = def_elem_string(def) {
                            schema = s;
                        }
                    }
                    "new_version" | "version" => {
                        if let Some(v) = def_elem_string(def) {
                            version = v;
                        }
                    }
                    _ => {}
                }
            }
        }
        self.db.extensions.insert(
            stmt.extname.clone(),
            Extension {
                name: stmt.extname.clone(),
                schema,
                version,
            },
        );
        Ok(())
    }

    // -----------------------------------------------------------------------
    // CREATE TYPE / DOMAIN
    // -----------------------------------------------------------------------

    pub(crate) fn create_enum(
        &mut self,
        stmt: &protobuf::CreateEnumStmt,
    ) -> Result<(), LoadError> {
        let (schema_name, name) = object_name(&stmt.type_name);
        if name.is_empty() {
            return Ok(());
        }
        let values = string_list(&stmt.vals);
        let schema = self.db.get_or_create_schema(&schema_name);
        schema.types.insert(
            name.clone(),
            TypeDef {
                schema: schema_name,
                name,
                kind: TypeKind::Enum { values },
            },
        );
        Ok(())
    }

    pub(crate) fn create_composite(
        &mut self,
        stmt: &protobuf::CompositeTypeStmt,
    ) -> Result<(), LoadError> {
        let (schema_name, name) = qualified_name(stmt.typevar.as_ref());
        if name.is_empty() {
            return Ok(());
        }
        let mut columns = Vec::new();
        for (i, elt) in stmt.coldeflist.iter().enumerate() {
            let Some(NodeEnum::ColumnDef(col)) = elt.node.as_ref() else {
                continue;
            };
            let parsed = parse_column_type(col.type_name.as_ref(), &schema_name);
            columns.push(CompositeColumn {
                name: col.colname.clone(),
                data_type: parsed.data_type,
                position: i as i32 + 1,
            });
        }
        let schema = self.db.get_or_create_schema(&schema_name);
        schema.types.insert(
            name.clone(),
            TypeDef {
                schema: schema_name,
                name,
                kind: TypeKind::Composite { columns },
            },
        );
        Ok(())
    }

    pub(crate) fn create_domain(
        &mut self,
        stmt: &protobuf::CreateDomainStmt,
    ) -> Result<(), LoadError> {
        let (schema_name, name) = object_name(&stmt.domainname);
        if name.is_empty() {
            return Ok(());
        }
        let base = parse_column_type(stmt.type_name.as_ref(), &schema_name);

        let mut not_null = false;
        let mut default_value = None;
        let mut check_constraints = Vec::new();
        for (i, node) in stmt.constraints.iter().enumerate() {
            let Some(NodeEnum::Constraint(con)) = node.node.as_ref() else {
                continue;
            };
            match con.contype() {
                ConstrType::ConstrNotnull => not_null = true,
                ConstrType::ConstrDefault => {
                    let text = print_opt_node(con.raw_expr.as_deref());
                    if !text.is_empty() {
                        default_value = Some(canonical_default(&text));
                    }
                }
                ConstrType::ConstrCheck => {
                    let clause = print_opt_node(con.raw_expr.as_deref());
                    if clause.is_empty() {
                        continue;
                    }
                    let constraint_name = if con.conname.is_empty() {
                        if i == 0 {
                            format!("{name}_check")
                        } else {
                            format!("{name}_check{i}")
                        }
                    } else {
                        con.conname.clone()
                    };
                    check_constraints.push(DomainConstraint {
                        name: constraint_name,
                        check_clause: clause,
                    });
                }
                _ => {}
            }
        }

        let schema = self.db.get_or_create_schema(&schema_name);
        schema.types.insert(
            name.clone(),
            TypeDef {
                schema: schema_name,
                name,
                kind: TypeKind::Domain {
                    base_type: base.data_type,
                    not_null,
                    default_value,
                    check_constraints,
                },
            },
        );
        Ok(())
    }

    // -----------------------------------------------------------------------
    // CREATE SEQUENCE
    // -----------------------------------------------------------------------

    pub(crate) fn create_sequence(
        &mut self,
        stmt: &protobuf::CreateSeqStmt,
    ) -> Result<(), LoadError> {
        let (schema_name, name) = qualified_name(stmt.sequence.as_ref());
        if name.is_empty() {
            return Ok(());
        }
        let mut sequence = Sequence::new(&schema_name, &name);
        for opt in &stmt.options {
            let Some(NodeEnum::DefElem(def)) = opt.node.as_ref() else {
                continue;
            };
            match def.defname.as_str() {
                "as" => {
                    if let Some(t) = def_elem_string(def) {
                        sequence.data_type = canonical_type_name(&t);
                    }
                }
                "start" => sequence.start_value = def_elem_i64(def).unwrap_or(1),
                "increment" => sequence.increment = def_elem_i64(def).unwrap_or(1),
                "minvalue" => sequence.min_value = def_elem_i64(def),
                "maxvalue" => sequence.max_value = def_elem_i64(def),
                "cycle" => sequence.cycle = def_elem_bool(def),
                "owned_by" => {
                    if let Some(NodeEnum::List(list)) =
                        def.arg.as_ref().and_then(|a| a.node.as_ref())
                    {
                        let parts = string_list(&list.items);
                        // `OWNED BY NONE` arrives as a single "none" item.
                        if parts.len() >= 2 {
                            sequence.owned_by_table = Some(parts[parts.len() - 2].clone());
                            sequence.owned_by_column = Some(parts[parts.len() - 1].clone());
                        }
                    }
                }
                _ => {}
            }
        }
        let schema = self.db.get_or_create_schema(&schema_name);
        schema.sequences.insert(name, sequence);
        Ok(())
    }

    // -----------------------------------------------------------------------
    // CREATE TABLE
    // -----------------------------------------------------------------------

    pub(crate) fn create_table(&mut self, stmt: &protobuf::CreateStmt) -> Result<(), LoadError> {
        let (schema_name, table_name) = qualified_name(stmt.relation.as_ref());
        if table_name.is_empty() {
            return Ok(());
        }

        let mut table = Table::new(&schema_name, &table_name);
        if stmt
            .relation
            .as_ref()
            .is_some_and(|r| r.relpersistence == "t")
        {
            table.table_type = TableType::Temporary;
        }

        // PARTITION BY marks a partitioned parent.
        if let Some(spec) = stmt.partspec.as_ref() {
            table.is_partitioned = true;
            table.partition_strategy = match protobuf::PartitionStrategy::try_from(spec.strategy) {
                Ok(protobuf::PartitionStrategy::Range) => Some(PartitionStrategy::Range),
                Ok(protobuf::PartitionStrategy::List) => Some(PartitionStrategy::List),
                Ok(protobuf::PartitionStrategy::Hash) => Some(PartitionStrategy::Hash),
                _ => None,
            };
            let key_parts: Vec<String> = spec
                .part_params
                .iter()
                .filter_map(|p| match p.node.as_ref() {
                    Some(NodeEnum::PartitionElem(elem)) => {
                        if !elem.name.is_empty() {
                            Some(elem.name.clone())
                        } else {
                            elem.expr.as_deref().map(|e| print_opt_node(Some(e)))
                        }
                    }
                    _ => None,
                })
                .collect();
            table.partition_key = key_parts.join(", ");
            self.partition_parents
                .insert((schema_name.clone(), table_name.clone()));
        }

        // PARTITION OF records the attachment; the child's columns come from
        // the parent and are not repeated in the statement.
        if stmt.partbound.is_some()
            && let Some(parent) = stmt
                .inh_relations
                .first()
                .and_then(|n| match n.node.as_ref() {
                    Some(NodeEnum::RangeVar(rv)) => Some(qualified_name(Some(rv))),
                    _ => None,
                })
        {
            let bound = stmt
                .partbound
                .as_ref()
                .map(|b| partition_bound_text(b))
                .unwrap_or_default();
            self.partition_children
                .insert((schema_name.clone(), table_name.clone()), parent.clone());
            self.db.partition_attachments.push(PartitionAttachment {
                parent_schema: parent.0,
                parent_table: parent.1,
                child_schema: schema_name.clone(),
                child_table: table_name.clone(),
                partition_bound: bound,
            });
        }

        let mut pending_constraints: Vec<Constraint> = Vec::new();
        let mut pending_sequences: Vec<Sequence> = Vec::new();

        for elt in &stmt.table_elts {
            match elt.node.as_ref() {
                Some(NodeEnum::ColumnDef(col)) => {
                    append_column(
                        &mut table,
                        col,
                        &mut pending_constraints,
                        &mut pending_sequences,
                    );
                }
                Some(NodeEnum::Constraint(con)) => {
                    if let Some(constraint) =
                        convert_table_constraint(con, &schema_name, &table_name, None)
                    {
                        pending_constraints.push(constraint);
                    }
                }
                _ => {}
            }
        }

        let key_columns = table.partition_key_columns();
        for mut constraint in pending_constraints {
            if constraint.constraint_type == ConstraintType::PrimaryKey {
                constraint.order_partition_key_first(&key_columns);
            }
            attach_constraint(&mut table, constraint);
        }

        let schema = self.db.get_or_create_schema(&schema_name);
        schema.tables.insert(table_name, table);
        for sequence in pending_sequences {
            schema.sequences.insert(sequence.name.clone(), sequence);
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // ALTER TABLE
    // -----------------------------------------------------------------------

    pub(crate) fn alter_table(
        &mut self,
        stmt: &protobuf::AlterTableStmt,
    ) -> Result<(), LoadError> {
        let (schema_name, table_name) = qualified_name(stmt.relation.as_ref());
        let table_exists = self
            .db
            .schemas
            .get(&schema_name)
            .is_some_and(|s| s.tables.contains_key(&table_name));
        if !table_exists {
            return Err(LoadError::AlterOnMissingTable {
                schema: schema_name,
                table: table_name,
            });
        }

        for cmd_node in &stmt.cmds {
            let Some(NodeEnum::AlterTableCmd(cmd)) = cmd_node.node.as_ref() else {
                continue;
            };
            self.apply_alter_cmd(&schema_name, &table_name, cmd);
        }
        Ok(())
    }

    fn apply_alter_cmd(
        &mut self,
        schema_name: &str,
        table_name: &str,
        cmd: &protobuf::AlterTableCmd,
    ) {
        use protobuf::AlterTableType::*;

        match cmd.subtype() {
            AtColumnDefault => {
                let default = cmd
                    .def
                    .as_deref()
                    .map(|n| print_opt_node(Some(n)))
                    .filter(|t| !t.is_empty())
                    .map(|t| canonical_default(&t));
                if let Some(column) = self.column_mut(schema_name, table_name, &cmd.name) {
                    column.default_value = default;
                }
            }
            AtAddConstraint => {
                let Some(NodeEnum::Constraint(con)) =
                    cmd.def.as_ref().and_then(|d| d.node.as_ref())
                else {
                    return;
                };
                let Some(mut constraint) =
                    convert_table_constraint(con, schema_name, table_name, None)
                else {
                    return;
                };
                let key_columns = self.partition_key_for(schema_name, table_name);
                if constraint.constraint_type == ConstraintType::PrimaryKey {
                    constraint.order_partition_key_first(&key_columns);
                }
                if let Some(table) = self.table_mut(schema_name, table_name) {
                    attach_constraint(table, constraint);
                }
            }
            AtSetNotNull => {
                if let Some(column) = self.column_mut(schema_name, table_name, &cmd.name) {
                    column.nullable = false;
                }
            }
            AtDropNotNull => {
                if let Some(column) = self.column_mut(schema_name, table_name, &cmd.name) {
                    column.nullable = true;
                }
            }
            AtEnableRowSecurity => {
                if let Some(table) = self.table_mut(schema_name, table_name) {
                    table.rls_enabled = true;
                }
            }
            AtDisableRowSecurity => {
                if let Some(table) = self.table_mut(schema_name, table_name) {
                    table.rls_enabled = false;
                }
            }
            AtAttachPartition => {
                let Some(NodeEnum::PartitionCmd(pc)) =
                    cmd.def.as_ref().and_then(|d| d.node.as_ref())
                else {
                    return;
                };
                let Some(child) = pc.name.as_ref().map(|rv| qualified_name(Some(rv))) else {
                    return;
                };
                let bound = pc
                    .bound
                    .as_ref()
                    .map(|b| partition_bound_text(b))
                    .unwrap_or_default();
                self.partition_children.insert(
                    child.clone(),
                    (schema_name.to_string(), table_name.to_string()),
                );
                self.db.partition_attachments.push(PartitionAttachment {
                    parent_schema: schema_name.to_string(),
                    parent_table: table_name.to_string(),
                    child_schema: child.0,
                    child_table: child.1,
                    partition_bound: bound,
                });
            }
            other => {
                debug!(subtype = ?other, table = table_name, "ignored ALTER TABLE action");
            }
        }
    }

    /// Partition-key columns relevant to a table's primary key: its own key
    /// when partitioned, or the parent's key when the table is an attached
    /// partition child.
    fn partition_key_for(&self, schema_name: &str, table_name: &str) -> Vec<String> {
        let lookup = |s: &str, t: &str| -> Vec<String> {
            self.db
                .schemas
                .get(s)
                .and_then(|schema| schema.tables.get(t))
                .map(|table| table.partition_key_columns())
                .unwrap_or_default()
        };
        let key = (schema_name.to_string(), table_name.to_string());
        if self.partition_parents.contains(&key) {
            return lookup(schema_name, table_name);
        }
        if let Some(parent) = self.partition_children.get(&key) {
            return lookup(&parent.0, &parent.1);
        }
        Vec::new()
    }

    pub(crate) fn table_mut(&mut self, schema_name: &str, table_name: &str) -> Option<&mut Table> {
        self.db
            .schemas
            .get_mut(schema_name)
            .and_then(|s| s.tables.get_mut(table_name))
    }

    fn column_mut(
        &mut self,
        schema_name: &str,
        table_name: &str,
        column: &str,
    ) -> Option<&mut Column> {
        self.table_mut(schema_name, table_name)
            .and_then(|t| t.get_column_mut(column))
    }

    // -----------------------------------------------------------------------
    // CREATE INDEX
    // -----------------------------------------------------------------------

    pub(crate) fn create_index(&mut self, stmt: &protobuf::IndexStmt) -> Result<(), LoadError> {
        let (schema_name, table_name) = qualified_name(stmt.relation.as_ref());
        let Some(table) = self.table_mut(&schema_name, &table_name) else {
            debug!(table = table_name, "index on unknown table dropped");
            return Ok(());
        };

        let mut index = Index::new(&schema_name, &table_name, "");
        index.method = if stmt.access_method.is_empty() {
            "btree".to_string()
        } else {
            stmt.access_method.clone()
        };
        index.is_unique = stmt.unique;
        index.is_concurrent = stmt.concurrent;

        for (i, param) in stmt.index_params.iter().enumerate() {
            let Some(NodeEnum::IndexElem(elem)) = param.node.as_ref() else {
                continue;
            };
            let name = if !elem.name.is_empty() {
                elem.name.clone()
            } else if let Some(expr) = elem.expr.as_deref() {
                index.is_expression = true;
                let text = print_opt_node(Some(expr));
                if text.contains("->") {
                    simplify_json_expression(&text)
                } else if text.starts_with('(') {
                    text
                } else {
                    format!("({text})")
                }
            } else {
                continue;
            };
            let mut column = IndexColumn::new(name, i as i32 + 1);
            if elem.ordering() == protobuf::SortByDir::SortbyDesc {
                column.direction = SortDirection::Desc;
            }
            column.operator_class = string_list(&elem.opclass).last().cloned();
            index.columns.push(column);
        }

        index.name = if stmt.idxname.is_empty() {
            let cols: Vec<String> = index
                .columns
                .iter()
                .map(|c| {
                    c.name
                        .trim_matches(|ch| ch == '(' || ch == ')')
                        .to_string()
                })
                .collect();
            format!("{}_{}_idx", table_name, cols.join("_"))
        } else {
            stmt.idxname.clone()
        };

        if let Some(where_node) = stmt.where_clause.as_deref() {
            let predicate = print_opt_node(Some(where_node));
            if !predicate.is_empty() {
                index.where_clause = Some(canonical_index_where(&predicate));
                index.is_partial = true;
            }
        }

        index.index_type = if stmt.unique {
            IndexType::Unique
        } else if index.is_expression {
            IndexType::Expression
        } else {
            IndexType::Regular
        };

        table.indexes.insert(index.name.clone(), index);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Column assembly
// ---------------------------------------------------------------------------

/// Build a column from its definition and walk the inline constraints,
/// synthesising named table-level constraints the way PostgreSQL would.
fn append_column(
    table: &mut Table,
    col: &protobuf::ColumnDef,
    pending_constraints: &mut Vec<Constraint>,
    pending_sequences: &mut Vec<Sequence>,
) {
    let position = table.columns.len() as i32 + 1;
    let parsed = parse_column_type(col.type_name.as_ref(), &table.schema);
    let serial = parsed.serial;
    let mut column = Column::new(&col.colname, position, parsed.data_type);
    column.udt_name = parsed.udt_name;
    column.max_length = parsed.max_length;
    column.precision = parsed.precision;
    column.scale = parsed.scale;

    for con_node in &col.constraints {
        let Some(NodeEnum::Constraint(con)) = con_node.node.as_ref() else {
            continue;
        };
        match con.contype() {
            ConstrType::ConstrNotnull => column.nullable = false,
            ConstrType::ConstrNull => column.nullable = true,
            ConstrType::ConstrDefault => {
                let text = print_opt_node(con.raw_expr.as_deref());
                if !text.is_empty() {
                    column.default_value = Some(canonical_default(&text));
                }
            }
            ConstrType::ConstrIdentity => {
                column.identity = Some(parse_identity(con));
                column.nullable = false;
            }
            ConstrType::ConstrPrimary => {
                column.nullable = false;
                let mut pk = Constraint::new(
                    ConstraintType::PrimaryKey,
                    &table.schema,
                    &table.name,
                    format!("{}_pkey", table.name),
                );
                pk.push_column(&col.colname);
                pending_constraints.push(pk);
            }
            ConstrType::ConstrUnique => {
                let name = if con.conname.is_empty() {
                    format!("{}_{}_key", table.name, col.colname)
                } else {
                    con.conname.clone()
                };
                let mut unique =
                    Constraint::new(ConstraintType::Unique, &table.schema, &table.name, name);
                unique.push_column(&col.colname);
                pending_constraints.push(unique);
            }
            ConstrType::ConstrForeign => {
                if let Some(mut fk) =
                    convert_table_constraint(con, &table.schema, &table.name, Some(&col.colname))
                {
                    // The AST does not reliably surface deferrable for
                    // column-attached foreign keys; recorded as deferred.
                    fk.deferrable = true;
                    pending_constraints.push(fk);
                }
            }
            ConstrType::ConstrCheck => {
                let clause = print_opt_node(con.raw_expr.as_deref());
                if clause.is_empty() {
                    continue;
                }
                let name = if con.conname.is_empty() {
                    format!("{}_{}_check", table.name, col.colname)
                } else {
                    con.conname.clone()
                };
                let mut check =
                    Constraint::new(ConstraintType::Check, &table.schema, &table.name, name);
                check.check_clause = Some(clause);
                pending_constraints.push(check);
            }
            _ => {}
        }
    }

    if let Some(serial_type) = serial {
        expand_serial(table, &mut column, serial_type, pending_sequences);
    }
    table.columns.push(column);
}

/// SERIAL expansion: rewrite the type, force NOT NULL, point the default at
/// the backing sequence, and synthesise that sequence — except for partition
/// children, which share the parent's sequence.
fn expand_serial(
    table: &Table,
    column: &mut Column,
    serial_type: &'static str,
    pending_sequences: &mut Vec<Sequence>,
) {
    column.data_type = serial_type.to_string();
    column.nullable = false;

    if let Some(parent) = partition_parent_by_name(&table.name) {
        column.default_value = Some(format!(
            "nextval('{}.{}_{}_seq')",
            table.schema, parent, column.name
        ));
        return;
    }

    let seq_name = format!("{}_{}_seq", table.name, column.name);
    column.default_value = Some(format!("nextval('{}.{}')", table.schema, seq_name));

    let mut sequence = Sequence::new(&table.schema, &seq_name);
    sequence.data_type = serial_type.to_string();
    sequence.owned_by_table = Some(table.name.clone());
    sequence.owned_by_column = Some(column.name.clone());
    pending_sequences.push(sequence);
}

// ---------------------------------------------------------------------------
// Constraint conversion
// ---------------------------------------------------------------------------

/// Convert a table-level (or `ALTER TABLE ADD`) constraint node. Inline
/// foreign keys pass the owning column through `context_column`.
pub(crate) fn convert_table_constraint(
    con: &protobuf::Constraint,
    schema_name: &str,
    table_name: &str,
    context_column: Option<&str>,
) -> Option<Constraint> {
    let named = |fallback: String| -> String {
        if con.conname.is_empty() {
            fallback
        } else {
            con.conname.clone()
        }
    };

    match con.contype() {
        ConstrType::ConstrPrimary => {
            let mut pk = Constraint::new(
                ConstraintType::PrimaryKey,
                schema_name,
                table_name,
                named(format!("{table_name}_pkey")),
            );
            for col in string_list(&con.keys) {
                pk.push_column(&col);
            }
            if pk.columns.is_empty()
                && let Some(col) = context_column
            {
                pk.push_column(col);
            }
            pk.deferrable = con.deferrable;
            pk.initially_deferred = con.initdeferred;
            Some(pk)
        }
        ConstrType::ConstrUnique => {
            let mut columns = string_list(&con.keys);
            if columns.is_empty()
                && let Some(col) = context_column
            {
                columns.push(col.to_string());
            }
            let fallback = format!("{}_{}_key", table_name, columns.join("_"));
            let mut unique = Constraint::new(
                ConstraintType::Unique,
                schema_name,
                table_name,
                named(fallback),
            );
            for col in columns {
                unique.push_column(&col);
            }
            unique.deferrable = con.deferrable;
            unique.initially_deferred = con.initdeferred;
            Some(unique)
        }
        ConstrType::ConstrForeign => {
            let mut columns = string_list(&con.fk_attrs);
            if columns.is_empty()
                && let Some(col) = context_column
            {
                columns.push(col.to_string());
            }
            let first = columns.first().cloned().unwrap_or_default();
            let mut fk = Constraint::new(
                ConstraintType::ForeignKey,
                schema_name,
                table_name,
                named(format!("{table_name}_{first}_fkey")),
            );
            for col in &columns {
                fk.push_column(col);
            }
            let (ref_schema, ref_table) = qualified_name(con.pktable.as_ref());
            fk.referenced_schema = Some(ref_schema);
            fk.referenced_table = Some(ref_table);
            for col in string_list(&con.pk_attrs) {
                fk.push_referenced_column(&col);
            }
            fk.delete_rule = fk_action(&con.fk_del_action).or(Some(FkAction::NoAction));
            fk.update_rule = fk_action(&con.fk_upd_action).or(Some(FkAction::NoAction));
            fk.deferrable = con.deferrable;
            fk.initially_deferred = con.initdeferred;
            Some(fk)
        }
        ConstrType::ConstrCheck => {
            let clause = print_opt_node(con.raw_expr.as_deref());
            if clause.is_empty() {
                return None;
            }
            let fallback = match context_column {
                Some(col) => format!("{table_name}_{col}_check"),
                None => format!("{table_name}_check"),
            };
            let mut check = Constraint::new(
                ConstraintType::Check,
                schema_name,
                table_name,
                named(fallback),
            );
            check.check_clause = Some(clause);
            Some(check)
        }
        ConstrType::ConstrExclusion => {
            let mut excl = Constraint::new(
                ConstraintType::Exclusion,
                schema_name,
                table_name,
                named(format!("{table_name}_excl")),
            );
            excl.deferrable = con.deferrable;
            excl.initially_deferred = con.initdeferred;
            Some(excl)
        }
        _ => None,
    }
}

/// Attach a constraint to its table: primary keys force their columns NOT
/// NULL and, like unique constraints, synthesise the backing index the
/// catalog will report.
pub(crate) fn attach_constraint(table: &mut Table, constraint: Constraint) {
    match constraint.constraint_type {
        ConstraintType::PrimaryKey => {
            for col in constraint.column_names() {
                if let Some(column) = table.get_column_mut(&col) {
                    column.nullable = false;
                }
            }
            let index = backing_index(table, &constraint, IndexType::Primary);
            table.indexes.insert(index.name.clone(), index);
        }
        ConstraintType::Unique => {
            let index = backing_index(table, &constraint, IndexType::Unique);
            table.indexes.insert(index.name.clone(), index);
        }
        _ => {}
    }
    table
        .constraints
        .insert(constraint.name.clone(), constraint);
}

fn backing_index(table: &Table, constraint: &Constraint, kind: IndexType) -> Index {
    let mut index = Index::new(&table.schema, &table.name, &constraint.name);
    index.index_type = kind;
    index.is_unique = true;
    index.columns = constraint
        .columns
        .iter()
        .map(|c| IndexColumn::new(&c.name, c.position))
        .collect();
    index
}

fn parse_identity(con: &protobuf::Constraint) -> Identity {
    let mut identity = Identity {
        generation: match con.generated_when.as_str() {
            "a" => IdentityGeneration::Always,
            _ => IdentityGeneration::ByDefault,
        },
        start: 1,
        increment: 1,
        min_value: None,
        max_value: None,
        cycle: false,
    };
    for opt in &con.options {
        let Some(NodeEnum::DefElem(def)) = opt.node.as_ref() else {
            continue;
        };
        match def.defname.as_str() {
            "start" => identity.start = def_elem_i64(def).unwrap_or(1),
            "increment" => identity.increment = def_elem_i64(def).unwrap_or(1),
            "minvalue" => identity.min_value = def_elem_i64(def),
            "maxvalue" => identity.max_value = def_elem_i64(def),
            "cycle" => identity.cycle = def_elem_bool(def),
            _ => {}
        }
    }
    identity
}

/// `FOR VALUES ...` text of a partition bound.
fn partition_bound_text(bound: &protobuf::PartitionBoundSpec) -> String {
    if bound.is_default {
        return "DEFAULT".to_string();
    }
    match bound.strategy.as_str() {
        "r" => format!(
            "FOR VALUES FROM ({}) TO ({})",
            range_datums(&bound.lowerdatums),
            range_datums(&bound.upperdatums)
        ),
        "l" => {
            let items: Vec<String> = bound
                .listdatums
                .iter()
                .map(|n| print_opt_node(Some(n)))
                .collect();
            format!("FOR VALUES IN ({})", items.join(", "))
        }
        "h" => format!(
            "FOR VALUES WITH (modulus {}, remainder {})",
            bound.modulus, bound.remainder
        ),
        _ => String::new(),
    }
}

fn range_datums(datums: &[protobuf::Node]) -> String {
    let parts: Vec<String> = datums
        .iter()
        .filter_map(|n| match n.node.as_ref() {
            Some(NodeEnum::PartitionRangeDatum(d)) => Some(match d.kind() {
                protobuf::PartitionRangeDatumKind::PartitionRangeDatumMinvalue => {
                    "MINVALUE".to_string()
                }
                protobuf::PartitionRangeDatumKind::PartitionRangeDatumMaxvalue => {
                    "MAXVALUE".to_string()
                }
                _ => print_opt_node(d.value.as_deref()),
            }),
            _ => None,
        })
        .collect();
    parts.join(", ")
}

/// Parent table name implied by a partition-child naming convention, when
/// the table name carries a recognised date suffix.
pub(crate) fn partition_parent_by_name(table_name: &str) -> Option<String> {
    PARTITION_SUFFIX_RE
        .find(table_name)
        .map(|m| table_name[..m.start()].to_string())
        .filter(|parent| !parent.is_empty())
}

// ---------------------------------------------------------------------------
// Index definition regeneration
// ---------------------------------------------------------------------------

/// Produce the canonical `CREATE INDEX` text for every index in the model,
/// matching the spelling `pg_get_indexdef` uses after canonicalisation.
pub(crate) fn regenerate_index_definitions(db: &mut Database) {
    for schema in db.schemas.values_mut() {
        for table in schema.tables.values_mut() {
            for index in table.indexes.values_mut() {
                index.definition = render_index_definition(index);
            }
        }
    }
}

fn render_index_definition(index: &Index) -> String {
    let mut cols: Vec<String> = Vec::with_capacity(index.columns.len());
    for col in &index.columns {
        let mut piece = if col.name.contains("->") {
            simplify_json_expression(&col.name)
        } else {
            col.name.clone()
        };
        if let Some(opclass) = &col.operator_class {
            piece.push(' ');
            piece.push_str(opclass);
        }
        if col.direction == SortDirection::Desc {
            piece.push_str(" DESC");
        }
        cols.push(piece);
    }

    let unique = if index.is_unique { "UNIQUE " } else { "" };
    let mut definition = format!(
        "CREATE {unique}INDEX {} ON {}.{} USING {} ({})",
        index.name,
        index.schema,
        index.table,
        index.method,
        cols.join(", ")
    );
    if let Some(where_clause) = &index.where_clause {
        definition.push_str(" WHERE ");
        definition.push_str(where_clause);
    }
    definition
}
