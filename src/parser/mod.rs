//! DDL loader: builds the schema model from a SQL source string.
//!
//! The source is parsed with `pg_query` and each statement node is applied to
//! a loader that accumulates the model. Statement kinds outside the handled
//! set are ignored, never fatal — real dumps contain GRANTs, COMMENTs, and
//! settings the model does not track. The single structural error is an
//! `ALTER TABLE` whose target was never created in the same stream, which
//! indicates out-of-order SQL.

use std::collections::{HashMap, HashSet};

use pg_query::NodeEnum;
use tracing::debug;

use crate::error::LoadError;
use crate::model::Database;

pub mod ddl;
pub mod expr;
pub mod objects;

#[cfg(test)]
mod tests;

/// Parse a SQL source string into a fully-populated [`Database`].
pub fn parse_sql(source: &str) -> Result<Database, LoadError> {
    let result = pg_query::parse(source).map_err(|e| LoadError::DdlParse {
        message: e.to_string(),
        statement: snippet(source),
    })?;

    let mut loader = DdlLoader::new();
    for raw_stmt in &result.protobuf.stmts {
        let Some(node) = raw_stmt.stmt.as_ref().and_then(|s| s.node.as_ref()) else {
            continue;
        };
        loader.apply_statement(node)?;
    }
    Ok(loader.finish())
}

/// Leading fragment of the source, for error context.
fn snippet(source: &str) -> String {
    let trimmed = source.trim_start();
    let mut end = trimmed.len().min(120);
    while !trimmed.is_char_boundary(end) {
        end -= 1;
    }
    trimmed[..end].to_string()
}

/// Accumulates the model as statements are applied in file order.
pub(crate) struct DdlLoader {
    pub(crate) db: Database,
    /// `(schema, table)` pairs declared `PARTITION BY`.
    pub(crate) partition_parents: HashSet<(String, String)>,
    /// child `(schema, table)` -> parent `(schema, table)`.
    pub(crate) partition_children: HashMap<(String, String), (String, String)>,
}

impl DdlLoader {
    pub(crate) fn new() -> Self {
        Self {
            db: Database::new("ddl"),
            partition_parents: HashSet::new(),
            partition_children: HashMap::new(),
        }
    }

    fn apply_statement(&mut self, node: &NodeEnum) -> Result<(), LoadError> {
        match node {
            NodeEnum::CreateSchemaStmt(stmt) => self.create_schema(stmt),
            NodeEnum::CreateExtensionStmt(stmt) => self.create_extension(stmt),
            NodeEnum::CreateEnumStmt(stmt) => self.create_enum(stmt),
            NodeEnum::CompositeTypeStmt(stmt) => self.create_composite(stmt),
            NodeEnum::CreateDomainStmt(stmt) => self.create_domain(stmt),
            NodeEnum::CreateSeqStmt(stmt) => self.create_sequence(stmt),
            NodeEnum::CreateStmt(stmt) => self.create_table(stmt),
            NodeEnum::AlterTableStmt(stmt) => {
                // ALTER INDEX arrives as an AlterTableStmt with an index
                // object type; accepted without model effect.
                if stmt.objtype() == pg_query::protobuf::ObjectType::ObjectIndex {
                    return Ok(());
                }
                self.alter_table(stmt)
            }
            NodeEnum::IndexStmt(stmt) => self.create_index(stmt),
            NodeEnum::ViewStmt(stmt) => self.create_view(stmt),
            NodeEnum::CreateFunctionStmt(stmt) => self.create_function_or_procedure(stmt),
            NodeEnum::DefineStmt(stmt) => self.define_aggregate(stmt),
            NodeEnum::CreateTrigStmt(stmt) => self.create_trigger(stmt),
            NodeEnum::CreatePolicyStmt(stmt) => self.create_policy(stmt),
            other => {
                debug!(kind = ?std::mem::discriminant(other), "ignored statement");
                Ok(())
            }
        }
    }

    /// Final pass: regenerate canonical `CREATE INDEX` text for every index
    /// built from the stream, then hand over the model.
    fn finish(mut self) -> Database {
        ddl::regenerate_index_definitions(&mut self.db);
        self.db
    }
}
