//! Table constraints.

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString, IntoStaticStr};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, IntoStaticStr)]
pub enum ConstraintType {
    #[strum(serialize = "PRIMARY KEY")]
    PrimaryKey,
    #[strum(serialize = "UNIQUE")]
    Unique,
    #[strum(serialize = "FOREIGN KEY")]
    ForeignKey,
    #[strum(serialize = "CHECK")]
    Check,
    #[strum(serialize = "EXCLUDE")]
    Exclusion,
}

/// Referential action on delete/update of the referenced row.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, IntoStaticStr,
)]
pub enum FkAction {
    #[strum(serialize = "NO ACTION")]
    NoAction,
    #[strum(serialize = "RESTRICT")]
    Restrict,
    #[strum(serialize = "CASCADE")]
    Cascade,
    #[strum(serialize = "SET NULL")]
    SetNull,
    #[strum(serialize = "SET DEFAULT")]
    SetDefault,
}

/// A column participating in a constraint, with its 1-based position
/// within the constraint (not within the table).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConstraintColumn {
    pub name: String,
    pub position: i32,
}

impl ConstraintColumn {
    pub fn new(name: impl Into<String>, position: i32) -> Self {
        Self {
            name: name.into(),
            position,
        }
    }
}

/// A table constraint. The kind tag determines which optional fields are
/// populated: FK fields for `ForeignKey`, `check_clause` for `Check`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Constraint {
    pub constraint_type: ConstraintType,
    pub schema: String,
    pub table: String,
    pub name: String,
    pub columns: Vec<ConstraintColumn>,
    pub referenced_schema: Option<String>,
    pub referenced_table: Option<String>,
    pub referenced_columns: Vec<ConstraintColumn>,
    pub delete_rule: Option<FkAction>,
    pub update_rule: Option<FkAction>,
    pub deferrable: bool,
    pub initially_deferred: bool,
    pub check_clause: Option<String>,
}

impl Constraint {
    pub fn new(
        constraint_type: ConstraintType,
        schema: impl Into<String>,
        table: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            constraint_type,
            schema: schema.into(),
            table: table.into(),
            name: name.into(),
            columns: Vec::new(),
            referenced_schema: None,
            referenced_table: None,
            referenced_columns: Vec::new(),
            delete_rule: None,
            update_rule: None,
            deferrable: false,
            initially_deferred: false,
            check_clause: None,
        }
    }

    /// Append a column unless one with the same name is already present.
    pub fn push_column(&mut self, name: &str) {
        if self.columns.iter().any(|c| c.name == name) {
            return;
        }
        let position = self.columns.len() as i32 + 1;
        self.columns.push(ConstraintColumn::new(name, position));
    }

    /// Append a referenced column unless already present by name.
    pub fn push_referenced_column(&mut self, name: &str) {
        if self.referenced_columns.iter().any(|c| c.name == name) {
            return;
        }
        let position = self.referenced_columns.len() as i32 + 1;
        self.referenced_columns
            .push(ConstraintColumn::new(name, position));
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    /// Reorder columns so that every partition-key column comes first,
    /// keeping the original relative order within each group, and renumber
    /// positions. A primary key on a partitioned table must lead with the
    /// partition key for downstream DDL generation.
    pub fn order_partition_key_first(&mut self, key_columns: &[String]) {
        if key_columns.is_empty() || self.columns.is_empty() {
            return;
        }
        let (mut keyed, rest): (Vec<ConstraintColumn>, Vec<ConstraintColumn>) = self
            .columns
            .drain(..)
            .partition(|c| key_columns.contains(&c.name));
        keyed.extend(rest);
        for (i, col) in keyed.iter_mut().enumerate() {
            col.position = i as i32 + 1;
        }
        self.columns = keyed;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partition_key_columns_move_first() {
        let mut pk = Constraint::new(ConstraintType::PrimaryKey, "public", "t", "t_pkey");
        pk.push_column("id");
        pk.push_column("created");
        pk.push_column("tenant");
        pk.order_partition_key_first(&["created".to_string(), "tenant".to_string()]);

        assert_eq!(pk.column_names(), vec!["created", "tenant", "id"]);
        let positions: Vec<i32> = pk.columns.iter().map(|c| c.position).collect();
        assert_eq!(positions, vec![1, 2, 3]);
    }

    #[test]
    fn test_reorder_noop_without_key() {
        let mut pk = Constraint::new(ConstraintType::PrimaryKey, "public", "t", "t_pkey");
        pk.push_column("id");
        pk.order_partition_key_first(&[]);
        assert_eq!(pk.column_names(), vec!["id"]);
    }
}
