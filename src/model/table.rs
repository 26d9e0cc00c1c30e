//! Tables, columns, and identity metadata.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use strum_macros::{Display, EnumString, IntoStaticStr};

use crate::model::constraint::Constraint;
use crate::model::index::Index;
use crate::model::policy::Policy;
use crate::model::trigger::Trigger;

/// Relation kind as reported by the catalog or inferred from DDL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, IntoStaticStr)]
pub enum TableType {
    #[strum(serialize = "BASE TABLE")]
    Base,
    #[strum(serialize = "VIEW")]
    View,
    #[strum(serialize = "LOCAL TEMPORARY")]
    Temporary,
}

/// Partitioning strategy of a partitioned parent table.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, IntoStaticStr,
)]
pub enum PartitionStrategy {
    #[strum(serialize = "RANGE")]
    Range,
    #[strum(serialize = "LIST")]
    List,
    #[strum(serialize = "HASH")]
    Hash,
}

/// `GENERATED ... AS IDENTITY` flavor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
pub enum IdentityGeneration {
    #[strum(serialize = "ALWAYS")]
    Always,
    #[strum(serialize = "BY DEFAULT")]
    ByDefault,
}

/// Identity sequence parameters attached to a column.
///
/// Mutually exclusive with a user default: an identity column never carries
/// `default_value`, and a `SERIAL` expansion produces a `nextval` default
/// with no identity record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Identity {
    pub generation: IdentityGeneration,
    pub start: i64,
    pub increment: i64,
    pub min_value: Option<i64>,
    pub max_value: Option<i64>,
    pub cycle: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    /// 1-based ordinal within the owning table, contiguous.
    pub position: i32,
    /// Canonical data type (see the `normalize` module for the mapping).
    pub data_type: String,
    /// Underlying type name as the catalog reports it (`udt_name`).
    pub udt_name: String,
    pub nullable: bool,
    pub default_value: Option<String>,
    pub max_length: Option<i32>,
    pub precision: Option<i32>,
    pub scale: Option<i32>,
    pub identity: Option<Identity>,
}

impl Column {
    pub fn new(name: impl Into<String>, position: i32, data_type: impl Into<String>) -> Self {
        let data_type = data_type.into();
        Self {
            name: name.into(),
            position,
            udt_name: data_type.clone(),
            data_type,
            nullable: true,
            default_value: None,
            max_length: None,
            precision: None,
            scale: None,
            identity: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    pub schema: String,
    pub name: String,
    pub table_type: TableType,
    /// Columns in ordinal order. Positions are 1..n without gaps.
    pub columns: Vec<Column>,
    pub constraints: HashMap<String, Constraint>,
    pub indexes: HashMap<String, Index>,
    pub triggers: HashMap<String, Trigger>,
    pub policies: HashMap<String, Policy>,
    pub rls_enabled: bool,
    pub is_partitioned: bool,
    pub partition_strategy: Option<PartitionStrategy>,
    /// Comma-separated partition key columns; empty unless `is_partitioned`.
    pub partition_key: String,
}

impl Table {
    pub fn new(schema: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
            name: name.into(),
            table_type: TableType::Base,
            columns: Vec::new(),
            constraints: HashMap::new(),
            indexes: HashMap::new(),
            triggers: HashMap::new(),
            policies: HashMap::new(),
            rls_enabled: false,
            is_partitioned: false,
            partition_strategy: None,
            partition_key: String::new(),
        }
    }

    pub fn get_column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn get_column_mut(&mut self, name: &str) -> Option<&mut Column> {
        self.columns.iter_mut().find(|c| c.name == name)
    }

    /// Partition key column names, in declaration order.
    pub fn partition_key_columns(&self) -> Vec<String> {
        if self.partition_key.is_empty() {
            return Vec::new();
        }
        self.partition_key
            .split(',')
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .collect()
    }

    /// Constraint names in deterministic alphabetical order.
    pub fn sorted_constraint_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.constraints.keys().cloned().collect();
        names.sort();
        names
    }

    /// Index names in deterministic alphabetical order.
    pub fn sorted_index_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.indexes.keys().cloned().collect();
        names.sort();
        names
    }

    /// Trigger names in deterministic alphabetical order.
    pub fn sorted_trigger_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.triggers.keys().cloned().collect();
        names.sort();
        names
    }
}
