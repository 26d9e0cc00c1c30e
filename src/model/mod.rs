//! In-memory schema model.
//!
//! The model is a graph rooted at [`Database`]: schemas own tables, views,
//! routines, sequences, policies, and types; tables own columns, constraints,
//! indexes, triggers, and policies. Both loaders (catalog introspection and
//! DDL parsing) produce this same shape, so the two sides can be compared
//! field by field.
//!
//! Cross-entity references (partition parent/child, foreign keys, sequence
//! ownership) are held as name references rather than back-pointers; the
//! graph needs no cycle-breaking and, once built, is handed read-only to
//! consumers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub mod constraint;
pub mod index;
pub mod policy;
pub mod routine;
pub mod sort;
pub mod table;
pub mod trigger;
pub mod typedef;

pub use constraint::{Constraint, ConstraintColumn, ConstraintType, FkAction};
pub use index::{Index, IndexColumn, IndexType, SortDirection};
pub use policy::{Policy, PolicyCommand};
pub use routine::{Aggregate, Function, Parameter, ParameterMode, Procedure, Volatility};
pub use table::{Column, Identity, IdentityGeneration, PartitionStrategy, Table, TableType};
pub use trigger::{Trigger, TriggerEvent, TriggerLevel, TriggerTiming};
pub use typedef::{
    CompositeColumn, DomainConstraint, Extension, Sequence, TypeDef, TypeKind, View,
};

/// Provenance of a loaded schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    /// Server version string for catalog loads, empty for DDL loads.
    pub database_version: String,
    pub loader_version: String,
    pub loaded_at: DateTime<Utc>,
    /// Which loader produced the value: `"catalog"` or `"ddl"`.
    pub producer: String,
}

impl Metadata {
    pub fn for_producer(producer: &str) -> Self {
        Self {
            database_version: String::new(),
            loader_version: env!("CARGO_PKG_VERSION").to_string(),
            loaded_at: Utc::now(),
            producer: producer.to_string(),
        }
    }
}

/// Parent/child table attachment of a partitioned table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartitionAttachment {
    pub parent_schema: String,
    pub parent_table: String,
    pub child_schema: String,
    pub child_table: String,
    /// `FOR VALUES ...` bound text; empty when the source did not expose it.
    pub partition_bound: String,
}

/// Parent/child index attachment mirroring a partition attachment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexAttachment {
    pub parent_schema: String,
    pub parent_index: String,
    pub child_schema: String,
    pub child_index: String,
}

/// One namespace of the database.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    pub name: String,
    pub owner: Option<String>,
    pub tables: HashMap<String, Table>,
    pub views: HashMap<String, View>,
    pub functions: HashMap<String, Function>,
    pub procedures: HashMap<String, Procedure>,
    pub aggregates: HashMap<String, Aggregate>,
    pub sequences: HashMap<String, Sequence>,
    pub policies: HashMap<String, Policy>,
    pub types: HashMap<String, TypeDef>,
}

impl Schema {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            owner: None,
            tables: HashMap::new(),
            views: HashMap::new(),
            functions: HashMap::new(),
            procedures: HashMap::new(),
            aggregates: HashMap::new(),
            sequences: HashMap::new(),
            policies: HashMap::new(),
            types: HashMap::new(),
        }
    }

    // Map iteration order is never part of the contract; consumers go
    // through these sorted accessors or the topological orders in `sort`.

    pub fn sorted_table_names(&self) -> Vec<String> {
        sorted_keys(&self.tables)
    }

    pub fn sorted_view_names(&self) -> Vec<String> {
        sorted_keys(&self.views)
    }

    pub fn sorted_function_names(&self) -> Vec<String> {
        sorted_keys(&self.functions)
    }

    pub fn sorted_procedure_names(&self) -> Vec<String> {
        sorted_keys(&self.procedures)
    }

    pub fn sorted_aggregate_names(&self) -> Vec<String> {
        sorted_keys(&self.aggregates)
    }

    pub fn sorted_sequence_names(&self) -> Vec<String> {
        sorted_keys(&self.sequences)
    }

    pub fn sorted_policy_names(&self) -> Vec<String> {
        sorted_keys(&self.policies)
    }

    pub fn sorted_type_names(&self) -> Vec<String> {
        sorted_keys(&self.types)
    }

    /// Base tables only, alphabetical.
    pub fn sorted_base_table_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .tables
            .iter()
            .filter(|(_, t)| t.table_type == TableType::Base)
            .map(|(n, _)| n.clone())
            .collect();
        names.sort();
        names
    }
}

/// The root of the loaded schema graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Database {
    pub metadata: Metadata,
    pub schemas: HashMap<String, Schema>,
    /// Extensions are cluster-wide objects, not scoped to a namespace.
    pub extensions: HashMap<String, Extension>,
    pub partition_attachments: Vec<PartitionAttachment>,
    pub index_attachments: Vec<IndexAttachment>,
}

impl Database {
    pub fn new(producer: &str) -> Self {
        Self {
            metadata: Metadata::for_producer(producer),
            schemas: HashMap::new(),
            extensions: HashMap::new(),
            partition_attachments: Vec::new(),
            index_attachments: Vec::new(),
        }
    }

    /// Idempotent schema lookup: returns the existing record if present,
    /// otherwise inserts an empty one.
    pub fn get_or_create_schema(&mut self, name: &str) -> &mut Schema {
        self.schemas
            .entry(name.to_string())
            .or_insert_with(|| Schema::new(name))
    }

    pub fn get_schema(&self, name: &str) -> Option<&Schema> {
        self.schemas.get(name)
    }

    pub fn sorted_schema_names(&self) -> Vec<String> {
        sorted_keys(&self.schemas)
    }

    pub fn sorted_extension_names(&self) -> Vec<String> {
        sorted_keys(&self.extensions)
    }

    /// Partition attachments whose parent lives in the given schema.
    pub fn partition_children_of(&self, schema: &str, table: &str) -> Vec<&PartitionAttachment> {
        self.partition_attachments
            .iter()
            .filter(|a| a.parent_schema == schema && a.parent_table == table)
            .collect()
    }

    /// The parent attachment of a child table, when recorded.
    pub fn partition_parent_of(&self, schema: &str, table: &str) -> Option<&PartitionAttachment> {
        self.partition_attachments
            .iter()
            .find(|a| a.child_schema == schema && a.child_table == table)
    }
}

fn sorted_keys<V>(map: &HashMap<String, V>) -> Vec<String> {
    let mut keys: Vec<String> = map.keys().cloned().collect();
    keys.sort();
    keys
}
