//! Indexes.

use serde::{Deserialize, Serialize};
use strum_macros::{Display, IntoStaticStr};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, IntoStaticStr)]
pub enum IndexType {
    #[strum(serialize = "REGULAR")]
    Regular,
    #[strum(serialize = "PRIMARY")]
    Primary,
    #[strum(serialize = "UNIQUE")]
    Unique,
    #[strum(serialize = "EXPRESSION")]
    Expression,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, IntoStaticStr)]
pub enum SortDirection {
    #[strum(serialize = "ASC")]
    Asc,
    #[strum(serialize = "DESC")]
    Desc,
}

/// One index element: a plain column name or a parenthesised expression,
/// with its 1-based position within the index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexColumn {
    pub name: String,
    pub position: i32,
    pub direction: SortDirection,
    pub operator_class: Option<String>,
}

impl IndexColumn {
    pub fn new(name: impl Into<String>, position: i32) -> Self {
        Self {
            name: name.into(),
            position,
            direction: SortDirection::Asc,
            operator_class: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Index {
    pub schema: String,
    pub table: String,
    pub name: String,
    pub index_type: IndexType,
    /// Access method (`btree` unless the definition says otherwise).
    pub method: String,
    pub columns: Vec<IndexColumn>,
    pub is_unique: bool,
    pub is_partial: bool,
    pub is_concurrent: bool,
    pub is_expression: bool,
    /// Predicate of a partial index, wrapped in one outer pair of parentheses.
    pub where_clause: Option<String>,
    /// The `CREATE INDEX` statement as the source side provided it.
    pub definition: String,
}

impl Index {
    pub fn new(
        schema: impl Into<String>,
        table: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            schema: schema.into(),
            table: table.into(),
            name: name.into(),
            index_type: IndexType::Regular,
            method: "btree".to_string(),
            columns: Vec::new(),
            is_unique: false,
            is_partial: false,
            is_concurrent: false,
            is_expression: false,
            where_clause: None,
            definition: String::new(),
        }
    }
}
