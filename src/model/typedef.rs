//! User-defined types, sequences, views, and extensions.

use serde::{Deserialize, Serialize};

/// A column of a composite type. Unlike table columns these carry no
/// nullability or defaults — PostgreSQL does not track them for attributes
/// of a composite.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompositeColumn {
    pub name: String,
    pub data_type: String,
    pub position: i32,
}

/// A named check constraint on a domain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainConstraint {
    pub name: String,
    pub check_clause: String,
}

/// Kind-specific payload of a user-defined type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TypeKind {
    Enum {
        /// Labels in declaration order.
        values: Vec<String>,
    },
    Composite {
        columns: Vec<CompositeColumn>,
    },
    Domain {
        base_type: String,
        not_null: bool,
        default_value: Option<String>,
        check_constraints: Vec<DomainConstraint>,
    },
}

impl TypeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TypeKind::Enum { .. } => "ENUM",
            TypeKind::Composite { .. } => "COMPOSITE",
            TypeKind::Domain { .. } => "DOMAIN",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeDef {
    pub schema: String,
    pub name: String,
    pub kind: TypeKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sequence {
    pub schema: String,
    pub name: String,
    pub data_type: String,
    pub start_value: i64,
    pub increment: i64,
    /// `None` means the engine default for the data type.
    pub min_value: Option<i64>,
    pub max_value: Option<i64>,
    pub cycle: bool,
    pub owned_by_table: Option<String>,
    pub owned_by_column: Option<String>,
}

impl Sequence {
    pub fn new(schema: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
            name: name.into(),
            data_type: "bigint".to_string(),
            start_value: 1,
            increment: 1,
            min_value: None,
            max_value: None,
            cycle: false,
            owned_by_table: None,
            owned_by_column: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct View {
    pub schema: String,
    pub name: String,
    /// The view's SELECT body.
    pub definition: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Extension {
    pub name: String,
    pub schema: String,
    pub version: String,
}
