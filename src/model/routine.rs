//! Functions, procedures, and aggregates.

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString, IntoStaticStr};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, IntoStaticStr,
)]
pub enum ParameterMode {
    #[strum(serialize = "IN")]
    In,
    #[strum(serialize = "OUT")]
    Out,
    #[strum(serialize = "INOUT")]
    InOut,
    #[strum(serialize = "VARIADIC")]
    Variadic,
    #[strum(serialize = "TABLE")]
    Table,
}

impl ParameterMode {
    /// Modes that contribute to the call signature (overload identity).
    pub fn is_input(self) -> bool {
        matches!(self, Self::In | Self::InOut | Self::Variadic)
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, IntoStaticStr,
)]
pub enum Volatility {
    #[strum(serialize = "IMMUTABLE")]
    Immutable,
    #[strum(serialize = "STABLE")]
    Stable,
    #[strum(serialize = "VOLATILE")]
    Volatile,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    pub data_type: String,
    pub mode: ParameterMode,
    /// 1-based position in declaration order.
    pub position: i32,
    pub default_value: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Function {
    pub schema: String,
    pub name: String,
    /// Body text as given by `AS` (or the catalog's stored source).
    pub definition: String,
    pub language: String,
    pub return_type: String,
    /// Input parameter types only, comma-separated — the overload identity.
    pub arguments: String,
    /// Named parameters with defaults, used to regenerate DDL.
    pub signature: String,
    pub parameters: Vec<Parameter>,
    pub volatility: Volatility,
    pub is_strict: bool,
    pub security_definer: bool,
}

impl Function {
    pub fn new(schema: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
            name: name.into(),
            definition: String::new(),
            language: "sql".to_string(),
            return_type: String::new(),
            arguments: String::new(),
            signature: String::new(),
            parameters: Vec::new(),
            volatility: Volatility::Volatile,
            is_strict: false,
            security_definer: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Procedure {
    pub schema: String,
    pub name: String,
    pub definition: String,
    pub language: String,
    pub arguments: String,
    pub signature: String,
    pub parameters: Vec<Parameter>,
}

impl Procedure {
    pub fn new(schema: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
            name: name.into(),
            definition: String::new(),
            language: "sql".to_string(),
            arguments: String::new(),
            signature: String::new(),
            parameters: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Aggregate {
    pub schema: String,
    pub name: String,
    pub arguments: String,
    pub signature: String,
    pub return_type: String,
    pub state_type: String,
    pub transition_function: String,
    pub transition_function_schema: Option<String>,
    pub initial_condition: Option<String>,
    pub final_function: Option<String>,
    pub final_function_schema: Option<String>,
}

impl Aggregate {
    pub fn new(schema: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
            name: name.into(),
            arguments: String::new(),
            signature: String::new(),
            return_type: String::new(),
            state_type: String::new(),
            transition_function: String::new(),
            transition_function_schema: None,
            initial_condition: None,
            final_function: None,
            final_function_schema: None,
        }
    }
}
