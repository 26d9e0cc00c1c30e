//! Row-level-security policies.

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString, IntoStaticStr};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, IntoStaticStr,
)]
pub enum PolicyCommand {
    #[strum(serialize = "ALL")]
    All,
    #[strum(serialize = "SELECT")]
    Select,
    #[strum(serialize = "INSERT")]
    Insert,
    #[strum(serialize = "UPDATE")]
    Update,
    #[strum(serialize = "DELETE")]
    Delete,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Policy {
    pub schema: String,
    pub table: String,
    pub name: String,
    pub command: PolicyCommand,
    pub permissive: bool,
    /// Role names sorted ascending; `PUBLIC` kept upper-case.
    pub roles: Vec<String>,
    pub using_expression: Option<String>,
    pub with_check_expression: Option<String>,
}

impl Policy {
    pub fn new(
        schema: impl Into<String>,
        table: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            schema: schema.into(),
            table: table.into(),
            name: name.into(),
            command: PolicyCommand::All,
            permissive: true,
            roles: Vec::new(),
            using_expression: None,
            with_check_expression: None,
        }
    }
}
