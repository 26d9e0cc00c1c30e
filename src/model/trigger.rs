//! Triggers.

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString, IntoStaticStr};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, IntoStaticStr,
)]
pub enum TriggerTiming {
    #[strum(serialize = "BEFORE")]
    Before,
    #[strum(serialize = "AFTER")]
    After,
    #[strum(serialize = "INSTEAD OF")]
    InsteadOf,
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    IntoStaticStr,
)]
pub enum TriggerEvent {
    // Declaration order doubles as the canonical event order.
    #[strum(serialize = "INSERT")]
    Insert,
    #[strum(serialize = "UPDATE")]
    Update,
    #[strum(serialize = "DELETE")]
    Delete,
    #[strum(serialize = "TRUNCATE")]
    Truncate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
pub enum TriggerLevel {
    #[strum(serialize = "ROW")]
    Row,
    #[strum(serialize = "STATEMENT")]
    Statement,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trigger {
    pub schema: String,
    pub table: String,
    pub name: String,
    pub timing: TriggerTiming,
    /// Events in canonical order (INSERT, UPDATE, DELETE, TRUNCATE), deduplicated.
    pub events: Vec<TriggerEvent>,
    pub level: TriggerLevel,
    /// The invoked function with its argument list, e.g. `audit('row', 'v2')`.
    pub function_call: String,
    pub when_condition: Option<String>,
}

impl Trigger {
    pub fn new(
        schema: impl Into<String>,
        table: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            schema: schema.into(),
            table: table.into(),
            name: name.into(),
            timing: TriggerTiming::After,
            events: Vec::new(),
            level: TriggerLevel::Statement,
            function_call: String::new(),
            when_condition: None,
        }
    }

    /// Add an event, keeping the list deduplicated and canonically ordered.
    pub fn push_event(&mut self, event: TriggerEvent) {
        if !self.events.contains(&event) {
            self.events.push(event);
            self.events.sort();
        }
    }
}
