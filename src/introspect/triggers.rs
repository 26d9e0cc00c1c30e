//! Trigger assembly: the information schema emits one row per
//! (trigger, event); rows are grouped by `(table, trigger_name)`.

use std::collections::HashMap;

use sqlx::postgres::PgPool;

use crate::model::{Database, Trigger, TriggerEvent, TriggerLevel, TriggerTiming};

use super::queries;
use super::rows::TriggerRow;

pub(crate) async fn load(
    pool: &PgPool,
    target: &str,
    db: &mut Database,
) -> Result<(), sqlx::Error> {
    let rows: Vec<TriggerRow> = sqlx::query(queries::TRIGGERS)
        .bind(target)
        .fetch_all(pool)
        .await?
        .iter()
        .map(TriggerRow::from)
        .collect();

    let triggers = assemble_triggers(target, &rows);
    let schema = db.get_or_create_schema(target);
    for trigger in triggers {
        let Some(table) = schema.tables.get_mut(&trigger.table) else {
            continue;
        };
        table.triggers.insert(trigger.name.clone(), trigger);
    }
    Ok(())
}

pub(crate) fn assemble_triggers(target: &str, rows: &[TriggerRow]) -> Vec<Trigger> {
    let mut out: Vec<Trigger> = Vec::new();
    let mut index: HashMap<(String, String), usize> = HashMap::new();

    for row in rows {
        if row.table_name.is_empty() || row.trigger_name.is_empty() {
            continue;
        }
        let key = (row.table_name.clone(), row.trigger_name.clone());
        let slot = *index.entry(key).or_insert_with(|| {
            let mut trigger = Trigger::new(target, &row.table_name, &row.trigger_name);
            trigger.timing = match row.action_timing.as_str() {
                "BEFORE" => TriggerTiming::Before,
                "INSTEAD OF" => TriggerTiming::InsteadOf,
                _ => TriggerTiming::After,
            };
            trigger.level = if row.action_orientation == "ROW" {
                TriggerLevel::Row
            } else {
                TriggerLevel::Statement
            };
            trigger.function_call = function_call_of(&row.action_statement);
            trigger.when_condition = row.action_condition.clone();
            out.push(trigger);
            out.len() - 1
        });

        if let Some(event) = parse_event(&row.event_manipulation) {
            out[slot].push_event(event);
        }
    }
    out
}

fn parse_event(event: &str) -> Option<TriggerEvent> {
    match event {
        "INSERT" => Some(TriggerEvent::Insert),
        "UPDATE" => Some(TriggerEvent::Update),
        "DELETE" => Some(TriggerEvent::Delete),
        "TRUNCATE" => Some(TriggerEvent::Truncate),
        _ => None,
    }
}

/// The call is everything after `EXECUTE FUNCTION `, argument list included.
fn function_call_of(action_statement: &str) -> String {
    match action_statement.split_once("EXECUTE FUNCTION ") {
        Some((_, call)) => call.trim().to_string(),
        None => action_statement.trim().to_string(),
    }
}
