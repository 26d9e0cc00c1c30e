//! Row-level-security policies.

use sqlx::postgres::PgPool;

use crate::model::{Database, Policy, PolicyCommand};

use super::queries;
use super::rows::PolicyRow;

pub(crate) async fn load(
    pool: &PgPool,
    target: &str,
    db: &mut Database,
) -> Result<(), sqlx::Error> {
    let rows: Vec<PolicyRow> = sqlx::query(queries::POLICIES)
        .bind(target)
        .fetch_all(pool)
        .await?
        .iter()
        .map(PolicyRow::from)
        .collect();

    let schema = db.get_or_create_schema(target);
    for row in &rows {
        if row.table_name.is_empty() || row.policy_name.is_empty() {
            continue;
        }
        let policy = assemble_policy(target, row);
        schema.policies.insert(policy.name.clone(), policy.clone());
        if let Some(table) = schema.tables.get_mut(&row.table_name) {
            table.policies.insert(policy.name.clone(), policy);
        }
    }
    Ok(())
}

pub(crate) fn assemble_policy(target: &str, row: &PolicyRow) -> Policy {
    let mut policy = Policy::new(target, &row.table_name, &row.policy_name);
    policy.command = match row.command.as_str() {
        "SELECT" => PolicyCommand::Select,
        "INSERT" => PolicyCommand::Insert,
        "UPDATE" => PolicyCommand::Update,
        "DELETE" => PolicyCommand::Delete,
        _ => PolicyCommand::All,
    };
    policy.permissive = row.permissive == "PERMISSIVE";
    policy.roles = row.roles.clone();
    policy.using_expression = row.using_expression.clone();
    policy.with_check_expression = row.with_check_expression.clone();
    policy
}
