//! Installed extensions. Extensions are cluster-wide, so the query is not
//! schema-scoped.

use sqlx::postgres::PgPool;

use crate::model::{Database, Extension};

use super::queries;
use super::rows::ExtensionRow;

pub(crate) async fn load(pool: &PgPool, db: &mut Database) -> Result<(), sqlx::Error> {
    let rows: Vec<ExtensionRow> = sqlx::query(queries::EXTENSIONS)
        .fetch_all(pool)
        .await?
        .iter()
        .map(ExtensionRow::from)
        .collect();

    for row in rows {
        if row.name.is_empty() {
            continue;
        }
        db.extensions.insert(
            row.name.clone(),
            Extension {
                name: row.name,
                schema: row.schema,
                version: row.version,
            },
        );
    }
    Ok(())
}
