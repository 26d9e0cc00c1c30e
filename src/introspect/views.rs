//! Views: name and body text from the catalog's view definition.

use sqlx::postgres::PgPool;

use crate::model::{Database, View};

use super::queries;
use super::rows::ViewRow;

pub(crate) async fn load(
    pool: &PgPool,
    target: &str,
    db: &mut Database,
) -> Result<(), sqlx::Error> {
    let rows: Vec<ViewRow> = sqlx::query(queries::VIEWS)
        .bind(target)
        .fetch_all(pool)
        .await?
        .iter()
        .map(ViewRow::from)
        .collect();

    let schema = db.get_or_create_schema(target);
    for row in rows {
        if row.view_name.is_empty() {
            continue;
        }
        schema.views.insert(
            row.view_name.clone(),
            View {
                schema: target.to_string(),
                name: row.view_name,
                definition: row.definition.trim().trim_end_matches(';').to_string(),
            },
        );
    }
    Ok(())
}
