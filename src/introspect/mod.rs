//! Catalog loader: builds the schema model from a live PostgreSQL database.
//!
//! The pipeline is a fixed sequence of read-only catalog queries against one
//! pool, each feeding a pure assembly step. Any query failure aborts the
//! load, wrapped with the failing step's name; rows with structurally
//! incomplete data are skipped, never fatal. The partially-built model of a
//! failed load is discarded — there is no partial-success return.
//!
//! Output is raw catalog spelling; run [`crate::normalize::normalize_database`]
//! over it before comparing against DDL-loader output.

use sqlx::Row;
use sqlx::postgres::PgPool;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::error::LoadError;
use crate::model::Database;

pub mod constraints;
pub mod extensions;
pub mod indexes;
pub mod policies;
pub mod queries;
pub mod routines;
pub(crate) mod rows;
pub mod sequences;
pub mod tables;
pub mod triggers;
pub mod types;
pub mod views;

/// Schemas owned by the system; never valid introspection targets.
const SYSTEM_SCHEMAS: &[&str] = &["information_schema", "pg_catalog", "pg_toast"];

/// Load one schema from a live database into a [`Database`].
///
/// `cancel` is checked between steps; a fired token surfaces as
/// [`LoadError::Cancelled`]. Timeouts are the caller's concern.
pub async fn load_schema(
    pool: &PgPool,
    target: &str,
    cancel: &CancellationToken,
) -> Result<Database, LoadError> {
    validate_target_schema(pool, target).await?;

    let mut db = Database::new("catalog");
    db.metadata.database_version = fetch_server_version(pool)
        .await
        .map_err(|e| catalog_error("metadata", e))?;

    let step = |name: &'static str| {
        info!(step = name, schema = target, "loading");
        name
    };
    let check = |name: &'static str| -> Result<&'static str, LoadError> {
        if cancel.is_cancelled() {
            return Err(LoadError::Cancelled);
        }
        Ok(step(name))
    };

    let owner: Option<String> = sqlx::query(queries::SCHEMA_OWNER)
        .bind(target)
        .fetch_optional(pool)
        .await
        .map_err(|e| catalog_error("schemas", e))?
        .and_then(|row| rows::opt_string(&row, "owner"));
    db.get_or_create_schema(target).owner = owner;

    let name = check("tables")?;
    tables::load(pool, target, &mut db)
        .await
        .map_err(|e| catalog_error(name, e))?;

    let name = check("partition attachments")?;
    tables::load_partition_attachments(pool, target, &mut db)
        .await
        .map_err(|e| catalog_error(name, e))?;

    let name = check("constraints")?;
    constraints::load(pool, target, &mut db)
        .await
        .map_err(|e| catalog_error(name, e))?;

    let name = check("indexes")?;
    indexes::load(pool, target, &mut db)
        .await
        .map_err(|e| catalog_error(name, e))?;

    let name = check("index attachments")?;
    tables::load_index_attachments(pool, target, &mut db)
        .await
        .map_err(|e| catalog_error(name, e))?;

    let name = check("sequences")?;
    sequences::load(pool, target, &mut db)
        .await
        .map_err(|e| catalog_error(name, e))?;

    let name = check("functions")?;
    routines::load_functions(pool, target, &mut db)
        .await
        .map_err(|e| catalog_error(name, e))?;

    let name = check("procedures")?;
    routines::load_procedures(pool, target, &mut db)
        .await
        .map_err(|e| catalog_error(name, e))?;

    let name = check("aggregates")?;
    routines::load_aggregates(pool, target, &mut db)
        .await
        .map_err(|e| catalog_error(name, e))?;

    let name = check("views")?;
    views::load(pool, target, &mut db)
        .await
        .map_err(|e| catalog_error(name, e))?;

    let name = check("triggers")?;
    triggers::load(pool, target, &mut db)
        .await
        .map_err(|e| catalog_error(name, e))?;

    let name = check("policies")?;
    policies::load(pool, target, &mut db)
        .await
        .map_err(|e| catalog_error(name, e))?;

    let name = check("extensions")?;
    extensions::load(pool, &mut db)
        .await
        .map_err(|e| catalog_error(name, e))?;

    let name = check("types")?;
    types::load(pool, target, &mut db)
        .await
        .map_err(|e| catalog_error(name, e))?;

    info!(schema = target, "catalog load complete");
    Ok(db)
}

fn catalog_error(step: &'static str, source: sqlx::Error) -> LoadError {
    LoadError::Catalog { step, source }
}

/// True for names the system reserves for itself.
pub fn is_system_schema(name: &str) -> bool {
    SYSTEM_SCHEMAS.contains(&name)
        || name.starts_with("pg_temp_")
        || name.starts_with("pg_toast_temp_")
}

async fn validate_target_schema(pool: &PgPool, target: &str) -> Result<(), LoadError> {
    if target.is_empty() || is_system_schema(target) {
        return Err(LoadError::SchemaNotFound(target.to_string()));
    }
    let row = sqlx::query(queries::SCHEMA_EXISTS)
        .bind(target)
        .fetch_optional(pool)
        .await
        .map_err(|e| catalog_error("schemas", e))?;
    if row.is_none() {
        return Err(LoadError::SchemaNotFound(target.to_string()));
    }
    Ok(())
}

async fn fetch_server_version(pool: &PgPool) -> Result<String, sqlx::Error> {
    let row = sqlx::query(queries::SERVER_VERSION).fetch_one(pool).await?;
    Ok(row.try_get::<String, _>("version").unwrap_or_default())
}
