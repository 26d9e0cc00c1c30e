//! Load-error taxonomy shared by both loaders.

use thiserror::Error;

/// Fatal conditions a load can surface. Structural anomalies inside a
/// statement or catalog row never reach this enum — the affected entity is
/// dropped so real-world dumps still load. The one exception is
/// `AlterOnMissingTable`, which indicates out-of-order SQL and is always
/// fatal.
#[derive(Debug, Error)]
pub enum LoadError {
    /// The target schema does not exist or names a system schema.
    #[error("schema \"{0}\" not found or reserved for the system")]
    SchemaNotFound(String),

    /// A catalog query failed; `step` names the entity group being built.
    #[error("failed to build {step}: {source}")]
    Catalog {
        step: &'static str,
        #[source]
        source: sqlx::Error,
    },

    /// The SQL source failed to parse.
    #[error("failed to parse DDL: {message}")]
    DdlParse {
        message: String,
        /// Leading fragment of the offending source.
        statement: String,
    },

    /// `ALTER TABLE` targeting a table the statement stream never created.
    #[error("ALTER TABLE on undefined table {schema}.{table}")]
    AlterOnMissingTable { schema: String, table: String },

    /// The caller's cancellation token fired mid-load.
    #[error("load cancelled")]
    Cancelled,
}
