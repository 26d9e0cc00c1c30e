//! pg-schema-sync: schema model, loaders, and equivalence core for
//! declarative PostgreSQL schema management.
//!
//! Two loaders populate the same in-memory model: [`introspect`] reads a live
//! PostgreSQL catalog, [`parser`] ingests a DDL source file. [`normalize`]
//! reduces introspector output to the canonical surface forms the parser
//! emits directly, and [`compare`] reports every field-level difference
//! between two loaded schemas. SQL emission and diff planning are downstream
//! consumers of the model, not part of this crate.

pub mod compare;
pub mod error;
pub mod introspect;
pub mod model;
pub mod normalize;
pub mod parser;

// Re-export commonly used types
pub use compare::{DiffSeverity, SchemaDiff};
pub use error::LoadError;
pub use model::{Database, Schema, Table};
