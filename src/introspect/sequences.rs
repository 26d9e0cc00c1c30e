//! Sequences and their owning columns.

use std::collections::HashMap;

use sqlx::postgres::PgPool;

use crate::model::{Database, Sequence};

use super::queries;
use super::rows::{SequenceOwnerRow, SequenceRow};

pub(crate) async fn load(
    pool: &PgPool,
    target: &str,
    db: &mut Database,
) -> Result<(), sqlx::Error> {
    let rows: Vec<SequenceRow> = sqlx::query(queries::SEQUENCES)
        .bind(target)
        .fetch_all(pool)
        .await?
        .iter()
        .map(SequenceRow::from)
        .collect();
    let owner_rows: Vec<SequenceOwnerRow> = sqlx::query(queries::SEQUENCE_OWNERS)
        .bind(target)
        .fetch_all(pool)
        .await?
        .iter()
        .map(SequenceOwnerRow::from)
        .collect();

    let sequences = assemble_sequences(target, &rows, &owner_rows);
    let schema = db.get_or_create_schema(target);
    for sequence in sequences {
        schema.sequences.insert(sequence.name.clone(), sequence);
    }
    Ok(())
}

pub(crate) fn assemble_sequences(
    target: &str,
    rows: &[SequenceRow],
    owners: &[SequenceOwnerRow],
) -> Vec<Sequence> {
    let owner_by_sequence: HashMap<&str, &SequenceOwnerRow> = owners
        .iter()
        .map(|o| (o.sequence_name.as_str(), o))
        .collect();

    rows.iter()
        .filter(|row| !row.sequence_name.is_empty())
        .map(|row| {
            let mut sequence = Sequence::new(target, &row.sequence_name);
            sequence.data_type = row.data_type.clone();
            sequence.start_value = row.start_value.unwrap_or(1);
            sequence.increment = row.increment_by.unwrap_or(1);
            sequence.min_value = row.min_value;
            sequence.max_value = row.max_value;
            sequence.cycle = row.cycle;
            if let Some(owner) = owner_by_sequence.get(row.sequence_name.as_str()) {
                sequence.owned_by_table = Some(owner.table_name.clone());
                sequence.owned_by_column = Some(owner.column_name.clone());
            }
            sequence
        })
        .collect()
}
