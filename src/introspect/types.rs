//! User-defined types: enums, composites, and domains, each joined from its
//! own per-row query by `(schema, type_name)`.

use std::collections::HashMap;

use sqlx::postgres::PgPool;

use crate::model::{CompositeColumn, Database, DomainConstraint, TypeDef, TypeKind};

use super::queries;
use super::rows::{CompositeColumnRow, DomainConstraintRow, DomainRow, EnumValueRow};

pub(crate) async fn load(
    pool: &PgPool,
    target: &str,
    db: &mut Database,
) -> Result<(), sqlx::Error> {
    let enum_rows: Vec<EnumValueRow> = sqlx::query(queries::ENUM_VALUES)
        .bind(target)
        .fetch_all(pool)
        .await?
        .iter()
        .map(EnumValueRow::from)
        .collect();
    let composite_rows: Vec<CompositeColumnRow> = sqlx::query(queries::COMPOSITE_COLUMNS)
        .bind(target)
        .fetch_all(pool)
        .await?
        .iter()
        .map(CompositeColumnRow::from)
        .collect();
    let domain_rows: Vec<DomainRow> = sqlx::query(queries::DOMAINS)
        .bind(target)
        .fetch_all(pool)
        .await?
        .iter()
        .map(DomainRow::from)
        .collect();
    let domain_constraint_rows: Vec<DomainConstraintRow> =
        sqlx::query(queries::DOMAIN_CONSTRAINTS)
            .bind(target)
            .fetch_all(pool)
            .await?
            .iter()
            .map(DomainConstraintRow::from)
            .collect();

    let types = assemble_types(
        target,
        &enum_rows,
        &composite_rows,
        &domain_rows,
        &domain_constraint_rows,
    );
    let schema = db.get_or_create_schema(target);
    for type_def in types {
        schema.types.insert(type_def.name.clone(), type_def);
    }
    Ok(())
}

pub(crate) fn assemble_types(
    target: &str,
    enum_rows: &[EnumValueRow],
    composite_rows: &[CompositeColumnRow],
    domain_rows: &[DomainRow],
    domain_constraint_rows: &[DomainConstraintRow],
) -> Vec<TypeDef> {
    let mut out: Vec<TypeDef> = Vec::new();

    // Enums: rows arrive in label sort order.
    let mut enum_index: HashMap<String, usize> = HashMap::new();
    for row in enum_rows {
        if row.type_name.is_empty() {
            continue;
        }
        let slot = *enum_index.entry(row.type_name.clone()).or_insert_with(|| {
            out.push(TypeDef {
                schema: target.to_string(),
                name: row.type_name.clone(),
                kind: TypeKind::Enum { values: Vec::new() },
            });
            out.len() - 1
        });
        if let TypeKind::Enum { values } = &mut out[slot].kind {
            values.push(row.label.clone());
        }
    }

    // Composites: rows arrive in attribute order.
    let mut composite_index: HashMap<String, usize> = HashMap::new();
    for row in composite_rows {
        if row.type_name.is_empty() || row.column_name.is_empty() {
            continue;
        }
        let slot = *composite_index
            .entry(row.type_name.clone())
            .or_insert_with(|| {
                out.push(TypeDef {
                    schema: target.to_string(),
                    name: row.type_name.clone(),
                    kind: TypeKind::Composite {
                        columns: Vec::new(),
                    },
                });
                out.len() - 1
            });
        if let TypeKind::Composite { columns } = &mut out[slot].kind {
            columns.push(CompositeColumn {
                name: row.column_name.clone(),
                data_type: row.data_type.clone(),
                position: row.position.unwrap_or(columns.len() as i32 + 1),
            });
        }
    }

    // Domains, joined with their named check constraints.
    for row in domain_rows {
        if row.domain_name.is_empty() {
            continue;
        }
        let check_constraints: Vec<DomainConstraint> = domain_constraint_rows
            .iter()
            .filter(|c| c.domain_name == row.domain_name)
            .filter_map(|c| {
                // `pg_get_constraintdef` spells checks as `CHECK (...)`;
                // other domain constraint kinds are not modelled.
                c.definition
                    .strip_prefix("CHECK ")
                    .map(|clause| DomainConstraint {
                        name: c.constraint_name.clone(),
                        check_clause: clause.trim().to_string(),
                    })
            })
            .collect();
        out.push(TypeDef {
            schema: target.to_string(),
            name: row.domain_name.clone(),
            kind: TypeKind::Domain {
                base_type: row.base_type.clone(),
                not_null: row.not_null,
                default_value: row.default_value.clone(),
                check_constraints,
            },
        });
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enum_values_grouped_in_order() {
        let rows = vec![
            EnumValueRow {
                type_name: "status".to_string(),
                label: "draft".to_string(),
            },
            EnumValueRow {
                type_name: "status".to_string(),
                label: "active".to_string(),
            },
            EnumValueRow {
                type_name: "level".to_string(),
                label: "low".to_string(),
            },
        ];
        let types = assemble_types("public", &rows, &[], &[], &[]);
        assert_eq!(types.len(), 2);
        match &types[0].kind {
            TypeKind::Enum { values } => assert_eq!(values, &["draft", "active"]),
            other => panic!("expected enum, got {}", other.as_str()),
        }
    }

    #[test]
    fn test_composite_columns_grouped() {
        let rows = vec![
            CompositeColumnRow {
                type_name: "pair".to_string(),
                column_name: "x".to_string(),
                data_type: "integer".to_string(),
                position: Some(1),
            },
            CompositeColumnRow {
                type_name: "pair".to_string(),
                column_name: "y".to_string(),
                data_type: "integer".to_string(),
                position: Some(2),
            },
        ];
        let types = assemble_types("public", &[], &rows, &[], &[]);
        match &types[0].kind {
            TypeKind::Composite { columns } => {
                assert_eq!(columns.len(), 2);
                assert_eq!(columns[1].name, "y");
                assert_eq!(columns[1].position, 2);
            }
            other => panic!("expected composite, got {}", other.as_str()),
        }
    }

    #[test]
    fn test_domain_joined_with_checks() {
        let domains = vec![DomainRow {
            domain_name: "price".to_string(),
            base_type: "numeric".to_string(),
            not_null: true,
            default_value: Some("0".to_string()),
        }];
        let constraints = vec![DomainConstraintRow {
            domain_name: "price".to_string(),
            constraint_name: "price_positive".to_string(),
            definition: "CHECK (VALUE > 0)".to_string(),
        }];
        let types = assemble_types("public", &[], &[], &domains, &constraints);
        match &types[0].kind {
            TypeKind::Domain {
                base_type,
                not_null,
                default_value,
                check_constraints,
            } => {
                assert_eq!(base_type, "numeric");
                assert!(*not_null);
                assert_eq!(default_value.as_deref(), Some("0"));
                assert_eq!(check_constraints.len(), 1);
                assert_eq!(check_constraints[0].check_clause, "(VALUE > 0)");
            }
            other => panic!("expected domain, got {}", other.as_str()),
        }
    }
}
