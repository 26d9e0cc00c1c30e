//! Functions, procedures, and aggregates from `pg_proc`.

use std::sync::LazyLock;

use regex::Regex;
use sqlx::postgres::PgPool;

use crate::model::{Aggregate, Database, Function, Parameter, ParameterMode, Procedure, Volatility};

use super::queries;
use super::rows::{AggregateRow, FunctionRow};

pub(crate) async fn load_functions(
    pool: &PgPool,
    target: &str,
    db: &mut Database,
) -> Result<(), sqlx::Error> {
    let rows: Vec<FunctionRow> = sqlx::query(queries::FUNCTIONS)
        .bind(target)
        .fetch_all(pool)
        .await?
        .iter()
        .map(FunctionRow::from)
        .collect();

    let schema = db.get_or_create_schema(target);
    for row in rows {
        if row.name.is_empty() {
            continue;
        }
        let function = assemble_function(target, &row);
        schema.functions.insert(function.name.clone(), function);
    }
    Ok(())
}

pub(crate) async fn load_procedures(
    pool: &PgPool,
    target: &str,
    db: &mut Database,
) -> Result<(), sqlx::Error> {
    let rows: Vec<FunctionRow> = sqlx::query(queries::PROCEDURES)
        .bind(target)
        .fetch_all(pool)
        .await?
        .iter()
        .map(FunctionRow::from)
        .collect();

    let schema = db.get_or_create_schema(target);
    for row in rows {
        if row.name.is_empty() {
            continue;
        }
        let mut procedure = Procedure::new(target, &row.name);
        procedure.definition = row.definition.trim().to_string();
        procedure.language = row.language.clone();
        procedure.arguments = row.arguments.clone();
        procedure.signature = row.signature.clone();
        procedure.parameters = parse_parameters(&row.signature);
        schema.procedures.insert(procedure.name.clone(), procedure);
    }
    Ok(())
}

pub(crate) async fn load_aggregates(
    pool: &PgPool,
    target: &str,
    db: &mut Database,
) -> Result<(), sqlx::Error> {
    let rows: Vec<AggregateRow> = sqlx::query(queries::AGGREGATES)
        .bind(target)
        .fetch_all(pool)
        .await?
        .iter()
        .map(AggregateRow::from)
        .collect();

    let schema = db.get_or_create_schema(target);
    for row in rows {
        if row.name.is_empty() {
            continue;
        }
        let mut aggregate = Aggregate::new(target, &row.name);
        aggregate.arguments = row.arguments.clone();
        aggregate.signature = row.signature.clone();
        aggregate.return_type = row.return_type.clone();
        aggregate.state_type = row.state_type.clone();
        aggregate.transition_function = row.transition_function.clone().unwrap_or_default();
        aggregate.transition_function_schema = row.transition_function_schema.clone();
        aggregate.initial_condition = row.initial_condition.clone();
        aggregate.final_function = row.final_function.clone();
        aggregate.final_function_schema = row.final_function_schema.clone();
        schema.aggregates.insert(aggregate.name.clone(), aggregate);
    }
    Ok(())
}

pub(crate) fn assemble_function(target: &str, row: &FunctionRow) -> Function {
    let mut function = Function::new(target, &row.name);
    function.definition = row.definition.trim().to_string();
    function.language = row.language.clone();
    function.return_type = row.return_type.clone().unwrap_or_default();
    function.arguments = row.arguments.clone();
    function.signature = row.signature.clone();
    function.parameters = parse_parameters(&row.signature);
    function.volatility = row
        .volatility
        .as_deref()
        .and_then(|v| v.parse().ok())
        .unwrap_or(Volatility::Volatile);
    function.is_strict = row.is_strict;
    function.security_definer = row.security_definer;
    function
}

static MODE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(IN|OUT|INOUT|VARIADIC)\s+").expect("mode regex"));

/// Parse `pg_get_function_arguments` output into ordered parameters:
/// `IN batch integer, label text DEFAULT 'none'::text`.
pub(crate) fn parse_parameters(signature: &str) -> Vec<Parameter> {
    if signature.trim().is_empty() {
        return Vec::new();
    }
    crate::normalize::split_top_level_commas(signature)
        .iter()
        .enumerate()
        .map(|(i, item)| parse_parameter(item, i as i32 + 1))
        .collect()
}

fn parse_parameter(item: &str, position: i32) -> Parameter {
    let mut rest = item.trim();
    let mut mode = ParameterMode::In;
    if let Some(caps) = MODE_RE.captures(rest) {
        mode = match &caps[1] {
            "OUT" => ParameterMode::Out,
            "INOUT" => ParameterMode::InOut,
            "VARIADIC" => ParameterMode::Variadic,
            _ => ParameterMode::In,
        };
        rest = rest[caps.get(0).map(|m| m.end()).unwrap_or(0)..].trim();
    }

    let (declaration, default_value) = match rest.to_uppercase().find(" DEFAULT ") {
        Some(idx) => (
            rest[..idx].trim(),
            Some(rest[idx + " DEFAULT ".len()..].trim().to_string()),
        ),
        None => (rest, None),
    };

    // Either `name type` or a bare type for unnamed parameters. Types may
    // contain spaces (`double precision`), so a lone known-multiword type is
    // treated as unnamed.
    let (name, data_type) = match declaration.split_once(' ') {
        Some((first, remainder)) if !is_bare_type(declaration) => {
            (first.to_string(), remainder.trim().to_string())
        }
        _ => (String::new(), declaration.to_string()),
    };

    Parameter {
        name,
        data_type,
        mode,
        position,
        default_value,
    }
}

/// Multi-word spellings that are a type, not a `name type` pair.
fn is_bare_type(declaration: &str) -> bool {
    let lowered = declaration.to_lowercase();
    matches!(
        lowered.as_str(),
        "double precision"
            | "character varying"
            | "timestamp with time zone"
            | "timestamp without time zone"
            | "time with time zone"
            | "time without time zone"
    )
}
