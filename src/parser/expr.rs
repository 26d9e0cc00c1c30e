//! Canonical expression stringification.
//!
//! The DDL loader prints expressions itself instead of round-tripping through
//! the deparser, so defaults, predicates, and policy quals come out in the
//! exact spelling the normalizer would otherwise have to produce. Nodes
//! outside the modelled set collapse to the literal `(expression)` — a lossy
//! fallback that keeps unknown constructs from failing the load.

use pg_query::NodeEnum;
use pg_query::protobuf::{self, a_const};

use crate::normalize::canonical_type_name;

/// Fallback text for AST nodes the printer does not model.
const OPAQUE_EXPR: &str = "(expression)";

/// Print a node wrapped in `Option<Box<Node>>` as most AST fields are.
pub fn print_opt_node(node: Option<&pg_query::protobuf::Node>) -> String {
    match node.and_then(|n| n.node.as_ref()) {
        Some(inner) => print_expr(inner),
        None => String::new(),
    }
}

/// Recursively print an expression node in canonical form.
pub fn print_expr(node: &NodeEnum) -> String {
    match node {
        NodeEnum::ColumnRef(cr) => print_column_ref(cr),
        NodeEnum::AConst(ac) => print_const(ac),
        NodeEnum::AExpr(expr) => print_a_expr(expr),
        NodeEnum::BoolExpr(be) => print_bool_expr(be),
        NodeEnum::FuncCall(fc) => print_func_call(fc),
        NodeEnum::TypeCast(tc) => print_type_cast(tc),
        NodeEnum::NullTest(nt) => print_null_test(nt),
        NodeEnum::List(list) => {
            let items: Vec<String> = list
                .items
                .iter()
                .map(|n| print_opt_node(Some(n)))
                .collect();
            format!("({})", items.join(", "))
        }
        NodeEnum::CoalesceExpr(ce) => {
            let args: Vec<String> = ce.args.iter().map(|n| print_opt_node(Some(n))).collect();
            format!("COALESCE({})", args.join(", "))
        }
        NodeEnum::SqlvalueFunction(svf) => print_sql_value_function(svf).to_string(),
        _ => OPAQUE_EXPR.to_string(),
    }
}

/// `schema.table.column` reference. The transition-row qualifiers `new` and
/// `old` are emitted upper-case so triggers agree with catalog output.
fn print_column_ref(cr: &protobuf::ColumnRef) -> String {
    let parts: Vec<String> = cr
        .fields
        .iter()
        .filter_map(|f| match f.node.as_ref() {
            Some(NodeEnum::String(s)) => Some(match s.sval.as_str() {
                "new" => "NEW".to_string(),
                "old" => "OLD".to_string(),
                other => other.to_string(),
            }),
            Some(NodeEnum::AStar(_)) => Some("*".to_string()),
            _ => None,
        })
        .collect();
    parts.join(".")
}

fn print_const(ac: &protobuf::AConst) -> String {
    if ac.isnull {
        return "NULL".to_string();
    }
    match ac.val.as_ref() {
        Some(a_const::Val::Ival(i)) => i.ival.to_string(),
        Some(a_const::Val::Fval(f)) => f.fval.clone(),
        Some(a_const::Val::Sval(s)) => format!("'{}'", s.sval.replace('\'', "''")),
        Some(a_const::Val::Boolval(b)) => if b.boolval { "true" } else { "false" }.to_string(),
        Some(a_const::Val::Bsval(s)) => s.bsval.clone(),
        None => "NULL".to_string(),
    }
}

fn operator_name(name: &[pg_query::protobuf::Node]) -> String {
    name.iter()
        .rev()
        .find_map(|n| match n.node.as_ref() {
            Some(NodeEnum::String(s)) => Some(s.sval.clone()),
            _ => None,
        })
        .unwrap_or_default()
}

fn print_a_expr(expr: &protobuf::AExpr) -> String {
    let op = operator_name(&expr.name);
    let left = expr.lexpr.as_deref().map(|n| print_opt_node(Some(n)));
    let right = expr.rexpr.as_deref().map(|n| print_opt_node(Some(n)));

    match expr.kind() {
        protobuf::AExprKind::AexprIn => {
            let negated = op == "<>";
            let keyword = if negated { "NOT IN" } else { "IN" };
            format!(
                "{} {} {}",
                left.unwrap_or_default(),
                keyword,
                right.unwrap_or_default()
            )
        }
        protobuf::AExprKind::AexprOp => match (left, right) {
            (Some(l), Some(r)) => {
                // JSON path operators read as one unit, no added parentheses.
                if op == "->" || op == "->>" {
                    format!("{l} {op} {r}")
                } else {
                    format!("({l} {op} {r})")
                }
            }
            (None, Some(r)) => format!("({op}{r})"),
            (Some(l), None) => format!("({l} {op})"),
            (None, None) => OPAQUE_EXPR.to_string(),
        },
        _ => OPAQUE_EXPR.to_string(),
    }
}

fn print_bool_expr(be: &protobuf::BoolExpr) -> String {
    let args: Vec<String> = be.args.iter().map(|n| print_opt_node(Some(n))).collect();
    match be.boolop() {
        protobuf::BoolExprType::AndExpr => format!("({})", args.join(" AND ")),
        protobuf::BoolExprType::OrExpr => format!("({})", args.join(" OR ")),
        protobuf::BoolExprType::NotExpr => {
            format!("(NOT {})", args.first().cloned().unwrap_or_default())
        }
        _ => OPAQUE_EXPR.to_string(),
    }
}

/// Function call. The `pg_catalog` qualifier is dropped — it is implicit in
/// every search path and the catalog never emits it for builtins.
fn print_func_call(fc: &protobuf::FuncCall) -> String {
    let name: Vec<String> = fc
        .funcname
        .iter()
        .filter_map(|n| match n.node.as_ref() {
            Some(NodeEnum::String(s)) if s.sval != "pg_catalog" => Some(s.sval.clone()),
            _ => None,
        })
        .collect();
    let args: Vec<String> = fc.args.iter().map(|n| print_opt_node(Some(n))).collect();
    format!("{}({})", name.join("."), args.join(", "))
}

fn print_type_cast(tc: &protobuf::TypeCast) -> String {
    let arg = tc
        .arg
        .as_deref()
        .map(|n| print_opt_node(Some(n)))
        .unwrap_or_default();
    let type_name = tc
        .type_name
        .as_ref()
        .map(type_name_text)
        .unwrap_or_default();
    format!("{arg}::{type_name}")
}

fn print_null_test(nt: &protobuf::NullTest) -> String {
    let arg = nt
        .arg
        .as_deref()
        .map(|n| print_opt_node(Some(n)))
        .unwrap_or_default();
    match nt.nulltesttype() {
        protobuf::NullTestType::IsNull => format!("{arg} IS NULL"),
        protobuf::NullTestType::IsNotNull => format!("{arg} IS NOT NULL"),
        _ => OPAQUE_EXPR.to_string(),
    }
}

fn print_sql_value_function(svf: &protobuf::SqlValueFunction) -> &'static str {
    use protobuf::SqlValueFunctionOp::*;
    match svf.op() {
        SvfopCurrentDate => "CURRENT_DATE",
        SvfopCurrentTime | SvfopCurrentTimeN => "CURRENT_TIME",
        SvfopCurrentTimestamp | SvfopCurrentTimestampN => "CURRENT_TIMESTAMP",
        SvfopLocaltime | SvfopLocaltimeN => "LOCALTIME",
        SvfopLocaltimestamp | SvfopLocaltimestampN => "LOCALTIMESTAMP",
        SvfopCurrentRole => "CURRENT_ROLE",
        SvfopCurrentUser => "CURRENT_USER",
        SvfopUser => "USER",
        SvfopSessionUser => "SESSION_USER",
        SvfopCurrentCatalog => "CURRENT_CATALOG",
        SvfopCurrentSchema => "CURRENT_SCHEMA",
        _ => "(expression)",
    }
}

/// Render a `TypeName` node's dotted name with the canonical mapping applied
/// to the final element. `pg_catalog` qualifiers are dropped outright.
pub fn type_name_text(tn: &protobuf::TypeName) -> String {
    let mut parts: Vec<String> = tn
        .names
        .iter()
        .filter_map(|n| match n.node.as_ref() {
            Some(NodeEnum::String(s)) if s.sval != "pg_catalog" => Some(s.sval.clone()),
            _ => None,
        })
        .collect();
    if let Some(last) = parts.last_mut() {
        *last = canonical_type_name(last);
    }
    let mut text = parts.join(".");
    if !tn.array_bounds.is_empty() {
        text.push_str("[]");
    }
    text
}
