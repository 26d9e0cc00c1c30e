//! Canonicalisation of PostgreSQL surface forms.
//!
//! PostgreSQL spells the same schema many ways: `int4` vs `integer`,
//! `timestamp with time zone` vs `timestamptz`, `::text` casts sprinkled on
//! literals, extra parentheses around policy predicates. The DDL parser emits
//! the canonical spelling directly; catalog introspection output is passed
//! through [`normalize_database`] before the two sides are compared.
//!
//! Every routine here is a total, pure function over strings: empty input
//! maps to empty output, and applying a routine twice is the same as applying
//! it once.

use regex::Regex;
use std::sync::LazyLock;

use crate::model::{Database, Function, Procedure, TriggerEvent, TypeKind};

// ---------------------------------------------------------------------------
// Type names
// ---------------------------------------------------------------------------

/// Map a PostgreSQL internal or verbose type spelling to the canonical form.
///
/// Handles array spellings (`_int4` and `int4[]`), `pg_catalog.` prefixes,
/// and parameterized types (`character varying(50)`); anything unrecognised
/// passes through untouched.
pub fn canonical_type_name(input: &str) -> String {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return String::new();
    }

    // Catalog-style array spelling: `_int4` means `int4[]`.
    if let Some(element) = trimmed.strip_prefix('_') {
        return format!("{}[]", canonical_type_name(element));
    }
    // DDL-style array spelling.
    if let Some(element) = trimmed.strip_suffix("[]") {
        return format!("{}[]", canonical_type_name(element));
    }

    // Split off a `(p[, s])` modifier suffix and canonicalise the base name.
    if let Some(open) = trimmed.find('(')
        && trimmed.ends_with(')')
    {
        let base = canonical_type_name(&trimmed[..open]);
        return format!("{}{}", base, &trimmed[open..]);
    }

    let lowered = trimmed.to_lowercase();
    let bare = lowered.strip_prefix("pg_catalog.").unwrap_or(&lowered);

    match bare {
        "int2" | "smallint" => "smallint".to_string(),
        "int4" | "int" | "integer" => "integer".to_string(),
        "int8" | "bigint" => "bigint".to_string(),
        "float4" | "real" => "real".to_string(),
        "float8" | "double precision" => "double precision".to_string(),
        "bool" | "boolean" => "boolean".to_string(),
        "bpchar" | "character" => "character".to_string(),
        "character varying" | "varchar" => "varchar".to_string(),
        "timestamp with time zone" | "timestamptz" => "timestamptz".to_string(),
        "timestamp without time zone" | "timestamp" => "timestamp".to_string(),
        "time with time zone" | "timetz" => "timetz".to_string(),
        "time without time zone" | "time" => "time".to_string(),
        _ => {
            if lowered.starts_with("pg_catalog.") {
                bare.to_string()
            } else {
                trimmed.to_string()
            }
        }
    }
}

static CAST_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"::\s*([A-Za-z_][A-Za-z0-9_.]*(?:\s+(?:with|without)\s+time\s+zone|\s+varying|\s+precision)?(?:\[\])?)",
    )
    .expect("cast regex")
});

/// Rewrite every `::typecast` occurrence in an expression with the canonical
/// type name.
pub fn canonicalize_casts(expr: &str) -> String {
    CAST_RE
        .replace_all(expr, |caps: &regex::Captures<'_>| {
            format!("::{}", canonical_type_name(&caps[1]))
        })
        .into_owned()
}

// ---------------------------------------------------------------------------
// Default values
// ---------------------------------------------------------------------------

static NEXTVAL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^nextval\('([^']+)'(?:::regclass)?\)$").expect("nextval regex")
});

static EMPTY_LITERAL_CAST_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^('(?:|\{\})')::[A-Za-z_][A-Za-z0-9_ .]*(?:\[\])?$").expect("literal cast regex")
});

static ENUM_CAST_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^('[^']*')::[A-Za-z_][A-Za-z0-9_]*\.[A-Za-z_][A-Za-z0-9_]*$")
        .expect("enum cast regex")
});

/// Canonicalise a column default expression.
///
/// Sequence defaults lose the schema qualifier and the `::regclass` cast so
/// that `nextval('public.t_id_seq'::regclass)` and `nextval('public.t_id_seq')`
/// converge; empty-string and empty-array literals lose their type cast; an
/// enum literal cast to a schema-qualified type keeps only the literal.
pub fn canonical_default(value: &str) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return String::new();
    }

    if let Some(caps) = NEXTVAL_RE.captures(trimmed) {
        let seq = &caps[1];
        let unqualified = seq.rsplit('.').next().unwrap_or(seq);
        return format!("nextval('{unqualified}')");
    }

    if let Some(caps) = EMPTY_LITERAL_CAST_RE.captures(trimmed) {
        return caps[1].to_string();
    }

    if let Some(caps) = ENUM_CAST_RE.captures(trimmed) {
        return caps[1].to_string();
    }

    trimmed.to_string()
}

/// Loader-agnostic default comparison: both sides are canonicalised (default
/// text and embedded casts) before the equality test.
pub fn defaults_equal(left: Option<&str>, right: Option<&str>) -> bool {
    let canon = |v: Option<&str>| -> Option<String> {
        let v = v.map(|s| canonicalize_casts(&canonical_default(s)));
        match v {
            Some(s) if s.is_empty() => None,
            other => other,
        }
    };
    canon(left) == canon(right)
}

// ---------------------------------------------------------------------------
// Expression helpers
// ---------------------------------------------------------------------------

/// Collapse runs of whitespace to single spaces and trim the ends.
pub fn collapse_whitespace(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut in_quote = false;
    let mut last_space = false;
    for ch in s.trim().chars() {
        if ch == '\'' {
            in_quote = !in_quote;
        }
        if !in_quote && ch.is_whitespace() {
            if !last_space {
                out.push(' ');
                last_space = true;
            }
        } else {
            out.push(ch);
            last_space = false;
        }
    }
    out.trim().to_string()
}

/// True when the first `(` matches the final `)` so the whole string is one
/// parenthesised group. Quote-aware.
fn is_fully_parenthesized(s: &str) -> bool {
    let bytes = s.as_bytes();
    if bytes.len() < 2 || bytes[0] != b'(' || bytes[bytes.len() - 1] != b')' {
        return false;
    }
    let mut depth = 0i32;
    let mut in_quote = false;
    for (i, ch) in s.char_indices() {
        match ch {
            '\'' => in_quote = !in_quote,
            '(' if !in_quote => depth += 1,
            ')' if !in_quote => {
                depth -= 1;
                if depth == 0 {
                    return i == s.len() - 1;
                }
            }
            _ => {}
        }
    }
    false
}

fn strip_one_paren_layer(s: &str) -> &str {
    if is_fully_parenthesized(s) {
        s[1..s.len() - 1].trim()
    } else {
        s
    }
}

/// `f(x)` / `my_schema.f(x, y)` — an identifier followed by one balanced
/// argument group that closes the string.
fn is_bare_function_call(s: &str) -> bool {
    static HEAD_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_.]*\(").expect("call regex"));
    let Some(m) = HEAD_RE.find(s) else {
        return false;
    };
    is_fully_parenthesized(&s[m.end() - 1..])
}

static LITERAL_TEXT_CAST_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"('[^']*')::text\b").expect("text cast regex"));

/// Drop `::text` casts attached to quoted literals.
fn strip_literal_text_casts(s: &str) -> String {
    LITERAL_TEXT_CAST_RE.replace_all(s, "$1").into_owned()
}

// ---------------------------------------------------------------------------
// Policy expressions
// ---------------------------------------------------------------------------

/// Canonicalise a policy `USING` / `WITH CHECK` expression: whitespace
/// collapsed, literal `::text` casts dropped, redundant parentheses around a
/// lone function call removed, and everything else wrapped in exactly one
/// outer pair.
pub fn canonical_policy_expression(expr: &str) -> String {
    let mut s = collapse_whitespace(expr);
    if s.is_empty() {
        return s;
    }
    s = strip_literal_text_casts(&s);

    // Peel every layer that wraps the whole expression, then add back the
    // single canonical pair. A lone function call stays bare.
    while is_fully_parenthesized(&s) {
        s = strip_one_paren_layer(&s).to_string();
    }
    if is_bare_function_call(&s) {
        return s;
    }
    format!("({s})")
}

// ---------------------------------------------------------------------------
// Partial-index WHERE clauses
// ---------------------------------------------------------------------------

static COMPARISON_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:=|<>|!=|<=|>=|<|>)").expect("comparison regex"));

/// A form that reads as one unit without extra wrapping: a fully
/// parenthesised expression, an `IN (...)` list, a bare function call, or a
/// comparison whose right operand is itself parenthesised.
fn is_self_contained(s: &str) -> bool {
    if is_fully_parenthesized(s) || is_bare_function_call(s) {
        return true;
    }
    let upper = s.to_uppercase();
    if let Some(pos) = upper.find(" IN (")
        && is_fully_parenthesized(s[pos + 4..].trim())
    {
        return true;
    }
    if let Some(m) = COMPARISON_RE.find(s)
        && is_fully_parenthesized(s[m.end()..].trim())
    {
        return true;
    }
    false
}

/// Canonicalise a partial-index predicate: one outer layer of parentheses is
/// stripped when it wraps the whole expression, then a single pair is added
/// back unless the expression is already self-contained.
pub fn canonical_index_where(expr: &str) -> String {
    let mut s = collapse_whitespace(expr);
    if s.is_empty() {
        return s;
    }
    s = strip_one_paren_layer(&s).to_string();
    if !is_self_contained(&s) {
        s = format!("({s})");
    }
    s
}

// ---------------------------------------------------------------------------
// JSON expression columns
// ---------------------------------------------------------------------------

static TEXT_CAST_ANY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"::text\b").expect("any text cast regex"));
static JSON_OP_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*(->>|->)\s*").expect("json op regex"));

/// Simplify a JSON path expression column to its tight canonical spelling:
/// `((payload ->> 'method'::text))` becomes `(payload->>'method')`.
pub fn simplify_json_expression(expr: &str) -> String {
    if !expr.contains("->") {
        return expr.to_string();
    }
    let mut s = TEXT_CAST_ANY_RE.replace_all(expr, "").into_owned();
    s = collapse_whitespace(&s);
    while is_fully_parenthesized(&s) {
        s = strip_one_paren_layer(&s).to_string();
    }
    s = JSON_OP_RE.replace_all(&s, "$1").into_owned();
    format!("({s})")
}

// ---------------------------------------------------------------------------
// Roles
// ---------------------------------------------------------------------------

/// Trim, case-fold (keeping `PUBLIC` upper), and sort a policy role list.
pub fn canonical_roles(roles: &[String]) -> Vec<String> {
    let mut out: Vec<String> = roles
        .iter()
        .map(|r| {
            let trimmed = r.trim();
            if trimmed.eq_ignore_ascii_case("public") {
                "PUBLIC".to_string()
            } else {
                trimmed.to_lowercase()
            }
        })
        .filter(|r| !r.is_empty())
        .collect();
    out.sort();
    out
}

// ---------------------------------------------------------------------------
// Triggers
// ---------------------------------------------------------------------------

/// Canonicalise the trigger's function call: tighten whitespace and drop a
/// schema qualifier equal to the trigger's own schema.
pub fn canonical_trigger_call(call: &str, own_schema: &str) -> String {
    let mut s = collapse_whitespace(call);
    s = s.replace(" (", "(");
    let prefix = format!("{own_schema}.");
    if let Some(rest) = s.strip_prefix(&prefix) {
        s = rest.to_string();
    }
    s
}

/// Sort and deduplicate trigger events into the canonical
/// INSERT, UPDATE, DELETE, TRUNCATE sequence.
pub fn canonical_trigger_events(events: &[TriggerEvent]) -> Vec<TriggerEvent> {
    let mut out: Vec<TriggerEvent> = events.to_vec();
    out.sort();
    out.dedup();
    out
}

/// Canonicalise a trigger `WHEN` condition: whitespace collapsed and the
/// transition-row names `new` / `old` upper-cased at word boundaries.
pub fn canonical_trigger_when(cond: &str) -> String {
    let collapsed = collapse_whitespace(cond);
    let mut out = String::with_capacity(collapsed.len());
    let mut token = String::new();
    let mut in_quote = false;

    let flush = |token: &mut String, out: &mut String| {
        if token.is_empty() {
            return;
        }
        match token.as_str() {
            "new" => out.push_str("NEW"),
            "old" => out.push_str("OLD"),
            other => out.push_str(other),
        }
        token.clear();
    };

    for ch in collapsed.chars() {
        if ch == '\'' {
            flush(&mut token, &mut out);
            in_quote = !in_quote;
            out.push(ch);
        } else if !in_quote && (ch.is_alphanumeric() || ch == '_') {
            token.push(ch);
        } else {
            flush(&mut token, &mut out);
            out.push(ch);
        }
    }
    flush(&mut token, &mut out);
    out
}

// ---------------------------------------------------------------------------
// Functions and procedures
// ---------------------------------------------------------------------------

/// Split on commas at paren depth zero, quote-aware.
pub fn split_top_level_commas(s: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut in_quote = false;
    let mut current = String::new();
    for ch in s.chars() {
        match ch {
            '\'' => {
                in_quote = !in_quote;
                current.push(ch);
            }
            '(' | '[' if !in_quote => {
                depth += 1;
                current.push(ch);
            }
            ')' | ']' if !in_quote => {
                depth -= 1;
                current.push(ch);
            }
            ',' if !in_quote && depth == 0 => {
                parts.push(current.trim().to_string());
                current.clear();
            }
            _ => current.push(ch),
        }
    }
    let last = current.trim();
    if !last.is_empty() {
        parts.push(last.to_string());
    }
    parts
}

/// Canonicalise a return type, recursing into `TABLE(name type, ...)` forms.
pub fn canonical_return_type(return_type: &str) -> String {
    let trimmed = return_type.trim();
    if trimmed.is_empty() {
        return String::new();
    }
    let upper = trimmed.to_uppercase();
    if upper.starts_with("TABLE(") && trimmed.ends_with(')') {
        let inner = &trimmed[6..trimmed.len() - 1];
        let cols: Vec<String> = split_top_level_commas(inner)
            .iter()
            .map(|col| match col.split_once(' ') {
                Some((name, ty)) => format!("{} {}", name.trim(), canonical_type_name(ty)),
                None => canonical_type_name(col),
            })
            .collect();
        return format!("TABLE({})", cols.join(", "));
    }
    if upper.starts_with("SETOF ") {
        return format!("SETOF {}", canonical_type_name(trimmed[6..].trim()));
    }
    canonical_type_name(trimmed)
}

pub fn normalize_function(f: &mut Function) {
    f.language = f.language.to_lowercase();
    f.return_type = canonical_return_type(&f.return_type);
    for p in &mut f.parameters {
        p.data_type = canonical_type_name(&p.data_type);
    }
    f.arguments = split_top_level_commas(&f.arguments)
        .iter()
        .map(|t| canonical_type_name(t))
        .collect::<Vec<_>>()
        .join(", ");
}

/// Canonicalise a procedure. When the catalog supplied a full signature the
/// arguments string is rebuilt from it (`name type [DEFAULT expr]`, `IN`
/// dropped, literal `::text` casts removed) and the signature cleared, so the
/// two loaders agree on one representation.
pub fn normalize_procedure(p: &mut Procedure) {
    p.language = p.language.to_lowercase();
    for param in &mut p.parameters {
        param.data_type = canonical_type_name(&param.data_type);
    }
    if p.signature.is_empty() {
        return;
    }
    let rebuilt: Vec<String> = split_top_level_commas(&p.signature)
        .iter()
        .map(|item| {
            let item = item.strip_prefix("IN ").unwrap_or(item);
            strip_literal_text_casts(item.trim())
        })
        .collect();
    p.arguments = rebuilt.join(", ");
    p.signature = String::new();
}

// ---------------------------------------------------------------------------
// Whole-database pass
// ---------------------------------------------------------------------------

/// Apply every canonicalisation across a loaded database. This is the pass
/// run over introspector output; parser output is already canonical.
pub fn normalize_database(db: &mut Database) {
    for schema in db.schemas.values_mut() {
        for table in schema.tables.values_mut() {
            for column in &mut table.columns {
                column.data_type = canonical_type_name(&column.data_type);
                if let Some(default) = column.default_value.take() {
                    let canon = canonicalize_casts(&canonical_default(&default));
                    if !canon.is_empty() {
                        column.default_value = Some(canon);
                    }
                }
            }
            for index in table.indexes.values_mut() {
                if let Some(where_clause) = index.where_clause.take() {
                    index.where_clause = Some(canonical_index_where(&where_clause));
                    index.is_partial = true;
                }
                for col in &mut index.columns {
                    if col.name.contains("->") {
                        col.name = simplify_json_expression(&col.name);
                    }
                }
            }
            for trigger in table.triggers.values_mut() {
                trigger.function_call =
                    canonical_trigger_call(&trigger.function_call, &trigger.schema);
                trigger.events = canonical_trigger_events(&trigger.events);
                if let Some(when) = trigger.when_condition.take() {
                    trigger.when_condition = Some(canonical_trigger_when(&when));
                }
            }
            for policy in table.policies.values_mut() {
                normalize_policy(policy);
            }
        }
        for policy in schema.policies.values_mut() {
            normalize_policy(policy);
        }
        for sequence in schema.sequences.values_mut() {
            sequence.data_type = canonical_type_name(&sequence.data_type);
        }
        for type_def in schema.types.values_mut() {
            match &mut type_def.kind {
                TypeKind::Enum { .. } => {}
                TypeKind::Composite { columns } => {
                    for col in columns {
                        col.data_type = canonical_type_name(&col.data_type);
                    }
                }
                TypeKind::Domain {
                    base_type,
                    default_value,
                    ..
                } => {
                    *base_type = canonical_type_name(base_type);
                    if let Some(default) = default_value.take() {
                        let canon = canonical_default(&default);
                        if !canon.is_empty() {
                            *default_value = Some(canon);
                        }
                    }
                }
            }
        }
        for function in schema.functions.values_mut() {
            normalize_function(function);
        }
        for procedure in schema.procedures.values_mut() {
            normalize_procedure(procedure);
        }
        for aggregate in schema.aggregates.values_mut() {
            aggregate.return_type = canonical_type_name(&aggregate.return_type);
            aggregate.state_type = canonical_type_name(&aggregate.state_type);
        }
    }
}

fn normalize_policy(policy: &mut crate::model::Policy) {
    policy.roles = canonical_roles(&policy.roles);
    if let Some(using) = policy.using_expression.take() {
        policy.using_expression = Some(canonical_policy_expression(&using));
    }
    if let Some(check) = policy.with_check_expression.take() {
        policy.with_check_expression = Some(canonical_policy_expression(&check));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    // -- type names ---------------------------------------------------------

    #[test]
    fn test_internal_type_names_map_to_standard() {
        assert_eq!(canonical_type_name("int2"), "smallint");
        assert_eq!(canonical_type_name("int4"), "integer");
        assert_eq!(canonical_type_name("int8"), "bigint");
        assert_eq!(canonical_type_name("float4"), "real");
        assert_eq!(canonical_type_name("float8"), "double precision");
        assert_eq!(canonical_type_name("bool"), "boolean");
        assert_eq!(canonical_type_name("bpchar"), "character");
    }

    #[test]
    fn test_pg_catalog_prefix_stripped() {
        assert_eq!(canonical_type_name("pg_catalog.int8"), "bigint");
        assert_eq!(canonical_type_name("pg_catalog.varchar"), "varchar");
        assert_eq!(canonical_type_name("pg_catalog.tsvector"), "tsvector");
    }

    #[test]
    fn test_time_zone_spellings() {
        assert_eq!(
            canonical_type_name("timestamp with time zone"),
            "timestamptz"
        );
        assert_eq!(
            canonical_type_name("timestamp without time zone"),
            "timestamp"
        );
        assert_eq!(canonical_type_name("time with time zone"), "timetz");
        assert_eq!(canonical_type_name("character varying"), "varchar");
    }

    #[test]
    fn test_array_types_both_spellings() {
        assert_eq!(canonical_type_name("_text"), "text[]");
        assert_eq!(canonical_type_name("_int4"), "integer[]");
        assert_eq!(canonical_type_name("int8[]"), "bigint[]");
    }

    #[test]
    fn test_parameterized_types_keep_modifiers() {
        assert_eq!(
            canonical_type_name("character varying(50)"),
            "varchar(50)"
        );
        assert_eq!(canonical_type_name("numeric(10,2)"), "numeric(10,2)");
    }

    #[test]
    fn test_unrecognised_type_untouched() {
        assert_eq!(canonical_type_name("my_enum"), "my_enum");
        assert_eq!(canonical_type_name("uuid"), "uuid");
    }

    #[test]
    fn test_cast_rewrite_in_expression() {
        assert_eq!(
            canonicalize_casts("('2024-01-01'::pg_catalog.timestamptz)"),
            "('2024-01-01'::timestamptz)"
        );
        assert_eq!(canonicalize_casts("x::int4 + 1"), "x::integer + 1");
    }

    // -- defaults -----------------------------------------------------------

    #[test]
    fn test_nextval_loses_schema_and_regclass() {
        assert_eq!(
            canonical_default("nextval('public.t_id_seq'::regclass)"),
            "nextval('t_id_seq')"
        );
        assert_eq!(
            canonical_default("nextval('public.t_id_seq')"),
            "nextval('t_id_seq')"
        );
        assert_eq!(canonical_default("nextval('t_id_seq')"), "nextval('t_id_seq')");
    }

    #[test]
    fn test_empty_literal_casts_dropped() {
        assert_eq!(canonical_default("''::text"), "''");
        assert_eq!(canonical_default("'{}'::jsonb"), "'{}'");
    }

    #[test]
    fn test_enum_literal_cast_dropped() {
        assert_eq!(canonical_default("'active'::public.status"), "'active'");
        // Unqualified casts carry meaning and stay.
        assert_eq!(canonical_default("'active'::status"), "'active'::status");
    }

    #[test]
    fn test_plain_defaults_pass_through() {
        assert_eq!(canonical_default("  CURRENT_TIMESTAMP "), "CURRENT_TIMESTAMP");
        assert_eq!(canonical_default("0"), "0");
    }

    #[test]
    fn test_defaults_equal_across_loaders() {
        assert!(defaults_equal(
            Some("nextval('public.t_id_seq'::regclass)"),
            Some("nextval('public.t_id_seq')")
        ));
        assert!(defaults_equal(None, Some("  ")));
        assert!(!defaults_equal(Some("1"), Some("2")));
    }

    // -- policy expressions -------------------------------------------------

    #[test]
    fn test_policy_double_parens_reduced() {
        assert_eq!(
            canonical_policy_expression("((tenant_id = current_setting('app.tenant')::integer))"),
            "(tenant_id = current_setting('app.tenant')::integer)"
        );
    }

    #[test]
    fn test_policy_bare_expression_wrapped_once() {
        assert_eq!(canonical_policy_expression("a = b"), "(a = b)");
    }

    #[test]
    fn test_policy_function_call_sheds_parens() {
        assert_eq!(canonical_policy_expression("(is_admin())"), "is_admin()");
        assert_eq!(canonical_policy_expression("is_admin()"), "is_admin()");
    }

    #[test]
    fn test_policy_literal_text_cast_removed() {
        assert_eq!(
            canonical_policy_expression("(role = 'admin'::text)"),
            "(role = 'admin')"
        );
    }

    #[test]
    fn test_policy_whitespace_collapsed() {
        assert_eq!(canonical_policy_expression("( a   =\n  b )"), "(a = b)");
    }

    // -- index WHERE --------------------------------------------------------

    #[test]
    fn test_where_double_parens_reduced() {
        assert_eq!(
            canonical_index_where("((status = 'active'))"),
            "(status = 'active')"
        );
    }

    #[test]
    fn test_where_bare_comparison_wrapped() {
        assert_eq!(canonical_index_where("status = 'active'"), "(status = 'active')");
    }

    #[test]
    fn test_where_in_list_not_rewrapped() {
        assert_eq!(
            canonical_index_where("(status IN ('a', 'b'))"),
            "status IN ('a', 'b')"
        );
    }

    #[test]
    fn test_where_parenthesised_rhs_not_rewrapped() {
        assert_eq!(
            canonical_index_where("(deleted_at = (now()))"),
            "deleted_at = (now())"
        );
    }

    // -- JSON simplification ------------------------------------------------

    #[test]
    fn test_json_expression_simplified() {
        assert_eq!(
            simplify_json_expression("((payload ->> 'method'::text))"),
            "(payload->>'method')"
        );
        assert_eq!(
            simplify_json_expression("(data -> 'a')"),
            "(data->'a')"
        );
    }

    #[test]
    fn test_non_json_expression_untouched() {
        assert_eq!(simplify_json_expression("lower(email)"), "lower(email)");
    }

    // -- roles --------------------------------------------------------------

    #[test]
    fn test_roles_sorted_public_uppercase() {
        let roles = vec!["admin".to_string(), "Public".to_string(), " Writer ".to_string()];
        assert_eq!(canonical_roles(&roles), vec!["PUBLIC", "admin", "writer"]);
    }

    // -- triggers -----------------------------------------------------------

    #[test]
    fn test_trigger_call_schema_stripped() {
        assert_eq!(
            canonical_trigger_call("public.audit_row('t')", "public"),
            "audit_row('t')"
        );
        assert_eq!(
            canonical_trigger_call("other.audit_row()", "public"),
            "other.audit_row()"
        );
    }

    #[test]
    fn test_trigger_when_new_old_uppercased() {
        assert_eq!(
            canonical_trigger_when("new.amount  >  old.amount"),
            "NEW.amount > OLD.amount"
        );
        // Word boundary: `renewed` must not become `reNEWed`.
        assert_eq!(canonical_trigger_when("renewed = true"), "renewed = true");
        // Quoted occurrences stay as written.
        assert_eq!(canonical_trigger_when("note = 'new'"), "note = 'new'");
    }

    #[test]
    fn test_trigger_events_reordered() {
        use TriggerEvent::*;
        assert_eq!(
            canonical_trigger_events(&[Truncate, Delete, Insert, Update]),
            vec![Insert, Update, Delete, Truncate]
        );
    }

    // -- functions ----------------------------------------------------------

    #[test]
    fn test_return_type_table_form_recursed() {
        assert_eq!(
            canonical_return_type("TABLE(id int4, label character varying)"),
            "TABLE(id integer, label varchar)"
        );
        assert_eq!(canonical_return_type("int8"), "bigint");
        assert_eq!(canonical_return_type("SETOF int4"), "SETOF integer");
    }

    #[test]
    fn test_procedure_signature_rebuilds_arguments() {
        let mut p = crate::model::Procedure::new("public", "do_work");
        p.signature = "IN batch integer, IN label text DEFAULT 'none'::text".to_string();
        normalize_procedure(&mut p);
        assert_eq!(p.arguments, "batch integer, label text DEFAULT 'none'");
        assert!(p.signature.is_empty());
    }

    #[test]
    fn test_function_arguments_types_canonicalised() {
        let mut f = crate::model::Function::new("public", "f");
        f.language = "PLPGSQL".to_string();
        f.arguments = "int4, character varying".to_string();
        f.return_type = "bool".to_string();
        normalize_function(&mut f);
        assert_eq!(f.language, "plpgsql");
        assert_eq!(f.arguments, "integer, varchar");
        assert_eq!(f.return_type, "boolean");
    }

    // -- idempotence --------------------------------------------------------

    proptest! {
        #[test]
        fn prop_canonical_default_idempotent(s in "[ -~]{0,40}") {
            let once = canonical_default(&s);
            prop_assert_eq!(canonical_default(&once), once.clone());
        }

        #[test]
        fn prop_canonical_type_name_idempotent(s in "[a-z_.\\[\\]]{0,20}") {
            let once = canonical_type_name(&s);
            prop_assert_eq!(canonical_type_name(&once), once.clone());
        }

        // Balanced, quote-free inputs: the canonical forms are only defined
        // over well-formed expressions.
        #[test]
        fn prop_policy_expression_idempotent(s in "[a-z0-9_ =.]{0,40}") {
            let once = canonical_policy_expression(&s);
            prop_assert_eq!(canonical_policy_expression(&once), once.clone());
        }

        #[test]
        fn prop_index_where_idempotent(s in "[a-z0-9_ =.]{0,40}") {
            let once = canonical_index_where(&s);
            prop_assert_eq!(canonical_index_where(&once), once.clone());
        }
    }
}
