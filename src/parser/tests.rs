//! DDL loader tests: statement coverage, inline-constraint synthesis,
//! SERIAL expansion, partitioning, and the loader's single fatal error.

use crate::error::LoadError;
use crate::model::{
    ConstraintType, Database, FkAction, IdentityGeneration, IndexType, ParameterMode,
    PartitionStrategy, PolicyCommand, SortDirection, TableType, TriggerEvent, TriggerLevel,
    TriggerTiming, TypeKind, Volatility,
};
use crate::parser::parse_sql;

fn table<'a>(db: &'a Database, schema: &str, name: &str) -> &'a crate::model::Table {
    db.schemas
        .get(schema)
        .unwrap_or_else(|| panic!("schema {schema} missing"))
        .tables
        .get(name)
        .unwrap_or_else(|| panic!("table {name} missing"))
}

#[test]
fn test_create_table_with_pk_constraint() {
    let db = parse_sql(
        "CREATE TABLE public.t(\
             id integer NOT NULL,\
             name text NOT NULL,\
             created_at timestamp with time zone DEFAULT CURRENT_TIMESTAMP\
         );\
         ALTER TABLE ONLY public.t ADD CONSTRAINT t_pkey PRIMARY KEY (id);",
    )
    .expect("load");

    assert_eq!(db.schemas.len(), 1);
    let t = table(&db, "public", "t");
    assert_eq!(t.table_type, TableType::Base);
    assert_eq!(t.columns.len(), 3);
    let positions: Vec<i32> = t.columns.iter().map(|c| c.position).collect();
    assert_eq!(positions, vec![1, 2, 3]);

    let created_at = t.get_column("created_at").expect("created_at");
    assert_eq!(created_at.data_type, "timestamptz");
    assert_eq!(created_at.default_value.as_deref(), Some("CURRENT_TIMESTAMP"));
    assert!(created_at.nullable);

    let pk = t.constraints.get("t_pkey").expect("t_pkey");
    assert_eq!(pk.constraint_type, ConstraintType::PrimaryKey);
    assert_eq!(pk.column_names(), vec!["id"]);
    assert!(!t.get_column("id").unwrap().nullable);
}

#[test]
fn test_create_sequence_options() {
    let db = parse_sql(
        "CREATE SEQUENCE s START WITH 1000 INCREMENT BY 5 MINVALUE 5 MAXVALUE 100 CYCLE;",
    )
    .expect("load");

    let seq = db.schemas["public"].sequences.get("s").expect("sequence");
    assert_eq!(seq.start_value, 1000);
    assert_eq!(seq.increment, 5);
    assert_eq!(seq.min_value, Some(5));
    assert_eq!(seq.max_value, Some(100));
    assert!(seq.cycle);
    assert_eq!(seq.data_type, "bigint");
}

#[test]
fn test_serial_expansion_synthesises_sequence() {
    let db = parse_sql("CREATE TABLE t(id serial PRIMARY KEY);").expect("load");

    let t = table(&db, "public", "t");
    let id = t.get_column("id").expect("id");
    assert_eq!(id.data_type, "integer");
    assert!(!id.nullable);
    assert_eq!(id.default_value.as_deref(), Some("nextval('public.t_id_seq')"));
    assert!(id.identity.is_none());

    let seq = db.schemas["public"]
        .sequences
        .get("t_id_seq")
        .expect("t_id_seq");
    assert_eq!(seq.owned_by_table.as_deref(), Some("t"));
    assert_eq!(seq.owned_by_column.as_deref(), Some("id"));

    let pk = t.constraints.get("t_pkey").expect("t_pkey");
    assert_eq!(pk.constraint_type, ConstraintType::PrimaryKey);
}

#[test]
fn test_serial_in_partition_child_shares_parent_sequence() {
    let db = parse_sql("CREATE TABLE metrics_2024(id serial);").expect("load");

    let t = table(&db, "public", "metrics_2024");
    assert_eq!(
        t.get_column("id").unwrap().default_value.as_deref(),
        Some("nextval('public.metrics_id_seq')")
    );
    // No sequence of its own.
    assert!(db.schemas["public"].sequences.is_empty());
}

#[test]
fn test_partitioned_parent_and_child() {
    let db = parse_sql(
        "CREATE TABLE t(id int, created date) PARTITION BY RANGE (id);\
         CREATE TABLE t_p2022 PARTITION OF t FOR VALUES FROM (0) TO (100);\
         ALTER TABLE ONLY t ADD CONSTRAINT t_pkey PRIMARY KEY (created, id);",
    )
    .expect("load");

    let t = table(&db, "public", "t");
    assert!(t.is_partitioned);
    assert_eq!(t.partition_strategy, Some(PartitionStrategy::Range));
    assert_eq!(t.partition_key, "id");

    assert_eq!(db.partition_attachments.len(), 1);
    let attachment = &db.partition_attachments[0];
    assert_eq!(attachment.parent_table, "t");
    assert_eq!(attachment.child_table, "t_p2022");
    assert_eq!(attachment.partition_bound, "FOR VALUES FROM (0) TO (100)");

    // Partition-key columns lead the primary key.
    let pk = t.constraints.get("t_pkey").expect("t_pkey");
    assert_eq!(pk.column_names(), vec!["id", "created"]);
    let positions: Vec<i32> = pk.columns.iter().map(|c| c.position).collect();
    assert_eq!(positions, vec![1, 2]);
}

#[test]
fn test_partial_expression_index() {
    let db = parse_sql(
        "CREATE TABLE t(payload jsonb, status text);\
         CREATE INDEX i ON t USING btree (((payload ->> 'method'))) WHERE ((status = 'active'));",
    )
    .expect("load");

    let t = table(&db, "public", "t");
    let index = t.indexes.get("i").expect("index i");
    assert_eq!(index.method, "btree");
    assert!(index.is_partial);
    assert!(index.is_expression);
    assert_eq!(index.columns.len(), 1);
    assert_eq!(index.columns[0].name, "(payload->>'method')");
    assert_eq!(index.where_clause.as_deref(), Some("(status = 'active')"));
}

#[test]
fn test_policy_roles_and_using_expression() {
    let db = parse_sql(
        "CREATE TABLE t(tenant_id integer);\
         CREATE POLICY p ON t FOR SELECT TO admin, PUBLIC \
         USING ((tenant_id = current_setting('app.tenant')::integer));",
    )
    .expect("load");

    let t = table(&db, "public", "t");
    let policy = t.policies.get("p").expect("policy p");
    assert_eq!(policy.command, PolicyCommand::Select);
    assert!(policy.permissive);
    assert_eq!(policy.roles, vec!["PUBLIC", "admin"]);
    assert_eq!(
        policy.using_expression.as_deref(),
        Some("(tenant_id = current_setting('app.tenant')::integer)")
    );
}

#[test]
fn test_alter_table_on_missing_table_is_fatal() {
    let err = parse_sql("ALTER TABLE missing ADD CONSTRAINT c PRIMARY KEY (id);")
        .expect_err("must fail");
    match err {
        LoadError::AlterOnMissingTable { schema, table } => {
            assert_eq!(schema, "public");
            assert_eq!(table, "missing");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_alter_table_default_and_nullability() {
    let db = parse_sql(
        "CREATE TABLE t(a integer, b text);\
         ALTER TABLE t ALTER COLUMN a SET DEFAULT 0;\
         ALTER TABLE t ALTER COLUMN b SET NOT NULL;\
         ALTER TABLE t ENABLE ROW LEVEL SECURITY;",
    )
    .expect("load");

    let t = table(&db, "public", "t");
    assert_eq!(t.get_column("a").unwrap().default_value.as_deref(), Some("0"));
    assert!(!t.get_column("b").unwrap().nullable);
    assert!(t.rls_enabled);
}

#[test]
fn test_alter_table_drop_default_and_not_null() {
    let db = parse_sql(
        "CREATE TABLE t(a integer DEFAULT 1 NOT NULL);\
         ALTER TABLE t ALTER COLUMN a DROP DEFAULT;\
         ALTER TABLE t ALTER COLUMN a DROP NOT NULL;",
    )
    .expect("load");

    let t = table(&db, "public", "t");
    let a = t.get_column("a").unwrap();
    assert!(a.default_value.is_none());
    assert!(a.nullable);
}

#[test]
fn test_inline_constraints_are_named_table_level() {
    let db = parse_sql(
        "CREATE TABLE customers(id integer PRIMARY KEY);\
         CREATE TABLE orders(\
             id integer PRIMARY KEY,\
             customer_id integer REFERENCES customers(id) ON DELETE CASCADE,\
             email text UNIQUE,\
             amount integer CHECK (amount > 0)\
         );",
    )
    .expect("load");

    let orders = table(&db, "public", "orders");
    assert!(orders.constraints.contains_key("orders_pkey"));

    let fk = orders
        .constraints
        .get("orders_customer_id_fkey")
        .expect("fk");
    assert_eq!(fk.constraint_type, ConstraintType::ForeignKey);
    assert_eq!(fk.referenced_table.as_deref(), Some("customers"));
    assert_eq!(
        fk.referenced_columns
            .iter()
            .map(|c| c.name.as_str())
            .collect::<Vec<_>>(),
        vec!["id"]
    );
    assert_eq!(fk.delete_rule, Some(FkAction::Cascade));
    assert_eq!(fk.update_rule, Some(FkAction::NoAction));
    assert!(fk.deferrable);

    let unique = orders.constraints.get("orders_email_key").expect("unique");
    assert_eq!(unique.constraint_type, ConstraintType::Unique);

    let check = orders
        .constraints
        .get("orders_amount_check")
        .expect("check");
    assert_eq!(check.check_clause.as_deref(), Some("(amount > 0)"));
}

#[test]
fn test_primary_key_synthesises_backing_index() {
    let db = parse_sql("CREATE TABLE t(id integer PRIMARY KEY, email text UNIQUE);")
        .expect("load");

    let t = table(&db, "public", "t");
    let pkey_index = t.indexes.get("t_pkey").expect("t_pkey index");
    assert_eq!(pkey_index.index_type, IndexType::Primary);
    assert!(pkey_index.is_unique);
    let unique_index = t.indexes.get("t_email_key").expect("t_email_key index");
    assert_eq!(unique_index.index_type, IndexType::Unique);
}

#[test]
fn test_identity_column() {
    let db = parse_sql(
        "CREATE TABLE t(id bigint GENERATED ALWAYS AS IDENTITY (START WITH 10 INCREMENT BY 2));",
    )
    .expect("load");

    let t = table(&db, "public", "t");
    let id = t.get_column("id").unwrap();
    let identity = id.identity.as_ref().expect("identity");
    assert_eq!(identity.generation, IdentityGeneration::Always);
    assert_eq!(identity.start, 10);
    assert_eq!(identity.increment, 2);
    assert!(id.default_value.is_none());
    assert!(!id.nullable);
}

#[test]
fn test_numeric_and_varchar_modifiers() {
    let db = parse_sql("CREATE TABLE t(price numeric(10,2), code varchar(8));").expect("load");

    let t = table(&db, "public", "t");
    let price = t.get_column("price").unwrap();
    assert_eq!(price.data_type, "numeric");
    assert_eq!(price.precision, Some(10));
    assert_eq!(price.scale, Some(2));

    let code = t.get_column("code").unwrap();
    assert_eq!(code.data_type, "varchar");
    assert_eq!(code.max_length, Some(8));
    assert!(code.precision.is_none());
}

#[test]
fn test_array_column_type() {
    let db = parse_sql("CREATE TABLE t(tags text[], scores int8[]);").expect("load");
    let t = table(&db, "public", "t");
    assert_eq!(t.get_column("tags").unwrap().data_type, "text[]");
    assert_eq!(t.get_column("scores").unwrap().data_type, "bigint[]");
}

#[test]
fn test_create_schema_and_extension() {
    let db = parse_sql(
        "CREATE SCHEMA app AUTHORIZATION owner_role;\
         CREATE EXTENSION pg_trgm WITH SCHEMA app VERSION '1.6';",
    )
    .expect("load");

    assert_eq!(
        db.schemas.get("app").unwrap().owner.as_deref(),
        Some("owner_role")
    );
    let ext = db.extensions.get("pg_trgm").expect("extension");
    assert_eq!(ext.schema, "app");
    assert_eq!(ext.version, "1.6");
}

#[test]
fn test_create_enum_type() {
    let db = parse_sql("CREATE TYPE status AS ENUM ('draft', 'active', 'done');").expect("load");

    let type_def = db.schemas["public"].types.get("status").expect("type");
    match &type_def.kind {
        TypeKind::Enum { values } => assert_eq!(values, &["draft", "active", "done"]),
        other => panic!("expected enum, got {}", other.as_str()),
    }
}

#[test]
fn test_create_composite_type() {
    let db = parse_sql("CREATE TYPE pair AS (x int4, y int4);").expect("load");

    let type_def = db.schemas["public"].types.get("pair").expect("type");
    match &type_def.kind {
        TypeKind::Composite { columns } => {
            assert_eq!(columns.len(), 2);
            assert_eq!(columns[0].name, "x");
            assert_eq!(columns[0].data_type, "integer");
            assert_eq!(columns[1].position, 2);
        }
        other => panic!("expected composite, got {}", other.as_str()),
    }
}

#[test]
fn test_create_domain_with_constraints() {
    let db = parse_sql(
        "CREATE DOMAIN price AS numeric NOT NULL DEFAULT 0 \
         CONSTRAINT price_positive CHECK (VALUE > 0);",
    )
    .expect("load");

    let type_def = db.schemas["public"].types.get("price").expect("type");
    match &type_def.kind {
        TypeKind::Domain {
            base_type,
            not_null,
            default_value,
            check_constraints,
        } => {
            assert_eq!(base_type, "numeric");
            assert!(not_null);
            assert_eq!(default_value.as_deref(), Some("0"));
            assert_eq!(check_constraints.len(), 1);
            assert_eq!(check_constraints[0].name, "price_positive");
        }
        other => panic!("expected domain, got {}", other.as_str()),
    }
}

#[test]
fn test_create_view_body() {
    let db = parse_sql(
        "CREATE TABLE t(id integer);\
         CREATE VIEW v AS SELECT id FROM t WHERE id > 0;",
    )
    .expect("load");

    let view = db.schemas["public"].views.get("v").expect("view");
    let body = view.definition.to_lowercase();
    assert!(body.contains("select"), "body: {body}");
    assert!(body.contains("from t"), "body: {body}");
}

#[test]
fn test_create_function_metadata() {
    let db = parse_sql(
        "CREATE FUNCTION add_one(x integer DEFAULT 0) RETURNS integer \
         LANGUAGE plpgsql IMMUTABLE STRICT SECURITY DEFINER \
         AS $$ BEGIN RETURN x + 1; END $$;",
    )
    .expect("load");

    let f = db.schemas["public"].functions.get("add_one").expect("fn");
    assert_eq!(f.language, "plpgsql");
    assert_eq!(f.return_type, "integer");
    assert_eq!(f.volatility, Volatility::Immutable);
    assert!(f.is_strict);
    assert!(f.security_definer);
    assert_eq!(f.arguments, "integer");
    assert_eq!(f.signature, "x integer DEFAULT 0");
    assert_eq!(f.parameters.len(), 1);
    assert_eq!(f.parameters[0].mode, ParameterMode::In);
    assert!(f.definition.contains("RETURN x + 1"));
}

#[test]
fn test_create_function_returns_table() {
    let db = parse_sql(
        "CREATE FUNCTION list_items() RETURNS TABLE(id int4, label text) \
         LANGUAGE sql AS $$ SELECT 1, 'x' $$;",
    )
    .expect("load");

    let f = db.schemas["public"].functions.get("list_items").expect("fn");
    assert_eq!(f.return_type, "TABLE(id integer, label text)");
}

#[test]
fn test_create_procedure() {
    let db = parse_sql(
        "CREATE PROCEDURE do_work(batch integer) LANGUAGE plpgsql AS $$ BEGIN NULL; END $$;",
    )
    .expect("load");

    let p = db.schemas["public"].procedures.get("do_work").expect("proc");
    assert_eq!(p.language, "plpgsql");
    assert_eq!(p.arguments, "integer");
    assert_eq!(p.signature, "batch integer");
}

#[test]
fn test_create_aggregate() {
    let db = parse_sql(
        "CREATE AGGREGATE sum_squares(integer) (\
             SFUNC = accum_square, STYPE = int8, INITCOND = '0'\
         );",
    )
    .expect("load");

    let agg = db.schemas["public"]
        .aggregates
        .get("sum_squares")
        .expect("aggregate");
    assert_eq!(agg.transition_function, "accum_square");
    assert_eq!(agg.state_type, "bigint");
    assert_eq!(agg.return_type, "bigint");
    assert_eq!(agg.initial_condition.as_deref(), Some("0"));
}

#[test]
fn test_create_trigger_timing_events_and_call() {
    let db = parse_sql(
        "CREATE TABLE t(id integer, amount integer);\
         CREATE TRIGGER trg BEFORE UPDATE OR INSERT ON t FOR EACH ROW \
         WHEN (new.amount > 0) EXECUTE FUNCTION public.audit('orders');",
    )
    .expect("load");

    let t = table(&db, "public", "t");
    let trigger = t.triggers.get("trg").expect("trigger");
    assert_eq!(trigger.timing, TriggerTiming::Before);
    assert_eq!(trigger.level, TriggerLevel::Row);
    assert_eq!(
        trigger.events,
        vec![TriggerEvent::Insert, TriggerEvent::Update]
    );
    assert_eq!(trigger.function_call, "audit('orders')");
    assert_eq!(
        trigger.when_condition.as_deref(),
        Some("(NEW.amount > 0)")
    );
}

#[test]
fn test_trigger_on_missing_table_dropped() {
    let db = parse_sql(
        "CREATE TRIGGER trg AFTER DELETE ON nowhere FOR EACH ROW EXECUTE FUNCTION f();",
    )
    .expect("load");
    assert!(db.schemas.is_empty());
}

#[test]
fn test_policy_on_missing_table_dropped() {
    let db = parse_sql("CREATE POLICY p ON nowhere USING (true);").expect("load");
    assert!(db.schemas.is_empty());
}

#[test]
fn test_unknown_statements_ignored() {
    let db = parse_sql(
        "CREATE TABLE t(id integer);\
         GRANT SELECT ON t TO PUBLIC;\
         COMMENT ON TABLE t IS 'noted';\
         SET search_path = public;",
    )
    .expect("load");
    assert_eq!(db.schemas["public"].tables.len(), 1);
}

#[test]
fn test_alter_index_accepted_without_effect() {
    let db = parse_sql(
        "CREATE TABLE t(id integer);\
         CREATE INDEX i ON t (id);\
         ALTER INDEX i SET (fillfactor = 70);",
    )
    .expect("load");
    assert!(table(&db, "public", "t").indexes.contains_key("i"));
}

#[test]
fn test_parse_error_surfaces_statement() {
    let err = parse_sql("CREATE TABLE t(id integer").expect_err("must fail");
    match err {
        LoadError::DdlParse { statement, .. } => {
            assert!(statement.contains("CREATE TABLE t"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_index_definition_regenerated() {
    let db = parse_sql(
        "CREATE TABLE t(a integer, b text);\
         CREATE UNIQUE INDEX t_a_b ON t USING btree (a, b DESC) WHERE (b IS NOT NULL);",
    )
    .expect("load");

    let index = table(&db, "public", "t").indexes.get("t_a_b").expect("idx");
    assert_eq!(index.columns[1].direction, SortDirection::Desc);
    assert_eq!(
        index.definition,
        "CREATE UNIQUE INDEX t_a_b ON public.t USING btree (a, b DESC) WHERE (b IS NOT NULL)"
    );
}

#[test]
fn test_attach_partition_via_alter() {
    let db = parse_sql(
        "CREATE TABLE events(id int, at date) PARTITION BY RANGE (at);\
         CREATE TABLE events_2024(id int, at date);\
         ALTER TABLE events ATTACH PARTITION events_2024 \
         FOR VALUES FROM ('2024-01-01') TO ('2025-01-01');",
    )
    .expect("load");

    assert_eq!(db.partition_attachments.len(), 1);
    let attachment = &db.partition_attachments[0];
    assert_eq!(attachment.parent_table, "events");
    assert_eq!(attachment.child_table, "events_2024");
    assert!(attachment.partition_bound.starts_with("FOR VALUES FROM"));
}
