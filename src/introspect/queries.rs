//! Catalog query text.
//!
//! Every query is scoped to the target schema via `$1`. Values that the
//! catalog stores as `"char"` / `name` / `int2` are cast to `text` / `int`
//! in SQL so the row decoding stays uniform.

pub const SCHEMA_EXISTS: &str = r#"
    SELECT 1 AS present
    FROM information_schema.schemata
    WHERE schema_name = $1
"#;

pub const SERVER_VERSION: &str = "SELECT version() AS version";

pub const SCHEMA_OWNER: &str = r#"
    SELECT pg_get_userbyid(nspowner)::text AS owner
    FROM pg_namespace
    WHERE nspname = $1
"#;

/// Base tables and partitioned parents; views are loaded separately.
/// `pg_get_partkeydef` yields e.g. `RANGE (tenant_id, created_at)` for
/// partitioned parents and NULL otherwise.
pub const TABLES: &str = r#"
    SELECT
        c.relname::text AS table_name,
        c.relkind::text AS relkind,
        c.relpersistence::text AS persistence,
        c.relrowsecurity AS rls_enabled,
        pg_get_partkeydef(c.oid) AS partition_key_def
    FROM pg_class c
    JOIN pg_namespace n ON n.oid = c.relnamespace
    WHERE n.nspname = $1
      AND c.relkind IN ('r', 'p')
    ORDER BY c.relname
"#;

pub const COLUMNS: &str = r#"
    SELECT
        table_name::text AS table_name,
        column_name::text AS column_name,
        ordinal_position::int AS ordinal_position,
        data_type::text AS data_type,
        udt_name::text AS udt_name,
        is_nullable::text AS is_nullable,
        column_default::text AS column_default,
        character_maximum_length::int AS character_maximum_length,
        numeric_precision::int AS numeric_precision,
        numeric_scale::int AS numeric_scale,
        is_identity::text AS is_identity,
        identity_generation::text AS identity_generation,
        identity_start::text AS identity_start,
        identity_increment::text AS identity_increment,
        identity_minimum::text AS identity_minimum,
        identity_maximum::text AS identity_maximum,
        identity_cycle::text AS identity_cycle
    FROM information_schema.columns
    WHERE table_schema = $1
    ORDER BY table_name, ordinal_position
"#;

/// Attachments in both directions: rows where either side of the
/// inheritance edge lives in the target schema.
pub const PARTITION_ATTACHMENTS: &str = r#"
    SELECT
        pn.nspname::text AS parent_schema,
        pc.relname::text AS parent_table,
        cn.nspname::text AS child_schema,
        cc.relname::text AS child_table,
        pg_get_expr(cc.relpartbound, cc.oid) AS partition_bound
    FROM pg_inherits i
    JOIN pg_class pc ON pc.oid = i.inhparent
    JOIN pg_namespace pn ON pn.oid = pc.relnamespace
    JOIN pg_class cc ON cc.oid = i.inhrelid
    JOIN pg_namespace cn ON cn.oid = cc.relnamespace
    WHERE pc.relkind = 'p'
      AND (pn.nspname = $1 OR cn.nspname = $1)
    ORDER BY pc.relname, cc.relname
"#;

/// Index attachments mirroring the partition hierarchy.
pub const INDEX_ATTACHMENTS: &str = r#"
    SELECT
        pn.nspname::text AS parent_schema,
        pc.relname::text AS parent_index,
        cn.nspname::text AS child_schema,
        cc.relname::text AS child_index
    FROM pg_inherits i
    JOIN pg_class pc ON pc.oid = i.inhparent
    JOIN pg_namespace pn ON pn.oid = pc.relnamespace
    JOIN pg_class cc ON cc.oid = i.inhrelid
    JOIN pg_namespace cn ON cn.oid = cc.relnamespace
    WHERE pc.relkind = 'I'
      AND (pn.nspname = $1 OR cn.nspname = $1)
    ORDER BY pc.relname, cc.relname
"#;

/// One row per constraint column (FK rows pair source and referenced
/// columns positionally via `unnest ... WITH ORDINALITY`).
pub const CONSTRAINTS: &str = r#"
    SELECT
        c.relname::text AS table_name,
        con.conname::text AS constraint_name,
        CASE con.contype
            WHEN 'p' THEN 'PRIMARY KEY'
            WHEN 'u' THEN 'UNIQUE'
            WHEN 'f' THEN 'FOREIGN KEY'
            WHEN 'c' THEN 'CHECK'
            WHEN 'x' THEN 'EXCLUSION'
            ELSE con.contype::text
        END AS constraint_type,
        a.attname::text AS column_name,
        k.ord::int AS column_position,
        nf.nspname::text AS foreign_schema,
        cf.relname::text AS foreign_table,
        af.attname::text AS foreign_column,
        k.ord::int AS foreign_ordinal_position,
        CASE con.confdeltype
            WHEN 'a' THEN 'NO ACTION' WHEN 'r' THEN 'RESTRICT'
            WHEN 'c' THEN 'CASCADE' WHEN 'n' THEN 'SET NULL'
            WHEN 'd' THEN 'SET DEFAULT' ELSE NULL
        END AS delete_rule,
        CASE con.confupdtype
            WHEN 'a' THEN 'NO ACTION' WHEN 'r' THEN 'RESTRICT'
            WHEN 'c' THEN 'CASCADE' WHEN 'n' THEN 'SET NULL'
            WHEN 'd' THEN 'SET DEFAULT' ELSE NULL
        END AS update_rule,
        con.condeferrable AS deferrable,
        con.condeferred AS initially_deferred,
        CASE WHEN con.contype = 'c'
             THEN pg_get_expr(con.conbin, con.conrelid)
             ELSE NULL
        END AS check_clause
    FROM pg_constraint con
    JOIN pg_class c ON c.oid = con.conrelid
    JOIN pg_namespace n ON n.oid = c.relnamespace
    LEFT JOIN LATERAL unnest(con.conkey, con.confkey)
        WITH ORDINALITY AS k(attnum, fattnum, ord) ON true
    LEFT JOIN pg_attribute a
        ON a.attrelid = con.conrelid AND a.attnum = k.attnum
    LEFT JOIN pg_class cf ON cf.oid = con.confrelid
    LEFT JOIN pg_namespace nf ON nf.oid = cf.relnamespace
    LEFT JOIN pg_attribute af
        ON af.attrelid = con.confrelid AND af.attnum = k.fattnum
    WHERE n.nspname = $1
    ORDER BY c.relname, con.conname, k.ord
"#;

pub const INDEXES: &str = r#"
    SELECT
        t.relname::text AS table_name,
        i.relname::text AS index_name,
        am.amname::text AS method,
        ix.indisunique AS is_unique,
        ix.indisprimary AS is_primary,
        ix.indpred IS NOT NULL AS is_partial,
        ix.indexprs IS NOT NULL AS has_expressions,
        pg_get_indexdef(i.oid) AS definition,
        pg_get_expr(ix.indpred, ix.indrelid) AS where_clause
    FROM pg_index ix
    JOIN pg_class i ON i.oid = ix.indexrelid
    JOIN pg_class t ON t.oid = ix.indrelid
    JOIN pg_am am ON am.oid = i.relam
    JOIN pg_namespace n ON n.oid = t.relnamespace
    WHERE n.nspname = $1
    ORDER BY t.relname, i.relname
"#;

pub const SEQUENCES: &str = r#"
    SELECT
        sequencename::text AS sequence_name,
        data_type::text AS data_type,
        start_value AS start_value,
        increment_by AS increment_by,
        min_value AS min_value,
        max_value AS max_value,
        cycle AS cycle
    FROM pg_sequences
    WHERE schemaname = $1
    ORDER BY sequencename
"#;

/// Sequence -> owning column edges (`OWNED BY`, including SERIAL backing
/// sequences), recorded in pg_depend with deptype 'a'.
pub const SEQUENCE_OWNERS: &str = r#"
    SELECT
        s.relname::text AS sequence_name,
        t.relname::text AS table_name,
        a.attname::text AS column_name
    FROM pg_depend d
    JOIN pg_class s ON s.oid = d.objid AND s.relkind = 'S'
    JOIN pg_namespace n ON n.oid = s.relnamespace
    JOIN pg_class t ON t.oid = d.refobjid
    JOIN pg_attribute a ON a.attrelid = t.oid AND a.attnum = d.refobjsubid
    WHERE d.deptype = 'a'
      AND d.classid = 'pg_class'::regclass
      AND n.nspname = $1
"#;

pub const FUNCTIONS: &str = r#"
    SELECT
        p.proname::text AS name,
        p.prosrc AS definition,
        l.lanname::text AS language,
        pg_get_function_result(p.oid) AS return_type,
        pg_get_function_identity_arguments(p.oid) AS arguments,
        pg_get_function_arguments(p.oid) AS signature,
        CASE p.provolatile
            WHEN 'i' THEN 'IMMUTABLE' WHEN 's' THEN 'STABLE' ELSE 'VOLATILE'
        END AS volatility,
        p.proisstrict AS is_strict,
        p.prosecdef AS security_definer
    FROM pg_proc p
    JOIN pg_namespace n ON n.oid = p.pronamespace
    JOIN pg_language l ON l.oid = p.prolang
    WHERE n.nspname = $1
      AND p.prokind = 'f'
    ORDER BY p.proname
"#;

pub const PROCEDURES: &str = r#"
    SELECT
        p.proname::text AS name,
        p.prosrc AS definition,
        l.lanname::text AS language,
        pg_get_function_identity_arguments(p.oid) AS arguments,
        pg_get_function_arguments(p.oid) AS signature
    FROM pg_proc p
    JOIN pg_namespace n ON n.oid = p.pronamespace
    JOIN pg_language l ON l.oid = p.prolang
    WHERE n.nspname = $1
      AND p.prokind = 'p'
    ORDER BY p.proname
"#;

pub const AGGREGATES: &str = r#"
    SELECT
        p.proname::text AS name,
        pg_get_function_identity_arguments(p.oid) AS arguments,
        pg_get_function_arguments(p.oid) AS signature,
        format_type(p.prorettype, NULL) AS return_type,
        format_type(a.aggtranstype, NULL) AS state_type,
        tf.proname::text AS transition_function,
        tn.nspname::text AS transition_function_schema,
        a.agginitval AS initial_condition,
        ff.proname::text AS final_function,
        fn.nspname::text AS final_function_schema
    FROM pg_proc p
    JOIN pg_namespace n ON n.oid = p.pronamespace
    JOIN pg_aggregate a ON a.aggfnoid = p.oid
    LEFT JOIN pg_proc tf ON tf.oid = a.aggtransfn
    LEFT JOIN pg_namespace tn ON tn.oid = tf.pronamespace
    LEFT JOIN pg_proc ff ON ff.oid = a.aggfinalfn
    LEFT JOIN pg_namespace fn ON fn.oid = ff.pronamespace
    WHERE n.nspname = $1
      AND p.prokind = 'a'
    ORDER BY p.proname
"#;

pub const VIEWS: &str = r#"
    SELECT
        viewname::text AS view_name,
        definition AS definition
    FROM pg_views
    WHERE schemaname = $1
    ORDER BY viewname
"#;

/// One row per (trigger, event); events are grouped during assembly.
pub const TRIGGERS: &str = r#"
    SELECT
        event_object_table::text AS table_name,
        trigger_name::text AS trigger_name,
        action_timing::text AS action_timing,
        event_manipulation::text AS event_manipulation,
        action_orientation::text AS action_orientation,
        action_statement::text AS action_statement,
        action_condition::text AS action_condition
    FROM information_schema.triggers
    WHERE trigger_schema = $1
    ORDER BY event_object_table, trigger_name
"#;

pub const POLICIES: &str = r#"
    SELECT
        c.relname::text AS table_name,
        p.polname::text AS policy_name,
        CASE p.polcmd
            WHEN 'r' THEN 'SELECT' WHEN 'a' THEN 'INSERT'
            WHEN 'w' THEN 'UPDATE' WHEN 'd' THEN 'DELETE'
            ELSE 'ALL'
        END AS command,
        CASE WHEN p.polpermissive THEN 'PERMISSIVE' ELSE 'RESTRICTIVE' END AS permissive,
        CASE
            WHEN p.polroles = '{0}' THEN ARRAY['PUBLIC']
            ELSE ARRAY(SELECT rolname::text FROM pg_authid WHERE oid = ANY(p.polroles))
        END AS roles,
        pg_get_expr(p.polqual, p.polrelid) AS using_expression,
        pg_get_expr(p.polwithcheck, p.polrelid) AS with_check_expression
    FROM pg_policy p
    JOIN pg_class c ON c.oid = p.polrelid
    JOIN pg_namespace n ON n.oid = c.relnamespace
    WHERE n.nspname = $1
    ORDER BY c.relname, p.polname
"#;

pub const EXTENSIONS: &str = r#"
    SELECT
        e.extname::text AS name,
        n.nspname::text AS schema,
        e.extversion::text AS version
    FROM pg_extension e
    JOIN pg_namespace n ON n.oid = e.extnamespace
    ORDER BY e.extname
"#;

/// One row per enum label, in sort order.
pub const ENUM_VALUES: &str = r#"
    SELECT
        t.typname::text AS type_name,
        e.enumlabel::text AS label
    FROM pg_type t
    JOIN pg_enum e ON e.enumtypid = t.oid
    JOIN pg_namespace n ON n.oid = t.typnamespace
    WHERE n.nspname = $1
    ORDER BY t.typname, e.enumsortorder
"#;

/// One row per composite-type attribute.
pub const COMPOSITE_COLUMNS: &str = r#"
    SELECT
        t.typname::text AS type_name,
        a.attname::text AS column_name,
        format_type(a.atttypid, a.atttypmod) AS data_type,
        a.attnum::int AS position
    FROM pg_type t
    JOIN pg_class c ON c.oid = t.typrelid AND c.relkind = 'c'
    JOIN pg_attribute a ON a.attrelid = c.oid AND a.attnum > 0 AND NOT a.attisdropped
    JOIN pg_namespace n ON n.oid = t.typnamespace
    WHERE n.nspname = $1
    ORDER BY t.typname, a.attnum
"#;

pub const DOMAINS: &str = r#"
    SELECT
        t.typname::text AS domain_name,
        format_type(t.typbasetype, t.typtypmod) AS base_type,
        t.typnotnull AS not_null,
        t.typdefault AS default_value
    FROM pg_type t
    JOIN pg_namespace n ON n.oid = t.typnamespace
    WHERE n.nspname = $1
      AND t.typtype = 'd'
    ORDER BY t.typname
"#;

pub const DOMAIN_CONSTRAINTS: &str = r#"
    SELECT
        t.typname::text AS domain_name,
        con.conname::text AS constraint_name,
        pg_get_constraintdef(con.oid) AS definition
    FROM pg_constraint con
    JOIN pg_type t ON t.oid = con.contypid
    JOIN pg_namespace n ON n.oid = t.typnamespace
    WHERE n.nspname = $1
    ORDER BY t.typname, con.conname
"#;
