//! Non-relational objects: views, functions, procedures, aggregates,
//! triggers, and policies.

use pg_query::NodeEnum;
use pg_query::protobuf::{self, FunctionParameterMode, ObjectType};
use tracing::debug;

use crate::error::LoadError;
use crate::model::{
    Aggregate, Function, Parameter, ParameterMode, Policy, PolicyCommand, Procedure, Trigger,
    TriggerEvent, TriggerLevel, TriggerTiming, View, Volatility,
};
use crate::normalize::{
    canonical_policy_expression, canonical_roles, canonical_trigger_when,
};
use crate::parser::DdlLoader;
use crate::parser::ddl::{def_elem_string, object_name, qualified_name, string_list};
use crate::parser::expr::{print_opt_node, type_name_text};

// Trigger bit fields as libpg_query encodes them.
const TRIGGER_TIMING_BEFORE: i32 = 2;
const TRIGGER_TIMING_INSTEAD: i32 = 64;
const TRIGGER_EVENT_INSERT: i32 = 4;
const TRIGGER_EVENT_DELETE: i32 = 8;
const TRIGGER_EVENT_UPDATE: i32 = 16;
const TRIGGER_EVENT_TRUNCATE: i32 = 32;

impl DdlLoader {
    // -----------------------------------------------------------------------
    // CREATE VIEW
    // -----------------------------------------------------------------------

    pub(crate) fn create_view(&mut self, stmt: &protobuf::ViewStmt) -> Result<(), LoadError> {
        let (schema_name, name) = qualified_name(stmt.view.as_ref());
        if name.is_empty() {
            return Ok(());
        }
        let definition = stmt
            .query
            .as_deref()
            .map(deparse_statement)
            .unwrap_or_default();
        let schema = self.db.get_or_create_schema(&schema_name);
        schema.views.insert(
            name.clone(),
            View {
                schema: schema_name,
                name,
                definition,
            },
        );
        Ok(())
    }

    // -----------------------------------------------------------------------
    // CREATE FUNCTION / PROCEDURE
    // -----------------------------------------------------------------------

    pub(crate) fn create_function_or_procedure(
        &mut self,
        stmt: &protobuf::CreateFunctionStmt,
    ) -> Result<(), LoadError> {
        let (schema_name, name) = object_name(&stmt.funcname);
        if name.is_empty() {
            return Ok(());
        }

        let parameters = convert_parameters(&stmt.parameters);
        let arguments = input_arguments(&parameters);
        let signature = input_signature(&parameters);

        let mut definition = String::new();
        let mut language = "sql".to_string();
        let mut volatility = Volatility::Volatile;
        let mut is_strict = false;
        let mut security_definer = false;
        for opt in &stmt.options {
            let Some(NodeEnum::DefElem(def)) = opt.node.as_ref() else {
                continue;
            };
            match def.defname.as_str() {
                "as" => {
                    if let Some(NodeEnum::List(list)) =
                        def.arg.as_ref().and_then(|a| a.node.as_ref())
                    {
                        definition = string_list(&list.items).join("\n");
                    }
                }
                "language" => {
                    if let Some(lang) = def_elem_string(def) {
                        language = lang.to_lowercase();
                    }
                }
                "volatility" => {
                    volatility = match def_elem_string(def).as_deref() {
                        Some("immutable") => Volatility::Immutable,
                        Some("stable") => Volatility::Stable,
                        _ => Volatility::Volatile,
                    };
                }
                "strict" => {
                    is_strict = matches!(
                        def.arg.as_ref().and_then(|a| a.node.as_ref()),
                        Some(NodeEnum::Boolean(b)) if b.boolval
                    );
                }
                "security" => {
                    security_definer = matches!(
                        def.arg.as_ref().and_then(|a| a.node.as_ref()),
                        Some(NodeEnum::Boolean(b)) if b.boolval
                    );
                }
                _ => {}
            }
        }

        if stmt.is_procedure {
            let mut procedure = Procedure::new(&schema_name, &name);
            procedure.definition = definition;
            procedure.language = language;
            procedure.arguments = arguments;
            procedure.signature = signature;
            procedure.parameters = parameters;
            let schema = self.db.get_or_create_schema(&schema_name);
            schema.procedures.insert(name, procedure);
            return Ok(());
        }

        let mut function = Function::new(&schema_name, &name);
        function.definition = definition;
        function.language = language;
        function.volatility = volatility;
        function.is_strict = is_strict;
        function.security_definer = security_definer;
        function.return_type = return_type_text(stmt.return_type.as_ref(), &function_table_columns(&stmt.parameters));
        function.arguments = arguments;
        function.signature = signature;
        function.parameters = parameters;
        let schema = self.db.get_or_create_schema(&schema_name);
        schema.functions.insert(name, function);
        Ok(())
    }

    // -----------------------------------------------------------------------
    // CREATE AGGREGATE
    // -----------------------------------------------------------------------

    /// Aggregates arrive as `DefineStmt` nodes; every other defined object
    /// kind (operators, collations, ...) is ignored.
    pub(crate) fn define_aggregate(
        &mut self,
        stmt: &protobuf::DefineStmt,
    ) -> Result<(), LoadError> {
        if stmt.kind() != ObjectType::ObjectAggregate {
            return Ok(());
        }
        let (schema_name, name) = object_name(&stmt.defnames);
        if name.is_empty() {
            return Ok(());
        }

        let mut aggregate = Aggregate::new(&schema_name, &name);

        // args[0] is the parameter list; the trailing integer is the number
        // of direct (ordered-set) arguments, which plain aggregates lack.
        if let Some(NodeEnum::List(list)) = stmt.args.first().and_then(|n| n.node.as_ref()) {
            let parameters = convert_parameters(&list.items);
            aggregate.arguments = input_arguments(&parameters);
            aggregate.signature = aggregate.arguments.clone();
        }

        for def_node in &stmt.definition {
            let Some(NodeEnum::DefElem(def)) = def_node.node.as_ref() else {
                continue;
            };
            match def.defname.as_str() {
                "sfunc" => {
                    if let Some(value) = def_elem_string(def) {
                        match value.rsplit_once('.') {
                            Some((schema, func)) => {
                                aggregate.transition_function_schema = Some(schema.to_string());
                                aggregate.transition_function = func.to_string();
                            }
                            None => aggregate.transition_function = value,
                        }
                    }
                }
                "stype" => {
                    if let Some(value) = def_elem_string(def) {
                        aggregate.state_type = value;
                    }
                }
                "initcond" => aggregate.initial_condition = def_elem_string(def),
                "finalfunc" => {
                    if let Some(value) = def_elem_string(def) {
                        match value.rsplit_once('.') {
                            Some((schema, func)) => {
                                aggregate.final_function_schema = Some(schema.to_string());
                                aggregate.final_function = Some(func.to_string());
                            }
                            None => aggregate.final_function = Some(value),
                        }
                    }
                }
                _ => {}
            }
        }

        // The definition carries no explicit return type; an aggregate
        // returns its state type (or the final function's result, which the
        // statement does not spell out).
        aggregate.return_type = aggregate.state_type.clone();

        let schema = self.db.get_or_create_schema(&schema_name);
        schema.aggregates.insert(name, aggregate);
        Ok(())
    }

    // -----------------------------------------------------------------------
    // CREATE TRIGGER
    // -----------------------------------------------------------------------

    pub(crate) fn create_trigger(
        &mut self,
        stmt: &protobuf::CreateTrigStmt,
    ) -> Result<(), LoadError> {
        let (schema_name, table_name) = qualified_name(stmt.relation.as_ref());
        if stmt.trigname.is_empty() {
            return Ok(());
        }
        // A trigger for a table the stream never created has nothing to hang
        // off; dropped like any other structural anomaly.
        if self.table_mut(&schema_name, &table_name).is_none() {
            debug!(trigger = stmt.trigname, table = table_name, "trigger on unknown table dropped");
            return Ok(());
        }

        let mut trigger = Trigger::new(&schema_name, &table_name, &stmt.trigname);
        trigger.timing = if stmt.timing & TRIGGER_TIMING_BEFORE != 0 {
            TriggerTiming::Before
        } else if stmt.timing & TRIGGER_TIMING_INSTEAD != 0 {
            TriggerTiming::InsteadOf
        } else {
            TriggerTiming::After
        };
        if stmt.events & TRIGGER_EVENT_INSERT != 0 {
            trigger.push_event(TriggerEvent::Insert);
        }
        if stmt.events & TRIGGER_EVENT_UPDATE != 0 {
            trigger.push_event(TriggerEvent::Update);
        }
        if stmt.events & TRIGGER_EVENT_DELETE != 0 {
            trigger.push_event(TriggerEvent::Delete);
        }
        if stmt.events & TRIGGER_EVENT_TRUNCATE != 0 {
            trigger.push_event(TriggerEvent::Truncate);
        }
        trigger.level = if stmt.row {
            TriggerLevel::Row
        } else {
            TriggerLevel::Statement
        };
        trigger.function_call = trigger_call_text(&stmt.funcname, &stmt.args, &schema_name);
        if let Some(when) = stmt.when_clause.as_deref() {
            let condition = print_opt_node(Some(when));
            if !condition.is_empty() {
                trigger.when_condition = Some(canonical_trigger_when(&condition));
            }
        }

        if let Some(table) = self.table_mut(&schema_name, &table_name) {
            table.triggers.insert(trigger.name.clone(), trigger);
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // CREATE POLICY
    // -----------------------------------------------------------------------

    pub(crate) fn create_policy(
        &mut self,
        stmt: &protobuf::CreatePolicyStmt,
    ) -> Result<(), LoadError> {
        let (schema_name, table_name) = qualified_name(stmt.table.as_ref());
        if stmt.policy_name.is_empty() {
            return Ok(());
        }
        if self.table_mut(&schema_name, &table_name).is_none() {
            debug!(policy = stmt.policy_name, table = table_name, "policy on unknown table dropped");
            return Ok(());
        }

        let mut policy = Policy::new(&schema_name, &table_name, &stmt.policy_name);
        policy.command = match stmt.cmd_name.to_lowercase().as_str() {
            "select" => PolicyCommand::Select,
            "insert" => PolicyCommand::Insert,
            "update" => PolicyCommand::Update,
            "delete" => PolicyCommand::Delete,
            _ => PolicyCommand::All,
        };
        policy.permissive = stmt.permissive;

        let mut roles: Vec<String> = stmt
            .roles
            .iter()
            .filter_map(|n| match n.node.as_ref() {
                Some(NodeEnum::RoleSpec(spec)) => {
                    if spec.roletype() == protobuf::RoleSpecType::RolespecPublic {
                        Some("PUBLIC".to_string())
                    } else if !spec.rolename.is_empty() {
                        Some(spec.rolename.clone())
                    } else {
                        None
                    }
                }
                _ => None,
            })
            .collect();
        if roles.is_empty() {
            roles.push("PUBLIC".to_string());
        }
        policy.roles = canonical_roles(&roles);

        if let Some(qual) = stmt.qual.as_deref() {
            let text = print_opt_node(Some(qual));
            if !text.is_empty() {
                policy.using_expression = Some(canonical_policy_expression(&text));
            }
        }
        if let Some(check) = stmt.with_check.as_deref() {
            let text = print_opt_node(Some(check));
            if !text.is_empty() {
                policy.with_check_expression = Some(canonical_policy_expression(&text));
            }
        }

        let schema = self.db.get_or_create_schema(&schema_name);
        schema.policies.insert(policy.name.clone(), policy.clone());
        if let Some(table) = self.table_mut(&schema_name, &table_name) {
            table.policies.insert(policy.name.clone(), policy);
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Parameter helpers
// ---------------------------------------------------------------------------

fn convert_parameters(nodes: &[pg_query::protobuf::Node]) -> Vec<Parameter> {
    let mut parameters = Vec::new();
    for node in nodes {
        let Some(NodeEnum::FunctionParameter(param)) = node.node.as_ref() else {
            continue;
        };
        let mode = match param.mode() {
            FunctionParameterMode::FuncParamOut => ParameterMode::Out,
            FunctionParameterMode::FuncParamInout => ParameterMode::InOut,
            FunctionParameterMode::FuncParamVariadic => ParameterMode::Variadic,
            FunctionParameterMode::FuncParamTable => ParameterMode::Table,
            _ => ParameterMode::In,
        };
        let data_type = param
            .arg_type
            .as_ref()
            .map(type_name_text)
            .unwrap_or_default();
        let default_value = param
            .defexpr
            .as_deref()
            .map(|d| print_opt_node(Some(d)))
            .filter(|d| !d.is_empty());
        parameters.push(Parameter {
            name: param.name.clone(),
            data_type,
            mode,
            position: parameters.len() as i32 + 1,
            default_value,
        });
    }
    parameters
}

/// Comma-separated input parameter types — the overload identity.
fn input_arguments(parameters: &[Parameter]) -> String {
    parameters
        .iter()
        .filter(|p| p.mode.is_input())
        .map(|p| p.data_type.clone())
        .collect::<Vec<_>>()
        .join(", ")
}

/// `name type [DEFAULT expr]` over the input parameters, for regeneration.
fn input_signature(parameters: &[Parameter]) -> String {
    parameters
        .iter()
        .filter(|p| p.mode.is_input())
        .map(|p| {
            let mut piece = if p.name.is_empty() {
                p.data_type.clone()
            } else {
                format!("{} {}", p.name, p.data_type)
            };
            if let Some(default) = &p.default_value {
                piece.push_str(" DEFAULT ");
                piece.push_str(default);
            }
            piece
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// `TABLE(name type, ...)` columns implied by OUT/TABLE parameters.
fn function_table_columns(nodes: &[pg_query::protobuf::Node]) -> Vec<(String, String)> {
    nodes
        .iter()
        .filter_map(|n| match n.node.as_ref() {
            Some(NodeEnum::FunctionParameter(param)) => {
                let mode = param.mode();
                if matches!(
                    mode,
                    FunctionParameterMode::FuncParamTable | FunctionParameterMode::FuncParamOut
                ) {
                    let data_type = param
                        .arg_type
                        .as_ref()
                        .map(type_name_text)
                        .unwrap_or_default();
                    Some((param.name.clone(), data_type))
                } else {
                    None
                }
            }
            _ => None,
        })
        .collect()
}

/// Return-type text. A `SETOF record` with OUT/TABLE parameters is a table
/// function; its declared shape is reconstructed from those parameters.
fn return_type_text(
    tn: Option<&protobuf::TypeName>,
    table_columns: &[(String, String)],
) -> String {
    let Some(tn) = tn else {
        return String::new();
    };
    let base = type_name_text(tn);
    if tn.setof {
        if base == "record" && !table_columns.is_empty() {
            let cols: Vec<String> = table_columns
                .iter()
                .map(|(name, ty)| {
                    if name.is_empty() {
                        ty.clone()
                    } else {
                        format!("{name} {ty}")
                    }
                })
                .collect();
            return format!("TABLE({})", cols.join(", "));
        }
        return format!("SETOF {base}");
    }
    base
}

/// Canonical `fn('arg1', 'arg2')` text of the trigger's function call. The
/// trigger's own schema qualifier is dropped; string arguments are quoted.
fn trigger_call_text(
    funcname: &[pg_query::protobuf::Node],
    args: &[pg_query::protobuf::Node],
    own_schema: &str,
) -> String {
    let parts = string_list(funcname);
    let name = match parts.len() {
        0 => String::new(),
        1 => parts[0].clone(),
        _ => {
            let schema = &parts[parts.len() - 2];
            let func = &parts[parts.len() - 1];
            if schema == own_schema {
                func.clone()
            } else {
                format!("{schema}.{func}")
            }
        }
    };
    let rendered_args: Vec<String> = string_list(args)
        .iter()
        .map(|a| {
            if a.starts_with('\'') {
                a.clone()
            } else {
                format!("'{a}'")
            }
        })
        .collect();
    format!("{}({})", name, rendered_args.join(", "))
}

/// Deparse a full statement node (used for view bodies). A trivial statement
/// is parsed to obtain a protobuf envelope with the right version, then the
/// target node is spliced in before deparsing.
fn deparse_statement(node: &pg_query::protobuf::Node) -> String {
    let mut parse_result = match pg_query::parse("SELECT NULL") {
        Ok(pr) => pr,
        Err(_) => return String::new(),
    };
    if let Some(stmt) = parse_result.protobuf.stmts.first_mut() {
        stmt.stmt = Some(Box::new(node.clone()));
    }
    pg_query::deparse(&parse_result.protobuf).unwrap_or_default()
}
