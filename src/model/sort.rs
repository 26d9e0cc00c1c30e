//! Dependency-aware orderings for tables and views.
//!
//! Both orders use Kahn's algorithm with alphabetical tie-breaking at every
//! step, so the result is fully deterministic. A cycle degrades to plain
//! alphabetical order rather than failing the caller.

use std::collections::{BTreeSet, HashMap, HashSet};

use crate::model::{ConstraintType, Schema};

/// Table names ordered so that every foreign-key target precedes its
/// referencing table. Only same-schema references contribute edges;
/// cross-schema foreign keys do not constrain the order.
pub fn topological_table_order(schema: &Schema) -> Vec<String> {
    let names: Vec<String> = schema.sorted_table_names();
    let name_set: HashSet<&str> = names.iter().map(String::as_str).collect();

    // Edge referenced -> referencing: the referenced table must come first.
    let mut edges: HashMap<String, Vec<String>> = HashMap::new();
    for (table_name, table) in &schema.tables {
        for constraint in table.constraints.values() {
            if constraint.constraint_type != ConstraintType::ForeignKey {
                continue;
            }
            let Some(ref_table) = constraint.referenced_table.as_deref() else {
                continue;
            };
            let same_schema = constraint
                .referenced_schema
                .as_deref()
                .is_none_or(|s| s == schema.name);
            if !same_schema || !name_set.contains(ref_table) || ref_table == table_name {
                continue;
            }
            edges
                .entry(ref_table.to_string())
                .or_default()
                .push(table_name.clone());
        }
    }

    kahn_or_alphabetical(names, &edges)
}

/// View names ordered so that a view textually mentioned by another view's
/// body comes first. The dependency test is a case-folded substring match on
/// the unquoted view name; see the module notes on its known misfires.
pub fn topological_view_order(schema: &Schema) -> Vec<String> {
    let names: Vec<String> = schema.sorted_view_names();

    let mut edges: HashMap<String, Vec<String>> = HashMap::new();
    for (view_name, view) in &schema.views {
        let body = view.definition.to_lowercase();
        for other in &names {
            if other == view_name {
                continue;
            }
            if body.contains(&other.to_lowercase()) {
                edges
                    .entry(other.clone())
                    .or_default()
                    .push(view_name.clone());
            }
        }
    }

    kahn_or_alphabetical(names, &edges)
}

/// Kahn's algorithm with a BTreeSet frontier for alphabetical tie-breaking.
/// Returns the input (already alphabetical) when a cycle prevents completion.
fn kahn_or_alphabetical(names: Vec<String>, edges: &HashMap<String, Vec<String>>) -> Vec<String> {
    let mut in_degree: HashMap<&str, usize> = names.iter().map(|n| (n.as_str(), 0)).collect();
    for targets in edges.values() {
        for target in targets {
            if let Some(d) = in_degree.get_mut(target.as_str()) {
                *d += 1;
            }
        }
    }

    let mut ready: BTreeSet<&str> = in_degree
        .iter()
        .filter(|(_, d)| **d == 0)
        .map(|(n, _)| *n)
        .collect();

    let mut order: Vec<String> = Vec::with_capacity(names.len());
    while let Some(next) = ready.iter().next().copied() {
        ready.remove(next);
        order.push(next.to_string());
        if let Some(targets) = edges.get(next) {
            for target in targets {
                if let Some(d) = in_degree.get_mut(target.as_str()) {
                    *d -= 1;
                    if *d == 0 {
                        ready.insert(target.as_str());
                    }
                }
            }
        }
    }

    if order.len() != names.len() {
        return names;
    }
    order
}
